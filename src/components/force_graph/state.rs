//! Simulation state behind the canvas.
//!
//! Wraps the `force_graph` physics with per-node display data, the pan/zoom
//! transform and pointer interaction. A reloaded graph replaces the
//! simulation but nodes that survive the reload keep their positions, so a
//! polled view does not jump every time the backend rewrites its file.

use std::collections::{HashMap, HashSet};
use std::f64::consts::PI;

use force_graph::{DefaultNodeIdx, EdgeData, ForceGraph, NodeData, SimulationParameters};

use super::theme::{Color, Theme};
use crate::sync::{GraphData, GraphNode};

/// Node radius in graph units at zoom 1.
pub const NODE_RADIUS: f64 = 6.0;

/// Attributes tried, in order, for a node's caption.
const LABEL_KEYS: [&str; 3] = ["label", "name", "title"];
/// Attributes tried, in order, for a node's category.
const CATEGORY_KEYS: [&str; 4] = ["typology", "type", "category", "kind"];

/// Display data carried by each simulated node.
#[derive(Clone, Debug)]
pub struct NodeInfo {
	/// Canonical id.
	pub id: String,
	/// Caption.
	pub label: String,
	/// Fill.
	pub color: Color,
	/// Radius multiplier derived from degree.
	pub size: f64,
}

/// Pan and zoom.
#[derive(Clone, Copy, Debug)]
pub struct ViewTransform {
	/// Screen x of the graph origin.
	pub x: f64,
	/// Screen y of the graph origin.
	pub y: f64,
	/// Zoom, clamped to 0.1..10.0.
	pub k: f64,
}

/// A node being dragged.
#[derive(Clone, Copy, Debug)]
pub struct Drag {
	/// Dragged node.
	pub node: DefaultNodeIdx,
	/// Pointer position where the drag started.
	pub from: (f64, f64),
	/// Node position where the drag started.
	pub origin: (f32, f32),
}

/// A background pan in progress.
#[derive(Clone, Copy, Debug)]
pub struct Pan {
	/// Pointer position where the pan started.
	pub from: (f64, f64),
	/// Transform origin when the pan started.
	pub origin: (f64, f64),
}

/// Graph simulation and interaction state.
pub struct ForceGraphState {
	/// Physics simulation.
	pub graph: ForceGraph<NodeInfo, ()>,
	/// Current pan and zoom.
	pub transform: ViewTransform,
	/// Node drag in progress.
	pub drag: Option<Drag>,
	/// Background pan in progress.
	pub pan: Option<Pan>,
	/// Canvas width in pixels.
	pub width: f64,
	/// Canvas height in pixels.
	pub height: f64,
	hovered: Option<DefaultNodeIdx>,
	neighbors: HashSet<DefaultNodeIdx>,
	edges: Vec<(DefaultNodeIdx, DefaultNodeIdx)>,
	index: HashMap<String, DefaultNodeIdx>,
}

fn simulation() -> ForceGraph<NodeInfo, ()> {
	ForceGraph::new(SimulationParameters {
		force_charge: 150.0,
		force_spring: 0.05,
		force_max: 100.0,
		node_speed: 3000.0,
		damping_factor: 0.9,
	})
}

/// Caption for `node`: the first label-like attribute, else its id.
pub fn node_label(node: &GraphNode) -> String {
	LABEL_KEYS
		.iter()
		.find_map(|key| node.str_attr(key))
		.map(str::to_string)
		.or_else(|| node.id())
		.unwrap_or_default()
}

/// Category used for coloring, lowercased.
pub fn node_category(node: &GraphNode) -> Option<String> {
	CATEGORY_KEYS
		.iter()
		.find_map(|key| node.str_attr(key))
		.map(str::to_lowercase)
}

/// Assigns category colors in order of first appearance.
struct Colorist<'a> {
	theme: &'a Theme,
	seen: HashMap<String, usize>,
}

impl Colorist<'_> {
	fn color(&mut self, node: &GraphNode) -> Color {
		if let Some(explicit) = node.str_attr("color").and_then(Color::parse) {
			return explicit;
		}
		let Some(category) = node_category(node) else {
			return self.theme.uncategorized;
		};
		if let Some(known) = self.theme.known.get(category.as_str()) {
			return *known;
		}
		let next = self.seen.len();
		let slot = *self.seen.entry(category).or_insert(next);
		self.theme.category(slot)
	}
}

impl ForceGraphState {
	/// State with no nodes, centered in a `width` x `height` canvas.
	pub fn empty(width: f64, height: f64) -> Self {
		Self {
			graph: simulation(),
			transform: ViewTransform {
				x: width / 2.0,
				y: height / 2.0,
				k: 1.0,
			},
			drag: None,
			pan: None,
			width,
			height,
			hovered: None,
			neighbors: HashSet::new(),
			edges: Vec::new(),
			index: HashMap::new(),
		}
	}

	/// State showing `data`.
	pub fn new(data: &GraphData, width: f64, height: f64, theme: &Theme) -> Self {
		let mut state = Self::empty(width, height);
		state.replace(Some(data), theme);
		state
	}

	/// Swap in a new graph, or none.
	///
	/// Nodes whose id is still present keep their position and anchoring;
	/// the pan/zoom transform is left alone.
	pub fn replace(&mut self, data: Option<&GraphData>, theme: &Theme) {
		let mut previous: HashMap<String, (f32, f32, bool)> = HashMap::new();
		self.graph.visit_nodes(|node| {
			previous.insert(
				node.data.user_data.id.clone(),
				(node.x(), node.y(), node.data.is_anchor),
			);
		});

		self.graph = simulation();
		self.edges.clear();
		self.index.clear();
		self.drag = None;
		self.hovered = None;
		self.neighbors.clear();

		let Some(data) = data else {
			return;
		};

		let mut degree: HashMap<&str, usize> = HashMap::new();
		for link in &data.edges {
			*degree.entry(link.source.as_str()).or_default() += 1;
			*degree.entry(link.target.as_str()).or_default() += 1;
		}
		let max_degree = degree.values().copied().max().unwrap_or(1).max(1);

		let mut colorist = Colorist {
			theme,
			seen: HashMap::new(),
		};
		let count = data.nodes.len().max(1) as f64;
		let ring = 60.0 + 12.0 * count.sqrt();

		for (i, node) in data.nodes.iter().enumerate() {
			let Some(id) = node.id() else {
				continue;
			};
			if self.index.contains_key(&id) {
				continue;
			}
			let (x, y, is_anchor) = previous.get(&id).copied().unwrap_or_else(|| {
				let angle = i as f64 * 2.0 * PI / count;
				((ring * angle.cos()) as f32, (ring * angle.sin()) as f32, false)
			});
			let edges = degree.get(id.as_str()).copied().unwrap_or(0);
			let size = 0.8 + 0.8 * (edges as f64 / max_degree as f64).sqrt();

			let idx = self.graph.add_node(NodeData {
				x,
				y,
				mass: 10.0,
				is_anchor,
				user_data: NodeInfo {
					label: node_label(node),
					color: colorist.color(node),
					size,
					id: id.clone(),
				},
			});
			self.index.insert(id, idx);
		}

		for link in &data.edges {
			if let (Some(&src), Some(&tgt)) =
				(self.index.get(&link.source), self.index.get(&link.target))
			{
				self.graph.add_edge(src, tgt, EdgeData::default());
				self.edges.push((src, tgt));
			}
		}
	}

	/// Number of simulated nodes.
	pub fn node_count(&self) -> usize {
		self.index.len()
	}

	/// Number of drawn edges.
	pub fn edge_count(&self) -> usize {
		self.edges.len()
	}

	/// Graph-space position of the node with `id`.
	pub fn position_of(&self, id: &str) -> Option<(f32, f32)> {
		let idx = *self.index.get(id)?;
		let mut found = None;
		self.graph.visit_nodes(|node| {
			if node.index() == idx {
				found = Some((node.x(), node.y()));
			}
		});
		found
	}

	/// Display data of the node with `id`.
	pub fn info_of(&self, id: &str) -> Option<NodeInfo> {
		let idx = *self.index.get(id)?;
		let mut found = None;
		self.graph.visit_nodes(|node| {
			if node.index() == idx {
				found = Some(node.data.user_data.clone());
			}
		});
		found
	}

	/// Convert screen coordinates to graph coordinates.
	pub fn screen_to_graph(&self, sx: f64, sy: f64) -> (f64, f64) {
		(
			(sx - self.transform.x) / self.transform.k,
			(sy - self.transform.y) / self.transform.k,
		)
	}

	/// The topmost node under a screen position.
	pub fn node_at(&self, sx: f64, sy: f64) -> Option<DefaultNodeIdx> {
		let (gx, gy) = self.screen_to_graph(sx, sy);
		// Keep small nodes clickable when zoomed out.
		let slack = (4.0 / self.transform.k).max(0.0);
		let mut found = None;
		self.graph.visit_nodes(|node| {
			let (dx, dy) = (node.x() as f64 - gx, node.y() as f64 - gy);
			let reach = NODE_RADIUS * node.data.user_data.size + slack;
			if dx * dx + dy * dy < reach * reach {
				found = Some(node.index());
			}
		});
		found
	}

	/// Hover `node` and highlight its neighbors.
	pub fn set_hover(&mut self, node: Option<DefaultNodeIdx>) {
		if self.hovered == node {
			return;
		}
		self.hovered = node;
		self.neighbors.clear();
		if let Some(idx) = node {
			for &(src, tgt) in &self.edges {
				if src == idx {
					self.neighbors.insert(tgt);
				} else if tgt == idx {
					self.neighbors.insert(src);
				}
			}
		}
	}

	/// The hovered node.
	pub fn hovered(&self) -> Option<DefaultNodeIdx> {
		self.hovered
	}

	/// Whether `idx` is hovered or next to the hovered node.
	pub fn is_highlighted(&self, idx: DefaultNodeIdx) -> bool {
		self.hovered == Some(idx) || self.neighbors.contains(&idx)
	}

	/// Whether the edge touches the hovered node.
	pub fn edge_highlighted(&self, a: DefaultNodeIdx, b: DefaultNodeIdx) -> bool {
		self.hovered.is_some_and(|h| h == a || h == b)
	}

	/// Start dragging the node under the pointer, or panning if there is none.
	pub fn press(&mut self, sx: f64, sy: f64) {
		match self.node_at(sx, sy) {
			Some(idx) => {
				let mut origin = (0.0, 0.0);
				self.graph.visit_nodes(|node| {
					if node.index() == idx {
						origin = (node.x(), node.y());
					}
				});
				self.drag = Some(Drag {
					node: idx,
					from: (sx, sy),
					origin,
				});
			}
			None => {
				self.pan = Some(Pan {
					from: (sx, sy),
					origin: (self.transform.x, self.transform.y),
				});
			}
		}
	}

	/// Pointer moved.
	pub fn drag_to(&mut self, sx: f64, sy: f64) {
		if let Some(drag) = self.drag {
			let k = self.transform.k;
			let x = drag.origin.0 + ((sx - drag.from.0) / k) as f32;
			let y = drag.origin.1 + ((sy - drag.from.1) / k) as f32;
			self.graph.visit_nodes_mut(|node| {
				if node.index() == drag.node {
					node.data.x = x;
					node.data.y = y;
					node.data.is_anchor = true;
				}
			});
		} else if let Some(pan) = self.pan {
			self.transform.x = pan.origin.0 + (sx - pan.from.0);
			self.transform.y = pan.origin.1 + (sy - pan.from.1);
		} else {
			let hovered = self.node_at(sx, sy);
			self.set_hover(hovered);
		}
	}

	/// Pointer released. Dragged nodes stay pinned.
	pub fn release(&mut self) {
		self.drag = None;
		self.pan = None;
	}

	/// Pointer left the canvas.
	pub fn leave(&mut self) {
		self.release();
		self.set_hover(None);
	}

	/// Zoom by `factor` around a screen point.
	pub fn zoom_at(&mut self, sx: f64, sy: f64, factor: f64) {
		let k = (self.transform.k * factor).clamp(0.1, 10.0);
		let ratio = k / self.transform.k;
		self.transform.x = sx - (sx - self.transform.x) * ratio;
		self.transform.y = sy - (sy - self.transform.y) * ratio;
		self.transform.k = k;
	}

	/// Advance the physics by `dt` seconds.
	pub fn tick(&mut self, dt: f32) {
		if self.node_count() > 0 {
			self.graph.update(dt);
		}
	}

	/// Canvas resized; keeps the graph centered.
	pub fn resize(&mut self, width: f64, height: f64) {
		self.transform.x += (width - self.width) / 2.0;
		self.transform.y += (height - self.height) / 2.0;
		self.width = width;
		self.height = height;
	}
}
