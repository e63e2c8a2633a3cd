//! The render collaborator seam and the stale-result guard in front of it.

use std::cell::Cell;
use std::rc::Rc;

use log::{debug, info, warn};

use super::graph::GraphData;
use super::view::View;
use crate::error::SyncError;

/// Draws canonical graphs. Implemented by the visualization component.
pub trait GraphRenderer {
	/// Replace the displayed graph.
	fn render(&self, graph: GraphData);
	/// Show nothing.
	fn clear(&self);
}

/// Renderer handle bound to one view selection.
///
/// Every selection bumps a shared epoch. A sink created for an older epoch
/// silently drops its calls, so a load that resolves after the user moved
/// to another tab never reaches the screen.
#[derive(Clone)]
pub struct ViewSink {
	renderer: Rc<dyn GraphRenderer>,
	epoch: Rc<Cell<u64>>,
	issued: u64,
	view: View,
}

impl ViewSink {
	pub(crate) fn new(renderer: Rc<dyn GraphRenderer>, epoch: Rc<Cell<u64>>, view: View) -> Self {
		let issued = epoch.get();
		Self {
			renderer,
			epoch,
			issued,
			view,
		}
	}

	/// The view this sink draws for.
	pub fn view(&self) -> View {
		self.view
	}

	/// Whether the selection this sink was issued for is still current.
	pub fn is_current(&self) -> bool {
		self.epoch.get() == self.issued
	}

	fn guard(&self, what: &str) -> bool {
		let current = self.is_current();
		if !current {
			debug!("masterplan-graph: dropping stale {} for {}", what, self.view);
		}
		current
	}
}

impl GraphRenderer for ViewSink {
	fn render(&self, graph: GraphData) {
		if self.guard("render") {
			self.renderer.render(graph);
		}
	}

	fn clear(&self) {
		if self.guard("clear") {
			self.renderer.clear();
		}
	}
}

/// How a finished load ended up on screen.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Shown {
	Graph,
	Nothing,
	Failed,
}

/// Hand a load result to `sink`. This is the loaders' catch boundary: errors
/// are logged and turn into a cleared view.
pub(crate) fn present(
	sink: &dyn GraphRenderer,
	view: View,
	loaded: Result<Option<GraphData>, SyncError>,
) -> Shown {
	match loaded {
		Ok(Some(graph)) => {
			info!(
				"masterplan-graph: {} loaded {} nodes, {} links",
				view,
				graph.nodes.len(),
				graph.edges.len()
			);
			sink.render(graph);
			Shown::Graph
		}
		Ok(None) => {
			info!("masterplan-graph: {} has no graph yet", view);
			sink.clear();
			Shown::Nothing
		}
		Err(err) => {
			warn!("masterplan-graph: loading {} failed: {}", view, err);
			sink.clear();
			Shown::Failed
		}
	}
}
