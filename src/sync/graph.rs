//! Canonical graph shape and the adapter that produces it.
//!
//! Backend payloads arrive in several shapes: `edges` or `links`, endpoints
//! as `source`/`target` or `u`/`v`, nodes carrying stale `x`/`y` layout
//! hints. [`adapt`] folds all of them into [`GraphData`], the only shape the
//! renderer accepts. It never fails; anything it cannot read is dropped.

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

/// Node keys removed during normalization.
const LAYOUT_KEYS: [&str; 2] = ["x", "y"];

/// A node: an attribute map whose `id` names it within the graph.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct GraphNode {
	/// All attributes except layout hints.
	pub attrs: Map<String, Value>,
}

impl GraphNode {
	/// The node id as a lookup key. Numeric ids are rendered as strings.
	pub fn id(&self) -> Option<String> {
		self.attrs.get("id").and_then(endpoint_key)
	}

	/// A string attribute, if present.
	pub fn str_attr(&self, key: &str) -> Option<&str> {
		self.attrs.get(key).and_then(Value::as_str)
	}
}

/// An edge with resolved endpoints and passthrough attributes.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct GraphLink {
	/// Source node id.
	pub source: String,
	/// Target node id.
	pub target: String,
	/// Everything else (`type`, weights, ...), minus `u`/`v`.
	#[serde(flatten)]
	pub attrs: Map<String, Value>,
}

/// The canonical graph handed to the renderer.
///
/// Edges are stored once and serialized under both `edges` and `links`, so
/// the two keys can never diverge.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GraphData {
	/// Nodes in source order.
	pub nodes: Vec<GraphNode>,
	/// Edges in source order, malformed ones removed.
	pub edges: Vec<GraphLink>,
	/// Provenance passthrough.
	pub meta: Map<String, Value>,
}

impl GraphData {
	/// The edge list under its other name.
	pub fn links(&self) -> &[GraphLink] {
		&self.edges
	}

	/// No nodes and no edges.
	pub fn is_empty(&self) -> bool {
		self.nodes.is_empty() && self.edges.is_empty()
	}

	/// Serialize back into a raw payload, e.g. to feed it through [`adapt`] again.
	pub fn to_value(&self) -> Value {
		serde_json::to_value(self).unwrap_or(Value::Null)
	}
}

impl Serialize for GraphData {
	fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		let mut map = serializer.serialize_map(Some(4))?;
		map.serialize_entry("nodes", &self.nodes)?;
		map.serialize_entry("edges", &self.edges)?;
		map.serialize_entry("links", &self.edges)?;
		map.serialize_entry("meta", &self.meta)?;
		map.end()
	}
}

/// Map an arbitrary backend payload onto the canonical shape.
pub fn adapt(raw: &Value) -> GraphData {
	let nodes = raw
		.get("nodes")
		.and_then(Value::as_array)
		.map(|nodes| nodes.iter().filter_map(adapt_node).collect())
		.unwrap_or_default();

	let edges = raw_edges(raw)
		.map(|edges| edges.iter().filter_map(adapt_edge).collect())
		.unwrap_or_default();

	let meta = raw
		.get("meta")
		.and_then(Value::as_object)
		.cloned()
		.unwrap_or_default();

	GraphData { nodes, edges, meta }
}

/// True when a raw payload has neither nodes nor edges/links.
///
/// Works on the raw value so that payloads are checked before adaptation
/// drops anything.
pub fn is_empty_payload(raw: &Value) -> bool {
	let len = |key: &str| raw.get(key).and_then(Value::as_array).map_or(0, Vec::len);
	len("nodes") == 0 && len("edges") == 0 && len("links") == 0
}

/// `links` wins over `edges` when both are present.
fn raw_edges(raw: &Value) -> Option<&Vec<Value>> {
	raw.get("links")
		.and_then(Value::as_array)
		.or_else(|| raw.get("edges").and_then(Value::as_array))
}

fn adapt_node(raw: &Value) -> Option<GraphNode> {
	let mut attrs = raw.as_object()?.clone();
	for key in LAYOUT_KEYS {
		attrs.remove(key);
	}
	Some(GraphNode { attrs })
}

fn adapt_edge(raw: &Value) -> Option<GraphLink> {
	let mut attrs = raw.as_object()?.clone();
	let source = take_endpoint(&mut attrs, "source", "u");
	let target = take_endpoint(&mut attrs, "target", "v");
	Some(GraphLink {
		source: source?,
		target: target?,
		attrs,
	})
}

/// Remove both spellings of an endpoint, keeping the preferred one if usable.
fn take_endpoint(attrs: &mut Map<String, Value>, preferred: &str, alias: &str) -> Option<String> {
	let preferred = attrs.remove(preferred);
	let alias = attrs.remove(alias);
	preferred
		.as_ref()
		.and_then(endpoint_key)
		.or_else(|| alias.as_ref().and_then(endpoint_key))
}

fn endpoint_key(value: &Value) -> Option<String> {
	match value {
		Value::String(s) => Some(s.clone()),
		Value::Number(n) => Some(n.to_string()),
		_ => None,
	}
}

#[cfg(test)]
mod tests {
	use serde_json::json;

	use super::*;

	#[test]
	fn strips_layout_hints_from_nodes() {
		let graph = adapt(&json!({
			"nodes": [{"id": "n1", "x": 10, "y": 20, "label": "Foo"}],
		}));
		assert_eq!(graph.nodes.len(), 1);
		assert_eq!(
			Value::Object(graph.nodes[0].attrs.clone()),
			json!({"id": "n1", "label": "Foo"})
		);
	}

	#[test]
	fn renames_u_v_endpoints() {
		let graph = adapt(&json!({
			"nodes": [{"id": "A"}, {"id": "B"}],
			"edges": [{"u": "A", "v": "B", "type": "adjacent"}],
		}));
		let edge = serde_json::to_value(&graph.edges[0]).unwrap();
		assert_eq!(edge, json!({"source": "A", "target": "B", "type": "adjacent"}));
	}

	#[test]
	fn explicit_endpoints_win_over_aliases() {
		let graph = adapt(&json!({
			"edges": [{"source": "A", "target": "B", "u": "X", "v": "Y"}],
		}));
		assert_eq!(graph.edges[0].source, "A");
		assert_eq!(graph.edges[0].target, "B");
		assert!(graph.edges[0].attrs.is_empty());
	}

	#[test]
	fn drops_edges_without_both_endpoints() {
		let graph = adapt(&json!({
			"edges": [
				{"source": "A"},
				{"u": "A", "target": null},
				{"source": null, "target": "B"},
				"not an edge",
				{"u": "A", "v": "B"},
			],
		}));
		assert_eq!(graph.edges.len(), 1);
		assert_eq!(graph.edges[0].source, "A");
	}

	#[test]
	fn links_take_precedence_over_edges() {
		let graph = adapt(&json!({
			"links": [{"source": "L1", "target": "L2"}],
			"edges": [{"source": "E1", "target": "E2"}],
		}));
		assert_eq!(graph.edges.len(), 1);
		assert_eq!(graph.edges[0].source, "L1");
	}

	#[test]
	fn malformed_payloads_degrade_to_empty() {
		for raw in [json!(null), json!([1, 2]), json!({"nodes": "x", "edges": {}, "meta": 3})] {
			let graph = adapt(&raw);
			assert!(graph.is_empty());
			assert!(graph.meta.is_empty());
		}
	}

	#[test]
	fn numeric_ids_become_string_keys() {
		let graph = adapt(&json!({
			"nodes": [{"id": 7}],
			"edges": [{"u": 7, "v": 8}],
		}));
		assert_eq!(graph.nodes[0].id().as_deref(), Some("7"));
		assert_eq!(graph.edges[0].target, "8");
	}

	#[test]
	fn serializes_edges_under_both_keys() {
		let graph = adapt(&json!({
			"nodes": [{"id": "A"}, {"id": "B"}],
			"edges": [{"u": "A", "v": "B"}],
			"meta": {"source": "it3.json"},
		}));
		let value = graph.to_value();
		assert_eq!(value["edges"], value["links"]);
		assert_eq!(value["meta"], json!({"source": "it3.json"}));
		assert_eq!(graph.links(), graph.edges.as_slice());
	}

	#[test]
	fn adaptation_is_a_fixed_point() {
		let raw = json!({
			"nodes": [
				{"id": "b1", "x": 1.5, "typology": "residential", "area": 420},
				{"id": 2, "y": 0, "level": 3},
			],
			"links": [
				{"u": "b1", "v": 2, "type": "adjacent"},
				{"source": "b1"},
			],
			"meta": {"iteration": 4},
		});
		let once = adapt(&raw);
		let twice = adapt(&once.to_value());
		assert_eq!(once, twice);
	}

	#[test]
	fn empty_payload_checks_every_edge_key() {
		assert!(is_empty_payload(&json!({"nodes": [], "edges": []})));
		assert!(is_empty_payload(&json!({"meta": {}})));
		assert!(!is_empty_payload(&json!({"nodes": [], "links": [{"u": 1, "v": 2}]})));
		assert!(!is_empty_payload(&json!({"nodes": [{"id": "a"}]})));
	}
}
