//! Force-directed graph visualization component.
//!
//! Draws the canonical [`GraphData`](crate::sync::GraphData) on an HTML canvas
//! with physics-based positioning, pan/zoom, node dragging and hover
//! highlighting of a node's neighborhood. Nodes are colored by their
//! typology/type attribute and sized by degree.
//!
//! # Example
//!
//! ```ignore
//! let graph = RwSignal::new(None::<GraphData>);
//! let renderer = SignalRenderer::new(graph);
//!
//! view! { <ForceGraphCanvas data=graph fullscreen=true /> }
//! ```

mod component;
mod render;
mod state;
pub mod theme;

pub use component::{ForceGraphCanvas, SignalRenderer};
pub use theme::Theme;
