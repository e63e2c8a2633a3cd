//! Keeps the displayed graph in step with the backend.
//!
//! Payloads go through one path: [`Fetcher`] (retry with backoff) →
//! [`adapt`] (canonical shape) → a [`GraphRenderer`]. [`ViewController`]
//! decides which view owns the renderer, and a [`ChangeDetector`] polls the
//! owning view's revision signal when it has one.

pub mod backend;
pub mod controller;
pub mod detector;
pub mod fetch;
pub mod graph;
pub mod locator;
pub mod render;
pub mod revision;
pub mod runtime;
pub mod transport;
pub mod view;

#[cfg(test)]
pub(crate) mod testing;

pub use backend::{BackendClient, BriefReply, JobStatus};
pub use controller::ViewController;
pub use detector::{ChangeDetector, DetectorState, TickOutcome};
pub use fetch::{FetchPolicy, Fetcher};
pub use graph::{GraphData, GraphLink, GraphNode, adapt, is_empty_payload};
pub use locator::{IterationLocator, IterationStrategy, LatestIteration};
pub use render::{GraphRenderer, ViewSink};
pub use revision::{Observation, Revision};
pub use runtime::{BrowserSpawner, BrowserTimer, Sleeper};
pub use transport::{FileUpload, HttpReply, HttpTransport, Transport};
pub use view::{LoadReason, View, ViewLoader, ViewSource};
