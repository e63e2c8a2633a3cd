//! Named views and the one loader every view goes through.
//!
//! A view differs from another only in where its graph comes from, so each
//! gets a [`ViewSource`] and they all share [`ViewLoader`]'s
//! fetch → adapt path.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;

use super::fetch::{FetchPolicy, Fetcher};
use super::graph::{GraphData, adapt};
use super::locator::IterationLocator;
use super::revision::{Observation, Revision};
use crate::error::SyncError;

/// A named perspective on the project graph.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum View {
	/// Nothing selected.
	#[default]
	None,
	/// Site context from OpenStreetMap.
	Context,
	/// Massing model exported from Rhino.
	Massing,
	/// Combined masterplan graph.
	Masterplan,
	/// Graph extracted from the uploaded brief.
	Brief,
	/// Latest LLM-enriched knowledge graph.
	Enriched,
}

impl View {
	/// Selectable views in tab order.
	pub const TABS: [View; 5] = [
		View::Context,
		View::Massing,
		View::Masterplan,
		View::Brief,
		View::Enriched,
	];

	/// Stable lowercase name.
	pub fn name(self) -> &'static str {
		match self {
			View::None => "none",
			View::Context => "context",
			View::Massing => "massing",
			View::Masterplan => "masterplan",
			View::Brief => "brief",
			View::Enriched => "enriched",
		}
	}

	/// Tab caption.
	pub fn title(self) -> &'static str {
		match self {
			View::None => "None",
			View::Context => "Site context",
			View::Massing => "Massing",
			View::Masterplan => "Masterplan",
			View::Brief => "Brief",
			View::Enriched => "Enriched",
		}
	}
}

impl fmt::Display for View {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.name())
	}
}

/// Why a load is happening.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoadReason {
	/// The view was just selected.
	Initial,
	/// The view's revision changed.
	Changed,
}

/// Where a view's graph comes from.
pub enum ViewSource {
	/// Nothing to show.
	Empty,
	/// One GET, no polling. A 404 means "no graph yet".
	Direct {
		/// Graph URL.
		url: String,
		/// Retry policy.
		policy: FetchPolicy,
	},
	/// A graph URL plus a cheap modification-time URL to poll.
	Mtime {
		/// Graph URL.
		graph_url: String,
		/// URL answering `{mtime: number}`.
		mtime_url: String,
		/// Retry policy; empty graphs are accepted on initial loads only.
		policy: FetchPolicy,
	},
	/// The newest enriched iteration.
	Iterations(IterationLocator),
	/// A graph held in memory by the page.
	Cached(Rc<RefCell<Option<GraphData>>>),
}

/// Loads one view's graph and, for polled views, its revision signal.
pub struct ViewLoader {
	view: View,
	source: ViewSource,
	fetcher: Rc<Fetcher>,
	poll_interval: Option<Duration>,
}

impl ViewLoader {
	/// Loader that never polls.
	pub fn new(view: View, source: ViewSource, fetcher: Rc<Fetcher>) -> Self {
		Self {
			view,
			source,
			fetcher,
			poll_interval: None,
		}
	}

	/// Poll the revision signal every `interval` while the view is active.
	pub fn polling(mut self, interval: Duration) -> Self {
		self.poll_interval = Some(interval);
		self
	}

	/// The view this loader serves.
	pub fn view(&self) -> View {
		self.view
	}

	/// `Some` for views driven by a change detector.
	pub fn poll_interval(&self) -> Option<Duration> {
		match self.source {
			ViewSource::Mtime { .. } | ViewSource::Iterations(_) => self.poll_interval,
			_ => None,
		}
	}

	/// Fetch and adapt the view's graph.
	///
	/// `Ok(None)` means there is definitively nothing to show.
	pub async fn load(&self, reason: LoadReason) -> Result<Option<GraphData>, SyncError> {
		match &self.source {
			ViewSource::Empty => Ok(None),
			ViewSource::Direct { url, policy } => match self.fetcher.fetch_json(url, policy).await {
				Ok(raw) => Ok(Some(adapt(&raw))),
				Err(err) if err.is_not_found() => Ok(None),
				Err(err) => Err(err),
			},
			ViewSource::Mtime {
				graph_url, policy, ..
			} => {
				let policy = policy
					.clone()
					.allow_empty(policy.allow_empty || reason == LoadReason::Initial);
				let raw = self.fetcher.fetch_json(graph_url, &policy).await?;
				Ok(Some(adapt(&raw)))
			}
			ViewSource::Iterations(locator) => Ok(Some(locator.find_latest().await?.graph)),
			ViewSource::Cached(cached) => Ok(cached.borrow().clone()),
		}
	}

	/// Query the revision signal once.
	///
	/// `Ok(None)` when the source has no signal or the backend did not report one.
	pub async fn observe(&self) -> Result<Option<Observation>, SyncError> {
		match &self.source {
			ViewSource::Mtime { mtime_url, .. } => {
				let raw = self.fetcher.fetch_json(mtime_url, &FetchPolicy::single()).await?;
				Ok(raw
					.get("mtime")
					.and_then(Value::as_f64)
					.map(|t| Observation::revision(Revision::Mtime(t))))
			}
			ViewSource::Iterations(locator) => {
				let latest = locator.find_latest().await?;
				Ok(Some(Observation {
					revision: Revision::Tag(latest.revision),
					graph: Some(latest.graph),
				}))
			}
			_ => Ok(None),
		}
	}
}

#[cfg(test)]
mod tests {
	use futures::executor::block_on;
	use serde_json::json;

	use super::*;
	use crate::sync::testing::{FakeBackend, InstantSleeper};
	use crate::sync::transport::HttpReply;

	const GRAPH: &str = "http://backend/graph/massing";
	const MTIME: &str = "http://backend/graph/massing/mtime";

	fn fetcher(backend: &Rc<FakeBackend>) -> Rc<Fetcher> {
		Rc::new(Fetcher::new(backend.clone(), InstantSleeper::new()))
	}

	fn massing(backend: &Rc<FakeBackend>) -> ViewLoader {
		ViewLoader::new(
			View::Massing,
			ViewSource::Mtime {
				graph_url: GRAPH.into(),
				mtime_url: MTIME.into(),
				policy: FetchPolicy::retrying(3, Duration::ZERO),
			},
			fetcher(backend),
		)
		.polling(Duration::from_millis(2500))
	}

	#[test]
	fn initial_load_accepts_an_empty_massing() {
		let backend = FakeBackend::new();
		backend.respond_json(GRAPH, json!({"nodes": [], "edges": []}));
		let loader = massing(&backend);

		let graph = block_on(loader.load(LoadReason::Initial)).unwrap();
		assert_eq!(graph, Some(GraphData::default()));
		assert_eq!(backend.hits(GRAPH), 1);

		let err = block_on(loader.load(LoadReason::Changed)).unwrap_err();
		assert!(matches!(err, SyncError::Exhausted { attempts: 3, .. }));
	}

	#[test]
	fn mtime_observation() {
		let backend = FakeBackend::new();
		let loader = massing(&backend);

		backend.respond_json(MTIME, json!({"mtime": 1717.5}));
		let seen = block_on(loader.observe()).unwrap();
		assert_eq!(seen, Some(Observation::revision(Revision::Mtime(1717.5))));

		backend.respond_json(MTIME, json!({"mtime": null}));
		assert_eq!(block_on(loader.observe()).unwrap(), None);

		backend.respond(MTIME, HttpReply::new(500, ""));
		assert!(block_on(loader.observe()).is_err());
		assert_eq!(backend.hits(MTIME), 3);
	}

	#[test]
	fn direct_source_maps_404_to_nothing() {
		let backend = FakeBackend::new();
		let loader = ViewLoader::new(
			View::Context,
			ViewSource::Direct {
				url: "http://backend/graph/context".into(),
				policy: FetchPolicy::retrying(3, Duration::ZERO)
					.allow_empty(true)
					.not_found_is_final(true),
			},
			fetcher(&backend),
		);

		assert_eq!(block_on(loader.load(LoadReason::Initial)).unwrap(), None);
		assert_eq!(backend.requests().len(), 1);
		assert_eq!(loader.poll_interval(), None);
	}

	#[test]
	fn cached_source_reads_current_value() {
		let backend = FakeBackend::new();
		let cache = Rc::new(RefCell::new(None));
		let loader = ViewLoader::new(View::Brief, ViewSource::Cached(cache.clone()), fetcher(&backend))
			.polling(Duration::from_secs(1));

		assert_eq!(block_on(loader.load(LoadReason::Initial)).unwrap(), None);
		*cache.borrow_mut() = Some(adapt(&json!({"nodes": [{"id": "p1"}]})));
		let graph = block_on(loader.load(LoadReason::Initial)).unwrap().unwrap();
		assert_eq!(graph.nodes.len(), 1);
		assert_eq!(loader.poll_interval(), None);
		assert!(backend.requests().is_empty());
	}
}
