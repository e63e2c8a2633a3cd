//! Locating the newest enriched-graph iteration.
//!
//! The enrichment worker writes `it1.json`, `it2.json`, ... and never
//! deletes them. Newer backends also serve the newest one directly; older
//! ones only expose the numbered files, so the locator finds the highest
//! index with a doubling search followed by a binary search. Both phases
//! take a logarithmic number of probes.

use std::cell::Cell;
use std::rc::Rc;

use log::{debug, info};
use serde::Deserialize;
use serde_json::{Value, json};

use super::fetch::{FetchPolicy, Fetcher};
use super::graph::{GraphData, adapt};
use crate::error::SyncError;

/// Highest index the doubling phase will probe.
pub const DEFAULT_PROBE_CEILING: u32 = 1 << 20;

/// How the latest iteration is found.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IterationStrategy {
	/// Try the direct endpoint, fall back to probing once it 404s.
	#[default]
	Auto,
	/// Only the direct endpoint.
	Direct,
	/// Only probing the numbered files.
	Probe,
}

/// The newest iteration and the revision tag identifying it.
#[derive(Clone, Debug, PartialEq)]
pub struct LatestIteration {
	/// File index, when known.
	pub index: Option<u32>,
	/// The adapted graph.
	pub graph: GraphData,
	/// Index plus node and edge counts.
	pub revision: String,
}

/// Finds the current enriched graph.
pub struct IterationLocator {
	fetcher: Rc<Fetcher>,
	latest_url: String,
	iteration_base: String,
	strategy: IterationStrategy,
	ceiling: u32,
	policy: FetchPolicy,
	/// `Some(false)` once the direct endpoint answered 404.
	direct_supported: Cell<Option<bool>>,
}

impl IterationLocator {
	/// Locator for a backend at `base_url`.
	pub fn new(
		fetcher: Rc<Fetcher>,
		base_url: &str,
		strategy: IterationStrategy,
		policy: FetchPolicy,
	) -> Self {
		let base = base_url.trim_end_matches('/');
		Self {
			fetcher,
			latest_url: format!("{base}/graph/knowledge/iteration/latest"),
			iteration_base: format!("{base}/enriched_graph/iteration"),
			strategy,
			ceiling: DEFAULT_PROBE_CEILING,
			policy,
			direct_supported: Cell::new(None),
		}
	}

	/// Lower the doubling phase's ceiling. Values above
	/// [`DEFAULT_PROBE_CEILING`] are clamped to it.
	pub fn with_ceiling(mut self, ceiling: u32) -> Self {
		self.ceiling = ceiling.clamp(1, DEFAULT_PROBE_CEILING);
		self
	}

	/// URL of iteration `n`.
	pub fn iteration_url(&self, n: u32) -> String {
		format!("{}/it{}.json", self.iteration_base, n)
	}

	/// The newest iteration according to the configured strategy.
	pub async fn find_latest(&self) -> Result<LatestIteration, SyncError> {
		match self.strategy {
			IterationStrategy::Direct => self.latest_direct().await,
			IterationStrategy::Probe => self.latest_by_probe().await,
			IterationStrategy::Auto => {
				if self.direct_supported.get() == Some(false) {
					return self.latest_by_probe().await;
				}
				match self.latest_direct().await {
					Err(err) if err.is_not_found() => {
						info!(
							"masterplan-graph: {} unavailable, probing numbered iterations",
							self.latest_url
						);
						self.direct_supported.set(Some(false));
						self.latest_by_probe().await
					}
					other => {
						if other.is_ok() {
							self.direct_supported.set(Some(true));
						}
						other
					}
				}
			}
		}
	}

	/// Ask the backend's `latest` endpoint.
	pub async fn latest_direct(&self) -> Result<LatestIteration, SyncError> {
		let policy = self.policy.clone().not_found_is_final(true);
		let raw = self.fetcher.fetch_json(&self.latest_url, &policy).await?;
		let graph = adapt(&raw);
		let index = graph
			.meta
			.get("iteration")
			.and_then(Value::as_u64)
			.and_then(|n| u32::try_from(n).ok());
		let label = index.map_or_else(|| "latest".to_string(), |n| format!("it{n}"));
		Ok(LatestIteration {
			revision: revision_tag(&label, &graph),
			index,
			graph,
		})
	}

	/// Find the highest existing `it{N}.json` by probing.
	pub async fn latest_by_probe(&self) -> Result<LatestIteration, SyncError> {
		let Some(first) = self.probe(1).await? else {
			return Err(SyncError::NoIterationsFound {
				base: self.iteration_base.clone(),
			});
		};
		let (mut index, mut raw) = (1, first);

		// Doubling: 2, 4, 8, ... until a probe misses or the ceiling is passed.
		// The ceiling is at most 2^20, so `n` cannot overflow.
		let mut n: u32 = 2;
		while n <= self.ceiling {
			match self.probe(n).await? {
				Some(found) => {
					(index, raw) = (n, found);
					n *= 2;
				}
				None => break,
			}
		}

		// Binary search in (index, n - 1] for the highest index still present.
		let (mut lo, mut hi) = (index + 1, (n - 1).min(self.ceiling));
		while lo <= hi {
			let mid = lo + (hi - lo) / 2;
			match self.probe(mid).await? {
				Some(found) => {
					(index, raw) = (mid, found);
					lo = mid + 1;
				}
				None => hi = mid - 1,
			}
		}

		debug!("masterplan-graph: latest iteration is it{}", index);
		tag_provenance(&mut raw, index);
		let graph = adapt(&raw);
		Ok(LatestIteration {
			revision: revision_tag(&format!("it{index}"), &graph),
			index: Some(index),
			graph,
		})
	}

	/// Single existence check of iteration `n`; only a 404 means absent.
	pub async fn probe(&self, n: u32) -> Result<Option<Value>, SyncError> {
		self.fetcher.probe(&self.iteration_url(n)).await
	}
}

fn revision_tag(label: &str, graph: &GraphData) -> String {
	format!("{}:{}:{}", label, graph.nodes.len(), graph.edges.len())
}

/// Record which file produced the graph unless the payload already says.
fn tag_provenance(raw: &mut Value, index: u32) {
	let Some(object) = raw.as_object_mut() else {
		return;
	};
	let meta = object.entry("meta").or_insert_with(|| json!({}));
	if let Some(meta) = meta.as_object_mut() {
		meta.entry("iteration").or_insert_with(|| json!(index));
		meta.entry("source")
			.or_insert_with(|| json!(format!("it{index}.json")));
	}
}
