//! Page-level configuration for the graph views.
//!
//! Read once at startup from a `<script id="sync-config">` JSON element.
//! Every field has a default, so the element can be omitted or partial.

use std::time::Duration;

use serde::Deserialize;

use crate::sync::{FetchPolicy, IterationStrategy, View, locator::DEFAULT_PROBE_CEILING};

/// Retry budget for one kind of graph fetch.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RetrySettings {
	/// Total attempts.
	pub attempts: u32,
	/// Backoff unit in milliseconds.
	pub base_delay_ms: u64,
}

impl RetrySettings {
	/// Fetch policy with these settings; empty graphs are failures.
	pub fn policy(&self) -> FetchPolicy {
		FetchPolicy::retrying(self.attempts, Duration::from_millis(self.base_delay_ms))
	}
}

impl Default for RetrySettings {
	fn default() -> Self {
		Self {
			attempts: 5,
			base_delay_ms: 400,
		}
	}
}

/// Settings for the sync layer.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct SyncConfig {
	/// Backend origin, e.g. `http://127.0.0.1:8000`.
	pub base_url: String,
	/// Tab shown on page load.
	pub initial_view: View,
	/// Poll interval for views with an mtime endpoint.
	pub mtime_poll_ms: u64,
	/// Poll interval for views whose revision is a content tag.
	pub tag_poll_ms: u64,
	/// Poll interval for context job status.
	pub job_poll_ms: u64,
	/// Retries for massing, masterplan and enriched graphs.
	pub graph_fetch: RetrySettings,
	/// Retries for the site context graph.
	pub context_fetch: RetrySettings,
	/// How the newest enriched iteration is found.
	pub iterations: IterationStrategy,
	/// Highest iteration index probed while doubling; capped at 2^20.
	pub probe_ceiling: u32,
}

impl Default for SyncConfig {
	fn default() -> Self {
		Self {
			base_url: "http://127.0.0.1:8000".into(),
			initial_view: View::Context,
			mtime_poll_ms: 2500,
			tag_poll_ms: 3000,
			job_poll_ms: 2000,
			graph_fetch: RetrySettings::default(),
			context_fetch: RetrySettings {
				attempts: 3,
				base_delay_ms: 300,
			},
			iterations: IterationStrategy::Auto,
			probe_ceiling: DEFAULT_PROBE_CEILING,
		}
	}
}

impl SyncConfig {
	/// Parse from JSON, defaulting missing fields.
	pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
		serde_json::from_str(text)
	}

	/// Backend URL for `path`.
	pub fn url(&self, path: &str) -> String {
		format!("{}{}", self.base_url.trim_end_matches('/'), path)
	}

	/// Interval for mtime-polled views.
	pub fn mtime_interval(&self) -> Duration {
		Duration::from_millis(self.mtime_poll_ms)
	}

	/// Interval for tag-polled views.
	pub fn tag_interval(&self) -> Duration {
		Duration::from_millis(self.tag_poll_ms)
	}

	/// Interval between context job status checks.
	pub fn job_interval(&self) -> Duration {
		Duration::from_millis(self.job_poll_ms)
	}
}
