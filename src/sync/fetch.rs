//! JSON fetching with linear backoff.

use std::rc::Rc;
use std::time::Duration;

use log::debug;
use serde_json::Value;

use super::graph::is_empty_payload;
use super::runtime::Sleeper;
use super::transport::{HttpReply, Transport};
use crate::error::SyncError;

/// How a single `fetch_json` call treats failures.
#[derive(Clone, Debug, PartialEq)]
pub struct FetchPolicy {
	/// Total attempts, at least one.
	pub attempts: u32,
	/// Backoff unit. The pause after failed attempt `i` is `base_delay * (i + 1)`.
	pub base_delay: Duration,
	/// Accept payloads with no nodes and no edges.
	pub allow_empty: bool,
	/// Return a 404 immediately instead of retrying it.
	pub not_found_is_final: bool,
}

impl FetchPolicy {
	/// `attempts` tries with `base_delay` backoff; empty graphs are failures.
	pub fn retrying(attempts: u32, base_delay: Duration) -> Self {
		Self {
			attempts: attempts.max(1),
			base_delay,
			allow_empty: false,
			not_found_is_final: false,
		}
	}

	/// One attempt that accepts any JSON body.
	pub fn single() -> Self {
		Self::retrying(1, Duration::ZERO).allow_empty(true)
	}

	/// Set whether empty graphs count as success.
	pub fn allow_empty(mut self, allow: bool) -> Self {
		self.allow_empty = allow;
		self
	}

	/// Set whether a 404 ends the call at once.
	pub fn not_found_is_final(mut self, is_final: bool) -> Self {
		self.not_found_is_final = is_final;
		self
	}

	fn delay_after(&self, attempt: u32) -> Duration {
		self.base_delay * (attempt + 1)
	}
}

impl Default for FetchPolicy {
	fn default() -> Self {
		Self::retrying(3, Duration::from_millis(300))
	}
}

/// Issues GETs through a [`Transport`] and parses their JSON bodies.
///
/// Holds no state between calls.
#[derive(Clone)]
pub struct Fetcher {
	transport: Rc<dyn Transport>,
	sleeper: Rc<dyn Sleeper>,
}

impl Fetcher {
	/// Fetcher over the given transport, pausing between retries with `sleeper`.
	pub fn new(transport: Rc<dyn Transport>, sleeper: Rc<dyn Sleeper>) -> Self {
		Self { transport, sleeper }
	}

	/// The underlying transport, for non-GET calls.
	pub fn transport(&self) -> &dyn Transport {
		self.transport.as_ref()
	}

	/// GET `url` and parse it, retrying per `policy`.
	///
	/// Returns the first successful payload. Once the budget is spent the
	/// last failure is wrapped in [`SyncError::Exhausted`].
	pub async fn fetch_json(&self, url: &str, policy: &FetchPolicy) -> Result<Value, SyncError> {
		let attempts = policy.attempts.max(1);
		let mut last = None;
		for attempt in 0..attempts {
			match self.attempt(url, policy).await {
				Ok(value) => return Ok(value),
				Err(err) if err.is_not_found() && policy.not_found_is_final => return Err(err),
				Err(err) => {
					debug!(
						"masterplan-graph: {} attempt {}/{} failed: {}",
						url,
						attempt + 1,
						attempts,
						err
					);
					last = Some(err);
				}
			}
			if attempt + 1 < attempts {
				self.sleeper.sleep(policy.delay_after(attempt)).await;
			}
		}
		Err(SyncError::Exhausted {
			url: url.to_string(),
			attempts,
			last: Box::new(last.unwrap_or_else(|| SyncError::Network {
				url: url.to_string(),
				reason: "no attempt made".into(),
			})),
		})
	}

	/// Single GET where 404 means "absent" rather than failure.
	///
	/// Every other failure, including a non-404 status or a malformed body,
	/// is returned as an error.
	pub async fn probe(&self, url: &str) -> Result<Option<Value>, SyncError> {
		match self.attempt(url, &FetchPolicy::single()).await {
			Ok(value) => Ok(Some(value)),
			Err(SyncError::NotFound { .. }) => Ok(None),
			Err(err) => Err(err),
		}
	}

	async fn attempt(&self, url: &str, policy: &FetchPolicy) -> Result<Value, SyncError> {
		let reply = self.transport.get(url).await?;
		let value = parse_reply(url, &reply)?;
		if !policy.allow_empty && is_empty_payload(&value) {
			return Err(SyncError::EmptyPayload { url: url.to_string() });
		}
		Ok(value)
	}
}

/// Check the status of `reply` and parse its body.
pub(crate) fn parse_reply(url: &str, reply: &HttpReply) -> Result<Value, SyncError> {
	match reply.status {
		404 => Err(SyncError::NotFound { url: url.to_string() }),
		_ if !reply.is_success() => Err(SyncError::Status {
			url: url.to_string(),
			status: reply.status,
		}),
		_ => serde_json::from_str(&reply.body).map_err(|e| SyncError::Malformed {
			url: url.to_string(),
			reason: e.to_string(),
		}),
	}
}

#[cfg(test)]
mod tests {
	use futures::executor::block_on;
	use serde_json::json;

	use super::*;
	use crate::sync::testing::{FakeBackend, InstantSleeper};

	const URL: &str = "http://backend/graph/massing";

	fn fetcher(backend: &Rc<FakeBackend>, sleeper: &Rc<InstantSleeper>) -> Fetcher {
		Fetcher::new(backend.clone(), sleeper.clone())
	}

	#[test]
	fn empty_payloads_exhaust_the_budget() {
		let backend = FakeBackend::new();
		backend.respond(URL, HttpReply::json(&json!({"nodes": [], "edges": []})));
		let sleeper = InstantSleeper::new();

		let policy = FetchPolicy::retrying(3, Duration::from_millis(100));
		let err = block_on(fetcher(&backend, &sleeper).fetch_json(URL, &policy)).unwrap_err();

		assert!(matches!(
			err,
			SyncError::Exhausted { attempts: 3, ref last, .. }
				if matches!(**last, SyncError::EmptyPayload { .. })
		));
		assert_eq!(backend.hits(URL), 3);
	}

	#[test]
	fn empty_payload_accepted_when_allowed() {
		let backend = FakeBackend::new();
		backend.respond(URL, HttpReply::json(&json!({"nodes": [], "links": []})));
		let sleeper = InstantSleeper::new();

		let policy = FetchPolicy::retrying(3, Duration::from_millis(100)).allow_empty(true);
		let value = block_on(fetcher(&backend, &sleeper).fetch_json(URL, &policy)).unwrap();

		assert_eq!(value, json!({"nodes": [], "links": []}));
		assert_eq!(backend.hits(URL), 1);
		assert!(sleeper.delays().is_empty());
	}

	#[test]
	fn backoff_grows_linearly_with_no_trailing_delay() {
		let backend = FakeBackend::new();
		backend.respond(URL, HttpReply::new(503, "busy"));
		let sleeper = InstantSleeper::new();

		let policy = FetchPolicy::retrying(4, Duration::from_millis(250));
		let err = block_on(fetcher(&backend, &sleeper).fetch_json(URL, &policy)).unwrap_err();

		assert!(matches!(err, SyncError::Exhausted { .. }));
		assert_eq!(
			sleeper.delays(),
			vec![
				Duration::from_millis(250),
				Duration::from_millis(500),
				Duration::from_millis(750),
			]
		);
	}

	#[test]
	fn recovers_after_transient_failures() {
		let backend = FakeBackend::new();
		backend.queue(URL, HttpReply::new(500, ""));
		backend.queue_network_error(URL);
		backend.queue(URL, HttpReply::new(200, "{not json"));
		backend.respond(URL, HttpReply::json(&json!({"nodes": [{"id": "a"}]})));
		let sleeper = InstantSleeper::new();

		let policy = FetchPolicy::retrying(5, Duration::from_millis(10));
		let value = block_on(fetcher(&backend, &sleeper).fetch_json(URL, &policy)).unwrap();

		assert_eq!(value["nodes"][0]["id"], "a");
		assert_eq!(backend.hits(URL), 4);
	}

	#[test]
	fn final_not_found_skips_retries() {
		let backend = FakeBackend::new();
		let sleeper = InstantSleeper::new();

		let policy = FetchPolicy::retrying(3, Duration::from_millis(10)).not_found_is_final(true);
		let err = block_on(fetcher(&backend, &sleeper).fetch_json(URL, &policy)).unwrap_err();

		assert!(matches!(err, SyncError::NotFound { .. }));
		assert_eq!(backend.hits(URL), 1);
	}

	#[test]
	fn probe_separates_absence_from_failure() {
		let backend = FakeBackend::new();
		let present = "http://backend/it1.json";
		let broken = "http://backend/it2.json";
		let garbled = "http://backend/it3.json";
		backend.respond(present, HttpReply::json(&json!({"nodes": []})));
		backend.respond(broken, HttpReply::new(500, ""));
		backend.respond(garbled, HttpReply::new(200, "<html>"));
		let fetcher = fetcher(&backend, &InstantSleeper::new());

		assert!(block_on(fetcher.probe(present)).unwrap().is_some());
		assert!(block_on(fetcher.probe("http://backend/it9.json")).unwrap().is_none());
		assert!(matches!(
			block_on(fetcher.probe(broken)),
			Err(SyncError::Status { status: 500, .. })
		));
		assert!(matches!(
			block_on(fetcher.probe(garbled)),
			Err(SyncError::Malformed { .. })
		));
	}
}
