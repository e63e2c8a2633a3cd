//! Error types for the graph synchronization layer.
//!
//! Every failure a loader can see maps onto one `SyncError` variant. Fetch
//! failures are retried inside the budget of a single `fetch_json` call and
//! only surface as [`SyncError::Exhausted`]; a 404 used as an existence probe
//! result never reaches this type at all.

use thiserror::Error;

/// Errors produced while fetching, locating or uploading graph resources.
#[derive(Debug, Error)]
pub enum SyncError {
	/// The request never produced an HTTP response.
	#[error("request to {url} failed: {reason}")]
	Network {
		/// Requested URL.
		url: String,
		/// Transport error text.
		reason: String,
	},

	/// The backend answered with a non-2xx status other than 404.
	#[error("{url} returned HTTP {status}")]
	Status {
		/// Requested URL.
		url: String,
		/// HTTP status code.
		status: u16,
	},

	/// The backend answered 404.
	#[error("{url} not found")]
	NotFound {
		/// Requested URL.
		url: String,
	},

	/// A 2xx body that is not valid JSON.
	#[error("malformed JSON from {url}: {reason}")]
	Malformed {
		/// Requested URL.
		url: String,
		/// Parser error text.
		reason: String,
	},

	/// A graph payload with no nodes and no edges where one was required.
	#[error("{url} returned an empty graph")]
	EmptyPayload {
		/// Requested URL.
		url: String,
	},

	/// Every attempt of a retrying fetch failed; `last` is the final cause.
	#[error("gave up on {url} after {attempts} attempts: {last}")]
	Exhausted {
		/// Requested URL.
		url: String,
		/// Attempts made.
		attempts: u32,
		/// Failure of the final attempt.
		#[source]
		last: Box<SyncError>,
	},

	/// Not even `it1.json` exists.
	#[error("no iterations found under {base}")]
	NoIterationsFound {
		/// Directory of the numbered files.
		base: String,
	},

	/// The brief upload was rejected or its reply could not be understood.
	#[error("brief upload failed: {reason}")]
	Upload {
		/// What went wrong.
		reason: String,
	},

	/// The backend refused to start a context job.
	#[error("context job failed: {reason}")]
	Job {
		/// Backend's explanation, or the transport failure.
		reason: String,
	},
}

impl SyncError {
	/// True for a 404, including one that ended a retry budget.
	pub fn is_not_found(&self) -> bool {
		match self {
			SyncError::NotFound { .. } => true,
			SyncError::Exhausted { last, .. } => last.is_not_found(),
			_ => false,
		}
	}
}
