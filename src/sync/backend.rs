//! Calls to the backend that are not graph reads: the brief upload and the
//! context (OpenStreetMap) job endpoints.

use std::rc::Rc;

use serde::Deserialize;
use serde_json::{Value, json};

use super::fetch::{FetchPolicy, Fetcher, parse_reply};
use super::graph::{GraphData, adapt};
use super::transport::FileUpload;
use crate::error::SyncError;

/// What the backend said about an uploaded brief.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BriefReply {
	/// Text to surface in the chat panel.
	pub chat_notice: Option<String>,
	/// The brief graph, if the backend produced a non-empty one.
	pub graph: Option<GraphData>,
}

#[derive(Debug, Default, Deserialize)]
struct RawBriefReply {
	#[serde(default)]
	status: Option<String>,
	#[serde(default)]
	chat_notice: Option<String>,
	#[serde(default)]
	message: Option<String>,
	#[serde(default)]
	graph: Option<Value>,
}

/// State of a context job.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum JobStatus {
	/// Still working.
	Running,
	/// Output written; the context graph can be reloaded.
	Finished,
	/// The worker gave up, or the backend does not know the job.
	Failed(String),
}

impl JobStatus {
	/// Finished or failed.
	pub fn is_terminal(&self) -> bool {
		!matches!(self, JobStatus::Running)
	}
}

#[derive(Debug, Deserialize)]
struct RawJobReply {
	#[serde(default)]
	ok: bool,
	#[serde(default)]
	job_id: Option<String>,
	#[serde(default)]
	status: Option<String>,
	#[serde(default)]
	error: Option<String>,
}

/// Thin client for the backend's non-graph endpoints.
#[derive(Clone)]
pub struct BackendClient {
	fetcher: Rc<Fetcher>,
	base_url: String,
}

impl BackendClient {
	/// Client for the backend at `base_url`.
	pub fn new(fetcher: Rc<Fetcher>, base_url: &str) -> Self {
		Self {
			fetcher,
			base_url: base_url.trim_end_matches('/').to_string(),
		}
	}

	/// Absolute URL for `path`.
	pub fn url(&self, path: &str) -> String {
		format!("{}{}", self.base_url, path)
	}

	/// `POST /upload_brief`.
	pub async fn upload_brief(&self, upload: FileUpload) -> Result<BriefReply, SyncError> {
		let url = self.url("/upload_brief");
		let reply = self.fetcher.transport().post_file(&url, upload).await?;
		let raw: RawBriefReply = parse_reply(&url, &reply)
			.and_then(|value| {
				serde_json::from_value(value).map_err(|e| SyncError::Malformed {
					url: url.clone(),
					reason: e.to_string(),
				})
			})
			.map_err(|e| SyncError::Upload {
				reason: e.to_string(),
			})?;

		if raw.status.as_deref() == Some("error") {
			return Err(SyncError::Upload {
				reason: raw.message.unwrap_or_else(|| "rejected by backend".into()),
			});
		}
		let graph = raw.graph.as_ref().map(adapt).filter(|g| !g.is_empty());
		Ok(BriefReply {
			chat_notice: raw.chat_notice.or(raw.message),
			graph,
		})
	}

	/// `POST /osm/run`; returns the job id.
	pub async fn start_context_job(
		&self,
		lat: f64,
		lon: f64,
		radius_km: f64,
	) -> Result<String, SyncError> {
		let url = self.url("/osm/run");
		let body = json!({"lat": lat, "lon": lon, "radius_km": radius_km});
		let reply = self.fetcher.transport().post_json(&url, &body).await?;
		let raw = parse_job_reply(&url, parse_reply(&url, &reply)?)?;
		match (raw.ok, raw.job_id) {
			(true, Some(job_id)) => Ok(job_id),
			_ => Err(SyncError::Job {
				reason: raw.error.unwrap_or_else(|| "backend refused the job".into()),
			}),
		}
	}

	/// `GET /osm/status/{job_id}`, one attempt.
	pub async fn context_job_status(&self, job_id: &str) -> Result<JobStatus, SyncError> {
		let url = self.url(&format!("/osm/status/{job_id}"));
		let raw = parse_job_reply(&url, self.fetcher.fetch_json(&url, &FetchPolicy::single()).await?)?;
		if !raw.ok {
			return Ok(JobStatus::Failed(raw.error.unwrap_or_else(|| "unknown job".into())));
		}
		Ok(match raw.status.as_deref() {
			Some("finished") => JobStatus::Finished,
			Some("failed") => JobStatus::Failed("worker failed".into()),
			_ => JobStatus::Running,
		})
	}
}

fn parse_job_reply(url: &str, value: Value) -> Result<RawJobReply, SyncError> {
	serde_json::from_value(value).map_err(|e| SyncError::Malformed {
		url: url.to_string(),
		reason: e.to_string(),
	})
}
