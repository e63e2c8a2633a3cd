//! HTTP transport seam.
//!
//! The sync layer only needs a status code and a body from the backend, so
//! the transport hands back an [`HttpReply`] and leaves status handling to the
//! fetcher. [`HttpTransport`] is the `reqwest` implementation used in the
//! browser; tests substitute a scripted backend.

use async_trait::async_trait;
use reqwest::header::{CACHE_CONTROL, PRAGMA};
use serde_json::Value;

use crate::error::SyncError;

/// Status and body of a completed HTTP exchange.
#[derive(Clone, Debug, PartialEq)]
pub struct HttpReply {
	/// HTTP status code.
	pub status: u16,
	/// Raw response body.
	pub body: String,
}

impl HttpReply {
	/// A reply with the given status and body.
	pub fn new(status: u16, body: impl Into<String>) -> Self {
		Self {
			status,
			body: body.into(),
		}
	}

	/// A 200 reply carrying `value` as JSON.
	pub fn json(value: &Value) -> Self {
		Self::new(200, value.to_string())
	}

	/// 2xx.
	pub fn is_success(&self) -> bool {
		(200..300).contains(&self.status)
	}
}

/// A file to send as the `file` field of a multipart form.
#[derive(Clone, Debug)]
pub struct FileUpload {
	/// Original file name.
	pub file_name: String,
	/// MIME type, e.g. `application/pdf`.
	pub mime: String,
	/// File contents.
	pub bytes: Vec<u8>,
}

/// Minimal HTTP client surface used by the sync layer.
///
/// Only transport-level failures are errors; any HTTP status is a reply.
#[async_trait(?Send)]
pub trait Transport {
	/// `GET url` with caching disabled.
	async fn get(&self, url: &str) -> Result<HttpReply, SyncError>;

	/// `POST url` with a JSON body.
	async fn post_json(&self, url: &str, body: &Value) -> Result<HttpReply, SyncError>;

	/// `POST url` with a multipart form holding one `file` field.
	async fn post_file(&self, url: &str, upload: FileUpload) -> Result<HttpReply, SyncError>;
}

/// `reqwest`-backed transport.
#[derive(Clone, Debug, Default)]
pub struct HttpTransport {
	client: reqwest::Client,
}

impl HttpTransport {
	/// Transport using a fresh `reqwest::Client`.
	pub fn new() -> Self {
		Self::default()
	}

	async fn finish(
		url: &str,
		sent: Result<reqwest::Response, reqwest::Error>,
	) -> Result<HttpReply, SyncError> {
		let response = sent.map_err(|e| network(url, e))?;
		let status = response.status().as_u16();
		let body = response.text().await.map_err(|e| network(url, e))?;
		Ok(HttpReply { status, body })
	}
}

fn network(url: &str, err: reqwest::Error) -> SyncError {
	SyncError::Network {
		url: url.to_string(),
		reason: err.to_string(),
	}
}

#[async_trait(?Send)]
impl Transport for HttpTransport {
	async fn get(&self, url: &str) -> Result<HttpReply, SyncError> {
		let sent = self
			.client
			.get(url)
			.header(CACHE_CONTROL, "no-store")
			.header(PRAGMA, "no-cache")
			.send()
			.await;
		Self::finish(url, sent).await
	}

	async fn post_json(&self, url: &str, body: &Value) -> Result<HttpReply, SyncError> {
		let sent = self.client.post(url).json(body).send().await;
		Self::finish(url, sent).await
	}

	async fn post_file(&self, url: &str, upload: FileUpload) -> Result<HttpReply, SyncError> {
		let part = reqwest::multipart::Part::bytes(upload.bytes)
			.file_name(upload.file_name)
			.mime_str(&upload.mime)
			.map_err(|e| network(url, e))?;
		let form = reqwest::multipart::Form::new().part("file", part);
		let sent = self.client.post(url).multipart(form).send().await;
		Self::finish(url, sent).await
	}
}
