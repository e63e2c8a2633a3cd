//! Test doubles for the sync layer: a scripted backend, two clocks and a
//! renderer that records what it was asked to draw.

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;
use std::time::Duration;

use async_trait::async_trait;
use futures::channel::oneshot;
use futures::future::{self, FutureExt, LocalBoxFuture};
use serde_json::Value;

use super::graph::GraphData;
use super::render::GraphRenderer;
use super::runtime::Sleeper;
use super::transport::{FileUpload, HttpReply, Transport};
use crate::error::SyncError;

type Scripted = Result<HttpReply, String>;

/// Backend whose replies are scripted per URL.
///
/// Queued replies are consumed first, then the standing reply is repeated.
/// Unknown URLs answer 404.
#[derive(Default)]
pub(crate) struct FakeBackend {
	queued: RefCell<HashMap<String, VecDeque<Scripted>>>,
	standing: RefCell<HashMap<String, Scripted>>,
	log: RefCell<Vec<String>>,
	uploads: RefCell<Vec<FileUpload>>,
	posted: RefCell<Vec<(String, Value)>>,
}

impl FakeBackend {
	pub(crate) fn new() -> Rc<Self> {
		Rc::new(Self::default())
	}

	/// Answer every later request to `url` with `reply`.
	pub(crate) fn respond(&self, url: &str, reply: HttpReply) {
		self.standing.borrow_mut().insert(url.to_string(), Ok(reply));
	}

	pub(crate) fn respond_json(&self, url: &str, value: Value) {
		self.respond(url, HttpReply::json(&value));
	}

	/// Fail every later request to `url` at the transport level.
	pub(crate) fn respond_network_error(&self, url: &str) {
		self.standing
			.borrow_mut()
			.insert(url.to_string(), Err("connection refused".into()));
	}

	/// Answer the next request to `url` with `reply`.
	pub(crate) fn queue(&self, url: &str, reply: HttpReply) {
		self.push(url, Ok(reply));
	}

	pub(crate) fn queue_network_error(&self, url: &str) {
		self.push(url, Err("connection reset".into()));
	}

	/// Number of requests made to `url`.
	pub(crate) fn hits(&self, url: &str) -> usize {
		self.log.borrow().iter().filter(|u| *u == url).count()
	}

	pub(crate) fn requests(&self) -> Vec<String> {
		self.log.borrow().clone()
	}

	pub(crate) fn uploads(&self) -> Vec<FileUpload> {
		self.uploads.borrow().clone()
	}

	pub(crate) fn posted(&self) -> Vec<(String, Value)> {
		self.posted.borrow().clone()
	}

	fn push(&self, url: &str, reply: Scripted) {
		self.queued
			.borrow_mut()
			.entry(url.to_string())
			.or_default()
			.push_back(reply);
	}

	fn reply(&self, url: &str) -> Result<HttpReply, SyncError> {
		self.log.borrow_mut().push(url.to_string());
		let queued = self
			.queued
			.borrow_mut()
			.get_mut(url)
			.and_then(VecDeque::pop_front);
		let scripted = queued
			.or_else(|| self.standing.borrow().get(url).cloned())
			.unwrap_or_else(|| Ok(HttpReply::new(404, "")));
		scripted.map_err(|reason| SyncError::Network {
			url: url.to_string(),
			reason,
		})
	}
}

#[async_trait(?Send)]
impl Transport for FakeBackend {
	async fn get(&self, url: &str) -> Result<HttpReply, SyncError> {
		self.reply(url)
	}

	async fn post_json(&self, url: &str, body: &Value) -> Result<HttpReply, SyncError> {
		self.posted.borrow_mut().push((url.to_string(), body.clone()));
		self.reply(url)
	}

	async fn post_file(&self, url: &str, upload: FileUpload) -> Result<HttpReply, SyncError> {
		self.uploads.borrow_mut().push(upload);
		self.reply(url)
	}
}

/// Sleeper that resolves at once and remembers what it was asked for.
#[derive(Default)]
pub(crate) struct InstantSleeper {
	delays: RefCell<Vec<Duration>>,
}

impl InstantSleeper {
	pub(crate) fn new() -> Rc<Self> {
		Rc::new(Self::default())
	}

	pub(crate) fn delays(&self) -> Vec<Duration> {
		self.delays.borrow().clone()
	}
}

impl Sleeper for InstantSleeper {
	fn sleep(&self, duration: Duration) -> LocalBoxFuture<'static, ()> {
		self.delays.borrow_mut().push(duration);
		future::ready(()).boxed_local()
	}
}

/// Sleeper whose timers fire only when the test advances time.
#[derive(Default)]
pub(crate) struct ManualClock {
	now: Cell<Duration>,
	timers: RefCell<Vec<(Duration, oneshot::Sender<()>)>>,
}

impl ManualClock {
	pub(crate) fn new() -> Rc<Self> {
		Rc::new(Self::default())
	}

	/// Move time forward, firing every timer that falls due.
	pub(crate) fn advance(&self, by: Duration) {
		let now = self.now.get() + by;
		self.now.set(now);
		let due: Vec<_> = {
			let mut timers = self.timers.borrow_mut();
			let (due, pending): (Vec<_>, Vec<_>) =
				timers.drain(..).partition(|(deadline, _)| *deadline <= now);
			*timers = pending;
			due
		};
		for (_, fire) in due {
			let _ = fire.send(());
		}
	}

	pub(crate) fn pending(&self) -> usize {
		self.timers.borrow().len()
	}
}

impl Sleeper for ManualClock {
	fn sleep(&self, duration: Duration) -> LocalBoxFuture<'static, ()> {
		let (fire, fired) = oneshot::channel();
		self.timers
			.borrow_mut()
			.push((self.now.get() + duration, fire));
		async move {
			let _ = fired.await;
		}
		.boxed_local()
	}
}

/// One call made to a [`RecordingRenderer`].
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum Drawn {
	Graph(GraphData),
	Cleared,
}

/// Renderer that records every call.
#[derive(Default)]
pub(crate) struct RecordingRenderer {
	calls: RefCell<Vec<Drawn>>,
}

impl RecordingRenderer {
	pub(crate) fn new() -> Rc<Self> {
		Rc::new(Self::default())
	}

	pub(crate) fn calls(&self) -> Vec<Drawn> {
		self.calls.borrow().clone()
	}

	pub(crate) fn renders(&self) -> usize {
		self.calls
			.borrow()
			.iter()
			.filter(|c| matches!(c, Drawn::Graph(_)))
			.count()
	}

	pub(crate) fn last(&self) -> Option<Drawn> {
		self.calls.borrow().last().cloned()
	}

	pub(crate) fn reset(&self) {
		self.calls.borrow_mut().clear();
	}
}

impl GraphRenderer for RecordingRenderer {
	fn render(&self, graph: GraphData) {
		self.calls.borrow_mut().push(Drawn::Graph(graph));
	}

	fn clear(&self) {
		self.calls.borrow_mut().push(Drawn::Cleared);
	}
}
