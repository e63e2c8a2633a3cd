//! Binds tab selection to exactly one running loader or detector.
//!
//! Every selection stops all detectors, bumps the render epoch and then
//! either spawns a one-time load or starts the new view's detector. Loads
//! still in flight from an older selection resolve into a stale
//! [`ViewSink`] and never reach the screen.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::future::Future;
use std::rc::{Rc, Weak};
use std::time::Duration;

use futures::future::{AbortHandle, FutureExt, abortable};
use futures::task::{LocalSpawn, LocalSpawnExt};
use log::{debug, info, warn};

use super::backend::{BackendClient, BriefReply, JobStatus};
use super::detector::{ChangeDetector, DetectorState};
use super::fetch::Fetcher;
use super::graph::GraphData;
use super::locator::IterationLocator;
use super::render::{GraphRenderer, ViewSink, present};
use super::runtime::Sleeper;
use super::transport::{FileUpload, Transport};
use super::view::{LoadReason, View, ViewLoader, ViewSource};
use crate::config::SyncConfig;
use crate::error::SyncError;

struct Poller {
	abort: AbortHandle,
	state: Rc<Cell<DetectorState>>,
}

impl Poller {
	fn stop(self) {
		self.abort.abort();
		self.state.set(DetectorState::Stopped);
	}
}

/// View lifecycle controller.
pub struct ViewController {
	loaders: HashMap<View, Rc<ViewLoader>>,
	backend: BackendClient,
	renderer: Rc<dyn GraphRenderer>,
	sleeper: Rc<dyn Sleeper>,
	spawner: Rc<dyn LocalSpawn>,
	brief: Rc<RefCell<Option<GraphData>>>,
	active: Cell<View>,
	epoch: Rc<Cell<u64>>,
	pollers: RefCell<HashMap<View, Poller>>,
	jobs: RefCell<HashMap<String, AbortHandle>>,
	job_interval: Duration,
}

impl ViewController {
	/// Controller for the backend described by `config`.
	pub fn new(
		config: &SyncConfig,
		transport: Rc<dyn Transport>,
		sleeper: Rc<dyn Sleeper>,
		spawner: Rc<dyn LocalSpawn>,
		renderer: Rc<dyn GraphRenderer>,
	) -> Rc<Self> {
		let fetcher = Rc::new(Fetcher::new(transport, sleeper.clone()));
		let brief = Rc::new(RefCell::new(None));

		let mtime_polled = |view: View| {
			let source = ViewSource::Mtime {
				graph_url: config.url(&format!("/graph/{view}")),
				mtime_url: config.url(&format!("/graph/{view}/mtime")),
				policy: config.graph_fetch.policy(),
			};
			ViewLoader::new(view, source, fetcher.clone()).polling(config.mtime_interval())
		};
		let context = ViewSource::Direct {
			url: config.url("/graph/context"),
			policy: config
				.context_fetch
				.policy()
				.allow_empty(true)
				.not_found_is_final(true),
		};
		let locator = IterationLocator::new(
			fetcher.clone(),
			&config.base_url,
			config.iterations,
			config.graph_fetch.policy(),
		)
		.with_ceiling(config.probe_ceiling);

		let loaders = [
			ViewLoader::new(View::None, ViewSource::Empty, fetcher.clone()),
			ViewLoader::new(View::Context, context, fetcher.clone()),
			mtime_polled(View::Massing),
			mtime_polled(View::Masterplan),
			ViewLoader::new(View::Brief, ViewSource::Cached(brief.clone()), fetcher.clone()),
			ViewLoader::new(View::Enriched, ViewSource::Iterations(locator), fetcher.clone())
				.polling(config.tag_interval()),
		]
		.into_iter()
		.map(|loader| (loader.view(), Rc::new(loader)))
		.collect();

		Rc::new(Self {
			loaders,
			backend: BackendClient::new(fetcher, &config.base_url),
			renderer,
			sleeper,
			spawner,
			brief,
			active: Cell::new(View::None),
			epoch: Rc::new(Cell::new(0)),
			pollers: RefCell::new(HashMap::new()),
			jobs: RefCell::new(HashMap::new()),
			job_interval: config.job_interval(),
		})
	}

	/// The selected view.
	pub fn active(&self) -> View {
		self.active.get()
	}

	/// The cached brief graph.
	pub fn brief_graph(&self) -> Option<GraphData> {
		self.brief.borrow().clone()
	}

	/// Views with a running detector.
	pub fn polling_views(&self) -> Vec<View> {
		self.pollers.borrow().keys().copied().collect()
	}

	/// State of `view`'s detector.
	pub fn detector_state(&self, view: View) -> DetectorState {
		self.pollers
			.borrow()
			.get(&view)
			.map_or(DetectorState::Stopped, |poller| poller.state.get())
	}

	/// Number of context jobs still being watched.
	pub fn watched_jobs(&self) -> usize {
		self.jobs.borrow().len()
	}

	/// Make `view` the displayed view.
	pub fn select(&self, view: View) {
		self.stop_all();
		self.epoch.set(self.epoch.get() + 1);
		self.active.set(view);
		info!("masterplan-graph: showing {}", view);

		let sink = ViewSink::new(self.renderer.clone(), self.epoch.clone(), view);
		let Some(loader) = self.loaders.get(&view).cloned() else {
			sink.clear();
			return;
		};
		match loader.poll_interval() {
			Some(interval) => self.start_detector(loader, interval, sink),
			None => self.spawn(async move {
				let loaded = loader.load(LoadReason::Initial).await;
				present(&sink, view, loaded);
			}),
		}
	}

	/// Load the selected view again from scratch.
	pub fn reload_active(&self) {
		self.select(self.active.get());
	}

	/// Stop `view`'s detector. No-op if it is not running.
	pub fn stop(&self, view: View) {
		let poller = self.pollers.borrow_mut().remove(&view);
		if let Some(poller) = poller {
			debug!("masterplan-graph: stopping {} detector", view);
			poller.stop();
		}
	}

	/// Stop every detector.
	pub fn stop_all(&self) {
		let pollers: Vec<_> = self.pollers.borrow_mut().drain().collect();
		for (view, poller) in pollers {
			debug!("masterplan-graph: stopping {} detector", view);
			poller.stop();
		}
	}

	/// Stop all background work and ignore loads still in flight.
	pub fn shutdown(&self) {
		self.stop_all();
		let jobs: Vec<_> = self.jobs.borrow_mut().drain().collect();
		for (job_id, abort) in jobs {
			debug!("masterplan-graph: abandoning context job {}", job_id);
			abort.abort();
		}
		self.epoch.set(self.epoch.get() + 1);
		info!("masterplan-graph: sync stopped");
	}

	/// Upload a brief document and cache the graph extracted from it.
	pub async fn upload_brief(&self, upload: FileUpload) -> Result<BriefReply, SyncError> {
		info!(
			"masterplan-graph: uploading {} ({} bytes)",
			upload.file_name,
			upload.bytes.len()
		);
		let reply = self.backend.upload_brief(upload).await?;
		if let Some(graph) = &reply.graph {
			*self.brief.borrow_mut() = Some(graph.clone());
			if self.active.get() == View::Brief {
				ViewSink::new(self.renderer.clone(), self.epoch.clone(), View::Brief)
					.render(graph.clone());
			}
		}
		Ok(reply)
	}

	/// Ask the backend to build the context graph and watch the job.
	pub async fn start_context_job(
		self: &Rc<Self>,
		lat: f64,
		lon: f64,
		radius_km: f64,
	) -> Result<String, SyncError> {
		let job_id = self.backend.start_context_job(lat, lon, radius_km).await?;
		info!("masterplan-graph: context job {} started", job_id);
		self.watch_context_job(job_id.clone());
		Ok(job_id)
	}

	/// Poll `job_id` until it ends; reload the context view when it finishes.
	pub fn watch_context_job(self: &Rc<Self>, job_id: String) {
		let controller = Rc::downgrade(self);
		let backend = self.backend.clone();
		let sleeper = self.sleeper.clone();
		let interval = self.job_interval;
		let id = job_id.clone();

		let (watch, abort) = abortable(async move {
			let status = loop {
				sleeper.sleep(interval).await;
				match backend.context_job_status(&id).await {
					Ok(JobStatus::Running) => continue,
					Ok(status) => break status,
					Err(err) => debug!("masterplan-graph: job {} status skipped: {}", id, err),
				}
			};
			job_ended(&controller, &id, status);
		});
		if let Some(previous) = self.jobs.borrow_mut().insert(job_id, abort) {
			previous.abort();
		}
		self.spawn(watch.map(|_| ()));
	}

	fn start_detector(&self, loader: Rc<ViewLoader>, interval: Duration, sink: ViewSink) {
		let view = loader.view();
		self.stop(view);

		let detector = ChangeDetector::new(loader, interval);
		let state = detector.state_handle();
		let (run, abort) = abortable(detector.run(Rc::new(sink), self.sleeper.clone()));
		self.pollers
			.borrow_mut()
			.insert(view, Poller { abort, state });
		self.spawn(run.map(|_| ()));
	}

	fn spawn(&self, task: impl Future<Output = ()> + 'static) {
		if let Err(err) = self.spawner.as_ref().spawn_local(task) {
			warn!("masterplan-graph: could not spawn task: {}", err);
		}
	}
}

fn job_ended(controller: &Weak<ViewController>, job_id: &str, status: JobStatus) {
	let Some(controller) = controller.upgrade() else {
		return;
	};
	controller.jobs.borrow_mut().remove(job_id);
	match status {
		JobStatus::Finished => {
			info!("masterplan-graph: context job {} finished", job_id);
			if controller.active() == View::Context {
				controller.reload_active();
			}
		}
		JobStatus::Failed(reason) => {
			warn!("masterplan-graph: context job {} failed: {}", job_id, reason);
		}
		JobStatus::Running => {}
	}
}

#[cfg(test)]
mod tests {
	use futures::executor::{LocalPool, block_on};
	use serde_json::{Value, json};

	use super::*;
	use crate::sync::testing::{Drawn, FakeBackend, ManualClock, RecordingRenderer};
	use crate::sync::transport::HttpReply;

	const CONTEXT: &str = "http://backend/graph/context";
	const MASSING: &str = "http://backend/graph/massing";
	const MASSING_MTIME: &str = "http://backend/graph/massing/mtime";
	const MASTERPLAN: &str = "http://backend/graph/masterplan";
	const MASTERPLAN_MTIME: &str = "http://backend/graph/masterplan/mtime";

	struct Harness {
		backend: Rc<FakeBackend>,
		clock: Rc<ManualClock>,
		renderer: Rc<RecordingRenderer>,
		pool: LocalPool,
		controller: Rc<ViewController>,
	}

	impl Harness {
		fn new() -> Self {
			let config = SyncConfig {
				base_url: "http://backend".into(),
				..SyncConfig::default()
			};
			let backend = FakeBackend::new();
			let clock = ManualClock::new();
			let renderer = RecordingRenderer::new();
			let pool = LocalPool::new();
			let controller = ViewController::new(
				&config,
				backend.clone(),
				clock.clone(),
				Rc::new(pool.spawner()),
				renderer.clone(),
			);
			Self {
				backend,
				clock,
				renderer,
				pool,
				controller,
			}
		}

		fn settle(&mut self) {
			self.pool.run_until_stalled();
		}

		fn tick(&mut self, ms: u64) {
			self.clock.advance(Duration::from_millis(ms));
			self.settle();
		}
	}

	fn graph(ids: &[&str]) -> Value {
		json!({"nodes": ids.iter().map(|id| json!({"id": id})).collect::<Vec<_>>(), "edges": []})
	}

	fn brief_upload() -> FileUpload {
		FileUpload {
			file_name: "brief.txt".into(),
			mime: "text/plain".into(),
			bytes: b"four courtyards".to_vec(),
		}
	}

	#[test]
	fn switching_views_leaves_one_detector() {
		let mut h = Harness::new();
		h.backend.respond_json(MASSING_MTIME, json!({"mtime": 1.0}));
		h.backend.respond_json(MASSING, graph(&["m"]));
		h.backend.respond_json(MASTERPLAN_MTIME, json!({"mtime": 1.0}));
		h.backend.respond_json(MASTERPLAN, graph(&["p"]));

		h.controller.select(View::Massing);
		h.settle();
		assert_eq!(h.controller.polling_views(), vec![View::Massing]);
		assert_eq!(h.controller.detector_state(View::Massing), DetectorState::Polling);

		h.controller.select(View::Masterplan);
		h.settle();
		assert_eq!(h.controller.polling_views(), vec![View::Masterplan]);

		let massing_polls = h.backend.hits(MASSING_MTIME);
		h.backend.respond_json(MASSING_MTIME, json!({"mtime": 2.0}));
		h.tick(2500);
		h.tick(2500);

		assert_eq!(h.controller.detector_state(View::Massing), DetectorState::Stopped);
		assert_eq!(h.backend.hits(MASSING_MTIME), massing_polls);
		assert_eq!(h.backend.hits(MASSING), 1);
		assert_eq!(h.backend.hits(MASTERPLAN_MTIME), 3);
	}

	#[test]
	fn enriched_view_polls_alone() {
		let mut h = Harness::new();
		h.backend.respond_json(MASSING_MTIME, json!({"mtime": 1.0}));
		h.backend.respond_json(MASSING, graph(&["m"]));
		for n in 1..=2 {
			h.backend.respond_json(
				&format!("http://backend/enriched_graph/iteration/it{n}.json"),
				graph(&["e1", "e2"][..n]),
			);
		}

		h.controller.select(View::Massing);
		h.settle();
		h.controller.select(View::Enriched);
		h.settle();

		assert_eq!(h.controller.polling_views(), vec![View::Enriched]);
		assert_eq!(h.controller.detector_state(View::Enriched), DetectorState::Polling);
		assert_eq!(h.controller.detector_state(View::Massing), DetectorState::Stopped);
		match h.renderer.last() {
			Some(Drawn::Graph(shown)) => assert_eq!(shown.nodes.len(), 2),
			other => panic!("expected the enriched graph, got {other:?}"),
		}
	}

	#[test]
	fn missing_context_clears_without_retrying() {
		let mut h = Harness::new();

		h.controller.select(View::Context);
		h.settle();

		assert_eq!(h.renderer.calls(), vec![Drawn::Cleared]);
		assert_eq!(h.backend.requests(), vec![CONTEXT.to_string()]);
		assert!(h.controller.polling_views().is_empty());
	}

	#[test]
	fn brief_view_shows_the_uploaded_graph() {
		let mut h = Harness::new();
		h.controller.select(View::Brief);
		h.settle();
		assert_eq!(h.renderer.last(), Some(Drawn::Cleared));

		h.backend.respond_json(
			"http://backend/upload_brief",
			json!({"chat_notice": "Brief parsed", "graph": graph(&["b1", "b2"])}),
		);
		let reply = block_on(h.controller.upload_brief(brief_upload())).unwrap();

		assert_eq!(reply.chat_notice.as_deref(), Some("Brief parsed"));
		assert_eq!(h.renderer.renders(), 1);
		assert_eq!(h.controller.brief_graph().map(|g| g.nodes.len()), Some(2));
		assert!(h.controller.polling_views().is_empty());
	}

	#[test]
	fn upload_while_elsewhere_only_caches() {
		let mut h = Harness::new();
		h.controller.select(View::Context);
		h.settle();
		h.renderer.reset();

		h.backend.respond_json(
			"http://backend/upload_brief",
			json!({"message": "ok", "graph": graph(&["b1"])}),
		);
		block_on(h.controller.upload_brief(brief_upload())).unwrap();
		assert!(h.renderer.calls().is_empty());

		h.controller.select(View::Brief);
		h.settle();
		assert_eq!(h.renderer.renders(), 1);
	}

	#[test]
	fn stale_loads_never_render() {
		let mut h = Harness::new();
		h.backend.queue(CONTEXT, HttpReply::new(503, ""));
		h.backend.respond_json(CONTEXT, graph(&["c"]));
		h.backend.respond_json(MASSING_MTIME, json!({"mtime": 1.0}));
		h.backend.respond_json(MASSING, graph(&["m"]));

		// The context load is parked in its retry backoff when the user moves on.
		h.controller.select(View::Context);
		h.settle();
		h.controller.select(View::Massing);
		h.settle();
		h.tick(300);

		assert_eq!(h.backend.hits(CONTEXT), 2);
		let drawn = h.renderer.calls();
		assert_eq!(drawn.len(), 1);
		assert!(matches!(&drawn[0], Drawn::Graph(g) if g.nodes[0].id().as_deref() == Some("m")));
	}

	#[test]
	fn shutdown_stops_all_background_work() {
		let mut h = Harness::new();
		h.backend.respond_json(MASSING_MTIME, json!({"mtime": 1.0}));
		h.backend.respond_json(MASSING, graph(&["m"]));
		h.controller.select(View::Massing);
		h.settle();
		h.controller.watch_context_job("j-1".into());
		assert_eq!(h.controller.watched_jobs(), 1);

		h.controller.shutdown();
		h.settle();
		let seen = h.backend.requests().len();
		h.tick(10_000);

		assert!(h.controller.polling_views().is_empty());
		assert_eq!(h.controller.watched_jobs(), 0);
		assert_eq!(h.backend.requests().len(), seen);
	}

	#[test]
	fn finished_context_job_reloads_the_context_view() {
		let mut h = Harness::new();
		let status = "http://backend/osm/status/j-7";
		h.backend
			.respond_json("http://backend/osm/run", json!({"ok": true, "job_id": "j-7"}));
		h.backend.respond_json(status, json!({"ok": true, "status": "running"}));
		h.controller.select(View::Context);
		h.settle();

		let job = block_on(h.controller.start_context_job(41.4, 2.2, 0.5)).unwrap();
		assert_eq!(job, "j-7");
		h.settle();
		h.tick(2000);
		assert_eq!(h.backend.hits(status), 1);
		assert_eq!(h.renderer.renders(), 0);

		h.backend.respond_json(CONTEXT, graph(&["street"]));
		h.backend.respond_json(status, json!({"ok": true, "status": "finished"}));
		h.tick(2000);

		assert_eq!(h.renderer.renders(), 1);
		assert_eq!(h.controller.watched_jobs(), 0);
	}

	#[test]
	fn failed_context_job_stops_watching() {
		let mut h = Harness::new();
		let status = "http://backend/osm/status/j-2";
		h.backend.respond_network_error(status);
		h.controller.watch_context_job("j-2".into());
		h.settle();
		h.tick(2000);
		assert_eq!(h.controller.watched_jobs(), 1);

		h.backend
			.respond_json(status, json!({"ok": false, "error": "unknown job"}));
		h.tick(2000);
		h.tick(2000);

		assert_eq!(h.controller.watched_jobs(), 0);
		assert_eq!(h.backend.hits(status), 2);
	}
}
