//! Background change detection for one view.
//!
//! A detector seeds itself with the view's current revision, then polls the
//! revision signal on a fixed interval and reloads only when it changes. A
//! failed poll is not an error: the next tick simply tries again.

use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;

use log::{debug, info};

use super::graph::GraphData;
use super::render::{GraphRenderer, Shown, present};
use super::revision::Revision;
use super::runtime::Sleeper;
use super::view::{LoadReason, ViewLoader};

/// Lifecycle of a detector.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DetectorState {
	/// Not running.
	#[default]
	Stopped,
	/// Revision seeded, first load in progress.
	Seeded,
	/// Ticking.
	Polling,
}

/// What a single tick did.
#[derive(Clone, Debug, PartialEq)]
pub enum TickOutcome {
	/// Same revision as before.
	Unchanged,
	/// The backend reported no revision.
	NoSignal,
	/// The revision query failed; retried on the next tick.
	Skipped,
	/// Revision changed and the new graph was rendered.
	Reloaded,
	/// Revision changed but there is nothing to show; the view was cleared.
	Cleared,
	/// Revision changed but the reload failed; the view was cleared.
	ReloadFailed,
}

/// Change detector for one view.
pub struct ChangeDetector {
	loader: Rc<ViewLoader>,
	interval: Duration,
	last: Revision,
	state: Rc<Cell<DetectorState>>,
}

impl ChangeDetector {
	/// Detector polling `loader` every `interval`.
	pub fn new(loader: Rc<ViewLoader>, interval: Duration) -> Self {
		Self {
			loader,
			interval,
			last: Revision::Unset,
			state: Rc::new(Cell::new(DetectorState::Stopped)),
		}
	}

	/// Shared handle to the detector's state, readable after it is moved into a task.
	pub fn state_handle(&self) -> Rc<Cell<DetectorState>> {
		self.state.clone()
	}

	/// Current state.
	pub fn state(&self) -> DetectorState {
		self.state.get()
	}

	/// Last revision seen.
	pub fn last_revision(&self) -> &Revision {
		&self.last
	}

	/// Record the current revision without reloading.
	///
	/// A failed query leaves the revision unset so that the first successful
	/// tick counts as a change. Returns the graph if the query produced one.
	pub async fn seed(&mut self) -> Option<GraphData> {
		self.last = Revision::Unset;
		let observed = match self.loader.observe().await {
			Ok(Some(observation)) => {
				self.last = observation.revision;
				observation.graph
			}
			Ok(None) => None,
			Err(err) => {
				debug!("masterplan-graph: seeding {} failed: {}", self.loader.view(), err);
				None
			}
		};
		self.state.set(DetectorState::Seeded);
		observed
	}

	/// Poll once and reload on change.
	pub async fn tick(&mut self, sink: &dyn GraphRenderer) -> TickOutcome {
		let view = self.loader.view();
		let observation = match self.loader.observe().await {
			Ok(Some(observation)) => observation,
			Ok(None) => return TickOutcome::NoSignal,
			Err(err) => {
				debug!("masterplan-graph: {} poll skipped: {}", view, err);
				return TickOutcome::Skipped;
			}
		};
		if observation.revision == self.last {
			return TickOutcome::Unchanged;
		}

		info!(
			"masterplan-graph: {} changed ({} -> {})",
			view, self.last, observation.revision
		);
		self.last = observation.revision;
		let loaded = match observation.graph {
			Some(graph) => Ok(Some(graph)),
			None => self.loader.load(LoadReason::Changed).await,
		};
		match present(sink, view, loaded) {
			Shown::Graph => TickOutcome::Reloaded,
			Shown::Nothing => TickOutcome::Cleared,
			Shown::Failed => TickOutcome::ReloadFailed,
		}
	}

	/// Seed, show the current graph, then tick forever.
	///
	/// Each tick is awaited before the next sleep starts, so reloads of one
	/// view never overlap. The future ends only when dropped.
	pub async fn run(mut self, sink: Rc<dyn GraphRenderer>, sleeper: Rc<dyn Sleeper>) {
		let view = self.loader.view();
		let initial = match self.seed().await {
			Some(graph) => Ok(Some(graph)),
			None => self.loader.load(LoadReason::Initial).await,
		};
		present(sink.as_ref(), view, initial);

		self.state.set(DetectorState::Polling);
		debug!(
			"masterplan-graph: polling {} every {:?}",
			view, self.interval
		);
		loop {
			sleeper.sleep(self.interval).await;
			self.tick(sink.as_ref()).await;
		}
	}
}

impl Drop for ChangeDetector {
	fn drop(&mut self) {
		self.state.set(DetectorState::Stopped);
	}
}
