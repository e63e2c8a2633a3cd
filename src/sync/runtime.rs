//! Timer and task-spawning seams for the single-threaded browser event loop.

use std::time::Duration;

use futures::channel::oneshot;
use futures::future::{FutureExt, LocalBoxFuture};
use futures::task::{LocalFutureObj, LocalSpawn, SpawnError};
use leptos::prelude::set_timeout;

/// Produces futures that complete after a delay.
pub trait Sleeper {
	/// Resolve after `duration`.
	fn sleep(&self, duration: Duration) -> LocalBoxFuture<'static, ()>;
}

/// Sleeper backed by the browser's `setTimeout`.
#[derive(Clone, Copy, Debug, Default)]
pub struct BrowserTimer;

impl Sleeper for BrowserTimer {
	fn sleep(&self, duration: Duration) -> LocalBoxFuture<'static, ()> {
		let (fire, fired) = oneshot::channel::<()>();
		set_timeout(
			move || {
				let _ = fire.send(());
			},
			duration,
		);
		async move {
			let _ = fired.await;
		}
		.boxed_local()
	}
}

/// Spawns local tasks on the Leptos executor.
#[derive(Clone, Copy, Debug, Default)]
pub struct BrowserSpawner;

impl LocalSpawn for BrowserSpawner {
	fn spawn_local_obj(&self, future: LocalFutureObj<'static, ()>) -> Result<(), SpawnError> {
		leptos::task::spawn_local(future);
		Ok(())
	}
}
