//! masterplan-graph: graph views for the masterplanning copilot.
//!
//! Renders the site context, massing, masterplan, brief and enriched
//! knowledge graphs served by the local backend, and keeps the displayed
//! view in step with the backend as its files change.

use std::rc::Rc;

use leptos::ev;
use leptos::prelude::*;
use leptos_meta::*;
use log::{Level, info, warn};
use wasm_bindgen::JsCast;
use web_sys::{HtmlScriptElement, Window};

pub mod components;
pub mod config;
pub mod error;
pub mod sync;

pub use components::{BriefUpload, ContextJobForm, ForceGraphCanvas, SignalRenderer, ViewTabs};
pub use config::SyncConfig;
pub use error::SyncError;
pub use sync::{GraphData, View, ViewController};

use sync::{BrowserSpawner, BrowserTimer, HttpTransport};

/// Initialize logging and panic hooks for the WASM target.
pub fn init_logging() {
	let _ = console_log::init_with_level(Level::Debug);
	console_error_panic_hook::set_once();
	info!("masterplan-graph: logging initialized");
}

fn config_text() -> Option<String> {
	let window: Window = web_sys::window()?;
	let element = window.document()?.get_element_by_id("sync-config")?;
	let script: HtmlScriptElement = element.dyn_into().ok()?;
	script.text().ok()
}

/// Read settings from a script element with id="sync-config".
/// Missing or malformed settings fall back to the defaults.
fn load_sync_config() -> SyncConfig {
	let Some(text) = config_text() else {
		info!("masterplan-graph: no sync config, using defaults");
		return SyncConfig::default();
	};
	match SyncConfig::from_json(&text) {
		Ok(config) => {
			info!(
				"masterplan-graph: backend {}, initial view {}",
				config.base_url, config.initial_view
			);
			config
		}
		Err(e) => {
			warn!("masterplan-graph: failed to parse sync config: {}", e);
			SyncConfig::default()
		}
	}
}

/// Main application component.
/// Wires the view controller to the canvas, tabs and side panels.
#[component]
pub fn App() -> impl IntoView {
	provide_meta_context();

	let config = load_sync_config();
	let graph = RwSignal::new(None::<GraphData>);
	let active = RwSignal::new(View::None);

	let controller = ViewController::new(
		&config,
		Rc::new(HttpTransport::new()),
		Rc::new(BrowserTimer),
		Rc::new(BrowserSpawner),
		Rc::new(SignalRenderer::new(graph)),
	);

	let select: Rc<dyn Fn(View)> = {
		let controller = controller.clone();
		Rc::new(move |view| {
			controller.select(view);
			active.set(view);
		})
	};
	select(config.initial_view);

	// No timers may outlive the page.
	let teardown = controller.clone();
	let _ = window_event_listener(ev::beforeunload, move |_| teardown.shutdown());

	view! {
		<Html attr:lang="en" attr:dir="ltr" attr:data-theme="dark" />
		<Title text="Masterplan Graph" />
		<Meta charset="UTF-8" />
		<Meta name="viewport" content="width=device-width, initial-scale=1.0" />

		<div class="fullscreen-graph">
			<ForceGraphCanvas data=graph fullscreen=true />
			<div class="graph-overlay">
				<h1>"Masterplan"</h1>
				<ViewTabs active=active on_select=select />
				<p class="subtitle">"Drag nodes to reposition. Scroll to zoom. Drag background to pan."</p>
			</div>
			<aside class="side-panel">
				<BriefUpload controller=controller.clone() />
				<ContextJobForm controller=controller />
			</aside>
		</div>
	}
}
