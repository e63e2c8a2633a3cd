//! Form that asks the backend to build the site context graph.

use std::rc::Rc;

use leptos::prelude::*;
use leptos::task::spawn_local;
use log::warn;
use web_sys::{HtmlInputElement, MouseEvent};

use crate::sync::ViewController;

fn field(node: NodeRef<leptos::html::Input>) -> Option<f64> {
	let input: HtmlInputElement = node.get()?.into();
	input.value().trim().parse().ok()
}

/// Latitude, longitude and radius inputs plus a start button.
#[component]
pub fn ContextJobForm(controller: Rc<ViewController>) -> impl IntoView {
	let lat_ref = NodeRef::<leptos::html::Input>::new();
	let lon_ref = NodeRef::<leptos::html::Input>::new();
	let radius_ref = NodeRef::<leptos::html::Input>::new();
	let status = RwSignal::new(None::<String>);

	let on_start = move |_: MouseEvent| {
		let (Some(lat), Some(lon), Some(radius_km)) =
			(field(lat_ref), field(lon_ref), field(radius_ref))
		else {
			status.set(Some("Enter numeric latitude, longitude and radius".into()));
			return;
		};
		let controller = controller.clone();
		status.set(Some("Starting context job".into()));
		spawn_local(async move {
			let text = match controller.start_context_job(lat, lon, radius_km).await {
				Ok(job_id) => format!("Context job {job_id} running"),
				Err(err) => {
					warn!("masterplan-graph: {}", err);
					err.to_string()
				}
			};
			status.set(Some(text));
		});
	};

	view! {
		<div class="context-job">
			<input node_ref=lat_ref type="text" placeholder="lat" />
			<input node_ref=lon_ref type="text" placeholder="lon" />
			<input node_ref=radius_ref type="text" placeholder="radius km" value="0.5" />
			<button on:click=on_start>"Fetch site context"</button>
			<p class="job-status">{move || status.get()}</p>
		</div>
	}
}
