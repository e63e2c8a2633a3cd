//! File picker that sends a brief to the backend.

use std::rc::Rc;

use js_sys::Uint8Array;
use leptos::prelude::*;
use leptos::task::spawn_local;
use log::warn;
use wasm_bindgen_futures::JsFuture;
use web_sys::{Event, File, HtmlInputElement};

use crate::error::SyncError;
use crate::sync::{FileUpload, ViewController};

/// Uploads the chosen file and shows the backend's notice.
#[component]
pub fn BriefUpload(controller: Rc<ViewController>) -> impl IntoView {
	let input_ref = NodeRef::<leptos::html::Input>::new();
	let notice = RwSignal::new(None::<String>);
	let busy = RwSignal::new(false);

	let on_change = move |_: Event| {
		let Some(input) = input_ref.get() else {
			return;
		};
		let input: HtmlInputElement = input.into();
		let Some(file) = input.files().and_then(|files| files.get(0)) else {
			return;
		};
		let controller = controller.clone();
		busy.set(true);
		spawn_local(async move {
			let outcome = match read_file(&file).await {
				Ok(upload) => controller.upload_brief(upload).await,
				Err(err) => Err(err),
			};
			let text = match outcome {
				Ok(reply) => reply
					.chat_notice
					.unwrap_or_else(|| format!("{} uploaded", file.name())),
				Err(err) => {
					warn!("masterplan-graph: {}", err);
					err.to_string()
				}
			};
			notice.set(Some(text));
			busy.set(false);
		});
	};

	view! {
		<div class="brief-upload">
			<label>
				"Brief "
				<input
					node_ref=input_ref
					type="file"
					accept=".pdf,.txt,.md,.json"
					prop:disabled=move || busy.get()
					on:change=on_change
				/>
			</label>
			<p class="chat-notice">{move || notice.get()}</p>
		</div>
	}
}

async fn read_file(file: &File) -> Result<FileUpload, SyncError> {
	let buffer = JsFuture::from(file.array_buffer())
		.await
		.map_err(|e| SyncError::Upload {
			reason: format!("could not read {}: {:?}", file.name(), e),
		})?;
	Ok(FileUpload {
		file_name: file.name(),
		mime: file.type_(),
		bytes: Uint8Array::new(&buffer).to_vec(),
	})
}
