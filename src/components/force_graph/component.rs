//! Leptos component wrapping the force-directed graph canvas.
//!
//! The canvas, its event handlers and the `requestAnimationFrame` loop are set
//! up once on mount. Graph changes arrive through the `data` signal and only
//! swap the simulation's contents, so a polled view can update many times
//! without re-creating the animation loop.

use std::cell::RefCell;
use std::rc::Rc;

use leptos::prelude::*;
use log::warn;
use wasm_bindgen::prelude::*;
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement, MouseEvent, WheelEvent, Window};

use super::render;
use super::state::ForceGraphState;
use super::theme::Theme;
use crate::sync::{GraphData, GraphRenderer};

const FRAME_DT: f32 = 0.016;

type FrameHook = Rc<RefCell<Option<Closure<dyn FnMut()>>>>;

/// Renders an interactive force-directed graph on a canvas element.
///
/// `None` shows an empty canvas with a placeholder. The component sizes itself
/// to its parent by default; `fullscreen = true` fills the viewport and follows
/// window resizes. Explicit `width`/`height` override automatic sizing.
#[component]
pub fn ForceGraphCanvas(
	#[prop(into)] data: Signal<Option<GraphData>>,
	#[prop(default = false)] fullscreen: bool,
	#[prop(default = None)] width: Option<f64>,
	#[prop(default = None)] height: Option<f64>,
) -> impl IntoView {
	let canvas_ref = NodeRef::<leptos::html::Canvas>::new();
	let state: Rc<RefCell<Option<ForceGraphState>>> = Rc::new(RefCell::new(None));
	let theme = Rc::new(Theme::default());
	let frame: FrameHook = Rc::new(RefCell::new(None));
	let on_resize: FrameHook = Rc::new(RefCell::new(None));

	let (state_mount, theme_mount) = (state.clone(), theme.clone());
	Effect::new(move |_| {
		let Some(canvas) = canvas_ref.get() else {
			return;
		};
		if state_mount.borrow().is_some() {
			return;
		}
		let canvas: HtmlCanvasElement = canvas.into();
		let Some(window) = web_sys::window() else {
			return;
		};
		let (w, h) = if fullscreen {
			window_size(&window)
		} else {
			let parent = canvas.parent_element();
			let parent_w = parent.as_ref().map_or(800.0, |p| p.client_width() as f64);
			let parent_h = parent.as_ref().map_or(600.0, |p| p.client_height() as f64);
			(width.unwrap_or(parent_w), height.unwrap_or(parent_h))
		};
		canvas.set_width(w as u32);
		canvas.set_height(h as u32);

		let Some(ctx) = context_2d(&canvas) else {
			warn!("masterplan-graph: canvas has no 2d context");
			return;
		};
		*state_mount.borrow_mut() = Some(match data.get_untracked() {
			Some(graph) => ForceGraphState::new(&graph, w, h, &theme_mount),
			None => ForceGraphState::empty(w, h),
		});

		if fullscreen {
			let state_resize = state_mount.clone();
			let canvas_resize = canvas.clone();
			*on_resize.borrow_mut() = Some(Closure::new(move || {
				let Some(window) = web_sys::window() else {
					return;
				};
				let (nw, nh) = window_size(&window);
				canvas_resize.set_width(nw as u32);
				canvas_resize.set_height(nh as u32);
				if let Some(state) = state_resize.borrow_mut().as_mut() {
					state.resize(nw, nh);
				}
			}));
			if let Some(cb) = on_resize.borrow().as_ref() {
				let _ =
					window.add_event_listener_with_callback("resize", cb.as_ref().unchecked_ref());
			}
		}

		let (state_frame, theme_frame, next) =
			(state_mount.clone(), theme_mount.clone(), frame.clone());
		*frame.borrow_mut() = Some(Closure::new(move || {
			if let Some(state) = state_frame.borrow_mut().as_mut() {
				state.tick(FRAME_DT);
				render::render(state, &ctx, &theme_frame);
			}
			if let (Some(window), Some(cb)) = (web_sys::window(), next.borrow().as_ref()) {
				let _ = window.request_animation_frame(cb.as_ref().unchecked_ref());
			}
		}));
		if let Some(cb) = frame.borrow().as_ref() {
			let _ = window.request_animation_frame(cb.as_ref().unchecked_ref());
		}
	});

	let (state_swap, theme_swap) = (state.clone(), theme);
	Effect::new(move |_| {
		let graph = data.get();
		if let Some(state) = state_swap.borrow_mut().as_mut() {
			state.replace(graph.as_ref(), &theme_swap);
		}
	});

	let state_down = state.clone();
	let on_mousedown = move |ev: MouseEvent| {
		let Some((x, y)) = local_point(canvas_ref, ev.client_x(), ev.client_y()) else {
			return;
		};
		if let Some(state) = state_down.borrow_mut().as_mut() {
			state.press(x, y);
		}
	};

	let state_move = state.clone();
	let on_mousemove = move |ev: MouseEvent| {
		let Some((x, y)) = local_point(canvas_ref, ev.client_x(), ev.client_y()) else {
			return;
		};
		if let Some(state) = state_move.borrow_mut().as_mut() {
			state.drag_to(x, y);
		}
	};

	let state_up = state.clone();
	let on_mouseup = move |_: MouseEvent| {
		if let Some(state) = state_up.borrow_mut().as_mut() {
			state.release();
		}
	};

	let state_leave = state.clone();
	let on_mouseleave = move |_: MouseEvent| {
		if let Some(state) = state_leave.borrow_mut().as_mut() {
			state.leave();
		}
	};

	let on_wheel = move |ev: WheelEvent| {
		ev.prevent_default();
		let Some((x, y)) = local_point(canvas_ref, ev.client_x(), ev.client_y()) else {
			return;
		};
		if let Some(state) = state.borrow_mut().as_mut() {
			let factor = if ev.delta_y() > 0.0 { 0.9 } else { 1.1 };
			state.zoom_at(x, y, factor);
		}
	};

	view! {
		<canvas
			node_ref=canvas_ref
			class="force-graph-canvas"
			on:mousedown=on_mousedown
			on:mousemove=on_mousemove
			on:mouseup=on_mouseup
			on:mouseleave=on_mouseleave
			on:wheel=on_wheel
			style="display: block; cursor: grab;"
		/>
	}
}

fn window_size(window: &Window) -> (f64, f64) {
	let dim = |v: Result<JsValue, JsValue>, fallback: f64| {
		v.ok().and_then(|v| v.as_f64()).unwrap_or(fallback)
	};
	(dim(window.inner_width(), 800.0), dim(window.inner_height(), 600.0))
}

fn context_2d(canvas: &HtmlCanvasElement) -> Option<CanvasRenderingContext2d> {
	canvas.get_context("2d").ok().flatten()?.dyn_into().ok()
}

fn local_point(
	canvas_ref: NodeRef<leptos::html::Canvas>,
	client_x: i32,
	client_y: i32,
) -> Option<(f64, f64)> {
	let canvas: HtmlCanvasElement = canvas_ref.get()?.into();
	let rect = canvas.get_bounding_client_rect();
	Some((client_x as f64 - rect.left(), client_y as f64 - rect.top()))
}

/// [`GraphRenderer`] that publishes into a signal read by [`ForceGraphCanvas`].
#[derive(Clone, Copy)]
pub struct SignalRenderer {
	graph: RwSignal<Option<GraphData>>,
}

impl SignalRenderer {
	/// Renderer writing to `graph`.
	pub fn new(graph: RwSignal<Option<GraphData>>) -> Self {
		Self { graph }
	}
}

impl GraphRenderer for SignalRenderer {
	fn render(&self, graph: GraphData) {
		self.graph.set(Some(graph));
	}

	fn clear(&self) {
		self.graph.set(None);
	}
}
