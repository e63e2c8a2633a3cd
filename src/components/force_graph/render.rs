//! Canvas drawing.
//!
//! One frame is background, then edges, then nodes in two passes so the
//! hovered neighborhood sits on top of everything else.

use std::f64::consts::PI;

use web_sys::CanvasRenderingContext2d;

use super::state::{ForceGraphState, NODE_RADIUS, NodeInfo};
use super::theme::Theme;

/// Zoom below which labels are only drawn for the hovered neighborhood.
const LABEL_ZOOM: f64 = 0.8;
const ARROW: f64 = 5.0;

/// Draw one frame.
pub fn render(state: &ForceGraphState, ctx: &CanvasRenderingContext2d, theme: &Theme) {
	ctx.set_fill_style_str(&theme.background.to_css());
	ctx.fill_rect(0.0, 0.0, state.width, state.height);

	if state.node_count() == 0 {
		draw_placeholder(state, ctx, theme);
		return;
	}

	ctx.save();
	let _ = ctx.translate(state.transform.x, state.transform.y);
	let _ = ctx.scale(state.transform.k, state.transform.k);
	draw_edges(state, ctx, theme);
	draw_nodes(state, ctx, theme);
	ctx.restore();
}

fn draw_placeholder(state: &ForceGraphState, ctx: &CanvasRenderingContext2d, theme: &Theme) {
	ctx.set_fill_style_str(&theme.placeholder.to_css());
	ctx.set_font("14px sans-serif");
	ctx.set_text_align("center");
	let _ = ctx.fill_text("No graph to show", state.width / 2.0, state.height / 2.0);
	ctx.set_text_align("start");
}

fn draw_edges(state: &ForceGraphState, ctx: &CanvasRenderingContext2d, theme: &Theme) {
	let k = state.transform.k;
	let dimmed = state.hovered().is_some();

	state.graph.visit_edges(|n1, n2, _| {
		let (x1, y1, x2, y2) = (n1.x() as f64, n1.y() as f64, n2.x() as f64, n2.y() as f64);
		let (dx, dy) = (x2 - x1, y2 - y1);
		let dist = (dx * dx + dy * dy).sqrt();
		if dist < 0.001 {
			return;
		}

		let color = if state.edge_highlighted(n1.index(), n2.index()) {
			theme.edge_highlight
		} else if dimmed {
			theme.edge.with_alpha(theme.edge.a * 0.3)
		} else {
			theme.edge
		};
		let (ux, uy) = (dx / dist, dy / dist);
		let r1 = NODE_RADIUS * n1.data.user_data.size;
		let r2 = NODE_RADIUS * n2.data.user_data.size;

		ctx.set_stroke_style_str(&color.to_css());
		ctx.set_line_width(1.0 / k.sqrt());
		ctx.begin_path();
		ctx.move_to(x1 + ux * r1, y1 + uy * r1);
		ctx.line_to(x2 - ux * (r2 + ARROW), y2 - uy * (r2 + ARROW));
		ctx.stroke();

		let (tip_x, tip_y) = (x2 - ux * r2, y2 - uy * r2);
		let (back_x, back_y) = (tip_x - ux * ARROW, tip_y - uy * ARROW);
		let (px, py) = (-uy * ARROW * 0.5, ux * ARROW * 0.5);
		ctx.set_fill_style_str(&color.to_css());
		ctx.begin_path();
		ctx.move_to(tip_x, tip_y);
		ctx.line_to(back_x + px, back_y + py);
		ctx.line_to(back_x - px, back_y - py);
		ctx.close_path();
		ctx.fill();
	});
}

fn draw_nodes(state: &ForceGraphState, ctx: &CanvasRenderingContext2d, theme: &Theme) {
	let dimmed = state.hovered().is_some();
	let show_labels = state.transform.k >= LABEL_ZOOM;

	state.graph.visit_nodes(|node| {
		if state.is_highlighted(node.index()) {
			return;
		}
		let alpha = if dimmed { 0.35 } else { 1.0 };
		let info = &node.data.user_data;
		draw_node(ctx, theme, info, node.x() as f64, node.y() as f64, alpha, 1.0);
		if show_labels && !dimmed {
			draw_label(ctx, theme, state, info, node.x() as f64, node.y() as f64);
		}
	});

	state.graph.visit_nodes(|node| {
		if !state.is_highlighted(node.index()) {
			return;
		}
		let info = &node.data.user_data;
		let (x, y) = (node.x() as f64, node.y() as f64);
		let grow = if state.hovered() == Some(node.index()) { 1.35 } else { 1.15 };
		draw_node(ctx, theme, info, x, y, 1.0, grow);
		draw_label(ctx, theme, state, info, x, y);
	});
}

fn draw_node(
	ctx: &CanvasRenderingContext2d,
	theme: &Theme,
	info: &NodeInfo,
	x: f64,
	y: f64,
	alpha: f64,
	grow: f64,
) {
	let radius = NODE_RADIUS * info.size * grow;
	ctx.set_global_alpha(alpha);

	let shaded = ctx
		.create_radial_gradient(x - radius * 0.3, y - radius * 0.3, 0.0, x, y, radius)
		.ok();
	ctx.begin_path();
	let _ = ctx.arc(x, y, radius, 0.0, 2.0 * PI);
	match shaded {
		Some(gradient) => {
			let _ = gradient.add_color_stop(0.0, &info.color.lighten(0.35).to_css());
			let _ = gradient.add_color_stop(0.7, &info.color.to_css());
			let _ = gradient.add_color_stop(1.0, &info.color.darken(0.2).to_css());
			#[allow(deprecated)]
			ctx.set_fill_style(&gradient);
		}
		None => ctx.set_fill_style_str(&info.color.to_css()),
	}
	ctx.fill();

	ctx.set_stroke_style_str(&theme.node_border.to_css());
	ctx.set_line_width(1.0);
	ctx.stroke();
	ctx.set_global_alpha(1.0);
}

fn draw_label(
	ctx: &CanvasRenderingContext2d,
	theme: &Theme,
	state: &ForceGraphState,
	info: &NodeInfo,
	x: f64,
	y: f64,
) {
	if info.label.is_empty() {
		return;
	}
	let px = (11.0 / state.transform.k.sqrt()).clamp(6.0, 16.0);
	let radius = NODE_RADIUS * info.size;
	ctx.set_fill_style_str(&theme.label.to_css());
	ctx.set_font(&format!("{px:.1}px sans-serif"));
	let _ = ctx.fill_text(&info.label, x + radius + 4.0, y + 3.0);
}
