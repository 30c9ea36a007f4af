//! Canvas rendering for the graph view.
//!
//! Rendering uses multiple passes for correct z-ordering:
//! 1. Background (screen space)
//! 2. Edges (world space)
//! 3. Dimmed nodes, then highlighted nodes with labels on top
//! 4. Tooltip, status overlays and vignette (screen space)

use std::f64::consts::TAU;

use web_sys::CanvasRenderingContext2d;

use crate::graph::NodeKind;

use super::scale::ScaledValues;
use super::state::{GraphState, LayoutPhase, NodeInfo, Notice};
use super::theme::{Color, Theme};

type Node = force_graph::Node<NodeInfo>;

/// Attempt to smooth values that would otherwise cause abrupt visual changes.
fn smooth_step(t: f64) -> f64 {
	t * t * (3.0 - 2.0 * t)
}

/// Renders the complete view to the canvas.
pub fn render(state: &GraphState, ctx: &CanvasRenderingContext2d) {
	let theme = &state.settings.theme;
	let scale = ScaledValues::new(&state.settings.scale, state.transform.k);

	draw_background(state, ctx, theme);

	if state.phase == LayoutPhase::Loading {
		draw_skeleton(state, ctx, theme);
	} else if !matches!(state.notice, Some(Notice::Failed(_))) {
		ctx.save();
		let _ = ctx.translate(state.transform.x, state.transform.y);
		let _ = ctx.scale(state.transform.k, state.transform.k);
		draw_edges(state, ctx, &scale, theme);
		draw_nodes(state, ctx, &scale, theme);
		ctx.restore();
		draw_tooltip(state, ctx, &scale, theme);
	}

	match &state.notice {
		Some(Notice::Failed(message)) => draw_message(state, ctx, theme, "Could not load the archive", message, true),
		Some(Notice::Empty) => draw_message(state, ctx, theme, "Nothing to explore", "This entry has no links yet.", false),
		None => {}
	}

	if theme.background.vignette > 0.0 {
		draw_vignette(state, ctx, theme);
	}
}

fn draw_background(state: &GraphState, ctx: &CanvasRenderingContext2d, theme: &Theme) {
	let (cx, cy) = (state.width / 2.0, state.height / 2.0);
	let gradient = theme
		.background
		.use_gradient
		.then(|| ctx.create_radial_gradient(cx, cy, 0.0, cx, cy, state.width.max(state.height) * 0.8).ok())
		.flatten();

	match gradient {
		Some(gradient) => {
			let _ = gradient.add_color_stop(0.0, &theme.background.color_secondary.to_css());
			let _ = gradient.add_color_stop(1.0, &theme.background.color.to_css());
			#[allow(deprecated)]
			ctx.set_fill_style(&gradient);
		}
		None => ctx.set_fill_style_str(&theme.background.color.to_css()),
	}
	ctx.fill_rect(0.0, 0.0, state.width, state.height);
}

fn draw_vignette(state: &GraphState, ctx: &CanvasRenderingContext2d, theme: &Theme) {
	let (cx, cy) = (state.width / 2.0, state.height / 2.0);
	let Ok(gradient) = ctx.create_radial_gradient(
		cx,
		cy,
		state.width.min(state.height) * 0.3,
		cx,
		cy,
		state.width.max(state.height) * 0.7,
	) else {
		return;
	};
	let _ = gradient.add_color_stop(0.0, "rgba(0, 0, 0, 0)");
	let _ = gradient.add_color_stop(1.0, &Color::rgba(0, 0, 0, theme.background.vignette).to_css());
	#[allow(deprecated)]
	ctx.set_fill_style(&gradient);
	ctx.fill_rect(0.0, 0.0, state.width, state.height);
}

/// Pulsing placeholder rings while the data loads.
fn draw_skeleton(state: &GraphState, ctx: &CanvasRenderingContext2d, theme: &Theme) {
	let (cx, cy) = (state.width / 2.0, state.height / 2.0);
	let pulse = 0.5 + 0.5 * (state.clock * 2.5).sin();
	let color = theme.overlay.skeleton;

	ctx.set_fill_style_str(&color.with_alpha(color.a * (0.6 + 0.4 * pulse)).to_css());
	ctx.begin_path();
	let _ = ctx.arc(cx, cy, 14.0, 0.0, TAU);
	ctx.fill();

	for ring in 1..=2 {
		let radius = 70.0 * ring as f64;
		let count = 6 * ring;
		for i in 0..count {
			let phase = (state.clock * 2.5 - i as f64 * 0.3).sin() * 0.5 + 0.5;
			let angle = TAU * i as f64 / count as f64 + ring as f64 * 0.4;
			ctx.set_fill_style_str(&color.with_alpha(color.a * (0.4 + 0.6 * phase)).to_css());
			ctx.begin_path();
			let _ = ctx.arc(cx + radius * angle.cos(), cy + radius * angle.sin(), 8.0, 0.0, TAU);
			ctx.fill();
		}
	}

	ctx.set_font(&format!("13px {}", theme.overlay.font));
	ctx.set_text_align("center");
	ctx.set_fill_style_str(&theme.overlay.muted_text.to_css());
	let _ = ctx.fill_text("Loading archive…", cx, cy + 190.0);
	ctx.set_text_align("start");
}

fn draw_message(
	state: &GraphState,
	ctx: &CanvasRenderingContext2d,
	theme: &Theme,
	title: &str,
	detail: &str,
	is_error: bool,
) {
	let (cx, cy) = (state.width / 2.0, state.height / 2.0);
	let (w, h) = (360.0_f64.min(state.width - 20.0), 72.0);

	ctx.set_fill_style_str(&theme.overlay.panel.to_css());
	ctx.fill_rect(cx - w / 2.0, cy - h / 2.0, w, h);

	ctx.set_text_align("center");
	ctx.set_font(&format!("bold 14px {}", theme.overlay.font));
	let title_color = if is_error { theme.overlay.error } else { theme.overlay.text };
	ctx.set_fill_style_str(&title_color.to_css());
	let _ = ctx.fill_text(title, cx, cy - 6.0);

	ctx.set_font(&format!("12px {}", theme.overlay.font));
	ctx.set_fill_style_str(&theme.overlay.muted_text.to_css());
	let _ = ctx.fill_text(detail, cx, cy + 16.0);
	ctx.set_text_align("start");
}

/// Edges take the color of their primary endpoint, if any.
pub fn edge_color(a: &NodeInfo, b: &NodeInfo, theme: &Theme) -> Color {
	match (a.primary, b.primary) {
		(true, _) => a.color.with_alpha(theme.edge.primary_alpha),
		(_, true) => b.color.with_alpha(theme.edge.primary_alpha),
		_ => theme.edge.color,
	}
}

fn draw_edges(state: &GraphState, ctx: &CanvasRenderingContext2d, scale: &ScaledValues, theme: &Theme) {
	let max_t = smooth_step(state.highlight.max_intensity());

	state.graph.visit_edges(|n1, n2, _| {
		let (x1, y1, x2, y2) = (n1.x() as f64, n1.y() as f64, n2.x() as f64, n2.y() as f64);
		if (x2 - x1).hypot(y2 - y1) < 0.001 {
			return;
		}

		let edge_t = smooth_step(state.highlight.edge_intensity(n1.index(), n2.index()));
		let (alpha, width) = if edge_t > 0.01 {
			(0.7 + 0.3 * edge_t, scale.edge_width * (1.0 + 0.5 * edge_t))
		} else if max_t > 0.01 {
			(0.7 - 0.5 * max_t, scale.edge_width * (1.0 - 0.3 * max_t))
		} else {
			(0.7, scale.edge_width)
		};

		let color = edge_color(&n1.data.user_data, &n2.data.user_data, theme);
		ctx.set_stroke_style_str(&color.with_alpha(color.a * alpha).to_css());
		ctx.set_line_width(width);
		ctx.begin_path();
		ctx.move_to(x1, y1);
		ctx.line_to(x2, y2);
		ctx.stroke();
	});
}

fn draw_nodes(state: &GraphState, ctx: &CanvasRenderingContext2d, scale: &ScaledValues, theme: &Theme) {
	let max_t = smooth_step(state.highlight.max_intensity());
	let has_highlight = max_t > 0.01;
	let (dim_alpha, dim_radius) = if has_highlight {
		(1.0 - 0.7 * max_t, 1.0 - 0.15 * max_t)
	} else {
		(1.0, 1.0)
	};

	// Pass 1: everything not (or no longer) highlighted
	state.graph.visit_nodes(|node| {
		if state.highlight.node_intensity(node.index()) > 0.001 {
			return;
		}
		draw_node(ctx, node, scale, theme, dim_alpha, dim_radius);
	});

	// Pass 2: highlighted nodes on top, hovered one with a ring
	state.graph.visit_nodes(|node| {
		let idx = node.index();
		let node_t = state.highlight.node_intensity(idx);
		if node_t <= 0.001 {
			return;
		}
		let eased_t = smooth_step(node_t);
		let ring_t = smooth_step(state.highlight.ring_intensity(idx));
		let grown = 1.0 + (0.25 + 0.15 * ring_t) * eased_t;
		let alpha = dim_alpha + (1.0 - dim_alpha) * eased_t;
		let radius_mult = dim_radius + (grown - dim_radius) * eased_t;

		draw_node(ctx, node, scale, theme, alpha, radius_mult);

		if ring_t > 0.01 {
			let radius = scale.node_radius * radius_mult * node.data.user_data.size;
			ctx.begin_path();
			let _ = ctx.arc(node.x() as f64, node.y() as f64, radius + scale.ring_offset, 0.0, TAU);
			ctx.set_stroke_style_str(&Color::rgba(255, 255, 255, 0.8 * ring_t).to_css());
			ctx.set_line_width(scale.ring_width);
			ctx.stroke();
		}
	});
}

fn draw_node(
	ctx: &CanvasRenderingContext2d,
	node: &Node,
	scale: &ScaledValues,
	theme: &Theme,
	alpha: f64,
	radius_mult: f64,
) {
	let info = &node.data.user_data;
	let (x, y) = (node.x() as f64, node.y() as f64);
	let radius = scale.node_radius * radius_mult * info.size;

	ctx.set_global_alpha(alpha);

	let gradient = theme
		.node
		.use_gradient
		.then(|| ctx.create_radial_gradient(x - radius * 0.3, y - radius * 0.3, 0.0, x, y, radius).ok())
		.flatten();
	ctx.begin_path();
	let _ = ctx.arc(x, y, radius, 0.0, TAU);
	match gradient {
		Some(gradient) => {
			let _ = gradient.add_color_stop(0.0, &info.color.lighten(0.4).to_css());
			let _ = gradient.add_color_stop(0.7, &info.color.to_css());
			let _ = gradient.add_color_stop(1.0, &info.color.darken(0.2).to_css());
			#[allow(deprecated)]
			ctx.set_fill_style(&gradient);
		}
		None => ctx.set_fill_style_str(&info.color.to_css()),
	}
	ctx.fill();

	if theme.node.border_width > 0.0 {
		ctx.set_stroke_style_str(&theme.node.border_color.to_css());
		ctx.set_line_width(theme.node.border_width / scale.k);
		ctx.stroke();
	}

	if let NodeKind::Group { expanded, .. } = info.kind {
		draw_group_marker(ctx, x, y, radius, expanded, scale, theme);
	}

	// Groups, the root and the focal entity keep their labels when zoomed out.
	let always_labelled = info.primary || matches!(info.kind, NodeKind::Group { .. });
	let label_alpha = if always_labelled { 1.0 } else { scale.label_alpha };
	if alpha * label_alpha > 0.05 {
		ctx.set_global_alpha(alpha * label_alpha);
		ctx.set_fill_style_str(&theme.node.label_color.to_css());
		ctx.set_font(&scale.label_font);
		let _ = ctx.fill_text(&info.label, x + radius + 4.0 / scale.k, y + 3.0 / scale.k);
	}
	ctx.set_global_alpha(1.0);
}

/// Outer ring plus a `+` (collapsed) or `−` (expanded) glyph.
fn draw_group_marker(
	ctx: &CanvasRenderingContext2d,
	x: f64,
	y: f64,
	radius: f64,
	expanded: bool,
	scale: &ScaledValues,
	theme: &Theme,
) {
	let stroke = theme.node.group_ring.to_css();
	ctx.set_stroke_style_str(&stroke);
	ctx.set_line_width(scale.ring_width);

	ctx.begin_path();
	let _ = ctx.arc(x, y, radius + scale.ring_offset, 0.0, TAU);
	ctx.stroke();

	let arm = radius * 0.45;
	ctx.begin_path();
	ctx.move_to(x - arm, y);
	ctx.line_to(x + arm, y);
	if !expanded {
		ctx.move_to(x, y - arm);
		ctx.line_to(x, y + arm);
	}
	ctx.stroke();
}

/// Title and subtitle shown when hovering a node.
pub fn tooltip_lines(info: &NodeInfo) -> (String, String) {
	let subtitle = match &info.kind {
		NodeKind::Root => "Archive overview".to_string(),
		NodeKind::Group {
			item_count,
			expanded,
			..
		} => {
			let action = if *expanded { "collapse" } else { "expand" };
			format!("{item_count} entries · click to {action}")
		}
		NodeKind::Entity(key) => format!("{} · click to focus", key.entity_type.label()),
	};
	(info.label.clone(), subtitle)
}

fn draw_tooltip(state: &GraphState, ctx: &CanvasRenderingContext2d, scale: &ScaledValues, theme: &Theme) {
	let Some(idx) = state.highlight.hovered() else {
		return;
	};
	let Some(info) = state.node_info(idx) else {
		return;
	};
	let Some((gx, gy)) = state.position(&info.id) else {
		return;
	};
	let (sx, sy) = state.graph_to_screen(gx, gy);
	let (title, subtitle) = tooltip_lines(&info);

	let title_font = format!("bold 12px {}", theme.overlay.font);
	let body_font = format!("11px {}", theme.overlay.font);
	ctx.set_font(&title_font);
	let title_w = ctx.measure_text(&title).map(|m| m.width()).unwrap_or(120.0);
	ctx.set_font(&body_font);
	let body_w = ctx.measure_text(&subtitle).map(|m| m.width()).unwrap_or(120.0);

	let (pad, w, h) = (8.0, title_w.max(body_w) + 16.0, 40.0);
	let offset = scale.node_radius * info.size * scale.k + 10.0;
	let x = (sx + offset).min(state.width - w - 4.0).max(4.0);
	let y = (sy - h - offset * 0.5).max(4.0);

	ctx.set_fill_style_str(&theme.overlay.panel.to_css());
	ctx.fill_rect(x, y, w, h);

	ctx.set_fill_style_str(&theme.overlay.text.to_css());
	ctx.set_font(&title_font);
	let _ = ctx.fill_text(&title, x + pad, y + 16.0);
	ctx.set_fill_style_str(&theme.overlay.muted_text.to_css());
	ctx.set_font(&body_font);
	let _ = ctx.fill_text(&subtitle, x + pad, y + 32.0);
}
