use std::f64::consts::PI;

use web_sys::CanvasRenderingContext2d;

use super::graph::{Edge, Node};
use super::state::{CircuitState, node_radius};

const BACKGROUND: &str = "#ffffff";
const LABEL_COLOR: &str = "#333333";
/// Graphs smaller than this label every front node; larger graphs only label
/// the highlighted neighborhood.
const LABEL_ALL_BELOW: usize = 100;

/// Whether a node on layer `z` gets its label drawn.
fn labels_visible(order: usize, highlighting: bool, z: u8) -> bool {
	z == 1 && (order < LABEL_ALL_BELOW || highlighting)
}

pub fn render(state: &CircuitState, ctx: &CanvasRenderingContext2d) {
	ctx.set_fill_style_str(BACKGROUND);
	ctx.fill_rect(0.0, 0.0, state.width, state.height);
	ctx.save();
	let _ = ctx.translate(state.transform.x, state.transform.y);
	let _ = ctx.scale(state.transform.k, state.transform.k);
	draw_edges(state, ctx);
	draw_nodes(state, ctx);
	ctx.restore();
}

fn draw_edges(state: &CircuitState, ctx: &CanvasRenderingContext2d) {
	let graph = state.graph();
	let k = state.transform.k;
	let (line_width, arrow_size) = (1.0 / k, 6.0 / k);

	// muted edges first so highlighted ones end up on top
	for z in [0, 1] {
		for (source, target, edge) in graph.links().filter(|(_, _, e)| e.z() == z) {
			let (Some(n1), Some(n2)) = (graph.node(source), graph.node(target)) else {
				continue;
			};
			draw_edge(ctx, edge, n1, n2, line_width, arrow_size);
		}
	}
}

fn draw_edge(
	ctx: &CanvasRenderingContext2d,
	edge: &Edge,
	n1: &Node,
	n2: &Node,
	line_width: f64,
	arrow_size: f64,
) {
	let (x1, y1, x2, y2) = (n1.x as f64, n1.y as f64, n2.x as f64, n2.y as f64);
	let (dx, dy) = (x2 - x1, y2 - y1);
	let dist = (dx * dx + dy * dy).sqrt();
	if dist < 0.001 {
		return;
	}
	let (r1, r2) = (node_radius(n1.size()), node_radius(n2.size()));
	let (ux, uy) = (dx / dist, dy / dist);
	let tip_back = if edge.is_arrow() { arrow_size } else { 0.0 };

	ctx.set_stroke_style_str(edge.color());
	ctx.set_line_width(line_width);
	ctx.begin_path();
	ctx.move_to(x1 + ux * r1, y1 + uy * r1);
	ctx.line_to(x2 - ux * (r2 + tip_back), y2 - uy * (r2 + tip_back));
	ctx.stroke();

	if !edge.is_arrow() {
		return;
	}
	ctx.set_fill_style_str(edge.color());
	let (tip_x, tip_y) = (x2 - ux * r2, y2 - uy * r2);
	let (back_x, back_y) = (tip_x - ux * arrow_size, tip_y - uy * arrow_size);
	let (px, py) = (-uy * arrow_size * 0.5, ux * arrow_size * 0.5);
	ctx.begin_path();
	ctx.move_to(tip_x, tip_y);
	ctx.line_to(back_x + px, back_y + py);
	ctx.line_to(back_x - px, back_y - py);
	ctx.close_path();
	ctx.fill();
}

fn draw_nodes(state: &CircuitState, ctx: &CanvasRenderingContext2d) {
	let graph = state.graph();
	let k = state.transform.k;
	let highlighting = state.highlighter().has_selection();

	for z in [0, 1] {
		for node in graph.nodes().filter(|n| n.z() == z) {
			let (x, y) = (node.x as f64, node.y as f64);
			let radius = node_radius(node.size());

			ctx.begin_path();
			let _ = ctx.arc(x, y, radius, 0.0, 2.0 * PI);
			ctx.set_fill_style_str(node.color());
			ctx.fill();

			if labels_visible(graph.order(), highlighting, z) {
				ctx.set_fill_style_str(LABEL_COLOR);
				ctx.set_font(&format!("{}px sans-serif", 10.0 / k.max(0.5)));
				let _ = ctx.fill_text(node.label(), x + radius + 3.0 / k, y + 3.0 / k);
			}
		}
	}
}
