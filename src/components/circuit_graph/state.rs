use std::cell::RefCell;
use std::rc::Rc;

use log::warn;

use super::builder::GraphBuilder;
use super::error::CircuitError;
use super::export::export;
use super::graph::{CircuitGraph, NodeIdx};
use super::highlight::SelectionHighlighter;
use super::layout::LayoutController;
use super::panel::{NodeAttributes, apply_edit};
use super::types::{ExportPayload, WidgetConfig};

/// Extra screen-space slack around a node when hit testing.
pub(crate) const HIT_SLOP: f64 = 4.0;
const FIT_PADDING: f64 = 40.0;
/// Click vs. drag threshold in pixels.
pub(crate) const CLICK_TOLERANCE: f64 = 4.0;

/// World-space radius of a node of the given size.
pub(crate) fn node_radius(size: f32) -> f64 {
	2.0 + size as f64
}

/// Discrete events coming from the canvas and the property panel.
#[derive(Clone, Debug, PartialEq)]
pub enum InteractionEvent {
	/// Select the node with this key and show it in the panel.
	NodeClicked(String),
	/// Background click: clear the selection.
	StageClicked,
	/// A numeric parameter changed in the panel.
	ParamEdited {
		/// Node key.
		node: String,
		/// Parameter name.
		param: String,
		/// New value; must be finite.
		value: f64,
	},
	/// Start or stop the layout.
	ToggleLayout,
	/// Fit the whole graph into the canvas.
	ResetView,
}

#[derive(Clone, Debug)]
pub(crate) struct ViewTransform {
	pub x: f64,
	pub y: f64,
	pub k: f64,
}

impl Default for ViewTransform {
	fn default() -> Self {
		Self {
			x: 0.0,
			y: 0.0,
			k: 1.0,
		}
	}
}

#[derive(Clone, Debug, Default)]
pub(crate) struct DragState {
	pub active: bool,
	pub node: Option<NodeIdx>,
	pub start_x: f64,
	pub start_y: f64,
	pub node_start_x: f32,
	pub node_start_y: f32,
	pub moved: bool,
}

#[derive(Clone, Debug, Default)]
pub(crate) struct PanState {
	pub active: bool,
	pub start_x: f64,
	pub start_y: f64,
	pub transform_start_x: f64,
	pub transform_start_y: f64,
	pub moved: bool,
}

/// Everything one widget instance owns. The host gets at it through a
/// [`CircuitHandle`] instead of a global.
pub struct CircuitState {
	graph: CircuitGraph,
	highlighter: SelectionHighlighter,
	layout: LayoutController,
	config: WidgetConfig,
	panel: Option<NodeAttributes>,
	autostart_pending: bool,
	pub(crate) transform: ViewTransform,
	pub(crate) drag: DragState,
	pub(crate) pan: PanState,
	pub(crate) width: f64,
	pub(crate) height: f64,
}

impl CircuitState {
	/// Build the graph from `config` and fit it into a `width` x `height` canvas.
	pub fn new(config: WidgetConfig, width: f64, height: f64) -> Self {
		Self::with_builder(GraphBuilder::new(config.node_size), config, width, height)
	}

	pub(crate) fn with_builder(
		builder: GraphBuilder,
		config: WidgetConfig,
		width: f64,
		height: f64,
	) -> Self {
		let graph = builder.build(&config.data);
		let layout = LayoutController::new(&graph, config.layout_alg.clone());
		let mut state = Self {
			graph,
			highlighter: SelectionHighlighter::new(),
			layout,
			autostart_pending: config.start_layout,
			config,
			panel: None,
			transform: ViewTransform::default(),
			drag: DragState::default(),
			pan: PanState::default(),
			width,
			height,
		};
		state.fit_view();
		state
	}

	/// The typed graph with its current display state.
	pub fn graph(&self) -> &CircuitGraph {
		&self.graph
	}

	/// Current selection.
	pub fn highlighter(&self) -> &SelectionHighlighter {
		&self.highlighter
	}

	/// Layout lifecycle and fallback notices.
	pub fn layout(&self) -> &LayoutController {
		&self.layout
	}

	/// The config this state was built from, with `start_layout` kept in sync
	/// with the layout.
	pub fn config(&self) -> &WidgetConfig {
		&self.config
	}

	/// Attributes of the selected node, `None` when nothing is selected.
	pub fn panel(&self) -> Option<&NodeAttributes> {
		self.panel.as_ref()
	}

	/// Structural payload for the host.
	pub fn export(&self) -> ExportPayload {
		export(&self.graph)
	}

	/// Apply one event. Errors leave the state as it was.
	pub fn dispatch(&mut self, event: InteractionEvent) -> Result<(), CircuitError> {
		match event {
			InteractionEvent::NodeClicked(key) => {
				let idx = self
					.graph
					.index_of(&key)
					.ok_or_else(|| CircuitError::UnknownNode(key.clone()))?;
				self.select(idx)?;
			}
			InteractionEvent::StageClicked => {
				self.panel = None;
				self.highlighter.clear_selection(&mut self.graph);
			}
			InteractionEvent::ParamEdited { node, param, value } => {
				let idx = self
					.graph
					.index_of(&node)
					.ok_or_else(|| CircuitError::UnknownNode(node.clone()))?;
				if let Some(target) = self.graph.node_mut(idx) {
					apply_edit(target, &param, value)?;
				}
				if self.highlighter.selected() == Some(idx) {
					self.panel = self.graph.node(idx).map(NodeAttributes::from_node);
				}
			}
			InteractionEvent::ToggleLayout => self.toggle_layout(),
			InteractionEvent::ResetView => self.fit_view(),
		}
		Ok(())
	}

	fn select(&mut self, idx: NodeIdx) -> Result<(), CircuitError> {
		self.highlighter.select_node(&mut self.graph, idx)?;
		self.panel = self.graph.node(idx).map(NodeAttributes::from_node);
		Ok(())
	}

	/// Start or stop the layout and mirror it into `start_layout`.
	pub fn toggle_layout(&mut self) {
		self.layout.toggle();
		self.config.start_layout = self.layout.is_running();
	}

	/// Called once the first frame is on screen.
	pub fn rendered(&mut self) {
		if std::mem::take(&mut self.autostart_pending) {
			self.layout.start();
		}
	}

	/// One layout step; `false` when the layout is stopped.
	pub fn tick(&mut self, dt: f32) -> bool {
		self.layout.step(&mut self.graph, dt)
	}

	/// Move a node to a graph-space position and keep it there.
	pub fn pin_node(&mut self, idx: NodeIdx, x: f32, y: f32) {
		self.layout.pin(&mut self.graph, idx, x, y);
	}

	/// Canvas pixels to graph coordinates.
	pub fn screen_to_graph(&self, sx: f64, sy: f64) -> (f64, f64) {
		(
			(sx - self.transform.x) / self.transform.k,
			(sy - self.transform.y) / self.transform.k,
		)
	}

	/// Topmost node under a screen position. Muted nodes lose to unmuted ones.
	pub fn node_at_position(&self, sx: f64, sy: f64) -> Option<NodeIdx> {
		let (gx, gy) = self.screen_to_graph(sx, sy);
		let slop = HIT_SLOP / self.transform.k;
		self.graph
			.node_indices()
			.zip(self.graph.nodes())
			.filter(|(_, node)| {
				let (dx, dy) = (node.x as f64 - gx, node.y as f64 - gy);
				(dx * dx + dy * dy).sqrt() < node_radius(node.size()) + slop
			})
			.max_by_key(|(idx, node)| (node.z(), *idx))
			.map(|(idx, _)| idx)
	}

	/// Center the graph's bounding box in the canvas.
	pub fn fit_view(&mut self) {
		let mut nodes = self.graph.nodes().peekable();
		if nodes.peek().is_none() {
			self.transform = ViewTransform {
				x: self.width / 2.0,
				y: self.height / 2.0,
				k: 1.0,
			};
			return;
		}
		let (mut min_x, mut min_y) = (f64::MAX, f64::MAX);
		let (mut max_x, mut max_y) = (f64::MIN, f64::MIN);
		for node in nodes {
			let r = node_radius(node.size());
			min_x = min_x.min(node.x as f64 - r);
			min_y = min_y.min(node.y as f64 - r);
			max_x = max_x.max(node.x as f64 + r);
			max_y = max_y.max(node.y as f64 + r);
		}
		let (bw, bh) = (max_x - min_x, max_y - min_y);
		let avail_w = (self.width - 2.0 * FIT_PADDING).max(1.0);
		let avail_h = (self.height - 2.0 * FIT_PADDING).max(1.0);
		let k = (avail_w / bw).min(avail_h / bh).clamp(0.1, 10.0);
		let (cx, cy) = ((min_x + max_x) / 2.0, (min_y + max_y) / 2.0);
		self.transform = ViewTransform {
			x: self.width / 2.0 - cx * k,
			y: self.height / 2.0 - cy * k,
			k,
		};
	}

	/// New canvas size. The view shifts so that what was centered stays
	/// centered.
	pub fn resize(&mut self, width: f64, height: f64) {
		self.transform.x += (width - self.width) / 2.0;
		self.transform.y += (height - self.height) / 2.0;
		self.width = width;
		self.height = height;
	}
}

/// Shared handle to a mounted widget's state, empty until the canvas mounts.
#[derive(Clone, Default)]
pub struct CircuitHandle(Rc<RefCell<Option<CircuitState>>>);

impl CircuitHandle {
	/// An empty handle.
	pub fn new() -> Self {
		Self::default()
	}

	/// Install (or replace) the live state.
	pub fn set(&self, state: CircuitState) {
		*self.0.borrow_mut() = Some(state);
	}

	/// Whether a state has been installed.
	pub fn is_mounted(&self) -> bool {
		self.0.borrow().is_some()
	}

	/// Run `f` against the live state, if any.
	pub fn with<R>(&self, f: impl FnOnce(&mut CircuitState) -> R) -> Option<R> {
		self.0.borrow_mut().as_mut().map(f)
	}

	/// Dispatch to the live state; a no-op before mount.
	pub fn dispatch(&self, event: InteractionEvent) -> Result<(), CircuitError> {
		self.with(|s| s.dispatch(event)).unwrap_or_else(|| {
			warn!("event dropped, widget is not mounted");
			Ok(())
		})
	}

	/// Export the live state, `None` before mount.
	pub fn export(&self) -> Option<ExportPayload> {
		self.with(|s| s.export())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::components::circuit_graph::graph::MUTED_COLOR;
	use serde_json::json;

	fn config(start_layout: bool) -> WidgetConfig {
		serde_json::from_value(json!({
			"start_layout": start_layout,
			"data": {
				"directed": true,
				"nodes": [
					["a", {"class": "LeakyIAF", "V": 0.5}],
					["b", {"class": "AlphaSynapse", "gmax": 2}],
					["c", {"class": "Port"}]
				],
				"edges": [["a", "b", {}], ["b", "c", {}]]
			}
		}))
		.unwrap()
	}

	#[test]
	fn test_click_node_fills_panel_and_highlights() {
		let mut state = CircuitState::new(config(false), 800.0, 600.0);
		state.dispatch(InteractionEvent::NodeClicked("a".into())).unwrap();

		let panel = state.panel().unwrap();
		assert_eq!(panel.key, "a");
		assert_eq!(panel.params.len(), 1);
		assert_eq!(state.graph().node_by_key("c").unwrap().color(), MUTED_COLOR);

		state.dispatch(InteractionEvent::StageClicked).unwrap();
		assert!(state.panel().is_none());
		assert!(state.graph().nodes().all(|n| n.z() == 1));
	}

	#[test]
	fn test_unknown_node_click_is_an_error() {
		let mut state = CircuitState::new(config(false), 800.0, 600.0);
		let err = state.dispatch(InteractionEvent::NodeClicked("zz".into())).unwrap_err();
		assert!(matches!(err, CircuitError::UnknownNode(_)));
	}

	#[test]
	fn test_param_edit_updates_graph_and_panel() {
		let mut state = CircuitState::new(config(false), 800.0, 600.0);
		state.dispatch(InteractionEvent::NodeClicked("b".into())).unwrap();
		state
			.dispatch(InteractionEvent::ParamEdited {
				node: "b".into(),
				param: "gmax".into(),
				value: 7.0,
			})
			.unwrap();

		assert_eq!(state.panel().unwrap().params[0].value, 7.0);
		let out = state.export();
		assert_eq!(out.nodes[1].1.params["gmax"], json!(7));
	}

	#[test]
	fn test_autostart_waits_for_first_render() {
		let mut state = CircuitState::new(config(true), 800.0, 600.0);
		assert!(!state.layout().is_running());
		state.rendered();
		assert!(state.layout().is_running());
		state.rendered();
		assert!(state.layout().is_running());

		let mut idle = CircuitState::new(config(false), 800.0, 600.0);
		idle.rendered();
		assert!(!idle.layout().is_running());
	}

	#[test]
	fn test_toggle_mirrors_start_layout() {
		let mut state = CircuitState::new(config(false), 800.0, 600.0);
		state.dispatch(InteractionEvent::ToggleLayout).unwrap();
		assert!(state.config().start_layout);
		assert!(state.tick(0.016));
		state.dispatch(InteractionEvent::ToggleLayout).unwrap();
		assert!(!state.config().start_layout);
		assert!(!state.tick(0.016));
	}

	#[test]
	fn test_fit_view_puts_nodes_on_screen() {
		let state = CircuitState::new(config(false), 800.0, 600.0);
		for node in state.graph().nodes() {
			let sx = state.transform.x + node.x as f64 * state.transform.k;
			let sy = state.transform.y + node.y as f64 * state.transform.k;
			assert!((0.0..=800.0).contains(&sx));
			assert!((0.0..=600.0).contains(&sy));
		}
	}

	#[test]
	fn test_resize_keeps_view_centered() {
		let mut state = CircuitState::new(config(false), 800.0, 600.0);
		let center_before = state.screen_to_graph(400.0, 300.0);

		state.resize(1000.0, 600.0);
		assert_eq!((state.width, state.height), (1000.0, 600.0));
		let center_after = state.screen_to_graph(500.0, 300.0);
		assert!((center_after.0 - center_before.0).abs() < 1e-9);
		assert!((center_after.1 - center_before.1).abs() < 1e-9);
		assert!(state.node_at_position(-5000.0, -5000.0).is_none());
	}

	#[test]
	fn test_hit_test_finds_node_center() {
		let mut state = CircuitState::new(config(false), 800.0, 600.0);
		for (i, key) in ["a", "b", "c"].into_iter().enumerate() {
			let idx = state.graph().index_of(key).unwrap();
			state.pin_node(idx, i as f32 * 100.0, 0.0);
		}
		state.fit_view();
		let b = state.graph().index_of("b").unwrap();
		let node = state.graph().node(b).unwrap();
		let sx = state.transform.x + node.x as f64 * state.transform.k;
		let sy = state.transform.y + node.y as f64 * state.transform.k;
		assert_eq!(state.node_at_position(sx, sy), Some(b));
		assert_eq!(state.node_at_position(-5000.0, -5000.0), None);
	}

	#[test]
	fn test_handle_before_mount() {
		let handle = CircuitHandle::new();
		assert!(!handle.is_mounted());
		assert!(handle.export().is_none());
		assert!(handle.dispatch(InteractionEvent::StageClicked).is_ok());

		handle.set(CircuitState::new(config(false), 800.0, 600.0));
		assert_eq!(handle.export().unwrap().nodes.len(), 3);
	}
}
