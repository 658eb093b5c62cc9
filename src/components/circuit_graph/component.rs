use std::cell::RefCell;
use std::rc::Rc;

use leptos::prelude::*;
use log::warn;
use wasm_bindgen::prelude::*;
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement, MouseEvent, WheelEvent};

use super::builder::GraphBuilder;
use super::panel::NodeAttributes;
use super::panel_view::PropertyPanel;
use super::render;
use super::state::{CLICK_TOLERANCE, CircuitHandle, CircuitState, InteractionEvent};
use super::types::WidgetConfig;

const FRAME_DT: f32 = 0.016;

/// Canvas widget drawing a circuit with a force-directed layout and a property
/// panel for the selected node.
#[component]
pub fn CircuitGraphCanvas(
	/// Host configuration; a new value rebuilds the graph.
	#[prop(into)]
	config: Signal<WidgetConfig>,
	/// Shared with the caller so it can export or drive the widget.
	#[prop(optional)]
	handle: CircuitHandle,
	/// Fixed canvas width. Without it the canvas follows its container.
	#[prop(default = None)]
	width: Option<f64>,
) -> impl IntoView {
	let canvas_ref = NodeRef::<leptos::html::Canvas>::new();
	let animate: Rc<RefCell<Option<Closure<dyn FnMut()>>>> = Rc::new(RefCell::new(None));
	let resize_cb: Rc<RefCell<Option<Closure<dyn FnMut()>>>> = Rc::new(RefCell::new(None));
	let (attributes, set_attributes) = signal(None::<NodeAttributes>);
	let (running, set_running) = signal(false);
	let (events, set_events) = signal(None::<InteractionEvent>);
	let panel_settings = Signal::derive(move || config.with(|c| c.panel.clone()));
	let (handle_init, animate_init, resize_init) = (handle.clone(), animate.clone(), resize_cb.clone());

	// (re)build the graph whenever the host hands us new data
	Effect::new(move |_| {
		let Some(canvas) = canvas_ref.get() else {
			return;
		};
		let canvas: HtmlCanvasElement = canvas.into();
		let config = config.get();

		let w = width.unwrap_or_else(|| container_width(&canvas));
		let h = config.height as f64;
		canvas.set_width(w as u32);
		canvas.set_height(h as u32);

		let Some(ctx) = context_2d(&canvas) else {
			warn!("canvas has no 2d context, circuit graph not rendered");
			return;
		};
		let builder = GraphBuilder::new(config.node_size).with_seed(js_sys::Date::now() as u64);
		handle_init.set(CircuitState::with_builder(builder, config, w, h));
		set_attributes.set(None);
		set_running.set(false);

		// follow the container's width; registered once, reads whatever state is live
		if width.is_none() && resize_init.borrow().is_none() {
			let (handle_resize, canvas_resize) = (handle_init.clone(), canvas.clone());
			*resize_init.borrow_mut() = Some(Closure::new(move || {
				let nw = container_width(&canvas_resize);
				canvas_resize.set_width(nw as u32);
				handle_resize.with(|s| {
					let h = s.height;
					s.resize(nw, h);
				});
			}));
			if let (Some(cb), Some(window)) = (resize_init.borrow().as_ref(), web_sys::window()) {
				let _ = window.add_event_listener_with_callback("resize", cb.as_ref().unchecked_ref());
			}
		}

		// the frame loop reads whatever state the handle holds
		if animate_init.borrow().is_some() {
			return;
		}
		let (handle_anim, animate_inner) = (handle_init.clone(), animate_init.clone());
		*animate_init.borrow_mut() = Some(Closure::new(move || {
			let started = handle_anim.with(|s| {
				s.tick(FRAME_DT);
				render::render(s, &ctx);
				let was_running = s.layout().is_running();
				s.rendered();
				!was_running && s.layout().is_running()
			});
			if started == Some(true) {
				set_running.set(true);
			}
			if let (Some(cb), Some(window)) = (animate_inner.borrow().as_ref(), web_sys::window()) {
				let _ = window.request_animation_frame(cb.as_ref().unchecked_ref());
			}
		}));
		if let (Some(cb), Some(window)) = (animate_init.borrow().as_ref(), web_sys::window()) {
			let _ = window.request_animation_frame(cb.as_ref().unchecked_ref());
		}
	});

	let handle_events = handle.clone();
	Effect::new(move |_| {
		if let Some(event) = events.get() {
			apply(&handle_events, event, set_attributes, set_running);
		}
	});

	let handle_md = handle.clone();
	let on_mousedown = move |ev: MouseEvent| {
		let Some((x, y)) = local_coords(canvas_ref, ev.client_x(), ev.client_y()) else {
			return;
		};
		handle_md.with(|s| {
			if let Some(idx) = s.node_at_position(x, y) {
				let (nx, ny) = s.graph().node(idx).map(|n| n.position()).unwrap_or_default();
				s.drag.active = true;
				s.drag.moved = false;
				s.drag.node = Some(idx);
				s.drag.start_x = x;
				s.drag.start_y = y;
				s.drag.node_start_x = nx;
				s.drag.node_start_y = ny;
			} else {
				s.pan.active = true;
				s.pan.moved = false;
				s.pan.start_x = x;
				s.pan.start_y = y;
				s.pan.transform_start_x = s.transform.x;
				s.pan.transform_start_y = s.transform.y;
			}
		});
	};

	let handle_mm = handle.clone();
	let on_mousemove = move |ev: MouseEvent| {
		let Some((x, y)) = local_coords(canvas_ref, ev.client_x(), ev.client_y()) else {
			return;
		};
		handle_mm.with(|s| {
			if s.drag.active {
				let (dx, dy) = (x - s.drag.start_x, y - s.drag.start_y);
				s.drag.moved |= dx.hypot(dy) > CLICK_TOLERANCE;
				if let (true, Some(idx)) = (s.drag.moved, s.drag.node) {
					let k = s.transform.k;
					let (nx, ny) = (
						s.drag.node_start_x + (dx / k) as f32,
						s.drag.node_start_y + (dy / k) as f32,
					);
					s.pin_node(idx, nx, ny);
				}
			} else if s.pan.active {
				let (dx, dy) = (x - s.pan.start_x, y - s.pan.start_y);
				s.pan.moved |= dx.hypot(dy) > CLICK_TOLERANCE;
				s.transform.x = s.pan.transform_start_x + dx;
				s.transform.y = s.pan.transform_start_y + dy;
			}
		});
	};

	let handle_mu = handle.clone();
	let on_mouseup = move |_: MouseEvent| {
		let click = handle_mu
			.with(|s| {
				let click = if s.drag.active && !s.drag.moved {
					s.drag
						.node
						.and_then(|idx| s.graph().node(idx))
						.map(|n| InteractionEvent::NodeClicked(n.key().to_owned()))
				} else if s.pan.active && !s.pan.moved {
					Some(InteractionEvent::StageClicked)
				} else {
					None
				};
				s.drag.active = false;
				s.drag.node = None;
				s.pan.active = false;
				click
			})
			.flatten();
		if let Some(event) = click {
			apply(&handle_mu, event, set_attributes, set_running);
		}
	};

	let handle_ml = handle.clone();
	let on_mouseleave = move |_: MouseEvent| {
		handle_ml.with(|s| {
			s.drag.active = false;
			s.drag.node = None;
			s.pan.active = false;
		});
	};

	let handle_wh = handle.clone();
	let on_wheel = move |ev: WheelEvent| {
		ev.prevent_default();
		let Some((x, y)) = local_coords(canvas_ref, ev.client_x(), ev.client_y()) else {
			return;
		};
		handle_wh.with(|s| {
			let factor = if ev.delta_y() > 0.0 { 0.9 } else { 1.1 };
			let new_k = (s.transform.k * factor).clamp(0.1, 10.0);
			let ratio = new_k / s.transform.k;
			s.transform.x = x - (x - s.transform.x) * ratio;
			s.transform.y = y - (y - s.transform.y) * ratio;
			s.transform.k = new_k;
		});
	};

	view! {
		<div
			class="circuit-graph"
			style=move || format!("position: relative; width: 100%; height: {}px;", config.with(|c| c.height))
		>
			<canvas
				node_ref=canvas_ref
				class="circuit-graph-canvas"
				on:mousedown=on_mousedown
				on:mousemove=on_mousemove
				on:mouseup=on_mouseup
				on:mouseleave=on_mouseleave
				on:wheel=on_wheel
				style="display: block; cursor: grab;"
			/>
			<PropertyPanel
				settings=panel_settings
				attributes=attributes
				running=running
				events=set_events
			/>
		</div>
	}
}

/// Dispatch an event and push the resulting panel contents to the view.
fn apply(
	handle: &CircuitHandle,
	event: InteractionEvent,
	set_attributes: WriteSignal<Option<NodeAttributes>>,
	set_running: WriteSignal<bool>,
) {
	let synced = handle.with(|s| {
		if let Err(err) = s.dispatch(event) {
			warn!("{err}");
		}
		(s.panel().cloned(), s.layout().is_running())
	});
	if let Some((attrs, is_running)) = synced {
		set_attributes.set(attrs);
		set_running.set(is_running);
	}
}

fn local_coords(
	canvas_ref: NodeRef<leptos::html::Canvas>,
	client_x: i32,
	client_y: i32,
) -> Option<(f64, f64)> {
	let canvas: HtmlCanvasElement = canvas_ref.get()?.into();
	let rect = canvas.get_bounding_client_rect();
	Some((client_x as f64 - rect.left(), client_y as f64 - rect.top()))
}

fn container_width(canvas: &HtmlCanvasElement) -> f64 {
	canvas
		.parent_element()
		.map(|p| p.client_width() as f64)
		.filter(|w| *w > 0.0)
		.unwrap_or(800.0)
}

fn context_2d(canvas: &HtmlCanvasElement) -> Option<CanvasRenderingContext2d> {
	canvas.get_context("2d").ok()??.dyn_into().ok()
}
