use leptos::prelude::*;
use serde_json::{Value, json};

use crate::components::circuit_graph::{CircuitGraphCanvas, CircuitHandle, WidgetConfig};

/// Sample circuit: photoreceptors feed a random tree of leaky integrate-and-fire
/// neurons wired through alpha synapses, with a couple of output ports.
fn generate_sample_config(neurons: usize) -> Value {
	let mut nodes = Vec::new();
	let mut edges = Vec::new();

	for i in 0..neurons {
		nodes.push(json!([format!("n{i}"), {
			"class": "LeakyIAF",
			"name": format!("Neuron {i}"),
			"initV": -0.06,
			"resting_potential": -0.07,
			"threshold": -0.05,
			"capacitance": 0.07,
			"resistance": 0.2
		}]));
	}
	for i in 0..neurons / 3 {
		nodes.push(json!([format!("r{i}"), {"class": "PhotoreceptorModel", "num_microvilli": 30000}]));
		edges.push(json!([format!("r{i}"), format!("n{i}"), {}]));
	}
	for i in 1..neurons {
		let pre = (rand_simple(i) * (i as f64)) as usize;
		nodes.push(json!([format!("s{i}"), {
			"class": "AlphaSynapse",
			"gmax": 0.003,
			"ar": 110.0,
			"ad": 190.0,
			"reverse": 0.065
		}]));
		edges.push(json!([format!("n{pre}"), format!("s{i}"), {}]));
		edges.push(json!([format!("s{i}"), format!("n{i}"), {}]));
	}
	for i in neurons.saturating_sub(2)..neurons {
		nodes.push(json!([format!("p{i}"), {"class": "Port", "port_io": "out", "port_type": "spike"}]));
		edges.push(json!([format!("n{i}"), format!("p{i}"), {}]));
	}

	json!({
		"height": 600,
		"nodeSize": "degree",
		"layoutAlg": "FA",
		"start_layout": true,
		"datGUISettings": {"autoPlace": false, "closeOnTop": true},
		"data": {"directed": true, "nodes": nodes, "edges": edges}
	})
}

/// Simple pseudo-random number generator (deterministic for consistency).
fn rand_simple(seed: usize) -> f64 {
	let x = ((seed + 1) * 9301 + 49297) % 233280;
	(x as f64) / 233280.0
}

/// Default Home Page
#[component]
pub fn Home() -> impl IntoView {
	let config = match serde_json::from_value::<WidgetConfig>(generate_sample_config(30)) {
		Ok(config) => config,
		Err(err) => {
			return view! {
				<h1>"Uh oh! Something went wrong!"</h1>
				<p>{format!("Invalid widget configuration: {err}")}</p>
			}
			.into_any();
		}
	};
	let config = Signal::derive(move || config.clone());
	let handle = CircuitHandle::new();
	let (exported, set_exported) = signal(String::new());

	let handle_export = handle.clone();
	let on_export = move |_| {
		let json = handle_export
			.export()
			.and_then(|payload| serde_json::to_string_pretty(&payload).ok())
			.unwrap_or_default();
		set_exported.set(json);
	};

	view! {
		<div class="circuit-page">
			<h1>"Neural Circuit"</h1>
			<p class="subtitle">
				"Click a node to inspect its model. Click the background to clear. Drag nodes to pin them."
			</p>
			<CircuitGraphCanvas config=config handle=handle />
			<button class="export" on:click=on_export>"Export"</button>
			<pre class="export-output">{move || exported.get()}</pre>
		</div>
	}
	.into_any()
}
