//! Neural-circuit graph widget: a force-directed canvas view of a circuit
//! with per-node model parameters, plus the Leptos app that hosts the demo.

use leptos::prelude::*;
use leptos_meta::*;
use leptos_router::components::*;
use leptos_router::path;
use log::{Level, info};

// Modules
mod components;
mod pages;

pub use components::circuit_graph::{
	AXON_HILLOCK_COLOR, CircuitError, CircuitGraphCanvas, CircuitHandle, CircuitState,
	DEFAULT_EDGE_COLOR, EdgeAttrs, EdgeEntry, ExportPayload, ExportedEdge, GraphKind,
	GraphPayload, InteractionEvent, LayoutAlgorithm, MUTED_COLOR, NodeAttrs, NodeEntry, NodeType,
	PORT_COLOR, PanelSettings, ParamMap, RECEPTOR_COLOR, SYNAPSE_COLOR, SizeMode, WidgetConfig,
};

// Top-Level pages
use crate::pages::home::Home;
use crate::pages::not_found::NotFound;

/// Initialize logging and panic hooks for the WASM target.
pub fn init_logging() {
	let _ = console_log::init_with_level(Level::Debug);
	console_error_panic_hook::set_once();
	info!("Logging initialized");
}

/// An app router which renders the homepage and handles 404's
#[component]
pub fn App() -> impl IntoView {
	// Provides context that manages stylesheets, titles, meta tags, etc.
	provide_meta_context();

	view! {
		<Html attr:lang="en" attr:dir="ltr" attr:data-theme="light" />

		// sets the document title
		<Title text="Circuit Graph" />

		// injects metadata in the <head> of the page
		<Meta charset="UTF-8" />
		<Meta name="viewport" content="width=device-width, initial-scale=1.0" />

		<Router>
			<Routes fallback=|| view! { <NotFound /> }>
				<Route path=path!("/") view=Home />
			</Routes>
		</Router>
	}
}
