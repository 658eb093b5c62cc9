//! Neural-circuit graph widget: payload parsing, typed graph construction,
//! degree sizing, force-directed layout, neighborhood highlighting and export,
//! plus the canvas component that puts it on screen.

mod barnes_hut;
mod builder;
mod component;
mod error;
mod export;
mod graph;
mod highlight;
mod layout;
mod panel;
mod panel_view;
mod render;
mod sizing;
mod state;
mod types;

pub use component::CircuitGraphCanvas;
pub use error::CircuitError;
pub use graph::{
	AXON_HILLOCK_COLOR, DEFAULT_EDGE_COLOR, GraphKind, MUTED_COLOR, NodeType, PORT_COLOR,
	RECEPTOR_COLOR, SYNAPSE_COLOR,
};
pub use state::{CircuitHandle, CircuitState, InteractionEvent};
pub use types::{
	EdgeAttrs, EdgeEntry, ExportPayload, ExportedEdge, GraphPayload, LayoutAlgorithm, NodeAttrs,
	NodeEntry, PanelSettings, ParamMap, SizeMode, WidgetConfig,
};
