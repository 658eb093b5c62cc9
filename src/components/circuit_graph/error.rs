use thiserror::Error;

/// Failures surfaced by the circuit graph engine.
///
/// None of these are fatal to the widget; the canvas logs them and keeps going.
#[derive(Debug, Error)]
pub enum CircuitError {
	/// The host JSON did not parse.
	#[error("invalid widget configuration: {0}")]
	Config(#[from] serde_json::Error),

	/// No node with this key (or index).
	#[error("unknown node `{0}`")]
	UnknownNode(String),

	/// The node has no numeric parameter by that name.
	#[error("node `{node}` has no numeric parameter `{param}`")]
	#[allow(missing_docs)]
	UnknownParam { node: String, param: String },

	/// NaN and infinities are refused.
	#[error("parameter `{param}` cannot hold non-finite value {value}")]
	#[allow(missing_docs)]
	NonFiniteParam { param: String, value: f64 },

	/// A second edge between the same pair in a simple graph.
	#[error("edge {from} -> {to} already exists and the graph does not allow parallel edges")]
	#[allow(missing_docs)]
	ParallelEdge { from: String, to: String },
}
