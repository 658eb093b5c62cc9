//! Typed circuit graph: nodes classified by model type, edges with their own
//! display state, and the degree queries used for sizing.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt;

use petgraph::Direction::{Incoming, Outgoing};
use petgraph::graph::{DiGraph, EdgeIndex, EdgeIndices, NodeIndex, NodeIndices};
use petgraph::visit::EdgeRef;
use serde_json::Value;

use super::error::CircuitError;
use super::types::{ParamMap, SizeMode, value_text};

/// Axon hillocks, and anything unclassified, are red.
pub const AXON_HILLOCK_COLOR: &str = "#FF0000";
/// Synapses are green.
pub const SYNAPSE_COLOR: &str = "#00FF00";
/// Receptors are blue.
pub const RECEPTOR_COLOR: &str = "#0000FF";
/// Ports are teal.
pub const PORT_COLOR: &str = "#00AAAA";
/// Color of everything outside the current selection.
pub const MUTED_COLOR: &str = "#FBFBFB";
/// Edge color when the payload does not give one.
pub const DEFAULT_EDGE_COLOR: &str = "#CCC";

/// Placeholder size until degrees are known.
pub const INITIAL_NODE_SIZE: f32 = 2.0;

/// Coarse model type, derived once from the model class name.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum NodeType {
	/// Neuron body; also the fallback for unknown classes.
	#[default]
	AxonHillock,
	/// Class contains "synapse".
	Synapse,
	/// Class contains "receptor".
	Receptor,
	/// Class contains "port".
	Port,
}

impl NodeType {
	/// Classify a model class name. Synapse wins over Receptor wins over Port;
	/// anything else is an axon hillock.
	pub fn classify(class: &str) -> Self {
		let class = class.to_lowercase();
		if class.contains("synapse") {
			Self::Synapse
		} else if class.contains("receptor") {
			Self::Receptor
		} else if class.contains("port") {
			Self::Port
		} else {
			Self::AxonHillock
		}
	}

	/// Baseline display color.
	pub fn color(self) -> &'static str {
		match self {
			Self::AxonHillock => AXON_HILLOCK_COLOR,
			Self::Synapse => SYNAPSE_COLOR,
			Self::Receptor => RECEPTOR_COLOR,
			Self::Port => PORT_COLOR,
		}
	}

	/// Name shown in the property panel.
	pub fn name(self) -> &'static str {
		match self {
			Self::AxonHillock => "AxonHillock",
			Self::Synapse => "Synapse",
			Self::Receptor => "Receptor",
			Self::Port => "Port",
		}
	}
}

impl fmt::Display for NodeType {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.name())
	}
}

/// Whether the graph may hold more than one edge per endpoint pair.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum GraphKind {
	/// At most one edge per pair.
	#[default]
	Simple,
	/// Parallel edges allowed.
	Multi,
}

/// Node handle into a [`CircuitGraph`].
pub type NodeIdx = NodeIndex;
/// Edge handle into a [`CircuitGraph`].
pub type EdgeIdx = EdgeIndex;

/// Node weight: one circuit component with its model and display state.
#[derive(Clone, Debug)]
pub struct Node {
	key: String,
	node_type: NodeType,
	model: Option<String>,
	label: String,
	params: ParamMap,
	original_color: &'static str,
	color: &'static str,
	size: f32,
	/// Layout position.
	pub x: f32,
	/// Layout position.
	pub y: f32,
	z: u8,
}

impl Node {
	/// New node at the origin. Type and baseline color come from `model`.
	pub fn new(
		key: impl Into<String>,
		model: Option<String>,
		label: impl Into<String>,
		params: ParamMap,
	) -> Self {
		let node_type = model.as_deref().map(NodeType::classify).unwrap_or_default();
		let color = node_type.color();
		Self {
			key: key.into(),
			node_type,
			model,
			label: label.into(),
			params,
			original_color: color,
			color,
			size: INITIAL_NODE_SIZE,
			x: 0.0,
			y: 0.0,
			z: 1,
		}
	}

	/// Place the node.
	pub fn with_position(mut self, x: f32, y: f32) -> Self {
		self.x = x;
		self.y = y;
		self
	}

	/// Payload key.
	pub fn key(&self) -> &str {
		&self.key
	}

	/// Type classified from the model class.
	pub fn node_type(&self) -> NodeType {
		self.node_type
	}

	/// Model class string exactly as received.
	pub fn model(&self) -> Option<&str> {
		self.model.as_deref()
	}

	/// Display name: the `name` attribute, else the key.
	pub fn label(&self) -> &str {
		&self.label
	}

	/// Model parameters; never holds `class`, `name` or `label`.
	pub fn params(&self) -> &ParamMap {
		&self.params
	}

	/// Overwrite a model parameter, returning the previous value.
	pub fn set_param(&mut self, name: &str, value: Value) -> Option<Value> {
		self.params.insert(name.to_owned(), value)
	}

	/// Current color: the baseline or [`MUTED_COLOR`].
	pub fn color(&self) -> &'static str {
		self.color
	}

	/// Baseline color of the node's type.
	pub fn original_color(&self) -> &'static str {
		self.original_color
	}

	/// Degree-derived size.
	pub fn size(&self) -> f32 {
		self.size
	}

	pub(crate) fn set_size(&mut self, size: f32) {
		self.size = size;
	}

	/// Draw layer: 1 normal, 0 muted.
	pub fn z(&self) -> u8 {
		self.z
	}

	/// `(x, y)`
	pub fn position(&self) -> (f32, f32) {
		(self.x, self.y)
	}

	pub(crate) fn restore(&mut self) {
		self.color = self.original_color;
		self.z = 1;
	}

	pub(crate) fn mute(&mut self) {
		self.color = MUTED_COLOR;
		self.z = 0;
	}
}

/// Edge weight: the host's id plus display state.
#[derive(Clone, Debug)]
pub struct Edge {
	key: String,
	id: Option<Value>,
	original_color: String,
	color: String,
	z: u8,
	arrow: bool,
	attrs: ParamMap,
}

impl Edge {
	/// Host id as text, else a generated `e<n>` that no other edge uses.
	pub fn key(&self) -> &str {
		&self.key
	}

	/// Host id exactly as received.
	pub fn id(&self) -> Option<&Value> {
		self.id.as_ref()
	}

	/// Current color: the baseline or [`MUTED_COLOR`].
	pub fn color(&self) -> &str {
		&self.color
	}

	/// Baseline color.
	pub fn original_color(&self) -> &str {
		&self.original_color
	}

	/// Draw layer: 1 normal, 0 muted.
	pub fn z(&self) -> u8 {
		self.z
	}

	/// Directed graphs draw their edges with arrowheads.
	pub fn is_arrow(&self) -> bool {
		self.arrow
	}

	/// Host attributes not interpreted by the widget (`viz` included).
	pub fn attrs(&self) -> &ParamMap {
		&self.attrs
	}

	pub(crate) fn restore(&mut self) {
		self.color.clone_from(&self.original_color);
		self.z = 1;
	}

	pub(crate) fn mute(&mut self) {
		self.color = MUTED_COLOR.to_owned();
		self.z = 0;
	}
}

/// Everything needed to insert an edge besides its endpoints.
#[derive(Clone, Debug, Default)]
pub(crate) struct EdgeSpec {
	pub id: Option<Value>,
	/// Takes precedence over the key derived from `id`.
	pub key: Option<String>,
	pub color: Option<String>,
	pub attrs: ParamMap,
}

/// The circuit: a petgraph digraph plus key lookup. Undirected payloads keep
/// the orientation they were given and are queried direction-agnostically.
#[derive(Clone, Debug, Default)]
pub struct CircuitGraph {
	directed: bool,
	kind: GraphKind,
	inner: DiGraph<Node, Edge>,
	index: HashMap<String, NodeIdx>,
	edge_keys: HashSet<String>,
}

impl CircuitGraph {
	/// Empty graph. Directedness and kind are fixed for its lifetime.
	pub fn new(directed: bool, kind: GraphKind) -> Self {
		Self {
			directed,
			kind,
			..Self::default()
		}
	}

	/// Whether edges have a direction.
	pub fn is_directed(&self) -> bool {
		self.directed
	}

	/// Simple or multi, as decided when the graph was built.
	pub fn kind(&self) -> GraphKind {
		self.kind
	}

	/// Number of nodes.
	pub fn order(&self) -> usize {
		self.inner.node_count()
	}

	/// Number of edges, parallel ones included.
	pub fn edge_count(&self) -> usize {
		self.inner.edge_count()
	}

	/// Insert a node. A key that is already present keeps its first node and
	/// returns the existing index.
	pub fn add_node(&mut self, node: Node) -> NodeIdx {
		if let Some(&idx) = self.index.get(node.key()) {
			return idx;
		}
		let key = node.key.clone();
		let idx = self.inner.add_node(node);
		self.index.insert(key, idx);
		idx
	}

	pub(crate) fn add_edge(
		&mut self,
		source: NodeIdx,
		target: NodeIdx,
		spec: EdgeSpec,
	) -> Result<EdgeIdx, CircuitError> {
		for idx in [source, target] {
			if self.inner.node_weight(idx).is_none() {
				return Err(CircuitError::UnknownNode(format!("#{}", idx.index())));
			}
		}
		if self.kind == GraphKind::Simple && self.has_edge(source, target) {
			return Err(CircuitError::ParallelEdge {
				from: self.inner[source].key.clone(),
				to: self.inner[target].key.clone(),
			});
		}

		let key = spec
			.key
			.or_else(|| spec.id.as_ref().map(value_text))
			.unwrap_or_else(|| self.free_edge_key(self.inner.edge_count(), &HashSet::new()));
		self.edge_keys.insert(key.clone());
		let color = spec.color.unwrap_or_else(|| DEFAULT_EDGE_COLOR.to_owned());
		let edge = Edge {
			key,
			id: spec.id,
			original_color: color.clone(),
			color,
			z: 1,
			arrow: self.directed,
			attrs: spec.attrs,
		};
		Ok(self.inner.add_edge(source, target, edge))
	}

	/// First `e<n>`, counting up from `n`, that neither an edge nor `reserved`
	/// uses.
	pub(crate) fn free_edge_key(&self, mut n: usize, reserved: &HashSet<String>) -> String {
		loop {
			let key = format!("e{n}");
			if !self.edge_keys.contains(&key) && !reserved.contains(&key) {
				return key;
			}
			n += 1;
		}
	}

	/// Is there already an edge from `source` to `target`? Undirected graphs
	/// ignore the orientation.
	pub fn has_edge(&self, source: NodeIdx, target: NodeIdx) -> bool {
		if self.directed {
			self.inner.find_edge(source, target).is_some()
		} else {
			self.inner.find_edge_undirected(source, target).is_some()
		}
	}

	/// Node by handle.
	pub fn node(&self, idx: NodeIdx) -> Option<&Node> {
		self.inner.node_weight(idx)
	}

	pub(crate) fn node_mut(&mut self, idx: NodeIdx) -> Option<&mut Node> {
		self.inner.node_weight_mut(idx)
	}

	/// Edge by handle.
	pub fn edge(&self, idx: EdgeIdx) -> Option<&Edge> {
		self.inner.edge_weight(idx)
	}

	/// `(source, target)` of an edge, as inserted.
	pub fn endpoints(&self, idx: EdgeIdx) -> Option<(NodeIdx, NodeIdx)> {
		self.inner.edge_endpoints(idx)
	}

	/// Handle of the node with this key.
	pub fn index_of(&self, key: &str) -> Option<NodeIdx> {
		self.index.get(key).copied()
	}

	/// Node with this key.
	pub fn node_by_key(&self, key: &str) -> Option<&Node> {
		self.index_of(key).and_then(|idx| self.node(idx))
	}

	/// Nodes in insertion order.
	pub fn nodes(&self) -> impl Iterator<Item = &Node> {
		self.inner.node_weights()
	}

	pub(crate) fn nodes_mut(&mut self) -> impl Iterator<Item = &mut Node> {
		self.inner.node_weights_mut()
	}

	/// Node handles in insertion order.
	pub fn node_indices(&self) -> NodeIndices {
		self.inner.node_indices()
	}

	/// Edges in insertion order.
	pub fn edges(&self) -> impl Iterator<Item = &Edge> {
		self.inner.edge_weights()
	}

	pub(crate) fn edges_mut(&mut self) -> impl Iterator<Item = &mut Edge> {
		self.inner.edge_weights_mut()
	}

	/// Edge handles in insertion order.
	pub fn edge_indices(&self) -> EdgeIndices {
		self.inner.edge_indices()
	}

	/// `(source, target, edge)` in insertion order.
	pub fn links(&self) -> impl Iterator<Item = (NodeIdx, NodeIdx, &Edge)> {
		self.inner
			.edge_references()
			.map(|e| (e.source(), e.target(), e.weight()))
	}

	/// Total degree; a self-loop counts twice.
	pub fn degree(&self, idx: NodeIdx) -> usize {
		self.inner.edges_directed(idx, Outgoing).count()
			+ self.inner.edges_directed(idx, Incoming).count()
	}

	/// In-degree; undirected graphs report the total degree.
	pub fn in_degree(&self, idx: NodeIdx) -> usize {
		if self.directed {
			self.inner.edges_directed(idx, Incoming).count()
		} else {
			self.degree(idx)
		}
	}

	/// Out-degree; undirected graphs report the total degree.
	pub fn out_degree(&self, idx: NodeIdx) -> usize {
		if self.directed {
			self.inner.edges_directed(idx, Outgoing).count()
		} else {
			self.degree(idx)
		}
	}

	/// Degree under a sizing mode.
	pub fn degree_by(&self, idx: NodeIdx, mode: SizeMode) -> usize {
		match mode {
			SizeMode::Degree => self.degree(idx),
			SizeMode::InDegree => self.in_degree(idx),
			SizeMode::OutDegree => self.out_degree(idx),
		}
	}

	/// Nodes sharing an edge with `idx` in either direction.
	pub fn neighbors(&self, idx: NodeIdx) -> BTreeSet<NodeIdx> {
		self.inner
			.neighbors_undirected(idx)
			.filter(|&n| n != idx)
			.collect()
	}

	/// Every edge touching `idx`, whatever its direction.
	pub fn incident_edges(&self, idx: NodeIdx) -> BTreeSet<EdgeIdx> {
		self.inner
			.edges_directed(idx, Outgoing)
			.chain(self.inner.edges_directed(idx, Incoming))
			.map(|e| e.id())
			.collect()
	}
}
