use std::collections::BTreeSet;

use super::error::CircuitError;
use super::graph::{CircuitGraph, EdgeIdx, NodeIdx};

/// Neighborhood highlighting: the selected node, its neighbors and incident
/// edges keep their own colors, everything else is muted and pushed back.
#[derive(Clone, Debug, Default)]
pub struct SelectionHighlighter {
	selected: Option<NodeIdx>,
	nodes: BTreeSet<NodeIdx>,
	edges: BTreeSet<EdgeIdx>,
}

impl SelectionHighlighter {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn selected(&self) -> Option<NodeIdx> {
		self.selected
	}

	pub fn has_selection(&self) -> bool {
		!self.nodes.is_empty()
	}

	/// Highlight the closed neighborhood of `idx`, replacing whatever was
	/// highlighted before.
	pub fn select_node(
		&mut self,
		graph: &mut CircuitGraph,
		idx: NodeIdx,
	) -> Result<(), CircuitError> {
		if graph.node(idx).is_none() {
			return Err(CircuitError::UnknownNode(format!("#{}", idx.index())));
		}

		self.nodes = graph.neighbors(idx);
		self.nodes.insert(idx);
		self.edges = graph.incident_edges(idx);
		self.selected = Some(idx);

		for (node_idx, node) in graph.node_indices().zip(graph.nodes_mut()) {
			if self.nodes.contains(&node_idx) {
				node.restore();
			} else {
				node.mute();
			}
		}
		for (edge_idx, edge) in graph.edge_indices().zip(graph.edges_mut()) {
			if self.edges.contains(&edge_idx) {
				edge.restore();
			} else {
				edge.mute();
			}
		}
		Ok(())
	}

	/// Restore every node and edge. Does nothing when nothing is highlighted.
	pub fn clear_selection(&mut self, graph: &mut CircuitGraph) {
		if self.nodes.is_empty() {
			return;
		}
		self.nodes.clear();
		self.edges.clear();
		self.selected = None;

		graph.nodes_mut().for_each(|n| n.restore());
		graph.edges_mut().for_each(|e| e.restore());
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::components::circuit_graph::builder::build;
	use crate::components::circuit_graph::graph::MUTED_COLOR;
	use crate::components::circuit_graph::types::{GraphPayload, SizeMode};
	use serde_json::json;

	// a -> b -> c, d -> e
	fn graph() -> CircuitGraph {
		let payload: GraphPayload = serde_json::from_value(json!({
			"nodes": [
				["a", {"class": "LeakyIAF"}],
				["b", {"class": "AlphaSynapse"}],
				["c", {"class": "LeakyIAF"}],
				["d", {"class": "PhotoReceptor"}],
				["e", {"class": "Port"}]
			],
			"edges": [["a", "b", {}], ["b", "c", {"color": "#0A0"}], ["d", "e", {}]]
		}))
		.unwrap();
		build(&payload, SizeMode::Degree)
	}

	fn colors(g: &CircuitGraph) -> Vec<String> {
		g.nodes()
			.map(|n| format!("{}:{}", n.color(), n.z()))
			.chain(g.edges().map(|e| format!("{}:{}", e.color(), e.z())))
			.collect()
	}

	fn assert_only_two_colors(g: &CircuitGraph) {
		assert!(g.nodes().all(|n| n.color() == n.original_color() || n.color() == MUTED_COLOR));
		assert!(g.edges().all(|e| e.color() == e.original_color() || e.color() == MUTED_COLOR));
	}

	#[test]
	fn test_select_highlights_closed_neighborhood() {
		let mut g = graph();
		let mut hl = SelectionHighlighter::new();
		let a = g.index_of("a").unwrap();
		hl.select_node(&mut g, a).unwrap();

		for key in ["a", "b"] {
			let n = g.node_by_key(key).unwrap();
			assert_eq!(n.color(), n.original_color());
			assert_eq!(n.z(), 1);
		}
		for key in ["c", "d", "e"] {
			let n = g.node_by_key(key).unwrap();
			assert_eq!(n.color(), MUTED_COLOR);
			assert_eq!(n.z(), 0);
		}
		let edges: Vec<_> = g.edges().collect();
		assert_eq!(edges[0].z(), 1);
		assert_eq!(edges[1].color(), MUTED_COLOR);
		assert_eq!(edges[2].z(), 0);
		assert_eq!(hl.selected(), Some(a));
		assert_only_two_colors(&g);
	}

	#[test]
	fn test_select_then_clear_restores_everything() {
		let mut g = graph();
		let before = colors(&g);
		let mut hl = SelectionHighlighter::new();
		let b = g.index_of("b").unwrap();
		hl.select_node(&mut g, b).unwrap();
		assert_ne!(colors(&g), before);
		hl.clear_selection(&mut g);
		assert_eq!(colors(&g), before);
		assert!(!hl.has_selection());
		assert_eq!(hl.selected(), None);
	}

	#[test]
	fn test_second_selection_replaces_first() {
		let mut g = graph();
		let mut hl = SelectionHighlighter::new();
		let (a, e) = (g.index_of("a").unwrap(), g.index_of("e").unwrap());
		hl.select_node(&mut g, a).unwrap();
		hl.select_node(&mut g, e).unwrap();

		for key in ["a", "b", "c"] {
			assert_eq!(g.node_by_key(key).unwrap().z(), 0);
		}
		for key in ["d", "e"] {
			assert_eq!(g.node_by_key(key).unwrap().z(), 1);
		}
		assert_eq!(hl.selected(), Some(e));
		assert_only_two_colors(&g);
	}

	#[test]
	fn test_clear_without_selection_is_noop() {
		let mut g = graph();
		let before = colors(&g);
		let mut hl = SelectionHighlighter::new();
		hl.clear_selection(&mut g);
		hl.clear_selection(&mut g);
		assert_eq!(colors(&g), before);
	}

	#[test]
	fn test_incoming_edges_count_as_incident() {
		let mut g = graph();
		let mut hl = SelectionHighlighter::new();
		let c = g.index_of("c").unwrap();
		hl.select_node(&mut g, c).unwrap();
		assert_eq!(g.node_by_key("b").unwrap().z(), 1);
		assert_eq!(g.edges().filter(|e| e.z() == 1).count(), 1);
		assert_eq!(g.edges().nth(1).unwrap().color(), "#0A0");
	}
}
