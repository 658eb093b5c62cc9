use serde_json::Value;

use super::graph::CircuitGraph;
use super::types::{ExportPayload, ExportedEdge, NodeAttrs, NodeEntry};

/// Serialize the structural part of the graph back into the host format.
///
/// Only `class` and the model parameters survive; display state (color, size,
/// position, z, label, type) stays behind. The result is always marked
/// directed, which is what the host side expects to read back. Edge ids go
/// back exactly as received; edges without one get their generated key.
pub fn export(graph: &CircuitGraph) -> ExportPayload {
	let nodes = graph
		.nodes()
		.map(|node| {
			NodeEntry(
				node.key().to_owned(),
				NodeAttrs {
					class: node.model().map(str::to_owned),
					label: None,
					name: None,
					params: node.params().clone(),
				},
			)
		})
		.collect();

	let edges = graph
		.links()
		.filter_map(|(source, target, edge)| {
			let source = graph.node(source)?.key().to_owned();
			let target = graph.node(target)?.key().to_owned();
			let id = edge.id().cloned().unwrap_or_else(|| Value::from(edge.key()));
			Some(ExportedEdge(source, target, id))
		})
		.collect();

	ExportPayload {
		nodes,
		edges,
		directed: true,
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::components::circuit_graph::builder::build;
	use crate::components::circuit_graph::types::{GraphPayload, SizeMode};
	use serde_json::json;

	#[test]
	fn test_export_strips_display_state() {
		let payload: GraphPayload = serde_json::from_value(json!({
			"directed": false,
			"nodes": [
				["n0", {"class": "LeakyIAF", "name": "N0", "V": -0.05, "threshold": 1}],
				["s0", {"class": "AlphaSynapse", "gmax": 0.003}]
			],
			"edges": [["n0", "s0", {"id": "conn"}], ["s0", "n0", {}]]
		}))
		.unwrap();
		let out = serde_json::to_value(export(&build(&payload, SizeMode::Degree))).unwrap();

		assert_eq!(
			out,
			json!({
				"nodes": [
					["n0", {"class": "LeakyIAF", "V": -0.05, "threshold": 1}],
					["s0", {"class": "AlphaSynapse", "gmax": 0.003}]
				],
				"edges": [["n0", "s0", "conn"], ["s0", "n0", "e1"]],
				"directed": true
			})
		);
	}

	#[test]
	fn test_export_returns_host_ids_untouched() {
		let payload: GraphPayload = serde_json::from_value(json!({
			"nodes": [["a", {"class": "x"}], ["b", {"class": "x"}]],
			"edges": [["a", "b", {}], ["a", "b", {"id": 0}], ["b", "a", {"id": "e0"}]]
		}))
		.unwrap();
		let out = serde_json::to_value(export(&build(&payload, SizeMode::Degree))).unwrap();
		assert_eq!(out["edges"], json!([["a", "b", "e1"], ["a", "b", 0], ["b", "a", "e0"]]));
	}

	#[test]
	fn test_export_omits_missing_class() {
		let payload: GraphPayload =
			serde_json::from_value(json!({"nodes": [["n", {"V": 1}]]})).unwrap();
		let out = export(&build(&payload, SizeMode::Degree));
		assert_eq!(out.nodes[0].1.class, None);
		assert_eq!(out.nodes[0].1.params.get("V"), Some(&json!(1)));
	}

	#[test]
	fn test_export_keeps_parallel_edges() {
		let payload: GraphPayload = serde_json::from_value(json!({
			"nodes": [["a", {"class": "x"}], ["b", {"class": "x"}]],
			"edges": [["a", "b", {}], ["a", "b", {}]]
		}))
		.unwrap();
		let out = export(&build(&payload, SizeMode::Degree));
		assert_eq!(
			out.edges,
			vec![
				ExportedEdge("a".into(), "b".into(), "e0".into()),
				ExportedEdge("a".into(), "b".into(), "e1".into()),
			]
		);
	}
}
