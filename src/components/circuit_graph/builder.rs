//! Payload → typed graph.

use std::collections::HashSet;

use log::{debug, warn};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use super::graph::{CircuitGraph, EdgeSpec, GraphKind, Node};
use super::sizing::apply_sizes;
use super::types::{EdgeEntry, GraphPayload, NodeAttrs, NodeEntry, SizeMode, value_text};

const DEFAULT_SEED: u64 = 0x6e65_7563_6164;

pub struct GraphBuilder {
	size_mode: SizeMode,
	seed: u64,
}

impl Default for GraphBuilder {
	fn default() -> Self {
		Self::new(SizeMode::default())
	}
}

impl GraphBuilder {
	pub fn new(size_mode: SizeMode) -> Self {
		Self {
			size_mode,
			seed: DEFAULT_SEED,
		}
	}

	/// Seed for the initial scatter of node positions.
	pub fn with_seed(mut self, seed: u64) -> Self {
		self.seed = seed;
		self
	}

	pub fn build(&self, payload: &GraphPayload) -> CircuitGraph {
		let kind = scan_kind(payload);
		if kind == GraphKind::Multi {
			debug!("payload contains parallel edges, building a multi graph");
		}

		let mut graph = CircuitGraph::new(payload.directed, kind);
		let mut rng = SmallRng::seed_from_u64(self.seed);

		for NodeEntry(key, attrs) in &payload.nodes {
			if graph.index_of(key).is_some() {
				warn!("duplicate node `{key}` ignored");
				continue;
			}
			let (x, y): (f32, f32) = (rng.r#gen(), rng.r#gen());
			graph.add_node(node_from_attrs(key, attrs).with_position(x, y));
		}

		// generated keys must not shadow an id that appears later in the payload
		let host_ids: HashSet<String> = payload
			.edges
			.iter()
			.filter_map(|EdgeEntry(_, _, attrs)| attrs.id.as_ref().map(value_text))
			.collect();
		for EdgeEntry(source, target, attrs) in &payload.edges {
			let (Some(src), Some(tgt)) = (graph.index_of(source), graph.index_of(target)) else {
				warn!("edge {source} -> {target} references an unknown node, skipped");
				continue;
			};
			let mut extra = attrs.extra.clone();
			if let Some(viz) = &attrs.viz {
				extra.insert("viz".to_owned(), viz.clone());
			}
			let key = match &attrs.id {
				Some(id) => value_text(id),
				None => graph.free_edge_key(graph.edge_count(), &host_ids),
			};
			let spec = EdgeSpec {
				id: attrs.id.clone(),
				key: Some(key),
				color: attrs.color.clone(),
				attrs: extra,
			};
			if let Err(err) = graph.add_edge(src, tgt, spec) {
				// scan_kind saw the same pairs, so this means the payload changed under us
				warn!("{err}");
			}
		}

		apply_sizes(&mut graph, self.size_mode);
		debug!(
			"built circuit graph: {} nodes, {} edges ({:?})",
			graph.order(),
			graph.edge_count(),
			graph.kind()
		);
		graph
	}
}

/// Build with the default seed.
pub fn build(payload: &GraphPayload, size_mode: SizeMode) -> CircuitGraph {
	GraphBuilder::new(size_mode).build(payload)
}

fn node_from_attrs(key: &str, attrs: &NodeAttrs) -> Node {
	if attrs.class.is_none() {
		warn!("node `{key}` has no class attribute, treating it as an axon hillock");
	}
	let label = attrs.name.as_ref().map(value_text).unwrap_or_else(|| key.to_owned());
	Node::new(key, attrs.class.clone(), label, attrs.params.clone())
}

/// Decide up front whether any endpoint pair repeats.
fn scan_kind(payload: &GraphPayload) -> GraphKind {
	let mut seen = HashSet::with_capacity(payload.edges.len());
	for EdgeEntry(source, target, _) in &payload.edges {
		let pair = if payload.directed || source <= target {
			(source.as_str(), target.as_str())
		} else {
			(target.as_str(), source.as_str())
		};
		if !seen.insert(pair) {
			return GraphKind::Multi;
		}
	}
	GraphKind::Simple
}
