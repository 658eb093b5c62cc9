use super::graph::CircuitGraph;
use super::types::SizeMode;

/// Smallest drawn node size.
pub const MIN_NODE_SIZE: f32 = 1.0;
/// Largest drawn node size.
pub const MAX_NODE_SIZE: f32 = 10.0;

/// Map every node's degree linearly onto `[MIN_NODE_SIZE, MAX_NODE_SIZE]`.
pub fn apply_sizes(graph: &mut CircuitGraph, mode: SizeMode) {
	let degrees: Vec<usize> = graph
		.node_indices()
		.map(|idx| graph.degree_by(idx, mode))
		.collect();
	let (Some(&min), Some(&max)) = (degrees.iter().min(), degrees.iter().max()) else {
		return;
	};

	for (node, &degree) in graph.nodes_mut().zip(&degrees) {
		node.set_size(size_for(degree, min, max));
	}
}

/// Uniform degrees collapse to the minimum size.
pub fn size_for(degree: usize, min: usize, max: usize) -> f32 {
	if max == min {
		return MIN_NODE_SIZE;
	}
	let t = (degree - min) as f32 / (max - min) as f32;
	MIN_NODE_SIZE + (MAX_NODE_SIZE - MIN_NODE_SIZE) * t
}
