pub mod circuit_graph;
