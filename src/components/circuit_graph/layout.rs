//! Force-directed layout lifecycle.
//!
//! Small graphs run on `force_graph`'s pairwise simulation; on top of it the
//! controller adds the ForceAtlas2-style knobs the widget exposes (gravity,
//! scaling ratio, slow down). Past [`BARNES_HUT_THRESHOLD`] nodes the pairwise
//! simulation is never built and a quadtree approximation integrates instead.

use std::collections::HashSet;
use std::fmt;

use force_graph::{DefaultNodeIdx, EdgeData, ForceGraph, NodeData, SimulationParameters};
use log::{info, warn};

use super::barnes_hut::{self, Body};
use super::graph::{CircuitGraph, NodeIdx};
use super::types::LayoutAlgorithm;

/// Above this many nodes repulsion is approximated.
pub const BARNES_HUT_THRESHOLD: usize = 2000;

const GRAVITY: f32 = 0.05;
const SCALING_RATIO: f32 = 10.0;
/// Charge contributed by each unit of scaling ratio.
const CHARGE_UNIT: f32 = 15.0;
const SPRING: f32 = 0.05;
const FORCE_MAX: f32 = 100.0;
const NODE_SPEED: f32 = 3000.0;
const DAMPING: f32 = 0.9;
/// Displacement per unit of force and time for the forces applied outside
/// `force_graph` (gravity, the approximated engine).
const STEP_GAIN: f32 = 30.0;
/// Gravity never moves a node more than this fraction of its distance to the
/// origin in a single step.
const MAX_GRAVITY_FRACTION: f32 = 0.5;

#[derive(Clone, Debug, PartialEq)]
pub struct LayoutSettings {
	pub barnes_hut_optimize: bool,
	pub strong_gravity_mode: bool,
	pub gravity: f32,
	pub scaling_ratio: f32,
	pub slow_down: f32,
}

impl LayoutSettings {
	/// Settings scaled to a graph with `order` nodes.
	pub fn for_order(order: usize) -> Self {
		Self {
			barnes_hut_optimize: order > BARNES_HUT_THRESHOLD,
			strong_gravity_mode: true,
			gravity: GRAVITY,
			scaling_ratio: SCALING_RATIO,
			slow_down: 1.0 + (order.max(1) as f32).ln(),
		}
	}

	fn charge(&self) -> f32 {
		CHARGE_UNIT * self.scaling_ratio
	}

	fn simulation_parameters(&self) -> SimulationParameters {
		SimulationParameters {
			force_charge: self.charge(),
			force_spring: SPRING,
			force_max: FORCE_MAX,
			node_speed: NODE_SPEED,
			damping_factor: DAMPING,
		}
	}
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LayoutState {
	#[default]
	Stopped,
	Running,
}

/// Recorded when the requested algorithm had to be substituted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LayoutNotice {
	pub requested: LayoutAlgorithm,
	pub used: LayoutAlgorithm,
}

impl fmt::Display for LayoutNotice {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(
			f,
			"{} layout not currently supported, defaulting to {}",
			self.requested, self.used
		)
	}
}

/// What integrates positions between frames.
enum Engine {
	/// `force_graph`'s pairwise simulation.
	Pairwise {
		sim: ForceGraph<usize, ()>,
		handles: Vec<DefaultNodeIdx>,
	},
	/// Quadtree repulsion and linear springs, integrated here.
	BarnesHut { springs: Vec<(usize, usize)> },
}

impl Engine {
	fn new(graph: &CircuitGraph, settings: &LayoutSettings, masses: &[f32], pinned: &[bool]) -> Self {
		if settings.barnes_hut_optimize {
			Engine::BarnesHut {
				springs: spring_pairs(graph),
			}
		} else {
			let (sim, handles) = simulation(graph, settings, masses, pinned);
			Engine::Pairwise { sim, handles }
		}
	}
}

pub struct LayoutController {
	requested: LayoutAlgorithm,
	settings: LayoutSettings,
	state: LayoutState,
	engine: Engine,
	masses: Vec<f32>,
	pinned: Vec<bool>,
	notices: Vec<LayoutNotice>,
}

impl LayoutController {
	pub fn new(graph: &CircuitGraph, requested: LayoutAlgorithm) -> Self {
		Self::with_settings(graph, requested, LayoutSettings::for_order(graph.order()))
	}

	pub fn with_settings(
		graph: &CircuitGraph,
		requested: LayoutAlgorithm,
		settings: LayoutSettings,
	) -> Self {
		let mut notices = Vec::new();
		if !requested.is_supported() {
			let notice = LayoutNotice {
				requested: requested.clone(),
				used: LayoutAlgorithm::ForceAtlas2,
			};
			warn!("{notice}");
			notices.push(notice);
		}

		let masses: Vec<f32> = graph
			.node_indices()
			.map(|idx| 1.0 + graph.degree(idx) as f32)
			.collect();
		let pinned = vec![false; graph.order()];
		let engine = Engine::new(graph, &settings, &masses, &pinned);

		Self {
			requested,
			settings,
			state: LayoutState::Stopped,
			engine,
			masses,
			pinned,
			notices,
		}
	}

	/// The algorithm actually driving positions.
	pub fn algorithm(&self) -> LayoutAlgorithm {
		LayoutAlgorithm::ForceAtlas2
	}

	pub fn notices(&self) -> &[LayoutNotice] {
		&self.notices
	}

	pub fn is_running(&self) -> bool {
		self.state == LayoutState::Running
	}

	pub fn start(&mut self) {
		if self.state == LayoutState::Stopped {
			info!("layout started ({})", self.algorithm());
			self.state = LayoutState::Running;
		}
	}

	/// Takes effect immediately: no further `step` moves anything.
	pub fn stop(&mut self) {
		if self.state == LayoutState::Running {
			info!("layout stopped");
			self.state = LayoutState::Stopped;
		}
	}

	pub fn toggle(&mut self) -> LayoutState {
		match self.state {
			LayoutState::Stopped => self.start(),
			LayoutState::Running => self.stop(),
		}
		self.state
	}

	/// Anchor a node at a position, e.g. after the user dragged it.
	pub fn pin(&mut self, graph: &mut CircuitGraph, idx: NodeIdx, x: f32, y: f32) {
		let Some(node) = graph.node_mut(idx) else {
			return;
		};
		node.x = x;
		node.y = y;
		if let Some(p) = self.pinned.get_mut(idx.index()) {
			*p = true;
		}
		if let Engine::Pairwise { sim, .. } = &mut self.engine {
			let i = idx.index();
			sim.visit_nodes_mut(|n| {
				if n.data.user_data == i {
					n.data.x = x;
					n.data.y = y;
					n.data.is_anchor = true;
				}
			});
		}
	}

	/// Advance the simulation by `dt` seconds and copy positions into `graph`.
	/// Returns `false` without touching anything unless the layout is running.
	pub fn step(&mut self, graph: &mut CircuitGraph, dt: f32) -> bool {
		if !self.is_running() {
			return false;
		}
		if graph.order() != self.pinned.len() {
			warn!("layout is out of sync with the graph, rebuilding simulation");
			*self = Self::with_settings(graph, self.requested.clone(), self.settings.clone())
				.running();
		}

		let dt = dt / self.settings.slow_down;
		let previous: Vec<(f32, f32)> = graph.nodes().map(|n| n.position()).collect();

		let mut next = match &mut self.engine {
			Engine::Pairwise { sim, .. } => {
				// positions may have been moved outside the layout since the last step
				sim.visit_nodes_mut(|n| {
					if let Some(&(x, y)) = previous.get(n.data.user_data) {
						n.data.x = x;
						n.data.y = y;
					}
				});
				sim.update(dt);
				let mut next = previous.clone();
				sim.visit_nodes(|n| {
					if let Some(pos) = next.get_mut(n.data.user_data) {
						*pos = (n.x(), n.y());
					}
				});
				next
			}
			Engine::BarnesHut { springs } => approximate_step(
				&previous,
				&self.masses,
				&self.pinned,
				springs,
				self.settings.charge(),
				dt,
			),
		};

		for ((pos, &mass), &pinned) in next.iter_mut().zip(&self.masses).zip(&self.pinned) {
			if !pinned {
				let (gx, gy) = self.gravity_pull(pos.0, pos.1, mass, dt);
				pos.0 += gx;
				pos.1 += gy;
			}
		}

		let mut diverged = false;
		for (pos, prev) in next.iter_mut().zip(&previous) {
			if !(pos.0.is_finite() && pos.1.is_finite()) {
				*pos = *prev;
				diverged = true;
			}
		}

		for (node, &(x, y)) in graph.nodes_mut().zip(&next) {
			node.x = x;
			node.y = y;
		}
		if let Engine::Pairwise { sim, handles } = &mut self.engine {
			if diverged {
				// velocities inside the simulation are poisoned too
				warn!("layout step produced non-finite positions, resetting simulation");
				(*sim, *handles) = simulation(graph, &self.settings, &self.masses, &self.pinned);
			} else {
				sim.visit_nodes_mut(|n| {
					if let Some(&(x, y)) = next.get(n.data.user_data) {
						n.data.x = x;
						n.data.y = y;
					}
				});
			}
		} else if diverged {
			warn!("layout step produced non-finite positions, kept the previous ones");
		}
		true
	}

	fn running(mut self) -> Self {
		self.state = LayoutState::Running;
		self
	}

	fn gravity_pull(&self, x: f32, y: f32, mass: f32, dt: f32) -> (f32, f32) {
		let dist = (x * x + y * y).sqrt();
		if dist < f32::EPSILON {
			return (0.0, 0.0);
		}
		let s = &self.settings;
		let magnitude = if s.strong_gravity_mode {
			s.gravity * s.scaling_ratio * mass * dist
		} else {
			s.gravity * s.scaling_ratio * mass
		};
		let step = (magnitude.min(FORCE_MAX) * dt * STEP_GAIN).min(dist * MAX_GRAVITY_FRACTION);
		(-x / dist * step, -y / dist * step)
	}
}

/// One integration step without the pairwise simulation: quadtree repulsion
/// plus linear springs, scaled by mass and clamped per axis.
fn approximate_step(
	previous: &[(f32, f32)],
	masses: &[f32],
	pinned: &[bool],
	springs: &[(usize, usize)],
	charge: f32,
	dt: f32,
) -> Vec<(f32, f32)> {
	let bodies: Vec<Body> = previous
		.iter()
		.zip(masses)
		.map(|(&(x, y), &mass)| Body { x, y, mass })
		.collect();
	let mut forces = barnes_hut::repulsion(&bodies, charge);

	for &(s, t) in springs {
		let (Some(&(xs, ys)), Some(&(xt, yt))) = (previous.get(s), previous.get(t)) else {
			continue;
		};
		let (fx, fy) = (SPRING * (xt - xs), SPRING * (yt - ys));
		if let Some(f) = forces.get_mut(s) {
			f.0 += fx;
			f.1 += fy;
		}
		if let Some(f) = forces.get_mut(t) {
			f.0 -= fx;
			f.1 -= fy;
		}
	}

	previous
		.iter()
		.zip(forces)
		.zip(masses.iter().zip(pinned))
		.map(|((&(x, y), (fx, fy)), (&mass, &pinned))| {
			if pinned {
				return (x, y);
			}
			let ax = (fx / mass).clamp(-FORCE_MAX, FORCE_MAX);
			let ay = (fy / mass).clamp(-FORCE_MAX, FORCE_MAX);
			(x + ax * dt * STEP_GAIN, y + ay * dt * STEP_GAIN)
		})
		.collect()
}

/// Distinct node pairs joined by at least one edge; self-loops pull on nothing
/// and parallel edges add nothing.
fn spring_pairs(graph: &CircuitGraph) -> Vec<(usize, usize)> {
	let mut seen = HashSet::new();
	graph
		.links()
		.map(|(s, t, _)| (s.index(), t.index()))
		.filter(|&(s, t)| s != t && seen.insert((s.min(t), s.max(t))))
		.collect()
}

fn simulation(
	graph: &CircuitGraph,
	settings: &LayoutSettings,
	masses: &[f32],
	pinned: &[bool],
) -> (ForceGraph<usize, ()>, Vec<DefaultNodeIdx>) {
	let mut sim = ForceGraph::new(settings.simulation_parameters());
	let handles: Vec<DefaultNodeIdx> = graph
		.nodes()
		.enumerate()
		.map(|(i, node)| {
			sim.add_node(NodeData {
				x: node.x,
				y: node.y,
				mass: masses.get(i).copied().unwrap_or(1.0),
				is_anchor: pinned.get(i).copied().unwrap_or(false),
				user_data: i,
			})
		})
		.collect();

	for (s, t) in spring_pairs(graph) {
		sim.add_edge(handles[s], handles[t], EdgeData::default());
	}
	(sim, handles)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::components::circuit_graph::builder::build;
	use crate::components::circuit_graph::types::{GraphPayload, SizeMode};
	use serde_json::json;

	fn graph(value: serde_json::Value) -> CircuitGraph {
		let payload: GraphPayload = serde_json::from_value(value).unwrap();
		build(&payload, SizeMode::Degree)
	}

	fn chain() -> CircuitGraph {
		graph(json!({
			"nodes": [["a", {"class": "x"}], ["b", {"class": "y"}], ["c", {"class": "z"}]],
			"edges": [["a", "b", {}], ["b", "c", {}]]
		}))
	}

	fn positions(graph: &CircuitGraph) -> Vec<(f32, f32)> {
		graph.nodes().map(|n| n.position()).collect()
	}

	#[test]
	fn test_settings_scale_with_order() {
		let small = LayoutSettings::for_order(10);
		assert!(!small.barnes_hut_optimize);
		assert!(small.strong_gravity_mode);
		assert_eq!(small.gravity, 0.05);
		assert_eq!(small.scaling_ratio, 10.0);
		assert!((small.slow_down - (1.0 + 10f32.ln())).abs() < 1e-6);

		assert!(!LayoutSettings::for_order(2000).barnes_hut_optimize);
		assert!(LayoutSettings::for_order(2001).barnes_hut_optimize);
		assert_eq!(LayoutSettings::for_order(0).slow_down, 1.0);
	}

	#[test]
	fn test_state_machine() {
		let g = chain();
		let mut layout = LayoutController::new(&g, LayoutAlgorithm::ForceAtlas2);
		assert!(!layout.is_running());
		layout.start();
		assert!(layout.is_running());
		layout.start();
		assert!(layout.is_running());
		assert_eq!(layout.toggle(), LayoutState::Stopped);
		assert_eq!(layout.toggle(), LayoutState::Running);
		layout.stop();
		assert!(!layout.is_running());
		assert!(layout.notices().is_empty());
	}

	#[test]
	fn test_unsupported_algorithm_falls_back() {
		let g = chain();
		for requested in [
			LayoutAlgorithm::Random,
			LayoutAlgorithm::Circular,
			LayoutAlgorithm::Unknown("spiral".into()),
		] {
			let layout = LayoutController::new(&g, requested.clone());
			assert_eq!(layout.algorithm(), LayoutAlgorithm::ForceAtlas2);
			assert_eq!(layout.notices().len(), 1);
			assert_eq!(layout.notices()[0].requested, requested);
			assert_eq!(layout.notices()[0].used, LayoutAlgorithm::ForceAtlas2);
		}
	}

	#[test]
	fn test_stopped_layout_never_moves_nodes() {
		let mut g = chain();
		let before = positions(&g);
		let mut layout = LayoutController::new(&g, LayoutAlgorithm::ForceAtlas2);
		assert!(!layout.step(&mut g, 0.016));

		layout.start();
		assert!(layout.step(&mut g, 0.016));
		layout.stop();
		let after_stop = positions(&g);
		assert!(!layout.step(&mut g, 0.016));
		assert_eq!(positions(&g), after_stop);
		assert_ne!(after_stop, before);
	}

	#[test]
	fn test_gravity_alone_pulls_isolated_node_in() {
		let mut g = graph(json!({"nodes": [["solo", {"class": "x"}]]}));
		let idx = g.index_of("solo").unwrap();
		g.node_mut(idx).unwrap().x = 100.0;
		g.node_mut(idx).unwrap().y = 0.0;

		let mut layout = LayoutController::new(&g, LayoutAlgorithm::ForceAtlas2);
		layout.start();
		layout.step(&mut g, 0.016);
		let (x, _) = g.node(idx).unwrap().position();
		assert!(x < 100.0);
		assert!(x > 0.0);
	}

	#[test]
	fn test_degenerate_graphs_stay_finite() {
		let mut g = graph(json!({
			"nodes": [["a", {"class": "x"}], ["b", {"class": "x"}], ["c", {"class": "x"}]],
			"edges": [["a", "a", {}], ["b", "c", {}], ["b", "c", {}]]
		}));
		let mut layout = LayoutController::new(&g, LayoutAlgorithm::ForceAtlas2);
		layout.start();
		for _ in 0..200 {
			layout.step(&mut g, 0.016);
		}
		assert!(g.nodes().all(|n| n.x.is_finite() && n.y.is_finite()));
	}

	#[test]
	fn test_empty_graph_steps() {
		let mut g = CircuitGraph::default();
		let mut layout = LayoutController::new(&g, LayoutAlgorithm::ForceAtlas2);
		layout.start();
		assert!(layout.step(&mut g, 0.016));
	}

	#[test]
	fn test_barnes_hut_path_spreads_nodes() {
		let nodes: Vec<_> = (0..40).map(|i| json!([i, {"class": "LeakyIAF"}])).collect();
		let mut g = graph(json!({"nodes": nodes}));
		let settings = LayoutSettings {
			barnes_hut_optimize: true,
			..LayoutSettings::for_order(40)
		};
		let mut layout = LayoutController::with_settings(&g, LayoutAlgorithm::ForceAtlas2, settings);
		layout.start();
		for _ in 0..20 {
			layout.step(&mut g, 0.016);
		}
		assert!(g.nodes().all(|n| n.x.is_finite() && n.y.is_finite()));
		let spread = g.nodes().map(|n| n.x).fold(f32::MIN, f32::max)
			- g.nodes().map(|n| n.x).fold(f32::MAX, f32::min);
		assert!(spread > 1.0);
	}

	#[test]
	fn test_pinned_node_stays_put() {
		let mut g = chain();
		let b = g.index_of("b").unwrap();
		let mut layout = LayoutController::new(&g, LayoutAlgorithm::ForceAtlas2);
		layout.pin(&mut g, b, 50.0, -20.0);
		layout.start();
		for _ in 0..10 {
			layout.step(&mut g, 0.016);
		}
		assert_eq!(g.node(b).unwrap().position(), (50.0, -20.0));
	}

	#[test]
	fn test_small_graph_uses_pairwise_simulation() {
		let layout = LayoutController::new(&chain(), LayoutAlgorithm::ForceAtlas2);
		assert!(matches!(layout.engine, Engine::Pairwise { .. }));
	}

	#[test]
	fn test_large_graph_never_builds_pairwise_simulation() {
		let order = BARNES_HUT_THRESHOLD + 1;
		let nodes: Vec<_> = (0..order).map(|i| json!([i, {"class": "LeakyIAF"}])).collect();
		let edges: Vec<_> = (1..order).map(|i| json!([i - 1, i, {}])).collect();
		let mut g = graph(json!({"nodes": nodes, "edges": edges}));

		let mut layout = LayoutController::new(&g, LayoutAlgorithm::ForceAtlas2);
		let Engine::BarnesHut { springs } = &layout.engine else {
			panic!("pairwise simulation built for {order} nodes");
		};
		assert_eq!(springs.len(), order - 1);

		let first = g.index_of("0").unwrap();
		layout.pin(&mut g, first, 5.0, 5.0);
		let before = positions(&g);
		layout.start();
		assert!(layout.step(&mut g, 0.016));
		assert!(matches!(layout.engine, Engine::BarnesHut { .. }));
		assert!(g.nodes().all(|n| n.x.is_finite() && n.y.is_finite()));
		assert_ne!(positions(&g), before);
		assert_eq!(g.node(first).unwrap().position(), (5.0, 5.0));
	}

	#[test]
	fn test_approximate_step_springs_pull_pair_together() {
		let previous = [(-50.0, 0.0), (50.0, 0.0)];
		// no charge, so only the spring acts
		let next = approximate_step(&previous, &[1.0, 1.0], &[false, false], &[(0, 1)], 0.0, 0.016);
		assert!(next[0].0 > -50.0);
		assert!(next[1].0 < 50.0);
		assert!((next[0].0 + next[1].0).abs() < 1e-4);

		let held = approximate_step(&previous, &[1.0, 1.0], &[true, false], &[(0, 1)], 0.0, 0.016);
		assert_eq!(held[0], (-50.0, 0.0));
	}
}
