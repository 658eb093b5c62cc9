//! Quadtree repulsion used once graphs get too large for pairwise forces.

const THETA: f32 = 0.5;
const MAX_DEPTH: u32 = 24;
/// Keeps coincident bodies from producing infinite forces.
const MIN_DISTANCE: f32 = 0.01;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Body {
	pub x: f32,
	pub y: f32,
	pub mass: f32,
}

#[derive(Debug)]
struct Cell {
	cx: f32,
	cy: f32,
	half: f32,
	mass: f32,
	mx: f32,
	my: f32,
	body: Option<usize>,
	children: Option<Box<[Cell; 4]>>,
}

impl Cell {
	fn new(cx: f32, cy: f32, half: f32) -> Self {
		Self {
			cx,
			cy,
			half,
			mass: 0.0,
			mx: 0.0,
			my: 0.0,
			body: None,
			children: None,
		}
	}

	fn quadrant(&self, b: &Body) -> usize {
		usize::from(b.x >= self.cx) + 2 * usize::from(b.y >= self.cy)
	}

	fn split(&mut self) -> &mut [Cell; 4] {
		let q = self.half / 2.0;
		let (cx, cy) = (self.cx, self.cy);
		self.children.get_or_insert_with(|| {
			Box::new([
				Cell::new(cx - q, cy - q, q),
				Cell::new(cx + q, cy - q, q),
				Cell::new(cx - q, cy + q, q),
				Cell::new(cx + q, cy + q, q),
			])
		})
	}

	fn insert(&mut self, bodies: &[Body], i: usize, depth: u32) {
		let b = bodies[i];
		let total = self.mass + b.mass;
		self.mx = (self.mx * self.mass + b.x * b.mass) / total;
		self.my = (self.my * self.mass + b.y * b.mass) / total;
		self.mass = total;

		if self.children.is_none() && self.body.is_none() {
			self.body = Some(i);
			return;
		}
		// too deep: fold into the aggregate only
		if depth >= MAX_DEPTH {
			return;
		}
		if let Some(prev) = self.body.take() {
			let q = self.quadrant(&bodies[prev]);
			self.split()[q].insert(bodies, prev, depth + 1);
		}
		let q = self.quadrant(&b);
		self.split()[q].insert(bodies, i, depth + 1);
	}

	fn force_on(&self, bodies: &[Body], i: usize, charge: f32, out: &mut (f32, f32)) {
		if self.mass == 0.0 || (self.body == Some(i) && self.children.is_none()) {
			return;
		}
		let b = &bodies[i];
		let (dx, dy) = (b.x - self.mx, b.y - self.my);
		let dist = (dx * dx + dy * dy).sqrt().max(MIN_DISTANCE);

		let far = (2.0 * self.half) / dist < THETA;
		match &self.children {
			Some(children) if !far => {
				for child in children.iter() {
					child.force_on(bodies, i, charge, out);
				}
			}
			_ => {
				let factor = charge * b.mass * self.mass / (dist * dist);
				out.0 += dx * factor;
				out.1 += dy * factor;
			}
		}
	}
}

/// Approximate repulsion on every body: `charge * m1 * m2 / d`, pointing away
/// from the other body.
pub fn repulsion(bodies: &[Body], charge: f32) -> Vec<(f32, f32)> {
	if bodies.len() < 2 {
		return vec![(0.0, 0.0); bodies.len()];
	}

	let (mut min_x, mut min_y, mut max_x, mut max_y) = (f32::MAX, f32::MAX, f32::MIN, f32::MIN);
	for b in bodies {
		min_x = min_x.min(b.x);
		min_y = min_y.min(b.y);
		max_x = max_x.max(b.x);
		max_y = max_y.max(b.y);
	}
	let half = ((max_x - min_x).max(max_y - min_y) / 2.0).max(MIN_DISTANCE) * 1.01;
	let mut root = Cell::new((min_x + max_x) / 2.0, (min_y + max_y) / 2.0, half);
	for i in 0..bodies.len() {
		root.insert(bodies, i, 0);
	}

	(0..bodies.len())
		.map(|i| {
			let mut f = (0.0, 0.0);
			root.force_on(bodies, i, charge, &mut f);
			f
		})
		.collect()
}
