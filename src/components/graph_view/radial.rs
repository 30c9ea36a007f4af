//! Deterministic radial tree layout.
//!
//! Leaves are spread evenly around the circle in depth-first order, with the
//! gap between leaves of different parents twice the gap between siblings.
//! Inner nodes sit at the mean angle of their children, and every node's
//! distance from the center is its depth times the ring spacing.

use std::collections::HashMap;
use std::f64::consts::TAU;

use crate::graph::GraphNode;

/// Position of a node in polar coordinates around the layout center.
///
/// `angle` is in radians, clockwise from twelve o'clock.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Polar {
	/// Clockwise from twelve o'clock, in radians.
	pub angle: f64,
	/// Distance from the center.
	pub radius: f64,
}

impl Polar {
	/// World coordinates, y pointing down.
	pub fn to_cartesian(self) -> (f64, f64) {
		(self.radius * self.angle.sin(), -self.radius * self.angle.cos())
	}
}

/// Separation between adjacent leaves, in sibling gaps.
fn separation(a: Option<usize>, b: Option<usize>) -> f64 {
	if a == b { 1.0 } else { 2.0 }
}

/// Lays out a forest given by each node's `parent`.
///
/// Nodes whose parent is missing or not in `nodes` are treated as roots. A
/// single root is placed at the center; several roots share an implicit
/// center above them. Children keep the order they have in `nodes`.
pub fn layout(nodes: &[GraphNode], ring_spacing: f64) -> HashMap<String, Polar> {
	let position: HashMap<&str, usize> = nodes.iter().enumerate().map(|(i, n)| (n.id.as_str(), i)).collect();

	let mut children: Vec<Vec<usize>> = vec![Vec::new(); nodes.len()];
	let mut roots = Vec::new();
	for (i, node) in nodes.iter().enumerate() {
		match node.parent.as_deref().and_then(|p| position.get(p)) {
			Some(&p) if p != i => children[p].push(i),
			_ => roots.push(i),
		}
	}

	// A lone root is the center; otherwise the roots form the first ring.
	let base_depth = usize::from(roots.len() != 1);

	// Depth-first walk collecting leaves with their parent, and each node's depth.
	let mut depth = vec![0; nodes.len()];
	let mut parent_of: Vec<Option<usize>> = vec![None; nodes.len()];
	let mut order = Vec::with_capacity(nodes.len());
	let mut leaves = Vec::new();
	let mut stack: Vec<usize> = roots.iter().rev().copied().collect();
	for &r in &roots {
		depth[r] = base_depth;
	}
	while let Some(i) = stack.pop() {
		order.push(i);
		if children[i].is_empty() {
			leaves.push(i);
		}
		for &c in children[i].iter().rev() {
			depth[c] = depth[i] + 1;
			parent_of[c] = Some(i);
			stack.push(c);
		}
	}

	let mut angle = vec![0.0; nodes.len()];
	if leaves.len() > 1 {
		let mut offsets = Vec::with_capacity(leaves.len());
		let mut total = 0.0;
		for (n, &leaf) in leaves.iter().enumerate() {
			if n > 0 {
				total += separation(parent_of[leaves[n - 1]], parent_of[leaf]);
			}
			offsets.push(total);
		}
		let last = leaves[leaves.len() - 1];
		total += separation(parent_of[last], parent_of[leaves[0]]);
		for (&leaf, offset) in leaves.iter().zip(offsets) {
			angle[leaf] = TAU * offset / total;
		}
	}

	// Post-order: children were pushed after their parent in `order`.
	for &i in order.iter().rev() {
		if !children[i].is_empty() {
			let sum: f64 = children[i].iter().map(|&c| angle[c]).sum();
			angle[i] = sum / children[i].len() as f64;
		}
	}

	nodes
		.iter()
		.enumerate()
		.map(|(i, node)| {
			let radius = depth[i] as f64 * ring_spacing;
			let angle = if radius == 0.0 { 0.0 } else { angle[i] };
			(node.id.clone(), Polar { angle, radius })
		})
		.collect()
}

#[cfg(test)]
mod tests {
	use std::f64::consts::PI;

	use super::*;
	use crate::graph::NodeKind;

	fn node(id: &str, parent: Option<&str>) -> GraphNode {
		GraphNode {
			id: id.to_string(),
			kind: NodeKind::Root,
			label: id.to_string(),
			depth: 0,
			parent: parent.map(str::to_string),
			count: 0,
			primary: false,
		}
	}

	fn close(a: f64, b: f64) -> bool {
		(a - b).abs() < 1e-9
	}

	#[test]
	fn siblings_are_evenly_spaced() {
		let nodes = vec![
			node("root", None),
			node("a", Some("root")),
			node("b", Some("root")),
			node("c", Some("root")),
		];
		let layout = layout(&nodes, 100.0);

		assert_eq!(layout["root"], Polar { angle: 0.0, radius: 0.0 });
		assert!(close(layout["a"].angle, 0.0));
		assert!(close(layout["b"].angle, TAU / 3.0));
		assert!(close(layout["c"].angle, 2.0 * TAU / 3.0));
		assert!(["a", "b", "c"].iter().all(|id| layout[*id].radius == 100.0));
	}

	#[test]
	fn gap_between_parents_is_doubled() {
		let nodes = vec![
			node("root", None),
			node("g1", Some("root")),
			node("g2", Some("root")),
			node("a1", Some("g1")),
			node("a2", Some("g1")),
			node("b1", Some("g2")),
			node("b2", Some("g2")),
		];
		let layout = layout(&nodes, 50.0);

		let sibling_gap = layout["a2"].angle - layout["a1"].angle;
		let cousin_gap = layout["b1"].angle - layout["a2"].angle;
		assert!(close(sibling_gap, PI / 3.0));
		assert!(close(cousin_gap, 2.0 * sibling_gap));
		assert!(close(layout["g1"].angle, PI / 6.0));
		assert!(close(layout["g2"].angle, 7.0 * PI / 6.0));
		assert_eq!(layout["a1"].radius, 100.0);
		assert_eq!(layout["g1"].radius, 50.0);
	}

	#[test]
	fn layout_is_deterministic() {
		let nodes = vec![
			node("root", None),
			node("g1", Some("root")),
			node("x", Some("g1")),
			node("g2", Some("root")),
		];
		assert_eq!(layout(&nodes, 80.0), layout(&nodes, 80.0));
	}

	#[test]
	fn lone_root_sits_at_the_center() {
		let layout = layout(&[node("root", None)], 80.0);
		assert_eq!(layout["root"].to_cartesian(), (0.0, 0.0));
	}

	#[test]
	fn orphans_become_a_ring_of_roots() {
		let nodes = vec![node("a", None), node("b", Some("missing"))];
		let layout = layout(&nodes, 10.0);
		assert_eq!(layout["a"].radius, 10.0);
		assert_eq!(layout["b"].radius, 10.0);
		assert!(close(layout["b"].angle, PI));
	}
}
