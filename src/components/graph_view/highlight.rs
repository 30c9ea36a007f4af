//! Hover highlighting with smoothed per-node intensities.

use std::collections::{HashMap, HashSet};

use force_graph::DefaultNodeIdx;

/// Time (seconds) a highlight is held after the pointer leaves, so skimming
/// past a node does not flicker.
const HOLD_SECONDS: f64 = 0.12;
const FADE_IN_RATE: f64 = 6.0;
const FADE_OUT_RATE: f64 = 4.0;
const VISIBLE: f64 = 0.005;

/// The hovered node and its neighbors fade in; everything else fades out.
///
/// Each node carries an intensity in `0.0..=1.0` that is moved toward its
/// target with exponential smoothing: `v += (target - v) * (1 - e^(-rate * dt))`.
#[derive(Clone, Debug, Default)]
pub struct HighlightState {
	hovered: Option<DefaultNodeIdx>,
	targets: HashSet<DefaultNodeIdx>,
	intensity: HashMap<DefaultNodeIdx, f64>,
	ring: HashMap<DefaultNodeIdx, f64>,
	hold: HashMap<DefaultNodeIdx, f64>,
	max: f64,
}

impl HighlightState {
	/// The node under the pointer.
	pub fn hovered(&self) -> Option<DefaultNodeIdx> {
		self.hovered
	}

	/// Sets the hovered node; its neighbors come from `edges`.
	pub fn set_hover(&mut self, node: Option<DefaultNodeIdx>, edges: &[(DefaultNodeIdx, DefaultNodeIdx)]) {
		if self.hovered == node {
			return;
		}
		self.hovered = node;
		self.targets.clear();
		let Some(idx) = node else {
			return;
		};

		self.targets.insert(idx);
		for &(a, b) in edges {
			if a == idx {
				self.targets.insert(b);
			} else if b == idx {
				self.targets.insert(a);
			}
		}
		for &t in &self.targets {
			self.hold.insert(t, HOLD_SECONDS);
		}
	}

	/// Drops every highlight immediately, e.g. when the graph is replaced.
	pub fn clear(&mut self) {
		*self = Self::default();
	}

	/// Advances the fades by `dt` seconds.
	pub fn tick(&mut self, dt: f64) {
		let rise = 1.0 - (-FADE_IN_RATE * dt).exp();
		let decay = (-FADE_OUT_RATE * dt).exp();

		for &idx in &self.targets {
			let v = self.intensity.entry(idx).or_insert(0.0);
			*v += (1.0 - *v) * rise;
		}
		if let Some(idx) = self.hovered {
			let v = self.ring.entry(idx).or_insert(0.0);
			*v += (1.0 - *v) * rise;
		}

		let targets = &self.targets;
		self.hold.retain(|idx, left| {
			if targets.contains(idx) {
				return true;
			}
			*left -= dt;
			*left > 0.0
		});

		let hold = &self.hold;
		let mut max: f64 = 0.0;
		self.intensity.retain(|idx, v| {
			if !targets.contains(idx) && !hold.contains_key(idx) {
				*v *= decay;
			}
			max = max.max(*v);
			*v > VISIBLE
		});

		let hovered = self.hovered;
		self.ring.retain(|idx, v| {
			if hovered != Some(*idx) && !hold.contains_key(idx) {
				*v *= decay;
			}
			*v > VISIBLE
		});
		self.max = max;
	}

	/// Highlight of a node, `0.0..=1.0`.
	pub fn node_intensity(&self, idx: DefaultNodeIdx) -> f64 {
		self.intensity.get(&idx).copied().unwrap_or(0.0)
	}

	/// Highlight ring around the hovered node, `0.0..=1.0`.
	pub fn ring_intensity(&self, idx: DefaultNodeIdx) -> f64 {
		self.ring.get(&idx).copied().unwrap_or(0.0)
	}

	/// Geometric mean of both endpoints, so edges keep pace with their nodes.
	pub fn edge_intensity(&self, a: DefaultNodeIdx, b: DefaultNodeIdx) -> f64 {
		(self.node_intensity(a) * self.node_intensity(b)).sqrt()
	}

	/// Strongest highlight on screen; everything else dims by this much.
	pub fn max_intensity(&self) -> f64 {
		self.max
	}
}
