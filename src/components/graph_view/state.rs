//! Layout engine state and pointer interaction.
//!
//! Wraps the `force_graph` physics simulation with per-node metadata, the
//! pan/zoom transform, drag and pan tracking, and hover highlighting. The
//! layout moves through an explicit phase machine:
//!
//! ```text
//! Idle -> Loading -> LaidOut { settled } <-> Interacting
//!                         |
//!                         +-> Loading (new data requested)
//! ```
//!
//! Nothing here schedules work: the owner calls [`GraphState::tick`] once per
//! frame and [`GraphState::cancel`] when the view goes away.

use std::collections::{HashMap, HashSet};

use force_graph::{DefaultNodeIdx, EdgeData, ForceGraph, NodeData, SimulationParameters};
use log::debug;
use serde::Deserialize;

use crate::graph::{GraphData, LayoutKind, NodeKind};

use super::highlight::HighlightState;
use super::radial;
use super::scale::{ScaleConfig, ScaledValues};
use super::theme::{Color, Theme};

/// Smallest zoom factor.
pub const MIN_ZOOM: f64 = 0.1;
/// Largest zoom factor.
pub const MAX_ZOOM: f64 = 10.0;

/// Pointer travel in screen pixels below which a press and release is a click.
pub const CLICK_TOLERANCE: f64 = 4.0;

const GOLDEN_ANGLE: f64 = 2.399_963_229_728_653;
const NODE_MASS: f32 = 10.0;

/// Force layout tuning.
///
/// The first five fields go straight to `force_graph`; the rest drive the
/// link, centering and collision passes applied after each physics update.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct SimulationConfig {
	/// Repulsion between every pair of nodes.
	pub force_charge: f32,
	/// Attraction along edges.
	pub force_spring: f32,
	/// Cap on the force applied to one node per step.
	pub force_max: f32,
	/// Velocity scale of the physics update.
	pub node_speed: f32,
	/// Velocity kept between steps.
	pub damping_factor: f32,
	/// Rest length of an edge in world units.
	pub link_distance: f64,
	/// Fraction of the rest length error corrected per step.
	pub link_strength: f64,
	/// Fraction of the centroid offset removed per step.
	pub center_strength: f64,
	/// Extra space kept between node circles.
	pub collision_padding: f64,
	/// Mean squared speed (world units²/s²) below which the layout is settled.
	pub energy_threshold: f64,
	/// Hard cap on steps per settling run.
	pub max_steps: usize,
	/// Distance between rings of the radial layout.
	pub ring_spacing: f64,
}

impl Default for SimulationConfig {
	fn default() -> Self {
		Self {
			force_charge: 150.0,
			force_spring: 0.05,
			force_max: 100.0,
			node_speed: 3000.0,
			damping_factor: 0.9,
			link_distance: 90.0,
			link_strength: 0.1,
			center_strength: 0.05,
			collision_padding: 4.0,
			energy_threshold: 1.0,
			max_steps: 600,
			ring_spacing: 110.0,
		}
	}
}

impl SimulationConfig {
	fn parameters(&self) -> SimulationParameters {
		SimulationParameters {
			force_charge: self.force_charge,
			force_spring: self.force_spring,
			force_max: self.force_max,
			node_speed: self.node_speed,
			damping_factor: self.damping_factor,
		}
	}
}

/// Everything the view needs besides the graph itself.
#[derive(Clone, Debug, Default)]
pub struct ViewSettings {
	/// Colors and styles.
	pub theme: Theme,
	/// Zoom-dependent sizes.
	pub scale: ScaleConfig,
	/// Layout tuning.
	pub simulation: SimulationConfig,
}

/// Per-node display metadata attached to each node in the simulation.
#[derive(Clone, Debug)]
pub struct NodeInfo {
	/// Node id from the graph data.
	pub id: String,
	/// Display label.
	pub label: String,
	/// Root, group or entity.
	pub kind: NodeKind,
	/// Fill color from the type palette.
	pub color: Color,
	/// Size multiplier (1.0 = normal), from the node's link or child count.
	pub size: f64,
	/// Focal entity or hierarchy root.
	pub primary: bool,
}

/// Where the layout is in its lifecycle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LayoutPhase {
	/// Nothing to show, or the layout was cancelled.
	#[default]
	Idle,
	/// Waiting for graph data.
	Loading,
	/// Nodes have positions.
	LaidOut {
		/// Whether the simulation has come to rest.
		settled: bool,
	},
	/// A node is being dragged.
	Interacting,
}

/// Message drawn over the canvas.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Notice {
	/// The graph has nothing to explore.
	Empty,
	/// Loading failed with this message.
	Failed(String),
}

/// Where a click on an entity node asks to go.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NavigateTo {
	/// Entity id.
	pub id: String,
	/// Wire tag of the entity type, e.g. `actant`.
	pub entity_type: String,
	/// Display title of the entity.
	pub title: String,
}

/// What the host currently has to show.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum GraphPayload {
	/// Data is on its way.
	#[default]
	Loading,
	/// Data could not be loaded.
	Failed(String),
	/// A graph to lay out.
	Ready(GraphData),
}

/// Result of clicking a node.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NodeAction {
	/// Expand or collapse the group of this type.
	ToggleGroup(crate::data::EntityType),
	/// Open the entity.
	Navigate(NavigateTo),
}

/// Pan and zoom transform applied to the entire graph view.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ViewTransform {
	/// Horizontal pan in screen pixels.
	pub x: f64,
	/// Vertical pan in screen pixels.
	pub y: f64,
	/// Zoom factor (1.0 = 100%, clamped to `MIN_ZOOM..=MAX_ZOOM`).
	pub k: f64,
}

/// Tracks an in-progress press on a node.
#[derive(Clone, Debug, Default)]
struct DragState {
	active: bool,
	node_idx: Option<DefaultNodeIdx>,
	start_x: f64,
	start_y: f64,
	node_start_x: f32,
	node_start_y: f32,
	/// Set once the pointer left the click tolerance.
	moved: bool,
}

/// Tracks an in-progress canvas pan operation.
#[derive(Clone, Debug, Default)]
struct PanState {
	active: bool,
	start_x: f64,
	start_y: f64,
	transform_start_x: f64,
	transform_start_y: f64,
}

/// A node's position as seen by the post-physics passes.
#[derive(Clone, Copy, Debug)]
struct Body {
	idx: DefaultNodeIdx,
	x: f64,
	y: f64,
	radius: f64,
	anchored: bool,
}

/// Core graph state combining physics simulation with interaction and highlight tracking.
///
/// Created once when the component mounts, then mutated by the animation loop
/// and the pointer handlers.
pub struct GraphState {
	/// The physics simulation holding every node.
	pub graph: ForceGraph<NodeInfo, ()>,
	/// Current pan and zoom.
	pub transform: ViewTransform,
	/// Hover highlight.
	pub highlight: HighlightState,
	/// Lifecycle of the layout.
	pub phase: LayoutPhase,
	/// Message drawn over the graph, if any.
	pub notice: Option<Notice>,
	/// Layout of the current graph.
	pub layout: LayoutKind,
	/// Theme, scale and simulation settings.
	pub settings: ViewSettings,
	/// Canvas width in pixels.
	pub width: f64,
	/// Canvas height in pixels.
	pub height: f64,
	/// Seconds since mount; drives the loading animation.
	pub clock: f64,
	drag: DragState,
	pan: PanState,
	ids: HashMap<String, DefaultNodeIdx>,
	edges: Vec<(DefaultNodeIdx, DefaultNodeIdx)>,
	pinned: HashSet<String>,
	steps: usize,
	energy: f64,
}

impl GraphState {
	/// An empty, idle view of `width` × `height` pixels centered on the origin.
	pub fn new(width: f64, height: f64, settings: ViewSettings) -> Self {
		Self {
			graph: ForceGraph::new(settings.simulation.parameters()),
			transform: ViewTransform {
				x: width / 2.0,
				y: height / 2.0,
				k: 1.0,
			},
			highlight: HighlightState::default(),
			phase: LayoutPhase::Idle,
			notice: None,
			layout: LayoutKind::default(),
			settings,
			width,
			height,
			clock: 0.0,
			drag: DragState::default(),
			pan: PanState::default(),
			ids: HashMap::new(),
			edges: Vec::new(),
			pinned: HashSet::new(),
			steps: 0,
			energy: 0.0,
		}
	}

	/// Shows the loading skeleton and drops any drag or hover.
	pub fn begin_loading(&mut self) {
		self.phase = LayoutPhase::Loading;
		self.notice = None;
		self.drag = DragState::default();
		self.pan = PanState::default();
		self.highlight.clear();
	}

	/// Moves to the phase matching what the host provides.
	pub fn apply(&mut self, payload: &GraphPayload) {
		match payload {
			GraphPayload::Loading => self.begin_loading(),
			GraphPayload::Failed(message) => self.fail(message.clone()),
			GraphPayload::Ready(data) => self.load(data),
		}
	}

	/// Stops the layout and shows `message` instead of a graph.
	pub fn fail(&mut self, message: impl Into<String>) {
		self.cancel();
		self.notice = Some(Notice::Failed(message.into()));
	}

	/// Stops any running layout and interaction; positions stay as they are.
	pub fn cancel(&mut self) {
		self.phase = LayoutPhase::Idle;
		self.drag = DragState::default();
		self.pan = PanState::default();
	}

	/// Replaces the graph.
	///
	/// The pan/zoom transform is kept, as are the positions and pins of nodes
	/// present in both the old and the new graph. Radial graphs are placed at
	/// once; force graphs start a fresh settling run.
	pub fn load(&mut self, data: &GraphData) {
		let previous = self.positions();
		let kept: HashSet<&str> = data.nodes.iter().map(|n| n.id.as_str()).collect();
		self.pinned.retain(|id| kept.contains(id.as_str()));

		let radial = match data.layout {
			LayoutKind::Radial => Some(radial::layout(&data.nodes, self.settings.simulation.ring_spacing)),
			LayoutKind::Force => None,
		};

		let mut graph = ForceGraph::new(self.settings.simulation.parameters());
		let mut ids = HashMap::with_capacity(data.nodes.len());
		let mut placed = 0;
		for node in &data.nodes {
			let pinned = self.pinned.contains(&node.id);
			let (x, y) = match (&radial, previous.get(&node.id)) {
				(_, Some(&at)) if pinned => at,
				(Some(polar), _) => polar.get(&node.id).map(|p| p.to_cartesian()).unwrap_or_default(),
				(None, Some(&at)) => at,
				(None, None) if node.primary => (0.0, 0.0),
				(None, None) => {
					placed += 1;
					let around = node
						.parent
						.as_ref()
						.and_then(|p| previous.get(p).copied())
						.unwrap_or_default();
					self.spiral(around, placed)
				}
			};

			let idx = graph.add_node(NodeData {
				x: x as f32,
				y: y as f32,
				mass: NODE_MASS,
				is_anchor: radial.is_some() || pinned,
				user_data: NodeInfo {
					id: node.id.clone(),
					label: node.label.clone(),
					kind: node.kind.clone(),
					color: self.settings.theme.palette.color_for(node.entity_type()),
					size: self.settings.scale.sizing.size_for(node.count),
					primary: node.primary,
				},
			});
			ids.insert(node.id.clone(), idx);
		}

		let mut edges = Vec::with_capacity(data.links.len());
		for link in &data.links {
			if let (Some(&a), Some(&b)) = (ids.get(&link.source), ids.get(&link.target)) {
				graph.add_edge(a, b, EdgeData::default());
				edges.push((a, b));
			}
		}

		debug!(
			"scholar-graph: laying out {} nodes and {} edges ({:?})",
			ids.len(),
			edges.len(),
			data.layout
		);
		self.graph = graph;
		self.ids = ids;
		self.edges = edges;
		self.layout = data.layout;
		self.highlight.clear();
		self.drag = DragState::default();
		self.pan = PanState::default();
		self.steps = 0;
		self.energy = f64::INFINITY;
		self.notice = data.is_empty().then_some(Notice::Empty);
		self.phase = LayoutPhase::LaidOut {
			settled: data.layout == LayoutKind::Radial,
		};
	}

	/// Starting point for the `n`th new node of a force layout.
	fn spiral(&self, (cx, cy): (f64, f64), n: usize) -> (f64, f64) {
		let angle = n as f64 * GOLDEN_ANGLE;
		let r = self.settings.simulation.link_distance * (0.5 + 0.25 * (n as f64).sqrt());
		(cx + r * angle.cos(), cy + r * angle.sin())
	}

	/// Whether the simulation still needs steps.
	pub fn is_running(&self) -> bool {
		match self.phase {
			LayoutPhase::LaidOut { settled } => !settled,
			LayoutPhase::Interacting => self.layout == LayoutKind::Force,
			LayoutPhase::Idle | LayoutPhase::Loading => false,
		}
	}

	/// Advances the force layout by one step of `dt` seconds.
	///
	/// Returns whether more steps are needed. A no-op unless the layout is
	/// running.
	pub fn step(&mut self, dt: f32) -> bool {
		if !self.is_running() {
			return false;
		}

		let before = self.bodies();
		self.graph.update(dt);
		let mut bodies = self.bodies();
		self.apply_links(&mut bodies);
		self.apply_centering(&mut bodies);
		self.apply_collisions(&mut bodies);
		self.write_back(&bodies);

		let dt = f64::from(dt).max(1e-6);
		let (sum, free) = before
			.iter()
			.zip(&bodies)
			.filter(|(_, b)| !b.anchored)
			.fold((0.0, 0usize), |(sum, n), (a, b)| {
				let (dx, dy) = (b.x - a.x, b.y - a.y);
				(sum + (dx * dx + dy * dy) / (dt * dt), n + 1)
			});
		self.energy = if free == 0 { 0.0 } else { sum / free as f64 };

		if self.phase == (LayoutPhase::LaidOut { settled: false }) {
			self.steps += 1;
			let sim = &self.settings.simulation;
			if self.energy < sim.energy_threshold || self.steps >= sim.max_steps {
				debug!(
					"scholar-graph: layout settled after {} steps (energy {:.3})",
					self.steps, self.energy
				);
				self.phase = LayoutPhase::LaidOut { settled: true };
			}
		}
		self.is_running()
	}

	/// Steps until the layout settles; returns the number of steps taken.
	#[cfg(test)]
	pub fn settle(&mut self, dt: f32) -> usize {
		let start = self.steps;
		while self.phase == (LayoutPhase::LaidOut { settled: false }) {
			self.step(dt);
		}
		self.steps - start
	}

	/// Per-frame update: one layout step when running, plus highlight fades.
	pub fn tick(&mut self, dt: f64) {
		if self.is_running() {
			self.step(dt as f32);
		}
		self.highlight.tick(dt);
		self.clock += dt;
	}

	fn bodies(&self) -> Vec<Body> {
		let base = self.settings.scale.node.radius;
		let mut bodies = Vec::with_capacity(self.ids.len());
		self.graph.visit_nodes(|node| {
			bodies.push(Body {
				idx: node.index(),
				x: node.x() as f64,
				y: node.y() as f64,
				radius: base * node.data.user_data.size,
				anchored: node.data.is_anchor,
			});
		});
		bodies
	}

	fn write_back(&mut self, bodies: &[Body]) {
		let moved: HashMap<DefaultNodeIdx, (f64, f64)> = bodies
			.iter()
			.filter(|b| !b.anchored)
			.map(|b| (b.idx, (b.x, b.y)))
			.collect();
		self.graph.visit_nodes_mut(|node| {
			if let Some(&(x, y)) = moved.get(&node.index()) {
				node.data.x = x as f32;
				node.data.y = y as f32;
			}
		});
	}

	/// Pulls linked nodes toward the rest length.
	fn apply_links(&self, bodies: &mut [Body]) {
		let slot: HashMap<DefaultNodeIdx, usize> = bodies.iter().enumerate().map(|(i, b)| (b.idx, i)).collect();
		let sim = &self.settings.simulation;
		for (a, b) in &self.edges {
			let (Some(&i), Some(&j)) = (slot.get(a), slot.get(b)) else {
				continue;
			};
			let (dx, dy) = (bodies[j].x - bodies[i].x, bodies[j].y - bodies[i].y);
			let dist = (dx * dx + dy * dy).sqrt();
			if dist < 1e-6 {
				continue;
			}
			let pull = (dist - sim.link_distance) / dist * sim.link_strength;
			let (wi, wj) = weights(bodies[i].anchored, bodies[j].anchored);
			bodies[i].x += dx * pull * wi;
			bodies[i].y += dy * pull * wi;
			bodies[j].x -= dx * pull * wj;
			bodies[j].y -= dy * pull * wj;
		}
	}

	/// Shifts free nodes so the centroid drifts toward the origin.
	fn apply_centering(&self, bodies: &mut [Body]) {
		if bodies.is_empty() {
			return;
		}
		let n = bodies.len() as f64;
		let cx = bodies.iter().map(|b| b.x).sum::<f64>() / n;
		let cy = bodies.iter().map(|b| b.y).sum::<f64>() / n;
		let strength = self.settings.simulation.center_strength;
		for body in bodies.iter_mut().filter(|b| !b.anchored) {
			body.x -= cx * strength;
			body.y -= cy * strength;
		}
	}

	/// Separates overlapping node circles.
	fn apply_collisions(&self, bodies: &mut [Body]) {
		let padding = self.settings.simulation.collision_padding;
		for i in 0..bodies.len() {
			for j in i + 1..bodies.len() {
				let (wi, wj) = weights(bodies[i].anchored, bodies[j].anchored);
				if wi == 0.0 && wj == 0.0 {
					continue;
				}
				let min = bodies[i].radius + bodies[j].radius + padding;
				let (mut dx, mut dy) = (bodies[j].x - bodies[i].x, bodies[j].y - bodies[i].y);
				let mut dist = (dx * dx + dy * dy).sqrt();
				if dist >= min {
					continue;
				}
				if dist < 1e-6 {
					let angle = (i + j) as f64 * GOLDEN_ANGLE;
					(dx, dy, dist) = (angle.cos(), angle.sin(), 1.0);
				}
				let push = (min - dist) / dist;
				bodies[i].x -= dx * push * wi;
				bodies[i].y -= dy * push * wi;
				bodies[j].x += dx * push * wj;
				bodies[j].y += dy * push * wj;
			}
		}
	}

	/// Edges of the current graph as node index pairs.
	pub fn edges(&self) -> &[(DefaultNodeIdx, DefaultNodeIdx)] {
		&self.edges
	}

	/// Simulation index of the node with `id`.
	pub fn index_of(&self, id: &str) -> Option<DefaultNodeIdx> {
		self.ids.get(id).copied()
	}

	/// World position of a node.
	pub fn position(&self, id: &str) -> Option<(f64, f64)> {
		let idx = self.index_of(id)?;
		let mut found = None;
		self.graph.visit_nodes(|node| {
			if node.index() == idx {
				found = Some((node.x() as f64, node.y() as f64));
			}
		});
		found
	}

	/// World positions of every node, by id.
	pub fn positions(&self) -> HashMap<String, (f64, f64)> {
		let mut out = HashMap::with_capacity(self.ids.len());
		self.graph.visit_nodes(|node| {
			out.insert(
				node.data.user_data.id.clone(),
				(node.x() as f64, node.y() as f64),
			);
		});
		out
	}

	/// Whether the user pinned the node by dragging it.
	#[cfg(test)]
	pub fn is_pinned(&self, id: &str) -> bool {
		self.pinned.contains(id)
	}

	/// Display metadata of a node.
	pub fn node_info(&self, idx: DefaultNodeIdx) -> Option<NodeInfo> {
		let mut found = None;
		self.graph.visit_nodes(|node| {
			if node.index() == idx {
				found = Some(node.data.user_data.clone());
			}
		});
		found
	}

	/// Canvas pixel to world coordinates.
	pub fn screen_to_graph(&self, sx: f64, sy: f64) -> (f64, f64) {
		(
			(sx - self.transform.x) / self.transform.k,
			(sy - self.transform.y) / self.transform.k,
		)
	}

	/// World coordinates to canvas pixel.
	pub fn graph_to_screen(&self, gx: f64, gy: f64) -> (f64, f64) {
		(
			gx * self.transform.k + self.transform.x,
			gy * self.transform.k + self.transform.y,
		)
	}

	/// The topmost node under a screen position.
	pub fn node_at_position(&self, sx: f64, sy: f64) -> Option<DefaultNodeIdx> {
		let (gx, gy) = self.screen_to_graph(sx, sy);
		let scale = ScaledValues::new(&self.settings.scale, self.transform.k);
		let mut found = None;
		self.graph.visit_nodes(|node| {
			let (dx, dy) = (node.x() as f64 - gx, node.y() as f64 - gy);
			let hit = scale.hit_radius * node.data.user_data.size;
			if dx * dx + dy * dy < hit * hit {
				found = Some(node.index());
			}
		});
		found
	}

	/// Highlights `node` and its neighbors.
	pub fn set_hover(&mut self, node: Option<DefaultNodeIdx>) {
		self.highlight.set_hover(node, &self.edges);
	}

	/// Pointer down: starts a node drag or a canvas pan.
	pub fn press(&mut self, sx: f64, sy: f64) {
		if matches!(self.phase, LayoutPhase::Idle | LayoutPhase::Loading) {
			return;
		}
		match self.node_at_position(sx, sy) {
			Some(idx) => {
				let mut start = (0.0, 0.0);
				self.graph.visit_nodes(|node| {
					if node.index() == idx {
						start = (node.x(), node.y());
					}
				});
				self.drag = DragState {
					active: true,
					node_idx: Some(idx),
					start_x: sx,
					start_y: sy,
					node_start_x: start.0,
					node_start_y: start.1,
					moved: false,
				};
			}
			None => {
				self.pan = PanState {
					active: true,
					start_x: sx,
					start_y: sy,
					transform_start_x: self.transform.x,
					transform_start_y: self.transform.y,
				};
			}
		}
	}

	/// Pointer move: drags, pans, or updates the hover highlight.
	pub fn pointer_move(&mut self, sx: f64, sy: f64) {
		if self.drag.active {
			let (dx, dy) = (sx - self.drag.start_x, sy - self.drag.start_y);
			if !self.drag.moved && dx.hypot(dy) < CLICK_TOLERANCE {
				return;
			}
			let Some(idx) = self.drag.node_idx else {
				return;
			};
			if !self.drag.moved {
				self.drag.moved = true;
				self.phase = LayoutPhase::Interacting;
				if let Some(info) = self.node_info(idx) {
					self.pinned.insert(info.id);
				}
			}
			let k = self.transform.k;
			let (nx, ny) = (
				self.drag.node_start_x + (dx / k) as f32,
				self.drag.node_start_y + (dy / k) as f32,
			);
			self.graph.visit_nodes_mut(|node| {
				if node.index() == idx {
					node.data.x = nx;
					node.data.y = ny;
					node.data.is_anchor = true;
				}
			});
		} else if self.pan.active {
			self.transform.x = self.pan.transform_start_x + (sx - self.pan.start_x);
			self.transform.y = self.pan.transform_start_y + (sy - self.pan.start_y);
		} else {
			let hovered = self.node_at_position(sx, sy);
			self.set_hover(hovered);
		}
	}

	/// Pointer up: finishes a drag or pan, or reports a click.
	pub fn release(&mut self) -> Option<NodeAction> {
		self.pan = PanState::default();
		let drag = std::mem::take(&mut self.drag);
		if !drag.active {
			return None;
		}
		if drag.moved {
			// The dragged node stays pinned; the rest of the layout adjusts.
			self.steps = 0;
			self.phase = LayoutPhase::LaidOut {
				settled: self.layout == LayoutKind::Radial,
			};
			return None;
		}

		let info = self.node_info(drag.node_idx?)?;
		match info.kind {
			NodeKind::Root => None,
			NodeKind::Group { entity_type, .. } => Some(NodeAction::ToggleGroup(entity_type)),
			NodeKind::Entity(key) => Some(NodeAction::Navigate(NavigateTo {
				id: key.id,
				entity_type: key.entity_type.tag().to_string(),
				title: info.label,
			})),
		}
	}

	/// Pointer left the canvas.
	pub fn leave(&mut self) {
		if self.drag.moved {
			self.release();
		}
		self.drag = DragState::default();
		self.pan = PanState::default();
		self.set_hover(None);
	}

	/// Zooms by `factor` keeping the graph point under `(sx, sy)` in place.
	pub fn zoom_at(&mut self, sx: f64, sy: f64, factor: f64) {
		let k = (self.transform.k * factor).clamp(MIN_ZOOM, MAX_ZOOM);
		let ratio = k / self.transform.k;
		self.transform.x = sx - (sx - self.transform.x) * ratio;
		self.transform.y = sy - (sy - self.transform.y) * ratio;
		self.transform.k = k;
	}

	/// Records a new canvas size; the transform is left as it is.
	pub fn resize(&mut self, width: f64, height: f64) {
		self.width = width;
		self.height = height;
	}
}

/// How much of a correction each endpoint takes.
fn weights(a_anchored: bool, b_anchored: bool) -> (f64, f64) {
	match (a_anchored, b_anchored) {
		(false, false) => (0.5, 0.5),
		(true, false) => (0.0, 1.0),
		(false, true) => (1.0, 0.0),
		(true, true) => (0.0, 0.0),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::data::{EntityType, LinkIndex};
	use crate::data::testing::{key, sample_catalog};
	use crate::graph::{DEFAULT_GROUP_CAP, hierarchy, neighborhood};

	const DT: f32 = 0.016;

	fn state() -> GraphState {
		GraphState::new(800.0, 600.0, ViewSettings::default())
	}

	fn focus_graph() -> GraphData {
		let catalog = sample_catalog();
		let index = LinkIndex::build(&catalog);
		neighborhood(&catalog, &index, &key(EntityType::Actant, "1")).unwrap()
	}

	fn overview(expanded: &[EntityType]) -> GraphData {
		let catalog = sample_catalog();
		let index = LinkIndex::build(&catalog);
		hierarchy(&catalog, &index, expanded, DEFAULT_GROUP_CAP, LayoutKind::Radial)
	}

	/// Screen position of a node under the current transform.
	fn on_screen(state: &GraphState, id: &str) -> (f64, f64) {
		let (x, y) = state.position(id).unwrap();
		state.graph_to_screen(x, y)
	}

	#[test]
	fn force_layout_settles_within_the_step_cap() {
		let mut state = state();
		state.load(&focus_graph());
		assert_eq!(state.phase, LayoutPhase::LaidOut { settled: false });

		let steps = state.settle(DT);
		assert!(steps >= 1);
		assert!(steps <= state.settings.simulation.max_steps);
		assert_eq!(state.phase, LayoutPhase::LaidOut { settled: true });
		assert!(!state.step(DT));
		assert!(state.positions().values().all(|(x, y)| x.is_finite() && y.is_finite()));
	}

	#[test]
	fn same_graph_settles_to_the_same_positions() {
		let data = focus_graph();
		let mut first = state();
		let mut second = state();
		first.load(&data);
		second.load(&data);
		first.settle(DT);
		second.settle(DT);
		assert_eq!(first.positions(), second.positions());
	}

	#[test]
	fn expanding_keeps_pan_and_zoom() {
		let mut state = state();
		state.load(&overview(&[]));
		state.zoom_at(100.0, 100.0, 1.5);
		state.press(5.0, 5.0);
		state.pointer_move(45.0, 25.0);
		state.release();
		let transform = state.transform.clone();

		state.load(&overview(&[EntityType::Conference]));

		assert_eq!(state.transform, transform);
		assert!(state.position("conference:10").is_some());
		assert_eq!(state.phase, LayoutPhase::LaidOut { settled: true });
	}

	#[test]
	fn force_reload_keeps_surviving_positions() {
		let mut state = state();
		state.load(&focus_graph());
		state.settle(DT);
		let before = state.positions();

		state.load(&focus_graph());

		assert_eq!(state.positions(), before);
	}

	#[test]
	fn dragging_pins_and_release_reheats() {
		let mut state = state();
		state.load(&focus_graph());
		state.settle(DT);

		let (sx, sy) = on_screen(&state, "conference:10");
		state.press(sx, sy);
		state.pointer_move(sx + 40.0, sy + 10.0);
		assert_eq!(state.phase, LayoutPhase::Interacting);
		assert!(state.is_pinned("conference:10"));
		assert!(state.is_running());

		assert_eq!(state.release(), None);
		assert_eq!(state.phase, LayoutPhase::LaidOut { settled: false });
		let pinned_at = state.position("conference:10").unwrap();
		state.settle(DT);
		assert_eq!(state.position("conference:10"), Some(pinned_at));

		// Pins survive a reload of a graph that still has the node.
		state.load(&focus_graph());
		assert!(state.is_pinned("conference:10"));
		assert_eq!(state.position("conference:10"), Some(pinned_at));
	}

	#[test]
	fn click_on_entity_navigates() {
		let mut state = state();
		state.load(&focus_graph());
		state.settle(DT);

		let (sx, sy) = on_screen(&state, "actant:1");
		state.press(sx, sy);
		state.pointer_move(sx + 1.0, sy);
		let action = state.release();
		assert_eq!(
			action,
			Some(NodeAction::Navigate(NavigateTo {
				id: "1".to_string(),
				entity_type: "actant".to_string(),
				title: "Ada Lovelace".to_string(),
			}))
		);
		assert!(!state.is_pinned("actant:1"));
	}

	#[test]
	fn click_on_group_toggles_and_root_does_nothing() {
		let mut state = state();
		state.load(&overview(&[]));

		let (sx, sy) = on_screen(&state, "group:keyword");
		state.press(sx, sy);
		assert_eq!(state.release(), Some(NodeAction::ToggleGroup(EntityType::Keyword)));

		let (sx, sy) = on_screen(&state, "root");
		state.press(sx, sy);
		assert_eq!(state.release(), None);
	}

	#[test]
	fn radial_layout_is_anchored_and_settled() {
		let mut state = state();
		state.load(&overview(&[EntityType::Actant]));
		assert_eq!(state.phase, LayoutPhase::LaidOut { settled: true });
		assert_eq!(state.position("root"), Some((0.0, 0.0)));
		let ring = state.settings.simulation.ring_spacing;
		let (x, y) = state.position("actant:1").unwrap();
		assert!(((x * x + y * y).sqrt() - 2.0 * ring).abs() < 1e-3);
	}

	#[test]
	fn panning_moves_the_transform_only() {
		let mut state = state();
		state.load(&overview(&[]));
		let before = state.positions();
		state.press(5.0, 5.0);
		state.pointer_move(25.0, 15.0);
		assert_eq!(state.release(), None);
		assert_eq!(state.transform.x, 420.0);
		assert_eq!(state.transform.y, 310.0);
		assert_eq!(state.positions(), before);
	}

	#[test]
	fn zoom_is_clamped_and_anchored_at_the_pointer() {
		let mut state = state();
		let anchor = state.screen_to_graph(200.0, 150.0);
		state.zoom_at(200.0, 150.0, 1.1);
		let after = state.screen_to_graph(200.0, 150.0);
		assert!((anchor.0 - after.0).abs() < 1e-9 && (anchor.1 - after.1).abs() < 1e-9);

		for _ in 0..100 {
			state.zoom_at(0.0, 0.0, 1.1);
		}
		assert_eq!(state.transform.k, MAX_ZOOM);
		for _ in 0..200 {
			state.zoom_at(0.0, 0.0, 0.9);
		}
		assert_eq!(state.transform.k, MIN_ZOOM);
	}

	#[test]
	fn cancel_stops_stepping() {
		let mut state = state();
		state.load(&focus_graph());
		state.cancel();
		assert_eq!(state.phase, LayoutPhase::Idle);
		let before = state.positions();
		assert!(!state.step(DT));
		state.tick(0.016);
		assert_eq!(state.positions(), before);
	}

	#[test]
	fn lone_node_is_flagged_empty() {
		let mut state = state();
		state.load(&GraphData {
			nodes: focus_graph().nodes.into_iter().take(1).collect(),
			links: Vec::new(),
			layout: LayoutKind::Force,
			focal: Some("actant:1".to_string()),
		});
		assert_eq!(state.notice, Some(Notice::Empty));

		state.begin_loading();
		assert_eq!(state.phase, LayoutPhase::Loading);
		state.fail("offline");
		assert_eq!(state.phase, LayoutPhase::Idle);
		assert_eq!(state.notice, Some(Notice::Failed("offline".to_string())));
	}

	#[test]
	fn payloads_drive_the_phase() {
		let mut state = state();
		assert_eq!(state.phase, LayoutPhase::Idle);
		state.apply(&GraphPayload::Loading);
		assert_eq!(state.phase, LayoutPhase::Loading);
		state.apply(&GraphPayload::Ready(focus_graph()));
		assert_eq!(state.phase, LayoutPhase::LaidOut { settled: false });
		assert_eq!(state.notice, None);
		state.apply(&GraphPayload::Loading);
		// Pointer input is ignored until the next graph arrives.
		state.press(400.0, 300.0);
		assert_eq!(state.release(), None);
	}

	#[test]
	fn sizes_follow_counts() {
		let mut state = state();
		state.load(&focus_graph());
		let sizing = state.settings.scale.sizing.clone();
		let data = focus_graph();
		for node in &data.nodes {
			let idx = state.index_of(&node.id).unwrap();
			assert_eq!(state.node_info(idx).unwrap().size, sizing.size_for(node.count));
		}
	}
}
