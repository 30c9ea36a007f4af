//! Graph data handed from the builder to the graph view.

use crate::data::{EntityKey, EntityType};

/// Which layout algorithm positions the nodes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayoutKind {
	/// Deterministic radial tree; requires every node but the root to have a parent.
	#[default]
	Radial,
	/// Iterative force-directed layout.
	Force,
}

/// Role of a node in the rendered graph.
#[derive(Clone, Debug, PartialEq)]
pub enum NodeKind {
	/// Root of the type hierarchy.
	Root,
	/// One entity type in the hierarchy; clicking toggles `expanded`.
	Group {
		/// The grouped type.
		entity_type: EntityType,
		/// Entities of that type in the catalog.
		item_count: usize,
		/// Whether instances are shown.
		expanded: bool,
	},
	/// A single entity; clicking navigates to it.
	Entity(EntityKey),
}

/// A node in the graph.
#[derive(Clone, Debug, PartialEq)]
pub struct GraphNode {
	/// Unique identifier for this node. Used to reference nodes in links.
	pub id: String,
	/// What the node stands for.
	pub kind: NodeKind,
	/// Display label.
	pub label: String,
	/// Hierarchy level or distance from the focal entity.
	pub depth: usize,
	/// Parent node id in the hierarchy, `None` for the root and in
	/// neighborhood graphs.
	pub parent: Option<String>,
	/// Neighbor or child count; drives the visual size.
	pub count: usize,
	/// Focal entity or hierarchy root. Edges touching it take its color.
	pub primary: bool,
}

impl GraphNode {
	/// Entity type shown by this node; `None` for the root.
	pub fn entity_type(&self) -> Option<EntityType> {
		match &self.kind {
			NodeKind::Root => None,
			NodeKind::Group { entity_type, .. } => Some(*entity_type),
			NodeKind::Entity(key) => Some(key.entity_type),
		}
	}
}

/// An undirected edge between two nodes.
#[derive(Clone, Debug, PartialEq)]
pub struct GraphLink {
	/// Source node ID.
	pub source: String,
	/// Target node ID.
	pub target: String,
}

/// Complete graph data: nodes, links and how to lay them out.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GraphData {
	/// All nodes; the focal entity or root comes first.
	pub nodes: Vec<GraphNode>,
	/// Undirected links between nodes.
	pub links: Vec<GraphLink>,
	/// Layout algorithm to position the nodes with.
	pub layout: LayoutKind,
	/// Node id of the focal entity in neighborhood graphs.
	pub focal: Option<String>,
}

impl GraphData {
	/// Nothing to explore: a lone focal entity, or no populated groups.
	pub fn is_empty(&self) -> bool {
		self.links.is_empty()
	}

	/// The node with `id`.
	pub fn node(&self, id: &str) -> Option<&GraphNode> {
		self.nodes.iter().find(|n| n.id == id)
	}

	/// Whether `a` and `b` are joined by a link, in either direction.
	#[cfg(test)]
	pub fn has_link(&self, a: &str, b: &str) -> bool {
		self.links
			.iter()
			.any(|l| (l.source == a && l.target == b) || (l.source == b && l.target == a))
	}

	/// Whether every link connects two nodes of this graph.
	#[cfg(test)]
	pub fn is_closed(&self) -> bool {
		let ids: std::collections::HashSet<&str> = self.nodes.iter().map(|n| n.id.as_str()).collect();
		self.links
			.iter()
			.all(|l| ids.contains(l.source.as_str()) && ids.contains(l.target.as_str()))
	}
}

/// What the user currently wants to see.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GraphRequest {
	/// Type hierarchy with the listed groups expanded.
	Overview { expanded: Vec<EntityType> },
	/// Neighborhood of one entity.
	Focus { focal: EntityKey },
}

impl Default for GraphRequest {
	fn default() -> Self {
		GraphRequest::Overview {
			expanded: Vec::new(),
		}
	}
}
