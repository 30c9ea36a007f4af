//! Builds bounded graphs out of the catalog: the neighborhood of a focal
//! entity, or the type hierarchy of the whole archive.

use std::collections::BTreeSet;

use crate::data::{Catalog, EntityKey, EntityType, LinkIndex};

use super::types::{GraphData, GraphLink, GraphNode, LayoutKind, NodeKind};

/// Default number of instances shown under an expanded group.
pub const DEFAULT_GROUP_CAP: usize = 30;

/// Node id of the hierarchy root.
pub const ROOT_ID: &str = "root";

/// Node id used for a group.
pub fn group_id(entity_type: EntityType) -> String {
	format!("group:{}", entity_type.tag())
}

fn entity_node(catalog: &Catalog, index: &LinkIndex, key: &EntityKey, depth: usize) -> GraphNode {
	let label = catalog
		.entity(key)
		.map(|e| e.title.clone())
		.unwrap_or_else(|| key.to_string());
	GraphNode {
		id: key.to_string(),
		kind: NodeKind::Entity(key.clone()),
		label,
		depth,
		parent: None,
		count: index.degree(key),
		primary: depth == 0,
	}
}

/// The focal entity, its direct links, and links among those neighbors.
///
/// Second-order entities are never pulled in: an edge is only added when both
/// of its endpoints are already selected. Returns `None` for an unknown focal
/// entity.
pub fn neighborhood(catalog: &Catalog, index: &LinkIndex, focal: &EntityKey) -> Option<GraphData> {
	catalog.entity(focal)?;
	let neighbors: BTreeSet<EntityKey> = index.links(focal);

	let mut nodes = Vec::with_capacity(neighbors.len() + 1);
	nodes.push(entity_node(catalog, index, focal, 0));
	nodes.extend(neighbors.iter().map(|k| entity_node(catalog, index, k, 1)));

	let focal_id = focal.to_string();
	let mut links: Vec<GraphLink> = neighbors
		.iter()
		.map(|k| GraphLink {
			source: focal_id.clone(),
			target: k.to_string(),
		})
		.collect();

	for (i, a) in neighbors.iter().enumerate() {
		for b in neighbors.iter().skip(i + 1) {
			if index.are_linked(a, b) {
				links.push(GraphLink {
					source: a.to_string(),
					target: b.to_string(),
				});
			}
		}
	}

	Some(GraphData {
		nodes,
		links,
		layout: LayoutKind::Force,
		focal: Some(focal_id),
	})
}

/// Root → one group per populated type → instances of expanded groups.
///
/// An expanded group shows at most `cap` instances, taken in collection
/// order.
pub fn hierarchy(
	catalog: &Catalog,
	index: &LinkIndex,
	expanded: &[EntityType],
	cap: usize,
	layout: LayoutKind,
) -> GraphData {
	let mut nodes = Vec::new();
	let mut links = Vec::new();
	let mut group_nodes = Vec::new();

	for ty in EntityType::ALL {
		let Some(collection) = catalog.collection(ty) else {
			continue;
		};
		if collection.is_empty() {
			continue;
		}
		let gid = group_id(ty);
		let is_expanded = expanded.contains(&ty);
		group_nodes.push(GraphNode {
			id: gid.clone(),
			kind: NodeKind::Group {
				entity_type: ty,
				item_count: collection.len(),
				expanded: is_expanded,
			},
			label: format!("{} ({})", ty.label(), collection.len()),
			depth: 1,
			parent: Some(ROOT_ID.to_string()),
			count: collection.len(),
			primary: false,
		});
		links.push(GraphLink {
			source: ROOT_ID.to_string(),
			target: gid.clone(),
		});

		if !is_expanded {
			continue;
		}
		for entity in collection.entities.iter().take(cap) {
			let mut node = entity_node(catalog, index, &entity.key, 2);
			node.parent = Some(gid.clone());
			node.primary = false;
			links.push(GraphLink {
				source: gid.clone(),
				target: node.id.clone(),
			});
			nodes.push(node);
		}
	}

	let mut all = Vec::with_capacity(group_nodes.len() + nodes.len() + 1);
	all.push(GraphNode {
		id: ROOT_ID.to_string(),
		kind: NodeKind::Root,
		label: "Archive".to_string(),
		depth: 0,
		parent: None,
		count: group_nodes.len(),
		primary: true,
	});
	all.extend(group_nodes);
	all.extend(nodes);

	GraphData {
		nodes: all,
		links,
		layout,
		focal: None,
	}
}
