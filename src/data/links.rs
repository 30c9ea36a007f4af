//! Link derivation: turns one-directional references into symmetric links.

use std::collections::{BTreeSet, HashMap};

use super::entity::{Catalog, Entity, EntityKey};

/// Derives the links of `entity` by scanning the catalog.
///
/// Union of the references stored on the entity itself and of every entity
/// whose reference fields point back at it. Each call is linear in the size
/// of the scanned collections; [`LinkIndex`] answers the same question in
/// constant time.
pub fn scan_links(entity: &Entity, catalog: &Catalog) -> BTreeSet<EntityKey> {
	let ty = entity.entity_type();
	let mut links: BTreeSet<EntityKey> = entity
		.referenced_keys()
		.filter(|k| catalog.entity(k).is_some())
		.cloned()
		.collect();

	for collection in catalog.collections() {
		let inverse: Vec<&'static str> = collection
			.entity_type
			.reference_fields()
			.iter()
			.filter(|f| f.target == ty)
			.map(|f| f.name)
			.collect();
		if inverse.is_empty() {
			continue;
		}
		for other in &collection.entities {
			let points_back = inverse
				.iter()
				.any(|field| other.references(field).any(|e| e.key == entity.key));
			if points_back {
				links.insert(other.key.clone());
			}
		}
	}

	links.remove(&entity.key);
	links
}

/// Symmetric adjacency over every entity of a catalog.
///
/// Built once per cache population and dropped with it.
#[derive(Debug, Default)]
pub struct LinkIndex {
	adjacency: HashMap<EntityKey, BTreeSet<EntityKey>>,
	link_count: usize,
}

impl LinkIndex {
	/// Indexes every reference of `catalog`, in both directions.
	pub fn build(catalog: &Catalog) -> Self {
		let mut index = Self::default();
		for collection in catalog.collections() {
			for entity in &collection.entities {
				index.adjacency.entry(entity.key.clone()).or_default();
				for target in entity.referenced_keys() {
					// Only link to entities that are part of this catalog.
					if catalog.entity(target).is_some() {
						index.insert(&entity.key, target);
					}
				}
			}
		}
		index
	}

	fn insert(&mut self, a: &EntityKey, b: &EntityKey) {
		if a == b {
			return;
		}
		let added = self.adjacency.entry(a.clone()).or_default().insert(b.clone());
		self.adjacency.entry(b.clone()).or_default().insert(a.clone());
		if added {
			self.link_count += 1;
		}
	}

	/// Entities linked to `key`. Empty for unknown keys.
	pub fn links(&self, key: &EntityKey) -> BTreeSet<EntityKey> {
		self.neighbors(key).cloned().collect()
	}

	/// Like [`LinkIndex::links`] without collecting.
	pub fn neighbors(&self, key: &EntityKey) -> impl Iterator<Item = &EntityKey> {
		self.adjacency.get(key).into_iter().flatten()
	}

	/// Number of entities linked to `key`.
	pub fn degree(&self, key: &EntityKey) -> usize {
		self.adjacency.get(key).map_or(0, BTreeSet::len)
	}

	/// Whether `a` and `b` are linked.
	pub fn are_linked(&self, a: &EntityKey, b: &EntityKey) -> bool {
		self.adjacency.get(a).is_some_and(|set| set.contains(b))
	}

	/// Number of distinct undirected links.
	pub fn link_count(&self) -> usize {
		self.link_count
	}
}

#[cfg(test)]
mod tests {
	use std::collections::BTreeMap;
	use std::rc::Rc;

	use serde_json::Map;

	use super::*;
	use crate::data::entity::{Collection, EntityType, Ref};
	use crate::data::testing::sample_catalog;

	#[test]
	fn person_links_cover_forward_and_inverse_references() {
		let catalog = sample_catalog();
		let ada = catalog.entity(&EntityKey::new(EntityType::Actant, "1")).unwrap();
		let links = scan_links(ada, &catalog);

		// Stored on the actant itself.
		assert!(links.contains(&EntityKey::new(EntityType::Institution, "1")));
		// Only stored on the conference and citation records.
		assert!(links.contains(&EntityKey::new(EntityType::Conference, "10")));
		assert!(links.contains(&EntityKey::new(EntityType::Conference, "11")));
		assert!(links.contains(&EntityKey::new(EntityType::Citation, "30")));
	}

	#[test]
	fn index_matches_scan_for_every_entity() {
		let catalog = sample_catalog();
		let index = LinkIndex::build(&catalog);
		for collection in catalog.collections() {
			for entity in &collection.entities {
				assert_eq!(index.links(&entity.key), scan_links(entity, &catalog), "{}", entity.key);
			}
		}
	}

	#[test]
	fn links_never_contain_the_entity_itself() {
		// A record whose reference list points back at itself.
		let key = EntityKey::new(EntityType::Conference, "77");
		let twin = Rc::new(Entity {
			key: key.clone(),
			title: "twin".into(),
			attributes: Map::new(),
			refs: BTreeMap::new(),
		});
		let looped = Rc::new(Entity {
			key: key.clone(),
			title: "looped".into(),
			attributes: Map::new(),
			refs: BTreeMap::from([("actants", vec![Ref::Resolved(twin)])]),
		});
		let catalog = Catalog::new([Rc::new(Collection::new(EntityType::Conference, vec![looped.clone()]))]);

		assert!(!scan_links(&looped, &catalog).contains(&key));
		assert!(!LinkIndex::build(&catalog).links(&key).contains(&key));

		let catalog = sample_catalog();
		let index = LinkIndex::build(&catalog);
		for collection in catalog.collections() {
			for entity in &collection.entities {
				assert!(!index.links(&entity.key).contains(&entity.key));
			}
		}
	}

	#[test]
	fn links_are_symmetric() {
		let catalog = sample_catalog();
		let index = LinkIndex::build(&catalog);
		for collection in catalog.collections() {
			for a in &collection.entities {
				for b in index.links(&a.key) {
					assert!(index.links(&b).contains(&a.key), "{} -> {} not mirrored", a.key, b);
				}
			}
		}
	}

	#[test]
	fn unknown_keys_have_no_links() {
		let index = LinkIndex::build(&sample_catalog());
		let ghost = EntityKey::new(EntityType::Keyword, "999");
		assert!(index.links(&ghost).is_empty());
		assert_eq!(index.degree(&ghost), 0);
	}
}
