//! Normalized entity model and the reference schema between entity types.
//!
//! Raw API records store their relations in one direction only. The schema
//! below lists, per type, which fields hold references and what they point
//! at. It forms a DAG: persons never embed conferences, the inverse direction
//! is derived by the link engine instead.

use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Closed set of record types served by the archive API.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EntityType {
	/// A talk or conference session.
	Conference,
	/// A person: speaker, author or contributor.
	Actant,
	/// A subject keyword.
	Keyword,
	/// A quoted citation attached to a talk.
	Citation,
	/// A bibliographic entry.
	Bibliography,
	/// A media reference (film, recording, artwork).
	Mediagraphy,
	/// A category of institutions (university, museum, ...).
	InstitutionKind,
	/// An institution people are affiliated with.
	Institution,
	/// A curated collection of conferences.
	Collection,
}

/// A field of a raw record holding references to entities of `target` type.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RefField {
	/// Field name in the raw record.
	pub name: &'static str,
	/// Type of the referenced entities.
	pub target: EntityType,
}

const fn field(name: &'static str, target: EntityType) -> RefField {
	RefField { name, target }
}

const INSTITUTION_FIELDS: &[RefField] = &[field("kind", EntityType::InstitutionKind)];
const ACTANT_FIELDS: &[RefField] = &[field("institutions", EntityType::Institution)];
const CONFERENCE_FIELDS: &[RefField] = &[
	field("actants", EntityType::Actant),
	field("keywords", EntityType::Keyword),
];
const CITATION_FIELDS: &[RefField] = &[
	field("actants", EntityType::Actant),
	field("conference", EntityType::Conference),
];
const BIBLIOGRAPHY_FIELDS: &[RefField] = &[
	field("actants", EntityType::Actant),
	field("keywords", EntityType::Keyword),
];
const MEDIAGRAPHY_FIELDS: &[RefField] = &[
	field("conference", EntityType::Conference),
	field("keywords", EntityType::Keyword),
];
const COLLECTION_FIELDS: &[RefField] = &[field("conferences", EntityType::Conference)];

impl EntityType {
	/// Every type, in the order groups are shown in the overview.
	pub const ALL: [EntityType; 9] = [
		EntityType::Conference,
		EntityType::Actant,
		EntityType::Keyword,
		EntityType::Citation,
		EntityType::Bibliography,
		EntityType::Mediagraphy,
		EntityType::Institution,
		EntityType::InstitutionKind,
		EntityType::Collection,
	];

	/// Collection name used as the `action` parameter on the wire.
	pub fn collection_name(self) -> &'static str {
		match self {
			EntityType::Conference => "conferences",
			EntityType::Actant => "actants",
			EntityType::Keyword => "keywords",
			EntityType::Citation => "citations",
			EntityType::Bibliography => "bibliographies",
			EntityType::Mediagraphy => "mediagraphies",
			EntityType::InstitutionKind => "institution-kinds",
			EntityType::Institution => "institutions",
			EntityType::Collection => "collections",
		}
	}

	/// Singular tag, as used in entity keys and navigation callbacks.
	pub fn tag(self) -> &'static str {
		match self {
			EntityType::Conference => "conference",
			EntityType::Actant => "actant",
			EntityType::Keyword => "keyword",
			EntityType::Citation => "citation",
			EntityType::Bibliography => "bibliography",
			EntityType::Mediagraphy => "mediagraphy",
			EntityType::InstitutionKind => "institution-kind",
			EntityType::Institution => "institution",
			EntityType::Collection => "collection",
		}
	}

	/// Human readable plural label for group nodes.
	pub fn label(self) -> &'static str {
		match self {
			EntityType::Conference => "Conferences",
			EntityType::Actant => "People",
			EntityType::Keyword => "Keywords",
			EntityType::Citation => "Citations",
			EntityType::Bibliography => "Bibliography",
			EntityType::Mediagraphy => "Mediagraphy",
			EntityType::InstitutionKind => "Institution kinds",
			EntityType::Institution => "Institutions",
			EntityType::Collection => "Collections",
		}
	}

	/// Inverse of [`EntityType::tag`].
	pub fn from_tag(tag: &str) -> Option<Self> {
		Self::ALL.into_iter().find(|ty| ty.tag() == tag)
	}

	/// Reference fields stored on records of this type.
	pub fn reference_fields(self) -> &'static [RefField] {
		match self {
			EntityType::Institution => INSTITUTION_FIELDS,
			EntityType::Actant => ACTANT_FIELDS,
			EntityType::Conference => CONFERENCE_FIELDS,
			EntityType::Citation => CITATION_FIELDS,
			EntityType::Bibliography => BIBLIOGRAPHY_FIELDS,
			EntityType::Mediagraphy => MEDIAGRAPHY_FIELDS,
			EntityType::Collection => COLLECTION_FIELDS,
			EntityType::Keyword | EntityType::InstitutionKind => &[],
		}
	}

	/// Types that must be cached before this one can be normalized.
	pub fn dependencies(self) -> Vec<EntityType> {
		let mut deps: Vec<EntityType> = self.reference_fields().iter().map(|f| f.target).collect();
		deps.sort();
		deps.dedup();
		deps
	}

	/// Types whose records embed references to this type, directly or
	/// through another embedding type.
	pub fn dependents(self) -> Vec<EntityType> {
		let mut out = Vec::new();
		let mut frontier = vec![self];
		while let Some(current) = frontier.pop() {
			for ty in Self::ALL {
				if !out.contains(&ty) && ty.dependencies().contains(&current) {
					out.push(ty);
					frontier.push(ty);
				}
			}
		}
		out
	}

	/// Groups every type into waves: a wave only depends on earlier waves,
	/// so the members of one wave can be fetched concurrently.
	pub fn load_order() -> Vec<Vec<EntityType>> {
		let mut placed: Vec<EntityType> = Vec::new();
		let mut waves = Vec::new();
		while placed.len() < Self::ALL.len() {
			let wave: Vec<EntityType> = Self::ALL
				.into_iter()
				.filter(|ty| !placed.contains(ty))
				.filter(|ty| ty.dependencies().iter().all(|d| placed.contains(d)))
				.collect();
			if wave.is_empty() {
				// Unreachable while the schema is acyclic.
				break;
			}
			placed.extend(&wave);
			waves.push(wave);
		}
		waves
	}
}

impl fmt::Display for EntityType {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.tag())
	}
}

/// Identity of an entity. Ids are only unique within a type.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntityKey {
	/// Type the id belongs to.
	pub entity_type: EntityType,
	/// Record id as served by the API.
	pub id: String,
}

impl EntityKey {
	/// Key of record `id` of `entity_type`.
	pub fn new(entity_type: EntityType, id: impl Into<String>) -> Self {
		Self {
			entity_type,
			id: id.into(),
		}
	}

	/// Parses the `type:id` form produced by `Display`.
	pub fn parse(text: &str) -> Option<Self> {
		let (tag, id) = text.split_once(':')?;
		let id = id.trim();
		if id.is_empty() {
			return None;
		}
		Some(Self::new(EntityType::from_tag(tag.trim())?, id))
	}
}

impl fmt::Display for EntityKey {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}:{}", self.entity_type, self.id)
	}
}

/// A reference held in a foreign-key field.
///
/// Parsing yields `Unresolved` ids; the normalizer replaces them with the
/// cached target entity. Cached entities only ever hold `Resolved` refs.
#[derive(Clone, Debug)]
pub enum Ref {
	/// An id that has not been looked up.
	Unresolved(String),
	/// The cached entity the id points at.
	Resolved(Rc<Entity>),
}

impl Ref {
	/// The referenced id.
	pub fn id(&self) -> &str {
		match self {
			Ref::Unresolved(id) => id,
			Ref::Resolved(entity) => &entity.key.id,
		}
	}

	/// The target entity, once resolved.
	pub fn entity(&self) -> Option<&Rc<Entity>> {
		match self {
			Ref::Resolved(entity) => Some(entity),
			Ref::Unresolved(_) => None,
		}
	}
}

/// A normalized record.
#[derive(Clone, Debug)]
pub struct Entity {
	/// Type and id.
	pub key: EntityKey,
	/// Display label derived from the record.
	pub title: String,
	/// Non-reference fields of the raw record.
	pub attributes: Map<String, Value>,
	/// Reference fields, keyed by field name.
	pub refs: BTreeMap<&'static str, Vec<Ref>>,
}

impl Entity {
	/// Type of this record.
	pub fn entity_type(&self) -> EntityType {
		self.key.entity_type
	}

	/// Resolved entities referenced from `field`.
	pub fn references<'a>(&'a self, field: &str) -> impl Iterator<Item = &'a Rc<Entity>> + 'a {
		self.refs
			.get(field)
			.into_iter()
			.flatten()
			.filter_map(Ref::entity)
	}

	/// Keys of every entity this record references, over all fields.
	pub fn referenced_keys(&self) -> impl Iterator<Item = &EntityKey> {
		self.refs
			.values()
			.flatten()
			.filter_map(Ref::entity)
			.map(|e| &e.key)
	}

	/// A string attribute of the raw record.
	#[cfg(test)]
	pub fn attribute_str(&self, name: &str) -> Option<&str> {
		self.attributes.get(name).and_then(Value::as_str)
	}
}

/// Every normalized entity of one type, in API order.
#[derive(Debug)]
pub struct Collection {
	/// Type of every entity in the collection.
	pub entity_type: EntityType,
	/// Entities in API order, without duplicates.
	pub entities: Vec<Rc<Entity>>,
	by_id: std::collections::HashMap<String, usize>,
}

impl Collection {
	/// Indexes `entities` by id.
	pub fn new(entity_type: EntityType, entities: Vec<Rc<Entity>>) -> Self {
		let by_id = entities
			.iter()
			.enumerate()
			.map(|(i, e)| (e.key.id.clone(), i))
			.collect();
		Self {
			entity_type,
			entities,
			by_id,
		}
	}

	/// The entity with `id`.
	pub fn get(&self, id: &str) -> Option<&Rc<Entity>> {
		self.by_id.get(id).map(|&i| &self.entities[i])
	}

	/// Number of entities.
	pub fn len(&self) -> usize {
		self.entities.len()
	}

	/// Whether the collection holds no entity.
	pub fn is_empty(&self) -> bool {
		self.entities.is_empty()
	}
}

/// The collections available for one graph build.
#[derive(Clone, Debug, Default)]
pub struct Catalog {
	collections: BTreeMap<EntityType, Rc<Collection>>,
}

impl Catalog {
	/// Catalog of `collections`; later ones replace earlier ones of the same type.
	pub fn new(collections: impl IntoIterator<Item = Rc<Collection>>) -> Self {
		Self {
			collections: collections
				.into_iter()
				.map(|c| (c.entity_type, c))
				.collect(),
		}
	}

	/// The loaded collection of `entity_type`.
	pub fn collection(&self, entity_type: EntityType) -> Option<&Rc<Collection>> {
		self.collections.get(&entity_type)
	}

	/// Loaded collections, ordered by type.
	pub fn collections(&self) -> impl Iterator<Item = &Rc<Collection>> {
		self.collections.values()
	}

	/// Looks up one entity across collections.
	pub fn entity(&self, key: &EntityKey) -> Option<&Rc<Entity>> {
		self.collection(key.entity_type)?.get(&key.id)
	}

	/// Types with a loaded collection.
	pub fn types(&self) -> Vec<EntityType> {
		self.collections.keys().copied().collect()
	}

	/// Whether nothing is loaded.
	pub fn is_empty(&self) -> bool {
		self.collections.is_empty()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn load_order_respects_dependencies() {
		let waves = EntityType::load_order();
		let flat: Vec<EntityType> = waves.iter().flatten().copied().collect();
		assert_eq!(flat.len(), EntityType::ALL.len());

		for (i, wave) in waves.iter().enumerate() {
			let earlier: Vec<EntityType> = waves[..i].iter().flatten().copied().collect();
			for ty in wave {
				for dep in ty.dependencies() {
					assert!(earlier.contains(&dep), "{ty} loads before its dependency {dep}");
				}
			}
		}
	}

	#[test]
	fn actants_never_embed_conferences() {
		assert!(!EntityType::Actant.dependencies().contains(&EntityType::Conference));
		assert!(EntityType::Conference.dependencies().contains(&EntityType::Actant));
	}

	#[test]
	fn dependents_are_transitive() {
		let deps = EntityType::Actant.dependents();
		assert!(deps.contains(&EntityType::Conference));
		assert!(deps.contains(&EntityType::Citation));
		// Collections embed conferences, which embed actants.
		assert!(deps.contains(&EntityType::Collection));
		assert!(!deps.contains(&EntityType::Keyword));
		assert!(EntityType::Collection.dependents().is_empty());
	}

	#[test]
	fn key_round_trips_through_display() {
		let key = EntityKey::new(EntityType::InstitutionKind, "12");
		assert_eq!(key.to_string(), "institution-kind:12");
		assert_eq!(EntityKey::parse("institution-kind:12"), Some(key));
		assert_eq!(EntityKey::parse("actant:"), None);
		assert_eq!(EntityKey::parse("planet:3"), None);
	}
}
