//! Conversion of raw API records into normalized [`Entity`] values.
//!
//! The API encodes foreign keys in several shapes: bare ids, comma-joined
//! id strings, embedded objects, or arrays mixing those. They are all reduced
//! to [`Ref`] values here, at the ingestion boundary, and resolved against
//! already cached collections.

use std::collections::{BTreeMap, HashSet};
use std::rc::Rc;

use log::warn;
use serde_json::{Map, Value};

use super::entity::{Collection, Entity, EntityKey, EntityType, Ref};
use super::error::MalformedReference;

/// Looks up cached entities while a collection is being normalized.
pub trait Resolver {
	/// The entity `entity_type:id`, if it is loaded.
	fn resolve(&self, entity_type: EntityType, id: &str) -> Option<Rc<Entity>>;

	/// Whether entities of `entity_type` could be loaded at all. References
	/// into an unavailable type are dropped without a report per reference.
	fn is_available(&self, _entity_type: EntityType) -> bool {
		true
	}
}

impl<F> Resolver for F
where
	F: Fn(EntityType, &str) -> Option<Rc<Entity>>,
{
	fn resolve(&self, entity_type: EntityType, id: &str) -> Option<Rc<Entity>> {
		self(entity_type, id)
	}
}

/// Extracts a record id: a number or a non-empty string.
pub fn parse_id(value: &Value) -> Option<String> {
	match value {
		Value::Number(n) => Some(n.to_string()),
		Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
		_ => None,
	}
}

/// Reads the ids held in a reference field, whatever their encoding.
pub fn parse_refs(value: &Value) -> Result<Vec<String>, String> {
	let mut ids = Vec::new();
	collect_refs(value, &mut ids, 0)?;
	Ok(ids)
}

fn collect_refs(value: &Value, ids: &mut Vec<String>, depth: usize) -> Result<(), String> {
	match value {
		Value::Null => Ok(()),
		Value::Number(n) => {
			ids.push(n.to_string());
			Ok(())
		}
		Value::String(s) => {
			ids.extend(
				s.split(',')
					.map(str::trim)
					.filter(|part| !part.is_empty())
					.map(str::to_string),
			);
			Ok(())
		}
		Value::Object(obj) => match obj.get("id").and_then(parse_id) {
			Some(id) => {
				ids.push(id);
				Ok(())
			}
			None => Err("holds an embedded object without an id".into()),
		},
		Value::Array(items) if depth == 0 => {
			for item in items {
				collect_refs(item, ids, depth + 1)?;
			}
			Ok(())
		}
		Value::Array(_) => Err("holds a nested array".into()),
		Value::Bool(_) => Err("holds a boolean".into()),
	}
}

fn text_field<'a>(raw: &'a Map<String, Value>, name: &str) -> Option<&'a str> {
	raw.get(name)
		.and_then(Value::as_str)
		.map(str::trim)
		.filter(|s| !s.is_empty())
}

/// Derives the display label of a record.
pub fn derive_title(entity_type: EntityType, id: &str, raw: &Map<String, Value>) -> String {
	let derived = match entity_type {
		EntityType::Actant => {
			let parts: Vec<&str> = ["first_name", "last_name"]
				.iter()
				.filter_map(|f| text_field(raw, f))
				.collect();
			if parts.is_empty() {
				text_field(raw, "name").map(str::to_string)
			} else {
				Some(parts.join(" "))
			}
		}
		EntityType::Keyword | EntityType::Institution | EntityType::InstitutionKind => {
			text_field(raw, "name").map(str::to_string)
		}
		_ => text_field(raw, "title")
			.or_else(|| text_field(raw, "name"))
			.map(str::to_string),
	};
	derived.unwrap_or_else(|| format!("{} {}", entity_type.tag(), id))
}

/// Normalizes one raw record. Returns `None` for records without an id.
///
/// Unresolvable references are dropped and reported through `on_malformed`.
/// Fields pointing at a type the resolver marks unavailable come out empty.
pub fn normalize_record(
	entity_type: EntityType,
	raw: &Value,
	resolver: &impl Resolver,
	on_malformed: &mut impl FnMut(MalformedReference),
) -> Option<Entity> {
	let obj = raw.as_object()?;
	let id = obj.get("id").and_then(parse_id)?;
	let key = EntityKey::new(entity_type, id);
	let fields = entity_type.reference_fields();

	let attributes: Map<String, Value> = obj
		.iter()
		.filter(|(name, _)| !fields.iter().any(|f| f.name == name.as_str()))
		.map(|(name, value)| (name.clone(), value.clone()))
		.collect();

	let mut refs = BTreeMap::new();
	for field in fields {
		if !resolver.is_available(field.target) {
			refs.insert(field.name, Vec::new());
			continue;
		}
		let raw_ids = match obj.get(field.name).map(parse_refs) {
			None => Vec::new(),
			Some(Ok(ids)) => ids,
			Some(Err(reason)) => {
				on_malformed(MalformedReference {
					entity: key.clone(),
					field: field.name,
					reason,
				});
				Vec::new()
			}
		};

		let mut seen = HashSet::new();
		let resolved: Vec<Ref> = raw_ids
			.into_iter()
			.filter(|id| seen.insert(id.clone()))
			.map(Ref::Unresolved)
			.filter_map(|r| match resolver.resolve(field.target, r.id()) {
				Some(entity) => Some(Ref::Resolved(entity)),
				None => {
					on_malformed(MalformedReference {
						entity: key.clone(),
						field: field.name,
						reason: format!("points at unknown {}:{}", field.target, r.id()),
					});
					None
				}
			})
			.collect();
		refs.insert(field.name, resolved);
	}

	Some(Entity {
		title: derive_title(entity_type, &key.id, &attributes),
		key,
		attributes,
		refs,
	})
}

/// Normalizes all records of one collection.
///
/// Records without an id are skipped; for duplicate ids the first record wins.
pub fn normalize_collection(
	entity_type: EntityType,
	records: &[Value],
	resolver: &impl Resolver,
) -> Collection {
	let mut seen = HashSet::new();
	let mut entities = Vec::with_capacity(records.len());
	let mut report = |m: MalformedReference| warn!("scholar-graph: {m}");

	for (i, raw) in records.iter().enumerate() {
		let Some(entity) = normalize_record(entity_type, raw, resolver, &mut report) else {
			warn!(
				"scholar-graph: skipping {} record #{i} without a usable id",
				entity_type.collection_name()
			);
			continue;
		};
		if !seen.insert(entity.key.id.clone()) {
			warn!("scholar-graph: duplicate record {}", entity.key);
			continue;
		}
		entities.push(Rc::new(entity));
	}

	Collection::new(entity_type, entities)
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;

	fn no_refs(_: EntityType, _: &str) -> Option<Rc<Entity>> {
		None
	}

	fn stub(entity_type: EntityType, id: &str) -> Rc<Entity> {
		Rc::new(Entity {
			key: EntityKey::new(entity_type, id),
			title: format!("{entity_type} {id}"),
			attributes: Map::new(),
			refs: BTreeMap::new(),
		})
	}

	#[test]
	fn parse_refs_accepts_every_encoding() {
		assert_eq!(parse_refs(&json!(null)).unwrap(), Vec::<String>::new());
		assert_eq!(parse_refs(&json!(7)).unwrap(), vec!["7"]);
		assert_eq!(parse_refs(&json!("7")).unwrap(), vec!["7"]);
		assert_eq!(parse_refs(&json!("1, 2,3,")).unwrap(), vec!["1", "2", "3"]);
		assert_eq!(parse_refs(&json!({"id": 4, "name": "x"})).unwrap(), vec!["4"]);
		assert_eq!(
			parse_refs(&json!([1, "2", {"id": "3"}, "4,5"])).unwrap(),
			vec!["1", "2", "3", "4", "5"]
		);
	}

	#[test]
	fn parse_refs_rejects_malformed_shapes() {
		assert!(parse_refs(&json!(true)).is_err());
		assert!(parse_refs(&json!({"name": "no id"})).is_err());
		assert!(parse_refs(&json!([[1, 2]])).is_err());
	}

	#[test]
	fn titles_are_derived_per_type() {
		let person = json!({"first_name": "Ada", "last_name": "Lovelace"});
		let person = person.as_object().unwrap();
		assert_eq!(derive_title(EntityType::Actant, "1", person), "Ada Lovelace");

		let keyword = json!({"name": "ontology"});
		assert_eq!(
			derive_title(EntityType::Keyword, "2", keyword.as_object().unwrap()),
			"ontology"
		);

		let empty = Map::new();
		assert_eq!(derive_title(EntityType::Citation, "9", &empty), "citation 9");
	}

	#[test]
	fn unresolvable_refs_are_dropped_and_reported() {
		let actant = stub(EntityType::Actant, "1");
		let resolver = |ty: EntityType, id: &str| {
			(ty == EntityType::Actant && id == "1").then(|| actant.clone())
		};
		let raw = json!({"id": 10, "title": "Talk", "actants": "1,2", "keywords": true});

		let mut reports = Vec::new();
		let entity = normalize_record(EntityType::Conference, &raw, &resolver, &mut |m| {
			reports.push(m)
		})
		.unwrap();

		let actants: Vec<&str> = entity.references("actants").map(|e| e.key.id.as_str()).collect();
		assert_eq!(actants, vec!["1"]);
		assert_eq!(entity.references("keywords").count(), 0);
		assert_eq!(reports.len(), 2);
		assert!(reports.iter().all(|r| r.entity == entity.key));
		// Reference fields never leak into attributes.
		assert!(entity.attributes.get("actants").is_none());
		assert_eq!(entity.attribute_str("title"), Some("Talk"));
	}

	struct WithoutKeywords;

	impl Resolver for WithoutKeywords {
		fn resolve(&self, entity_type: EntityType, id: &str) -> Option<Rc<Entity>> {
			Some(stub(entity_type, id))
		}

		fn is_available(&self, entity_type: EntityType) -> bool {
			entity_type != EntityType::Keyword
		}
	}

	#[test]
	fn fields_of_unavailable_types_come_out_empty() {
		let raw = json!({"id": 10, "title": "Talk", "actants": [1, 2], "keywords": [20, 21]});

		let mut reports = Vec::new();
		let entity = normalize_record(EntityType::Conference, &raw, &WithoutKeywords, &mut |m| {
			reports.push(m)
		})
		.unwrap();

		assert_eq!(entity.references("actants").count(), 2);
		assert_eq!(entity.references("keywords").count(), 0);
		assert!(reports.is_empty());
	}

	#[test]
	fn collection_skips_records_without_ids_and_duplicates() {
		let records = vec![
			json!({"id": 1, "name": "a"}),
			json!({"name": "missing id"}),
			json!({"id": "1", "name": "duplicate"}),
			json!({"id": 2, "name": "b"}),
			json!("not an object"),
		];
		let collection = normalize_collection(EntityType::Keyword, &records, &no_refs);
		assert_eq!(collection.len(), 2);
		assert_eq!(collection.get("1").map(|e| e.title.as_str()), Some("a"));
		assert!(collection.get("3").is_none());
	}
}
