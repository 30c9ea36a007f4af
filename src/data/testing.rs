//! In-memory fixtures shared by the unit tests.

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use async_trait::async_trait;
use serde_json::{Value, json};

use super::entity::{Catalog, Collection, Entity, EntityKey, EntityType};
use super::error::SourceError;
use super::normalize::normalize_collection;
use super::source::CollectionSource;

/// Raw records of a small archive, keyed by collection name.
///
/// Actant 1 (Ada) has one institution, three talks among conferences and
/// citations, and no keywords of her own.
pub fn sample_records() -> HashMap<&'static str, Vec<Value>> {
	HashMap::from([
		("institution-kinds", vec![json!({"id": 1, "name": "University"})]),
		(
			"institutions",
			vec![
				json!({"id": 1, "name": "EHESS", "kind": 1}),
				json!({"id": 2, "name": "MIT", "kind": {"id": 1, "name": "University"}}),
			],
		),
		(
			"actants",
			vec![
				json!({"id": 1, "first_name": "Ada", "last_name": "Lovelace", "institutions": [1]}),
				json!({"id": 2, "first_name": "Alan", "last_name": "Turing", "institutions": "1,2"}),
				json!({"id": 3, "first_name": "Grace", "last_name": "Hopper", "institutions": []}),
			],
		),
		(
			"keywords",
			vec![
				json!({"id": 20, "name": "computation"}),
				json!({"id": 21, "name": "memory"}),
				json!({"id": 22, "name": "archives"}),
			],
		),
		(
			"conferences",
			vec![
				json!({"id": 10, "title": "Engines", "actants": [1, 2], "keywords": [20]}),
				json!({"id": 11, "title": "Notes", "actants": "1", "keywords": "20,21"}),
				json!({"id": 12, "title": "Compilers", "actants": [{"id": 3}], "keywords": [22, 99]}),
			],
		),
		(
			"citations",
			vec![json!({"id": 30, "title": "On engines", "actants": [1], "conference": 10})],
		),
		(
			"bibliographies",
			vec![json!({"id": 40, "title": "Sketch", "actants": [2], "keywords": [21]})],
		),
		(
			"mediagraphies",
			vec![json!({"id": 50, "title": "Film", "conference": 12, "keywords": null})],
		),
		(
			"collections",
			vec![json!({"id": 60, "title": "Early computing", "conferences": [10, 11]})],
		),
	])
}

/// Normalizes [`sample_records`] in dependency order without any fetching.
pub fn sample_catalog() -> Catalog {
	let records = sample_records();
	let mut built: HashMap<EntityType, Rc<Collection>> = HashMap::new();
	for wave in EntityType::load_order() {
		for ty in wave {
			let resolver = |target: EntityType, id: &str| -> Option<Rc<Entity>> {
				built.get(&target)?.get(id).cloned()
			};
			let raw = records.get(ty.collection_name()).cloned().unwrap_or_default();
			let collection = normalize_collection(ty, &raw, &resolver);
			built.insert(ty, Rc::new(collection));
		}
	}
	Catalog::new(built.into_values())
}

pub fn key(entity_type: EntityType, id: &str) -> EntityKey {
	EntityKey::new(entity_type, id)
}

/// A [`CollectionSource`] serving pages out of memory and counting calls.
#[derive(Default)]
pub struct MemorySource {
	records: RefCell<HashMap<String, Vec<Value>>>,
	failing: RefCell<HashSet<String>>,
	calls: Cell<usize>,
	calls_by_collection: RefCell<HashMap<String, usize>>,
	aborts: Cell<usize>,
}

impl MemorySource {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn sample() -> Self {
		let source = Self::new();
		for (name, records) in sample_records() {
			source.set_records(name, records);
		}
		source
	}

	pub fn set_records(&self, collection: &str, records: Vec<Value>) {
		self.records.borrow_mut().insert(collection.to_string(), records);
	}

	pub fn fail(&self, collection: &str) {
		self.failing.borrow_mut().insert(collection.to_string());
	}

	pub fn recover(&self, collection: &str) {
		self.failing.borrow_mut().remove(collection);
	}

	pub fn calls(&self) -> usize {
		self.calls.get()
	}

	pub fn calls_for(&self, collection: &str) -> usize {
		self.calls_by_collection.borrow().get(collection).copied().unwrap_or(0)
	}

	pub fn aborts(&self) -> usize {
		self.aborts.get()
	}
}

#[async_trait(?Send)]
impl CollectionSource for MemorySource {
	async fn fetch_page(
		&self,
		collection: &str,
		page: usize,
		page_size: usize,
	) -> Result<Vec<Value>, SourceError> {
		self.calls.set(self.calls.get() + 1);
		*self
			.calls_by_collection
			.borrow_mut()
			.entry(collection.to_string())
			.or_default() += 1;

		if self.failing.borrow().contains(collection) {
			return Err(SourceError::Status(503));
		}
		let records = self.records.borrow();
		let all = records.get(collection).map(Vec::as_slice).unwrap_or_default();
		let start = (page.saturating_sub(1) * page_size).min(all.len());
		let end = (start + page_size).min(all.len());
		Ok(all[start..end].to_vec())
	}

	fn abort_pending(&self) {
		self.aborts.set(self.aborts.get() + 1);
	}
}
