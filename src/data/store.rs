//! Collection store: fetches, normalizes and caches collections, and keeps
//! the link index of whatever is currently cached.

use std::cell::RefCell;
use std::collections::{BTreeSet, HashMap};
use std::rc::Rc;

use futures::FutureExt;
use futures::future::{LocalBoxFuture, join_all};
use log::{debug, info, warn};

use super::cache::{CollectionCache, MemoryCache};
use super::entity::{Catalog, Collection, Entity, EntityKey, EntityType};
use super::error::DataError;
use super::links::LinkIndex;
use super::normalize::{Resolver, normalize_collection};
use super::source::CollectionSource;

/// Default number of records requested per page.
pub const DEFAULT_PAGE_SIZE: usize = 100;

/// Result of loading every collection: what loaded and what did not.
#[derive(Debug, Default)]
pub struct LoadReport {
	/// Every collection that loaded, degraded ones included.
	pub catalog: Catalog,
	/// Collections that could not be fetched.
	pub failures: Vec<DataError>,
	/// Collections built without one of their dependencies. They are part of
	/// the catalog but were not cached.
	pub degraded: Vec<EntityType>,
}

impl LoadReport {
	/// Whether any collection failed to load.
	pub fn is_partial(&self) -> bool {
		!self.failures.is_empty()
	}
}

/// Outcome of loading one collection.
#[derive(Clone, Debug)]
enum Loaded {
	/// Complete and cached.
	Ready(Rc<Collection>),
	/// Normalized while a dependency was unavailable; never cached.
	Degraded(Rc<Collection>),
	Failed(DataError),
}

/// Outcomes of one load, so a failed or degraded collection is fetched at
/// most once however many types depend on it.
#[derive(Default)]
struct LoadSession {
	outcomes: RefCell<HashMap<EntityType, Loaded>>,
}

impl LoadSession {
	fn get(&self, entity_type: EntityType) -> Option<Loaded> {
		self.outcomes.borrow().get(&entity_type).cloned()
	}

	fn record(&self, entity_type: EntityType, outcome: Loaded) -> Loaded {
		self.outcomes.borrow_mut().insert(entity_type, outcome.clone());
		outcome
	}
}

/// Resolves references against the loaded dependencies of one collection.
struct DependencyResolver<'a> {
	loaded: &'a [Rc<Collection>],
	unavailable: &'a [EntityType],
}

impl Resolver for DependencyResolver<'_> {
	fn resolve(&self, entity_type: EntityType, id: &str) -> Option<Rc<Entity>> {
		self.loaded
			.iter()
			.find(|c| c.entity_type == entity_type)
			.and_then(|c| c.get(id))
			.cloned()
	}

	fn is_available(&self, entity_type: EntityType) -> bool {
		!self.unavailable.contains(&entity_type)
	}
}

/// The link index and the exact collections it was built from.
struct IndexEntry {
	collections: Vec<Rc<Collection>>,
	index: Rc<LinkIndex>,
}

impl IndexEntry {
	fn covers(&self, catalog: &Catalog) -> bool {
		let mut built_from = self.collections.iter();
		catalog
			.collections()
			.all(|c| built_from.next().is_some_and(|b| Rc::ptr_eq(b, c)))
			&& built_from.next().is_none()
	}
}

/// Fetches collections through a [`CollectionSource`] and keeps them in a
/// [`CollectionCache`].
pub struct Store<S, C = MemoryCache> {
	source: S,
	cache: C,
	page_size: usize,
	index: RefCell<Option<IndexEntry>>,
}

impl<S: CollectionSource> Store<S, MemoryCache> {
	/// A store over `source` with an in-memory cache.
	pub fn new(source: S) -> Self {
		Self::with_cache(source, MemoryCache::new())
	}
}

impl<S: CollectionSource, C: CollectionCache> Store<S, C> {
	/// A store over `source` keeping collections in `cache`.
	pub fn with_cache(source: S, cache: C) -> Self {
		Self {
			source,
			cache,
			page_size: DEFAULT_PAGE_SIZE,
			index: RefCell::new(None),
		}
	}

	/// Records requested per page; at least one.
	pub fn with_page_size(mut self, page_size: usize) -> Self {
		self.page_size = page_size.max(1);
		self
	}

	/// The cache backing this store.
	pub fn cache(&self) -> &C {
		&self.cache
	}

	/// Returns the cached collection, fetching and normalizing it (and its
	/// dependencies) on a miss.
	///
	/// Repeated calls return the same `Rc` until the collection is
	/// invalidated. When a dependency cannot be loaded the collection is
	/// still returned, with references into that dependency dropped, but it
	/// is not cached and the next call tries again.
	pub async fn collection(&self, entity_type: EntityType) -> Result<Rc<Collection>, DataError> {
		match self.load(entity_type, &LoadSession::default()).await {
			Loaded::Ready(collection) | Loaded::Degraded(collection) => Ok(collection),
			Loaded::Failed(e) => Err(e),
		}
	}

	fn load<'a>(&'a self, entity_type: EntityType, session: &'a LoadSession) -> LocalBoxFuture<'a, Loaded> {
		async move {
			if let Some(hit) = self.cache.get(entity_type) {
				debug!("scholar-graph: cache hit for {}", entity_type.collection_name());
				return Loaded::Ready(hit);
			}
			if let Some(done) = session.get(entity_type) {
				return done;
			}

			let mut loaded = Vec::new();
			let mut unavailable = Vec::new();
			let mut degraded = false;
			for dep in entity_type.dependencies() {
				match self.load(dep, session).await {
					Loaded::Ready(collection) => loaded.push(collection),
					Loaded::Degraded(collection) => {
						degraded = true;
						loaded.push(collection);
					}
					Loaded::Failed(_) => unavailable.push(dep),
				}
			}

			let records = match self.fetch_all(entity_type).await {
				Ok(records) => records,
				Err(e) => {
					warn!("scholar-graph: {e}");
					return session.record(entity_type, Loaded::Failed(e));
				}
			};
			for dep in &unavailable {
				warn!(
					"scholar-graph: {} loaded without their {dep} references, {} unavailable",
					entity_type.collection_name(),
					dep.collection_name()
				);
			}
			let resolver = DependencyResolver {
				loaded: &loaded,
				unavailable: &unavailable,
			};
			let collection = Rc::new(normalize_collection(entity_type, &records, &resolver));

			let outcome = if degraded || !unavailable.is_empty() {
				Loaded::Degraded(collection)
			} else if let Some(existing) = self.cache.get(entity_type) {
				// A concurrent load of the same type finished first.
				Loaded::Ready(existing)
			} else {
				self.cache.set(entity_type, collection.clone());
				Loaded::Ready(collection)
			};
			session.record(entity_type, outcome)
		}
		.boxed_local()
	}

	/// Fetches pages until an empty one comes back. Any failed page fails the
	/// whole collection.
	async fn fetch_all(&self, entity_type: EntityType) -> Result<Vec<serde_json::Value>, DataError> {
		let name = entity_type.collection_name();
		let mut records = Vec::new();
		let mut page = 1;
		loop {
			let batch = self
				.source
				.fetch_page(name, page, self.page_size)
				.await
				.map_err(|source| DataError::Fetch {
					collection: entity_type,
					page,
					source,
				})?;
			if batch.is_empty() {
				break;
			}
			records.extend(batch);
			page += 1;
		}
		info!(
			"scholar-graph: fetched {} {name} in {} pages",
			records.len(),
			page
		);
		Ok(records)
	}

	/// Loads every collection. Types of one dependency wave are fetched
	/// concurrently; failures are collected rather than aborting the load.
	pub async fn load_all(&self) -> LoadReport {
		let session = LoadSession::default();
		let mut report = LoadReport::default();
		let mut loaded = Vec::new();
		for wave in EntityType::load_order() {
			let outcomes = join_all(wave.iter().map(|&ty| self.load(ty, &session))).await;
			for (ty, outcome) in wave.into_iter().zip(outcomes) {
				match outcome {
					Loaded::Ready(collection) => loaded.push(collection),
					Loaded::Degraded(collection) => {
						report.degraded.push(ty);
						loaded.push(collection);
					}
					Loaded::Failed(e) => report.failures.push(e),
				}
			}
		}
		report.catalog = Catalog::new(loaded);
		report
	}

	/// Link index over `catalog`, reused for as long as the catalog holds the
	/// very same collections.
	pub fn link_index(&self, catalog: &Catalog) -> Rc<LinkIndex> {
		if let Some(entry) = self.index.borrow().as_ref() {
			if entry.covers(catalog) {
				return entry.index.clone();
			}
		}
		let index = Rc::new(LinkIndex::build(catalog));
		let collections: Vec<Rc<Collection>> = catalog.collections().cloned().collect();
		debug!(
			"scholar-graph: built link index over {} collections, {} links",
			collections.len(),
			index.link_count()
		);
		*self.index.borrow_mut() = Some(IndexEntry {
			collections,
			index: index.clone(),
		});
		index
	}

	/// Keys of every entity linked to `key`, populating collections first.
	pub async fn links(&self, key: &EntityKey) -> BTreeSet<EntityKey> {
		let report = self.load_all().await;
		self.link_index(&report.catalog).links(key)
	}

	/// Drops one collection (and every collection embedding it) or, with
	/// `None`, everything. The link index is dropped as well.
	pub fn invalidate(&self, entity_type: Option<EntityType>) {
		match entity_type {
			Some(ty) => {
				self.cache.invalidate(Some(ty));
				for dependent in ty.dependents() {
					self.cache.invalidate(Some(dependent));
				}
				info!("scholar-graph: invalidated {} and its dependents", ty.collection_name());
			}
			None => {
				self.cache.invalidate(None);
				info!("scholar-graph: invalidated every collection");
			}
		}
		*self.index.borrow_mut() = None;
	}

	/// Abandons every request still in flight.
	pub fn abort_pending(&self) {
		self.source.abort_pending();
	}
}

#[cfg(test)]
mod tests {
	use futures::executor::block_on;
	use serde_json::json;

	use super::*;
	use crate::data::testing::{MemorySource, key};

	fn store(source: &Rc<MemorySource>) -> Store<Rc<MemorySource>> {
		Store::new(source.clone())
	}

	#[test]
	fn collection_is_fetched_once_and_shared() {
		let source = Rc::new(MemorySource::sample());
		let store = store(&source);

		let first = block_on(store.collection(EntityType::Keyword)).unwrap();
		let calls = source.calls();
		let second = block_on(store.collection(EntityType::Keyword)).unwrap();

		assert!(Rc::ptr_eq(&first, &second));
		assert_eq!(source.calls(), calls);
		assert_eq!(first.len(), 3);
	}

	#[test]
	fn pagination_stops_at_the_first_empty_page() {
		let source = Rc::new(MemorySource::new());
		let records = (0..300)
			.map(|i| json!({"id": i, "title": format!("citation {i}")}))
			.collect();
		source.set_records("citations", records);
		let store = store(&source).with_page_size(100);

		let citations = block_on(store.collection(EntityType::Citation)).unwrap();

		assert_eq!(citations.len(), 300);
		assert_eq!(source.calls_for("citations"), 4);
	}

	#[test]
	fn dependencies_are_loaded_before_dependents() {
		let source = Rc::new(MemorySource::sample());
		let store = store(&source);

		let conferences = block_on(store.collection(EntityType::Conference)).unwrap();

		assert!(store.cache().get(EntityType::Actant).is_some());
		assert!(store.cache().get(EntityType::Institution).is_some());
		let engines = conferences.get("10").unwrap();
		let speakers: Vec<&str> = engines.references("actants").map(|a| a.title.as_str()).collect();
		assert_eq!(speakers, vec!["Ada Lovelace", "Alan Turing"]);
	}

	#[test]
	fn failed_page_caches_nothing() {
		let source = Rc::new(MemorySource::sample());
		source.fail("keywords");
		let store = store(&source);

		let err = block_on(store.collection(EntityType::Keyword)).unwrap_err();
		assert!(matches!(err, DataError::Fetch { collection: EntityType::Keyword, page: 1, .. }));
		assert!(store.cache().get(EntityType::Keyword).is_none());
	}

	#[test]
	fn dependents_of_a_failed_collection_load_without_its_references() {
		let source = Rc::new(MemorySource::sample());
		source.fail("keywords");
		let store = store(&source);

		let conferences = block_on(store.collection(EntityType::Conference)).unwrap();
		let engines = conferences.get("10").unwrap();
		assert_eq!(engines.references("actants").count(), 2);
		assert_eq!(engines.references("keywords").count(), 0);
		// Degraded collections are rebuilt once the dependency is back.
		assert!(store.cache().get(EntityType::Conference).is_none());

		source.recover("keywords");
		let conferences = block_on(store.collection(EntityType::Conference)).unwrap();
		assert_eq!(conferences.get("10").unwrap().references("keywords").count(), 1);
		assert!(store.cache().get(EntityType::Conference).is_some());
	}

	#[test]
	fn keyword_outage_keeps_the_rest_of_the_archive() {
		let source = Rc::new(MemorySource::sample());
		source.fail("keywords");
		let store = store(&source);

		let report = block_on(store.load_all());

		assert_eq!(report.failures.len(), 1);
		assert_eq!(report.failures[0].collection(), EntityType::Keyword);
		assert_eq!(report.catalog.types().len(), EntityType::ALL.len() - 1);
		assert_eq!(source.calls_for("keywords"), 1);
		for ty in [
			EntityType::Conference,
			EntityType::Citation,
			EntityType::Bibliography,
			EntityType::Mediagraphy,
			EntityType::Collection,
		] {
			assert!(report.degraded.contains(&ty), "{ty} should be degraded");
			assert!(store.cache().get(ty).is_none(), "{ty} should not be cached");
		}
		assert!(store.cache().get(EntityType::Actant).is_some());

		let ada = store.link_index(&report.catalog).links(&key(EntityType::Actant, "1"));
		assert!(ada.contains(&key(EntityType::Institution, "1")));
		assert!(ada.contains(&key(EntityType::Conference, "10")));
		assert!(ada.contains(&key(EntityType::Conference, "11")));
		assert!(ada.contains(&key(EntityType::Citation, "30")));
	}

	#[test]
	fn load_all_keeps_what_succeeded() {
		let source = Rc::new(MemorySource::sample());
		source.fail("mediagraphies");
		let store = store(&source);

		let report = block_on(store.load_all());

		assert!(report.is_partial());
		assert_eq!(report.failures.len(), 1);
		assert_eq!(report.failures[0].collection(), EntityType::Mediagraphy);
		assert_eq!(report.catalog.types().len(), EntityType::ALL.len() - 1);
	}

	#[test]
	fn invalidation_refetches_embedded_actants() {
		let source = Rc::new(MemorySource::sample());
		let store = store(&source);
		let talk = key(EntityType::Conference, "12");
		let grace = key(EntityType::Actant, "3");
		let newcomer = key(EntityType::Actant, "4");

		// Conference 12 lists actant 4, which the API does not know yet.
		source.set_records(
			"conferences",
			vec![json!({"id": 12, "title": "Compilers", "actants": [3, 4], "keywords": [22]})],
		);
		let before = block_on(store.links(&talk));
		assert!(before.contains(&grace));
		assert!(!before.contains(&newcomer));

		source.set_records(
			"actants",
			vec![
				json!({"id": 3, "first_name": "Grace", "last_name": "Brewster Hopper"}),
				json!({"id": 4, "first_name": "Jean", "last_name": "Sammet"}),
			],
		);
		// Without invalidation the cached data is served.
		assert!(!block_on(store.links(&talk)).contains(&newcomer));

		store.invalidate(Some(EntityType::Actant));
		let after = block_on(store.links(&talk));
		assert!(after.contains(&newcomer));

		let conferences = block_on(store.collection(EntityType::Conference)).unwrap();
		let names: Vec<&str> = conferences
			.get("12")
			.unwrap()
			.references("actants")
			.map(|a| a.title.as_str())
			.collect();
		assert_eq!(names, vec!["Grace Brewster Hopper", "Jean Sammet"]);
	}

	#[test]
	fn link_index_is_memoized_until_invalidation() {
		let source = Rc::new(MemorySource::sample());
		let store = store(&source);
		let report = block_on(store.load_all());

		let a = store.link_index(&report.catalog);
		let b = store.link_index(&report.catalog);
		assert!(Rc::ptr_eq(&a, &b));

		store.invalidate(None);
		assert!(store.cache().get(EntityType::Keyword).is_none());
		let report = block_on(store.load_all());
		let c = store.link_index(&report.catalog);
		assert!(!Rc::ptr_eq(&a, &c));
	}

	#[test]
	fn link_index_follows_the_catalog_it_is_asked_about() {
		let source = Rc::new(MemorySource::sample());
		let store = store(&source);
		let talk = key(EntityType::Conference, "12");
		let newcomer = key(EntityType::Actant, "4");

		let old = block_on(store.load_all());
		source.set_records(
			"conferences",
			vec![json!({"id": 12, "title": "Compilers", "actants": [3, 4]})],
		);
		source.set_records(
			"actants",
			vec![
				json!({"id": 3, "first_name": "Grace", "last_name": "Hopper"}),
				json!({"id": 4, "first_name": "Jean", "last_name": "Sammet"}),
			],
		);
		store.invalidate(Some(EntityType::Actant));

		// A superseded build indexes the old catalog after the invalidation.
		let stale = store.link_index(&old.catalog);
		assert!(!stale.links(&talk).contains(&newcomer));

		let fresh = block_on(store.load_all());
		assert_eq!(fresh.catalog.types(), old.catalog.types());
		assert!(store.link_index(&fresh.catalog).links(&talk).contains(&newcomer));
		assert!(!store.link_index(&old.catalog).links(&talk).contains(&newcomer));
	}

	#[test]
	fn abort_pending_reaches_the_source() {
		let source = Rc::new(MemorySource::sample());
		let store = store(&source);
		store.abort_pending();
		store.abort_pending();
		assert_eq!(source.aborts(), 2);
	}
}
