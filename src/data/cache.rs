//! Session-scoped storage of normalized collections.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use super::entity::{Collection, EntityType};

/// Storage for fully populated collections.
///
/// A collection is either absent or complete; implementations replace whole
/// collections and never expose a partially filled one.
pub trait CollectionCache {
	/// The cached collection of `entity_type`, if any.
	fn get(&self, entity_type: EntityType) -> Option<Rc<Collection>>;
	/// Stores a complete collection, replacing any previous one.
	fn set(&self, entity_type: EntityType, collection: Rc<Collection>);
	/// Drops one collection, or every collection when `entity_type` is `None`.
	fn invalidate(&self, entity_type: Option<EntityType>);
}

/// In-process cache backed by a hash map.
#[derive(Debug, Default)]
pub struct MemoryCache {
	entries: RefCell<HashMap<EntityType, Rc<Collection>>>,
}

impl MemoryCache {
	/// An empty cache.
	pub fn new() -> Self {
		Self::default()
	}
}

impl CollectionCache for MemoryCache {
	fn get(&self, entity_type: EntityType) -> Option<Rc<Collection>> {
		self.entries.borrow().get(&entity_type).cloned()
	}

	fn set(&self, entity_type: EntityType, collection: Rc<Collection>) {
		self.entries.borrow_mut().insert(entity_type, collection);
	}

	fn invalidate(&self, entity_type: Option<EntityType>) {
		let mut entries = self.entries.borrow_mut();
		match entity_type {
			Some(ty) => {
				entries.remove(&ty);
			}
			None => entries.clear(),
		}
	}
}

impl<C: CollectionCache + ?Sized> CollectionCache for Rc<C> {
	fn get(&self, entity_type: EntityType) -> Option<Rc<Collection>> {
		(**self).get(entity_type)
	}

	fn set(&self, entity_type: EntityType, collection: Rc<Collection>) {
		(**self).set(entity_type, collection)
	}

	fn invalidate(&self, entity_type: Option<EntityType>) {
		(**self).invalidate(entity_type)
	}
}
