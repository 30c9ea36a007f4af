//! Archive data: fetching, normalization, caching and link derivation.
//!
//! Records flow one way: a [`CollectionSource`] serves raw JSON pages, the
//! normalizer turns them into [`Entity`] values with resolved references, a
//! [`CollectionCache`] keeps whole collections for the session, and the
//! [`LinkIndex`] inverts the stored references into symmetric links.

pub mod cache;
pub mod entity;
pub mod error;
pub mod links;
pub mod normalize;
pub mod source;
pub mod store;

#[cfg(test)]
pub(crate) mod testing;

pub use cache::{CollectionCache, MemoryCache};
pub use entity::{Catalog, Collection, Entity, EntityKey, EntityType, Ref};
pub use error::{DataError, MalformedReference, SourceError};
pub use links::{LinkIndex, scan_links};
pub use source::{CollectionSource, HttpSource};
pub use store::{LoadReport, Store};
