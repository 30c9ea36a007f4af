//! Error types for fetching and normalizing collections.

use thiserror::Error;

use super::entity::{EntityKey, EntityType};

/// Failure reported by a [`CollectionSource`](super::source::CollectionSource).
#[derive(Clone, Debug, Error, PartialEq)]
pub enum SourceError {
	/// The request could not be built or sent.
	#[error("request failed: {0}")]
	Request(String),
	/// The server answered with a non-success status.
	#[error("HTTP {0}")]
	Status(u16),
	/// No answer within the configured timeout, in milliseconds.
	#[error("timed out after {0} ms")]
	Timeout(u32),
	/// Abandoned because the data is no longer needed.
	#[error("aborted")]
	Aborted,
	/// The body was not a JSON array of records.
	#[error("unexpected response body: {0}")]
	Body(String),
}

/// Failure to populate a collection. Nothing is cached when this is returned.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum DataError {
	/// A page of `collection` could not be fetched.
	#[error("fetching {collection} page {page} failed: {source}")]
	Fetch {
		/// The collection being fetched.
		collection: EntityType,
		/// The failed page, numbered from 1.
		page: usize,
		/// Why the page failed.
		#[source]
		source: SourceError,
	},
}

impl DataError {
	/// The collection that failed to load.
	pub fn collection(&self) -> EntityType {
		match self {
			DataError::Fetch { collection, .. } => *collection,
		}
	}
}

/// A reference field that could not be turned into a link.
///
/// Always recovered from locally: the reference is treated as absent.
#[derive(Clone, Debug, Error, PartialEq)]
#[error("{entity}: field `{field}` {reason}")]
pub struct MalformedReference {
	/// The record holding the reference.
	pub entity: EntityKey,
	/// Name of the reference field.
	pub field: &'static str,
	/// What was wrong with it.
	pub reason: String,
}
