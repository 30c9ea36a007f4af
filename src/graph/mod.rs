//! Graph assembly: turns a [`GraphRequest`] into renderable [`GraphData`].

pub mod builder;
pub mod types;

use log::warn;

use crate::data::{CollectionCache, CollectionSource, DataError, EntityType, Store};

pub use builder::{DEFAULT_GROUP_CAP, ROOT_ID, group_id, hierarchy, neighborhood};
pub use types::{GraphData, GraphLink, GraphNode, GraphRequest, LayoutKind, NodeKind};

/// Tuning for the hierarchy view.
#[derive(Clone, Copy, Debug)]
pub struct AssembleOptions {
	/// Instances shown per expanded group.
	pub group_cap: usize,
	/// Layout of the overview graph.
	pub hierarchy_layout: LayoutKind,
}

impl Default for AssembleOptions {
	fn default() -> Self {
		Self {
			group_cap: DEFAULT_GROUP_CAP,
			hierarchy_layout: LayoutKind::Radial,
		}
	}
}

/// A built graph plus the collections that could not be loaded for it.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Assembled {
	/// The graph to render.
	pub graph: GraphData,
	/// Collections that failed to load and are absent from `graph`.
	pub missing: Vec<EntityType>,
}

/// Loads every collection and builds the requested graph from whatever
/// loaded. Fails only when nothing could be loaded at all.
///
/// A focus request on an entity that is not in the catalog falls back to the
/// overview.
pub async fn assemble<S, C>(
	store: &Store<S, C>,
	request: &GraphRequest,
	options: AssembleOptions,
) -> Result<Assembled, DataError>
where
	S: CollectionSource,
	C: CollectionCache,
{
	let report = store.load_all().await;
	if report.is_partial() {
		warn!(
			"scholar-graph: {} collections failed to load, building from the rest",
			report.failures.len()
		);
	}
	if !report.degraded.is_empty() {
		warn!(
			"scholar-graph: showing {} degraded collections, they are refetched next time",
			report.degraded.len()
		);
	}
	if report.catalog.is_empty() {
		if let Some(first) = report.failures.first() {
			return Err(first.clone());
		}
	}

	let index = store.link_index(&report.catalog);
	let overview = |expanded: &[EntityType]| {
		hierarchy(
			&report.catalog,
			&index,
			expanded,
			options.group_cap,
			options.hierarchy_layout,
		)
	};

	let graph = match request {
		GraphRequest::Overview { expanded } => overview(expanded),
		GraphRequest::Focus { focal } => match neighborhood(&report.catalog, &index, focal) {
			Some(graph) => graph,
			None => {
				warn!("scholar-graph: {focal} is not in the archive, showing the overview");
				overview(&[])
			}
		},
	};

	Ok(Assembled {
		graph,
		missing: report.failures.iter().map(DataError::collection).collect(),
	})
}
