//! scholar-graph: Interactive graph explorer for an academic-records archive.
//!
//! Fetches the archive's collections (conferences, people, keywords,
//! citations, ...), resolves the references between them, and renders either
//! the neighborhood of one entity or a type hierarchy of the whole archive as
//! an interactive canvas graph.

use std::rc::Rc;

use leptos::ev;
use leptos::prelude::*;
use leptos_meta::*;
use log::{Level, info};

pub mod components;
pub mod config;
pub mod data;
pub mod graph;

pub use components::graph_view::{ForceGraphCanvas, GraphPayload, NavigateTo};
pub use config::AppConfig;

use data::{EntityKey, EntityType, HttpSource, Store};
use graph::GraphRequest;

/// Initialize logging and panic hooks for the WASM target.
pub fn init_logging() {
	let _ = console_log::init_with_level(Level::Debug);
	console_error_panic_hook::set_once();
	info!("scholar-graph: logging initialized");
}

/// The view a location hash asks for: `#type:id` focuses an entity, anything
/// else shows the overview.
pub fn request_from_hash(hash: &str) -> GraphRequest {
	match EntityKey::parse(hash.trim_start_matches('#')) {
		Some(focal) => GraphRequest::Focus { focal },
		None => GraphRequest::default(),
	}
}

/// Expands a collapsed group or collapses an expanded one. Focus requests
/// are left alone.
pub fn toggle_group(request: &mut GraphRequest, entity_type: EntityType) {
	if let GraphRequest::Overview { expanded } = request {
		match expanded.iter().position(|t| *t == entity_type) {
			Some(i) => {
				expanded.remove(i);
			}
			None => expanded.push(entity_type),
		}
	}
}

fn location_hash() -> String {
	web_sys::window()
		.and_then(|w| w.location().hash().ok())
		.unwrap_or_default()
}

fn set_location_hash(hash: &str) {
	if let Some(window) = web_sys::window() {
		let _ = window.location().set_hash(hash);
	}
}

fn page_url() -> String {
	web_sys::window()
		.and_then(|w| w.location().href().ok())
		.unwrap_or_default()
}

/// Main application component.
///
/// Reads the configuration from the DOM, loads the archive and renders the
/// graph for the entity named in the location hash (or the overview).
#[component]
pub fn App() -> impl IntoView {
	provide_meta_context();

	let config = AppConfig::load();
	let source = HttpSource::new(&config.resolve_base_url(&page_url())).with_timeout(config.api.timeout_ms);
	let store = Rc::new(Store::new(source).with_page_size(config.api.page_size));
	let options = config.assemble_options();

	let request = RwSignal::new(request_from_hash(&location_hash()));
	let reload = RwSignal::new(0u32);
	let payload = RwSignal::new(GraphPayload::Loading);
	let missing = RwSignal::new(Vec::<EntityType>::new());

	let store_fetch = store.clone();
	let built = LocalResource::new(move || {
		let store = store_fetch.clone();
		let request = request.get();
		reload.track();
		// Whatever the previous run still fetches is no longer needed.
		store.abort_pending();
		async move { graph::assemble(&*store, &request, options).await }
	});

	Effect::new(move |_| {
		let next = match built.get() {
			None => return,
			Some(Ok(assembled)) => {
				missing.set(assembled.missing);
				GraphPayload::Ready(assembled.graph)
			}
			Some(Err(e)) => {
				missing.set(Vec::new());
				GraphPayload::Failed(e.to_string())
			}
		};
		payload.set(next);
	});

	let _hash_listener = window_event_listener(ev::hashchange, move |_| {
		payload.set(GraphPayload::Loading);
		request.set(request_from_hash(&location_hash()));
	});

	let on_navigate = Callback::new(move |to: NavigateTo| {
		info!("scholar-graph: focusing {} ({}:{})", to.title, to.entity_type, to.id);
		set_location_hash(&format!("{}:{}", to.entity_type, to.id));
	});
	let on_toggle_group = Callback::new(move |entity_type: EntityType| {
		request.update(|r| toggle_group(r, entity_type));
	});

	let store_retry = store.clone();
	let on_retry = move |_: ev::MouseEvent| {
		info!("scholar-graph: retrying, dropping cached collections");
		store_retry.invalidate(None);
		payload.set(GraphPayload::Loading);
		reload.update(|n| *n += 1);
	};
	let on_overview = move |_: ev::MouseEvent| set_location_hash("");

	let failed = move || matches!(payload.get(), GraphPayload::Failed(_));
	let focused = move || matches!(request.get(), GraphRequest::Focus { .. });
	let missing_text = move || {
		let names: Vec<&str> = missing.get().iter().map(|t| t.label()).collect();
		if names.is_empty() {
			String::new()
		} else {
			format!("Not loaded: {}", names.join(", "))
		}
	};

	view! {
		<Html attr:lang="en" attr:dir="ltr" attr:data-theme="dark" />
		<Title text="Archive Graph" />
		<Meta charset="UTF-8" />
		<Meta name="viewport" content="width=device-width, initial-scale=1.0" />

		<div class="fullscreen-graph">
			<ForceGraphCanvas
				data=payload
				on_navigate=on_navigate
				on_toggle_group=on_toggle_group
				settings=config.view_settings()
				fullscreen=true
			/>
			<div class="graph-overlay">
				<h1>"Archive"</h1>
				<p class="subtitle">"Click a node to open it. Drag nodes to pin them. Scroll to zoom."</p>
				<p class="missing">{missing_text}</p>
				<button
					class="overview"
					on:click=on_overview
					style:display=move || if focused() { "inline-block" } else { "none" }
				>
					"Back to overview"
				</button>
				<button
					class="retry"
					on:click=on_retry
					style:display=move || if failed() { "inline-block" } else { "none" }
				>
					"Retry"
				</button>
			</div>
		</div>
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn hash_routes_to_focus_or_overview() {
		assert_eq!(
			request_from_hash("#actant:3"),
			GraphRequest::Focus {
				focal: EntityKey::new(EntityType::Actant, "3"),
			}
		);
		assert_eq!(request_from_hash(""), GraphRequest::default());
		assert_eq!(request_from_hash("#"), GraphRequest::default());
		assert_eq!(request_from_hash("#nonsense"), GraphRequest::default());
	}

	#[test]
	fn toggling_a_group_twice_restores_the_request() {
		let mut request = GraphRequest::default();
		toggle_group(&mut request, EntityType::Keyword);
		toggle_group(&mut request, EntityType::Actant);
		assert_eq!(
			request,
			GraphRequest::Overview {
				expanded: vec![EntityType::Keyword, EntityType::Actant],
			}
		);
		toggle_group(&mut request, EntityType::Keyword);
		toggle_group(&mut request, EntityType::Actant);
		assert_eq!(request, GraphRequest::default());

		let mut focus = request_from_hash("#keyword:20");
		toggle_group(&mut focus, EntityType::Keyword);
		assert_eq!(focus, request_from_hash("#keyword:20"));
	}
}
