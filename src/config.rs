//! Runtime configuration, read from the host page.
//!
//! The page embeds a JSON object in
//! `<script type="application/json" id="graph-config">`. Every field is
//! optional; anything missing takes its default.

use log::{info, warn};
use serde::Deserialize;
use url::Url;
use wasm_bindgen::JsCast;
use web_sys::HtmlScriptElement;

use crate::components::graph_view::{NodeSizing, ScaleConfig, SimulationConfig, Theme, ViewSettings};
use crate::data::store::DEFAULT_PAGE_SIZE;
use crate::data::source::DEFAULT_TIMEOUT_MS;
use crate::graph::{AssembleOptions, DEFAULT_GROUP_CAP, LayoutKind};

/// Id of the script element holding the configuration.
pub const CONFIG_ELEMENT_ID: &str = "graph-config";

/// Remote collection API settings.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct ApiConfig {
	/// Absolute, or relative to the page URL.
	pub base_url: String,
	/// Records requested per page.
	pub page_size: usize,
	/// Per-request timeout in milliseconds.
	pub timeout_ms: u32,
}

impl Default for ApiConfig {
	fn default() -> Self {
		Self {
			base_url: "/api/archive".to_string(),
			page_size: DEFAULT_PAGE_SIZE,
			timeout_ms: DEFAULT_TIMEOUT_MS,
		}
	}
}

/// Type hierarchy view settings.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct HierarchyConfig {
	/// Instances shown per expanded group.
	pub group_cap: usize,
	/// Layout of the overview graph.
	pub layout: LayoutKind,
}

impl Default for HierarchyConfig {
	fn default() -> Self {
		Self {
			group_cap: DEFAULT_GROUP_CAP,
			layout: LayoutKind::Radial,
		}
	}
}

/// Everything configurable from the host page.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppConfig {
	/// Where and how to fetch collections.
	pub api: ApiConfig,
	/// Overview settings.
	pub hierarchy: HierarchyConfig,
	/// Force layout tuning.
	pub simulation: SimulationConfig,
	/// How node size follows link counts.
	pub sizing: NodeSizing,
	/// Theme name: `default`, `midnight` or `minimal`.
	pub theme: String,
}

impl Default for AppConfig {
	fn default() -> Self {
		Self {
			api: ApiConfig::default(),
			hierarchy: HierarchyConfig::default(),
			simulation: SimulationConfig::default(),
			sizing: NodeSizing::default(),
			theme: "default".to_string(),
		}
	}
}

impl AppConfig {
	/// Parses a configuration object; missing fields take their defaults.
	pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
		serde_json::from_str(text)
	}

	/// Reads the configuration from the page, falling back to defaults when
	/// the element is missing or holds invalid JSON.
	pub fn load() -> Self {
		let Some(text) = config_text() else {
			info!("scholar-graph: no #{CONFIG_ELEMENT_ID} element, using default configuration");
			return Self::default();
		};
		match Self::from_json(&text) {
			Ok(config) => config,
			Err(e) => {
				warn!("scholar-graph: invalid configuration, using defaults: {e}");
				Self::default()
			}
		}
	}

	/// The API base URL resolved against the page URL.
	pub fn resolve_base_url(&self, page_url: &str) -> String {
		match Url::parse(page_url).and_then(|page| page.join(&self.api.base_url)) {
			Ok(url) => url.to_string(),
			Err(_) => self.api.base_url.clone(),
		}
	}

	/// Options for building graphs.
	pub fn assemble_options(&self) -> AssembleOptions {
		AssembleOptions {
			group_cap: self.hierarchy.group_cap,
			hierarchy_layout: self.hierarchy.layout,
		}
	}

	/// Settings for the graph view.
	pub fn view_settings(&self) -> ViewSettings {
		ViewSettings {
			theme: Theme::by_name(&self.theme),
			scale: ScaleConfig {
				sizing: self.sizing.clone(),
				..ScaleConfig::default()
			},
			simulation: self.simulation.clone(),
		}
	}
}

fn config_text() -> Option<String> {
	let document = web_sys::window()?.document()?;
	let element = document.get_element_by_id(CONFIG_ELEMENT_ID)?;
	let script: HtmlScriptElement = element.dyn_into().ok()?;
	script.text().ok()
}
