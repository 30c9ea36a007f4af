//! Interactive graph view.
//!
//! Renders a [`GraphData`](crate::graph::GraphData) on an HTML canvas with:
//! - Deterministic radial tree placement for the type hierarchy
//! - Force-directed placement for neighborhoods, stepped once per frame
//! - Pan, zoom, node dragging (pinning) and click-to-navigate
//! - Hover highlighting with tooltips
//! - Loading, failure and empty-state overlays
//!
//! # Example
//!
//! ```ignore
//! let payload = RwSignal::new(GraphPayload::Ready(graph));
//! view! {
//!     <ForceGraphCanvas
//!         data=payload
//!         on_navigate=move |to: NavigateTo| log::info!("open {}", to.title)
//!         on_toggle_group=move |ty: EntityType| log::info!("toggle {ty}")
//!         fullscreen=true
//!     />
//! }
//! ```

mod component;
mod highlight;
pub mod radial;
mod render;
pub mod scale;
pub mod state;
pub mod theme;

pub use component::ForceGraphCanvas;
pub use scale::{NodeSizing, ScaleConfig};
pub use state::{GraphPayload, GraphState, LayoutPhase, NavigateTo, SimulationConfig, ViewSettings};
pub use theme::Theme;
