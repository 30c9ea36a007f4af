//! Zoom-dependent scaling and count-dependent sizing of graph visuals.
//!
//! # Coordinate Spaces
//!
//! - **World-space**: The coordinate system of the graph. Values in world-space
//!   scale proportionally with zoom (appear larger when zoomed in).
//! - **Screen-space**: Pixel coordinates on the canvas. Values in screen-space
//!   remain constant regardless of zoom level.
//!
//! Node sizes additionally grow with the number of links or children a node
//! has, see [`NodeSizing`].

use serde::Deserialize;

/// Defines how a visual property scales with zoom level.
#[derive(Clone, Debug)]
pub enum ScaleBehavior {
	/// Constant screen-space size (pixels). Unaffected by zoom.
	Screen,
	/// World-space scaling, clamped to min/max screen-space bounds.
	Clamped {
		/// Smallest on-screen size in pixels.
		min_screen: f64,
		/// Largest on-screen size in pixels.
		max_screen: f64,
	},
}

impl ScaleBehavior {
	/// Compute the world-space value for a given base value and zoom level.
	pub fn apply(&self, base: f64, k: f64) -> f64 {
		match self {
			ScaleBehavior::Screen => base / k,
			ScaleBehavior::Clamped {
				min_screen,
				max_screen,
			} => base.clamp(min_screen / k, max_screen / k),
		}
	}
}

/// Label opacity as a function of zoom: hidden below `zero_alpha_k`, fully
/// visible from `full_alpha_k`.
#[derive(Clone, Debug)]
pub struct LabelFade {
	/// Zoom at and below which labels are hidden.
	pub zero_alpha_k: f64,
	/// Zoom from which labels are fully opaque.
	pub full_alpha_k: f64,
}

impl LabelFade {
	/// Label opacity at zoom `k`.
	pub fn alpha(&self, k: f64) -> f64 {
		if self.zero_alpha_k >= self.full_alpha_k {
			return 1.0;
		}
		((k - self.zero_alpha_k) / (self.full_alpha_k - self.zero_alpha_k)).clamp(0.0, 1.0)
	}
}

/// Visual size multiplier derived from a node's link or child count.
///
/// `size = base + log_factor * ln(count + 1)`, clamped to `max`, so hubs are
/// drawn larger without dwarfing everything else.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct NodeSizing {
	/// Size of a node without links.
	pub base: f64,
	/// Growth per natural log of the count.
	pub log_factor: f64,
	/// Upper bound of the size.
	pub max: f64,
}

impl Default for NodeSizing {
	fn default() -> Self {
		Self {
			base: 1.0,
			log_factor: 0.45,
			max: 3.0,
		}
	}
}

impl NodeSizing {
	/// Size multiplier for a node with `count` links or children.
	pub fn size_for(&self, count: usize) -> f64 {
		(self.base + self.log_factor * (count as f64 + 1.0).ln()).min(self.max)
	}
}

/// Configuration for node visual scaling.
#[derive(Clone, Debug)]
pub struct NodeScaleConfig {
	/// Base node radius in world units.
	pub radius: f64,
	/// How the node radius scales with zoom.
	pub radius_behavior: ScaleBehavior,
	/// Hit detection radius in world units.
	pub hit_radius: f64,
	/// How hit radius scales with zoom.
	pub hit_behavior: ScaleBehavior,
	/// Label font size in screen pixels.
	pub label_size: f64,
	/// Minimum zoom level for label font scaling.
	pub label_min_k: f64,
	/// Fade of non-primary labels when zooming out.
	pub label_fade: LabelFade,
}

/// Configuration for edge and hover ring widths.
#[derive(Clone, Debug)]
pub struct StrokeScaleConfig {
	/// Edge line width in screen pixels.
	pub edge_width: f64,
	/// How edge width scales with zoom.
	pub edge_behavior: ScaleBehavior,
	/// Hover ring width in screen pixels.
	pub ring_width: f64,
	/// Ring offset from node edge in screen pixels.
	pub ring_offset: f64,
}

/// Complete scale configuration for all graph elements.
#[derive(Clone, Debug)]
pub struct ScaleConfig {
	/// Node radii and labels.
	pub node: NodeScaleConfig,
	/// Edge and ring widths.
	pub stroke: StrokeScaleConfig,
	/// Count-dependent node size.
	pub sizing: NodeSizing,
}

impl Default for ScaleConfig {
	fn default() -> Self {
		Self {
			node: NodeScaleConfig {
				radius: 6.0,
				radius_behavior: ScaleBehavior::Clamped {
					min_screen: 4.0,
					max_screen: f64::INFINITY,
				},
				hit_radius: 10.0,
				hit_behavior: ScaleBehavior::Clamped {
					min_screen: 6.0,
					max_screen: f64::INFINITY,
				},
				label_size: 11.0,
				label_min_k: 0.5,
				label_fade: LabelFade {
					zero_alpha_k: 0.35,
					full_alpha_k: 0.8,
				},
			},
			stroke: StrokeScaleConfig {
				edge_width: 1.2,
				edge_behavior: ScaleBehavior::Screen,
				ring_width: 1.5,
				ring_offset: 2.0,
			},
			sizing: NodeSizing::default(),
		}
	}
}

/// Pre-computed scale values for a specific zoom level.
///
/// Create this once per frame and pass it to rendering functions.
/// All sizes are in world-space (ready to use after canvas transform).
#[derive(Clone, Debug)]
pub struct ScaledValues {
	/// Zoom level the values were computed for.
	pub k: f64,
	/// Radius of a node of size 1.
	pub node_radius: f64,
	/// Pointer hit radius of a node of size 1.
	pub hit_radius: f64,
	/// Label font string (e.g., "11px sans-serif").
	pub label_font: String,
	/// Opacity of non-primary labels.
	pub label_alpha: f64,
	/// Edge line width.
	pub edge_width: f64,
	/// Hover ring width.
	pub ring_width: f64,
	/// Gap between a node and its hover ring.
	pub ring_offset: f64,
}

impl ScaledValues {
	/// Resolves `config` at zoom `k`.
	pub fn new(config: &ScaleConfig, k: f64) -> Self {
		let label_font_size = config.node.label_size / k.max(config.node.label_min_k);
		Self {
			k,
			node_radius: config.node.radius_behavior.apply(config.node.radius, k),
			hit_radius: config.node.hit_behavior.apply(config.node.hit_radius, k),
			label_font: format!("{label_font_size}px sans-serif"),
			label_alpha: config.node.label_fade.alpha(k),
			edge_width: config.stroke.edge_behavior.apply(config.stroke.edge_width, k),
			ring_width: config.stroke.ring_width / k,
			ring_offset: config.stroke.ring_offset / k,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn sizing_grows_with_count_and_is_clamped() {
		let sizing = NodeSizing::default();
		assert_eq!(sizing.size_for(0), 1.0);
		let mut last = 0.0;
		for count in [0, 1, 2, 5, 10, 50] {
			let size = sizing.size_for(count);
			assert!(size >= last);
			last = size;
		}
		assert_eq!(sizing.size_for(1_000_000), sizing.max);
	}

	#[test]
	fn clamped_radius_keeps_a_minimum_screen_size() {
		let behavior = ScaleBehavior::Clamped {
			min_screen: 4.0,
			max_screen: f64::INFINITY,
		};
		// Zoomed far out, the world radius grows so the screen radius stays 4px.
		assert_eq!(behavior.apply(6.0, 0.5), 8.0);
		assert_eq!(behavior.apply(6.0, 2.0), 6.0);
		assert_eq!(ScaleBehavior::Screen.apply(2.0, 4.0), 0.5);
	}

	#[test]
	fn labels_fade_out_when_zoomed_out() {
		let fade = LabelFade {
			zero_alpha_k: 0.4,
			full_alpha_k: 0.8,
		};
		assert_eq!(fade.alpha(0.2), 0.0);
		assert_eq!(fade.alpha(1.0), 1.0);
		assert!((fade.alpha(0.6) - 0.5).abs() < 1e-9);
	}
}
