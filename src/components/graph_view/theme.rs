//! Visual theming for the graph view.
//!
//! Provides per-type color palettes and the styles of the background, edges,
//! nodes and overlays.

use crate::data::EntityType;

/// RGBA color representation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Color {
	/// Red channel.
	pub r: u8,
	/// Green channel.
	pub g: u8,
	/// Blue channel.
	pub b: u8,
	/// Opacity, `0.0..=1.0`.
	pub a: f64,
}

impl Color {
	/// Opaque color.
	pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
		Self { r, g, b, a: 1.0 }
	}

	/// Color with opacity `a`.
	pub const fn rgba(r: u8, g: u8, b: u8, a: f64) -> Self {
		Self { r, g, b, a }
	}

	/// Same color with opacity `a`.
	pub fn with_alpha(self, a: f64) -> Self {
		Self { a, ..self }
	}

	/// Lighten the color by a factor (0.0 = unchanged, 1.0 = white)
	pub fn lighten(self, factor: f64) -> Self {
		let f = factor.clamp(0.0, 1.0);
		Self {
			r: (self.r as f64 + (255.0 - self.r as f64) * f) as u8,
			g: (self.g as f64 + (255.0 - self.g as f64) * f) as u8,
			b: (self.b as f64 + (255.0 - self.b as f64) * f) as u8,
			a: self.a,
		}
	}

	/// Darken the color by a factor (0.0 = unchanged, 1.0 = black)
	pub fn darken(self, factor: f64) -> Self {
		let f = 1.0 - factor.clamp(0.0, 1.0);
		Self {
			r: (self.r as f64 * f) as u8,
			g: (self.g as f64 * f) as u8,
			b: (self.b as f64 * f) as u8,
			a: self.a,
		}
	}

	/// CSS color string: hex when opaque, `rgba()` otherwise.
	pub fn to_css(self) -> String {
		if (self.a - 1.0).abs() < 0.001 {
			format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
		} else {
			format!("rgba({}, {}, {}, {})", self.r, self.g, self.b, self.a)
		}
	}
}

/// One color per entity type, plus the root color.
#[derive(Clone, Debug)]
pub struct TypePalette {
	/// Indexed like [`EntityType::ALL`].
	pub colors: [Color; 9],
	/// Color of the hierarchy root.
	pub root: Color,
}

impl TypePalette {
	/// Distinct hues, one per type (default)
	pub fn archive() -> Self {
		Self {
			colors: [
				Color::rgb(94, 129, 172),  // conferences: steel blue
				Color::rgb(191, 120, 96),  // people: terracotta
				Color::rgb(119, 158, 120), // keywords: sage
				Color::rgb(180, 150, 90),  // citations: ochre
				Color::rgb(140, 120, 170), // bibliography: wisteria
				Color::rgb(100, 148, 160), // mediagraphy: teal gray
				Color::rgb(170, 110, 140), // institutions: mauve
				Color::rgb(150, 140, 120), // institution kinds: taupe
				Color::rgb(110, 125, 155), // collections: storm
			],
			root: Color::rgb(220, 224, 230),
		}
	}

	/// Low-contrast variant for dense graphs
	pub fn muted() -> Self {
		let mut palette = Self::archive();
		for color in &mut palette.colors {
			*color = color.darken(0.15).lighten(0.1);
		}
		palette.root = Color::rgb(190, 195, 205);
		palette
	}

	/// Color of a type; `None` is the root.
	pub fn color_for(&self, entity_type: Option<EntityType>) -> Color {
		match entity_type {
			None => self.root,
			Some(ty) => {
				let i = EntityType::ALL.iter().position(|t| *t == ty).unwrap_or(0);
				self.colors[i]
			}
		}
	}
}

/// Background style configuration.
#[derive(Clone, Debug)]
pub struct BackgroundStyle {
	/// Primary background color
	pub color: Color,
	/// Secondary color for gradients
	pub color_secondary: Color,
	/// Whether to use radial gradient
	pub use_gradient: bool,
	/// Vignette intensity (0.0 = none, 1.0 = strong)
	pub vignette: f64,
}

/// Edge visual style.
#[derive(Clone, Debug)]
pub struct EdgeStyle {
	/// Edge color when neither endpoint is primary
	pub color: Color,
	/// Opacity of edges that inherit the primary endpoint's color
	pub primary_alpha: f64,
}

/// Node visual style.
#[derive(Clone, Debug)]
pub struct NodeStyle {
	/// Whether nodes have inner gradients
	pub use_gradient: bool,
	/// Border/stroke width (0 = no border)
	pub border_width: f64,
	/// Node outline color.
	pub border_color: Color,
	/// Ring drawn around collapsed group nodes
	pub group_ring: Color,
	/// Label color
	pub label_color: Color,
}

/// Tooltip and status overlay style.
#[derive(Clone, Debug)]
pub struct OverlayStyle {
	/// Message panel fill.
	pub panel: Color,
	/// Message headline color.
	pub text: Color,
	/// Secondary text color.
	pub muted_text: Color,
	/// Placeholder circles shown while loading
	pub skeleton: Color,
	/// Accent for failure messages.
	pub error: Color,
	/// Font family of overlay and label text.
	pub font: &'static str,
}

/// Complete visual theme.
#[derive(Clone, Debug)]
pub struct Theme {
	/// Name used to select the theme in the configuration.
	pub name: &'static str,
	/// Canvas background.
	pub background: BackgroundStyle,
	/// Edge strokes.
	pub edge: EdgeStyle,
	/// Node fills, borders and labels.
	pub node: NodeStyle,
	/// Tooltip, loading and message overlays.
	pub overlay: OverlayStyle,
	/// Per-type node colors.
	pub palette: TypePalette,
}

impl Theme {
	/// Clean dark theme (default)
	pub fn default_theme() -> Self {
		Self {
			name: "default",
			background: BackgroundStyle {
				color: Color::rgb(22, 27, 34),
				color_secondary: Color::rgb(30, 35, 42),
				use_gradient: true,
				vignette: 0.15,
			},
			edge: EdgeStyle {
				color: Color::rgba(140, 160, 180, 0.5),
				primary_alpha: 0.6,
			},
			node: NodeStyle {
				use_gradient: true,
				border_width: 0.0,
				border_color: Color::rgba(255, 255, 255, 0.0),
				group_ring: Color::rgba(255, 255, 255, 0.6),
				label_color: Color::rgba(255, 255, 255, 0.85),
			},
			overlay: OverlayStyle {
				panel: Color::rgba(14, 17, 22, 0.9),
				text: Color::rgb(230, 233, 238),
				muted_text: Color::rgb(150, 158, 170),
				skeleton: Color::rgba(140, 160, 180, 0.25),
				error: Color::rgb(224, 108, 117),
				font: "sans-serif",
			},
			palette: TypePalette::archive(),
		}
	}

	/// Darker, lower contrast theme
	pub fn midnight() -> Self {
		Self {
			name: "midnight",
			background: BackgroundStyle {
				color: Color::rgb(18, 20, 28),
				color_secondary: Color::rgb(25, 28, 38),
				use_gradient: true,
				vignette: 0.2,
			},
			edge: EdgeStyle {
				color: Color::rgba(100, 120, 150, 0.45),
				primary_alpha: 0.5,
			},
			node: NodeStyle {
				use_gradient: true,
				border_width: 1.0,
				border_color: Color::rgba(255, 255, 255, 0.15),
				group_ring: Color::rgba(200, 210, 230, 0.5),
				label_color: Color::rgba(220, 225, 235, 0.8),
			},
			overlay: OverlayStyle {
				panel: Color::rgba(10, 12, 18, 0.92),
				text: Color::rgb(215, 220, 230),
				muted_text: Color::rgb(130, 138, 150),
				skeleton: Color::rgba(100, 120, 150, 0.25),
				error: Color::rgb(210, 100, 110),
				font: "sans-serif",
			},
			palette: TypePalette::muted(),
		}
	}

	/// Flat theme without gradients
	pub fn minimal() -> Self {
		Self {
			name: "minimal",
			background: BackgroundStyle {
				color: Color::rgb(25, 28, 35),
				color_secondary: Color::rgb(25, 28, 35),
				use_gradient: false,
				vignette: 0.0,
			},
			edge: EdgeStyle {
				color: Color::rgba(130, 145, 165, 0.4),
				primary_alpha: 0.5,
			},
			node: NodeStyle {
				use_gradient: false,
				..Self::default_theme().node
			},
			overlay: Self::default_theme().overlay,
			palette: TypePalette::archive(),
		}
	}

	/// Looks a theme up by name, falling back to the default.
	pub fn by_name(name: &str) -> Self {
		match name {
			"midnight" => Self::midnight(),
			"minimal" => Self::minimal(),
			_ => Self::default_theme(),
		}
	}
}

impl Default for Theme {
	fn default() -> Self {
		Self::default_theme()
	}
}
