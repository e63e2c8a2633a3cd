//! Colors and visual style for the graph canvas.

use std::collections::HashMap;

/// RGBA color.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Color {
	/// Red.
	pub r: u8,
	/// Green.
	pub g: u8,
	/// Blue.
	pub b: u8,
	/// Alpha, 0.0 to 1.0.
	pub a: f64,
}

impl Color {
	/// Opaque color.
	pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
		Self { r, g, b, a: 1.0 }
	}

	/// Color with alpha.
	pub const fn rgba(r: u8, g: u8, b: u8, a: f64) -> Self {
		Self { r, g, b, a }
	}

	/// Same color, different alpha.
	pub fn with_alpha(self, a: f64) -> Self {
		Self { a, ..self }
	}

	/// Mix toward white (0.0 = unchanged, 1.0 = white).
	pub fn lighten(self, factor: f64) -> Self {
		self.mix(Color::rgba(255, 255, 255, self.a), factor)
	}

	/// Mix toward black (0.0 = unchanged, 1.0 = black).
	pub fn darken(self, factor: f64) -> Self {
		self.mix(Color::rgba(0, 0, 0, self.a), factor)
	}

	fn mix(self, other: Color, t: f64) -> Self {
		let t = t.clamp(0.0, 1.0);
		let channel = |a: u8, b: u8| (a as f64 + (b as f64 - a as f64) * t).round() as u8;
		Self {
			r: channel(self.r, other.r),
			g: channel(self.g, other.g),
			b: channel(self.b, other.b),
			a: self.a + (other.a - self.a) * t,
		}
	}

	/// Hex when opaque, `rgba()` otherwise.
	pub fn to_css(self) -> String {
		if (self.a - 1.0).abs() < 0.001 {
			format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
		} else {
			format!("rgba({}, {}, {}, {})", self.r, self.g, self.b, self.a)
		}
	}

	/// Parse `#rrggbb`, `#rgb`, `rgb()` or `rgba()`.
	pub fn parse(css: &str) -> Option<Self> {
		let css = css.trim();
		if let Some(hex) = css.strip_prefix('#') {
			let digit = |i: usize, len: usize| u8::from_str_radix(hex.get(i..i + len)?, 16).ok();
			return match hex.len() {
				6 => Some(Color::rgb(digit(0, 2)?, digit(2, 2)?, digit(4, 2)?)),
				3 => Some(Color::rgb(
					digit(0, 1)? * 17,
					digit(1, 1)? * 17,
					digit(2, 1)? * 17,
				)),
				_ => None,
			};
		}
		let inner = css
			.strip_prefix("rgba(")
			.or_else(|| css.strip_prefix("rgb("))?
			.strip_suffix(')')?;
		let parts: Vec<&str> = inner.split(',').map(str::trim).collect();
		let channel = |i: usize| parts.get(i)?.parse::<u8>().ok();
		let alpha = match parts.get(3) {
			Some(a) => a.parse().ok()?,
			None => 1.0,
		};
		Some(Color::rgba(channel(0)?, channel(1)?, channel(2)?, alpha))
	}
}

/// Visual style for the canvas.
#[derive(Clone, Debug)]
pub struct Theme {
	/// Canvas fill.
	pub background: Color,
	/// Edge stroke.
	pub edge: Color,
	/// Edge stroke while one endpoint is hovered.
	pub edge_highlight: Color,
	/// Node outline.
	pub node_border: Color,
	/// Label text.
	pub label: Color,
	/// Text shown when there is no graph.
	pub placeholder: Color,
	/// Category colors, assigned in order of first appearance.
	pub palette: Vec<Color>,
	/// Nodes without a category.
	pub uncategorized: Color,
	/// Fixed colors for well-known categories.
	pub known: HashMap<&'static str, Color>,
}

impl Theme {
	/// Color for the `index`-th distinct category.
	pub fn category(&self, index: usize) -> Color {
		self.palette
			.get(index % self.palette.len().max(1))
			.copied()
			.unwrap_or(self.uncategorized)
	}
}

impl Default for Theme {
	fn default() -> Self {
		let known = [
			("building", Color::rgb(94, 129, 172)),
			("massing", Color::rgb(94, 129, 172)),
			("road", Color::rgb(143, 143, 143)),
			("street", Color::rgb(143, 143, 143)),
			("green", Color::rgb(110, 160, 110)),
			("park", Color::rgb(110, 160, 110)),
			("water", Color::rgb(80, 130, 170)),
			("program", Color::rgb(190, 150, 100)),
			("plot", Color::rgb(170, 120, 150)),
		]
		.into_iter()
		.collect();

		Self {
			background: Color::rgb(22, 27, 34),
			edge: Color::rgba(140, 160, 180, 0.45),
			edge_highlight: Color::rgba(220, 230, 240, 0.9),
			node_border: Color::rgba(255, 255, 255, 0.25),
			label: Color::rgba(255, 255, 255, 0.85),
			placeholder: Color::rgba(200, 210, 220, 0.6),
			palette: vec![
				Color::rgb(129, 161, 193),
				Color::rgb(180, 136, 100),
				Color::rgb(100, 148, 160),
				Color::rgb(200, 180, 190),
				Color::rgb(190, 200, 180),
				Color::rgb(160, 125, 100),
				Color::rgb(136, 160, 175),
				Color::rgb(205, 195, 180),
			],
			uncategorized: Color::rgb(120, 130, 140),
			known,
		}
	}
}
