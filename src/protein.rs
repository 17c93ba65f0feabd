//! Translation of genes into drawable polygons.

use std::fmt;

use crate::genome::Gene;

/// Amino-acid counts outside this range are translated but never drawn.
pub const PROTEIN_LEN: std::ops::RangeInclusive<usize> = 9..=21;

/// Offsets are stored biased so that codon values `0..64` cover `-32..32` pixels.
const OFFSET_BIAS: f32 = 32.0;

/// Each color component wraps at this modulus; hue is scaled by it into degrees.
const COLOR_MOD: u32 = 17;

/// A color in the HSLA space, as produced by a protein.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hsla {
	pub hue: f32,        // degrees, not normalized into 0..360
	pub saturation: f32, // percent, 0..=100
	pub lightness: f32,  // percent, 0..=100
	pub alpha: f32,      // 0..=1
}

impl Hsla {
	/// Builds the color from running nibble totals of the four components.
	pub fn from_totals(h: u32, s: u32, l: u32, a: u32) -> Self {
		let m = COLOR_MOD as f32;
		Self {
			hue: (h * COLOR_MOD) as f32,
			saturation: 100.0 - (s % COLOR_MOD) as f32 / m * 100.0,
			lightness: 100.0 - (l % COLOR_MOD) as f32 / m * 100.0,
			alpha: 1.0 - (a % COLOR_MOD) as f32 / m,
		}
	}

	/// Straight (non-premultiplied) 8-bit RGBA, following the CSS `hsl()` conversion.
	pub fn to_rgba8(self) -> [u8; 4] {
		let h = self.hue.rem_euclid(360.0) / 360.0;
		let s = (self.saturation / 100.0).clamp(0.0, 1.0);
		let l = (self.lightness / 100.0).clamp(0.0, 1.0);

		let t2 = if l <= 0.5 { l * (s + 1.0) } else { l + s - l * s };
		let t1 = l * 2.0 - t2;
		let channel = |h: f32| (hue_to_rgb(t1, t2, h) * 255.0).round() as u8;
		[
			channel(h + 1.0 / 3.0),
			channel(h),
			channel(h - 1.0 / 3.0),
			(self.alpha.clamp(0.0, 1.0) * 255.0).round() as u8,
		]
	}
}

fn hue_to_rgb(t1: f32, t2: f32, mut h: f32) -> f32 {
	if h < 0.0 {
		h += 1.0;
	}
	if h > 1.0 {
		h -= 1.0;
	}
	if h * 6.0 < 1.0 {
		t1 + (t2 - t1) * h * 6.0
	} else if h * 2.0 < 1.0 {
		t2
	} else if h * 3.0 < 2.0 {
		t1 + (t2 - t1) * (2.0 / 3.0 - h) * 6.0
	} else {
		t1
	}
}

impl fmt::Display for Hsla {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(
			f,
			"hsla({},{}%,{}%,{})",
			self.hue, self.saturation, self.lightness, self.alpha
		)
	}
}

/// The phenotype of one gene: a closed, filled polygon.
#[derive(Debug, Clone, PartialEq)]
pub struct Polygon {
	pub points: Vec<(f32, f32)>,
	pub color: Hsla,
}

impl Polygon {
	/// Translates an amino-acid sequence into a polygon on a `width`x`height` canvas.
	///
	/// `aa[0..2]` place the anchor (scaled from `0..64` onto the canvas), then every following pair is a
	/// vertex offset from the anchor. All amino acids, anchor included, contribute to the color: the low
	/// nibble of each is added to hue, saturation, lightness or alpha, picked by bits 4-5.
	/// Returns `None` when the sequence length is outside [`PROTEIN_LEN`].
	pub fn from_amino_acids(aa: &[u8], width: u32, height: u32) -> Option<Self> {
		if !PROTEIN_LEN.contains(&aa.len()) {
			return None;
		}
		let anchor_x = aa[0] as f32 / 64.0 * width as f32;
		let anchor_y = aa[1] as f32 / 64.0 * height as f32;
		let points = aa[2..]
			.chunks_exact(2)
			.map(|p| {
				(
					anchor_x + p[0] as f32 - OFFSET_BIAS,
					anchor_y + p[1] as f32 - OFFSET_BIAS,
				)
			})
			.collect();

		let mut totals = [0u32; 4];
		for &v in aa {
			totals[(v as usize / 16) % 4] += (v % 16) as u32;
		}
		let [h, s, l, a] = totals;

		Some(Polygon {
			points,
			color: Hsla::from_totals(h, s, l, a),
		})
	}
}

/// Decodes a gene into its polygon, if it has one.
pub fn decode(gene: &Gene<'_>, width: u32, height: u32) -> Option<Polygon> {
	Polygon::from_amino_acids(&gene.amino_acids(), width, height)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn hsla_primaries() {
		let red = Hsla {
			hue: 0.0,
			saturation: 100.0,
			lightness: 50.0,
			alpha: 1.0,
		};
		assert_eq!(red.to_rgba8(), [255, 0, 0, 255]);

		let green = Hsla { hue: 120.0, ..red };
		assert_eq!(green.to_rgba8(), [0, 255, 0, 255]);

		let blue = Hsla { hue: 240.0 + 360.0, ..red };
		assert_eq!(blue.to_rgba8(), [0, 0, 255, 255]);

		let white = Hsla {
			lightness: 100.0,
			alpha: 0.0,
			..red
		};
		assert_eq!(white.to_rgba8(), [255, 255, 255, 0]);
	}

	#[test]
	fn totals_wrap_at_seventeen() {
		let c = Hsla::from_totals(3, 17, 34, 0);
		assert_eq!(c.hue, 51.0);
		assert_eq!(c.saturation, 100.0);
		assert_eq!(c.lightness, 100.0);
		assert_eq!(c.alpha, 1.0);
	}
}
