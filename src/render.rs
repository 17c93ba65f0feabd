//! Drawing genomes onto raster surfaces.

use tiny_skia as sk;

use crate::{
	fitness::Raster,
	genome::Dna,
	protein::{self, Polygon},
};

/// A raster drawing target. The engine only ever clears it, fills polygons and reads pixels back.
pub trait RenderSurface {
	fn width(&self) -> u32;
	fn height(&self) -> u32;

	/// Reset every pixel to transparent black.
	fn clear(&mut self);

	/// Fill a closed polygon, compositing source-over what is already drawn.
	fn fill_polygon(&mut self, poly: &Polygon);

	/// Read the whole surface back as straight RGBA.
	fn read_pixels(&self) -> Raster;
}

/// CPU surface backed by a tiny-skia pixmap.
pub struct SkiaSurface {
	pix: sk::Pixmap,
	anti_alias: bool,
}

impl SkiaSurface {
	/// Panics on a zero-sized canvas.
	pub fn new(width: u32, height: u32) -> Self {
		let pix = sk::Pixmap::new(width, height).expect("canvas size must be non-zero");
		Self {
			pix,
			anti_alias: true,
		}
	}

	pub fn with_anti_alias(mut self, anti_alias: bool) -> Self {
		self.anti_alias = anti_alias;
		self
	}
}

impl RenderSurface for SkiaSurface {
	fn width(&self) -> u32 {
		self.pix.width()
	}

	fn height(&self) -> u32 {
		self.pix.height()
	}

	fn clear(&mut self) {
		self.pix.fill(sk::Color::TRANSPARENT);
	}

	fn fill_polygon(&mut self, poly: &Polygon) {
		let Some((first, rest)) = poly.points.split_first() else {
			return;
		};
		let mut pb = sk::PathBuilder::new();
		pb.move_to(first.0, first.1);
		for &(x, y) in rest {
			pb.line_to(x, y);
		}
		pb.close();
		// degenerate paths (all points collinear on an axis, etc.) cover no pixels
		let Some(path) = pb.finish() else {
			log::trace!("skipping degenerate polygon {:?}", poly.points);
			return;
		};

		let [r, g, b, a] = poly.color.to_rgba8();
		let mut paint = sk::Paint::default();
		paint.set_color_rgba8(r, g, b, a);
		paint.anti_alias = self.anti_alias;
		self.pix.fill_path(
			&path,
			&paint,
			sk::FillRule::Winding,
			sk::Transform::identity(),
			None,
		);
	}

	fn read_pixels(&self) -> Raster {
		let data = self
			.pix
			.pixels()
			.iter()
			.flat_map(|p| {
				let c = p.demultiply();
				[c.red(), c.green(), c.blue(), c.alpha()]
			})
			.collect();
		Raster::from_rgba(self.width(), self.height(), data)
	}
}

/// Decodes every drawable gene of `dna`, in genome order.
pub fn polygons(dna: &Dna, width: u32, height: u32) -> Vec<Polygon> {
	dna.genes()
		.filter_map(|g| protein::decode(&g, width, height))
		.collect()
}

/// Clears `surface` and draws all of `dna`'s polygons onto it. Returns how many were drawn.
pub fn draw_dna(surface: &mut impl RenderSurface, dna: &Dna) -> usize {
	surface.clear();
	let polys = polygons(dna, surface.width(), surface.height());
	for poly in &polys {
		surface.fill_polygon(poly);
	}
	polys.len()
}
