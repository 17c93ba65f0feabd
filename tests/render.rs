use dnapaint::{
	fitness::{self, Raster},
	genome::Dna,
	protein::{Hsla, Polygon},
	render::{self, RenderSurface, SkiaSurface},
};
use eyre::Result;

const RED: Hsla = Hsla {
	hue: 0.0,
	saturation: 100.0,
	lightness: 50.0,
	alpha: 1.0,
};

const BLUE: Hsla = Hsla {
	hue: 240.0,
	saturation: 100.0,
	lightness: 50.0,
	alpha: 1.0,
};

fn square(x0: f32, y0: f32, x1: f32, y1: f32, color: Hsla) -> Polygon {
	Polygon {
		points: vec![(x0, y0), (x1, y0), (x1, y1), (x0, y1)],
		color,
	}
}

#[test]
fn identical_rasters_score_one() {
	let a = Raster::filled(16, 8, [12, 200, 7, 255]);
	assert_eq!(fitness::evaluate(&a, &a.clone()), 1.0);

	let black = Raster::blank(16, 8);
	let white = Raster::filled(16, 8, [255; 4]);
	assert_eq!(fitness::evaluate(&black, &white), 0.0);
}

#[test]
fn fitness_is_symmetric_and_bounded() {
	let a = Raster::from_rgba(2, 1, vec![0, 10, 20, 255, 255, 0, 0, 128]);
	let b = Raster::from_rgba(2, 1, vec![5, 10, 40, 0, 250, 1, 0, 128]);
	let ab = fitness::evaluate(&a, &b);
	assert_eq!(ab, fitness::evaluate(&b, &a));
	assert!((0.0..=1.0).contains(&ab));
	// 5 + 0 + 20 + 255 + 5 + 1 = 286 over 8 channels
	assert!((ab - (1.0 - 286.0 / 255.0 / 8.0)).abs() < 1e-12);
}

#[test]
#[should_panic(expected = "equal dimensions")]
fn fitness_needs_equal_sizes() {
	fitness::evaluate(&Raster::blank(4, 4), &Raster::blank(4, 5));
}

#[test]
fn genome_without_genes_renders_blank() -> Result<()> {
	let dna: Dna = "CCCCGGGGTTTTAAAA".parse()?;
	let mut surface = SkiaSurface::new(32, 32);
	assert_eq!(render::draw_dna(&mut surface, &dna), 0);
	let blank = surface.read_pixels();
	assert_eq!(blank, Raster::blank(32, 32));

	// so fitness is one minus the target's mean channel value
	let target = Raster::filled(32, 32, [100, 150, 200, 255]);
	let f = fitness::evaluate(&target, &blank);
	let mean = (100 + 150 + 200 + 255) as f64 / 4.0;
	assert!((f - (1.0 - mean / 255.0)).abs() < 1e-12);
	Ok(())
}

#[test]
fn seed_genome_paints_something() {
	let mut surface = SkiaSurface::new(32, 32);
	assert_eq!(render::draw_dna(&mut surface, &Dna::seed()), 1);
	let pixels = surface.read_pixels();
	assert_ne!(pixels, Raster::blank(32, 32));
	assert!(pixels.data.chunks_exact(4).any(|p| p[3] > 0));
}

#[test]
fn opaque_fill_covers_its_area() {
	let mut surface = SkiaSurface::new(32, 32).with_anti_alias(false);
	surface.clear();
	surface.fill_polygon(&square(8.0, 8.0, 24.0, 24.0, RED));
	let px = surface.read_pixels();
	assert_eq!(px.pixel(16, 16), [255, 0, 0, 255]);
	assert_eq!(px.pixel(2, 2), [0, 0, 0, 0]);
	assert_eq!(px.pixel(30, 30), [0, 0, 0, 0]);
}

#[test]
fn later_polygons_paint_over_earlier_ones() {
	let mut surface = SkiaSurface::new(32, 32).with_anti_alias(false);
	surface.clear();
	surface.fill_polygon(&square(0.0, 0.0, 20.0, 20.0, RED));
	surface.fill_polygon(&square(10.0, 10.0, 32.0, 32.0, BLUE));
	let px = surface.read_pixels();
	assert_eq!(px.pixel(5, 5), [255, 0, 0, 255]);
	assert_eq!(px.pixel(15, 15), [0, 0, 255, 255]);
	assert_eq!(px.pixel(25, 25), [0, 0, 255, 255]);
}

#[test]
fn degenerate_polygons_are_skipped() {
	let mut surface = SkiaSurface::new(16, 16);
	surface.clear();
	surface.fill_polygon(&Polygon {
		points: vec![(3.0, 3.0)],
		color: RED,
	});
	surface.fill_polygon(&Polygon {
		points: Vec::new(),
		color: RED,
	});
	assert_eq!(surface.read_pixels(), Raster::blank(16, 16));
}

#[test]
fn clear_resets_the_canvas() {
	let mut surface = SkiaSurface::new(16, 16);
	surface.fill_polygon(&square(0.0, 0.0, 16.0, 16.0, RED));
	assert_ne!(surface.read_pixels(), Raster::blank(16, 16));
	surface.clear();
	assert_eq!(surface.read_pixels(), Raster::blank(16, 16));
}

#[test]
fn rendering_is_deterministic() {
	let dna = Dna::seed();
	let mut a = SkiaSurface::new(40, 30);
	let mut b = SkiaSurface::new(40, 30);
	render::draw_dna(&mut a, &dna);
	render::draw_dna(&mut b, &dna);
	assert_eq!(a.read_pixels(), b.read_pixels());
}
