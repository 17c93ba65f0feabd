//! Rasters and the pixel-distance fitness between them.
//! Distance is the sum of absolute differences (Manhattan distance) over all four RGBA channels.

use rayon::prelude::*;

/// Rows below this many bytes are summed on one thread.
const MIN_PAR_CHUNK: usize = 64 * 1024;

/// A `width`x`height` image of straight (non-premultiplied) RGBA8 pixels, row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Raster {
	pub width: u32,
	pub height: u32,
	pub data: Vec<u8>,
}

impl Raster {
	/// A fully transparent black raster.
	pub fn blank(width: u32, height: u32) -> Self {
		Self {
			width,
			height,
			data: vec![0; width as usize * height as usize * 4],
		}
	}

	/// Wraps a pixel buffer. Panics if `data` does not hold exactly `width * height` RGBA pixels.
	pub fn from_rgba(width: u32, height: u32, data: Vec<u8>) -> Self {
		assert_eq!(
			data.len(),
			width as usize * height as usize * 4,
			"raster buffer must hold {width}x{height} RGBA pixels"
		);
		Self {
			width,
			height,
			data,
		}
	}

	/// A raster filled with a single color.
	pub fn filled(width: u32, height: u32, rgba: [u8; 4]) -> Self {
		let data = rgba
			.iter()
			.copied()
			.cycle()
			.take(width as usize * height as usize * 4)
			.collect();
		Self {
			width,
			height,
			data,
		}
	}

	pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
		let i = (y as usize * self.width as usize + x as usize) * 4;
		[
			self.data[i],
			self.data[i + 1],
			self.data[i + 2],
			self.data[i + 3],
		]
	}
}

/// Sum of absolute channel differences between two equally sized buffers.
pub fn sad(a: &[u8], b: &[u8]) -> u64 {
	debug_assert_eq!(a.len(), b.len());
	let chunk = MIN_PAR_CHUNK.max(a.len() / rayon::current_num_threads().max(1));
	a.par_chunks(chunk)
		.zip(b.par_chunks(chunk))
		.map(|(x, y)| {
			x.iter()
				.zip(y)
				.map(|(&p, &q)| p.abs_diff(q) as u64)
				.sum::<u64>()
		})
		.sum()
}

/// Similarity of `candidate` to `target` in `[0, 1]`, where `1.0` means pixel-identical.
///
/// Computed as one minus the mean absolute channel difference, normalized by 255. Symmetric in its
/// arguments. Panics if the rasters differ in size.
pub fn evaluate(target: &Raster, candidate: &Raster) -> f64 {
	assert_eq!(
		(target.width, target.height),
		(candidate.width, candidate.height),
		"rasters must have equal dimensions"
	);
	let n = target.data.len();
	if n == 0 {
		return 1.0;
	}
	let dist = sad(&target.data, &candidate.data);
	1.0 - dist as f64 / 255.0 / n as f64
}

/// Fitness as shown to people: a percentage rounded to two decimals.
pub fn as_percent(fitness: f64) -> f64 {
	(fitness * 10000.0).round() / 100.0
}
