//! Loading target images.

use std::path::Path;

use eyre::{Result, WrapErr};
use image::imageops::FilterType;

use crate::fitness::Raster;

/// Loads any supported image file and scales it to exactly `width`x`height`, ignoring aspect ratio.
pub fn load(path: impl AsRef<Path>, width: u32, height: u32) -> Result<Raster> {
	let path = path.as_ref();
	let img = image::open(path).wrap_err_with(|| format!("could not load image {}", path.display()))?;
	log::info!(
		"Loaded target {} ({}x{}), scaling to {width}x{height}.",
		path.display(),
		img.width(),
		img.height()
	);
	let img = img.resize_exact(width, height, FilterType::Triangle).to_rgba8();
	Ok(Raster::from_rgba(width, height, img.into_raw()))
}

/// Writes a raster as a PNG file.
pub fn save(raster: &Raster, path: impl AsRef<Path>) -> Result<()> {
	let path = path.as_ref();
	image::save_buffer(
		path,
		&raster.data,
		raster.width,
		raster.height,
		image::ExtendedColorType::Rgba8,
	)
	.wrap_err_with(|| format!("could not write {}", path.display()))
}
