//! Recording a run to disk.

use std::{fs, path::Path};

use csv::Writer;
use eyre::{Result, WrapErr};
use serde::Serialize;

use crate::{
	fitness,
	genetic::Results,
	genome::Dna,
	render::{self, RenderSurface, SkiaSurface},
	target,
};

use super::{Context, Decision};

pub const HISTORY_FILE: &str = "history.csv";
pub const RESULTS_FILE: &str = "results.json";
pub const GENOME_FILE: &str = "genome.txt";
pub const IMAGE_FILE: &str = "best.png";

/// One accepted generation.
#[derive(Debug, Clone, Serialize)]
pub struct GenerationRecord {
	pub generation: usize,
	pub step: usize,
	pub fitness: f64,
	pub decision: Decision,
	pub length: usize,
	pub genes: usize,
	pub time: f64, // seconds since start
}

/// Default results of a run: a CSV row per accepted generation, a JSON summary, and the final genome as
/// text and as a rendered image.
#[derive(Debug, Serialize)]
pub struct History {
	pub seed: u64,
	pub num_generations: usize,
	pub num_steps: usize,
	pub final_fitness: f64,
	pub final_length: usize,
	pub total_time: f64, // seconds

	#[serde(skip)]
	records: Vec<GenerationRecord>,
	#[serde(skip)]
	size: (u32, u32), // canvas size for the final image
	#[serde(skip)]
	anti_alias: bool,
}

impl History {
	/// The final image is drawn the way the run scored candidates: `width`x`height`, with or without
	/// anti-aliasing.
	pub fn new(seed: u64, width: u32, height: u32, anti_alias: bool) -> Self {
		Self {
			seed,
			num_generations: 0,
			num_steps: 0,
			final_fitness: 0.0,
			final_length: 0,
			total_time: 0.0,
			records: Vec::new(),
			size: (width, height),
			anti_alias,
		}
	}

	pub fn records(&self) -> &[GenerationRecord] {
		&self.records
	}
}

impl Results<Dna, Context> for History {
	fn initialize(&mut self, ctx: &mut Context) {
		self.records.clear();
		self.num_generations = ctx.generation;
	}

	fn record_generation(&mut self, ctx: &mut Context, best: &Dna) {
		self.records.push(GenerationRecord {
			generation: ctx.generation,
			step: ctx.steps,
			fitness: ctx.fitness,
			decision: ctx.decision,
			length: best.len(),
			genes: best.genes().count(),
			time: ctx.elapsed().as_secs_f64(),
		});
	}

	fn finalize(&mut self, ctx: &mut Context, best: &Dna, outdir: &Path) -> Result<()> {
		self.num_generations = ctx.generation;
		self.num_steps = ctx.steps;
		self.final_fitness = ctx.fitness;
		self.final_length = best.len();
		self.total_time = ctx.elapsed().as_secs_f64();

		// history.csv
		let path = outdir.join(HISTORY_FILE);
		let mut wtr = Writer::from_path(&path)
			.wrap_err_with(|| format!("could not create {}", path.display()))?;
		for rec in &self.records {
			wtr.serialize(rec)?;
		}
		wtr.flush()?;

		// genome.txt
		write_genome(best, outdir.join(GENOME_FILE))?;

		// best.png
		let (w, h) = self.size;
		let mut surface = SkiaSurface::new(w, h).with_anti_alias(self.anti_alias);
		render::draw_dna(&mut surface, best);
		target::save(&surface.read_pixels(), outdir.join(IMAGE_FILE))?;

		// results.json
		let path = outdir.join(RESULTS_FILE);
		let results = serde_json::to_string_pretty(&self).wrap_err("results should serialize")?;
		fs::write(&path, results).wrap_err_with(|| format!("could not write {}", path.display()))?;

		log::info!(
			"Recorded {} accepted generations; final fitness {:.2}%.",
			self.records.len(),
			fitness::as_percent(self.final_fitness)
		);
		Ok(())
	}
}

/// Writes a genome as a single line of text.
pub fn write_genome(dna: &Dna, path: impl AsRef<Path>) -> Result<()> {
	let path = path.as_ref();
	fs::write(path, format!("{dna}\n"))
		.wrap_err_with(|| format!("could not write {}", path.display()))
}

/// Reads a genome from a text file. Whitespace (including line breaks) is ignored.
pub fn read_genome(path: impl AsRef<Path>) -> Result<Dna> {
	let path = path.as_ref();
	let text = fs::read_to_string(path)
		.wrap_err_with(|| format!("could not read {}", path.display()))?;
	text.parse::<Dna>()
		.wrap_err_with(|| format!("invalid genome in {}", path.display()))
}
