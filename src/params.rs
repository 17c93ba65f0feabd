//! Run parameters and configuration files.

use std::{fs, path::Path};

use bon::Builder;
use eyre::{ensure, Result, WrapErr};
use serde::{Deserialize, Serialize};

use crate::{evolve::Acceptance, genome::Dna, mutations::MutationParams};

pub const DEFAULT_WIDTH: u32 = 250;
pub const DEFAULT_HEIGHT: u32 = 250;
pub const DEFAULT_MAX_LEN: usize = 10_000;
pub const MAX_SEED: u64 = i64::MAX as u64;

/// Parameters of one evolutionary run. Missing keys in a config file take their defaults.
#[derive(Builder, Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct EvolveParams {
	/// seed for the run's RNG; kept below 2^63 since TOML integers are signed
	#[builder(default = rand::random_range(0..=MAX_SEED))]
	pub seed: u64,
	#[builder(default = DEFAULT_WIDTH)]
	pub width: u32,
	#[builder(default = DEFAULT_HEIGHT)]
	pub height: u32,
	/// genomes are cut down to this many bases (from the front) after mutation
	#[builder(default = DEFAULT_MAX_LEN)]
	pub max_len: usize,
	#[builder(default)]
	pub mutation: MutationParams,
	#[builder(default)]
	pub acceptance: Acceptance,
	/// pause between steps, in milliseconds; 0 runs flat out
	#[builder(default = 1)]
	pub step_interval_ms: u64,
	#[builder(default = true)]
	pub anti_alias: bool,

	/// stop after this many accepted generations
	pub max_generations: Option<usize>,
	/// stop after this many steps, accepted or not
	pub max_steps: Option<usize>,
	/// stop once fitness reaches this value
	pub target_fitness: Option<f64>,
}

impl EvolveParams {
	/// Checks the settings a run would otherwise panic or blow up on.
	pub fn validate(&self) -> Result<()> {
		check_canvas(self.width, self.height)?;
		ensure!(self.seed <= MAX_SEED, "seed must be at most {MAX_SEED}");
		ensure!(
			self.acceptance.is_valid(),
			"acceptance rates must be in [0,1]"
		);
		ensure!(
			self.mutation.weights.total() > 0,
			"mutation weights must not all be zero"
		);
		ensure!(
			self.mutation.is_valid(),
			"mutation magnitudes need a non-negative scale and exponent"
		);
		Ok(())
	}
}

/// A canvas needs at least one pixel.
pub fn check_canvas(width: u32, height: u32) -> Result<()> {
	ensure!(
		width > 0 && height > 0,
		"canvas must not be empty (got {width}x{height})"
	);
	Ok(())
}

impl Default for EvolveParams {
	fn default() -> Self {
		EvolveParams::builder().build()
	}
}

/// Everything needed to replay a run. Written as `config.toml` into the run's output directory.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct EvolveConfig {
	/// target image file
	pub target: String,
	/// genome to start from; empty starts from the seed genome
	#[serde(default)]
	pub init_genome: Dna,
	#[serde(default = "default_output_dir")]
	pub output_dir: String,
	#[serde(default)]
	pub params: EvolveParams,
}

pub fn default_output_dir() -> String {
	String::from("data")
}

impl EvolveConfig {
	pub fn new(target: impl Into<String>, params: EvolveParams) -> Self {
		Self {
			target: target.into(),
			init_genome: Dna::new(),
			output_dir: default_output_dir(),
			params,
		}
	}

	pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
		let path = path.as_ref();
		let contents = fs::read_to_string(path)
			.wrap_err_with(|| format!("could not read config {}", path.display()))?;
		toml::from_str(&contents).wrap_err_with(|| format!("invalid config {}", path.display()))
	}

	pub fn to_toml(&self) -> Result<String> {
		toml::to_string(self).wrap_err("config should serialize")
	}
}
