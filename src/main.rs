use std::{
	fs, io,
	path::{Path, PathBuf},
	thread,
};

use clap::{Parser, Subcommand};
use dnapaint::{
	evolve::{
		results::{self, History},
		Context, Simulation,
	},
	fitness,
	genome::Dna,
	params::{self, EvolveConfig, EvolveParams, DEFAULT_HEIGHT, DEFAULT_WIDTH},
	render::{self, RenderSurface, SkiaSurface},
	target,
};
use eyre::WrapErr;

#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
	#[command(subcommand)]
	pub command: Command,

	/// Canvas width in pixels
	#[arg(long, global = true)]
	pub width: Option<u32>,

	/// Canvas height in pixels
	#[arg(long, global = true)]
	pub height: Option<u32>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
	/// Evolve a genome toward a target image
	Evolve {
		/// Target image (any common format; scaled to the canvas size)
		target: Option<String>,

		/// Genome file to start from (defaults to the seed genome)
		#[arg(short, long)]
		dna: Option<PathBuf>,

		/// Config filename (for replay)
		#[arg(short = 'F', long = "config")]
		config: Option<PathBuf>,

		/// Seed for the run
		#[arg(short, long)]
		seed: Option<u64>,

		/// Stop after this many accepted generations
		#[arg(short = 'g', long = "gens")]
		max_generations: Option<usize>,

		/// Stop after this many steps
		#[arg(long = "steps")]
		max_steps: Option<usize>,

		/// Stop once fitness reaches this value (0..1)
		#[arg(short, long)]
		fitness: Option<f64>,

		/// Milliseconds to pause between steps
		#[arg(short, long)]
		interval: Option<u64>,

		/// Log progress and save the genome every this many accepted generations
		#[arg(short, long, default_value_t = 1000)]
		checkpoint: usize,

		/// Output directory (defaults to data/<target>/trial_<seed>)
		#[arg(short, long)]
		outdir: Option<PathBuf>,
	},
	/// Render a genome to a PNG image
	Render {
		/// Genome file
		dna: PathBuf,

		/// Output image
		#[arg(short, long, default_value = "genome.png")]
		out: PathBuf,
	},
	/// Score a genome against a target image
	Fitness {
		/// Target image
		target: PathBuf,

		/// Genome file
		dna: PathBuf,
	},
	/// Strip every non-coding region from a genome
	Clean {
		/// Genome file
		dna: PathBuf,

		/// Write the result here instead of stdout
		#[arg(short, long)]
		out: Option<PathBuf>,
	},
}

fn main() -> eyre::Result<()> {
	pretty_env_logger::init();

	let cli = Cli::parse();
	let width = cli.width.unwrap_or(DEFAULT_WIDTH);
	let height = cli.height.unwrap_or(DEFAULT_HEIGHT);

	match cli.command {
		Command::Evolve {
			target,
			dna,
			config,
			seed,
			max_generations,
			max_steps,
			fitness,
			interval,
			checkpoint,
			outdir,
		} => {
			let mut config = match (config, target) {
				(Some(file), target) => {
					// replay a run
					let mut config = EvolveConfig::from_file(file)?;
					if let Some(t) = target {
						config.target = t;
					}
					config
				}
				(None, Some(target)) => EvolveConfig::new(target, EvolveParams::default()),
				(None, None) => eyre::bail!("a target image or a config file is required"),
			};
			let params = &mut config.params;
			if let Some(s) = seed {
				params.seed = s;
			}
			if let Some(w) = cli.width {
				params.width = w;
			}
			if let Some(h) = cli.height {
				params.height = h;
			}
			params.max_generations = max_generations.or(params.max_generations);
			params.max_steps = max_steps.or(params.max_steps);
			params.target_fitness = fitness.or(params.target_fitness);
			if let Some(ms) = interval {
				params.step_interval_ms = ms;
			}
			if let Some(file) = dna {
				config.init_genome = results::read_genome(file)?;
			}
			evolve(config, outdir, checkpoint)?;
		}
		Command::Render { dna, out } => {
			params::check_canvas(width, height)?;
			let dna = results::read_genome(dna)?;
			let mut surface = SkiaSurface::new(width, height);
			let drawn = render::draw_dna(&mut surface, &dna);
			target::save(&surface.read_pixels(), &out)?;
			log::info!("Rendered {drawn} polygons to {}.", out.display());
		}
		Command::Fitness {
			target: image,
			dna,
		} => {
			params::check_canvas(width, height)?;
			let image = target::load(image, width, height)?;
			let dna = results::read_genome(dna)?;
			let mut surface = SkiaSurface::new(width, height);
			render::draw_dna(&mut surface, &dna);
			let f = fitness::evaluate(&image, &surface.read_pixels());
			println!("{}", fitness::as_percent(f));
		}
		Command::Clean { dna, out } => {
			let dna = results::read_genome(dna)?;
			let cleaned = dna.clean();
			log::info!("Cleaned genome from {} to {} bases.", dna.len(), cleaned.len());
			match out {
				Some(path) => results::write_genome(&cleaned, path)?,
				None => println!("{cleaned}"),
			}
		}
	}

	Ok(())
}

fn evolve(config: EvolveConfig, outdir: Option<PathBuf>, checkpoint: usize) -> eyre::Result<()> {
	let params = config.params.clone();
	params.validate()?;

	let outdir = outdir.unwrap_or_else(|| {
		let stem = Path::new(&config.target)
			.file_stem()
			.map(|s| s.to_string_lossy().into_owned())
			.unwrap_or_else(|| String::from("target"));
		let mut p = PathBuf::from(&config.output_dir);
		p.push(stem);
		p.push(format!("trial_{}", params.seed));
		p
	});
	fs::create_dir_all(&outdir)
		.wrap_err_with(|| format!("could not create {}", outdir.display()))?;
	// config.toml
	fs::write(outdir.join("config.toml"), config.to_toml()?)?;

	let image = target::load(&config.target, params.width, params.height)?;
	let mut sim = Simulation::new(image, params.clone()).with_output_dir(&outdir);
	if !config.init_genome.is_empty() {
		let f = sim.set_genome(config.init_genome.clone());
		log::info!(
			"Starting from a genome of {} bases at {:.2}%.",
			sim.genome().len(),
			fitness::as_percent(f)
		);
	}

	sim.register_results(Box::new(History::new(
		params.seed,
		params.width,
		params.height,
		params.anti_alias,
	)));
	let checkpoint = checkpoint.max(1);
	let checkpoint_file = outdir.join(results::GENOME_FILE);
	sim.add_observer(Box::new(move |ctx: &mut Context, best: &Dna| {
		if ctx.generation % checkpoint != 0 {
			return;
		}
		log::info!(
			"Generation {} (step {}): {:.2}%, {} bases, {} genes.",
			ctx.generation,
			ctx.steps,
			fitness::as_percent(ctx.fitness),
			best.len(),
			best.genes().count(),
		);
		if let Err(e) = results::write_genome(best, &checkpoint_file) {
			log::warn!("Checkpoint failed: {e:#}");
		}
	}));

	// Enter stops the run; a closed stdin does not
	let stop = sim.stop_handle();
	thread::spawn(move || {
		let mut line = String::new();
		if let Ok(n) = io::stdin().read_line(&mut line) {
			if n > 0 {
				log::info!("Stopping at the next step.");
				stop.stop();
			}
		}
	});
	log::info!("Press Enter to stop.");

	sim.run()?;
	println!(
		"{:.2}% after {} generations ({} steps)",
		fitness::as_percent(sim.fitness()),
		sim.generation(),
		sim.steps()
	);
	Ok(())
}
