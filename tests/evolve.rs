use std::{
	fs,
	path::PathBuf,
	sync::{
		atomic::{AtomicUsize, Ordering},
		Arc,
	},
};

use dnapaint::{
	evolve::{
		results::{self, History, GENOME_FILE, HISTORY_FILE, IMAGE_FILE, RESULTS_FILE},
		Acceptance, Context, Decision, RunState, Simulation,
	},
	fitness::{self, Raster},
	genome::Dna,
	mutations::{Magnitude, MutationParams},
	params::{self, EvolveConfig, EvolveParams},
};
use eyre::Result;
use rand::SeedableRng;
use rand_pcg::Pcg64Mcg;

const SIZE: u32 = 32;

/// Left-to-right red gradient over an opaque dark blue background.
fn gradient() -> Raster {
	let mut data = Vec::with_capacity((SIZE * SIZE * 4) as usize);
	for _y in 0..SIZE {
		for x in 0..SIZE {
			data.extend_from_slice(&[(x * 255 / (SIZE - 1)) as u8, 0, 60, 255]);
		}
	}
	Raster::from_rgba(SIZE, SIZE, data)
}

fn params(seed: u64) -> EvolveParams {
	EvolveParams::builder()
		.seed(seed)
		.width(SIZE)
		.height(SIZE)
		.step_interval_ms(0)
		.build()
}

fn scratch_dir(name: &str) -> Result<PathBuf> {
	let dir = std::env::temp_dir().join(format!("dnapaint-{name}-{}", std::process::id()));
	if dir.exists() {
		fs::remove_dir_all(&dir)?;
	}
	Ok(dir)
}

#[test]
fn first_step_plants_the_seed_genome() {
	let mut sim = Simulation::new(gradient(), params(1));
	assert!(sim.genome().is_empty());
	assert_eq!(sim.fitness(), 0.0);
	assert_eq!(sim.state(), RunState::Idle);

	let step = sim.step();
	assert_eq!(step.decision, Decision::Improved);
	assert_eq!(step.polygons, 1);
	assert_eq!(sim.genome(), &Dna::seed());
	assert_eq!(sim.generation(), 1);
	assert_eq!(sim.steps(), 1);
	assert!(sim.fitness() > 0.0);
}

#[test]
fn seed_that_does_not_improve_is_rejected() {
	// a blank target scores an empty genome at 1.0, which the seed cannot beat
	let mut sim = Simulation::new(Raster::blank(SIZE, SIZE), params(16));
	assert_eq!(sim.set_genome(Dna::new()), 1.0);

	let step = sim.step();
	assert_eq!(step.decision, Decision::Rejected);
	assert_eq!(step.len, Dna::seed().len());
	assert!(step.fitness < 1.0);
	assert_eq!(sim.generation(), 0);
	assert_eq!(sim.steps(), 1);
	assert!(sim.genome().is_empty());
	assert_eq!(sim.fitness(), 1.0);
}

#[test]
fn fitness_never_decreases() {
	let mut sim = Simulation::new(gradient(), params(2));
	let mut last = sim.fitness();
	for _ in 0..300 {
		let gen = sim.generation();
		let step = sim.step();
		match step.decision {
			Decision::Improved => {
				assert!(sim.fitness() > last);
				assert_eq!(sim.generation(), gen + 1);
			}
			Decision::Drift | Decision::Parsimony => {
				assert_eq!(sim.fitness(), last);
				assert_eq!(sim.generation(), gen + 1);
			}
			Decision::Rejected => {
				assert_eq!(sim.fitness(), last);
				assert_eq!(sim.generation(), gen);
			}
		}
		assert!(sim.fitness() >= last);
		last = sim.fitness();
	}
	assert_eq!(sim.steps(), 300);
	assert!(sim.generation() > 1, "some mutant should have improved on the seed");
}

#[test]
fn best_fitness_matches_its_rendering() {
	let mut sim = Simulation::new(gradient(), params(3));
	for _ in 0..100 {
		sim.step();
	}
	let best = sim.genome().clone();
	let (f, _) = sim.score(&best);
	assert_eq!(f, sim.fitness());
}

#[test]
fn acceptance_rules() {
	let mut rng = Pcg64Mcg::seed_from_u64(0);
	let never = Acceptance::new(0.0, 0.0);
	let drift = Acceptance::new(1.0, 0.0);
	let parsimony = Acceptance::new(0.0, 1.0);
	let always = Acceptance::new(1.0, 1.0);

	assert_eq!(never.decide(&mut rng, 0.5, 10, 0.6, 50), Decision::Improved);
	assert_eq!(never.decide(&mut rng, 0.5, 10, 0.5, 5), Decision::Rejected);
	assert_eq!(drift.decide(&mut rng, 0.5, 10, 0.5, 50), Decision::Drift);
	assert_eq!(parsimony.decide(&mut rng, 0.5, 10, 0.5, 5), Decision::Parsimony);
	// parsimony needs a strictly shorter genome
	assert_eq!(parsimony.decide(&mut rng, 0.5, 10, 0.5, 10), Decision::Rejected);
	// worse is never taken
	assert_eq!(always.decide(&mut rng, 0.5, 10, 0.4, 1), Decision::Rejected);
}

#[test]
fn drift_is_rare() {
	let mut rng = Pcg64Mcg::seed_from_u64(4);
	let acc = Acceptance::default();
	let n = 100_000;
	let taken = (0..n)
		.filter(|_| acc.decide(&mut rng, 0.5, 10, 0.5, 10).is_accepted())
		.count();
	// expected 100
	assert!(taken > 50 && taken < 150, "{taken} drifts");
}

#[test]
#[should_panic(expected = "acceptance rates")]
fn acceptance_rates_are_probabilities() {
	Acceptance::new(1.5, 0.0);
}

#[test]
fn set_target_resets_the_genome() {
	let mut sim = Simulation::new(gradient(), params(5));
	for _ in 0..20 {
		sim.step();
	}
	assert!(!sim.genome().is_empty());

	sim.set_target(Raster::filled(SIZE, SIZE, [255; 4]));
	assert!(sim.genome().is_empty());
	assert_eq!(sim.fitness(), 0.0);
	assert_eq!(sim.generation(), 0);
	assert_eq!(sim.steps(), 0);
	assert_eq!(sim.target(), &Raster::filled(SIZE, SIZE, [255; 4]));

	sim.step();
	assert_eq!(sim.genome(), &Dna::seed());
}

#[test]
fn set_genome_scores_without_counting_a_generation() -> Result<()> {
	let mut sim = Simulation::new(gradient(), params(6));
	let dna: Dna = "CCCC".parse()?;
	let f = sim.set_genome(dna.clone());
	assert_eq!(sim.genome(), &dna);
	assert_eq!(f, fitness::evaluate(&gradient(), &Raster::blank(SIZE, SIZE)));
	assert_eq!(sim.generation(), 0);
	Ok(())
}

#[test]
fn set_genome_truncates_to_max_len() {
	let p = EvolveParams::builder()
		.seed(7)
		.width(SIZE)
		.height(SIZE)
		.max_len(20)
		.build();
	let mut sim = Simulation::new(gradient(), p);
	sim.set_genome(Dna::seed());
	assert_eq!(sim.genome().len(), 20);
	assert_eq!(sim.genome()[..], Dna::seed()[Dna::seed().len() - 20..]);
}

#[test]
fn clean_keeps_fitness() -> Result<()> {
	let mut sim = Simulation::new(gradient(), params(8));
	let noisy: Dna = format!("CCC{}GGTTAA", Dna::seed()).parse()?;
	let before = sim.set_genome(noisy);
	sim.clean();
	assert_eq!(sim.genome(), &Dna::seed());
	assert_eq!(sim.fitness(), before);
	Ok(())
}

#[test]
fn same_seed_same_run() {
	let run = |seed| {
		let mut sim = Simulation::new(gradient(), params(seed));
		for _ in 0..150 {
			sim.step();
		}
		(sim.genome().clone(), sim.fitness(), sim.generation())
	};
	assert_eq!(run(9), run(9));
}

#[test]
fn run_stops_on_step_limit() -> Result<()> {
	let p = EvolveParams::builder()
		.seed(10)
		.width(SIZE)
		.height(SIZE)
		.step_interval_ms(0)
		.max_steps(40)
		.build();
	let mut sim = Simulation::new(gradient(), p);
	sim.run()?;
	assert_eq!(sim.steps(), 40);
	assert_eq!(sim.state(), RunState::Stopped);

	// the canvas shows the best genome afterwards
	let best = sim.genome().clone();
	let (f, _) = sim.score(&best);
	assert_eq!(f, sim.fitness());
	Ok(())
}

#[test]
fn run_stops_on_generation_limit() -> Result<()> {
	let p = EvolveParams::builder()
		.seed(11)
		.width(SIZE)
		.height(SIZE)
		.step_interval_ms(0)
		.max_generations(5)
		.build();
	let mut sim = Simulation::new(gradient(), p);
	sim.run()?;
	assert_eq!(sim.generation(), 5);
	Ok(())
}

#[test]
fn stop_handle_and_restart() -> Result<()> {
	let mut sim = Simulation::new(gradient(), params(12));
	let stop = sim.stop_handle();
	stop.stop();
	// stopped before it started: no steps are taken
	sim.run()?;
	assert_eq!(sim.steps(), 0);
	assert_eq!(sim.state(), RunState::Stopped);

	// a stopped run can be started again, and picks up where it was
	sim.add_stop_condition(Box::new(|ctx: &mut Context, _: &Dna| ctx.steps >= 15));
	sim.run()?;
	assert!(!stop.is_stopped());
	assert_eq!(sim.steps(), 15);
	Ok(())
}

#[test]
fn observers_see_every_accepted_generation() -> Result<()> {
	let p = EvolveParams::builder()
		.seed(13)
		.width(SIZE)
		.height(SIZE)
		.step_interval_ms(0)
		.max_steps(60)
		.build();
	let mut sim = Simulation::new(gradient(), p);
	let seen = Arc::new(AtomicUsize::new(0));
	let counter = seen.clone();
	sim.add_observer(Box::new(move |_: &mut Context, _: &Dna| {
		counter.fetch_add(1, Ordering::Relaxed);
	}));
	sim.run()?;
	assert_eq!(seen.load(Ordering::Relaxed), sim.generation());
	Ok(())
}

#[test]
fn run_writes_results() -> Result<()> {
	let outdir = scratch_dir("results")?;
	let p = EvolveParams::builder()
		.seed(14)
		.width(SIZE)
		.height(SIZE)
		.step_interval_ms(0)
		.max_steps(50)
		.build();
	let mut sim = Simulation::new(gradient(), p).with_output_dir(&outdir);
	sim.register_results(Box::new(History::new(14, SIZE, SIZE, true)));
	sim.run()?;

	for file in [HISTORY_FILE, RESULTS_FILE, GENOME_FILE, IMAGE_FILE] {
		assert!(outdir.join(file).exists(), "missing {file}");
	}

	let history = fs::read_to_string(outdir.join(HISTORY_FILE))?;
	// header plus one row per accepted generation
	assert_eq!(history.lines().count(), sim.generation() + 1);
	assert!(history.starts_with("generation,step,fitness,decision,length,genes,time"));

	let summary: serde_json::Value = serde_json::from_str(&fs::read_to_string(outdir.join(RESULTS_FILE))?)?;
	assert_eq!(summary["seed"], 14);
	assert_eq!(summary["num_steps"], 50);
	assert_eq!(summary["num_generations"], sim.generation());

	assert_eq!(&results::read_genome(outdir.join(GENOME_FILE))?, sim.genome());

	let png = image::open(outdir.join(IMAGE_FILE))?.to_rgba8();
	assert_eq!(png.dimensions(), (SIZE, SIZE));

	fs::remove_dir_all(&outdir)?;
	Ok(())
}

#[test]
fn best_image_is_the_scored_render_without_anti_aliasing() -> Result<()> {
	let outdir = scratch_dir("aliased")?;
	let p = EvolveParams::builder()
		.seed(17)
		.width(SIZE)
		.height(SIZE)
		.step_interval_ms(0)
		.anti_alias(false)
		.max_steps(30)
		.build();
	let mut sim = Simulation::new(gradient(), p).with_output_dir(&outdir);
	let prm = sim.params().clone();
	sim.register_results(Box::new(History::new(
		prm.seed,
		prm.width,
		prm.height,
		prm.anti_alias,
	)));
	sim.run()?;

	let png = image::open(outdir.join(IMAGE_FILE))?.to_rgba8();
	let scored = sim.candidate();
	assert_eq!(png.dimensions(), (scored.width, scored.height));
	let differing = png
		.as_raw()
		.iter()
		.zip(&scored.data)
		.filter(|(a, b)| a != b)
		.count();
	assert_eq!(differing, 0);
	assert_eq!(fitness::evaluate(&gradient(), &scored), sim.fitness());

	fs::remove_dir_all(&outdir)?;
	Ok(())
}

#[test]
fn params_are_fixed_after_construction() {
	let p = EvolveParams::builder()
		.seed(18)
		.width(SIZE)
		.height(SIZE)
		.max_len(50)
		.build();
	let sim = Simulation::new(gradient(), p.clone());
	assert_eq!(sim.params(), &p);
}

#[test]
fn validation_catches_bad_settings() {
	assert!(params(1).validate().is_ok());

	let mut p = params(1);
	p.mutation.insertion = Magnitude::new(10.0, -2);
	let err = p.validate().unwrap_err();
	assert!(err.to_string().contains("magnitudes"), "{err}");

	let mut p = params(1);
	p.mutation.edit_count = Magnitude::new(-1.0, 10);
	assert!(p.validate().is_err());

	let mut p = params(1);
	p.mutation.duplication = Magnitude::new(f64::INFINITY, 4);
	assert!(p.validate().is_err());

	let mut p = params(1);
	p.acceptance.drift_rate = 2.0;
	assert!(p.validate().is_err());

	let mut p = params(1);
	p.seed = u64::MAX;
	assert!(p.validate().is_err());

	let mut p = params(1);
	p.width = 0;
	assert!(p.validate().is_err());
}

#[test]
fn empty_canvas_is_an_error() {
	assert!(params::check_canvas(1, 1).is_ok());
	let err = params::check_canvas(0, 250).unwrap_err();
	assert!(err.to_string().contains("0x250"), "{err}");
	assert!(params::check_canvas(250, 0).is_err());
}

#[test]
fn config_round_trips_through_toml() -> Result<()> {
	let dir = scratch_dir("config")?;
	fs::create_dir_all(&dir)?;

	let mut params = params(15);
	params.max_generations = Some(100);
	let mut config = EvolveConfig::new("images/target.png", params);
	config.init_genome = Dna::seed();

	let path = dir.join("config.toml");
	fs::write(&path, config.to_toml()?)?;
	assert_eq!(EvolveConfig::from_file(&path)?, config);

	fs::remove_dir_all(&dir)?;
	Ok(())
}

#[test]
fn partial_config_takes_defaults() -> Result<()> {
	let config: EvolveConfig = toml::from_str(
		r#"
		target = "mona.png"

		[params]
		seed = 3
		width = 64

		[params.acceptance]
		drift_rate = 0.5
		"#,
	)?;
	assert_eq!(config.output_dir, "data");
	assert!(config.init_genome.is_empty());
	assert_eq!(config.params.seed, 3);
	assert_eq!(config.params.width, 64);
	assert_eq!(config.params.height, 250);
	assert_eq!(config.params.acceptance.drift_rate, 0.5);
	assert_eq!(config.params.acceptance.parsimony_rate, 0.001);
	assert_eq!(config.params.mutation, MutationParams::default());
	assert_eq!(config.params.max_generations, None);
	Ok(())
}

#[test]
fn bad_genome_in_config_is_an_error() {
	let res = toml::from_str::<EvolveConfig>("target = \"a.png\"\ninit_genome = \"ATGX\"\n");
	assert!(res.is_err());
}
