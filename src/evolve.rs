//! The evolution loop: single-candidate hill climbing over DNA genomes.

pub mod results;

use std::{
	path::{Path, PathBuf},
	sync::{
		atomic::{AtomicBool, Ordering},
		Arc,
	},
	thread,
	time::{Duration, Instant},
};

use derive_more::derive::Display;
use eyre::{ensure, Result};
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64Mcg;
use serde::{Deserialize, Serialize};

use crate::{
	fitness::{self, Raster},
	genetic::{AsContext, Mutator, Peeker, Predicate, Results},
	genome::Dna,
	mutations::DnaMutator,
	params::EvolveParams,
	render::{self, RenderSurface, SkiaSurface},
};

/// Runtime context of a run.
#[derive(Debug)]
pub struct Context {
	pub generation: usize, // accepted generations
	pub steps: usize,      // steps taken, accepted or not
	pub fitness: f64,      // fitness of the current best
	pub decision: Decision, // outcome of the latest step

	pub(crate) rng: Pcg64Mcg, // reproducible rng
	pub(crate) start_time: Instant,
}

impl Context {
	pub fn new(seed: u64) -> Self {
		Self {
			generation: 0,
			steps: 0,
			fitness: 0.0,
			decision: Decision::Rejected,
			rng: Pcg64Mcg::seed_from_u64(seed),
			start_time: Instant::now(),
		}
	}

	pub fn elapsed(&self) -> Duration {
		self.start_time.elapsed()
	}
}

impl AsContext for Context {
	#[inline]
	fn rng(&mut self) -> &mut impl Rng {
		&mut self.rng
	}

	#[inline]
	fn generation(&self) -> usize {
		self.generation
	}

	#[inline]
	fn steps(&self) -> usize {
		self.steps
	}

	#[inline]
	fn fitness(&self) -> f64 {
		self.fitness
	}
}

/// Outcome of comparing a mutant against the current best.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Decision {
	/// strictly fitter
	#[display("improved")]
	Improved,
	/// equally fit, taken by chance
	#[display("drift")]
	Drift,
	/// equally fit and shorter, taken by chance
	#[display("parsimony")]
	Parsimony,
	#[display("rejected")]
	Rejected,
}

impl Decision {
	pub fn is_accepted(self) -> bool {
		self != Decision::Rejected
	}
}

/// The acceptance rule. Fitter mutants always replace the best; equally fit ones only rarely, and never a
/// less fit one.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(default)]
pub struct Acceptance {
	/// chance of taking an equally fit mutant
	pub drift_rate: f64,
	/// chance of taking an equally fit mutant that is shorter, when drift did not take it
	pub parsimony_rate: f64,
}

impl Default for Acceptance {
	fn default() -> Self {
		Self {
			drift_rate: 0.001,
			parsimony_rate: 0.001,
		}
	}
}

impl Acceptance {
	pub fn new(drift_rate: f64, parsimony_rate: f64) -> Self {
		let out = Self {
			drift_rate,
			parsimony_rate,
		};
		assert!(out.is_valid(), "acceptance rates must be in [0,1]");
		out
	}

	pub fn is_valid(&self) -> bool {
		(0.0..=1.0).contains(&self.drift_rate) && (0.0..=1.0).contains(&self.parsimony_rate)
	}

	/// Decides whether a mutant with `new_fitness` and `new_len` bases replaces the current best.
	pub fn decide(
		&self,
		rng: &mut impl Rng,
		fitness: f64,
		len: usize,
		new_fitness: f64,
		new_len: usize,
	) -> Decision {
		if new_fitness > fitness {
			Decision::Improved
		} else if new_fitness == fitness {
			if rng.random_bool(self.drift_rate) {
				Decision::Drift
			} else if new_len < len && rng.random_bool(self.parsimony_rate) {
				Decision::Parsimony
			} else {
				Decision::Rejected
			}
		} else {
			Decision::Rejected
		}
	}
}

/// Lifecycle of a [`Simulation`].
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
	/// not started yet
	Idle,
	Running,
	/// cancelled or finished; [`Simulation::run`] starts it again
	Stopped,
}

/// Cancellation token for a running [`Simulation`]. Cheap to clone and safe to share across threads.
/// The loop checks it between steps.
#[derive(Debug, Clone, Default)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
	pub fn stop(&self) {
		self.0.store(true, Ordering::Relaxed);
	}

	pub fn is_stopped(&self) -> bool {
		self.0.load(Ordering::Relaxed)
	}

	fn reset(&self) {
		self.0.store(false, Ordering::Relaxed);
	}
}

/// What one step did.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Step {
	pub decision: Decision,
	/// fitness of the candidate, accepted or not
	pub fitness: f64,
	/// length of the candidate genome
	pub len: usize,
	/// number of polygons the candidate drew
	pub polygons: usize,
}

pub type StopCondition = Box<dyn Predicate<Dna, Context> + Send>;
pub type Observer = Box<dyn Peeker<Dna, Context> + Send>;
pub type Recorder = Box<dyn Results<Dna, Context> + Send>;

/// An evolving genome and everything needed to step it: the target, a canvas to render candidates on,
/// and the current best (genome, fitness, generation).
pub struct Simulation<S: RenderSurface = SkiaSurface> {
	params: EvolveParams,
	target: Raster,
	surface: S,
	mutator: DnaMutator,
	best: Dna,
	ctx: Context,
	state: RunState,
	stop: StopHandle,

	stop_conditions: Vec<StopCondition>,
	observers: Vec<Observer>,
	results: Vec<Recorder>,
	outdir: Option<PathBuf>,
}

impl Simulation<SkiaSurface> {
	/// Create a simulation drawing on a tiny-skia canvas of the configured size.
	pub fn new(target: Raster, params: EvolveParams) -> Self {
		let surface =
			SkiaSurface::new(params.width, params.height).with_anti_alias(params.anti_alias);
		Self::with_surface(target, params, surface)
	}
}

impl<S: RenderSurface> Simulation<S> {
	/// Create a simulation drawing on the given surface. Panics if the target, surface and configured
	/// canvas sizes disagree, or the acceptance rates are not probabilities.
	pub fn with_surface(target: Raster, params: EvolveParams, surface: S) -> Self {
		assert_eq!(
			(target.width, target.height),
			(params.width, params.height),
			"target must match the canvas size"
		);
		assert_eq!(
			(surface.width(), surface.height()),
			(params.width, params.height),
			"surface must match the canvas size"
		);
		assert!(
			params.acceptance.is_valid(),
			"acceptance rates must be in [0,1]"
		);

		let mut stop_conditions: Vec<StopCondition> = Vec::new();
		if let Some(max) = params.max_generations {
			stop_conditions.push(Box::new(move |ctx: &mut Context, _: &Dna| {
				ctx.generation >= max
			}));
		}
		if let Some(max) = params.max_steps {
			stop_conditions.push(Box::new(move |ctx: &mut Context, _: &Dna| ctx.steps >= max));
		}
		if let Some(f) = params.target_fitness {
			stop_conditions.push(Box::new(move |ctx: &mut Context, _: &Dna| {
				ctx.fitness >= f
			}));
		}

		let mut sim = Simulation {
			mutator: DnaMutator::new(params.mutation, params.max_len),
			ctx: Context::new(params.seed),
			params,
			target,
			surface,
			best: Dna::new(),
			state: RunState::Idle,
			stop: StopHandle::default(),
			stop_conditions,
			observers: Vec::new(),
			results: Vec::new(),
			outdir: None,
		};
		sim.surface.clear();
		sim
	}

	/// Write results into `outdir` when the run stops.
	pub fn with_output_dir(mut self, outdir: impl Into<PathBuf>) -> Self {
		self.outdir = Some(outdir.into());
		self
	}

	/// Add a condition that stops the run once it holds. Checked after every step.
	pub fn add_stop_condition(&mut self, cond: StopCondition) {
		self.stop_conditions.push(cond);
	}

	/// Add an observer called after every accepted generation.
	pub fn add_observer(&mut self, peeker: Observer) {
		self.observers.push(peeker);
	}

	/// Add a results recorder.
	pub fn register_results(&mut self, results: Recorder) {
		self.results.push(results);
	}

	/// Settings the simulation was built with. Fixed for its lifetime.
	pub fn params(&self) -> &EvolveParams {
		&self.params
	}

	pub fn genome(&self) -> &Dna {
		&self.best
	}

	pub fn fitness(&self) -> f64 {
		self.ctx.fitness
	}

	pub fn generation(&self) -> usize {
		self.ctx.generation
	}

	pub fn steps(&self) -> usize {
		self.ctx.steps
	}

	pub fn state(&self) -> RunState {
		self.state
	}

	pub fn context(&self) -> &Context {
		&self.ctx
	}

	pub fn target(&self) -> &Raster {
		&self.target
	}

	/// Pixels currently on the canvas: the latest candidate while running, the best once stopped.
	pub fn candidate(&self) -> Raster {
		self.surface.read_pixels()
	}

	pub fn output_dir(&self) -> Option<&Path> {
		self.outdir.as_deref()
	}

	/// A token that stops [`Simulation::run`] at the next step boundary.
	pub fn stop_handle(&self) -> StopHandle {
		self.stop.clone()
	}

	/// Forget the current genome: empty genome, zero fitness, zero generations.
	pub fn reset(&mut self) {
		self.best = Dna::new();
		self.ctx.fitness = 0.0;
		self.ctx.generation = 0;
		self.ctx.steps = 0;
		self.ctx.decision = Decision::Rejected;
		self.surface.clear();
		log::debug!("Reset genome.");
	}

	/// Swap in a new target image. The current genome is reset.
	pub fn set_target(&mut self, target: Raster) {
		assert_eq!(
			(target.width, target.height),
			(self.params.width, self.params.height),
			"target must match the canvas size"
		);
		self.target = target;
		self.reset();
	}

	/// Replace the current genome by hand and score it against the target. The generation count is kept.
	pub fn set_genome(&mut self, mut dna: Dna) -> f64 {
		dna.truncate_front(self.params.max_len);
		render::draw_dna(&mut self.surface, &dna);
		self.ctx.fitness = fitness::evaluate(&self.target, &self.surface.read_pixels());
		self.best = dna;
		self.ctx.fitness
	}

	/// Drop every non-coding region from the current genome. Rendering is unchanged.
	pub fn clean(&mut self) {
		let cleaned = self.best.clean();
		log::info!(
			"Cleaned genome from {} to {} bases.",
			self.best.len(),
			cleaned.len()
		);
		self.set_genome(cleaned);
	}

	/// Render `dna` and score it against the target. Leaves the rendering on the canvas.
	pub fn score(&mut self, dna: &Dna) -> (f64, usize) {
		let drawn = render::draw_dna(&mut self.surface, dna);
		let f = fitness::evaluate(&self.target, &self.surface.read_pixels());
		(f, drawn)
	}

	/// One evolutionary step: mutate the best (or start from the seed genome), render, score, and keep
	/// the mutant if [`Acceptance`] says so.
	pub fn step(&mut self) -> Step {
		let candidate = if self.best.is_empty() {
			log::debug!("Empty genome, starting from the seed genome.");
			Dna::seed()
		} else {
			self.mutator.mutate(&mut self.ctx, self.best.clone())
		};
		let (new_fitness, polygons) = self.score(&candidate);

		let decision = self.params.acceptance.decide(
			&mut self.ctx.rng,
			self.ctx.fitness,
			self.best.len(),
			new_fitness,
			candidate.len(),
		);
		let step = Step {
			decision,
			fitness: new_fitness,
			len: candidate.len(),
			polygons,
		};

		self.ctx.steps += 1;
		self.ctx.decision = decision;
		if decision.is_accepted() {
			log::debug!(
				"Generation {} ({decision}): fitness {:.4}% -> {:.4}%, {} bases, {polygons} polygons.",
				self.ctx.generation + 1,
				self.ctx.fitness * 100.0,
				new_fitness * 100.0,
				candidate.len(),
			);
			self.best = candidate;
			self.ctx.fitness = new_fitness;
			self.ctx.generation += 1;
		}
		step
	}

	/// Step until stopped through the [`StopHandle`] or a stop condition. Afterwards the canvas shows the
	/// best genome and results are written to the output directory, if one is set.
	pub fn run(&mut self) -> Result<()> {
		ensure!(
			self.state != RunState::Running,
			"simulation is already running"
		);
		if self.state == RunState::Stopped {
			self.stop.reset();
		}
		self.state = RunState::Running;
		self.ctx.start_time = Instant::now();
		log::info!(
			"Beginning run with seed {} from generation {} ({:.2}%).",
			self.params.seed,
			self.ctx.generation,
			fitness::as_percent(self.ctx.fitness)
		);
		for r in &mut self.results {
			r.initialize(&mut self.ctx);
		}

		let interval = Duration::from_millis(self.params.step_interval_ms);
		while !self.stop.is_stopped() {
			let step = self.step();
			if step.decision.is_accepted() {
				for r in &mut self.results {
					r.record_generation(&mut self.ctx, &self.best);
				}
				for o in &mut self.observers {
					o.peek(&mut self.ctx, &self.best);
				}
			}
			if self
				.stop_conditions
				.iter_mut()
				.any(|c| c.test(&mut self.ctx, &self.best))
			{
				break;
			}
			if !interval.is_zero() {
				thread::sleep(interval);
			}
		}

		self.state = RunState::Stopped;
		render::draw_dna(&mut self.surface, &self.best);
		log::info!(
			"Stopped after {} steps at generation {}: fitness {:.2}%, {} bases, {:.3} secs.",
			self.ctx.steps,
			self.ctx.generation,
			fitness::as_percent(self.ctx.fitness),
			self.best.len(),
			self.ctx.elapsed().as_secs_f64(),
		);

		if let Some(outdir) = &self.outdir {
			std::fs::create_dir_all(outdir)?;
			for r in &mut self.results {
				r.finalize(&mut self.ctx, &self.best, outdir)?;
			}
			log::info!("Results are in ./{}", outdir.to_string_lossy());
		}
		Ok(())
	}
}
