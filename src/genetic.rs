//! Evolutionary Operator Types

use std::path::Path;

use eyre::Result;
use rand::Rng;

/// Runtime context of an evolutionary run, handed to every operator.
pub trait AsContext {
	/// Get the RNG
	fn rng(&mut self) -> &mut impl Rng;

	/// Number of accepted generations so far
	fn generation(&self) -> usize;

	/// Number of steps (accepted or not) so far
	fn steps(&self) -> usize;

	/// Fitness of the current best individual
	fn fitness(&self) -> f64;
}

/// The mutation operator. Consumes an individual and produces a (possibly) changed one.
pub trait Mutator<G, C>
where
	C: AsContext,
{
	fn mutate(&self, ctx: &mut C, indiv: G) -> G;
}

/// View and determine something about a run in progress. Used for stop conditions.
pub trait Predicate<G, C>
where
	C: AsContext,
{
	fn test(&mut self, ctx: &mut C, best: &G) -> bool;
}

/// View a run in progress. Used for logging and checkpoints.
pub trait Peeker<G, C>
where
	C: AsContext,
{
	fn peek(&mut self, ctx: &mut C, best: &G);
}

/// Aggregates any results from the run. Define hooks to record data.
pub trait Results<G, C>
where
	C: AsContext,
{
	/// Called once when the run starts.
	fn initialize(&mut self, _ctx: &mut C) {}

	/// Called once every accepted generation, after the new best has replaced the old one.
	fn record_generation(&mut self, _ctx: &mut C, _best: &G) {}

	/// Called when the run stops. Any output files should be written here.
	fn finalize(&mut self, _ctx: &mut C, _best: &G, _outdir: &Path) -> Result<()> {
		Ok(())
	}
}

/***** Blanket Impls *****/

impl<T, G, C> Predicate<G, C> for T
where
	C: AsContext,
	T: FnMut(&mut C, &G) -> bool,
{
	fn test(&mut self, ctx: &mut C, best: &G) -> bool {
		(self)(ctx, best)
	}
}

impl<T, G, C> Peeker<G, C> for T
where
	C: AsContext,
	T: FnMut(&mut C, &G),
{
	fn peek(&mut self, ctx: &mut C, best: &G) {
		(self)(ctx, best);
	}
}
