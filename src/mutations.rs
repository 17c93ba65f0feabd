//! Structural mutations of a DNA genome

use derive_more::derive::Display;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::{
	code::Base,
	genetic::{AsContext, Mutator},
	genome::Dna,
};

/// Kinds of edit the mutator can make, in the order the weight table is walked.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MutationKind {
	/// replace one base
	#[display("point")]
	PointMutation,
	/// insert a short run of random bases
	#[display("insertion")]
	Insertion,
	/// remove a short run of bases
	#[display("deletion")]
	Deletion,
	/// copy a short run of bases next to itself
	#[display("duplication")]
	Duplication,
}

impl MutationKind {
	pub const ALL: [MutationKind; 4] = [
		MutationKind::PointMutation,
		MutationKind::Insertion,
		MutationKind::Deletion,
		MutationKind::Duplication,
	];
}

/// Relative weights of each [`MutationKind`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MutationWeights {
	pub point: u32,
	pub insertion: u32,
	pub deletion: u32,
	pub duplication: u32,
}

impl Default for MutationWeights {
	fn default() -> Self {
		Self {
			point: 990,
			insertion: 4,
			deletion: 5,
			duplication: 1,
		}
	}
}

impl MutationWeights {
	/// The weight table in declaration order.
	pub fn table(&self) -> [(MutationKind, u32); 4] {
		[
			(MutationKind::PointMutation, self.point),
			(MutationKind::Insertion, self.insertion),
			(MutationKind::Deletion, self.deletion),
			(MutationKind::Duplication, self.duplication),
		]
	}

	pub fn total(&self) -> u32 {
		self.table().iter().map(|(_, w)| w).sum()
	}

	/// Weighted random choice of a mutation kind. See [`weighted_choice`].
	pub fn choose(&self, rng: &mut impl Rng) -> MutationKind {
		weighted_choice(&self.table(), rng)
	}
}

/// Picks an entry of `table` with probability proportional to its weight.
///
/// Draws `r` uniformly from `0..total` and walks the table in order, subtracting each weight from `r`
/// until it falls inside an entry. Panics if all weights are zero.
pub fn weighted_choice<T: Copy>(table: &[(T, u32)], rng: &mut impl Rng) -> T {
	let total: u32 = table.iter().map(|(_, w)| w).sum();
	assert!(total > 0, "weight table must have a positive total");
	let mut r = rng.random_range(0..total);
	for &(item, weight) in table {
		if r < weight {
			return item;
		}
		r -= weight;
	}
	unreachable!("draw is below the total weight")
}

/// Size distribution of an edit: `ceil(scale * u^exponent)` for `u` uniform in `[0, 1)`, at least 1.
///
/// Large exponents bias the size heavily toward 1.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Magnitude {
	pub scale: f64,
	pub exponent: i32,
}

impl Magnitude {
	pub const fn new(scale: f64, exponent: i32) -> Self {
		Self { scale, exponent }
	}

	pub fn sample(&self, rng: &mut impl Rng) -> usize {
		let u: f64 = rng.random();
		((self.scale * u.powi(self.exponent)).ceil() as usize).max(1)
	}

	/// Non-negative finite scale and exponent. Anything else can sample unbounded sizes.
	pub fn is_valid(&self) -> bool {
		self.scale.is_finite() && self.scale >= 0.0 && self.exponent >= 0
	}

	/// Largest size this can produce.
	pub fn max(&self) -> usize {
		(self.scale.ceil() as usize).max(1)
	}
}

/// Parameters of the DNA mutator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MutationParams {
	pub weights: MutationWeights,
	/// number of edits per mutation
	pub edit_count: Magnitude,
	pub insertion: Magnitude,
	pub deletion: Magnitude,
	pub duplication: Magnitude,
}

impl Default for MutationParams {
	fn default() -> Self {
		Self {
			weights: MutationWeights::default(),
			edit_count: Magnitude::new(10.0, 10),
			insertion: Magnitude::new(10.0, 2),
			deletion: Magnitude::new(10.0, 2),
			duplication: Magnitude::new(20.0, 4),
		}
	}
}

impl MutationParams {
	/// Every magnitude is valid and at least one edit kind has weight.
	pub fn is_valid(&self) -> bool {
		self.weights.total() > 0
			&& [self.edit_count, self.insertion, self.deletion, self.duplication]
				.iter()
				.all(Magnitude::is_valid)
	}
}

/// Applies a random batch of weighted edits to a genome, then cuts it to a maximum length.
#[derive(Debug, Clone)]
pub struct DnaMutator {
	pub params: MutationParams,
	pub max_len: usize,
}

impl DnaMutator {
	pub fn new(params: MutationParams, max_len: usize) -> Self {
		Self { params, max_len }
	}

	/// Applies one edit of the given kind at offset `i`. Offsets past the end are clamped.
	pub fn apply(&self, kind: MutationKind, dna: &mut Dna, i: usize, rng: &mut impl Rng) {
		let i = i.min(dna.len());
		match kind {
			MutationKind::PointMutation => {
				let base: Base = rng.random();
				match dna.get_mut(i) {
					Some(b) => *b = base,
					None => dna.push(base), // only on an empty genome
				}
			}
			MutationKind::Insertion => {
				let len = self.params.insertion.sample(rng);
				let run: Vec<Base> = (0..len).map(|_| rng.random()).collect();
				let _: Vec<_> = dna.splice(i..i, run).collect();
			}
			MutationKind::Deletion => {
				let len = self.params.deletion.sample(rng);
				let end = (i + len).min(dna.len());
				dna.drain(i..end);
			}
			MutationKind::Duplication => {
				// tandem duplication: the copy goes right in front of its original
				let len = self.params.duplication.sample(rng);
				let end = (i + len).min(dna.len());
				let copy = dna[i..end].to_vec();
				let _: Vec<_> = dna.splice(i..i, copy).collect();
			}
		}
	}
}

impl<C: AsContext> Mutator<Dna, C> for DnaMutator {
	fn mutate(&self, ctx: &mut C, mut indiv: Dna) -> Dna {
		let rng = ctx.rng();
		let n = self.params.edit_count.sample(rng);
		for _ in 0..n {
			let i = if indiv.is_empty() {
				0
			} else {
				rng.random_range(0..indiv.len())
			};
			let kind = self.params.weights.choose(rng);
			log::trace!("{kind} mutation at {i} (len {})", indiv.len());
			self.apply(kind, &mut indiv, i, rng);
		}
		indiv.truncate_front(self.max_len);
		indiv
	}
}
