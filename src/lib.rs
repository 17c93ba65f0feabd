//! Evolving DNA that paints: genomes over `ACGT` are translated into translucent polygons, and a hill
//! climber mutates them until the painting looks like a target image.

pub mod code;
pub mod evolve;
pub mod fitness;
pub mod genetic;
pub mod genome;
pub mod mutations;
pub mod params;
pub mod protein;
pub mod render;
pub mod target;

pub mod prelude {
	pub use crate::code::{codon_value, Base, Codon};
	pub use crate::evolve::{
		results::History, Acceptance, Context, Decision, RunState, Simulation, Step, StopHandle,
	};
	pub use crate::fitness::{evaluate, Raster};
	pub use crate::genetic::{AsContext, Mutator, Peeker, Predicate, Results};
	pub use crate::genome::{Dna, Gene};
	pub use crate::mutations::{DnaMutator, MutationKind, MutationParams};
	pub use crate::params::{EvolveConfig, EvolveParams};
	pub use crate::protein::{Hsla, Polygon};
	pub use crate::render::{RenderSurface, SkiaSurface};
}
