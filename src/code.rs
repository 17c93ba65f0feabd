//! The Genetic Code: bases, codons and their amino-acid values.

use derive_more::derive::Display;
use eyre::{eyre, Result};
use rand::{
	distr::{Distribution, StandardUniform},
	Rng,
};

/// A single symbol of the genome alphabet.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum Base {
	#[display("A")]
	A = 0,
	#[display("C")]
	C = 1,
	#[display("G")]
	G = 2,
	#[display("T")]
	T = 3,
}

impl Base {
	pub const ALL: [Base; 4] = [Base::A, Base::C, Base::G, Base::T];

	/// Positional weight of this base within a codon (A=0, C=1, G=2, T=3).
	#[inline]
	pub fn value(self) -> u8 {
		self as u8
	}

	pub fn from_char(c: char) -> Option<Self> {
		match c {
			'A' => Some(Base::A),
			'C' => Some(Base::C),
			'G' => Some(Base::G),
			'T' => Some(Base::T),
			_ => None,
		}
	}

	pub fn as_char(self) -> char {
		match self {
			Base::A => 'A',
			Base::C => 'C',
			Base::G => 'G',
			Base::T => 'T',
		}
	}
}

impl TryFrom<char> for Base {
	type Error = eyre::Report;

	fn try_from(c: char) -> Result<Self> {
		Base::from_char(c).ok_or_else(|| eyre!("'{c}' is not a base (expected one of A, C, G, T)"))
	}
}

/// Uniform over the four bases.
impl Distribution<Base> for StandardUniform {
	fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Base {
		Base::ALL[rng.random_range(0..Base::ALL.len())]
	}
}

/// Three consecutive bases, the unit of translation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Codon(pub [Base; 3]);

/// Marks the beginning of a gene.
pub const START: Codon = Codon([Base::A, Base::T, Base::G]);

/// Any of these ends a gene.
pub const STOPS: [Codon; 3] = [
	Codon([Base::T, Base::A, Base::A]),
	Codon([Base::T, Base::G, Base::A]),
	Codon([Base::T, Base::A, Base::G]),
];

impl Codon {
	/// Reads the codon at the front of `bases`. `None` if fewer than three bases remain.
	pub fn read(bases: &[Base]) -> Option<Self> {
		match bases {
			[a, b, c, ..] => Some(Codon([*a, *b, *c])),
			_ => None,
		}
	}

	/// Amino-acid value in `0..64`.
	#[inline]
	pub fn value(self) -> u8 {
		let [a, b, c] = self.0;
		16 * a.value() + 4 * b.value() + c.value()
	}

	pub fn is_start(self) -> bool {
		self == START
	}

	pub fn is_stop(self) -> bool {
		STOPS.contains(&self)
	}
}

/// Amino-acid value of a codon. See [`Codon::value`].
pub fn codon_value(codon: [Base; 3]) -> u8 {
	Codon(codon).value()
}

impl std::fmt::Display for Codon {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let [a, b, c] = self.0;
		write!(f, "{a}{b}{c}")
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn codon_values_span_the_code() {
		assert_eq!(codon_value([Base::A, Base::A, Base::A]), 0);
		assert_eq!(codon_value([Base::T, Base::T, Base::T]), 63);
		assert_eq!(codon_value([Base::A, Base::T, Base::G]), 14);
		assert_eq!(codon_value([Base::C, Base::A, Base::A]), 16);

		let mut seen = [false; 64];
		for a in Base::ALL {
			for b in Base::ALL {
				for c in Base::ALL {
					seen[codon_value([a, b, c]) as usize] = true;
				}
			}
		}
		assert!(seen.iter().all(|&s| s), "every value in 0..64 has a codon");
	}

	#[test]
	fn start_and_stops() {
		assert!(START.is_start());
		assert!(!START.is_stop());
		for stop in STOPS {
			assert!(stop.is_stop());
			assert_eq!(stop.0[0], Base::T);
		}
		assert_eq!(START.to_string(), "ATG");
	}
}
