//! DNA Genome and gene extraction

use std::{
	fmt::{self, Display},
	ops::{Deref, DerefMut},
	str::FromStr,
};

use derive_more::derive::{From, Into};
use eyre::{eyre, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::code::{Base, Codon};

/// Genome used when a run starts from nothing. Encodes one small gene.
pub const DEFAULT_SEED: &str = "ATGGATTCGGCTGTAAACGATACTCTACGGCAGTACTGA";

/// A genome: an ordered sequence of bases. Only some regions of it (genes) are expressed.
#[derive(Debug, Default, Clone, PartialEq, Eq, Hash, From, Into)]
pub struct Dna(Vec<Base>);

impl Dna {
	pub fn new() -> Self {
		Self::default()
	}

	/// The default seed genome. See [`DEFAULT_SEED`].
	pub fn seed() -> Self {
		DEFAULT_SEED.parse().expect("seed genome is valid")
	}

	/// Drops bases from the front until at most `max_len` remain.
	pub fn truncate_front(&mut self, max_len: usize) {
		if self.0.len() > max_len {
			let excess = self.0.len() - max_len;
			self.0.drain(..excess);
		}
	}

	/// All genes in this genome, left to right. See [`Genes`].
	pub fn genes(&self) -> Genes<'_> {
		Genes::new(&self.0)
	}

	/// A copy of this genome with every non-coding region removed.
	pub fn clean(&self) -> Dna {
		let mut out = Vec::with_capacity(self.0.len());
		for gene in self.genes() {
			out.extend_from_slice(gene.bases());
		}
		Dna(out)
	}
}

impl Deref for Dna {
	type Target = Vec<Base>;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}

impl DerefMut for Dna {
	fn deref_mut(&mut self) -> &mut Self::Target {
		&mut self.0
	}
}

impl FromIterator<Base> for Dna {
	fn from_iter<I: IntoIterator<Item = Base>>(iter: I) -> Self {
		Dna(iter.into_iter().collect())
	}
}

/// Parses text over `ACGT`. Whitespace is skipped (genomes are often wrapped), anything else is an error.
impl FromStr for Dna {
	type Err = eyre::Report;

	fn from_str(s: &str) -> Result<Self> {
		s.chars()
			.enumerate()
			.filter(|(_, c)| !c.is_ascii_whitespace())
			.map(|(i, c)| {
				Base::from_char(c).ok_or_else(|| eyre!("invalid base '{c}' at position {i}"))
			})
			.collect()
	}
}

impl Display for Dna {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		for b in &self.0 {
			write!(f, "{b}")?;
		}
		Ok(())
	}
}

impl Serialize for Dna {
	fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		serializer.collect_str(self)
	}
}

impl<'de> Deserialize<'de> for Dna {
	fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
		let s = String::deserialize(deserializer)?;
		s.parse().map_err(serde::de::Error::custom)
	}
}

/// An expressed region of a genome: a start codon, whole codons, then the first stop codon in frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Gene<'a> {
	/// offset of the start codon within the genome
	pub offset: usize,
	bases: &'a [Base],
}

impl<'a> Gene<'a> {
	/// All bases of the gene, start and stop codons included.
	pub fn bases(&self) -> &'a [Base] {
		self.bases
	}

	pub fn len(&self) -> usize {
		self.bases.len()
	}

	pub fn is_empty(&self) -> bool {
		self.bases.is_empty()
	}

	pub fn codons(&self) -> impl Iterator<Item = Codon> + 'a {
		self.bases.chunks_exact(3).filter_map(Codon::read)
	}

	/// Codon values of the gene, excluding the terminal stop codon.
	pub fn amino_acids(&self) -> Vec<u8> {
		let n = self.bases.len() / 3 - 1;
		self.codons().take(n).map(Codon::value).collect()
	}
}

impl Display for Gene<'_> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		for b in self.bases {
			write!(f, "{b}")?;
		}
		Ok(())
	}
}

/// Left-to-right scanner over a genome yielding non-overlapping [`Gene`]s.
///
/// At each position a start codon opens a gene, which is closed by the nearest in-frame stop codon.
/// After a gene the scan resumes right behind its stop codon. A start codon with no stop codon
/// downstream yields nothing and the scan moves on by one base.
pub struct Genes<'a> {
	bases: &'a [Base],
	pos: usize,
	/// reading frames (offset mod 3) with no stop codon left ahead; stays true as `pos` advances
	dead_frames: [bool; 3],
}

impl<'a> Genes<'a> {
	fn new(bases: &'a [Base]) -> Self {
		Self {
			bases,
			pos: 0,
			dead_frames: [false; 3],
		}
	}

	/// Offset of the first in-frame stop codon at or after `from`, if any.
	fn find_stop(&self, from: usize) -> Option<usize> {
		(from..)
			.step_by(3)
			.map_while(|i| Codon::read(&self.bases[i..]).map(|c| (i, c)))
			.find(|(_, c)| c.is_stop())
			.map(|(i, _)| i)
	}
}

impl<'a> Iterator for Genes<'a> {
	type Item = Gene<'a>;

	fn next(&mut self) -> Option<Self::Item> {
		while self.pos + 3 <= self.bases.len() {
			let start = self.pos;
			let frame = start % 3;
			let is_start = Codon::read(&self.bases[start..]).is_some_and(Codon::is_start);
			if !is_start || self.dead_frames[frame] {
				self.pos += 1;
				continue;
			}
			match self.find_stop(start + 3) {
				Some(stop) => {
					let end = stop + 3;
					self.pos = end;
					return Some(Gene {
						offset: start,
						bases: &self.bases[start..end],
					});
				}
				None => {
					self.dead_frames[frame] = true;
					self.pos += 1;
				}
			}
		}
		None
	}
}
