//! Core types for **adapters**, **probes**, **reads** and **fragments**.
//!
//! This module holds the data model used across the crate. Adapter definitions
//! are built once when the [`crate::catalog::Catalog`] is assembled and never
//! change afterwards; reads are owned by exactly one worker at a time and are
//! replaced by zero or more [`Fragment`]s.
//!
//! # Quality invariant
//! Whenever a [`Read`] or [`Fragment`] carries a quality string, its length is
//! equal to the sequence length. Every transformation in this crate goes
//! through [`Read::slice`], [`Read::reverse_complement`] or [`Fragment::crop`],
//! which keep both strings in lockstep.
use core::fmt;
use core::ops::Range;

use bio::alphabets::dna;
use serde::Serialize;

/// Where an adapter definition came from.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Origin {
    /// One of the named sets compiled into this crate (see [`crate::data::adapters`]).
    BuiltIn,
    /// Supplied on the command line as `(start, end, label)`.
    Custom,
}

/// An adapter: a named pair of probes expected at the 5′ and 3′ ends of a read.
#[derive(Clone, Debug, PartialEq)]
pub struct AdapterDefinition {
    /// Unique label; the report prints `<name>_(start)` and `<name>_(end)`.
    pub name: String,
    /// Uppercase probe expected at the start of a read.
    pub start_probe: Vec<u8>,
    /// Uppercase probe expected at the end of a read.
    pub end_probe: Vec<u8>,
    /// Built-in or custom.
    pub origin: Origin,
    /// Disabled adapters are skipped by every matcher.
    pub enabled: bool,
}

/// Which end of an adapter a probe was taken from.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProbeEnd { Start, End }

impl fmt::Display for ProbeEnd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProbeEnd::Start => f.write_str("start"),
            ProbeEnd::End => f.write_str("end"),
        }
    }
}

/// Orientation of a probe relative to the adapter as given.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Strand {
    /// The probe bytes as supplied.
    Forward,
    /// The reverse complement; a hit signals a read sequenced on the other strand.
    Reverse,
}

/// A single sequence tested against reads.
///
/// Built-in, custom, forward and derived reverse-complement probes all share
/// this one record; nothing downstream cares where a probe came from beyond
/// these tags.
#[derive(Clone, Debug)]
pub struct Probe {
    /// Index of the owning adapter in the catalog.
    pub adapter: usize,
    pub end: ProbeEnd,
    pub strand: Strand,
    pub seq: Vec<u8>,
}

impl Probe {
    pub fn len(&self) -> usize { self.seq.len() }
    pub fn is_empty(&self) -> bool { self.seq.is_empty() }
}

/// The part of a read a match was searched in.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Context { Start, End, Middle }

/// An accepted approximate occurrence of a probe in a read.
#[derive(Clone, Debug, PartialEq)]
pub struct MatchHit {
    /// Index of the adapter in the catalog.
    pub adapter: usize,
    /// Adapter end the matching probe came from.
    pub probe_end: ProbeEnd,
    pub strand: Strand,
    pub context: Context,
    /// Start index (0-based) of the consumed span in read coordinates.
    pub start: usize,
    /// End index (exclusive) of the consumed span in read coordinates.
    pub end: usize,
    /// Number of probe bases aligned to an equal read base.
    pub matched: usize,
    /// Length of the probe that produced the hit.
    pub probe_len: usize,
    /// `matched / probe_len`.
    pub identity: f64,
    /// Alignment score behind the hit.
    pub score: i32,
}

impl MatchHit {
    pub fn span(&self) -> Range<usize> { self.start..self.end }
}

/// A sequencing record as handed over by the IO boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Read {
    pub id: String,
    pub seq: Vec<u8>,
    pub qual: Option<Vec<u8>>,
}

impl Read {
    pub fn new(id: impl Into<String>, seq: impl Into<Vec<u8>>, qual: Option<Vec<u8>>) -> Self {
        Read { id: id.into(), seq: seq.into(), qual }
    }

    pub fn len(&self) -> usize { self.seq.len() }
    pub fn is_empty(&self) -> bool { self.seq.is_empty() }

    /// Copy `range` of sequence and quality into a fragment carrying `id`.
    pub fn slice(&self, range: Range<usize>, id: impl Into<String>) -> Fragment {
        Fragment {
            id: id.into(),
            seq: self.seq[range.clone()].to_vec(),
            qual: self.qual.as_ref().map(|q| q[range].to_vec()),
        }
    }

    /// Reverse-complement the sequence and reverse the quality string in place.
    pub fn reverse_complement(&mut self) {
        self.seq = reverse_complement(&self.seq);
        if let Some(q) = self.qual.as_mut() { q.reverse(); }
    }

    /// The whole read as a single fragment with its original id.
    pub fn into_fragment(self) -> Fragment {
        Fragment { id: self.id, seq: self.seq, qual: self.qual }
    }
}

/// A contiguous piece of a read that survived trimming and splitting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    /// Original read id, or `<id>_<k>` when the read was split.
    pub id: String,
    pub seq: Vec<u8>,
    pub qual: Option<Vec<u8>>,
}

impl Fragment {
    pub fn len(&self) -> usize { self.seq.len() }
    pub fn is_empty(&self) -> bool { self.seq.is_empty() }

    /// Remove `head` bases from the start and `tail` bases from the end.
    /// Returns the number of bases actually removed; a crop longer than the
    /// fragment empties it.
    pub fn crop(&mut self, head: usize, tail: usize) -> usize {
        let n = self.seq.len();
        if head == 0 && tail == 0 { return 0; }
        if head + tail >= n {
            self.seq.clear();
            if let Some(q) = self.qual.as_mut() { q.clear(); }
            return n;
        }
        let keep = head..n - tail;
        self.seq = self.seq[keep.clone()].to_vec();
        if let Some(q) = self.qual.as_mut() { *q = q[keep].to_vec(); }
        head + tail
    }
}

/// Reverse complement of a nucleotide string. `N` maps to `N`.
#[inline]
pub fn reverse_complement(seq: &[u8]) -> Vec<u8> {
    dna::revcomp(seq)
}

#[cfg(test)]
mod kit_tests {
    use super::*;

    #[test]
    fn reverse_complement_twice_is_identity() {
        let s = b"ACGTTGCANNACG".to_vec();
        assert_eq!(reverse_complement(&reverse_complement(&s)), s);
        assert_eq!(reverse_complement(b"AACG"), b"CGTT".to_vec());
    }

    #[test]
    fn reverse_complement_read_keeps_quality_in_lockstep() {
        let mut r = Read::new("r", b"AACG".to_vec(), Some(b"!#%'".to_vec()));
        r.reverse_complement();
        assert_eq!(r.seq, b"CGTT");
        assert_eq!(r.qual.as_deref(), Some(&b"'%#!"[..]));
    }

    #[test]
    fn slice_and_crop_keep_lengths_equal() {
        let r = Read::new("r", b"ACGTACGTAC".to_vec(), Some(b"0123456789".to_vec()));
        let mut f = r.slice(2..9, "r_1");
        assert_eq!(f.seq, b"GTACGTA");
        assert_eq!(f.qual.as_deref(), Some(&b"2345678"[..]));
        assert_eq!(f.crop(1, 2), 3);
        assert_eq!(f.seq, b"TACG");
        assert_eq!(f.qual.as_ref().map(|q| q.len()), Some(f.seq.len()));
    }

    #[test]
    fn crop_longer_than_fragment_empties_it() {
        let mut f = Read::new("r", b"ACGT".to_vec(), None).into_fragment();
        assert_eq!(f.crop(3, 3), 4);
        assert!(f.is_empty());
    }
}
