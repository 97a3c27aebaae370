#![forbid(unsafe_code)]
//! # porkchop-trim
//!
//! Find and remove Oxford Nanopore **adapter** sequences from long reads: trim
//! them off read ends, split chimeric reads at interior adapters, optionally
//! reorient reads sequenced from the reverse strand, then crop and filter the
//! resulting fragments.
//!
//! ## Highlights
//! - 🧬 **Built-in adapter sets** with provenance, plus custom `(start, end, label)` adapters.
//! - 🎯 **Local alignment** of every probe against fixed end windows; interior
//!   scans align over overlapping tiles of the body.
//! - 🧵 **Parallel, order-preserving**: reads are processed on a Rayon pool and
//!   written back in input order.
//! - 📊 **Exact accounting**: per-adapter read and base counts, text or JSON.
//!
//! ## Layout
//! - [`kit`]: adapters, probes, reads and fragments.
//! - [`catalog`]: validated adapter catalog and adapter-set guessing.
//! - [`detect`]: the probe matcher.
//! - [`process`]: the per-read pipeline.
//! - [`pipeline`]: parallel orchestration.
//! - [`stats`]: counters and the final report.
//! - [`seqio`]: FASTA/FASTQ input and output.
//!
//! ## Examples
//! ```rust
//! use porkchop_trim::{catalog::Catalog, kit::Read, options::TrimOptions, pipeline::Trimmer};
//!
//! let opts = TrimOptions { threads: Some(1), ..Default::default() };
//! let catalog = Catalog::builder()
//!     .custom("AATGTACTTCGTTCAGTTACGTATTGCT", "GCAATACGTAACTGAACGAAGT", "Y-adapter")
//!     .build(&opts)
//!     .unwrap();
//! let trimmer = Trimmer::new(catalog, opts).unwrap();
//!
//! let read = Read::new("r1", b"AATGTACTTCGTTCAGTTACGTATTGCTACGTTGCAAGGTC".to_vec(), None);
//! let (fragments, stats) = trimmer.process_chunk(0, &[read]);
//! assert_eq!(fragments[0].seq, b"ACGTTGCAAGGTC".to_vec());
//! assert_eq!(stats.start_trimmed_bp, 28);
//! ```
//!
//! ## Version
//! This build is "0.1.0".

pub mod catalog;
pub mod detect;
pub mod error;
pub mod kit;
pub mod options;
pub mod pipeline;
pub mod process;
pub mod seqio;
pub mod stats;
pub mod data { pub mod adapters; }

use data::adapters::{AdapterSet, ADAPTER_SETS};

/// Return the static registry of built-in adapter sets.
pub fn list_adapter_sets() -> &'static [AdapterSet] { ADAPTER_SETS }

/// Look up a built-in adapter set by name.
///
/// Names are case-insensitive.
///
/// # Examples
/// ```rust
/// let s = porkchop_trim::get_adapter_set("sqk-nsk007").unwrap();
/// assert_eq!(s.start, "AATGTACTTCGTTCAGTTACGTATTGCT");
/// assert!(porkchop_trim::get_adapter_set("SQK-XYZ000").is_none());
/// ```
pub fn get_adapter_set(name: &str) -> Option<&'static AdapterSet> {
    ADAPTER_SETS.iter().find(|s| s.name.eq_ignore_ascii_case(name))
}

/// Crate version string (from `CARGO_PKG_VERSION`).
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
