//! Run statistics and the text/JSON report.
//!
//! Every read produces its own [`RunStatistics`] tally; the orchestrator folds
//! them together with [`RunStatistics::merge`]. All counters are plain sums, so
//! merging is associative and commutative and the final report does not
//! depend on which worker finished first.
use core::fmt;
use core::ops::AddAssign;

use serde::Serialize;

use crate::catalog::Catalog;

/// Trim counters of one adapter.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct AdapterCounts {
    pub start_reads: u64,
    pub start_bp: u64,
    pub end_reads: u64,
    pub end_bp: u64,
}

impl AddAssign<&AdapterCounts> for AdapterCounts {
    fn add_assign(&mut self, o: &AdapterCounts) {
        self.start_reads += o.start_reads;
        self.start_bp += o.start_bp;
        self.end_reads += o.end_reads;
        self.end_bp += o.end_bp;
    }
}

/// Counters for a single read or for a whole run.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct RunStatistics {
    /// Input reads seen.
    pub reads: u64,
    /// Indexed by adapter position in the catalog.
    pub per_adapter: Vec<AdapterCounts>,
    pub start_trimmed_reads: u64,
    pub start_trimmed_bp: u64,
    pub end_trimmed_reads: u64,
    pub end_trimmed_bp: u64,
    pub reversed_reads: u64,
    pub split_reads: u64,
    pub fragments_emitted: u64,
    /// Fragments dropped for being empty, outside the length range, or untrimmed in trimmed-only mode.
    pub discarded_fragments: u64,
    pub cropped_bp: u64,
    /// Reads emitted unmodified because processing them failed.
    pub passed_through: u64,
}

impl RunStatistics {
    fn adapter_mut(&mut self, adapter: usize) -> &mut AdapterCounts {
        if self.per_adapter.len() <= adapter {
            self.per_adapter.resize(adapter + 1, AdapterCounts::default());
        }
        &mut self.per_adapter[adapter]
    }

    pub fn record_start_trim(&mut self, adapter: usize, bp: usize) {
        let c = self.adapter_mut(adapter);
        c.start_reads += 1;
        c.start_bp += bp as u64;
        self.start_trimmed_reads += 1;
        self.start_trimmed_bp += bp as u64;
    }

    pub fn record_end_trim(&mut self, adapter: usize, bp: usize) {
        let c = self.adapter_mut(adapter);
        c.end_reads += 1;
        c.end_bp += bp as u64;
        self.end_trimmed_reads += 1;
        self.end_trimmed_bp += bp as u64;
    }

    /// Counters of one adapter; zero when it never matched.
    pub fn adapter(&self, adapter: usize) -> AdapterCounts {
        self.per_adapter.get(adapter).cloned().unwrap_or_default()
    }

    /// Fold `other` into `self`.
    pub fn merge(&mut self, other: &RunStatistics) {
        if self.per_adapter.len() < other.per_adapter.len() {
            self.per_adapter.resize(other.per_adapter.len(), AdapterCounts::default());
        }
        for (a, b) in self.per_adapter.iter_mut().zip(&other.per_adapter) {
            *a += b;
        }
        self.reads += other.reads;
        self.start_trimmed_reads += other.start_trimmed_reads;
        self.start_trimmed_bp += other.start_trimmed_bp;
        self.end_trimmed_reads += other.end_trimmed_reads;
        self.end_trimmed_bp += other.end_trimmed_bp;
        self.reversed_reads += other.reversed_reads;
        self.split_reads += other.split_reads;
        self.fragments_emitted += other.fragments_emitted;
        self.discarded_fragments += other.discarded_fragments;
        self.cropped_bp += other.cropped_bp;
        self.passed_through += other.passed_through;
    }
}

impl AddAssign<&RunStatistics> for RunStatistics {
    fn add_assign(&mut self, other: &RunStatistics) { self.merge(other) }
}

impl core::iter::Sum for RunStatistics {
    fn sum<I: Iterator<Item = RunStatistics>>(iter: I) -> Self {
        iter.fold(RunStatistics::default(), |mut acc, s| { acc.merge(&s); acc })
    }
}

/// Human-readable summary of a finished run.
pub struct Report<'a> {
    pub stats: &'a RunStatistics,
    pub catalog: &'a Catalog,
}

impl fmt::Display for Report<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = self.stats;
        writeln!(f, "Trimming adapters from read ends")?;
        for (i, a) in self.catalog.adapters().iter().enumerate() {
            if !a.enabled { continue; }
            let c = s.adapter(i);
            writeln!(f, "  {}_(start): {} reads, {} bp", a.name, c.start_reads, c.start_bp)?;
            writeln!(f, "  {}_(end): {} reads, {} bp", a.name, c.end_reads, c.end_bp)?;
        }
        writeln!(f)?;
        writeln!(f, "{} / {} reads had adapters trimmed from their start ({} bp removed)", s.start_trimmed_reads, s.reads, s.start_trimmed_bp)?;
        writeln!(f, "{} / {} reads had adapters trimmed from their end ({} bp removed)", s.end_trimmed_reads, s.reads, s.end_trimmed_bp)?;
        writeln!(f, "{} bp are removed due to cropping.", s.cropped_bp)?;
        writeln!(f, "{} sequences are reversed.", s.reversed_reads)?;
        writeln!(f, "{} sequences are discarded due not meeting filter requirements", s.discarded_fragments)?;
        if s.passed_through > 0 {
            writeln!(f, "{} reads were passed through unmodified after a processing fault", s.passed_through)?;
        }
        writeln!(f)?;
        writeln!(f, "Splitting reads containing middle adapters")?;
        writeln!(f, "{} / {} reads were split based on middle adapters", s.split_reads, s.reads)
    }
}

#[derive(Serialize)]
struct NamedCounts<'a> {
    name: &'a str,
    origin: crate::kit::Origin,
    #[serde(flatten)]
    counts: AdapterCounts,
}

#[derive(Serialize)]
struct JsonReport<'a> {
    adapters: Vec<NamedCounts<'a>>,
    #[serde(flatten)]
    totals: &'a RunStatistics,
}

impl Report<'_> {
    /// The same numbers as the text report, keyed by adapter name.
    pub fn to_json(&self) -> serde_json::Result<String> {
        let adapters = self
            .catalog
            .adapters()
            .iter()
            .enumerate()
            .filter(|(_, a)| a.enabled)
            .map(|(i, a)| NamedCounts { name: &a.name, origin: a.origin, counts: self.stats.adapter(i) })
            .collect();
        serde_json::to_string_pretty(&JsonReport { adapters, totals: self.stats })
    }
}
