//! Trimming options.
//!
//! All policy constants of the matcher and the read pipeline live here so they
//! can be set from the command line. The defaults are chosen so that a probe
//! occurring verbatim at a read end always produces a hit (identity 1.0 clears
//! every threshold, and the end window always spans the full probe).
use crate::error::ConfigError;

/// Knobs consumed by the catalog, matcher, read processor and orchestrator.
#[derive(Clone, Debug, PartialEq)]
pub struct TrimOptions {
    /// Minimum identity (matched bases ÷ probe length) for a hit at the read start.
    pub start_threshold: f64,
    /// Minimum identity for a hit at the read end.
    pub end_threshold: f64,
    /// Minimum identity for an interior hit that splits the read.
    pub middle_threshold: f64,
    /// Minimum identity for a built-in adapter to stay enabled after sampling.
    pub adapter_threshold: f64,
    /// Minimum aligned probe span, as a fraction of the probe length.
    pub min_match_fraction: f64,
    /// Bases added to the probe length to size the start and end windows.
    pub end_margin: usize,
    /// Step of the interior scan. Tiles span `len(P) + 2 × middle_pad` bases,
    /// so any occurrence over at most `len(P) + middle_pad` bases is seen whole.
    pub middle_pad: usize,
    /// Interior hits closer than this collapse into one split point.
    pub min_split_separation: usize,
    pub head_crop: usize,
    pub tail_crop: usize,
    /// Fragments shorter than this are discarded.
    pub min_length: usize,
    /// Fragments longer than this are discarded.
    pub max_length: Option<usize>,
    /// Only emit fragments of reads that had an adapter trimmed or split.
    pub trimmed_only: bool,
    /// Reverse-complement reads that carry the end adapter at their start.
    pub orientation: bool,
    /// Worker pool size; `None` uses every logical core.
    pub threads: Option<usize>,
    /// Reads dispatched to the pool per batch.
    pub chunk_size: usize,
    /// Reads sampled when deciding which built-in sets are present.
    pub check_reads: usize,
    /// Disable built-in sets not found in the sample.
    pub guess_adapters: bool,
}

impl Default for TrimOptions {
    fn default() -> Self {
        TrimOptions {
            start_threshold: 0.75,
            end_threshold: 0.75,
            middle_threshold: 0.90,
            adapter_threshold: 0.90,
            min_match_fraction: 0.5,
            end_margin: 150,
            middle_pad: 50,
            min_split_separation: 50,
            head_crop: 0,
            tail_crop: 0,
            min_length: 1,
            max_length: None,
            trimmed_only: false,
            orientation: false,
            threads: None,
            chunk_size: 2000,
            check_reads: 10_000,
            guess_adapters: true,
        }
    }
}

impl TrimOptions {
    /// Reject option combinations that cannot describe a meaningful run.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("start threshold", self.start_threshold),
            ("end threshold", self.end_threshold),
            ("middle threshold", self.middle_threshold),
            ("adapter threshold", self.adapter_threshold),
            ("min match fraction", self.min_match_fraction),
        ] {
            if !(value > 0.0 && value <= 1.0) {
                return Err(ConfigError::ThresholdOutOfRange { name, value });
            }
        }
        if self.min_length == 0 { return Err(ConfigError::NonPositive("min length")); }
        if let Some(max) = self.max_length {
            if max == 0 { return Err(ConfigError::NonPositive("max length")); }
            if max < self.min_length {
                return Err(ConfigError::LengthRange { min: self.min_length, max });
            }
        }
        if self.threads == Some(0) { return Err(ConfigError::NonPositive("threads")); }
        if self.chunk_size == 0 { return Err(ConfigError::NonPositive("chunk size")); }
        if self.middle_pad == 0 { return Err(ConfigError::NonPositive("middle pad")); }
        Ok(())
    }

    /// Effective worker count.
    pub fn worker_count(&self) -> usize {
        self.threads.unwrap_or_else(num_cpus::get).max(1)
    }
}

#[cfg(test)]
mod options_tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(TrimOptions::default().validate().is_ok());
        assert!(TrimOptions::default().worker_count() >= 1);
    }

    #[test]
    fn rejects_out_of_range_threshold() {
        let o = TrimOptions { middle_threshold: 1.5, ..TrimOptions::default() };
        assert!(matches!(o.validate(), Err(ConfigError::ThresholdOutOfRange { name: "middle threshold", .. })));
        let o = TrimOptions { start_threshold: 0.0, ..TrimOptions::default() };
        assert!(o.validate().is_err());
    }

    #[test]
    fn rejects_non_positive_lengths() {
        let o = TrimOptions { min_length: 0, ..TrimOptions::default() };
        assert_eq!(o.validate(), Err(ConfigError::NonPositive("min length")));
        let o = TrimOptions { min_length: 500, max_length: Some(100), ..TrimOptions::default() };
        assert_eq!(o.validate(), Err(ConfigError::LengthRange { min: 500, max: 100 }));
        let o = TrimOptions { threads: Some(0), ..TrimOptions::default() };
        assert!(o.validate().is_err());
        let o = TrimOptions { middle_pad: 0, ..TrimOptions::default() };
        assert_eq!(o.validate(), Err(ConfigError::NonPositive("middle pad")));
    }
}
