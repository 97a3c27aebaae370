//! The adapter catalog: every probe tested against every read.
//!
//! A [`Catalog`] is assembled once from built-in sets and custom adapters,
//! validated, optionally narrowed to the built-in sets actually present in a
//! sample of reads, and then shared read-only by all workers.
use rayon::prelude::*;

use crate::detect::Matcher;
use crate::error::ConfigError;
use crate::kit::{reverse_complement, AdapterDefinition, Origin, Probe, ProbeEnd, Read, Strand};
use crate::options::TrimOptions;

/// Collects adapter selections before validation.
#[derive(Clone, Debug, Default)]
pub struct CatalogBuilder {
    sets: Vec<String>,
    custom: Vec<(String, String, String)>,
}

impl CatalogBuilder {
    /// Select a built-in set by name (case-insensitive).
    pub fn adapter_set(mut self, name: impl Into<String>) -> Self {
        self.sets.push(name.into());
        self
    }

    /// Add a custom adapter from its start probe, end probe and label.
    pub fn custom(mut self, start: impl Into<String>, end: impl Into<String>, label: impl Into<String>) -> Self {
        self.custom.push((start.into(), end.into(), label.into()));
        self
    }

    /// Validate every adapter and derive the probe lists.
    ///
    /// With no set named and no custom adapter, every built-in set is loaded.
    /// With custom adapters only, no built-in set is loaded.
    pub fn build(self, opts: &TrimOptions) -> Result<Catalog, ConfigError> {
        let mut adapters: Vec<AdapterDefinition> = Vec::new();

        if self.sets.is_empty() && self.custom.is_empty() {
            for s in crate::list_adapter_sets() {
                adapters.push(definition(s.name, s.start, s.end, Origin::BuiltIn)?);
            }
        }
        for name in &self.sets {
            let s = crate::get_adapter_set(name).ok_or_else(|| ConfigError::UnknownSet(name.clone()))?;
            adapters.push(definition(s.name, s.start, s.end, Origin::BuiltIn)?);
        }
        for (start, end, label) in &self.custom {
            adapters.push(definition(label, start, end, Origin::Custom)?);
        }

        let mut seen = std::collections::HashSet::new();
        for a in &adapters {
            if !seen.insert(a.name.as_str()) {
                return Err(ConfigError::DuplicateLabel(a.name.clone()));
            }
        }
        if adapters.is_empty() { return Err(ConfigError::NoAdapters); }

        Ok(Catalog::from_definitions(adapters, opts))
    }
}

fn normalize_probe(label: &str, end: &'static str, probe: &str) -> Result<Vec<u8>, ConfigError> {
    if probe.is_empty() {
        return Err(ConfigError::EmptyProbe { label: label.to_string(), end });
    }
    probe
        .bytes()
        .enumerate()
        .map(|(pos, b)| match b.to_ascii_uppercase() {
            u @ (b'A' | b'C' | b'G' | b'T' | b'N') => Ok(u),
            _ => Err(ConfigError::InvalidBase { label: label.to_string(), end, base: b as char, pos }),
        })
        .collect()
}

fn definition(label: &str, start: &str, end: &str, origin: Origin) -> Result<AdapterDefinition, ConfigError> {
    if label.trim().is_empty() { return Err(ConfigError::EmptyLabel); }
    Ok(AdapterDefinition {
        name: label.to_string(),
        start_probe: normalize_probe(label, "start", start)?,
        end_probe: normalize_probe(label, "end", end)?,
        origin,
        enabled: true,
    })
}

/// Validated adapters plus the probes derived from them.
pub struct Catalog {
    adapters: Vec<AdapterDefinition>,
    start_probes: Vec<Probe>,
    end_probes: Vec<Probe>,
    /// `rc(end_probe)` per adapter, searched at the read start. Empty unless
    /// orientation correction is on.
    reverse_start_probes: Vec<Probe>,
    /// `rc(start_probe)` per adapter, searched at the read end.
    reverse_end_probes: Vec<Probe>,
    orientation: bool,
}

impl Catalog {
    pub fn builder() -> CatalogBuilder { CatalogBuilder::default() }

    fn from_definitions(adapters: Vec<AdapterDefinition>, opts: &TrimOptions) -> Self {
        let probe = |adapter: usize, end: ProbeEnd, strand: Strand, seq: Vec<u8>| Probe { adapter, end, strand, seq };
        let (mut start_probes, mut end_probes) = (Vec::new(), Vec::new());
        let (mut reverse_start_probes, mut reverse_end_probes) = (Vec::new(), Vec::new());
        for (i, a) in adapters.iter().enumerate() {
            start_probes.push(probe(i, ProbeEnd::Start, Strand::Forward, a.start_probe.clone()));
            end_probes.push(probe(i, ProbeEnd::End, Strand::Forward, a.end_probe.clone()));
            if opts.orientation {
                reverse_start_probes.push(probe(i, ProbeEnd::End, Strand::Reverse, reverse_complement(&a.end_probe)));
                reverse_end_probes.push(probe(i, ProbeEnd::Start, Strand::Reverse, reverse_complement(&a.start_probe)));
            }
        }
        Catalog {
            adapters,
            start_probes,
            end_probes,
            reverse_start_probes,
            reverse_end_probes,
            orientation: opts.orientation,
        }
    }

    pub fn adapters(&self) -> &[AdapterDefinition] { &self.adapters }

    pub fn adapter(&self, i: usize) -> &AdapterDefinition { &self.adapters[i] }

    /// Names of the adapters that are still enabled, in catalog order.
    pub fn enabled_names(&self) -> Vec<&str> {
        self.adapters.iter().filter(|a| a.enabled).map(|a| a.name.as_str()).collect()
    }

    pub fn orientation(&self) -> bool { self.orientation }

    fn enabled<'s>(&'s self, probes: &'s [Probe]) -> impl Iterator<Item = &'s Probe> + 's {
        probes.iter().filter(move |p| self.adapters[p.adapter].enabled)
    }

    /// Forward start probes of the enabled adapters.
    pub fn start_probes(&self) -> impl Iterator<Item = &Probe> + '_ { self.enabled(&self.start_probes) }

    /// Forward end probes of the enabled adapters.
    pub fn end_probes(&self) -> impl Iterator<Item = &Probe> + '_ { self.enabled(&self.end_probes) }

    /// Reverse-complemented end probes, for the start of a reverse-strand read.
    pub fn reverse_start_probes(&self) -> impl Iterator<Item = &Probe> + '_ { self.enabled(&self.reverse_start_probes) }

    /// Reverse-complemented start probes, for the end of a reverse-strand read.
    pub fn reverse_end_probes(&self) -> impl Iterator<Item = &Probe> + '_ { self.enabled(&self.reverse_end_probes) }

    /// Probes searched in the read interior: forward start then forward end probes.
    pub fn middle_probes(&self) -> impl Iterator<Item = &Probe> + '_ { self.start_probes().chain(self.end_probes()) }

    /// Disable built-in adapters whose probes do not reach `adapter_threshold`
    /// identity in the start or end window of any sampled read. Custom adapters
    /// stay enabled. Returns the names still enabled.
    pub fn retain_present(&mut self, sample: &[Read], opts: &TrimOptions) -> Vec<String> {
        let n = self.adapters.len();
        let margin = opts.end_margin;
        let best = sample
            .par_iter()
            .map_init(Matcher::new, |m, read| {
                let mut scores = vec![0.0f64; n];
                for (i, a) in self.adapters.iter().enumerate() {
                    if a.origin != Origin::BuiltIn || !a.enabled { continue; }
                    let start = &read.seq[..read.len().min(a.start_probe.len() + margin)];
                    let end = &read.seq[read.len().saturating_sub(a.end_probe.len() + margin)..];
                    let mut s = [
                        m.align(&a.start_probe, start),
                        m.align(&a.end_probe, end),
                    ]
                    .iter()
                    .flatten()
                    .map(|w| w.identity)
                    .fold(0.0, f64::max);
                    if self.orientation {
                        let rc_end = &self.reverse_start_probes[i].seq;
                        let rc_start = &self.reverse_end_probes[i].seq;
                        let start = &read.seq[..read.len().min(rc_end.len() + margin)];
                        let end = &read.seq[read.len().saturating_sub(rc_start.len() + margin)..];
                        for w in [m.align(rc_end, start), m.align(rc_start, end)].iter().flatten() {
                            s = s.max(w.identity);
                        }
                    }
                    scores[i] = s;
                }
                scores
            })
            .reduce(|| vec![0.0f64; n], |a, b| a.iter().zip(&b).map(|(x, y)| x.max(*y)).collect());

        for (a, score) in self.adapters.iter_mut().zip(best) {
            if a.origin == Origin::BuiltIn && a.enabled && score < opts.adapter_threshold {
                log::debug!("adapter set {} not found in sample (best identity {:.3})", a.name, score);
                a.enabled = false;
            }
        }
        self.enabled_names().into_iter().map(str::to_string).collect()
    }
}
