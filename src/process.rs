//! Per-read trimming pipeline.
//!
//! One call to [`ReadProcessor::process`] takes a read through
//! start trim (with orientation correction) → end trim → interior split →
//! fixed crop → length/trimmed-only filter, and returns the surviving
//! fragments together with the read's own statistics tally.
//!
//! Nothing in here fails: reads shorter than a probe simply never match.
use core::ops::Range;

use crate::catalog::Catalog;
use crate::detect::{outweighs, Acceptance, Matcher};
use crate::kit::{Fragment, MatchHit, Read};
use crate::options::TrimOptions;
use crate::stats::RunStatistics;

/// What the pipeline decided for one read, kept for logging and tests.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ReadTrace {
    pub start_hit: Option<MatchHit>,
    pub end_hit: Option<MatchHit>,
    pub reversed: bool,
    /// The part of the (reoriented) read left after start and end trimming.
    pub body: Range<usize>,
    /// Interior adapters the read was split at, left to right, after merging.
    pub splits: Vec<MatchHit>,
}

impl ReadTrace {
    /// Whether any adapter was removed from this read.
    pub fn trimmed(&self) -> bool {
        self.start_hit.is_some() || self.end_hit.is_some() || !self.splits.is_empty()
    }
}

/// Fragments to emit for one read plus its statistics tally.
#[derive(Clone, Debug)]
pub struct ReadOutcome {
    pub fragments: Vec<Fragment>,
    pub stats: RunStatistics,
    pub trace: ReadTrace,
}

impl ReadOutcome {
    /// Emit `read` unmodified, as done when processing it failed.
    pub fn passthrough(read: Read) -> Self {
        let body = 0..read.len();
        let stats = RunStatistics { reads: 1, fragments_emitted: 1, passed_through: 1, ..Default::default() };
        ReadOutcome { fragments: vec![read.into_fragment()], stats, trace: ReadTrace { body, ..Default::default() } }
    }
}

/// Runs the pipeline with one reusable aligner; create one per worker.
pub struct ReadProcessor<'a> {
    catalog: &'a Catalog,
    opts: &'a TrimOptions,
    matcher: Matcher,
}

impl<'a> ReadProcessor<'a> {
    pub fn new(catalog: &'a Catalog, opts: &'a TrimOptions) -> Self {
        ReadProcessor { catalog, opts, matcher: Matcher::new() }
    }

    fn rule(&self, min_identity: f64) -> Acceptance {
        Acceptance { min_identity, min_fraction: self.opts.min_match_fraction }
    }

    pub fn process(&mut self, read: &Read) -> ReadOutcome {
        let opts = self.opts;
        let mut stats = RunStatistics { reads: 1, ..Default::default() };
        let mut trace = ReadTrace::default();

        let start_rule = self.rule(opts.start_threshold);
        let mut start_hit = self.matcher.best_start_hit(&read.seq, self.catalog.start_probes(), opts.end_margin, start_rule);
        let reoriented: Read;
        let mut read = read;
        if self.catalog.orientation() && self.looks_reversed(&read.seq, start_hit.as_ref()) {
            reoriented = {
                let mut r = read.clone();
                r.reverse_complement();
                r
            };
            read = &reoriented;
            trace.reversed = true;
            stats.reversed_reads = 1;
            start_hit = self.matcher.best_start_hit(&read.seq, self.catalog.start_probes(), opts.end_margin, start_rule);
        }
        let start_cut = start_hit.as_ref().map_or(0, |h| h.end);
        if let Some(h) = &start_hit {
            stats.record_start_trim(h.adapter, start_cut);
        }

        let end_hit = self.matcher.best_end_hit(
            &read.seq,
            start_cut,
            self.catalog.end_probes(),
            opts.end_margin,
            self.rule(opts.end_threshold),
        );
        let end_cut = end_hit.as_ref().map_or(read.len(), |h| h.start);
        if let Some(h) = &end_hit {
            stats.record_end_trim(h.adapter, read.len() - end_cut);
        }

        let body = start_cut..end_cut;
        let splits = if body.is_empty() {
            Vec::new()
        } else {
            let hits = self.matcher.middle_hits(
                &read.seq,
                body.clone(),
                self.catalog.middle_probes(),
                opts.middle_pad,
                self.rule(opts.middle_threshold),
            );
            merge_close_hits(hits, opts.min_split_separation)
        };
        if !splits.is_empty() { stats.split_reads = 1; }

        let mut pieces = Vec::with_capacity(splits.len() + 1);
        if splits.is_empty() {
            pieces.push((body.clone(), read.id.clone()));
        } else {
            let mut from = body.start;
            for (k, h) in splits.iter().enumerate() {
                pieces.push((from..h.start, format!("{}_{}", read.id, k + 1)));
                from = h.end;
            }
            pieces.push((from..body.end, format!("{}_{}", read.id, splits.len() + 1)));
        }

        trace.start_hit = start_hit;
        trace.end_hit = end_hit;
        trace.body = body;
        trace.splits = splits;
        let trimmed = trace.trimmed();

        let mut fragments = Vec::with_capacity(pieces.len());
        for (range, id) in pieces {
            if range.is_empty() {
                stats.discarded_fragments += 1;
                continue;
            }
            let mut frag = read.slice(range, id);
            stats.cropped_bp += frag.crop(opts.head_crop, opts.tail_crop) as u64;
            if frag.is_empty() || !self.passes_filters(&frag, trimmed) {
                stats.discarded_fragments += 1;
                continue;
            }
            fragments.push(frag);
        }
        stats.fragments_emitted = fragments.len() as u64;

        log::debug!(
            "{}: start={:?} end={:?} reversed={} splits={} emitted={}",
            read.id,
            trace.start_hit.as_ref().map(|h| (self.catalog.adapter(h.adapter).name.as_str(), h.end)),
            trace.end_hit.as_ref().map(|h| (self.catalog.adapter(h.adapter).name.as_str(), h.start)),
            trace.reversed,
            trace.splits.len(),
            fragments.len(),
        );
        ReadOutcome { fragments, stats, trace }
    }

    /// Orientation evidence comes from the start window when either strand
    /// hits there, and from the end window otherwise. Between a forward and a
    /// reverse hit on the same end, [`outweighs`] decides.
    fn looks_reversed(&mut self, seq: &[u8], forward_start: Option<&MatchHit>) -> bool {
        let margin = self.opts.end_margin;
        let start_rule = self.rule(self.opts.start_threshold);
        let reverse_start = self.matcher.best_start_hit(seq, self.catalog.reverse_start_probes(), margin, start_rule);
        if forward_start.is_some() || reverse_start.is_some() {
            return reverse_wins(forward_start, reverse_start.as_ref());
        }
        let end_rule = self.rule(self.opts.end_threshold);
        let forward_end = self.matcher.best_end_hit(seq, 0, self.catalog.end_probes(), margin, end_rule);
        let reverse_end = self.matcher.best_end_hit(seq, 0, self.catalog.reverse_end_probes(), margin, end_rule);
        reverse_wins(forward_end.as_ref(), reverse_end.as_ref())
    }

    fn passes_filters(&self, frag: &Fragment, trimmed: bool) -> bool {
        let len = frag.len();
        if len < self.opts.min_length { return false; }
        if self.opts.max_length.is_some_and(|max| len > max) { return false; }
        !self.opts.trimmed_only || trimmed
    }
}

fn reverse_wins(forward: Option<&MatchHit>, reverse: Option<&MatchHit>) -> bool {
    match (forward, reverse) {
        (Some(f), Some(r)) => outweighs(r, f),
        (None, Some(_)) => true,
        _ => false,
    }
}

/// Collapse interior hits whose spans overlap or lie closer than
/// `min_separation`, keeping the higher-identity hit of each cluster.
/// `hits` must be sorted by start.
pub fn merge_close_hits(hits: Vec<MatchHit>, min_separation: usize) -> Vec<MatchHit> {
    let mut out: Vec<MatchHit> = Vec::with_capacity(hits.len());
    for h in hits {
        if let Some(last) = out.last_mut() {
            if h.start < last.end + min_separation {
                if h.identity > last.identity { *last = h; }
                continue;
            }
        }
        out.push(h);
    }
    out
}

#[cfg(test)]
mod process_tests {
    use super::*;
    use crate::kit::{Context, ProbeEnd, Strand};
    use rand::{Rng, SeedableRng};
    use rand_xoshiro::Xoshiro256PlusPlus;

    const MAP_START: &str = "GGTTGTTTCTGTTGGTGCTGATATTGCT";
    const MAP_END: &str = "GCAATATCAGCACCAACAGAAA";
    const NSK_START: &str = "AATGTACTTCGTTCAGTTACGTATTGCT";
    const NSK_END: &str = "GCAATACGTAACTGAACGAAGT";

    fn random_seq(rng: &mut Xoshiro256PlusPlus, n: usize) -> Vec<u8> {
        (0..n).map(|_| b"ACGT"[rng.gen_range(0..4)]).collect()
    }

    fn qual_for(seq: &[u8]) -> Option<Vec<u8>> {
        Some(seq.iter().enumerate().map(|(i, _)| b'!' + (i % 40) as u8).collect())
    }

    fn catalog(opts: &TrimOptions) -> Catalog {
        Catalog::builder()
            .custom(MAP_START, MAP_END, "Custom Adapter 1")
            .custom(NSK_START, NSK_END, "Custom Adapter 2")
            .build(opts)
            .unwrap()
    }

    fn hit(start: usize, end: usize, identity: f64) -> MatchHit {
        MatchHit {
            adapter: 0,
            probe_end: ProbeEnd::Start,
            strand: Strand::Forward,
            context: Context::Middle,
            start,
            end,
            matched: end - start,
            probe_len: end - start,
            identity,
            score: 0,
        }
    }

    #[test]
    fn exact_start_adapter_removes_exactly_its_length() {
        let opts = TrimOptions::default();
        let c = catalog(&opts);
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(7);
        let body = random_seq(&mut rng, 3000);
        let mut seq = NSK_START.as_bytes().to_vec();
        seq.extend_from_slice(&body);
        let q = qual_for(&seq);
        let out = ReadProcessor::new(&c, &opts).process(&Read::new("r", seq, q));
        assert_eq!(out.stats.start_trimmed_bp, NSK_START.len() as u64);
        assert_eq!(out.stats.adapter(1).start_reads, 1);
        assert_eq!(out.fragments.len(), 1);
        assert_eq!(out.fragments[0].id, "r");
        assert_eq!(out.fragments[0].seq, body);
        assert_eq!(out.fragments[0].qual.as_ref().map(Vec::len), Some(body.len()));
    }

    #[test]
    fn end_adapter_is_trimmed() {
        let opts = TrimOptions::default();
        let c = catalog(&opts);
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(11);
        let mut seq = random_seq(&mut rng, 2000);
        seq.extend_from_slice(MAP_END.as_bytes());
        let out = ReadProcessor::new(&c, &opts).process(&Read::new("r", seq, None));
        assert_eq!(out.stats.end_trimmed_reads, 1);
        assert_eq!(out.stats.end_trimmed_bp, MAP_END.len() as u64);
        assert_eq!(out.fragments[0].len(), 2000);
    }

    #[test]
    fn split_fragments_reassemble_into_trimmed_body() {
        let opts = TrimOptions::default();
        let c = catalog(&opts);
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(3);
        let mut seq = MAP_START.as_bytes().to_vec();
        seq.extend(random_seq(&mut rng, 1500));
        seq.extend_from_slice(MAP_START.as_bytes());
        seq.extend(random_seq(&mut rng, 1200));
        seq.extend_from_slice(NSK_START.as_bytes());
        seq.extend(random_seq(&mut rng, 900));
        let q = qual_for(&seq);
        let original = seq.clone();
        let out = ReadProcessor::new(&c, &opts).process(&Read::new("chimera", seq, q));

        let ids: Vec<_> = out.fragments.iter().map(|f| f.id.as_str()).collect();
        assert_eq!(ids, vec!["chimera_1", "chimera_2", "chimera_3"]);
        assert_eq!(out.stats.split_reads, 1);
        assert!(out.fragments.iter().all(|f| f.qual.as_ref().map(Vec::len) == Some(f.len())));

        let mut rebuilt = Vec::new();
        for (k, f) in out.fragments.iter().enumerate() {
            rebuilt.extend_from_slice(&f.seq);
            if let Some(h) = out.trace.splits.get(k) {
                rebuilt.extend_from_slice(&original[h.span()]);
            }
        }
        assert_eq!(rebuilt, original[out.trace.body.clone()].to_vec());
    }

    #[test]
    fn reverse_strand_read_is_reoriented_once() {
        let opts = TrimOptions { orientation: true, ..TrimOptions::default() };
        let c = catalog(&opts);
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(5);
        let body = random_seq(&mut rng, 2500);
        let mut forward = NSK_START.as_bytes().to_vec();
        forward.extend_from_slice(&body);
        forward.extend_from_slice(NSK_END.as_bytes());
        let reverse = crate::kit::reverse_complement(&forward);
        let q = qual_for(&reverse);
        let out = ReadProcessor::new(&c, &opts).process(&Read::new("rev", reverse, q.clone()));
        assert!(out.trace.reversed);
        assert_eq!(out.stats.reversed_reads, 1);
        assert_eq!(out.stats.start_trimmed_bp, NSK_START.len() as u64);
        assert_eq!(out.stats.end_trimmed_bp, NSK_END.len() as u64);
        assert_eq!(out.fragments[0].seq, body);
        let mut rq = q.unwrap();
        rq.reverse();
        assert_eq!(out.fragments[0].qual.as_deref(), Some(&rq[NSK_START.len()..NSK_START.len() + body.len()]));

        let plain = TrimOptions::default();
        let c2 = catalog(&plain);
        let out = ReadProcessor::new(&c2, &plain).process(&Read::new("rev", crate::kit::reverse_complement(&forward), None));
        assert!(!out.trace.reversed);
    }

    #[test]
    fn error_in_start_overhang_keeps_forward_orientation() {
        let opts = TrimOptions { orientation: true, ..TrimOptions::default() };
        let c = catalog(&opts);
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(17);
        let body = random_seq(&mut rng, 2000);
        let mut seq = NSK_START.as_bytes().to_vec();
        seq[1] = b'C';
        seq.extend_from_slice(&body);
        seq.extend_from_slice(NSK_END.as_bytes());
        let q = qual_for(&seq);
        let out = ReadProcessor::new(&c, &opts).process(&Read::new("fwd", seq, q));
        assert!(!out.trace.reversed);
        assert_eq!(out.stats.reversed_reads, 0);
        assert_eq!(out.trace.start_hit.as_ref().map(|h| (h.strand, h.end)), Some((Strand::Forward, NSK_START.len())));
        assert_eq!(out.fragments.len(), 1);
        assert_eq!(out.fragments[0].seq, body);
    }

    #[test]
    fn end_adapter_decides_orientation_without_start_evidence() {
        let opts = TrimOptions { orientation: true, ..TrimOptions::default() };
        let c = catalog(&opts);
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(19);
        let body = random_seq(&mut rng, 1800);

        // Reverse-strand read that lost its leading rc(end) adapter.
        let mut forward = NSK_START.as_bytes().to_vec();
        forward.extend_from_slice(&body);
        let reverse = crate::kit::reverse_complement(&forward);
        let out = ReadProcessor::new(&c, &opts).process(&Read::new("rev", reverse, None));
        assert!(out.trace.reversed);
        assert_eq!(out.stats.start_trimmed_bp, NSK_START.len() as u64);
        assert_eq!(out.fragments[0].seq, body);

        // Forward read whose end adapter lies inside rc(start).
        let mut seq = body.clone();
        seq.extend_from_slice(NSK_END.as_bytes());
        let out = ReadProcessor::new(&c, &opts).process(&Read::new("fwd", seq, None));
        assert!(!out.trace.reversed);
        assert_eq!(out.stats.end_trimmed_bp, NSK_END.len() as u64);
        assert_eq!(out.fragments[0].seq, body);
    }

    #[test]
    fn split_at_occurrence_with_read_side_insertions() {
        let opts = TrimOptions::default();
        let c = Catalog::builder().custom(MAP_START, MAP_END, "Custom Adapter 1").build(&opts).unwrap();
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(23);
        let left = random_seq(&mut rng, 800);
        let right = random_seq(&mut rng, 800);
        let mut seq = left.clone();
        for (i, chunk) in MAP_START.as_bytes().chunks(8).enumerate() {
            seq.extend_from_slice(chunk);
            if i < 3 { seq.push(b'A'); }
        }
        seq.extend_from_slice(&right);
        let out = ReadProcessor::new(&c, &opts).process(&Read::new("r", seq, None));
        assert_eq!(out.stats.split_reads, 1);
        let ids: Vec<_> = out.fragments.iter().map(|f| f.id.as_str()).collect();
        assert_eq!(ids, vec!["r_1", "r_2"]);
        assert_eq!(out.fragments[0].seq, left);
        assert_eq!(out.fragments[1].seq, right);
    }

    #[test]
    fn short_read_passes_untouched() {
        let opts = TrimOptions::default();
        let c = catalog(&opts);
        let out = ReadProcessor::new(&c, &opts).process(&Read::new("tiny", b"ACGTAC".to_vec(), Some(b"IIIIII".to_vec())));
        assert!(!out.trace.trimmed());
        assert_eq!(out.fragments[0].seq, b"ACGTAC");
    }

    #[test]
    fn crop_and_filters() {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(9);
        let seq = random_seq(&mut rng, 500);
        let base = TrimOptions::default();
        let c = catalog(&base);

        let crop = TrimOptions { head_crop: 50, tail_crop: 20, ..base.clone() };
        let out = ReadProcessor::new(&c, &crop).process(&Read::new("r", seq.clone(), qual_for(&seq)));
        assert_eq!(out.fragments[0].seq, seq[50..480].to_vec());
        assert_eq!(out.stats.cropped_bp, 70);

        let over = TrimOptions { head_crop: 300, tail_crop: 300, ..base.clone() };
        let out = ReadProcessor::new(&c, &over).process(&Read::new("r", seq.clone(), None));
        assert!(out.fragments.is_empty());
        assert_eq!(out.stats.cropped_bp, 500);
        assert_eq!(out.stats.discarded_fragments, 1);

        let too_long = TrimOptions { max_length: Some(499), ..base.clone() };
        assert!(ReadProcessor::new(&c, &too_long).process(&Read::new("r", seq.clone(), None)).fragments.is_empty());

        let only = TrimOptions { trimmed_only: true, head_crop: 10, ..base.clone() };
        let out = ReadProcessor::new(&c, &only).process(&Read::new("r", seq.clone(), None));
        assert!(out.fragments.is_empty());
        assert_eq!(out.stats.discarded_fragments, 1);
    }

    #[test]
    fn close_hits_merge_keeping_best() {
        let merged = merge_close_hits(vec![hit(100, 128, 0.92), hit(140, 168, 0.97), hit(400, 428, 0.91)], 50);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].start, 140);
        assert_eq!(merged[1].start, 400);
        assert!(merge_close_hits(Vec::new(), 50).is_empty());
    }

    #[test]
    fn passthrough_keeps_read() {
        let out = ReadOutcome::passthrough(Read::new("x", b"ACGT".to_vec(), None));
        assert_eq!(out.fragments[0].id, "x");
        assert_eq!(out.stats.passed_through, 1);
    }
}
