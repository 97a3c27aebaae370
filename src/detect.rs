//! Approximate probe detection.
//!
//! A probe is located inside a bounded window of the read with a local
//! affine-gap alignment (`bio`'s pairwise aligner, scoring +3 / −6 / −5 / −2).
//! Identity is reported against the **full** probe length, so a truncated or
//! heavily edited occurrence scores low even when the aligned part is clean.
//!
//! Windows are sized from the probe length plus a fixed margin, which bounds
//! the work per alignment independently of the read length. Interior scans
//! cover the body with overlapping tiles of `len(P) + 2 × pad` bases advancing
//! by `pad`, so every occurrence spanning at most `len(P) + pad` read bases
//! lies whole inside some tile. The acceptance rule is the same everywhere.
//!
//! # Examples
//! ```
//! use porkchop_trim::detect::Matcher;
//! let mut m = Matcher::new();
//! let w = m.align(b"ACGTACGT", b"TTTTACGTACGTTTTT").unwrap();
//! assert_eq!((w.start, w.end, w.matched), (4, 12, 8));
//! assert_eq!(w.identity, 1.0);
//! ```
use core::ops::Range;

use bio::alignment::pairwise::Aligner;
use bio::alignment::AlignmentOperation;

use crate::kit::{Context, MatchHit, Probe, ProbeEnd};

const MATCH: i32 = 3;
const MISMATCH: i32 = -6;
const GAP_OPEN: i32 = -5;
const GAP_EXTEND: i32 = -2;

type ScoreFn = fn(u8, u8) -> i32;

#[inline]
fn bases_equal(a: u8, b: u8) -> bool {
    a == b || a == b'N' || b == b'N'
}

fn score(a: u8, b: u8) -> i32 {
    if bases_equal(a, b) { MATCH } else { MISMATCH }
}

/// Best local occurrence of a probe inside one window, in window coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WindowMatch {
    pub start: usize,
    pub end: usize,
    /// Probe bases aligned to an equal window base.
    pub matched: usize,
    /// Probe bases covered by the alignment (matches, substitutions, probe-side gaps).
    pub aligned: usize,
    /// `matched / probe.len()`.
    pub identity: f64,
    /// Raw alignment score.
    pub score: i32,
}

/// Acceptance rule shared by every context.
#[derive(Clone, Copy, Debug)]
pub struct Acceptance {
    pub min_identity: f64,
    pub min_fraction: f64,
}

impl Acceptance {
    pub fn accepts(&self, m: &WindowMatch, probe_len: usize) -> bool {
        m.identity >= self.min_identity && m.aligned as f64 >= self.min_fraction * probe_len as f64
    }
}

/// Owns the DP buffers of the aligner; create one per worker or per read.
pub struct Matcher {
    aligner: Aligner<ScoreFn>,
}

impl Default for Matcher {
    fn default() -> Self { Matcher::new() }
}

impl Matcher {
    pub fn new() -> Self {
        Matcher { aligner: Aligner::with_capacity(64, 256, GAP_OPEN, GAP_EXTEND, score as ScoreFn) }
    }

    /// Align `probe` locally inside `window`.
    ///
    /// Returns `None` when the window is shorter than the probe (or either is
    /// empty); that is a plain "no match", never an error.
    pub fn align(&mut self, probe: &[u8], window: &[u8]) -> Option<WindowMatch> {
        if probe.is_empty() || window.len() < probe.len() { return None; }
        let aln = self.aligner.local(probe, window);
        let (mut i, mut j) = (aln.xstart, aln.ystart);
        let mut matched = 0usize;
        for op in &aln.operations {
            match *op {
                AlignmentOperation::Match | AlignmentOperation::Subst => {
                    if let (Some(&a), Some(&b)) = (probe.get(i), window.get(j)) {
                        if bases_equal(a, b) { matched += 1; }
                    }
                    i += 1;
                    j += 1;
                }
                AlignmentOperation::Ins => i += 1,
                AlignmentOperation::Del => j += 1,
                AlignmentOperation::Xclip(_) | AlignmentOperation::Yclip(_) => {}
            }
        }
        Some(WindowMatch {
            start: aln.ystart,
            end: aln.yend,
            matched,
            aligned: aln.xend - aln.xstart,
            identity: matched as f64 / probe.len() as f64,
            score: aln.score,
        })
    }

    /// Best accepted hit of any probe in the leading `len(P) + margin` bases.
    pub fn best_start_hit<'p, I>(&mut self, seq: &[u8], probes: I, margin: usize, rule: Acceptance) -> Option<MatchHit>
    where
        I: IntoIterator<Item = &'p Probe>,
    {
        let mut best: Option<MatchHit> = None;
        for p in probes {
            let window = &seq[..seq.len().min(p.len() + margin)];
            if let Some(m) = self.align(&p.seq, window) {
                if rule.accepts(&m, p.len()) {
                    keep_better(&mut best, to_hit(p, Context::Start, &m, 0));
                }
            }
        }
        best
    }

    /// Best accepted hit of any probe in the trailing `len(P) + margin` bases,
    /// never looking left of `floor`.
    pub fn best_end_hit<'p, I>(&mut self, seq: &[u8], floor: usize, probes: I, margin: usize, rule: Acceptance) -> Option<MatchHit>
    where
        I: IntoIterator<Item = &'p Probe>,
    {
        let mut best: Option<MatchHit> = None;
        for p in probes {
            let offset = seq.len().saturating_sub(p.len() + margin).max(floor);
            if offset >= seq.len() { continue; }
            if let Some(m) = self.align(&p.seq, &seq[offset..]) {
                if rule.accepts(&m, p.len()) {
                    keep_better(&mut best, to_hit(p, Context::End, &m, offset));
                }
            }
        }
        best
    }

    /// Every accepted interior occurrence of `probes` inside `body`, in read
    /// coordinates, sorted by position. Overlapping hits of one probe, as seen
    /// from neighbouring tiles, collapse into the best of them.
    pub fn middle_hits<'p, I>(&mut self, seq: &[u8], body: Range<usize>, probes: I, pad: usize, rule: Acceptance) -> Vec<MatchHit>
    where
        I: IntoIterator<Item = &'p Probe>,
    {
        let hay = &seq[body.clone()];
        let mut hits = Vec::new();
        for p in probes {
            let width = p.len() + 2 * pad;
            for lo in tile_starts(hay.len(), width, pad) {
                let tile = lo..(lo + width).min(hay.len());
                self.scan_tile(p, hay, tile, body.start, rule, &mut hits);
            }
        }
        hits.sort_by_key(|h| (h.adapter, h.probe_end == ProbeEnd::End, h.start, h.end));
        let mut out: Vec<MatchHit> = Vec::with_capacity(hits.len());
        for h in hits {
            match out.last_mut() {
                Some(last) if last.adapter == h.adapter && last.probe_end == h.probe_end && h.start < last.end => {
                    if (h.identity, h.score) > (last.identity, last.score) { *last = h; }
                }
                _ => out.push(h),
            }
        }
        out.sort_by_key(|h| (h.start, h.end));
        out
    }

    /// Accepted hits of `p` inside one tile. The bases left and right of each
    /// hit are searched again, so a stronger neighbour cannot shadow a weaker
    /// occurrence sharing the tile.
    fn scan_tile(&mut self, p: &Probe, hay: &[u8], tile: Range<usize>, offset: usize, rule: Acceptance, hits: &mut Vec<MatchHit>) {
        let mut pending = vec![tile];
        while let Some(w) = pending.pop() {
            let Some(m) = self.align(&p.seq, &hay[w.clone()]) else { continue };
            if !rule.accepts(&m, p.len()) { continue; }
            hits.push(to_hit(p, Context::Middle, &m, offset + w.start));
            pending.push(w.start..w.start + m.start);
            pending.push(w.start + m.end..w.end);
        }
    }
}

/// Starts of `width`-base tiles stepping by `step` over `len` bases; the last
/// tile ends flush with `len`. A sequence no longer than `width` is one tile.
fn tile_starts(len: usize, width: usize, step: usize) -> impl Iterator<Item = usize> {
    let last = len.saturating_sub(width);
    (0..last).step_by(step.max(1)).chain(std::iter::once(last))
}

fn to_hit(p: &Probe, context: Context, m: &WindowMatch, offset: usize) -> MatchHit {
    MatchHit {
        adapter: p.adapter,
        probe_end: p.end,
        strand: p.strand,
        context,
        start: offset + m.start,
        end: offset + m.end,
        matched: m.matched,
        probe_len: p.len(),
        identity: m.identity,
        score: m.score,
    }
}

/// Replace `best` with `cand` when it has higher identity, or equal identity
/// and an earlier start. Earlier candidates win remaining ties.
pub fn keep_better(best: &mut Option<MatchHit>, cand: MatchHit) {
    let replace = match best {
        None => true,
        Some(b) => cand.identity > b.identity || (cand.identity == b.identity && cand.start < b.start),
    };
    if replace { *best = Some(cand); }
}

/// Whether `a` is stronger evidence than `b` for the same read end when the
/// two come from opposite orientations. A score lead of more than one matched
/// base decides; otherwise the hit covering more of its own probe wins, and
/// `b` is kept on a full tie.
///
/// With Y-shaped adapters the reverse complement of one probe is a substring
/// of the other, so identity alone favours the shorter probe.
pub fn outweighs(a: &MatchHit, b: &MatchHit) -> bool {
    if a.score.abs_diff(b.score) > MATCH.unsigned_abs() {
        a.score > b.score
    } else {
        a.identity > b.identity
    }
}
