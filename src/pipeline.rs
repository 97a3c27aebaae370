//! Parallel orchestration of the read pipeline.
//!
//! Reads arrive in chunks. Each chunk is spread over a dedicated Rayon pool,
//! every worker owning its own [`ReadProcessor`] (and thus its own aligner).
//! Outcomes travel back over an `mpsc` channel tagged with the read's position
//! in the chunk and are re-assembled in input order before any fragment is
//! emitted, so output order never depends on scheduling.
//!
//! A panic while processing one read is contained: the read is logged and
//! passed through unmodified, and the run goes on.
use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::mpsc;

use anyhow::{Context as _, Result};
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};

use crate::catalog::Catalog;
use crate::kit::{Fragment, Origin, Read};
use crate::options::TrimOptions;
use crate::process::{ReadOutcome, ReadProcessor};
use crate::stats::RunStatistics;

/// Owns the catalog, options and worker pool of one run.
pub struct Trimmer {
    catalog: Catalog,
    opts: TrimOptions,
    pool: ThreadPool,
}

impl Trimmer {
    pub fn new(catalog: Catalog, opts: TrimOptions) -> Result<Self> {
        opts.validate()?;
        let threads = opts.worker_count();
        let pool = ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("trim-worker-{}", i))
            .build()
            .context("building worker pool")?;
        log::debug!("worker pool with {} threads", threads);
        Ok(Trimmer { catalog, opts, pool })
    }

    pub fn catalog(&self) -> &Catalog { &self.catalog }

    pub fn options(&self) -> &TrimOptions { &self.opts }

    /// Narrow the built-in adapter sets to those found in `sample`.
    ///
    /// Skipped when guessing is off or no built-in set is loaded. Returns the
    /// names of the adapters left enabled.
    pub fn guess_adapters(&mut self, sample: &[Read]) -> Vec<String> {
        let has_builtin = self.catalog.adapters().iter().any(|a| a.origin == Origin::BuiltIn);
        if !self.opts.guess_adapters || !has_builtin || sample.is_empty() {
            return self.catalog.enabled_names().into_iter().map(str::to_string).collect();
        }
        let sample = &sample[..sample.len().min(self.opts.check_reads)];
        let (pool, catalog, opts) = (&self.pool, &mut self.catalog, &self.opts);
        let kept = pool.install(|| catalog.retain_present(sample, opts));
        log::info!("checked {} reads; adapter sets kept: {}", sample.len(), kept.join(", "));
        kept
    }

    /// Process one chunk whose first read has global index `first_index`.
    /// Fragments come back in input order.
    pub fn process_chunk(&self, first_index: usize, reads: &[Read]) -> (Vec<Fragment>, RunStatistics) {
        let n = reads.len();
        let (tx, rx) = mpsc::channel::<(usize, ReadOutcome)>();
        let (catalog, opts) = (&self.catalog, &self.opts);

        self.pool.install(|| {
            reads.par_iter().enumerate().for_each_init(
                || (tx.clone(), ReadProcessor::new(catalog, opts)),
                |(tx, processor), (i, read)| {
                    let outcome = process_isolated(first_index + i, read, |r| processor.process(r));
                    let _ = tx.send((i, outcome));
                },
            );
        });
        drop(tx);

        let mut slots: Vec<Option<ReadOutcome>> = Vec::with_capacity(n);
        slots.resize_with(n, || None);
        for (i, outcome) in rx {
            slots[i] = Some(outcome);
        }

        let mut fragments = Vec::with_capacity(n);
        let mut stats = RunStatistics::default();
        for (i, slot) in slots.into_iter().enumerate() {
            let outcome = slot.unwrap_or_else(|| {
                log::warn!("read #{} produced no outcome; passing it through", first_index + i);
                ReadOutcome::passthrough(reads[i].clone())
            });
            stats.merge(&outcome.stats);
            fragments.extend(outcome.fragments);
        }
        (fragments, stats)
    }

    /// Drive all `chunks` through the pool, handing fragments to `emit` in
    /// input order. Stops at the first input or output error.
    pub fn run<I, F>(&self, chunks: I, mut emit: F) -> Result<RunStatistics>
    where
        I: IntoIterator<Item = Result<Vec<Read>>>,
        F: FnMut(Fragment) -> Result<()>,
    {
        let mut total = RunStatistics::default();
        let mut next_index = 0usize;
        for chunk in chunks {
            let chunk = chunk?;
            let (fragments, stats) = self.process_chunk(next_index, &chunk);
            next_index += chunk.len();
            for f in fragments {
                emit(f)?;
            }
            total.merge(&stats);
            log::debug!("{} reads processed", next_index);
        }
        log::info!(
            "{} reads in, {} fragments out, {} split, {} discarded",
            total.reads,
            total.fragments_emitted,
            total.split_reads,
            total.discarded_fragments
        );
        Ok(total)
    }
}

/// Run `f` on `read`, converting a panic into a pass-through outcome.
pub fn process_isolated<F>(index: usize, read: &Read, f: F) -> ReadOutcome
where
    F: FnOnce(&Read) -> ReadOutcome,
{
    match catch_unwind(AssertUnwindSafe(|| f(read))) {
        Ok(outcome) => outcome,
        Err(payload) => {
            log::warn!("read #{} ({}) failed: {}; emitting it unmodified", index, read.id, panic_message(&*payload));
            ReadOutcome::passthrough(read.clone())
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "unknown panic"
    }
}
