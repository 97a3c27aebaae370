use std::path::PathBuf;

use anyhow::{Context as _, Result};
use clap::{ArgAction, Args, Parser, Subcommand};

use porkchop_trim::catalog::Catalog;
use porkchop_trim::options::TrimOptions;
use porkchop_trim::pipeline::Trimmer;
use porkchop_trim::seqio::{RecordReader, RecordWriter, SeqFormat};
use porkchop_trim::stats::Report;

/// Porkchop adapter trimmer
#[derive(Parser)]
#[command(name = "porkchop-trim")]
#[command(version)]
#[command(about = "Trim and split ONT reads at adapter sequences", long_about = None)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Trim adapters from read ends and split reads at interior adapters
    Trim(TrimArgs),

    /// List the built-in adapter sets
    ListSets,
}

#[derive(Args)]
struct TrimArgs {
    /// Input FASTA/FASTQ (optionally gzipped); stdin when omitted
    #[arg(short, long)]
    input: Option<PathBuf>,
    /// Output path (gzipped when it ends in .gz); stdout when omitted
    #[arg(short, long)]
    output: Option<PathBuf>,
    /// Output format (fasta|fastq); defaults to the input format
    #[arg(long)]
    format: Option<SeqFormat>,

    /// Built-in adapter set to use (repeatable); see `list-sets`
    #[arg(long = "adapter-set")]
    adapter_sets: Vec<String>,
    /// Custom adapter as START END LABEL (repeatable)
    #[arg(long = "custom-adapter", num_args = 3, value_names = ["START", "END", "LABEL"], action = ArgAction::Append)]
    custom_adapters: Vec<String>,
    /// Keep every selected built-in set instead of sampling reads to pick the present ones
    #[arg(long)]
    no_guess: bool,
    /// Reads sampled when picking built-in sets
    #[arg(long)]
    check_reads: Option<usize>,

    /// Identity needed for a start hit
    #[arg(long)]
    start_threshold: Option<f64>,
    /// Identity needed for an end hit
    #[arg(long)]
    end_threshold: Option<f64>,
    /// Identity needed to split at an interior hit
    #[arg(long)]
    middle_threshold: Option<f64>,
    /// Identity needed for a built-in set to count as present
    #[arg(long)]
    adapter_threshold: Option<f64>,
    /// Extra bases searched past the probe length at each end
    #[arg(long)]
    end_margin: Option<usize>,
    /// Interior hits closer than this many bases are merged
    #[arg(long)]
    min_split_separation: Option<usize>,
    /// Shortest aligned share of a probe that can count as a hit
    #[arg(long)]
    min_match_fraction: Option<f64>,
    /// Step of the interior scan; each tile spans the probe plus twice this
    #[arg(long)]
    middle_pad: Option<usize>,

    /// Bases cropped from the start of every fragment
    #[arg(long, default_value_t = 0)]
    head_crop: usize,
    /// Bases cropped from the end of every fragment
    #[arg(long, default_value_t = 0)]
    tail_crop: usize,
    /// Discard fragments shorter than this
    #[arg(long)]
    min_length: Option<usize>,
    /// Discard fragments longer than this
    #[arg(long)]
    max_length: Option<usize>,
    /// Only output fragments of reads that had an adapter removed
    #[arg(long)]
    trimmed_only: bool,
    /// Reverse-complement reads that start with the reverse end adapter
    #[arg(long)]
    orientation: bool,

    /// Worker threads (default: all cores)
    #[arg(long)]
    threads: Option<usize>,
    /// Reads per dispatch chunk
    #[arg(long)]
    chunk_size: Option<usize>,
    /// Also write the statistics as JSON to this file
    #[arg(long)]
    json: Option<PathBuf>,
}

impl TrimArgs {
    fn options(&self) -> TrimOptions {
        let d = TrimOptions::default();
        TrimOptions {
            start_threshold: self.start_threshold.unwrap_or(d.start_threshold),
            end_threshold: self.end_threshold.unwrap_or(d.end_threshold),
            middle_threshold: self.middle_threshold.unwrap_or(d.middle_threshold),
            adapter_threshold: self.adapter_threshold.unwrap_or(d.adapter_threshold),
            end_margin: self.end_margin.unwrap_or(d.end_margin),
            min_split_separation: self.min_split_separation.unwrap_or(d.min_split_separation),
            min_match_fraction: self.min_match_fraction.unwrap_or(d.min_match_fraction),
            middle_pad: self.middle_pad.unwrap_or(d.middle_pad),
            head_crop: self.head_crop,
            tail_crop: self.tail_crop,
            min_length: self.min_length.unwrap_or(d.min_length),
            max_length: self.max_length,
            trimmed_only: self.trimmed_only,
            orientation: self.orientation,
            threads: self.threads,
            chunk_size: self.chunk_size.unwrap_or(d.chunk_size),
            check_reads: self.check_reads.unwrap_or(d.check_reads),
            guess_adapters: !self.no_guess,
            ..d
        }
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    let mut builder = env_logger::Builder::from_default_env();
    if std::env::var_os("RUST_LOG").is_none() {
        builder.filter_level(level);
    }
    builder.format_timestamp(None).format_target(false).init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Trim(args) => cmd_trim(args),
        Commands::ListSets => {
            cmd_list_sets();
            Ok(())
        }
    }
}

fn cmd_list_sets() {
    for s in porkchop_trim::list_adapter_sets() {
        println!("{}\t{}\t{}\t{}", s.name, s.start, s.end, s.provenance.reference);
    }
}

fn cmd_trim(args: TrimArgs) -> Result<()> {
    let opts = args.options();
    opts.validate()?;

    let mut builder = Catalog::builder();
    for name in &args.adapter_sets {
        builder = builder.adapter_set(name.as_str());
    }
    for c in args.custom_adapters.chunks(3) {
        if let [start, end, label] = c {
            builder = builder.custom(start.as_str(), end.as_str(), label.as_str());
        }
    }
    let catalog = builder.build(&opts)?;
    let chunk_size = opts.chunk_size;
    let first_len = chunk_size.max(if opts.guess_adapters { opts.check_reads } else { 0 });
    let mut trimmer = Trimmer::new(catalog, opts)?;

    let mut reader = match &args.input {
        Some(p) => RecordReader::from_path(p)?,
        None => RecordReader::from_stdin()?,
    };
    let first = reader.next_chunk(first_len)?;
    trimmer.guess_adapters(&first);

    let format = args.format.or(reader.format()).unwrap_or(SeqFormat::Fastq);
    let mut writer = match &args.output {
        Some(p) => RecordWriter::to_path(p, format)?,
        None => RecordWriter::to_stdout(format),
    };

    let chunks = std::iter::once(Ok(first)).chain(reader.into_chunks(chunk_size));
    let stats = trimmer.run(chunks, |f| writer.write(&f).context("writing output"))?;
    writer.finish()?;

    let report = Report { stats: &stats, catalog: trimmer.catalog() };
    if args.output.is_some() {
        print!("{}", report);
    } else {
        eprint!("{}", report);
    }
    if let Some(p) = &args.json {
        std::fs::write(p, report.to_json()?).with_context(|| format!("writing {}", p.display()))?;
    }
    Ok(())
}

#[cfg(test)]
mod cli_tests {
    use super::*;

    fn trim_args(extra: &[&str]) -> TrimArgs {
        let mut argv = vec!["porkchop-trim", "trim"];
        argv.extend_from_slice(extra);
        match Cli::try_parse_from(argv).unwrap().command {
            Commands::Trim(args) => args,
            Commands::ListSets => panic!("expected the trim subcommand"),
        }
    }

    #[test]
    fn every_matcher_knob_has_a_flag() {
        let o = trim_args(&["--min-match-fraction", "0.8", "--middle-pad", "24", "--middle-threshold", "0.85"]).options();
        assert_eq!(o.min_match_fraction, 0.8);
        assert_eq!(o.middle_pad, 24);
        assert_eq!(o.middle_threshold, 0.85);
        assert!(o.validate().is_ok());
    }

    #[test]
    fn omitted_flags_keep_defaults() {
        let o = trim_args(&[]).options();
        assert_eq!(o, TrimOptions::default());
    }

    #[test]
    fn custom_adapters_take_three_values() {
        let args = trim_args(&["--custom-adapter", "ACGT", "TTGG", "mine", "--orientation"]);
        assert_eq!(args.custom_adapters, vec!["ACGT", "TTGG", "mine"]);
        assert!(args.options().orientation);
    }
}
