//! Record IO for **FASTA / FASTQ** (plain or gzipped).
//!
//! ### Design
//! - The first bytes of the stream pick the decoder: the gzip magic wraps the
//!   input in `flate2`'s multi-member decoder, then `>` selects FASTA and `@`
//!   selects FASTQ.
//! - FASTA goes through `needletail`. FASTQ goes through `bio`'s line-based
//!   reader, which keeps its place after a record it cannot accept.
//! - Records are handed out in chunks so the orchestrator can dispatch a batch
//!   to its worker pool while keeping memory bounded.
//! - Output mirrors the input format unless told otherwise; paths ending in
//!   `.gz` are written through `flate2`.
//!
//! ### Errors
//! A FASTQ record whose quality length differs from its sequence length is
//! rejected: it is logged, counted and skipped, and reading continues with the
//! next record. Any other parse or IO error is bubbled up via `anyhow::Result`.
//!
//! ### Example
//! ```no_run
//! use porkchop_trim::seqio::RecordReader;
//! let mut reader = RecordReader::from_path("reads.fastq.gz").unwrap();
//! let chunk = reader.next_chunk(2000).unwrap();
//! println!("{:?}: {} records", reader.format(), chunk.len());
//! ```
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use anyhow::{bail, Context as _, Result};
use bio::io::fastq;
use flate2::read::MultiGzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use needletail::FastxReader;

use crate::kit::{Fragment, Read};

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Record format of an input or output stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeqFormat { Fasta, Fastq }

impl std::str::FromStr for SeqFormat {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "fasta" | "fa" => Ok(SeqFormat::Fasta),
            "fastq" | "fq" => Ok(SeqFormat::Fastq),
            other => Err(format!("Unknown format: {}", other)),
        }
    }
}

type Input<'a> = BufReader<Box<dyn io::Read + Send + 'a>>;

enum Source<'a> {
    Fasta(Box<dyn FastxReader + 'a>),
    Fastq(fastq::Records<Input<'a>>),
    Empty,
}

/// Pulls normalized [`Read`]s out of a FASTA/FASTQ stream.
pub struct RecordReader<'a> {
    source: Source<'a>,
    rejected: usize,
}

impl<'a> RecordReader<'a> {
    fn open(raw: Box<dyn io::Read + Send + 'a>) -> Result<Self> {
        let mut input: Input<'a> = BufReader::new(raw);
        if input.fill_buf()?.starts_with(&GZIP_MAGIC) {
            let decoded: Box<dyn io::Read + Send + 'a> = Box::new(MultiGzDecoder::new(input));
            input = BufReader::new(decoded);
        }
        let marker = input.fill_buf()?.first().copied();
        let source = match marker {
            None => Source::Empty,
            Some(b'@') => Source::Fastq(fastq::Reader::from_bufread(input).records()),
            Some(b'>') => Source::Fasta(needletail::parse_fastx_reader(input).context("cannot open FASTA input")?),
            Some(c) => bail!("unrecognised record marker {:?}; expected '>' or '@'", c as char),
        };
        Ok(RecordReader { source, rejected: 0 })
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<RecordReader<'static>> {
        let p = path.as_ref();
        let fh = File::open(p).with_context(|| format!("opening {}", p.display()))?;
        RecordReader::open(Box::new(fh)).with_context(|| format!("reading {}", p.display()))
    }

    pub fn from_stdin() -> Result<RecordReader<'static>> {
        RecordReader::open(Box::new(io::stdin())).context("reading stdin")
    }

    pub fn from_reader<R: io::Read + Send + 'a>(reader: R) -> Result<Self> {
        RecordReader::open(Box::new(reader))
    }

    /// Format of the stream; `None` for empty input.
    pub fn format(&self) -> Option<SeqFormat> {
        match self.source {
            Source::Fasta(_) => Some(SeqFormat::Fasta),
            Source::Fastq(_) => Some(SeqFormat::Fastq),
            Source::Empty => None,
        }
    }

    /// Records skipped because their quality and sequence lengths differ.
    pub fn rejected(&self) -> usize { self.rejected }

    /// Next record, skipping rejected ones. `None` at end of input.
    pub fn next_read(&mut self) -> Option<Result<Read>> {
        match &mut self.source {
            Source::Empty => None,
            Source::Fasta(reader) => {
                let rec = match reader.next()? {
                    Ok(rec) => rec,
                    Err(e) => return Some(Err(anyhow::Error::new(e).context("malformed FASTA record"))),
                };
                let id = String::from_utf8_lossy(rec.id()).to_string();
                Some(Ok(Read { id, seq: rec.seq().to_vec(), qual: None }))
            }
            Source::Fastq(records) => loop {
                let rec = match records.next()? {
                    Ok(rec) => rec,
                    Err(e) => return Some(Err(anyhow::Error::new(e).context("malformed FASTQ record"))),
                };
                let id = match rec.desc() {
                    Some(desc) => format!("{} {}", rec.id(), desc),
                    None => rec.id().to_string(),
                };
                if rec.qual().len() != rec.seq().len() {
                    self.rejected += 1;
                    log::warn!(
                        "rejecting record {}: {} quality values for {} bases",
                        id,
                        rec.qual().len(),
                        rec.seq().len()
                    );
                    continue;
                }
                return Some(Ok(Read { id, seq: rec.seq().to_vec(), qual: Some(rec.qual().to_vec()) }));
            },
        }
    }

    /// Up to `n` records; an empty vector means the input is exhausted.
    pub fn next_chunk(&mut self, n: usize) -> Result<Vec<Read>> {
        let mut out = Vec::with_capacity(n.min(1 << 16));
        while out.len() < n {
            match self.next_read() {
                Some(r) => out.push(r?),
                None => break,
            }
        }
        Ok(out)
    }

    /// Consume the reader as an iterator of chunks of `n` records.
    pub fn into_chunks(mut self, n: usize) -> impl Iterator<Item = Result<Vec<Read>>> + 'a {
        let mut done = false;
        std::iter::from_fn(move || {
            if done { return None; }
            match self.next_chunk(n) {
                Ok(v) if v.is_empty() => None,
                Ok(v) => Some(Ok(v)),
                Err(e) => {
                    done = true;
                    Some(Err(e))
                }
            }
        })
    }
}

enum Sink {
    Plain(BufWriter<Box<dyn Write + Send>>),
    Gz(GzEncoder<BufWriter<File>>),
}

impl Sink {
    fn get(&mut self) -> &mut dyn Write {
        match self {
            Sink::Plain(w) => w,
            Sink::Gz(w) => w,
        }
    }
}

/// Writes fragments as FASTA or FASTQ records.
pub struct RecordWriter {
    sink: Sink,
    format: SeqFormat,
}

impl RecordWriter {
    /// Write to `path`, gzip-compressed when it ends in `.gz`.
    pub fn to_path<P: AsRef<Path>>(path: P, format: SeqFormat) -> Result<Self> {
        let p = path.as_ref();
        let fh = File::create(p).with_context(|| format!("creating {}", p.display()))?;
        let gz = p.extension().and_then(|s| s.to_str()).is_some_and(|e| e.eq_ignore_ascii_case("gz"));
        let sink = if gz {
            Sink::Gz(GzEncoder::new(BufWriter::new(fh), Compression::default()))
        } else {
            Sink::Plain(BufWriter::new(Box::new(fh)))
        };
        Ok(RecordWriter { sink, format })
    }

    pub fn to_stdout(format: SeqFormat) -> Self {
        RecordWriter::from_writer(io::stdout(), format)
    }

    pub fn from_writer<W: Write + Send + 'static>(w: W, format: SeqFormat) -> Self {
        RecordWriter { sink: Sink::Plain(BufWriter::new(Box::new(w))), format }
    }

    pub fn format(&self) -> SeqFormat { self.format }

    pub fn write(&mut self, f: &Fragment) -> io::Result<()> {
        let format = self.format;
        let w = self.sink.get();
        match format {
            SeqFormat::Fasta => {
                w.write_all(b">")?;
                w.write_all(f.id.as_bytes())?;
                w.write_all(b"\n")?;
                w.write_all(&f.seq)?;
                w.write_all(b"\n")
            }
            SeqFormat::Fastq => {
                w.write_all(b"@")?;
                w.write_all(f.id.as_bytes())?;
                w.write_all(b"\n")?;
                w.write_all(&f.seq)?;
                w.write_all(b"\n+\n")?;
                match &f.qual {
                    Some(q) => w.write_all(q)?,
                    None => w.write_all(&vec![b'I'; f.seq.len()])?,
                }
                w.write_all(b"\n")
            }
        }
    }

    /// Flush buffers and close the gzip stream.
    pub fn finish(self) -> Result<()> {
        match self.sink {
            Sink::Plain(mut w) => w.flush()?,
            Sink::Gz(gz) => {
                let mut inner = gz.finish()?;
                inner.flush()?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod seqio_tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn reads_fastq_in_chunks_and_detects_format() {
        let data = b"@r1\nACGT\n+\nIIII\n@r2\nGGCC\n+\n!!!!\n@r3\nA\n+\n#\n".to_vec();
        let mut r = RecordReader::from_reader(Cursor::new(data)).unwrap();
        let first = r.next_chunk(2).unwrap();
        assert_eq!(r.format(), Some(SeqFormat::Fastq));
        assert_eq!(first.len(), 2);
        assert_eq!(first[1].id, "r2");
        assert_eq!(first[1].qual.as_deref(), Some(&b"!!!!"[..]));
        assert_eq!(r.next_chunk(2).unwrap().len(), 1);
        assert!(r.next_chunk(2).unwrap().is_empty());
    }

    #[test]
    fn reads_fasta_without_quality() {
        let data = b">a desc\nACGTACGT\n>b\nTTTT\n".to_vec();
        let r = RecordReader::from_reader(Cursor::new(data)).unwrap();
        let chunks: Vec<_> = r.into_chunks(10).collect::<Result<_>>().unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0][0].id, "a desc");
        assert!(chunks[0].iter().all(|x| x.qual.is_none()));
    }

    #[test]
    fn quality_length_mismatch_is_rejected() {
        let data = b"@good1\nACGT\n+\nIIII\n@bad\nACGT\n+\nII\n@good2\nGG\n+\nII\n@good3 run=1\nTTA\n+\n#ab\n".to_vec();
        let mut r = RecordReader::from_reader(Cursor::new(data)).unwrap();
        let mut ids = Vec::new();
        while let Some(res) = r.next_read() {
            ids.push(res.unwrap().id);
        }
        assert_eq!(ids, vec!["good1", "good2", "good3 run=1"]);
        assert_eq!(r.rejected(), 1);
    }

    #[test]
    fn truncated_fastq_record_is_never_emitted() {
        let data = b"@r1\nACGT\n+\nIIII\n@r2\nACGT\n".to_vec();
        let mut r = RecordReader::from_reader(Cursor::new(data)).unwrap();
        assert_eq!(r.next_read().unwrap().unwrap().id, "r1");
        assert!(!matches!(r.next_read(), Some(Ok(_))));
    }

    #[test]
    fn unknown_record_marker_is_an_error() {
        assert!(RecordReader::from_reader(Cursor::new(b"ACGT\n".to_vec())).is_err());
    }

    #[test]
    fn reads_gzipped_fasta_from_a_stream() {
        let mut gz = GzEncoder::new(Vec::new(), Compression::default());
        gz.write_all(b">a\nACGT\nTT\n>b\nGG\n").unwrap();
        let bytes = gz.finish().unwrap();
        let mut r = RecordReader::from_reader(Cursor::new(bytes)).unwrap();
        assert_eq!(r.format(), Some(SeqFormat::Fasta));
        let reads = r.next_chunk(10).unwrap();
        assert_eq!(reads.len(), 2);
        assert_eq!(reads[0].seq, b"ACGTTT");
    }

    #[test]
    fn empty_input_yields_no_records() {
        let mut r = RecordReader::from_reader(Cursor::new(Vec::new())).unwrap();
        assert!(r.next_chunk(5).unwrap().is_empty());
        assert_eq!(r.format(), None);
    }

    #[test]
    fn writes_fastq_and_gzip_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.fastq.gz");
        let mut w = RecordWriter::to_path(&path, SeqFormat::Fastq).unwrap();
        w.write(&Fragment { id: "x_1".into(), seq: b"ACG".to_vec(), qual: Some(b"#$%".to_vec()) }).unwrap();
        w.write(&Fragment { id: "y".into(), seq: b"TT".to_vec(), qual: None }).unwrap();
        w.finish().unwrap();

        let mut r = RecordReader::from_path(&path).unwrap();
        let reads = r.next_chunk(10).unwrap();
        assert_eq!(reads.len(), 2);
        assert_eq!(reads[0].id, "x_1");
        assert_eq!(reads[0].qual.as_deref(), Some(&b"#$%"[..]));
        assert_eq!(reads[1].qual.as_deref(), Some(&b"II"[..]));
    }

    #[test]
    fn writes_fasta_records() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.fasta");
        let mut w = RecordWriter::to_path(&path, SeqFormat::Fasta).unwrap();
        w.write(&Fragment { id: "r_2".into(), seq: b"ACGT".to_vec(), qual: Some(b"IIII".to_vec()) }).unwrap();
        w.finish().unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), ">r_2\nACGT\n");
    }

    #[test]
    fn format_names_parse() {
        assert_eq!("FASTQ".parse::<SeqFormat>().unwrap(), SeqFormat::Fastq);
        assert_eq!("fa".parse::<SeqFormat>().unwrap(), SeqFormat::Fasta);
        assert!("bam".parse::<SeqFormat>().is_err());
    }
}
