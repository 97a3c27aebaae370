//! Built-in adapter sets.
//!
//! Each set pairs the fragment expected at the start of a read with the one
//! expected at its end. Sequences are uppercase as published.
//!
//! Sources:
//! - Chemistry Technical Document (CHTD_500_v1_revAR_25Nov2024) →
//!   Appendix 15: *Adapter sequences* (ligation adapter, kit 14).
//! - Historical adapter fragments from public Porechop forks (we include
//!   **only** the strings, no code): Y-adapter trunks, 1D^2, PCR and cDNA
//!   primers.
//!
//! Sets with a single published fragment (e.g. the rapid adapter) are not
//! listed: every adapter definition needs both probes.

/// Where a sequence string came from.
#[derive(Clone, Copy, Debug)]
pub struct Provenance {
    /// Public URL for the source.
    pub source: &'static str,
    /// Section, appendix or file reference within the source.
    pub reference: &'static str,
}

/// A named built-in adapter: start and end probes plus where they came from.
#[derive(Clone, Copy, Debug)]
pub struct AdapterSet {
    /// Stable set name, used for selection and in the report.
    pub name: &'static str,
    /// Fragment expected at the 5′ end of a read.
    pub start: &'static str,
    /// Fragment expected at the 3′ end of a read.
    pub end: &'static str,
    pub provenance: Provenance,
}

const CHTD_A15: Provenance = Provenance {
    source: "https://nanoporetech.com/document/chemistry-technical-document",
    reference: "Appendix 15: Adapter sequences",
};

const PORECHOP_FORK: Provenance = Provenance {
    source: "https://github.com/Sn0flingan/Poresnip/blob/master/porechop/adapters.py",
    reference: "adapters.py (ADAPTERS)",
};

/// Ligation adapter (LA) of kit 14 chemistry. Top strand at the start,
/// bottom strand at the end.
pub const LSK114: AdapterSet = AdapterSet {
    name: "SQK-LSK114",
    start: "TTTTTTTTCCTGTACTTCGTTCAGTTACGTATTGCT",
    end: "GCAATACGTAACTGAACGAAGTACAGG",
    provenance: CHTD_A15,
};

/// Legacy Y-adapter trunk (SQK-NSK007/LSK108/LSK109).
pub const NSK007: AdapterSet = AdapterSet {
    name: "SQK-NSK007",
    start: "AATGTACTTCGTTCAGTTACGTATTGCT",
    end: "GCAATACGTAACTGAACGAAGT",
    provenance: PORECHOP_FORK,
};

/// Legacy MAP006 Y-adapter (SK63 top / SK64 bottom).
pub const MAP006: AdapterSet = AdapterSet {
    name: "SQK-MAP006",
    start: "GGTTGTTTCTGTTGGTGCTGATATTGCT",
    end: "GCAATATCAGCACCAACAGAAA",
    provenance: PORECHOP_FORK,
};

/// Shortened MAP006 fragments, seen when the motor-binding region is lost.
pub const MAP006_SHORT: AdapterSet = AdapterSet {
    name: "SQK-MAP006 short",
    start: "CTGTTGGTGCTGATATTGCT",
    end: "GCAATATCAGCACCAACAG",
    provenance: PORECHOP_FORK,
};

pub const PCR_1: AdapterSet = AdapterSet {
    name: "PCR adapters 1",
    start: "ACTTGCCTGTCGCTCTATCTTC",
    end: "GAAGATAGAGCGACAGGCAAGT",
    provenance: PORECHOP_FORK,
};

pub const PCR_TAIL_1: AdapterSet = AdapterSet {
    name: "PCR tail 1",
    start: "TTAACCTTTCTGTTGGTGCTGATATTGC",
    end: "GCAATATCAGCACCAACAGAAAGGTTAA",
    provenance: PORECHOP_FORK,
};

pub const PCR_TAIL_2: AdapterSet = AdapterSet {
    name: "PCR tail 2",
    start: "TTAACCTACTTGCCTGTCGCTCTATCTTC",
    end: "GAAGATAGAGCGACAGGCAAGTAGGTTAA",
    provenance: PORECHOP_FORK,
};

/// 1D^2 (LSK308) adapter, first half.
pub const ONE_D2_PART_1: AdapterSet = AdapterSet {
    name: "1D^2 part 1",
    start: "GAGAGGTTCCAAGTCAGAGAGGTTCCT",
    end: "AGGAACCTCTCTGACTTGGAACCTCTC",
    provenance: PORECHOP_FORK,
};

/// 1D^2 (LSK308) adapter, second half.
pub const ONE_D2_PART_2: AdapterSet = AdapterSet {
    name: "1D^2 part 2",
    start: "CTTCGTTCAGTTACGTATTGCTGGCGTCTGCTT",
    end: "CACCCAAGCAGACGCCAGCAATACGTAACT",
    provenance: PORECHOP_FORK,
};

/// Strand-switching primer of the legacy cDNA kits.
pub const CDNA_SSP: AdapterSet = AdapterSet {
    name: "cDNA SSP",
    start: "TTTCTGTTGGTGCTGATATTGCTGCCATTACGGCCGGG",
    end: "CCCGGCCGTAATGGCAGCAATATCAGCACCAACAGAAA",
    provenance: PORECHOP_FORK,
};

/// Every built-in set, in the order they are tested.
pub const ADAPTER_SETS: &[AdapterSet] = &[
    LSK114, NSK007, MAP006, MAP006_SHORT, PCR_1, PCR_TAIL_1, PCR_TAIL_2,
    ONE_D2_PART_1, ONE_D2_PART_2, CDNA_SSP,
];
