use serde::Serialize;
use std::fmt;

// Fast hash maps / sets using AHash instead of the default SipHash.
// Import these throughout the codebase with `use crate::types::{HashMap, HashSet}`.
// Also import `HashMapExt` / `HashSetExt` when you need `::new()` or `::with_capacity()`.
pub type HashMap<K, V> = ahash::HashMap<K, V>;
pub type HashSet<K> = ahash::HashSet<K>;
pub use ahash::HashMapExt;
pub use ahash::HashSetExt;

/// Strand as written in column 7 of a GTF or column 6 of a BED file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Strand {
    Forward,
    Reverse,
    Unknown,
}

impl Strand {
    pub fn parse(field: &str) -> Self {
        match field {
            "+" => Strand::Forward,
            "-" => Strand::Reverse,
            _ => Strand::Unknown,
        }
    }

    pub fn as_char(self) -> char {
        match self {
            Strand::Forward => '+',
            Strand::Reverse => '-',
            Strand::Unknown => '.',
        }
    }
}

impl fmt::Display for Strand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

/// A named interval in BED convention: 0-based, half-open `[start, end)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GenomicInterval {
    pub contig: String,
    pub start: u64,
    pub end: u64,
    pub strand: Strand,
    pub name: String,
}

impl GenomicInterval {
    /// Returns `None` for an empty contig name or when `start >= end`.
    pub fn new(contig: &str, start: u64, end: u64, strand: Strand, name: &str) -> Option<Self> {
        if contig.is_empty() || start >= end {
            return None;
        }
        Some(Self {
            contig: contig.to_string(),
            start,
            end,
            strand,
            name: name.to_string(),
        })
    }

    pub fn len(&self) -> u64 {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Key used for duplicate collapsing: neither name nor strand take part.
    pub fn coordinates(&self) -> (&str, u64, u64) {
        (&self.contig, self.start, self.end)
    }

    /// Six-column BED line with a `0` score placeholder, no trailing newline.
    pub fn to_bed6(&self) -> String {
        format!(
            "{}\t{}\t{}\t{}\t0\t{}",
            self.contig, self.start, self.end, self.name, self.strand
        )
    }
}

/// A TSS is stored as a width-1 interval anchored on the feature's first base.
pub type TssRecord = GenomicInterval;
