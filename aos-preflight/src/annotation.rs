//! GTF/GFF3 parsing and TSS derivation.
//!
//! Coordinate conventions:
//! - GTF/GFF are 1-based inclusive. A row whose end does not lie past its
//!   start (`end <= start`) is malformed.
//! - The TSS of a `+` feature is its start, of a `-` feature its end. It is
//!   written as a width-1 BED interval `[tss - 1, tss)`.
//! - Features without a usable strand (`.` or `?`) are rejected: a TSS cannot
//!   be placed without knowing which end the feature starts from.
//! - Records sharing `(contig, start, end)` collapse to the one whose name
//!   sorts first, whatever their strands.

use crate::error::{PreflightError, Result};
use crate::reader::open_text;
use crate::types::{GenomicInterval, Strand, TssRecord};
use noodles::gff::feature::RecordBuf;
use std::fs::File;
use std::io::{self, BufRead, BufWriter, Write};
use std::path::{Path, PathBuf};

pub const TSS_BED: &str = "TSS.bed";
pub const DEFAULT_FEATURE_TYPE: &str = "gene";

// Attribute keys tried in order when naming a feature.
const ID_KEYS: [&[u8]; 4] = [b"gene_id", b"transcript_id", b"ID", b"Name"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnnotationFormat {
    Gtf,
    Gff3,
}

impl AnnotationFormat {
    /// `.gff`/`.gff3` (optionally compressed) read as GFF3, anything else as GTF.
    pub fn from_path(path: &Path) -> Self {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        let name = name
            .strip_suffix(".gz")
            .or_else(|| name.strip_suffix(".bgz"))
            .unwrap_or(&name);
        if name.ends_with(".gff") || name.ends_with(".gff3") {
            AnnotationFormat::Gff3
        } else {
            AnnotationFormat::Gtf
        }
    }
}

/// One data row of an annotation, reduced to the columns TSS derivation needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnotationRecord {
    pub contig: String,
    pub start: u64,
    pub end: u64,
    pub strand: Strand,
    pub feature_type: String,
    pub id: String,
}

impl AnnotationRecord {
    /// Parse one non-comment line with the noodles record reader for `format`.
    pub fn parse(line: &str, format: AnnotationFormat) -> std::result::Result<Self, String> {
        let record = read_record_buf(line, format).map_err(|e| e.to_string())?;
        Self::from_record_buf(&record)
    }

    fn from_record_buf(record: &RecordBuf) -> std::result::Result<Self, String> {
        let contig = record.reference_sequence_name().to_string();
        if contig.is_empty() {
            return Err("empty sequence name".to_string());
        }

        let start = record.start().get() as u64;
        let end = record.end().get() as u64;
        if end <= start {
            return Err(format!("invalid interval {start}-{end}: end must lie past start"));
        }

        let id = ID_KEYS
            .iter()
            .find_map(|key| get_record_buf_attribute(record.attributes(), key))
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| format!("{contig}:{start}-{end}"));

        let feature_type: &[u8] = record.ty().as_ref();
        Ok(Self {
            contig,
            start,
            end,
            strand: strand_from_record(record.strand()),
            feature_type: String::from_utf8_lossy(feature_type).into_owned(),
            id,
        })
    }

    /// 1-based TSS coordinate, or `None` when the strand is unknown.
    pub fn tss(&self) -> Option<u64> {
        match self.strand {
            Strand::Forward => Some(self.start),
            Strand::Reverse => Some(self.end),
            Strand::Unknown => None,
        }
    }
}

// One reader per line keeps the line number of a failing row at hand.
fn read_record_buf(line: &str, format: AnnotationFormat) -> io::Result<RecordBuf> {
    let next = match format {
        AnnotationFormat::Gtf => {
            let mut reader = noodles::gtf::io::Reader::new(line.as_bytes());
            let next = reader.record_bufs().next();
            next
        }
        AnnotationFormat::Gff3 => {
            let mut reader = noodles::gff::io::Reader::new(line.as_bytes());
            let next = reader.record_bufs().next();
            next
        }
    };
    next.unwrap_or_else(|| Err(io::Error::new(io::ErrorKind::InvalidData, "no record on line")))
}

fn get_record_buf_attribute(
    attrs: &noodles::gff::feature::record_buf::Attributes,
    key: &[u8],
) -> Option<String> {
    let value = attrs.get(key)?;
    value.iter().next().map(|v| v.to_string())
}

fn strand_from_record(strand: noodles::gff::feature::record::Strand) -> Strand {
    use noodles::gff::feature::record::Strand as GffStrand;
    match strand {
        GffStrand::Forward => Strand::Forward,
        GffStrand::Reverse => Strand::Reverse,
        GffStrand::None | GffStrand::Unknown => Strand::Unknown,
    }
}

/// Extract sorted, duplicate-free TSS records for every `feature_type` row.
///
/// Every data row is checked for structure, including rows of other feature
/// types. `path` is only used for error messages.
pub fn extract_tss<R: BufRead>(reader: R, path: &Path, feature_type: &str) -> Result<Vec<TssRecord>> {
    let malformed = |line: usize, reason: String| PreflightError::MalformedAnnotation {
        path: path.to_path_buf(),
        line,
        reason,
    };

    let format = AnnotationFormat::from_path(path);
    let mut records: Vec<TssRecord> = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line_no = idx + 1;
        let line = line.map_err(|e| PreflightError::io(path, e))?;
        let line = line.trim_end_matches('\r');
        // embedded sequences end the feature section of a GFF3
        if line.starts_with("##FASTA") {
            break;
        }
        if line.trim().is_empty() || line.starts_with('#') {
            continue;
        }

        let record = AnnotationRecord::parse(line, format).map_err(|reason| malformed(line_no, reason))?;
        if record.feature_type != feature_type {
            continue;
        }

        let tss = record.tss().ok_or_else(|| {
            malformed(
                line_no,
                format!("{} '{}' has no usable strand", record.feature_type, record.id),
            )
        })?;
        let interval = GenomicInterval::new(&record.contig, tss - 1, tss, record.strand, &record.id)
            .ok_or_else(|| malformed(line_no, "TSS interval is empty".to_string()))?;
        records.push(interval);
    }

    if records.is_empty() {
        return Err(PreflightError::EmptyResult {
            path: path.to_path_buf(),
            feature_type: feature_type.to_string(),
        });
    }

    let found = records.len();
    records.sort_by(|a, b| {
        (&a.contig, a.start, a.end, &a.name, a.strand).cmp(&(&b.contig, b.start, b.end, &b.name, b.strand))
    });
    records.dedup_by(|later, kept| later.coordinates() == kept.coordinates());
    tracing::debug!(
        found,
        kept = records.len(),
        "collapsed duplicate TSS coordinates"
    );

    Ok(records)
}

/// Derive `TSS.bed` inside `output_dir` from the annotation at `annotation`.
///
/// Overwrites any existing file. Output is byte-identical for identical input.
pub fn derive_tss(annotation: &Path, feature_type: &str, output_dir: &Path) -> Result<PathBuf> {
    let reader = open_text(annotation)?;
    let records = extract_tss(reader, annotation, feature_type)?;

    let out_path = output_dir.join(TSS_BED);
    write_bed(&records, &out_path)?;

    tracing::info!(
        records = records.len(),
        feature_type,
        path = %out_path.display(),
        "wrote TSS file"
    );
    Ok(out_path)
}

fn write_bed(records: &[TssRecord], path: &Path) -> Result<()> {
    let file = File::create(path).map_err(|e| PreflightError::io(path, e))?;
    let mut writer = BufWriter::new(file);
    for record in records {
        writeln!(writer, "{}", record.to_bed6()).map_err(|e| PreflightError::io(path, e))?;
    }
    writer.flush().map_err(|e| PreflightError::io(path, e))
}
