use aos_preflight::annotation::{derive_tss, extract_tss, TSS_BED};
use aos_preflight::{PreflightError, Strand};
use flate2::write::GzEncoder;
use flate2::Compression;
use std::io::{Cursor, Write};
use std::path::Path;

fn gtf_row(contig: &str, feature: &str, start: u64, end: u64, strand: &str, id: &str) -> String {
    format!("{contig}\ttest\t{feature}\t{start}\t{end}\t.\t{strand}\t.\tgene_id \"{id}\"; gene_name \"{id}\";\n")
}

fn extract(content: &str, feature_type: &str) -> Result<Vec<aos_preflight::TssRecord>, PreflightError> {
    extract_tss(Cursor::new(content.as_bytes()), Path::new("test.gtf"), feature_type)
}

#[test]
fn tss_follows_strand_rule() {
    let gtf = [
        gtf_row("chr1", "gene", 100, 200, "+", "plus"),
        gtf_row("chr1", "gene", 300, 500, "-", "minus"),
    ]
    .concat();
    let records = extract(&gtf, "gene").unwrap();

    assert_eq!(records.len(), 2);
    let plus = &records[0];
    assert_eq!((plus.start, plus.end, plus.strand), (99, 100, Strand::Forward));
    assert_eq!(plus.end, 100, "1-based TSS of a + feature is its start");
    assert_eq!(plus.name, "plus");

    let minus = &records[1];
    assert_eq!((minus.start, minus.end, minus.strand), (499, 500, Strand::Reverse));
    assert_eq!(minus.end, 500, "1-based TSS of a - feature is its end");
}

#[test]
fn output_is_sorted_and_duplicate_free() {
    let gtf = [
        "#!genome-build test\n".to_string(),
        gtf_row("chr2", "gene", 50, 90, "+", "b"),
        gtf_row("chr10", "gene", 10, 20, "+", "c"),
        gtf_row("chr2", "gene", 5, 9, "+", "a"),
        // same TSS as "b" on the same strand: collapses
        gtf_row("chr2", "gene", 50, 70, "+", "b2"),
        // same position, other strand: collapses too
        gtf_row("chr2", "gene", 1, 50, "-", "d"),
        "\n".to_string(),
    ]
    .concat();
    let records = extract(&gtf, "gene").unwrap();

    let keys: Vec<(&str, u64, &str)> = records
        .iter()
        .map(|r| (r.contig.as_str(), r.start, r.name.as_str()))
        .collect();
    assert_eq!(
        keys,
        vec![("chr10", 9, "c"), ("chr2", 4, "a"), ("chr2", 49, "b")]
    );
    assert_eq!(records[2].strand, Strand::Forward);
    for pair in records.windows(2) {
        assert!(pair[0].coordinates() < pair[1].coordinates());
    }
}

#[test]
fn opposite_strand_tss_at_same_base_collapses_by_name() {
    // "+" feature starting at 5 and "-" feature ending at 5 share [4, 5)
    let gtf = [
        gtf_row("chr1", "gene", 2, 5, "-", "b"),
        gtf_row("chr1", "gene", 5, 30, "+", "a"),
    ]
    .concat();
    let records = extract(&gtf, "gene").unwrap();
    let lines: Vec<String> = records.iter().map(|r| r.to_bed6()).collect();
    assert_eq!(lines, vec!["chr1\t4\t5\ta\t0\t+"]);
}

#[test]
fn only_selected_feature_type_is_kept() {
    let gtf = [
        gtf_row("chr1", "gene", 100, 900, "+", "g1"),
        gtf_row("chr1", "transcript", 150, 900, "+", "g1"),
        gtf_row("chr1", "exon", 150, 300, ".", "g1"),
    ]
    .concat();

    let genes = extract(&gtf, "gene").unwrap();
    assert_eq!(genes.len(), 1);
    assert_eq!(genes[0].start, 99);

    let transcripts = extract(&gtf, "transcript").unwrap();
    assert_eq!(transcripts.len(), 1);
    assert_eq!(transcripts[0].start, 149);
}

#[test]
fn unknown_strand_on_selected_feature_is_rejected() {
    let gtf = gtf_row("chr1", "gene", 100, 200, ".", "nostrand");
    let err = extract(&gtf, "gene").unwrap_err();
    match err {
        PreflightError::MalformedAnnotation { line, reason, .. } => {
            assert_eq!(line, 1);
            assert!(reason.contains("nostrand"), "{reason}");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn structural_errors_name_the_line() {
    let too_short = "chr1\ttest\tgene\t1\t10\t.\t+\n";
    let non_numeric = "chr1\ttest\tgene\tone\t10\t.\t+\t.\tgene_id \"g\";\n";
    let inverted = format!("{}{}", gtf_row("chr1", "gene", 1, 10, "+", "ok"), gtf_row("chr1", "exon", 20, 10, "+", "bad"));
    let zero_length = format!(
        "#!genome-build test\n{}{}",
        gtf_row("chr1", "gene", 1, 10, "+", "ok"),
        gtf_row("chr1", "gene", 10, 10, "+", "point")
    );
    let zero_start = gtf_row("chr1", "gene", 0, 10, "+", "zero");

    for (content, expected_line) in [
        (too_short.to_string(), 1),
        (non_numeric.to_string(), 1),
        (inverted, 2),
        (zero_length, 3),
        (zero_start, 1),
    ] {
        match extract(&content, "gene") {
            Err(PreflightError::MalformedAnnotation { line, .. }) => assert_eq!(line, expected_line),
            other => panic!("expected MalformedAnnotation, got {other:?}"),
        }
    }
}

#[test]
fn no_matching_rows_is_an_empty_result() {
    let gtf = gtf_row("chr1", "exon", 1, 10, "+", "g");
    assert!(matches!(
        extract(&gtf, "gene"),
        Err(PreflightError::EmptyResult { ref feature_type, .. }) if feature_type == "gene"
    ));
    assert!(matches!(extract("", "gene"), Err(PreflightError::EmptyResult { .. })));
}

#[test]
fn derive_tss_is_idempotent_and_overwrites() {
    let dir = tempfile::tempdir().unwrap();
    let gtf = dir.path().join("genes.gtf");
    std::fs::write(
        &gtf,
        [
            gtf_row("chr1", "gene", 100, 200, "+", "g1"),
            gtf_row("chr1", "gene", 300, 500, "-", "g2"),
        ]
        .concat(),
    )
    .unwrap();

    std::fs::write(dir.path().join(TSS_BED), "stale\n").unwrap();
    let first_path = derive_tss(&gtf, "gene", dir.path()).unwrap();
    let first = std::fs::read(&first_path).unwrap();
    let second_path = derive_tss(&gtf, "gene", dir.path()).unwrap();
    let second = std::fs::read(&second_path).unwrap();

    assert_eq!(first_path, dir.path().join(TSS_BED));
    assert_eq!(first, second);
    assert_eq!(
        String::from_utf8(first).unwrap(),
        "chr1\t99\t100\tg1\t0\t+\nchr1\t499\t500\tg2\t0\t-\n"
    );
}

#[test]
fn gff3_annotation_is_read_by_extension() {
    let dir = tempfile::tempdir().unwrap();
    let gff = dir.path().join("genes.gff3");
    std::fs::write(
        &gff,
        "##gff-version 3\n\
         chr1\ttest\tgene\t100\t200\t.\t+\t.\tID=g1;Name=alpha\n\
         chr1\ttest\tmRNA\t100\t200\t.\t+\t.\tID=t1;Parent=g1\n\
         chr1\ttest\tgene\t300\t500\t.\t-\t.\tName=beta\n\
         ##FASTA\n\
         >chr1\n\
         ACGT\n",
    )
    .unwrap();

    let out = derive_tss(&gff, "gene", dir.path()).unwrap();
    assert_eq!(
        std::fs::read_to_string(out).unwrap(),
        "chr1\t99\t100\tg1\t0\t+\nchr1\t499\t500\tbeta\t0\t-\n"
    );
}

#[test]
fn gzip_annotation_matches_plain() {
    let dir = tempfile::tempdir().unwrap();
    let content = [
        gtf_row("chr3", "gene", 10, 40, "-", "x"),
        gtf_row("chr1", "gene", 7, 9, "+", "y"),
    ]
    .concat();

    let plain = dir.path().join("plain.gtf");
    std::fs::write(&plain, &content).unwrap();
    let gz = dir.path().join("compressed.gtf.gz");
    let mut encoder = GzEncoder::new(std::fs::File::create(&gz).unwrap(), Compression::default());
    encoder.write_all(content.as_bytes()).unwrap();
    encoder.finish().unwrap();

    let out_plain = tempfile::tempdir().unwrap();
    let out_gz = tempfile::tempdir().unwrap();
    let a = std::fs::read(derive_tss(&plain, "gene", out_plain.path()).unwrap()).unwrap();
    let b = std::fs::read(derive_tss(&gz, "gene", out_gz.path()).unwrap()).unwrap();
    assert_eq!(a, b);
}
