use mirtop_rs::error::{ConfigError, RecordError};
use mirtop_rs::gff::{GffReadError, parse_line};
use mirtop_rs::stats::{
    RawRow, StatRow, StatsLog, calc_stats, classify_record, passes, summarize, write_stats,
};
use std::io::Write;

const HEADER: &str = "## mirGFF3. VERSION 1.1\n## source-ontology: miRBasev21\n## COLDATA: sample1\n";
const LET7_ISOMIR: &str = "hsa-let-7a-5p\tmiRBasev21\tisomiR\t4\t25\t0\t+\t.\tRead hsa-let-7a-1_hsa-let-7a-5p_5:26_-1:-1_mut:null_add:null_x861; UID bhJJ5WJL2; Name hsa-let-7a-5p; Parent hsa-let-7a-1; Variant iso_5p:+1,iso_3p:-1; Cigar 22M; Expression 861; Filter Pass; Hits 1;";

fn write_file(dir: &tempfile::TempDir, name: &str, content: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    let mut f = std::fs::File::create(&path).unwrap();
    f.write_all(content.as_bytes()).unwrap();
    path
}

fn value(table: &[StatRow], category: &str, sample: &str) -> Option<f64> {
    table
        .iter()
        .find(|r| r.category == category && r.sample == sample)
        .map(|r| r.value)
}

#[test]
fn filter_is_case_insensitive() {
    assert!(passes("Pass"));
    assert!(passes("PASS"));
    assert!(!passes("Reject"));
    assert!(!passes(""));
}

#[test]
fn classify_emits_type_and_variant_tokens() {
    let rec = parse_line(LET7_ISOMIR).unwrap();
    let rows = classify_record(&rec, &["s".to_string()]);
    let cats: Vec<&str> = rows.iter().map(|r| r.category.as_str()).collect();
    assert_eq!(cats, vec!["isomiR", "iso_5p", "iso_3p"]);
    assert!(rows.iter().all(|r| r.count == 861 && r.sample == "s"));
}

#[test]
fn classify_skips_zero_counts_and_reference_variants() {
    let line = "m\tdb\tref_miRNA\t1\t20\t.\t+\t.\tUID=A; Name=m; Variant=NA; Expression=0,5; Filter=Pass";
    let rec = parse_line(line).unwrap();
    let rows = classify_record(&rec, &["a".to_string(), "b".to_string()]);
    assert_eq!(
        rows,
        vec![RawRow { category: "ref_miRNA".to_string(), sample: "b".to_string(), count: 5 }]
    );
}

#[test]
fn summary_views_and_defaults() {
    let raw = vec![
        RawRow { category: "isomiR".to_string(), sample: "s1".to_string(), count: 4 },
        RawRow { category: "isomiR".to_string(), sample: "s1".to_string(), count: 2 },
        RawRow { category: "ref_miRNA".to_string(), sample: "s1".to_string(), count: 9 },
    ];
    let table = summarize(&raw, &["s1".to_string(), "s2".to_string()]);

    assert_eq!(value(&table, "isomiR_sum", "s1"), Some(6.0));
    assert_eq!(value(&table, "isomiR_count", "s1"), Some(2.0));
    assert_eq!(value(&table, "isomiR_mean", "s1"), Some(3.0));
    assert_eq!(value(&table, "ref_miRNA_mean", "s1"), Some(9.0));
    // Nothing for s2: both defaults appear.
    assert_eq!(value(&table, "ref_miRNA_mean", "s2"), Some(0.0));
    assert_eq!(value(&table, "isomiR_sum", "s2"), Some(0.0));
    assert_eq!(table.len(), 6 + 2);

    let cats: Vec<&str> = table.iter().take(6).map(|r| r.category.as_str()).collect();
    assert_eq!(
        cats,
        vec!["isomiR_sum", "ref_miRNA_sum", "isomiR_count", "ref_miRNA_count", "isomiR_mean", "ref_miRNA_mean"]
    );
}

#[test]
fn end_to_end_single_isomir() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(&dir, "in.gff", &format!("{HEADER}{LET7_ISOMIR}\n{LET7_ISOMIR}\n"));
    let table = calc_stats(&path).unwrap();

    for cat in ["isomiR", "iso_5p", "iso_3p"] {
        assert_eq!(value(&table, &format!("{cat}_sum"), "sample1"), Some(861.0), "{cat}");
        assert_eq!(value(&table, &format!("{cat}_count"), "sample1"), Some(1.0), "{cat}");
        assert_eq!(value(&table, &format!("{cat}_mean"), "sample1"), Some(861.0), "{cat}");
    }
    assert_eq!(value(&table, "ref_miRNA_mean", "sample1"), Some(0.0));
    assert_eq!(table.len(), 10);
}

#[test]
fn failing_records_are_ignored() {
    let dir = tempfile::tempdir().unwrap();
    let rejected = LET7_ISOMIR.replace("Filter Pass", "Filter Reject");
    let path = write_file(&dir, "in.gff", &format!("{HEADER}{rejected}\n"));
    let table = calc_stats(&path).unwrap();
    assert_eq!(table.len(), 2);
    assert!(table.iter().all(|r| r.value == 0.0));
}

#[test]
fn missing_coldata_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(&dir, "in.gff", &format!("## mirGFF3. VERSION 1.1\n{LET7_ISOMIR}\n"));
    let err = calc_stats(&path).unwrap_err();
    let inner = err.downcast_ref::<GffReadError>().unwrap();
    assert!(matches!(inner, GffReadError::Config(ConfigError::MissingColdata { .. })));
}

#[test]
fn outputs_table_and_json_log() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(&dir, "in.gff", &format!("{HEADER}{LET7_ISOMIR}\n"));
    let table = calc_stats(&path).unwrap();
    let out = dir.path().join("stats");
    let (table_path, log_path) = write_stats(&out, &table).unwrap();

    let text = std::fs::read_to_string(table_path).unwrap();
    let mut lines = text.lines();
    assert!(lines.next().unwrap().starts_with("# mirtop-rs stats version "));
    assert_eq!(lines.next().unwrap(), "category,sample,counts");
    assert!(text.contains("isomiR_sum,sample1,861\n"));
    assert!(text.contains("ref_miRNA_mean,sample1,0\n"));

    let log: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(log_path).unwrap()).unwrap();
    assert_eq!(log["meta"]["tool"], "mirtop-rs");
    assert!(log["meta"]["version"].as_str().unwrap().starts_with('v'));
    assert_eq!(log["metrics"]["sample1"]["iso_5p_sum"], 861);
    assert_eq!(log["metrics"]["sample1"]["ref_miRNA_mean"], 0);
}

#[test]
fn log_keeps_fractional_means() {
    let table = vec![StatRow { category: "isomiR_mean".to_string(), sample: "s".to_string(), value: 2.5 }];
    let log = serde_json::to_value(StatsLog::new(&table)).unwrap();
    assert_eq!(log["metrics"]["s"]["isomiR_mean"], 2.5);
}

#[test]
fn expression_wider_than_coldata_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let wide = LET7_ISOMIR.replace("Expression 861;", "Expression 861,4;");
    let path = write_file(&dir, "in.gff", &format!("{HEADER}{wide}\n"));
    let err = calc_stats(&path).unwrap_err();
    let inner = err.downcast_ref::<GffReadError>().unwrap();
    assert!(matches!(
        inner,
        GffReadError::Record { source: RecordError::ExpressionWidth { found: 2, samples: 1 }, .. }
    ));
}

#[test]
fn records_differing_only_around_dashes_are_both_counted() {
    let dir = tempfile::tempdir().unwrap();
    let a = "m\tdb\tisomiR\t1\t20\t.\t+\t.\tUID=AB-; Name=x; Variant=iso_add:1; Expression=3; Filter=Pass";
    let b = "m\tdb\tisomiR\t1\t20\t.\t+\t.\tUID=AB; Name=x; Variant=-iso_add:1; Expression=4; Filter=Pass";
    let path = write_file(&dir, "in.gff", &format!("{HEADER}{a}\n{b}\n"));
    let table = calc_stats(&path).unwrap();
    assert_eq!(value(&table, "isomiR_sum", "sample1"), Some(7.0));
    assert_eq!(value(&table, "isomiR_count", "sample1"), Some(2.0));
}
