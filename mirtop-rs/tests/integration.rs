/// End-to-end runs of the mirtop-rs binary on small generated inputs.
///
/// Every test writes its inputs into a temporary directory, runs one
/// subcommand and checks the files it produced.
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

// ── helpers ──────────────────────────────────────────────────────────────────

const HAIRPIN: &str = ">hsa-let-7a-1 MI0000060 Homo sapiens let-7a-1 stem-loop
UGGGAUGAGGUAGUAGGUUGUAUAGUUUUAGGGUCACACCCACCACUGGGAGAUAACUAUACAAUCUACUGUCUUUCCUA
>mmu-let-7a-1 MI0000556 Mus musculus let-7a-1 stem-loop
UUCACUGUGGGAUGAGGUAGUAGGUUGUAUAGUUUUAGGGUCACACCCACCACUGGGAGAUAACUAUACAAUCUACUGUCUUUCCUAACGUG
";

const MIRBASE: &str = "##gff-version 3
# miRBase v21
chr9\t.\tmiRNA_primary_transcript\t96938239\t96938318\t.\t+\t.\tID=MI0000060;Alias=MI0000060;Name=hsa-let-7a-1
chr9\t.\tmiRNA\t96938244\t96938265\t.\t+\t.\tID=MIMAT0000062;Alias=MIMAT0000062;Name=hsa-let-7a-5p;Derives_from=MI0000060
";

const MATURE: &str = "TGAGGTAGTAGGTTGTATAGTT";

fn mirtop_bin() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_mirtop-rs"))
}

fn run(args: &[&str]) {
    let output = Command::new(mirtop_bin())
        .arg("--quiet")
        .args(args)
        .output()
        .expect("failed to spawn mirtop-rs");
    assert!(
        output.status.success(),
        "mirtop-rs {args:?} failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
}

fn prost_line(seq: &str, loci: &str, count: u64) -> String {
    format!("{seq}\t1\t.\t.\t.\t{loci}\t.\t.\t.\t{count}\t.\thsa-let-7a-5p\n")
}

fn write(path: &Path, content: &str) {
    fs::write(path, content).expect("write input");
}

fn body_lines(path: &Path) -> Vec<String> {
    fs::read_to_string(path)
        .expect("read output")
        .lines()
        .filter(|l| !l.starts_with('#'))
        .map(str::to_string)
        .collect()
}

fn annotate_sample(dir: &Path, name: &str, rows: &[(&str, &str, u64)]) -> PathBuf {
    let hairpin = dir.join("hairpin.fa");
    let gff3 = dir.join("hsa.gff3");
    write(&hairpin, HAIRPIN);
    write(&gff3, MIRBASE);

    let mut prost = String::from("sequence\tx\tx\tx\tx\tloci\tx\tx\tx\tcount\tx\tmirna\n");
    for (seq, loci, count) in rows {
        prost.push_str(&prost_line(seq, loci, *count));
    }
    let input = dir.join(format!("{name}.prost"));
    write(&input, &prost);

    let out = dir.join("annotated");
    run(&[
        "annotate",
        "--format",
        "prost",
        "--hairpin",
        hairpin.to_str().unwrap(),
        "--gtf",
        gff3.to_str().unwrap(),
        "--sps",
        "hsa",
        "-o",
        out.to_str().unwrap(),
        input.to_str().unwrap(),
    ]);
    out.join(format!("{name}.gff"))
}

// ── tests ─────────────────────────────────────────────────────────────────────

#[test]
fn annotate_prost_writes_mirgff() {
    let dir = tempfile::tempdir().unwrap();
    let gff = annotate_sample(
        dir.path(),
        "s1",
        &[
            (MATURE, "chr9:96938244-96938265", 12),
            ("GAGGTAGTAGGTTGTATAGTTA", "chr9:96938245-96938266", 3),
        ],
    );

    let text = fs::read_to_string(&gff).unwrap();
    assert!(text.starts_with("## mirGFF3. VERSION 1.1\n"));
    assert!(text.contains("## source-ontology: miRBasev21\n"));
    assert!(text.contains("## COLDATA: s1\n"));

    let body = body_lines(&gff);
    assert_eq!(body.len(), 2);
    assert!(body[0].contains("\tisomiR\t7\t28\t"));
    assert!(body[0].contains("Variant=iso_5p:-1,iso_add:1"));
    assert!(body[1].contains("\tref_miRNA\t6\t27\t"));
    assert!(body[1].contains("Variant=NA"));
    assert!(body[1].contains("Expression=12"));
}

#[test]
fn merge_then_stats() {
    let dir = tempfile::tempdir().unwrap();
    let a_dir = dir.path().join("a");
    let b_dir = dir.path().join("b");
    fs::create_dir_all(&a_dir).unwrap();
    fs::create_dir_all(&b_dir).unwrap();
    let a = annotate_sample(&a_dir, "s1", &[(MATURE, "chr9:96938244-96938265", 5)]);
    let b = annotate_sample(&b_dir, "s2", &[(MATURE, "chr9:96938244-96938265", 7)]);

    let merged = dir.path().join("merged.gff");
    run(&["merge", "-o", merged.to_str().unwrap(), a.to_str().unwrap(), b.to_str().unwrap()]);
    let text = fs::read_to_string(&merged).unwrap();
    assert!(text.contains("## COLDATA: s1,s2\n"));
    let body = body_lines(&merged);
    assert_eq!(body.len(), 1);
    assert!(body[0].contains("Expression=5,7"));

    let stats_dir = dir.path().join("stats");
    run(&["stats", "-o", stats_dir.to_str().unwrap(), merged.to_str().unwrap()]);
    let table = fs::read_to_string(stats_dir.join("mirtop_stats.txt")).unwrap();
    assert!(table.contains("ref_miRNA_sum,s1,5\n"));
    assert!(table.contains("ref_miRNA_sum,s2,7\n"));
    assert!(table.contains("isomiR_sum,s1,0\n"));
    assert!(stats_dir.join("mirtop_stats.log").is_file());
}

#[test]
fn parallel_stats_keep_input_order() {
    let dir = tempfile::tempdir().unwrap();
    let mut inputs = Vec::new();
    for (i, count) in [3u64, 1, 4, 1, 5].iter().enumerate() {
        let path = dir.path().join(format!("f{i}.gff"));
        write(
            &path,
            &format!(
                "## mirGFF3. VERSION 1.1\n## source-ontology: miRBasev21\n## COLDATA: f{i}\nhsa-let-7a-1\tmiRBasev21\tref_miRNA\t6\t27\t.\t+\t.\tUID=A; Name=hsa-let-7a-5p; Variant=NA; Expression={count}; Filter=Pass\n"
            ),
        );
        inputs.push(path);
    }

    let out = dir.path().join("stats");
    let mut args = vec!["stats".to_string(), "--threads".to_string(), "3".to_string()];
    args.push("-o".to_string());
    args.push(out.to_str().unwrap().to_string());
    args.extend(inputs.iter().map(|p| p.to_str().unwrap().to_string()));
    let args: Vec<&str> = args.iter().map(String::as_str).collect();
    run(&args);

    let table = fs::read_to_string(out.join("mirtop_stats.txt")).unwrap();
    let samples: Vec<&str> = table
        .lines()
        .filter(|l| l.starts_with("ref_miRNA_sum,"))
        .map(|l| l.split(',').nth(1).unwrap())
        .collect();
    assert_eq!(samples, vec!["f0", "f1", "f2", "f3", "f4"]);
}

#[test]
fn stats_fails_without_coldata() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bad.gff");
    write(&path, "## mirGFF3. VERSION 1.1\n");
    let status = Command::new(mirtop_bin())
        .args(["--quiet", "stats", "-o"])
        .arg(dir.path().join("out"))
        .arg(&path)
        .status()
        .expect("failed to spawn mirtop-rs");
    assert!(!status.success());
}

#[test]
fn counts_exports_expression_matrix() {
    let dir = tempfile::tempdir().unwrap();
    let gff = annotate_sample(
        dir.path(),
        "s1",
        &[
            (MATURE, "chr9:96938244-96938265", 12),
            ("GAGGTAGTAGGTTGTATAGTTA", "chr9:96938245-96938266", 3),
        ],
    );

    let out = dir.path().join("counts");
    run(&["counts", "-o", out.to_str().unwrap(), gff.to_str().unwrap()]);
    let text = fs::read_to_string(out.join("expression_counts.tsv")).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines[0], "UID\tRead\tmiRNA\tVariant\tiso_5p\tiso_3p\tiso_add\tiso_snp\ts1");
    assert_eq!(lines.len(), 3);
    assert!(lines[1].contains("\tGAGGTAGTAGGTTGTATAGTTA\thsa-let-7a-5p\tiso_5p:-1,iso_add:1\t-1\t0\t1\t0\t3"));
    assert!(lines[2].ends_with(&format!("\t{MATURE}\thsa-let-7a-5p\tNA\t0\t0\t0\t0\t12")));
}
