use crate::annotate::{AnnotateConfig, annotate};
use crate::annotation::load_mirbase;
use crate::bam_input;
use crate::cli::{AnnotateArgs, CountsArgs, InputFormat, MergeArgs, StatsArgs};
use crate::counts::convert_counts;
use crate::fasta::Precursors;
use crate::gff::{self, GffHeader, GffWriter};
use crate::merge::merge_files;
use crate::prost;
use crate::stats::{StatRow, calc_stats, write_stats};
use anyhow::{Context, Result, bail};
use crossfire::mpmc;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::thread;

#[derive(Debug, Default)]
pub struct RunStats {
    pub files: u64,
    pub hits: u64,
    pub skipped: u64,
    pub records: u64,
}

pub fn run_annotate(args: &AnnotateArgs) -> Result<RunStats> {
    if !args.sample.is_empty() && args.sample.len() != args.inputs.len() {
        bail!(
            "{} sample names given for {} input files",
            args.sample.len(),
            args.inputs.len()
        );
    }

    let precursors = Precursors::load(&args.hairpin, args.sps.as_deref())?;
    let annotation = load_mirbase(&args.gtf)
        .with_context(|| format!("loading {}", args.gtf.display()))?;
    let config = AnnotateConfig { max_offset: args.max_offset, ..AnnotateConfig::default() };
    std::fs::create_dir_all(&args.out)
        .with_context(|| format!("creating {}", args.out.display()))?;

    let mut stats = RunStats::default();
    for (i, input) in args.inputs.iter().enumerate() {
        let (mut hits, import) = match args.format {
            InputFormat::Prost => prost::read_file(input, &precursors, &annotation.loci)?,
            InputFormat::Bam => bam_input::read_bam(input, &precursors)?,
        };
        annotate(&mut hits, &annotation.matures, &config);
        let records = gff::create(&hits, &annotation.database, &config.filter)?;

        let sample = args.sample.get(i).cloned().unwrap_or_else(|| file_stem(input));
        let header = GffHeader { source: annotation.database.clone(), samples: vec![sample] };
        let out_path = args.out.join(format!("{}.gff", file_stem(input)));
        let file = File::create(&out_path)
            .with_context(|| format!("creating {}", out_path.display()))?;
        let mut writer = GffWriter::new(BufWriter::new(file), &header)?;
        for record in &records {
            writer.write_record(record)?;
        }
        writer.finish()?;

        tracing::info!(input = %input.display(), output = %out_path.display(), records = records.len(), "annotated");
        stats.files += 1;
        stats.hits += import.hits;
        stats.skipped += import.skipped();
        stats.records += records.len() as u64;
    }
    Ok(stats)
}

pub fn run_merge(args: &MergeArgs) -> Result<RunStats> {
    let (merged, merge_stats) = merge_files(&args.inputs)?;
    let file = File::create(&args.out)
        .with_context(|| format!("creating {}", args.out.display()))?;
    let mut writer = GffWriter::new(BufWriter::new(file), &merged.header)?;
    for record in &merged.records {
        writer.write_record(record)?;
    }
    writer.finish()?;

    Ok(RunStats {
        files: merge_stats.files,
        hits: 0,
        skipped: merge_stats.duplicates,
        records: merge_stats.rows,
    })
}

pub fn run_stats(args: &StatsArgs) -> Result<RunStats> {
    let tables = if args.threads > 1 && args.inputs.len() > 1 {
        stats_parallel(&args.inputs, args.threads as usize)?
    } else {
        args.inputs.iter().map(|path| calc_stats(path)).collect::<Result<Vec<_>>>()?
    };

    let table: Vec<StatRow> = tables.into_iter().flatten().collect();
    let (table_path, log_path) = write_stats(&args.out, &table)?;
    tracing::info!(table = %table_path.display(), log = %log_path.display(), rows = table.len(), "stats written");

    Ok(RunStats {
        files: args.inputs.len() as u64,
        hits: 0,
        skipped: 0,
        records: table.len() as u64,
    })
}

pub fn run_counts(args: &CountsArgs) -> Result<RunStats> {
    let (_, counts) = convert_counts(&args.gff, &args.out)?;
    Ok(RunStats {
        files: 1,
        hits: 0,
        skipped: counts.invalid_uid + counts.invalid_variant,
        records: counts.rows,
    })
}

struct WorkItem {
    idx: usize,
    path: PathBuf,
}

struct ResultItem {
    idx: usize,
    result: Result<Vec<StatRow>>,
}

/// Summarize files on a worker pool; tables come back in input order.
fn stats_parallel(inputs: &[PathBuf], worker_count: usize) -> Result<Vec<Vec<StatRow>>> {
    crossfire::detect_backoff_cfg();
    let cap = worker_count.saturating_mul(4).max(8);
    let (tx_work, rx_work) = mpmc::bounded_blocking::<WorkItem>(cap);
    let (tx_res, rx_res) = mpmc::unbounded_blocking::<ResultItem>();

    thread::scope(|scope| -> Result<Vec<Vec<StatRow>>> {
        for _ in 0..worker_count {
            let rx_work = rx_work.clone();
            let tx_res = tx_res.clone();
            scope.spawn(move || {
                while let Ok(item) = rx_work.recv() {
                    let result = calc_stats(&item.path);
                    let _ = tx_res.send(ResultItem { idx: item.idx, result });
                }
            });
        }
        drop(tx_res);

        for (idx, path) in inputs.iter().enumerate() {
            tx_work.send(WorkItem { idx, path: path.clone() })?;
        }
        drop(tx_work);

        let total = inputs.len();
        let mut pending: BTreeMap<usize, Result<Vec<StatRow>>> = BTreeMap::new();
        let mut tables = Vec::with_capacity(total);
        while tables.len() < total {
            let res = rx_res
                .recv()
                .map_err(|_| anyhow::anyhow!("worker result channel closed"))?;
            pending.insert(res.idx, res.result);
            while let Some(result) = pending.remove(&tables.len()) {
                tables.push(result?);
            }
        }

        Ok(tables)
    })
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "sample".to_string())
}
