use std::collections::{BTreeMap, BTreeSet};
use std::fs;

use camino::{Utf8Path, Utf8PathBuf};
use serde::Deserialize;

use crate::domain::CazyFamily;
use crate::error::PipelineError;
use crate::layout::{self, Layout, OVERVIEW_FILE};

/// Rows with fewer agreeing tools than this are dropped.
const MIN_AGREEING_TOOLS: u32 = 2;

/// One row of a dbCAN overview report, the per-gene consensus across the
/// three prediction tools.
#[derive(Debug, Clone, Deserialize)]
pub struct OverviewRow {
    #[serde(rename = "Gene ID")]
    pub gene_id: String,
    #[serde(rename = "HMMER")]
    pub hmmer: String,
    #[serde(rename = "Hotpep")]
    pub hotpep: String,
    #[serde(rename = "DIAMOND")]
    pub diamond: String,
    #[serde(rename = "#ofTools")]
    pub tool_count: u32,
}

impl OverviewRow {
    /// A row is kept only when both the Hotpep and DIAMOND calls are
    /// present and the tool's own consensus column agrees with at least
    /// two methods.
    pub fn passes_consensus(&self) -> bool {
        self.hotpep != "-" && self.diamond != "-" && self.tool_count >= MIN_AGREEING_TOOLS
    }
}

/// Per-genome aggregation of one overview report.
#[derive(Debug, Clone)]
pub struct GenomeSummary {
    /// Name of the directory containing the report, i.e. the taxonomy id.
    pub genome_id: String,
    pub family_counts: BTreeMap<CazyFamily, u64>,
    pub gene_family_counts: BTreeMap<(String, CazyFamily), u64>,
}

/// Parses and aggregates a single overview report. Rows failing the
/// consensus filter are dropped; surviving rows are deduplicated on the
/// (gene id, family) pair, last match wins.
pub fn summarize_overview(overview_path: &Utf8Path) -> Result<GenomeSummary, PipelineError> {
    let genome_id = overview_path
        .parent()
        .and_then(Utf8Path::file_name)
        .unwrap_or("unknown")
        .to_string();
    tracing::info!("reading file {overview_path}");
    let content = fs::read_to_string(overview_path.as_std_path())
        .map_err(|err| PipelineError::Filesystem(format!("read {overview_path}: {err}")))?;
    summarize_report(&genome_id, &content)
}

pub fn summarize_report(genome_id: &str, content: &str) -> Result<GenomeSummary, PipelineError> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .from_reader(content.as_bytes());

    // Last row wins for a repeated (gene, family) pair; each surviving
    // pair then counts exactly once.
    let mut deduped: BTreeMap<(String, CazyFamily), OverviewRow> = BTreeMap::new();
    for row in reader.deserialize() {
        let row: OverviewRow = row.map_err(|err| PipelineError::Csv(err.to_string()))?;
        if !row.passes_consensus() {
            continue;
        }
        let family = CazyFamily::normalize(&row.hotpep);
        deduped.insert((row.gene_id.clone(), family), row);
    }

    let mut family_counts: BTreeMap<CazyFamily, u64> = BTreeMap::new();
    let mut gene_family_counts: BTreeMap<(String, CazyFamily), u64> = BTreeMap::new();
    for (gene_id, family) in deduped.into_keys() {
        *family_counts.entry(family.clone()).or_insert(0) += 1;
        *gene_family_counts.entry((gene_id, family)).or_insert(0) += 1;
    }

    Ok(GenomeSummary {
        genome_id: genome_id.to_string(),
        family_counts,
        gene_family_counts,
    })
}

/// Writes the per-genome gene-level table under the summary tree and
/// returns its path. Columns: gene id, family, count labelled with the
/// genome id; rows sorted by family then gene.
pub fn write_genome_summary(
    layout: &Layout,
    summary: &GenomeSummary,
) -> Result<Utf8PathBuf, PipelineError> {
    layout.ensure_summary_root()?;
    let path = layout.genome_summary_path(&summary.genome_id);

    let mut writer = csv::Writer::from_writer(Vec::new());
    writer
        .write_record(["Gene ID", "CAZy ID", summary.genome_id.as_str()])
        .map_err(|err| PipelineError::Csv(err.to_string()))?;

    let mut rows: Vec<(&(String, CazyFamily), &u64)> = summary.gene_family_counts.iter().collect();
    rows.sort_by(|((gene_a, fam_a), _), ((gene_b, fam_b), _)| {
        fam_a.cmp(fam_b).then_with(|| gene_a.cmp(gene_b))
    });
    for ((gene_id, family), count) in rows {
        writer
            .write_record([gene_id.as_str(), family.as_str(), &count.to_string()])
            .map_err(|err| PipelineError::Csv(err.to_string()))?;
    }

    let content = writer
        .into_inner()
        .map_err(|err| PipelineError::Csv(err.to_string()))?;
    layout::write_bytes_atomic(&path, &content)?;
    Ok(path)
}

/// Outer join of per-genome family counts on the family id, absent
/// combinations filled with zero. Genome columns keep their input order.
pub fn combine_family_counts(summaries: &[GenomeSummary]) -> Vec<csv::StringRecord> {
    let families: BTreeSet<&CazyFamily> = summaries
        .iter()
        .flat_map(|summary| summary.family_counts.keys())
        .collect();

    let mut rows = Vec::with_capacity(families.len() + 1);
    let mut header = vec!["CAZy ID".to_string()];
    header.extend(summaries.iter().map(|summary| summary.genome_id.clone()));
    rows.push(csv::StringRecord::from(header));

    for family in families {
        let mut row = vec![family.to_string()];
        for summary in summaries {
            let count = summary.family_counts.get(family).copied().unwrap_or(0);
            row.push(count.to_string());
        }
        rows.push(csv::StringRecord::from(row));
    }
    rows
}

#[derive(Debug, Clone)]
pub struct AggregateResult {
    pub genome_summaries: Vec<Utf8PathBuf>,
    pub combined_path: Utf8PathBuf,
    pub genomes: usize,
    pub families: usize,
}

/// Walks the genomes tree, summarizes every non-empty overview report,
/// writes one gene-level file per genome and the combined cross-genome
/// matrix.
pub fn aggregate_genomes(layout: &Layout) -> Result<AggregateResult, PipelineError> {
    let mut summaries = Vec::new();
    let mut written = Vec::new();

    for overview_path in overview_files(layout.genomes_root())? {
        let summary = summarize_overview(&overview_path)?;
        written.push(write_genome_summary(layout, &summary)?);
        summaries.push(summary);
    }

    let rows = combine_family_counts(&summaries);
    let mut writer = csv::Writer::from_writer(Vec::new());
    for row in &rows {
        writer
            .write_record(row)
            .map_err(|err| PipelineError::Csv(err.to_string()))?;
    }
    let content = writer
        .into_inner()
        .map_err(|err| PipelineError::Csv(err.to_string()))?;

    let combined_path = layout.combined_summary_path();
    layout::write_bytes_atomic(&combined_path, &content)?;

    Ok(AggregateResult {
        genome_summaries: written,
        combined_path,
        genomes: summaries.len(),
        families: rows.len().saturating_sub(1),
    })
}

/// Non-empty overview reports under `root`, depth-first with sorted
/// directory entries.
fn overview_files(root: &Utf8Path) -> Result<Vec<Utf8PathBuf>, PipelineError> {
    let mut files = Vec::new();
    let mut stack = vec![root.to_path_buf()];
    while let Some(dir) = stack.pop() {
        let entries = fs::read_dir(dir.as_std_path())
            .map_err(|err| PipelineError::Filesystem(format!("read {dir}: {err}")))?;
        let mut paths = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|err| PipelineError::Filesystem(err.to_string()))?;
            let path = Utf8PathBuf::from_path_buf(entry.path())
                .map_err(|path| PipelineError::Filesystem(format!("non-UTF-8 path: {path:?}")))?;
            paths.push(path);
        }
        paths.sort();
        for path in paths {
            if path.is_dir() {
                stack.push(path);
            } else if path.file_name() == Some(OVERVIEW_FILE) {
                let size = fs::metadata(path.as_std_path())
                    .map_err(|err| PipelineError::Filesystem(err.to_string()))?
                    .len();
                if size == 0 {
                    tracing::warn!("skipping empty overview report {path}");
                    continue;
                }
                files.push(path);
            }
        }
    }
    files.sort();
    Ok(files)
}
