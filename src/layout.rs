use std::fs;

use camino::{Utf8Path, Utf8PathBuf};

use crate::domain::TaxId;
use crate::error::PipelineError;
use crate::fs_util;

/// Consensus report written by dbCAN next to each genome.
pub const OVERVIEW_FILE: &str = "overview.txt";

/// The three per-tool outputs whose presence marks a genome as annotated.
pub const EXPECTED_OUTPUTS: [&str; 3] = ["diamond.out", "hmmer.out", "Hotpep.out"];

const COMBINED_SUMMARY_FILE: &str = "dbcan_overview_aggregated_cazyids_summary.csv";

/// On-disk conventions for the pipeline: a genomes tree with one directory
/// per taxonomy id, and a summary tree for aggregation output.
#[derive(Debug, Clone)]
pub struct Layout {
    genomes_root: Utf8PathBuf,
    summary_root: Utf8PathBuf,
}

impl Layout {
    pub fn new(genomes_root: Utf8PathBuf, summary_root: Utf8PathBuf) -> Self {
        Self {
            genomes_root,
            summary_root,
        }
    }

    pub fn genomes_root(&self) -> &Utf8Path {
        &self.genomes_root
    }

    pub fn summary_root(&self) -> &Utf8Path {
        &self.summary_root
    }

    pub fn genome_dir(&self, tax_id: TaxId) -> Utf8PathBuf {
        self.genomes_root.join(tax_id.to_string())
    }

    pub fn ensure_genome_dir(&self, tax_id: TaxId) -> Result<Utf8PathBuf, PipelineError> {
        fs_util::mkdir(&self.genome_dir(tax_id))
    }

    pub fn genome_summary_path(&self, genome_id: &str) -> Utf8PathBuf {
        self.summary_root
            .join(format!("{genome_id}_overview_geneids_cazyids_summary.csv"))
    }

    pub fn combined_summary_path(&self) -> Utf8PathBuf {
        self.summary_root.join(COMBINED_SUMMARY_FILE)
    }

    pub fn ensure_summary_root(&self) -> Result<Utf8PathBuf, PipelineError> {
        fs_util::mkdir(&self.summary_root)
    }
}

/// True when all three expected dbCAN outputs exist in `dir`.
pub fn outputs_complete(dir: &Utf8Path) -> bool {
    EXPECTED_OUTPUTS.iter().all(|name| dir.join(name).is_file())
}

/// Writes `content` to `path` through a sibling temp file and a rename, so
/// a partially-written summary never lands under the final name.
pub fn write_bytes_atomic(path: &Utf8Path, content: &[u8]) -> Result<(), PipelineError> {
    let parent = path
        .parent()
        .ok_or_else(|| PipelineError::Filesystem("invalid destination path".to_string()))?;
    fs::create_dir_all(parent.as_std_path())
        .map_err(|err| PipelineError::Filesystem(err.to_string()))?;
    let temp = tempfile::Builder::new()
        .prefix("cazy-pipe")
        .tempfile_in(parent.as_std_path())
        .map_err(|err| PipelineError::Filesystem(err.to_string()))?;
    fs::write(temp.path(), content).map_err(|err| PipelineError::Filesystem(err.to_string()))?;
    temp.persist(path.as_std_path())
        .map_err(|err| PipelineError::Filesystem(err.to_string()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_paths() {
        let layout = Layout::new(
            Utf8PathBuf::from("/data/genomes"),
            Utf8PathBuf::from("/data/summary"),
        );
        let tax_id: TaxId = "1314".parse().unwrap();

        assert_eq!(layout.genome_dir(tax_id), "/data/genomes/1314");
        assert_eq!(
            layout.genome_summary_path("1314"),
            "/data/summary/1314_overview_geneids_cazyids_summary.csv"
        );
        assert!(
            layout
                .combined_summary_path()
                .ends_with(COMBINED_SUMMARY_FILE)
        );
    }
}
