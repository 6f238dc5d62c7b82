use std::fs;

use camino::{Utf8Path, Utf8PathBuf};

use crate::error::PipelineError;
use crate::fs_util;

#[derive(Debug, Clone, Default)]
pub struct PlaceReport {
    pub copied: Vec<Utf8PathBuf>,
    pub skipped: Vec<Utf8PathBuf>,
}

/// Taxonomy id encoded in a genome filename: the second `_`-delimited token
/// of the extension-stripped name (`genome_1314.fna` carries `1314`).
pub fn derive_tax_id(filename: &str) -> Option<&str> {
    let stem = filename
        .rsplit_once('.')
        .map(|(stem, _ext)| stem)
        .unwrap_or(filename);
    stem.split('_').nth(1).filter(|token| !token.is_empty())
}

/// Copies every file in the flat `data_dir` into a per-tax-id subdirectory
/// of `genomes_dir`, creating the subdirectory if absent and overwriting on
/// re-run. Files whose names carry no tax id are logged and skipped.
pub fn place_genomes(
    data_dir: &Utf8Path,
    genomes_dir: &Utf8Path,
) -> Result<PlaceReport, PipelineError> {
    let mut report = PlaceReport::default();

    for path in sorted_files(data_dir)? {
        let Some(name) = path.file_name() else {
            continue;
        };
        let Some(tax_id) = derive_tax_id(name) else {
            tracing::warn!("no taxonomy id in filename {name}, skipping");
            report.skipped.push(path);
            continue;
        };

        let target_dir = fs_util::mkdir(&genomes_dir.join(tax_id))?;
        let target = target_dir.join(name);
        fs::copy(path.as_std_path(), target.as_std_path())
            .map_err(|err| PipelineError::Filesystem(format!("copy {path} -> {target}: {err}")))?;
        report.copied.push(target);
    }
    Ok(report)
}

fn sorted_files(dir: &Utf8Path) -> Result<Vec<Utf8PathBuf>, PipelineError> {
    let entries = fs::read_dir(dir.as_std_path())
        .map_err(|err| PipelineError::Filesystem(format!("read {dir}: {err}")))?;
    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|err| PipelineError::Filesystem(err.to_string()))?;
        let path = Utf8PathBuf::from_path_buf(entry.path())
            .map_err(|path| PipelineError::Filesystem(format!("non-UTF-8 path: {path:?}")))?;
        if path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}
