use std::fs;
use std::io;

use camino::{Utf8Path, Utf8PathBuf};
use flate2::read::GzDecoder;

use crate::error::PipelineError;

/// Recursively creates `directory` if it does not exist; "already exists"
/// is success. Returns the absolute path.
pub fn mkdir(directory: &Utf8Path) -> Result<Utf8PathBuf, PipelineError> {
    let directory = absolute(directory)?;
    fs::create_dir_all(directory.as_std_path())
        .map_err(|err| PipelineError::Filesystem(format!("create {directory}: {err}")))?;
    Ok(directory)
}

fn absolute(path: &Utf8Path) -> Result<Utf8PathBuf, PipelineError> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    let cwd = std::env::current_dir()
        .map_err(|err| PipelineError::Filesystem(err.to_string()))
        .and_then(|dir| {
            Utf8PathBuf::from_path_buf(dir)
                .map_err(|_| PipelineError::Filesystem("non-UTF-8 working directory".to_string()))
        })?;
    Ok(cwd.join(path))
}

/// Decompresses `<name>.<ext>.gz` in place, removing the source on success,
/// and returns the output path with `suffix` appended to the base name.
///
/// A no-op when the decompressed target already exists. Decompression
/// failures are logged, never propagated. Returns `None` for paths that do
/// not end in `.gz`.
pub fn uncompress_fasta(filename: &Utf8Path, suffix: &str) -> Option<Utf8PathBuf> {
    if filename.extension() != Some("gz") {
        return None;
    }

    // "<dir>/<name>.<ext>.gz" stripped of its ".gz"
    let target = filename.with_extension("");
    let stem = target.file_stem().unwrap_or(target.as_str());
    let outfile = match filename.parent() {
        Some(parent) => parent.join(format!("{stem}{suffix}")),
        None => Utf8PathBuf::from(format!("{stem}{suffix}")),
    };

    if target.is_file() {
        tracing::info!("decompression done, check file: {target}");
        return Some(outfile);
    }

    tracing::info!("decompressing file {filename}");
    if let Err(err) = decompress_gz(filename, &target) {
        tracing::warn!("failed to decompress {filename}: {err}");
    }
    Some(outfile)
}

fn decompress_gz(source: &Utf8Path, target: &Utf8Path) -> io::Result<()> {
    let input = fs::File::open(source.as_std_path())?;
    let mut decoder = GzDecoder::new(io::BufReader::new(input));
    let mut output = fs::File::create(target.as_std_path())?;
    if let Err(err) = io::copy(&mut decoder, &mut output) {
        drop(output);
        let _ = fs::remove_file(target.as_std_path());
        return Err(err);
    }
    fs::remove_file(source.as_std_path())
}
