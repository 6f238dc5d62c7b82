use std::fs::{self, File};

use camino::{Utf8Path, Utf8PathBuf};

use crate::domain::{SeqType, ToolSelection};
use crate::error::PipelineError;
use crate::exec::{find_executable, run_shell_command};
use crate::layout;

/// Extensions the driver treats as annotatable sequence files.
const SEQUENCE_EXTENSIONS: [&str; 2] = ["fna", "fasta"];

#[derive(Debug, Clone)]
pub struct AnnotateOptions {
    pub seq_type: SeqType,
    pub tools: ToolSelection,
    pub db_dir: Utf8PathBuf,
    /// Extra arguments passed through verbatim to the dbCAN executable.
    pub extra_args: String,
}

#[derive(Debug, Clone)]
pub struct AnnotationJob {
    pub input_file: Utf8PathBuf,
    pub out_dir: Utf8PathBuf,
}

/// The CAZyme prediction tool. A trait seam so the driver can be exercised
/// without `run_dbcan.py` on PATH.
pub trait Annotator {
    /// Runs the tool over one job. `Ok(false)` is a tolerated tool failure.
    fn annotate(&self, job: &AnnotationJob, options: &AnnotateOptions)
    -> Result<bool, PipelineError>;
}

/// Invokes `run_dbcan.py` from PATH through the strict shell runner.
pub struct SystemAnnotator {
    exe: String,
    logfile: File,
}

impl SystemAnnotator {
    pub fn new(logfile: File) -> Result<Self, PipelineError> {
        let exe = find_executable(&["run_dbcan.py"], None)?;
        Ok(Self { exe, logfile })
    }
}

impl Annotator for SystemAnnotator {
    fn annotate(
        &self,
        job: &AnnotationJob,
        options: &AnnotateOptions,
    ) -> Result<bool, PipelineError> {
        let input_name = job.input_file.file_name().unwrap_or(job.input_file.as_str());
        tracing::info!("CAZyme prediction on {input_name}");
        let cmd = format!(
            "{} {} {} --tools {} --db_dir {} --out_dir {} {}",
            self.exe,
            job.input_file,
            options.seq_type,
            options.tools,
            options.db_dir,
            job.out_dir,
            options.extra_args
        );
        run_shell_command(&cmd, &self.logfile, false, None)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnnotateAction {
    Annotated,
    Skipped,
    Failed,
}

#[derive(Debug, Clone)]
pub struct AnnotateOutcome {
    pub input_file: Utf8PathBuf,
    pub action: AnnotateAction,
}

/// Rejects a missing, non-directory or empty data directory; the binary
/// maps these to the documented exit codes.
pub fn validate_data_dir(dir: &Utf8Path) -> Result<(), PipelineError> {
    if !dir.exists() || !dir.is_dir() {
        return Err(PipelineError::NotADirectory(
            dir.as_std_path().to_path_buf(),
        ));
    }
    let mut entries = fs::read_dir(dir.as_std_path())
        .map_err(|err| PipelineError::Filesystem(format!("read {dir}: {err}")))?;
    if entries.next().is_none() {
        return Err(PipelineError::EmptyDirectory(
            dir.as_std_path().to_path_buf(),
        ));
    }
    Ok(())
}

/// Walks `data_dir` recursively, filenames sorted per directory, and runs
/// the annotator over every sequence file, writing outputs beside the
/// input. A genome whose three expected outputs already exist is skipped,
/// making re-runs resumable. Tool failures are logged, not raised.
pub fn annotate_directory<A: Annotator>(
    annotator: &A,
    data_dir: &Utf8Path,
    options: &AnnotateOptions,
) -> Result<Vec<AnnotateOutcome>, PipelineError> {
    let mut outcomes = Vec::new();
    for input_file in sequence_files(data_dir)? {
        let out_dir = input_file
            .parent()
            .map(Utf8Path::to_path_buf)
            .unwrap_or_else(|| data_dir.to_path_buf());

        if layout::outputs_complete(&out_dir) {
            outcomes.push(AnnotateOutcome {
                input_file,
                action: AnnotateAction::Skipped,
            });
            continue;
        }

        let job = AnnotationJob {
            input_file: input_file.clone(),
            out_dir,
        };
        let action = match annotator.annotate(&job, options)? {
            true => AnnotateAction::Annotated,
            false => AnnotateAction::Failed,
        };
        outcomes.push(AnnotateOutcome { input_file, action });
    }
    Ok(outcomes)
}

/// Sequence files under `root`, depth-first with per-directory name sort
/// so runs are deterministic.
fn sequence_files(root: &Utf8Path) -> Result<Vec<Utf8PathBuf>, PipelineError> {
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
            } else if path
                .extension()
                .map(|ext| SEQUENCE_EXTENSIONS.contains(&ext))
                .unwrap_or(false)
            {
                files.push(path);
            }
        }
    }
    Ok(files)
}
