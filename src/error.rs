use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum PipelineError {
    #[error("unable to find any of {candidates:?} in PATH")]
    #[diagnostic(help("you can install the missing program using conda or homebrew or apt-get"))]
    MissingExecutable { candidates: Vec<String> },

    #[error("shell exited with return code {code} while running: {command}")]
    CommandFailed { code: i32, command: String },

    #[error("invalid taxonomy id: {0}")]
    InvalidTaxId(String),

    #[error("unknown annotation tool: {0}")]
    InvalidTool(String),

    #[error("missing required argument: {0}")]
    MissingInput(String),

    #[error("{0} is not a directory")]
    NotADirectory(PathBuf),

    #[error("directory {0} is empty")]
    EmptyDirectory(PathBuf),

    #[error("failed to read metadata file at {0}")]
    MetadataRead(PathBuf),

    #[error("failed to parse metadata table: {0}")]
    MetadataParse(String),

    #[error("csv error: {0}")]
    Csv(String),

    #[error("download failed: {0}")]
    Http(String),

    #[error("download returned status {status}: {message}")]
    HttpStatus { status: u16, message: String },

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("filesystem error: {0}")]
    Filesystem(String),
}
