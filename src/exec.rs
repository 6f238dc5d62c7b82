use std::collections::HashMap;
use std::fs::File;
use std::process::{Command, Stdio};

use crate::error::PipelineError;

/// Exit code the shell reports when the command itself was not found.
const COMMAND_NOT_FOUND: i32 = 127;

/// Returns the first of `names` resolvable on `PATH`, or `default` when
/// none resolves and a default was given.
pub fn find_executable(names: &[&str], default: Option<&str>) -> Result<String, PipelineError> {
    for name in names {
        if let Some(path) = find_in_path(name) {
            return Ok(path);
        }
    }
    default
        .map(|value| value.to_string())
        .ok_or_else(|| PipelineError::MissingExecutable {
            candidates: names.iter().map(|name| name.to_string()).collect(),
        })
}

fn find_in_path(name: &str) -> Option<String> {
    let path_var = std::env::var_os("PATH")?;
    for path in std::env::split_paths(&path_var) {
        let exe = path.join(format!("{name}.exe"));
        if exe.exists() {
            return Some(exe.to_string_lossy().to_string());
        }
        let plain = path.join(name);
        if plain.is_file() {
            return Some(plain.to_string_lossy().to_string());
        }
    }
    None
}

/// Runs `cmd` through a strict Bash shell (abort on error, undefined
/// variable or pipeline failure), with standard error redirected to
/// `logfile` and `extra_env` merged over the inherited environment.
///
/// A non-zero exit is logged with the exit code (plus an installation hint
/// when the shell reports "command not found") and reported as `Ok(false)`,
/// unless `raise_errors` is set, in which case the error propagates.
pub fn run_shell_command(
    cmd: &str,
    logfile: &File,
    raise_errors: bool,
    extra_env: Option<&HashMap<String, String>>,
) -> Result<bool, PipelineError> {
    let stderr = logfile
        .try_clone()
        .map_err(|err| PipelineError::Filesystem(err.to_string()))?;

    let mut command = Command::new("bash");
    command
        .arg("-c")
        .arg(format!("set -euo pipefail; {cmd}"))
        .stderr(Stdio::from(stderr));
    if let Some(extra) = extra_env {
        command.envs(extra);
    }

    let status = match command.status() {
        Ok(status) => status,
        Err(err) => {
            tracing::error!("unable to run shell command via bash: {err}");
            if raise_errors {
                return Err(PipelineError::Filesystem(format!(
                    "unable to run shell command via bash: {err}"
                )));
            }
            return Ok(false);
        }
    };

    if status.success() {
        return Ok(true);
    }

    let code = status.code().unwrap_or(-1);
    if code == COMMAND_NOT_FOUND {
        tracing::error!(
            "shell exited with return code {code} while running: {cmd} \
             (are you sure this program is installed?)"
        );
    } else {
        tracing::error!("shell exited with return code {code} while running: {cmd}");
    }

    if raise_errors {
        return Err(PipelineError::CommandFailed {
            code,
            command: cmd.to_string(),
        });
    }
    Ok(false)
}

/// Runs `cmd` through the same strict shell and captures trimmed stdout.
/// A non-zero exit is an error; this is used for query pipelines whose
/// output feeds later stages.
pub fn capture_shell_output(cmd: &str) -> Result<String, PipelineError> {
    let output = Command::new("bash")
        .arg("-c")
        .arg(format!("set -euo pipefail; {cmd}"))
        .output()
        .map_err(|err| PipelineError::Filesystem(format!("unable to run shell command: {err}")))?;

    if !output.status.success() {
        return Err(PipelineError::CommandFailed {
            code: output.status.code().unwrap_or(-1),
            command: cmd.to_string(),
        });
    }
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}
