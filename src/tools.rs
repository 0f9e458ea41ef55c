// src/tools.rs

//! External tool invocation
//!
//! Cabinet packaging and metadata signing are delegated to the fwupd
//! toolchain:
//! - `fwupdtool build-cabinet <out.cab> <metainfo.xml> <blob>`
//! - `jcat-tool self-sign <sig> <file> --kind sha256`
//! - `jcat-tool sign <sig> <file> <cert> <key>`
//!
//! Tools run to completion; their combined stdout and stderr is attached to
//! the error when they exit non-zero.

use crate::error::{Error, Result};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::debug;

/// Run a prepared command and fail with the captured output on non-zero exit
async fn run(tool: &str, mut command: Command) -> Result<()> {
    debug!("Running {:?}", command.as_std());

    let output = command.output().await.map_err(|e| Error::Tool {
        tool: tool.to_string(),
        message: format!("failed to start: {e}"),
        output: String::new(),
    })?;

    if !output.status.success() {
        let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
        combined.push_str(&String::from_utf8_lossy(&output.stderr));
        return Err(Error::Tool {
            tool: tool.to_string(),
            message: format!("exited with {}", output.status),
            output: combined.trim_end().to_string(),
        });
    }

    Ok(())
}

/// Program to spawn for `tool`
///
/// Bare names are left for the `PATH` lookup; paths are made absolute so
/// they still resolve when the command runs in another directory.
fn program(tool: &str) -> Result<PathBuf> {
    let path = Path::new(tool);
    if path.components().count() > 1 {
        absolute(path)
    } else {
        Ok(path.to_path_buf())
    }
}

/// Build a cabinet archive from a metainfo fragment and a firmware blob
pub async fn build_cabinet(tool: &str, cabinet: &Path, metainfo: &Path, blob: &Path) -> Result<()> {
    let mut command = Command::new(program(tool)?);
    command.arg("build-cabinet").arg(cabinet).arg(metainfo).arg(blob);
    run(tool, command).await
}

/// Prepare a jcat subcommand running in the directory of `file`
///
/// jcat records entries by the name it is given, so both paths are passed as
/// bare file names relative to that directory.
fn jcat_command(tool: &str, subcommand: &str, signature: &Path, file: &Path) -> Result<Command> {
    let mut command = Command::new(program(tool)?);
    if let Some(dir) = file.parent().filter(|d| !d.as_os_str().is_empty()) {
        command.current_dir(dir);
    }
    command.arg(subcommand).arg(file_name(signature)).arg(file_name(file));
    Ok(command)
}

fn file_name(path: &Path) -> &OsStr {
    path.file_name().unwrap_or(path.as_os_str())
}

/// Add a SHA-256 checksum record for `file` to the jcat `signature`
pub async fn jcat_self_sign(tool: &str, signature: &Path, file: &Path) -> Result<()> {
    let mut command = jcat_command(tool, "self-sign", signature, file)?;
    command.arg("--kind").arg("sha256");
    run(tool, command).await
}

/// Add a PKCS#7 signature of `file` to the jcat `signature`
pub async fn jcat_sign(tool: &str, signature: &Path, file: &Path, certificate: &Path, private_key: &Path) -> Result<()> {
    // The tool runs in another directory; key paths must survive that
    let certificate = absolute(certificate)?;
    let private_key = absolute(private_key)?;

    let mut command = jcat_command(tool, "sign", signature, file)?;
    command.arg(&certificate).arg(&private_key);
    run(tool, command).await
}

fn absolute(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    Ok(std::env::current_dir()?.join(path))
}

/// Find an executable by name on `PATH`, or check an explicit path
pub fn find_executable(tool: &str) -> Option<PathBuf> {
    let candidate = Path::new(tool);
    if candidate.components().count() > 1 {
        return is_executable(candidate).then(|| candidate.to_path_buf());
    }

    let paths = std::env::var_os("PATH")?;
    std::env::split_paths(&paths)
        .map(|dir| dir.join(tool))
        .find(|path| is_executable(path))
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    std::fs::metadata(path)
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

/// Verify every tool is available before starting a run
pub fn check_available<'a>(tools: impl IntoIterator<Item = &'a str>) -> Result<()> {
    let missing: Vec<&str> = tools.into_iter().filter(|t| find_executable(t).is_none()).collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(Error::Config(format!("Required tools not found in PATH: {}", missing.join(", "))))
    }
}
