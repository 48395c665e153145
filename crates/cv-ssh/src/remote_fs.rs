//! Shell commands used for file transfer over exec channels

use cv_core::shell::quote;
use cv_core::traits::CommandOutput;
use cv_core::{FileMetadata, FileMode, FileStat, SessionError};

/// Exit status used by the read and stat commands for a missing file
pub(crate) const MISSING_STATUS: u32 = 44;

const TEMP_SUFFIX: &str = ".converge-tmp";

pub(crate) fn read_command(path: &str) -> String {
    let p = quote(path);
    format!(
        "if [ -e {p} ]; then cat -- {p}; else exit {}; fi",
        MISSING_STATUS
    )
}

/// Follows symlinks: the reported metadata is the target's, which is what
/// chown and chmod change.
pub(crate) fn stat_command(path: &str) -> String {
    let p = quote(path);
    format!(
        "if [ -e {p} ]; then stat -L -c '%U %G %a %u %g' -- {p}; else exit {}; fi",
        MISSING_STATUS
    )
}

/// Streams stdin into a temp file next to `path`, applies metadata, then
/// renames over the target so readers never see a partial file.
pub(crate) fn write_command(path: &str, metadata: &FileMetadata) -> String {
    let target = quote(path);
    let temp = quote(&format!("{}{}", path, TEMP_SUFFIX));
    let dir = quote(parent_dir(path));
    let owner = quote(&format!("{}:{}", metadata.owner, metadata.group));
    format!(
        "mkdir -p -- {dir} && cat > {temp} && chown -- {owner} {temp} && chmod -- {mode} {temp} && mv -f -- {temp} {target} || {{ rm -f -- {temp}; exit 1; }}",
        mode = metadata.mode,
    )
}

pub(crate) fn set_metadata_command(path: &str, metadata: &FileMetadata) -> String {
    let target = quote(path);
    let owner = quote(&format!("{}:{}", metadata.owner, metadata.group));
    format!(
        "chown -- {owner} {target} && chmod -- {mode} {target}",
        mode = metadata.mode,
    )
}

/// Parse `stat -c '%U %G %a %u %g'` output
pub(crate) fn parse_stat(output: &str) -> Option<FileStat> {
    let fields: Vec<&str> = output.split_whitespace().collect();
    let [owner, group, mode, uid, gid] = fields.as_slice() else {
        return None;
    };
    Some(FileStat {
        metadata: FileMetadata {
            owner: owner.to_string(),
            group: group.to_string(),
            mode: FileMode::parse(mode)?,
        },
        uid: Some(uid.parse().ok()?),
        gid: Some(gid.parse().ok()?),
    })
}

pub(crate) fn read_result(path: &str, output: CommandOutput) -> Result<Vec<u8>, SessionError> {
    match output.exit_status {
        0 => Ok(output.stdout),
        MISSING_STATUS => Err(SessionError::NotFound {
            path: path.to_string(),
        }),
        _ => Err(SessionError::Read {
            path: path.to_string(),
            reason: output.stderr_str(),
        }),
    }
}

pub(crate) fn stat_result(
    path: &str,
    output: &CommandOutput,
) -> Result<Option<FileStat>, SessionError> {
    match output.exit_status {
        0 => {
            let stdout = output.stdout_str();
            parse_stat(&stdout).map(Some).ok_or_else(|| SessionError::Read {
                path: path.to_string(),
                reason: format!("unexpected stat output '{}'", stdout.trim()),
            })
        }
        MISSING_STATUS => Ok(None),
        _ => Err(SessionError::Read {
            path: path.to_string(),
            reason: output.stderr_str(),
        }),
    }
}

/// Outcome of a write or chown/chmod command
pub(crate) fn write_result(path: &str, output: &CommandOutput) -> Result<(), SessionError> {
    if output.success() {
        Ok(())
    } else {
        Err(SessionError::Write {
            path: path.to_string(),
            reason: output.stderr_str(),
        })
    }
}

fn parent_dir(path: &str) -> &str {
    match path.rsplit_once('/') {
        Some(("", _)) | None => "/",
        Some((dir, _)) => dir,
    }
}
