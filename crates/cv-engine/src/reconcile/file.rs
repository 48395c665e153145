//! File reconciler

use cv_core::traits::RemoteSession;
use cv_core::{Convergence, FileTask, SessionError, TaskError};

/// Converge a file's content and metadata.
///
/// Does nothing unless `manage_file` is set. Content is compared byte for
/// byte; metadata drift is corrected even when the content already matches.
pub async fn reconcile_file<S>(session: &S, task: &FileTask) -> Result<Convergence, TaskError>
where
    S: RemoteSession + ?Sized,
{
    let path = task.path.as_str();
    if !task.manage_file {
        tracing::debug!(path, "manage_file not set, skipping");
        return Ok(Convergence::Compliant);
    }

    if let Some(desired) = &task.content {
        let current = match session.read_file(path).await {
            Ok(bytes) => Some(bytes),
            Err(SessionError::NotFound { .. }) => None,
            Err(e) => return Err(TaskError::file(path, e)),
        };

        if current.as_deref() != Some(desired.as_slice()) {
            // write_file applies owner, group and mode as well
            session
                .write_file(path, desired, &task.metadata)
                .await
                .map_err(|e| TaskError::file(path, e))?;
            let action = if current.is_none() {
                "create"
            } else {
                "write content"
            };
            tracing::info!(path, metadata = %task.metadata, "File {}", action);
            return Ok(Convergence::applied(action));
        }
    }

    match session
        .file_metadata(path)
        .await
        .map_err(|e| TaskError::file(path, e))?
    {
        None => Err(TaskError::file(
            path,
            SessionError::NotFound {
                path: path.to_string(),
            },
        )),
        Some(current) if current.satisfies(&task.metadata) => {
            tracing::debug!(path, "File already compliant");
            Ok(Convergence::Compliant)
        }
        Some(current) => {
            session
                .set_metadata(path, &task.metadata)
                .await
                .map_err(|e| TaskError::file(path, e))?;
            tracing::info!(
                path,
                "Set ownership and permissions ({} -> {})",
                current.metadata,
                task.metadata
            );
            Ok(Convergence::applied("set metadata"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryHost;
    use cv_core::{FailureKind, FileMetadata, FileMode};

    const PATH: &str = "/var/www/html/index.php";
    const CONTENT: &[u8] = b"<?php echo 'Hello, world!'; ?>";

    fn metadata(owner: &str, mode: u32) -> FileMetadata {
        FileMetadata {
            owner: owner.into(),
            group: owner.into(),
            mode: FileMode::new(mode).unwrap(),
        }
    }

    fn task(content: Option<&[u8]>) -> FileTask {
        FileTask {
            path: PATH.into(),
            content: content.map(<[u8]>::to_vec),
            metadata: metadata("www-data", 0o644),
            manage_file: true,
        }
    }

    fn assert_converged(host: &MemoryHost) {
        let file = host.file(PATH).expect("file exists");
        assert_eq!(file.content, CONTENT);
        assert_eq!(file.metadata, metadata("www-data", 0o644));
    }

    #[tokio::test]
    async fn test_creates_absent_file() {
        let host = MemoryHost::new();
        let result = reconcile_file(&host, &task(Some(CONTENT))).await;

        assert_eq!(result.unwrap(), Convergence::applied("create"));
        assert_converged(&host);
    }

    #[tokio::test]
    async fn test_rewrites_wrong_content() {
        let host = MemoryHost::new().with_file(PATH, b"old", metadata("root", 0o600));
        let result = reconcile_file(&host, &task(Some(CONTENT))).await;

        assert_eq!(result.unwrap(), Convergence::applied("write content"));
        assert_converged(&host);
    }

    #[tokio::test]
    async fn test_fixes_metadata_when_content_matches() {
        let host = MemoryHost::new().with_file(PATH, CONTENT, metadata("root", 0o600));
        let result = reconcile_file(&host, &task(Some(CONTENT))).await;

        assert_eq!(result.unwrap(), Convergence::applied("set metadata"));
        assert_converged(&host);
        assert_eq!(host.mutations(), vec![format!("set-metadata {}", PATH)]);
    }

    #[tokio::test]
    async fn test_compliant_file_is_not_written() {
        let host = MemoryHost::new().with_file(PATH, CONTENT, metadata("www-data", 0o644));
        let result = reconcile_file(&host, &task(Some(CONTENT))).await;

        assert_eq!(result.unwrap(), Convergence::Compliant);
        assert!(host.mutations().is_empty());
    }

    #[tokio::test]
    async fn test_numeric_owner_matching_by_id_is_compliant() {
        let host = MemoryHost::new()
            .with_account("www-data", 33)
            .with_file(PATH, CONTENT, metadata("www-data", 0o644));
        let mut numeric = task(Some(CONTENT));
        numeric.metadata = metadata("33", 0o644);

        let first = reconcile_file(&host, &numeric).await.unwrap();
        let second = reconcile_file(&host, &numeric).await.unwrap();

        assert_eq!(first, Convergence::Compliant);
        assert_eq!(second, Convergence::Compliant);
        assert!(host.mutations().is_empty());
    }

    #[tokio::test]
    async fn test_numeric_owner_converges_once() {
        let host = MemoryHost::new()
            .with_account("www-data", 33)
            .with_file(PATH, CONTENT, metadata("root", 0o644));
        let mut numeric = task(Some(CONTENT));
        numeric.metadata = metadata("33", 0o644);

        let first = reconcile_file(&host, &numeric).await.unwrap();
        let second = reconcile_file(&host, &numeric).await.unwrap();

        assert_eq!(first, Convergence::applied("set metadata"));
        assert_eq!(second, Convergence::Compliant);
        assert_eq!(host.file(PATH).unwrap().metadata.owner, "www-data");
    }

    #[tokio::test]
    async fn test_unmanaged_file_is_skipped() {
        let host = MemoryHost::new().with_file(PATH, b"old", metadata("root", 0o600));
        let mut unmanaged = task(Some(CONTENT));
        unmanaged.manage_file = false;

        let result = reconcile_file(&host, &unmanaged).await;

        assert_eq!(result.unwrap(), Convergence::Compliant);
        assert!(host.history().is_empty());
        assert_eq!(host.file(PATH).unwrap().content, b"old");
    }

    #[tokio::test]
    async fn test_metadata_only_task() {
        let host = MemoryHost::new().with_file(PATH, b"keep me", metadata("root", 0o600));
        let result = reconcile_file(&host, &task(None)).await;

        assert_eq!(result.unwrap(), Convergence::applied("set metadata"));
        let file = host.file(PATH).unwrap();
        assert_eq!(file.content, b"keep me");
        assert_eq!(file.metadata, metadata("www-data", 0o644));
    }

    #[tokio::test]
    async fn test_metadata_only_task_on_missing_file_fails() {
        let host = MemoryHost::new();
        let err = reconcile_file(&host, &task(None)).await.unwrap_err();

        assert_eq!(err.kind(), FailureKind::FileAction);
        assert!(err.to_string().contains(PATH));
    }

    #[tokio::test]
    async fn test_write_failure_is_file_action_error() {
        let host = MemoryHost::new().fail_commands_containing("write");
        let err = reconcile_file(&host, &task(Some(CONTENT))).await.unwrap_err();

        assert_eq!(err.kind(), FailureKind::FileAction);
        assert!(host.file(PATH).is_none());
    }
}
