//! Publication of documented files as a reviewable change.

use async_trait::async_trait;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum PublishError {
    #[error("refusing to write outside the repository: {0}")]
    InvalidPath(String),
    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// A set of rewritten files to publish on a new branch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChangeRequest {
    pub repository: String,
    pub branch_name: String,
    /// Repository-relative path to new file content.
    pub changes: BTreeMap<String, String>,
}

#[async_trait]
pub trait ChangePublisher: Send + Sync {
    /// Publish the change and return a URL for reviewing it.
    async fn publish(&self, request: &ChangeRequest) -> Result<String, PublishError>;
}

/// `<prefix><unix seconds>`, e.g. `docs/auto-document-1718000000`.
pub fn branch_name(prefix: &str) -> String {
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::ZERO)
        .as_secs();
    format!("{}{}", prefix, secs)
}

/// Writes changes to the local filesystem.
///
/// Without an output directory files are rewritten in place under `root`;
/// with one they land in `<output>/<branch_name>/<path>` and the originals
/// are left alone.
#[derive(Debug, Clone)]
pub struct LocalPublisher {
    root: PathBuf,
    output: Option<PathBuf>,
}

impl LocalPublisher {
    pub fn in_place<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            output: None,
        }
    }

    pub fn to_output<P: AsRef<Path>, Q: AsRef<Path>>(root: P, output: Q) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            output: Some(output.as_ref().to_path_buf()),
        }
    }

    fn target_dir(&self, request: &ChangeRequest) -> Result<PathBuf, PublishError> {
        match &self.output {
            None => Ok(self.root.clone()),
            Some(output) => Ok(output.join(safe_relative(&request.branch_name)?)),
        }
    }
}

/// Reject absolute paths and `..` so a change cannot escape its target.
fn safe_relative(rel: &str) -> Result<&Path, PublishError> {
    let path = Path::new(rel);
    let ok = !rel.is_empty()
        && path
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
    if ok {
        Ok(path)
    } else {
        Err(PublishError::InvalidPath(rel.to_string()))
    }
}

#[async_trait]
impl ChangePublisher for LocalPublisher {
    async fn publish(&self, request: &ChangeRequest) -> Result<String, PublishError> {
        let target = self.target_dir(request)?;

        // Validate everything before writing anything.
        let mut writes = Vec::with_capacity(request.changes.len());
        for (rel, content) in &request.changes {
            writes.push((target.join(safe_relative(rel)?), rel, content));
        }

        for (path, rel, content) in writes {
            if let Some(parent) = path.parent() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|source| PublishError::Io {
                        path: rel.clone(),
                        source,
                    })?;
            }
            tokio::fs::write(&path, content)
                .await
                .map_err(|source| PublishError::Io {
                    path: rel.clone(),
                    source,
                })?;
        }

        let shown = std::fs::canonicalize(&target).unwrap_or(target);
        info!(
            repository = %request.repository,
            branch = %request.branch_name,
            files = request.changes.len(),
            "published documentation change"
        );
        Ok(format!("file://{}", shown.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn request(changes: &[(&str, &str)]) -> ChangeRequest {
        ChangeRequest {
            repository: "acme/app".to_string(),
            branch_name: "docs/auto-document-1".to_string(),
            changes: changes
                .iter()
                .map(|(p, c)| (p.to_string(), c.to_string()))
                .collect(),
        }
    }

    #[test]
    fn test_branch_name_prefix() {
        let name = branch_name("docs/auto-document-");
        let suffix = name.strip_prefix("docs/auto-document-").unwrap();
        assert!(suffix.parse::<u64>().unwrap() > 1_600_000_000);
    }

    #[tokio::test]
    async fn test_in_place_rewrite() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("pkg")).unwrap();
        fs::write(dir.path().join("pkg/a.py"), "old").unwrap();

        let url = LocalPublisher::in_place(dir.path())
            .publish(&request(&[("pkg/a.py", "new")]))
            .await
            .unwrap();
        assert!(url.starts_with("file://"));
        assert_eq!(fs::read_to_string(dir.path().join("pkg/a.py")).unwrap(), "new");
    }

    #[tokio::test]
    async fn test_output_directory_per_branch() {
        let repo = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        fs::write(repo.path().join("a.py"), "old").unwrap();

        LocalPublisher::to_output(repo.path(), out.path())
            .publish(&request(&[("a.py", "new")]))
            .await
            .unwrap();
        assert_eq!(fs::read_to_string(repo.path().join("a.py")).unwrap(), "old");
        assert_eq!(
            fs::read_to_string(out.path().join("docs/auto-document-1/a.py")).unwrap(),
            "new"
        );
    }

    #[tokio::test]
    async fn test_rejects_escaping_paths() {
        let dir = TempDir::new().unwrap();
        let publisher = LocalPublisher::in_place(dir.path());
        for bad in ["../x.py", "/etc/x.py"] {
            let err = publisher.publish(&request(&[("ok.py", "x"), (bad, "x")])).await;
            assert!(matches!(err, Err(PublishError::InvalidPath(_))));
        }
        assert!(!dir.path().join("ok.py").exists());
    }
}
