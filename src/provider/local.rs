//! Content provider over a local directory tree.

use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};
use walkdir::WalkDir;

use super::{ContentProvider, Entry, EntryKind, ProviderError};

/// Serves a directory on disk as a repository.
///
/// Entries carry no content identity; the analyzer hashes what it reads.
#[derive(Debug, Clone)]
pub struct LocalProvider {
    root: PathBuf,
}

impl LocalProvider {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Resolve a repository-relative path, refusing to leave the root.
    fn resolve(&self, rel: &str) -> Result<PathBuf, ProviderError> {
        let rel_path = Path::new(rel);
        if rel_path
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
        {
            return Err(ProviderError::NotFound(rel.to_string()));
        }
        Ok(self.root.join(rel_path))
    }
}

fn list_dir(root: &Path, dir: &Path, rel: &str) -> Result<Vec<Entry>, ProviderError> {
    if !dir.is_dir() {
        return Err(ProviderError::NotFound(rel.to_string()));
    }

    let mut entries = Vec::new();
    for item in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let item = item.map_err(|e| ProviderError::Io {
            path: rel.to_string(),
            source: e.into(),
        })?;

        let rel_path = item
            .path()
            .strip_prefix(root)
            .unwrap_or(item.path())
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");

        let file_type = item.file_type();
        if file_type.is_dir() {
            entries.push(Entry::dir(rel_path));
        } else if file_type.is_file() {
            let size = item.metadata().ok().map(|m| m.len());
            entries.push(Entry {
                kind: EntryKind::File,
                path: rel_path,
                content_identity: None,
                size,
            });
        }
    }
    Ok(entries)
}

#[async_trait]
impl ContentProvider for LocalProvider {
    async fn list_contents(&self, path: &str) -> Result<Vec<Entry>, ProviderError> {
        let dir = self.resolve(path)?;
        let root = self.root.clone();
        let rel = path.to_string();
        tokio::task::spawn_blocking(move || list_dir(&root, &dir, &rel))
            .await
            .map_err(|e| ProviderError::Unavailable(e.to_string()))?
    }

    async fn read_content(&self, entry: &Entry) -> Result<String, ProviderError> {
        let path = self.resolve(&entry.path)?;
        let bytes = tokio::fs::read(&path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ProviderError::NotFound(entry.path.clone())
            } else {
                ProviderError::Io {
                    path: entry.path.clone(),
                    source: e,
                }
            }
        })?;
        String::from_utf8(bytes).map_err(|_| ProviderError::Decode {
            path: entry.path.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn fixture() -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("pkg/sub")).unwrap();
        fs::write(dir.path().join("b.py"), "x = 1\n").unwrap();
        fs::write(dir.path().join("a.md"), "# readme\n").unwrap();
        fs::write(dir.path().join("pkg/mod.js"), "let a;\n").unwrap();
        fs::write(dir.path().join("pkg/bin.dat"), [0xff, 0xfe, 0x00]).unwrap();
        dir
    }

    #[tokio::test]
    async fn test_lists_one_level_sorted() {
        let dir = fixture();
        let provider = LocalProvider::new(dir.path());
        let root = provider.list_contents("").await.unwrap();
        let paths: Vec<_> = root.iter().map(|e| (e.path.as_str(), e.kind)).collect();
        assert_eq!(
            paths,
            vec![
                ("a.md", EntryKind::File),
                ("b.py", EntryKind::File),
                ("pkg", EntryKind::Dir),
            ]
        );
        assert_eq!(root[1].size, Some(6));

        let nested = provider.list_contents("pkg").await.unwrap();
        let paths: Vec<_> = nested.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(paths, vec!["pkg/bin.dat", "pkg/mod.js", "pkg/sub"]);
    }

    #[tokio::test]
    async fn test_read_content() {
        let dir = fixture();
        let provider = LocalProvider::new(dir.path());
        let text = provider.read_content(&Entry::file("pkg/mod.js")).await.unwrap();
        assert_eq!(text, "let a;\n");
    }

    #[tokio::test]
    async fn test_read_errors() {
        let dir = fixture();
        let provider = LocalProvider::new(dir.path());
        assert!(matches!(
            provider.read_content(&Entry::file("pkg/bin.dat")).await,
            Err(ProviderError::Decode { .. })
        ));
        assert!(matches!(
            provider.read_content(&Entry::file("missing.py")).await,
            Err(ProviderError::NotFound(_))
        ));
        assert!(matches!(
            provider.read_content(&Entry::file("../escape.py")).await,
            Err(ProviderError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_missing_directory() {
        let dir = fixture();
        let provider = LocalProvider::new(dir.path());
        assert!(matches!(
            provider.list_contents("nope").await,
            Err(ProviderError::NotFound(_))
        ));
    }
}
