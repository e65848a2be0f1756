//! File analysis with cache consultation.
//!
//! The [`FileAnalyzer`] owns the only path from content to a
//! [`FileAnalysis`]: it checks the analysis cache by content identity,
//! extracts and evaluates on a miss, and stores the result.

use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

use crate::analysis::{assemble, ExtractError, FileAnalysis, TableExtractor, UnitExtractor};
use crate::cache::{AnalysisCache, CacheKey, ContentIdentity};
use crate::language::Language;
use crate::provider::{ContentProvider, Entry, ProviderError};

#[derive(Error, Debug)]
pub enum AnalyzeError {
    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("{path}: {source}")]
    Extract {
        path: String,
        #[source]
        source: ExtractError,
    },
}

pub struct FileAnalyzer {
    extractor: Arc<dyn UnitExtractor>,
    cache: Arc<AnalysisCache>,
}

impl FileAnalyzer {
    pub fn new(cache: Arc<AnalysisCache>) -> Self {
        Self::with_extractor(Arc::new(TableExtractor), cache)
    }

    pub fn with_extractor(extractor: Arc<dyn UnitExtractor>, cache: Arc<AnalysisCache>) -> Self {
        Self { extractor, cache }
    }

    /// Analyze one file entry of `repository`.
    ///
    /// When the provider supplies a content identity the cache is consulted
    /// before the content is read. Otherwise the content is read and hashed
    /// first.
    pub async fn analyze(
        &self,
        repository: &str,
        provider: &dyn ContentProvider,
        entry: &Entry,
        language: Language,
    ) -> Result<FileAnalysis, AnalyzeError> {
        if let Some(id) = &entry.content_identity {
            let key = CacheKey::new(repository, language, ContentIdentity::new(id.clone()));
            if let Some(hit) = self.lookup(&key, &entry.path).await {
                return Ok(hit);
            }
            let content = provider.read_content(entry).await?;
            return self.analyze_uncached(key, &entry.path, language, &content).await;
        }

        let content = provider.read_content(entry).await?;
        self.analyze_content(repository, &entry.path, language, &content)
            .await
    }

    /// Analyze content already in hand, keyed by its SHA-256.
    pub async fn analyze_content(
        &self,
        repository: &str,
        path: &str,
        language: Language,
        content: &str,
    ) -> Result<FileAnalysis, AnalyzeError> {
        let key = CacheKey::new(repository, language, ContentIdentity::of(content.as_bytes()));
        if let Some(hit) = self.lookup(&key, path).await {
            return Ok(hit);
        }
        self.analyze_uncached(key, path, language, content).await
    }

    async fn lookup(&self, key: &CacheKey, path: &str) -> Option<FileAnalysis> {
        let hit = self.cache.get(key).await?;
        debug!(path, key = %key, "reusing cached analysis");
        if hit.path == path {
            Some(hit)
        } else {
            Some(hit.with_path(path))
        }
    }

    async fn analyze_uncached(
        &self,
        key: CacheKey,
        path: &str,
        language: Language,
        content: &str,
    ) -> Result<FileAnalysis, AnalyzeError> {
        let units = self
            .extractor
            .extract(language, content)
            .map_err(|source| AnalyzeError::Extract {
                path: path.to_string(),
                source,
            })?;
        let analysis = assemble(path, language, content, &units);
        debug!(
            path,
            units = units.len(),
            undocumented = analysis.undocumented_items.len(),
            "analyzed file"
        );
        self.cache.put(&key, &analysis).await;
        Ok(analysis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::Unit;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct Counting {
        calls: AtomicUsize,
    }

    impl UnitExtractor for Counting {
        fn extract(&self, language: Language, content: &str) -> Result<Vec<Unit>, ExtractError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            TableExtractor.extract(language, content)
        }
    }

    /// Provider serving a single fixed file.
    struct OneFile(&'static str);

    #[async_trait]
    impl ContentProvider for OneFile {
        async fn list_contents(&self, _path: &str) -> Result<Vec<Entry>, ProviderError> {
            Ok(vec![])
        }
        async fn read_content(&self, _entry: &Entry) -> Result<String, ProviderError> {
            Ok(self.0.to_string())
        }
    }

    fn analyzer() -> (FileAnalyzer, Arc<Counting>) {
        let counting = Arc::new(Counting {
            calls: AtomicUsize::new(0),
        });
        let cache = Arc::new(AnalysisCache::in_memory(Duration::from_secs(60)));
        (FileAnalyzer::with_extractor(counting.clone(), cache), counting)
    }

    #[tokio::test]
    async fn test_same_content_new_path_is_rekeyed_hit() {
        let (analyzer, counting) = analyzer();
        let source = "def foo():\n    return 1\n";
        let first = analyzer
            .analyze_content("repo", "a.py", Language::Python, source)
            .await
            .unwrap();
        let second = analyzer
            .analyze_content("repo", "renamed.py", Language::Python, source)
            .await
            .unwrap();

        assert_eq!(counting.calls.load(Ordering::SeqCst), 1);
        assert_eq!(first.path, "a.py");
        assert_eq!(second.path, "renamed.py");
        assert_eq!(second.undocumented_items, first.undocumented_items);
    }

    #[tokio::test]
    async fn test_provider_identity_checked_before_read() {
        let (analyzer, counting) = analyzer();
        let provider = OneFile("def foo():\n    return 1\n");
        let entry = Entry::file("a.py").with_identity("blob-1");

        analyzer
            .analyze("repo", &provider, &entry, Language::Python)
            .await
            .unwrap();
        let again = analyzer
            .analyze("repo", &provider, &entry, Language::Python)
            .await
            .unwrap();
        assert_eq!(counting.calls.load(Ordering::SeqCst), 1);
        assert!(again.needs_docs);

        let changed = Entry::file("a.py").with_identity("blob-2");
        analyzer
            .analyze("repo", &provider, &changed, Language::Python)
            .await
            .unwrap();
        assert_eq!(counting.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_extract_error_carries_path() {
        let (analyzer, _) = analyzer();
        let err = analyzer
            .analyze_content("repo", "bad.py", Language::Python, "def broken(:\n")
            .await
            .unwrap_err();
        match err {
            AnalyzeError::Extract { path, .. } => assert_eq!(path, "bad.py"),
            other => panic!("unexpected error: {other}"),
        }
    }
}
