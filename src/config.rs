//! Settings for docsmith.
//!
//! Loaded from `docsmith.yaml` / `.docsmith.yaml` in the scanned directory or
//! from an explicit `--config` path. Every section and field is optional.

use anyhow::{bail, Context};
use directories::ProjectDirs;
use globset::{Glob, GlobSet, GlobSetBuilder};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// File names probed by [`Settings::discover`], in order.
pub const CONFIG_FILE_NAMES: &[&str] = &["docsmith.yaml", ".docsmith.yaml"];

/// Top-level settings.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Settings {
    #[serde(default)]
    pub scan: ScanConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub generation: GenerationConfig,
    #[serde(default)]
    pub publish: PublishConfig,
}

impl Settings {
    /// Parse settings from a YAML file.
    pub fn parse_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        Self::from_yaml(&content).with_context(|| format!("parsing {}", path.display()))
    }

    pub fn from_yaml(content: &str) -> anyhow::Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(content)?)
    }

    /// First config file found directly in `dir`.
    pub fn discover<P: AsRef<Path>>(dir: P) -> Option<PathBuf> {
        CONFIG_FILE_NAMES
            .iter()
            .map(|name| dir.as_ref().join(name))
            .find(|p| p.is_file())
    }

    /// Load from `explicit` when given, else from a discovered file in
    /// `dir`, else defaults. The result is validated.
    pub fn load(explicit: Option<&Path>, dir: &Path) -> anyhow::Result<Self> {
        let settings = match explicit.map(Path::to_path_buf).or_else(|| Self::discover(dir)) {
            Some(path) => {
                tracing::debug!(path = %path.display(), "loading settings");
                Self::parse_file(&path)?
            }
            None => Self::default(),
        };
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.scan.concurrency == 0 {
            bail!("scan.concurrency must be at least 1");
        }
        self.scan.excluded_globset()?;
        if !(0.0..=2.0).contains(&self.generation.temperature) {
            bail!(
                "generation.temperature must be between 0 and 2, got {}",
                self.generation.temperature
            );
        }
        if self.generation.max_tokens == 0 {
            bail!("generation.max_tokens must be at least 1");
        }
        if self.publish.branch_prefix.trim().is_empty() {
            bail!("publish.branch_prefix must not be empty");
        }
        if !(1..=CacheConfig::MAX_TTL_HOURS).contains(&self.cache.ttl_hours) {
            bail!(
                "cache.ttl_hours must be between 1 and {}, got {}",
                CacheConfig::MAX_TTL_HOURS,
                self.cache.ttl_hours
            );
        }
        Ok(())
    }
}

/// Repository traversal settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScanConfig {
    /// Upper bound on concurrent listings, analyses and file documentation.
    #[serde(default = "ScanConfig::default_concurrency")]
    pub concurrency: usize,
    /// Glob patterns for paths to skip (e.g. "**/vendor/**").
    #[serde(default = "ScanConfig::default_excluded_paths")]
    pub excluded_paths: Vec<String>,
    /// Files larger than this are skipped.
    #[serde(default = "ScanConfig::default_max_file_bytes")]
    pub max_file_bytes: u64,
}

impl ScanConfig {
    fn default_concurrency() -> usize {
        8
    }

    fn default_excluded_paths() -> Vec<String> {
        [
            "**/.git",
            "**/node_modules",
            "**/__pycache__",
            "**/.venv",
            "**/venv",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect()
    }

    fn default_max_file_bytes() -> u64 {
        1024 * 1024
    }

    /// Compile `excluded_paths` into a matcher.
    pub fn excluded_globset(&self) -> anyhow::Result<GlobSet> {
        let mut builder = GlobSetBuilder::new();
        for pattern in &self.excluded_paths {
            let glob = Glob::new(pattern)
                .with_context(|| format!("invalid excluded_paths pattern {:?}", pattern))?;
            builder.add(glob);
        }
        Ok(builder.build()?)
    }
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            concurrency: Self::default_concurrency(),
            excluded_paths: Self::default_excluded_paths(),
            max_file_bytes: Self::default_max_file_bytes(),
        }
    }
}

/// Analysis cache settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CacheConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Cache directory. Defaults to the platform cache dir.
    #[serde(default)]
    pub dir: Option<PathBuf>,
    #[serde(default = "CacheConfig::default_ttl_hours")]
    pub ttl_hours: u64,
    #[serde(default = "CacheConfig::default_connect_retries")]
    pub connect_retries: u32,
    #[serde(default = "CacheConfig::default_retry_delay_ms")]
    pub retry_delay_ms: u64,
}

impl CacheConfig {
    /// Ten years.
    pub const MAX_TTL_HOURS: u64 = 24 * 365 * 10;

    fn default_ttl_hours() -> u64 {
        24
    }

    fn default_connect_retries() -> u32 {
        3
    }

    fn default_retry_delay_ms() -> u64 {
        1000
    }

    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_hours.saturating_mul(3600))
    }

    /// Configured directory, or `<platform cache dir>/docsmith/analysis`.
    pub fn resolved_dir(&self) -> Option<PathBuf> {
        self.dir.clone().or_else(|| {
            ProjectDirs::from("", "", "docsmith").map(|dirs| dirs.cache_dir().join("analysis"))
        })
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            dir: None,
            ttl_hours: Self::default_ttl_hours(),
            connect_retries: Self::default_connect_retries(),
            retry_delay_ms: Self::default_retry_delay_ms(),
        }
    }
}

/// Text generation service settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GenerationConfig {
    #[serde(default = "GenerationConfig::default_base_url")]
    pub base_url: String,
    #[serde(default = "GenerationConfig::default_model")]
    pub model: String,
    /// API key. Prefer `api_key_env` over putting keys in files.
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,
    /// Environment variable consulted when `api_key` is unset.
    #[serde(default = "GenerationConfig::default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "GenerationConfig::default_temperature")]
    pub temperature: f32,
    #[serde(default = "GenerationConfig::default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "GenerationConfig::default_timeout_secs")]
    pub timeout_secs: u64,
}

impl GenerationConfig {
    fn default_base_url() -> String {
        "https://api.openai.com".to_string()
    }

    fn default_model() -> String {
        "gpt-4".to_string()
    }

    fn default_api_key_env() -> String {
        "OPENAI_API_KEY".to_string()
    }

    fn default_temperature() -> f32 {
        0.3
    }

    fn default_max_tokens() -> u32 {
        1000
    }

    fn default_timeout_secs() -> u64 {
        60
    }

    pub fn resolved_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .or_else(|| std::env::var(&self.api_key_env).ok())
            .filter(|k| !k.trim().is_empty())
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            base_url: Self::default_base_url(),
            model: Self::default_model(),
            api_key: None,
            api_key_env: Self::default_api_key_env(),
            temperature: Self::default_temperature(),
            max_tokens: Self::default_max_tokens(),
            timeout_secs: Self::default_timeout_secs(),
        }
    }
}

/// Change publication settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PublishConfig {
    /// Branch names are this prefix followed by a Unix timestamp.
    #[serde(default = "PublishConfig::default_branch_prefix")]
    pub branch_prefix: String,
}

impl PublishConfig {
    fn default_branch_prefix() -> String {
        "docs/auto-document-".to_string()
    }
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            branch_prefix: Self::default_branch_prefix(),
        }
    }
}

fn default_true() -> bool {
    true
}
