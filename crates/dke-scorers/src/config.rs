//! Configuration loading and grader factory.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use dke_core::grading::{Grader, Rubric};
use dke_core::model::{BktParams, CatConfig};

use crate::http::HttpScorer;

/// Environment variable that overrides the HTTP scorer API key.
pub const API_KEY_ENV: &str = "DKE_SCORER_API_KEY";

/// Which scorer grades free-text responses.
///
/// Note: Custom Debug impl masks API keys to prevent accidental exposure in logs.
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ScorerConfig {
    /// Offline keyword coverage.
    #[default]
    Keyword,
    /// Remote grading service.
    Http {
        base_url: String,
        #[serde(default)]
        api_key: Option<String>,
        #[serde(default = "default_scorer_model")]
        model: String,
        #[serde(default)]
        timeout_secs: Option<u64>,
    },
}

impl std::fmt::Debug for ScorerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScorerConfig::Keyword => f.write_str("Keyword"),
            ScorerConfig::Http {
                base_url,
                api_key,
                model,
                timeout_secs,
            } => f
                .debug_struct("Http")
                .field("base_url", base_url)
                .field("api_key", &api_key.as_ref().map(|_| "***"))
                .field("model", model)
                .field("timeout_secs", timeout_secs)
                .finish(),
        }
    }
}

fn default_scorer_model() -> String {
    "default".to_string()
}

/// Top-level dke configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DkeConfig {
    /// Adaptive test stopping policy.
    #[serde(default)]
    pub cat: CatConfig,
    /// Knowledge tracing parameters shared by every skill.
    #[serde(default)]
    pub bkt: BktParams,
    /// Rubric for the free-text response.
    #[serde(default)]
    pub rubric: Rubric,
    /// Free-text scorer.
    #[serde(default)]
    pub scorer: ScorerConfig,
    /// Output directory for reports.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("./dke-results")
}

impl Default for DkeConfig {
    fn default() -> Self {
        Self {
            cat: CatConfig::default(),
            bkt: BktParams::default(),
            rubric: Rubric::default(),
            scorer: ScorerConfig::default(),
            output_dir: default_output_dir(),
        }
    }
}

impl DkeConfig {
    /// Check the adaptive and tracing parameters.
    pub fn validate(&self) -> Result<()> {
        self.cat.validate().context("invalid [cat] section")?;
        self.bkt.validate().context("invalid [bkt] section")?;
        if self.rubric.weights.values().any(|w| !w.is_finite() || *w < 0.0) {
            anyhow::bail!("invalid [rubric] section: weights must be non-negative");
        }
        Ok(())
    }
}

/// Resolve environment variable references like `${VAR_NAME}` in a string.
fn resolve_env_vars(s: &str) -> String {
    let mut result = s.to_string();
    let mut from = 0;
    while let Some(offset) = result[from..].find("${") {
        let start = from + offset;
        let Some(len) = result[start..].find('}') else {
            break;
        };
        let var_name = &result[start + 2..start + len];
        let value = std::env::var(var_name).unwrap_or_default();
        result.replace_range(start..start + len + 1, &value);
        from = start + value.len();
    }
    result
}

fn resolve_scorer_config(config: &ScorerConfig) -> ScorerConfig {
    match config {
        ScorerConfig::Keyword => ScorerConfig::Keyword,
        ScorerConfig::Http {
            base_url,
            api_key,
            model,
            timeout_secs,
        } => ScorerConfig::Http {
            base_url: resolve_env_vars(base_url),
            api_key: api_key.as_deref().map(resolve_env_vars),
            model: resolve_env_vars(model),
            timeout_secs: *timeout_secs,
        },
    }
}

/// Load configuration from well-known paths.
///
/// Search order:
/// 1. `dke.toml` in the current directory
/// 2. `~/.config/dke/config.toml`
///
/// Environment variable override: `DKE_SCORER_API_KEY`.
pub fn load_config() -> Result<DkeConfig> {
    load_config_from(None)
}

/// Load config from an explicit path, or search the default locations.
pub fn load_config_from(path: Option<&Path>) -> Result<DkeConfig> {
    let config_path = match path {
        Some(p) if p.exists() => Some(p.to_path_buf()),
        Some(p) => anyhow::bail!("config file not found: {}", p.display()),
        None => {
            let local = PathBuf::from("dke.toml");
            if local.exists() {
                Some(local)
            } else {
                dirs_path()
                    .map(|home| home.join("config.toml"))
                    .filter(|global| global.exists())
            }
        }
    };

    let mut config = match config_path {
        Some(path) => {
            tracing::debug!("loading config from {}", path.display());
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read config: {}", path.display()))?;
            toml::from_str::<DkeConfig>(&content)
                .with_context(|| format!("failed to parse config: {}", path.display()))?
        }
        None => DkeConfig::default(),
    };

    config.scorer = resolve_scorer_config(&config.scorer);

    if let Ok(key) = std::env::var(API_KEY_ENV) {
        if let ScorerConfig::Http { api_key, .. } = &mut config.scorer {
            *api_key = Some(key);
        }
    }

    config.validate()?;
    Ok(config)
}

fn dirs_path() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|h| PathBuf::from(h).join(".config").join("dke"))
}

/// Create the grader described by `config`.
pub fn create_grader(config: &ScorerConfig) -> Result<Grader> {
    match config {
        ScorerConfig::Keyword => Ok(Grader::KeywordCoverage),
        ScorerConfig::Http {
            base_url,
            api_key,
            model,
            timeout_secs,
        } => {
            if base_url.trim().is_empty() {
                anyhow::bail!("http scorer requires a base_url");
            }
            let scorer = HttpScorer::new(base_url, api_key.clone(), model, *timeout_secs)?;
            Ok(Grader::external(Arc::new(scorer)))
        }
    }
}
