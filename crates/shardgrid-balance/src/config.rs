//! shardgrid.toml configuration parser.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::BalanceResult;
use crate::taint::{DEFAULT_GC_INTERVAL, DEFAULT_TTL, TaintCacheConfig};

/// Top-level configuration. Every section is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShardgridConfig {
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub taint: TaintConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Seconds between scheduling rounds in `run` mode.
    pub interval_secs: u64,
    /// Expected replica count per region; others are left alone.
    pub max_replicas: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            interval_secs: 10,
            max_replicas: 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaintConfig {
    pub gc_interval_secs: u64,
    pub ttl_secs: u64,
}

impl Default for TaintConfig {
    fn default() -> Self {
        Self {
            gc_interval_secs: DEFAULT_GC_INTERVAL.as_secs(),
            ttl_secs: DEFAULT_TTL.as_secs(),
        }
    }
}

impl TaintConfig {
    pub fn to_cache_config(&self) -> TaintCacheConfig {
        TaintCacheConfig {
            gc_interval: Duration::from_secs(self.gc_interval_secs),
            ttl: Duration::from_secs(self.ttl_secs),
        }
    }
}

impl ShardgridConfig {
    /// Read, parse and validate a config file.
    pub fn from_file(path: &Path) -> BalanceResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: ShardgridConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> BalanceResult<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> BalanceResult<()> {
        self.taint.to_cache_config().validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BalanceError;
    use std::io::Write;

    #[test]
    fn empty_file_uses_defaults() {
        let config: ShardgridConfig = toml::from_str("").unwrap();
        assert_eq!(config, ShardgridConfig::default());
        assert_eq!(config.scheduler.max_replicas, 3);
        assert_eq!(config.taint.to_cache_config(), TaintCacheConfig::default());
    }

    #[test]
    fn partial_sections_fill_in_defaults() {
        let toml_str = r#"
[taint]
ttl_secs = 120
"#;
        let config: ShardgridConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.taint.ttl_secs, 120);
        assert_eq!(config.taint.gc_interval_secs, 5);
        assert_eq!(config.scheduler, SchedulerConfig::default());
    }

    #[test]
    fn from_file_parses_and_validates() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[scheduler]\ninterval_secs = 2\nmax_replicas = 5\n\n[taint]\ngc_interval_secs = 1\nttl_secs = 30"
        )
        .unwrap();

        let config = ShardgridConfig::from_file(file.path()).unwrap();
        assert_eq!(config.scheduler.interval_secs, 2);
        assert_eq!(config.scheduler.max_replicas, 5);
        assert_eq!(config.taint.to_cache_config().ttl, Duration::from_secs(30));
    }

    #[test]
    fn from_file_rejects_gc_not_below_ttl() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[taint]\ngc_interval_secs = 60\nttl_secs = 60").unwrap();

        let err = ShardgridConfig::from_file(file.path()).unwrap_err();
        assert!(matches!(err, BalanceError::InvalidTaintConfig { .. }));
    }

    #[test]
    fn from_file_reports_parse_errors() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[scheduler]\nmax_replicas = \"three\"").unwrap();

        let err = ShardgridConfig::from_file(file.path()).unwrap_err();
        assert!(matches!(err, BalanceError::Config(_)));
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = ShardgridConfig::from_file(&dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, BalanceError::Io(_)));
    }

    #[test]
    fn renders_back_to_toml() {
        let text = ShardgridConfig::default().to_toml_string().unwrap();
        assert!(text.contains("[scheduler]"));
        assert!(text.contains("ttl_secs = 300"));
        let back: ShardgridConfig = toml::from_str(&text).unwrap();
        assert_eq!(back, ShardgridConfig::default());
    }
}
