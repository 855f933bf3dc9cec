//! Configuration file support for whichtest
//!
//! Loads optional settings from JSON files.
//!
//! Search order:
//! 1. Explicit path (--config CLI flag)
//! 2. `.whichtestrc.json` in the working directory
//! 3. `whichtest.config.json` in the working directory
//!
//! All fields are optional. A missing file means defaults.

use crate::assumptions::CheckThresholds;
use crate::catalog::{TestCatalog, TestId};
use crate::controller::ControllerPolicy;
use crate::decision::MultiRecommendationPolicy;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// whichtest configuration loaded from a JSON config file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WhichTestConfig {
    /// Replacement alternatives; `null` means no alternative
    #[serde(default)]
    pub alternatives: BTreeMap<TestId, Option<TestId>>,

    /// "all" (default) or "first" for rules listing several tests
    #[serde(default)]
    pub multi_recommendations: Option<MultiRecommendationPolicy>,

    /// Allow picking any catalog test (default: true)
    #[serde(default)]
    pub allow_manual_selection: Option<bool>,

    /// Minimum expected cell frequency (default: 5.0)
    #[serde(default)]
    pub min_expected_count: Option<f64>,

    /// Minimum rows per group (default: 5)
    #[serde(default)]
    pub min_group_size: Option<usize>,

    /// Totals below this favor Fisher's exact test (default: 20)
    #[serde(default)]
    pub fisher_total_limit: Option<usize>,
}

/// Resolved configuration with the catalog built
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub catalog: TestCatalog,
    pub multi_recommendations: MultiRecommendationPolicy,
    pub controller: ControllerPolicy,
    pub thresholds: CheckThresholds,
    /// Path the config was loaded from (None if defaults)
    pub config_path: Option<PathBuf>,
}

impl WhichTestConfig {
    /// Validate the configuration for logical errors
    pub fn validate(&self) -> Result<()> {
        if let Some(min) = self.min_expected_count {
            if !min.is_finite() || min <= 0.0 {
                anyhow::bail!("min_expected_count must be positive (got {})", min);
            }
        }
        if self.min_group_size == Some(0) {
            anyhow::bail!("min_group_size must be at least 1");
        }
        if self.fisher_total_limit == Some(0) {
            anyhow::bail!("fisher_total_limit must be at least 1");
        }

        // Alternatives must still form a complete catalog
        TestCatalog::with_overrides(&self.alternatives).context("invalid alternatives")?;

        Ok(())
    }

    /// Resolve config into a form ready for use
    pub fn resolve(&self) -> Result<ResolvedConfig> {
        self.validate()?;

        let defaults = CheckThresholds::default();
        let thresholds = CheckThresholds {
            min_expected_count: self
                .min_expected_count
                .unwrap_or(defaults.min_expected_count),
            min_group_size: self.min_group_size.unwrap_or(defaults.min_group_size),
            fisher_total_limit: self
                .fisher_total_limit
                .unwrap_or(defaults.fisher_total_limit),
        };

        Ok(ResolvedConfig {
            catalog: TestCatalog::with_overrides(&self.alternatives)?,
            multi_recommendations: self.multi_recommendations.unwrap_or_default(),
            controller: ControllerPolicy {
                allow_manual_selection: self.allow_manual_selection.unwrap_or(true),
            },
            thresholds,
            config_path: None,
        })
    }
}

impl ResolvedConfig {
    /// Build a ResolvedConfig with all defaults (no config file)
    pub fn defaults() -> Result<Self> {
        WhichTestConfig::default().resolve()
    }
}

/// Discover and load a config file from a directory
///
/// Returns `None` if no config file is found (use defaults).
pub fn discover_config(root: &Path) -> Result<Option<(WhichTestConfig, PathBuf)>> {
    for name in [".whichtestrc.json", "whichtest.config.json"] {
        let path = root.join(name);
        if path.exists() {
            let config = load_config_file(&path)?;
            return Ok(Some((config, path)));
        }
    }
    Ok(None)
}

/// Load config from an explicit file path
pub fn load_config_file(path: &Path) -> Result<WhichTestConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file: {}", path.display()))?;

    let config: WhichTestConfig = serde_json::from_str(&content)
        .with_context(|| format!("failed to parse config file: {}", path.display()))?;

    config
        .validate()
        .with_context(|| format!("invalid config in: {}", path.display()))?;

    Ok(config)
}

/// Load and resolve config
///
/// If `config_path` is provided, loads from that file.
/// Otherwise, discovers config in `root`.
/// Returns default config if nothing is found.
pub fn load_and_resolve(root: &Path, config_path: Option<&Path>) -> Result<ResolvedConfig> {
    let (config, source_path) = if let Some(path) = config_path {
        let config = load_config_file(path)?;
        (config, Some(path.to_path_buf()))
    } else {
        match discover_config(root)? {
            Some((config, path)) => (config, Some(path)),
            None => (WhichTestConfig::default(), None),
        }
    };

    let mut resolved = config.resolve()?;
    resolved.config_path = source_path;
    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Fallback;
    use std::fs;

    #[test]
    fn test_default_config_is_valid() {
        let config = WhichTestConfig::default();
        config.validate().expect("default config should be valid");
        let resolved = config.resolve().expect("default config should resolve");
        assert_eq!(resolved.catalog, TestCatalog::standard());
        assert_eq!(resolved.multi_recommendations, MultiRecommendationPolicy::All);
        assert!(resolved.controller.allow_manual_selection);
        assert_eq!(resolved.thresholds, CheckThresholds::default());
    }

    #[test]
    fn test_parse_full_config() {
        let json = r#"{
            "alternatives": {
                "Pearson-correlation": "Kendalls-Tau",
                "One-way-ANOVA": null
            },
            "multi_recommendations": "first",
            "allow_manual_selection": false,
            "min_expected_count": 1.0,
            "min_group_size": 3,
            "fisher_total_limit": 40
        }"#;
        let config: WhichTestConfig = serde_json::from_str(json).unwrap();
        let resolved = config.resolve().unwrap();
        assert_eq!(
            resolved.catalog.alternative(TestId::PearsonCorrelation),
            Fallback::Alternative(TestId::KendallsTau)
        );
        assert_eq!(
            resolved.catalog.alternative(TestId::OneWayAnova),
            Fallback::NoAlternativeDefined
        );
        assert_eq!(resolved.multi_recommendations, MultiRecommendationPolicy::First);
        assert!(!resolved.controller.allow_manual_selection);
        assert_eq!(resolved.thresholds.min_expected_count, 1.0);
        assert_eq!(resolved.thresholds.min_group_size, 3);
        assert_eq!(resolved.thresholds.fisher_total_limit, 40);
    }

    #[test]
    fn test_spaced_labels_accepted_as_keys() {
        let json = r#"{"alternatives": {"Paired samples T-test": "Sign-test"}}"#;
        let result: Result<WhichTestConfig, _> = serde_json::from_str(json);
        assert!(result.is_err(), "unknown test id should be rejected");

        let json = r#"{"alternatives": {"Paired samples T-test": "Mann-Whitney U Test"}}"#;
        let config: WhichTestConfig = serde_json::from_str(json).unwrap();
        assert_eq!(
            config.alternatives.get(&TestId::PairedSamplesTTest),
            Some(&Some(TestId::MannWhitneyUTest))
        );
    }

    #[test]
    fn test_reject_unknown_fields() {
        let json = r#"{"alpha": 0.05}"#;
        let result: Result<WhichTestConfig, _> = serde_json::from_str(json);
        assert!(result.is_err(), "unknown fields should be rejected");
    }

    #[test]
    fn test_reject_self_alternative() {
        let json = r#"{"alternatives": {"G-test": "G-test"}}"#;
        let config: WhichTestConfig = serde_json::from_str(json).unwrap();
        let err = config.validate().unwrap_err();
        assert!(format!("{:#}", err).contains("cannot be its own alternative"));
    }

    #[test]
    fn test_reject_non_positive_thresholds() {
        for json in [
            r#"{"min_expected_count": 0.0}"#,
            r#"{"min_expected_count": -2.5}"#,
            r#"{"min_group_size": 0}"#,
            r#"{"fisher_total_limit": 0}"#,
        ] {
            let config: WhichTestConfig = serde_json::from_str(json).unwrap();
            assert!(config.validate().is_err(), "{} should be rejected", json);
        }
    }

    #[test]
    fn test_discover_whichtestrc() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join(".whichtestrc.json");
        fs::write(&config_path, r#"{"min_group_size": 8}"#).unwrap();

        let result = discover_config(dir.path()).unwrap();
        let (config, path) = result.unwrap();
        assert_eq!(config.min_group_size, Some(8));
        assert_eq!(path, config_path);
    }

    #[test]
    fn test_discover_priority_order() {
        let dir = tempfile::tempdir().unwrap();

        // Both present: .whichtestrc.json wins
        fs::write(dir.path().join(".whichtestrc.json"), r#"{"min_group_size": 1}"#).unwrap();
        fs::write(
            dir.path().join("whichtest.config.json"),
            r#"{"min_group_size": 2}"#,
        )
        .unwrap();

        let (config, _) = discover_config(dir.path()).unwrap().unwrap();
        assert_eq!(config.min_group_size, Some(1));
    }

    #[test]
    fn test_no_config_returns_none() {
        let dir = tempfile::tempdir().unwrap();
        assert!(discover_config(dir.path()).unwrap().is_none());
    }

    #[test]
    fn test_load_and_resolve_explicit_path() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("custom.json");
        fs::write(&config_path, r#"{"multi_recommendations": "first"}"#).unwrap();

        let resolved = load_and_resolve(dir.path(), Some(&config_path)).unwrap();
        assert_eq!(resolved.multi_recommendations, MultiRecommendationPolicy::First);
        assert_eq!(resolved.config_path, Some(config_path));
    }

    #[test]
    fn test_load_invalid_file_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("whichtest.config.json");
        fs::write(&config_path, "{ not json").unwrap();

        let err = load_and_resolve(dir.path(), None).unwrap_err();
        assert!(err.to_string().contains("failed to parse config file"));
    }
}
