use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tally_core::{Rule, RuleMatcher, default_rules};
use tally_finance::{CategorizerConfig, ClassifierConfig, ClassifierStore};

use crate::state::{default_home, ensure_tally_home};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Train on the built-in examples when no saved model exists
    pub seed_on_first_run: bool,
    pub classifier: ClassifierConfig,
    pub categorizer: CategorizerConfig,
    pub paths: PathsSection,
    /// Keyword rules in match order; the built-in table when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rules: Option<Vec<Rule>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsSection {
    pub transactions: PathBuf,
    pub budgets: PathBuf,
    pub model: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            seed_on_first_run: true,
            classifier: ClassifierConfig::default(),
            categorizer: CategorizerConfig::default(),
            paths: PathsSection::default(),
            rules: None,
        }
    }
}

impl Default for PathsSection {
    fn default() -> Self {
        let home = default_home();
        Self {
            transactions: home.join("transactions.csv"),
            budgets: home.join("budgets.json"),
            model: ClassifierStore::default_path()
                .unwrap_or_else(|_| home.join("models").join("expense_model.bin")),
        }
    }
}

impl Config {
    pub fn rule_matcher(&self) -> RuleMatcher {
        match &self.rules {
            Some(rules) => RuleMatcher::new(rules.clone()),
            None => RuleMatcher::default(),
        }
    }
}

pub fn config_path() -> Result<PathBuf> {
    Ok(ensure_tally_home()?.join("config.toml"))
}

pub fn load_config_from(p: &Path) -> Result<Config> {
    if !p.exists() {
        return Ok(Config::default());
    }
    let s = fs::read_to_string(p).with_context(|| format!("read {}", p.display()))?;
    toml::from_str(&s).with_context(|| format!("parse {}", p.display()))
}

pub fn load_config() -> Result<Config> {
    load_config_from(&config_path()?)
}

pub fn save_config_to(cfg: &Config, p: &Path) -> Result<()> {
    let s = toml::to_string_pretty(cfg).context("serialize config")?;
    fs::write(p, s).with_context(|| format!("write {}", p.display()))?;
    Ok(())
}

pub fn init_config() -> Result<()> {
    let p = config_path()?;
    if p.exists() {
        println!("Config already exists: {}", p.display());
        return Ok(());
    }
    // Spell out the rule table so it can be edited in place
    let cfg = Config {
        rules: Some(default_rules()),
        ..Config::default()
    };
    save_config_to(&cfg, &p)?;
    println!("Wrote {}", p.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_config_is_default() {
        let dir = TempDir::new().unwrap();
        let cfg = load_config_from(&dir.path().join("config.toml")).unwrap();
        assert!(cfg.seed_on_first_run);
        assert_eq!(cfg.categorizer.threshold, 0.75);
        assert_eq!(cfg.classifier.min_df, 2);
        assert_eq!(cfg.rule_matcher(), RuleMatcher::default());
    }

    #[test]
    fn test_default_model_path_sits_next_to_the_log() {
        let paths = PathsSection::default();
        assert!(paths.model.ends_with("models/expense_model.bin"));
        assert_eq!(
            paths.model.parent().and_then(Path::parent),
            paths.transactions.parent()
        );
    }

    #[test]
    fn test_round_trip_with_rules() {
        let dir = TempDir::new().unwrap();
        let p = dir.path().join("config.toml");
        let cfg = Config {
            rules: Some(default_rules()),
            ..Config::default()
        };
        save_config_to(&cfg, &p).unwrap();

        let back = load_config_from(&p).unwrap();
        assert_eq!(back.rules, Some(default_rules()));
        assert_eq!(back.paths.model, cfg.paths.model);
        assert_eq!(back.classifier, cfg.classifier);
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let dir = TempDir::new().unwrap();
        let p = dir.path().join("config.toml");
        fs::write(
            &p,
            r#"
[categorizer]
threshold = 0.9

[[rules]]
category = "Pets"
keywords = ["Vet", "kibble"]
"#,
        )
        .unwrap();

        let cfg = load_config_from(&p).unwrap();
        assert_eq!(cfg.categorizer.threshold, 0.9);
        assert_eq!(cfg.classifier.seed, 42);
        let rules = cfg.rule_matcher();
        assert_eq!(rules.categorize("vet visit"), "Pets");
        assert_eq!(rules.categorize("pizza"), "Other");
    }

    #[test]
    fn test_bad_config_is_an_error() {
        let dir = TempDir::new().unwrap();
        let p = dir.path().join("config.toml");
        fs::write(&p, "categorizer = 3").unwrap();
        assert!(load_config_from(&p).is_err());
    }
}
