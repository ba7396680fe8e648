use anyhow::{anyhow, Context, Result};
use mfs_ingest::{DateOrder, FormatDefinition, FormatRegistry, ScoringConfig, StatementParser};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::state::{ensure_mfs_home, mfs_home};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub parse: ParseSection,
    /// Applied to every built-in format
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scoring: Option<ScoringConfig>,
    /// Extra formats; a name matching a built-in replaces it
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub formats: Vec<FormatDefinition>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ParseSection {
    /// Overrides every format's order for ambiguous numeric dates
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_order: Option<DateOrder>,
    /// Format to force when `--format` is not given
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_format: Option<String>,
}

impl Config {
    /// What `mfs config init` writes: every knob spelled out
    pub fn starter() -> Self {
        Self {
            parse: ParseSection {
                date_order: Some(DateOrder::default()),
                default_format: None,
            },
            scoring: Some(ScoringConfig::default()),
            formats: Vec::new(),
        }
    }

    pub fn registry(&self) -> FormatRegistry {
        let mut registry = FormatRegistry::builtin();
        if let Some(scoring) = &self.scoring {
            registry = registry.map_formats(|f| f.with_scoring(scoring.clone()));
        }
        for def in &self.formats {
            registry.push(def.clone().into());
        }
        if let Some(order) = self.parse.date_order {
            registry = registry.map_formats(|f| f.with_date_order(order));
        }
        registry
    }

    /// Parser for the configured formats; `format` (or `default_format`)
    /// pins a single one instead of detecting per file.
    pub fn parser(&self, format: Option<&str>) -> Result<StatementParser> {
        let registry = self.registry();
        match format.or(self.parse.default_format.as_deref()) {
            Some(name) => {
                let chosen = registry.get(name).ok_or_else(|| {
                    let known: Vec<&str> = registry.iter().map(|f| f.name.as_str()).collect();
                    anyhow!("unknown format {:?} (known: {})", name, known.join(", "))
                })?;
                Ok(StatementParser::new(chosen.as_ref().clone()))
            }
            None => Ok(StatementParser::with_registry(registry)),
        }
    }
}

pub fn config_path(explicit: Option<&Path>) -> Result<PathBuf> {
    match explicit {
        Some(p) => Ok(p.to_path_buf()),
        None => Ok(mfs_home()?.join("config.toml")),
    }
}

/// An explicit path must exist; a missing default file means defaults.
pub fn load_config(explicit: Option<&Path>) -> Result<Config> {
    let p = config_path(explicit)?;
    if explicit.is_none() && !p.exists() {
        return Ok(Config::default());
    }
    let s = fs::read_to_string(&p).with_context(|| format!("read {}", p.display()))?;
    parse_config(&s).with_context(|| format!("parse {}", p.display()))
}

pub fn parse_config(s: &str) -> Result<Config> {
    Ok(toml::from_str(s)?)
}

pub fn save_config(cfg: &Config, path: &Path) -> Result<()> {
    let s = toml::to_string_pretty(cfg).context("serialize config")?;
    fs::write(path, s).with_context(|| format!("write {}", path.display()))?;
    Ok(())
}

pub fn init_config(explicit: Option<&Path>) -> Result<()> {
    let p = match explicit {
        Some(p) => {
            if let Some(parent) = p.parent().filter(|d| !d.as_os_str().is_empty()) {
                fs::create_dir_all(parent).with_context(|| format!("create {}", parent.display()))?;
            }
            p.to_path_buf()
        }
        None => ensure_mfs_home()?.join("config.toml"),
    };
    if p.exists() {
        println!("Config already exists: {}", p.display());
        return Ok(());
    }
    save_config(&Config::starter(), &p)?;
    println!("Wrote {}", p.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use mfs_core::CanonicalField;

    const SAMPLE: &str = r#"
[parse]
date_order = "month_first"

[scoring]
confidence_threshold = 1.5

[[formats]]
name = "agent-ledger"
default_headers = ["Ref ID", "When", "Value", "Side"]
critical_fields = ["transaction_id", "timestamp", "amount"]

[formats.synonyms]
transaction_id = ["ref id"]
timestamp = ["when"]
amount = ["value"]
direction = ["side"]
"#;

    #[test]
    fn test_missing_sections_use_defaults() {
        let cfg = parse_config("").unwrap();
        assert!(cfg.scoring.is_none());
        assert!(cfg.formats.is_empty());
        assert_eq!(cfg.registry().len(), 2);
    }

    #[test]
    fn test_overrides_and_extra_formats() {
        let cfg = parse_config(SAMPLE).unwrap();
        let registry = cfg.registry();
        assert_eq!(registry.len(), 3);

        let builtin = registry.get("mfs-statement").unwrap();
        assert_eq!(builtin.scoring.confidence_threshold, 1.5);
        assert_eq!(builtin.scoring.scan_rows, 10);
        assert_eq!(builtin.date_order, DateOrder::MonthFirst);

        let ledger = registry.get("agent-ledger").unwrap();
        assert_eq!(ledger.catalog.resolve("Ref_ID"), Some(CanonicalField::TransactionId));
        assert_eq!(ledger.reference_headers, ledger.default_headers);
        assert_eq!(ledger.scoring.confidence_threshold, 0.9, "custom formats keep their own scoring");
    }

    #[test]
    fn test_pinned_format() {
        let cfg = parse_config(SAMPLE).unwrap();
        let parser = cfg.parser(Some("AGENT-LEDGER")).unwrap();
        assert_eq!(parser.registry().len(), 1);

        let err = cfg.parser(Some("nope")).err().unwrap();
        assert!(err.to_string().contains("agent-ledger"), "{err}");

        let pinned = Config {
            parse: ParseSection {
                default_format: Some("ocr-dump".to_string()),
                ..ParseSection::default()
            },
            ..Config::default()
        };
        let parser = pinned.parser(None).unwrap();
        assert_eq!(parser.registry().iter().next().map(|f| f.name.as_str()), Some("ocr-dump"));
    }

    #[test]
    fn test_starter_config_round_trips() {
        let s = toml::to_string_pretty(&Config::starter()).unwrap();
        let back = parse_config(&s).unwrap();
        assert_eq!(back.scoring, Some(ScoringConfig::default()));
        assert_eq!(back.parse.date_order, Some(DateOrder::DayFirst));
    }
}
