use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub paths: Paths,
    #[serde(default)]
    pub remote: Remote,
    #[serde(default)]
    pub grading: Grading,
    #[serde(default)]
    pub staleness: Staleness,
    #[serde(default)]
    pub poll: Poll,
    #[serde(default)]
    pub logging: Logging,
    #[serde(default)]
    pub master_items: MasterItems,
}

/// What `load_or_init` had to do to produce a usable config file.
#[derive(Debug, Clone)]
pub struct ConfigLoad {
    pub config: Config,
    pub created: bool,
    pub backfilled: Vec<String>,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config: {}", path.display()))?;
        let cfg: Config = toml::from_str(&raw).with_context(|| "parsing TOML")?;
        Ok(cfg)
    }

    /// Loads the config, writing defaults when the file is missing and
    /// backfilling keys an older file does not carry yet.
    pub fn load_or_init(path: &Path) -> Result<ConfigLoad> {
        if !path.exists() {
            let cfg = Config::default();
            cfg.write(path)?;
            return Ok(ConfigLoad {
                config: cfg,
                created: true,
                backfilled: Vec::new(),
            });
        }

        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config: {}", path.display()))?;
        let mut table: toml::Table = toml::from_str(&raw)
            .with_context(|| format!("parsing TOML: {}", path.display()))?;

        let defaults: toml::Table = toml::from_str(&toml::to_string(&Config::default())?)
            .with_context(|| "re-reading default config")?;

        let mut backfilled = Vec::new();
        backfill(&mut table, &defaults, "", &mut backfilled);

        let cfg: Config = toml::from_str(&toml::to_string(&table)?)
            .with_context(|| format!("decoding config: {}", path.display()))?;

        if !backfilled.is_empty() {
            cfg.write(path)?;
        }

        Ok(ConfigLoad {
            config: cfg,
            created: false,
            backfilled,
        })
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            crate::util::ensure_dir(parent)?;
        }
        let raw = toml::to_string_pretty(self).with_context(|| "serializing config")?;
        std::fs::write(path, raw).with_context(|| format!("writing config: {}", path.display()))
    }
}

fn backfill(target: &mut toml::Table, defaults: &toml::Table, prefix: &str, added: &mut Vec<String>) {
    for (key, default) in defaults {
        let dotted = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}.{key}")
        };
        match target.get_mut(key) {
            None => {
                target.insert(key.clone(), default.clone());
                added.push(dotted);
            }
            Some(toml::Value::Table(existing)) => {
                // Template skeletons are user-owned JSON; only fill them when absent.
                if let toml::Value::Table(default_table) = default {
                    if dotted != "master_items.laptop" && dotted != "master_items.desktop" {
                        backfill(existing, default_table, &dotted, added);
                    }
                }
            }
            Some(_) => {}
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            paths: Default::default(),
            remote: Default::default(),
            grading: Default::default(),
            staleness: Default::default(),
            poll: Default::default(),
            logging: Default::default(),
            master_items: Default::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Paths {
    pub reports_dir: String,
    pub report_pattern: String,
    pub processed_dir: String,
    pub uid_error_dir: String,
    pub issues_dir: String,
    pub expired_dir: String,
    pub defects_file: String,
}
impl Default for Paths {
    fn default() -> Self {
        Self {
            reports_dir: "Reports".into(),
            report_pattern: "*.xml".into(),
            processed_dir: "Reports/Processed".into(),
            uid_error_dir: "Reports/UID Error".into(),
            issues_dir: "Reports/Issues".into(),
            expired_dir: "Reports/Expired".into(),
            defects_file: "Config/defects.json".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Remote {
    pub base_url: String,
    pub api_key: String,
    pub user_agent: String,
    pub timeout_seconds: u64,
}
impl Default for Remote {
    fn default() -> Self {
        Self {
            base_url: "".into(),
            api_key: "".into(),
            user_agent: "Assetworx".into(),
            timeout_seconds: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Grading {
    /// When false, grade and defect attributes already present remotely are left alone.
    pub overwrite_existing: bool,
    pub battery_fail_threshold: u32,
}
impl Default for Grading {
    fn default() -> Self {
        Self {
            overwrite_existing: true,
            battery_fail_threshold: 60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Staleness {
    pub stale_after_seconds: u64,
}
impl Default for Staleness {
    fn default() -> Self {
        Self {
            stale_after_seconds: 600,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Poll {
    pub interval_seconds: u64,
}
impl Default for Poll {
    fn default() -> Self {
        Self {
            interval_seconds: 300,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Logging {
    pub level: String,
    pub json: bool,
    pub write_to_file: bool,
    pub file_path: String,
}
impl Default for Logging {
    fn default() -> Self {
        Self {
            level: "info".into(),
            json: false,
            write_to_file: true,
            file_path: "Config/asset-grader.log".into(),
        }
    }
}

/// Skeleton payloads posted to `ItemMaster` when the remote has no catalog
/// entry for a model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MasterItems {
    pub laptop: Map<String, Value>,
    pub desktop: Map<String, Value>,
}
impl Default for MasterItems {
    fn default() -> Self {
        let laptop = serde_json::json!({
            "attributeType": "Laptop",
            "itemTypeId": 1,
            "manufacturer": 0,
            "manufacturerId": 0,
            "primaryCategoryId": 70,
            "title": "string",
        });
        let desktop = serde_json::json!({
            "attributeType": "Desktop",
            "manufacturer": 0,
            "manufacturerId": 0,
            "primaryCategoryId": 69,
            "title": "string",
        });
        Self {
            laptop: as_object(laptop),
            desktop: as_object(desktop),
        }
    }
}

fn as_object(v: Value) -> Map<String, Value> {
    match v {
        Value::Object(m) => m,
        _ => Map::new(),
    }
}
