use anyhow::{Context, Result};
use chrono::NaiveTime;
use clap::ValueEnum;
use rand::Rng;
use serde::Deserialize;
use std::path::{Path, PathBuf};

use shuangse_db::db::db_path;
use shuangse_db::models::Ticket;
use shuangse_model::prize::EvalMode;
use shuangse_model::sampler::uniform_ticket;
use shuangse_model::snapshot::ModelSnapshot;

use crate::feed::DEFAULT_FEED_URL;

pub const CONFIG_FILE: &str = "shuangse.toml";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Generator {
    /// Chaîne de Markov sur les rouges + fréquences de la bleue
    #[default]
    Markov,
    /// Tirage uniforme, sans historique
    Uniform,
}

impl Generator {
    pub fn generate<R: Rng + ?Sized>(&self, snapshot: &ModelSnapshot, rng: &mut R) -> Ticket {
        match self {
            Generator::Markov => snapshot.sample(rng),
            Generator::Uniform => uniform_ticket(rng),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct Config {
    pub log_level: String,
    pub database: DatabaseConfig,
    pub server: ServerConfig,
    pub feed: FeedConfig,
    pub generator: GeneratorConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            database: DatabaseConfig::default(),
            server: ServerConfig::default(),
            feed: FeedConfig::default(),
            generator: GeneratorConfig::default(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,
    /// Heure locale de la relève quotidienne des résultats, "HH:MM".
    pub schedule: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 5134,
            schedule: "21:40".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct FeedConfig {
    pub url: String,
    pub timeout_secs: u64,
    /// Heure de clôture d'un tirage, borne des fenêtres de tickets.
    pub draw_time: String,
    pub lenient: bool,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_FEED_URL.to_string(),
            timeout_secs: 10,
            draw_time: "21:30:00".to_string(),
            lenient: false,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct GeneratorConfig {
    pub strategy: Generator,
    /// Historique CSV à la place des tirages recopiés en base.
    pub history_csv: Option<PathBuf>,
}

impl Config {
    pub fn db_path(&self) -> PathBuf {
        self.database.path.clone().unwrap_or_else(db_path)
    }

    pub fn schedule_time(&self) -> Result<NaiveTime> {
        NaiveTime::parse_from_str(&self.server.schedule, "%H:%M")
            .with_context(|| format!("Heure de relève invalide : '{}'", self.server.schedule))
    }

    pub fn draw_time(&self) -> Result<NaiveTime> {
        NaiveTime::parse_from_str(&self.feed.draw_time, "%H:%M:%S")
            .with_context(|| format!("Heure de tirage invalide : '{}'", self.feed.draw_time))
    }

    pub fn eval_mode(&self) -> EvalMode {
        if self.feed.lenient {
            EvalMode::Lenient
        } else {
            EvalMode::Strict
        }
    }
}

/// Fichier absent => configuration par défaut.
pub fn load_config(path: &Path) -> Result<Config> {
    if !path.exists() {
        return Ok(Config::default());
    }
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Impossible de lire {:?}", path))?;
    parse_config(&content).with_context(|| format!("Configuration invalide dans {:?}", path))
}

pub fn parse_config(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content)?;
    config.schedule_time()?;
    config.draw_time()?;
    Ok(config)
}
