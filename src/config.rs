use rand::Rng;
use serde::de::Deserializer;
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::error::{Result, TalonError};
use crate::models::Target;
use crate::utils::write_atomic;

pub const CONFIG_FILE: &str = "talon_config.json";
pub const DASHBOARD_FILE: &str = "talon_dashboard.md";
pub const HEARTBEAT_FILE: &str = "talon_heartbeat.log";

pub const DEFAULT_INTERVAL_SECS: u64 = 60;
const UNKNOWN_SERVICE: &str = "Unknown";

/// Common homelab ports and the services that usually sit on them.
const COMMON_SERVICES: &[(u16, &str)] = &[
    (80, "HTTP"),
    (443, "HTTPS"),
    (22, "SSH"),
    (8096, "Jellyfin"),
    (8920, "Jellyfin (HTTPS)"),
    (32400, "Plex"),
    (8123, "Home Assistant"),
    (3000, "Homarr / Grafana"),
    (9000, "Portainer"),
    (8080, "Web Service / Traefik"),
    (2342, "DizqueTV"),
    (5000, "Synology / Flask"),
    (5055, "Overseerr"),
    (7878, "Radarr"),
    (8989, "Sonarr"),
    (8686, "Lidarr"),
    (9117, "Jackett"),
    (53, "DNS (Pi-hole/AdGuard)"),
];

pub fn well_known_name(port: u16) -> Option<&'static str> {
    COMMON_SERVICES
        .iter()
        .find(|(p, _)| *p == port)
        .map(|(_, name)| *name)
}

/// Six random decimal digits used to bind a chat to the bot.
pub fn generate_otp() -> String {
    let mut rng = rand::thread_rng();
    (0..6).map(|_| char::from(b'0' + rng.gen_range(0..10u8))).collect()
}

/// Immutable view of the configuration file, re-read every cycle.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct TalonConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub telegram_token: Option<String>,
    #[serde(default = "default_interval", deserialize_with = "deserialize_interval")]
    pub monitoring_interval: u64,
    #[serde(default)]
    pub watchlist: Watchlist,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chat_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pending_otp: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn default_interval() -> u64 { DEFAULT_INTERVAL_SECS }

impl Default for TalonConfig {
    fn default() -> Self {
        Self {
            telegram_token: None,
            monitoring_interval: DEFAULT_INTERVAL_SECS,
            watchlist: Watchlist::default(),
            chat_id: None,
            pending_otp: None,
            extra: Map::new(),
        }
    }
}

impl TalonConfig {
    pub fn interval_secs(&self) -> u64 {
        self.monitoring_interval.max(1)
    }

    pub fn token(&self) -> Option<&str> {
        self.telegram_token.as_deref().filter(|t| !t.is_empty())
    }
}

// Interactive setup historically stored the interval as a string. Anything
// unusable falls back to the default rather than failing the whole document.
fn deserialize_interval<'de, D>(deserializer: D) -> std::result::Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Interval {
        Whole(i64),
        Fraction(f64),
        Text(String),
        Other(Value),
    }

    let secs = match Option::<Interval>::deserialize(deserializer)? {
        None => return Ok(DEFAULT_INTERVAL_SECS),
        Some(Interval::Whole(secs)) => secs,
        Some(Interval::Fraction(secs)) => secs as i64,
        Some(Interval::Text(text)) => {
            let text = text.trim();
            match text.parse::<i64>() {
                Ok(secs) => secs,
                Err(_) => match text.parse::<f64>() {
                    Ok(secs) if secs.is_finite() => secs as i64,
                    _ => {
                        warn!("Invalid monitoring_interval {:?}, using {}s", text, DEFAULT_INTERVAL_SECS);
                        return Ok(DEFAULT_INTERVAL_SECS);
                    }
                },
            }
        }
        Some(Interval::Other(value)) => {
            warn!("Invalid monitoring_interval {}, using {}s", value, DEFAULT_INTERVAL_SECS);
            return Ok(DEFAULT_INTERVAL_SECS);
        }
    };
    Ok(secs.max(1) as u64)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchEntry {
    pub port: u16,
    pub enabled: bool,
    pub name: Option<String>,
}

impl WatchEntry {
    pub fn display_name(&self) -> String {
        self.name
            .clone()
            .or_else(|| well_known_name(self.port).map(str::to_string))
            .unwrap_or_else(|| UNKNOWN_SERVICE.to_string())
    }

    pub fn to_target(&self) -> Target {
        Target {
            port: self.port,
            display_name: self.display_name(),
            enabled: self.enabled,
        }
    }
}

/// Ordered `port -> enabled` mapping. Each value is either a bare flag or
/// `{ "enabled": bool, "name": "..." }`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Watchlist {
    entries: Vec<WatchEntry>,
}

impl Watchlist {
    pub fn entries(&self) -> &[WatchEntry] {
        &self.entries
    }

    pub fn targets(&self) -> Vec<Target> {
        self.entries.iter().map(WatchEntry::to_target).collect()
    }

    pub fn enabled_targets(&self) -> Vec<Target> {
        self.entries
            .iter()
            .filter(|e| e.enabled)
            .map(WatchEntry::to_target)
            .collect()
    }

    pub fn ports(&self) -> HashSet<u16> {
        self.entries.iter().map(|e| e.port).collect()
    }

    /// Adds the port or updates it in place, keeping its position.
    pub fn set(&mut self, port: u16, enabled: bool, name: Option<String>) {
        match self.entries.iter_mut().find(|e| e.port == port) {
            Some(entry) => {
                entry.enabled = enabled;
                if name.is_some() {
                    entry.name = name;
                }
            }
            None => self.entries.push(WatchEntry { port, enabled, name }),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum EntryRepr {
    Flag(bool),
    Detailed {
        #[serde(default = "enabled_by_default")]
        enabled: bool,
        #[serde(default)]
        name: Option<String>,
    },
}

fn enabled_by_default() -> bool { true }

impl<'de> Deserialize<'de> for Watchlist {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Map::<String, Value>::deserialize(deserializer)?;
        let mut watchlist = Watchlist::default();

        for (key, value) in raw {
            let port: u16 = match key.trim().parse() {
                Ok(port) => port,
                Err(_) => {
                    warn!("Skipping watchlist key {:?}: not a port number", key);
                    continue;
                }
            };
            match serde_json::from_value::<EntryRepr>(value) {
                Ok(EntryRepr::Flag(enabled)) => watchlist.set(port, enabled, None),
                Ok(EntryRepr::Detailed { enabled, name }) => watchlist.set(port, enabled, name),
                Err(e) => warn!("Skipping watchlist entry for port {}: {}", port, e),
            }
        }
        Ok(watchlist)
    }
}

impl Serialize for Watchlist {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for entry in &self.entries {
            let key = entry.port.to_string();
            match &entry.name {
                None => map.serialize_entry(&key, &entry.enabled)?,
                Some(name) => map.serialize_entry(
                    &key,
                    &serde_json::json!({ "enabled": entry.enabled, "name": name }),
                )?,
            }
        }
        map.end()
    }
}

/// File-backed store. Every read is a full snapshot, every write a whole-file rewrite.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<TalonConfig> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No config at {}, using defaults", self.path.display());
                return Ok(TalonConfig::default());
            }
            Err(source) => {
                return Err(TalonError::ConfigRead { path: self.path.clone(), source });
            }
        };

        if content.trim().is_empty() {
            return Ok(TalonConfig::default());
        }

        serde_json::from_str(&content).map_err(|source| TalonError::ConfigParse {
            path: self.path.clone(),
            source,
        })
    }

    pub fn save(&self, config: &TalonConfig) -> Result<()> {
        let body = serde_json::to_string_pretty(config)?;
        write_atomic(&self.path, body.as_bytes())
    }

    /// Load, apply `change`, and write back. Last writer wins.
    pub fn update<F>(&self, change: F) -> Result<TalonConfig>
    where
        F: FnOnce(&mut TalonConfig),
    {
        let mut config = self.load()?;
        change(&mut config);
        self.save(&config)?;
        Ok(config)
    }

    /// Replaces any pending code with a fresh one and returns it.
    pub fn set_otp(&self) -> Result<String> {
        let otp = generate_otp();
        let code = otp.clone();
        self.update(move |cfg| cfg.pending_otp = Some(code))?;
        Ok(otp)
    }

    /// Binds `chat_id` as the alert recipient if `code` matches the pending OTP.
    pub fn bind_recipient(&self, code: &str, chat_id: i64) -> Result<bool> {
        let mut config = self.load()?;
        let matches = config
            .pending_otp
            .as_deref()
            .is_some_and(|pending| !pending.is_empty() && pending == code.trim());
        if !matches {
            return Ok(false);
        }
        config.chat_id = Some(chat_id);
        config.pending_otp = None;
        self.save(&config)?;
        Ok(true)
    }

    pub fn set_enabled(&self, port: u16, enabled: bool, name: Option<String>) -> Result<TalonConfig> {
        self.update(|cfg| cfg.watchlist.set(port, enabled, name))
    }
}
