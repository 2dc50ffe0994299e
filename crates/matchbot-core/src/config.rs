use std::{
    env, fs,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::{errors::Error, Result};

/// Typed runtime configuration.
#[derive(Clone, Debug)]
pub struct Config {
    /// The bot's own display name. Join events for this name are ignored.
    pub nick: String,

    // Persistence
    pub data_file: PathBuf,
    pub backup_file: PathBuf,

    // Channels handed to the transport at startup. The core never joins
    // channels itself; it only needs the names for origin bookkeeping.
    pub private_channel: String,
    pub channel_key: Option<String>,
    pub public_channel: String,

    /// Settle delay before a join announcement is sent.
    pub join_delay: Duration,

    // Audit
    pub audit_log_path: Option<PathBuf>,
    pub audit_log_json: bool,
}

impl Config {
    pub fn load() -> Result<Self> {
        load_dotenv_if_present(Path::new(".env"));

        let nick = env_str("MATCHBOT_NICK").and_then(non_empty).ok_or_else(|| {
            Error::Config("MATCHBOT_NICK environment variable is required".to_string())
        })?;

        let data_file =
            env_path("MATCHBOT_DATA_FILE").unwrap_or_else(|| PathBuf::from("matchbotdata.ini"));
        let backup_file =
            env_path("MATCHBOT_BACKUP_FILE").unwrap_or_else(|| default_backup_path(&data_file));

        let private_channel =
            env_str("MATCHBOT_PRIVATE_CHANNEL").unwrap_or_else(|| "#matchbot".to_string());
        let channel_key = env_str("MATCHBOT_CHANNEL_KEY").and_then(non_empty);
        let public_channel =
            env_str("MATCHBOT_PUBLIC_CHANNEL").unwrap_or_else(|| "#matchbot-pub".to_string());

        let join_delay = Duration::from_millis(env_u64("MATCHBOT_JOIN_DELAY_MS").unwrap_or(500));

        let audit_log_path = env_path("MATCHBOT_AUDIT_LOG");
        let audit_log_json = env_bool("MATCHBOT_AUDIT_JSON").unwrap_or(false);

        Ok(Self {
            nick,
            data_file,
            backup_file,
            private_channel,
            channel_key,
            public_channel,
            join_delay,
            audit_log_path,
            audit_log_json,
        })
    }
}

/// `matchbotdata.ini` -> `matchbotdata-old.ini`.
fn default_backup_path(data_file: &Path) -> PathBuf {
    let stem = data_file
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("matchbotdata");
    match data_file.extension().and_then(|s| s.to_str()) {
        Some(ext) => data_file.with_file_name(format!("{stem}-old.{ext}")),
        None => data_file.with_file_name(format!("{stem}-old")),
    }
}

fn load_dotenv_if_present(path: &Path) {
    let Ok(contents) = fs::read_to_string(path) else {
        return;
    };

    for raw in contents.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some((k, v)) = line.split_once('=') else {
            continue;
        };

        let key = k.trim();
        if key.is_empty() {
            continue;
        }
        if env::var_os(key).is_some() {
            continue; // do not override existing env
        }

        let mut val = v.trim().to_string();
        // Strip optional surrounding quotes.
        if val.len() >= 2
            && ((val.starts_with('"') && val.ends_with('"'))
                || (val.starts_with('\'') && val.ends_with('\'')))
        {
            val = val[1..val.len() - 1].to_string();
        }

        env::set_var(key, val);
    }
}

fn env_str(key: &str) -> Option<String> {
    env::var(key).ok()
}

fn env_bool(key: &str) -> Option<bool> {
    env_str(key).map(|s| {
        matches!(
            s.trim().to_lowercase().as_str(),
            "1" | "true" | "yes" | "on"
        )
    })
}

fn env_u64(key: &str) -> Option<u64> {
    env_str(key).and_then(|s| s.trim().parse::<u64>().ok())
}

fn env_path(key: &str) -> Option<PathBuf> {
    env::var_os(key).map(PathBuf::from)
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}
