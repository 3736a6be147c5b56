use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::common::UserId;
use crate::protocol::PROTOCOL_VERSION;

pub const DEFAULT_CONFIG_PATH: &str = "config/client.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Base URL of the REST endpoints (`/validate`, `/chat/{id}`).
    pub server_url: String,
    pub ws_url: String,
    pub user_id: UserId,
    /// Sent verbatim as the `Cookie` header.
    pub session_cookie: Option<String>,
    pub supported_versions: Vec<u8>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server_url: "http://localhost:3000".to_string(),
            ws_url: "ws://localhost:3000/ws".to_string(),
            user_id: 0,
            session_cookie: None,
            supported_versions: vec![PROTOCOL_VERSION],
        }
    }
}

pub fn load_config(path: &str) -> AppConfig {
    let path = Path::new(path);
    match fs::read_to_string(path) {
        Ok(content) => match serde_json::from_str::<AppConfig>(&content) {
            Ok(config) => config,
            Err(err) => {
                log::warn!("Failed to parse config file {}: {err}", path.display());
                AppConfig::default()
            }
        },
        Err(err) => {
            log::info!(
                "Config file {} not found ({err}); using defaults",
                path.display()
            );
            AppConfig::default()
        }
    }
}

/// `CHAT_*` variables win over the file. `lookup` is `std::env::var` in
/// production.
pub fn apply_env_overrides(mut config: AppConfig, lookup: impl Fn(&str) -> Option<String>) -> AppConfig {
    if let Some(url) = lookup("CHAT_SERVER_URL") {
        config.server_url = url;
    }
    if let Some(url) = lookup("CHAT_WS_URL") {
        config.ws_url = url;
    }
    if let Some(raw) = lookup("CHAT_USER_ID") {
        match raw.parse() {
            Ok(user_id) => config.user_id = user_id,
            Err(err) => log::warn!("Ignoring CHAT_USER_ID `{raw}`: {err}"),
        }
    }
    if let Some(cookie) = lookup("CHAT_SESSION_COOKIE") {
        config.session_cookie = Some(cookie);
    }
    config
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope.json");
        assert_eq!(load_config(path.to_str().unwrap()), AppConfig::default());
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("client.json");
        fs::write(&path, r#"{ "user_id": 7, "ws_url": "ws://chat.local/ws" }"#).unwrap();

        let config = load_config(path.to_str().unwrap());
        assert_eq!(config.user_id, 7);
        assert_eq!(config.ws_url, "ws://chat.local/ws");
        assert_eq!(config.server_url, AppConfig::default().server_url);
        assert_eq!(config.supported_versions, vec![PROTOCOL_VERSION]);
    }

    #[test]
    fn broken_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("client.json");
        fs::write(&path, "{ not json").unwrap();
        assert_eq!(load_config(path.to_str().unwrap()), AppConfig::default());
    }

    #[test]
    fn env_overrides_file_values() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("CHAT_USER_ID", "12"),
            ("CHAT_SESSION_COOKIE", "sid=xyz"),
            ("CHAT_SERVER_URL", "https://chat.example"),
        ]);
        let config = apply_env_overrides(AppConfig::default(), |key| {
            env.get(key).map(|value| value.to_string())
        });

        assert_eq!(config.user_id, 12);
        assert_eq!(config.session_cookie.as_deref(), Some("sid=xyz"));
        assert_eq!(config.server_url, "https://chat.example");
        assert_eq!(config.ws_url, AppConfig::default().ws_url);
    }

    #[test]
    fn bad_user_id_is_ignored() {
        let config = apply_env_overrides(AppConfig::default(), |key| {
            (key == "CHAT_USER_ID").then(|| "seven".to_string())
        });
        assert_eq!(config.user_id, 0);
    }
}
