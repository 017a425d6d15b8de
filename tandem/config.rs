use crate::error::App;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tokio::fs;

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Base URL of the static file server that lists and serves the folders.
    pub server: String,
    /// Folder names are resolved under this prefix, e.g. `Songs/<name>`.
    pub library_root: String,
    pub extension: String,
    pub fade_delay_ms: u64,
    pub relay: Relay,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct Relay {
    pub enabled: bool,
    pub url: String,
    pub listen_together: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: "http://localhost:8080".to_string(),
            library_root: "Songs".to_string(),
            extension: ".mp3".to_string(),
            fade_delay_ms: 400,
            relay: Relay::default(),
        }
    }
}

impl Default for Relay {
    fn default() -> Self {
        Self {
            enabled: true,
            url: "ws://localhost:3000".to_string(),
            listen_together: false,
        }
    }
}

impl Config {
    /// Reads the config file, writing the defaults out first if it does not exist yet.
    pub async fn load_or_create(file_path: &str) -> Result<Self, App> {
        if !Path::new(file_path).exists() {
            log::info!("Writing default config to {file_path}");
            let config = Config::default();
            fs::write(file_path, toml::to_string(&config)?).await?;
            return Ok(config);
        }
        let content = fs::read_to_string(file_path).await?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self, App> {
        Ok(toml::from_str(content)?)
    }

    pub fn fade_delay(&self) -> Duration {
        Duration::from_millis(self.fade_delay_ms)
    }

    /// Maps a folder card name onto the path requested from the file server.
    pub fn folder_path(&self, folder: &str) -> String {
        let folder = folder.trim_matches('/');
        if self.library_root.is_empty() {
            folder.to_string()
        } else {
            format!("{}/{folder}", self.library_root.trim_matches('/'))
        }
    }
}

pub fn config_dir() -> Result<String, App> {
    let home_dir = std::env::var("HOME")
        .map_err(|e| App::Io(format!("Failed to get HOME environment variable: {e}")))?;
    Ok(format!("{home_dir}/.config/tandem"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        assert_eq!(Config::parse("").unwrap(), Config::default());
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let config = Config::parse(
            r#"
            server = "http://music.local:9000"
            [relay]
            listen_together = true
            "#,
        )
        .unwrap();
        assert_eq!(config.server, "http://music.local:9000");
        assert_eq!(config.extension, ".mp3");
        assert!(config.relay.enabled);
        assert!(config.relay.listen_together);
        assert_eq!(config.relay.url, "ws://localhost:3000");
    }

    #[test]
    fn folder_path_joins_library_root() {
        let mut config = Config::default();
        assert_eq!(config.folder_path("chill"), "Songs/chill");
        assert_eq!(config.folder_path("/chill/"), "Songs/chill");
        config.library_root = String::new();
        assert_eq!(config.folder_path("chill"), "chill");
    }

    #[test]
    fn bad_toml_is_reported() {
        assert!(matches!(
            Config::parse("server = ["),
            Err(App::TomlParsing(_))
        ));
    }
}
