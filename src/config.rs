use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Application configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub directory: DirectoryConfig,
    pub host: HostConfig,
    /// Idle limit in seconds for session reads. `None` keeps the protocol's
    /// block-forever contract.
    pub idle_timeout_secs: Option<u64>,
}

/// Directory-server-specific configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectoryConfig {
    pub bind_addr: String,
}

/// Host-process-specific configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostConfig {
    /// Root directory served by the transfer responder
    pub share_dir: String,
    /// File whose lines (`name, description`) become advertisements
    pub file_list: String,
    /// Hostname other peers use to reach this host's responder
    pub advertised_host: String,
    /// Responder listen port; 0 picks an ephemeral port
    pub transfer_port: u16,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            directory: DirectoryConfig {
                bind_addr: "127.0.0.1:8636".to_string(),
            },
            host: HostConfig {
                share_dir: ".".to_string(),
                file_list: "filelist.txt".to_string(),
                advertised_host: "127.0.0.1".to_string(),
                transfer_port: 0,
            },
            idle_timeout_secs: None,
        }
    }
}

impl AppConfig {
    /// Load configuration from file or create default
    pub fn load_or_default(config_path: Option<&str>) -> Self {
        if let Some(config) = config_path
            .and_then(|path| std::fs::read_to_string(path).ok())
            .and_then(|content| serde_json::from_str(&content).ok())
        {
            return config;
        }
        Self::default()
    }

    /// Save configuration to file
    pub fn save_to_file(&self, config_path: &str) -> Result<(), Box<dyn std::error::Error>> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(config_path, content)?;
        Ok(())
    }

    /// Get the responder's serve directory as PathBuf
    pub fn share_dir_path(&self) -> PathBuf {
        PathBuf::from(&self.host.share_dir)
    }

    /// Idle limit as a `Duration`, if one is configured
    pub fn idle_timeout(&self) -> Option<Duration> {
        self.idle_timeout_secs.map(Duration::from_secs)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), Box<dyn std::error::Error>> {
        if !self.directory.bind_addr.contains(':') {
            return Err("Directory bind address must be host:port".into());
        }

        if self.host.share_dir.is_empty() {
            return Err("Share directory must not be empty".into());
        }

        if self.host.file_list.is_empty() {
            return Err("File list path must not be empty".into());
        }

        if self.host.advertised_host.is_empty() {
            return Err("Advertised host must not be empty".into());
        }

        if self.idle_timeout_secs == Some(0) {
            return Err("Idle timeout must be at least one second when set".into());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        config.validate().expect("Default config should be valid");
        assert_eq!(config.directory.bind_addr, "127.0.0.1:8636");
        assert!(config.idle_timeout().is_none());
    }

    #[test]
    fn test_config_serialization() {
        let config = AppConfig::default();
        let json = serde_json::to_string(&config).expect("Should serialize");
        let deserialized: AppConfig = serde_json::from_str(&json).expect("Should deserialize");
        assert_eq!(deserialized.host.file_list, config.host.file_list);
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().expect("Should create temp dir");
        let path = dir.path().join("config.json");
        let path_str = path.to_str().expect("Path should be valid UTF-8");

        let mut config = AppConfig::default();
        config.host.share_dir = "/srv/shared".to_string();
        config.idle_timeout_secs = Some(30);
        config.save_to_file(path_str).expect("Should save");

        let reloaded = AppConfig::load_or_default(Some(path_str));
        assert_eq!(reloaded.host.share_dir, "/srv/shared");
        assert_eq!(reloaded.idle_timeout(), Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_missing_config_falls_back_to_default() {
        let config = AppConfig::load_or_default(Some("/nonexistent/peerdex.json"));
        assert_eq!(config.directory.bind_addr, "127.0.0.1:8636");
    }

    #[test]
    fn test_zero_idle_timeout_rejected() {
        let mut config = AppConfig::default();
        config.idle_timeout_secs = Some(0);
        assert!(config.validate().is_err());
    }
}
