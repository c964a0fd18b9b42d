//! Configuration management (config.toml)
//!
//! Settings are stored in TOML format in the platform-specific config
//! directory. An explicit file passed on the command line replaces the lookup.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use blockbridge_core::wasm::DEFAULT_MEMORY_LIMIT;

/// Player configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct PlayerConfig {
    /// Host audio layout
    #[serde(default)]
    pub audio: AudioConfig,
    /// Engine module limits
    #[serde(default)]
    pub engine: EngineConfig,
}

/// Host audio configuration.
///
/// The channel counts are fixed for the lifetime of a stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioConfig {
    /// Output sample rate in Hz (default: 44100)
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,
    /// Host output channels (default: 2)
    #[serde(default = "default_output_channels")]
    pub output_channels: usize,
    /// Host input channels, used only with `enable_input` (default: 1)
    #[serde(default = "default_input_channels")]
    pub input_channels: usize,
    /// Frames per host callback (default: 512)
    #[serde(default = "default_buffer_frames")]
    pub buffer_frames: usize,
    /// Open the default input device and feed it to the engine (default: false)
    #[serde(default)]
    pub enable_input: bool,
}

/// Engine module configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Cap on the module's linear memory in bytes (default: 64MB)
    #[serde(default = "default_memory_limit")]
    pub memory_limit_bytes: usize,
}

fn default_sample_rate() -> u32 {
    44_100
}
fn default_output_channels() -> usize {
    2
}
fn default_input_channels() -> usize {
    1
}
fn default_buffer_frames() -> usize {
    512
}
fn default_memory_limit() -> usize {
    DEFAULT_MEMORY_LIMIT
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: default_sample_rate(),
            output_channels: default_output_channels(),
            input_channels: default_input_channels(),
            buffer_frames: default_buffer_frames(),
            enable_input: false,
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            memory_limit_bytes: default_memory_limit(),
        }
    }
}

impl AudioConfig {
    /// Host input channel count the bridge should be built with
    pub fn host_input_channels(&self) -> usize {
        if self.enable_input {
            self.input_channels
        } else {
            0
        }
    }
}

/// Returns the platform-specific configuration directory.
///
/// On Windows: `%APPDATA%\Blockbridge\config`
/// On macOS: `~/Library/Application Support/io.blockbridge.Blockbridge`
/// On Linux: `~/.config/Blockbridge`
///
/// Returns `None` if the home directory cannot be determined.
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("io.blockbridge", "", "Blockbridge")
        .map(|dirs| dirs.config_dir().to_path_buf())
}

/// Loads the configuration.
///
/// With `explicit`, that file must exist and parse. Otherwise `config.toml`
/// is read from the platform's configuration directory, and defaults are
/// returned if it doesn't exist or cannot be parsed.
pub fn load(explicit: Option<&Path>) -> Result<PlayerConfig> {
    match explicit {
        Some(path) => load_from(path),
        None => Ok(config_dir()
            .and_then(|dir| std::fs::read_to_string(dir.join("config.toml")).ok())
            .and_then(|content| toml::from_str(&content).ok())
            .unwrap_or_default()),
    }
}

/// Loads the configuration from `path`.
///
/// # Errors
///
/// Returns an error if the file cannot be read or is not valid config TOML.
pub fn load_from(path: &Path) -> Result<PlayerConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file {}", path.display()))
}

/// Saves the configuration to disk.
///
/// Writes `config.toml` to the platform's configuration directory.
/// Creates the directory if it doesn't exist.
///
/// # Errors
///
/// Returns an error if the directory cannot be created or the file
/// cannot be written.
pub fn save(config: &PlayerConfig) -> std::io::Result<()> {
    if let Some(dir) = config_dir() {
        save_to(config, &dir.join("config.toml"))?;
    }
    Ok(())
}

/// Saves the configuration to `path`, creating parent directories.
pub fn save_to(config: &PlayerConfig, path: &Path) -> std::io::Result<()> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)?;
    }
    let content = toml::to_string_pretty(config).map_err(std::io::Error::other)?;
    std::fs::write(path, content)
}

#[cfg(test)]
mod tests {
    use super::*;

    // =============================================================
    // Default value tests
    // =============================================================

    #[test]
    fn test_config_default() {
        let config = PlayerConfig::default();
        assert_eq!(config.audio.sample_rate, 44_100);
        assert_eq!(config.audio.output_channels, 2);
        assert_eq!(config.audio.input_channels, 1);
        assert_eq!(config.audio.buffer_frames, 512);
        assert!(!config.audio.enable_input);
        assert_eq!(config.engine.memory_limit_bytes, 64 * 1024 * 1024);
    }

    #[test]
    fn test_host_input_channels_follow_enable_input() {
        let mut audio = AudioConfig::default();
        assert_eq!(audio.host_input_channels(), 0);
        audio.enable_input = true;
        assert_eq!(audio.host_input_channels(), 1);
    }

    // =============================================================
    // TOML serialization tests
    // =============================================================

    #[test]
    fn test_config_deserialize_empty() {
        let config: PlayerConfig = toml::from_str("").unwrap();
        assert_eq!(config, PlayerConfig::default());
    }

    #[test]
    fn test_config_deserialize_partial_audio() {
        let toml_str = r#"
[audio]
output_channels = 1
enable_input = true
"#;
        let config: PlayerConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.audio.output_channels, 1);
        assert!(config.audio.enable_input);
        assert_eq!(config.audio.sample_rate, 44_100); // default
        assert_eq!(config.engine, EngineConfig::default());
    }

    #[test]
    fn test_engine_config_serialize() {
        let engine = EngineConfig {
            memory_limit_bytes: 1048576,
        };
        let toml_str = toml::to_string(&engine).unwrap();
        assert!(toml_str.contains("memory_limit_bytes = 1048576"));
    }

    // =============================================================
    // File tests
    // =============================================================

    #[test]
    fn test_save_then_load_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = PlayerConfig::default();
        config.audio.sample_rate = 48_000;
        config.audio.buffer_frames = 128;
        save_to(&config, &path).unwrap();

        let loaded = load(Some(&path)).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_explicit_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.toml");
        let err = load(Some(&path)).unwrap_err();
        assert!(err.to_string().contains("missing.toml"));
    }

    #[test]
    fn test_explicit_invalid_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[audio]\nsample_rate = \"fast\"\n").unwrap();
        assert!(load(Some(&path)).is_err());
    }

    #[test]
    fn test_load_without_explicit_file_never_fails() {
        // Defaults or whatever is in the user's real config file
        let config = load(None).unwrap();
        assert!(config.audio.sample_rate > 0);
    }
}
