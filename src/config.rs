use std::{ops::Not, path::PathBuf};

use eframe::egui;
use serde::{Deserialize, Serialize};

use crate::{
    error::{Result, TimerError},
    vibration::Waveform,
};

const APP_NAME: &str = "roosty_timer";

#[derive(Debug, Serialize, Deserialize, Default, Clone, Copy, PartialEq, Eq)]
pub enum Theme {
    #[default]
    Dark,
    Light,
}

impl Not for Theme {
    type Output = Self;

    fn not(self) -> Self::Output {
        match self {
            Self::Dark => Self::Light,
            Self::Light => Self::Dark,
        }
    }
}

impl From<Theme> for egui::Visuals {
    fn from(theme: Theme) -> Self {
        match theme {
            Theme::Dark => Self::dark(),
            Theme::Light => Self::light(),
        }
    }
}

/// a one tap duration shown in the presets grid
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Preset {
    pub label: String,
    pub seconds: u64,
}

impl Preset {
    #[must_use]
    pub fn new(label: &str, seconds: u64) -> Self {
        Self {
            label: label.to_string(),
            seconds,
        }
    }

    #[must_use]
    pub fn catalog() -> Vec<Self> {
        vec![
            Self::new("4s", 4),
            Self::new("5m", 300),
            Self::new("10m", 600),
            Self::new("15m", 900),
            Self::new("21m", 1260),
            Self::new("30m", 1800),
            Self::new("45m", 2700),
            Self::new("1h", 3600),
            Self::new("90m", 5400),
        ]
    }
}

#[inline]
#[must_use]
pub const fn always_true() -> bool {
    true
}

#[inline]
#[must_use]
pub const fn full_volume() -> f32 {
    100.0
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub theme: Theme,
    #[serde(default = "Preset::catalog")]
    pub presets: Vec<Preset>,
    /// ringtone file, a generated beep is used when unset
    #[serde(default)]
    pub sound: Option<PathBuf>,
    #[serde(default = "full_volume")]
    pub volume: f32,
    #[serde(default)]
    pub vibration: Waveform,
    #[serde(default = "always_true")]
    pub notifications: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            theme: Theme::Dark,
            presets: Preset::catalog(),
            sound: None,
            volume: full_volume(),
            vibration: Waveform::default(),
            notifications: true,
        }
    }
}

impl Config {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(path: PathBuf) -> Result<Self> {
        let config = std::fs::read_to_string(&path)?;
        toml::from_str(&config).map_err(|source| TimerError::Parse { path, source })
    }

    /// like [`Config::load`] but a missing file gives the defaults
    pub fn load_or_default(path: PathBuf) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            log::info!("no config at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    pub fn save(&self, path: PathBuf) -> Result<()> {
        let config = toml::to_string(self)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, config)?;
        Ok(())
    }

    fn project_dirs() -> Result<directories::ProjectDirs> {
        directories::ProjectDirs::from("", "", APP_NAME).ok_or(TimerError::NoProjectDirs(APP_NAME))
    }

    pub fn config_path() -> Result<PathBuf> {
        let mut path = Self::project_dirs()?.config_dir().to_path_buf();
        path.push("config.toml");
        Ok(path)
    }

    pub fn prefs_path() -> Result<PathBuf> {
        let mut path = Self::project_dirs()?.data_dir().to_path_buf();
        path.push("prefs.toml");
        Ok(path)
    }

    pub fn is_config_present() -> Result<bool> {
        Ok(Self::config_path()?.exists())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.presets.len(), 9);
        assert_eq!(config.presets[1], Preset::new("5m", 300));
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config").join("config.toml");
        let mut config = Config::new();
        config.theme = !config.theme;
        config.sound = Some(PathBuf::from("/tmp/rooster.mp3"));
        config.presets = vec![Preset::new("2m", 120)];
        config.save(path.clone()).unwrap();

        assert_eq!(Config::load(path).unwrap(), config);
    }

    #[test]
    fn missing_file_falls_back() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = Config::load_or_default(dir.path().join("nope.toml")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn bad_file_is_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "volume = \"loud\"").unwrap();
        assert!(matches!(
            Config::load(path),
            Err(TimerError::Parse { .. })
        ));
    }
}
