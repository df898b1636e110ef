//! Settings management for Reality Glitcher
//!
//! Application settings are stored as XML in the user's config directory
//! (`<config>/RealityGlitcher/settings.xml`). Missing or unreadable
//! settings fall back to defaults.

use std::fs;
use std::path::{Path, PathBuf};

use quick_xml::de::from_str;
use quick_xml::se::to_string;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::effects::builtin::{EffectOptions, SortOrientation};
use crate::gestures::GestureConfig;
use crate::network::VirtualCameraConfig;
use crate::telemetry::LogConfig;

/// Directory name under the platform config dir
const CONFIG_DIR_NAME: &str = "RealityGlitcher";

/// Settings-related errors
#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("XML parse error: {0}")]
    XmlParse(#[from] quick_xml::DeError),
    #[error("XML write error: {0}")]
    XmlWrite(#[from] quick_xml::SeError),
    #[error("could not find config directory")]
    NoConfigDir,
}

/// Application settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename = "RealityGlitcherSettings", default)]
pub struct AppSettings {
    /// Address the HTTP/WebSocket server binds to
    pub host: String,
    /// Port the HTTP/WebSocket server listens on
    pub port: u16,
    /// Gesture mapping document (default: next to the settings file)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mapping_path: Option<PathBuf>,
    /// Frames processed concurrently across all connections
    pub worker_threads: usize,
    /// Input frames retained for temporal effects
    pub history_capacity: usize,
    /// Effect strength in `[0, 1]`
    pub effect_intensity: f32,
    /// Direction of the pixel sort effect
    pub pixel_sort_orientation: SortOrientation,
    /// Attach the composited frame to every gesture event
    pub broadcast_frames: bool,
    /// JPEG quality of broadcast frames (1-100)
    pub jpeg_quality: u8,
    /// Gesture detection thresholds
    pub gestures: GestureConfig,
    /// Virtual camera output
    pub virtual_camera: VirtualCameraConfig,
    /// Logging
    pub logging: LogConfig,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            mapping_path: None,
            worker_threads: 4,
            history_capacity: 2,
            effect_intensity: 0.5,
            pixel_sort_orientation: SortOrientation::Horizontal,
            broadcast_frames: false,
            jpeg_quality: 80,
            gestures: GestureConfig::default(),
            virtual_camera: VirtualCameraConfig::default(),
            logging: LogConfig::default(),
        }
    }
}

impl AppSettings {
    /// Clamp numeric fields into their valid ranges
    pub fn sanitize(&mut self) {
        self.worker_threads = self.worker_threads.max(1);
        self.history_capacity = self.history_capacity.max(1);
        self.jpeg_quality = self.jpeg_quality.clamp(1, 100);
        if !self.effect_intensity.is_finite() {
            self.effect_intensity = 0.5;
        }
        self.effect_intensity = self.effect_intensity.clamp(0.0, 1.0);
    }

    /// Construction options for the built-in effects
    pub fn effect_options(&self) -> EffectOptions {
        EffectOptions {
            intensity: self.effect_intensity,
            pixel_sort_orientation: self.pixel_sort_orientation,
        }
    }

    /// Default settings file path
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|mut p| {
            p.push(CONFIG_DIR_NAME);
            p.push("settings.xml");
            p
        })
    }

    /// Resolved gesture mapping path
    pub fn mapping_path(&self) -> PathBuf {
        if let Some(path) = &self.mapping_path {
            return path.clone();
        }
        dirs::config_dir()
            .map(|mut p| {
                p.push(CONFIG_DIR_NAME);
                p.push("gesture_mappings.json");
                p
            })
            .unwrap_or_else(|| PathBuf::from("gesture_mappings.json"))
    }

    /// Load settings from an XML file
    pub fn load_from_file(path: &Path) -> Result<Self, SettingsError> {
        let contents = fs::read_to_string(path)?;
        let mut settings: Self = from_str(&contents)?;
        settings.sanitize();
        Ok(settings)
    }

    /// Save settings to an XML file, creating parent directories
    pub fn save_to_file(&self, path: &Path) -> Result<(), SettingsError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let xml = to_string(self)?;
        let formatted = format!("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n{}", xml);
        fs::write(path, formatted)?;
        Ok(())
    }

    /// Load settings from `path`, or the default location when `None`
    ///
    /// Falls back to defaults when the file is missing or unreadable.
    pub fn load(path: Option<&Path>) -> Self {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => match Self::default_path() {
                Some(p) => p,
                None => return Self::default(),
            },
        };

        if !path.exists() {
            tracing::debug!(path = %path.display(), "No settings file, using defaults");
            return Self::default();
        }

        match Self::load_from_file(&path) {
            Ok(settings) => {
                tracing::debug!(path = %path.display(), "Loaded settings");
                settings
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Failed to load settings, using defaults");
                Self::default()
            }
        }
    }

    /// Save settings to the default location
    pub fn save(&self) -> Result<(), SettingsError> {
        let path = Self::default_path().ok_or(SettingsError::NoConfigDir)?;
        self.save_to_file(&path)
    }
}
