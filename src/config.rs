//! Configuration management for aquacapture
//!
//! Provides loading, saving and validation of the readiness thresholds,
//! arming timings, marker-detection service settings and motion sampling
//! rate.

use crate::errors::CaptureError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment prefix for layered overrides, e.g.
/// `AQUACAPTURE_ALIGNMENT__START_THRESHOLD=0.6`
pub const ENV_PREFIX: &str = "AQUACAPTURE";

/// Root configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReadinessConfig {
    pub alignment: AlignmentConfig,
    pub arming: ArmingConfig,
    pub fiducial: FiducialConfig,
    pub motion: MotionConfig,
}

/// Alignment scoring thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlignmentConfig {
    /// Minimum smoothed score required to start arming (0.0-1.0)
    pub start_threshold: f32,
    /// Lower hysteresis band; only consulted when `use_cancel_hysteresis` is set
    pub cancel_threshold: f32,
    /// Frame-to-frame accelerometer delta that maps to the full jitter penalty
    pub max_accel_delta: f32,
    /// Cancel an arm cycle on `cancel_threshold` instead of `start_threshold`
    pub use_cancel_hysteresis: bool,
}

/// Arm/fire timing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArmingConfig {
    /// Initial value of the user-facing auto-capture toggle
    pub auto_capture_enabled: bool,
    /// Conditions must hold this long before a capture fires
    pub arming_duration_ms: u64,
    /// Countdown refresh period
    pub countdown_tick_ms: u64,
    /// Corner markers required to arm
    pub min_fiducials: u8,
}

/// Remote marker-detection service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FiducialConfig {
    /// Poll period while the camera is open
    pub poll_ms: u64,
    /// Upper bound for one still grab + detection round trip
    pub request_timeout_ms: u64,
    pub service_url: String,
    pub validate_path: String,
    pub health_path: String,
    /// Longest side of uploaded stills, larger stills are downscaled
    pub max_upload_dim: u32,
    /// JPEG quality for re-encoded stills (1-100)
    pub jpeg_quality: u8,
}

/// Motion sensor sampling
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MotionConfig {
    pub sample_period_ms: u64,
}

impl Default for AlignmentConfig {
    fn default() -> Self {
        Self {
            start_threshold: 0.55,
            cancel_threshold: 0.35,
            max_accel_delta: 0.35,
            use_cancel_hysteresis: false,
        }
    }
}

impl Default for ArmingConfig {
    fn default() -> Self {
        Self {
            auto_capture_enabled: true,
            arming_duration_ms: 1200,
            countdown_tick_ms: 120,
            min_fiducials: 4,
        }
    }
}

impl Default for FiducialConfig {
    fn default() -> Self {
        Self {
            poll_ms: 450,
            request_timeout_ms: 3000,
            service_url: "http://127.0.0.1:8000".to_string(),
            validate_path: "/fiducial/validate".to_string(),
            health_path: "/health".to_string(),
            max_upload_dim: 640,
            jpeg_quality: 70,
        }
    }
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            sample_period_ms: 150,
        }
    }
}

impl ArmingConfig {
    pub fn arming_duration(&self) -> Duration {
        Duration::from_millis(self.arming_duration_ms)
    }

    pub fn countdown_tick(&self) -> Duration {
        Duration::from_millis(self.countdown_tick_ms)
    }
}

impl FiducialConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

impl MotionConfig {
    pub fn sample_period(&self) -> Duration {
        Duration::from_millis(self.sample_period_ms)
    }
}

impl ReadinessConfig {
    /// Load configuration from TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, CaptureError> {
        let path = path.as_ref();

        if !path.exists() {
            log::info!("Config file not found at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path).map_err(|e| {
            CaptureError::ConfigError(format!("Failed to read config file: {}", e))
        })?;

        let config: ReadinessConfig = toml::from_str(&contents).map_err(|e| {
            CaptureError::ConfigError(format!("Failed to parse config file: {}", e))
        })?;

        log::info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Load defaults, then the optional file, then `AQUACAPTURE_*` environment
    /// overrides (`__` separates section and key).
    pub fn load_layered<P: AsRef<Path>>(path: P) -> Result<Self, CaptureError> {
        let path = path.as_ref();
        let defaults = config::Config::try_from(&Self::default())
            .map_err(|e| CaptureError::ConfigError(format!("Failed to seed defaults: {}", e)))?;

        let layered = config::Config::builder()
            .add_source(defaults)
            .add_source(
                config::File::from(path)
                    .format(config::FileFormat::Toml)
                    .required(false),
            )
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| CaptureError::ConfigError(format!("Failed to layer config: {}", e)))?;

        let config: ReadinessConfig = layered
            .try_deserialize()
            .map_err(|e| CaptureError::ConfigError(format!("Invalid layered config: {}", e)))?;

        config.validate().map_err(CaptureError::ConfigError)?;
        log::debug!("Layered configuration resolved from {:?} and environment", path);
        Ok(config)
    }

    /// Save configuration to TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), CaptureError> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                CaptureError::ConfigError(format!("Failed to create config directory: {}", e))
            })?;
        }

        let toml_string = toml::to_string_pretty(self).map_err(|e| {
            CaptureError::ConfigError(format!("Failed to serialize config: {}", e))
        })?;

        fs::write(path, toml_string).map_err(|e| {
            CaptureError::ConfigError(format!("Failed to write config file: {}", e))
        })?;

        log::info!("Saved configuration to {:?}", path);
        Ok(())
    }

    /// Get default config file path
    pub fn default_path() -> PathBuf {
        PathBuf::from("aquacapture.toml")
    }

    /// Load from default location or fall back to defaults
    pub fn load_or_default() -> Self {
        Self::load_from_file(Self::default_path()).unwrap_or_else(|e| {
            log::warn!("Failed to load config, using defaults: {}", e);
            Self::default()
        })
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), String> {
        let a = &self.alignment;
        if !(0.0..=1.0).contains(&a.start_threshold) {
            return Err("Start threshold must be between 0.0 and 1.0".to_string());
        }
        if !(0.0..=1.0).contains(&a.cancel_threshold) {
            return Err("Cancel threshold must be between 0.0 and 1.0".to_string());
        }
        if a.cancel_threshold > a.start_threshold {
            return Err("Cancel threshold must not exceed start threshold".to_string());
        }
        if !(a.max_accel_delta > 0.0 && a.max_accel_delta.is_finite()) {
            return Err("Max accel delta must be a positive number".to_string());
        }

        let arm = &self.arming;
        if arm.arming_duration_ms == 0 {
            return Err("Arming duration must be non-zero".to_string());
        }
        if arm.countdown_tick_ms == 0 || arm.countdown_tick_ms > arm.arming_duration_ms {
            return Err("Countdown tick must be between 1 ms and the arming duration".to_string());
        }
        if arm.min_fiducials == 0 || arm.min_fiducials > crate::types::MAX_FIDUCIALS {
            return Err("Min fiducials must be between 1 and 4".to_string());
        }

        let fid = &self.fiducial;
        if fid.poll_ms == 0 {
            return Err("Fiducial poll period must be non-zero".to_string());
        }
        if fid.request_timeout_ms == 0 {
            return Err("Fiducial request timeout must be non-zero".to_string());
        }
        if fid.service_url.trim().is_empty() {
            return Err("Fiducial service URL must not be empty".to_string());
        }
        if fid.max_upload_dim == 0 {
            return Err("Max upload dimension must be non-zero".to_string());
        }
        if fid.jpeg_quality == 0 || fid.jpeg_quality > 100 {
            return Err("JPEG quality must be between 1 and 100".to_string());
        }

        if self.motion.sample_period_ms == 0 {
            return Err("Motion sample period must be non-zero".to_string());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ReadinessConfig::default();
        assert_eq!(config.alignment.start_threshold, 0.55);
        assert_eq!(config.alignment.cancel_threshold, 0.35);
        assert_eq!(config.arming.arming_duration_ms, 1200);
        assert_eq!(config.arming.countdown_tick_ms, 120);
        assert_eq!(config.arming.min_fiducials, 4);
        assert_eq!(config.fiducial.poll_ms, 450);
        assert_eq!(config.motion.sample_period_ms, 150);
        assert!(!config.alignment.use_cancel_hysteresis);
    }

    #[test]
    fn test_config_validation() {
        let config = ReadinessConfig::default();
        assert!(config.validate().is_ok());

        let mut bad = config.clone();
        bad.alignment.start_threshold = 1.5;
        assert!(bad.validate().is_err());

        let mut inverted = ReadinessConfig::default();
        inverted.alignment.cancel_threshold = 0.8;
        assert!(inverted.validate().is_err());

        let mut no_markers = ReadinessConfig::default();
        no_markers.arming.min_fiducials = 0;
        assert!(no_markers.validate().is_err());

        let mut slow_tick = ReadinessConfig::default();
        slow_tick.arming.countdown_tick_ms = 5000;
        assert!(slow_tick.validate().is_err());
    }

    #[test]
    fn test_config_toml_format() {
        let config = ReadinessConfig::default();
        let toml_string = toml::to_string_pretty(&config).unwrap();

        assert!(toml_string.contains("[alignment]"));
        assert!(toml_string.contains("[arming]"));
        assert!(toml_string.contains("[fiducial]"));
        assert!(toml_string.contains("[motion]"));
        assert!(toml_string.contains("start_threshold"));
        assert!(toml_string.contains("validate_path"));
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config: ReadinessConfig = toml::from_str("[arming]\narming_duration_ms = 900\n").unwrap();
        assert_eq!(config.arming.arming_duration_ms, 900);
        assert_eq!(config.arming.countdown_tick_ms, 120);
        assert_eq!(config.alignment, AlignmentConfig::default());
    }

    #[test]
    fn test_load_nonexistent_file() {
        let result = ReadinessConfig::load_from_file("nonexistent_aquacapture.toml");
        assert!(result.is_ok());
        assert_eq!(result.unwrap().fiducial.poll_ms, 450);
    }

    #[test]
    fn test_durations() {
        let config = ReadinessConfig::default();
        assert_eq!(config.arming.arming_duration(), Duration::from_millis(1200));
        assert_eq!(config.fiducial.poll_interval(), Duration::from_millis(450));
        assert_eq!(config.motion.sample_period(), Duration::from_millis(150));
    }
}
