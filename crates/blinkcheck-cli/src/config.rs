use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use blinkcheck_core::liveness::{
    LivenessPolicy, DEFAULT_BLINK_COUNT, DEFAULT_BLINK_WINDOW, DEFAULT_MIN_EYES,
};
use blinkcheck_models::{asset, AssetKind};
use clap::ValueEnum;

/// Which liveness policy drives the verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PolicyKind {
    /// Eyes seen again within the blink window.
    Recent,
    /// Several eye detections inside the blink window.
    Window,
    /// Several consecutive frames showing both eyes.
    Consecutive,
}

impl FromStr for PolicyKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        <Self as ValueEnum>::from_str(s.trim(), true)
    }
}

/// How verdicts are written to stdout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// `Liveness: Real` / `Liveness: Spoof`
    Text,
    /// One JSON object per frame.
    Json,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        <Self as ValueEnum>::from_str(s.trim(), true)
    }
}

/// Runtime configuration, loaded from `BLINKCHECK_*` environment variables
/// and then overridden by command-line flags.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// OpenCV capture device index (default: 0).
    pub camera_index: i32,
    /// Requested capture width in pixels.
    pub frame_width: i32,
    /// Requested capture height in pixels.
    pub frame_height: i32,
    /// Directory holding the two cascade XML files.
    pub cascade_dir: PathBuf,
    /// Title of the preview window.
    pub window_name: String,
    /// Key poll interval per frame, in milliseconds.
    pub key_poll_ms: i32,
    pub policy: PolicyKind,
    /// Maximum gap between eye detections that still counts as a blink.
    pub blink_window_ms: u64,
    /// Eye detections (`window`) or frames (`consecutive`) required.
    pub blink_count: usize,
    /// Eyes per face required by the `consecutive` policy.
    pub min_eyes: usize,
    pub output: OutputFormat,
}

impl Config {
    /// Load configuration from `BLINKCHECK_*` environment variables with defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`Config::from_env`], reading values through `lookup`.
    /// Unparseable values fall back to the default.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key);
        Self {
            camera_index: parse_or(get("BLINKCHECK_CAMERA_INDEX"), 0),
            frame_width: parse_or(get("BLINKCHECK_FRAME_WIDTH"), 640),
            frame_height: parse_or(get("BLINKCHECK_FRAME_HEIGHT"), 480),
            cascade_dir: get("BLINKCHECK_CASCADE_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(blinkcheck_models::default_cascade_dir),
            window_name: get("BLINKCHECK_WINDOW_NAME")
                .unwrap_or_else(|| "Live Face Detection".to_string()),
            key_poll_ms: parse_or(get("BLINKCHECK_KEY_POLL_MS"), 1),
            policy: parse_or(get("BLINKCHECK_LIVENESS_POLICY"), PolicyKind::Recent),
            blink_window_ms: parse_or(
                get("BLINKCHECK_BLINK_WINDOW_MS"),
                DEFAULT_BLINK_WINDOW.as_millis() as u64,
            ),
            blink_count: parse_or(get("BLINKCHECK_BLINK_COUNT"), DEFAULT_BLINK_COUNT),
            min_eyes: parse_or(get("BLINKCHECK_MIN_EYES"), DEFAULT_MIN_EYES),
            output: parse_or(get("BLINKCHECK_OUTPUT"), OutputFormat::Text),
        }
    }

    /// The evaluator policy these settings describe.
    pub fn liveness_policy(&self) -> LivenessPolicy {
        let window = Duration::from_millis(self.blink_window_ms);
        match self.policy {
            PolicyKind::Recent => LivenessPolicy::RecentBlink { window },
            PolicyKind::Window => LivenessPolicy::BlinkWindow {
                blinks: self.blink_count,
                window,
            },
            PolicyKind::Consecutive => LivenessPolicy::ConsecutiveFrames {
                frames: self.blink_count,
                min_eyes: self.min_eyes,
            },
        }
    }

    /// Path to the frontal face cascade.
    pub fn face_cascade_path(&self) -> PathBuf {
        self.cascade_dir.join(asset(AssetKind::Face).name)
    }

    /// Path to the eye cascade.
    pub fn eye_cascade_path(&self) -> PathBuf {
        self.cascade_dir.join(asset(AssetKind::Eye).name)
    }
}

fn parse_or<T: FromStr>(value: Option<String>, default: T) -> T {
    value
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_with(vars: &[(&str, &str)]) -> Config {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn defaults_without_environment() {
        let config = config_with(&[("BLINKCHECK_CASCADE_DIR", "/opt/cascades")]);
        assert_eq!(config.camera_index, 0);
        assert_eq!((config.frame_width, config.frame_height), (640, 480));
        assert_eq!(config.window_name, "Live Face Detection");
        assert_eq!(config.key_poll_ms, 1);
        assert_eq!(config.policy, PolicyKind::Recent);
        assert_eq!(config.output, OutputFormat::Text);
        assert_eq!(config.liveness_policy(), LivenessPolicy::default());
    }

    #[test]
    fn environment_overrides_defaults() {
        let config = config_with(&[
            ("BLINKCHECK_CAMERA_INDEX", "2"),
            ("BLINKCHECK_FRAME_WIDTH", "1280"),
            ("BLINKCHECK_FRAME_HEIGHT", "720"),
            ("BLINKCHECK_LIVENESS_POLICY", "Window"),
            ("BLINKCHECK_BLINK_WINDOW_MS", "500"),
            ("BLINKCHECK_BLINK_COUNT", "4"),
            ("BLINKCHECK_OUTPUT", "json"),
        ]);
        assert_eq!(config.camera_index, 2);
        assert_eq!((config.frame_width, config.frame_height), (1280, 720));
        assert_eq!(config.output, OutputFormat::Json);
        assert_eq!(
            config.liveness_policy(),
            LivenessPolicy::BlinkWindow {
                blinks: 4,
                window: Duration::from_millis(500),
            }
        );
    }

    #[test]
    fn unparseable_values_fall_back() {
        let config = config_with(&[
            ("BLINKCHECK_CAMERA_INDEX", "front"),
            ("BLINKCHECK_LIVENESS_POLICY", "psychic"),
            ("BLINKCHECK_BLINK_WINDOW_MS", "-3"),
        ]);
        assert_eq!(config.camera_index, 0);
        assert_eq!(config.policy, PolicyKind::Recent);
        assert_eq!(config.blink_window_ms, 300);
    }

    #[test]
    fn consecutive_policy_uses_count_and_eyes() {
        let config = config_with(&[
            ("BLINKCHECK_LIVENESS_POLICY", "consecutive"),
            ("BLINKCHECK_MIN_EYES", "1"),
        ]);
        assert_eq!(
            config.liveness_policy(),
            LivenessPolicy::ConsecutiveFrames {
                frames: 3,
                min_eyes: 1,
            }
        );
    }

    #[test]
    fn cascade_paths_join_dir() {
        let config = config_with(&[("BLINKCHECK_CASCADE_DIR", "/opt/cascades")]);
        assert_eq!(
            config.face_cascade_path(),
            PathBuf::from("/opt/cascades/haarcascade_frontalface_alt2.xml")
        );
        assert_eq!(
            config.eye_cascade_path(),
            PathBuf::from("/opt/cascades/haarcascade_eye.xml")
        );
    }
}
