use std::collections::BTreeMap;
use std::fmt;

use serde::de::{self, Deserializer};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};

pub const CONFIG_VERSION: u32 = 1;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("failed to render configuration: {0}")]
    Render(#[from] toml::ser::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// On-disk viewer configuration. Every section is optional.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ViewerFile {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub view: ViewSection,
    #[serde(default)]
    pub preset: PresetSection,
    #[serde(default)]
    pub rates: RatesSection,
    #[serde(default)]
    pub smoothing: SmoothingSection,
    #[serde(default)]
    pub palette: PaletteSection,
    #[serde(default = "default_keys")]
    pub keys: BTreeMap<String, Vec<String>>,
}

/// Targets used at startup and restored by the reset action.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ViewSection {
    pub center: [f64; 2],
    pub rotation: f64,
    pub zoom: f64,
    pub iterations: f64,
}

/// Pose restored by the recall action and shown on the first frame.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct PresetSection {
    pub center: [f64; 2],
    pub rotation: f64,
    pub zoom: f64,
}

/// Held-key rates: radians per second and iterations per second.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct RatesSection {
    pub angular: f64,
    pub iterations: f64,
}

/// Exponential decay constants, per second.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SmoothingSection {
    pub position: f64,
    pub orientation: f64,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct PaletteSection {
    #[serde(
        deserialize_with = "deserialize_colors",
        serialize_with = "serialize_colors"
    )]
    pub colors: Vec<[u8; 3]>,
}

fn default_version() -> u32 {
    CONFIG_VERSION
}

impl Default for ViewSection {
    fn default() -> Self {
        Self {
            center: [-0.5, 0.0],
            rotation: 0.0,
            zoom: 2.0,
            iterations: 255.0,
        }
    }
}

impl Default for PresetSection {
    fn default() -> Self {
        Self {
            center: [-0.5, 0.0],
            rotation: 0.0,
            zoom: 3.0,
        }
    }
}

impl Default for RatesSection {
    fn default() -> Self {
        Self {
            angular: 2.0,
            iterations: 100.0,
        }
    }
}

impl Default for SmoothingSection {
    fn default() -> Self {
        Self {
            position: 2.0,
            orientation: 1.5,
        }
    }
}

impl Default for PaletteSection {
    fn default() -> Self {
        Self {
            colors: vec![
                [0, 7, 100],
                [32, 107, 203],
                [237, 255, 255],
                [255, 170, 0],
                [106, 53, 3],
            ],
        }
    }
}

fn default_keys() -> BTreeMap<String, Vec<String>> {
    [
        ("zoom_in", "J"),
        ("zoom_out", "K"),
        ("forward", "D"),
        ("back", "A"),
        ("strafe_left", "W"),
        ("strafe_right", "S"),
        ("rotate_left", "H"),
        ("rotate_right", "L"),
        ("more_iterations", "E"),
        ("fewer_iterations", "Q"),
        ("reset", "Space"),
        ("recall", "C"),
        ("hold", "F"),
        ("quit", "Escape"),
    ]
    .into_iter()
    .map(|(action, key)| (action.to_string(), vec![key.to_string()]))
    .collect()
}

impl Default for ViewerFile {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            view: ViewSection::default(),
            preset: PresetSection::default(),
            rates: RatesSection::default(),
            smoothing: SmoothingSection::default(),
            palette: PaletteSection::default(),
            keys: default_keys(),
        }
    }
}

fn deserialize_colors<'de, D>(deserializer: D) -> Result<Vec<[u8; 3]>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Vec<String> = Vec::deserialize(deserializer)?;
    raw.iter()
        .map(|value| parse_hex_color(value).map_err(de::Error::custom))
        .collect()
}

fn serialize_colors<S>(colors: &[[u8; 3]], serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.collect_seq(colors.iter().map(|&rgb| HexColor(rgb)))
}

struct HexColor([u8; 3]);

impl fmt::Display for HexColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [r, g, b] = self.0;
        write!(f, "#{r:02x}{g:02x}{b:02x}")
    }
}

impl Serialize for HexColor {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

/// Parses `#rrggbb` (the leading `#` is optional).
pub fn parse_hex_color(raw: &str) -> Result<[u8; 3], String> {
    let trimmed = raw.trim();
    let digits = trimmed.strip_prefix('#').unwrap_or(trimmed);
    if digits.len() != 6 || !digits.chars().all(|ch| ch.is_ascii_hexdigit()) {
        return Err(format!("invalid colour '{raw}'; expected #rrggbb"));
    }
    let channel = |index: usize| {
        u8::from_str_radix(&digits[index..index + 2], 16)
            .map_err(|err| format!("invalid colour '{raw}': {err}"))
    };
    Ok([channel(0)?, channel(2)?, channel(4)?])
}

impl ViewerFile {
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let raw: ViewerFile = toml::from_str(input)?;
        raw.validate()?;
        Ok(raw)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.version != CONFIG_VERSION {
            return Err(ConfigError::Invalid(format!(
                "unsupported config version {}; expected {CONFIG_VERSION}",
                self.version
            )));
        }

        require_finite("view.center", &self.view.center)?;
        require_finite("view.rotation", &[self.view.rotation])?;
        require_positive("view.zoom", self.view.zoom)?;
        if !(self.view.iterations.is_finite() && self.view.iterations >= 2.0) {
            return Err(ConfigError::Invalid(format!(
                "view.iterations must be a finite number >= 2, got {}",
                self.view.iterations
            )));
        }

        require_finite("preset.center", &self.preset.center)?;
        require_finite("preset.rotation", &[self.preset.rotation])?;
        require_positive("preset.zoom", self.preset.zoom)?;

        require_non_negative("rates.angular", self.rates.angular)?;
        require_non_negative("rates.iterations", self.rates.iterations)?;
        require_non_negative("smoothing.position", self.smoothing.position)?;
        require_non_negative("smoothing.orientation", self.smoothing.orientation)?;

        if self.palette.colors.is_empty() {
            return Err(ConfigError::Invalid(
                "palette.colors must contain at least one colour".into(),
            ));
        }

        for (action, keys) in &self.keys {
            if action.trim().is_empty() {
                return Err(ConfigError::Invalid("key action may not be empty".into()));
            }
            if keys.iter().any(|key| key.trim().is_empty()) {
                return Err(ConfigError::Invalid(format!(
                    "keys.{action} contains an empty key name"
                )));
            }
        }

        Ok(())
    }
}

fn require_finite(field: &str, values: &[f64]) -> Result<(), ConfigError> {
    if values.iter().all(|value| value.is_finite()) {
        Ok(())
    } else {
        Err(ConfigError::Invalid(format!("{field} must be finite")))
    }
}

fn require_positive(field: &str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::Invalid(format!(
            "{field} must be a finite number > 0, got {value}"
        )))
    }
}

fn require_non_negative(field: &str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::Invalid(format!(
            "{field} must be a finite number >= 0, got {value}"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r##"
version = 1

[view]
center = [-0.75, 0.1]
zoom = 1.5
iterations = 500

[rates]
angular = 1.0

[palette]
colors = ["#000000", "FFFFFF"]

[keys]
zoom_in = ["Up", "equal"]
"##;

    #[test]
    fn parses_sample_config() {
        let config = ViewerFile::from_toml_str(SAMPLE).expect("parse config");
        assert_eq!(config.view.center, [-0.75, 0.1]);
        assert_eq!(config.view.rotation, 0.0);
        assert_eq!(config.view.iterations, 500.0);
        assert_eq!(config.rates.angular, 1.0);
        assert_eq!(config.rates.iterations, 100.0);
        assert_eq!(config.preset, PresetSection::default());
        assert_eq!(config.palette.colors, vec![[0, 0, 0], [255, 255, 255]]);
        assert_eq!(
            config.keys.get("zoom_in"),
            Some(&vec!["Up".to_string(), "equal".to_string()])
        );
        assert!(!config.keys.contains_key("quit"));
    }

    #[test]
    fn empty_file_uses_defaults() {
        let config = ViewerFile::from_toml_str("").expect("parse empty");
        assert_eq!(config, ViewerFile::default());
    }

    #[test]
    fn defaults_render_and_parse_back() {
        let rendered = ViewerFile::default().to_toml_string().expect("render");
        assert!(rendered.contains("\"#000764\""));
        assert!(rendered.contains("[smoothing]"));
        let parsed = ViewerFile::from_toml_str(&rendered).expect("parse rendered");
        assert_eq!(parsed, ViewerFile::default());
    }

    #[test]
    fn rejects_non_positive_zoom() {
        let err = ViewerFile::from_toml_str("[view]\nzoom = 0.0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
        let err = ViewerFile::from_toml_str("[preset]\nzoom = -1.0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn rejects_low_iterations_and_negative_rates() {
        let err = ViewerFile::from_toml_str("[view]\niterations = 1.0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
        let err = ViewerFile::from_toml_str("[smoothing]\nposition = -2.0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
        let err = ViewerFile::from_toml_str("[rates]\niterations = nan\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn rejects_bad_palettes() {
        let err = ViewerFile::from_toml_str("[palette]\ncolors = []\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
        let err = ViewerFile::from_toml_str("[palette]\ncolors = [\"#12345\"]\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn rejects_unknown_version() {
        let err = ViewerFile::from_toml_str("version = 2\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn hex_colours_parse_with_or_without_hash() {
        assert_eq!(parse_hex_color("#ffaa00"), Ok([255, 170, 0]));
        assert_eq!(parse_hex_color("6A3503"), Ok([106, 53, 3]));
        assert!(parse_hex_color("#gg0000").is_err());
        assert!(parse_hex_color("#fff").is_err());
    }
}
