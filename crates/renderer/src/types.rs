use std::path::PathBuf;

use crate::bindings::KeyBindings;
use crate::input::InputRates;
use crate::smoothing::DecayRates;
use crate::view::{CameraPose, ViewDefaults, DEFAULT_PRESET};

/// Ordered colour stops the fractal shader cycles through.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Palette {
    colors: Vec<[u8; 3]>,
}

impl Palette {
    /// Returns `None` for an empty stop list.
    pub fn new(colors: Vec<[u8; 3]>) -> Option<Self> {
        if colors.is_empty() {
            None
        } else {
            Some(Self { colors })
        }
    }

    pub fn colors(&self) -> &[[u8; 3]] {
        &self.colors
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    /// Texel data for an `len x 1` RGBA8 texture.
    pub fn rgba_bytes(&self) -> Vec<u8> {
        self.colors
            .iter()
            .flat_map(|[r, g, b]| [*r, *g, *b, 255])
            .collect()
    }
}

impl Default for Palette {
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

/// Tuning knobs for navigation and smoothing.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewerSettings {
    pub defaults: ViewDefaults,
    pub preset: CameraPose,
    pub input_rates: InputRates,
    pub decay_rates: DecayRates,
}

impl Default for ViewerSettings {
    fn default() -> Self {
        Self {
            defaults: ViewDefaults::default(),
            preset: DEFAULT_PRESET,
            input_rates: InputRates::default(),
            decay_rates: DecayRates::default(),
        }
    }
}

/// Where the fragment stage comes from.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum FragmentSource {
    /// The shader compiled into the binary.
    #[default]
    Bundled,
    /// A GLSL file read at startup.
    File(PathBuf),
}

/// Immutable configuration passed to the renderer at start-up.
///
/// `RendererConfig` mirrors CLI flags and the config file: which shader to
/// compile, how large the window starts, and how navigation feels.
#[derive(Debug, Clone)]
pub struct RendererConfig {
    /// Initial window size in physical pixels.
    pub surface_size: (u32, u32),
    /// Window title.
    pub title: String,
    /// Fragment shader to compile.
    pub fragment: FragmentSource,
    /// Colour stops for the palette texture.
    pub palette: Palette,
    /// Navigation and smoothing parameters.
    pub settings: ViewerSettings,
    /// Physical keys for each logical action.
    pub bindings: KeyBindings,
}

impl Default for RendererConfig {
    /// An 800x600 window running the bundled shader with stock settings.
    fn default() -> Self {
        Self {
            surface_size: (800, 600),
            title: "Mandelbrot".to_string(),
            fragment: FragmentSource::default(),
            palette: Palette::default(),
            settings: ViewerSettings::default(),
            bindings: KeyBindings::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_palette_is_rejected() {
        assert!(Palette::new(Vec::new()).is_none());
    }

    #[test]
    fn palette_expands_to_rgba() {
        let palette = Palette::new(vec![[1, 2, 3], [4, 5, 6]]).expect("palette");
        assert_eq!(palette.rgba_bytes(), vec![1, 2, 3, 255, 4, 5, 6, 255]);
    }

    #[test]
    fn default_config_uses_bundled_shader() {
        assert_eq!(FragmentSource::default(), FragmentSource::Bundled);
        assert_eq!(RendererConfig::default().fragment, FragmentSource::Bundled);
    }
}
