use serde::{Deserialize, Serialize};

/// An RGB color with its components in the `0.0..=1.0` range, as expected by the PDF operators.
pub type Rgb = [f32; 3];

pub const WHITE: Rgb = [1.0, 1.0, 1.0];

/// A named set of colors as it is stored in the project file, every color being a `#rrggbb` string.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ColorTheme {
    pub name: String,
    pub primary: String,
    pub secondary: String,
    pub accent: String,
    pub text: String,
    pub background: String,
}

impl ColorTheme {
    fn new(name: &str, colors: [&str; 5]) -> Self {
        let [primary, secondary, accent, text, background] = colors;
        ColorTheme {
            name: name.into(),
            primary: primary.into(),
            secondary: secondary.into(),
            accent: accent.into(),
            text: text.into(),
            background: background.into(),
        }
    }
}

/// The themes offered out of the box, the first one being equivalent to the default palette.
pub fn preset_themes() -> Vec<ColorTheme> {
    vec![
        ColorTheme::new(
            "Clasic",
            ["#1a1a1a", "#333333", "#666666", "#1a1a1a", "#ffffff"],
        ),
        ColorTheme::new(
            "Albastru profesional",
            ["#1e3a8a", "#3b82f6", "#60a5fa", "#1f2937", "#ffffff"],
        ),
        ColorTheme::new(
            "Verde",
            ["#166534", "#22c55e", "#86efac", "#1f2937", "#ffffff"],
        ),
        ColorTheme::new(
            "Bordo",
            ["#7f1d1d", "#b91c1c", "#f87171", "#1f2937", "#ffffff"],
        ),
        ColorTheme::new(
            "Gri modern",
            ["#374151", "#6b7280", "#9ca3af", "#111827", "#f9fafb"],
        ),
    ]
}

/// Parses a `#rrggbb` color, the leading `#` being optional.
pub fn parse_hex_color(color: &str) -> Option<Rgb> {
    let digits = color.trim().trim_start_matches('#');
    if digits.len() != 6 || !digits.chars().all(|character| character.is_ascii_hexdigit()) {
        return None;
    }
    let component = |range: std::ops::Range<usize>| {
        u8::from_str_radix(&digits[range], 16)
            .ok()
            .map(|value| value as f32 / 255.0)
    };

    Some([component(0..2)?, component(2..4)?, component(4..6)?])
}

/// The colors actually used when drawing a page.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThemePalette {
    pub primary: Rgb,
    pub secondary: Rgb,
    pub accent: Rgb,
    pub text: Rgb,
    pub background: Rgb,
}

impl Default for ThemePalette {
    fn default() -> Self {
        ThemePalette {
            primary: rgb(0x1a, 0x1a, 0x1a),
            secondary: rgb(0x33, 0x33, 0x33),
            accent: rgb(0x66, 0x66, 0x66),
            text: rgb(0x1a, 0x1a, 0x1a),
            background: WHITE,
        }
    }
}

const fn rgb(red: u8, green: u8, blue: u8) -> Rgb {
    [
        red as f32 / 255.0,
        green as f32 / 255.0,
        blue as f32 / 255.0,
    ]
}

/// Where the colors of a resolved theme come from.
#[derive(Debug, Clone, PartialEq)]
pub enum ThemeProvenance {
    /// No theme was configured.
    Default,
    /// One of the preset themes, selected by name.
    Preset(String),
    /// Colors edited by the user, or a theme which does not match any preset.
    Custom,
}

/// A single theme value, resolved from the optional project theme and the custom colors toggle.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedTheme {
    pub palette: ThemePalette,
    pub provenance: ThemeProvenance,
}

impl ResolvedTheme {
    /// Resolves the colors field by field, invalid or missing colors falling back to the defaults.
    pub fn resolve(color_theme: Option<&ColorTheme>, use_custom_colors: bool) -> Self {
        let Some(color_theme) = color_theme else {
            return ResolvedTheme {
                palette: ThemePalette::default(),
                provenance: ThemeProvenance::Default,
            };
        };

        let defaults = ThemePalette::default();
        let resolve_color = |color: &str, fallback: Rgb| {
            parse_hex_color(color).unwrap_or_else(|| {
                log::warn!(
                    "Invalid color {:?} in the theme {:?}, using the default one",
                    color,
                    color_theme.name
                );
                fallback
            })
        };
        let palette = ThemePalette {
            primary: resolve_color(&color_theme.primary, defaults.primary),
            secondary: resolve_color(&color_theme.secondary, defaults.secondary),
            accent: resolve_color(&color_theme.accent, defaults.accent),
            text: resolve_color(&color_theme.text, defaults.text),
            background: resolve_color(&color_theme.background, defaults.background),
        };

        let is_preset = preset_themes()
            .iter()
            .any(|preset| preset == color_theme);
        let provenance = if !use_custom_colors && is_preset {
            ThemeProvenance::Preset(color_theme.name.clone())
        } else {
            ThemeProvenance::Custom
        };

        ResolvedTheme {
            palette,
            provenance,
        }
    }

    /// Whether the page needs a background rectangle to be painted.
    pub fn has_background(&self) -> bool {
        self.palette.background != WHITE
    }
}

impl Default for ResolvedTheme {
    fn default() -> Self {
        ResolvedTheme::resolve(None, false)
    }
}
