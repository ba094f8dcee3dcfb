use std::{
    path::{Path, PathBuf},
    sync::{Arc, OnceLock},
};

use crate::error::ContextError;
use crate::text::win_ansi_byte;

/// Advance widths of the printable ASCII characters (from the space to the tilde) of Helvetica,
/// in thousandths of an em, as listed in its AFM file.
#[rustfmt::skip]
const HELVETICA_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556,
    278, 278, 584, 584, 584, 556, 1015,
    667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833,
    722, 778, 667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611,
    278, 278, 278, 469, 556, 333,
    556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833,
    556, 556, 556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500,
    334, 260, 334, 584,
];

/// Same as `HELVETICA_WIDTHS`, for Helvetica-Bold.
#[rustfmt::skip]
const HELVETICA_BOLD_WIDTHS: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556,
    333, 333, 584, 584, 584, 611, 975,
    722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833,
    722, 778, 667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611,
    333, 278, 333, 584, 556, 333,
    556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889,
    611, 611, 611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500,
    389, 280, 389, 584,
];

/// Advance widths of the upper half of the `WinAnsiEncoding` (0x80 to 0xFF) in Helvetica. The
/// codes the encoding leaves undefined carry the width of the bullet.
#[rustfmt::skip]
const HELVETICA_UPPER_WIDTHS: [u16; 128] = [
    556, 350, 222, 556, 333, 1000, 556, 556, 333, 1000, 667, 333, 1000, 350, 611, 350,
    350, 222, 222, 333, 333, 350, 556, 1000, 333, 1000, 500, 333, 944, 350, 500, 667,
    278, 333, 556, 556, 556, 556, 260, 556, 333, 737, 370, 556, 584, 333, 737, 333,
    400, 584, 333, 333, 333, 556, 537, 278, 333, 333, 365, 556, 834, 834, 834, 611,
    667, 667, 667, 667, 667, 667, 1000, 722, 667, 667, 667, 667, 278, 278, 278, 278,
    722, 722, 778, 778, 778, 778, 778, 584, 778, 722, 722, 722, 722, 667, 667, 611,
    556, 556, 556, 556, 556, 556, 889, 500, 556, 556, 556, 556, 278, 278, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 584, 611, 556, 556, 556, 556, 500, 556, 500,
];

/// Same as `HELVETICA_UPPER_WIDTHS`, for Helvetica-Bold.
#[rustfmt::skip]
const HELVETICA_BOLD_UPPER_WIDTHS: [u16; 128] = [
    556, 350, 278, 556, 500, 1000, 556, 556, 333, 1000, 667, 333, 1000, 350, 611, 350,
    350, 278, 278, 500, 500, 350, 556, 1000, 333, 1000, 556, 333, 944, 350, 500, 667,
    278, 333, 556, 556, 556, 556, 280, 556, 333, 737, 370, 556, 584, 333, 737, 333,
    400, 584, 333, 333, 333, 611, 556, 278, 333, 333, 365, 556, 834, 834, 834, 611,
    722, 722, 722, 722, 722, 722, 1000, 722, 667, 667, 667, 667, 278, 278, 278, 278,
    722, 722, 778, 778, 778, 778, 778, 584, 778, 722, 722, 722, 722, 667, 667, 611,
    556, 556, 556, 556, 556, 556, 889, 556, 556, 556, 556, 556, 278, 278, 278, 278,
    611, 611, 611, 611, 611, 611, 611, 584, 611, 611, 611, 611, 611, 556, 611, 556,
];

/// The standard PDF fonts every viewer provides, which therefore need no embedding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StandardFont {
    Helvetica,
    HelveticaBold,
}

impl StandardFont {
    pub fn base_font_name(&self) -> &'static str {
        match self {
            StandardFont::Helvetica => "Helvetica",
            StandardFont::HelveticaBold => "Helvetica-Bold",
        }
    }

    /// The advance width of a character in thousandths of an em, measured as it is drawn: through
    /// its `WinAnsiEncoding` byte, the characters without one being drawn as `?`.
    pub fn character_width(&self, character: char) -> u16 {
        let (lower_widths, upper_widths) = match self {
            StandardFont::Helvetica => (&HELVETICA_WIDTHS, &HELVETICA_UPPER_WIDTHS),
            StandardFont::HelveticaBold => (&HELVETICA_BOLD_WIDTHS, &HELVETICA_BOLD_UPPER_WIDTHS),
        };
        match win_ansi_byte(character) {
            Some(byte @ 0x20..=0x7e) => lower_widths[usize::from(byte - 0x20)],
            Some(byte @ 0x80..=0xff) => upper_widths[usize::from(byte - 0x80)],
            _ => lower_widths[usize::from(b'?' - 0x20)],
        }
    }
}

/// A glyph set as handed out by a `FontProvider`.
#[derive(Debug, Clone)]
pub enum FontData {
    /// One of the standard fonts, drawn with the `WinAnsiEncoding`.
    Standard(StandardFont),
    /// The raw bytes of a TrueType (or OpenType with TrueType outlines) font, embedded as is.
    TrueType(Arc<Vec<u8>>),
}

/// Supplies the regular and bold glyph sets used by the renderer. Implementations are expected
/// to load each set once and to hand out the cached value afterwards. A failure is fatal for the
/// rendering, there is no fallback glyph source.
pub trait FontProvider {
    fn load_regular(&self) -> Result<FontData, ContextError>;
    fn load_bold(&self) -> Result<FontData, ContextError>;
}

impl<P: FontProvider + ?Sized> FontProvider for &P {
    fn load_regular(&self) -> Result<FontData, ContextError> {
        (**self).load_regular()
    }

    fn load_bold(&self) -> Result<FontData, ContextError> {
        (**self).load_bold()
    }
}

impl<P: FontProvider + ?Sized> FontProvider for Box<P> {
    fn load_regular(&self) -> Result<FontData, ContextError> {
        (**self).load_regular()
    }

    fn load_bold(&self) -> Result<FontData, ContextError> {
        (**self).load_bold()
    }
}

/// Provides Helvetica and Helvetica-Bold. Nothing is loaded, so it never fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinFontProvider;

impl FontProvider for BuiltinFontProvider {
    fn load_regular(&self) -> Result<FontData, ContextError> {
        Ok(FontData::Standard(StandardFont::Helvetica))
    }

    fn load_bold(&self) -> Result<FontData, ContextError> {
        Ok(FontData::Standard(StandardFont::HelveticaBold))
    }
}

/// Reads the two TrueType fonts from disk the first time they are requested. The bytes are then
/// kept for the lifetime of the provider and shared by every rendering.
#[derive(Debug)]
pub struct FileFontProvider {
    regular_path: PathBuf,
    bold_path: PathBuf,
    regular_bytes: OnceLock<Arc<Vec<u8>>>,
    bold_bytes: OnceLock<Arc<Vec<u8>>>,
}

impl FileFontProvider {
    pub fn new<P: Into<PathBuf>>(regular_path: P, bold_path: P) -> Self {
        FileFontProvider {
            regular_path: regular_path.into(),
            bold_path: bold_path.into(),
            regular_bytes: OnceLock::new(),
            bold_bytes: OnceLock::new(),
        }
    }
}

impl FontProvider for FileFontProvider {
    fn load_regular(&self) -> Result<FontData, ContextError> {
        load_once(&self.regular_bytes, &self.regular_path).map(FontData::TrueType)
    }

    fn load_bold(&self) -> Result<FontData, ContextError> {
        load_once(&self.bold_bytes, &self.bold_path).map(FontData::TrueType)
    }
}

fn load_once(
    cell: &OnceLock<Arc<Vec<u8>>>,
    font_path: &Path,
) -> Result<Arc<Vec<u8>>, ContextError> {
    if let Some(font_bytes) = cell.get() {
        return Ok(Arc::clone(font_bytes));
    }

    let font_bytes = std::fs::read(font_path).map_err(|error| {
        ContextError::with_error(
            format!("Failed to read the font {:?}, probably the path is wrong", font_path),
            &error,
        )
    })?;
    log::debug!("Loaded the font {:?} ({} bytes)", font_path, font_bytes.len());

    // Another caller may have won the race, in which case its bytes are kept
    Ok(Arc::clone(cell.get_or_init(|| Arc::new(font_bytes))))
}

/// Loads both glyph sets ahead of time. This is best effort: a failure is only logged, it will
/// surface again (and abort the export) when the fonts are actually needed.
pub fn preload(font_provider: &dyn FontProvider) {
    match font_provider
        .load_regular()
        .and_then(|_| font_provider.load_bold())
    {
        Ok(_) => log::info!("Fonts preloaded successfully"),
        Err(error) => log::warn!("Failed to preload the fonts: {}", error),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temporary_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("annexr-{}-{}", uuid::Uuid::new_v4(), name))
    }

    #[test]
    fn standard_widths_follow_the_metrics() {
        assert_eq!(StandardFont::Helvetica.character_width(' '), 278);
        assert_eq!(StandardFont::Helvetica.character_width('W'), 944);
        assert_eq!(StandardFont::Helvetica.character_width('~'), 584);
        assert_eq!(StandardFont::HelveticaBold.character_width('m'), 889);
        assert_eq!(StandardFont::HelveticaBold.character_width('é'), 556);
    }

    #[test]
    fn upper_win_ansi_characters_use_their_own_widths() {
        assert_eq!(StandardFont::Helvetica.character_width('—'), 1000);
        assert_eq!(StandardFont::Helvetica.character_width('…'), 1000);
        assert_eq!(StandardFont::Helvetica.character_width('Ö'), 778);
        assert_eq!(StandardFont::Helvetica.character_width('Æ'), 1000);
        assert_eq!(StandardFont::HelveticaBold.character_width('™'), 1000);
        assert_eq!(StandardFont::HelveticaBold.character_width('ü'), 611);
        // Characters outside of the encoding are drawn, and thus measured, as `?`
        assert_eq!(StandardFont::Helvetica.character_width('Ω'), 556);
        assert_eq!(StandardFont::HelveticaBold.character_width('Ω'), 611);
    }

    #[test]
    fn file_fonts_are_read_only_once() {
        let regular_path = temporary_path("regular.ttf");
        let bold_path = temporary_path("bold.ttf");
        std::fs::write(&regular_path, b"regular glyphs").unwrap();
        std::fs::write(&bold_path, b"bold glyphs").unwrap();

        let font_provider = FileFontProvider::new(&regular_path, &bold_path);
        let FontData::TrueType(first) = font_provider.load_regular().unwrap() else {
            panic!("expected TrueType data");
        };
        std::fs::remove_file(&regular_path).unwrap();
        let FontData::TrueType(second) = font_provider.load_regular().unwrap() else {
            panic!("expected TrueType data");
        };

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.as_slice(), b"regular glyphs");
        std::fs::remove_file(&bold_path).unwrap();
    }

    #[test]
    fn missing_font_files_are_an_error() {
        let font_provider = FileFontProvider::new(
            temporary_path("missing.ttf"),
            temporary_path("missing-bold.ttf"),
        );
        assert!(font_provider.load_bold().is_err());
        // Preloading only logs the failure
        preload(&font_provider);
    }
}
