use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ContextError;
use crate::fonts::{BuiltinFontProvider, FileFontProvider, FontProvider};

/// Where the glyph sets of the bundle come from.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum FontSource {
    /// Helvetica and Helvetica-Bold, which are not embedded.
    #[default]
    Builtin,
    /// Two TrueType files, embedded into the bundle.
    Files { regular: PathBuf, bold: PathBuf },
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct BundleConfiguration {
    pub font_source: FontSource,
    pub output_directory: PathBuf,
    pub compress_output: bool,
}

impl Default for BundleConfiguration {
    fn default() -> Self {
        BundleConfiguration {
            font_source: FontSource::Builtin,
            output_directory: PathBuf::from("."),
            compress_output: true,
        }
    }
}

impl BundleConfiguration {
    pub fn from_path(configuration_file_path: &Path) -> Result<Self, ContextError> {
        let configuration_file_contents = std::fs::read_to_string(configuration_file_path)
            .map_err(|error| {
                ContextError::with_error("Failed to read the configuration file", &error)
            })?;
        let configuration: BundleConfiguration =
            serde_json::from_str(&configuration_file_contents).map_err(|error| {
                ContextError::with_error("Failed to parse the configuration file", &error)
            })?;

        Ok(configuration)
    }

    /// The configuration at the given path. The defaults are used when no path is given or when
    /// the file does not exist, an unreadable or malformed file is still an error.
    pub fn load(configuration_file_path: Option<&Path>) -> Result<Self, ContextError> {
        match configuration_file_path {
            Some(configuration_file_path) if !configuration_file_path.exists() => {
                log::warn!(
                    "The configuration file {:?} does not exist, using the defaults",
                    configuration_file_path
                );
                Ok(Self::default())
            }
            Some(configuration_file_path) => Self::from_path(configuration_file_path),
            None => Ok(Self::default()),
        }
    }

    /// The font provider for the configured source. Relative font paths are resolved against
    /// the given directory.
    pub fn font_provider(&self, base_directory: &Path) -> Box<dyn FontProvider> {
        match &self.font_source {
            FontSource::Builtin => Box::new(BuiltinFontProvider),
            FontSource::Files { regular, bold } => Box::new(FileFontProvider::new(
                base_directory.join(regular),
                base_directory.join(bold),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_are_defaulted() {
        let configuration: BundleConfiguration =
            serde_json::from_str(r#"{"compressOutput": false}"#).unwrap();
        assert_eq!(configuration.font_source, FontSource::Builtin);
        assert_eq!(configuration.output_directory, PathBuf::from("."));
        assert!(!configuration.compress_output);
    }

    #[test]
    fn font_files_are_tagged_by_kind() {
        let configuration: BundleConfiguration = serde_json::from_str(
            r#"{"fontSource": {"kind": "files", "regular": "Inter-Regular.ttf",
                "bold": "Inter-Bold.ttf"}}"#,
        )
        .unwrap();
        assert_eq!(
            configuration.font_source,
            FontSource::Files {
                regular: "Inter-Regular.ttf".into(),
                bold: "Inter-Bold.ttf".into(),
            }
        );
        // Nothing is read until the fonts are requested
        let font_provider = configuration.font_provider(Path::new("/nonexistent"));
        assert!(font_provider.load_regular().is_err());
    }

    #[test]
    fn absent_files_mean_the_defaults() {
        assert_eq!(
            BundleConfiguration::load(None).unwrap(),
            BundleConfiguration::default()
        );
        let missing_path = Path::new("/nonexistent/annexr.json");
        assert_eq!(
            BundleConfiguration::load(Some(missing_path)).unwrap(),
            BundleConfiguration::default()
        );
        assert!(BundleConfiguration::from_path(missing_path).is_err());
    }

    #[test]
    fn malformed_files_are_an_error() {
        let configuration_path = std::env::temp_dir().join(format!(
            "annexr-{}-configuration.json",
            uuid::Uuid::new_v4()
        ));
        std::fs::write(&configuration_path, b"{ not json").unwrap();
        let result = BundleConfiguration::load(Some(configuration_path.as_path()));
        std::fs::remove_file(&configuration_path).unwrap();
        assert!(result.is_err());
    }
}
