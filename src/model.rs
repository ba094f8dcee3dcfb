use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ContextError;
use crate::theme::{ColorTheme, ResolvedTheme};

/// The version written into newly saved project files.
pub const PROJECT_VERSION: &str = "1.0";

/// Generates an opaque identifier for annexes and documents.
fn generate_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Derives the default title of a document from its file name: the extension is stripped
/// and the dashes and underscores are replaced by spaces.
pub fn auto_title(file_name: &str) -> String {
    let stem = match file_name.rfind('.') {
        Some(index)
            if index > 0
                && index + 1 < file_name.len()
                && !file_name[index + 1..].contains(['/', '\\']) =>
        {
            &file_name[..index]
        }
        _ => file_name,
    };
    stem.replace(['-', '_'], " ")
}

/// One source file placed inside an annex.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DocumentItem {
    pub id: String,
    pub source_file_path: String,
    pub auto_title: String,
    /// The content of the file, captured when it was added. Never written to the project file.
    #[serde(skip)]
    pub file_bytes: Option<Vec<u8>>,
}

impl DocumentItem {
    /// Creates a document from the name of the file it was read from and its content, which is
    /// `None` when the file could not be read.
    pub fn from_file_name<S: Into<String>>(file_name: S, file_bytes: Option<Vec<u8>>) -> Self {
        let source_file_path = file_name.into();
        DocumentItem {
            id: generate_id(),
            auto_title: auto_title(&source_file_path),
            source_file_path,
            file_bytes,
        }
    }
}

/// One numbered section of the bundle: a row of the table of contents, a cover page and the
/// documents.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AnnexItem {
    pub id: String,
    /// The 1-based position of the annex, only ever set by `AnnexCollection`.
    #[serde(default)]
    annex_number: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_title: Option<String>,
    #[serde(default)]
    pub documents: Vec<DocumentItem>,
}

impl AnnexItem {
    pub fn new(documents: Vec<DocumentItem>) -> Self {
        AnnexItem {
            id: generate_id(),
            annex_number: 0,
            user_title: None,
            documents,
        }
    }

    pub fn annex_number(&self) -> usize {
        self.annex_number
    }

    /// The title shown in the table of contents and on the cover page: the user's title, the title
    /// of the first document or a placeholder, in this order.
    pub fn display_title(&self) -> String {
        if let Some(user_title) = self
            .user_title
            .as_deref()
            .filter(|title| !title.trim().is_empty())
        {
            return user_title.to_string();
        }
        match self.documents.first() {
            Some(document) if !document.auto_title.trim().is_empty() => {
                document.auto_title.clone()
            }
            _ => format!("Anexa {}", self.annex_number),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

/// The ordered annexes of a bundle. Every mutation renumbers the annexes so that the annex at
/// index `i` always carries the number `i + 1`.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(from = "Vec<AnnexItem>", into = "Vec<AnnexItem>")]
pub struct AnnexCollection {
    annexes: Vec<AnnexItem>,
}

impl From<Vec<AnnexItem>> for AnnexCollection {
    fn from(annexes: Vec<AnnexItem>) -> Self {
        let mut collection = AnnexCollection { annexes };
        collection.renumber();
        collection
    }
}

impl From<AnnexCollection> for Vec<AnnexItem> {
    fn from(collection: AnnexCollection) -> Self {
        collection.annexes
    }
}

impl AnnexCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn as_slice(&self) -> &[AnnexItem] {
        &self.annexes
    }

    pub fn iter(&self) -> std::slice::Iter<'_, AnnexItem> {
        self.annexes.iter()
    }

    pub fn len(&self) -> usize {
        self.annexes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.annexes.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&AnnexItem> {
        self.annexes.get(index)
    }

    /// The annex at the given position, whose title and documents may be edited in place.
    pub fn get_mut(&mut self, index: usize) -> Option<&mut AnnexItem> {
        self.annexes.get_mut(index)
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, AnnexItem> {
        self.annexes.iter_mut()
    }

    /// Appends an annex at the end of the bundle.
    pub fn push(&mut self, annex: AnnexItem) {
        self.annexes.push(annex);
        self.renumber();
    }

    /// Inserts an annex at the given position, clamped to the end of the bundle.
    pub fn insert(&mut self, index: usize, annex: AnnexItem) {
        let index = index.min(self.annexes.len());
        self.annexes.insert(index, annex);
        self.renumber();
    }

    /// Removes the annex with the given identifier.
    pub fn remove(&mut self, annex_id: &str) -> Option<AnnexItem> {
        let index = self.annexes.iter().position(|annex| annex.id == annex_id)?;
        let annex = self.annexes.remove(index);
        self.renumber();
        Some(annex)
    }

    /// Moves the annex at `from` to the position `to`, as a drag and drop would do.
    pub fn reorder(&mut self, from: usize, to: usize) -> Result<(), ContextError> {
        if from >= self.annexes.len() || to >= self.annexes.len() {
            return Err(ContextError::with_context(format!(
                "Unable to move the annex from {} to {}, the bundle has {} annexes",
                from,
                to,
                self.annexes.len()
            )));
        }
        let annex = self.annexes.remove(from);
        self.annexes.insert(to, annex);
        self.renumber();
        Ok(())
    }

    /// Appends a document to the annex with the given identifier.
    pub fn add_document(
        &mut self,
        annex_id: &str,
        document: DocumentItem,
    ) -> Result<(), ContextError> {
        let annex = self.find_mut(annex_id)?;
        annex.documents.push(document);
        Ok(())
    }

    /// Removes a document from the annex, leaving the annex in place even when it becomes empty.
    pub fn remove_document(
        &mut self,
        annex_id: &str,
        document_id: &str,
    ) -> Result<Option<DocumentItem>, ContextError> {
        let annex = self.find_mut(annex_id)?;
        let index = annex
            .documents
            .iter()
            .position(|document| document.id == document_id);
        Ok(index.map(|index| annex.documents.remove(index)))
    }

    fn find_mut(&mut self, annex_id: &str) -> Result<&mut AnnexItem, ContextError> {
        self.annexes
            .iter_mut()
            .find(|annex| annex.id == annex_id)
            .ok_or(ContextError::with_context(format!(
                "Unable to find the annex {:?}",
                annex_id
            )))
    }

    fn renumber(&mut self) {
        for (index, annex) in self.annexes.iter_mut().enumerate() {
            annex.annex_number = index + 1;
        }
    }
}

impl<'a> IntoIterator for &'a AnnexCollection {
    type Item = &'a AnnexItem;
    type IntoIter = std::slice::Iter<'a, AnnexItem>;

    fn into_iter(self) -> Self::IntoIter {
        self.annexes.iter()
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum Alignment {
    #[default]
    Left,
    Center,
    Right,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum LogoPosition {
    #[default]
    Top,
    Bottom,
    Left,
    Right,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum StampPosition {
    TopLeft,
    #[default]
    TopRight,
    BottomLeft,
    BottomRight,
}

/// The formatting of either the table of contents or the cover pages. The two are configured
/// independently and never merged.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct FormattingOptions {
    /// Only used by the previews, the renderer draws with the glyph sets of the font provider.
    pub font_family: String,
    pub font_size: f32,
    pub bold: bool,
    pub alignment: Alignment,
    /// The margins in millimeters.
    pub margin_top: f32,
    pub margin_right: f32,
    pub margin_bottom: f32,
    pub margin_left: f32,
    pub show_page_numbers: bool,
    /// The heading of the cover pages, where `{n}` is replaced by the annex number.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub heading_format: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub heading_font_size: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logo_path: Option<String>,
    /// The content of the logo image, never written to the project file.
    #[serde(skip)]
    pub logo_file: Option<Vec<u8>>,
    pub logo_size: f32,
    pub logo_position: LogoPosition,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color_theme: Option<ColorTheme>,
    pub use_custom_colors: bool,
    pub add_stamp: bool,
    pub stamp_text: String,
    pub stamp_position: StampPosition,
    pub stamp_font_size: f32,
}

impl Default for FormattingOptions {
    fn default() -> Self {
        FormattingOptions {
            font_family: "Inter".into(),
            font_size: 12.0,
            bold: false,
            alignment: Alignment::Left,
            margin_top: 20.0,
            margin_right: 20.0,
            margin_bottom: 20.0,
            margin_left: 20.0,
            show_page_numbers: true,
            heading_format: None,
            heading_font_size: None,
            logo_path: None,
            logo_file: None,
            logo_size: 120.0,
            logo_position: LogoPosition::Top,
            color_theme: None,
            use_custom_colors: false,
            add_stamp: false,
            stamp_text: String::new(),
            stamp_position: StampPosition::TopRight,
            stamp_font_size: 10.0,
        }
    }
}

impl FormattingOptions {
    /// The defaults of the table of contents.
    pub fn opis() -> Self {
        Self::default()
    }

    /// The defaults of the cover pages.
    pub fn cover() -> Self {
        FormattingOptions {
            alignment: Alignment::Center,
            heading_format: Some("ANEXA {n}".into()),
            heading_font_size: Some(28.0),
            font_size: 16.0,
            ..Self::default()
        }
    }

    /// The heading of the cover page of the given annex.
    pub fn heading_text(&self, annex_number: usize) -> String {
        match self
            .heading_format
            .as_deref()
            .filter(|format| !format.trim().is_empty())
        {
            Some(format) => format.replace("{n}", &annex_number.to_string()),
            None => format!("ANEXA {annex_number}"),
        }
    }

    pub fn heading_size(&self) -> f32 {
        self.heading_font_size.unwrap_or(28.0)
    }

    pub fn theme(&self) -> ResolvedTheme {
        ResolvedTheme::resolve(self.color_theme.as_ref(), self.use_custom_colors)
    }

    /// The text of the stamp for the given annex, `None` when stamping is disabled.
    pub fn stamp_text_for(&self, annex_number: usize) -> Option<String> {
        if !self.add_stamp || self.stamp_text.trim().is_empty() {
            return None;
        }
        Some(self.stamp_text.replace("{n}", &annex_number.to_string()))
    }
}

/// The only input of the bundle assembler, a snapshot of the annexes and of both formattings.
/// The annexes are held in an `AnnexCollection`, so their numbers always follow their order.
#[derive(Debug, Clone, Default)]
pub struct ExportRequest {
    pub annexes: AnnexCollection,
    pub opis_formatting: FormattingOptions,
    pub cover_formatting: FormattingOptions,
}

/// The project file, which stores everything but the binary content of the documents and the logo.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProjectModel {
    #[serde(default)]
    pub annexes: AnnexCollection,
    #[serde(default = "FormattingOptions::opis")]
    pub opis_formatting: FormattingOptions,
    #[serde(default = "FormattingOptions::cover")]
    pub cover_formatting: FormattingOptions,
    #[serde(default = "default_project_version")]
    pub project_version: String,
}

fn default_project_version() -> String {
    PROJECT_VERSION.into()
}

impl Default for ProjectModel {
    fn default() -> Self {
        ProjectModel {
            annexes: AnnexCollection::new(),
            opis_formatting: FormattingOptions::opis(),
            cover_formatting: FormattingOptions::cover(),
            project_version: default_project_version(),
        }
    }
}

impl ProjectModel {
    pub fn from_json(json: &str) -> Result<Self, ContextError> {
        serde_json::from_str(json)
            .map_err(|error| ContextError::with_error("Failed to parse the project file", &error))
    }

    pub fn to_json(&self) -> Result<String, ContextError> {
        serde_json::to_string_pretty(self).map_err(|error| {
            ContextError::with_error("Failed to serialize the project file", &error)
        })
    }

    pub fn from_path(project_path: &Path) -> Result<Self, ContextError> {
        let project_file_contents = std::fs::read_to_string(project_path).map_err(|error| {
            ContextError::with_error(
                format!("Failed to read the project file {:?}", project_path),
                &error,
            )
        })?;
        Self::from_json(&project_file_contents)
    }

    pub fn save_to_path(&self, project_path: &Path) -> Result<(), ContextError> {
        std::fs::write(project_path, self.to_json()?).map_err(|error| {
            ContextError::with_error(
                format!("Failed to write the project file {:?}", project_path),
                &error,
            )
        })
    }

    /// Takes the snapshot which is handed to the assembler.
    pub fn export_request(&self) -> ExportRequest {
        ExportRequest {
            annexes: self.annexes.clone(),
            opis_formatting: self.opis_formatting.clone(),
            cover_formatting: self.cover_formatting.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn annex_with(file_names: &[&str]) -> AnnexItem {
        AnnexItem::new(
            file_names
                .iter()
                .map(|file_name| DocumentItem::from_file_name(*file_name, None))
                .collect(),
        )
    }

    fn assert_numbered(collection: &AnnexCollection) {
        for (index, annex) in collection.iter().enumerate() {
            assert_eq!(annex.annex_number(), index + 1);
        }
    }

    #[test]
    fn auto_title_strips_the_extension_and_separators() {
        assert_eq!(auto_title("contract_de-vanzare.pdf"), "contract de vanzare");
        assert_eq!(auto_title("raport.final.pdf"), "raport.final");
        assert_eq!(auto_title("fara extensie"), "fara extensie");
        assert_eq!(auto_title(".hidden"), ".hidden");
    }

    #[test]
    fn every_mutation_renumbers_the_annexes() {
        let mut collection = AnnexCollection::new();
        for file_name in ["a.pdf", "b.pdf", "c.pdf", "d.pdf"] {
            collection.push(annex_with(&[file_name]));
            assert_numbered(&collection);
        }

        collection.insert(1, annex_with(&["inserted.pdf"]));
        assert_numbered(&collection);
        assert_eq!(collection.get(1).map(AnnexItem::display_title), Some("inserted".into()));

        collection.reorder(0, 3).unwrap();
        assert_numbered(&collection);
        assert_eq!(collection.get(3).map(AnnexItem::display_title), Some("a".into()));

        let removed_id = collection.get(2).unwrap().id.clone();
        assert!(collection.remove(&removed_id).is_some());
        assert_numbered(&collection);
        assert_eq!(collection.len(), 4);

        assert!(collection.reorder(0, 9).is_err());
    }

    #[test]
    fn display_title_prefers_the_user_title() {
        let mut annex = annex_with(&["scan_001.pdf", "scan_002.pdf"]);
        annex.annex_number = 7;
        assert_eq!(annex.display_title(), "scan 001");

        annex.user_title = Some("Procura notariala".into());
        assert_eq!(annex.display_title(), "Procura notariala");

        annex.user_title = Some("  ".into());
        annex.documents.clear();
        assert_eq!(annex.display_title(), "Anexa 7");
    }

    #[test]
    fn removing_documents_keeps_the_annex() {
        let mut collection = AnnexCollection::new();
        collection.push(annex_with(&["a.pdf"]));
        let annex_id = collection.get(0).unwrap().id.clone();
        let document_id = collection.get(0).unwrap().documents[0].id.clone();

        let removed = collection.remove_document(&annex_id, &document_id).unwrap();
        assert!(removed.is_some());
        assert!(collection.get(0).unwrap().is_empty());
        let document = DocumentItem::from_file_name("x.pdf", None);
        assert!(collection.add_document("missing", document).is_err());
    }

    #[test]
    fn heading_and_stamp_templates_use_the_annex_number() {
        let mut formatting = FormattingOptions::cover();
        assert_eq!(formatting.heading_text(4), "ANEXA 4");
        formatting.heading_format = Some("Anexa nr. {n}".into());
        assert_eq!(formatting.heading_text(12), "Anexa nr. 12");

        assert_eq!(formatting.stamp_text_for(3), None);
        formatting.add_stamp = true;
        formatting.stamp_text = "Anexa {n} la contract".into();
        assert_eq!(formatting.stamp_text_for(3), Some("Anexa 3 la contract".into()));
    }

    #[test]
    fn loading_defaults_missing_parts() {
        let project = ProjectModel::from_json(
            r#"{"annexes": [{"id": "x"}, {"id": "y", "userTitle": "Doi"}]}"#,
        )
        .unwrap();
        assert_eq!(project.annexes.len(), 2);
        assert!(project.annexes.get(0).unwrap().documents.is_empty());
        assert_eq!(project.annexes.get(1).unwrap().annex_number(), 2);
        assert_eq!(project.opis_formatting, FormattingOptions::opis());
        assert_eq!(project.cover_formatting, FormattingOptions::cover());
        assert_eq!(project.project_version, PROJECT_VERSION);
    }
}
