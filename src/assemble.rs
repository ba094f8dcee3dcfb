use time::OffsetDateTime;

use crate::error::{ContextError, ExportError};
use crate::fonts::FontProvider;
use crate::import::import_document;
use crate::model::{AnnexItem, DocumentItem, ExportRequest, FormattingOptions};
use crate::pdf::{PageStamp, PdfDocument};
use crate::render::{ErrorPage, FontSet, OpisRow, PageRenderer, SeparatorPage, StandardRenderer};
use crate::text::normalize;

/// The stages an export goes through, logged as it progresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportStage {
    Validating,
    RenderingOpis,
    /// Rendering the annex with the given number.
    RenderingAnnex(usize),
    /// Rendering the given document (1-based) of the given annex.
    RenderingDocument(usize, usize),
    Finalizing,
}

/// What went wrong with a part of the bundle which was replaced or left out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssueKind {
    /// The document had no content to import.
    MissingContent,
    /// The document could not be parsed, an error page took its place.
    ImportFailed,
    /// The separator page could not be rendered and was left out.
    SeparatorSkipped,
    /// The annex failed midway, an error page replaced the rest of it.
    AnnexFailed,
    /// Not even the error page could be rendered.
    ErrorPageSkipped,
}

/// A recovered failure, reported alongside the bundle.
#[derive(Debug, Clone, PartialEq)]
pub struct AssemblyIssue {
    pub kind: IssueKind,
    pub annex_number: usize,
    /// The 1-based position of the document in its annex, if the issue concerns a document.
    pub document_number: Option<usize>,
    pub file_name: Option<String>,
    pub message: String,
}

/// The exported bundle together with what had to be replaced to produce it.
#[derive(Debug, Clone)]
pub struct AssembledBundle {
    pub bytes: Vec<u8>,
    pub page_count: usize,
    pub issues: Vec<AssemblyIssue>,
}

/// How the import of a single document ended. A failed import is not an error of the annex.
enum DocumentOutcome {
    Imported { page_count: usize },
    Replaced(AssemblyIssue),
}

enum AnnexOutcome {
    Complete,
    Failed(ContextError),
}

/// The bundle under construction, threaded through the per-annex steps.
struct BundleState<'a> {
    output: PdfDocument,
    fonts: FontSet,
    cover_formatting: &'a FormattingOptions,
    issues: Vec<AssemblyIssue>,
}

/// Builds the bundle: the table of contents, then for every annex its cover page followed by its
/// documents, a separator page being placed between two documents of the same annex.
pub struct Assembler<R: PageRenderer, P: FontProvider> {
    renderer: R,
    font_provider: P,
    compress: bool,
}

impl<R: PageRenderer, P: FontProvider> Assembler<R, P> {
    pub fn new(renderer: R, font_provider: P) -> Self {
        Assembler {
            renderer,
            font_provider,
            compress: true,
        }
    }

    /// Whether the streams are compressed and the unused objects dropped before saving.
    pub fn with_compression(mut self, compress: bool) -> Self {
        self.compress = compress;
        self
    }

    /// Assembles the bundle. Only an invalid request, the fonts, the table of contents and the
    /// serialization can make it fail, everything else is replaced by an error page.
    pub fn assemble(&self, request: &ExportRequest) -> Result<AssembledBundle, ExportError> {
        log_stage(ExportStage::Validating);
        if request.annexes.is_empty() {
            return Err(ExportError::NoAnnexes);
        }
        let annexes: Vec<&AnnexItem> = request
            .annexes
            .iter()
            .filter(|annex| !annex.is_empty())
            .collect();
        if annexes.is_empty() {
            return Err(ExportError::NoDocuments);
        }

        let mut output = PdfDocument::new(uuid::Uuid::new_v4().simple().to_string());
        let regular = self
            .font_provider
            .load_regular()
            .and_then(|font_data| output.add_font(&font_data))
            .map_err(ExportError::Fonts)?;
        let bold = self
            .font_provider
            .load_bold()
            .and_then(|font_data| output.add_font(&font_data))
            .map_err(ExportError::Fonts)?;
        let mut state = BundleState {
            output,
            fonts: FontSet { regular, bold },
            cover_formatting: &request.cover_formatting,
            issues: Vec::new(),
        };

        log_stage(ExportStage::RenderingOpis);
        let rows: Vec<OpisRow> = annexes
            .iter()
            .map(|annex| OpisRow {
                annex_number: annex.annex_number(),
                title: annex.display_title(),
            })
            .collect();
        let opis_pages = self
            .renderer
            .render_opis(&state.fonts, &rows, &request.opis_formatting, 1)
            .map_err(ExportError::Rendering)?;
        for page in opis_pages {
            state.output.append_page(page).map_err(ExportError::Rendering)?;
        }

        for annex in annexes {
            log_stage(ExportStage::RenderingAnnex(annex.annex_number()));
            match self.assemble_annex(&mut state, annex) {
                AnnexOutcome::Complete => {}
                AnnexOutcome::Failed(error) => self.replace_annex(&mut state, annex, error),
            }
        }

        log_stage(ExportStage::Finalizing);
        let page_count = state.output.page_count();
        if page_count == 0 {
            return Err(ExportError::NoPages);
        }
        state
            .output
            .write_all()
            .map_err(ExportError::Serialization)?;
        if self.compress {
            state.output.optimize();
        }
        let bytes = state
            .output
            .save_to_bytes()
            .map_err(ExportError::Serialization)?;

        log::info!(
            "Assembled a bundle of {} pages ({} bytes, {} issues)",
            page_count,
            bytes.len(),
            state.issues.len()
        );
        Ok(AssembledBundle {
            bytes,
            page_count,
            issues: state.issues,
        })
    }

    fn assemble_annex(&self, state: &mut BundleState, annex: &AnnexItem) -> AnnexOutcome {
        match self.try_assemble_annex(state, annex) {
            Ok(()) => AnnexOutcome::Complete,
            Err(error) => AnnexOutcome::Failed(error),
        }
    }

    fn try_assemble_annex(
        &self,
        state: &mut BundleState,
        annex: &AnnexItem,
    ) -> Result<(), ContextError> {
        let cover = self.renderer.render_cover(
            &state.fonts,
            annex.annex_number(),
            &annex.display_title(),
            state.cover_formatting,
            state.output.page_count() + 1,
        )?;
        state.output.append_page(cover)?;

        let stamp = state
            .cover_formatting
            .stamp_text_for(annex.annex_number())
            .map(|stamp_text| PageStamp {
                text: normalize(&stamp_text),
                position: state.cover_formatting.stamp_position,
                font_size: state.cover_formatting.stamp_font_size.max(1.0),
                color: state.cover_formatting.theme().palette.primary,
                font: state.fonts.bold.clone(),
            });

        let document_count = annex.documents.len();
        for (index, document) in annex.documents.iter().enumerate() {
            let document_number = index + 1;
            log_stage(ExportStage::RenderingDocument(
                annex.annex_number(),
                document_number,
            ));
            if document_number > 1 {
                self.insert_separator(state, annex, document, document_number, document_count);
            }

            match self.assemble_document(state, annex, document, document_number, stamp.as_ref())? {
                DocumentOutcome::Imported { page_count } => log::debug!(
                    "Appended {} pages of {:?}",
                    page_count,
                    document.source_file_path
                ),
                DocumentOutcome::Replaced(issue) => state.issues.push(issue),
            }
        }

        Ok(())
    }

    /// Leaves the separator out if it cannot be rendered.
    fn insert_separator(
        &self,
        state: &mut BundleState,
        annex: &AnnexItem,
        document: &DocumentItem,
        document_number: usize,
        document_count: usize,
    ) {
        let separator = SeparatorPage {
            annex_number: annex.annex_number(),
            document_number,
            document_count,
            title: document.auto_title.clone(),
        };
        let page_number = state.output.page_count() + 1;
        let result = self
            .renderer
            .render_separator(&state.fonts, &separator, state.cover_formatting, page_number)
            .and_then(|page| state.output.append_page(page));

        if let Err(error) = result {
            log::error!(
                "Skipping the separator before document {} of annex {}: {}",
                document_number,
                annex.annex_number(),
                error
            );
            state.issues.push(AssemblyIssue {
                kind: IssueKind::SeparatorSkipped,
                annex_number: annex.annex_number(),
                document_number: Some(document_number),
                file_name: Some(document.source_file_path.clone()),
                message: error.to_string(),
            });
        }
    }

    /// Imports the document, or appends an error page in its place. Only a failure to produce
    /// that error page is returned as an error, which fails the whole annex.
    fn assemble_document(
        &self,
        state: &mut BundleState,
        annex: &AnnexItem,
        document: &DocumentItem,
        document_number: usize,
        stamp: Option<&PageStamp>,
    ) -> Result<DocumentOutcome, ContextError> {
        let (kind, error) = match document.file_bytes.as_deref() {
            None => (
                IssueKind::MissingContent,
                ContextError::with_context("The content of the file is not available"),
            ),
            Some(file_bytes) => match import_document(file_bytes) {
                Ok(imported_document) => {
                    let page_count = state.output.append_imported(imported_document, stamp)?;
                    return Ok(DocumentOutcome::Imported { page_count });
                }
                Err(error) => (IssueKind::ImportFailed, error),
            },
        };

        log::error!(
            "Failed to import {:?} (annex {}, document {}): {}",
            document.source_file_path,
            annex.annex_number(),
            document_number,
            error
        );
        let error_page = ErrorPage::Document {
            annex_number: annex.annex_number(),
            document_number,
            file_name: document.source_file_path.clone(),
            reason: error.to_string(),
        };
        let page = self.renderer.render_error(
            &state.fonts,
            &error_page,
            state.cover_formatting,
            state.output.page_count() + 1,
        )?;
        state.output.append_page(page)?;

        Ok(DocumentOutcome::Replaced(AssemblyIssue {
            kind,
            annex_number: annex.annex_number(),
            document_number: Some(document_number),
            file_name: Some(document.source_file_path.clone()),
            message: error.to_string(),
        }))
    }

    /// Appends the page standing for an annex which failed, the export going on with the next one.
    fn replace_annex(&self, state: &mut BundleState, annex: &AnnexItem, error: ContextError) {
        log::error!("Annex {} failed: {}", annex.annex_number(), error);
        state.issues.push(AssemblyIssue {
            kind: IssueKind::AnnexFailed,
            annex_number: annex.annex_number(),
            document_number: None,
            file_name: None,
            message: error.to_string(),
        });

        let error_page = ErrorPage::Annex {
            annex_number: annex.annex_number(),
            title: annex.display_title(),
            reason: error.to_string(),
        };
        let page_number = state.output.page_count() + 1;
        let result = self
            .renderer
            .render_error(&state.fonts, &error_page, state.cover_formatting, page_number)
            .and_then(|page| state.output.append_page(page));

        if let Err(error) = result {
            log::error!(
                "Unable to add the error page of annex {}: {}",
                annex.annex_number(),
                error
            );
            state.issues.push(AssemblyIssue {
                kind: IssueKind::ErrorPageSkipped,
                annex_number: annex.annex_number(),
                document_number: None,
                file_name: None,
                message: error.to_string(),
            });
        }
    }
}

fn log_stage(stage: ExportStage) {
    log::debug!("Export stage: {:?}", stage);
}

/// Assembles the bundle with the standard renderer, returning only its bytes.
pub fn assemble<P: FontProvider>(
    request: &ExportRequest,
    font_provider: P,
) -> Result<Vec<u8>, ExportError> {
    Assembler::new(StandardRenderer, font_provider)
        .assemble(request)
        .map(|bundle| bundle.bytes)
}

/// The name under which a bundle exported at the given time is saved.
pub fn output_file_name(timestamp: OffsetDateTime) -> String {
    let timestamp = timestamp.to_offset(time::UtcOffset::UTC);
    format!(
        "bundle-annexes-{:04}{:02}{:02}T{:02}{:02}{:02}.pdf",
        timestamp.year(),
        u8::from(timestamp.month()),
        timestamp.day(),
        timestamp.hour(),
        timestamp.minute(),
        timestamp.second(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_file_names_use_the_utc_time() {
        let timestamp = OffsetDateTime::UNIX_EPOCH
            + time::Duration::days(19_000)
            + time::Duration::seconds(3_723);
        assert_eq!(
            output_file_name(timestamp),
            "bundle-annexes-20220108T010203.pdf"
        );

        let shifted = timestamp.to_offset(time::UtcOffset::from_hms(2, 0, 0).unwrap());
        assert_eq!(output_file_name(shifted), output_file_name(timestamp));
    }
}
