use crate::error::ContextError;
use crate::model::{Alignment, FormattingOptions, LogoPosition};
use crate::pdf::{millimeters_to_points, Font, ImageXObject, PdfPage, PAGE_HEIGHT, PAGE_WIDTH};
use crate::text::{normalize, wrap_text};
use crate::theme::{ResolvedTheme, Rgb};

/// The smallest height of a row of the table of contents, in points.
pub const MIN_ROW_HEIGHT: f32 = 25.0;
/// The space between the border of a table cell and its text.
pub const CELL_PADDING: f32 = 8.0;
/// The line height of wrapped text, relative to the font size.
pub const LINE_SPACING: f32 = 1.2;

const FOOTER_FONT_SIZE: f32 = 10.0;
const FOOTER_BAND: f32 = 20.0;
const TITLE_GAP: f32 = 25.0;
const HEADING_GAP: f32 = 30.0;
const LOGO_GAP: f32 = 20.0;
const ERROR_COLOR: Rgb = [0.7, 0.1, 0.1];

/// The regular and bold fonts registered in the bundle.
#[derive(Debug, Clone)]
pub struct FontSet {
    pub regular: Font,
    pub bold: Font,
}

impl FontSet {
    pub fn body(&self, bold: bool) -> &Font {
        if bold {
            &self.bold
        } else {
            &self.regular
        }
    }
}

/// One row of the table of contents.
#[derive(Debug, Clone, PartialEq)]
pub struct OpisRow {
    pub annex_number: usize,
    pub title: String,
}

/// The page placed before every document of an annex but the first one.
#[derive(Debug, Clone, PartialEq)]
pub struct SeparatorPage {
    pub annex_number: usize,
    /// The 1-based position of the document in its annex.
    pub document_number: usize,
    pub document_count: usize,
    pub title: String,
}

/// The placeholder which takes the place of content that could not be produced.
#[derive(Debug, Clone, PartialEq)]
pub enum ErrorPage {
    /// A document of the annex could not be imported.
    Document {
        annex_number: usize,
        document_number: usize,
        file_name: String,
        reason: String,
    },
    /// The annex as a whole failed after its cover was attempted.
    Annex {
        annex_number: usize,
        title: String,
        reason: String,
    },
}

/// Draws the synthesized pages of the bundle. Page numbers are the 1-based positions of the pages
/// in the bundle, drawn in the footer when the formatting asks for them.
pub trait PageRenderer {
    /// Renders the table of contents, which spans as many pages as its rows need.
    fn render_opis(
        &self,
        fonts: &FontSet,
        rows: &[OpisRow],
        formatting: &FormattingOptions,
        first_page_number: usize,
    ) -> Result<Vec<PdfPage>, ContextError>;

    fn render_cover(
        &self,
        fonts: &FontSet,
        annex_number: usize,
        title: &str,
        formatting: &FormattingOptions,
        page_number: usize,
    ) -> Result<PdfPage, ContextError>;

    fn render_separator(
        &self,
        fonts: &FontSet,
        separator: &SeparatorPage,
        formatting: &FormattingOptions,
        page_number: usize,
    ) -> Result<PdfPage, ContextError>;

    fn render_error(
        &self,
        fonts: &FontSet,
        error_page: &ErrorPage,
        formatting: &FormattingOptions,
        page_number: usize,
    ) -> Result<PdfPage, ContextError>;
}

/// The content area of an A4 page once the margins are removed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageGeometry {
    pub width: f32,
    pub height: f32,
    pub margin_top: f32,
    pub margin_right: f32,
    pub margin_bottom: f32,
    pub margin_left: f32,
}

impl PageGeometry {
    /// Converts the margins to points. Each margin is clamped to a third of the page so that some
    /// content area always remains.
    pub fn from_formatting(formatting: &FormattingOptions) -> Self {
        let clamp = |millimeters: f32, extent: f32| {
            millimeters_to_points(millimeters.max(0.0)).min(extent / 3.0)
        };
        PageGeometry {
            width: PAGE_WIDTH,
            height: PAGE_HEIGHT,
            margin_top: clamp(formatting.margin_top, PAGE_HEIGHT),
            margin_right: clamp(formatting.margin_right, PAGE_WIDTH),
            margin_bottom: clamp(formatting.margin_bottom, PAGE_HEIGHT),
            margin_left: clamp(formatting.margin_left, PAGE_WIDTH),
        }
    }

    pub fn content_left(&self) -> f32 {
        self.margin_left
    }

    pub fn content_right(&self) -> f32 {
        self.width - self.margin_right
    }

    pub fn content_top(&self) -> f32 {
        self.height - self.margin_top
    }

    pub fn content_bottom(&self) -> f32 {
        self.margin_bottom
    }

    pub fn content_width(&self) -> f32 {
        self.content_right() - self.content_left()
    }

    pub fn center_x(&self) -> f32 {
        (self.content_left() + self.content_right()) / 2.0
    }

    pub fn center_y(&self) -> f32 {
        (self.content_bottom() + self.content_top()) / 2.0
    }
}

/// The dimensions of the table of contents, derived from its formatting.
#[derive(Debug, Clone, Copy)]
pub struct OpisLayout {
    pub geometry: PageGeometry,
    pub font_size: f32,
    pub table_left: f32,
    pub number_column_width: f32,
    pub title_column_width: f32,
}

impl OpisLayout {
    pub fn new(formatting: &FormattingOptions) -> Self {
        let geometry = PageGeometry::from_formatting(formatting);
        let content_width = geometry.content_width();
        let number_column_width = content_width * 0.3;
        let title_column_width = content_width * 0.6;
        OpisLayout {
            geometry,
            font_size: formatting.font_size.max(1.0),
            table_left: geometry.center_x() - (number_column_width + title_column_width) / 2.0,
            number_column_width,
            title_column_width,
        }
    }

    /// Wraps an annex title into the lines of its title cell.
    pub fn title_lines(&self, font: &Font, title: &str) -> Vec<String> {
        wrap_text(
            &normalize(title),
            self.title_column_width - 2.0 * CELL_PADDING,
            |line| font.text_width(line, self.font_size),
        )
    }

    pub fn row_height(&self, line_count: usize) -> f32 {
        let text_height = line_count.max(1) as f32 * self.font_size * LINE_SPACING;
        (text_height + 2.0 * CELL_PADDING).max(MIN_ROW_HEIGHT)
    }

    fn table_width(&self) -> f32 {
        self.number_column_width + self.title_column_width
    }
}

/// The renderer of the bundle, drawing with the bundle's fonts on A4 pages.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardRenderer;

impl PageRenderer for StandardRenderer {
    fn render_opis(
        &self,
        fonts: &FontSet,
        rows: &[OpisRow],
        formatting: &FormattingOptions,
        first_page_number: usize,
    ) -> Result<Vec<PdfPage>, ContextError> {
        let layout = OpisLayout::new(formatting);
        let geometry = layout.geometry;
        let theme = formatting.theme();
        let body_font = fonts.body(formatting.bold);
        let bottom_limit = geometry.content_bottom()
            + if formatting.show_page_numbers {
                FOOTER_BAND
            } else {
                0.0
            };

        let mut pages = Vec::new();
        let mut page = new_page(&theme);
        let title_size = layout.font_size * 1.5;
        let title_baseline = geometry.content_top() - title_size;
        write_centered(
            &mut page,
            &fonts.bold,
            title_size,
            theme.palette.primary,
            "OPIS",
            geometry.center_x(),
            title_baseline,
        );
        let mut row_top = draw_opis_header(
            &mut page,
            fonts,
            &layout,
            &theme,
            title_baseline - TITLE_GAP,
        );
        let mut rows_on_page = 0;

        for row in rows {
            let lines = layout.title_lines(body_font, &row.title);
            let row_height = layout.row_height(lines.len());

            // A row never straddles two pages, unless it is taller than a whole page
            if row_top - row_height < bottom_limit && rows_on_page > 0 {
                finish_page(
                    &mut page,
                    fonts,
                    &geometry,
                    &theme,
                    formatting,
                    first_page_number + pages.len(),
                );
                pages.push(std::mem::replace(&mut page, new_page(&theme)));
                row_top =
                    draw_opis_header(&mut page, fonts, &layout, &theme, geometry.content_top());
                rows_on_page = 0;
            }

            draw_opis_row(
                &mut page,
                body_font,
                &layout,
                &theme,
                formatting.alignment,
                row.annex_number,
                &lines,
                row_top,
            );
            row_top -= row_height;
            rows_on_page += 1;
        }

        finish_page(
            &mut page,
            fonts,
            &geometry,
            &theme,
            formatting,
            first_page_number + pages.len(),
        );
        pages.push(page);
        log::debug!(
            "Rendered the table of contents with {} rows on {} pages",
            rows.len(),
            pages.len()
        );

        Ok(pages)
    }

    fn render_cover(
        &self,
        fonts: &FontSet,
        annex_number: usize,
        title: &str,
        formatting: &FormattingOptions,
        page_number: usize,
    ) -> Result<PdfPage, ContextError> {
        let geometry = PageGeometry::from_formatting(formatting);
        let theme = formatting.theme();
        let palette = theme.palette;
        let mut page = new_page(&theme);

        let heading = normalize(&formatting.heading_text(annex_number));
        let heading_size = formatting.heading_size().max(1.0);
        let font_size = formatting.font_size.max(1.0);
        let body_font = fonts.body(formatting.bold);
        let line_height = font_size * 1.4;

        let logo = formatting
            .logo_file
            .as_deref()
            .and_then(|logo_bytes| match ImageXObject::from_bytes(logo_bytes) {
                Ok(logo) => Some(logo),
                Err(error) => {
                    log::warn!("Skipping the logo of the cover pages: {}", error);
                    None
                }
            });
        let logo_width = formatting.logo_size.max(1.0);
        let logo_height = logo
            .as_ref()
            .map(|logo| logo_width * logo.aspect_ratio())
            .unwrap_or(0.0);
        let side_logo = logo.is_some()
            && matches!(
                formatting.logo_position,
                LogoPosition::Left | LogoPosition::Right
            );

        let mut wrap_width = (geometry.width * 0.8).min(geometry.content_width());
        if side_logo {
            wrap_width = (wrap_width - logo_width - LOGO_GAP).max(geometry.content_width() * 0.3);
        }
        let lines = wrap_text(&normalize(title), wrap_width, |line| {
            body_font.text_width(line, font_size)
        });

        let text_block_height = heading_size + HEADING_GAP + lines.len() as f32 * line_height;
        let stacked_logo_height = match (&logo, formatting.logo_position) {
            (Some(_), LogoPosition::Top | LogoPosition::Bottom) => logo_height + LOGO_GAP,
            _ => 0.0,
        };
        let block_top = geometry.center_y() + (text_block_height + stacked_logo_height) / 2.0;

        // The horizontal center of the heading and title, shifted away from a side logo
        let column_center = if side_logo {
            let block_left = geometry.center_x() - (logo_width + LOGO_GAP + wrap_width) / 2.0;
            match formatting.logo_position {
                LogoPosition::Left => block_left + logo_width + LOGO_GAP + wrap_width / 2.0,
                _ => block_left + wrap_width / 2.0,
            }
        } else {
            geometry.center_x()
        };

        let text_top = match formatting.logo_position {
            LogoPosition::Top => block_top - stacked_logo_height,
            _ => block_top,
        };
        let heading_baseline = text_top - heading_size;
        write_centered(
            &mut page,
            &fonts.bold,
            heading_size,
            palette.primary,
            &heading,
            column_center,
            heading_baseline,
        );

        let mut baseline = heading_baseline - HEADING_GAP - font_size * 0.4;
        // The alignment only applies to the table of contents, cover titles are always centered
        for line in &lines {
            write_centered(
                &mut page,
                body_font,
                font_size,
                palette.text,
                line,
                column_center,
                baseline,
            );
            baseline -= line_height;
        }

        if let Some(logo) = logo {
            let logo_x = match formatting.logo_position {
                LogoPosition::Top | LogoPosition::Bottom => geometry.center_x() - logo_width / 2.0,
                LogoPosition::Left => column_center - wrap_width / 2.0 - LOGO_GAP - logo_width,
                LogoPosition::Right => column_center + wrap_width / 2.0 + LOGO_GAP,
            };
            let logo_y = match formatting.logo_position {
                LogoPosition::Top => block_top - logo_height,
                LogoPosition::Bottom => block_top - text_block_height - stacked_logo_height,
                LogoPosition::Left | LogoPosition::Right => {
                    block_top - text_block_height / 2.0 - logo_height / 2.0
                }
            };
            page.draw_image(logo, [logo_x, logo_y, logo_width, logo_height]);
        }

        finish_page(&mut page, fonts, &geometry, &theme, formatting, page_number);
        Ok(page)
    }

    fn render_separator(
        &self,
        fonts: &FontSet,
        separator: &SeparatorPage,
        formatting: &FormattingOptions,
        page_number: usize,
    ) -> Result<PdfPage, ContextError> {
        let geometry = PageGeometry::from_formatting(formatting);
        let theme = formatting.theme();
        let palette = theme.palette;
        let mut page = new_page(&theme);
        let center_x = geometry.center_x();

        let heading = format!(
            "ANEXA {} - DOCUMENTUL {}",
            separator.annex_number, separator.document_number
        );
        let heading_size = 22.0;
        let mut baseline = geometry.center_y() + 60.0;
        write_centered(
            &mut page,
            &fonts.bold,
            heading_size,
            palette.primary,
            &heading,
            center_x,
            baseline,
        );

        let rule_width = geometry.content_width() * 0.5;
        baseline -= 20.0;
        page.fill_rectangle(
            [center_x - rule_width / 2.0, baseline, rule_width, 2.0],
            palette.secondary,
        );

        let font_size = formatting.font_size.max(1.0);
        let body_font = fonts.body(formatting.bold);
        baseline -= 20.0 + font_size;
        let wrap_width = (geometry.width * 0.8).min(geometry.content_width());
        for line in wrap_text(&normalize(&separator.title), wrap_width, |line| {
            body_font.text_width(line, font_size)
        }) {
            write_centered(
                &mut page,
                body_font,
                font_size,
                palette.text,
                &line,
                center_x,
                baseline,
            );
            baseline -= font_size * 1.4;
        }

        baseline -= 10.0;
        let counter = format!(
            "{} din {}",
            separator.document_number, separator.document_count
        );
        write_centered(
            &mut page,
            &fonts.regular,
            12.0,
            palette.accent,
            &counter,
            center_x,
            baseline,
        );

        finish_page(&mut page, fonts, &geometry, &theme, formatting, page_number);
        Ok(page)
    }

    fn render_error(
        &self,
        fonts: &FontSet,
        error_page: &ErrorPage,
        formatting: &FormattingOptions,
        page_number: usize,
    ) -> Result<PdfPage, ContextError> {
        let geometry = PageGeometry::from_formatting(formatting);
        let theme = formatting.theme();
        let palette = theme.palette;
        let mut page = new_page(&theme);
        let center_x = geometry.center_x();
        let wrap_width = geometry.content_width() * 0.8;

        let (message, details, reason) = match error_page {
            ErrorPage::Document {
                annex_number,
                document_number,
                file_name,
                reason,
            } => (
                "Documentul nu a putut fi incarcat".to_string(),
                vec![
                    format!("Fisier: {file_name}"),
                    format!("Anexa {annex_number}, documentul {document_number}"),
                ],
                reason,
            ),
            ErrorPage::Annex {
                annex_number,
                title,
                reason,
            } => (
                format!("Anexa {annex_number} nu a putut fi procesata"),
                vec![title.clone()],
                reason,
            ),
        };

        let mut baseline = geometry.center_y() + 80.0;
        write_centered(
            &mut page,
            &fonts.bold,
            24.0,
            ERROR_COLOR,
            "EROARE",
            center_x,
            baseline,
        );
        baseline -= 40.0;
        write_centered(
            &mut page,
            &fonts.bold,
            14.0,
            palette.text,
            &normalize(&message),
            center_x,
            baseline,
        );

        baseline -= 30.0;
        for detail in &details {
            for line in wrap_text(&normalize(detail), wrap_width, |line| {
                fonts.regular.text_width(line, 12.0)
            }) {
                write_centered(
                    &mut page,
                    &fonts.regular,
                    12.0,
                    palette.text,
                    &line,
                    center_x,
                    baseline,
                );
                baseline -= 16.0;
            }
        }

        baseline -= 14.0;
        for line in wrap_text(&normalize(reason), wrap_width, |line| {
            fonts.regular.text_width(line, 10.0)
        }) {
            write_centered(
                &mut page,
                &fonts.regular,
                10.0,
                palette.accent,
                &line,
                center_x,
                baseline,
            );
            baseline -= 13.0;
        }

        finish_page(&mut page, fonts, &geometry, &theme, formatting, page_number);
        Ok(page)
    }
}

fn new_page(theme: &ResolvedTheme) -> PdfPage {
    let mut page = PdfPage::a4();
    if theme.has_background() {
        page.fill_rectangle([0.0, 0.0, page.width, page.height], theme.palette.background);
    }
    page
}

/// Draws the footer of the page, if the formatting shows the page numbers.
fn finish_page(
    page: &mut PdfPage,
    fonts: &FontSet,
    geometry: &PageGeometry,
    theme: &ResolvedTheme,
    formatting: &FormattingOptions,
    page_number: usize,
) {
    if !formatting.show_page_numbers {
        return;
    }
    let baseline = (geometry.content_bottom() / 2.0).max(15.0);
    write_centered(
        page,
        &fonts.regular,
        FOOTER_FONT_SIZE,
        theme.palette.accent,
        &page_number.to_string(),
        geometry.width / 2.0,
        baseline,
    );
}

fn write_centered(
    page: &mut PdfPage,
    font: &Font,
    font_size: f32,
    color: Rgb,
    text: &str,
    center_x: f32,
    baseline: f32,
) {
    let width = font.text_width(text, font_size);
    page.write_text(font, font_size, color, text, [center_x - width / 2.0, baseline]);
}

fn aligned_x(alignment: Alignment, left: f32, available_width: f32, text_width: f32) -> f32 {
    match alignment {
        Alignment::Left => left,
        Alignment::Center => left + (available_width - text_width) / 2.0,
        Alignment::Right => left + available_width - text_width,
    }
}

/// Draws the header row of the table and returns the top of the first row below it.
fn draw_opis_header(
    page: &mut PdfPage,
    fonts: &FontSet,
    layout: &OpisLayout,
    theme: &ResolvedTheme,
    header_top: f32,
) -> f32 {
    let palette = theme.palette;
    let header_height = layout.row_height(1);
    let header_bottom = header_top - header_height;
    let table_rectangle = [
        layout.table_left,
        header_bottom,
        layout.table_width(),
        header_height,
    ];
    page.fill_rectangle(table_rectangle, palette.primary);
    page.stroke_rectangle(table_rectangle, palette.secondary, 0.5);

    let baseline = header_top - CELL_PADDING - layout.font_size;
    let label_color = palette.background;
    write_centered(
        page,
        &fonts.bold,
        layout.font_size,
        label_color,
        "Nr. crt.",
        layout.table_left + layout.number_column_width / 2.0,
        baseline,
    );
    write_centered(
        page,
        &fonts.bold,
        layout.font_size,
        label_color,
        "Descriere",
        layout.table_left + layout.number_column_width + layout.title_column_width / 2.0,
        baseline,
    );

    header_bottom
}

#[allow(clippy::too_many_arguments)]
fn draw_opis_row(
    page: &mut PdfPage,
    font: &Font,
    layout: &OpisLayout,
    theme: &ResolvedTheme,
    alignment: Alignment,
    annex_number: usize,
    lines: &[String],
    row_top: f32,
) {
    let palette = theme.palette;
    let row_height = layout.row_height(lines.len());
    let row_bottom = row_top - row_height;
    let title_left = layout.table_left + layout.number_column_width;

    page.stroke_rectangle(
        [
            layout.table_left,
            row_bottom,
            layout.number_column_width,
            row_height,
        ],
        palette.secondary,
        0.5,
    );
    page.stroke_rectangle(
        [title_left, row_bottom, layout.title_column_width, row_height],
        palette.secondary,
        0.5,
    );

    let first_baseline = row_top - CELL_PADDING - layout.font_size;
    write_centered(
        page,
        font,
        layout.font_size,
        palette.text,
        &format!("Anexa nr. {annex_number}"),
        layout.table_left + layout.number_column_width / 2.0,
        first_baseline,
    );

    let available_width = layout.title_column_width - 2.0 * CELL_PADDING;
    for (index, line) in lines.iter().enumerate() {
        let x = aligned_x(
            alignment,
            title_left + CELL_PADDING,
            available_width,
            font.text_width(line, layout.font_size),
        );
        let baseline = first_baseline - index as f32 * layout.font_size * LINE_SPACING;
        page.write_text(font, layout.font_size, palette.text, line, [x, baseline]);
    }
}
