use lopdf::{content::Operation, Object, ObjectId, StringFormat};
use owned_ttf_parser::{AsFaceRef as _, Face, OwnedFace};
use std::{
    collections::{BTreeMap, HashMap},
    io::BufWriter,
    mem,
    sync::Arc,
};
use time::OffsetDateTime;
use unicode_normalization::UnicodeNormalization as _;

use crate::error::ContextError;
use crate::fonts::{FontData, StandardFont};
use crate::import::ImportedDocument;
use crate::model::StampPosition;
use crate::text;
use crate::theme::Rgb;

/// The width of an A4 page in points.
pub const PAGE_WIDTH: f32 = 595.28;
/// The height of an A4 page in points.
pub const PAGE_HEIGHT: f32 = 841.89;

/// The name under which the stamp font is added to the resources of the imported pages.
const STAMP_FONT_NAME: &str = "AnnexrStamp";

/// The (insofar) relevant vertical metrics of a font.
#[derive(Clone, Copy, Debug, Default)]
pub struct FontMetrics {
    /// The ascent of the font.
    pub ascent: i16,
    /// The descent of the font.
    pub descent: i16,
    /// The number of units per em of the font.
    pub units_per_em: u16,
}

/// The (insofar) relevant metrics associated to a single glyph of a font.
#[derive(Clone, Copy, Debug, Default)]
pub struct GlyphMetrics {
    /// The width of the glyph.
    pub width: u32,
    /// The height of the glyph.
    pub height: u32,
}

/// A font face loaded from a TTF font, together with its measure of units per em.
#[derive(Clone, Debug)]
struct TtfFontFace {
    /// The underlying font face which is represented through the `ttf_parser` crate.
    inner: Arc<OwnedFace>,
    /// The number of units per em of the font face.
    units_per_em: u16,
}

impl TtfFontFace {
    /// Constructs a font face from the raw data of the TTF font file.
    fn from_bytes(data: &[u8]) -> Result<Self, ContextError> {
        let face = OwnedFace::from_vec(data.to_vec(), 0)
            .map_err(|error| ContextError::with_error("Failed to parse font", &error))?;
        let units_per_em = face.as_face_ref().units_per_em();

        Ok(Self {
            inner: Arc::new(face),
            units_per_em,
        })
    }

    fn face(&self) -> &Face<'_> {
        self.inner.as_face_ref()
    }

    fn font_metrics(&self) -> FontMetrics {
        FontMetrics {
            ascent: self.face().ascender(),
            descent: self.face().descender(),
            units_per_em: self.units_per_em,
        }
    }

    fn glyph_id(&self, codepoint: char) -> Option<u16> {
        self.face()
            .glyph_index(codepoint)
            .map(|glyph_id| glyph_id.0)
    }

    /// The horizontal advance of a character in font units, zero when the font lacks it.
    fn advance_width(&self, codepoint: char) -> u16 {
        self.face()
            .glyph_index(codepoint)
            .and_then(|glyph_id| self.face().glyph_hor_advance(glyph_id))
            .unwrap_or(0)
    }

    /// Retrieve the mapping between the glyph IDs and the characters (codepoints), that
    /// specifically contains exactly the number of unicode glyphs present in the font.
    fn glyph_ids(&self) -> HashMap<u16, char> {
        let font_subtables = self.face().tables().cmap.map(|cmap| {
            cmap.subtables
                .into_iter()
                .filter(|font_subtable| font_subtable.is_unicode())
        });
        let Some(font_subtables) = font_subtables else {
            return HashMap::new();
        };

        let mut gid_to_codepoint_map =
            HashMap::with_capacity(self.face().number_of_glyphs().into());
        for font_subtable in font_subtables {
            font_subtable.codepoints(|codepoint| {
                if let Ok(character) = char::try_from(codepoint) {
                    // Only the positive glyph indices are meaningful, zero being the missing glyph
                    if let Some(glyph_index) = font_subtable
                        .glyph_index(codepoint)
                        .filter(|index| index.0 > 0)
                    {
                        gid_to_codepoint_map
                            .entry(glyph_index.0)
                            .or_insert(character);
                    }
                }
            })
        }

        gid_to_codepoint_map
    }

    fn glyph_count(&self) -> u16 {
        self.face().number_of_glyphs()
    }

    fn glyph_metrics(&self, glyph_id: u16) -> Option<GlyphMetrics> {
        let glyph_id = owned_ttf_parser::GlyphId(glyph_id);

        let width = self.face().glyph_hor_advance(glyph_id)? as u32;
        // The height is corrected by the descender, which holds for horizontally laid out fonts
        let height = self
            .face()
            .glyph_bounding_box(glyph_id)
            .map(|bounding_box| bounding_box.y_max - bounding_box.y_min - self.face().descender())
            .unwrap_or(1000) as u32;

        Some(GlyphMetrics { width, height })
    }
}

#[derive(Debug, Clone)]
enum FontFace {
    Standard(StandardFont),
    TrueType {
        /// The byte data the font was loaded from.
        bytes: Arc<Vec<u8>>,
        ttf_face: TtfFontFace,
    },
}

/// A font registered into a `PdfDocument`. It measures and encodes the text drawn with it and
/// is referenced by its identifier in the resources of the synthesized pages.
#[derive(Debug, Clone)]
pub struct Font {
    /// The identifier of the font face, which is also its name in the page resources.
    face_identifier: String,
    /// The object the font dictionary is written to when the document is finalized.
    object_id: ObjectId,
    face: FontFace,
}

impl Font {
    pub fn identifier(&self) -> &str {
        &self.face_identifier
    }

    /// The width of the text in points when drawn at the given font size.
    pub fn text_width(&self, text: &str, font_size: f32) -> f32 {
        match &self.face {
            FontFace::Standard(standard_font) => {
                let thousandths: u32 = text
                    .nfc()
                    .map(|character| standard_font.character_width(character) as u32)
                    .sum();
                thousandths as f32 * font_size / 1000.0
            }
            FontFace::TrueType { ttf_face, .. } => {
                let font_units: u32 = text
                    .nfc()
                    .map(|character| ttf_face.advance_width(character) as u32)
                    .sum();
                font_units as f32 * font_size / ttf_face.units_per_em as f32
            }
        }
    }

    /// Converts the text into the string operand of a `Tj` operator for this font.
    fn encode_text(&self, text: &str) -> Object {
        match &self.face {
            FontFace::Standard(_) => {
                Object::String(text::encode_win_ansi(text), StringFormat::Literal)
            }
            FontFace::TrueType { ttf_face, .. } => {
                let mut glyph_id_bytes = Vec::<u8>::new();
                for character in text.nfc() {
                    if let Some(glyph_id) = ttf_face.glyph_id(character) {
                        glyph_id_bytes.extend_from_slice(&glyph_id.to_be_bytes());
                    } else {
                        log::warn!("Unable to find the character {:?} in the font", character)
                    }
                }
                Object::String(glyph_id_bytes, StringFormat::Hexadecimal)
            }
        }
    }

    /// Builds the font dictionary, inserting the auxiliary objects it refers to into the document.
    fn insert_into_document(&self, inner_document: &mut lopdf::Document) -> lopdf::Dictionary {
        use lopdf::Object::*;

        match &self.face {
            FontFace::Standard(standard_font) => lopdf::Dictionary::from_iter(vec![
                ("Type", Name("Font".into())),
                ("Subtype", Name("Type1".into())),
                ("BaseFont", Name(standard_font.base_font_name().into())),
                ("Encoding", Name("WinAnsiEncoding".into())),
            ]),
            FontFace::TrueType { bytes, ttf_face } => {
                self.insert_true_type_into_document(inner_document, bytes, ttf_face)
            }
        }
    }

    /// Embeds a TrueType font as a `Type0` font with the `Identity-H` encoding, so that the text is
    /// written as a sequence of glyph IDs.
    fn insert_true_type_into_document(
        &self,
        inner_document: &mut lopdf::Document,
        bytes: &[u8],
        ttf_face: &TtfFontFace,
    ) -> lopdf::Dictionary {
        use lopdf::Object::*;
        let face_metrics = ttf_face.font_metrics();

        let font_stream = lopdf::Stream::new(
            lopdf::Dictionary::from_iter(vec![("Length1", Integer(bytes.len() as i64))]),
            bytes.to_vec(),
        )
        .with_compression(false);

        let mut font_vector: Vec<(::std::string::String, Object)> = vec![
            ("Type".into(), Name("Font".into())),
            ("Subtype".into(), Name("Type0".into())),
            (
                "BaseFont".into(),
                Name(self.face_identifier.clone().into_bytes()),
            ),
            ("Encoding".into(), Name("Identity-H".into())),
        ];

        let mut font_descriptor_vector: Vec<(::std::string::String, Object)> = vec![
            ("Type".into(), Name("FontDescriptor".into())),
            (
                "FontName".into(),
                Name(self.face_identifier.clone().into_bytes()),
            ),
            ("Ascent".into(), Integer(i64::from(face_metrics.ascent))),
            ("Descent".into(), Integer(i64::from(face_metrics.descent))),
            ("CapHeight".into(), Integer(i64::from(face_metrics.ascent))),
            ("ItalicAngle".into(), Integer(0)),
            // Nonsymbolic, the font uses the standard Latin character set or a subset of it
            ("Flags".into(), Integer(32)),
            ("StemV".into(), Integer(80)),
        ];

        let mut maximum_character_height = 0;
        let mut total_width = 0;
        // Glyph ID to the character, its width and its height
        let mut gid_to_glyph_properties_map = BTreeMap::<u32, (u32, u32, u32)>::new();
        gid_to_glyph_properties_map.insert(0, (0, 1000, 1000));

        for (glyph_id, character) in ttf_face.glyph_ids() {
            if let Some(glyph_metrics) = ttf_face.glyph_metrics(glyph_id) {
                maximum_character_height = maximum_character_height.max(glyph_metrics.height);
                total_width += glyph_metrics.width;
                gid_to_glyph_properties_map.insert(
                    glyph_id as u32,
                    (character as u32, glyph_metrics.width, glyph_metrics.height),
                );
            }
        }

        // The `ToUnicode` ranges must share their high byte and hold at most 100 glyphs each
        let mut current_first_bit: u16 = 0;
        let mut all_gid_to_character_blocks = Vec::new();
        let mut current_gid_to_character_block = Vec::new();
        for (glyph_id, (character, _glyph_width, _glyph_height)) in
            gid_to_glyph_properties_map.iter()
        {
            if (*glyph_id >> 8) as u16 != current_first_bit
                || current_gid_to_character_block.len() >= 100
            {
                all_gid_to_character_blocks.push(mem::take(&mut current_gid_to_character_block));
                current_first_bit = (*glyph_id >> 8) as u16;
            }
            current_gid_to_character_block.push((*glyph_id, *character));
        }
        all_gid_to_character_blocks.push(current_gid_to_character_block);

        let cid_to_unicode_map =
            generate_cid_to_unicode_map(&self.face_identifier, all_gid_to_character_blocks);
        let cid_to_unicode_map_stream = lopdf::Stream::new(
            lopdf::Dictionary::new(),
            cid_to_unicode_map.as_bytes().to_vec(),
        );
        let cid_to_unicode_map_stream_id = inner_document.add_object(cid_to_unicode_map_stream);

        // The widths are written as runs of consecutive glyph IDs, `20 [21 99 34]` meaning that
        // the glyphs 20, 21 and 22 have respectively the widths 21, 99 and 34
        let mut width_objects = Vec::<Object>::new();
        let mut current_lesser_glyph_id = 0;
        let mut current_upper_gid = 0;
        let mut current_widths_vector = Vec::<Object>::new();
        // Widths are expressed in thousandths of an em
        let percentage_font_scaling = 1000.0 / (face_metrics.units_per_em as f32);

        for glyph_id in 0..ttf_face.glyph_count() {
            let Some(GlyphMetrics { width, .. }) = ttf_face.glyph_metrics(glyph_id) else {
                log::warn!(
                    "Glyph ID {} of the font {:?} has no width, skipping it",
                    glyph_id,
                    self.face_identifier
                );
                continue;
            };
            if glyph_id != current_upper_gid {
                width_objects.push(Integer(current_lesser_glyph_id as i64));
                width_objects.push(Array(mem::take(&mut current_widths_vector)));
                current_lesser_glyph_id = glyph_id;
            }
            current_widths_vector.push(Integer((width as f32 * percentage_font_scaling) as i64));
            current_upper_gid = glyph_id + 1;
        }
        width_objects.push(Integer(current_lesser_glyph_id as i64));
        width_objects.push(Array(mem::take(&mut current_widths_vector)));

        let mut font_descriptors = lopdf::Dictionary::from_iter(vec![
            ("Type", Name("Font".into())),
            ("Subtype", Name("CIDFontType2".into())),
            ("BaseFont", Name(self.face_identifier.clone().into())),
            (
                "CIDSystemInfo",
                Dictionary(lopdf::Dictionary::from_iter(vec![
                    ("Registry", String("Adobe".into(), StringFormat::Literal)),
                    ("Ordering", String("Identity".into(), StringFormat::Literal)),
                    ("Supplement", Integer(0)),
                ])),
            ),
            ("W", Array(width_objects)),
            ("DW", Integer(1000)),
        ]);

        let font_bounding_box = vec![
            Integer(0),
            Integer(maximum_character_height as i64),
            Integer(total_width as i64),
            Integer(maximum_character_height as i64),
        ];
        font_descriptor_vector.push((
            "FontFile2".into(),
            Reference(inner_document.add_object(font_stream)),
        ));
        // Optional in PDF, but Adobe Reader needs it
        font_descriptor_vector.push(("FontBBox".into(), Array(font_bounding_box)));

        let font_descriptor_vector_id =
            inner_document.add_object(lopdf::Dictionary::from_iter(font_descriptor_vector));
        font_descriptors.set("FontDescriptor", Reference(font_descriptor_vector_id));

        font_vector.push((
            "DescendantFonts".into(),
            Array(vec![Dictionary(font_descriptors)]),
        ));
        font_vector.push(("ToUnicode".into(), Reference(cid_to_unicode_map_stream_id)));

        lopdf::Dictionary::from_iter(font_vector)
    }
}

/// The low-level image representation for a PDF document. The pixels are stored decoded,
/// the stream being compressed together with the rest of the document.
#[derive(Debug, Clone)]
pub struct ImageXObject {
    /// Width of the image in pixels.
    pub width: u32,
    /// Height of the image in pixels.
    pub height: u32,
    /// Bits per color component, always 8 for the decoded images.
    pub bits_per_component: u16,
    /// Should the image be interpolated when scaled?
    pub interpolate: bool,
    /// The RGB samples of the image.
    pub image_data: Vec<u8>,
    /// The alpha channel of the image, written as a soft mask. `None` when the image is opaque.
    pub soft_mask: Option<Vec<u8>>,
}

impl ImageXObject {
    /// Decodes a PNG or a JPEG image. Any other format is refused.
    pub fn from_bytes(image_bytes: &[u8]) -> Result<Self, ContextError> {
        let image_format = image::guess_format(image_bytes).map_err(|error| {
            ContextError::with_error("Unable to recognize the image format", &error)
        })?;
        if !matches!(image_format, image::ImageFormat::Png | image::ImageFormat::Jpeg) {
            return Err(ContextError::with_context(format!(
                "The image format {:?} is not supported, only PNG and JPEG images are",
                image_format
            )));
        }

        let image = image::load_from_memory_with_format(image_bytes, image_format)
            .map_err(|error| ContextError::with_error("Failed to decode the image", &error))?;
        if image.width() == 0 || image.height() == 0 {
            return Err(ContextError::with_context("The image is empty"));
        }

        let soft_mask = image.color().has_alpha().then(|| {
            image
                .to_rgba8()
                .pixels()
                .map(|pixel| pixel.0[3])
                .collect::<Vec<u8>>()
        });

        Ok(ImageXObject {
            width: image.width(),
            height: image.height(),
            bits_per_component: 8,
            interpolate: true,
            image_data: image.to_rgb8().into_raw(),
            soft_mask,
        })
    }

    /// The height over the width of the image.
    pub fn aspect_ratio(&self) -> f32 {
        self.height as f32 / self.width as f32
    }

    /// Inserts the image, and its soft mask if any, into the document.
    fn insert_into_document(self, inner_document: &mut lopdf::Document) -> ObjectId {
        use lopdf::Object::*;

        let image_dictionary = |color_space: &str| {
            lopdf::Dictionary::from_iter(vec![
                ("Type", Name("XObject".into())),
                ("Subtype", Name("Image".into())),
                ("Width", Integer(self.width as i64)),
                ("Height", Integer(self.height as i64)),
                ("ColorSpace", Name(color_space.into())),
                ("BitsPerComponent", Integer(self.bits_per_component as i64)),
                ("Interpolate", Boolean(self.interpolate)),
            ])
        };

        let mut dictionary = image_dictionary("DeviceRGB");
        if let Some(soft_mask) = &self.soft_mask {
            let soft_mask_id = inner_document.add_object(lopdf::Stream::new(
                image_dictionary("DeviceGray"),
                soft_mask.clone(),
            ));
            dictionary.set("SMask", Reference(soft_mask_id));
        }

        inner_document.add_object(lopdf::Stream::new(dictionary, self.image_data))
    }
}

/// Named reference to an `XObject`.
#[derive(Debug, Clone, PartialEq, PartialOrd)]
pub struct XObjectReference(String);

impl XObjectReference {
    /// Creates a new reference for an `XObject` from a number.
    pub fn new(index: usize) -> Self {
        Self(format!("X{index}"))
    }
}

/// A synthesized page: its size in points, the drawing operations and the images they refer to.
/// The fonts are shared by all the synthesized pages of a document.
#[derive(Debug, Clone)]
pub struct PdfPage {
    pub width: f32,
    pub height: f32,
    operations: Vec<Operation>,
    images: Vec<(XObjectReference, ImageXObject)>,
}

impl PdfPage {
    pub fn new(width: f32, height: f32) -> Self {
        PdfPage {
            width,
            height,
            operations: Vec::new(),
            images: Vec::new(),
        }
    }

    /// Creates an A4 page.
    pub fn a4() -> Self {
        Self::new(PAGE_WIDTH, PAGE_HEIGHT)
    }

    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    pub fn image_count(&self) -> usize {
        self.images.len()
    }

    /// Writes a line of text with its baseline starting at the given position.
    pub fn write_text(
        &mut self,
        font: &Font,
        font_size: f32,
        color: Rgb,
        text: &str,
        position: [f32; 2],
    ) {
        self.operations.extend(text_operations(
            font.identifier(),
            font,
            font_size,
            color,
            text,
            position,
        ));
    }

    /// Paints a rectangle whose lower left corner is at `(x, y)`.
    pub fn fill_rectangle(&mut self, rectangle: [f32; 4], color: Rgb) {
        let [x, y, width, height] = rectangle;
        let [r, g, b] = color;
        self.operations.extend(vec![
            Operation::new("q", vec![]),
            Operation::new("rg", vec![r.into(), g.into(), b.into()]),
            Operation::new("re", vec![x.into(), y.into(), width.into(), height.into()]),
            Operation::new("f", vec![]),
            Operation::new("Q", vec![]),
        ]);
    }

    /// Draws the border of a rectangle whose lower left corner is at `(x, y)`.
    pub fn stroke_rectangle(&mut self, rectangle: [f32; 4], color: Rgb, line_width: f32) {
        self.operations
            .extend(stroke_rectangle_operations(rectangle, color, line_width));
    }

    /// Draws an image scaled into the given rectangle.
    pub fn draw_image(&mut self, image: ImageXObject, rectangle: [f32; 4]) {
        let [x, y, width, height] = rectangle;
        let reference = XObjectReference::new(self.images.len());
        self.operations.extend(vec![
            Operation::new("q", vec![]),
            Operation::new(
                "cm",
                vec![
                    width.into(),
                    0.into(),
                    0.into(),
                    height.into(),
                    x.into(),
                    y.into(),
                ],
            ),
            Operation::new("Do", vec![Object::Name(reference.0.clone().into_bytes())]),
            Operation::new("Q", vec![]),
        ]);
        self.images.push((reference, image));
    }
}

fn text_operations(
    resource_name: &str,
    font: &Font,
    font_size: f32,
    color: Rgb,
    text: &str,
    position: [f32; 2],
) -> Vec<Operation> {
    let [x, y] = position;
    let [r, g, b] = color;
    vec![
        Operation::new("BT", vec![]),
        Operation::new("Tf", vec![resource_name.into(), font_size.into()]),
        Operation::new("Td", vec![x.into(), y.into()]),
        Operation::new("rg", vec![r.into(), g.into(), b.into()]),
        Operation::new("Tj", vec![font.encode_text(text)]),
        Operation::new("ET", vec![]),
    ]
}

fn stroke_rectangle_operations(rectangle: [f32; 4], color: Rgb, line_width: f32) -> Vec<Operation> {
    let [x, y, width, height] = rectangle;
    let [r, g, b] = color;
    vec![
        Operation::new("q", vec![]),
        Operation::new("RG", vec![r.into(), g.into(), b.into()]),
        Operation::new("w", vec![line_width.into()]),
        Operation::new("re", vec![x.into(), y.into(), width.into(), height.into()]),
        Operation::new("S", vec![]),
        Operation::new("Q", vec![]),
    ]
}

/// A short text drawn in a bordered box on every imported page of an annex.
#[derive(Debug, Clone)]
pub struct PageStamp {
    pub text: String,
    pub position: StampPosition,
    pub font_size: f32,
    pub color: Rgb,
    pub font: Font,
}

impl PageStamp {
    /// Distance of the stamp box from the edges of the page.
    const MARGIN: f32 = 20.0;
    /// Space between the text and the border of the box.
    const PADDING: f32 = 4.0;

    /// The operations drawing the stamp on a page whose visible area is `visible_box` and which is
    /// displayed rotated clockwise by `rotation` degrees.
    ///
    /// The stamp is laid out upright in the page as the reader sees it, the `cm` operator mapping
    /// these coordinates back onto the unrotated page.
    fn operations(&self, visible_box: [f32; 4], rotation: u16) -> Vec<Operation> {
        let [left, bottom, right, top] = visible_box;
        let (displayed_width, displayed_height, matrix) = match rotation {
            90 => (top - bottom, right - left, [0.0, 1.0, -1.0, 0.0, right, bottom]),
            180 => (right - left, top - bottom, [-1.0, 0.0, 0.0, -1.0, right, top]),
            270 => (top - bottom, right - left, [0.0, -1.0, 1.0, 0.0, left, top]),
            _ => (right - left, top - bottom, [1.0, 0.0, 0.0, 1.0, left, bottom]),
        };

        let text_width = self.font.text_width(&self.text, self.font_size);
        let box_width = text_width + 2.0 * Self::PADDING;
        let box_height = self.font_size + 2.0 * Self::PADDING;

        let box_x = match self.position {
            StampPosition::TopLeft | StampPosition::BottomLeft => Self::MARGIN,
            StampPosition::TopRight | StampPosition::BottomRight => {
                displayed_width - Self::MARGIN - box_width
            }
        };
        let box_y = match self.position {
            StampPosition::TopLeft | StampPosition::TopRight => {
                displayed_height - Self::MARGIN - box_height
            }
            StampPosition::BottomLeft | StampPosition::BottomRight => Self::MARGIN,
        };

        let mut operations = vec![
            Operation::new("q", vec![]),
            Operation::new("cm", matrix.into_iter().map(Object::Real).collect()),
        ];
        operations.extend(stroke_rectangle_operations(
            [box_x, box_y, box_width, box_height],
            self.color,
            1.0,
        ));
        // The baseline sits above the descenders of the text
        let baseline = box_y + Self::PADDING + self.font_size * 0.2;
        operations.extend(text_operations(
            STAMP_FONT_NAME,
            &self.font,
            self.font_size,
            self.color,
            &self.text,
            [box_x + Self::PADDING, baseline],
        ));
        operations.push(Operation::new("Q", vec![]));
        operations
    }
}

/// Converts millimeters to points, the margins being configured in millimeters.
pub fn millimeters_to_points(millimeters: f32) -> f32 {
    millimeters * 2.834646
}

/// The bundle under construction. Pages are appended in their final order, either synthesized
/// (`append_page`) or taken from a source document (`append_imported`), and the document is
/// completed by `write_all` before being saved.
pub struct PdfDocument {
    /// The association between the font identifiers and the fonts.
    fonts: BTreeMap<String, Font>,
    /// The underlying PDF document: this is a low-level interface and shouldn't be directly
    /// interacted with
    /// unless strictly necessary.
    pub inner_document: lopdf::Document,
    /// The identifier of the document, it is used in order to set the PDF `ID` tag.
    pub identifier: String,
    /// The object of the page tree root, written by `write_all`.
    pages_id: ObjectId,
    /// The object of the fonts dictionary shared by the synthesized pages.
    fonts_dictionary_id: ObjectId,
    /// The pages in their order in the bundle.
    page_ids: Vec<ObjectId>,
}

impl PdfDocument {
    /// Create a new `PdfDocument` with version 1.5 of the PDF specification.
    pub fn new(pdf_document_identifier: String) -> Self {
        let mut inner_document = lopdf::Document::with_version("1.5");
        let pages_id = inner_document.new_object_id();
        let fonts_dictionary_id = inner_document.new_object_id();
        PdfDocument {
            fonts: BTreeMap::default(),
            inner_document,
            identifier: pdf_document_identifier,
            pages_id,
            fonts_dictionary_id,
            page_ids: Vec::new(),
        }
    }

    pub fn page_count(&self) -> usize {
        self.page_ids.len()
    }

    /// Registers a font in the document and returns the handle used to draw and measure text.
    /// TrueType data that cannot be parsed is an error.
    pub fn add_font(&mut self, font_data: &FontData) -> Result<Font, ContextError> {
        let face = match font_data {
            FontData::Standard(standard_font) => FontFace::Standard(*standard_font),
            FontData::TrueType(bytes) => FontFace::TrueType {
                ttf_face: TtfFontFace::from_bytes(bytes)?,
                bytes: Arc::clone(bytes),
            },
        };
        let font = Font {
            face_identifier: format!("F{}", self.fonts.len()),
            object_id: self.inner_document.new_object_id(),
            face,
        };
        self.fonts
            .insert(font.face_identifier.clone(), font.clone());

        Ok(font)
    }

    /// Appends a synthesized page at the end of the document.
    pub fn append_page(&mut self, page: PdfPage) -> Result<(), ContextError> {
        use lopdf::Object::*;

        let content = lopdf::content::Content {
            operations: page.operations,
        }
        .encode()
        .map_err(|error| ContextError::with_error("Failed to encode the page content", &error))?;

        let mut resources = lopdf::Dictionary::from_iter(vec![(
            "Font",
            Reference(self.fonts_dictionary_id),
        )]);
        let mut xobjects = lopdf::Dictionary::new();
        for (reference, image) in page.images {
            let image_id = image.insert_into_document(&mut self.inner_document);
            xobjects.set(reference.0, Reference(image_id));
        }
        if !xobjects.is_empty() {
            resources.set("XObject", Dictionary(xobjects));
        }

        let content_id = self
            .inner_document
            .add_object(lopdf::Stream::new(lopdf::Dictionary::new(), content));
        let page_dictionary = lopdf::Dictionary::from_iter(vec![
            ("Type", "Page".into()),
            (
                "MediaBox",
                vec![0.into(), 0.into(), page.width.into(), page.height.into()].into(),
            ),
            ("Parent", Reference(self.pages_id)),
            ("Resources", Dictionary(resources)),
            ("Contents", Reference(content_id)),
        ]);
        let page_id = self.inner_document.add_object(page_dictionary);
        self.page_ids.push(page_id);

        Ok(())
    }

    /// Moves all the pages of an imported document to the end of this one, drawing the stamp on
    /// each of them if one is given. Returns the number of appended pages.
    pub fn append_imported(
        &mut self,
        imported_document: ImportedDocument,
        stamp: Option<&PageStamp>,
    ) -> Result<usize, ContextError> {
        let mut source_document = imported_document.into_inner();
        source_document.renumber_objects_with(self.inner_document.max_id + 1);
        let source_page_ids: Vec<ObjectId> = source_document.get_pages().into_values().collect();
        if source_page_ids.is_empty() {
            return Err(ContextError::with_context(
                "The imported document does not contain any page",
            ));
        }

        // Everything fallible is prepared before this document is touched
        let mut stamp_contents = Vec::new();
        if let Some(stamp) = stamp {
            for page_id in &source_page_ids {
                let visible_box = page_visible_box(&source_document, *page_id);
                let rotation = page_rotation(&source_document, *page_id);
                let content = lopdf::content::Content {
                    operations: stamp.operations(visible_box, rotation),
                }
                .encode()
                .map_err(|error| {
                    ContextError::with_error("Failed to encode the stamp content", &error)
                })?;
                stamp_contents.push((*page_id, content));
            }
        }

        // The page tree, the catalog and the outlines of the source are replaced by this document's
        let source_max_id = source_document.max_id;
        for (object_id, object) in source_document.objects {
            let is_structural = matches!(
                dictionary_type(&object),
                Some(b"Catalog" | b"Pages" | b"Outlines" | b"Outline")
            );
            if !is_structural {
                self.inner_document.objects.insert(object_id, object);
            }
        }
        self.inner_document.max_id = self.inner_document.max_id.max(source_max_id);

        for page_id in &source_page_ids {
            if let Some(Object::Dictionary(page)) = self.inner_document.objects.get_mut(page_id) {
                page.set("Parent", Object::Reference(self.pages_id));
            }
        }
        if let Some(stamp) = stamp {
            for (page_id, content) in stamp_contents {
                self.stamp_page(page_id, content, stamp.font.object_id);
            }
        }

        let appended_page_count = source_page_ids.len();
        self.page_ids.extend(source_page_ids);
        Ok(appended_page_count)
    }

    /// Adds the stamp content after the page's own content, isolating the latter's graphics state,
    /// and registers the stamp font in a copy of the page resources.
    fn stamp_page(&mut self, page_id: ObjectId, stamp_content: Vec<u8>, font_object_id: ObjectId) {
        use lopdf::Object::*;

        let mut resources = self
            .resolved_dictionary(page_id, b"Resources")
            .unwrap_or_default();
        let mut fonts = match resources.get(b"Font") {
            Ok(Dictionary(fonts)) => fonts.clone(),
            Ok(Reference(fonts_id)) => self
                .inner_document
                .get_dictionary(*fonts_id)
                .cloned()
                .unwrap_or_default(),
            _ => lopdf::Dictionary::new(),
        };
        fonts.set(STAMP_FONT_NAME, Reference(font_object_id));
        resources.set("Font", Dictionary(fonts));

        let mut contents = match self.resolved_page_entry(page_id, b"Contents") {
            Some(Array(contents)) => contents,
            Some(Stream(_)) | Some(Reference(_)) => self
                .inner_document
                .get_dictionary(page_id)
                .and_then(|page| page.get(b"Contents"))
                .map(|contents| vec![contents.clone()])
                .unwrap_or_default(),
            _ => Vec::new(),
        };
        let save_state_id = self
            .inner_document
            .add_object(lopdf::Stream::new(lopdf::Dictionary::new(), b"q\n".to_vec()));
        let stamp_id = self.inner_document.add_object(lopdf::Stream::new(
            lopdf::Dictionary::new(),
            [b"\nQ\n".as_slice(), stamp_content.as_slice()].concat(),
        ));
        contents.insert(0, Reference(save_state_id));
        contents.push(Reference(stamp_id));

        if let Ok(Dictionary(page)) = self.inner_document.get_object_mut(page_id) {
            page.set("Contents", Array(contents));
            page.set("Resources", Dictionary(resources));
        }
    }

    /// An entry of the page, following the reference if the entry is one.
    fn resolved_page_entry(&self, page_id: ObjectId, key: &[u8]) -> Option<Object> {
        let entry = self.inner_document.get_dictionary(page_id).ok()?.get(key).ok()?;
        match entry {
            Object::Reference(entry_id) => self.inner_document.get_object(*entry_id).ok().cloned(),
            entry => Some(entry.clone()),
        }
    }

    fn resolved_dictionary(&self, page_id: ObjectId, key: &[u8]) -> Option<lopdf::Dictionary> {
        match self.resolved_page_entry(page_id, key)? {
            Object::Dictionary(dictionary) => Some(dictionary),
            _ => None,
        }
    }

    /// Writes the fonts, the page tree, the catalog and the document information, so that the
    /// document can be saved.
    pub fn write_all(&mut self) -> Result<(), ContextError> {
        use lopdf::Object::*;
        use lopdf::StringFormat::*;

        if self.page_ids.is_empty() {
            return Err(ContextError::with_context(
                "Unable to write a PDF document without pages",
            ));
        }

        let now = OffsetDateTime::now_utc();
        let document_info = lopdf::Dictionary::from_iter(vec![
            ("Trapped", "False".into()),
            (
                "CreationDate",
                String(to_pdf_timestamp_format(&now).into_bytes(), Literal),
            ),
            (
                "ModDate",
                String(to_pdf_timestamp_format(&now).into_bytes(), Literal),
            ),
            ("Title", String("Bundle anexe".into(), Literal)),
            ("Creator", String("annexr".into(), Literal)),
            ("Producer", String("annexr".into(), Literal)),
            (
                "Identifier",
                String(self.identifier.clone().into_bytes(), Literal),
            ),
        ]);
        let document_info_id = self.inner_document.add_object(Dictionary(document_info));

        let fonts_dictionary = self.insert_fonts_into_document();
        self.inner_document
            .objects
            .insert(self.fonts_dictionary_id, Dictionary(fonts_dictionary));

        let kids: Vec<Object> = self.page_ids.iter().map(|page_id| Reference(*page_id)).collect();
        let pages = lopdf::Dictionary::from_iter(vec![
            ("Type", "Pages".into()),
            ("Count", Integer(self.page_ids.len() as i64)),
            ("Kids", Array(kids)),
        ]);
        self.inner_document
            .objects
            .insert(self.pages_id, Dictionary(pages));

        let catalog = lopdf::Dictionary::from_iter(vec![
            ("Type", "Catalog".into()),
            ("PageLayout", "OneColumn".into()),
            ("PageMode", "UseNone".into()),
            ("Pages", Reference(self.pages_id)),
        ]);
        let catalog_id = self.inner_document.add_object(catalog);

        let instance_id = uuid::Uuid::new_v4().simple().to_string();
        self.inner_document
            .trailer
            .set("Root", Reference(catalog_id));
        self.inner_document
            .trailer
            .set("Info", Reference(document_info_id));
        self.inner_document.trailer.set(
            "ID",
            Array(vec![
                String(self.identifier.clone().into_bytes(), Literal),
                String(instance_id.into_bytes(), Literal),
            ]),
        );

        Ok(())
    }

    /// Drops the objects left unreferenced by the imports and compresses the streams.
    pub fn optimize(&mut self) {
        self.inner_document.prune_objects();
        self.inner_document.renumber_objects();
        self.inner_document.compress();
    }

    /// Save the `PdfDocument` to bytes in order for it to be written to a file or further
    /// processed.
    pub fn save_to_bytes(&mut self) -> Result<Vec<u8>, ContextError> {
        let mut pdf_document_bytes = Vec::new();
        let mut writer = BufWriter::new(&mut pdf_document_bytes);
        self.inner_document.save_to(&mut writer).map_err(|error| {
            ContextError::with_error("Error while saving the PDF document to bytes", &error)
        })?;
        mem::drop(writer);

        Ok(pdf_document_bytes)
    }

    /// Converts the fonts into a dictionary and inserts them into the document.
    fn insert_fonts_into_document(&mut self) -> lopdf::Dictionary {
        let mut font_dictionary = lopdf::Dictionary::new();

        for (font_id, font) in self.fonts.iter() {
            let collected_font_dictionary = font.insert_into_document(&mut self.inner_document);
            self.inner_document.objects.insert(
                font.object_id,
                lopdf::Object::Dictionary(collected_font_dictionary),
            );
            font_dictionary.set(font_id.clone(), lopdf::Object::Reference(font.object_id));
        }
        font_dictionary
    }
}

/// The value of the `Type` entry of a dictionary or of a stream dictionary.
fn dictionary_type(object: &Object) -> Option<&[u8]> {
    let dictionary = match object {
        Object::Dictionary(dictionary) => dictionary,
        Object::Stream(stream) => &stream.dict,
        _ => return None,
    };
    dictionary.get(b"Type").and_then(Object::as_name).ok()
}

pub(crate) fn object_to_number(object: &Object) -> Option<f32> {
    match object {
        Object::Integer(integer) => Some(*integer as f32),
        Object::Real(real) => Some(*real),
        _ => None,
    }
}

/// A rectangle entry of a page, its corners reordered so that the lower left one comes first.
fn page_rectangle(document: &lopdf::Document, page_id: ObjectId, key: &[u8]) -> Option<[f32; 4]> {
    let page = document.get_dictionary(page_id).ok()?;
    let rectangle = match page.get(key).ok()? {
        Object::Reference(rectangle_id) => document.get_object(*rectangle_id).ok()?,
        rectangle => rectangle,
    };
    let numbers: Vec<f32> = rectangle
        .as_array()
        .ok()?
        .iter()
        .filter_map(object_to_number)
        .collect();

    match numbers[..] {
        [x0, y0, x1, y1] => Some([x0.min(x1), y0.min(y1), x0.max(x1), y0.max(y1)]),
        _ => None,
    }
}

/// The media box of a page, A4 when it is missing or malformed.
pub(crate) fn page_media_box(document: &lopdf::Document, page_id: ObjectId) -> [f32; 4] {
    page_rectangle(document, page_id, b"MediaBox").unwrap_or([0.0, 0.0, PAGE_WIDTH, PAGE_HEIGHT])
}

/// The area of the page a viewer shows: the crop box clipped to the media box, or the media box
/// when there is no usable crop box.
pub(crate) fn page_visible_box(document: &lopdf::Document, page_id: ObjectId) -> [f32; 4] {
    let media_box = page_media_box(document, page_id);
    let Some(crop_box) = page_rectangle(document, page_id, b"CropBox") else {
        return media_box;
    };
    let visible_box = [
        crop_box[0].max(media_box[0]),
        crop_box[1].max(media_box[1]),
        crop_box[2].min(media_box[2]),
        crop_box[3].min(media_box[3]),
    ];
    if visible_box[0] < visible_box[2] && visible_box[1] < visible_box[3] {
        visible_box
    } else {
        media_box
    }
}

/// The clockwise rotation of the page when displayed, in degrees. Values which are not a
/// multiple of 90 are ignored, as viewers do.
pub(crate) fn page_rotation(document: &lopdf::Document, page_id: ObjectId) -> u16 {
    let rotation = document
        .get_dictionary(page_id)
        .ok()
        .and_then(|page| page.get(b"Rotate").ok())
        .and_then(|rotate| rotate.as_i64().ok())
        .unwrap_or(0);
    match rotation.rem_euclid(360) {
        90 => 90,
        180 => 180,
        270 => 270,
        _ => 0,
    }
}

type GlyphId = u32;
type UnicodeCodePoint = u32;
type CmapBlock = Vec<(GlyphId, UnicodeCodePoint)>;

/// Generates the `ToUnicode` character map of a font from its blocks of glyph IDs.
fn generate_cid_to_unicode_map(face_name: &str, all_cmap_blocks: Vec<CmapBlock>) -> String {
    let mut cid_to_unicode_map =
        format!(include_str!("../assets/gid_to_unicode_beg.txt"), face_name);

    for cmap_block in all_cmap_blocks
        .into_iter()
        .filter(|block| !block.is_empty())
    {
        cid_to_unicode_map.push_str(format!("{} beginbfchar\r\n", cmap_block.len()).as_str());
        for (glyph_id, unicode) in cmap_block {
            cid_to_unicode_map.push_str(format!("<{glyph_id:04x}> <{unicode:04x}>\n").as_str());
        }
        cid_to_unicode_map.push_str("endbfchar\r\n");
    }

    cid_to_unicode_map.push_str(include_str!("../assets/gid_to_unicode_end.txt"));

    cid_to_unicode_map
}

/// Formats the given time so that it matches what the PDF specification expects.
/// An example of it is the following: D:20170505150224+02'00'.
fn to_pdf_timestamp_format(date: &OffsetDateTime) -> String {
    let offset = date.offset();
    let offset_sign = if offset.is_negative() { '-' } else { '+' };
    format!(
        "D:{:04}{:02}{:02}{:02}{:02}{:02}{offset_sign}{:02}'{:02}'",
        date.year(),
        u8::from(date.month()),
        date.day(),
        date.hour(),
        date.minute(),
        date.second(),
        offset.whole_hours().abs(),
        offset.minutes_past_hour().abs(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fonts::{BuiltinFontProvider, FontProvider as _};

    fn document_with_fonts() -> (PdfDocument, Font, Font) {
        let mut pdf_document = PdfDocument::new("test-document".into());
        let regular = pdf_document
            .add_font(&BuiltinFontProvider.load_regular().unwrap())
            .unwrap();
        let bold = pdf_document
            .add_font(&BuiltinFontProvider.load_bold().unwrap())
            .unwrap();
        (pdf_document, regular, bold)
    }

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let image = image::RgbaImage::from_pixel(width, height, image::Rgba([200, 10, 10, 128]));
        let mut bytes = std::io::Cursor::new(Vec::new());
        image::DynamicImage::ImageRgba8(image)
            .write_to(&mut bytes, image::ImageFormat::Png)
            .unwrap();
        bytes.into_inner()
    }

    #[test]
    fn standard_fonts_measure_text() {
        let (_, regular, bold) = document_with_fonts();
        // "Ab" is 667 + 556 thousandths in Helvetica
        assert!((regular.text_width("Ab", 10.0) - 12.23).abs() < 1e-3);
        assert!(bold.text_width("Ab", 10.0) > regular.text_width("Ab", 10.0));
        assert_eq!(regular.text_width("", 12.0), 0.0);
    }

    #[test]
    fn font_identifiers_are_sequential() {
        let (_, regular, bold) = document_with_fonts();
        assert_eq!(regular.identifier(), "F0");
        assert_eq!(bold.identifier(), "F1");
    }

    #[test]
    fn invalid_true_type_data_is_refused() {
        let mut pdf_document = PdfDocument::new("test-document".into());
        let font_data = FontData::TrueType(Arc::new(b"not a font".to_vec()));
        assert!(pdf_document.add_font(&font_data).is_err());
    }

    #[test]
    fn true_type_fonts_measure_and_encode_glyphs() {
        let mut pdf_document = PdfDocument::new("test-document".into());
        let font_bytes = include_bytes!("../tests/fonts/DejaVuSansMono.ttf").to_vec();
        let font = pdf_document
            .add_font(&FontData::TrueType(Arc::new(font_bytes)))
            .unwrap();

        // Monospaced, so every glyph has the same advance
        assert!(font.text_width("W", 12.0) > 0.0);
        assert_close(font.text_width("iii", 12.0), font.text_width("WWW", 12.0));
        assert_close(font.text_width("ăîș", 12.0), font.text_width("ais", 12.0));

        let Object::String(glyph_ids, StringFormat::Hexadecimal) = font.encode_text("Ab") else {
            panic!("expected a hexadecimal string of glyph IDs");
        };
        assert_eq!(glyph_ids.len(), 4);
    }

    #[test]
    fn png_images_keep_their_alpha_channel() {
        let image = ImageXObject::from_bytes(&png_bytes(4, 2)).unwrap();
        assert_eq!((image.width, image.height), (4, 2));
        assert_eq!(image.image_data.len(), 4 * 2 * 3);
        assert_eq!(image.soft_mask.as_ref().map(Vec::len), Some(8));
        assert!((image.aspect_ratio() - 0.5).abs() < f32::EPSILON);
    }

    #[test]
    fn unsupported_images_are_refused() {
        assert!(ImageXObject::from_bytes(b"GIF89a....").is_err());
        assert!(ImageXObject::from_bytes(b"").is_err());
    }

    #[test]
    fn synthesized_pages_are_saved_in_order() {
        let (mut pdf_document, regular, _) = document_with_fonts();
        for index in 0..3 {
            let mut page = PdfPage::a4();
            page.write_text(&regular, 12.0, [0.0; 3], &format!("Pagina {index}"), [72.0, 700.0]);
            page.fill_rectangle([10.0, 10.0, 50.0, 20.0], [0.5; 3]);
            if index == 1 {
                let image = ImageXObject::from_bytes(&png_bytes(3, 3)).unwrap();
                page.draw_image(image, [100.0, 100.0, 30.0, 30.0]);
            }
            pdf_document.append_page(page).unwrap();
        }
        pdf_document.write_all().unwrap();
        let bytes = pdf_document.save_to_bytes().unwrap();

        let saved_document = lopdf::Document::load_mem(&bytes).unwrap();
        let pages = saved_document.get_pages();
        assert_eq!(pages.len(), 3);
        let second_page_id = pages[&2];
        let content = saved_document.get_page_content(second_page_id).unwrap();
        assert!(String::from_utf8_lossy(&content).contains("(Pagina 1) Tj"));
    }

    #[test]
    fn empty_documents_cannot_be_written() {
        let (mut pdf_document, _, _) = document_with_fonts();
        assert!(pdf_document.write_all().is_err());
    }

    fn stamp(position: StampPosition, font: Font) -> PageStamp {
        PageStamp {
            text: "Anexa 1".into(),
            position,
            font_size: 10.0,
            color: [0.0; 3],
            font,
        }
    }

    /// The bounds of the stamp box in the coordinates of the unrotated page.
    fn stamp_bounds(operations: &[Operation]) -> [f32; 4] {
        let numbers = |operator: &str| -> Vec<f32> {
            operations
                .iter()
                .find(|operation| operation.operator == operator)
                .unwrap()
                .operands
                .iter()
                .filter_map(object_to_number)
                .collect()
        };
        let matrix = numbers("cm");
        let rectangle = numbers("re");
        let (x, y, width, height) = (rectangle[0], rectangle[1], rectangle[2], rectangle[3]);

        let mut bounds = [f32::MAX, f32::MAX, f32::MIN, f32::MIN];
        for (u, v) in [(x, y), (x + width, y), (x, y + height), (x + width, y + height)] {
            let page_x = matrix[0] * u + matrix[2] * v + matrix[4];
            let page_y = matrix[1] * u + matrix[3] * v + matrix[5];
            bounds = [
                bounds[0].min(page_x),
                bounds[1].min(page_y),
                bounds[2].max(page_x),
                bounds[3].max(page_y),
            ];
        }
        bounds
    }

    fn assert_close(actual: f32, expected: f32) {
        assert!(
            (actual - expected).abs() < 1e-3,
            "expected {expected}, got {actual}"
        );
    }

    fn assert_inside(bounds: [f32; 4], visible_box: [f32; 4]) {
        assert!(bounds[0] >= visible_box[0] && bounds[1] >= visible_box[1]);
        assert!(bounds[2] <= visible_box[2] && bounds[3] <= visible_box[3]);
    }

    #[test]
    fn stamps_are_placed_inside_the_media_box() {
        let (_, _, bold) = document_with_fonts();
        let operations =
            stamp(StampPosition::BottomLeft, bold).operations([0.0, 0.0, 300.0, 400.0], 0);
        let bounds = stamp_bounds(&operations);
        assert_close(bounds[0], PageStamp::MARGIN);
        assert_close(bounds[1], PageStamp::MARGIN);
        assert!(operations
            .iter()
            .any(|operation| operation.operator == "Tf"
                && operation.operands[0].as_name().ok() == Some(STAMP_FONT_NAME.as_bytes())));
        assert_eq!(operations.first().map(|operation| operation.operator.as_str()), Some("q"));
        assert_eq!(operations.last().map(|operation| operation.operator.as_str()), Some("Q"));
    }

    #[test]
    fn stamps_follow_the_crop_box() {
        let (_, _, bold) = document_with_fonts();
        let visible_box = [50.0, 50.0, 562.0, 742.0];
        let bounds = stamp_bounds(&stamp(StampPosition::TopRight, bold).operations(visible_box, 0));
        assert_inside(bounds, visible_box);
        assert_close(bounds[2], 562.0 - PageStamp::MARGIN);
        assert_close(bounds[3], 742.0 - PageStamp::MARGIN);
    }

    #[test]
    fn stamps_are_upright_on_rotated_pages() {
        let (_, _, bold) = document_with_fonts();
        let visible_box = [0.0, 0.0, 612.0, 792.0];
        let top_right = stamp(StampPosition::TopRight, bold);

        // Turned clockwise, the top left corner of the page is displayed top right
        let bounds = stamp_bounds(&top_right.operations(visible_box, 90));
        assert_inside(bounds, visible_box);
        assert_close(bounds[0], PageStamp::MARGIN);
        assert_close(bounds[3], 792.0 - PageStamp::MARGIN);

        let bounds = stamp_bounds(&top_right.operations(visible_box, 180));
        assert_inside(bounds, visible_box);
        assert_close(bounds[0], PageStamp::MARGIN);
        assert_close(bounds[1], PageStamp::MARGIN);

        let bounds = stamp_bounds(&top_right.operations(visible_box, 270));
        assert_inside(bounds, visible_box);
        assert_close(bounds[2], 612.0 - PageStamp::MARGIN);
        assert_close(bounds[1], PageStamp::MARGIN);
    }

    #[test]
    fn visible_boxes_clip_the_crop_box_to_the_media_box() {
        let mut document = lopdf::Document::with_version("1.5");
        let page_id = document.add_object(lopdf::Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Page".to_vec())),
            (
                "MediaBox",
                Object::Array(vec![0.into(), 0.into(), 612.into(), 792.into()]),
            ),
            (
                "CropBox",
                Object::Array(vec![50.into(), (-10).into(), 700.into(), 742.into()]),
            ),
            ("Rotate", Object::Integer(-90)),
        ]));
        assert_eq!(page_visible_box(&document, page_id), [50.0, 0.0, 612.0, 742.0]);
        assert_eq!(page_rotation(&document, page_id), 270);

        let bare_page_id = document.add_object(lopdf::Dictionary::new());
        assert_eq!(
            page_visible_box(&document, bare_page_id),
            [0.0, 0.0, PAGE_WIDTH, PAGE_HEIGHT]
        );
        assert_eq!(page_rotation(&document, bare_page_id), 0);
    }

    #[test]
    fn timestamps_follow_the_pdf_format() {
        let date = OffsetDateTime::UNIX_EPOCH;
        assert_eq!(to_pdf_timestamp_format(&date), "D:19700101000000+00'00'");
    }
}
