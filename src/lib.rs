//! Annexr assembles the annexes of a legal or administrative file into a single PDF bundle: a table
//! of contents (the "opis") listing every annex, then for each annex a cover page followed by its
//! source documents, with a separator page between two documents of the same annex.
//!
//! The bundle is described by an `ExportRequest`, usually taken from a `ProjectModel` loaded from a
//! JSON project file, and built by the `Assembler`. The export goes on when a document or a whole
//! annex cannot be processed: the missing content is replaced by an error page and reported as an
//! `AssemblyIssue` next to the bytes of the bundle.

/// This module contains the `ContextError` type, the error type used throughout this library, and
/// `ExportError`, which lists the few failures that abort an export.
///
/// A `ContextError` always carries an explanation of what was being done, and the message of the
/// propagated error if the failure happened in another library.
pub mod error;

/// The text normalizer, which replaces the Romanian diacritics the standard fonts cannot draw, and
/// the greedy line wrapping shared by the renderers.
pub mod text;

/// The `FontProvider` contract and its two implementations.
///
/// `BuiltinFontProvider` hands out the standard Helvetica fonts, which need no embedding, while
/// `FileFontProvider` reads two TrueType files once and keeps them for every later export.
pub mod fonts;

/// Color themes: the presets, the parsing of `#rrggbb` colors and the resolution of a theme into
/// the palette used for drawing.
pub mod theme;

/// The annexes and their documents, the formatting options and the project file.
pub mod model;

/// The low-level output document, built on top of `lopdf`.
///
/// # Introduction
///
/// The main component of this module is the struct `PdfDocument`. Pages are appended in their final
/// order, either synthesized with the drawing functions of `PdfPage` or moved from an imported
/// document, optionally with a `PageStamp` drawn on them. Fonts are registered once per document
/// with `add_font`: the standard fonts are referenced by name and TrueType fonts are embedded as
/// `Type0` fonts with the `Identity-H` encoding. Once every page is appended, `write_all` completes
/// the document and `save_to_bytes` serializes it.
pub mod pdf;

/// The document importer, which parses the source PDFs.
pub mod import;

/// The `PageRenderer` seam and the `StandardRenderer`, which draws the table of contents, the cover
/// pages, the separator pages and the error pages.
pub mod render;

/// The bundle assembler.
pub mod assemble;

/// The configuration of the export binary.
pub mod configuration;
