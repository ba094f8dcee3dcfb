use lopdf::{Object, ObjectId};

use crate::error::ContextError;

/// The page attributes which a page may inherit from its ancestors in the page tree.
const INHERITABLE_ATTRIBUTES: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

/// Page trees deeper than this are considered malformed (or cyclic).
const MAXIMUM_TREE_DEPTH: usize = 64;

/// A parsed source document whose pages carry all of their attributes, so that they can be moved
/// out of their page tree into the bundle.
#[derive(Debug)]
pub struct ImportedDocument {
    document: lopdf::Document,
    page_count: usize,
}

impl ImportedDocument {
    pub fn page_count(&self) -> usize {
        self.page_count
    }

    pub(crate) fn into_inner(self) -> lopdf::Document {
        self.document
    }
}

/// Parses the bytes of a source document. Empty, corrupt or encrypted data and documents without
/// pages are refused, the caller replacing them with an error page.
pub fn import_document(document_bytes: &[u8]) -> Result<ImportedDocument, ContextError> {
    if document_bytes.is_empty() {
        return Err(ContextError::with_context("The document is empty"));
    }

    let mut document = lopdf::Document::load_mem(document_bytes)
        .map_err(|error| ContextError::with_error("Failed to parse the PDF document", &error))?;
    if document.is_encrypted() {
        return Err(ContextError::with_context(
            "The document is encrypted, which is not supported",
        ));
    }

    let page_ids: Vec<ObjectId> = document.get_pages().into_values().collect();
    if page_ids.is_empty() {
        return Err(ContextError::with_context("The document does not contain any page"));
    }

    for page_id in &page_ids {
        flatten_inherited_attributes(&mut document, *page_id)?;
    }
    log::debug!("Imported a document of {} pages", page_ids.len());

    Ok(ImportedDocument {
        document,
        page_count: page_ids.len(),
    })
}

/// Copies into the page the attributes it inherits from its ancestors.
fn flatten_inherited_attributes(
    document: &mut lopdf::Document,
    page_id: ObjectId,
) -> Result<(), ContextError> {
    let page = document
        .get_dictionary(page_id)
        .map_err(|error| ContextError::with_error("Failed to read a page", &error))?;

    let mut inherited_attributes = Vec::new();
    for attribute in INHERITABLE_ATTRIBUTES {
        if page.has(attribute) {
            continue;
        }
        if let Some(value) = inherited_attribute(document, page_id, attribute)? {
            inherited_attributes.push((attribute, value));
        }
    }

    if inherited_attributes.is_empty() {
        return Ok(());
    }
    let page = document
        .get_object_mut(page_id)
        .and_then(Object::as_dict_mut)
        .map_err(|error| ContextError::with_error("Failed to update a page", &error))?;
    for (attribute, value) in inherited_attributes {
        page.set(attribute, value);
    }

    Ok(())
}

/// Looks the attribute up in the ancestors of the page, the nearest one winning.
fn inherited_attribute(
    document: &lopdf::Document,
    page_id: ObjectId,
    attribute: &[u8],
) -> Result<Option<Object>, ContextError> {
    let mut node_id = page_id;
    for _ in 0..MAXIMUM_TREE_DEPTH {
        let node = document
            .get_dictionary(node_id)
            .map_err(|error| ContextError::with_error("Failed to read the page tree", &error))?;
        let parent_id = match node.get(b"Parent").and_then(Object::as_reference) {
            Ok(parent_id) => parent_id,
            Err(_) => return Ok(None),
        };
        let parent = document
            .get_dictionary(parent_id)
            .map_err(|error| ContextError::with_error("Failed to read the page tree", &error))?;
        if let Ok(value) = parent.get(attribute) {
            return Ok(Some(value.clone()));
        }
        node_id = parent_id;
    }

    Err(ContextError::with_context(
        "The page tree is too deep, it is probably cyclic",
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::{page_media_box, page_rotation, page_visible_box};
    use lopdf::{dictionary, Document, Stream};

    /// A document whose single page inherits its resources, boxes and rotation from the page tree.
    fn document_with_inherited_attributes() -> Vec<u8> {
        let mut document = Document::with_version("1.5");
        let pages_id = document.new_object_id();
        let content_id = document.add_object(Stream::new(
            lopdf::Dictionary::new(),
            b"0 0 10 10 re f".to_vec(),
        ));
        let page_id = document.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        document.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![page_id.into()],
                "Count" => 1,
                "Resources" => lopdf::Dictionary::new(),
                "MediaBox" => vec![0.into(), 0.into(), 200.into(), 300.into()],
                "CropBox" => vec![10.into(), 10.into(), 190.into(), 290.into()],
                "Rotate" => 90,
            }),
        );
        let catalog_id = document.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        document.trailer.set("Root", catalog_id);

        let mut bytes = Vec::new();
        document.save_to(&mut bytes).unwrap();
        bytes
    }

    #[test]
    fn inherited_attributes_are_copied_into_the_pages() {
        let imported = import_document(&document_with_inherited_attributes()).unwrap();
        assert_eq!(imported.page_count(), 1);

        let document = imported.into_inner();
        let page_id = document.get_pages()[&1];
        let page = document.get_dictionary(page_id).unwrap();
        assert!(page.has(b"Resources"));
        assert_eq!(page_media_box(&document, page_id), [0.0, 0.0, 200.0, 300.0]);
        assert_eq!(page_visible_box(&document, page_id), [10.0, 10.0, 190.0, 290.0]);
        assert_eq!(page_rotation(&document, page_id), 90);
    }

    #[test]
    fn corrupt_documents_are_refused() {
        assert!(import_document(b"").is_err());
        assert!(import_document(b"%PDF-1.4 this is not really a PDF").is_err());
        assert!(import_document(&[0xff; 512]).is_err());
    }
}
