#![allow(dead_code)]

use annexr::model::{AnnexItem, DocumentItem};
use lopdf::{dictionary, Document, Object, ObjectId, Stream};

/// Builds a PDF whose pages each draw their 1-based number, the resources and the media box being
/// inherited from the page tree.
pub fn sample_pdf(page_count: usize) -> Vec<u8> {
    sample_pdf_with_page_tree(page_count, lopdf::Dictionary::new())
}

/// Same as `sample_pdf`, the given entries (a crop box, a rotation...) being added to the root of
/// the page tree, from where the pages inherit them.
pub fn sample_pdf_with_page_tree(page_count: usize, inherited: lopdf::Dictionary) -> Vec<u8> {
    let mut document = Document::with_version("1.5");
    let pages_id = document.new_object_id();
    let font_id = document.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });

    let page_ids: Vec<ObjectId> = (1..=page_count)
        .map(|page_number| {
            let content = format!("BT /F1 24 Tf 100 700 Td (Sample page {page_number}) Tj ET");
            let content_id =
                document.add_object(Stream::new(lopdf::Dictionary::new(), content.into_bytes()));
            document.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
            })
        })
        .collect();

    let kids: Vec<Object> = page_ids.iter().map(|page_id| Object::Reference(*page_id)).collect();
    let mut pages = dictionary! {
        "Type" => "Pages",
        "Kids" => kids,
        "Count" => page_count as i64,
        "Resources" => dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        },
        "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
    };
    for (key, value) in inherited.iter() {
        pages.set(key.clone(), value.clone());
    }
    document.objects.insert(pages_id, Object::Dictionary(pages));
    let catalog_id = document.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    document.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    document.save_to(&mut bytes).unwrap();
    bytes
}

pub fn document(file_name: &str, file_bytes: Option<Vec<u8>>) -> DocumentItem {
    DocumentItem::from_file_name(file_name, file_bytes)
}

/// An annex which is numbered once it is placed in a request.
pub fn annex(documents: Vec<DocumentItem>) -> AnnexItem {
    AnnexItem::new(documents)
}

/// The content streams of every page of a bundle, decoded as text.
pub fn page_contents(bundle_bytes: &[u8]) -> Vec<String> {
    let document = Document::load_mem(bundle_bytes).unwrap();
    document
        .get_pages()
        .into_values()
        .map(|page_id| {
            let content = document.get_page_content(page_id).unwrap();
            String::from_utf8_lossy(&content).into_owned()
        })
        .collect()
}
