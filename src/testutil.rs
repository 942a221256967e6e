//! Shared test fixtures: programmatically built PDF documents

use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream};

/// Minimal single-page document; returns the document and its page id
pub fn base_doc() -> (Document, ObjectId) {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let content_id = doc.add_object(Stream::new(dictionary! {}, Vec::new()));
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
        "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
    });
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    (doc, page_id)
}

/// Install an AcroForm with the given field dictionaries
pub fn install_form(doc: &mut Document, page_id: ObjectId, fields: Vec<Dictionary>) {
    let mut refs: Vec<Object> = Vec::new();
    for field in fields {
        refs.push(doc.add_object(field).into());
    }
    let page = doc
        .get_object_mut(page_id)
        .and_then(|o| o.as_dict_mut())
        .expect("page dictionary");
    page.set("Annots", refs.clone());
    let form_id = doc.add_object(dictionary! { "Fields" => refs });
    let catalog_id = doc.trailer.get(b"Root").unwrap().as_reference().unwrap();
    doc.get_object_mut(catalog_id)
        .unwrap()
        .as_dict_mut()
        .unwrap()
        .set("AcroForm", form_id);
}

/// Signature field dictionary, optionally pre-filled with a value
pub fn sig_field(name: &str, value: Option<Dictionary>) -> Dictionary {
    let mut field = dictionary! {
        "FT" => "Sig",
        "T" => Object::string_literal(name),
        "Type" => "Annot",
        "Subtype" => "Widget",
        "Rect" => vec![400.into(), 50.into(), 600.into(), 100.into()],
        "F" => 4,
    };
    if let Some(v) = value {
        field.set("V", Object::Dictionary(v));
    }
    field
}

/// Plain text field dictionary
pub fn text_field(name: &str) -> Dictionary {
    dictionary! {
        "FT" => "Tx",
        "T" => Object::string_literal(name),
        "Type" => "Annot",
        "Subtype" => "Widget",
        "Rect" => vec![100.into(), 100.into(), 300.into(), 120.into()],
    }
}

/// Signature value dictionary with signer name and timestamp
pub fn signature_value(signer: &str, when: &str) -> Dictionary {
    dictionary! {
        "Type" => "Sig",
        "Filter" => "Adobe.PPKLite",
        "Name" => Object::string_literal(signer),
        "M" => Object::string_literal(when),
    }
}

fn to_bytes(doc: &mut Document) -> Vec<u8> {
    let mut out = Vec::new();
    doc.save_to(&mut out).expect("serialize fixture PDF");
    out
}

/// PDF bytes for a document with the given number of empty pages
pub fn blank_pdf_bytes(pages: u32) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let mut kids: Vec<Object> = Vec::new();
    for _ in 0..pages {
        let content_id = doc.add_object(Stream::new(dictionary! {}, Vec::new()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        });
        kids.push(page_id.into());
    }
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => pages as i64,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    to_bytes(&mut doc)
}

/// PDF bytes for the three workflow shapes:
/// - `None`: no form fields
/// - `Some(None)`: one unsigned signature field
/// - `Some(Some((signer, when)))`: one signed signature field
pub fn pdf_bytes(sig: Option<Option<(&str, &str)>>) -> Vec<u8> {
    let (mut doc, page_id) = base_doc();
    if let Some(value) = sig {
        let field = sig_field(
            "Signature1",
            value.map(|(signer, when)| signature_value(signer, when)),
        );
        install_form(&mut doc, page_id, vec![field]);
    }
    to_bytes(&mut doc)
}
