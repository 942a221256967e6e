//! Shared helpers for integration tests: programmatically built PDF
//! fixtures and a temp-directory workspace.

use esign_mcp_server::workspace::FolderLayout;
use lopdf::{dictionary, Document, Object, Stream};

/// PDF bytes for the three workflow shapes:
/// - `None`: no form fields
/// - `Some(None)`: one unsigned signature field
/// - `Some(Some((signer, when)))`: one signed signature field
pub fn pdf_bytes(sig: Option<Option<(&str, &str)>>) -> Vec<u8> {
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

    if let Some(value) = sig {
        let mut field = dictionary! {
            "FT" => "Sig",
            "T" => Object::string_literal("Signature1"),
            "Type" => "Annot",
            "Subtype" => "Widget",
            "Rect" => vec![400.into(), 50.into(), 600.into(), 100.into()],
            "F" => 4,
            "P" => page_id,
        };
        if let Some((signer, when)) = value {
            field.set(
                "V",
                Object::Dictionary(dictionary! {
                    "Type" => "Sig",
                    "Filter" => "Adobe.PPKLite",
                    "Name" => Object::string_literal(signer),
                    "M" => Object::string_literal(when),
                }),
            );
        }
        let field_id = doc.add_object(field);
        doc.get_object_mut(page_id)
            .unwrap()
            .as_dict_mut()
            .unwrap()
            .set("Annots", vec![field_id.into()]);
        let form_id = doc.add_object(dictionary! { "Fields" => vec![field_id.into()] });
        doc.get_object_mut(catalog_id)
            .unwrap()
            .as_dict_mut()
            .unwrap()
            .set("AcroForm", form_id);
    }

    let mut out = Vec::new();
    doc.save_to(&mut out).unwrap();
    out
}

/// Fill the (single) signature field of existing PDF bytes in place,
/// simulating an external signer.
pub fn sign_in_place(data: &[u8], signer: &str, when: &str) -> Vec<u8> {
    let mut doc = Document::load_mem(data).unwrap();
    let catalog = doc.catalog().unwrap();
    let form_id = catalog.get(b"AcroForm").unwrap().as_reference().unwrap();
    let fields = doc
        .get_object(form_id)
        .unwrap()
        .as_dict()
        .unwrap()
        .get(b"Fields")
        .unwrap()
        .as_array()
        .unwrap()
        .clone();
    let field_id = fields[0].as_reference().unwrap();
    doc.get_object_mut(field_id)
        .unwrap()
        .as_dict_mut()
        .unwrap()
        .set(
            "V",
            Object::Dictionary(dictionary! {
                "Type" => "Sig",
                "Filter" => "Adobe.PPKLite",
                "Name" => Object::string_literal(signer),
                "M" => Object::string_literal(when),
            }),
        );
    let mut out = Vec::new();
    doc.save_to(&mut out).unwrap();
    out
}

/// Temp workspace with the intake folder and organized folder set created
pub fn temp_layout() -> (tempfile::TempDir, FolderLayout) {
    let temp = tempfile::tempdir().unwrap();
    let layout = FolderLayout::new(
        temp.path().join("pdf_documents"),
        temp.path().join("organized_pdfs"),
    );
    layout.ensure_layout().unwrap();
    (temp, layout)
}
