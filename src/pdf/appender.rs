//! Signature field appending
//!
//! Adds an empty `/Sig` widget annotation to an existing document: the
//! widget is linked into the target page's `/Annots` and the catalog's
//! `/AcroForm` `/Fields`, creating either container if the document lacks
//! one. The result is a fresh byte stream; the input is untouched.

use crate::error::{Error, Result};
use crate::pdf::fields::{form_field_names, load_document};
use lopdf::{dictionary, Document, Object, ObjectId};

/// Placement rectangle in PDF user-space points
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SignatureRect {
    pub left: f32,
    pub bottom: f32,
    pub right: f32,
    pub top: f32,
}

impl Default for SignatureRect {
    fn default() -> Self {
        Self {
            left: 400.0,
            bottom: 50.0,
            right: 600.0,
            top: 100.0,
        }
    }
}

/// Where and under what name the new signature field is placed
#[derive(Debug, Clone, PartialEq)]
pub struct FieldPlacement {
    /// Field name (`/T`); must not collide with an existing field
    pub field_name: String,
    /// Target page, 1-indexed
    pub page: u32,
    /// Widget rectangle
    pub rect: SignatureRect,
}

impl Default for FieldPlacement {
    fn default() -> Self {
        Self {
            field_name: "Signature1".to_string(),
            page: 1,
            rect: SignatureRect::default(),
        }
    }
}

/// Where an array-valued dictionary entry lives
enum ArraySlot {
    Missing,
    Inline,
    Referenced(ObjectId),
}

fn array_slot(doc: &Document, owner: ObjectId, key: &[u8]) -> Result<ArraySlot> {
    let dict = doc.get_object(owner)?.as_dict()?;
    match dict.get(key) {
        Err(_) => Ok(ArraySlot::Missing),
        Ok(Object::Array(_)) => Ok(ArraySlot::Inline),
        Ok(Object::Reference(id)) => Ok(ArraySlot::Referenced(*id)),
        Ok(_) => Err(Error::InvalidPdf {
            reason: format!("/{} is not an array", String::from_utf8_lossy(key)),
        }),
    }
}

/// Push `value` onto the array at `owner[key]`, creating the array if absent
fn push_array_entry(doc: &mut Document, owner: ObjectId, key: &str, value: Object) -> Result<()> {
    match array_slot(doc, owner, key.as_bytes())? {
        ArraySlot::Missing => {
            doc.get_object_mut(owner)?
                .as_dict_mut()?
                .set(key, vec![value]);
        }
        ArraySlot::Inline => {
            doc.get_object_mut(owner)?
                .as_dict_mut()?
                .get_mut(key.as_bytes())?
                .as_array_mut()?
                .push(value);
        }
        ArraySlot::Referenced(id) => {
            doc.get_object_mut(id)?.as_array_mut()?.push(value);
        }
    }
    Ok(())
}

/// Link the new field into the catalog's `/AcroForm` `/Fields` array
fn register_form_field(doc: &mut Document, field_id: ObjectId) -> Result<()> {
    let catalog_id = doc.trailer.get(b"Root")?.as_reference()?;

    let form_slot = {
        let catalog = doc.get_object(catalog_id)?.as_dict()?;
        match catalog.get(b"AcroForm") {
            Err(_) => ArraySlot::Missing,
            Ok(Object::Dictionary(_)) => ArraySlot::Inline,
            Ok(Object::Reference(id)) => ArraySlot::Referenced(*id),
            Ok(_) => {
                return Err(Error::InvalidPdf {
                    reason: "/AcroForm is not a dictionary".to_string(),
                })
            }
        }
    };

    match form_slot {
        ArraySlot::Missing => {
            let form_id = doc.add_object(dictionary! {
                "Fields" => vec![Object::Reference(field_id)],
            });
            doc.get_object_mut(catalog_id)?
                .as_dict_mut()?
                .set("AcroForm", form_id);
        }
        ArraySlot::Referenced(form_id) => {
            push_array_entry(doc, form_id, "Fields", Object::Reference(field_id))?;
        }
        ArraySlot::Inline => {
            // The Fields array inside an inline AcroForm may itself be a reference
            let fields_slot = {
                let catalog = doc.get_object(catalog_id)?.as_dict()?;
                let form = catalog.get(b"AcroForm")?.as_dict()?;
                match form.get(b"Fields") {
                    Err(_) => ArraySlot::Missing,
                    Ok(Object::Array(_)) => ArraySlot::Inline,
                    Ok(Object::Reference(id)) => ArraySlot::Referenced(*id),
                    Ok(_) => {
                        return Err(Error::InvalidPdf {
                            reason: "/Fields is not an array".to_string(),
                        })
                    }
                }
            };
            match fields_slot {
                ArraySlot::Missing => {
                    doc.get_object_mut(catalog_id)?
                        .as_dict_mut()?
                        .get_mut(b"AcroForm")?
                        .as_dict_mut()?
                        .set("Fields", vec![Object::Reference(field_id)]);
                }
                ArraySlot::Inline => {
                    doc.get_object_mut(catalog_id)?
                        .as_dict_mut()?
                        .get_mut(b"AcroForm")?
                        .as_dict_mut()?
                        .get_mut(b"Fields")?
                        .as_array_mut()?
                        .push(Object::Reference(field_id));
                }
                ArraySlot::Referenced(array_id) => {
                    doc.get_object_mut(array_id)?
                        .as_array_mut()?
                        .push(Object::Reference(field_id));
                }
            }
        }
    }
    Ok(())
}

/// Append an empty signature field to `data`, returning the new PDF bytes
pub fn append_signature_field(data: &[u8], placement: &FieldPlacement) -> Result<Vec<u8>> {
    let mut doc = load_document(data)?;

    if form_field_names(&doc)?
        .iter()
        .any(|name| name == &placement.field_name)
    {
        return Err(Error::DuplicateField {
            name: placement.field_name.clone(),
        });
    }

    let pages = doc.get_pages();
    let total = pages.len() as u32;
    let page_id = *pages.get(&placement.page).ok_or(Error::PageOutOfBounds {
        page: placement.page,
        total,
    })?;

    let field_id = doc.add_object(dictionary! {
        "FT" => "Sig",
        "T" => Object::string_literal(placement.field_name.as_str()),
        "Type" => "Annot",
        "Subtype" => "Widget",
        "Rect" => vec![
            placement.rect.left.into(),
            placement.rect.bottom.into(),
            placement.rect.right.into(),
            placement.rect.top.into(),
        ],
        "F" => 4,
        "P" => page_id,
    });

    push_array_entry(&mut doc, page_id, "Annots", Object::Reference(field_id))?;
    register_form_field(&mut doc, field_id)?;

    let mut out = Vec::new();
    doc.save_to(&mut out).map_err(|e| Error::WriteFailure {
        reason: format!("failed to serialize PDF: {}", e),
    })?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::fields::{classify_bytes, inspect, SignatureState};
    use crate::testutil::blank_pdf_bytes as blank_pdf;
    use pretty_assertions::assert_eq;

    /// Rect of the named field in the output, as (left, bottom, right, top)
    fn field_rect(data: &[u8], name: &str) -> Option<(f32, f32, f32, f32)> {
        let doc = Document::load_mem(data).unwrap();
        let catalog = doc.catalog().unwrap();
        let form_id = catalog.get(b"AcroForm").ok()?.as_reference().ok()?;
        let form = doc.get_object(form_id).ok()?.as_dict().ok()?;
        let fields = form.get(b"Fields").ok()?.as_array().ok()?;
        for item in fields {
            let field_id = item.as_reference().ok()?;
            let field = doc.get_object(field_id).ok()?.as_dict().ok()?;
            let field_name = match field.get(b"T") {
                Ok(Object::String(bytes, _)) => String::from_utf8_lossy(bytes).into_owned(),
                _ => continue,
            };
            if field_name != name {
                continue;
            }
            let rect = field.get(b"Rect").ok()?.as_array().ok()?;
            let coord = |i: usize| match &rect[i] {
                Object::Integer(v) => *v as f32,
                Object::Real(v) => *v,
                _ => f32::NAN,
            };
            return Some((coord(0), coord(1), coord(2), coord(3)));
        }
        None
    }

    #[test]
    fn appends_unsigned_field_to_fieldless_pdf() {
        let data = blank_pdf(1);
        assert_eq!(
            classify_bytes(&data).unwrap(),
            SignatureState::NoSignatureFields
        );

        let output = append_signature_field(&data, &FieldPlacement::default()).unwrap();
        let report = inspect(&output).unwrap();
        assert!(report.has_form);
        assert_eq!(report.signature_fields.len(), 1);
        assert_eq!(report.signature_fields[0].name, "Signature1");
        assert!(!report.signature_fields[0].filled);
        assert_eq!(
            classify_bytes(&output).unwrap(),
            SignatureState::UnsignedFields
        );
    }

    #[test]
    fn placement_parameters_are_honored() {
        let data = blank_pdf(2);
        let placement = FieldPlacement {
            field_name: "ApproverSignature".to_string(),
            page: 2,
            rect: SignatureRect {
                left: 100.0,
                bottom: 200.0,
                right: 300.0,
                top: 250.0,
            },
        };
        let output = append_signature_field(&data, &placement).unwrap();
        let rect = field_rect(&output, "ApproverSignature").expect("field present");
        assert_eq!(rect, (100.0, 200.0, 300.0, 250.0));
    }

    #[test]
    fn append_is_deterministic_in_field_geometry() {
        let data = blank_pdf(1);
        let placement = FieldPlacement::default();

        let first = append_signature_field(&data, &placement).unwrap();
        let second = append_signature_field(&data, &placement).unwrap();

        assert_eq!(
            field_rect(&first, "Signature1"),
            field_rect(&second, "Signature1")
        );
        let a = inspect(&first).unwrap();
        let b = inspect(&second).unwrap();
        assert_eq!(a.signature_fields[0].name, b.signature_fields[0].name);
    }

    #[test]
    fn duplicate_field_name_is_rejected() {
        let data = blank_pdf(1);
        let output = append_signature_field(&data, &FieldPlacement::default()).unwrap();

        let result = append_signature_field(&output, &FieldPlacement::default());
        assert!(matches!(result, Err(Error::DuplicateField { .. })));
    }

    #[test]
    fn page_out_of_bounds_is_rejected() {
        let data = blank_pdf(1);
        let placement = FieldPlacement {
            page: 5,
            ..FieldPlacement::default()
        };
        let result = append_signature_field(&data, &placement);
        assert!(matches!(
            result,
            Err(Error::PageOutOfBounds { page: 5, total: 1 })
        ));
    }

    #[test]
    fn existing_form_gains_second_field() {
        let data = blank_pdf(1);
        let first = append_signature_field(
            &data,
            &FieldPlacement {
                field_name: "First".to_string(),
                ..FieldPlacement::default()
            },
        )
        .unwrap();
        let second = append_signature_field(
            &first,
            &FieldPlacement {
                field_name: "Second".to_string(),
                ..FieldPlacement::default()
            },
        )
        .unwrap();

        let report = inspect(&second).unwrap();
        let names: Vec<&str> = report
            .signature_fields
            .iter()
            .map(|f| f.name.as_str())
            .collect();
        assert_eq!(names, vec!["First", "Second"]);
    }

    #[test]
    fn malformed_input_is_rejected() {
        let result = append_signature_field(b"not a valid PDF", &FieldPlacement::default());
        assert!(matches!(result, Err(Error::InvalidPdf { .. })));
    }
}
