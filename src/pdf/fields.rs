//! Signature form-field inspection and state classification
//!
//! The inspector walks the document catalog to `/AcroForm` and collects the
//! fields whose `/FT` is `/Sig`. A field counts as filled when its `/V`
//! entry holds a non-empty value dictionary; signer name and signing time
//! come from that dictionary's `/Name` and `/M` entries. Presence of a
//! filled value is all that is checked - no certificate validation.

use crate::error::{Error, Result};
use lopdf::{Dictionary, Document, Object};

/// A signature-typed form field and its signing status
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureField {
    /// Field name (`/T`), unique within a document
    pub name: String,
    /// Whether the field carries a non-empty value entry
    pub filled: bool,
    /// Signer display name (`/V` -> `/Name`), present only when filled
    pub signer_name: Option<String>,
    /// Signing timestamp string (`/V` -> `/M`), present only when filled
    pub signed_at: Option<String>,
}

/// Result of inspecting a document's interactive form
#[derive(Debug, Clone, Default)]
pub struct FieldReport {
    /// Whether the document has a form with at least one field.
    /// A missing or empty `/AcroForm` is a normal outcome, not an error.
    pub has_form: bool,
    /// Signature-typed fields in `/Fields` array order
    pub signature_fields: Vec<SignatureField>,
}

/// Signature state of a document, derived from its live form content
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignatureState {
    /// No signature fields exist (other form fields may)
    NoSignatureFields,
    /// Signature fields exist but at least one is unfilled
    UnsignedFields,
    /// Every signature field carries a filled value
    Signed,
}

impl SignatureState {
    /// All states, in organized-folder probe order
    pub const ALL: [SignatureState; 3] = [
        SignatureState::NoSignatureFields,
        SignatureState::UnsignedFields,
        SignatureState::Signed,
    ];

    /// Organized subfolder name for this state
    pub fn folder_name(&self) -> &'static str {
        match self {
            SignatureState::NoSignatureFields => "no_signature_fields",
            SignatureState::UnsignedFields => "unsigned_fields",
            SignatureState::Signed => "signed",
        }
    }
}

impl std::fmt::Display for SignatureState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.folder_name())
    }
}

/// Parse PDF bytes into a document, validating the header first
pub fn load_document(data: &[u8]) -> Result<Document> {
    if data.len() < 4 || &data[0..4] != b"%PDF" {
        return Err(Error::InvalidPdf {
            reason: "Not a valid PDF file".to_string(),
        });
    }
    Ok(Document::load_mem(data)?)
}

/// Follow a reference to its target object; non-references pass through
fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> Result<&'a Object> {
    match obj {
        Object::Reference(id) => Ok(doc.get_object(*id)?),
        _ => Ok(obj),
    }
}

fn decode_string(obj: &Object) -> Option<String> {
    match obj {
        Object::String(bytes, _) => Some(String::from_utf8_lossy(bytes).into_owned()),
        _ => None,
    }
}

fn dict_string(doc: &Document, dict: &Dictionary, key: &[u8]) -> Option<String> {
    dict.get(key)
        .ok()
        .and_then(|o| resolve(doc, o).ok())
        .and_then(decode_string)
}

/// Collect the top-level form field dictionaries, or `None` when the
/// document has no retrievable field mapping.
fn form_fields<'a>(doc: &'a Document) -> Result<Option<Vec<&'a Dictionary>>> {
    let catalog = doc.catalog()?;

    let form = match catalog.get(b"AcroForm") {
        Ok(obj) => resolve(doc, obj)?.as_dict()?,
        Err(_) => return Ok(None),
    };

    let fields = match form.get(b"Fields") {
        Ok(obj) => resolve(doc, obj)?.as_array()?,
        Err(_) => return Ok(None),
    };

    let mut out = Vec::with_capacity(fields.len());
    for item in fields {
        out.push(resolve(doc, item)?.as_dict()?);
    }
    Ok(Some(out))
}

/// Names of every top-level form field, signature-typed or not
pub(crate) fn form_field_names(doc: &Document) -> Result<Vec<String>> {
    Ok(match form_fields(doc)? {
        Some(fields) => fields
            .iter()
            .filter_map(|f| dict_string(doc, f, b"T"))
            .collect(),
        None => Vec::new(),
    })
}

/// Inspect raw PDF bytes for signature fields
pub fn inspect(data: &[u8]) -> Result<FieldReport> {
    let doc = load_document(data)?;
    inspect_document(&doc)
}

/// Inspect a parsed document for signature fields
pub fn inspect_document(doc: &Document) -> Result<FieldReport> {
    let fields = match form_fields(doc)? {
        Some(fields) if !fields.is_empty() => fields,
        _ => return Ok(FieldReport::default()),
    };

    let mut signature_fields = Vec::new();
    for field in &fields {
        let is_signature = field
            .get(b"FT")
            .ok()
            .and_then(|o| resolve(doc, o).ok())
            .map(|o| matches!(o, Object::Name(n) if n.as_slice() == b"Sig"))
            .unwrap_or(false);
        if !is_signature {
            continue;
        }

        let name = dict_string(doc, field, b"T").unwrap_or_default();

        let value = field.get(b"V").ok().and_then(|o| resolve(doc, o).ok());
        let (filled, signer_name, signed_at) = match value {
            Some(Object::Dictionary(v)) => {
                let filled = v.iter().next().is_some();
                if filled {
                    (
                        true,
                        dict_string(doc, v, b"Name"),
                        dict_string(doc, v, b"M"),
                    )
                } else {
                    (false, None, None)
                }
            }
            // PyPDF-era producers occasionally store a bare string value
            Some(Object::String(s, _)) => (!s.is_empty(), None, None),
            Some(Object::Null) | None => (false, None, None),
            Some(_) => (true, None, None),
        };

        signature_fields.push(SignatureField {
            name,
            filled,
            signer_name,
            signed_at,
        });
    }

    Ok(FieldReport {
        has_form: true,
        signature_fields,
    })
}

/// Derive a document's signature state from its field report.
///
/// Multi-field documents aggregate worst-case: any unfilled signature field
/// keeps the whole document in `UnsignedFields`.
pub fn classify(report: &FieldReport) -> SignatureState {
    if report.signature_fields.is_empty() {
        return SignatureState::NoSignatureFields;
    }
    if report.signature_fields.iter().any(|f| !f.filled) {
        SignatureState::UnsignedFields
    } else {
        SignatureState::Signed
    }
}

/// Inspect and classify in one step
pub fn classify_bytes(data: &[u8]) -> Result<SignatureState> {
    Ok(classify(&inspect(data)?))
}
