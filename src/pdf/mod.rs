//! PDF processing layer
//!
//! Two capabilities, both backed by lopdf: reading a document's signature
//! form fields, and appending a new signature field to produce fresh bytes.

mod appender;
mod fields;

pub use appender::{append_signature_field, FieldPlacement, SignatureRect};
pub use fields::{
    classify, classify_bytes, inspect, inspect_document, load_document, FieldReport,
    SignatureField, SignatureState,
};
