//! eSignature MCP Server Library
//!
//! This crate provides MCP tools for an e-signature document workflow:
//! - `analyze_signatures`: Report a PDF's signature fields and signing state
//! - `add_signature_field`: Append a signature field, producing a new PDF
//! - `organize_pdf`: File a PDF into the folder matching its signature state
//! - `check_unsigned_for_updates`: Promote newly signed documents

pub mod error;
pub mod pdf;
pub mod server;
pub mod workspace;

#[cfg(test)]
pub(crate) mod testutil;

pub use error::{Error, Result};
pub use server::{
    run_server, run_server_with_config, EsignServer, WorkflowConfig, INTAKE_RESOURCE_URI,
    ORGANIZED_RESOURCE_URI,
};
