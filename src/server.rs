//! MCP Server implementation using rmcp

use crate::error::{Error, Result as WorkflowResult};
use crate::pdf::{self, FieldPlacement, SignatureRect, SignatureState};
use crate::workspace::{
    list_pdf_files, list_pdf_names, locator, FolderLayout, MoveLocks, Organizer, PromoteStatus,
};
use anyhow::Result;
use rmcp::{
    handler::server::tool::ToolRouter, handler::server::wrapper::Parameters, model::*,
    schemars::JsonSchema, service::RequestContext, tool, tool_handler, tool_router, RoleServer,
    ServerHandler, ServiceExt,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

/// Fixed identifier of the intake listing resource
pub const INTAKE_RESOURCE_URI: &str = "esign://intake";
/// Fixed identifier of the organized listing resource
pub const ORGANIZED_RESOURCE_URI: &str = "esign://organized";

/// Directory and field-placement configuration for the eSignature MCP Server
#[derive(Debug, Clone)]
pub struct WorkflowConfig {
    /// Folder where new, unclassified PDFs arrive
    pub intake_dir: String,
    /// Base folder holding the three state-named subfolders
    pub organized_dir: String,
    /// Default name for appended signature fields
    pub signature_field_name: String,
    /// Default target page for appended signature fields (1-indexed)
    pub signature_page: u32,
    /// Default widget rectangle for appended signature fields
    pub signature_rect: SignatureRect,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            intake_dir: "pdf_documents".to_string(),
            organized_dir: "organized_pdfs".to_string(),
            signature_field_name: "Signature1".to_string(),
            signature_page: 1,
            signature_rect: SignatureRect::default(),
        }
    }
}

impl WorkflowConfig {
    /// Folder layout derived from the configured directories
    pub fn layout(&self) -> FolderLayout {
        FolderLayout::new(&self.intake_dir, &self.organized_dir)
    }
}

/// eSignature MCP Server
#[derive(Clone)]
pub struct EsignServer {
    config: Arc<WorkflowConfig>,
    organizer: Arc<Organizer>,
    locks: Arc<MoveLocks>,
    tool_router: ToolRouter<Self>,
}

// ============================================================================
// Request/Response types for analyze_signatures
// ============================================================================

#[derive(Debug, Deserialize, JsonSchema)]
pub struct AnalyzeSignaturesParams {
    /// Path or bare filename of the PDF to analyze. Bare filenames are
    /// located across the organized folders and the intake folder.
    pub path: String,
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct SignatureFieldInfo {
    /// Field name
    pub name: String,
    /// Whether the field carries a filled value
    pub signed: bool,
    /// Signer display name (present only when signed)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signer_name: Option<String>,
    /// Signing timestamp string (present only when signed)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signed_at: Option<String>,
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct AnalyzeSignaturesResult {
    /// Resolved path of the analyzed file
    pub source: String,
    /// Whether the document has any form fields at all
    pub has_form_fields: bool,
    /// Signature fields in document order
    pub fields: Vec<SignatureFieldInfo>,
    /// Number of signed fields
    pub signed_count: u32,
    /// Derived signature state (no_signature_fields, unsigned_fields, signed)
    pub state: String,
    /// Human-readable summary
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

// ============================================================================
// Request/Response types for add_signature_field
// ============================================================================

#[derive(Debug, Deserialize, JsonSchema)]
pub struct AddSignatureFieldParams {
    /// Path or bare filename of the source PDF
    pub input_path: String,
    /// Output file path. Defaults to the unsigned_fields folder under the
    /// configured organized base, keeping the original filename.
    #[serde(default)]
    pub output_path: Option<String>,
    /// Field name. Defaults to the configured signature field name.
    #[serde(default)]
    pub field_name: Option<String>,
    /// Target page, 1-indexed. Defaults to the configured page.
    #[serde(default)]
    pub page: Option<u32>,
    /// Widget rectangle in PDF user-space points. Each edge defaults to the
    /// configured rectangle.
    #[serde(default)]
    pub left: Option<f32>,
    #[serde(default)]
    pub bottom: Option<f32>,
    #[serde(default)]
    pub right: Option<f32>,
    #[serde(default)]
    pub top: Option<f32>,
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct AddSignatureFieldResult {
    /// Resolved path of the source file
    pub source: String,
    /// Path the new PDF was written to
    pub output_path: String,
    /// Name of the appended field
    pub field_name: String,
    /// Page the field was placed on (1-indexed)
    pub page: u32,
    /// Human-readable summary
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

// ============================================================================
// Request/Response types for organize_pdf
// ============================================================================

#[derive(Debug, Deserialize, JsonSchema)]
pub struct OrganizePdfParams {
    /// Path or bare filename of the PDF to file
    pub file_path: String,
    /// Base folder holding the state subfolders. Defaults to the configured
    /// organized base.
    #[serde(default)]
    pub base_folder: Option<String>,
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct OrganizePdfResult {
    /// Resolved path of the source file
    pub source: String,
    /// Path the file was moved to
    pub destination: String,
    /// Signature state that determined the destination
    pub state: String,
    /// Human-readable summary
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

// ============================================================================
// Request/Response types for check_unsigned_for_updates
// ============================================================================

#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct CheckUnsignedForUpdatesParams {}

#[derive(Debug, Serialize, JsonSchema)]
pub struct ScanFailureInfo {
    /// Filename that failed
    pub name: String,
    /// Reason the file was skipped
    pub reason: String,
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct CheckUnsignedForUpdatesResult {
    /// Files newly signed and moved to the signed folder
    pub promoted: Vec<String>,
    /// Files whose signature field is still unfilled
    pub still_pending: Vec<String>,
    /// Files the scan could not process
    pub failed: Vec<ScanFailureInfo>,
    /// Human-readable summary
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

// ============================================================================
// Resource listing payloads
// ============================================================================

#[derive(Debug, Serialize, JsonSchema)]
pub struct IntakeFileInfo {
    /// Filename only
    pub name: String,
    /// File size in bytes
    pub size: u64,
    /// Last modified time (ISO 8601 format)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified: Option<String>,
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct IntakeListing {
    /// Intake directory that was listed
    pub directory: String,
    /// PDF files awaiting classification
    pub files: Vec<IntakeFileInfo>,
    pub total_count: u32,
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct OrganizedListing {
    /// Organized base directory that was listed
    pub directory: String,
    pub no_signature_fields: Vec<String>,
    pub unsigned_fields: Vec<String>,
    pub signed: Vec<String>,
}

fn file_name_component(path: &str) -> String {
    Path::new(path)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string())
}

fn join_error(e: tokio::task::JoinError) -> Error {
    Error::Internal {
        reason: format!("task join error: {}", e),
    }
}

// ============================================================================
// Tool implementations
// ============================================================================

#[tool_router]
impl EsignServer {
    pub fn new() -> Self {
        Self::with_config(WorkflowConfig::default())
    }

    /// Create a new EsignServer with full configuration
    pub fn with_config(config: WorkflowConfig) -> Self {
        let organizer = Organizer::new(config.layout());
        Self {
            config: Arc::new(config),
            organizer: Arc::new(organizer),
            locks: Arc::new(MoveLocks::new()),
            tool_router: Self::tool_router(),
        }
    }

    /// Analyze a PDF's signature fields and signing state
    #[tool(
        description = "Analyze a PDF's signature form fields. Reports each signature field, whether it is signed, the signer name and signing time when available, and the document's derived state (no_signature_fields, unsigned_fields, or signed). Only value presence is checked - certificates are not validated.

The path may be a bare filename; it is then located across the organized folders and the intake folder."
    )]
    async fn analyze_signatures(
        &self,
        Parameters(params): Parameters<AnalyzeSignaturesParams>,
    ) -> String {
        let result = self
            .process_analyze_signatures(&params)
            .await
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, "analyze_signatures failed");
                AnalyzeSignaturesResult {
                    source: params.path.clone(),
                    has_form_fields: false,
                    fields: vec![],
                    signed_count: 0,
                    state: String::new(),
                    message: String::new(),
                    error: Some(e.client_message()),
                }
            });

        let response = serde_json::json!({ "results": [result] });
        serde_json::to_string_pretty(&response).unwrap_or_default()
    }

    /// Add a signature field to a PDF
    #[tool(
        description = "Add an empty signature field to a PDF, producing a new document. Field name, page, and rectangle default to the server configuration; the output defaults to the unsigned_fields folder so the document enters the signing pipeline. If the output path differs from the input, the original file is removed (a move with mutation).

The input path may be a bare filename; it is then located across the organized folders and the intake folder."
    )]
    async fn add_signature_field(
        &self,
        Parameters(params): Parameters<AddSignatureFieldParams>,
    ) -> String {
        let result = self
            .process_add_signature_field(&params)
            .await
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, "add_signature_field failed");
                AddSignatureFieldResult {
                    source: params.input_path.clone(),
                    output_path: String::new(),
                    field_name: String::new(),
                    page: 0,
                    message: String::new(),
                    error: Some(e.client_message()),
                }
            });

        let response = serde_json::json!({ "results": [result] });
        serde_json::to_string_pretty(&response).unwrap_or_default()
    }

    /// Move a PDF into the folder matching its signature state
    #[tool(
        description = "Classify a PDF by signature state and move it into the matching organized subfolder:
- no_signature_fields: the document has no signature fields
- unsigned_fields: signature fields exist but are not signed
- signed: the signature fields are signed

The file path may be a bare filename; it is then located across the organized folders and the intake folder, so a document that was already filed can be re-filed after its content changed."
    )]
    async fn organize_pdf(&self, Parameters(params): Parameters<OrganizePdfParams>) -> String {
        let result = self
            .process_organize_pdf(&params)
            .await
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, "organize_pdf failed");
                OrganizePdfResult {
                    source: params.file_path.clone(),
                    destination: String::new(),
                    state: String::new(),
                    message: String::new(),
                    error: Some(e.client_message()),
                }
            });

        let response = serde_json::json!({ "results": [result] });
        serde_json::to_string_pretty(&response).unwrap_or_default()
    }

    /// Re-scan the unsigned folder for newly signed documents
    #[tool(
        description = "Re-scan every PDF in the unsigned_fields folder and move the ones whose signature field has been filled since the last scan into the signed folder. Returns the promoted filenames and the ones still pending. Safe to call repeatedly: already promoted files are simply absent from the next scan."
    )]
    async fn check_unsigned_for_updates(
        &self,
        Parameters(_params): Parameters<CheckUnsignedForUpdatesParams>,
    ) -> String {
        let result = self
            .process_check_unsigned_for_updates()
            .await
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, "check_unsigned_for_updates failed");
                CheckUnsignedForUpdatesResult {
                    promoted: vec![],
                    still_pending: vec![],
                    failed: vec![],
                    message: String::new(),
                    error: Some(e.client_message()),
                }
            });

        let response = serde_json::json!({ "results": [result] });
        serde_json::to_string_pretty(&response).unwrap_or_default()
    }
}

impl EsignServer {
    pub async fn process_analyze_signatures(
        &self,
        params: &AnalyzeSignaturesParams,
    ) -> WorkflowResult<AnalyzeSignaturesResult> {
        let layout = self.organizer.layout().clone();
        let path = params.path.clone();

        let (source, report) = tokio::task::spawn_blocking(move || {
            let source = locator::resolve_file_ref(&layout, &path)?;
            let data = std::fs::read(&source)?;
            let report = pdf::inspect(&data)?;
            Ok::<_, Error>((source, report))
        })
        .await
        .map_err(join_error)??;

        let state = pdf::classify(&report);
        let fields: Vec<SignatureFieldInfo> = report
            .signature_fields
            .iter()
            .map(|f| SignatureFieldInfo {
                name: f.name.clone(),
                signed: f.filled,
                signer_name: f.signer_name.clone(),
                signed_at: f.signed_at.clone(),
            })
            .collect();
        let signed_count = fields.iter().filter(|f| f.signed).count() as u32;
        let message = Self::analysis_summary(&report, signed_count);

        Ok(AnalyzeSignaturesResult {
            source: source.display().to_string(),
            has_form_fields: report.has_form,
            fields,
            signed_count,
            state: state.to_string(),
            message,
            error: None,
        })
    }

    fn analysis_summary(report: &pdf::FieldReport, signed_count: u32) -> String {
        if !report.has_form {
            return "No form fields found".to_string();
        }
        if report.signature_fields.is_empty() {
            return "No signature fields found".to_string();
        }

        let names: Vec<&str> = report
            .signature_fields
            .iter()
            .map(|f| f.name.as_str())
            .collect();
        let mut lines = vec![format!("Signature fields: {}", names.join(", "))];
        for field in report.signature_fields.iter().filter(|f| f.filled) {
            let mut info = format!("Field '{}':", field.name);
            if let Some(signer) = &field.signer_name {
                info.push_str(&format!(" {}", signer));
            }
            if let Some(when) = &field.signed_at {
                info.push_str(&format!(" ({})", when));
            }
            lines.push(info);
        }
        if signed_count == 0 {
            lines.push("No fields are signed".to_string());
        } else {
            lines.push(format!("{} field(s) signed", signed_count));
        }
        lines.join("\n")
    }

    pub async fn process_add_signature_field(
        &self,
        params: &AddSignatureFieldParams,
    ) -> WorkflowResult<AddSignatureFieldResult> {
        let lock = self.locks.for_name(&file_name_component(&params.input_path));
        let _guard = lock.lock().await;

        let layout = self.organizer.layout().clone();
        let config = self.config.clone();
        let input_path = params.input_path.clone();
        let output_param = params.output_path.clone();
        let placement = FieldPlacement {
            field_name: params
                .field_name
                .clone()
                .unwrap_or_else(|| config.signature_field_name.clone()),
            page: params.page.unwrap_or(config.signature_page),
            rect: SignatureRect {
                left: params.left.unwrap_or(config.signature_rect.left),
                bottom: params.bottom.unwrap_or(config.signature_rect.bottom),
                right: params.right.unwrap_or(config.signature_rect.right),
                top: params.top.unwrap_or(config.signature_rect.top),
            },
        };
        let applied = placement.clone();

        let (source, output_path) = tokio::task::spawn_blocking(move || {
            let source = locator::resolve_file_ref(&layout, &input_path)?;
            let data = std::fs::read(&source)?;
            let output = pdf::append_signature_field(&data, &placement)?;

            let output_path = match output_param {
                Some(path) => std::path::PathBuf::from(path),
                None => {
                    let name = source.file_name().ok_or_else(|| Error::FileNotFound {
                        name: input_path.clone(),
                    })?;
                    layout
                        .state_dir(SignatureState::UnsignedFields)
                        .join(name)
                }
            };
            Self::write_output(&output_path, &output)?;

            if output_path != source {
                std::fs::remove_file(&source)?;
            }
            Ok::<_, Error>((source, output_path))
        })
        .await
        .map_err(join_error)??;

        let message = format!(
            "Signature field {} added to {}",
            applied.field_name,
            file_name_component(&output_path.display().to_string())
        );

        Ok(AddSignatureFieldResult {
            source: source.display().to_string(),
            output_path: output_path.display().to_string(),
            field_name: applied.field_name,
            page: applied.page,
            message,
            error: None,
        })
    }

    /// Write new PDF bytes to `path` via a temp file in the same directory,
    /// so a failed write never leaves a partial output.
    fn write_output(path: &Path, data: &[u8]) -> WorkflowResult<()> {
        let parent = path.parent().unwrap_or_else(|| Path::new("."));
        if !parent.as_os_str().is_empty() && !parent.is_dir() {
            return Err(Error::DestinationUnavailable {
                path: parent.display().to_string(),
            });
        }

        let file_name = path.file_name().ok_or_else(|| Error::WriteFailure {
            reason: format!("output path {} has no filename", path.display()),
        })?;
        let temp_path = parent.join(format!(".tmp-{}", file_name.to_string_lossy()));

        if let Err(e) = std::fs::write(&temp_path, data) {
            let _ = std::fs::remove_file(&temp_path);
            return Err(Error::WriteFailure {
                reason: format!("failed to write {}: {}", temp_path.display(), e),
            });
        }
        if let Err(e) = std::fs::rename(&temp_path, path) {
            let _ = std::fs::remove_file(&temp_path);
            return Err(Error::WriteFailure {
                reason: format!("failed to finalize {}: {}", path.display(), e),
            });
        }
        Ok(())
    }

    pub async fn process_organize_pdf(
        &self,
        params: &OrganizePdfParams,
    ) -> WorkflowResult<OrganizePdfResult> {
        let lock = self.locks.for_name(&file_name_component(&params.file_path));
        let _guard = lock.lock().await;

        let organizer = self.organizer.clone();
        let file_ref = params.file_path.clone();
        let base = params.base_folder.clone();

        let (destination, state) = tokio::task::spawn_blocking(move || {
            organizer.organize(&file_ref, base.as_deref().map(Path::new))
        })
        .await
        .map_err(join_error)??;

        let filename = file_name_component(&params.file_path);
        let message = format!("Moved {} to {} folder", filename, state.folder_name());

        Ok(OrganizePdfResult {
            source: params.file_path.clone(),
            destination: destination.display().to_string(),
            state: state.to_string(),
            message,
            error: None,
        })
    }

    pub async fn process_check_unsigned_for_updates(
        &self,
    ) -> WorkflowResult<CheckUnsignedForUpdatesResult> {
        let organizer = self.organizer.clone();
        let names = tokio::task::spawn_blocking(move || organizer.pending_files())
            .await
            .map_err(join_error)??;

        let mut promoted = Vec::new();
        let mut still_pending = Vec::new();
        let mut failed = Vec::new();

        for name in names {
            let lock = self.locks.for_name(&name);
            let _guard = lock.lock().await;

            let organizer = self.organizer.clone();
            let scanned = name.clone();
            let status =
                tokio::task::spawn_blocking(move || organizer.promote_if_signed(&scanned))
                    .await
                    .map_err(join_error)?;

            match status {
                Ok(PromoteStatus::Promoted) => promoted.push(name),
                Ok(PromoteStatus::StillPending) => still_pending.push(name),
                // Another caller moved the file between listing and locking
                Err(Error::Io(ref e)) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => failed.push(ScanFailureInfo {
                    name,
                    reason: e.client_message(),
                }),
            }
        }

        let message = format!(
            "{} file(s) promoted to signed, {} still pending",
            promoted.len(),
            still_pending.len()
        );

        Ok(CheckUnsignedForUpdatesResult {
            promoted,
            still_pending,
            failed,
            message,
            error: None,
        })
    }

    /// Intake listing payload (public for testing)
    pub fn intake_listing(&self) -> WorkflowResult<IntakeListing> {
        let layout = self.organizer.layout();
        let files: Vec<IntakeFileInfo> = list_pdf_files(&layout.intake_dir)?
            .into_iter()
            .map(|f| IntakeFileInfo {
                name: f.name,
                size: f.size,
                modified: f.modified,
            })
            .collect();
        let total_count = files.len() as u32;

        Ok(IntakeListing {
            directory: layout.intake_dir.display().to_string(),
            files,
            total_count,
        })
    }

    /// Organized listing payload (public for testing)
    pub fn organized_listing(&self) -> WorkflowResult<OrganizedListing> {
        let layout = self.organizer.layout();
        Ok(OrganizedListing {
            directory: layout.organized_dir.display().to_string(),
            no_signature_fields: list_pdf_names(
                &layout.state_dir(SignatureState::NoSignatureFields),
            )?,
            unsigned_fields: list_pdf_names(&layout.state_dir(SignatureState::UnsignedFields))?,
            signed: list_pdf_names(&layout.state_dir(SignatureState::Signed))?,
        })
    }
}

impl Default for EsignServer {
    fn default() -> Self {
        Self::new()
    }
}

#[tool_handler]
impl ServerHandler for EsignServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2024_11_05,
            capabilities: ServerCapabilities::builder()
                .enable_tools()
                .enable_resources()
                .build(),
            server_info: Implementation::from_build_env(),
            instructions: Some(
                "eSignature MCP Server analyzes PDF signature fields, adds signature fields, \
                 and files documents into state folders. The intake and organized folders are \
                 exposed as the esign://intake and esign://organized resources."
                    .into(),
            ),
        }
    }

    /// List the two fixed directory-listing resources
    async fn list_resources(
        &self,
        _request: Option<PaginatedRequestParams>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListResourcesResult, ErrorData> {
        let mut intake = RawResource::new(INTAKE_RESOURCE_URI, "intake".to_string());
        intake.mime_type = Some("application/json".to_string());
        intake.description = Some(format!(
            "PDF files awaiting classification in {}",
            self.config.intake_dir
        ));

        let mut organized = RawResource::new(ORGANIZED_RESOURCE_URI, "organized".to_string());
        organized.mime_type = Some("application/json".to_string());
        organized.description = Some(format!(
            "PDF files per signature state under {}",
            self.config.organized_dir
        ));

        Ok(ListResourcesResult {
            resources: vec![
                Annotated {
                    raw: intake,
                    annotations: None,
                },
                Annotated {
                    raw: organized,
                    annotations: None,
                },
            ],
            next_cursor: None,
            meta: Default::default(),
        })
    }

    /// Read one of the directory-listing resources as JSON text
    async fn read_resource(
        &self,
        request: ReadResourceRequestParams,
        _context: RequestContext<RoleServer>,
    ) -> Result<ReadResourceResult, ErrorData> {
        let uri = &request.uri;

        let text = match uri.as_str() {
            INTAKE_RESOURCE_URI => self
                .intake_listing()
                .and_then(|listing| Ok(serde_json::to_string_pretty(&listing)?)),
            ORGANIZED_RESOURCE_URI => self
                .organized_listing()
                .and_then(|listing| Ok(serde_json::to_string_pretty(&listing)?)),
            _ => {
                return Err(ErrorData::invalid_params(
                    "Unknown resource; use esign://intake or esign://organized",
                    None,
                ))
            }
        };

        match text {
            Ok(text) => Ok(ReadResourceResult {
                contents: vec![ResourceContents::TextResourceContents {
                    uri: uri.clone(),
                    mime_type: Some("application/json".to_string()),
                    text,
                    meta: Default::default(),
                }],
            }),
            Err(e) => {
                tracing::warn!(error = %e, "read_resource failed");
                Err(ErrorData::internal_error(e.client_message(), None))
            }
        }
    }
}

/// Run the MCP server with the default configuration
pub async fn run_server() -> Result<()> {
    run_server_with_config(WorkflowConfig::default()).await
}

/// Run the MCP server with full configuration
pub async fn run_server_with_config(config: WorkflowConfig) -> Result<()> {
    config.layout().ensure_layout()?;
    let server = EsignServer::with_config(config);

    tracing::info!("eSignature MCP Server ready, waiting for connections...");

    let service = server.serve(rmcp::transport::io::stdio()).await?;
    service.waiting().await?;

    Ok(())
}
