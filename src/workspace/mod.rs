//! Document workspace: folder layout, file location, and state-driven moves

pub mod layout;
pub mod locator;
pub mod locks;
pub mod organizer;

pub use layout::{list_pdf_files, list_pdf_names, FolderLayout, PdfFileEntry};
pub use locator::{locate, resolve_file_ref};
pub use locks::MoveLocks;
pub use organizer::{Organizer, PromoteStatus, ReconcileOutcome, ScanFailure};
