//! Remote collaborators for reconciliation.
//!
//! Extraction service client, structured payload parsing, spreadsheet
//! loading, sequential extraction batches and the notification relay.
//! Everything here is blocking; no async runtime is required.

mod batch;
mod client;
mod error;
mod extractor;
mod notify;
mod payload;
mod prompt;
mod sheet;

pub use batch::{extract_batch, BatchFailure, BatchOutcome, CancelToken, DocumentSource};
pub use client::{LlmClient, Part};
pub use error::ExtractError;
pub use extractor::{DocumentExtractor, HeaderRowExtractor, LlmExtractor, SpreadsheetExtractor};
pub use notify::{
    compose_message, dispatch, Message, MismatchCategory, Notifier, NotifyError, RelayNotifier,
};
pub use payload::{parse_structured_block, record_objects};
pub use prompt::instruction;
pub use sheet::{load_sheets, parse_csv, Cell, SheetGrid};
