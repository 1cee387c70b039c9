//! `tila-recon` - TILA disclosure reconciliation engine.
//!
//! Pure engine crate: receives validated records, returns per-field verdicts,
//! summary counters and mismatch buckets. No network or file IO.

pub mod aggregate;
pub mod compare;
pub mod config;
pub mod engine;
pub mod error;
pub mod mapping;
pub mod matcher;
pub mod model;
pub mod normalize;
pub mod report;
pub mod schema;
pub mod state;

pub use config::{NotAvailablePolicy, ReconPolicy, UnmatchedPolicy};
pub use engine::run;
pub use error::ReconError;
pub use mapping::{FieldMapping, THREE_WAY_FEES, TILA_VS_SPREADSHEET};
pub use model::{FieldValue, ReconInput, ReconResult, Record, RecordKind};
pub use state::AppState;
