use std::fmt;

#[derive(Debug)]
pub enum ReconError {
    /// Structured payload does not fit the record schema.
    Schema { source: String, message: String },
    /// Reconciliation triggered before the required data was loaded.
    MissingPrerequisite(String),
    /// Another reconciliation run is in progress.
    Busy,
    /// Mapping references a field the record schema does not declare.
    UnknownField { kind: String, field: String },
}

impl fmt::Display for ReconError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Schema { source, message } => write!(f, "{source}: {message}"),
            Self::MissingPrerequisite(what) => {
                write!(f, "missing prerequisite: {what}")
            }
            Self::Busy => write!(f, "a reconciliation run is already in progress"),
            Self::UnknownField { kind, field } => {
                write!(f, "{kind} schema has no field '{field}'")
            }
        }
    }
}

impl std::error::Error for ReconError {}
