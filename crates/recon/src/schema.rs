//! Record shapes per source and validation at the extraction boundary.
//!
//! Every value the extraction service returns passes through [`RecordSchema::validate`]
//! before it reaches the engine. Absent, `null`, empty and `N/A` values become
//! [`FieldValue::NotAvailable`]; the identifier field is mandatory.

use crate::error::ReconError;
use crate::model::{FieldValue, Record, RecordKind};

pub const APR: &str = "Annual Percentage Rate (APR)";
pub const ACCOUNT_NUMBER: &str = "Account Number";
pub const LOAN_ID: &str = "Loan Id";
pub const BOOKING_DATE: &str = "Booking Date";
pub const PAYMENT_MONTH_DATE: &str = "Payment Month Date";
pub const COMPLETE_TEXT: &str = "Complete Extracted Text";

#[derive(Debug)]
pub struct RecordSchema {
    pub kind: RecordKind,
    /// Field holding the shared loan identifier.
    pub identifier: &'static str,
    /// Every field the extraction service is asked for, in prompt order.
    pub fields: &'static [&'static str],
    /// Fields shown in single-record tables.
    pub display: &'static [&'static str],
}

pub static TILA_DOCUMENT: RecordSchema = RecordSchema {
    kind: RecordKind::TilaDocument,
    identifier: ACCOUNT_NUMBER,
    fields: &[
        COMPLETE_TEXT,
        "Creditor",
        "Borrower",
        ACCOUNT_NUMBER,
        APR,
        "Finance Charge",
        "Amount Financed",
        "Total of Payments",
        "Monthly Payment Amount",
        "Number of Payments",
        "Returned Payment Fee",
        "Origination Fee",
        "Late Charges",
        "Prepayment Penalty",
        "Refund on Finance Charge upon Prepayment",
    ],
    display: &[
        "Creditor",
        "Borrower",
        APR,
        "Finance Charge",
        "Amount Financed",
        "Total of Payments",
        "Monthly Payment Amount",
        "Number of Payments",
        "Returned Payment Fee",
        "Origination Fee",
        "Late Charges",
    ],
};

pub static LOAN_DOCUMENT: RecordSchema = RecordSchema {
    kind: RecordKind::LoanDocument,
    identifier: LOAN_ID,
    fields: &[
        LOAN_ID,
        "Borrower",
        BOOKING_DATE,
        PAYMENT_MONTH_DATE,
        "Late Fee Charges",
        "Returned Payment Charges",
    ],
    display: &[
        "Borrower",
        BOOKING_DATE,
        PAYMENT_MONTH_DATE,
        "Late Fee Charges",
        "Returned Payment Charges",
    ],
};

pub static SPREADSHEET_ROW: RecordSchema = RecordSchema {
    kind: RecordKind::SpreadsheetRow,
    identifier: LOAN_ID,
    fields: &[
        "Application Id",
        LOAN_ID,
        "Borrower",
        APR,
        "Finance Charge",
        "Amount Financed",
        "Total of Payments",
        "EMI Amount",
        "Number of Payments",
        "Returned Payment Charges",
        "Origination Fee",
        BOOKING_DATE,
        "Late Fee Charges",
    ],
    display: &[
        "Borrower",
        APR,
        "Finance Charge",
        "Amount Financed",
        "Total of Payments",
        "EMI Amount",
        "Number of Payments",
        "Returned Payment Charges",
        "Origination Fee",
        BOOKING_DATE,
        "Late Fee Charges",
    ],
};

impl RecordSchema {
    /// Validate one structured object against this schema.
    ///
    /// Unknown keys are dropped. Nested values and booleans are rejected.
    pub fn validate(&self, source: &str, value: &serde_json::Value) -> Result<Record, ReconError> {
        let obj = value.as_object().ok_or_else(|| ReconError::Schema {
            source: source.into(),
            message: format!("expected an object, got {}", json_type_name(value)),
        })?;

        let mut record = Record::new(self.kind, source);
        for field in self.fields {
            let converted = match obj.get(*field) {
                None => FieldValue::NotAvailable,
                Some(v) => convert_value(v).map_err(|message| ReconError::Schema {
                    source: source.into(),
                    message: format!("field '{field}': {message}"),
                })?,
            };
            record.fields.insert((*field).to_string(), converted);
        }

        for key in obj.keys() {
            if !self.fields.contains(&key.as_str()) {
                log::debug!("{source}: ignoring unexpected field '{key}'");
            }
        }

        if !record.identifier().is_available() {
            return Err(ReconError::Schema {
                source: source.into(),
                message: format!("missing identifier '{}'", self.identifier),
            });
        }

        Ok(record)
    }
}

/// Convert a raw JSON scalar into a typed value.
pub fn convert_value(value: &serde_json::Value) -> Result<FieldValue, String> {
    match value {
        serde_json::Value::Null => Ok(FieldValue::NotAvailable),
        serde_json::Value::Number(n) => n
            .as_f64()
            .map(FieldValue::Number)
            .ok_or_else(|| format!("number out of range: {n}")),
        serde_json::Value::String(s) => Ok(text_value(s)),
        other => Err(format!("unsupported value type {}", json_type_name(other))),
    }
}

/// Trimmed text, or NotAvailable for blank and `N/A` markers.
pub fn text_value(s: &str) -> FieldValue {
    let trimmed = s.trim();
    if trimmed.is_empty()
        || trimmed.eq_ignore_ascii_case("n/a")
        || trimmed.eq_ignore_ascii_case("na")
    {
        FieldValue::NotAvailable
    } else {
        FieldValue::Text(trimmed.to_string())
    }
}

fn json_type_name(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn validate_converts_absence_to_not_available() {
        let value = json!({
            "Account Number": "100",
            "Finance Charge": "$500.00",
            "Borrower": null,
            "Origination Fee": "N/A",
            "Late Charges": "  ",
        });
        let record = TILA_DOCUMENT.validate("a.pdf", &value).unwrap();
        assert_eq!(record.kind, RecordKind::TilaDocument);
        assert_eq!(record.get("Finance Charge"), &FieldValue::Text("$500.00".into()));
        assert_eq!(record.get("Borrower"), &FieldValue::NotAvailable);
        assert_eq!(record.get("Origination Fee"), &FieldValue::NotAvailable);
        assert_eq!(record.get("Late Charges"), &FieldValue::NotAvailable);
        // Never sent at all
        assert_eq!(record.get("Creditor"), &FieldValue::NotAvailable);
        // Every schema field is present as a key
        assert_eq!(record.fields.len(), TILA_DOCUMENT.fields.len());
    }

    #[test]
    fn validate_keeps_numbers() {
        let value = json!({ "Loan Id": 100, "Annual Percentage Rate (APR)": 0.0599 });
        let record = SPREADSHEET_ROW.validate("sheet:0", &value).unwrap();
        assert_eq!(record.identifier(), &FieldValue::Number(100.0));
        assert_eq!(record.get(APR), &FieldValue::Number(0.0599));
    }

    #[test]
    fn validate_drops_unknown_fields() {
        let value = json!({ "Loan Id": "7", "Favourite Colour": "blue" });
        let record = LOAN_DOCUMENT.validate("loan.pdf", &value).unwrap();
        assert!(!record.fields.contains_key("Favourite Colour"));
    }

    #[test]
    fn reject_missing_identifier() {
        let err = TILA_DOCUMENT
            .validate("a.pdf", &json!({ "Borrower": "Jane" }))
            .unwrap_err();
        assert!(err.to_string().contains("missing identifier 'Account Number'"));
    }

    #[test]
    fn reject_non_object() {
        let err = TILA_DOCUMENT.validate("a.pdf", &json!([1, 2])).unwrap_err();
        assert!(err.to_string().contains("expected an object, got array"));
    }

    #[test]
    fn reject_nested_value() {
        let err = SPREADSHEET_ROW
            .validate("sheet:3", &json!({ "Loan Id": "1", "Borrower": { "first": "J" } }))
            .unwrap_err();
        assert!(err.to_string().contains("field 'Borrower'"));
        assert!(err.to_string().contains("sheet:3"));
    }

    #[test]
    fn display_fields_are_schema_fields() {
        for schema in [&TILA_DOCUMENT, &LOAN_DOCUMENT, &SPREADSHEET_ROW] {
            for field in schema.display {
                assert!(schema.fields.contains(field), "{field} not in {:?}", schema.kind);
            }
            assert!(schema.fields.contains(&schema.identifier));
        }
    }
}
