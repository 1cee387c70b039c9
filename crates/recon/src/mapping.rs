//! Compile-time field mapping tables.

use serde::Serialize;

use crate::error::ReconError;
use crate::model::RecordKind;
use crate::schema::APR;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldTransform {
    None,
    /// Rate stored as a fraction (0.0599) on the counterpart side.
    PercentFraction,
}

/// One compared field: its name in each source.
#[derive(Debug, Clone, Copy)]
pub struct FieldPair {
    /// Report label. Always the TILA field name.
    pub label: &'static str,
    pub document: &'static str,
    pub spreadsheet: &'static str,
    /// Loan document field, three-way mappings only.
    pub loan: Option<&'static str>,
    pub transform: FieldTransform,
}

const fn pair(document: &'static str, spreadsheet: &'static str) -> FieldPair {
    FieldPair {
        label: document,
        document,
        spreadsheet,
        loan: None,
        transform: FieldTransform::None,
    }
}

const fn triple(document: &'static str, loan: &'static str, spreadsheet: &'static str) -> FieldPair {
    FieldPair {
        label: document,
        document,
        spreadsheet,
        loan: Some(loan),
        transform: FieldTransform::None,
    }
}

#[derive(Debug)]
pub struct FieldMapping {
    pub name: &'static str,
    /// Requires a loan document counterpart for every TILA record.
    pub three_way: bool,
    pub pairs: &'static [FieldPair],
}

/// TILA document ↔ spreadsheet row.
pub static TILA_VS_SPREADSHEET: FieldMapping = FieldMapping {
    name: "tila_vs_spreadsheet",
    three_way: false,
    pairs: &[
        pair("Borrower", "Borrower"),
        FieldPair {
            label: APR,
            document: APR,
            spreadsheet: APR,
            loan: None,
            transform: FieldTransform::PercentFraction,
        },
        pair("Finance Charge", "Finance Charge"),
        pair("Amount Financed", "Amount Financed"),
        pair("Total of Payments", "Total of Payments"),
        pair("Monthly Payment Amount", "EMI Amount"),
        pair("Number of Payments", "Number of Payments"),
        pair("Returned Payment Fee", "Returned Payment Charges"),
        pair("Origination Fee", "Origination Fee"),
        pair("Late Charges", "Late Fee Charges"),
    ],
};

/// TILA document ↔ loan document ↔ spreadsheet row, fee fields.
pub static THREE_WAY_FEES: FieldMapping = FieldMapping {
    name: "three_way_fees",
    three_way: true,
    pairs: &[
        triple("Late Charges", "Late Fee Charges", "Late Fee Charges"),
        triple("Returned Payment Fee", "Returned Payment Charges", "Returned Payment Charges"),
    ],
};

impl FieldMapping {
    pub fn by_name(name: &str) -> Option<&'static FieldMapping> {
        [&TILA_VS_SPREADSHEET, &THREE_WAY_FEES]
            .into_iter()
            .find(|m| m.name == name)
    }

    pub fn labels(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.pairs.iter().map(|p| p.label)
    }

    /// Source kinds compared, in column order.
    pub fn sources(&self) -> &'static [RecordKind] {
        if self.three_way {
            &[RecordKind::TilaDocument, RecordKind::LoanDocument, RecordKind::SpreadsheetRow]
        } else {
            &[RecordKind::TilaDocument, RecordKind::SpreadsheetRow]
        }
    }

    /// Check every mapped name against the record schemas.
    pub fn validate(&self) -> Result<(), ReconError> {
        for p in self.pairs {
            check_field(RecordKind::TilaDocument, p.document)?;
            check_field(RecordKind::SpreadsheetRow, p.spreadsheet)?;
            match (self.three_way, p.loan) {
                (true, Some(loan)) => check_field(RecordKind::LoanDocument, loan)?,
                (true, None) => {
                    return Err(ReconError::UnknownField {
                        kind: RecordKind::LoanDocument.to_string(),
                        field: format!("<unmapped for '{}'>", p.label),
                    })
                }
                (false, _) => {}
            }
        }
        Ok(())
    }
}

fn check_field(kind: RecordKind, field: &str) -> Result<(), ReconError> {
    if kind.schema().fields.contains(&field) {
        Ok(())
    } else {
        Err(ReconError::UnknownField {
            kind: kind.to_string(),
            field: field.into(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_mappings_fit_schemas() {
        TILA_VS_SPREADSHEET.validate().unwrap();
        THREE_WAY_FEES.validate().unwrap();
    }

    #[test]
    fn lookup_by_name() {
        assert!(FieldMapping::by_name("three_way_fees").unwrap().three_way);
        assert!(FieldMapping::by_name("nope").is_none());
    }

    #[test]
    fn emi_maps_to_monthly_payment() {
        let p = TILA_VS_SPREADSHEET
            .pairs
            .iter()
            .find(|p| p.label == "Monthly Payment Amount")
            .unwrap();
        assert_eq!(p.spreadsheet, "EMI Amount");
    }

    #[test]
    fn only_apr_is_scaled() {
        let scaled: Vec<_> = TILA_VS_SPREADSHEET
            .pairs
            .iter()
            .filter(|p| p.transform == FieldTransform::PercentFraction)
            .map(|p| p.label)
            .collect();
        assert_eq!(scaled, vec![APR]);
    }
}
