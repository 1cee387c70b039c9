//! Value normalization: decorations stripped, numbers rounded to hundredths.

use serde::Serialize;

use crate::mapping::FieldTransform;
use crate::model::{FieldValue, RecordKind};

/// Canonical comparable form of a [`FieldValue`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Normalized {
    /// Value in hundredths, rounded half away from zero.
    Number(i64),
    Text(String),
    NotAvailable,
}

impl Normalized {
    pub fn display(&self) -> String {
        match self {
            Self::Number(hundredths) => format_hundredths(*hundredths),
            Self::Text(s) => s.clone(),
            Self::NotAvailable => "NA".into(),
        }
    }

    pub fn is_available(&self) -> bool {
        !matches!(self, Self::NotAvailable)
    }
}

/// Normalize without any field-specific transform.
pub fn normalize(value: &FieldValue) -> Normalized {
    normalize_for(value, FieldTransform::None, RecordKind::TilaDocument)
}

/// Normalize a value read from `kind` for a field carrying `transform`.
///
/// `PercentFraction` scales by 100 only on non-TILA sources, only when the
/// value was not written with a `%` sign and its magnitude is below 1.
pub fn normalize_for(value: &FieldValue, transform: FieldTransform, kind: RecordKind) -> Normalized {
    let scale_fraction = transform == FieldTransform::PercentFraction && kind != RecordKind::TilaDocument;

    match value {
        FieldValue::NotAvailable => Normalized::NotAvailable,
        FieldValue::Number(n) => number(*n, scale_fraction),
        FieldValue::Text(raw) => {
            let trimmed = raw.trim();
            if trimmed.is_empty() {
                return Normalized::NotAvailable;
            }
            let had_percent = trimmed.contains('%');
            let stripped: String = trimmed
                .chars()
                .filter(|c| !matches!(c, '$' | '%' | ','))
                .collect();
            match stripped.trim().parse::<f64>() {
                Ok(n) if n.is_finite() => number(n, scale_fraction && !had_percent),
                _ => Normalized::Text(trimmed.to_string()),
            }
        }
    }
}

fn number(n: f64, scale_fraction: bool) -> Normalized {
    if !n.is_finite() {
        return Normalized::NotAvailable;
    }
    let hundredths = if scale_fraction && n.abs() < 1.0 {
        (n * 10_000.0).round()
    } else {
        (n * 100.0).round()
    };
    Normalized::Number(hundredths as i64)
}

/// Render hundredths with exactly two decimals.
pub fn format_hundredths(hundredths: i64) -> String {
    let sign = if hundredths < 0 { "-" } else { "" };
    let abs = hundredths.unsigned_abs();
    format!("{sign}{}.{:02}", abs / 100, abs % 100)
}

/// Canonical identifier form for loose equality.
///
/// Text compares as exact trimmed text (`"00123"` and `"123"` differ). A
/// number compares through its canonical decimal form, so `100` and `100.0`
/// both agree with the text `"100"`. `None` for absent identifiers.
pub fn identifier_key(value: &FieldValue) -> Option<String> {
    match value {
        FieldValue::NotAvailable => None,
        FieldValue::Number(n) => Some(numeric_key(*n)),
        FieldValue::Text(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
    }
}

/// Shortest decimal form: `100.0` prints as `100`, `1e16` in full.
fn numeric_key(n: f64) -> String {
    format!("{n}")
}

/// Identifier as shown in reports.
pub fn identifier_display(value: &FieldValue) -> String {
    identifier_key(value).unwrap_or_else(|| "NA".into())
}
