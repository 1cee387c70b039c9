//! Mismatch notifications.
//!
//! Messages follow one fixed template per category. Dispatch is
//! fire-and-forget: [`dispatch`] logs a failed send and returns nothing.

use std::time::Duration;

use serde::Serialize;
use tila_recon::schema::APR;

/// Field a notification is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MismatchCategory {
    Borrower,
    Apr,
    FinanceCharge,
    AmountFinanced,
    TotalOfPayments,
    MonthlyPayment,
    NumberOfPayments,
    ReturnedPaymentFee,
    OriginationFee,
    LateCharges,
}

impl MismatchCategory {
    pub const ALL: [MismatchCategory; 10] = [
        Self::Borrower,
        Self::Apr,
        Self::FinanceCharge,
        Self::AmountFinanced,
        Self::TotalOfPayments,
        Self::MonthlyPayment,
        Self::NumberOfPayments,
        Self::ReturnedPaymentFee,
        Self::OriginationFee,
        Self::LateCharges,
    ];

    /// Report label of the mapped field.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Borrower => "Borrower",
            Self::Apr => APR,
            Self::FinanceCharge => "Finance Charge",
            Self::AmountFinanced => "Amount Financed",
            Self::TotalOfPayments => "Total of Payments",
            Self::MonthlyPayment => "Monthly Payment Amount",
            Self::NumberOfPayments => "Number of Payments",
            Self::ReturnedPaymentFee => "Returned Payment Fee",
            Self::OriginationFee => "Origination Fee",
            Self::LateCharges => "Late Charges",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.label() == label)
    }

    /// Short CLI name (`late-charges`).
    pub fn slug(&self) -> String {
        match self {
            Self::Apr => "apr".to_string(),
            other => other.label().to_ascii_lowercase().replace(' ', "-"),
        }
    }

    pub fn from_slug(slug: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.slug() == slug)
    }
}

impl std::fmt::Display for MismatchCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Message {
    pub to: String,
    pub from: String,
    pub subject: String,
    pub body: String,
}

/// Fixed-template message for one loan and category.
pub fn compose_message(loan_id: &str, category: MismatchCategory, to: &str, from: &str) -> Message {
    Message {
        to: to.to_string(),
        from: from.to_string(),
        subject: format!("Loan {}: {} mismatch", loan_id, category.label()),
        body: format!(
            "Hello,\n\n\
             The {field} recorded for loan {loan} does not match its TILA disclosure.\n\
             Please review the loan record and correct the {field} where needed.\n\n\
             This message was generated by tila {version}.\n",
            field = category.label(),
            loan = loan_id,
            version = env!("CARGO_PKG_VERSION"),
        ),
    }
}

#[derive(Debug)]
pub enum NotifyError {
    Network(String),
    Http(u16, String),
}

impl std::fmt::Display for NotifyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NotifyError::Network(msg) => write!(f, "Network error: {}", msg),
            NotifyError::Http(code, msg) => write!(f, "HTTP {}: {}", code, msg),
        }
    }
}

impl std::error::Error for NotifyError {}

pub trait Notifier {
    fn send(&self, message: &Message) -> Result<(), NotifyError>;
}

/// Send and forget. Failures are logged, never returned.
pub fn dispatch(notifier: &dyn Notifier, message: &Message) {
    match notifier.send(message) {
        Ok(()) => log::info!("notification sent: {}", message.subject),
        Err(e) => log::warn!("notification '{}' not sent: {}", message.subject, e),
    }
}

/// POSTs messages as JSON to a mail relay endpoint.
#[derive(Debug, Clone)]
pub struct RelayNotifier {
    http: reqwest::blocking::Client,
    endpoint: String,
    token: Option<String>,
}

impl RelayNotifier {
    pub fn new(endpoint: &str, token: Option<String>, timeout: Duration) -> Result<Self, NotifyError> {
        let http = reqwest::blocking::Client::builder()
            .user_agent(format!("tila/{}", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(|e| NotifyError::Network(e.to_string()))?;
        Ok(Self {
            http,
            endpoint: endpoint.to_string(),
            token,
        })
    }
}

impl Notifier for RelayNotifier {
    fn send(&self, message: &Message) -> Result<(), NotifyError> {
        let mut request = self.http.post(&self.endpoint).json(message);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        let response = request
            .send()
            .map_err(|e| NotifyError::Network(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            return Err(NotifyError::Http(status, response.text().unwrap_or_default()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    #[test]
    fn template_names_loan_and_field() {
        let msg = compose_message("100", MismatchCategory::LateCharges, "ops@example.com", "tila@example.com");
        assert_eq!(msg.subject, "Loan 100: Late Charges mismatch");
        assert!(msg.body.contains("The Late Charges recorded for loan 100"));
        assert_eq!(msg.to, "ops@example.com");
    }

    #[test]
    fn slugs_round_trip() {
        for c in MismatchCategory::ALL {
            assert_eq!(MismatchCategory::from_slug(&c.slug()), Some(c));
            assert_eq!(MismatchCategory::from_label(c.label()), Some(c));
        }
        assert_eq!(MismatchCategory::LateCharges.slug(), "late-charges");
        assert_eq!(MismatchCategory::Apr.slug(), "apr");
    }

    #[test]
    fn relay_posts_message() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/send")
                .header("Authorization", "Bearer relay")
                .json_body(json!({
                    "to": "a@x", "from": "b@x", "subject": "s", "body": "b"
                }));
            then.status(202);
        });

        let notifier = RelayNotifier::new(&server.url("/send"), Some("relay".into()), Duration::from_secs(5)).unwrap();
        let msg = Message { to: "a@x".into(), from: "b@x".into(), subject: "s".into(), body: "b".into() };
        notifier.send(&msg).unwrap();
        mock.assert();
    }

    #[test]
    fn dispatch_swallows_failure() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST);
            then.status(500).body("relay down");
        });
        let notifier = RelayNotifier::new(&server.base_url(), None, Duration::from_secs(5)).unwrap();
        let msg = compose_message("1", MismatchCategory::Apr, "a@x", "b@x");

        assert!(matches!(notifier.send(&msg), Err(NotifyError::Http(500, _))));
        dispatch(&notifier, &msg);
        mock.assert_hits(2);
    }
}
