use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Rendered notification, ready to hand to a mailer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub to: String,
    pub subject: String,
    pub text_body: String,
    pub html_body: String,
}

/// Outcome of one delivery attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct NotificationResult {
    #[schema(example = 7)]
    pub person_id: u64,
    #[schema(example = "jane.doe@company.com", nullable = true)]
    pub email: Option<String>,
    pub success: bool,
    #[schema(example = "missing email address", nullable = true)]
    pub error: Option<String>,
    #[schema(nullable = true)]
    pub message_id: Option<String>,
}

impl NotificationResult {
    pub fn sent(person_id: u64, email: &str, message_id: Option<String>) -> Self {
        Self {
            person_id,
            email: Some(email.to_string()),
            success: true,
            error: None,
            message_id,
        }
    }

    pub fn failed(person_id: u64, email: Option<&str>, error: impl Into<String>) -> Self {
        Self {
            person_id,
            email: email.map(str::to_string),
            success: false,
            error: Some(error.into()),
            message_id: None,
        }
    }
}

/// Aggregate of one bulk dispatch run, results in processing order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "total": 3,
    "sent": 1,
    "failed": 2,
    "skipped": 0,
    "results": [
        { "person_id": 1, "email": "a@x.com", "success": true, "error": null, "message_id": "<id@x.com>" },
        { "person_id": 2, "email": null, "success": false, "error": "missing email address", "message_id": null },
        { "person_id": 3, "email": "c@x.com", "success": false, "error": "SMTP transport error", "message_id": null }
    ]
}))]
pub struct BulkNotificationReport {
    /// Recipients actually attempted.
    pub total: usize,
    pub sent: usize,
    pub failed: usize,
    /// Recipients never attempted because the run was cancelled.
    pub skipped: usize,
    pub results: Vec<NotificationResult>,
}

impl BulkNotificationReport {
    pub fn from_results(results: Vec<NotificationResult>, skipped: usize) -> Self {
        let total = results.len();
        let sent = results.iter().filter(|r| r.success).count();
        Self {
            total,
            sent,
            failed: total - sent,
            skipped,
            results,
        }
    }
}
