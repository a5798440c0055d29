use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Roster entry. Read-only to the attendance engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
#[schema(
    example = json!({
        "id": 7,
        "name": "Jane Doe",
        "email": "jane.doe@company.com",
        "department": "Engineering",
        "supervisor": "John Smith"
    })
)]
pub struct Person {
    #[schema(example = 7)]
    pub id: u64,

    #[schema(example = "Jane Doe")]
    pub name: String,

    #[schema(example = "jane.doe@company.com", nullable = true)]
    pub email: Option<String>,

    #[schema(example = "Engineering")]
    pub department: String,

    #[schema(example = "John Smith", nullable = true)]
    pub supervisor: Option<String>,
}

impl Person {
    /// Trimmed email address, `None` when missing or blank.
    pub fn email_address(&self) -> Option<&str> {
        self.email
            .as_deref()
            .map(str::trim)
            .filter(|e| !e.is_empty())
    }
}
