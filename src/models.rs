use serde::{Deserialize, Serialize};

/// Bearer token claims. Tokens are issued by the identity service.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: u64,
    pub sub: String,
    pub role: u8, // role id
    pub exp: usize,

    /// Present only if this user is on the intern roster
    pub person_id: Option<u64>,
}
