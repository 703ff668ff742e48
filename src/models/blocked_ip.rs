use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockedIp {
    pub ip_address: String,
    pub reason: Option<String>,
    /// Issuing subject, or "service" for automated abuse signals
    pub blocked_by: String,
    pub blocked_at: i64,
    /// None = permanent. Expired rows stay in the store and are treated as
    /// inactive at lookup time.
    pub expires_at: Option<i64>,
}

impl BlockedIp {
    pub fn is_active(&self, now: i64) -> bool {
        match self.expires_at {
            Some(expires_at) => expires_at > now,
            None => true,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct BlockIpRequest {
    pub ip_address: String,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub expires_at: Option<i64>,
}

/// Listing row: the stored block plus its activity computed at read time.
#[derive(Debug, Serialize)]
pub struct BlockedIpEntry {
    #[serde(flatten)]
    pub block: BlockedIp,
    pub active: bool,
}
