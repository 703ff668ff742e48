use serde::{Deserialize, Serialize};

/// Upper bound on device identifiers bound to a single license.
pub const MAX_HWID_BINDINGS: usize = 5;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct License {
    pub id: String,
    /// The credential presented by clients. Globally unique.
    pub key: String,
    /// Tier/category of the license (e.g. "standard", "premium")
    #[serde(rename = "type")]
    pub license_type: String,
    /// Subject this license was issued to, if any
    pub user_id: Option<String>,
    /// Issuing administrator
    pub admin_id: String,
    /// Bound device identifiers. Empty = not yet device-bound.
    pub hwids: Vec<String>,
    pub request_limit: i64,
    /// Monotonically non-decreasing usage counter
    pub request_count: i64,
    /// Expiry instant (unix seconds). Checked lazily at validation time.
    pub valid_until: i64,
    pub last_used_ip: Option<String>,
    pub created_at: i64,
}

impl License {
    pub fn is_expired(&self, now: i64) -> bool {
        now > self.valid_until
    }

    /// Device binding check. An empty set means the license is not yet
    /// bound and any device passes; binding happens only via explicit update.
    pub fn accepts_device(&self, hwid: &str) -> bool {
        self.hwids.is_empty() || self.hwids.iter().any(|h| h == hwid)
    }

    pub fn remaining_requests(&self) -> i64 {
        (self.request_limit - self.request_count).max(0)
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateLicense {
    #[serde(rename = "type")]
    pub license_type: String,
    #[serde(default)]
    pub user_id: Option<String>,
    /// Mandatory; creation is rejected without it.
    pub valid_until: Option<i64>,
    /// Defaults from configuration when absent.
    #[serde(default)]
    pub request_limit: Option<i64>,
    #[serde(default)]
    pub hwids: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateLicense {
    #[serde(rename = "type")]
    pub license_type: Option<String>,
    pub user_id: Option<String>,
    pub hwids: Option<Vec<String>>,
    pub request_limit: Option<i64>,
    pub valid_until: Option<i64>,
}
