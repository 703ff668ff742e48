use serde::Serialize;

/// Append-only record of a failed validation, kept for diagnostic counts.
/// Not itself gating state.
#[derive(Debug, Clone, Serialize)]
pub struct FailedAttempt {
    pub id: String,
    pub ip_address: String,
    pub attempted_at: i64,
}
