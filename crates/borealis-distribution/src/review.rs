//! Review records.

use borealis_model::Timestamp;
use serde::{Deserialize, Serialize};

/// One directional credit to be settled externally.
///
/// Append-only: the distribution processor emits these for the settlement
/// component to review; they are never mutated after the processor returns.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReviewRecord {
    pub created_at: Timestamp,
    /// The account the credit is paid to.
    pub user_id: String,
    /// The account whose activity earned the credit.
    pub earner_user_id: String,
    pub internal_id: i64,
    pub username: String,
    pub referred_by_username: String,
    pub eth_address: String,
    pub balance: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrips_through_serde() {
        let record = ReviewRecord {
            created_at: Timestamp::from_millis(1_780_000_000_000),
            user_id: "user-1".to_string(),
            earner_user_id: "user-2".to_string(),
            internal_id: 7,
            username: "aria".to_string(),
            referred_by_username: "lumen".to_string(),
            eth_address: "0xabc".to_string(),
            balance: 12.75,
        };

        let encoded = serde_json::to_string(&record).unwrap();
        let decoded: ReviewRecord = serde_json::from_str(&encoded).unwrap();

        assert_eq!(record, decoded);
    }
}
