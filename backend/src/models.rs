use crate::survey::Category;
use fhe_provider::types::{Address, OpaqueValue};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
pub struct SubmitRequest {
    pub category: Category,

    /// Client-encrypted rating plus its ingestion proof, base64.
    pub rating_ciphertext_b64: String,
    pub rating_proof_b64: String,

    /// The category again, as an encrypted value bound to the record.
    pub category_ciphertext_b64: String,
    pub category_proof_b64: String,

    /// Free-form feedback; stored verbatim, never aggregated.
    #[serde(default)]
    pub feedback: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SubmitResponse {
    pub sequence_id: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LengthResponse {
    pub length: u64,
}

/// An opaque statistic handle. Decryption happens off-core through the
/// oracle, against the grants the caller holds.
#[derive(Debug, Serialize, Deserialize)]
pub struct HandleResponse {
    pub handle: OpaqueValue,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DepartmentStatsResponse {
    pub category: Category,
    pub sum_handle: OpaqueValue,
    pub count_handle: OpaqueValue,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ManagerRequest {
    pub target: Address,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DepartmentAccessRequest {
    pub target: Address,
    pub category: Category,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MultiDepartmentAccessRequest {
    pub target: Address,
    pub categories: Vec<Category>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct OkResponse {
    pub ok: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn submit_request_wire_shape() {
        let json = r#"{
            "category": 3,
            "rating_ciphertext_b64": "AAEC",
            "rating_proof_b64": "AwQ=",
            "category_ciphertext_b64": "BQY=",
            "category_proof_b64": "Bwg="
        }"#;
        let req: SubmitRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.category, 3);
        // Feedback is optional on the wire.
        assert!(req.feedback.is_empty());
    }

    #[test]
    fn handles_and_addresses_serialize_as_scalars() {
        let resp = DepartmentStatsResponse {
            category: 1,
            sum_handle: OpaqueValue(7),
            count_handle: OpaqueValue(8),
        };
        let v = serde_json::to_value(&resp).unwrap();
        assert_eq!(v["sum_handle"], 7);

        let req = ManagerRequest {
            target: Address::from_byte(0x22),
        };
        let v = serde_json::to_value(&req).unwrap();
        assert_eq!(v["target"], format!("0x{}", "22".repeat(20)));
    }
}
