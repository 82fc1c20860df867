use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ProposalKey {
    pub address: String,
    pub key_index: u32,
    pub sequence_number: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct TransactionSignature {
    pub address: String,
    pub key_index: u32,
    /// Hex `r || s`
    pub signature: String,
}

/// Body of `POST /v1/transactions`. Scripts are hex, arguments are type-tagged JSON values.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct TransactionBody {
    pub script: String,
    pub arguments: Vec<serde_json::Value>,
    pub gas_limit: String,
    pub proposal_key: ProposalKey,
    pub payer: String,
    pub authorizers: Vec<String>,
    pub payload_signatures: Vec<TransactionSignature>,
    pub envelope_signatures: Vec<TransactionSignature>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct SubmitResponse {
    pub id: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionStatus {
    Pending,
    Finalized,
    Executed,
    Sealed,
    Expired,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct EventResponse {
    #[serde(rename = "type")]
    pub event_type: String,
    pub payload: serde_json::Value,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct TransactionResultResponse {
    pub status: ExecutionStatus,
    #[serde(default)]
    pub error_message: String,
    #[serde(default)]
    pub events: Vec<EventResponse>,
}

impl TransactionResultResponse {
    /// Whether the transaction reached a state it will not leave
    pub fn is_final(&self) -> bool {
        matches!(
            self.status,
            ExecutionStatus::Sealed | ExecutionStatus::Expired
        ) || !self.error_message.is_empty()
    }
}

/// Body of `POST /v1/scripts`
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ScriptBody {
    pub script: String,
    pub arguments: Vec<serde_json::Value>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct AccountKeyResponse {
    pub index: String,
    pub public_key: String,
    pub signing_algorithm: String,
    pub hashing_algorithm: String,
    pub sequence_number: String,
    #[serde(default)]
    pub revoked: bool,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct AccountResponse {
    pub address: String,
    #[serde(default)]
    pub keys: Vec<AccountKeyResponse>,
    /// Contract name to hex code
    #[serde(default)]
    pub contracts: HashMap<String, String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct NetworkParameters {
    pub chain_id: String,
}
