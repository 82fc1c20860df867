use super::{
    AccountInfo, AccountKeyInfo, Event, Gateway, GatewayError, GatewayResult, TransactionResult,
    TransactionStatus,
};
use crate::{
    address::{remove_hex_prefix, Address},
    gateway::embedded::programs::ACCOUNT_CREATED_EVENT,
    transaction::{SignedTransaction, TransactionSignature},
    values::Value,
};
use async_trait::async_trait;
use ledger_http_client::{
    models::{
        self, AccountResponse, ExecutionStatus, ProposalKey, ScriptBody, TransactionBody,
        TransactionResultResponse,
    },
    LedgerHttp, LedgerHttpTrait,
};
use std::{collections::BTreeMap, time::Duration};
use tracing::{debug, warn};

#[cfg(test)]
mod tests;

/// Event type access nodes use for account creation
pub const NODE_ACCOUNT_CREATED_EVENT: &str = "flow.AccountCreated";

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);
const DEFAULT_MAX_ATTEMPTS: u32 = 120;

/// Gateway to a live network through its REST access node
pub struct RemoteGateway {
    client: LedgerHttp,
    poll_interval: Duration,
    max_attempts: u32,
}

impl RemoteGateway {
    #[allow(missing_docs)]
    pub fn new(url: &str) -> Self {
        RemoteGateway {
            client: LedgerHttp::new(url),
            poll_interval: DEFAULT_POLL_INTERVAL,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }

    /// How long to wait between transaction result polls
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// How many polls before giving up with [`GatewayError::Timeout`]
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    #[allow(missing_docs)]
    pub fn url(&self) -> &str {
        self.client.parent_url()
    }

    async fn await_result(&self, id: &str) -> GatewayResult<TransactionResultResponse> {
        for attempt in 1..=self.max_attempts {
            let res = self
                .client
                .transaction_result(id)
                .await
                .map_err(transport)?;
            if res.is_final() {
                return Ok(res);
            }
            debug!(id, attempt, status = ?res.status, "Transaction not final yet");
            tokio::time::sleep(self.poll_interval).await;
        }
        Err(GatewayError::Timeout {
            id: id.to_string(),
            attempts: self.max_attempts,
        })
    }
}

#[async_trait]
impl Gateway for RemoteGateway {
    async fn ping(&self) -> GatewayResult<String> {
        let params = self.client.network_parameters().await.map_err(transport)?;
        Ok(params.chain_id)
    }

    async fn submit_signed(&self, tx: &SignedTransaction) -> GatewayResult<TransactionResult> {
        let body = transaction_body(tx)?;
        let submitted = self
            .client
            .submit_transaction(&body)
            .await
            .map_err(transport)?;
        debug!(id = %submitted.id, "Submitted transaction");
        let res = self.await_result(&submitted.id).await?;
        Ok(transaction_result(submitted.id, res))
    }

    async fn execute_query(&self, code: &[u8], arguments: &[Value]) -> GatewayResult<Value> {
        let body = ScriptBody {
            script: hex::encode(code),
            arguments: json_arguments(arguments)?,
        };
        let res = self
            .client
            .execute_script(&body)
            .await
            .map_err(transport)?;
        serde_json::from_value(res).map_err(|e| GatewayError::InvalidResponse(e.to_string()))
    }

    async fn account_info(&self, address: &Address) -> GatewayResult<AccountInfo> {
        let res = self
            .client
            .account(&address.to_hex())
            .await
            .map_err(|e| match e {
                ledger_http_client::error::Error::Status { status: 404, .. } => {
                    GatewayError::AccountNotFound(*address)
                }
                other => transport(other),
            })?;
        account_info(res)
    }
}

fn transport(e: ledger_http_client::error::Error) -> GatewayError {
    GatewayError::Transport(Box::new(e))
}

fn invalid<E: std::fmt::Display>(what: &str) -> impl Fn(E) -> GatewayError + '_ {
    move |e| GatewayError::InvalidResponse(format!("{what}: {e}"))
}

fn json_arguments(arguments: &[Value]) -> GatewayResult<Vec<serde_json::Value>> {
    arguments
        .iter()
        .map(|arg| serde_json::to_value(arg).map_err(invalid("argument")))
        .collect()
}

fn signature_body(signature: &TransactionSignature) -> models::TransactionSignature {
    models::TransactionSignature {
        address: signature.address.to_string(),
        key_index: signature.key_index,
        signature: hex::encode(&signature.signature),
    }
}

pub(crate) fn transaction_body(signed: &SignedTransaction) -> GatewayResult<TransactionBody> {
    let tx = signed.transaction();
    Ok(TransactionBody {
        script: hex::encode(tx.code()),
        arguments: json_arguments(tx.arguments())?,
        gas_limit: tx.gas_limit().to_string(),
        proposal_key: ProposalKey {
            address: tx.proposer().address().to_string(),
            key_index: tx.proposer().key_index(),
            sequence_number: signed.sequence_number().to_string(),
        },
        payer: tx.payer().address().to_string(),
        authorizers: tx
            .authorizers()
            .iter()
            .map(|a| a.address().to_string())
            .collect(),
        payload_signatures: signed.payload_signatures().map(signature_body).collect(),
        envelope_signatures: signed.envelope_signatures().map(signature_body).collect(),
    })
}

fn event_field(raw: serde_json::Value) -> Value {
    if let Ok(value) = serde_json::from_value::<Value>(raw.clone()) {
        return value;
    }
    match raw {
        serde_json::Value::String(s) => match Address::from_hex(&s) {
            Ok(address) if s.starts_with("0x") => Value::Address(address),
            _ => Value::String(s),
        },
        serde_json::Value::Bool(b) => Value::Bool(b),
        other => Value::String(other.to_string()),
    }
}

fn event(raw: models::EventResponse) -> Event {
    let name = if raw.event_type == NODE_ACCOUNT_CREATED_EVENT {
        ACCOUNT_CREATED_EVENT.to_string()
    } else {
        raw.event_type
    };
    let fields = match raw.payload {
        serde_json::Value::Object(map) => map
            .into_iter()
            .map(|(key, value)| (key, event_field(value)))
            .collect(),
        serde_json::Value::Null => BTreeMap::new(),
        other => BTreeMap::from([("payload".to_string(), event_field(other))]),
    };
    Event { name, fields }
}

pub(crate) fn transaction_result(id: String, res: TransactionResultResponse) -> TransactionResult {
    let events = res.events.into_iter().map(event).collect();
    let (status, error) = match (res.status, res.error_message) {
        (_, message) if !message.is_empty() => (TransactionStatus::Rejected, Some(message)),
        (ExecutionStatus::Sealed, _) => (TransactionStatus::Sealed, None),
        (status, _) => {
            warn!(%id, ?status, "Transaction finished without sealing");
            (
                TransactionStatus::Rejected,
                Some(format!("transaction ended as {status:?}")),
            )
        }
    };
    TransactionResult {
        id,
        status,
        events,
        error,
    }
}

pub(crate) fn account_info(res: AccountResponse) -> GatewayResult<AccountInfo> {
    let address = Address::from_hex(&res.address).map_err(invalid("account address"))?;
    let keys = res
        .keys
        .into_iter()
        .filter(|key| !key.revoked)
        .map(|key| -> GatewayResult<AccountKeyInfo> {
            Ok(AccountKeyInfo {
                index: key.index.parse().map_err(invalid("key index"))?,
                public_key: remove_hex_prefix(&key.public_key).to_string(),
                signature_algorithm: key
                    .signing_algorithm
                    .parse()
                    .map_err(invalid("signing algorithm"))?,
                hash_algorithm: key
                    .hashing_algorithm
                    .parse()
                    .map_err(invalid("hashing algorithm"))?,
                sequence_number: key
                    .sequence_number
                    .parse()
                    .map_err(invalid("sequence number"))?,
            })
        })
        .collect::<GatewayResult<Vec<_>>>()?;
    let contracts = res
        .contracts
        .into_iter()
        .map(|(name, code)| -> GatewayResult<(String, Vec<u8>)> {
            let code = hex::decode(remove_hex_prefix(&code)).map_err(invalid("contract code"))?;
            Ok((name, code))
        })
        .collect::<GatewayResult<BTreeMap<_, _>>>()?;
    Ok(AccountInfo {
        address,
        keys,
        contracts,
    })
}
