//! Read-only JSON-RPC ledger backend.
//!
//! Every read is an `eth_call` against the lecture contract. Return data is
//! decoded with the core ABI reader; reverts come back as JSON-RPC errors
//! and are mapped to [`RejectReason`].
//!
//! Transactions are not signed here. Deployments that mint or create pair
//! this reader with their own [`crate::LedgerWriter`].

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use poap_kernel_core::abi::{encode_call, AbiReader, Token};
use poap_kernel_core::{Address, LectureHash, TokenId};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

use crate::error::{LedgerError, RejectReason, Result};
use crate::traits::{ClaimState, LedgerKey, LedgerLecture, LedgerReader, LedgerSchema};

/// Connection settings for a JSON-RPC node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RpcConfig {
    /// HTTP endpoint of the node.
    pub endpoint: String,
    /// Address of the lecture contract.
    pub contract: Address,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
    /// Block tag passed to `eth_call`.
    pub block_tag: String,
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:8545".into(),
            contract: Address::ZERO,
            timeout_secs: 10,
            block_tag: "latest".into(),
        }
    }
}

#[derive(Debug, Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<String>,
    #[serde(default)]
    error: Option<RpcErrorBody>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorBody {
    code: i64,
    message: String,
    #[serde(default)]
    data: Option<serde_json::Value>,
}

/// Ledger reader backed by a JSON-RPC node.
pub struct RpcLedger {
    client: reqwest::Client,
    config: RpcConfig,
    schema: LedgerSchema,
    next_id: AtomicU64,
}

impl RpcLedger {
    pub fn new(config: RpcConfig, schema: LedgerSchema) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            config,
            schema,
            next_id: AtomicU64::new(1),
        })
    }

    pub fn config(&self) -> &RpcConfig {
        &self.config
    }

    /// Perform an `eth_call` and return the raw result bytes.
    async fn call(&self, calldata: Vec<u8>) -> Result<Vec<u8>> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let request = RpcRequest {
            jsonrpc: "2.0",
            id,
            method: "eth_call",
            params: json!([
                {
                    "to": self.config.contract.to_hex(),
                    "data": format!("0x{}", hex::encode(&calldata)),
                },
                self.config.block_tag,
            ]),
        };
        debug!(
            id,
            selector = %hex::encode(calldata.get(..4).unwrap_or_default()),
            "eth_call"
        );

        let response = self
            .client
            .post(&self.config.endpoint)
            .json(&request)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(LedgerError::Transport(format!("node returned HTTP {}", status)));
        }
        let body: RpcResponse = response.json().await?;

        if let Some(error) = body.error {
            return Err(map_rpc_error(error));
        }
        let result = body
            .result
            .ok_or_else(|| LedgerError::Decode("response has neither result nor error".into()))?;
        decode_hex_data(&result)
    }

    fn unsupported(&self, operation: &'static str) -> LedgerError {
        LedgerError::Unsupported {
            schema: self.schema,
            operation,
        }
    }
}

fn decode_hex_data(s: &str) -> Result<Vec<u8>> {
    let digits = s.strip_prefix("0x").unwrap_or(s);
    hex::decode(digits).map_err(|e| LedgerError::Decode(format!("result is not hex: {}", e)))
}

fn map_rpc_error(error: RpcErrorBody) -> LedgerError {
    if let Some(serde_json::Value::String(data)) = &error.data {
        if let Ok(bytes) = decode_hex_data(data) {
            if !bytes.is_empty() {
                return LedgerError::Rejected(RejectReason::from_revert_data(&bytes));
            }
        }
    }
    if let Some(rest) = error.message.strip_prefix("execution reverted") {
        let message = rest.trim_start_matches(':').trim();
        let reason = if message.is_empty() {
            RejectReason::Other("execution reverted".into())
        } else {
            RejectReason::from_message(message)
        };
        return LedgerError::Rejected(reason);
    }
    LedgerError::Rpc {
        code: error.code,
        message: error.message,
    }
}

/// Missing records surface as a revert on some generations.
fn absent_on_not_found<T>(result: Result<Option<T>>) -> Result<Option<T>> {
    match result {
        Err(LedgerError::Rejected(RejectReason::LectureNotFound)) => Ok(None),
        other => other,
    }
}

/// `getLecture(uint256) -> (string name, uint256 timestamp, bool active, string tokenURI)`
fn decode_sequential(id: u64, data: &[u8]) -> Result<Option<LedgerLecture>> {
    let reader = AbiReader::new(data);
    let name = reader.string_at(0)?;
    let deadline = reader.u64_at(1)?;
    if name.is_empty() && deadline == 0 {
        return Ok(None);
    }
    Ok(Some(LedgerLecture::Sequential {
        id,
        name,
        deadline,
        active: reader.bool_at(2)?,
        token_uri: reader.string_at(3)?,
    }))
}

/// `getLecture(bytes32) -> (string name, uint256 deadline, string tokenURI)`
fn decode_hash_primary(hash: LectureHash, data: &[u8]) -> Result<Option<LedgerLecture>> {
    let reader = AbiReader::new(data);
    let name = reader.string_at(0)?;
    let deadline = reader.u64_at(1)?;
    if name.is_empty() && deadline == 0 {
        return Ok(None);
    }
    Ok(Some(LedgerLecture::HashPrimary {
        hash,
        name,
        deadline,
        token_uri: reader.string_at(2)?,
    }))
}

/// `getLectureByIndex(uint256) -> (bytes32 hash, string name, uint256 start, uint256 end, string tokenURI)`
fn decode_indexed_by_index(index: u64, data: &[u8]) -> Result<Option<LedgerLecture>> {
    let reader = AbiReader::new(data);
    let hash = reader.hash_at(0)?;
    if hash.is_zero() {
        return Ok(None);
    }
    Ok(Some(LedgerLecture::Indexed {
        index,
        hash,
        name: reader.string_at(1)?,
        start_time: reader.u64_at(2)?,
        end_time: reader.u64_at(3)?,
        token_uri: reader.string_at(4)?,
    }))
}

/// `getLecture(bytes32) -> (uint256 index, string name, uint256 start, uint256 end, string tokenURI)`
fn decode_indexed_by_hash(hash: LectureHash, data: &[u8]) -> Result<Option<LedgerLecture>> {
    let reader = AbiReader::new(data);
    let name = reader.string_at(1)?;
    let end_time = reader.u64_at(3)?;
    if name.is_empty() && end_time == 0 {
        return Ok(None);
    }
    Ok(Some(LedgerLecture::Indexed {
        index: reader.u64_at(0)?,
        hash,
        name,
        start_time: reader.u64_at(2)?,
        end_time,
        token_uri: reader.string_at(4)?,
    }))
}

#[async_trait]
impl LedgerReader for RpcLedger {
    fn schema(&self) -> LedgerSchema {
        self.schema
    }

    async fn lecture_count(&self) -> Result<u64> {
        let data = self.call(encode_call("getLectureCount()", &[])).await?;
        Ok(AbiReader::new(&data).u64_at(0)?)
    }

    async fn lecture_at(&self, position: u64) -> Result<Option<LedgerLecture>> {
        let arg = [Token::Uint(position.into())];
        match self.schema {
            LedgerSchema::Sequential => {
                let result = self.call(encode_call("getLecture(uint256)", &arg)).await;
                absent_on_not_found(result.and_then(|data| decode_sequential(position, &data)))
            }
            LedgerSchema::Indexed => {
                let result = self.call(encode_call("getLectureByIndex(uint256)", &arg)).await;
                absent_on_not_found(result.and_then(|data| decode_indexed_by_index(position, &data)))
            }
            LedgerSchema::HashPrimary => Err(self.unsupported("lecture_at")),
        }
    }

    async fn hash_at(&self, index: u64) -> Result<Option<LectureHash>> {
        if self.schema != LedgerSchema::HashPrimary {
            return Err(self.unsupported("hash_at"));
        }
        let result = self
            .call(encode_call("lectureCounter(uint256)", &[Token::Uint(index.into())]))
            .await
            .and_then(|data| {
                let hash = AbiReader::new(&data).hash_at(0)?;
                Ok((!hash.is_zero()).then_some(hash))
            });
        absent_on_not_found(result)
    }

    async fn lecture_by_hash(&self, hash: &LectureHash) -> Result<Option<LedgerLecture>> {
        let calldata = encode_call("getLecture(bytes32)", &[Token::from(*hash)]);
        let result = match self.schema {
            LedgerSchema::Sequential => return Err(self.unsupported("lecture_by_hash")),
            LedgerSchema::HashPrimary => self
                .call(calldata)
                .await
                .and_then(|data| decode_hash_primary(*hash, &data)),
            LedgerSchema::Indexed => self
                .call(calldata)
                .await
                .and_then(|data| decode_indexed_by_hash(*hash, &data)),
        };
        absent_on_not_found(result)
    }

    async fn claim_state(&self, key: &LedgerKey, attendee: &Address) -> Result<ClaimState> {
        let (calldata, token_id) = match (self.schema, key) {
            (LedgerSchema::Sequential, LedgerKey::Id(id)) => (
                encode_call(
                    "hasClaimed(uint256,address)",
                    &[Token::Uint((*id).into()), Token::from(*attendee)],
                ),
                Some(TokenId(*id)),
            ),
            (LedgerSchema::Sequential, LedgerKey::Hash(_)) => {
                return Err(self.unsupported("hash key"))
            }
            (_, LedgerKey::Hash(hash)) => (
                encode_call(
                    "hasClaimed(bytes32,address)",
                    &[Token::from(*hash), Token::from(*attendee)],
                ),
                None,
            ),
            (_, LedgerKey::Id(_)) => return Err(self.unsupported("numeric key")),
        };
        let data = self.call(calldata).await?;
        Ok(if AbiReader::new(&data).bool_at(0)? {
            ClaimState::Claimed { token_id }
        } else {
            ClaimState::Unclaimed
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use poap_kernel_core::abi::{encode, ERROR_STRING_SELECTOR};

    #[test]
    fn test_decode_sequential() {
        let data = encode(&[
            Token::String("Talk"),
            Token::Uint(500),
            Token::Bool(true),
            Token::String("ipfs://x"),
        ]);
        let lecture = decode_sequential(2, &data).unwrap().unwrap();
        assert_eq!(
            lecture,
            LedgerLecture::Sequential {
                id: 2,
                name: "Talk".into(),
                deadline: 500,
                active: true,
                token_uri: "ipfs://x".into(),
            }
        );
    }

    #[test]
    fn test_zeroed_struct_is_absent() {
        let data = encode(&[Token::String(""), Token::Uint(0), Token::String("")]);
        assert!(decode_hash_primary(LectureHash::ZERO, &data).unwrap().is_none());
    }

    #[test]
    fn test_decode_indexed_both_shapes() {
        let hash = LectureHash::from_bytes([9; 32]);
        let by_index = encode(&[
            Token::from(hash),
            Token::String("Talk"),
            Token::Uint(100),
            Token::Uint(200),
            Token::String("ipfs://x"),
        ]);
        let by_hash = encode(&[
            Token::Uint(4),
            Token::String("Talk"),
            Token::Uint(100),
            Token::Uint(200),
            Token::String("ipfs://x"),
        ]);
        assert_eq!(
            decode_indexed_by_index(4, &by_index).unwrap(),
            decode_indexed_by_hash(hash, &by_hash).unwrap()
        );
    }

    #[test]
    fn test_truncated_result_is_decode_error() {
        let err = decode_indexed_by_index(0, &[1u8; 40]).unwrap_err();
        assert!(matches!(err, LedgerError::Decode(_)));
    }

    #[test]
    fn test_revert_data_maps_to_reason() {
        let mut data = ERROR_STRING_SELECTOR.to_vec();
        data.extend_from_slice(&encode(&[Token::String("POAP already claimed")]));
        let error = RpcErrorBody {
            code: 3,
            message: "execution reverted: POAP already claimed".into(),
            data: Some(serde_json::Value::String(format!("0x{}", hex::encode(data)))),
        };
        assert!(matches!(
            map_rpc_error(error),
            LedgerError::Rejected(RejectReason::AlreadyClaimed)
        ));
    }

    #[test]
    fn test_revert_message_without_data() {
        let error = RpcErrorBody {
            code: -32000,
            message: "execution reverted: Invalid lecture ID".into(),
            data: None,
        };
        assert!(matches!(
            map_rpc_error(error),
            LedgerError::Rejected(RejectReason::LectureNotFound)
        ));
    }

    #[test]
    fn test_plain_rpc_error_is_transient() {
        let error = RpcErrorBody {
            code: -32005,
            message: "rate limited".into(),
            data: None,
        };
        let mapped = map_rpc_error(error);
        assert!(matches!(mapped, LedgerError::Rpc { code: -32005, .. }));
        assert!(mapped.is_transient());
    }

    #[test]
    fn test_config_defaults() {
        let config = RpcConfig::default();
        assert_eq!(config.timeout_secs, 10);
        assert_eq!(config.block_tag, "latest");
    }
}
