//! Lecture creation with hash prediction and post-creation verification.

use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use poap_kernel_core::{
    timestamp_from_i64, validate_params, LectureHash, LectureKey, LectureParams, LectureRef,
    TxHash,
};
use poap_kernel_ledger::{LedgerKey, LedgerReader, LedgerSchema, LedgerWriter};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::{KernelError, Result};
use crate::resolver::IdentityResolver;

const DATE_FORMATS: [&str; 2] = ["%Y-%m-%d", "%d.%m.%Y"];
const TIME_FORMATS: [&str; 2] = ["%H:%M:%S", "%H:%M"];

/// A lecture awaiting creation, with a label for batch reporting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LectureDraft {
    pub label: String,
    pub params: LectureParams,
}

impl LectureDraft {
    pub fn new(params: LectureParams) -> Self {
        Self {
            label: params.name.clone(),
            params,
        }
    }

    /// Build a draft from a token metadata document.
    ///
    /// The window comes from the `date_start_plan`, `time_start_plan`,
    /// `date_end_plan` and `time_end_plan` attributes, read as UTC. Dates
    /// are `YYYY-MM-DD` or `DD.MM.YYYY`, times `HH:MM[:SS]`. The token URI
    /// is `tokenURI`, falling back to `image`.
    pub fn from_metadata(doc: &Value) -> Result<Self> {
        let obj = doc
            .as_object()
            .ok_or_else(|| KernelError::InvalidInput("metadata is not a JSON object".into()))?;
        let text = |key: &str| {
            obj.get(key)
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
        };

        let name = text("name")
            .ok_or_else(|| KernelError::InvalidInput("metadata has no name".into()))?;
        let token_uri = text("tokenURI")
            .or_else(|| text("image"))
            .ok_or_else(|| KernelError::InvalidInput(format!("{}: no tokenURI or image", name)))?;
        let attributes = obj
            .get("attributes")
            .and_then(Value::as_array)
            .ok_or_else(|| KernelError::InvalidInput(format!("{}: no attributes", name)))?;

        let attr = |trait_type: &str| -> Result<String> {
            attributes
                .iter()
                .find(|a| a.get("trait_type").and_then(Value::as_str) == Some(trait_type))
                .and_then(|a| a.get("value"))
                .and_then(|v| match v {
                    Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
                    Value::Number(n) => Some(n.to_string()),
                    _ => None,
                })
                .ok_or_else(|| {
                    KernelError::InvalidInput(format!("{}: missing attribute {}", name, trait_type))
                })
        };

        let start = parse_utc(&attr("date_start_plan")?, &attr("time_start_plan")?)?;
        let end = parse_utc(&attr("date_end_plan")?, &attr("time_end_plan")?)?;

        Ok(Self::new(LectureParams::with_window(name, start, end, token_uri)))
    }
}

/// Parse a date and a time of day, interpreted as UTC, to Unix seconds.
pub fn parse_utc(date: &str, time: &str) -> Result<u64> {
    let date = DATE_FORMATS
        .iter()
        .find_map(|f| NaiveDate::parse_from_str(date, f).ok())
        .ok_or_else(|| KernelError::InvalidInput(format!("unrecognized date {:?}", date)))?;
    let time = TIME_FORMATS
        .iter()
        .find_map(|f| NaiveTime::parse_from_str(time, f).ok())
        .ok_or_else(|| KernelError::InvalidInput(format!("unrecognized time {:?}", time)))?;
    let seconds = NaiveDateTime::new(date, time).and_utc().timestamp();
    Ok(timestamp_from_i64(seconds)?)
}

/// A lecture the ledger accepted and the resolver found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedLecture {
    pub lecture: LectureRef,
    pub tx_hash: TxHash,
}

/// Per-item result of [`LectureRegistrar::create_batch`].
#[derive(Debug)]
pub struct BatchItem {
    pub label: String,
    pub result: Result<CreatedLecture>,
}

/// Creates lectures and checks the ledger agreed on their identity.
pub struct LectureRegistrar<R, W> {
    resolver: Arc<IdentityResolver<R>>,
    writer: Arc<W>,
}

impl<R: LedgerReader, W: LedgerWriter> LectureRegistrar<R, W> {
    pub fn new(resolver: Arc<IdentityResolver<R>>, writer: Arc<W>) -> Self {
        Self { resolver, writer }
    }

    /// The hash a lecture will get, computed without touching the ledger.
    pub fn predict_hash(&self, params: &LectureParams) -> Result<LectureHash> {
        Ok(self.resolver.deriver().derive(&self.stored_form(params)?)?)
    }

    /// Parameters as this ledger will store them.
    fn stored_form(&self, params: &LectureParams) -> Result<LectureParams> {
        if self.resolver.schema().has_window() {
            if params.start_time.is_none() {
                return Err(KernelError::InvalidInput(
                    "this ledger requires a start time".into(),
                ));
            }
            Ok(params.clone())
        } else {
            if params.start_time.is_some() {
                debug!(name = %params.name, "ledger stores a deadline only; start time dropped");
            }
            Ok(LectureParams::with_deadline(
                params.name.clone(),
                params.end_time,
                params.token_uri.clone(),
            ))
        }
    }

    /// Validate, predict the hash, submit, verify the emitted key against
    /// the prediction, then resolve the new lecture.
    pub async fn create(&self, params: &LectureParams) -> Result<CreatedLecture> {
        validate_params(params)?;
        let stored = self.stored_form(params)?;
        let predicted = self.resolver.deriver().derive(&stored)?;

        let receipt = self.writer.create_lecture(&stored).await?;
        let key = match receipt.created {
            Some(LedgerKey::Hash(emitted)) => {
                if emitted != predicted {
                    return Err(KernelError::IntegrityMismatch {
                        index: None,
                        ledger: emitted,
                        derived: predicted,
                    });
                }
                LectureKey::Hash(emitted)
            }
            Some(LedgerKey::Id(id)) => match self.resolver.schema() {
                LedgerSchema::Sequential => LectureKey::Index(id.saturating_sub(1)),
                _ => LectureKey::Index(id),
            },
            None => {
                warn!(tx = %receipt.tx_hash, "creation emitted no event; resolving by predicted hash");
                LectureKey::Hash(predicted)
            }
        };

        let lecture = self.resolver.resolve(&key).await?;
        if lecture.hash != predicted {
            return Err(KernelError::IntegrityMismatch {
                index: Some(lecture.index),
                ledger: lecture.hash,
                derived: predicted,
            });
        }

        info!(
            index = lecture.index,
            hash = %lecture.hash,
            tx = %receipt.tx_hash,
            "lecture created"
        );
        Ok(CreatedLecture {
            lecture,
            tx_hash: receipt.tx_hash,
        })
    }

    /// Create drafts one after another. A failed item does not stop the
    /// batch.
    pub async fn create_batch(&self, drafts: Vec<LectureDraft>) -> Vec<BatchItem> {
        let mut items = Vec::with_capacity(drafts.len());
        for draft in drafts {
            let result = self.create(&draft.params).await;
            if let Err(e) = &result {
                warn!(label = %draft.label, error = %e, "batch item failed");
            }
            items.push(BatchItem {
                label: draft.label,
                result,
            });
        }
        items
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ResolverConfig;
    use poap_kernel_core::HashDeriver;
    use poap_kernel_ledger::{MemoryLedger, RejectReason};
    use serde_json::json;

    fn registrar(
        schema: LedgerSchema,
    ) -> (Arc<MemoryLedger>, LectureRegistrar<MemoryLedger, MemoryLedger>) {
        let ledger = Arc::new(MemoryLedger::new(schema));
        let resolver = Arc::new(IdentityResolver::new(
            ledger.clone(),
            HashDeriver::new(schema.default_hash_scheme()),
            ResolverConfig::default(),
        ));
        (ledger.clone(), LectureRegistrar::new(resolver, ledger))
    }

    #[test]
    fn test_parse_utc_formats() {
        assert_eq!(parse_utc("2025-01-01", "00:00").unwrap(), 1735689600);
        assert_eq!(parse_utc("01.01.2025", "00:00:00").unwrap(), 1735689600);
        assert_eq!(parse_utc("31.12.2024", "12:30").unwrap(), 1735648200);
        assert!(parse_utc("2025/01/01", "00:00").is_err());
        assert!(parse_utc("2025-01-01", "noon").is_err());
        assert!(parse_utc("1969-12-31", "00:00").is_err());
    }

    #[test]
    fn test_draft_from_metadata() {
        let doc = json!({
            "name": "Lecture 3",
            "image": "ipfs://QmImg",
            "attributes": [
                {"trait_type": "date_start_plan", "value": "31.12.2024"},
                {"trait_type": "time_start_plan", "value": "12:30"},
                {"trait_type": "date_end_plan", "value": "2025-01-01"},
                {"trait_type": "time_end_plan", "value": "00:00"}
            ]
        });
        let draft = LectureDraft::from_metadata(&doc).unwrap();
        assert_eq!(draft.label, "Lecture 3");
        assert_eq!(
            draft.params,
            LectureParams::with_window("Lecture 3", 1735648200, 1735689600, "ipfs://QmImg")
        );
    }

    #[test]
    fn test_draft_prefers_token_uri_and_reports_missing() {
        let mut doc = json!({
            "name": "L",
            "tokenURI": "ipfs://QmMeta",
            "image": "ipfs://QmImg",
            "attributes": [
                {"trait_type": "date_start_plan", "value": "2025-01-01"},
                {"trait_type": "time_start_plan", "value": "09:00"},
                {"trait_type": "date_end_plan", "value": "2025-01-01"}
            ]
        });
        let err = LectureDraft::from_metadata(&doc).unwrap_err();
        assert!(err.to_string().contains("time_end_plan"));

        doc["attributes"]
            .as_array_mut()
            .unwrap()
            .push(json!({"trait_type": "time_end_plan", "value": "10:00"}));
        let draft = LectureDraft::from_metadata(&doc).unwrap();
        assert_eq!(draft.params.token_uri, "ipfs://QmMeta");
    }

    #[tokio::test]
    async fn test_create_predicts_and_resolves() {
        for schema in [
            LedgerSchema::Sequential,
            LedgerSchema::HashPrimary,
            LedgerSchema::Indexed,
        ] {
            let (_, registrar) = registrar(schema);
            let params = LectureParams::with_window("Talk", 100, 200, "ipfs://talk");
            let predicted = registrar.predict_hash(&params).unwrap();
            let created = registrar.create(&params).await.unwrap();
            assert_eq!(created.lecture.hash, predicted, "{:?}", schema);
            assert_eq!(created.lecture.index, 0, "{:?}", schema);
        }
    }

    #[tokio::test]
    async fn test_create_rejects_invalid_before_submitting() {
        let (ledger, registrar) = registrar(LedgerSchema::Indexed);
        let err = registrar
            .create(&LectureParams::with_window("Talk", 200, 100, "ipfs://talk"))
            .await
            .unwrap_err();
        assert!(matches!(err, KernelError::InvalidInput(_)));
        assert!(matches!(
            registrar
                .create(&LectureParams::with_deadline("Talk", 200, "ipfs://talk"))
                .await,
            Err(KernelError::InvalidInput(_))
        ));
        assert_eq!(ledger.call_count().await, 0);
    }

    #[tokio::test]
    async fn test_batch_collects_per_item_results() {
        let (ledger, registrar) = registrar(LedgerSchema::Indexed);
        ledger.pause().await;
        let paused = registrar
            .create_batch(vec![LectureDraft::new(LectureParams::with_window(
                "A", 1, 2, "ipfs://a",
            ))])
            .await;
        assert_eq!(
            paused[0].result.as_ref().unwrap_err().reject_reason(),
            Some(&RejectReason::Paused)
        );
        ledger.unpause().await;

        let drafts = vec![
            LectureDraft::new(LectureParams::with_window("A", 1, 2, "ipfs://a")),
            LectureDraft::new(LectureParams::with_window("", 1, 2, "ipfs://b")),
            LectureDraft::new(LectureParams::with_window("C", 1, 2, "ipfs://c")),
        ];
        let items = registrar.create_batch(drafts).await;
        assert!(items[0].result.is_ok());
        assert!(matches!(items[1].result, Err(KernelError::InvalidInput(_))));
        assert_eq!(items[2].result.as_ref().unwrap().lecture.index, 1);
    }
}
