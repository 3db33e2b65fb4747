//! Ingest service: extract, then persist
//!
//! The pipeline never touches storage; this is the one place a successful
//! extraction becomes a stored record.

use serde::Serialize;
use tracing::{info, warn};

use crate::error::Result;
use crate::extract::{ExtractionFailure, ExtractionPipeline};
use crate::models::{CategoryTotal, ExpenseRecord, RecordId, TextRequest};
use crate::store::ExpenseStore;

/// What happened to one inbound expense text
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RecordOutcome {
    Recorded { id: RecordId, record: ExpenseRecord },
    Rejected(ExtractionFailure),
}

impl RecordOutcome {
    /// Short human reply suitable for a chat message
    pub fn reply_text(&self) -> String {
        match self {
            Self::Recorded { record, .. } => format!(
                "Expense added: {:.2} under {}",
                record.price, record.category
            ),
            Self::Rejected(_) => "Sorry, I could not understand that expense.".to_string(),
        }
    }
}

/// Extraction pipeline bound to a store
pub struct ExpenseService<S: ExpenseStore> {
    pipeline: ExtractionPipeline,
    store: S,
}

impl<S: ExpenseStore> ExpenseService<S> {
    pub fn new(pipeline: ExtractionPipeline, store: S) -> Self {
        Self { pipeline, store }
    }

    pub fn pipeline(&self) -> &ExtractionPipeline {
        &self.pipeline
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Extract a record from `request` and store it
    ///
    /// Extraction failures come back as `Rejected`; only store errors are `Err`.
    pub async fn record(&self, request: &TextRequest) -> Result<RecordOutcome> {
        match self.pipeline.extract(request).await {
            Ok(record) => {
                let id = self.store.insert(&record)?;
                info!(
                    id,
                    sender_id = request.sender_id().unwrap_or("-"),
                    category = %record.category,
                    "Recorded expense"
                );
                Ok(RecordOutcome::Recorded { id, record })
            }
            Err(failure) => {
                warn!(
                    sender_id = request.sender_id().unwrap_or("-"),
                    reason = failure.reason.as_str(),
                    "Rejected expense text"
                );
                Ok(RecordOutcome::Rejected(failure))
            }
        }
    }

    /// Per-category totals from the underlying store
    pub fn totals(&self, sender_id: Option<&str>) -> Result<Vec<CategoryTotal>> {
        self.store.sum_by_category(sender_id)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::time::Duration;

    use super::*;
    use crate::ai::{AIClient, MockBackend, MockReply};
    use crate::config::ExtractionConfig;
    use crate::error::Error;
    use crate::extract::FailureReason;
    use crate::models::Category;
    use crate::prompts::PromptLibrary;

    /// Store fake that keeps records in a Vec
    #[derive(Default)]
    struct VecStore {
        records: Mutex<Vec<ExpenseRecord>>,
        fail: bool,
    }

    impl ExpenseStore for VecStore {
        fn insert(&self, record: &ExpenseRecord) -> Result<RecordId> {
            if self.fail {
                return Err(Error::InvalidData("store offline".into()));
            }
            let mut records = self.records.lock().unwrap();
            records.push(record.clone());
            Ok(records.len() as RecordId)
        }

        fn sum_by_category(&self, sender_id: Option<&str>) -> Result<Vec<CategoryTotal>> {
            let records = self.records.lock().unwrap();
            let mut totals: Vec<CategoryTotal> = Vec::new();
            for r in records
                .iter()
                .filter(|r| sender_id.is_none() || r.sender_id.as_deref() == sender_id)
            {
                match totals.iter_mut().find(|t| t.category == r.category) {
                    Some(t) => {
                        t.total += r.price;
                        t.count += 1;
                    }
                    None => totals.push(CategoryTotal {
                        category: r.category,
                        total: r.price,
                        count: 1,
                    }),
                }
            }
            Ok(totals)
        }
    }

    fn service(replies: Vec<MockReply>, store: VecStore) -> ExpenseService<VecStore> {
        let config = ExtractionConfig {
            timeout: Duration::from_millis(100),
            max_retries: 0,
            retry_backoff: Duration::from_millis(1),
        };
        let pipeline = ExtractionPipeline::new(
            AIClient::Mock(MockBackend::with_replies(replies)),
            config,
            &mut PromptLibrary::embedded_only(),
        )
        .unwrap();
        ExpenseService::new(pipeline, store)
    }

    #[tokio::test]
    async fn test_recorded_outcome_persists() {
        let svc = service(
            vec![MockReply::text(r#"{"price": 20, "category": "FOOD"}"#)],
            VecStore::default(),
        );
        let request = TextRequest::new("panipuri 20", Some("alice".into())).unwrap();

        let outcome = svc.record(&request).await.unwrap();
        match &outcome {
            RecordOutcome::Recorded { id, record } => {
                assert_eq!(*id, 1);
                assert_eq!(record.category, Category::Food);
            }
            other => panic!("expected Recorded, got {:?}", other),
        }
        assert_eq!(outcome.reply_text(), "Expense added: 20.00 under Food");
        assert_eq!(svc.totals(Some("alice")).unwrap()[0].total, 20.0);
    }

    #[tokio::test]
    async fn test_rejected_outcome_stores_nothing() {
        let svc = service(
            vec![MockReply::text(r#"{"price": 50}"#)],
            VecStore::default(),
        );
        let request = TextRequest::new("something", None).unwrap();

        let outcome = svc.record(&request).await.unwrap();
        match outcome {
            RecordOutcome::Rejected(failure) => {
                assert!(matches!(failure.reason, FailureReason::MissingField { .. }))
            }
            other => panic!("expected Rejected, got {:?}", other),
        }
        assert!(svc.store().records.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_store_errors_propagate() {
        let svc = service(
            vec![MockReply::text(r#"{"price": 5, "category": "Food"}"#)],
            VecStore {
                fail: true,
                ..Default::default()
            },
        );
        let request = TextRequest::new("tea 5", None).unwrap();
        assert!(svc.record(&request).await.is_err());
    }

    #[test]
    fn test_outcome_serialization() {
        let outcome = RecordOutcome::Rejected(ExtractionFailure::new(
            FailureReason::InvalidPrice,
            "Invalid price: free",
        ));
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["status"], "rejected");
        assert_eq!(json["reason"], "invalid_price");
    }
}
