// src/agent/query.rs

use crate::actions::{GET_PENDING_ORDERS, GET_TRIPS};
use crate::backend::{OrderStore, TripStore};
use crate::context::UserRequest;
use crate::error::{BackendError, PipelineError};
use crate::model::LanguageModel;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Data lookup recognized from plain keywords, without a model call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum KeywordIntent {
    PendingOrders(i64),
    Trips(String),
}

impl KeywordIntent {
    pub fn name(&self) -> &'static str {
        match self {
            KeywordIntent::PendingOrders(_) => GET_PENDING_ORDERS,
            KeywordIntent::Trips(_) => GET_TRIPS,
        }
    }
}

pub struct KeywordRouter;

impl KeywordRouter {
    pub fn detect(text: &str, user_id: Option<i64>) -> Option<KeywordIntent> {
        let lower = text.to_lowercase();
        if let Some(uid) = user_id {
            if lower.contains("pending") && lower.contains("order") {
                return Some(KeywordIntent::PendingOrders(uid));
            }
        }
        // Keep the caller's casing; route ids like `HCM-HN` are case-sensitive.
        let route = text.get(..6).filter(|p| p.eq_ignore_ascii_case("trips ")).map(|_| text[6..].trim())?;
        if route.is_empty() {
            return None;
        }
        Some(KeywordIntent::Trips(route.to_string()))
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryMeta {
    pub intent: Option<String>,
    pub fetched: Option<Value>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct QueryAnswer {
    pub answer: String,
    pub model: String,
    pub meta: QueryMeta,
}

/// Free-form question answering with keyword-triggered data prefetch.
pub struct QueryPipeline {
    model: Arc<dyn LanguageModel>,
    orders: Arc<dyn OrderStore>,
    trips: Arc<dyn TripStore>,
}

impl QueryPipeline {
    pub fn new(
        model: Arc<dyn LanguageModel>,
        orders: Arc<dyn OrderStore>,
        trips: Arc<dyn TripStore>,
    ) -> Self {
        Self {
            model,
            orders,
            trips,
        }
    }

    async fn fetch(&self, intent: &KeywordIntent) -> Result<Value, BackendError> {
        let value = match intent {
            KeywordIntent::PendingOrders(uid) => serde_json::to_value(self.orders.pending_orders(*uid).await?),
            KeywordIntent::Trips(route) => serde_json::to_value(self.trips.trips(route).await?),
        };
        value.map_err(|e| BackendError::InvalidResponse(e.to_string()))
    }

    #[instrument(skip_all, fields(user_id = ?request.user_id))]
    pub async fn answer(&self, request: &UserRequest) -> Result<QueryAnswer, PipelineError> {
        request.ensure_supported()?;

        let intent = KeywordRouter::detect(&request.text, request.user_id);
        let fetched = match &intent {
            Some(intent) => Some(self.fetch(intent).await?),
            None => None,
        };

        let mut prompt = request.text.clone();
        if let Some(data) = &fetched {
            prompt.push_str(&format!("\nRelevant data: {data}"));
        }
        debug!(intent = ?intent.as_ref().map(KeywordIntent::name), "prompting model");

        let answer = self.model.prompt(&prompt).await?;
        info!(chars = answer.len(), "query answered");

        Ok(QueryAnswer {
            answer,
            model: request
                .model
                .clone()
                .unwrap_or_else(|| self.model.name().to_string()),
            meta: QueryMeta {
                intent: intent.as_ref().map(|i| i.name().to_string()),
                fetched,
            },
        })
    }
}
