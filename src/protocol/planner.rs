// src/protocol/planner.rs

use crate::error::ModelError;
use crate::model::LanguageModel;
use crate::protocol::Plan;
use crate::protocol::extract::extract_json_object;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// Produces a Plan from the user's text.
#[async_trait]
pub trait Planner: Send + Sync {
    async fn plan(&self, text: &str, user_id: Option<i64>) -> Result<Plan, ModelError>;
}

/// Asks a language model for a JSON plan and parses it leniently.
pub struct LlmPlanner {
    model: Arc<dyn LanguageModel>,
}

impl LlmPlanner {
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self { model }
    }

    pub fn prompt(text: &str, user_id: Option<i64>) -> String {
        let user_id = user_id.map_or_else(|| "None".to_string(), |id| id.to_string());
        format!(
            r#"You are an intent classifier and action planner for a travel ticketing assistant. Classify the user's Vietnamese text into one of: change_time, get_pending_orders, get_trips, faq, unknown. Extract slots and propose a single action if applicable. Output strict JSON with keys: intent (string, within listed intents), slots (object), action (object|null), notes (string|null). Slots may include: order_id (int), new_time (ISO-8601 string), route_id (string), question (string). If requesting trips and a route is specified, set action to {{"name": "get_trips", "args": {{"route_id": "<route_id>"}}}}. If changing time with order_id & new_time present, set action to {{"name": "update_ticket_time", "args": {{"order_id": <int>, "new_time_iso": "<ISO-8601>"}}}}. If asking a general question, intent faq with question in slots.
User text: {text}
User id: {user_id}"#
        )
    }
}

/// Parses raw model output into a plan, degrading to `Plan::unknown()`.
pub fn parse_plan(raw: &str) -> Plan {
    match extract_json_object(raw) {
        Some(value) => Plan::from_value(&value),
        None => {
            warn!(raw = %raw, "no JSON plan in model output, defaulting to unknown intent");
            Plan::unknown()
        }
    }
}

#[async_trait]
impl Planner for LlmPlanner {
    #[instrument(skip(self, text), fields(model = %self.model.name()))]
    async fn plan(&self, text: &str, user_id: Option<i64>) -> Result<Plan, ModelError> {
        let raw = self.model.prompt(&Self::prompt(text, user_id)).await?;
        debug!(raw = %raw, "planner output");

        let plan = parse_plan(&raw);
        debug!(intent = %plan.intent, action = ?plan.action.as_ref().map(|a| &a.name), "parsed plan");
        Ok(plan)
    }
}
