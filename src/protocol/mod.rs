// src/protocol/mod.rs

use crate::error::ErrorKind;
use crate::model::Args;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

pub mod extract;
pub mod planner;

pub use planner::{LlmPlanner, Planner};

/// Classified purpose of a user's text.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    ChangeTime,
    GetPendingOrders,
    GetTrips,
    Faq,
    #[serde(other)]
    Unknown,
}

impl Intent {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "change_time" => Intent::ChangeTime,
            "get_pending_orders" => Intent::GetPendingOrders,
            "get_trips" => Intent::GetTrips,
            "faq" => Intent::Faq,
            _ => Intent::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Intent::ChangeTime => "change_time",
            Intent::GetPendingOrders => "get_pending_orders",
            Intent::GetTrips => "get_trips",
            Intent::Faq => "faq",
            Intent::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An action the planner proposed, as named by the model.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProposedAction {
    pub name: String,
    #[serde(default)]
    pub args: Args,
}

/// Structured output of intent classification.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    pub intent: Intent,
    #[serde(default)]
    pub slots: Args,
    pub action: Option<ProposedAction>,
    pub notes: Option<String>,
}

impl Plan {
    /// Fallback plan when the model output cannot be understood.
    pub fn unknown() -> Self {
        Self {
            intent: Intent::Unknown,
            slots: Args::new(),
            action: None,
            notes: None,
        }
    }

    /// Leniently coerces a decoded JSON object into a plan, field by field.
    pub fn from_value(value: &Value) -> Self {
        let Some(obj) = value.as_object() else {
            return Self::unknown();
        };

        let intent = obj
            .get("intent")
            .and_then(Value::as_str)
            .map(Intent::parse)
            .unwrap_or(Intent::Unknown);

        let slots = obj
            .get("slots")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();

        let action = obj.get("action").and_then(Value::as_object).and_then(|action| {
            let name = action.get("name").and_then(Value::as_str)?.trim();
            if name.is_empty() {
                return None;
            }
            Some(ProposedAction {
                name: name.to_string(),
                args: action
                    .get("args")
                    .and_then(Value::as_object)
                    .cloned()
                    .unwrap_or_default(),
            })
        });

        let notes = obj.get("notes").and_then(Value::as_str).map(str::to_string);

        Self {
            intent,
            slots,
            action,
            notes,
        }
    }

    pub fn slot(&self, key: &str) -> Option<&Value> {
        self.slots.get(key).filter(|v| !v.is_null())
    }
}

/// Uniform response of the planning pipeline. `plan` is always present and
/// exactly one of clarification, `result` or `error` is populated.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExecutionEnvelope {
    pub plan: Plan,
    pub needs_clarification: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub missing: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggested_action: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
}

impl ExecutionEnvelope {
    fn bare(plan: Plan) -> Self {
        Self {
            plan,
            needs_clarification: false,
            missing: Vec::new(),
            message: None,
            suggested_action: None,
            result: None,
            error: None,
            error_kind: None,
        }
    }

    pub fn clarification(plan: Plan, action: &str, missing: Vec<String>, message: String) -> Self {
        Self {
            needs_clarification: true,
            missing,
            message: Some(message),
            suggested_action: Some(action.to_string()),
            ..Self::bare(plan)
        }
    }

    pub fn success(plan: Plan, result: Value) -> Self {
        Self {
            result: Some(result),
            ..Self::bare(plan)
        }
    }

    pub fn failure(plan: Plan, kind: ErrorKind, error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            error_kind: Some(kind),
            ..Self::bare(plan)
        }
    }
}
