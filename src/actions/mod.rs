//! Action registry: every executable action, its required arguments and its
//! handler.

use crate::context::RequestContext;
use crate::error::ActionError;
use crate::model::Args;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

pub mod handlers;
pub use handlers::{FaqAction, GetPendingOrdersAction, GetTripsAction, UpdateTicketTimeAction};

pub const UPDATE_TICKET_TIME: &str = "update_ticket_time";
pub const GET_TRIPS: &str = "get_trips";
pub const GET_PENDING_ORDERS: &str = "get_pending_orders";
pub const FAQ: &str = "faq";

/// A backend operation the dispatcher can run.
#[async_trait]
pub trait ActionHandler: Send + Sync {
    async fn execute(&self, args: &Args, ctx: &RequestContext) -> Result<Value, ActionError>;
}

/// How to ask the user for missing arguments.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ClarificationHint {
    pub prompt: &'static str,
    pub example: Option<&'static str>,
}

impl ClarificationHint {
    pub fn message(&self, missing: &[String]) -> String {
        let mut message = format!("{}. Thiếu: {}.", self.prompt, missing.join(", "));
        if let Some(example) = self.example {
            message.push_str(&format!(" Ví dụ: {example}."));
        }
        message
    }
}

#[derive(Clone)]
pub struct ActionDescriptor {
    pub name: &'static str,
    pub required_args: &'static [&'static str],
    pub hint: ClarificationHint,
    pub handler: Arc<dyn ActionHandler>,
}

impl fmt::Debug for ActionDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionDescriptor")
            .field("name", &self.name)
            .field("required_args", &self.required_args)
            .finish_non_exhaustive()
    }
}

impl ActionDescriptor {
    pub fn update_ticket_time(handler: impl ActionHandler + 'static) -> Self {
        Self {
            name: UPDATE_TICKET_TIME,
            required_args: &["order_id", "new_time_iso"],
            hint: ClarificationHint {
                prompt: "Vui lòng cung cấp đầy đủ thông tin để đổi giờ vé",
                example: Some("'Đổi vé order 123 sang 2025-09-15T10:00:00'"),
            },
            handler: Arc::new(handler),
        }
    }

    pub fn get_trips(handler: impl ActionHandler + 'static) -> Self {
        Self {
            name: GET_TRIPS,
            required_args: &["route_id"],
            hint: ClarificationHint {
                prompt: "Vui lòng cung cấp tuyến đường",
                example: Some("'Lấy chuyến HCM-HN'"),
            },
            handler: Arc::new(handler),
        }
    }

    pub fn get_pending_orders(handler: impl ActionHandler + 'static) -> Self {
        Self {
            name: GET_PENDING_ORDERS,
            required_args: &["user_id"],
            hint: ClarificationHint {
                prompt: "Vui lòng cung cấp user_id hoặc đăng nhập",
                example: None,
            },
            handler: Arc::new(handler),
        }
    }

    pub fn faq(handler: impl ActionHandler + 'static) -> Self {
        Self {
            name: FAQ,
            required_args: &[],
            hint: ClarificationHint {
                prompt: "Thiếu thông tin cần thiết",
                example: None,
            },
            handler: Arc::new(handler),
        }
    }
}

/// Static action table, built once at startup and read-only afterwards.
#[derive(Clone, Debug, Default)]
pub struct ActionRegistry {
    actions: HashMap<&'static str, ActionDescriptor>,
}

impl ActionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(mut self, descriptor: ActionDescriptor) -> Self {
        self.actions.insert(descriptor.name, descriptor);
        self
    }

    pub fn get(&self, name: &str) -> Option<&ActionDescriptor> {
        self.actions.get(name)
    }

    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.actions.keys().copied().collect();
        names.sort_unstable();
        names
    }
}
