// src/tools/ticket_time.rs

use crate::model::Args;
use crate::tools::{Tool, ToolResult, int_arg, str_arg};
use serde_json::{Value, json};
use std::time::Duration;

/// Posts a JSON body to the data service with a blocking client and returns
/// the raw response text.
fn post_blocking(url: &str, body: &Value, timeout: Duration) -> ToolResult {
    let client = match reqwest::blocking::Client::builder().timeout(timeout).build() {
        Ok(client) => client,
        Err(err) => return ToolResult::failure(&format!("Failed to build HTTP client: {err}")),
    };

    match client.post(url).json(body).send() {
        Ok(resp) => {
            let status = resp.status();
            let text = resp.text().unwrap_or_default();
            if status.is_success() {
                ToolResult::success(&text)
            } else {
                ToolResult::failure(&format!("{status}: {text}"))
            }
        }
        Err(err) if err.is_timeout() => ToolResult::failure(&format!("Request timed out: {err}")),
        Err(err) => ToolResult::failure(&format!("Request failed: {err}")),
    }
}

pub struct UpdateTicketTimeTool {
    base_url: String,
    timeout: Duration,
}

impl UpdateTicketTimeTool {
    pub fn new(data_service_url: &str, timeout: Duration) -> Self {
        Self {
            base_url: data_service_url.trim_end_matches('/').to_string(),
            timeout,
        }
    }
}

impl Tool for UpdateTicketTimeTool {
    fn name(&self) -> &str {
        "update_ticket_time"
    }

    fn description(&self) -> &str {
        "Update a ticket's departure time to a new ISO-8601 datetime. Returns the raw JSON response from the data service, or an error message."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "order_id": {"type": "integer", "description": "The order ID to update."},
                "new_time_iso": {"type": "string", "description": "ISO 8601 datetime string, e.g. '2025-09-12T10:30:00'."}
            },
            "required": ["order_id", "new_time_iso"]
        })
    }

    fn execute(&self, args: &Args) -> ToolResult {
        let Some(order_id) = int_arg(args, "order_id") else {
            return ToolResult::failure("order_id must be an integer");
        };
        let Some(new_time) = str_arg(args, "new_time_iso") else {
            return ToolResult::failure("new_time_iso is required");
        };
        post_blocking(
            &format!("{}/orders/update_time", self.base_url),
            &json!({ "order_id": order_id, "new_time": new_time }),
            self.timeout,
        )
    }
}

pub struct QueryTicketTimeTool {
    base_url: String,
    timeout: Duration,
}

impl QueryTicketTimeTool {
    pub fn new(data_service_url: &str, timeout: Duration) -> Self {
        Self {
            base_url: data_service_url.trim_end_matches('/').to_string(),
            timeout,
        }
    }
}

impl Tool for QueryTicketTimeTool {
    fn name(&self) -> &str {
        "query_ticket_time"
    }

    fn description(&self) -> &str {
        "Query a ticket's current departure time. Returns the raw JSON response from the data service, or an error message."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "order_id": {"type": "integer", "description": "The order ID to query."}
            },
            "required": ["order_id"]
        })
    }

    fn execute(&self, args: &Args) -> ToolResult {
        let Some(order_id) = int_arg(args, "order_id") else {
            return ToolResult::failure("order_id must be an integer");
        };
        post_blocking(
            &format!("{}/orders/query_time", self.base_url),
            &json!({ "order_id": order_id }),
            self.timeout,
        )
    }
}
