use crate::actions::ActionHandler;
use crate::agent::ToolAgent;
use crate::backend::{OrderStore, TripStore};
use crate::context::RequestContext;
use crate::error::{ActionError, BackendError};
use crate::faq::FaqAnswerer;
use crate::model::Args;
use crate::tools::{int_arg, str_arg};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, instrument, warn};

fn to_json<T: Serialize>(value: &T) -> Result<Value, ActionError> {
    serde_json::to_value(value)
        .map_err(|e| ActionError::Backend(BackendError::InvalidResponse(e.to_string())))
}

/// Accepts RFC 3339 or a bare `YYYY-MM-DDTHH:MM[:SS[.fff]]` local time.
pub fn parse_iso_datetime(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_local());
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
}

/// Changes an order's departure time. Values that passed validation but are
/// still malformed go to the tool-calling agent with the raw request text.
pub struct UpdateTicketTimeAction {
    orders: Arc<dyn OrderStore>,
    agent: Arc<ToolAgent>,
}

impl UpdateTicketTimeAction {
    pub fn new(orders: Arc<dyn OrderStore>, agent: Arc<ToolAgent>) -> Self {
        Self { orders, agent }
    }
}

#[async_trait]
impl ActionHandler for UpdateTicketTimeAction {
    #[instrument(skip_all, fields(action = "update_ticket_time"))]
    async fn execute(&self, args: &Args, ctx: &RequestContext) -> Result<Value, ActionError> {
        let order_id = int_arg(args, "order_id");
        let new_time = str_arg(args, "new_time_iso").filter(|t| parse_iso_datetime(t).is_some());

        match (order_id, new_time) {
            (Some(order_id), Some(new_time)) => {
                info!(order_id, new_time, "updating departure time");
                let update = self.orders.update_order_time(order_id, new_time).await?;
                to_json(&update)
            }
            _ => {
                warn!(?args, "ambiguous ticket-time arguments, deferring to tool agent");
                let outcome = self.agent.run(&ctx.text).await?;
                to_json(&outcome)
            }
        }
    }
}

pub struct GetTripsAction {
    trips: Arc<dyn TripStore>,
}

impl GetTripsAction {
    pub fn new(trips: Arc<dyn TripStore>) -> Self {
        Self { trips }
    }
}

#[async_trait]
impl ActionHandler for GetTripsAction {
    #[instrument(skip_all, fields(action = "get_trips"))]
    async fn execute(&self, args: &Args, _ctx: &RequestContext) -> Result<Value, ActionError> {
        let route_id = str_arg(args, "route_id").ok_or(ActionError::InvalidArgument {
            name: "route_id",
            reason: "missing route_id for get_trips".into(),
        })?;
        let trips = self.trips.trips(route_id).await?;
        info!(route_id, count = trips.len(), "fetched trips");
        to_json(&trips)
    }
}

/// Lists the caller's own pending orders. The id always comes from the
/// request context, never from model output.
pub struct GetPendingOrdersAction {
    orders: Arc<dyn OrderStore>,
}

impl GetPendingOrdersAction {
    pub fn new(orders: Arc<dyn OrderStore>) -> Self {
        Self { orders }
    }
}

#[async_trait]
impl ActionHandler for GetPendingOrdersAction {
    #[instrument(skip_all, fields(action = "get_pending_orders"))]
    async fn execute(&self, _args: &Args, ctx: &RequestContext) -> Result<Value, ActionError> {
        let user_id = ctx.user_id.ok_or(ActionError::MissingUser)?;
        let orders = self.orders.pending_orders(user_id).await?;
        info!(user_id, count = orders.len(), "fetched pending orders");
        to_json(&orders)
    }
}

pub struct FaqAction {
    faq: Arc<dyn FaqAnswerer>,
}

impl FaqAction {
    pub fn new(faq: Arc<dyn FaqAnswerer>) -> Self {
        Self { faq }
    }
}

#[async_trait]
impl ActionHandler for FaqAction {
    #[instrument(skip_all, fields(action = "faq"))]
    async fn execute(&self, args: &Args, ctx: &RequestContext) -> Result<Value, ActionError> {
        let question = str_arg(args, "question").unwrap_or(ctx.text.as_str());
        let answer = self.faq.answer(question).await?;
        to_json(&answer)
    }
}
