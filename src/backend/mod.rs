//! Backend collaborators: order and trip storage.

use crate::error::BackendError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub mod http;
pub use http::DataServiceClient;

/// An order exactly as the data service sent it. Field types are not
/// enforced; the accessors read the common ones when they have the usual type.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Order(pub Map<String, Value>);

impl Order {
    pub fn order_id(&self) -> Option<i64> {
        self.0.get("order_id").and_then(Value::as_i64)
    }

    pub fn user_id(&self) -> Option<i64> {
        self.0.get("user_id").and_then(Value::as_i64)
    }

    pub fn departure_time(&self) -> Option<&str> {
        self.0.get("departure_time").and_then(Value::as_str)
    }
}

/// A trip exactly as the data service sent it, nulls and all.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Trip(pub Map<String, Value>);

impl Trip {
    pub fn route_id(&self) -> Option<&str> {
        self.0.get("route_id").and_then(Value::as_str)
    }

    pub fn trip_id(&self) -> Option<&Value> {
        self.0.get("trip_id").filter(|v| !v.is_null())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OrderUpdate {
    pub updated: bool,
    pub order: Order,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[async_trait]
pub trait OrderStore: Send + Sync {
    async fn pending_orders(&self, user_id: i64) -> Result<Vec<Order>, BackendError>;

    async fn update_order_time(
        &self,
        order_id: i64,
        new_time: &str,
    ) -> Result<OrderUpdate, BackendError>;
}

#[async_trait]
pub trait TripStore: Send + Sync {
    async fn trips(&self, route_id: &str) -> Result<Vec<Trip>, BackendError>;
}
