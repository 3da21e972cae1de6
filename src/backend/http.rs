//! HTTP client for the order/trip data service.

use crate::backend::{Order, OrderStore, OrderUpdate, Trip, TripStore};
use crate::config::Settings;
use crate::error::BackendError;
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde_json::json;
use std::time::Duration;
use tracing::{debug, instrument};

const SERVICE: &str = "data service";

#[derive(Clone)]
pub struct DataServiceClient {
    base_url: Url,
    client: Client,
}

impl DataServiceClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, BackendError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BackendError::Transport(e.to_string()))?;
        let base_url = Url::parse(base_url)
            .map_err(|e| BackendError::Transport(format!("invalid data service URL {base_url}: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(BackendError::Transport(format!("data service URL {base_url} cannot carry a path")));
        }
        Ok(Self { base_url, client })
    }

    pub fn from_settings(settings: &Settings) -> Result<Self, BackendError> {
        Self::new(&settings.data_service_url, settings.http_timeout)
    }

    /// Appends each segment percent-encoded, so `/` or `..` inside a value
    /// can never leave its segment.
    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    /// Sends once and decodes a success body. No retries.
    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder, what: String) -> Result<T, BackendError> {
        let response = request
            .send()
            .await
            .map_err(|e| BackendError::from_transport(SERVICE, e))?;

        let status = response.status();
        debug!(%status, %what, "data service responded");
        if status == StatusCode::NOT_FOUND {
            return Err(BackendError::NotFound(what));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BackendError::Upstream {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json::<T>()
            .await
            .map_err(|e| BackendError::from_transport(SERVICE, e))
    }
}

#[async_trait]
impl OrderStore for DataServiceClient {
    #[instrument(skip(self))]
    async fn pending_orders(&self, user_id: i64) -> Result<Vec<Order>, BackendError> {
        let request = self
            .client
            .get(self.url(&["orders", &user_id.to_string(), "pending"]));
        self.send(request, format!("pending orders of user {user_id}")).await
    }

    #[instrument(skip(self))]
    async fn update_order_time(&self, order_id: i64, new_time: &str) -> Result<OrderUpdate, BackendError> {
        let request = self
            .client
            .post(self.url(&["orders", "update_time"]))
            .json(&json!({ "order_id": order_id, "new_time": new_time }));
        self.send(request, format!("order {order_id}")).await
    }
}

#[async_trait]
impl TripStore for DataServiceClient {
    #[instrument(skip(self))]
    async fn trips(&self, route_id: &str) -> Result<Vec<Trip>, BackendError> {
        // Dot segments would be dropped from the path, leaving `/trips`.
        if matches!(route_id.trim(), "" | "." | "..") {
            return Err(BackendError::NotFound(format!("trips of route {route_id}")));
        }
        let request = self.client.get(self.url(&["trips", route_id]));
        self.send(request, format!("trips of route {route_id}")).await
    }
}
