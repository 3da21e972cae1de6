//! Scripted collaborators shared by the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use intent_runtime::backend::{Order, OrderStore, OrderUpdate, Trip, TripStore};
use intent_runtime::error::{BackendError, ModelError};
use intent_runtime::faq::{FaqAnswer, FaqAnswerer};
use intent_runtime::model::{
    Args, ChatMessage, ChunkStream, Completion, LanguageModel, ToolCallRecord, ToolDefinition,
};
use serde_json::{Map, Value, json};
use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

pub fn args(value: Value) -> Args {
    value.as_object().cloned().unwrap_or_default()
}

pub fn tool_call(id: &str, name: &str, value: Value) -> ToolCallRecord {
    ToolCallRecord {
        id: id.into(),
        name: name.into(),
        args: args(value),
    }
}

/// Replays queued completions in order and records every request.
#[derive(Default)]
pub struct ScriptedModel {
    replies: Mutex<VecDeque<Result<Completion, ModelError>>>,
    chunks: Mutex<Vec<String>>,
    pub requests: Mutex<Vec<(Vec<ChatMessage>, Vec<ToolDefinition>)>>,
}

impl ScriptedModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(self, completion: Completion) -> Self {
        self.replies.lock().unwrap().push_back(Ok(completion));
        self
    }

    pub fn text(self, content: &str) -> Self {
        self.reply(Completion::text(content))
    }

    pub fn fail(self, err: ModelError) -> Self {
        self.replies.lock().unwrap().push_back(Err(err));
        self
    }

    pub fn stream_chunks(self, chunks: &[&str]) -> Self {
        *self.chunks.lock().unwrap() = chunks.iter().map(|c| c.to_string()).collect();
        self
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn request(&self, index: usize) -> (Vec<ChatMessage>, Vec<ToolDefinition>) {
        self.requests.lock().unwrap()[index].clone()
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolDefinition],
    ) -> Result<Completion, ModelError> {
        self.requests
            .lock()
            .unwrap()
            .push((messages.to_vec(), tools.to_vec()));
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ModelError::InvalidResponse("script exhausted".into())))
    }

    async fn stream(&self, prompt: &str) -> Result<ChunkStream, ModelError> {
        self.requests
            .lock()
            .unwrap()
            .push((vec![ChatMessage::user(prompt)], Vec::new()));
        let chunks: Vec<Result<String, ModelError>> =
            self.chunks.lock().unwrap().iter().cloned().map(Ok).collect();
        Ok(stream::iter(chunks).boxed())
    }
}

/// In-memory order and trip data with call counters.
#[derive(Default)]
pub struct FakeData {
    pub orders: Vec<Order>,
    pub trips: Vec<Trip>,
    pub fail_with: Option<fn() -> BackendError>,
    pub calls: AtomicUsize,
}

pub fn order(order_id: i64, user_id: i64, departure_time: &str) -> Order {
    Order(args(json!({
        "order_id": order_id,
        "user_id": user_id,
        "status": "pending",
        "trip_id": 100 + order_id,
        "departure_time": departure_time,
    })))
}

pub fn trip(route_id: &str, trip_id: i64, depart: &str) -> Trip {
    Trip(args(json!({
        "route_id": route_id,
        "trip_id": trip_id,
        "operator": "Phuong Trang",
        "depart": depart,
        "seats_left": 12,
    })))
}

impl FakeData {
    fn enter(&self) -> Result<(), BackendError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.fail_with {
            Some(make) => Err(make()),
            None => Ok(()),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl OrderStore for FakeData {
    async fn pending_orders(&self, user_id: i64) -> Result<Vec<Order>, BackendError> {
        self.enter()?;
        Ok(self
            .orders
            .iter()
            .filter(|o| o.user_id() == Some(user_id))
            .cloned()
            .collect())
    }

    async fn update_order_time(&self, order_id: i64, new_time: &str) -> Result<OrderUpdate, BackendError> {
        self.enter()?;
        let mut order = self
            .orders
            .iter()
            .find(|o| o.order_id() == Some(order_id))
            .cloned()
            .ok_or_else(|| BackendError::NotFound(format!("order {order_id}")))?;
        order.0.insert("departure_time".into(), new_time.into());
        Ok(OrderUpdate {
            updated: true,
            order,
            extra: Map::new(),
        })
    }
}

#[async_trait]
impl TripStore for FakeData {
    async fn trips(&self, route_id: &str) -> Result<Vec<Trip>, BackendError> {
        self.enter()?;
        Ok(self
            .trips
            .iter()
            .filter(|t| t.route_id() == Some(route_id))
            .cloned()
            .collect())
    }
}

/// FAQ answerer that echoes the question.
#[derive(Default)]
pub struct EchoFaq {
    pub questions: Mutex<Vec<String>>,
}

#[async_trait]
impl FaqAnswerer for EchoFaq {
    async fn answer(&self, question: &str) -> Result<FaqAnswer, ModelError> {
        self.questions.lock().unwrap().push(question.to_string());
        Ok(FaqAnswer {
            answer: format!("answer to: {question}"),
            context: "Q: q\nA: a".into(),
        })
    }
}
