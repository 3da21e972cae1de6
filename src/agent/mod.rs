// src/agent/mod.rs

pub mod pipeline;
pub mod query;
pub mod tool_agent;

pub use pipeline::{IntentPipeline, standard_registry};
pub use query::{KeywordIntent, KeywordRouter, QueryAnswer, QueryMeta, QueryPipeline};
pub use tool_agent::{AgentOutcome, CHANGE_TIME_INSTRUCTION, ToolAgent, ToolResultRecord};
