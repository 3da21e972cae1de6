use crate::error::ModelError;
use crate::model::{Args, ChatMessage, Completion, LanguageModel, ToolCallRecord};
use crate::tools::{ToolCatalog, ToolResult};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

pub const CHANGE_TIME_INSTRUCTION: &str = "You can update a ticket departure time using the tool 'update_ticket_time', \
     or look up the current departure time using 'query_ticket_time'. \
     Extract order_id (integer) and new_time_iso (ISO-8601). \
     If either is missing or unclear, ask a concise clarification (in Vietnamese) and DO NOT call the tool.";

/// One executed tool call, reported back to the caller.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolResultRecord {
    pub tool: String,
    pub args: Args,
    pub result: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AgentOutcome {
    pub answer: String,
    pub tool_calls: Vec<ToolCallRecord>,
    pub tool_results: Vec<ToolResultRecord>,
}

/// Single-round tool-calling agent: plan with tools bound, execute every
/// requested call, then ask the model for the final answer.
pub struct ToolAgent {
    model: Arc<dyn LanguageModel>,
    catalog: ToolCatalog,
    instruction: String,
}

impl ToolAgent {
    pub fn new(model: Arc<dyn LanguageModel>, catalog: ToolCatalog) -> Self {
        Self {
            model,
            catalog,
            instruction: CHANGE_TIME_INSTRUCTION.to_string(),
        }
    }

    pub fn with_instruction(mut self, instruction: &str) -> Self {
        self.instruction = instruction.to_string();
        self
    }

    #[instrument(skip(self), fields(model = %self.model.name(), tools = self.catalog.len()))]
    pub async fn run(&self, question: &str) -> Result<AgentOutcome, ModelError> {
        let mut messages = vec![
            ChatMessage::system(self.instruction.as_str()),
            ChatMessage::user(question),
        ];

        // Planning
        let planned = self
            .model
            .complete(&messages, &self.catalog.definitions())
            .await?;

        if planned.tool_calls.is_empty() {
            debug!("no tool calls requested, returning model reply");
            return Ok(AgentOutcome {
                answer: planned.content,
                tool_calls: Vec::new(),
                tool_results: Vec::new(),
            });
        }

        // Tool execution
        let mut tool_results = Vec::with_capacity(planned.tool_calls.len());
        for call in &planned.tool_calls {
            let result = self.invoke(call).await;
            info!(tool = %call.name, id = %call.id, "tool call executed");
            tool_results.push(ToolResultRecord {
                tool: call.name.clone(),
                args: call.args.clone(),
                result,
            });
        }

        // Finalizing
        messages.push(ChatMessage::assistant(&planned));
        messages.extend(
            planned
                .tool_calls
                .iter()
                .zip(&tool_results)
                .map(|(call, record)| ChatMessage::tool(call.id.as_str(), record.result.as_str())),
        );
        let Completion { content, .. } = self.model.complete(&messages, &[]).await?;

        Ok(AgentOutcome {
            answer: content,
            tool_calls: planned.tool_calls,
            tool_results,
        })
    }

    /// Runs a tool on the blocking pool. Never fails: problems become an
    /// `ERROR: ...` result string for the model to read.
    async fn invoke(&self, call: &ToolCallRecord) -> String {
        let Some(tool) = self.catalog.get_tool(&call.name) else {
            warn!(tool = %call.name, "model requested an unknown tool");
            return format!("ERROR: Unknown tool {}", call.name);
        };

        let args = call.args.clone();
        match tokio::task::spawn_blocking(move || tool.execute(&args)).await {
            Ok(result) => result.into_message(),
            Err(err) => ToolResult::failure(&format!("tool panicked: {err}")).into_message(),
        }
    }
}
