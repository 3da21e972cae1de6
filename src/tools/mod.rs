// src/tools/mod.rs

use crate::model::{Args, ToolDefinition};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

pub mod ticket_time;
pub use ticket_time::{QueryTicketTimeTool, UpdateTicketTimeTool};

/// The result of executing a tool.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolResult {
    pub success: bool,
    pub output: Option<String>,
    pub error: Option<String>,
}

impl ToolResult {
    pub fn success(output: &str) -> Self {
        Self {
            success: true,
            output: Some(output.to_string()),
            error: None,
        }
    }

    pub fn failure(error: &str) -> Self {
        Self {
            success: false,
            output: None,
            error: Some(error.to_string()),
        }
    }

    /// Text handed back to the model: the output, or `ERROR: <reason>`.
    pub fn into_message(self) -> String {
        if self.success {
            self.output.unwrap_or_default()
        } else {
            format!("ERROR: {}", self.error.unwrap_or_else(|| "unknown failure".into()))
        }
    }
}

/// A synchronous capability the model may ask to invoke. `execute` may block.
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    /// JSON schema of the accepted arguments.
    fn parameters(&self) -> Value;
    fn execute(&self, args: &Args) -> ToolResult;

    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().into(),
            description: self.description().into(),
            parameters: self.parameters(),
        }
    }
}

/// Named tools bound to the model for a tool-calling round.
#[derive(Clone, Default)]
pub struct ToolCatalog {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_tool<T: Tool + 'static>(mut self, tool: T) -> Self {
        self.tools.insert(tool.name().into(), Arc::new(tool));
        self
    }

    pub fn get_tool(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    /// Definitions sorted by name, so prompts are stable.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        let mut defs: Vec<_> = self.tools.values().map(|t| t.definition()).collect();
        defs.sort_by(|a, b| a.name.cmp(&b.name));
        defs
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

/// Reads an integer argument given as a number or a numeric string.
pub fn int_arg(args: &Args, key: &str) -> Option<i64> {
    match args.get(key)? {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
                .map(|f| f as i64)
        }),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Reads a non-blank string argument.
pub fn str_arg<'a>(args: &'a Args, key: &str) -> Option<&'a str> {
    args.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct Echo;

    impl Tool for Echo {
        fn name(&self) -> &str {
            "echo"
        }
        fn description(&self) -> &str {
            "Echoes the text argument"
        }
        fn parameters(&self) -> Value {
            json!({"type": "object", "properties": {"text": {"type": "string"}}})
        }
        fn execute(&self, args: &Args) -> ToolResult {
            match str_arg(args, "text") {
                Some(text) => ToolResult::success(text),
                None => ToolResult::failure("missing text"),
            }
        }
    }

    #[test]
    fn catalog_registers_and_describes_tools() {
        let catalog = ToolCatalog::new().register_tool(Echo);
        assert_eq!(catalog.len(), 1);
        assert!(catalog.get_tool("missing").is_none());
        let defs = catalog.definitions();
        assert_eq!(defs[0].name, "echo");
        assert_eq!(defs[0].parameters["type"], "object");

        let tool = catalog.get_tool("echo").unwrap();
        let args = json!({"text": "xin chào"}).as_object().cloned().unwrap();
        assert_eq!(tool.execute(&args).into_message(), "xin chào");
        assert_eq!(tool.execute(&Args::new()).into_message(), "ERROR: missing text");
    }

    #[test]
    fn argument_coercion() {
        let args = json!({"a": 12, "b": "34", "c": 5.0, "d": 5.5, "e": " ", "f": true})
            .as_object()
            .cloned()
            .unwrap();
        assert_eq!(int_arg(&args, "a"), Some(12));
        assert_eq!(int_arg(&args, "b"), Some(34));
        assert_eq!(int_arg(&args, "c"), Some(5));
        assert_eq!(int_arg(&args, "d"), None);
        assert_eq!(int_arg(&args, "f"), None);
        assert_eq!(str_arg(&args, "b"), Some("34"));
        assert_eq!(str_arg(&args, "e"), None);
    }
}
