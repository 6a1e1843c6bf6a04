use crate::error::VoiceError;
use crate::model::ToolSpec;
use folio_types::persona;
use serde_json::{json, Value};
use std::fmt;

/// Name of the contact lookup tool exposed to the model.
pub const CONTACT_LINK_TOOL: &str = "lookup_contact_link";

type ToolHandler = fn(&Value) -> Result<String, VoiceError>;

/// A function the model may call, with its local handler.
#[derive(Clone)]
pub struct FunctionTool {
    pub spec: ToolSpec,
    handler: ToolHandler,
}

impl fmt::Debug for FunctionTool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionTool")
            .field("name", &self.spec.name)
            .finish()
    }
}

impl FunctionTool {
    pub fn new(
        name: &'static str,
        description: &'static str,
        parameters: Value,
        handler: ToolHandler,
    ) -> Self {
        Self {
            spec: ToolSpec {
                kind: "function",
                name,
                description,
                parameters,
            },
            handler,
        }
    }

    pub fn name(&self) -> &'static str {
        self.spec.name
    }
}

/// The persona a session runs: its prompt, opening line and tools.
#[derive(Debug, Clone)]
pub struct Agent {
    pub instructions: String,
    /// Spoken once after joining a live room.
    pub greeting: Option<String>,
    pub tools: Vec<FunctionTool>,
}

impl Agent {
    pub fn new(instructions: impl Into<String>) -> Self {
        Self {
            instructions: instructions.into(),
            greeting: None,
            tools: Vec::new(),
        }
    }

    /// The portfolio persona with its contact lookup tool.
    pub fn portfolio() -> Self {
        Self {
            instructions: persona::INSTRUCTIONS.to_string(),
            greeting: Some(persona::GREETING.to_string()),
            tools: vec![contact_link_tool()],
        }
    }

    pub fn with_tool(mut self, tool: FunctionTool) -> Self {
        self.tools.push(tool);
        self
    }

    pub fn tool_specs(&self) -> Vec<ToolSpec> {
        self.tools.iter().map(|tool| tool.spec.clone()).collect()
    }

    /// Runs the tool `name` with the model-supplied JSON `arguments`.
    pub fn invoke_tool(&self, name: &str, arguments: &str) -> Result<String, VoiceError> {
        let tool = self
            .tools
            .iter()
            .find(|tool| tool.name() == name)
            .ok_or_else(|| VoiceError::UnknownTool(name.to_string()))?;

        let args: Value = if arguments.trim().is_empty() {
            Value::Object(Default::default())
        } else {
            serde_json::from_str(arguments)?
        };
        (tool.handler)(&args)
    }
}

/// The `lookup_contact_link` tool, answered from the persona's link table.
pub fn contact_link_tool() -> FunctionTool {
    FunctionTool::new(
        CONTACT_LINK_TOOL,
        "Look up Priyanka's GitHub profile, email address or phone number.",
        json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "What the user asked for, e.g. \"github\", \"email\" or \"phone number\"."
                }
            },
            "required": ["query"]
        }),
        lookup_contact_link,
    )
}

fn lookup_contact_link(args: &Value) -> Result<String, VoiceError> {
    let query = args
        .get("query")
        .and_then(Value::as_str)
        .ok_or_else(|| VoiceError::Protocol("missing string argument `query`".to_string()))?;

    Ok(persona::contact_link_for(query)
        .unwrap_or_else(|| "No contact link matches that request.".to_string()))
}
