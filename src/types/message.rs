//! Renderable message model produced by the reducer.

use serde::{Deserialize, Serialize};

use super::{ProviderMetadata, Source};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    #[default]
    Assistant,
    System,
}

/// Lifecycle of the message as a whole.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "kebab-case")]
pub enum MessageStatus {
    #[default]
    Streaming,
    #[serde(rename_all = "camelCase")]
    Finished {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        finish_reason: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    Errored { error_text: String },
    Aborted {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },
}

impl MessageStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, MessageStatus::Streaming)
    }
}

/// State of a text or reasoning span.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SpanState {
    #[default]
    Streaming,
    Done,
    /// The stream was aborted while the span was open.
    Aborted,
    /// The stream failed while the span was open.
    Errored,
}

/// Text or reasoning span.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpanPart {
    pub id: String,
    pub text: String,
    pub state: SpanState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_metadata: Option<ProviderMetadata>,
}

impl SpanPart {
    pub fn is_open(&self) -> bool {
        self.state == SpanState::Streaming
    }
}

/// Tool call lifecycle.
///
/// ```text
/// input-streaming -> input-available -> output-available | output-error | output-denied
///                    input-available -> approval-requested -> approval-responded -> ...
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ToolState {
    InputStreaming,
    InputAvailable,
    ApprovalRequested,
    ApprovalResponded,
    OutputAvailable,
    OutputError,
    OutputDenied,
}

impl ToolState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            ToolState::OutputAvailable | ToolState::OutputError | ToolState::OutputDenied
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ToolState::InputStreaming => "input-streaming",
            ToolState::InputAvailable => "input-available",
            ToolState::ApprovalRequested => "approval-requested",
            ToolState::ApprovalResponded => "approval-responded",
            ToolState::OutputAvailable => "output-available",
            ToolState::OutputError => "output-error",
            ToolState::OutputDenied => "output-denied",
        }
    }
}

impl std::fmt::Display for ToolState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a non-terminal tool call stopped progressing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Interruption {
    Aborted,
    Errored,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolApproval {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approved: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// One tool invocation, from input construction to its outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolPart {
    pub tool_call_id: String,
    pub tool_name: String,
    pub state: ToolState,
    /// Parsed input. While streaming this is the best-effort parse of the
    /// partial JSON received so far.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<serde_json::Value>,
    /// Raw input text accumulated from `tool-input-delta` chunks.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub input_text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<serde_json::Value>,
    /// Set while the output is a preliminary result that may still be replaced.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub preliminary: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approval: Option<ToolApproval>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_executed: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub call_provider_metadata: Option<ProviderMetadata>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interrupted: Option<Interruption>,
}

impl ToolPart {
    pub(crate) fn new(tool_call_id: String, tool_name: String, state: ToolState) -> Self {
        Self {
            tool_call_id,
            tool_name,
            state,
            input: None,
            input_text: String::new(),
            output: None,
            preliminary: false,
            error_text: None,
            approval: None,
            provider_executed: None,
            call_provider_metadata: None,
            interrupted: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilePart {
    pub media_type: String,
    pub url: String,
}

/// Application data attached to the message (status lines, progress, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataPart {
    pub data_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub data: serde_json::Value,
}

/// A renderable, identity-stable segment of a message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum UiPart {
    Text(SpanPart),
    Reasoning(SpanPart),
    Tool(ToolPart),
    File(FilePart),
    Source(Source),
    Data(DataPart),
    StepStart,
    StepFinish,
}

impl UiPart {
    pub fn as_text(&self) -> Option<&SpanPart> {
        match self {
            UiPart::Text(part) => Some(part),
            _ => None,
        }
    }

    pub fn as_reasoning(&self) -> Option<&SpanPart> {
        match self {
            UiPart::Reasoning(part) => Some(part),
            _ => None,
        }
    }

    pub fn as_tool(&self) -> Option<&ToolPart> {
        match self {
            UiPart::Tool(part) => Some(part),
            _ => None,
        }
    }

    pub fn as_data(&self) -> Option<&DataPart> {
        match self {
            UiPart::Data(part) => Some(part),
            _ => None,
        }
    }
}

/// An ordered, append-only collection of parts plus role and metadata.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct UiMessage {
    pub id: String,
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
    pub parts: Vec<UiPart>,
    #[serde(default)]
    pub status: MessageStatus,
}

impl UiMessage {
    /// Empty assistant message, the starting point of every fold.
    pub fn assistant(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            role: Role::Assistant,
            ..Default::default()
        }
    }

    /// Concatenated text of all text parts.
    pub fn text(&self) -> String {
        self.parts
            .iter()
            .filter_map(UiPart::as_text)
            .map(|part| part.text.as_str())
            .collect()
    }

    pub fn text_parts(&self) -> impl Iterator<Item = &SpanPart> {
        self.parts.iter().filter_map(UiPart::as_text)
    }

    pub fn tool_parts(&self) -> impl Iterator<Item = &ToolPart> {
        self.parts.iter().filter_map(UiPart::as_tool)
    }

    /// Latest tool part for a tool call id.
    pub fn tool_part(&self, tool_call_id: &str) -> Option<&ToolPart> {
        self.parts
            .iter()
            .rev()
            .filter_map(UiPart::as_tool)
            .find(|part| part.tool_call_id == tool_call_id)
    }

    pub fn data_parts(&self) -> impl Iterator<Item = &DataPart> {
        self.parts.iter().filter_map(UiPart::as_data)
    }
}
