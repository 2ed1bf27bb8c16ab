//! Typed stream chunks.
//!
//! `UiChunk` is the closed set of events that can appear on a normalized
//! model-output stream. The JSON shape is a `type`-tagged object with
//! camelCase fields (`{"type":"text-delta","id":"0","delta":"Hel"}`).

use serde::{Deserialize, Serialize};

use super::ProviderMetadata;

/// Source reference attached to a message (citation, retrieved document).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "sourceType", rename_all = "lowercase")]
pub enum Source {
    Url {
        id: String,
        url: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        title: Option<String>,
        #[serde(
            default,
            skip_serializing_if = "Option::is_none",
            rename = "providerMetadata"
        )]
        provider_metadata: Option<ProviderMetadata>,
    },
    Document {
        id: String,
        #[serde(rename = "mediaType")]
        media_type: String,
        title: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        filename: Option<String>,
        #[serde(
            default,
            skip_serializing_if = "Option::is_none",
            rename = "providerMetadata"
        )]
        provider_metadata: Option<ProviderMetadata>,
    },
}

impl Source {
    pub fn id(&self) -> &str {
        match self {
            Source::Url { id, .. } | Source::Document { id, .. } => id,
        }
    }
}

/// Chunk family, used for logging and coarse dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChunkFamily {
    Lifecycle,
    Text,
    Reasoning,
    Tool,
    Attachment,
    SideChannel,
    Raw,
}

/// One typed event on the normalized stream.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum UiChunk {
    #[serde(rename_all = "camelCase")]
    Start {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message_id: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message_metadata: Option<serde_json::Value>,
    },
    StartStep,
    FinishStep,
    #[serde(rename_all = "camelCase")]
    Finish {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        finish_reason: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message_metadata: Option<serde_json::Value>,
    },
    #[serde(rename_all = "camelCase")]
    Error { error_text: String },
    Abort {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },

    #[serde(rename_all = "camelCase")]
    TextStart {
        id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        provider_metadata: Option<ProviderMetadata>,
    },
    #[serde(rename_all = "camelCase")]
    TextDelta {
        id: String,
        #[serde(alias = "text")]
        delta: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        provider_metadata: Option<ProviderMetadata>,
    },
    #[serde(rename_all = "camelCase")]
    TextEnd {
        id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        provider_metadata: Option<ProviderMetadata>,
    },

    #[serde(rename_all = "camelCase")]
    ReasoningStart {
        id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        provider_metadata: Option<ProviderMetadata>,
    },
    #[serde(rename_all = "camelCase")]
    ReasoningDelta {
        id: String,
        #[serde(alias = "text")]
        delta: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        provider_metadata: Option<ProviderMetadata>,
    },
    #[serde(rename_all = "camelCase")]
    ReasoningEnd {
        id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        provider_metadata: Option<ProviderMetadata>,
    },

    #[serde(rename_all = "camelCase")]
    ToolInputStart {
        tool_call_id: String,
        tool_name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        provider_executed: Option<bool>,
    },
    #[serde(rename_all = "camelCase")]
    ToolInputDelta {
        tool_call_id: String,
        #[serde(alias = "inputTextDelta")]
        delta: String,
    },
    #[serde(rename_all = "camelCase")]
    ToolInputEnd { tool_call_id: String },
    #[serde(rename_all = "camelCase")]
    ToolCall {
        tool_call_id: String,
        tool_name: String,
        input: serde_json::Value,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        provider_executed: Option<bool>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        provider_metadata: Option<ProviderMetadata>,
    },
    #[serde(rename_all = "camelCase")]
    ToolResult {
        tool_call_id: String,
        output: serde_json::Value,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        provider_executed: Option<bool>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        preliminary: Option<bool>,
    },
    #[serde(rename_all = "camelCase")]
    ToolError {
        tool_call_id: String,
        #[serde(alias = "error")]
        error_text: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        provider_executed: Option<bool>,
    },
    #[serde(rename_all = "camelCase")]
    ToolApprovalRequest {
        approval_id: String,
        tool_call_id: String,
    },
    #[serde(rename_all = "camelCase")]
    ToolApprovalResponse {
        approval_id: String,
        approved: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    ToolOutputDenied { tool_call_id: String },

    #[serde(rename_all = "camelCase")]
    File { media_type: String, url: String },
    Source(Source),

    #[serde(rename_all = "camelCase")]
    Data {
        data_type: String,
        data: serde_json::Value,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        id: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        transient: Option<bool>,
    },
    #[serde(rename_all = "camelCase")]
    MessageMetadata { message_metadata: serde_json::Value },

    #[serde(rename_all = "camelCase")]
    Raw { raw_value: serde_json::Value },
}

impl UiChunk {
    /// Wire tag of this chunk (the JSON `type` value).
    pub fn kind(&self) -> &'static str {
        match self {
            UiChunk::Start { .. } => "start",
            UiChunk::StartStep => "start-step",
            UiChunk::FinishStep => "finish-step",
            UiChunk::Finish { .. } => "finish",
            UiChunk::Error { .. } => "error",
            UiChunk::Abort { .. } => "abort",
            UiChunk::TextStart { .. } => "text-start",
            UiChunk::TextDelta { .. } => "text-delta",
            UiChunk::TextEnd { .. } => "text-end",
            UiChunk::ReasoningStart { .. } => "reasoning-start",
            UiChunk::ReasoningDelta { .. } => "reasoning-delta",
            UiChunk::ReasoningEnd { .. } => "reasoning-end",
            UiChunk::ToolInputStart { .. } => "tool-input-start",
            UiChunk::ToolInputDelta { .. } => "tool-input-delta",
            UiChunk::ToolInputEnd { .. } => "tool-input-end",
            UiChunk::ToolCall { .. } => "tool-call",
            UiChunk::ToolResult { .. } => "tool-result",
            UiChunk::ToolError { .. } => "tool-error",
            UiChunk::ToolApprovalRequest { .. } => "tool-approval-request",
            UiChunk::ToolApprovalResponse { .. } => "tool-approval-response",
            UiChunk::ToolOutputDenied { .. } => "tool-output-denied",
            UiChunk::File { .. } => "file",
            UiChunk::Source(_) => "source",
            UiChunk::Data { .. } => "data",
            UiChunk::MessageMetadata { .. } => "message-metadata",
            UiChunk::Raw { .. } => "raw",
        }
    }

    pub fn family(&self) -> ChunkFamily {
        match self {
            UiChunk::Start { .. }
            | UiChunk::StartStep
            | UiChunk::FinishStep
            | UiChunk::Finish { .. }
            | UiChunk::Error { .. }
            | UiChunk::Abort { .. } => ChunkFamily::Lifecycle,
            UiChunk::TextStart { .. } | UiChunk::TextDelta { .. } | UiChunk::TextEnd { .. } => {
                ChunkFamily::Text
            }
            UiChunk::ReasoningStart { .. }
            | UiChunk::ReasoningDelta { .. }
            | UiChunk::ReasoningEnd { .. } => ChunkFamily::Reasoning,
            UiChunk::ToolInputStart { .. }
            | UiChunk::ToolInputDelta { .. }
            | UiChunk::ToolInputEnd { .. }
            | UiChunk::ToolCall { .. }
            | UiChunk::ToolResult { .. }
            | UiChunk::ToolError { .. }
            | UiChunk::ToolApprovalRequest { .. }
            | UiChunk::ToolApprovalResponse { .. }
            | UiChunk::ToolOutputDenied { .. } => ChunkFamily::Tool,
            UiChunk::File { .. } | UiChunk::Source(_) => ChunkFamily::Attachment,
            UiChunk::Data { .. } | UiChunk::MessageMetadata { .. } => ChunkFamily::SideChannel,
            UiChunk::Raw { .. } => ChunkFamily::Raw,
        }
    }

    /// `finish`, `abort` and `error` end a stream.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            UiChunk::Finish { .. } | UiChunk::Abort { .. } | UiChunk::Error { .. }
        )
    }

    /// Tool call id addressed by this chunk, if any.
    ///
    /// `tool-approval-response` is keyed by approval id and returns `None`.
    pub fn tool_call_id(&self) -> Option<&str> {
        match self {
            UiChunk::ToolInputStart { tool_call_id, .. }
            | UiChunk::ToolInputDelta { tool_call_id, .. }
            | UiChunk::ToolInputEnd { tool_call_id }
            | UiChunk::ToolCall { tool_call_id, .. }
            | UiChunk::ToolResult { tool_call_id, .. }
            | UiChunk::ToolError { tool_call_id, .. }
            | UiChunk::ToolApprovalRequest { tool_call_id, .. }
            | UiChunk::ToolOutputDenied { tool_call_id } => Some(tool_call_id),
            _ => None,
        }
    }

    pub fn start() -> Self {
        UiChunk::Start {
            message_id: None,
            message_metadata: None,
        }
    }

    pub fn start_with_id(message_id: impl Into<String>) -> Self {
        UiChunk::Start {
            message_id: Some(message_id.into()),
            message_metadata: None,
        }
    }

    pub fn finish() -> Self {
        UiChunk::Finish {
            finish_reason: None,
            message_metadata: None,
        }
    }

    pub fn error(error_text: impl Into<String>) -> Self {
        UiChunk::Error {
            error_text: error_text.into(),
        }
    }

    pub fn abort() -> Self {
        UiChunk::Abort { reason: None }
    }

    pub fn text_start(id: impl Into<String>) -> Self {
        UiChunk::TextStart {
            id: id.into(),
            provider_metadata: None,
        }
    }

    pub fn text_delta(id: impl Into<String>, delta: impl Into<String>) -> Self {
        UiChunk::TextDelta {
            id: id.into(),
            delta: delta.into(),
            provider_metadata: None,
        }
    }

    pub fn text_end(id: impl Into<String>) -> Self {
        UiChunk::TextEnd {
            id: id.into(),
            provider_metadata: None,
        }
    }

    pub fn reasoning_start(id: impl Into<String>) -> Self {
        UiChunk::ReasoningStart {
            id: id.into(),
            provider_metadata: None,
        }
    }

    pub fn reasoning_delta(id: impl Into<String>, delta: impl Into<String>) -> Self {
        UiChunk::ReasoningDelta {
            id: id.into(),
            delta: delta.into(),
            provider_metadata: None,
        }
    }

    pub fn reasoning_end(id: impl Into<String>) -> Self {
        UiChunk::ReasoningEnd {
            id: id.into(),
            provider_metadata: None,
        }
    }

    pub fn tool_input_start(tool_call_id: impl Into<String>, tool_name: impl Into<String>) -> Self {
        UiChunk::ToolInputStart {
            tool_call_id: tool_call_id.into(),
            tool_name: tool_name.into(),
            provider_executed: None,
        }
    }

    pub fn tool_input_delta(tool_call_id: impl Into<String>, delta: impl Into<String>) -> Self {
        UiChunk::ToolInputDelta {
            tool_call_id: tool_call_id.into(),
            delta: delta.into(),
        }
    }

    pub fn tool_input_end(tool_call_id: impl Into<String>) -> Self {
        UiChunk::ToolInputEnd {
            tool_call_id: tool_call_id.into(),
        }
    }

    pub fn tool_call(
        tool_call_id: impl Into<String>,
        tool_name: impl Into<String>,
        input: serde_json::Value,
    ) -> Self {
        UiChunk::ToolCall {
            tool_call_id: tool_call_id.into(),
            tool_name: tool_name.into(),
            input,
            provider_executed: None,
            provider_metadata: None,
        }
    }

    pub fn tool_result(tool_call_id: impl Into<String>, output: serde_json::Value) -> Self {
        UiChunk::ToolResult {
            tool_call_id: tool_call_id.into(),
            output,
            provider_executed: None,
            preliminary: None,
        }
    }

    pub fn tool_error(tool_call_id: impl Into<String>, error_text: impl Into<String>) -> Self {
        UiChunk::ToolError {
            tool_call_id: tool_call_id.into(),
            error_text: error_text.into(),
            provider_executed: None,
        }
    }

    pub fn tool_approval_request(
        approval_id: impl Into<String>,
        tool_call_id: impl Into<String>,
    ) -> Self {
        UiChunk::ToolApprovalRequest {
            approval_id: approval_id.into(),
            tool_call_id: tool_call_id.into(),
        }
    }

    pub fn tool_approval_response(approval_id: impl Into<String>, approved: bool) -> Self {
        UiChunk::ToolApprovalResponse {
            approval_id: approval_id.into(),
            approved,
            reason: None,
        }
    }

    pub fn tool_output_denied(tool_call_id: impl Into<String>) -> Self {
        UiChunk::ToolOutputDenied {
            tool_call_id: tool_call_id.into(),
        }
    }

    pub fn data(data_type: impl Into<String>, data: serde_json::Value) -> Self {
        UiChunk::Data {
            data_type: data_type.into(),
            data,
            id: None,
            transient: None,
        }
    }
}
