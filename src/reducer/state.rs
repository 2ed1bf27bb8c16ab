//! Message state and the chunk fold.
//!
//! `MessageState::apply` is a deterministic left fold step: the part list is
//! the arena, and id maps point into it so deltas mutate parts in place.
//! Parts are only ever appended or marked, never removed.

use serde::Serialize;
use std::collections::HashMap;

use super::config::ReducerConfig;
use super::metadata::deep_merge;
use crate::types::{
    FilePart, Interruption, MessageStatus, ProviderMetadata, SpanPart, SpanState, UiChunk,
    UiMessage, UiPart,
};

/// How bad a protocol anomaly is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// The message can no longer be trusted; its status becomes errored.
    Fatal,
    /// The chunk was ignored; the rest of the message is intact.
    Recoverable,
}

/// A chunk that could not be applied as-is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Anomaly {
    pub severity: Severity,
    /// Wire type of the offending chunk
    pub chunk: &'static str,
    pub message: String,
}

/// What one `apply` changed, so a UI can re-render only that.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartChange {
    None,
    Appended(usize),
    Updated(usize),
    /// Message-level fields (id, metadata, status) or several parts at once
    Message,
}

impl PartChange {
    pub fn is_none(self) -> bool {
        self == PartChange::None
    }

    /// Index of the single part that changed.
    pub fn part_index(self) -> Option<usize> {
        match self {
            PartChange::Appended(idx) | PartChange::Updated(idx) => Some(idx),
            PartChange::None | PartChange::Message => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SpanKind {
    Text,
    Reasoning,
}

/// Folded state of one message.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MessageState {
    pub(super) message: UiMessage,
    text_spans: HashMap<String, usize>,
    reasoning_spans: HashMap<String, usize>,
    pub(super) tools: HashMap<String, usize>,
    /// approval id -> tool call id
    pub(super) approvals: HashMap<String, String>,
    /// (data type, id) -> latest data part
    pub(super) data: HashMap<(String, Option<String>), usize>,
    text_bytes: usize,
    terminal: bool,
    anomalies: Vec<Anomaly>,
}

impl MessageState {
    /// Continue an existing message. Its parts are indexed so later chunks
    /// can address them; the status goes back to streaming.
    pub fn new(mut message: UiMessage) -> Self {
        message.status = MessageStatus::Streaming;
        let mut state = Self::default();
        for (idx, part) in message.parts.iter().enumerate() {
            match part {
                UiPart::Text(span) => {
                    state.text_spans.insert(span.id.clone(), idx);
                    state.text_bytes += span.text.len();
                }
                UiPart::Reasoning(span) => {
                    state.reasoning_spans.insert(span.id.clone(), idx);
                    state.text_bytes += span.text.len();
                }
                UiPart::Tool(tool) => {
                    state.tools.insert(tool.tool_call_id.clone(), idx);
                    if let Some(approval) = &tool.approval {
                        state
                            .approvals
                            .insert(approval.id.clone(), tool.tool_call_id.clone());
                    }
                }
                UiPart::Data(data) => {
                    state
                        .data
                        .insert((data.data_type.clone(), data.id.clone()), idx);
                }
                _ => {}
            }
        }
        state.message = message;
        state
    }

    pub fn message(&self) -> &UiMessage {
        &self.message
    }

    pub fn into_message(self) -> UiMessage {
        self.message
    }

    pub fn anomalies(&self) -> &[Anomaly] {
        &self.anomalies
    }

    pub fn has_fatal(&self) -> bool {
        self.anomalies.iter().any(|a| a.severity == Severity::Fatal)
    }

    /// A `finish`, `error` or `abort` chunk has been applied.
    pub fn is_terminal(&self) -> bool {
        self.terminal
    }

    /// Apply one chunk.
    pub fn apply(&mut self, chunk: &UiChunk, config: &ReducerConfig) -> PartChange {
        if self.terminal {
            return self.record(
                Severity::Recoverable,
                chunk,
                "chunk received after the stream ended",
            );
        }

        match chunk {
            UiChunk::Start {
                message_id,
                message_metadata,
            } => {
                if let Some(id) = message_id {
                    self.message.id = id.clone();
                }
                if let Some(metadata) = message_metadata {
                    self.merge_metadata(metadata, chunk, config);
                }
                PartChange::Message
            }
            UiChunk::StartStep => self.push_part(UiPart::StepStart, chunk, config),
            UiChunk::FinishStep => self.push_part(UiPart::StepFinish, chunk, config),
            UiChunk::Finish {
                finish_reason,
                message_metadata,
            } => {
                if let Some(metadata) = message_metadata {
                    self.merge_metadata(metadata, chunk, config);
                }
                self.close_spans(SpanState::Done);
                if !self.has_fatal() {
                    self.message.status = MessageStatus::Finished {
                        finish_reason: finish_reason.clone(),
                    };
                }
                self.terminal = true;
                PartChange::Message
            }
            UiChunk::Error { error_text } => {
                self.close_spans(SpanState::Errored);
                self.interrupt_tools(Interruption::Errored);
                self.message.status = MessageStatus::Errored {
                    error_text: error_text.clone(),
                };
                self.terminal = true;
                PartChange::Message
            }
            UiChunk::Abort { reason } => {
                self.close_spans(SpanState::Aborted);
                self.interrupt_tools(Interruption::Aborted);
                self.message.status = MessageStatus::Aborted {
                    reason: reason.clone(),
                };
                self.terminal = true;
                PartChange::Message
            }

            UiChunk::TextStart {
                id,
                provider_metadata,
            } => self.span_start(SpanKind::Text, id, provider_metadata, chunk, config),
            UiChunk::TextDelta {
                id,
                delta,
                provider_metadata,
            } => self.span_delta(SpanKind::Text, id, delta, provider_metadata, chunk, config),
            UiChunk::TextEnd {
                id,
                provider_metadata,
            } => self.span_end(SpanKind::Text, id, provider_metadata, chunk),
            UiChunk::ReasoningStart {
                id,
                provider_metadata,
            } => self.span_start(SpanKind::Reasoning, id, provider_metadata, chunk, config),
            UiChunk::ReasoningDelta {
                id,
                delta,
                provider_metadata,
            } => self.span_delta(
                SpanKind::Reasoning,
                id,
                delta,
                provider_metadata,
                chunk,
                config,
            ),
            UiChunk::ReasoningEnd {
                id,
                provider_metadata,
            } => self.span_end(SpanKind::Reasoning, id, provider_metadata, chunk),

            UiChunk::ToolInputStart { .. }
            | UiChunk::ToolInputDelta { .. }
            | UiChunk::ToolInputEnd { .. }
            | UiChunk::ToolCall { .. }
            | UiChunk::ToolResult { .. }
            | UiChunk::ToolError { .. }
            | UiChunk::ToolApprovalRequest { .. }
            | UiChunk::ToolApprovalResponse { .. }
            | UiChunk::ToolOutputDenied { .. } => self.apply_tool(chunk, config),

            UiChunk::File { media_type, url } => self.push_part(
                UiPart::File(FilePart {
                    media_type: media_type.clone(),
                    url: url.clone(),
                }),
                chunk,
                config,
            ),
            UiChunk::Source(source) => self.push_part(UiPart::Source(source.clone()), chunk, config),

            UiChunk::Data {
                data_type,
                data,
                id,
                transient,
            } => self.apply_data(
                chunk,
                data_type,
                data,
                id.as_ref(),
                transient.unwrap_or(false),
                config,
            ),
            UiChunk::MessageMetadata { message_metadata } => {
                if self.merge_metadata(message_metadata, chunk, config) {
                    PartChange::Message
                } else {
                    PartChange::None
                }
            }

            UiChunk::Raw { .. } => PartChange::None,
        }
    }

    /// Record an anomaly. Fatal anomalies mark the message errored.
    pub(super) fn record(
        &mut self,
        severity: Severity,
        chunk: &UiChunk,
        message: impl Into<String>,
    ) -> PartChange {
        let anomaly = Anomaly {
            severity,
            chunk: chunk.kind(),
            message: message.into(),
        };
        tracing::warn!(
            message_id = %self.message.id,
            chunk = anomaly.chunk,
            severity = ?severity,
            "{}",
            anomaly.message
        );

        let change = if severity == Severity::Fatal {
            self.message.status = MessageStatus::Errored {
                error_text: anomaly.message.clone(),
            };
            PartChange::Message
        } else {
            PartChange::None
        };
        self.anomalies.push(anomaly);
        change
    }

    pub(super) fn push_part(
        &mut self,
        part: UiPart,
        chunk: &UiChunk,
        config: &ReducerConfig,
    ) -> PartChange {
        if let Some(max) = config.max_parts
            && self.message.parts.len() >= max
        {
            return self.record(
                Severity::Recoverable,
                chunk,
                format!("part limit of {max} reached"),
            );
        }
        self.message.parts.push(part);
        PartChange::Appended(self.message.parts.len() - 1)
    }

    fn merge_metadata(
        &mut self,
        incoming: &serde_json::Value,
        chunk: &UiChunk,
        config: &ReducerConfig,
    ) -> bool {
        let merged = match &self.message.metadata {
            Some(current) => deep_merge(current.clone(), incoming),
            None => incoming.clone(),
        };
        if let Some(schema) = &config.metadata_schema
            && let Err(reason) = schema.validate(&merged)
        {
            self.record(
                Severity::Recoverable,
                chunk,
                format!("metadata rejected by schema: {reason}"),
            );
            return false;
        }
        self.message.metadata = Some(merged);
        true
    }

    fn spans(&mut self, kind: SpanKind) -> &mut HashMap<String, usize> {
        match kind {
            SpanKind::Text => &mut self.text_spans,
            SpanKind::Reasoning => &mut self.reasoning_spans,
        }
    }

    fn span(&self, idx: usize) -> Option<&SpanPart> {
        match self.message.parts.get(idx) {
            Some(UiPart::Text(span)) | Some(UiPart::Reasoning(span)) => Some(span),
            _ => None,
        }
    }

    fn span_mut(&mut self, idx: usize) -> Option<&mut SpanPart> {
        match self.message.parts.get_mut(idx) {
            Some(UiPart::Text(span)) | Some(UiPart::Reasoning(span)) => Some(span),
            _ => None,
        }
    }

    fn span_start(
        &mut self,
        kind: SpanKind,
        id: &str,
        provider_metadata: &Option<ProviderMetadata>,
        chunk: &UiChunk,
        config: &ReducerConfig,
    ) -> PartChange {
        if let Some(idx) = self.spans(kind).get(id).copied() {
            if self.span(idx).is_some_and(SpanPart::is_open) {
                return self.record(
                    Severity::Recoverable,
                    chunk,
                    format!("span `{id}` is already open"),
                );
            }
            self.record(
                Severity::Recoverable,
                chunk,
                format!("span id `{id}` reused after it ended"),
            );
        }

        let span = SpanPart {
            id: id.to_string(),
            text: String::new(),
            state: SpanState::Streaming,
            provider_metadata: provider_metadata.clone(),
        };
        let part = match kind {
            SpanKind::Text => UiPart::Text(span),
            SpanKind::Reasoning => UiPart::Reasoning(span),
        };
        let change = self.push_part(part, chunk, config);
        if let PartChange::Appended(idx) = change {
            self.spans(kind).insert(id.to_string(), idx);
        }
        change
    }

    fn span_delta(
        &mut self,
        kind: SpanKind,
        id: &str,
        delta: &str,
        provider_metadata: &Option<ProviderMetadata>,
        chunk: &UiChunk,
        config: &ReducerConfig,
    ) -> PartChange {
        let Some(idx) = self.spans(kind).get(id).copied() else {
            return self.record(
                Severity::Fatal,
                chunk,
                format!("delta for span `{id}` that was never started"),
            );
        };
        if !self.span(idx).is_some_and(SpanPart::is_open) {
            return self.record(
                Severity::Recoverable,
                chunk,
                format!("delta for span `{id}` after it ended"),
            );
        }

        let mut accepted = delta;
        let mut limit_hit = None;
        if let Some(max) = config.max_text_bytes {
            let available = max.saturating_sub(self.text_bytes);
            if delta.len() > available {
                accepted = truncate_at_char_boundary(delta, available);
                limit_hit = Some(max);
            }
        }

        self.text_bytes += accepted.len();
        if let Some(span) = self.span_mut(idx) {
            span.text.push_str(accepted);
            if provider_metadata.is_some() {
                span.provider_metadata = provider_metadata.clone();
            }
        }

        if let Some(max) = limit_hit {
            self.record(
                Severity::Recoverable,
                chunk,
                format!("text limit of {max} bytes reached; delta truncated"),
            );
        }
        PartChange::Updated(idx)
    }

    fn span_end(
        &mut self,
        kind: SpanKind,
        id: &str,
        provider_metadata: &Option<ProviderMetadata>,
        chunk: &UiChunk,
    ) -> PartChange {
        let Some(idx) = self.spans(kind).get(id).copied() else {
            return self.record(
                Severity::Recoverable,
                chunk,
                format!("end for span `{id}` that was never started"),
            );
        };
        if !self.span(idx).is_some_and(SpanPart::is_open) {
            return self.record(
                Severity::Recoverable,
                chunk,
                format!("span `{id}` already ended"),
            );
        }
        if let Some(span) = self.span_mut(idx) {
            span.state = SpanState::Done;
            if provider_metadata.is_some() {
                span.provider_metadata = provider_metadata.clone();
            }
        }
        PartChange::Updated(idx)
    }

    fn close_spans(&mut self, state: SpanState) {
        for part in &mut self.message.parts {
            if let UiPart::Text(span) | UiPart::Reasoning(span) = part
                && span.is_open()
            {
                span.state = state;
            }
        }
    }

    fn interrupt_tools(&mut self, interruption: Interruption) {
        for part in &mut self.message.parts {
            if let UiPart::Tool(tool) = part
                && !tool.state.is_terminal()
            {
                tool.interrupted = Some(interruption);
            }
        }
    }
}

fn truncate_at_char_boundary(text: &str, max: usize) -> &str {
    let mut end = max.min(text.len());
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}
