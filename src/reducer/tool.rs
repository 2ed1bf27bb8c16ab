//! Tool call lifecycle.
//!
//! ```text
//! (none)             --tool-input-start-->       input-streaming
//! input-streaming    --tool-input-delta-->       input-streaming
//! input-streaming    --tool-input-end/call-->    input-available
//! (none)             --tool-call-->              input-available
//! input-available    --tool-approval-request-->  approval-requested
//! approval-requested --tool-approval-response--> approval-responded
//! input-available | approval-responded(approved) --tool-result--> output-available
//! input-available | approval-responded(approved) --tool-error-->  output-error
//! approval-responded(denied) --tool-output-denied--> output-denied
//! ```
//!
//! A `tool-call` in `input-available` re-confirms the input. Preliminary
//! results update the output without leaving the current state. Everything
//! else is rejected as a recoverable anomaly, and terminal parts are never
//! touched again.

use super::config::ReducerConfig;
use super::partial_json::parse_partial_json;
use super::state::{MessageState, PartChange, Severity};
use crate::types::{ToolApproval, ToolPart, ToolState, UiChunk, UiPart};

fn approved(part: &ToolPart) -> Option<bool> {
    part.approval.as_ref().and_then(|approval| approval.approved)
}

/// State after applying `chunk` to `part`, or `None` when the chunk is not
/// accepted in the part's current state.
fn next_state(part: &ToolPart, chunk: &UiChunk) -> Option<ToolState> {
    use ToolState::*;

    let preliminary = matches!(
        chunk,
        UiChunk::ToolResult {
            preliminary: Some(true),
            ..
        }
    );

    match (part.state, chunk) {
        (InputStreaming, UiChunk::ToolInputDelta { .. }) => Some(InputStreaming),
        (InputStreaming, UiChunk::ToolInputEnd { .. }) => Some(InputAvailable),
        (InputStreaming | InputAvailable, UiChunk::ToolCall { .. }) => Some(InputAvailable),
        (InputAvailable, UiChunk::ToolApprovalRequest { .. }) => Some(ApprovalRequested),
        (ApprovalRequested, UiChunk::ToolApprovalResponse { .. }) => Some(ApprovalResponded),
        (InputAvailable, UiChunk::ToolResult { .. }) if preliminary => Some(InputAvailable),
        (InputAvailable, UiChunk::ToolResult { .. }) => Some(OutputAvailable),
        (InputAvailable, UiChunk::ToolError { .. }) => Some(OutputError),
        (ApprovalResponded, UiChunk::ToolResult { .. }) if approved(part) == Some(true) => {
            Some(if preliminary {
                ApprovalResponded
            } else {
                OutputAvailable
            })
        }
        (ApprovalResponded, UiChunk::ToolError { .. }) if approved(part) == Some(true) => {
            Some(OutputError)
        }
        (ApprovalResponded, UiChunk::ToolOutputDenied { .. }) if approved(part) == Some(false) => {
            Some(OutputDenied)
        }
        _ => None,
    }
}

/// Copy the chunk's payload into the part.
fn update_part(part: &mut ToolPart, chunk: &UiChunk) {
    match chunk {
        UiChunk::ToolInputDelta { delta, .. } => {
            part.input_text.push_str(delta);
            part.input = parse_partial_json(&part.input_text);
        }
        UiChunk::ToolInputEnd { .. } => {
            part.input = parse_partial_json(&part.input_text);
        }
        UiChunk::ToolCall {
            tool_name,
            input,
            provider_executed,
            provider_metadata,
            ..
        } => {
            part.tool_name = tool_name.clone();
            part.input = Some(input.clone());
            if provider_executed.is_some() {
                part.provider_executed = *provider_executed;
            }
            if provider_metadata.is_some() {
                part.call_provider_metadata = provider_metadata.clone();
            }
        }
        UiChunk::ToolApprovalRequest { approval_id, .. } => {
            part.approval = Some(ToolApproval {
                id: approval_id.clone(),
                approved: None,
                reason: None,
            });
        }
        UiChunk::ToolApprovalResponse {
            approved, reason, ..
        } => {
            if let Some(approval) = &mut part.approval {
                approval.approved = Some(*approved);
                approval.reason = reason.clone();
            }
        }
        UiChunk::ToolResult {
            output,
            provider_executed,
            preliminary,
            ..
        } => {
            part.output = Some(output.clone());
            part.preliminary = preliminary.unwrap_or(false);
            if provider_executed.is_some() {
                part.provider_executed = *provider_executed;
            }
        }
        UiChunk::ToolError {
            error_text,
            provider_executed,
            ..
        } => {
            part.error_text = Some(error_text.clone());
            part.preliminary = false;
            if provider_executed.is_some() {
                part.provider_executed = *provider_executed;
            }
        }
        _ => {}
    }
}

impl MessageState {
    fn tool(&self, idx: usize) -> Option<&ToolPart> {
        self.message.parts.get(idx).and_then(UiPart::as_tool)
    }

    fn tool_mut(&mut self, idx: usize) -> Option<&mut ToolPart> {
        match self.message.parts.get_mut(idx) {
            Some(UiPart::Tool(part)) => Some(part),
            _ => None,
        }
    }

    pub(super) fn apply_tool(&mut self, chunk: &UiChunk, config: &ReducerConfig) -> PartChange {
        let tool_call_id = match chunk {
            UiChunk::ToolApprovalResponse { approval_id, .. } => {
                match self.approvals.get(approval_id) {
                    Some(tool_call_id) => tool_call_id.clone(),
                    None => {
                        return self.record(
                            Severity::Recoverable,
                            chunk,
                            format!("approval `{approval_id}` was never requested"),
                        );
                    }
                }
            }
            other => match other.tool_call_id() {
                Some(id) => id.to_string(),
                None => return PartChange::None,
            },
        };

        let Some(idx) = self.tools.get(&tool_call_id).copied() else {
            return self.create_tool(tool_call_id, chunk, config);
        };
        let Some(part) = self.tool(idx) else {
            return PartChange::None;
        };

        let current = part.state;
        if current.is_terminal() {
            return self.record(
                Severity::Recoverable,
                chunk,
                format!("tool call `{tool_call_id}` already reached {current}; chunk rejected"),
            );
        }
        let Some(next) = next_state(part, chunk) else {
            return self.record(
                Severity::Recoverable,
                chunk,
                format!(
                    "`{}` not accepted for tool call `{tool_call_id}` in state {current}",
                    chunk.kind()
                ),
            );
        };

        if let UiChunk::ToolApprovalRequest { approval_id, .. } = chunk {
            self.approvals
                .insert(approval_id.clone(), tool_call_id.clone());
        }
        if let Some(part) = self.tool_mut(idx) {
            part.state = next;
            update_part(part, chunk);
        }
        PartChange::Updated(idx)
    }

    fn create_tool(
        &mut self,
        tool_call_id: String,
        chunk: &UiChunk,
        config: &ReducerConfig,
    ) -> PartChange {
        let part = match chunk {
            UiChunk::ToolInputStart {
                tool_name,
                provider_executed,
                ..
            } => {
                let mut part = ToolPart::new(
                    tool_call_id.clone(),
                    tool_name.clone(),
                    ToolState::InputStreaming,
                );
                part.provider_executed = *provider_executed;
                part
            }
            UiChunk::ToolCall { tool_name, .. } => {
                let mut part = ToolPart::new(
                    tool_call_id.clone(),
                    tool_name.clone(),
                    ToolState::InputAvailable,
                );
                update_part(&mut part, chunk);
                part
            }
            _ => {
                return self.record(
                    Severity::Recoverable,
                    chunk,
                    format!("tool call `{tool_call_id}` was never started"),
                );
            }
        };

        let change = self.push_part(UiPart::Tool(part), chunk, config);
        if let PartChange::Appended(idx) = change {
            self.tools.insert(tool_call_id, idx);
        }
        change
    }
}
