//! Agent event → wire event translation
//!
//! A two-state machine (`Streaming` → `Done`) pulled by the HTTP body. Each
//! agent event expands to its text tokens, then its tool calls, then a `Done`
//! if it is the final response. Nothing upstream is read after `Done`.

use crate::agent::{AgentEvent, AgentEventStream, AgentRun};
use futures::stream::{BoxStream, Stream};
use futures::StreamExt;
use serde_json::{json, Map, Value};
use std::collections::VecDeque;
use std::time::Duration;

/// Wire events for one chat call, in emission order
pub type WireStream = BoxStream<'static, WireEvent>;

/// Event delivered to the client, one per SSE frame
#[derive(Debug, Clone, PartialEq)]
pub enum WireEvent {
    Token {
        content: String,
    },
    ToolCall {
        name: String,
        args: Map<String, Value>,
    },
    Done,
    /// Terminal frame for a runtime failure after the stream has opened
    Error {
        message: String,
    },
}

impl WireEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            WireEvent::Token { .. } => "token",
            WireEvent::ToolCall { .. } => "tool_call",
            WireEvent::Done => "done",
            WireEvent::Error { .. } => "error",
        }
    }

    /// JSON record sent as the frame's `data`
    pub fn to_json(&self) -> Value {
        match self {
            WireEvent::Token { content } => json!({
                "type": "token",
                "content": content
            }),
            WireEvent::ToolCall { name, args } => json!({
                "type": "tool_call",
                "name": name,
                "args": args
            }),
            WireEvent::Done => json!({
                "type": "done"
            }),
            WireEvent::Error { message } => json!({
                "type": "error",
                "message": message
            }),
        }
    }
}

/// Wire events for one agent event, in emission order
pub fn translate_event(event: &AgentEvent) -> Vec<WireEvent> {
    let tokens = event.texts().map(|text| WireEvent::Token {
        content: text.to_string(),
    });
    let tool_calls = event.function_calls().map(|(name, args)| WireEvent::ToolCall {
        name: name.to_string(),
        args: args.clone(),
    });

    let mut out: Vec<WireEvent> = tokens.chain(tool_calls).collect();
    if event.is_final_response() {
        out.push(WireEvent::Done);
    }
    out
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Streaming,
    Done,
}

struct Translator {
    session_id: String,
    events: AgentEventStream,
    pending: VecDeque<WireEvent>,
    phase: Phase,
    idle_timeout: Duration,
    emitted: usize,
}

impl Translator {
    fn finish(&mut self) {
        self.phase = Phase::Done;
        // Release the upstream run right away rather than when the body drops
        self.events = futures::stream::empty().boxed();
    }

    async fn next_wire(&mut self) -> Option<WireEvent> {
        loop {
            if let Some(event) = self.pending.pop_front() {
                self.emitted += 1;
                return Some(event);
            }
            if self.phase == Phase::Done {
                return None;
            }

            match tokio::time::timeout(self.idle_timeout, self.events.next()).await {
                Ok(Some(Ok(event))) => {
                    self.pending.extend(translate_event(&event));
                    if event.is_final_response() {
                        tracing::info!(
                            session_id = %self.session_id,
                            frames = self.emitted + self.pending.len(),
                            "Agent run complete"
                        );
                        self.finish();
                    }
                }
                Ok(Some(Err(e))) => {
                    tracing::error!(
                        session_id = %self.session_id,
                        error = %e.message,
                        frames = self.emitted,
                        "Agent runtime failed mid-stream"
                    );
                    self.pending.push_back(WireEvent::Error { message: e.message });
                    self.finish();
                }
                Ok(None) => {
                    tracing::warn!(
                        session_id = %self.session_id,
                        frames = self.emitted,
                        "Agent stream ended without a final response"
                    );
                    self.finish();
                }
                Err(_) => {
                    let message = format!(
                        "agent produced no event within {}s",
                        self.idle_timeout.as_secs()
                    );
                    tracing::error!(session_id = %self.session_id, %message, "Agent run timed out");
                    self.pending.push_back(WireEvent::Error { message });
                    self.finish();
                }
            }
        }
    }
}

impl Drop for Translator {
    fn drop(&mut self) {
        if self.phase == Phase::Streaming {
            tracing::info!(
                session_id = %self.session_id,
                frames = self.emitted,
                "Client disconnected, abandoning agent run"
            );
        }
    }
}

/// Translate a live agent run into wire events.
///
/// The returned stream is lazy and unbuffered: one upstream event is read only
/// when every wire event derived from the previous one has been taken.
/// `idle_timeout` bounds the wait for each upstream event.
pub fn translate(run: AgentRun, idle_timeout: Duration) -> impl Stream<Item = WireEvent> + Send {
    let translator = Translator {
        session_id: run.session_id,
        events: run.events,
        pending: VecDeque::new(),
        phase: Phase::Streaming,
        idle_timeout,
        emitted: 0,
    };

    futures::stream::unfold(translator, |mut translator| async move {
        translator
            .next_wire()
            .await
            .map(|event| (event, translator))
    })
}
