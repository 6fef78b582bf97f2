// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Streaming response assembly
//!
//! A [`StreamAssembler`] turns the chunk stream of one completion request into
//! a single assistant [`Message`]. The first chunk decides whether the response
//! is a text answer or a tool-call request; every fragment pulled afterwards is
//! handed to the caller for live display and appended to a private builder.
//! The message only exists once the fragments are drained.

use std::collections::VecDeque;

use futures::{Stream, StreamExt};

use crate::error::{ApiError, RelayError, Result};
use crate::llm::message::{Message, Role, ToolCall};
use crate::llm::provider::{ChunkStream, StreamChunk, ToolCallDelta};

/// Shape of the message being assembled, fixed by the first chunk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    /// Plain text answer
    Text,
    /// Tool invocation request
    ToolCalls,
}

/// Assistant message under construction
#[derive(Debug)]
enum MessageBuilder {
    Text(String),
    /// Calls keyed by their stream index, in order of first appearance
    ToolCalls(Vec<(usize, ToolCall)>),
}

impl MessageBuilder {
    fn append(&mut self, index: usize, fragment: &str) {
        match self {
            MessageBuilder::Text(text) => text.push_str(fragment),
            MessageBuilder::ToolCalls(calls) => {
                if let Some((_, call)) = calls.iter_mut().find(|(i, _)| *i == index) {
                    call.function.arguments.push_str(fragment);
                }
            }
        }
    }

    /// Register the structural part of a tool call delta (id, name) and
    /// return the stream index its argument text belongs to.
    fn open_call(&mut self, delta: &ToolCallDelta) -> usize {
        let MessageBuilder::ToolCalls(calls) = self else {
            return delta.index;
        };

        if let Some((_, call)) = calls.iter_mut().find(|(i, _)| *i == delta.index) {
            if call.function.name.is_empty() {
                if let Some(name) = &delta.name {
                    call.function.name = name.clone();
                }
            }
            return delta.index;
        }

        let opens_call = delta.id.is_some() || delta.name.is_some() || calls.is_empty();
        if !opens_call {
            // Argument text without a header goes to the most recent call
            return calls.last().map(|(i, _)| *i).unwrap_or(delta.index);
        }

        let id = delta
            .id
            .clone()
            .unwrap_or_else(|| format!("call_{}", uuid::Uuid::new_v4().simple()));
        let name = delta.name.clone().unwrap_or_default();
        calls.push((delta.index, ToolCall::new(id, name, String::new())));
        delta.index
    }

    /// Position and name of the call at a stream index
    fn call_at(&self, index: usize) -> Option<(usize, &str)> {
        let MessageBuilder::ToolCalls(calls) = self else {
            return None;
        };
        calls
            .iter()
            .position(|(i, _)| *i == index)
            .map(|position| (position, calls[position].1.function.name.as_str()))
    }

    fn tool_call_names(&self) -> Vec<&str> {
        match self {
            MessageBuilder::Text(_) => vec![],
            MessageBuilder::ToolCalls(calls) => calls
                .iter()
                .map(|(_, call)| call.function.name.as_str())
                .collect(),
        }
    }

    fn freeze(self) -> Result<Message> {
        match self {
            MessageBuilder::Text(text) => Ok(Message::assistant(text)),
            MessageBuilder::ToolCalls(calls) => {
                let calls = calls.into_iter().map(|(_, call)| call).collect();
                Message::assistant_tool_calls(calls).ok_or_else(|| {
                    RelayError::Api(ApiError::InvalidResponse(
                        "tool call response without any tool call".to_string(),
                    ))
                })
            }
        }
    }
}

/// Assembles one streamed completion into a [`Message`]
pub struct StreamAssembler {
    chunks: ChunkStream,
    role: Role,
    kind: MessageKind,
    builder: MessageBuilder,
    /// Fragments read from the stream but not yet handed out, with their
    /// tool call index (0 for text)
    pending: VecDeque<(usize, String)>,
    finished: bool,
    interrupted: bool,
    fragment_count: usize,
    /// Stream index of the last fragment handed out
    current: Option<usize>,
}

impl std::fmt::Debug for StreamAssembler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamAssembler")
            .field("role", &self.role)
            .field("kind", &self.kind)
            .field("pending", &self.pending.len())
            .field("finished", &self.finished)
            .field("interrupted", &self.interrupted)
            .field("fragment_count", &self.fragment_count)
            .finish()
    }
}

impl StreamAssembler {
    /// Start assembling from an open chunk stream.
    ///
    /// Reads exactly one chunk to fix the message kind. Fails with
    /// [`RelayError::EmptyStream`] when the stream has no chunk at all.
    pub async fn new(mut chunks: ChunkStream) -> Result<Self> {
        let first = match chunks.next().await {
            None => return Err(RelayError::EmptyStream),
            Some(Err(error)) => return Err(error),
            Some(Ok(chunk)) => chunk,
        };

        let kind = if first.has_tool_calls() {
            MessageKind::ToolCalls
        } else {
            MessageKind::Text
        };
        let builder = match kind {
            MessageKind::Text => MessageBuilder::Text(String::new()),
            MessageKind::ToolCalls => MessageBuilder::ToolCalls(Vec::new()),
        };

        let mut assembler = Self {
            chunks,
            role: first.role.unwrap_or(Role::Assistant),
            kind,
            builder,
            pending: VecDeque::new(),
            finished: false,
            interrupted: false,
            fragment_count: 0,
            current: None,
        };
        assembler.absorb(first, true);
        Ok(assembler)
    }

    /// Kind of message being assembled
    pub fn kind(&self) -> MessageKind {
        self.kind
    }

    /// Role announced by the first chunk (assistant if none was given)
    pub fn role(&self) -> Role {
        self.role
    }

    /// Names of the tool calls seen so far
    pub fn tool_call_names(&self) -> Vec<&str> {
        self.builder.tool_call_names()
    }

    /// Position and name of the tool call the last fragment belongs to.
    ///
    /// `None` for text replies and before the first fragment.
    pub fn current_call(&self) -> Option<(usize, &str)> {
        self.builder.call_at(self.current?)
    }

    /// Whether the fragment sequence is exhausted
    pub fn is_finished(&self) -> bool {
        self.finished && self.pending.is_empty()
    }

    /// Number of fragments handed out so far
    pub fn fragment_count(&self) -> usize {
        self.fragment_count
    }

    /// Pull the next fragment.
    ///
    /// Returns `Ok(None)` once the response is complete. A transport error is
    /// returned once; the assembler yields nothing after it.
    pub async fn next_fragment(&mut self) -> Result<Option<String>> {
        loop {
            if let Some((index, fragment)) = self.pending.pop_front() {
                self.builder.append(index, &fragment);
                self.fragment_count += 1;
                self.current = Some(index);
                return Ok(Some(fragment));
            }

            if self.finished {
                return Ok(None);
            }

            match self.chunks.next().await {
                None => self.finished = true,
                Some(Err(error)) => {
                    self.finished = true;
                    self.interrupted = true;
                    return Err(error);
                }
                Some(Ok(chunk)) => self.absorb(chunk, false),
            }
        }
    }

    /// The fragment sequence as a [`Stream`]
    pub fn fragments(&mut self) -> impl Stream<Item = Result<String>> + '_ {
        async_stream::try_stream! {
            while let Some(fragment) = self.next_fragment().await? {
                yield fragment;
            }
        }
    }

    /// Drain any remaining fragments and return the assembled message.
    pub async fn finish(mut self) -> Result<Message> {
        while self.next_fragment().await?.is_some() {}

        if self.interrupted {
            return Err(RelayError::Api(ApiError::StreamError(
                "response stream was interrupted before completion".to_string(),
            )));
        }
        self.builder.freeze()
    }

    fn absorb(&mut self, chunk: StreamChunk, first: bool) {
        let done = chunk.finish_reason.is_some();

        match self.kind {
            MessageKind::Text => match chunk.content {
                Some(text) => {
                    if !text.is_empty() {
                        self.pending.push_back((0, text));
                    }
                }
                // The role chunk may carry no content yet
                None if first => {}
                None => self.finished = true,
            },
            MessageKind::ToolCalls => match chunk.tool_calls {
                Some(deltas) if !deltas.is_empty() => {
                    for delta in deltas {
                        let index = self.builder.open_call(&delta);
                        if let Some(arguments) = delta.arguments.filter(|a| !a.is_empty()) {
                            self.pending.push_back((index, arguments));
                        }
                    }
                }
                _ => self.finished = true,
            },
        }

        if done {
            self.finished = true;
        }
    }
}

/// Builders for chunks in tests
#[cfg(test)]
pub(crate) mod test_chunks {
    use super::*;

    pub fn role_text(text: &str) -> StreamChunk {
        StreamChunk::text(text).with_role(Role::Assistant)
    }

    pub fn text(text: &str) -> StreamChunk {
        StreamChunk::text(text)
    }

    pub fn tool_start(index: usize, id: &str, name: &str) -> StreamChunk {
        StreamChunk {
            role: Some(Role::Assistant),
            tool_calls: Some(vec![ToolCallDelta {
                index,
                id: Some(id.to_string()),
                name: Some(name.to_string()),
                arguments: Some(String::new()),
            }]),
            ..Default::default()
        }
    }

    pub fn tool_args(index: usize, arguments: &str) -> StreamChunk {
        StreamChunk {
            tool_calls: Some(vec![ToolCallDelta {
                index,
                arguments: Some(arguments.to_string()),
                ..Default::default()
            }]),
            ..Default::default()
        }
    }

    pub fn end(reason: &str) -> StreamChunk {
        StreamChunk::finish(reason)
    }

    pub fn stream(chunks: Vec<Result<StreamChunk>>) -> ChunkStream {
        Box::pin(futures::stream::iter(chunks))
    }

    pub fn ok_stream(chunks: Vec<StreamChunk>) -> ChunkStream {
        stream(chunks.into_iter().map(Ok).collect())
    }
}
