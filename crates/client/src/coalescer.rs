//! Request coalescing for a single conversation.
//!
//! At most one chat request is in flight. Messages typed while it runs are
//! appended to the transcript and collected into the pending batch, which is
//! dispatched as one request once the in-flight call resolves.
//!
//! [`RequestCoalescer::flush`] supersedes the in-flight call instead: it is
//! aborted and a single request carrying its batch plus the pending one is
//! sent. Every dispatch gets a fresh generation number and only the current
//! generation may touch the transcript, so a superseded call that still
//! completes is discarded.

use std::sync::{Arc, Mutex, MutexGuard};

use lumen_core::error::StoreError;
use lumen_core::message::{Message, Transcript};
use lumen_core::wire::{ChatRequest, ChatResponse};
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::AbortHandle;
use tracing::{debug, warn};

use crate::session::ChatSession;
use crate::transport::{ChatTransport, TransportError};

#[derive(Debug, Error)]
pub enum CoalescerError {
    #[error("message is empty")]
    EmptyMessage,
}

/// The call currently allowed to resolve.
struct InFlight {
    generation: u64,
    batch: Vec<Message>,
    abort: AbortHandle,
}

struct State {
    session: ChatSession,
    pending: Vec<Message>,
    in_flight: Option<InFlight>,
    generation: u64,
}

struct Inner {
    transport: Arc<dyn ChatTransport>,
    error_reply: String,
    state: Mutex<State>,
    idle_tx: watch::Sender<bool>,
    revision_tx: watch::Sender<u64>,
}

/// Owns a [`ChatSession`] and every request sent on its behalf.
///
/// Must be used from inside a Tokio runtime; dispatch spawns a task.
pub struct RequestCoalescer {
    inner: Arc<Inner>,
}

impl RequestCoalescer {
    pub fn new(
        transport: Arc<dyn ChatTransport>,
        session: ChatSession,
        error_reply: impl Into<String>,
    ) -> Self {
        let (idle_tx, _) = watch::channel(true);
        let (revision_tx, _) = watch::channel(0);
        Self {
            inner: Arc::new(Inner {
                transport,
                error_reply: error_reply.into(),
                state: Mutex::new(State {
                    session,
                    pending: Vec::new(),
                    in_flight: None,
                    generation: 0,
                }),
                idle_tx,
                revision_tx,
            }),
        }
    }

    /// Record a user message and send it, now or with the next dispatch.
    ///
    /// Never cancels a call already in flight.
    pub fn submit(&self, text: &str) -> Result<Message, CoalescerError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(CoalescerError::EmptyMessage);
        }

        let message = Message::user(text);
        let mut state = self.inner.lock();
        self.inner.record(&mut state, message.clone());
        state.pending.push(message.clone());
        if state.in_flight.is_none() {
            self.inner.dispatch(&mut state);
        }
        self.inner.settle(&state);
        Ok(message)
    }

    /// Abort the in-flight call, if any, and send one request carrying its
    /// batch followed by every pending message.
    pub fn flush(&self) {
        let mut state = self.inner.lock();
        if let Some(superseded) = state.in_flight.take() {
            superseded.abort.abort();
            debug!(
                generation = superseded.generation,
                "Superseding in-flight chat request"
            );
            let mut batch = superseded.batch;
            batch.append(&mut state.pending);
            state.pending = batch;
        }
        self.inner.dispatch(&mut state);
        self.inner.settle(&state);
    }

    /// Abort any call, drop pending messages, and clear the session.
    pub fn clear(&self) -> Result<(), StoreError> {
        let mut state = self.inner.lock();
        if let Some(abandoned) = state.in_flight.take() {
            abandoned.abort.abort();
            debug!(generation = abandoned.generation, "Abandoned chat request on clear");
        }
        state.pending.clear();
        let result = state.session.clear();
        self.inner.revision_tx.send_modify(|revision| *revision += 1);
        self.inner.settle(&state);
        result
    }

    pub fn transcript(&self) -> Transcript {
        self.inner.lock().session.transcript().clone()
    }

    /// Messages recorded but not yet part of an in-flight request.
    pub fn pending_len(&self) -> usize {
        self.inner.lock().pending.len()
    }

    pub fn is_idle(&self) -> bool {
        *self.inner.idle_tx.borrow()
    }

    /// Resolve once no request is in flight.
    pub async fn wait_idle(&self) {
        let mut idle = self.inner.idle_tx.subscribe();
        let _ = idle.wait_for(|idle| *idle).await;
    }

    /// A receiver that changes whenever the transcript does.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.inner.revision_tx.subscribe()
    }
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn record(&self, state: &mut State, message: Message) {
        if let Err(e) = state.session.push(message) {
            warn!(error = %e, "Failed to persist chat transcript");
        }
        self.revision_tx.send_modify(|revision| *revision += 1);
    }

    /// Publish whether anything is in flight.
    fn settle(&self, state: &State) {
        self.idle_tx.send_replace(state.in_flight.is_none());
    }

    /// Send the pending batch as one request. No-op when nothing is pending.
    fn dispatch(self: &Arc<Self>, state: &mut State) {
        if state.pending.is_empty() {
            return;
        }

        let batch = std::mem::take(&mut state.pending);
        let history = state.session.transcript().without(&batch);
        let request = ChatRequest::batch(batch.iter().map(|m| m.text.clone()).collect(), history);

        state.generation += 1;
        let generation = state.generation;
        debug!(
            generation,
            batch = batch.len(),
            history = request.conversation_history.len(),
            "Dispatching chat request"
        );

        let inner = Arc::clone(self);
        let task = tokio::spawn(async move {
            let result = inner.transport.send(request).await;
            inner.resolve(generation, result);
        });

        state.in_flight = Some(InFlight {
            generation,
            batch,
            abort: task.abort_handle(),
        });
    }

    fn resolve(self: &Arc<Self>, generation: u64, result: Result<ChatResponse, TransportError>) {
        let mut state = self.lock();
        let Some(owner) = state.in_flight.take_if(|f| f.generation == generation) else {
            debug!(generation, "Discarding response from superseded chat request");
            return;
        };

        match result {
            Ok(response) => {
                self.record(&mut state, Message::assistant(response.response));
            }
            Err(TransportError::Cancelled) => {
                debug!(generation, "Chat request cancelled");
                let mut batch = owner.batch;
                batch.append(&mut state.pending);
                state.pending = batch;
                self.settle(&state);
                return;
            }
            Err(e) => {
                warn!(generation, error = %e, "Chat request failed");
                self.record(&mut state, Message::assistant_error(self.error_reply.clone()));
            }
        }

        self.dispatch(&mut state);
        self.settle(&state);
    }
}
