//! Prompt assembly: persona, retrieved research, trimmed history, new turns.
//!
//! The envelope is always laid out as:
//!
//! 1. **System** (persona + numbered research block + guidelines), exactly one
//! 2. **Conversation history**, the suffix that fits the remaining budget
//! 3. **User turns**, one segment each, never merged, never trimmed
//!
//! # Determinism
//!
//! Identical inputs always produce identical envelopes. Nothing time- or
//! randomness-dependent is used during assembly.

use lumen_config::HistoryReserve;
use lumen_core::message::Message;
use lumen_core::prompt::{PromptEnvelope, PromptSegment, Role};
use lumen_core::retrieval::RetrievedDocument;
use serde::{Deserialize, Serialize};

use crate::context::persona::{self, DEFAULT_PERSONA};
use crate::context::token::{estimate_messages_tokens, estimate_tokens};
use crate::context::trimmer::trim;

/// The assembled prompt plus what it cost.
#[derive(Debug, Clone)]
pub struct AssembledPrompt {
    pub envelope: PromptEnvelope,
    pub metadata: AssemblyMetadata,
}

/// Detailed metadata about the assembly process.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssemblyMetadata {
    /// Total estimated tokens in the envelope.
    pub total_tokens: usize,
    /// Configured token budget.
    pub budget: usize,
    /// Tokens reserved for the system segment before trimming history.
    pub reserved_tokens: usize,
    /// Per-layer statistics.
    pub per_layer: Vec<LayerStats>,
    /// Items dropped from each layer.
    pub drops: Vec<DropInfo>,
}

/// Statistics for a single prompt layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayerStats {
    pub name: String,
    pub tokens: usize,
    pub items_included: usize,
    pub items_total: usize,
}

/// Items dropped from a layer during budget enforcement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DropInfo {
    pub layer: String,
    pub items_dropped: usize,
    pub tokens_dropped: usize,
    pub reason: String,
}

/// Builds prompt envelopes. Stateless; create one and reuse it.
#[derive(Debug, Clone)]
pub struct PromptAssembler {
    persona: String,
    budget: usize,
    reserve: HistoryReserve,
}

impl PromptAssembler {
    pub fn new(budget: usize) -> Self {
        Self {
            persona: DEFAULT_PERSONA.to_string(),
            budget,
            reserve: HistoryReserve::default(),
        }
    }

    /// Replace the introductory persona paragraph.
    pub fn with_persona(mut self, persona: impl Into<String>) -> Self {
        self.persona = persona.into();
        self
    }

    pub fn with_reserve(mut self, reserve: HistoryReserve) -> Self {
        self.reserve = reserve;
        self
    }

    pub fn budget(&self) -> usize {
        self.budget
    }

    /// Assemble one envelope.
    ///
    /// # Algorithm
    ///
    /// 1. Render the system segment from the persona and `retrieved`
    /// 2. Reserve its cost (or the persona-only cost, per `HistoryReserve`)
    /// 3. Keep the suffix of `history` that fits in `budget - reserved`
    /// 4. Append one user segment per turn
    ///
    /// User turns are not charged against the budget; they are always sent.
    pub fn assemble(
        &self,
        user_turns: &[String],
        history: &[Message],
        retrieved: &[RetrievedDocument],
    ) -> AssembledPrompt {
        let system = persona::system_text(&self.persona, retrieved);
        let system_tokens = estimate_tokens(&system);

        let reserved_tokens = match self.reserve {
            HistoryReserve::FullSystem => system_tokens,
            HistoryReserve::PersonaOnly if retrieved.is_empty() => system_tokens,
            HistoryReserve::PersonaOnly => {
                estimate_tokens(&persona::system_text(&self.persona, &[]))
            }
        };

        let kept = trim(history, reserved_tokens, self.budget);
        let history_tokens = estimate_messages_tokens(kept);
        let dropped = &history[..history.len() - kept.len()];

        let user_tokens: usize = user_turns.iter().map(|t| estimate_tokens(t)).sum();

        let mut segments = Vec::with_capacity(1 + kept.len() + user_turns.len());
        segments.push(PromptSegment::new(Role::System, system));
        segments.extend(kept.iter().map(PromptSegment::from));
        segments.extend(
            user_turns
                .iter()
                .map(|turn| PromptSegment::new(Role::User, turn.clone())),
        );

        let per_layer = vec![
            LayerStats {
                name: "system".into(),
                tokens: system_tokens,
                items_included: 1 + retrieved.len(),
                items_total: 1 + retrieved.len(),
            },
            LayerStats {
                name: "conversation_history".into(),
                tokens: history_tokens,
                items_included: kept.len(),
                items_total: history.len(),
            },
            LayerStats {
                name: "user_turns".into(),
                tokens: user_tokens,
                items_included: user_turns.len(),
                items_total: user_turns.len(),
            },
        ];

        let drops = if dropped.is_empty() {
            Vec::new()
        } else {
            vec![DropInfo {
                layer: "conversation_history".into(),
                items_dropped: dropped.len(),
                tokens_dropped: estimate_messages_tokens(dropped),
                reason: "Oldest turns dropped (sliding window)".into(),
            }]
        };

        AssembledPrompt {
            envelope: PromptEnvelope::new(segments),
            metadata: AssemblyMetadata {
                total_tokens: system_tokens + history_tokens + user_tokens,
                budget: self.budget,
                reserved_tokens,
                per_layer,
                drops,
            },
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────
