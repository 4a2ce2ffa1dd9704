//! Prompt context pipeline.
//!
//! | Layer | Source | Trim Strategy |
//! |-------|--------|---------------|
//! | 1. System | Persona + retrieved research | Never trimmed |
//! | 2. Conversation History | Prior transcript | Oldest turns dropped, hard stop |
//! | 3. User Turns | Pending batch | Never trimmed |

pub mod assembler;
pub mod persona;
pub mod token;
pub mod trimmer;

pub use assembler::{AssembledPrompt, AssemblyMetadata, DropInfo, LayerStats, PromptAssembler};
pub use token::estimate_tokens;
pub use trimmer::trim;
