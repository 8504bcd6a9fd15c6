//! CoCounsel context engine
//!
//! The analysis half of the engine:
//! - Context assembly over ranked search results
//! - Agent roles and their personas
//! - Concurrent multi-role orchestration with per-role fault isolation
//! - Synthesis with a pooled fallback
//! - [`AnalysisEngine`], the facade over all of it

pub mod agents;
pub mod annotate;
pub mod assembler;
pub mod engine;
pub mod orchestrator;
pub mod report;
pub mod synthesizer;

pub use agents::{AgentRole, RoleId, RoleRegistry};
pub use annotate::{annotate, Annotations, Confidence};
pub use assembler::{render_context, system_prompt_addendum, ContextAssembler, RetrievalContext};
pub use engine::{red_team_query, AnalysisEngine, AnalysisRequest};
pub use orchestrator::{AgentAnalysis, AnalysisStatus, ExecutionMode, Orchestrator};
pub use report::{AnalysisReport, AskResponse, DocumentHit, QuickAnalysis};
pub use synthesizer::{Synthesis, Synthesizer, SYNTHESIS_UNAVAILABLE};
