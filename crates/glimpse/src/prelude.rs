//! Convenience re-exports for common `glimpse` types.
//!
//! Meant to be glob-imported when planning captures:
//!
//! ```ignore
//! use glimpse::prelude::*;
//! ```
//!
//! This pulls in the frame types, the profile registry, the planner and its
//! config, and the built-in differ and codecs. Scoring internals and the
//! individual trimmers are left out; import those from their modules.

// ── Frames ──────────────────────────────────────────────────────────
pub use crate::{Frame, FrameSelectionResult, ScoredFrame};

// ── Budgets ─────────────────────────────────────────────────────────
pub use crate::budget::{
    BudgetAllocation, BudgetValidation, ModelProfile, ProfileRegistry, TokenUtilization, allocate,
    calculate_utilization, validate,
};

// ── Context ─────────────────────────────────────────────────────────
pub use crate::context::{CaptureContext, GitContext, TerminalContext};

// ── Selection ───────────────────────────────────────────────────────
pub use crate::select::{FrameDiffer, PerceptualDiff, select_by_threshold, select_model_aware};

// ── Planning ────────────────────────────────────────────────────────
pub use crate::codec::{FrameCodec, OptimizedFrame, PassthroughCodec, ResizingCodec};
pub use crate::config::{PlannerConfig, SelectionStrategy};
pub use crate::planner::{CapturePlan, CapturePlanner};
