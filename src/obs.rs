//! Observability helpers for token operations.
//!
//! # Feature Flags
//!
//! - Spans named `bearer_token_manager.op` carry the `op` and `stage` (call site) fields and are
//!   always emitted through `tracing`.
//! - Enable `metrics` to increment the `bearer_token_manager_op_total` counter for every
//!   attempt/success/failure, labeled by `op` + `outcome`.

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Token operations observed by the manager.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TokenOp {
	/// First token acquisition.
	Initialize,
	/// Single-flight refresh triggered by a stale read.
	Refresh,
	/// Unconditional refresh requested by a caller.
	ForceRefresh,
	/// Scheduler tick.
	AutoRefresh,
}
impl TokenOp {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			TokenOp::Initialize => "initialize",
			TokenOp::Refresh => "refresh",
			TokenOp::ForceRefresh => "force_refresh",
			TokenOp::AutoRefresh => "auto_refresh",
		}
	}
}
impl Display for TokenOp {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OpOutcome {
	/// Entry to a manager operation.
	Attempt,
	/// Successful completion.
	Success,
	/// Failure propagated back to the caller.
	Failure,
}
impl OpOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			OpOutcome::Attempt => "attempt",
			OpOutcome::Success => "success",
			OpOutcome::Failure => "failure",
		}
	}
}
impl Display for OpOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
