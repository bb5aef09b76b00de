//! The three local transformation pipelines and their shared run state.
//!
//! Each submodule is one linear transform with no knowledge of the others:
//!
//! ```text
//! input ──▶ qr        text / data URI ──▶ PNG          (qrcode.png)
//!       ──▶ resize    image bytes     ──▶ JPEG ≤ 1 MB  (resized-image.jpg)
//!       ──▶ document  ordered files   ──▶ PDF          (converted-document.pdf)
//! ```
//!
//! 1. [`input`]    — file selection, MIME inference, upload and content checks
//! 2. [`qr`]       — QR matrix via `qrcode`, rasterised with `image`
//! 3. [`resize`]   — downscale + JPEG recompression under a byte ceiling;
//!    runs in `spawn_blocking` because encoding large images is CPU-bound
//! 4. [`document`] — one PDF page per image or `text/plain` file, via `lopdf`
//!
//! Every pipeline reports through the same [`PipelineState`], so a failure in
//! any of them is visible to the caller in the same way.

pub mod document;
pub mod input;
pub mod qr;
pub mod resize;

use crate::error::ToolsError;
use serde::Serialize;
use tracing::debug;

/// Run state of one pipeline.
///
/// `Idle → Running → Succeeded | Failed`. A new user action re-enters
/// `Running` from either terminal state; entering it while already running is
/// refused.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(tag = "state", content = "detail", rename_all = "snake_case")]
pub enum PipelineState<T> {
    #[default]
    Idle,
    Running,
    Succeeded(T),
    Failed { reason: String },
}

impl<T> PipelineState<T> {
    /// Move to `Running`, or refuse with [`ToolsError::Busy`].
    pub fn begin(&mut self, tool: &'static str) -> Result<(), ToolsError> {
        if self.is_running() {
            return Err(ToolsError::Busy { tool });
        }
        *self = PipelineState::Running;
        Ok(())
    }

    /// Like [`begin`](Self::begin), but the returned guard puts the state
    /// back to `Idle` if it is dropped before [`RunGuard::finish`], e.g. when
    /// the caller's future is cancelled mid-await.
    pub fn start(&mut self, tool: &'static str) -> Result<RunGuard<'_, T>, ToolsError> {
        self.begin(tool)?;
        Ok(RunGuard { state: self, tool })
    }

    /// Record the outcome of a run.
    pub fn finish(&mut self, outcome: &Result<T, ToolsError>)
    where
        T: Clone,
    {
        *self = match outcome {
            Ok(value) => PipelineState::Succeeded(value.clone()),
            Err(e) => PipelineState::Failed {
                reason: e.to_string(),
            },
        };
    }

    /// Record a validation failure without passing through `Running`.
    pub fn fail(&mut self, error: &ToolsError) {
        *self = PipelineState::Failed {
            reason: error.to_string(),
        };
    }

    pub fn reset(&mut self) {
        *self = PipelineState::Idle;
    }

    pub fn is_running(&self) -> bool {
        matches!(self, PipelineState::Running)
    }

    pub fn output(&self) -> Option<&T> {
        match self {
            PipelineState::Succeeded(value) => Some(value),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            PipelineState::Failed { reason } => Some(reason),
            _ => None,
        }
    }
}

/// An in-flight run. See [`PipelineState::start`].
#[must_use = "dropping the guard resets the pipeline to Idle"]
pub struct RunGuard<'a, T> {
    state: &'a mut PipelineState<T>,
    tool: &'static str,
}

impl<T> RunGuard<'_, T> {
    pub fn finish(self, outcome: &Result<T, ToolsError>)
    where
        T: Clone,
    {
        self.state.finish(outcome);
    }
}

impl<T> Drop for RunGuard<'_, T> {
    fn drop(&mut self) {
        if self.state.is_running() {
            debug!("{} run abandoned before completion", self.tool);
            self.state.reset();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn begin_refuses_while_running() {
        let mut state: PipelineState<u32> = PipelineState::default();
        state.begin("qr").unwrap();
        assert!(state.is_running());
        assert!(matches!(state.begin("qr"), Err(ToolsError::Busy { tool: "qr" })));
    }

    #[test]
    fn terminal_states_can_restart() {
        let mut state: PipelineState<u32> = PipelineState::default();
        state.begin("resize").unwrap();
        state.finish(&Ok(7));
        assert_eq!(state.output(), Some(&7));

        state.begin("resize").unwrap();
        state.finish(&Err(ToolsError::NoSourceImage));
        assert!(state.error().unwrap().contains("No source image"));
        assert!(state.output().is_none());

        state.begin("resize").unwrap();
        assert!(state.is_running());
    }

    #[test]
    fn dropped_guard_returns_to_idle() {
        let mut state: PipelineState<u32> = PipelineState::default();
        {
            let _guard = state.start("pdf").unwrap();
        }
        assert_eq!(state, PipelineState::Idle);

        let guard = state.start("pdf").unwrap();
        guard.finish(&Ok(3));
        assert_eq!(state.output(), Some(&3));
    }

    #[test]
    fn serialises_with_tag() {
        let state: PipelineState<u32> = PipelineState::Failed {
            reason: "boom".into(),
        };
        let json = serde_json::to_string(&state).unwrap();
        assert_eq!(json, r#"{"state":"failed","detail":{"reason":"boom"}}"#);
    }
}
