use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::{diagnostics::ScriptResult, error::ScriptError};

/// Cooperative cancellation flag shared between a caller and the pipeline.
///
/// Checked at each suspension point; a cancelled pipeline fails with a
/// single "cancelled during <stage>" diagnostic.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    pub fn check(&self, stage: &'static str) -> Result<(), ScriptError> {
        if self.is_cancelled() {
            log::debug!("cancelled during {stage}");
            Err(ScriptError::Cancelled { stage })
        } else {
            Ok(())
        }
    }

    /// `Some(failure)` if cancelled, for early returns from stages.
    pub(crate) fn failure<T>(
        &self,
        stage: &'static str,
    ) -> Option<ScriptResult<T>> {
        self.check(stage).err().map(ScriptResult::from_error)
    }
}
