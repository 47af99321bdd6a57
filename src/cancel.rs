use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::{RenderError, RenderResult};

/// Cooperative cancellation flag shared between a caller and a running render.
///
/// Checked between extraction batches and between encoded frames.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    pub fn check(&self) -> RenderResult<()> {
        if self.is_cancelled() {
            Err(RenderError::Cancelled)
        } else {
            Ok(())
        }
    }
}
