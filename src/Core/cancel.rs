use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::info;

struct Inner {
    cancelled: AtomicBool,
    parent: Option<Arc<Inner>>,
}

impl Inner {
    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
            || self.parent.as_ref().is_some_and(|p| p.is_cancelled())
    }
}

/// Cooperative stop flag shared between the orchestrator and the loops that poll it.
///
/// Cloning yields another handle to the same flag. A token made with
/// [`CancellationToken::child`] also reports cancelled once its parent is,
/// but cancelling the child leaves the parent untouched.
#[derive(Clone)]
pub struct CancellationToken {
    inner: Arc<Inner>,
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

impl CancellationToken {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                cancelled: AtomicBool::new(false),
                parent: None,
            }),
        }
    }

    pub fn child(&self) -> Self {
        Self {
            inner: Arc::new(Inner {
                cancelled: AtomicBool::new(false),
                parent: Some(Arc::clone(&self.inner)),
            }),
        }
    }

    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.is_cancelled()
    }
}

impl std::fmt::Debug for CancellationToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancellationToken")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

/// Route Ctrl+C to `token`.
///
/// Belongs to the binary's startup path; the ring and the worker loops only
/// ever read the token.
pub fn install_interrupt_handler(token: &CancellationToken) -> crate::Result<()> {
    let token = token.clone();
    ctrlc::set_handler(move || {
        info!("interrupt received, stopping capture");
        token.cancel();
    })?;
    Ok(())
}
