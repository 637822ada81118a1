use std::sync::{
    Arc, OnceLock,
    atomic::{AtomicBool, Ordering},
};

static INTERRUPT_TOKEN: OnceLock<CancelToken> = OnceLock::new();

/// Cooperative cancellation flag shared between a caller and a running
/// route computation. Clones observe the same flag.
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

    /// Process-wide token tripped by Ctrl-C. The handler is installed on
    /// first use; later calls return clones of the same token.
    pub fn interrupt() -> Self {
        INTERRUPT_TOKEN
            .get_or_init(|| {
                let token = Self::new();
                let handler_token = token.clone();
                if let Err(err) = ctrlc::set_handler(move || {
                    log::warn!("cancel: interrupt received, abandoning refinement");
                    handler_token.cancel();
                }) {
                    log::warn!("cancel: failed to install interrupt handler err={err}");
                }
                token
            })
            .clone()
    }
}
