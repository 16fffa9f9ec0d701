use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::foundation::error::{IvError, IvResult};

/// Shared cancellation flag polled by every blocking stage.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Token that flips on SIGINT or SIGTERM.
    pub fn from_signals() -> anyhow::Result<Self> {
        let token = Self::new();
        for sig in [signal_hook::consts::SIGINT, signal_hook::consts::SIGTERM] {
            signal_hook::flag::register(sig, Arc::clone(&token.0))
                .map_err(|e| anyhow::anyhow!("register signal {sig}: {e}"))?;
        }
        Ok(token)
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// `Err(IvError::Cancelled)` once the flag is set.
    pub fn check(&self) -> IvResult<()> {
        if self.is_cancelled() {
            Err(IvError::Cancelled)
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_state() {
        let a = CancelToken::new();
        let b = a.clone();
        assert!(b.check().is_ok());
        a.cancel();
        assert!(b.is_cancelled());
        assert!(matches!(b.check(), Err(IvError::Cancelled)));
    }
}
