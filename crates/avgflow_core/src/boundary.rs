use std::any::Any;
use std::backtrace::Backtrace;
use std::panic::{self, AssertUnwindSafe};

use tracing::error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaughtFault {
    pub message: String,
    pub backtrace: String,
}

/// Catches panics raised while rendering a subtree. Once tripped, the subtree
/// is no longer rendered and callers show a fallback until [`reset`].
///
/// Only code run inside [`render`] is covered; event handlers report failures
/// through their `Result`.
///
/// [`reset`]: ErrorBoundary::reset
/// [`render`]: ErrorBoundary::render
#[derive(Debug, Default)]
pub struct ErrorBoundary {
    fault: Option<CaughtFault>,
}

impl ErrorBoundary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `subtree` unless the boundary has already tripped. Returns `true`
    /// when the subtree rendered to completion.
    pub fn render<F: FnOnce()>(&mut self, subtree: F) -> bool {
        if self.fault.is_some() {
            return false;
        }
        match panic::catch_unwind(AssertUnwindSafe(subtree)) {
            Ok(()) => true,
            Err(payload) => {
                let fault = CaughtFault {
                    message: panic_message(payload.as_ref()),
                    backtrace: Backtrace::force_capture().to_string(),
                };
                error!(
                    reason = %fault.message,
                    backtrace = %fault.backtrace,
                    "render failed, showing fallback"
                );
                self.fault = Some(fault);
                false
            }
        }
    }

    pub fn fault(&self) -> Option<&CaughtFault> {
        self.fault.as_ref()
    }

    pub fn reset(&mut self) {
        self.fault = None;
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Routes panic reports through `tracing` with the panic-site backtrace,
/// replacing the default stderr report.
pub fn install_panic_logging() {
    panic::set_hook(Box::new(|info| {
        let location = info
            .location()
            .map(|l| format!("{}:{}", l.file(), l.line()))
            .unwrap_or_default();
        error!(
            %location,
            payload = %panic_message(info.payload()),
            backtrace = %Backtrace::force_capture(),
            "panic"
        );
    }));
}
