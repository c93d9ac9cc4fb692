//! Interrupt handling at the prompt, while waiting for children, and in
//! freshly forked children.

use std::sync::OnceLock;
use std::sync::atomic::{AtomicBool, Ordering};
use nix::sys::signal::{SaFlags, SigAction, SigHandler, SigSet, Signal, sigaction};

static INTERRUPTED: AtomicBool = AtomicBool::new(false);
static PROMPT: OnceLock<Vec<u8>> = OnceLock::new();

extern "C" fn on_interrupt(_signum: libc::c_int) {
    INTERRUPTED.store(true, Ordering::SeqCst);
    let prompt = PROMPT.get().map(|p| p.as_slice()).unwrap_or_default();
    unsafe {
        libc::write(libc::STDOUT_FILENO, b"\n".as_ptr().cast(), 1);
        libc::write(libc::STDOUT_FILENO, prompt.as_ptr().cast(), prompt.len());
    }
}

fn action(handler: SigHandler) -> SigAction {
    SigAction::new(handler, SaFlags::SA_RESTART, SigSet::empty())
}

/// Prompt-time behaviour of an interactive shell: Ctrl-C abandons the
/// current line and redraws the prompt, Ctrl-\ is ignored.
pub fn install_interactive_handlers(prompt: &str) -> nix::Result<()> {
    let _ = PROMPT.set(prompt.as_bytes().to_vec());
    unsafe {
        sigaction(Signal::SIGINT, &action(SigHandler::Handler(on_interrupt)))?;
        sigaction(Signal::SIGQUIT, &action(SigHandler::SigIgn))?;
    }
    Ok(())
}

/// Returns whether Ctrl-C was pressed at the prompt since the last call.
pub fn take_interrupted() -> bool {
    INTERRUPTED.swap(false, Ordering::SeqCst)
}

/// Hands interrupt and quit over to the foreground children for as long as
/// the guard lives; the previous dispositions come back on drop.
pub struct InterruptDeferral {
    saved: Vec<(Signal, SigAction)>,
}

impl InterruptDeferral {
    pub fn new() -> Self {
        let mut saved = Vec::with_capacity(2);
        for sig in [Signal::SIGINT, Signal::SIGQUIT] {
            match unsafe { sigaction(sig, &action(SigHandler::SigIgn)) } {
                Ok(previous) => saved.push((sig, previous)),
                Err(e) => tracing::warn!(signal = %sig, error = %e, "could not defer signal"),
            }
        }
        InterruptDeferral { saved }
    }
}

impl Default for InterruptDeferral {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for InterruptDeferral {
    fn drop(&mut self) {
        for (sig, previous) in self.saved.drain(..) {
            if let Err(e) = unsafe { sigaction(sig, &previous) } {
                tracing::warn!(signal = %sig, error = %e, "could not restore signal");
            }
        }
    }
}

/// Default dispositions for a child about to run a command. Ignored
/// signals survive exec, so the shell's own settings must be undone here.
/// Only async-signal-safe calls are made.
pub fn reset_for_child() {
    for sig in [Signal::SIGINT, Signal::SIGQUIT, Signal::SIGPIPE] {
        unsafe {
            let _ = sigaction(sig, &action(SigHandler::SigDfl));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_take_interrupted_clears_flag() {
        INTERRUPTED.store(true, Ordering::SeqCst);
        assert!(take_interrupted());
        assert!(!take_interrupted());
    }
}
