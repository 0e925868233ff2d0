use anyhow::Result;
use std::io::{self, Write};
use std::process;
use std::thread;

use crate::cancel::{CancelReason, Cancellation};

// Cross-platform signal handling
#[cfg(unix)]
use signal_hook::{consts::SIGINT, consts::SIGTERM, iterator::Signals};

#[cfg(windows)]
use signal_hook::{consts::SIGINT, consts::SIGTERM, flag};

/// Standard Unix exit codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    Success = 0,
    GeneralError = 1,
    InvalidUsage = 2,
    SignalInt = 130,  // 128 + SIGINT (2)
    SignalPipe = 141, // 128 + SIGPIPE (13)
    SignalTerm = 143, // 128 + SIGTERM (15)
}

impl ExitCode {
    pub fn exit(self) -> ! {
        process::exit(self as i32)
    }

    /// Exit status after a pipeline stopped for `reason`
    pub fn for_reason(reason: &CancelReason) -> Self {
        match reason {
            CancelReason::EndOfStream | CancelReason::Timeout => ExitCode::Success,
            CancelReason::Interrupted(sig) if *sig == SIGTERM => ExitCode::SignalTerm,
            CancelReason::Interrupted(_) => ExitCode::SignalInt,
            CancelReason::SourceFailed(_) => ExitCode::GeneralError,
        }
    }
}

/// Turns SIGINT/SIGTERM into a raise of the pipeline's cancellation signal
pub struct SignalHandler {
    _handle: thread::JoinHandle<()>,
}

impl SignalHandler {
    /// Initialize signal handling - cross-platform
    pub fn new(cancel: Cancellation) -> Result<Self> {
        #[cfg(unix)]
        {
            let mut signals = Signals::new([SIGINT, SIGTERM])?;

            let handle = thread::spawn(move || {
                let mut shutdown_count = 0;
                for sig in signals.forever() {
                    shutdown_count += 1;
                    if shutdown_count > 1 {
                        // Second request: stop waiting for workers
                        match sig {
                            SIGTERM => ExitCode::SignalTerm.exit(),
                            _ => ExitCode::SignalInt.exit(),
                        }
                    }
                    if sig == SIGTERM {
                        tracing::warn!("received SIGTERM, shutting down gracefully");
                    }
                    cancel.raise(CancelReason::Interrupted(sig));
                }
            });

            Ok(SignalHandler { _handle: handle })
        }

        #[cfg(windows)]
        {
            // Windows signal handling using flag-based approach
            let term_flag = std::sync::Arc::new(std::sync::atomic::AtomicBool::new(false));
            flag::register(SIGINT, std::sync::Arc::clone(&term_flag))?;

            let handle = thread::spawn(move || loop {
                thread::sleep(std::time::Duration::from_millis(100));
                if term_flag.swap(false, std::sync::atomic::Ordering::Relaxed)
                    && !cancel.raise(CancelReason::Interrupted(SIGINT))
                {
                    ExitCode::SignalInt.exit();
                }
            });

            Ok(SignalHandler { _handle: handle })
        }
    }
}

/// Safe wrapper for writing to stdout that handles broken pipes and other I/O errors
pub struct SafeStdout {
    stdout: io::Stdout,
}

impl SafeStdout {
    pub fn new() -> Self {
        Self {
            stdout: io::stdout(),
        }
    }

    pub fn flush(&mut self) -> Result<()> {
        match self.stdout.flush() {
            Ok(()) => Ok(()),
            Err(e) if is_broken_pipe(&e) => ExitCode::SignalPipe.exit(),
            Err(e) => Err(anyhow::anyhow!("Failed to flush stdout: {}", e)),
        }
    }
}

impl Default for SafeStdout {
    fn default() -> Self {
        Self::new()
    }
}

impl std::io::Write for SafeStdout {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self.stdout.write(buf) {
            Err(e) if is_broken_pipe(&e) => ExitCode::SignalPipe.exit(),
            other => other,
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        self.stdout.flush()
    }
}

/// Cross-platform broken pipe detection
fn is_broken_pipe(e: &io::Error) -> bool {
    #[cfg(unix)]
    {
        e.kind() == io::ErrorKind::BrokenPipe
    }
    #[cfg(windows)]
    {
        // On Windows, broken pipe manifests as different error codes
        e.kind() == io::ErrorKind::BrokenPipe
            || e.raw_os_error() == Some(232) // ERROR_NO_DATA "The pipe is being closed"
            || e.raw_os_error() == Some(109) // ERROR_BROKEN_PIPE "The pipe has been ended"
    }
}
