//! Forward termination signals to an attached runtime process.
//!
//! While a container is attached, SIGINT/SIGTERM/SIGHUP delivered to the
//! launcher are recorded by a minimal handler and re-sent to the child from
//! the wait loop, so the container is stopped instead of orphaned.

use std::io;
use std::process::{Child, ExitStatus};
use std::time::Duration;

use wait_timeout::ChildExt;

const POLL_INTERVAL: Duration = Duration::from_millis(100);

#[cfg(unix)]
mod imp {
    use std::sync::atomic::{AtomicI32, Ordering};

    use nix::libc::c_int;
    use nix::sys::signal::{kill, sigaction, SaFlags, SigAction, SigHandler, SigSet, Signal};
    use nix::unistd::Pid;
    use tracing::{debug, warn};

    pub(super) const FORWARDED: [Signal; 3] = [Signal::SIGINT, Signal::SIGTERM, Signal::SIGHUP];

    static PENDING: AtomicI32 = AtomicI32::new(0);

    extern "C" fn record(sig: c_int) {
        PENDING.store(sig, Ordering::SeqCst);
    }

    /// Restores the previous dispositions on drop.
    pub(super) struct ForwardGuard {
        previous: Vec<(Signal, SigAction)>,
    }

    impl Drop for ForwardGuard {
        fn drop(&mut self) {
            for (sig, prev) in self.previous.drain(..) {
                // SAFETY: restoring a disposition previously returned by sigaction.
                let _ = unsafe { sigaction(sig, &prev) };
            }
        }
    }

    pub(super) fn install() -> ForwardGuard {
        PENDING.store(0, Ordering::SeqCst);
        let action = SigAction::new(
            SigHandler::Handler(record),
            SaFlags::SA_RESTART,
            SigSet::empty(),
        );
        let mut previous = Vec::new();
        for sig in FORWARDED {
            // SAFETY: the handler only performs an atomic store.
            match unsafe { sigaction(sig, &action) } {
                Ok(prev) => previous.push((sig, prev)),
                Err(e) => warn!(?sig, "cannot install signal handler: {e}"),
            }
        }
        ForwardGuard { previous }
    }

    pub(super) fn forward_pending(child_pid: u32) {
        let raw = PENDING.swap(0, Ordering::SeqCst);
        if raw == 0 {
            return;
        }
        if let Ok(sig) = Signal::try_from(raw) {
            debug!(?sig, child_pid, "forwarding signal to runtime process");
            if let Err(e) = kill(Pid::from_raw(child_pid as i32), sig) {
                warn!(?sig, "failed to forward signal: {e}");
            }
        }
    }
}

/// Wait for `child`, forwarding termination signals received meanwhile.
pub fn wait_forwarding(child: &mut Child) -> io::Result<ExitStatus> {
    #[cfg(unix)]
    let _guard = imp::install();
    loop {
        if let Some(status) = child.wait_timeout(POLL_INTERVAL)? {
            return Ok(status);
        }
        #[cfg(unix)]
        imp::forward_pending(child.id());
    }
}

/// Exit code of a finished process; signal deaths map to 128 + signal number.
pub fn exit_code_of(status: &ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(sig) = status.signal() {
            return 128 + sig;
        }
    }
    1
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::process::Command;

    #[test]
    fn test_exit_codes_and_signal_deaths() {
        let st = Command::new("/bin/sh").args(["-c", "exit 7"]).status().unwrap();
        assert_eq!(exit_code_of(&st), 7);
        let st = Command::new("/bin/sh")
            .args(["-c", "kill -TERM $$"])
            .status()
            .unwrap();
        assert_eq!(exit_code_of(&st), 128 + 15);
    }

    #[test]
    fn test_wait_returns_child_status() {
        let mut child = Command::new("/bin/sh")
            .args(["-c", "sleep 0.2; exit 4"])
            .spawn()
            .unwrap();
        let st = wait_forwarding(&mut child).unwrap();
        assert_eq!(st.code(), Some(4));
    }
}
