//! OS process primitives: liveness, signals, process-group kill

use std::io;
use std::time::Duration;

/// Signals the supervisor sends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    Term,
    Kill,
}

impl Signal {
    fn as_raw(self) -> libc::c_int {
        match self {
            Signal::Term => libc::SIGTERM,
            Signal::Kill => libc::SIGKILL,
        }
    }
}

/// Check whether a process exists.
///
/// Only `ESRCH` counts as dead; `EPERM` and any other probe failure are
/// treated as alive so a transient error never reports a spurious exit.
pub fn is_process_alive(pid: u32) -> bool {
    let Ok(raw) = libc::pid_t::try_from(pid) else {
        return false;
    };
    if raw <= 0 {
        return false;
    }
    // SAFETY: signal 0 performs the existence/permission check only.
    let result = unsafe { libc::kill(raw, 0) };
    if result == 0 {
        return true;
    }
    !matches!(io::Error::last_os_error().raw_os_error(), Some(code) if code == libc::ESRCH)
}

/// Deliver `signal` to `pid`.
///
/// Returns `Ok(false)` when the process is already gone.
pub fn send_signal(pid: u32, signal: Signal) -> io::Result<bool> {
    let raw = to_pid(pid)?;
    kill_raw(raw, signal)
}

/// Deliver `signal` to the process group led by `pid`, falling back to the
/// single process when `pid` does not lead a group.
///
/// Returns `Ok(false)` when neither the group nor the process exists.
pub fn signal_process_tree(pid: u32, signal: Signal) -> io::Result<bool> {
    let raw = to_pid(pid)?;
    if kill_raw(-raw, signal)? {
        return Ok(true);
    }
    kill_raw(raw, signal)
}

pub async fn delay(duration: Duration) {
    if !duration.is_zero() {
        tokio::time::sleep(duration).await;
    }
}

fn to_pid(pid: u32) -> io::Result<libc::pid_t> {
    match libc::pid_t::try_from(pid) {
        Ok(raw) if raw > 0 => Ok(raw),
        _ => Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("invalid pid {pid}"),
        )),
    }
}

fn kill_raw(target: libc::pid_t, signal: Signal) -> io::Result<bool> {
    // SAFETY: plain kill(2); target is a validated non-zero pid or group id.
    let result = unsafe { libc::kill(target, signal.as_raw()) };
    if result == 0 {
        return Ok(true);
    }
    let err = io::Error::last_os_error();
    match err.raw_os_error() {
        Some(code) if code == libc::ESRCH => Ok(false),
        _ => Err(err),
    }
}
