//! Detached assistant: `flightdeck sim --detach` and `flightdeck stop`.
//!
//! The parent re-runs this binary as a hidden worker with output redirected
//! to the log file and records the child's PID. `stop` terminates that PID.

use std::fs::OpenOptions;
use std::path::Path;
use std::process::{Command, Stdio};
use tracing::{debug, warn};

use super::sim::SimArgs;
use super::{CommandResult, load_config};

/// PID recorded in `path`, if the file exists and holds a number.
pub fn read_pid(path: &Path) -> Option<u32> {
    std::fs::read_to_string(path).ok()?.trim().parse().ok()
}

pub fn write_pid(path: &Path, pid: u32) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, format!("{pid}\n"))
}

/// Remove the PID file only if it still names `pid`.
pub fn release_pid_file(path: &Path, pid: u32) {
    if read_pid(path) == Some(pid) {
        if let Err(e) = std::fs::remove_file(path) {
            warn!(path = %path.display(), error = %e, "Failed to remove PID file");
        }
    }
}

/// PID of a worker that is still alive. A PID file left by a crashed
/// worker is removed.
pub fn live_pid(path: &Path) -> Option<u32> {
    let pid = read_pid(path)?;
    if is_running(pid) {
        return Some(pid);
    }
    warn!(pid, path = %path.display(), "Removing stale PID file");
    release_pid_file(path, pid);
    None
}

pub fn detach(args: &SimArgs) -> CommandResult {
    let config = load_config()?;
    let pid_path = config.daemon.pid_path();
    let log_path = config.daemon.log_path();

    if let Some(pid) = live_pid(&pid_path) {
        return Err(format!(
            "An assistant is already running (PID {pid}). Run `flightdeck stop` first."
        )
        .into());
    }

    if let Some(parent) = log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let log = OpenOptions::new().create(true).append(true).open(&log_path)?;

    let exe = std::env::current_exe()?;
    let child = Command::new(exe)
        .args(args.worker_args())
        .stdin(Stdio::null())
        .stdout(log.try_clone()?)
        .stderr(log)
        .spawn()?;

    write_pid(&pid_path, child.id())?;
    debug!(pid = child.id(), "Spawned assistant worker");

    println!("✅ Assistant running in the background (PID {})", child.id());
    println!("   Log:  {}", log_path.display());
    println!("   Stop: flightdeck stop");
    Ok(())
}

pub fn stop() -> CommandResult {
    let config = load_config()?;
    let pid_path = config.daemon.pid_path();

    let Some(pid) = read_pid(&pid_path) else {
        println!("ℹ️  No background assistant is running.");
        return Ok(());
    };

    match terminate(pid) {
        Ok(()) => println!("🛑 Stopped background assistant (PID {pid})."),
        Err(e) => println!("⚠️  Could not signal PID {pid} ({e}); removing stale PID file."),
    }
    release_pid_file(&pid_path, pid);
    Ok(())
}

#[cfg(unix)]
fn is_running(pid: u32) -> bool {
    Command::new("kill")
        .args(["-0", &pid.to_string()])
        .stderr(Stdio::null())
        .status()
        .is_ok_and(|s| s.success())
}

#[cfg(windows)]
fn is_running(pid: u32) -> bool {
    Command::new("tasklist")
        .args(["/FI", &format!("PID eq {pid}"), "/NH"])
        .stderr(Stdio::null())
        .output()
        .is_ok_and(|out| String::from_utf8_lossy(&out.stdout).contains(&pid.to_string()))
}

#[cfg(unix)]
fn terminate(pid: u32) -> Result<(), String> {
    let status = Command::new("kill")
        .arg(pid.to_string())
        .stderr(Stdio::null())
        .status()
        .map_err(|e| e.to_string())?;
    if status.success() {
        Ok(())
    } else {
        Err("process not found".into())
    }
}

#[cfg(windows)]
fn terminate(pid: u32) -> Result<(), String> {
    let status = Command::new("taskkill")
        .args(["/PID", &pid.to_string(), "/F"])
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map_err(|e| e.to_string())?;
    if status.success() {
        Ok(())
    } else {
        Err("process not found".into())
    }
}
