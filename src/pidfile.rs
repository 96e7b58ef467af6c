//! Process-singleton lock. The collector is typically run from cron every
//! few minutes; a wedged run must not be joined by a second one hammering
//! the same gateway.

use std::fs;
use std::path::{Path, PathBuf};

use crate::prelude::*;

pub struct PidFile {
    path: PathBuf,
}

impl PidFile {
    /// Takes the lock, or reports the PID already holding it. A file left
    /// behind by a dead process is replaced silently.
    pub fn acquire(path: &Path) -> Result<Self> {
        if let Some(pid) = read_live_pid(path) {
            return Err(Error::AlreadyRunning { pid });
        }

        fs::write(path, format!("{}\n", std::process::id()))?;
        debug!("wrote pidfile {}", path.display());
        Ok(Self {
            path: path.to_path_buf(),
        })
    }
}

impl Drop for PidFile {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            warn!("could not remove pidfile {}: {e}", self.path.display());
        }
    }
}

/// Returns the PID recorded in `path` if that process is still alive.
/// An unreadable or garbled file counts as stale.
fn read_live_pid(path: &Path) -> Option<u32> {
    let contents = fs::read_to_string(path).ok()?;
    let pid: u32 = contents.trim().parse().ok()?;
    if pid_is_alive(pid) {
        Some(pid)
    } else {
        None
    }
}

#[cfg(target_os = "linux")]
fn pid_is_alive(pid: u32) -> bool {
    Path::new("/proc").join(pid.to_string()).exists()
}

/// Without procfs there is no cheap liveness check; assume the recorded
/// process is still running and let the operator remove the file.
#[cfg(not(target_os = "linux"))]
fn pid_is_alive(_pid: u32) -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn acquire_writes_own_pid_and_drop_removes_it() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("piko-poll.pid");

        let lock = PidFile::acquire(&path).unwrap();
        let recorded: u32 = fs::read_to_string(&path).unwrap().trim().parse().unwrap();
        assert_eq!(recorded, std::process::id());

        drop(lock);
        assert!(!path.exists());
    }

    #[test]
    fn second_acquire_reports_already_running() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("piko-poll.pid");

        // Our own PID is definitely alive.
        let _lock = PidFile::acquire(&path).unwrap();
        match PidFile::acquire(&path) {
            Err(Error::AlreadyRunning { pid }) => assert_eq!(pid, std::process::id()),
            _ => panic!("expected AlreadyRunning"),
        }
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn stale_pidfile_is_replaced() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("piko-poll.pid");

        // PIDs wrap well below this on Linux.
        fs::write(&path, "4194399999\n").unwrap();
        let _lock = PidFile::acquire(&path).unwrap();
        let recorded: u32 = fs::read_to_string(&path).unwrap().trim().parse().unwrap();
        assert_eq!(recorded, std::process::id());
    }

    #[test]
    fn garbled_pidfile_counts_as_stale() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("piko-poll.pid");

        fs::write(&path, "not a pid\n").unwrap();
        assert!(PidFile::acquire(&path).is_ok());
    }
}
