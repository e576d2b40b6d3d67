//! Internal utilities.

use std::fs::File;
use std::io;
use std::os::fd::{AsRawFd, IntoRawFd};

/// Takes an exclusive advisory lock on `file`, blocking while another
/// process holds it.
///
/// # Errors
///
/// Returns the OS error reported by `flock(2)`.
pub fn lock_exclusive(file: &File) -> io::Result<()> {
    flock(file, libc::LOCK_EX)
}

/// Releases an advisory lock taken with [`lock_exclusive`].
///
/// # Errors
///
/// Returns the OS error reported by `flock(2)`.
pub fn unlock(file: &File) -> io::Result<()> {
    flock(file, libc::LOCK_UN)
}

fn flock(file: &File, operation: libc::c_int) -> io::Result<()> {
    loop {
        // SAFETY: the descriptor is owned by `file` and stays open for the
        // duration of the call.
        let rc = unsafe { libc::flock(file.as_raw_fd(), operation) };
        if rc == 0 {
            return Ok(());
        }
        let err = io::Error::last_os_error();
        if err.kind() != io::ErrorKind::Interrupted {
            return Err(err);
        }
    }
}

/// Closes `file`, reporting the error `close(2)` returns instead of
/// discarding it the way `Drop` does.
///
/// # Errors
///
/// Returns the OS error reported by `close(2)`.
pub fn close(file: File) -> io::Result<()> {
    let fd = file.into_raw_fd();
    // SAFETY: `into_raw_fd` transferred ownership of the descriptor to us and
    // nothing else closes it.
    if unsafe { libc::close(fd) } == 0 {
        Ok(())
    } else {
        Err(io::Error::last_os_error())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lock_and_unlock() {
        let dir = tempfile::tempdir().unwrap();
        let file = File::create(dir.path().join("locked")).unwrap();
        lock_exclusive(&file).unwrap();
        unlock(&file).unwrap();
        close(file).unwrap();
    }

    #[test]
    fn lock_is_exclusive_across_handles() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("locked");
        let first = File::create(&path).unwrap();
        let second = File::open(&path).unwrap();

        lock_exclusive(&first).unwrap();
        // SAFETY: plain flock probe on a descriptor owned by `second`.
        let rc = unsafe { libc::flock(second.as_raw_fd(), libc::LOCK_EX | libc::LOCK_NB) };
        assert_eq!(rc, -1);

        unlock(&first).unwrap();
        // SAFETY: as above.
        let rc = unsafe { libc::flock(second.as_raw_fd(), libc::LOCK_EX | libc::LOCK_NB) };
        assert_eq!(rc, 0);
    }
}
