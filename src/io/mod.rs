use std::io::{self, Write};
use std::os::unix::io::RawFd;
use nix::errno::Errno;

/// Unbuffered writer over a raw descriptor.
///
/// Used in forked children, where the process-wide stdout/stderr handles
/// may have been locked by another thread at the time of the fork.
#[derive(Debug, Clone, Copy)]
pub struct FdWriter(pub RawFd);

impl FdWriter {
    pub fn stdout() -> Self {
        FdWriter(libc::STDOUT_FILENO)
    }

    pub fn stderr() -> Self {
        FdWriter(libc::STDERR_FILENO)
    }

    /// Best-effort write of a diagnostic.
    pub fn report(&mut self, parts: &[&[u8]]) {
        for part in parts {
            if self.write_all(part).is_err() {
                return;
            }
        }
    }
}

/// Makes `fd` survive `execve`. Needed when a close-on-exec descriptor
/// already sits on the standard stream it is meant to replace, since no
/// `dup2` happens then. Async-signal-safe.
pub fn clear_cloexec(fd: RawFd) -> Result<(), Errno> {
    if unsafe { libc::fcntl(fd, libc::F_SETFD, 0) } < 0 {
        return Err(Errno::last());
    }
    Ok(())
}

/// The reason part of an I/O error, without the `(os error N)` suffix, so
/// messages read the same as those written by children.
pub fn describe_error(err: &io::Error) -> String {
    let text = err.to_string();
    match text.find(" (os error ") {
        Some(end) => text[..end].to_string(),
        None => text,
    }
}

impl Write for FdWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = unsafe { libc::write(self.0, buf.as_ptr().cast(), buf.len()) };
        if n < 0 {
            Err(io::Error::last_os_error())
        } else {
            Ok(n as usize)
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use std::os::unix::io::AsRawFd;

    #[test]
    fn test_writes_to_descriptor() {
        let (read, write) = nix::unistd::pipe().unwrap();
        let mut writer = FdWriter(write.as_raw_fd());
        writer.report(&[b"hello ".as_slice(), b"world\n".as_slice()]);
        drop(write);
        let mut out = String::new();
        std::fs::File::from(read).read_to_string(&mut out).unwrap();
        assert_eq!(out, "hello world\n");
    }

    #[test]
    fn test_clear_cloexec() {
        let (read, _write) = nix::unistd::pipe2(nix::fcntl::OFlag::O_CLOEXEC).unwrap();
        let fd = read.as_raw_fd();
        assert_ne!(unsafe { libc::fcntl(fd, libc::F_GETFD) } & libc::FD_CLOEXEC, 0);
        clear_cloexec(fd).unwrap();
        assert_eq!(unsafe { libc::fcntl(fd, libc::F_GETFD) } & libc::FD_CLOEXEC, 0);
        assert_eq!(clear_cloexec(-1), Err(Errno::EBADF));
    }

    #[test]
    fn test_describe_error_drops_os_code() {
        let err = io::Error::from_raw_os_error(libc::ENOENT);
        assert_eq!(describe_error(&err), "No such file or directory");
        let custom = io::Error::other("boom");
        assert_eq!(describe_error(&custom), "boom");
    }
}
