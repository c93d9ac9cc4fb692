use std::ffi::CString;
use std::fs::{File, OpenOptions};
use std::io;
use std::os::unix::io::RawFd;
use nix::errno::Errno;
use crate::ast::{RedirectKind, Redirection};
use crate::executor::ExecError;
use crate::io::{FdWriter, clear_cloexec};

/// A redirection ready to be applied in a forked child without allocating.
#[derive(Debug)]
pub struct ChildRedirect {
    target_fd: RawFd,
    path: CString,
    flags: libc::c_int,
    prefix: Vec<u8>, // "minishell: <path>: "
}

impl ChildRedirect {
    pub fn prepare(redirection: &Redirection) -> Result<Self, ExecError> {
        let flags = match redirection.kind {
            RedirectKind::In => libc::O_RDONLY,
            RedirectKind::Out => libc::O_WRONLY | libc::O_CREAT | libc::O_TRUNC,
            RedirectKind::Append => libc::O_WRONLY | libc::O_CREAT | libc::O_APPEND,
            RedirectKind::Heredoc => {
                return Err(ExecError::Unsupported("here-document".to_string()));
            }
        };
        let path = CString::new(redirection.target.as_bytes())
            .map_err(|_| ExecError::InvalidArgument(redirection.target.clone()))?;
        Ok(ChildRedirect {
            target_fd: redirection.kind.target_fd(),
            path,
            flags: flags | libc::O_CLOEXEC,
            prefix: format!("minishell: {}: ", redirection.target).into_bytes(),
        })
    }

    /// Opens the target and moves it onto its standard stream. On failure
    /// the reason has already been written to stderr.
    pub fn apply(&self) -> Result<(), Errno> {
        let fd = unsafe { libc::open(self.path.as_ptr(), self.flags, 0o644 as libc::c_uint) };
        if fd < 0 {
            return Err(self.fail());
        }
        if fd == self.target_fd {
            // The stream was closed and `open` reused its number.
            return clear_cloexec(fd).map_err(|_| self.fail());
        }
        let dup = unsafe { libc::dup2(fd, self.target_fd) };
        let err = (dup < 0).then(|| self.fail());
        unsafe { libc::close(fd) };
        match err {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn fail(&self) -> Errno {
        let errno = Errno::last();
        FdWriter::stderr().report(&[self.prefix.as_slice(), errno.desc().as_bytes(), b"\n".as_slice()]);
        errno
    }
}

/// Opens a redirection target from inside the shell process.
pub fn open_in_shell(redirection: &Redirection) -> io::Result<File> {
    match redirection.kind {
        RedirectKind::In => File::open(&redirection.target),
        RedirectKind::Out => File::create(&redirection.target),
        RedirectKind::Append => OpenOptions::new()
            .append(true)
            .create(true)
            .open(&redirection.target),
        RedirectKind::Heredoc => Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "here-documents are not supported",
        )),
    }
}

/// Output file for an in-process built-in after applying every redirection
/// in order. Later output redirections replace earlier ones, but every
/// target is still opened (and truncated) like in a child.
pub fn shell_output(redirections: &[Redirection]) -> Result<Option<File>, (String, io::Error)> {
    let mut output = None;
    for redirection in redirections {
        let file = open_in_shell(redirection).map_err(|e| (redirection.target.clone(), e))?;
        if redirection.kind.target_fd() == libc::STDOUT_FILENO {
            output = Some(file);
        }
    }
    Ok(output)
}
