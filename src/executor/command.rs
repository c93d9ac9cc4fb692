use std::ffi::CString;
use std::os::unix::ffi::OsStrExt;
use std::path::Path;
use nix::errno::Errno;
use crate::ast::Command;
use crate::executor::redirect::ChildRedirect;
use crate::executor::{ExecError, status};
use crate::io::FdWriter;

fn c_string(s: &[u8]) -> Result<CString, ExecError> {
    CString::new(s).map_err(|_| ExecError::InvalidArgument(String::from_utf8_lossy(s).into_owned()))
}

/// Program image for `execve`, with the NUL-terminated pointer arrays
/// built up front so the child only has to make the call.
#[derive(Debug)]
pub struct ExecImage {
    path: CString,
    _argv: Vec<CString>,
    _envp: Vec<CString>,
    argv_ptrs: Vec<*const libc::c_char>,
    envp_ptrs: Vec<*const libc::c_char>,
    prefix: Vec<u8>,
}

fn null_terminated(strings: &[CString]) -> Vec<*const libc::c_char> {
    strings
        .iter()
        .map(|s| s.as_ptr())
        .chain(std::iter::once(std::ptr::null()))
        .collect()
}

impl ExecImage {
    pub fn new(path: &Path, argv: &[String], envp: &[String]) -> Result<Self, ExecError> {
        let path_c = c_string(path.as_os_str().as_bytes())?;
        let argv_c = argv
            .iter()
            .map(|a| c_string(a.as_bytes()))
            .collect::<Result<Vec<_>, _>>()?;
        let envp_c = envp
            .iter()
            .map(|e| c_string(e.as_bytes()))
            .collect::<Result<Vec<_>, _>>()?;
        // The pointers stay valid when the image moves: they point into the
        // CStrings' heap buffers, not into this struct.
        let argv_ptrs = null_terminated(&argv_c);
        let envp_ptrs = null_terminated(&envp_c);
        let name = argv.first().map_or("", |s| s.as_str());
        Ok(ExecImage {
            path: path_c,
            _argv: argv_c,
            _envp: envp_c,
            argv_ptrs,
            envp_ptrs,
            prefix: format!("minishell: {}: ", name).into_bytes(),
        })
    }

    /// Replaces the current process. Only returns on failure, with the exit
    /// status the child should report.
    pub fn exec(&self) -> i32 {
        unsafe {
            libc::execve(self.path.as_ptr(), self.argv_ptrs.as_ptr(), self.envp_ptrs.as_ptr());
        }
        let errno = Errno::last();
        FdWriter::stderr().report(&[self.prefix.as_slice(), errno.desc().as_bytes(), b"\n".as_slice()]);
        match errno {
            Errno::ENOENT | Errno::ENOTDIR => status::NOT_FOUND,
            _ => status::NOT_EXECUTABLE,
        }
    }
}

#[derive(Debug)]
pub enum Program {
    /// Redirections only.
    Empty,
    Builtin,
    External(ExecImage),
    /// Could not be resolved; the child prints `message` and exits.
    Unavailable { message: Vec<u8>, status: i32 },
}

/// Everything a child needs, computed before anything is forked.
#[derive(Debug)]
pub struct PreparedCommand<'a> {
    pub command: &'a Command,
    pub redirects: Vec<ChildRedirect>,
    pub program: Program,
}

impl<'a> PreparedCommand<'a> {
    pub fn new(command: &'a Command, program: Program) -> Result<Self, ExecError> {
        let redirects = command
            .redirections
            .iter()
            .map(ChildRedirect::prepare)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(PreparedCommand {
            command,
            redirects,
            program,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::CStr;

    #[test]
    fn test_exec_image_arrays_are_null_terminated() {
        let argv = vec!["ls".to_string(), "-l".to_string()];
        let envp = vec!["A=1".to_string()];
        let image = ExecImage::new(Path::new("/bin/ls"), &argv, &envp).unwrap();
        assert_eq!(image.argv_ptrs.len(), 3);
        assert!(image.argv_ptrs[2].is_null());
        assert_eq!(image.envp_ptrs.len(), 2);
        assert!(image.envp_ptrs[1].is_null());
        let first = unsafe { CStr::from_ptr(image.argv_ptrs[1]) };
        assert_eq!(first.to_str().unwrap(), "-l");
    }

    #[test]
    fn test_exec_image_rejects_nul_bytes() {
        let argv = vec!["echo".to_string(), "a\0b".to_string()];
        let err = ExecImage::new(Path::new("/bin/echo"), &argv, &[]).unwrap_err();
        assert!(matches!(err, ExecError::InvalidArgument(_)));
    }
}
