use std::os::fd::{AsRawFd, OwnedFd};
use nix::errno::Errno;
use nix::sys::signal::{Signal, kill};
use nix::sys::wait::{WaitStatus, waitpid};
use nix::unistd::{ForkResult, Pid, fork};
use crate::executor::{ExecError, status};
use crate::io::{FdWriter, clear_cloexec};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    PipesAllocated,
    ChildrenSpawned,
    Waiting,
    Done,
    Failed,
}

/// Both ends of one pipe. Dropping it closes both descriptors.
#[derive(Debug)]
pub struct Pipe {
    pub read: OwnedFd,
    pub write: OwnedFd,
}

#[cfg(any(target_os = "linux", target_os = "android", target_os = "freebsd"))]
fn cloexec_pipe() -> nix::Result<(OwnedFd, OwnedFd)> {
    nix::unistd::pipe2(nix::fcntl::OFlag::O_CLOEXEC)
}

#[cfg(not(any(target_os = "linux", target_os = "android", target_os = "freebsd")))]
fn cloexec_pipe() -> nix::Result<(OwnedFd, OwnedFd)> {
    use nix::fcntl::{FcntlArg, FdFlag, fcntl};
    let (read, write) = nix::unistd::pipe()?;
    for fd in [&read, &write] {
        fcntl(fd.as_raw_fd(), FcntlArg::F_SETFD(FdFlag::FD_CLOEXEC))?;
    }
    Ok((read, write))
}

/// How the last stage ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Outcome {
    pub status: i32,
    pub signal: Option<Signal>,
    pub core_dumped: bool,
}

/// The processes and pipes of one pipeline while it runs.
///
/// Pipe `k` connects command `k` to command `k + 1`. The shell closes its
/// copy of a pipe as soon as both of its users have been forked. If the
/// pipeline is dropped before every child was reaped, the remaining children
/// are terminated and reaped.
#[derive(Debug)]
pub struct RunningPipeline {
    pipes: Vec<Option<Pipe>>,
    pids: Vec<Pid>,
    n: usize,
    state: PipelineState,
}

impl RunningPipeline {
    pub fn new(n: usize) -> Self {
        RunningPipeline {
            pipes: Vec::with_capacity(n.saturating_sub(1)),
            pids: Vec::with_capacity(n),
            n,
            state: PipelineState::Idle,
        }
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    pub fn pids(&self) -> &[Pid] {
        &self.pids
    }

    /// Pipes the shell still holds open.
    pub fn open_pipes(&self) -> usize {
        self.pipes.iter().flatten().count()
    }

    fn transition(&mut self, next: PipelineState) {
        tracing::debug!(from = ?self.state, to = ?next, n = self.n, "pipeline state");
        self.state = next;
    }

    fn fail(&mut self, op: &'static str, errno: Errno) -> ExecError {
        tracing::warn!(op, error = %errno, spawned = self.pids.len(), "pipeline setup failed");
        self.abort();
        ExecError::system(op)(errno)
    }

    /// Creates all `n - 1` pipes before anything is forked.
    pub fn allocate_pipes(&mut self) -> Result<(), ExecError> {
        for _ in 1..self.n {
            match cloexec_pipe() {
                Ok((read, write)) => self.pipes.push(Some(Pipe { read, write })),
                Err(e) => return Err(self.fail("pipe", e)),
            }
        }
        self.transition(PipelineState::PipesAllocated);
        Ok(())
    }

    /// Forks command `k`. The child gets its stdin/stdout wired to the
    /// neighbouring pipes, every pipe descriptor closed, and then runs
    /// `run`, exiting with the status it returns.
    pub fn spawn<F>(&mut self, k: usize, run: F) -> Result<Pid, ExecError>
    where
        F: FnOnce() -> i32,
    {
        debug_assert!(k < self.n);
        match unsafe { fork() } {
            Ok(ForkResult::Child) => {
                let code = match self.wire_child(k) {
                    Ok(()) => run(),
                    Err(_) => status::FAILURE,
                };
                // Skip destructors and atexit handlers inherited from the shell.
                unsafe { libc::_exit(code) }
            }
            Ok(ForkResult::Parent { child }) => {
                tracing::debug!(k, pid = child.as_raw(), "spawned");
                self.pids.push(child);
                // Commands k-1 and k now own pipe k-1.
                if k > 0 {
                    self.pipes[k - 1] = None;
                }
                if self.pids.len() == self.n {
                    self.pipes.clear();
                    self.transition(PipelineState::ChildrenSpawned);
                }
                Ok(child)
            }
            Err(e) => Err(self.fail("fork", e)),
        }
    }

    // Runs in the child: only raw system calls, no allocation.
    fn wire_child(&self, k: usize) -> Result<(), Errno> {
        if k > 0 {
            if let Some(pipe) = &self.pipes[k - 1] {
                dup_onto(pipe.read.as_raw_fd(), libc::STDIN_FILENO)?;
            }
        }
        if k + 1 < self.n {
            if let Some(pipe) = &self.pipes[k] {
                dup_onto(pipe.write.as_raw_fd(), libc::STDOUT_FILENO)?;
            }
        }
        for pipe in self.pipes.iter().flatten() {
            for fd in [pipe.read.as_raw_fd(), pipe.write.as_raw_fd()] {
                if fd > libc::STDERR_FILENO {
                    unsafe { libc::close(fd) };
                }
            }
        }
        Ok(())
    }

    /// Reaps every child; the outcome is the last command's.
    pub fn wait_all(&mut self) -> Outcome {
        self.pipes.clear();
        self.transition(PipelineState::Waiting);
        let mut outcome = Outcome {
            status: status::SUCCESS,
            signal: None,
            core_dumped: false,
        };
        for pid in std::mem::take(&mut self.pids) {
            outcome = wait_for(pid);
        }
        self.transition(PipelineState::Done);
        outcome
    }

    /// Terminates and reaps whatever was spawned and closes every pipe.
    pub fn abort(&mut self) {
        self.state = PipelineState::Failed;
        self.pipes.clear();
        for pid in &self.pids {
            let _ = kill(*pid, Signal::SIGTERM);
        }
        for pid in std::mem::take(&mut self.pids) {
            wait_for(pid);
        }
    }
}

impl Drop for RunningPipeline {
    fn drop(&mut self) {
        if !self.pids.is_empty() {
            self.abort();
        }
    }
}

fn dup_onto(fd: libc::c_int, target: libc::c_int) -> Result<(), Errno> {
    let result = if fd == target {
        clear_cloexec(fd)
    } else if unsafe { libc::dup2(fd, target) } < 0 {
        Err(Errno::last())
    } else {
        Ok(())
    };
    if let Err(errno) = result {
        FdWriter::stderr().report(&[b"minishell: dup2: ".as_slice(), errno.desc().as_bytes(), b"\n".as_slice()]);
        return Err(errno);
    }
    Ok(())
}

/// Blocks until `pid` terminates. Interrupted waits are retried.
fn wait_for(pid: Pid) -> Outcome {
    loop {
        match waitpid(pid, None) {
            Ok(WaitStatus::Exited(_, code)) => {
                tracing::debug!(pid = pid.as_raw(), code, "reaped");
                return Outcome {
                    status: code,
                    signal: None,
                    core_dumped: false,
                };
            }
            Ok(WaitStatus::Signaled(_, signal, core_dumped)) => {
                tracing::debug!(pid = pid.as_raw(), %signal, "reaped after signal");
                return Outcome {
                    status: status::SIGNAL_BASE + signal as i32,
                    signal: Some(signal),
                    core_dumped,
                };
            }
            Ok(_) | Err(Errno::EINTR) => continue,
            Err(e) => {
                tracing::warn!(pid = pid.as_raw(), error = %e, "waitpid failed");
                return Outcome {
                    status: status::FAILURE,
                    signal: None,
                    core_dumped: false,
                };
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocates_n_minus_one_pipes() {
        for n in 1..5 {
            let mut pipeline = RunningPipeline::new(n);
            pipeline.allocate_pipes().unwrap();
            assert_eq!(pipeline.open_pipes(), n - 1);
            assert_eq!(pipeline.state(), PipelineState::PipesAllocated);
        }
    }

    #[test]
    fn test_spawn_and_wait_reports_last_status() {
        let mut pipeline = RunningPipeline::new(3);
        pipeline.allocate_pipes().unwrap();
        pipeline.spawn(0, || 3).unwrap();
        assert_eq!(pipeline.open_pipes(), 2);
        pipeline.spawn(1, || 0).unwrap();
        assert_eq!(pipeline.open_pipes(), 1);
        pipeline.spawn(2, || 7).unwrap();
        assert_eq!(pipeline.open_pipes(), 0);
        assert_eq!(pipeline.state(), PipelineState::ChildrenSpawned);

        let outcome = pipeline.wait_all();
        assert_eq!(outcome.status, 7);
        assert_eq!(outcome.signal, None);
        assert_eq!(pipeline.state(), PipelineState::Done);
        assert!(pipeline.pids().is_empty());
    }

    #[test]
    fn test_signalled_child_reports_128_plus_signal() {
        let mut pipeline = RunningPipeline::new(1);
        pipeline.allocate_pipes().unwrap();
        pipeline
            .spawn(0, || {
                unsafe { libc::kill(libc::getpid(), libc::SIGKILL) };
                0
            })
            .unwrap();
        let outcome = pipeline.wait_all();
        assert_eq!(outcome.status, 128 + libc::SIGKILL);
        assert_eq!(outcome.signal, Some(Signal::SIGKILL));
    }

    #[test]
    fn test_dup_onto_same_descriptor_keeps_it_across_exec() {
        let (read, _write) = cloexec_pipe().unwrap();
        let fd = read.as_raw_fd();
        dup_onto(fd, fd).unwrap();
        assert_eq!(unsafe { libc::fcntl(fd, libc::F_GETFD) } & libc::FD_CLOEXEC, 0);
    }

    #[test]
    fn test_abort_reaps_spawned_children() {
        let mut pipeline = RunningPipeline::new(2);
        pipeline.allocate_pipes().unwrap();
        let pid = pipeline
            .spawn(0, || {
                unsafe { libc::pause() };
                0
            })
            .unwrap();
        pipeline.abort();
        assert_eq!(pipeline.state(), PipelineState::Failed);
        assert_eq!(pipeline.open_pipes(), 0);
        // Already reaped: no such child any more.
        assert_eq!(waitpid(pid, None), Err(Errno::ECHILD));
    }
}
