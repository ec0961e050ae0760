use std::convert::Infallible;
use std::ffi::CString;
use std::io;
use std::os::fd::OwnedFd;

use nix::errno::Errno;
use nix::fcntl::{fcntl, FcntlArg, FdFlag, OFlag};
use nix::unistd::{
    self, dup, dup2_stdin, dup2_stdout, execvp, fork, pipe2, ForkResult, Pid,
};

use crate::error::ShellError;
use crate::parser::{Stage, MAX_ARGS, MAX_STAGES};

/// One spawned stage: the child pid and the stage index it came from.
/// A record is consumed exactly once, either by the foreground wait set or
/// by the background registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessRecord {
    pub pid: Pid,
    pub stage: usize,
}

/// argv converted for exec before any fork happens: a bad argument fails
/// the whole pipeline up front, and the child allocates nothing between
/// fork and execvp.
struct PreparedStage {
    argv: Vec<CString>,
    err_prefix: Vec<u8>,
}

fn prepare(stages: &[Stage]) -> Result<Vec<PreparedStage>, ShellError> {
    // The parser enforces these too; callers are not required to have gone
    // through it.
    if stages.is_empty() {
        return Err(ShellError::EmptyStage);
    }
    if stages.len() > MAX_STAGES {
        return Err(ShellError::TooManyStages(MAX_STAGES));
    }

    let mut prepared = Vec::with_capacity(stages.len());
    for stage in stages {
        if stage.argv.is_empty() {
            return Err(ShellError::EmptyStage);
        }
        if stage.argv.len() > MAX_ARGS {
            return Err(ShellError::TooManyArgs(MAX_ARGS));
        }

        let argv = stage
            .argv
            .iter()
            .map(|arg| CString::new(arg.as_str()))
            .collect::<Result<Vec<_>, _>>()?;
        let err_prefix = format!("{}: ", stage.argv[0]).into_bytes();
        prepared.push(PreparedStage { argv, err_prefix });
    }
    Ok(prepared)
}

/// Spawn every stage of a pipeline, wiring adjacent stages through pipes.
///
/// On return the parent holds none of the descriptors created here; the
/// records are ready for the reconciler. A fork failure stops spawning
/// further stages, but the records created so far are still returned so
/// they get reaped normally.
pub fn spawn_pipeline(stages: &[Stage]) -> Result<Vec<ProcessRecord>, ShellError> {
    let prepared = prepare(stages)?;
    let n = prepared.len();

    // Close-on-exec pipes: each child keeps only the ends it dup2s onto its
    // standard streams, every other copy vanishes at exec. A descriptor that
    // survived in the wrong child would keep a reader from ever seeing
    // end-of-stream.
    let mut pipes: Vec<(OwnedFd, OwnedFd)> = Vec::with_capacity(n.saturating_sub(1));
    for _ in 1..n {
        pipes.push(pipe2(OFlag::O_CLOEXEC)?);
    }

    // The last stage writes to a duplicate of the shell's stdout taken now,
    // not to whatever descriptor 1 happens to point at once the pipes have
    // been rearranged.
    let saved_stdout = dup(io::stdout())?;
    fcntl(&saved_stdout, FcntlArg::F_SETFD(FdFlag::FD_CLOEXEC))?;

    let mut records = Vec::with_capacity(n);
    for (i, stage) in prepared.iter().enumerate() {
        match unsafe { fork() } {
            Ok(ForkResult::Child) => exec_stage(i, n, stage, &pipes, &saved_stdout),
            Ok(ForkResult::Parent { child }) => {
                records.push(ProcessRecord { pid: child, stage: i });
            }
            Err(err) => {
                // Remaining stages are abandoned; the ones already spawned
                // run to completion and are reaped by the caller.
                eprintln!("psh: fork: {}", err);
                break;
            }
        }
    }

    // Every child has inherited the ends it needs. The parent never reads
    // or writes pipeline data, so its copies are closed before any wait.
    drop(pipes);
    drop(saved_stdout);

    Ok(records)
}

fn wire_and_exec(
    i: usize,
    n: usize,
    stage: &PreparedStage,
    pipes: &[(OwnedFd, OwnedFd)],
    saved_stdout: &OwnedFd,
) -> nix::Result<Infallible> {
    if i > 0 {
        dup2_stdin(&pipes[i - 1].0)?;
    }
    if i + 1 < n {
        dup2_stdout(&pipes[i].1)?;
    } else {
        dup2_stdout(saved_stdout)?;
    }
    execvp(&stage.argv[0], &stage.argv)
}

/// Child side: rewire the standard streams, then replace the process image.
/// Never returns; a failed exec exits 127 (not found) or 126 so the parent
/// observes a distinguished status through the reconciler.
fn exec_stage(
    i: usize,
    n: usize,
    stage: &PreparedStage,
    pipes: &[(OwnedFd, OwnedFd)],
    saved_stdout: &OwnedFd,
) -> ! {
    let errno = match wire_and_exec(i, n, stage, pipes, saved_stdout) {
        Ok(never) => match never {},
        Err(errno) => errno,
    };

    // Report with the prefix formatted before fork; no allocation here.
    let _ = unistd::write(io::stderr(), &stage.err_prefix);
    let _ = unistd::write(io::stderr(), errno.desc().as_bytes());
    let _ = unistd::write(io::stderr(), b"\n");

    let code = if errno == Errno::ENOENT { 127 } else { 126 };
    unsafe { libc::_exit(code) }
}
