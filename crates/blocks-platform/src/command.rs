use crate::error::{Error, Result};
use std::ffi::OsStr;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command as StdCommand, Output, Stdio};

/// Looks `program` up on `PATH`.
pub fn locate(program: &str) -> Option<PathBuf> {
    which::which(program).ok()
}

/// Builder over [`std::process::Command`] that remembers the program name for
/// error reporting and can feed a byte buffer to the child's stdin.
#[derive(Debug)]
pub struct Command {
    inner: StdCommand,
    program: String,
    input: Option<Vec<u8>>,
}

impl Command {
    /// Builds a command for an already located executable.
    pub fn at(executable: impl AsRef<Path>) -> Self {
        let executable = executable.as_ref();
        Self {
            inner: StdCommand::new(executable),
            program: executable.display().to_string(),
            input: None,
        }
    }

    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.inner.arg(arg);
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.inner.args(args);
        self
    }

    pub fn current_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.inner.current_dir(dir);
        self
    }

    /// Bytes written to the child's stdin once it starts.
    pub fn stdin_bytes(mut self, input: impl Into<Vec<u8>>) -> Self {
        self.input = Some(input.into());
        self
    }

    /// Runs the command to completion and collects stdout and stderr.
    ///
    /// A non-zero exit status is not an error here; callers inspect
    /// `Output::status` themselves.
    pub fn output(mut self) -> Result<Output> {
        let program = self.program.clone();
        let failed = |source| Error::CommandFailed {
            cmd: program.clone(),
            source,
        };

        let Some(input) = self.input.take() else {
            return self.inner.stdin(Stdio::null()).output().map_err(failed);
        };

        let mut child = self
            .inner
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(failed)?;

        let writer = child.stdin.take().map(|mut stdin| {
            std::thread::spawn(move || -> std::io::Result<()> {
                stdin.write_all(&input)?;
                stdin.flush()
            })
        });

        let output = child.wait_with_output().map_err(failed)?;
        if let Some(writer) = writer {
            match writer.join() {
                Ok(Ok(())) => {}
                // The child may exit before draining stdin.
                Ok(Err(e)) if e.kind() == std::io::ErrorKind::BrokenPipe => {}
                Ok(Err(e)) => return Err(failed(e)),
                Err(_) => {
                    return Err(failed(std::io::Error::other("stdin writer panicked")));
                }
            }
        }
        tracing::trace!(cmd = %self.program, status = ?output.status, "command finished");
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn echo() -> Command {
        Command::at("echo")
    }

    #[test]
    fn test_command_at_keeps_program_name() {
        assert_eq!(Command::at("/usr/bin/zip").program, "/usr/bin/zip");
    }

    #[test]
    fn test_command_args() {
        let cmd = echo().arg("hello").args(["a", "b"]);
        let args: Vec<_> = cmd.inner.get_args().collect();
        assert_eq!(args, ["hello", "a", "b"]);
    }

    #[test]
    fn test_command_arg_empty() {
        let cmd = echo().arg("");
        assert_eq!(cmd.inner.get_args().count(), 1);
    }

    #[test]
    fn test_command_current_dir() {
        let cmd = Command::at("ls").current_dir("/tmp");
        assert_eq!(cmd.inner.get_current_dir(), Some(Path::new("/tmp")));
    }

    #[test]
    fn test_locate_missing_program() {
        assert!(locate("blocks_nonexistent_binary_12345").is_none());
    }

    #[test]
    fn test_output_of_missing_program_is_error() {
        let err = Command::at("blocks_nonexistent_binary_12345")
            .output()
            .unwrap_err();
        assert!(matches!(err, Error::CommandFailed { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn test_stdin_is_forwarded() {
        let Some(cat) = locate("cat") else {
            return;
        };
        let out = Command::at(cat).stdin_bytes("a\nb\n").output().unwrap();
        assert!(out.status.success());
        assert_eq!(out.stdout, b"a\nb\n");
    }

    #[cfg(unix)]
    #[test]
    fn test_non_zero_exit_is_not_an_error() {
        let Some(program) = locate("false") else {
            return;
        };
        let out = Command::at(program).output().unwrap();
        assert!(!out.status.success());
    }
}
