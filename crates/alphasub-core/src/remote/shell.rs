use super::error::RemoteError;

/// Captured result of one command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub status: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.status == 0
    }

    /// Turns a non-zero exit into [`RemoteError::CommandFailed`].
    pub fn check(self, command: &str) -> Result<Self, RemoteError> {
        if self.success() {
            Ok(self)
        } else {
            Err(RemoteError::CommandFailed {
                command: command.to_string(),
                status: self.status,
                stderr: self.stderr.trim().to_string(),
            })
        }
    }
}

/// A shell on the compute host.
///
/// Implementations run one command at a time and block until it exits. A non-zero exit
/// status is not an error at this level; callers inspect [`CommandOutput::status`].
pub trait RemoteShell: Send {
    /// Runs `command` through the host's shell and captures both output streams.
    fn exec(&self, command: &str) -> Result<CommandOutput, RemoteError>;

    /// Writes `contents` to `remote_path`, replacing any existing file.
    fn upload(&self, contents: &[u8], remote_path: &str) -> Result<(), RemoteError>;

    /// Human-readable target, used in logs.
    fn describe(&self) -> String;
}

/// Single-quotes `value` for a POSIX shell.
pub fn shell_quote(value: &str) -> String {
    let escaped = value.replace('\'', "'\\''");
    format!("'{escaped}'")
}

/// Prefixes `command` with a `cd` into `cwd`, aborting if the directory is unusable.
pub fn with_cwd(command: &str, cwd: Option<&str>) -> String {
    match cwd {
        Some(dir) => format!("cd {} && {}", shell_quote(dir), command),
        None => command.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quoting_neutralizes_metacharacters() {
        assert_eq!(shell_quote("plain"), "'plain'");
        assert_eq!(shell_quote("a b;rm -rf ~"), "'a b;rm -rf ~'");
        assert_eq!(shell_quote("it's"), "'it'\\''s'");
    }

    #[test]
    fn cwd_prefix_is_quoted() {
        assert_eq!(with_cwd("ls", None), "ls");
        assert_eq!(
            with_cwd("bash run_pred.sh", Some("/work/my job")),
            "cd '/work/my job' && bash run_pred.sh"
        );
    }

    #[test]
    fn check_keeps_successful_output() {
        let output = CommandOutput {
            status: 0,
            stdout: "ok".to_string(),
            stderr: String::new(),
        };
        assert_eq!(output.clone().check("true").unwrap(), output);
    }

    #[test]
    fn check_reports_failures_with_stderr() {
        let output = CommandOutput {
            status: 2,
            stdout: String::new(),
            stderr: "mkdir: permission denied\n".to_string(),
        };
        match output.check("mkdir -p /root/x") {
            Err(RemoteError::CommandFailed {
                command,
                status,
                stderr,
            }) => {
                assert_eq!(command, "mkdir -p /root/x");
                assert_eq!(status, 2);
                assert_eq!(stderr, "mkdir: permission denied");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
