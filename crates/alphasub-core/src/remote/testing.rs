use super::error::RemoteError;
use super::shell::{CommandOutput, RemoteShell};
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct Recorded {
    responses: Vec<(String, CommandOutput)>,
    commands: Vec<String>,
    uploads: Vec<(String, Vec<u8>)>,
}

/// In-memory shell that records every call. Clones share the same record, so a test can
/// keep one handle while a `Session` owns another.
#[derive(Clone, Default)]
pub(crate) struct RecordingShell {
    inner: Arc<Mutex<Recorded>>,
}

impl RecordingShell {
    pub fn new() -> Self {
        Self::default()
    }

    /// Commands containing `pattern` answer with `stdout` and exit 0.
    pub fn respond(self, pattern: &str, stdout: &str) -> Self {
        self.respond_with(
            pattern,
            CommandOutput {
                status: 0,
                stdout: stdout.to_string(),
                stderr: String::new(),
            },
        )
    }

    /// Commands containing `pattern` exit with `status` and print `stderr`.
    pub fn fail_on(self, pattern: &str, status: i32, stderr: &str) -> Self {
        self.respond_with(
            pattern,
            CommandOutput {
                status,
                stdout: String::new(),
                stderr: stderr.to_string(),
            },
        )
    }

    fn respond_with(self, pattern: &str, output: CommandOutput) -> Self {
        self.inner
            .lock()
            .unwrap()
            .responses
            .push((pattern.to_string(), output));
        self
    }

    pub fn commands(&self) -> Vec<String> {
        self.inner.lock().unwrap().commands.clone()
    }

    pub fn uploaded_paths(&self) -> Vec<String> {
        self.inner
            .lock()
            .unwrap()
            .uploads
            .iter()
            .map(|(path, _)| path.clone())
            .collect()
    }

    pub fn uploaded_text(&self, path: &str) -> Option<String> {
        self.inner
            .lock()
            .unwrap()
            .uploads
            .iter()
            .find(|(p, _)| p == path)
            .map(|(_, bytes)| String::from_utf8_lossy(bytes).to_string())
    }
}

impl RemoteShell for RecordingShell {
    fn exec(&self, command: &str) -> Result<CommandOutput, RemoteError> {
        let mut recorded = self.inner.lock().unwrap();
        recorded.commands.push(command.to_string());
        Ok(recorded
            .responses
            .iter()
            .find(|(pattern, _)| command.contains(pattern.as_str()))
            .map(|(_, output)| output.clone())
            .unwrap_or_default())
    }

    fn upload(&self, contents: &[u8], remote_path: &str) -> Result<(), RemoteError> {
        self.inner
            .lock()
            .unwrap()
            .uploads
            .push((remote_path.to_string(), contents.to_vec()));
        Ok(())
    }

    fn describe(&self) -> String {
        "recording".to_string()
    }
}
