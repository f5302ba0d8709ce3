use std::fmt;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;

pub const AGENT_NAME: &str = "CodeAgent";

pub const AGENT_INSTRUCTIONS: &str = "\
You are a code expert specializing in writing, explaining, and modifying code.

When working with code:
1. Analyze requirements and existing code thoroughly
2. Do not implement code changes yourself
3. Delegate actual code implementation to the external CLI tool
4. Specify requirements for clean, efficient code with proper error handling
5. Request maintenance of original style when modifying existing code

You have access to run_external_tool:
- Purpose: runs the external coding CLI to execute coding tasks
- Let the external CLI do the actual coding work
- Craft prompts with clear task requirements, context, and constraints
- The CLI needs comprehensive context with each request; refine the prompt
  and retry when a result is unsatisfactory";

/// External process failed to start, or ran and exited with failure.
/// Surfaced to the agent's caller; never retried here.
#[derive(Debug)]
pub enum ToolExecutionError {
    Spawn(std::io::Error),
    Failed { code: Option<i32>, stderr: String },
}

impl fmt::Display for ToolExecutionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Spawn(err) => write!(f, "failed to start external tool: {err}"),
            Self::Failed { code, stderr } => {
                match code {
                    Some(code) => write!(f, "external tool exited with code {code}")?,
                    None => write!(f, "external tool was terminated by a signal")?,
                }
                let stderr = stderr.trim_end();
                if !stderr.is_empty() {
                    write!(f, "\n{stderr}")?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ToolExecutionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Spawn(err) => Some(err),
            Self::Failed { .. } => None,
        }
    }
}

/// How to invoke the external tool for one prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCommand {
    pub program: String,
    pub working_directory: Option<PathBuf>,
}

impl ToolCommand {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            working_directory: None,
        }
    }

    /// Argument list for one prompt. Claude-style tools run in
    /// non-interactive print mode with permission prompts suppressed; any
    /// other program gets the prompt as its only argument.
    pub fn prompt_args(&self, prompt: &str) -> Vec<String> {
        if program_is_claude(&self.program) {
            vec![
                "--dangerously-skip-permissions".to_string(),
                "-p".to_string(),
                prompt.to_string(),
            ]
        } else {
            vec![prompt.to_string()]
        }
    }

    fn command_for(&self, prompt: &str, working_directory: Option<&Path>) -> Command {
        let mut command = Command::new(&self.program);
        command.args(self.prompt_args(prompt));
        if let Some(dir) = working_directory.or(self.working_directory.as_deref()) {
            command.current_dir(dir);
        }
        command
    }
}

fn program_is_claude(program: &str) -> bool {
    let basename = Path::new(program)
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or(program)
        .to_ascii_lowercase();
    basename.contains("claude")
}

/// Declarative coding agent: a fixed name, a fixed instruction block, and
/// one capability that shells out to the configured external tool and
/// blocks until it finishes.
#[derive(Debug, Clone)]
pub struct DelegatingToolAgent {
    name: &'static str,
    instructions: &'static str,
    command: ToolCommand,
}

impl DelegatingToolAgent {
    pub fn new(command: ToolCommand) -> Self {
        Self {
            name: AGENT_NAME,
            instructions: AGENT_INSTRUCTIONS,
            command,
        }
    }

    pub fn name(&self) -> &str {
        self.name
    }

    pub fn instructions(&self) -> &str {
        self.instructions
    }

    /// Runs the external tool once and returns its full standard output.
    /// `working_directory` overrides the command's default for this call.
    pub fn run_external_tool(
        &self,
        prompt: &str,
        working_directory: Option<&Path>,
    ) -> Result<String, ToolExecutionError> {
        let output = self
            .command
            .command_for(prompt, working_directory)
            .stdin(Stdio::null())
            .output()
            .map_err(ToolExecutionError::Spawn)?;
        if !output.status.success() {
            return Err(ToolExecutionError::Failed {
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AgentEvent {
    Output(String),
    System(String),
    Completed { success: bool, code: i32 },
}

/// Runs the same invocation as the agent capability, but on a worker
/// thread with piped stdio so the UI loop never blocks. Stdout lines
/// arrive as `Output`, stderr lines as `System`, and a `Completed` always
/// follows once both streams are drained, spawn failure included.
pub struct ToolAdapter {
    pub command: ToolCommand,
    event_tx: Sender<AgentEvent>,
    event_rx: Receiver<AgentEvent>,
}

impl ToolAdapter {
    pub fn new(command: ToolCommand) -> Self {
        let (event_tx, event_rx) = mpsc::channel();
        Self {
            command,
            event_tx,
            event_rx,
        }
    }

    pub fn send_prompt(&self, prompt: String) {
        let tx = self.event_tx.clone();
        let tool = self.command.clone();
        thread::spawn(move || {
            let mut command = tool.command_for(&prompt, None);
            command
                .stdin(Stdio::null())
                .stdout(Stdio::piped())
                .stderr(Stdio::piped());
            let mut child = match command.spawn() {
                Ok(child) => child,
                Err(err) => {
                    let _ = tx.send(AgentEvent::System(format!(
                        "failed to start {}: {err}",
                        tool.program
                    )));
                    let _ = tx.send(AgentEvent::Completed {
                        success: false,
                        code: -1,
                    });
                    return;
                }
            };

            let stdout_reader = child
                .stdout
                .take()
                .map(|stdout| spawn_reader(stdout, tx.clone(), false));
            let stderr_reader = child
                .stderr
                .take()
                .map(|stderr| spawn_reader(stderr, tx.clone(), true));

            let wait_result = child.wait();
            if let Some(handle) = stdout_reader {
                let _ = handle.join();
            }
            if let Some(handle) = stderr_reader {
                let _ = handle.join();
            }
            emit_completion(&tx, wait_result);
        });
    }

    pub fn drain_events(&self) -> Vec<AgentEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.event_rx.try_recv() {
            events.push(event);
        }
        events
    }

    /// Drains at most `max_events`, leaving the rest queued for the next
    /// loop iteration.
    pub fn drain_events_limited(&self, max_events: usize) -> Vec<AgentEvent> {
        let mut events = Vec::new();
        while events.len() < max_events {
            let Ok(event) = self.event_rx.try_recv() else {
                break;
            };
            events.push(event);
        }
        events
    }
}

fn spawn_reader<R>(source: R, tx: Sender<AgentEvent>, is_stderr: bool) -> thread::JoinHandle<()>
where
    R: std::io::Read + Send + 'static,
{
    thread::spawn(move || {
        let reader = BufReader::new(source);
        for line in reader.lines().map_while(Result::ok) {
            let event = if is_stderr {
                AgentEvent::System(line)
            } else {
                AgentEvent::Output(line)
            };
            if tx.send(event).is_err() {
                break;
            }
        }
    })
}

// Completion is emitted only after both reader threads have been joined,
// so no Output/System event can trail the Completed for the same run.
fn emit_completion(tx: &Sender<AgentEvent>, wait_result: std::io::Result<ExitStatus>) {
    match wait_result {
        Ok(status) => {
            let code = status.code().unwrap_or(-1);
            if !status.success() {
                let _ = tx.send(AgentEvent::System(format!("tool exited with code {code}")));
            }
            let _ = tx.send(AgentEvent::Completed {
                success: status.success(),
                code,
            });
        }
        Err(err) => {
            let _ = tx.send(AgentEvent::System(format!("failed to wait for tool: {err}")));
            let _ = tx.send(AgentEvent::Completed {
                success: false,
                code: -1,
            });
        }
    }
}

#[cfg(test)]
#[path = "../tests/unit/agent_tests.rs"]
mod tests;
