//! Subprocess plumbing for builders.

use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::sync::Arc;

use indexmap::IndexMap;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWriteExt, BufReader};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tokio::time::{timeout, Duration};

use crate::builder::Builder;
use crate::error::{BuilderError, Result};

/// A program invocation: argv, extra environment and working directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildCommand {
    pub program: String,
    pub args: Vec<String>,
    pub env: IndexMap<String, String>,
    pub cwd: PathBuf,
}

impl BuildCommand {
    pub fn new(program: impl Into<String>, cwd: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env: IndexMap::new(),
            cwd: cwd.into(),
        }
    }

    /// Build from a full argv (program first).
    pub fn from_argv(argv: &[String], cwd: impl Into<PathBuf>) -> Option<Self> {
        let (program, args) = argv.split_first()?;
        Some(Self::new(program.clone(), cwd).args(args.iter().cloned()))
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Shell-like rendering for logs.
    pub fn display(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .envs(&self.env)
            .current_dir(&self.cwd)
            .kill_on_drop(true);
        cmd
    }

    fn spawn_piped(&self, stdin: Stdio) -> Result<Child> {
        tracing::debug!("running {}", self.display());
        self.command()
            .stdin(stdin)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| BuilderError::spawn_failed(&self.program, e))
    }

    /// Run to completion, echoing output with `prefix`.
    pub async fn run(&self, prefix: &str) -> Result<()> {
        let mut child = self.spawn_piped(Stdio::null())?;
        let readers = echo_output(&mut child, prefix, None);

        let status = child
            .wait()
            .await
            .map_err(|e| BuilderError::spawn_failed(&self.program, e))?;
        for reader in readers {
            let _ = reader.await;
        }

        check_status(&self.program, status, None)
    }

    /// Feed `input` on stdin and collect stdout.
    pub async fn pipe(&self, input: &str, timeout_secs: u64) -> Result<Vec<u8>> {
        let mut child = self.spawn_piped(Stdio::piped())?;

        let mut stdin = child.stdin.take().ok_or_else(|| {
            BuilderError::spawn_failed(
                &self.program,
                std::io::Error::new(std::io::ErrorKind::BrokenPipe, "failed to capture stdin"),
            )
        })?;
        stdin
            .write_all(input.as_bytes())
            .await
            .map_err(|e| BuilderError::spawn_failed(&self.program, e))?;
        drop(stdin);

        let output = timeout(Duration::from_secs(timeout_secs), child.wait_with_output())
            .await
            .map_err(|_| BuilderError::timeout(&self.program, timeout_secs))?
            .map_err(|e| BuilderError::spawn_failed(&self.program, e))?;

        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
        check_status(&self.program, output.status, Some(stderr))?;
        Ok(output.stdout)
    }
}

fn check_status(program: &str, status: ExitStatus, stderr: Option<String>) -> Result<()> {
    if status.success() {
        Ok(())
    } else {
        Err(BuilderError::exit_error(
            program,
            status.code().unwrap_or(-1),
            stderr,
        ))
    }
}

fn echo_output(
    child: &mut Child,
    prefix: &str,
    builder: Option<Arc<dyn Builder>>,
) -> Vec<JoinHandle<()>> {
    let mut readers = Vec::new();
    if let Some(stdout) = child.stdout.take() {
        readers.push(spawn_reader(stdout, prefix.to_string(), builder.clone()));
    }
    if let Some(stderr) = child.stderr.take() {
        readers.push(spawn_reader(stderr, prefix.to_string(), builder));
    }
    readers
}

fn spawn_reader<R>(reader: R, prefix: String, builder: Option<Arc<dyn Builder>>) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut lines = BufReader::new(reader).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            tracing::info!("{} {}", prefix, line);

            let Some(builder) = &builder else {
                continue;
            };
            if builder.matchline().is_some_and(|re| re.is_match(&line)) {
                if let Err(e) = builder.on_dev_output().await {
                    tracing::warn!("{} {}", prefix, e);
                }
            }
        }
    })
}

/// A running dev worker.
#[derive(Debug)]
pub struct Worker {
    name: &'static str,
    program: String,
    child: Child,
    readers: Vec<JoinHandle<()>>,
}

/// Start a builder's dev command, echoing its output and calling back on matching lines.
pub fn spawn_worker(builder: Arc<dyn Builder>, command: &BuildCommand) -> Result<Worker> {
    let mut child = command.spawn_piped(Stdio::null())?;
    let readers = echo_output(&mut child, builder.prefix(), Some(Arc::clone(&builder)));

    tracing::debug!("{} worker started (pid {:?})", builder.name(), child.id());

    Ok(Worker {
        name: builder.name(),
        program: command.program.clone(),
        child,
        readers,
    })
}

impl Worker {
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Wait for the process and its output to finish.
    pub async fn wait(&mut self) -> Result<()> {
        let status = self
            .child
            .wait()
            .await
            .map_err(|e| BuilderError::spawn_failed(&self.program, e))?;
        for reader in self.readers.drain(..) {
            let _ = reader.await;
        }
        check_status(&self.program, status, None)
    }

    /// Kill the process.
    pub async fn terminate(&mut self) {
        if let Err(e) = self.child.kill().await {
            tracing::debug!("{} worker already stopped: {}", self.name, e);
        }
        for reader in self.readers.drain(..) {
            reader.abort();
        }
    }
}
