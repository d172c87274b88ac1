use std::fmt;
use std::path::Path;
use std::process::Stdio;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt, BufWriter};
use tokio::process::{Child, ChildStdin, Command};
use tokio::task::JoinHandle;
use tracing::{Instrument, debug, warn};

use crate::command::CommandLine;
use crate::composite::{self, ListenerNode};
use crate::error::ShellError;
use crate::listener::ListenerRef;

const READ_CHUNK: usize = 8192;

/// Which stream of the child a reader task drains.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamSource {
    Stdout,
    Stderr,
}

/// Atomically swappable root of a listener tree. Writers replace the whole
/// `Option`; readers clone the `Arc` out and dispatch with the lock released.
type ListenerSlot = Arc<RwLock<Option<Arc<ListenerNode>>>>;

type CaptureBuffer = Arc<Mutex<String>>;

/// Launches an external program and multicasts its output.
///
/// A `Shell` owns a command line, a listener tree per stream, and two capture
/// buffers fed by built-in listeners registered at construction. Spawning
/// starts one detached reader task per stream; the tasks re-read the listener
/// slot on every chunk, so listeners registered after launch still receive
/// the chunks that follow.
///
/// The process wait in [`execute`](Shell::execute) does not join the reader
/// tasks, so the last chunks of output can arrive in the capture buffers
/// shortly after the exit code is returned.
pub struct Shell {
    command: CommandLine,
    output: CaptureBuffer,
    error: CaptureBuffer,
    output_listeners: ListenerSlot,
    error_listeners: ListenerSlot,
    input: Option<ShellInput>,
}

impl Shell {
    /// Create a shell for the given program.
    ///
    /// The two capture listeners are registered here, before any listener the
    /// caller adds, so they always dispatch first.
    pub fn new(program: impl Into<String>) -> Self {
        let output: CaptureBuffer = Arc::default();
        let error: CaptureBuffer = Arc::default();

        let shell = Shell {
            command: CommandLine::new(program),
            output: Arc::clone(&output),
            error: Arc::clone(&error),
            output_listeners: Arc::default(),
            error_listeners: Arc::default(),
            input: None,
        };
        shell.add_output_listener(capture_into(output));
        shell.add_error_listener(capture_into(error));
        shell
    }

    /// Append a single argument to the command line.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.command.push_arg(arg);
        self
    }

    /// Append several arguments to the command line.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for arg in args {
            self.command.push_arg(arg);
        }
        self
    }

    /// The configured command line.
    pub fn command(&self) -> &CommandLine {
        &self.command
    }

    /// Register a listener for the process's standard output.
    ///
    /// May be called before or after launch; a listener added after launch
    /// receives the chunks read from then on.
    pub fn add_output_listener(&self, listener: ListenerRef) {
        add_to_slot(&self.output_listeners, listener);
    }

    /// Register a listener for the process's standard error.
    pub fn add_error_listener(&self, listener: ListenerRef) {
        add_to_slot(&self.error_listeners, listener);
    }

    /// Unregister a standard output listener by handle identity.
    pub fn remove_output_listener(&self, listener: &ListenerRef) {
        remove_from_slot(&self.output_listeners, listener);
    }

    /// Unregister a standard error listener by handle identity.
    pub fn remove_error_listener(&self, listener: &ListenerRef) {
        remove_from_slot(&self.error_listeners, listener);
    }

    /// Launch the process and return its handle without waiting.
    ///
    /// Starts the two reader tasks and retains a buffered writer over the
    /// child's stdin. Waiting for termination, and killing, are left to the
    /// caller through the returned [`Child`].
    ///
    /// # Errors
    ///
    /// [`ShellError::Io`] if the OS cannot start the process; no reader task
    /// is spawned in that case.
    pub fn spawn(&mut self) -> Result<Child, ShellError> {
        self.spawn_inner(None)
    }

    /// Like [`spawn`](Shell::spawn), with a working directory for the child.
    pub fn spawn_in(&mut self, dir: impl AsRef<Path>) -> Result<Child, ShellError> {
        self.spawn_inner(Some(dir.as_ref()))
    }

    /// Launch the process and block until it terminates.
    ///
    /// Returns the exit code, or `-1` when the OS reports no code (the child
    /// was terminated by a signal). Does not wait for the reader tasks; see
    /// the type-level note about the final chunks.
    ///
    /// # Errors
    ///
    /// [`ShellError::Io`] if the process cannot be started or waited on.
    pub async fn execute(&mut self) -> Result<i32, ShellError> {
        self.execute_inner(None).await
    }

    /// Like [`execute`](Shell::execute), with a working directory.
    pub async fn execute_in(&mut self, dir: impl AsRef<Path>) -> Result<i32, ShellError> {
        self.execute_inner(Some(dir.as_ref())).await
    }

    /// The buffered writer into the child's stdin.
    ///
    /// # Errors
    ///
    /// [`ShellError::NotStarted`] if the process has not been launched.
    pub fn input(&mut self) -> Result<&mut ShellInput, ShellError> {
        self.input.as_mut().ok_or(ShellError::NotStarted)
    }

    /// Everything captured from the child's stdout so far.
    ///
    /// This is a live snapshot: it keeps growing until the stdout reader task
    /// reaches end of stream.
    pub fn output(&self) -> String {
        read_buffer(&self.output)
    }

    /// Everything captured from the child's stderr so far.
    pub fn error_output(&self) -> String {
        read_buffer(&self.error)
    }

    /// Whether anything has been captured from stdout yet.
    pub fn has_output(&self) -> bool {
        !self
            .output
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_empty()
    }

    /// Whether anything has been captured from stderr yet.
    pub fn has_error(&self) -> bool {
        !self
            .error
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_empty()
    }

    fn spawn_inner(&mut self, dir: Option<&Path>) -> Result<Child, ShellError> {
        let mut cmd = Command::new(self.command.program());
        cmd.args(self.command.arguments())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(dir) = dir {
            cmd.current_dir(dir);
        }

        let mut child = cmd.spawn()?;
        debug!(command = %self.command, pid = ?child.id(), "spawned child process");

        // The reader handles are deliberately dropped: the tasks are detached
        // and end on their own when the stream does.
        if let Some(stdout) = child.stdout.take() {
            let _ =
                spawn_stream_reader(stdout, Arc::clone(&self.output_listeners), StreamSource::Stdout);
        }
        if let Some(stderr) = child.stderr.take() {
            let _ =
                spawn_stream_reader(stderr, Arc::clone(&self.error_listeners), StreamSource::Stderr);
        }
        if let Some(stdin) = child.stdin.take() {
            self.input = Some(ShellInput {
                inner: BufWriter::new(stdin),
            });
        }

        Ok(child)
    }

    async fn execute_inner(&mut self, dir: Option<&Path>) -> Result<i32, ShellError> {
        let mut child = self.spawn_inner(dir)?;
        let status = child.wait().await?;
        Ok(status.code().unwrap_or(-1))
    }
}

impl fmt::Display for Shell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.command.fmt(f)
    }
}

impl fmt::Debug for Shell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Shell")
            .field("command", &self.command)
            .field("started", &self.input.is_some())
            .finish_non_exhaustive()
    }
}

/// Buffered writer into the child's standard input.
///
/// Writes are buffered; call [`flush`](ShellInput::flush) to push them to the
/// child, and [`close`](ShellInput::close) to signal end of input.
#[derive(Debug)]
pub struct ShellInput {
    inner: BufWriter<ChildStdin>,
}

impl ShellInput {
    /// Buffer `text` for the child's stdin.
    pub async fn write(&mut self, text: &str) -> Result<(), ShellError> {
        self.inner.write_all(text.as_bytes()).await?;
        Ok(())
    }

    /// Buffer `text` followed by a newline.
    pub async fn write_line(&mut self, text: &str) -> Result<(), ShellError> {
        self.inner.write_all(text.as_bytes()).await?;
        self.inner.write_all(b"\n").await?;
        Ok(())
    }

    /// Flush buffered text through to the child.
    pub async fn flush(&mut self) -> Result<(), ShellError> {
        self.inner.flush().await?;
        Ok(())
    }

    /// Flush and close the child's stdin, letting it observe end of input.
    pub async fn close(&mut self) -> Result<(), ShellError> {
        self.inner.shutdown().await?;
        Ok(())
    }
}

fn capture_into(buffer: CaptureBuffer) -> ListenerRef {
    Arc::new(move |text: &str| {
        buffer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_str(text);
    })
}

fn read_buffer(buffer: &CaptureBuffer) -> String {
    buffer
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .clone()
}

fn add_to_slot(slot: &ListenerSlot, listener: ListenerRef) {
    let mut node = slot.write().unwrap_or_else(PoisonError::into_inner);
    *node = composite::add(node.take(), Some(ListenerNode::leaf(listener)));
}

fn remove_from_slot(slot: &ListenerSlot, listener: &ListenerRef) {
    let mut node = slot.write().unwrap_or_else(PoisonError::into_inner);
    *node = composite::remove(node.take(), listener);
}

fn current_node(slot: &ListenerSlot) -> Option<Arc<ListenerNode>> {
    slot.read().unwrap_or_else(PoisonError::into_inner).clone()
}

/// Spawns a detached task draining one stream of the child.
///
/// Reads fixed-size chunks until end of stream. Each chunk is decoded as
/// UTF-8 (lossily) and dispatched to the listener tree currently in the slot;
/// the slot is re-read for every chunk. A read error stops the task without
/// touching the process.
fn spawn_stream_reader<R>(mut stream: R, listeners: ListenerSlot, src: StreamSource) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(
        async move {
            let mut buf = [0u8; READ_CHUNK];
            loop {
                match stream.read(&mut buf).await {
                    Ok(0) => {
                        debug!("stream reached end of data");
                        break;
                    }
                    Ok(n) => {
                        let text = String::from_utf8_lossy(&buf[..n]);
                        if let Some(node) = current_node(&listeners) {
                            node.receive(&text);
                        }
                    }
                    Err(e) => {
                        warn!(error = %e, "error reading from child stream");
                        break;
                    }
                }
            }
            debug!("reader finished");
        }
        .instrument(tracing::debug_span!("stream_reader", stream = ?src)),
    )
}
