//! # shellcast
//!
//! A small library for launching external programs and multicasting their
//! output. Each spawned process gets two background reader tasks, one per
//! standard stream, and every chunk of text they read is fanned out to a
//! dynamically mutable set of listeners.
//!
//! ## Features
//!
//! - **Multicast listeners**: register any number of observers per stream,
//!   before or after launch, without pausing in-flight dispatch
//! - **Capture buffers**: stdout and stderr are always accumulated and
//!   retrievable as plain strings
//! - **Stdin support**: write into the running process through a buffered
//!   async writer
//! - **Sync or async launch**: block for the exit code, or take the child
//!   handle and manage it yourself
//!
//! ## Quick Start
//!
//! ```rust
//! use shellcast::Shell;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), shellcast::ShellError> {
//!     #[cfg(unix)]
//!     let mut shell = Shell::new("printf").arg("hello");
//!     #[cfg(windows)]
//!     let mut shell = Shell::new("cmd").args(["/C", "echo hello"]);
//!
//!     let exit_code = shell.execute().await?;
//!     assert_eq!(exit_code, 0);
//!
//!     // The reader tasks may still be draining the final chunk when the
//!     // process wait returns; give them a moment before reading the buffer.
//!     tokio::time::sleep(std::time::Duration::from_millis(200)).await;
//!     assert!(shell.has_output());
//!     Ok(())
//! }
//! ```
//!
//! ## Listening to a running process
//!
//! ```rust
//! use std::sync::Arc;
//! use shellcast::{ListenerRef, Shell};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), shellcast::ShellError> {
//!     #[cfg(unix)]
//!     let mut shell = Shell::new("printf").arg("one two");
//!     #[cfg(windows)]
//!     let mut shell = Shell::new("cmd").args(["/C", "echo one two"]);
//!
//!     // Closures are listeners. Keep the handle to remove it later.
//!     let printer: ListenerRef = Arc::new(|text: &str| print!("{text}"));
//!     shell.add_output_listener(Arc::clone(&printer));
//!
//!     let mut child = shell.spawn()?;
//!     let status = child.wait().await?;
//!     assert_eq!(status.code(), Some(0));
//!
//!     shell.remove_output_listener(&printer);
//!     Ok(())
//! }
//! ```
//!
//! ## Optional Features
//!
//! - `serde`: enable serialization support for [`CommandLine`]

pub mod command;
pub mod composite;
pub mod error;
pub mod listener;
pub mod shell;

#[cfg(test)]
mod tests;

pub use command::CommandLine;
pub use composite::ListenerNode;
pub use error::ShellError;
pub use listener::{ListenerRef, NullListener, ShellListener};
pub use shell::{Shell, ShellInput, StreamSource};
