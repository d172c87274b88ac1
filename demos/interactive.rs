//! Drives an interactive child process: mirrors its stdout to the terminal
//! through a listener while feeding it a line over stdin.
//!
//! Run with `RUST_LOG=debug cargo run --example interactive` to see the
//! reader task spans.

use std::sync::Arc;

use shellcast::{ListenerRef, Shell, ShellError};

#[tokio::main]
async fn main() -> Result<(), ShellError> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    #[cfg(unix)]
    let mut shell = Shell::new("bash").args(["-c", "read name; echo \"hello $name\""]);
    #[cfg(windows)]
    let mut shell = Shell::new("powershell")
        .args(["-Command", "$name = Read-Host; Write-Output \"hello $name\""]);

    let printer: ListenerRef = Arc::new(|text: &str| print!("{text}"));
    shell.add_output_listener(printer);

    let mut child = shell.spawn()?;

    let input = shell.input()?;
    input.write_line("world").await?;
    input.flush().await?;

    let status = child.wait().await?;
    println!("`{}` exited with {:?}", shell, status.code());
    Ok(())
}
