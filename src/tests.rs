use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::time::sleep;

use crate::error::ShellError;
use crate::listener::ListenerRef;
use crate::shell::Shell;

/// The reader tasks are not joined by the process wait, so tests poll the
/// observable state instead of asserting it immediately.
async fn eventually(mut cond: impl FnMut() -> bool) -> bool {
    for _ in 0..300 {
        if cond() {
            return true;
        }
        sleep(Duration::from_millis(10)).await;
    }
    false
}

fn recording_listener() -> (ListenerRef, Arc<Mutex<String>>) {
    let seen: Arc<Mutex<String>> = Arc::default();
    let listener: ListenerRef = {
        let seen = Arc::clone(&seen);
        Arc::new(move |text: &str| seen.lock().unwrap().push_str(text))
    };
    (listener, seen)
}

#[tokio::test]
async fn execute_captures_stdout() {
    #[cfg(unix)]
    let mut shell = Shell::new("bash").args(["-c", "printf hello"]);
    #[cfg(windows)]
    let mut shell = Shell::new("powershell").args(["-Command", "Write-Host -NoNewline hello"]);

    let exit_code = shell.execute().await.unwrap();
    assert_eq!(exit_code, 0);

    assert!(eventually(|| shell.has_output()).await);
    assert_eq!(shell.output(), "hello");
    assert!(!shell.has_error());
}

#[tokio::test]
async fn execute_captures_stderr() {
    #[cfg(unix)]
    let mut shell = Shell::new("bash").args(["-c", "printf oops 1>&2"]);
    #[cfg(windows)]
    let mut shell = Shell::new("powershell").args(["-Command", "[Console]::Error.Write('oops')"]);

    let exit_code = shell.execute().await.unwrap();
    assert_eq!(exit_code, 0);

    assert!(eventually(|| shell.has_error()).await);
    assert_eq!(shell.error_output(), "oops");
    assert!(!shell.has_output());
}

#[tokio::test]
async fn execute_reports_nonzero_exit_code() {
    #[cfg(unix)]
    let mut shell = Shell::new("bash").args(["-c", "exit 3"]);
    #[cfg(windows)]
    let mut shell = Shell::new("cmd").args(["/C", "exit 3"]);

    let exit_code = shell.execute().await.unwrap();
    assert_eq!(exit_code, 3);
}

#[tokio::test]
async fn spawn_of_nonexistent_program_fails_before_any_handle() {
    let mut shell = Shell::new("shellcast_no_such_program_xyz");
    assert!(matches!(shell.spawn(), Err(ShellError::Io(_))));
    // Launch failed, so the input writer was never installed.
    assert!(matches!(shell.input(), Err(ShellError::NotStarted)));
}

#[tokio::test]
async fn listener_added_after_spawn_receives_later_chunks() {
    #[cfg(unix)]
    let mut shell = Shell::new("bash").args(["-c", "sleep 0.5; printf late"]);
    #[cfg(windows)]
    let mut shell = Shell::new("powershell")
        .args(["-Command", "Start-Sleep -Milliseconds 500; Write-Host -NoNewline late"]);

    let mut child = shell.spawn().unwrap();

    let (listener, seen) = recording_listener();
    shell.add_output_listener(listener);

    let status = child.wait().await.unwrap();
    assert_eq!(status.code(), Some(0));
    assert!(eventually(|| seen.lock().unwrap().contains("late")).await);
}

#[tokio::test]
async fn removed_listener_sees_nothing_while_capture_still_works() {
    #[cfg(unix)]
    let mut shell = Shell::new("bash").args(["-c", "printf hello"]);
    #[cfg(windows)]
    let mut shell = Shell::new("powershell").args(["-Command", "Write-Host -NoNewline hello"]);

    let (listener, seen) = recording_listener();
    shell.add_output_listener(Arc::clone(&listener));
    shell.remove_output_listener(&listener);

    let exit_code = shell.execute().await.unwrap();
    assert_eq!(exit_code, 0);

    assert!(eventually(|| shell.has_output()).await);
    assert!(seen.lock().unwrap().is_empty());
}

#[tokio::test]
async fn output_listeners_do_not_observe_stderr() {
    #[cfg(unix)]
    let mut shell = Shell::new("bash").args(["-c", "printf out; printf err 1>&2"]);
    #[cfg(windows)]
    let mut shell = Shell::new("powershell")
        .args(["-Command", "Write-Host -NoNewline out; [Console]::Error.Write('err')"]);

    let (listener, seen) = recording_listener();
    shell.add_output_listener(listener);

    let exit_code = shell.execute().await.unwrap();
    assert_eq!(exit_code, 0);

    assert!(eventually(|| shell.has_output() && shell.has_error()).await);
    assert!(eventually(|| seen.lock().unwrap().contains("out")).await);
    assert!(!seen.lock().unwrap().contains("err"));
}

#[tokio::test]
async fn input_writer_reaches_child_stdin() {
    #[cfg(unix)]
    let mut shell = Shell::new("bash").args(["-c", "read line; printf '%s' \"$line\""]);
    #[cfg(windows)]
    let mut shell = Shell::new("powershell")
        .args(["-Command", "$line = Read-Host; Write-Host -NoNewline $line"]);

    let mut child = shell.spawn().unwrap();

    let input = shell.input().unwrap();
    input.write_line("ping").await.unwrap();
    input.flush().await.unwrap();

    let status = child.wait().await.unwrap();
    assert_eq!(status.code(), Some(0));
    assert!(eventually(|| shell.output() == "ping").await);
}

#[tokio::test]
async fn closing_input_signals_end_of_stream() {
    // `cat` only exits once its stdin is closed.
    #[cfg(unix)]
    let mut shell = Shell::new("cat");
    #[cfg(windows)]
    let mut shell = Shell::new("cmd").args(["/C", "findstr x*"]);

    let mut child = shell.spawn().unwrap();

    let input = shell.input().unwrap();
    input.write("pong").await.unwrap();
    input.close().await.unwrap();

    let status = child.wait().await.unwrap();
    assert_eq!(status.code(), Some(0));
    assert!(eventually(|| shell.output() == "pong").await);
}

#[cfg(unix)]
#[tokio::test]
async fn signal_terminated_child_reports_sentinel_exit_code() {
    let mut shell = Shell::new("bash").args(["-c", "kill -9 $$"]);
    let exit_code = shell.execute().await.unwrap();
    assert_eq!(exit_code, -1);
}

#[cfg(unix)]
#[tokio::test]
async fn execute_in_runs_from_the_given_directory() {
    let mut shell = Shell::new("bash").args(["-c", "pwd"]);
    let exit_code = shell.execute_in("/").await.unwrap();
    assert_eq!(exit_code, 0);

    assert!(eventually(|| shell.has_output()).await);
    assert_eq!(shell.output().trim_end(), "/");
}

#[tokio::test]
async fn both_streams_are_drained_concurrently() {
    #[cfg(unix)]
    let mut shell = Shell::new("bash").args(["-c", "printf one; printf two 1>&2; printf three"]);
    #[cfg(windows)]
    let mut shell = Shell::new("powershell").args([
        "-Command",
        "Write-Host -NoNewline one; [Console]::Error.Write('two'); Write-Host -NoNewline three",
    ]);

    let exit_code = shell.execute().await.unwrap();
    assert_eq!(exit_code, 0);

    // Order within each stream holds; no ordering is promised across them.
    assert!(eventually(|| shell.output() == "onethree").await);
    assert!(eventually(|| shell.error_output() == "two").await);
}
