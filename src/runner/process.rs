use log::{debug, error, info, warn};
use os_pipe::PipeReader;
use std::ffi::OsString;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::errors::ExecutionError;
use crate::runner::host::Host;

/// How long the relay sleeps when the stream is drained but the child is
/// still alive.
const EXIT_POLL_INTERVAL: Duration = Duration::from_millis(25);

/// A fully resolved shell task, ready to spawn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellInvocation {
    pub task_name: String,
    /// Program followed by its arguments, placeholders already expanded.
    pub argv: Vec<String>,
    pub cwd: PathBuf,
    pub has_file_variable: bool,
    pub show_output_panel: bool,
}

/// Terminal state of one invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionOutcome {
    /// Nothing ran. The failure was reported through the host.
    SpawnFailed,
    /// Handed to the host's own command table.
    Delegated,
    /// Fire-and-forget; the child runs on unobserved.
    Detached,
    /// Detached, but its output was drained until it exited.
    Drained,
    /// Observed run finished with this return code.
    Exited(i32),
}

enum Inner {
    Done(ExecutionOutcome),
    Running(JoinHandle<ExecutionOutcome>),
}

/// Handle to the background unit of a task invocation. Dropping it does
/// not stop the task.
pub struct Execution {
    inner: Inner,
}

impl Execution {
    pub fn finished(outcome: ExecutionOutcome) -> Self {
        Self {
            inner: Inner::Done(outcome),
        }
    }

    fn running(handle: JoinHandle<ExecutionOutcome>) -> Self {
        Self {
            inner: Inner::Running(handle),
        }
    }

    #[cfg(test)]
    pub fn is_finished(&self) -> bool {
        match &self.inner {
            Inner::Done(_) => true,
            Inner::Running(handle) => handle.is_finished(),
        }
    }

    /// Blocks until the background unit is done.
    pub fn wait(self) -> ExecutionOutcome {
        match self.inner {
            Inner::Done(outcome) => outcome,
            Inner::Running(handle) => handle.join().unwrap_or_else(|_| {
                error!("Task thread panicked");
                ExecutionOutcome::Exited(-1)
            }),
        }
    }
}

/// Starts a shell task. Never fails towards the caller: spawn errors are
/// reported through `host` and yield `ExecutionOutcome::SpawnFailed`.
pub fn execute_shell(invocation: ShellInvocation, host: Arc<dyn Host>) -> Execution {
    debug!("Spawning {:?} in {}", invocation.argv, invocation.cwd.display());
    if invocation.show_output_panel {
        run_observed(invocation, host)
    } else {
        run_detached(invocation, host)
    }
}

fn run_observed(invocation: ShellInvocation, host: Arc<dyn Host>) -> Execution {
    let mut sink = host.create_output_sink(&invocation.task_name);
    sink.show();

    let (mut child, reader) = match spawn_merged(&invocation) {
        Ok(spawned) => spawned,
        Err(err) => return spawn_failed(host.as_ref(), &invocation.task_name, err),
    };
    info!("Task '{}' started (pid {})", invocation.task_name, child.id());

    let task_name = invocation.task_name.clone();
    let reporter = host.clone();
    let spawned = thread::Builder::new()
        .name(thread_name(&task_name))
        .spawn(move || {
            let relayed = relay_lines(&mut child, reader, |line| sink.write(line));
            let code = settle(&mut child, relayed, &invocation.task_name);
            info!("Task '{}' finished with return code {}", invocation.task_name, code);

            sink.write(&completion_banner(code));
            if invocation.has_file_variable {
                host.restore_focus();
            }
            ExecutionOutcome::Exited(code)
        });

    unit_started(spawned, reporter.as_ref(), &task_name)
}

fn run_detached(invocation: ShellInvocation, host: Arc<dyn Host>) -> Execution {
    if !invocation.has_file_variable {
        // No pipe at all, so an unread buffer can never block the child.
        let mut command = build_command(&invocation);
        command.stdout(Stdio::null()).stderr(Stdio::null());
        return match command.spawn() {
            Ok(child) => {
                info!("Task '{}' detached (pid {})", invocation.task_name, child.id());
                Execution::finished(ExecutionOutcome::Detached)
            }
            Err(err) => spawn_failed(host.as_ref(), &invocation.task_name, err),
        };
    }

    let (mut child, reader) = match spawn_merged(&invocation) {
        Ok(spawned) => spawned,
        Err(err) => return spawn_failed(host.as_ref(), &invocation.task_name, err),
    };
    info!("Task '{}' detached (pid {}), draining output", invocation.task_name, child.id());

    let task_name = invocation.task_name.clone();
    let reporter = host.clone();
    let spawned = thread::Builder::new()
        .name(thread_name(&task_name))
        .spawn(move || {
            let name = &invocation.task_name;
            let relayed = relay_lines(&mut child, reader, |line| {
                debug!("[{}] {}", name, line.trim_end());
            });
            if let Err(err) = relayed {
                debug!("Stopped draining '{}': {}", name, err);
            }
            // Best effort: reap the child, whatever happened to the stream.
            let _ = child.wait();
            host.restore_focus();
            ExecutionOutcome::Drained
        });

    unit_started(spawned, reporter.as_ref(), &task_name)
}

/// A background unit that could not be created is reported like a spawn
/// failure. The child is already running at that point and is left alone.
fn unit_started(
    spawned: io::Result<JoinHandle<ExecutionOutcome>>,
    host: &dyn Host,
    task_name: &str,
) -> Execution {
    match spawned {
        Ok(handle) => Execution::running(handle),
        Err(err) => spawn_failed(host, task_name, err),
    }
}

fn spawn_failed(host: &dyn Host, task_name: &str, err: io::Error) -> Execution {
    let err = ExecutionError::new(task_name, err);
    error!("{}", err);
    host.error_message(&err.to_string());
    Execution::finished(ExecutionOutcome::SpawnFailed)
}

fn thread_name(task_name: &str) -> String {
    format!("task-{}", task_name)
}

fn build_command(invocation: &ShellInvocation) -> Command {
    let (program, args) = match invocation.argv.split_first() {
        Some((program, args)) => (program.as_str(), args),
        None => ("", &[][..]),
    };

    let mut command = Command::new(resolve_program(program, &invocation.cwd));
    command
        .args(args)
        .current_dir(&invocation.cwd)
        .stdin(Stdio::null());
    command
}

/// Looks the program up on PATH (relative to `cwd`), which also picks up
/// `.cmd`/`.bat` shims on Windows. Falls back to the raw name so the OS
/// reports the spawn error.
fn resolve_program(program: &str, cwd: &Path) -> OsString {
    match which::which_in(program, std::env::var_os("PATH"), cwd) {
        Ok(path) => path.into_os_string(),
        Err(err) => {
            debug!("Could not resolve '{}' ({}); spawning as given", program, err);
            OsString::from(program)
        }
    }
}

/// Spawns with stderr merged into stdout through a single pipe.
fn spawn_merged(invocation: &ShellInvocation) -> io::Result<(Child, PipeReader)> {
    let (reader, writer) = os_pipe::pipe()?;
    let writer_err = writer.try_clone()?;

    let mut command = build_command(invocation);
    command.stdout(writer).stderr(writer_err);
    let child = command.spawn()?;

    // The command holds our copies of the write end. The reader sees EOF
    // only once they are closed.
    drop(command);
    Ok((child, reader))
}

/// Relays output line by line until the stream is drained *and* the child
/// has exited. An empty read alone never ends the loop.
fn relay_lines(
    child: &mut Child,
    reader: PipeReader,
    mut on_line: impl FnMut(&str),
) -> io::Result<ExitStatus> {
    let mut reader = BufReader::new(reader);
    let mut line = Vec::new();
    loop {
        line.clear();
        if reader.read_until(b'\n', &mut line)? > 0 {
            on_line(&String::from_utf8_lossy(&line));
            continue;
        }
        if let Some(status) = child.try_wait()? {
            return Ok(status);
        }
        thread::sleep(EXIT_POLL_INTERVAL);
    }
}

fn settle(child: &mut Child, relayed: io::Result<ExitStatus>, task_name: &str) -> i32 {
    let status = relayed.or_else(|err| {
        warn!("Lost output of task '{}': {}", task_name, err);
        child.wait()
    });
    match status {
        Ok(status) => exit_code(status),
        Err(err) => {
            warn!("Could not collect exit status of '{}': {}", task_name, err);
            -1
        }
    }
}

fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return -signal;
        }
    }
    -1
}

/// The framed message written after the last line of output.
pub fn completion_banner(code: i32) -> String {
    let message = format!("| Task finished with return code {} |", code);
    let rule = "-".repeat(message.len());
    format!("\n{}\n{}\n{}", rule, message, rule)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_completion_banner() {
        let banner = completion_banner(2);
        let lines: Vec<&str> = banner.lines().collect();
        assert_eq!(lines[0], "");
        assert_eq!(lines[2], "| Task finished with return code 2 |");
        assert_eq!(lines[1], "-".repeat(lines[2].len()));
        assert_eq!(lines[3], lines[1]);
        assert_eq!(lines.len(), 4);
    }

    #[test]
    fn test_failed_background_unit_is_reported() {
        use crate::runner::host::testing::RecordingHost;

        let host = RecordingHost::default();
        let exec = unit_started(Err(io::Error::other("no threads left")), &host, "build");
        assert_eq!(exec.wait(), ExecutionOutcome::SpawnFailed);

        let errors = host.errors();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("Execution failed for task \"build\""));
        assert!(errors[0].ends_with("no threads left"));
    }

    #[test]
    fn test_finished_execution() {
        let exec = Execution::finished(ExecutionOutcome::Detached);
        assert!(exec.is_finished());
        assert_eq!(exec.wait(), ExecutionOutcome::Detached);
    }

    #[cfg(unix)]
    mod unix {
        use super::super::*;
        use crate::runner::host::testing::{RecordingHost, SinkEvent};

        fn invocation(script: &str, show_output_panel: bool, has_file_variable: bool) -> ShellInvocation {
            ShellInvocation {
                task_name: "demo".to_string(),
                argv: vec!["sh".to_string(), "-c".to_string(), script.to_string()],
                cwd: std::env::temp_dir(),
                has_file_variable,
                show_output_panel,
            }
        }

        #[test]
        fn test_observed_run_relays_lines_then_banner() {
            let host = Arc::new(RecordingHost::default());
            let outcome =
                execute_shell(invocation("echo one; echo two; exit 2", true, false), host.clone()).wait();

            assert_eq!(outcome, ExecutionOutcome::Exited(2));
            let writes = host.writes();
            assert_eq!(writes.len(), 3);
            assert_eq!(writes[0], "one\n");
            assert_eq!(writes[1], "two\n");
            assert!(writes[2].contains("return code 2"));
            assert_eq!(host.sink.events.lock().unwrap()[0], SinkEvent::Show);
            assert_eq!(*host.focus_restores.lock().unwrap(), 0);
            assert!(host.errors().is_empty());
        }

        #[test]
        fn test_waits_for_exit_after_output_is_closed() {
            let host = Arc::new(RecordingHost::default());
            let outcome = execute_shell(
                invocation("echo a; exec >&- 2>&-; sleep 0.3; exit 3", true, false),
                host.clone(),
            )
            .wait();

            assert_eq!(outcome, ExecutionOutcome::Exited(3));
            let writes = host.writes();
            assert_eq!(writes.len(), 2);
            assert_eq!(writes[0], "a\n");
            assert_eq!(writes[1], completion_banner(3));
        }

        #[test]
        fn test_concurrent_invocations_are_independent() {
            let first = Arc::new(RecordingHost::default());
            let second = Arc::new(RecordingHost::default());
            let slow = execute_shell(invocation("sleep 0.2; echo slow", true, false), first.clone());
            let fast = execute_shell(invocation("echo fast; exit 4", true, false), second.clone());

            assert_eq!(fast.wait(), ExecutionOutcome::Exited(4));
            assert_eq!(slow.wait(), ExecutionOutcome::Exited(0));
            assert_eq!(first.writes()[0], "slow\n");
            assert_eq!(second.writes()[0], "fast\n");
            assert_eq!(first.writes().len(), 2);
            assert_eq!(second.writes().len(), 2);
        }

        #[test]
        fn test_stderr_is_merged_in_order() {
            let host = Arc::new(RecordingHost::default());
            execute_shell(
                invocation("echo out; echo err 1>&2; echo out2", true, false),
                host.clone(),
            )
            .wait();
            let writes = host.writes();
            assert_eq!(&writes[..3], &["out\n", "err\n", "out2\n"]);
        }

        #[test]
        fn test_output_without_trailing_newline() {
            let host = Arc::new(RecordingHost::default());
            execute_shell(invocation("printf abc", true, false), host.clone()).wait();
            let writes = host.writes();
            assert_eq!(writes[0], "abc");
            assert!(writes[1].contains("return code 0"));
        }

        #[test]
        fn test_runs_in_working_directory() {
            let dir = tempfile::tempdir().unwrap();
            let host = Arc::new(RecordingHost::default());
            let mut inv = invocation("pwd -P", true, false);
            inv.cwd = dir.path().to_path_buf();
            execute_shell(inv, host.clone()).wait();

            let expected = std::fs::canonicalize(dir.path()).unwrap();
            assert_eq!(host.writes()[0].trim_end(), expected.to_string_lossy());
        }

        #[test]
        fn test_signal_exit_is_negative() {
            let host = Arc::new(RecordingHost::default());
            let outcome = execute_shell(invocation("kill -9 $$", true, false), host.clone()).wait();
            assert_eq!(outcome, ExecutionOutcome::Exited(-9));
        }

        #[test]
        fn test_observed_run_restores_focus_for_file_tasks() {
            let host = Arc::new(RecordingHost::default());
            execute_shell(invocation("echo hi", true, true), host.clone()).wait();
            assert_eq!(*host.focus_restores.lock().unwrap(), 1);
        }

        #[test]
        fn test_missing_program_reports_once_without_writes() {
            let host = Arc::new(RecordingHost::default());
            let inv = ShellInvocation {
                task_name: "ghost".to_string(),
                argv: vec!["definitely-not-a-real-program-4f1e".to_string()],
                cwd: std::env::temp_dir(),
                has_file_variable: false,
                show_output_panel: true,
            };
            let outcome = execute_shell(inv, host.clone()).wait();

            assert_eq!(outcome, ExecutionOutcome::SpawnFailed);
            let errors = host.errors();
            assert_eq!(errors.len(), 1);
            assert!(errors[0].contains("Execution failed for task \"ghost\""));
            assert!(host.writes().is_empty());
        }

        #[test]
        fn test_detached_run_returns_immediately() {
            let host = Arc::new(RecordingHost::default());
            let exec = execute_shell(invocation("exit 0", false, false), host.clone());
            assert!(exec.is_finished());
            assert_eq!(exec.wait(), ExecutionOutcome::Detached);
            assert_eq!(*host.sinks_created.lock().unwrap(), 0);
            assert!(host.sink.events.lock().unwrap().is_empty());
        }

        #[test]
        fn test_detached_spawn_failure_is_reported() {
            let host = Arc::new(RecordingHost::default());
            let mut inv = invocation("", false, false);
            inv.argv = vec!["definitely-not-a-real-program-4f1e".to_string()];
            assert_eq!(execute_shell(inv, host.clone()).wait(), ExecutionOutcome::SpawnFailed);
            assert_eq!(host.errors().len(), 1);
        }

        #[test]
        fn test_detached_file_task_drains_and_restores_focus() {
            let host = Arc::new(RecordingHost::default());
            let outcome = execute_shell(
                invocation("for i in 1 2 3; do echo line $i; done", false, true),
                host.clone(),
            )
            .wait();
            assert_eq!(outcome, ExecutionOutcome::Drained);
            assert_eq!(*host.focus_restores.lock().unwrap(), 1);
            assert_eq!(*host.sinks_created.lock().unwrap(), 0);
        }
    }
}
