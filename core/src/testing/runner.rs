use std::{io, path::Path, process::Stdio, time::Duration};

use anyhow::Context as _;
use tokio::{
    io::{AsyncReadExt as _, AsyncWriteExt as _},
    process::Command,
    time::Instant,
};

use super::{
    command::CommandTable,
    error_kind::ErrorKinds,
    judge::{find_report, judge_output},
    result::{Status, TestResult},
    testcase::{IoTestCase, ScriptTestCase, TestCase, TestKind},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessOutput {
    pub status: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

/// Why a child process could not be run to completion.
#[derive(Debug, thiserror::Error)]
pub enum LaunchError {
    #[error("Empty command line")]
    EmptyCommand,

    #[error("Failed to spawn '{0}': {1}")]
    Spawn(String, io::Error),

    #[error("Failed to communicate with '{0}': {1}")]
    Communicate(String, io::Error),
}

impl LaunchError {
    fn is_not_found(&self) -> bool {
        matches!(self, LaunchError::Spawn(_, e) if e.kind() == io::ErrorKind::NotFound)
    }
}

/// Outcome of one supervised child process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Execution {
    Finished(ProcessOutput),
    TimedOut,
}

/// Runs test cases against subjects. Each run gets its own deadline.
#[derive(Debug, Clone)]
pub struct TestRunner {
    commands: CommandTable,
    error_kinds: ErrorKinds,
    timeout: Duration,
}

impl Default for TestRunner {
    fn default() -> Self {
        Self::new(CommandTable::default())
    }
}

impl TestRunner {
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);
    const SPAWN_RETRY_DELAY: Duration = Duration::from_millis(10);

    pub fn new(commands: CommandTable) -> Self {
        Self {
            commands,
            error_kinds: ErrorKinds::default(),
            timeout: Self::DEFAULT_TIMEOUT,
        }
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn error_kinds(mut self, kinds: ErrorKinds) -> Self {
        self.error_kinds = kinds;
        self
    }

    pub fn get_timeout(&self) -> Duration {
        self.timeout
    }

    pub fn get_commands(&self) -> &CommandTable {
        &self.commands
    }

    /// Runs one case against one subject.
    ///
    /// Subject failures, timeouts and verifier protocol violations are all
    /// reported through the returned `TestResult`, and so is a subject that
    /// cannot be launched (not executable, bad format, broken pipes). `Err` is
    /// kept for environment errors: a missing interpreter, a missing verifier
    /// or a run command that does not expand.
    pub async fn run(&self, subject: &Path, case: &TestCase) -> anyhow::Result<TestResult> {
        match case {
            TestCase::Io(t) => self.run_io(subject, t).await,
            TestCase::Script(t) => self.run_script(subject, t).await,
        }
    }

    async fn run_io(&self, subject: &Path, case: &IoTestCase) -> anyhow::Result<TestResult> {
        let argv = self
            .commands
            .resolve(subject)
            .with_context(|| format!("Invalid run command for '{}'", subject.display()))?;

        let start_at = Instant::now();
        let execution = self.execute(&argv, Some(case.input.as_bytes())).await;
        let execution_time = start_at.elapsed();

        let mut res = TestResult {
            kind: TestKind::Io,
            name: case.name.clone(),
            status: Status::Timeout,
            summary: String::new(),
            stdout: None,
            stderr: None,
            exit_status: None,
            input: Some(case.input.clone()),
            output: Some(case.output.clone()),
            feedback: None,
            execution_time,
        };

        match execution {
            Ok(Execution::Finished(out)) => {
                res.status = match out.status {
                    Some(0) => judge_output(case, &out.stdout),
                    _ => self.error_kinds.classify(&out.stderr),
                };
                res.exit_status = out.status;
                res.stdout = Some(out.stdout);
                res.stderr = Some(out.stderr);
            }
            Ok(Execution::TimedOut) => {}
            Err(e) if e.is_not_found() && self.commands.find_for(subject).is_some() => {
                return Err(e).context("Interpreter not found");
            }
            Err(e @ LaunchError::EmptyCommand) => return Err(e.into()),
            Err(e) => {
                log::debug!("Cannot run {}: {}", subject.display(), e);
                res.status = Status::DefaultError;
                res.stdout = Some(String::new());
                res.stderr = Some(e.to_string());
            }
        }
        res.summary = res.status.code().to_string();
        Ok(res)
    }

    async fn run_script(
        &self,
        subject: &Path,
        case: &ScriptTestCase,
    ) -> anyhow::Result<TestResult> {
        let mut argv = self
            .commands
            .resolve(&case.script)
            .with_context(|| format!("Invalid run command for '{}'", case.script.display()))?;
        argv.push(subject.to_string_lossy().into_owned());

        let start_at = Instant::now();
        let execution = self.execute(&argv, None).await;
        let execution_time = start_at.elapsed();

        let mut res = TestResult {
            kind: TestKind::Script,
            name: case.name.clone(),
            status: Status::Timeout,
            summary: Status::Timeout.code().to_string(),
            stdout: None,
            stderr: None,
            exit_status: None,
            input: None,
            output: None,
            feedback: None,
            execution_time,
        };

        let out = match execution {
            Ok(Execution::Finished(out)) => out,
            Ok(Execution::TimedOut) => return Ok(res),
            Err(e) if e.is_not_found() => {
                return Err(e).with_context(|| {
                    format!("Verifier not runnable: {}", case.script.display())
                });
            }
            Err(e @ LaunchError::EmptyCommand) => return Err(e.into()),
            Err(e) => {
                res.status = Status::ScriptTestError;
                res.summary = res.status.code().to_string();
                res.stdout = Some(String::new());
                res.stderr = Some(e.to_string());
                return Ok(res);
            }
        };

        match out.status {
            Some(0) => match find_report(&out.stdout, &out.stderr) {
                Some(report) => {
                    res.status = report.status();
                    res.summary = report.summary;
                    res.feedback = report.feedback;
                }
                None => {
                    res.status = Status::Inconclusive;
                    res.summary = res.status.code().to_string();
                }
            },
            _ => {
                res.status = Status::ScriptTestError;
                res.summary = res.status.code().to_string();
            }
        }
        res.exit_status = out.status;
        res.stdout = Some(out.stdout);
        res.stderr = Some(out.stderr);
        Ok(res)
    }

    /// Spawns `argv`, feeds `input` to its stdin and collects its output.
    ///
    /// The deadline covers writing stdin, reading both streams and waiting
    /// for exit. On expiry the child is killed and reaped before returning.
    pub async fn execute(
        &self,
        argv: &[String],
        input: Option<&[u8]>,
    ) -> Result<Execution, LaunchError> {
        let Some((program, args)) = argv.split_first() else {
            return Err(LaunchError::EmptyCommand);
        };
        let cmdline = argv.join(" ");

        let mut cmd = Command::new(program);
        cmd.args(args)
            .stdin(if input.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let (mut proc, deadline) = loop {
            let deadline = Instant::now() + self.timeout;
            match cmd.spawn() {
                Ok(proc) => break (proc, deadline),
                Err(e) if is_transient_spawn_error(&e) => {
                    log::debug!("Retrying spawn of '{}': {}", program, e);
                    tokio::time::sleep(Self::SPAWN_RETRY_DELAY).await;
                }
                Err(e) => return Err(LaunchError::Spawn(cmdline, e)),
            }
        };
        log::debug!("Running: {}", cmdline);

        let not_piped = || io::Error::new(io::ErrorKind::Other, "stdio not piped");
        let stdin = proc.stdin.take();
        let Some(mut stdout) = proc.stdout.take() else {
            return Err(LaunchError::Communicate(cmdline, not_piped()));
        };
        let Some(mut stderr) = proc.stderr.take() else {
            return Err(LaunchError::Communicate(cmdline, not_piped()));
        };

        let res = {
            let fut_stdin = async move {
                let (Some(mut stdin), Some(input)) = (stdin, input) else {
                    return io::Result::Ok(());
                };
                let res = stdin.write_all(input).await;
                drop(stdin); // NOTE: the child sees EOF only once stdin is closed
                match res {
                    Err(e) if e.kind() == io::ErrorKind::BrokenPipe => Ok(()),
                    other => other,
                }
            };
            let fut_stdout = async {
                let mut buf = Vec::new();
                stdout.read_to_end(&mut buf).await.map(|_| buf)
            };
            let fut_stderr = async {
                let mut buf = Vec::new();
                stderr.read_to_end(&mut buf).await.map(|_| buf)
            };
            let fut_exit_status = proc.wait();

            tokio::time::timeout_at(deadline, async {
                tokio::try_join!(fut_stdin, fut_stdout, fut_stderr, fut_exit_status)
            })
            .await
        };

        match res {
            Err(_) => {
                proc.kill()
                    .await
                    .unwrap_or_else(|e| log::warn!("Failed to kill timed out process: {:#}", e));
                Ok(Execution::TimedOut)
            }
            Ok(Err(e)) => Err(LaunchError::Communicate(cmdline, e)),
            Ok(Ok((_, stdout_buf, stderr_buf, exit_status))) => {
                Ok(Execution::Finished(ProcessOutput {
                    status: exit_status.code(),
                    stdout: String::from_utf8_lossy(&stdout_buf).into(),
                    stderr: String::from_utf8_lossy(&stderr_buf).into(),
                }))
            }
        }
    }
}

/// Spawn errors that clear up once other processes exit or release resources.
/// Anything else (not found, permission denied, bad executable format) is final.
fn is_transient_spawn_error(e: &io::Error) -> bool {
    use io::ErrorKind::*;
    matches!(e.kind(), Interrupted | WouldBlock | OutOfMemory)
        || e.raw_os_error().map_or(false, is_transient_os_error)
}

#[cfg(unix)]
fn is_transient_os_error(code: i32) -> bool {
    matches!(
        code,
        libc::ETXTBSY | libc::EAGAIN | libc::EMFILE | libc::ENFILE | libc::ENOMEM
    )
}

#[cfg(not(unix))]
fn is_transient_os_error(_code: i32) -> bool {
    false
}

#[cfg(test)]
mod test {
    use std::path::PathBuf;

    use super::*;
    use crate::{
        preprocess::OperatorSet,
        serdable::GlobPattern,
        testing::{command::RunCommandEntry, TestEntry},
    };

    struct Sandbox {
        dir: tempfile::TempDir,
    }

    impl Sandbox {
        fn new() -> Self {
            Self {
                dir: tempfile::tempdir().unwrap(),
            }
        }

        fn file(&self, name: &str, contents: &str) -> PathBuf {
            let path = self.dir.path().join(name);
            std::fs::write(&path, contents).unwrap();
            path
        }

        fn executable(&self, name: &str, contents: &[u8]) -> PathBuf {
            use std::os::unix::fs::PermissionsExt as _;
            let path = self.dir.path().join(name);
            std::fs::write(&path, contents).unwrap();
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
            path
        }
    }

    fn runner(timeout_ms: u64) -> TestRunner {
        let table = CommandTable::builtin().with_entries([RunCommandEntry {
            pattern: GlobPattern::parse("*.sh").unwrap(),
            command: "/bin/sh #{filePath}".to_owned(),
        }]);
        TestRunner::new(table).timeout(Duration::from_millis(timeout_ms))
    }

    fn io_case(input: &str, output: &str) -> TestCase {
        TestCase::Io(IoTestCase::new(
            Some("sum".into()),
            input,
            output,
            None,
            OperatorSet::standard(),
        ))
    }

    fn script_case(script: PathBuf) -> TestCase {
        TestCase::from_entry(
            0,
            TestEntry {
                kind: Some(TestKind::Script),
                script: Some(script),
                ..Default::default()
            },
        )
        .unwrap()
    }

    const SUM: &str = "read a\nread b\necho $((a + b))\n";

    #[tokio::test]
    async fn should_be_success() {
        let sb = Sandbox::new();
        let subject = sb.file("sum.sh", SUM);
        let res = runner(2000)
            .run(&subject, &io_case("2\n3\n", "5\n"))
            .await
            .unwrap();
        assert_eq!(res.status, Status::Success);
        assert_eq!(res.summary, ".");
        assert_eq!(res.stdout.as_deref(), Some("5\n"));
        assert_eq!(res.stderr.as_deref(), Some(""));
        assert_eq!(res.exit_status, Some(0));
        assert_eq!(res.input.as_deref(), Some("2\n3\n"));
    }

    #[tokio::test]
    async fn trailing_space_is_still_success() {
        let sb = Sandbox::new();
        let subject = sb.file("sum.sh", "read a\nread b\necho \"$((a + b)) \"\n");
        let res = runner(2000)
            .run(&subject, &io_case("2\n3\n", "5\n"))
            .await
            .unwrap();
        assert_eq!(res.status, Status::Success);
    }

    #[tokio::test]
    async fn should_be_success_even_if_stdin_is_not_read() {
        let sb = Sandbox::new();
        let subject = sb.file("five.sh", "echo 5\n");
        let input = "1\n".repeat(1 << 17);
        let res = runner(2000)
            .run(&subject, &io_case(&input, "5"))
            .await
            .unwrap();
        assert_eq!(res.status, Status::Success);
    }

    #[tokio::test]
    async fn wordy_output_fails_without_tokens() {
        let sb = Sandbox::new();
        let subject = sb.file("sum.sh", "read a\nread b\necho \"The sum is $((a + b))\"\n");
        let res = runner(2000)
            .run(&subject, &io_case("2\n3\n", "5\n"))
            .await
            .unwrap();
        assert_eq!(res.status, Status::Fail);
        assert_eq!(res.summary, "F");

        let res = runner(2000)
            .run(&subject, &io_case("2\n3\n", "Total {{5}}"))
            .await
            .unwrap();
        assert_eq!(res.status, Status::AllTokensSequence);
        assert_eq!(res.summary, "@");
    }

    #[tokio::test]
    async fn nonzero_exit_is_error_even_if_stdout_is_correct() {
        let sb = Sandbox::new();
        let subject = sb.file("bad.sh", "echo 5\nexit 42\n");
        let res = runner(2000).run(&subject, &io_case("", "5")).await.unwrap();
        assert_eq!(res.status, Status::DefaultError);
        assert_eq!(res.summary, "e");
        assert_eq!(res.exit_status, Some(42));
    }

    #[tokio::test]
    async fn runtime_error_kind_is_read_from_stderr() {
        let sb = Sandbox::new();
        let subject = sb.file(
            "div.sh",
            "echo 'Traceback (most recent call last):' >&2\necho 'ZeroDivisionError: division by zero' >&2\nexit 1\n",
        );
        let res = runner(2000).run(&subject, &io_case("", "5")).await.unwrap();
        assert_eq!(res.status.code(), 'z');
        assert_eq!(res.status.to_string(), "ZeroDivisionError");
    }

    #[tokio::test]
    async fn should_be_timeout() {
        let sb = Sandbox::new();
        let subject = sb.file("slow.sh", "echo partial\nsleep 5\necho 5\n");
        let res = runner(300).run(&subject, &io_case("", "5")).await.unwrap();
        assert_eq!(res.status, Status::Timeout);
        assert_eq!(res.summary, "t");
        assert_eq!(res.stdout, None);
        assert_eq!(res.stderr, None);
        assert_eq!(res.exit_status, None);
        assert!(res.execution_time < Duration::from_secs(4));
    }

    #[tokio::test]
    async fn missing_interpreter_is_an_error() {
        let sb = Sandbox::new();
        let subject = sb.file("nope.sh", SUM);
        let table = CommandTable::new(vec![RunCommandEntry {
            pattern: GlobPattern::parse("*.sh").unwrap(),
            command: "/nonexistent/interpreter #{filePath}".to_owned(),
        }]);
        let res = TestRunner::new(table)
            .run(&subject, &io_case("", "5"))
            .await;
        assert!(res.is_err());
    }

    #[tokio::test]
    async fn script_success_and_fail() {
        let sb = Sandbox::new();
        let subject = sb.file("sum.sh", SUM);
        let ok = sb.file("ok.sh", "echo '...'\n");
        let res = runner(2000).run(&subject, &script_case(ok)).await.unwrap();
        assert_eq!(res.kind, TestKind::Script);
        assert_eq!(res.status, Status::Success);
        assert_eq!(res.summary, "...");

        let partial = sb.file(
            "partial.sh",
            "echo '{\"summary\": \".F.\", \"feedback\": \"case 2\"}' >&2\n",
        );
        let res = runner(2000)
            .run(&subject, &script_case(partial))
            .await
            .unwrap();
        assert_eq!(res.status, Status::Fail);
        assert_eq!(res.summary, ".F.");
        assert_eq!(res.feedback.as_deref(), Some("case 2"));
    }

    #[tokio::test]
    async fn script_receives_subject_filename() {
        let sb = Sandbox::new();
        let subject = sb.file("sum.sh", SUM);
        let check = sb.file(
            "check.sh",
            "case \"$1\" in *sum.sh) echo . ;; *) echo F ;; esac\n",
        );
        let res = runner(2000).run(&subject, &script_case(check)).await.unwrap();
        assert_eq!(res.status, Status::Success);
    }

    #[tokio::test]
    async fn script_nonzero_exit_is_script_error() {
        let sb = Sandbox::new();
        let subject = sb.file("sum.sh", SUM);
        let broken = sb.file("broken.sh", "echo '...'\nexit 3\n");
        let res = runner(2000)
            .run(&subject, &script_case(broken))
            .await
            .unwrap();
        assert_eq!(res.status, Status::ScriptTestError);
        assert_eq!(res.summary, "!");
        assert_eq!(res.exit_status, Some(3));
    }

    #[tokio::test]
    async fn script_without_report_is_inconclusive() {
        let sb = Sandbox::new();
        let subject = sb.file("sum.sh", SUM);
        let silent = sb.file("silent.sh", "echo 'nothing useful here'\n");
        let res = runner(2000)
            .run(&subject, &script_case(silent))
            .await
            .unwrap();
        assert_eq!(res.status, Status::Inconclusive);
        assert_eq!(res.summary, "?");
    }

    #[tokio::test]
    async fn script_timeout() {
        let sb = Sandbox::new();
        let subject = sb.file("sum.sh", SUM);
        let slow = sb.file("slow.sh", "sleep 5\necho .\n");
        let res = runner(300).run(&subject, &script_case(slow)).await.unwrap();
        assert_eq!(res.status, Status::Timeout);
        assert_eq!(res.summary, "t");
    }

    #[tokio::test]
    async fn unexecutable_subject_is_a_failed_run() {
        let sb = Sandbox::new();
        let subject = sb.file("noexec.sh", SUM);
        let res = TestRunner::new(CommandTable::new(vec![]))
            .run(&subject, &io_case("2\n3\n", "5"))
            .await
            .unwrap();
        assert_eq!(res.status, Status::DefaultError);
        assert_eq!(res.summary, "e");
        assert_eq!(res.exit_status, None);
        assert!(res.stderr.unwrap().contains("Permission denied"));
    }

    #[tokio::test]
    async fn corrupt_executable_does_not_hang() {
        let sb = Sandbox::new();
        let subject = sb.executable("prog.bin", b"\x7fELF\0\0\0\0\x01\x02\x03");
        let runner = TestRunner::new(CommandTable::new(vec![])).timeout(Duration::from_millis(500));
        let res = tokio::time::timeout(
            Duration::from_secs(5),
            runner.run(&subject, &io_case("", "5")),
        )
        .await
        .expect("run must return")
        .unwrap();
        assert_eq!(res.status, Status::DefaultError);
    }

    #[tokio::test]
    async fn direct_executable_runs_without_table_entry() {
        let sb = Sandbox::new();
        let subject = sb.executable("sum", format!("#!/bin/sh\n{}", SUM).as_bytes());
        let res = TestRunner::new(CommandTable::new(vec![]))
            .run(&subject, &io_case("2\n3\n", "5"))
            .await
            .unwrap();
        assert_eq!(res.status, Status::Success);
    }

    #[tokio::test]
    async fn unexecutable_verifier_is_script_error() {
        let sb = Sandbox::new();
        let subject = sb.file("sum.sh", SUM);
        let check = sb.file("check", "echo .\n");
        let res = runner(2000).run(&subject, &script_case(check)).await.unwrap();
        assert_eq!(res.status, Status::ScriptTestError);
        assert_eq!(res.summary, "!");
        assert!(res.stderr.unwrap().contains("Permission denied"));
    }

    #[tokio::test]
    async fn missing_verifier_is_an_error() {
        let sb = Sandbox::new();
        let subject = sb.file("sum.sh", SUM);
        let res = runner(2000)
            .run(&subject, &script_case(sb.dir.path().join("absent")))
            .await;
        assert!(res.is_err());
    }

    #[test]
    fn only_transient_spawn_errors_are_retried() {
        for code in [libc::ETXTBSY, libc::EAGAIN, libc::EMFILE, libc::ENFILE, libc::ENOMEM] {
            let e = io::Error::from_raw_os_error(code);
            assert!(is_transient_spawn_error(&e), "{}", e);
        }
        assert!(is_transient_spawn_error(&io::ErrorKind::Interrupted.into()));

        for code in [libc::ENOEXEC, libc::ENOENT, libc::EACCES, libc::E2BIG] {
            let e = io::Error::from_raw_os_error(code);
            assert!(!is_transient_spawn_error(&e), "{}", e);
        }
    }
}
