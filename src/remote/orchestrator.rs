//! High-level orchestration of a remote script run.
//!
//! One run walks a fixed sequence of phases over a single exec channel:
//!
//! ```text
//! Idle -> Uploading -> Running -> CollectingLogs -> ListingArtifacts
//!      -> DownloadingArtifacts -> Done
//! ```
//!
//! Any phase can end in `Failed`. Phases never overlap and the channel never
//! carries more than one command at a time. The run-level deadline is checked
//! at every phase boundary, and each channel command is bounded by whatever
//! budget is left.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use log::{debug, info, warn};

use crate::error::{Error, Result};
use crate::interpreter::{shell_escape, InterpreterCommand, Interpreter};
use crate::remote::channel::{Deadline, ExecChannel};
use crate::remote::layout::{local_artifact_path, RemoteLayout, STATUS_NAME};
use crate::remote::transfer::{FileTransfer, ShellTransfer};

/// Status reported when the remote status file cannot be parsed.
pub const FALLBACK_STATUS: i32 = 1;

/// Phases of a remote run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Uploading,
    Running,
    CollectingLogs,
    ListingArtifacts,
    DownloadingArtifacts,
    Done,
    Failed,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Idle => "idle",
            Phase::Uploading => "uploading script",
            Phase::Running => "running script",
            Phase::CollectingLogs => "collecting logs",
            Phase::ListingArtifacts => "listing artifacts",
            Phase::DownloadingArtifacts => "downloading artifacts",
            Phase::Done => "done",
            Phase::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Explicit inputs for a run; nothing is read from global state.
#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    /// Local directory receiving the log, `status` and artifacts
    pub output_dir: PathBuf,
    /// Budget for the whole run (`None` waits forever)
    pub timeout: Option<Duration>,
    /// Remote paths
    pub layout: RemoteLayout,
}

impl OrchestratorSettings {
    pub fn new(output_dir: PathBuf) -> Self {
        Self {
            output_dir,
            timeout: None,
            layout: RemoteLayout::default(),
        }
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_layout(mut self, layout: RemoteLayout) -> Self {
        self.layout = layout;
        self
    }
}

/// Outcome of a completed run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteExecutionResult {
    exit_status: i32,
    log_path: PathBuf,
    status_path: PathBuf,
    artifacts: Vec<PathBuf>,
}

impl RemoteExecutionResult {
    /// Exit status of the remote interpreter.
    pub fn exit_status(&self) -> i32 {
        self.exit_status
    }

    /// Local copy of the combined output log.
    pub fn log_path(&self) -> &Path {
        &self.log_path
    }

    /// Local copy of the status file.
    pub fn status_path(&self) -> &Path {
        &self.status_path
    }

    /// Local copies of collected artifacts, in listing order.
    pub fn artifacts(&self) -> &[PathBuf] {
        &self.artifacts
    }
}

/// Drives one script run over an exclusively owned exec channel.
pub struct RemoteOrchestrator<C: ExecChannel> {
    channel: C,
    transfer: Box<dyn FileTransfer>,
    settings: OrchestratorSettings,
    phase: Phase,
}

impl<C: ExecChannel> RemoteOrchestrator<C> {
    /// Creates an orchestrator using base64-over-shell transfers.
    pub fn new(channel: C, settings: OrchestratorSettings) -> Self {
        Self {
            channel,
            transfer: Box::new(ShellTransfer::new()),
            settings,
            phase: Phase::Idle,
        }
    }

    /// Replaces the file transfer implementation.
    pub fn with_transfer(mut self, transfer: Box<dyn FileTransfer>) -> Self {
        self.transfer = transfer;
        self
    }

    /// Runs `script` remotely and collects its outputs.
    ///
    /// Consumes the orchestrator: the channel is dropped when the run ends,
    /// whether it succeeded, failed or timed out. A non-zero exit status of
    /// the script itself is a successful run.
    pub fn run(mut self, script: &Path) -> Result<RemoteExecutionResult> {
        self.execute(script)
    }

    /// Current phase; `Done` or `Failed` once a run has finished.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    fn execute(&mut self, script: &Path) -> Result<RemoteExecutionResult> {
        let deadline = Deadline::new(self.settings.timeout);
        info!(
            "Running {} on {}",
            script.display(),
            self.channel.describe()
        );

        match self.drive(script, &deadline) {
            Ok(result) => {
                self.phase = Phase::Done;
                info!("Remote exit status: {}", result.exit_status);
                Ok(result)
            }
            Err(e) => {
                warn!("Run failed while {}: {}", self.phase, e);
                self.phase = Phase::Failed;
                Err(e)
            }
        }
    }

    fn enter(&mut self, next: Phase, deadline: &Deadline) -> Result<()> {
        debug!("Phase: {} -> {}", self.phase, next);
        self.phase = next;
        deadline.check(&next.to_string())
    }

    fn drive(&mut self, script: &Path, deadline: &Deadline) -> Result<RemoteExecutionResult> {
        let interpreter = Interpreter::for_path(script)?;
        let basename = script
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .ok_or_else(|| {
                Error::Usage(format!("Script path has no file name: {}", script.display()))
            })?;
        let data = fs::read(script).map_err(|e| {
            Error::Io(std::io::Error::new(
                e.kind(),
                format!("Failed to read script {}: {}", script.display(), e),
            ))
        })?;

        let layout = self.settings.layout.clone();

        self.enter(Phase::Uploading, deadline)?;
        let staged = layout.staged_script(&basename);
        info!("Staging {} ({} bytes) at {}", basename, data.len(), staged);
        self.transfer
            .push(&mut self.channel, &data, &staged, deadline.remaining())?;

        self.enter(Phase::Running, deadline)?;
        let family = interpreter.log_family();
        let remote_log = layout.log_path(family);
        let line = compose_run_line(
            &interpreter.command(&staged),
            &remote_log,
            &layout.status_path(),
        );
        let output = self.channel.run(&line, deadline.remaining())?;
        if !output.is_success() {
            return Err(Error::Channel(format!(
                "Remote shell exited with code {} before recording a status: {}",
                output.exit_code,
                output.stderr.trim()
            )));
        }

        self.enter(Phase::CollectingLogs, deadline)?;
        let output_dir = self.settings.output_dir.clone();
        let log_bytes = self
            .transfer
            .pull(&mut self.channel, &remote_log, deadline.remaining())?;
        let log_path = output_dir.join(RemoteLayout::log_name(family));
        write_local(&output_dir, &log_path, &log_bytes)?;

        let status_bytes =
            self.transfer
                .pull(&mut self.channel, &layout.status_path(), deadline.remaining())?;
        let status_path = output_dir.join(STATUS_NAME);
        write_local(&output_dir, &status_path, &status_bytes)?;
        let exit_status = parse_status(&String::from_utf8_lossy(&status_bytes));

        self.enter(Phase::ListingArtifacts, deadline)?;
        let names = self.list_artifacts(&layout, deadline)?;

        self.enter(Phase::DownloadingArtifacts, deadline)?;
        let mut artifacts = Vec::with_capacity(names.len());
        for name in names {
            let Some(local) = local_artifact_path(&output_dir, &name) else {
                warn!("Skipping artifact with unsafe name {:?}", name);
                continue;
            };
            if local == log_path || local == status_path {
                warn!(
                    "Artifact {} overwrites the collected {}",
                    name,
                    local.display()
                );
            }

            let bytes = self.transfer.pull(
                &mut self.channel,
                &layout.artifact_path(&name),
                deadline.remaining(),
            )?;
            write_local(&output_dir, &local, &bytes)?;
            debug!("Collected artifact {} ({} bytes)", name, bytes.len());
            artifacts.push(local);
        }
        info!("Collected {} artifact(s) into {}", artifacts.len(), output_dir.display());

        Ok(RemoteExecutionResult {
            exit_status,
            log_path,
            status_path,
            artifacts,
        })
    }

    /// Lists regular files in the remote artifacts directory.
    ///
    /// A missing directory is a normal outcome and yields an empty list.
    fn list_artifacts(&mut self, layout: &RemoteLayout, deadline: &Deadline) -> Result<Vec<String>> {
        let dir = layout.artifacts_dir();
        let command = list_artifacts_command(&dir);
        let output = self.channel.run(&command, deadline.remaining())?;

        if !output.is_success() {
            return Err(Error::DownlinkFailure {
                path: dir,
                reason: format!(
                    "listing exited with code {}: {}",
                    output.exit_code,
                    output.stderr.trim()
                ),
            });
        }

        Ok(parse_artifact_listing(&output.stdout))
    }
}

/// Composes the single remote line that runs the interpreter and always
/// records its exit status, even when the interpreter fails.
pub fn compose_run_line(command: &InterpreterCommand, remote_log: &str, status_path: &str) -> String {
    format!(
        "{} > {} 2>&1; printf '%s' \"$?\" > {}",
        command.to_shell_line(),
        shell_escape(remote_log),
        shell_escape(status_path)
    )
}

/// Remote listing of regular files directly inside `dir`, one NUL-terminated
/// name each; prints nothing when the directory does not exist.
pub fn list_artifacts_command(dir: &str) -> String {
    let dir = shell_escape(dir);
    format!(
        "if [ -d {dir} ]; then cd {dir} && for f in *; do \
         if [ -f \"$f\" ]; then printf '%s\\0' \"$f\"; fi; done; fi"
    )
}

/// Splits the NUL-separated listing output into names.
///
/// Names that are not valid UTF-8 are skipped with a warning.
pub fn parse_artifact_listing(stdout: &[u8]) -> Vec<String> {
    stdout
        .split(|&b| b == 0)
        .filter(|raw| !raw.is_empty())
        .filter_map(|raw| match std::str::from_utf8(raw) {
            Ok(name) => Some(name.to_string()),
            Err(_) => {
                warn!(
                    "Skipping artifact with non UTF-8 name {:?}",
                    String::from_utf8_lossy(raw)
                );
                None
            }
        })
        .collect()
}

/// Parses the remote status file, substituting [`FALLBACK_STATUS`] for
/// anything that is not a non-negative integer.
pub fn parse_status(text: &str) -> i32 {
    match text.trim().parse::<u32>().ok().and_then(|v| i32::try_from(v).ok()) {
        Some(status) => status,
        None => {
            warn!(
                "Unparsable remote status {:?}, using {}",
                text.trim(),
                FALLBACK_STATUS
            );
            FALLBACK_STATUS
        }
    }
}

fn write_local(output_dir: &Path, path: &Path, data: &[u8]) -> Result<()> {
    fs::create_dir_all(output_dir).map_err(|e| {
        Error::Io(std::io::Error::new(
            e.kind(),
            format!(
                "Failed to create output directory {}: {}",
                output_dir.display(),
                e
            ),
        ))
    })?;
    fs::write(path, data).map_err(|e| {
        Error::Io(std::io::Error::new(
            e.kind(),
            format!("Failed to write {}: {}", path.display(), e),
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::channel::ExecOutput;
    use crate::remote::codec;
    use std::cell::RefCell;
    use std::collections::{HashMap, VecDeque};
    use std::rc::Rc;
    use tempfile::TempDir;

    /// Channel replaying canned responses and recording every command.
    struct ScriptedChannel {
        responses: VecDeque<Result<ExecOutput>>,
        commands: Rc<RefCell<Vec<String>>>,
    }

    impl ScriptedChannel {
        fn new(responses: Vec<Result<ExecOutput>>) -> (Self, Rc<RefCell<Vec<String>>>) {
            let commands = Rc::new(RefCell::new(Vec::new()));
            (
                Self {
                    responses: responses.into(),
                    commands: Rc::clone(&commands),
                },
                commands,
            )
        }

        fn next(&mut self, command: &str) -> Result<ExecOutput> {
            self.commands.borrow_mut().push(command.to_string());
            self.responses
                .pop_front()
                .unwrap_or_else(|| panic!("unexpected command: {}", command))
        }
    }

    impl ExecChannel for ScriptedChannel {
        fn run(&mut self, command: &str, _timeout: Option<Duration>) -> Result<ExecOutput> {
            self.next(command)
        }

        fn run_with_input(
            &mut self,
            command: &str,
            _input: &[u8],
            _timeout: Option<Duration>,
        ) -> Result<ExecOutput> {
            self.next(command)
        }

        fn describe(&self) -> String {
            "scripted".to_string()
        }
    }

    fn ok(stdout: &[u8]) -> Result<ExecOutput> {
        Ok(ExecOutput {
            stdout: stdout.to_vec(),
            stderr: String::new(),
            exit_code: 0,
        })
    }

    fn file(content: &[u8]) -> Result<ExecOutput> {
        ok(codec::encode(content).as_bytes())
    }

    fn write_script(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, "echo hi\n").unwrap();
        path
    }

    #[test]
    fn test_compose_run_line_records_status_unconditionally() {
        let cmd = Interpreter::Python.command("/tmp/job.py");
        assert_eq!(
            compose_run_line(&cmd, "/tmp/out_script.log", "/tmp/status"),
            "'python3' '/tmp/job.py' > '/tmp/out_script.log' 2>&1; printf '%s' \"$?\" > '/tmp/status'"
        );
    }

    #[test]
    fn test_parse_status() {
        assert_eq!(parse_status("0"), 0);
        assert_eq!(parse_status("3"), 3);
        assert_eq!(parse_status(" 127\n"), 127);
        assert_eq!(parse_status(""), FALLBACK_STATUS);
        assert_eq!(parse_status("oops"), FALLBACK_STATUS);
        assert_eq!(parse_status("-2"), FALLBACK_STATUS);
        assert_eq!(parse_status("99999999999"), FALLBACK_STATUS);
    }

    #[test]
    fn test_phases_issue_commands_in_order() {
        let local = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        let script = write_script(local.path(), "report.mongo");

        let (channel, commands) = ScriptedChannel::new(vec![
            ok(b""),
            ok(b""),
            file(b"query output\n"),
            file(b"0"),
            ok(b"a.txt\0b.csv\0"),
            file(b"alpha"),
            file(b"beta"),
        ]);

        let settings = OrchestratorSettings::new(out.path().to_path_buf());
        let result = RemoteOrchestrator::new(channel, settings)
            .run(&script)
            .unwrap();

        let commands = commands.borrow();
        assert_eq!(commands[0], "base64 -d > '/tmp/report.mongo'");
        assert_eq!(
            commands[1],
            "'mongosh' '/tmp/report.mongo' > '/tmp/out_mongo.log' 2>&1; printf '%s' \"$?\" > '/tmp/status'"
        );
        assert_eq!(commands[2], "base64 < '/tmp/out_mongo.log'");
        assert_eq!(commands[3], "base64 < '/tmp/status'");
        assert_eq!(commands[4], list_artifacts_command("/tmp/artifacts"));
        assert_eq!(commands[5], "base64 < '/tmp/artifacts/a.txt'");
        assert_eq!(commands[6], "base64 < '/tmp/artifacts/b.csv'");
        assert_eq!(commands.len(), 7);

        assert_eq!(result.exit_status(), 0);
        assert_eq!(result.log_path(), out.path().join("out_mongo.log"));
        assert_eq!(fs::read(out.path().join("a.txt")).unwrap(), b"alpha");
        assert_eq!(fs::read(out.path().join("b.csv")).unwrap(), b"beta");
        assert_eq!(result.artifacts().len(), 2);
    }

    #[test]
    fn test_unparsable_status_becomes_fallback() {
        let local = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        let script = write_script(local.path(), "job.sh");

        let (channel, _) = ScriptedChannel::new(vec![
            ok(b""),
            ok(b""),
            file(b""),
            file(b"not-a-number"),
            ok(b""),
        ]);

        let result = RemoteOrchestrator::new(channel, OrchestratorSettings::new(out.path().to_path_buf()))
            .run(&script)
            .unwrap();
        assert_eq!(result.exit_status(), FALLBACK_STATUS);
        assert_eq!(
            fs::read_to_string(out.path().join("status")).unwrap(),
            "not-a-number"
        );
        assert!(result.artifacts().is_empty());
    }

    #[test]
    fn test_unsafe_artifact_names_are_skipped() {
        let local = TempDir::new().unwrap();
        let parent = TempDir::new().unwrap();
        let out = parent.path().join("out");
        let script = write_script(local.path(), "job.py");

        let (channel, commands) = ScriptedChannel::new(vec![
            ok(b""),
            ok(b""),
            file(b""),
            file(b"0"),
            ok(b"..\0../escape.txt\0safe.txt\0"),
            file(b"safe"),
        ]);

        let result = RemoteOrchestrator::new(channel, OrchestratorSettings::new(out.clone()))
            .run(&script)
            .unwrap();

        assert_eq!(result.artifacts(), [out.join("safe.txt")]);
        assert!(!parent.path().join("escape.txt").exists());
        assert_eq!(commands.borrow().len(), 6);
    }

    #[test]
    fn test_spent_deadline_stops_before_any_command() {
        let local = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        let script = write_script(local.path(), "job.sh");

        let (channel, commands) = ScriptedChannel::new(vec![]);
        let settings = OrchestratorSettings::new(out.path().to_path_buf())
            .with_timeout(Some(Duration::ZERO));

        let err = RemoteOrchestrator::new(channel, settings)
            .run(&script)
            .unwrap_err();
        assert!(err.is_timeout());
        assert!(commands.borrow().is_empty());
    }

    #[test]
    fn test_timeout_while_running_is_fatal() {
        let local = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        let script = write_script(local.path(), "job.sh");

        let (channel, commands) = ScriptedChannel::new(vec![
            ok(b""),
            Err(Error::DeadlineExceeded {
                operation: "running".to_string(),
                timeout: Duration::from_secs(1),
            }),
        ]);

        let err = RemoteOrchestrator::new(channel, OrchestratorSettings::new(out.path().to_path_buf()))
            .run(&script)
            .unwrap_err();
        assert!(err.is_timeout());
        assert_eq!(commands.borrow().len(), 2);
        assert!(!out.path().join("status").exists());
    }

    #[test]
    fn test_failed_uplink_aborts_run() {
        let local = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        let script = write_script(local.path(), "job.sh");

        let (channel, commands) = ScriptedChannel::new(vec![Ok(ExecOutput {
            stdout: Vec::new(),
            stderr: "sh: can't create /tmp/job.sh: Read-only file system".to_string(),
            exit_code: 2,
        })]);

        let err = RemoteOrchestrator::new(channel, OrchestratorSettings::new(out.path().to_path_buf()))
            .run(&script)
            .unwrap_err();
        match err {
            Error::UplinkFailure { path, reason } => {
                assert_eq!(path, "/tmp/job.sh");
                assert!(reason.contains("Read-only"));
            }
            other => panic!("expected UplinkFailure, got {:?}", other),
        }
        assert_eq!(commands.borrow().len(), 1);
    }

    #[test]
    fn test_unsupported_script_never_touches_channel() {
        let local = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        let script = write_script(local.path(), "notes.txt");

        let (channel, commands) = ScriptedChannel::new(vec![]);
        let err = RemoteOrchestrator::new(channel, OrchestratorSettings::new(out.path().to_path_buf()))
            .run(&script)
            .unwrap_err();
        assert!(matches!(err, Error::UnsupportedScriptKind { .. }));
        assert!(commands.borrow().is_empty());
    }

    #[test]
    fn test_failing_listing_is_reported() {
        let local = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        let script = write_script(local.path(), "job.sh");

        let (channel, _) = ScriptedChannel::new(vec![
            ok(b""),
            ok(b""),
            file(b"log"),
            file(b"0"),
            Ok(ExecOutput {
                stdout: Vec::new(),
                stderr: "cd: can't cd to /tmp/artifacts".to_string(),
                exit_code: 2,
            }),
        ]);

        let err = RemoteOrchestrator::new(channel, OrchestratorSettings::new(out.path().to_path_buf()))
            .run(&script)
            .unwrap_err();
        assert!(matches!(err, Error::DownlinkFailure { .. }));
        // logs collected before the failure stay on disk
        assert!(out.path().join("out_script.log").exists());
    }

    /// In-memory transfer standing in for a channel with native file copy.
    struct MemoryTransfer {
        files: RefCell<HashMap<String, Vec<u8>>>,
        log: Rc<RefCell<Vec<String>>>,
    }

    impl FileTransfer for MemoryTransfer {
        fn push(
            &self,
            _channel: &mut dyn ExecChannel,
            data: &[u8],
            remote_path: &str,
            _timeout: Option<Duration>,
        ) -> Result<()> {
            self.log.borrow_mut().push(format!("push {}", remote_path));
            self.files
                .borrow_mut()
                .insert(remote_path.to_string(), data.to_vec());
            Ok(())
        }

        fn pull(
            &self,
            _channel: &mut dyn ExecChannel,
            remote_path: &str,
            _timeout: Option<Duration>,
        ) -> Result<Vec<u8>> {
            self.log.borrow_mut().push(format!("pull {}", remote_path));
            self.files
                .borrow()
                .get(remote_path)
                .cloned()
                .ok_or_else(|| Error::DownlinkFailure {
                    path: remote_path.to_string(),
                    reason: "no such file".to_string(),
                })
        }
    }

    #[test]
    fn test_replacement_transfer_carries_every_file() {
        let local = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        let script = write_script(local.path(), "job.sh");

        let log = Rc::new(RefCell::new(Vec::new()));
        let files = HashMap::from([
            ("/tmp/out_script.log".to_string(), b"hi\n".to_vec()),
            ("/tmp/status".to_string(), b"4".to_vec()),
            ("/tmp/artifacts/out.txt".to_string(), b"payload".to_vec()),
        ]);
        let transfer = MemoryTransfer {
            files: RefCell::new(files),
            log: Rc::clone(&log),
        };

        // Only the run line and the listing go through the channel.
        let (channel, commands) = ScriptedChannel::new(vec![ok(b""), ok(b"out.txt\0")]);

        let result = RemoteOrchestrator::new(channel, OrchestratorSettings::new(out.path().to_path_buf()))
            .with_transfer(Box::new(transfer))
            .run(&script)
            .unwrap();

        assert_eq!(
            *log.borrow(),
            vec![
                "push /tmp/job.sh",
                "pull /tmp/out_script.log",
                "pull /tmp/status",
                "pull /tmp/artifacts/out.txt",
            ]
        );
        assert_eq!(commands.borrow().len(), 2);
        assert!(commands.borrow().iter().all(|c| !c.starts_with("base64")));
        assert_eq!(result.exit_status(), 4);
        assert_eq!(fs::read(out.path().join("out.txt")).unwrap(), b"payload");
    }

    #[test]
    fn test_listing_is_nul_separated() {
        assert_eq!(
            parse_artifact_listing(b"a\nb\0good.txt\0\0"),
            vec!["a\nb".to_string(), "good.txt".to_string()]
        );
        assert_eq!(parse_artifact_listing(b"\xff\xfe.bin\0ok\0"), vec!["ok".to_string()]);
        assert!(parse_artifact_listing(b"").is_empty());
        assert!(list_artifacts_command("/tmp/artifacts").contains("printf '%s\\0'"));
    }

    #[test]
    fn test_artifact_with_newline_in_name_is_collected() {
        let local = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        let script = write_script(local.path(), "job.sh");

        let (channel, commands) = ScriptedChannel::new(vec![
            ok(b""),
            ok(b""),
            file(b""),
            file(b"3"),
            ok(b"a\nb\0good.txt\0"),
            file(b"odd"),
            file(b"good"),
        ]);

        let result = RemoteOrchestrator::new(channel, OrchestratorSettings::new(out.path().to_path_buf()))
            .run(&script)
            .unwrap();

        assert_eq!(result.exit_status(), 3);
        assert_eq!(commands.borrow()[5], "base64 < '/tmp/artifacts/a\nb'");
        assert_eq!(fs::read(out.path().join("a\nb")).unwrap(), b"odd");
        assert_eq!(fs::read(out.path().join("good.txt")).unwrap(), b"good");
    }

    #[test]
    fn test_phase_ends_done_or_failed() {
        let local = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        let script = write_script(local.path(), "job.sh");

        let (channel, _) = ScriptedChannel::new(vec![ok(b""), ok(b""), file(b""), file(b"0"), ok(b"")]);
        let mut orchestrator =
            RemoteOrchestrator::new(channel, OrchestratorSettings::new(out.path().to_path_buf()));
        assert_eq!(orchestrator.phase(), Phase::Idle);
        orchestrator.execute(&script).unwrap();
        assert_eq!(orchestrator.phase(), Phase::Done);

        let (channel, _) = ScriptedChannel::new(vec![Err(Error::Channel("gone".to_string()))]);
        let mut orchestrator =
            RemoteOrchestrator::new(channel, OrchestratorSettings::new(out.path().to_path_buf()));
        assert!(orchestrator.execute(&script).is_err());
        assert_eq!(orchestrator.phase(), Phase::Failed);
    }

    #[test]
    fn test_phase_display() {
        assert_eq!(Phase::ListingArtifacts.to_string(), "listing artifacts");
        assert_eq!(Phase::Failed.to_string(), "failed");
    }
}
