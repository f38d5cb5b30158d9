//! Exec channels backed by a local client process.
//!
//! Every remote command is one child process: `kubectl exec` for Kubernetes
//! targets, or `/bin/sh -c` on the host for the local shell channel. Output
//! is drained on helper threads so a chatty command can never fill a pipe
//! and stall while we wait for it.

use std::io::{self, Read, Write};
use std::process::{Child, Command, Stdio};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use log::{debug, warn};
use wait_timeout::ChildExt;

use crate::config::KubernetesTarget;
use crate::error::{Error, Result};
use crate::remote::channel::{ExecChannel, ExecOutput};
use crate::remote::diagnostics::{
    diagnose_kubectl_failure, diagnose_spawn_failure, is_kubectl_transport_error,
};

/// Which client process carries the commands.
#[derive(Debug, Clone)]
enum Backend {
    Kubectl {
        program: String,
        target: KubernetesTarget,
    },
    LocalShell,
}

/// An exec channel that spawns one client process per command.
#[derive(Debug, Clone)]
pub struct ProcessChannel {
    backend: Backend,
}

impl ProcessChannel {
    /// Channel into a Kubernetes container through `kubectl exec`.
    pub fn kubectl(target: KubernetesTarget) -> Self {
        Self {
            backend: Backend::Kubectl {
                program: "kubectl".to_string(),
                target,
            },
        }
    }

    /// Same as [`ProcessChannel::kubectl`] with an explicit kubectl binary.
    pub fn kubectl_with_program(program: String, target: KubernetesTarget) -> Self {
        Self {
            backend: Backend::Kubectl { program, target },
        }
    }

    /// Channel that runs commands through `/bin/sh` on this host.
    pub fn local_shell() -> Self {
        Self {
            backend: Backend::LocalShell,
        }
    }

    fn build_command(&self, command: &str, with_stdin: bool) -> Command {
        match &self.backend {
            Backend::Kubectl { program, target } => {
                let mut cmd = Command::new(program);
                if let Some(context) = &target.context {
                    cmd.arg("--context").arg(context);
                }
                cmd.arg("exec");
                if with_stdin {
                    cmd.arg("-i");
                }
                cmd.arg("-n").arg(&target.namespace).arg(&target.pod);
                if let Some(container) = &target.container {
                    cmd.arg("-c").arg(container);
                }
                cmd.arg("--").arg("/bin/sh").arg("-c").arg(command);
                cmd
            }
            Backend::LocalShell => {
                let mut cmd = Command::new("/bin/sh");
                cmd.arg("-c").arg(command);
                cmd
            }
        }
    }

    fn program(&self) -> &str {
        match &self.backend {
            Backend::Kubectl { program, .. } => program,
            Backend::LocalShell => "/bin/sh",
        }
    }

    fn execute(
        &mut self,
        command: &str,
        input: Option<&[u8]>,
        timeout: Option<Duration>,
    ) -> Result<ExecOutput> {
        debug!("[{}] exec: {}", self.describe(), command);

        let mut cmd = self.build_command(command, input.is_some());
        cmd.stdin(if input.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

        let mut child = cmd
            .spawn()
            .map_err(|e| Error::Channel(diagnose_spawn_failure(self.program(), &e)))?;

        let writer = input.map(|data| spawn_writer(&mut child, data.to_vec()));
        let stdout_reader = spawn_reader(child.stdout.take());
        let stderr_reader = spawn_reader(child.stderr.take());

        let status = match timeout {
            Some(limit) => match child.wait_timeout(limit)? {
                Some(status) => status,
                None => {
                    // Only the local client is stopped; whatever it started remotely keeps running.
                    warn!(
                        "[{}] command exceeded {:?}, stopping local client",
                        self.describe(),
                        limit
                    );
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(Error::DeadlineExceeded {
                        operation: format!("running '{}'", command),
                        timeout: limit,
                    });
                }
            },
            None => child.wait()?,
        };

        if let Some(writer) = writer {
            match writer.join() {
                Ok(Ok(())) => {}
                Ok(Err(e)) if e.kind() == io::ErrorKind::BrokenPipe => {
                    debug!("[{}] command closed stdin early", self.describe());
                }
                Ok(Err(e)) => {
                    return Err(Error::Channel(format!("Failed to write command input: {}", e)))
                }
                Err(_) => return Err(Error::Channel("stdin writer thread panicked".to_string())),
            }
        }

        let stdout = join_reader(stdout_reader)?;
        let stderr = String::from_utf8_lossy(&join_reader(stderr_reader)?).to_string();
        let exit_code = status.code().unwrap_or(-1);

        debug!("[{}] exit code: {}", self.describe(), exit_code);
        if !stderr.is_empty() {
            debug!("[{}] stderr: {}", self.describe(), stderr.trim_end());
        }

        if let Backend::Kubectl { target, .. } = &self.backend {
            if exit_code != 0 && is_kubectl_transport_error(&stderr) {
                return Err(Error::Channel(diagnose_kubectl_failure(
                    exit_code,
                    &stderr,
                    &target.summary(),
                )));
            }
        }

        Ok(ExecOutput {
            stdout,
            stderr,
            exit_code,
        })
    }
}

impl ExecChannel for ProcessChannel {
    fn run(&mut self, command: &str, timeout: Option<Duration>) -> Result<ExecOutput> {
        self.execute(command, None, timeout)
    }

    fn run_with_input(
        &mut self,
        command: &str,
        input: &[u8],
        timeout: Option<Duration>,
    ) -> Result<ExecOutput> {
        self.execute(command, Some(input), timeout)
    }

    fn describe(&self) -> String {
        match &self.backend {
            Backend::Kubectl { target, .. } => format!("pod {}", target.summary()),
            Backend::LocalShell => "local shell".to_string(),
        }
    }
}

fn spawn_writer(child: &mut Child, data: Vec<u8>) -> JoinHandle<io::Result<()>> {
    let stdin = child.stdin.take();
    thread::spawn(move || {
        if let Some(mut stdin) = stdin {
            stdin.write_all(&data)?;
            stdin.flush()?;
        }
        // stdin is dropped here, which delivers EOF to the remote command
        Ok(())
    })
}

fn spawn_reader<R: Read + Send + 'static>(source: Option<R>) -> JoinHandle<io::Result<Vec<u8>>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut source) = source {
            source.read_to_end(&mut buf)?;
        }
        Ok(buf)
    })
}

fn join_reader(handle: JoinHandle<io::Result<Vec<u8>>>) -> Result<Vec<u8>> {
    handle
        .join()
        .map_err(|_| Error::Channel("output reader thread panicked".to_string()))?
        .map_err(Error::Io)
}
