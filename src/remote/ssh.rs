//! SSH-backed exec channel.
//!
//! One authenticated `ssh2` session is held for the whole run and each
//! remote command gets its own channel on it, one at a time. Dropping the
//! `SshChannel` drops the session, which closes the connection.

use std::io::{self, Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use log::{debug, info, warn};
use ssh2::{ErrorCode, Session};

use crate::config::SshTarget;
use crate::error::{Error, Result};
use crate::interpreter::shell_escape;
use crate::remote::channel::{ExecChannel, ExecOutput};
use crate::remote::diagnostics::diagnose_ssh_error;

/// libssh2's LIBSSH2_ERROR_TIMEOUT
const LIBSSH2_ERROR_TIMEOUT: i32 = -9;

/// Exec channel over an authenticated SSH session.
pub struct SshChannel {
    target: SshTarget,
    session: Session,
}

impl SshChannel {
    /// Establishes and authenticates an SSH session to `target`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Channel`] with troubleshooting suggestions if name
    /// resolution, the TCP connection, the handshake or authentication fails.
    pub fn connect(target: SshTarget) -> Result<Self> {
        info!("Connecting to {}", target.connection_string());

        let session = Self::open_session(&target).map_err(|e| {
            Error::Channel(diagnose_ssh_error(
                &e.to_string(),
                &target.host,
                target.port,
                target.ssh_key.as_deref(),
            ))
        })?;

        debug!("SSH session established");
        Ok(Self { target, session })
    }

    fn open_session(target: &SshTarget) -> Result<Session> {
        let addr_str = format!("{}:{}", target.host, target.port);
        let addr = addr_str
            .to_socket_addrs()
            .map_err(|e| Error::Channel(format!("Failed to resolve host '{}': {}", target.host, e)))?
            .next()
            .ok_or_else(|| {
                Error::Channel(format!("No addresses found for host '{}'", target.host))
            })?;

        let tcp = TcpStream::connect_timeout(&addr, Duration::from_secs(target.connect_timeout))
            .map_err(|e| Error::Channel(format!("Failed to connect to {}: {}", target.host, e)))?;

        let mut sess = Session::new()
            .map_err(|e| Error::Channel(format!("Failed to create SSH session: {}", e)))?;
        sess.set_tcp_stream(tcp);
        sess.handshake()
            .map_err(|e| Error::Channel(format!("SSH handshake failed: {}", e)))?;

        Self::authenticate(target, &sess)?;
        Ok(sess)
    }

    /// Tries the configured key file first, then the SSH agent.
    fn authenticate(target: &SshTarget, sess: &Session) -> Result<()> {
        debug!("Authenticating as user: {}", target.user);

        if let Some(key_path) = target.expanded_ssh_key() {
            debug!("Attempting public key authentication with: {:?}", key_path);
            match sess.userauth_pubkey_file(&target.user, None, &key_path, None) {
                Ok(_) => return Ok(()),
                Err(e) => warn!("Public key authentication failed: {}", e),
            }
        }

        match sess.userauth_agent(&target.user) {
            Ok(_) => return Ok(()),
            Err(e) => warn!("Agent authentication failed: {}", e),
        }

        Err(Error::Channel(format!(
            "SSH authentication failed for user {}. Tried: {}, agent",
            target.user,
            target.ssh_key.as_deref().unwrap_or("no key specified")
        )))
    }

    fn execute(
        &mut self,
        command: &str,
        input: Option<&[u8]>,
        timeout: Option<Duration>,
    ) -> Result<ExecOutput> {
        debug!("[{}] exec: {}", self.describe(), command);

        // 0 disables the libssh2 timeout
        let timeout_ms = timeout.map(|t| t.as_millis().clamp(1, u32::MAX as u128) as u32);
        self.session.set_timeout(timeout_ms.unwrap_or(0));

        let limit = timeout.unwrap_or_default();
        let on_ssh = |e: ssh2::Error| ssh_failure(e, command, limit);
        let on_io = |e: io::Error| io_failure(e, command, limit);

        let mut channel = self.session.channel_session().map_err(on_ssh)?;
        channel.exec(&wrap_in_sh(command)).map_err(on_ssh)?;

        if let Some(data) = input {
            channel.write_all(data).map_err(on_io)?;
        }
        channel.send_eof().map_err(on_ssh)?;

        let mut stdout = Vec::new();
        channel.read_to_end(&mut stdout).map_err(on_io)?;

        let mut stderr = String::new();
        channel.stderr().read_to_string(&mut stderr).map_err(on_io)?;

        channel.wait_close().map_err(on_ssh)?;
        let exit_code = channel.exit_status().map_err(on_ssh)?;

        debug!("[{}] exit code: {}", self.describe(), exit_code);
        if !stderr.is_empty() {
            debug!("[{}] stderr: {}", self.describe(), stderr.trim_end());
        }

        Ok(ExecOutput {
            stdout,
            stderr,
            exit_code,
        })
    }
}

fn ssh_failure(e: ssh2::Error, command: &str, limit: Duration) -> Error {
    if e.code() == ErrorCode::Session(LIBSSH2_ERROR_TIMEOUT) {
        Error::DeadlineExceeded {
            operation: format!("running '{}'", command),
            timeout: limit,
        }
    } else {
        Error::Channel(format!("SSH channel error: {}", e))
    }
}

fn io_failure(e: io::Error, command: &str, limit: Duration) -> Error {
    // ssh2 maps LIBSSH2_ERROR_TIMEOUT onto ErrorKind::TimedOut
    if e.kind() == io::ErrorKind::TimedOut {
        Error::DeadlineExceeded {
            operation: format!("running '{}'", command),
            timeout: limit,
        }
    } else {
        Error::Channel(format!("SSH stream error: {}", e))
    }
}

impl ExecChannel for SshChannel {
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
        format!("ssh {}", self.target.connection_string())
    }
}

/// Runs `command` under `/bin/sh -c` whatever the account's login shell is.
fn wrap_in_sh(command: &str) -> String {
    format!("/bin/sh -c {}", shell_escape(command))
}
