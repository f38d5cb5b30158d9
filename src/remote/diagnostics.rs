//! Diagnostic utilities for channel and transfer failures.
//!
//! These functions turn raw stderr from kubectl, ssh, or the remote shell
//! into readable messages with troubleshooting suggestions. They never decide
//! whether something timed out; that is carried structurally by the channel.

/// Builds a readable message for a `kubectl exec` failure.
pub fn diagnose_kubectl_failure(exit_code: i32, stderr: &str, target: &str) -> String {
    let lower = stderr.to_lowercase();
    let mut suggestions = Vec::new();

    if lower.contains("notfound") || lower.contains("not found") {
        if lower.contains("container") {
            suggestions.push("• The container name does not exist in this pod".to_string());
            suggestions.push(format!(
                "• List containers: kubectl get pod {} -o jsonpath='{{.spec.containers[*].name}}'",
                pod_of(target)
            ));
        } else {
            suggestions.push(format!("• The pod '{}' was not found", pod_of(target)));
            suggestions.push("• Check the namespace (--namespace) and pod name".to_string());
        }
    } else if lower.contains("forbidden") || lower.contains("unauthorized") {
        suggestions.push("• Your credentials lack the pods/exec permission".to_string());
        suggestions.push("• Check RBAC: kubectl auth can-i create pods/exec".to_string());
    } else if lower.contains("context") && lower.contains("does not exist") {
        suggestions.push("• The kubeconfig context does not exist".to_string());
        suggestions.push("• List contexts: kubectl config get-contexts".to_string());
    } else if lower.contains("connection refused")
        || lower.contains("no such host")
        || lower.contains("unable to connect")
    {
        suggestions.push("• The Kubernetes API server is unreachable".to_string());
        suggestions.push("• Verify the cluster is running: kubectl cluster-info".to_string());
    } else if lower.contains("not running") || lower.contains("containercreating") {
        suggestions.push("• The container is not running yet".to_string());
        suggestions.push(format!("• Check pod status: kubectl describe pod {}", pod_of(target)));
    }

    if suggestions.is_empty() {
        suggestions.push("• Verify the target with: kubectl get pods".to_string());
        suggestions.push("• Re-run with --verbose for the full command".to_string());
    }

    compose("kubectl exec", target, exit_code, stderr, &suggestions)
}

/// Builds a readable message when the exec client could not be started.
pub fn diagnose_spawn_failure(program: &str, error: &std::io::Error) -> String {
    let mut message = format!("Failed to start '{}': {}\n\nTroubleshooting suggestions:\n", program, error);
    if error.kind() == std::io::ErrorKind::NotFound {
        message.push_str(&format!("• Install {} and make sure it is on PATH", program));
    } else {
        message.push_str(&format!("• Check that {} is executable", program));
    }
    message
}

/// Provides helpful diagnostic information for SSH connection failures.
pub fn diagnose_ssh_error(error: &str, host: &str, port: u16, ssh_key: Option<&str>) -> String {
    let error_str = error.to_lowercase();

    let mut suggestions = Vec::new();

    if error_str.contains("connection refused")
        || error_str.contains("no route to host")
        || error_str.contains("failed to resolve")
    {
        suggestions.push(format!("• Verify the host '{}' is reachable", host));
        suggestions.push(format!(
            "• Check if SSH is running on port {} (try: ssh -p {} {})",
            port, port, host
        ));
    }

    if error_str.contains("authentication")
        || error_str.contains("permission denied")
        || error_str.contains("publickey")
    {
        suggestions.push("• Verify your SSH key has correct permissions (chmod 600)".to_string());

        if let Some(key) = ssh_key {
            suggestions.push(format!("• Check that the SSH key exists: {}", key));
            suggestions.push(format!(
                "• Verify the public key is in ~/.ssh/authorized_keys on {}",
                host
            ));
        } else {
            suggestions.push("• Try specifying ssh_key for this target".to_string());
            suggestions.push("• Verify your SSH agent is running (ssh-add -l)".to_string());
        }
    }

    if suggestions.is_empty() {
        suggestions.push("• Verify the remote host is accessible".to_string());
        suggestions.push(format!(
            "• Test the connection manually: ssh -p {} {}",
            port, host
        ));
    }

    format!(
        "SSH connection failed: {}\n\nTroubleshooting suggestions:\n{}",
        error,
        suggestions.join("\n")
    )
}

/// Explains why a remote `base64` transfer command failed.
pub fn diagnose_transfer_failure(exit_code: i32, stderr: &str) -> String {
    let lower = stderr.to_lowercase();

    let hint = if exit_code == 127 || lower.contains("command not found") {
        "base64 is not installed in the remote environment"
    } else if lower.contains("no such file") {
        "the remote file or its directory does not exist"
    } else if lower.contains("permission denied") || lower.contains("read-only file system") {
        "the remote path is not writable/readable by the exec user"
    } else if lower.contains("no space left") {
        "the remote filesystem is full"
    } else if lower.contains("invalid input") {
        "the remote base64 rejected the payload"
    } else {
        "remote command failed"
    };

    let stderr = stderr.trim();
    if stderr.is_empty() {
        format!("{} (exit code {})", hint, exit_code)
    } else {
        format!("{} (exit code {}): {}", hint, exit_code, stderr)
    }
}

/// Returns true when kubectl itself (not the remote command) failed.
///
/// kubectl forwards the remote exit code and then reports
/// "command terminated with exit code N"; its own failures are reported as
/// `error: ...` or `Error from server ...` without that trailer.
pub fn is_kubectl_transport_error(stderr: &str) -> bool {
    if stderr.contains("command terminated with exit code") {
        return false;
    }
    stderr.lines().any(|line| {
        let line = line.trim_start();
        line.starts_with("Error from server") || line.starts_with("error: ")
    })
}

fn pod_of(target: &str) -> &str {
    let last = target.rsplit('/').next().unwrap_or(target);
    last.split(':').next().unwrap_or(last)
}

fn compose(client: &str, target: &str, exit_code: i32, stderr: &str, suggestions: &[String]) -> String {
    let mut msg = format!("{} failed on {} (exit code {})\n", client, target, exit_code);
    if !stderr.trim().is_empty() {
        msg.push_str("Stderr:\n");
        msg.push_str(&indent_text(stderr.trim(), 2));
        msg.push_str("\n\n");
    }
    msg.push_str("Troubleshooting suggestions:\n");
    msg.push_str(&suggestions.join("\n"));
    msg
}

/// Indents each line of text by the specified number of spaces.
fn indent_text(text: &str, spaces: usize) -> String {
    let indent = " ".repeat(spaces);
    text.lines()
        .map(|line| format!("{}{}", indent, line))
        .collect::<Vec<_>>()
        .join("\n")
}
