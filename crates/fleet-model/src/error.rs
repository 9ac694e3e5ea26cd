use tonic::Status;

/// The error kinds surfaced across the whole system, §7.
///
/// Every fallible API in the workspace returns (or converts into) this
/// enum, the way `rpc::errors::RpcDataConversionError` is the single
/// currency of error at the RPC boundary in the teacher codebase. At the
/// coordinator/worker RPC boundary this converts into a [`tonic::Status`]
/// via [`From`], so the *kind* survives the wire as a `tonic::Code` plus a
/// sanitized message, and no stack trace ever crosses it.
#[derive(Debug, thiserror::Error)]
pub enum FleetError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("ambiguous lookup: {0}")]
    ManyFound(String),

    /// Expected short-circuit during discovery or a stage-check. Must never
    /// cause a status mutation; callers match on this variant explicitly
    /// rather than logging it as an error.
    #[error("ignored: {0}")]
    Ignore(String),

    #[error("invalid operator input: {0}")]
    InvalidData(String),

    #[error("provisioning incomplete: {0}")]
    ProvisionIncomplete(String),

    #[error("subprocess exited with code {code}: {stdout}")]
    ExecError { code: i32, stdout: String },

    #[error("version conflict updating {object_id}: expected version {expected}")]
    VersionConflict { object_id: String, expected: i64 },

    #[error("database error: {0}")]
    Database(String),

    #[error("transport error: {0}")]
    Transport(String),
}

impl FleetError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        FleetError::NotFound(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        FleetError::Conflict(msg.into())
    }

    pub fn ignore(msg: impl Into<String>) -> Self {
        FleetError::Ignore(msg.into())
    }

    /// True for the `Ignore` kind discovery and the stage-check loop use to
    /// short-circuit without mutating status (§4.3, §4.5, §7).
    pub fn is_ignore(&self) -> bool {
        matches!(self, FleetError::Ignore(_))
    }
}

impl From<sqlx::Error> for FleetError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => FleetError::NotFound("no matching row".to_string()),
            other => FleetError::Database(other.to_string()),
        }
    }
}

impl From<FleetError> for Status {
    fn from(err: FleetError) -> Self {
        tracing::warn!(error = %err, "fleet error crossing RPC boundary");
        match err {
            FleetError::NotFound(msg) => Status::not_found(msg),
            FleetError::Conflict(msg) => Status::already_exists(msg),
            FleetError::ManyFound(msg) => Status::failed_precondition(msg),
            FleetError::Ignore(msg) => Status::ok(msg),
            FleetError::InvalidData(msg) => Status::invalid_argument(msg),
            FleetError::ProvisionIncomplete(msg) => Status::unavailable(msg),
            FleetError::ExecError { code, stdout } => {
                Status::internal(format!("exit code {code}: {}", sanitize_stdout(&stdout)))
            }
            FleetError::VersionConflict { object_id, expected } => Status::aborted(format!(
                "version conflict on {object_id}, expected version {expected}"
            )),
            FleetError::Database(msg) => Status::internal(msg),
            FleetError::Transport(msg) => Status::unavailable(msg),
        }
    }
}

/// Scrubs credential-shaped substrings (`password=...`, `token=...`, Basic
/// auth headers) out of subprocess stdout before it is allowed to appear in
/// a message, per §7's "sanitized stdout" requirement for `ExecError`.
pub fn sanitize_stdout(stdout: &str) -> String {
    static PATTERNS: &[&str] = &["password", "passwd", "secret", "token", "apikey", "api_key"];
    stdout
        .lines()
        .map(|line| {
            let lower = line.to_ascii_lowercase();
            if PATTERNS.iter().any(|p| lower.contains(p)) {
                "<redacted>"
            } else {
                line
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_stdout_redacts_credential_lines() {
        let out = "ok\npassword=hunter2\nother";
        assert_eq!(sanitize_stdout(out), "ok\n<redacted>\nother");
    }

    #[test]
    fn ignore_is_recognized() {
        let err = FleetError::ignore("already in flight");
        assert!(err.is_ignore());
        assert!(!FleetError::not_found("x").is_ignore());
    }
}
