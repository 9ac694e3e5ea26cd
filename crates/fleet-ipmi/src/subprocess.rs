use std::time::Duration;

use backon::{ConstantBuilder, Retryable};
use fleet_model::{FleetError, FleetResult};
use tokio::process::Command;

const SHELL_TIMEOUT: Duration = Duration::from_secs(20 * 60);
const SHELL_RETRY_ATTEMPTS: usize = 5;
const SHELL_RETRY_BACKOFF: Duration = Duration::from_secs(3);

/// Runs `program args...`, applying the §5 suspension-point policy for
/// every IPMI/SNMP shell invocation: a 20-minute hard timeout, up to 5
/// attempts at a fixed 3-second backoff. Stdout is scrubbed of
/// credential-shaped substrings before being surfaced in any error.
pub async fn run_with_retry(program: &str, args: &[&str]) -> FleetResult<String> {
    let backoff = ConstantBuilder::default()
        .with_delay(SHELL_RETRY_BACKOFF)
        .with_max_times(SHELL_RETRY_ATTEMPTS - 1);

    (|| run_once(program, args))
        .retry(backoff)
        .when(|e: &FleetError| !matches!(e, FleetError::Ignore(_)))
        .notify(|err, dur| {
            tracing::warn!(program, ?dur, error = %err, "retrying shell invocation");
        })
        .await
}

async fn run_once(program: &str, args: &[&str]) -> FleetResult<String> {
    let output = tokio::time::timeout(SHELL_TIMEOUT, Command::new(program).args(args).output())
        .await
        .map_err(|_| {
            FleetError::ExecError {
                code: -1,
                stdout: format!("{program} timed out after {SHELL_TIMEOUT:?}"),
            }
        })?
        .map_err(|e| FleetError::ExecError {
            code: -1,
            stdout: format!("failed to spawn {program}: {e}"),
        })?;

    let stdout = fleet_model::sanitize_stdout(&String::from_utf8_lossy(&output.stdout));

    if !output.status.success() {
        return Err(FleetError::ExecError {
            code: output.status.code().unwrap_or(-1),
            stdout,
        });
    }

    Ok(stdout)
}
