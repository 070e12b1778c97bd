use serde_json::json;
use std::io::ErrorKind;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::runner::{TestRunner, COMMAND_NOT_FOUND};
use super::types::{GateResult, GateType};
use crate::error::GateError;

const OUTPUT_TAIL_LINES: usize = 20;

/// Run the first available test command in `dir`.
///
/// Candidates are tried in order. A candidate whose command is missing
/// (exit 127, or a spawn failure with `NotFound`) is skipped; the first one
/// that actually runs decides the gate. No runnable candidate means SKIP.
pub async fn check_test_gate(
    dir: &Path,
    commands: &[String],
    timeout: Duration,
    runner: &dyn TestRunner,
) -> GateResult {
    if !dir.is_dir() {
        return GateResult::fail(
            GateType::Tests,
            format!("Directory not found: {}", dir.display()),
        );
    }

    for command in commands {
        match runner.run(command, dir, timeout).await {
            Ok(output) if output.exit_code == COMMAND_NOT_FOUND => {
                debug!("'{}' not available, trying next candidate", command);
            }
            Ok(output) if output.exit_code == 0 => {
                info!("Tests passed with '{}'", command);
                return GateResult::pass(GateType::Tests, format!("Tests passed ({})", command))
                    .with_details(json!({
                        "command": command,
                        "duration_ms": output.duration.as_millis() as u64,
                    }));
            }
            Ok(output) => {
                warn!("'{}' exited with {}", command, output.exit_code);
                return GateResult::fail(
                    GateType::Tests,
                    format!("Tests failed ({}): exit code {}", command, output.exit_code),
                )
                .with_details(json!({
                    "command": command,
                    "exit_code": output.exit_code,
                    "output": output.tail(OUTPUT_TAIL_LINES),
                }));
            }
            Err(GateError::Spawn { source, .. }) if source.kind() == ErrorKind::NotFound => {
                debug!("'{}' could not be spawned, trying next candidate", command);
            }
            Err(GateError::Timeout(limit)) => {
                warn!("'{}' timed out after {:?}", command, limit);
                return GateResult::fail(
                    GateType::Tests,
                    format!("Tests timed out after {}s ({})", limit.as_secs(), command),
                )
                .with_details(json!({ "command": command, "timeout_sec": limit.as_secs() }));
            }
            Err(e) => {
                warn!("'{}' could not run: {}", command, e);
                return GateResult::fail(GateType::Tests, format!("Test run failed: {}", e))
                    .with_details(json!({ "command": command }));
            }
        }
    }

    GateResult::skip(GateType::Tests, "No test command found")
}
