//! Metrics emitted through the `metrics` facade
//!
//! No recorder is installed by this crate; embedding applications pick the exporter.

use metrics::counter;

use crate::domain::{DirectoryError, DirectoryOperation};

/// Label for a finished directory call: `ok`, or the error's kind.
///
/// Redundant adds and removes come back as `member_exists` / `member_not_found`
/// rather than as a generic failure.
pub fn directory_call_result<T>(result: &Result<T, DirectoryError>) -> &'static str {
    match result {
        Ok(_) => "ok",
        Err(error) => error.kind(),
    }
}

/// Record one remote directory call with its mapped result
pub fn record_directory_call<T>(operation: DirectoryOperation, result: &Result<T, DirectoryError>) {
    let labels = [
        ("operation", operation.as_str().to_string()),
        ("result", directory_call_result(result).to_string()),
    ];

    counter!("roster_sync_directory_calls_total", &labels).increment(1);
}

/// Record the final outcome of a team sync: `synced`, `skipped` or `failed`
pub fn record_reconciliation(outcome: &'static str) {
    counter!("roster_sync_reconciliations_total", "outcome" => outcome).increment(1);
}

/// Record a reconciliation attempt being retried
pub fn record_retry() {
    counter!("roster_sync_retries_total").increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_directory_call_result_labels() {
        assert_eq!(directory_call_result(&Ok::<(), DirectoryError>(())), "ok");
        assert_eq!(
            directory_call_result::<()>(&Err(DirectoryError::member_not_found(
                "team@cmu.edu",
                "raj@cmu.edu"
            ))),
            "member_not_found"
        );
        assert_eq!(
            directory_call_result::<()>(&Err(DirectoryError::group_exists("team@cmu.edu"))),
            "group_exists"
        );
    }
}
