// src/engine/common.rs
//
// Common utilities shared across engine modules.

use crate::error::{ResizerError, Result};
use std::panic::{catch_unwind, AssertUnwindSafe};
use tracing::error;

/// Run codec work so that a panic inside a third-party decoder or encoder
/// becomes an `InternalPanic` error instead of unwinding into the caller.
///
/// `label` identifies the call site in logs and in the error message.
pub fn run_with_panic_policy<T, F>(label: &'static str, f: F) -> Result<T>
where
    F: FnOnce() -> Result<T>,
{
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(result) => result,
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            error!(target: "image_resizer::panic", label, %message, "codec panicked");
            Err(ResizerError::internal_panic(format!("{label}: {message}")))
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn passes_through_ok_and_err() {
        assert_eq!(run_with_panic_policy("t", || Ok(3)).unwrap(), 3);
        let err = run_with_panic_policy::<(), _>("t", || Err(ResizerError::missing_file()));
        assert!(matches!(err, Err(ResizerError::MissingFile)));
    }

    #[test]
    fn converts_panic_to_internal_error() {
        let err = run_with_panic_policy::<(), _>("decode:test", || panic!("boom")).unwrap_err();
        match err {
            ResizerError::InternalPanic { message } => {
                assert!(message.contains("decode:test"));
                assert!(message.contains("boom"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
