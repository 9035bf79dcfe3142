//! Fuzz target: API error body parser.
//!
//! Arbitrary bytes fed as the body of a rejected response must never panic,
//! and only the three CSRF codes may trigger a token refresh.

#![no_main]

use fuzzctl_client::response::CSRF_ERROR_CODES;
use fuzzctl_client::ApiError;
use hyper::StatusCode;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Some((&first, body)) = data.split_first() else {
        return;
    };
    let Ok(status) = StatusCode::from_u16(400 + u16::from(first % 100)) else {
        return;
    };

    let err = ApiError::from_body(status, body);
    assert_eq!(err.status, status.as_u16());
    if err.is_csrf_failure() {
        let code = err.code.as_deref().unwrap_or_default();
        assert!(CSRF_ERROR_CODES.contains(&code));
    }
});
