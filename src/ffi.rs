//! FFI bindings for Motion Flux
//!
//! This module provides C-compatible functions for driving Motion Flux from a
//! host loop written in another language. All functions use C strings
//! (null-terminated) and return allocated memory that must be freed by the
//! caller using `mflux_free_string`.

use std::cell::RefCell;
use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::ptr;

use crate::config::TrialConfig;
use crate::pipeline::{run_trial, TrialProcessor};
use crate::types::Sample;

// Thread-local storage for the last error message
thread_local! {
    static LAST_ERROR: RefCell<Option<CString>> = const { RefCell::new(None) };
}

/// Set the last error message
fn set_last_error(msg: &str) {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = CString::new(msg).ok();
    });
}

/// Clear the last error message
fn clear_last_error() {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = None;
    });
}

/// Helper to convert C string to Rust string
unsafe fn cstr_to_string(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    CStr::from_ptr(ptr).to_str().ok().map(|s| s.to_string())
}

/// Helper to convert Rust string to C string (caller must free)
fn string_to_cstr(s: &str) -> *mut c_char {
    match CString::new(s) {
        Ok(cstr) => cstr.into_raw(),
        Err(_) => ptr::null_mut(),
    }
}

// ============================================================================
// Stateless API
// ============================================================================

/// Run a whole trial and return the JSON trial report.
///
/// # Safety
/// - `config_json` and `samples_json` must be valid null-terminated C strings.
/// - Returns a newly allocated string that must be freed with `mflux_free_string`.
/// - Returns NULL on error; call `mflux_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn mflux_run_trial(
    config_json: *const c_char,
    samples_json: *const c_char,
) -> *mut c_char {
    clear_last_error();

    let config_str = match cstr_to_string(config_json) {
        Some(s) => s,
        None => {
            set_last_error("Invalid config string pointer");
            return ptr::null_mut();
        }
    };

    let samples_str = match cstr_to_string(samples_json) {
        Some(s) => s,
        None => {
            set_last_error("Invalid samples string pointer");
            return ptr::null_mut();
        }
    };

    match run_trial(&config_str, &samples_str) {
        Ok(report) => string_to_cstr(&report),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

// ============================================================================
// Stateful Processor API
// ============================================================================

/// Opaque handle to a TrialProcessor
pub struct TrialProcessorHandle {
    processor: TrialProcessor,
}

/// Create a new TrialProcessor from a JSON trial configuration.
///
/// # Safety
/// - `config_json` must be a valid null-terminated C string.
/// - Returns a pointer to a newly allocated TrialProcessor.
/// - Must be freed with `mflux_processor_free`.
/// - Returns NULL on error; call `mflux_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn mflux_processor_new(config_json: *const c_char) -> *mut TrialProcessorHandle {
    clear_last_error();

    let config_str = match cstr_to_string(config_json) {
        Some(s) => s,
        None => {
            set_last_error("Invalid config string pointer");
            return ptr::null_mut();
        }
    };

    let processor = match TrialConfig::from_json(&config_str)
        .and_then(|config| TrialProcessor::from_config(&config))
    {
        Ok(p) => p,
        Err(e) => {
            set_last_error(&e.to_string());
            return ptr::null_mut();
        }
    };

    let handle = Box::new(TrialProcessorHandle { processor });
    Box::into_raw(handle)
}

/// Free a TrialProcessor.
///
/// # Safety
/// - `processor` must be a valid pointer returned by `mflux_processor_new`.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn mflux_processor_free(processor: *mut TrialProcessorHandle) {
    if !processor.is_null() {
        drop(Box::from_raw(processor));
    }
}

/// Start a new trial.
///
/// # Safety
/// - `processor` must be a valid pointer returned by `mflux_processor_new`.
/// - `time0` is the zero point of elapsed time; pass NaN to use the first sample.
/// - Returns 0 on success, non-zero on error.
#[no_mangle]
pub unsafe extern "C" fn mflux_processor_start_trial(
    processor: *mut TrialProcessorHandle,
    time0: f64,
) -> i32 {
    clear_last_error();

    if processor.is_null() {
        set_last_error("Null processor pointer");
        return -1;
    }

    let handle = &mut *processor;
    let time0 = if time0.is_finite() { Some(time0) } else { None };
    handle.processor.start_trial(time0);
    0
}

/// Validate one sample and return the JSON sample outcome.
///
/// # Safety
/// - `processor` must be a valid pointer returned by `mflux_processor_new`.
/// - Returns a newly allocated string that must be freed with `mflux_free_string`.
/// - Returns NULL on error (e.g. time going backwards); call `mflux_last_error`
///   to get the error message.
#[no_mangle]
pub unsafe extern "C" fn mflux_processor_process_sample(
    processor: *mut TrialProcessorHandle,
    x: f64,
    y: f64,
    t: f64,
) -> *mut c_char {
    clear_last_error();

    if processor.is_null() {
        set_last_error("Null processor pointer");
        return ptr::null_mut();
    }

    let handle = &mut *processor;
    let outcome = match handle.processor.process_sample(Sample::new(x, y, t)) {
        Ok(outcome) => outcome,
        Err(e) => {
            set_last_error(&e.to_string());
            return ptr::null_mut();
        }
    };

    match serde_json::to_string(&outcome) {
        Ok(json) => string_to_cstr(&json),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

// ============================================================================
// Memory Management
// ============================================================================

/// Free a string returned by Motion Flux functions.
///
/// # Safety
/// - `ptr` must be a valid pointer returned by a Motion Flux function, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn mflux_free_string(ptr: *mut c_char) {
    if !ptr.is_null() {
        drop(CString::from_raw(ptr));
    }
}

// ============================================================================
// Error Handling
// ============================================================================

/// Get the last error message.
///
/// # Safety
/// - Returns a pointer to a thread-local error string.
/// - The returned pointer is valid until the next Motion Flux call on this thread.
/// - Do NOT free the returned pointer.
/// - Returns NULL if no error occurred.
#[no_mangle]
pub unsafe extern "C" fn mflux_last_error() -> *const c_char {
    LAST_ERROR.with(|e| match &*e.borrow() {
        Some(cstr) => cstr.as_ptr(),
        None => ptr::null(),
    })
}

// ============================================================================
// Version Information
// ============================================================================

/// Get the Motion Flux library version.
///
/// # Safety
/// - Returns a pointer to a static string. Do NOT free.
#[no_mangle]
pub unsafe extern "C" fn mflux_version() -> *const c_char {
    static VERSION: &[u8] = concat!(env!("CARGO_PKG_VERSION"), "\0").as_bytes();
    VERSION.as_ptr() as *const c_char
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::CString;

    fn speed_config() -> CString {
        CString::new(r#"{ "speed": { "axis": "y", "min_speed": 1.0 } }"#).unwrap()
    }

    #[test]
    fn test_ffi_run_trial() {
        let config = speed_config();
        let samples = CString::new(
            r#"[{"x": 0, "y": 0, "t": 0}, {"x": 0, "y": 2, "t": 1}, {"x": 0, "y": 2.5, "t": 2}]"#,
        )
        .unwrap();

        unsafe {
            let result = mflux_run_trial(config.as_ptr(), samples.as_ptr());
            assert!(!result.is_null());

            let report: serde_json::Value =
                serde_json::from_str(CStr::from_ptr(result).to_str().unwrap()).unwrap();
            assert_eq!(report["passed"], false);
            assert_eq!(report["failed_at_sample"], 2);

            mflux_free_string(result);
        }
    }

    #[test]
    fn test_ffi_processor_lifecycle() {
        unsafe {
            let config = speed_config();
            let processor = mflux_processor_new(config.as_ptr());
            assert!(!processor.is_null());

            assert_eq!(mflux_processor_start_trial(processor, 0.0), 0);

            let first = mflux_processor_process_sample(processor, 0.0, 0.0, 0.0);
            assert!(!first.is_null());
            mflux_free_string(first);

            let second = mflux_processor_process_sample(processor, 0.0, 0.5, 1.0);
            assert!(!second.is_null());
            let outcome: serde_json::Value =
                serde_json::from_str(CStr::from_ptr(second).to_str().unwrap()).unwrap();
            assert_eq!(outcome["sample_index"], 1);
            assert_eq!(outcome["failures"][0]["kind"], "too_slow");
            mflux_free_string(second);

            // time going backwards is an error, not a failure
            let third = mflux_processor_process_sample(processor, 0.0, 1.0, 0.5);
            assert!(third.is_null());
            assert!(!mflux_last_error().is_null());

            // a new trial accepts earlier times again
            assert_eq!(mflux_processor_start_trial(processor, f64::NAN), 0);
            let fourth = mflux_processor_process_sample(processor, 0.0, 1.0, 0.5);
            assert!(!fourth.is_null());
            assert!(mflux_last_error().is_null());
            mflux_free_string(fourth);

            mflux_processor_free(processor);
        }
    }

    #[test]
    fn test_ffi_error_handling() {
        unsafe {
            let invalid = CString::new("not json").unwrap();
            let samples = CString::new("[]").unwrap();

            let result = mflux_run_trial(invalid.as_ptr(), samples.as_ptr());
            assert!(result.is_null());

            let error = mflux_last_error();
            assert!(!error.is_null());
            let error_str = CStr::from_ptr(error).to_str().unwrap();
            assert!(!error_str.is_empty());

            let processor = mflux_processor_new(invalid.as_ptr());
            assert!(processor.is_null());
            assert_eq!(mflux_processor_start_trial(ptr::null_mut(), 0.0), -1);
        }
    }

    #[test]
    fn test_ffi_version() {
        unsafe {
            let version = mflux_version();
            assert!(!version.is_null());

            let version_str = CStr::from_ptr(version).to_str().unwrap();
            assert!(!version_str.is_empty());
        }
    }
}
