//! FFI bindings for Cogtrain
//!
//! C-compatible entry points for embedding the scoring core in a host
//! application. All strings are null-terminated; strings returned by this
//! module are heap-allocated and must be freed with `cogtrain_free_string`.

use std::cell::RefCell;
use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::ptr;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::attention::smoothing::GazeSmoother;
use crate::config::{AttentionConfig, SmoothingConfig, TrainingConfig, DEFAULT_ALPHABET};
use crate::error::TrainingError;
use crate::nback::sequence::{generate_sequence, SequenceParams};
use crate::pipeline::{attention_replay_to_json, nback_replay_to_json, TrainingProcessor};
use crate::store::{MemoryProfileStore, MemorySessionLog};
use crate::types::{GazeSample, Group, Participant, TaskArea};

// Thread-local storage for the last error message
thread_local! {
    static LAST_ERROR: RefCell<Option<CString>> = const { RefCell::new(None) };
}

fn set_last_error(msg: &str) {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = CString::new(msg).ok();
    });
}

fn clear_last_error() {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = None;
    });
}

/// Convert a C string argument, recording an error naming `what` on failure
unsafe fn cstr_arg(ptr: *const c_char, what: &str) -> Option<String> {
    if ptr.is_null() {
        set_last_error(&format!("Invalid {what} string pointer"));
        return None;
    }
    match CStr::from_ptr(ptr).to_str() {
        Ok(s) => Some(s.to_string()),
        Err(_) => {
            set_last_error(&format!("{what} is not valid UTF-8"));
            None
        }
    }
}

/// Convert Rust string to C string (caller must free)
fn string_to_cstr(s: &str) -> *mut c_char {
    match CString::new(s) {
        Ok(cstr) => cstr.into_raw(),
        Err(_) => ptr::null_mut(),
    }
}

fn result_to_cstr(result: Result<String, TrainingError>) -> *mut c_char {
    match result {
        Ok(json) => string_to_cstr(&json),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

// ============================================================================
// Stateless API
// ============================================================================

/// Score a recorded N-back session (`{level, sequence, responses}`).
///
/// # Safety
/// - `json` must be a valid null-terminated C string.
/// - Returns a newly allocated string that must be freed with `cogtrain_free_string`.
/// - Returns NULL on error; call `cogtrain_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn cogtrain_nback_replay(json: *const c_char) -> *mut c_char {
    clear_last_error();
    let Some(json_str) = cstr_arg(json, "JSON") else {
        return ptr::null_mut();
    };
    result_to_cstr(nback_replay_to_json(json_str))
}

/// Score a recorded attention session (`{level, task_area, frames}`).
///
/// # Safety
/// - `json` must be a valid null-terminated C string.
/// - Returns a newly allocated string that must be freed with `cogtrain_free_string`.
/// - Returns NULL on error; call `cogtrain_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn cogtrain_attention_replay(json: *const c_char) -> *mut c_char {
    clear_last_error();
    let Some(json_str) = cstr_arg(json, "JSON") else {
        return ptr::null_mut();
    };
    result_to_cstr(attention_replay_to_json(json_str))
}

/// Generate a stimulus sequence over the default alphabet.
///
/// Returns `{level, symbols, match_count}` as JSON. The same seed always
/// yields the same sequence.
///
/// # Safety
/// - Returns a newly allocated string that must be freed with `cogtrain_free_string`.
/// - Returns NULL on error; call `cogtrain_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn cogtrain_generate_sequence(length: u32, level: u32, seed: u64) -> *mut c_char {
    clear_last_error();
    let alphabet: Vec<char> = DEFAULT_ALPHABET.chars().collect();
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let result = generate_sequence(
        SequenceParams::new(length as usize, level as usize),
        &alphabet,
        &mut rng,
    )
    .and_then(|sequence| serde_json::to_string(&sequence).map_err(TrainingError::from));
    result_to_cstr(result)
}

// ============================================================================
// Gaze Smoother API
// ============================================================================

/// Opaque handle to a gaze smoother bound to a task area
pub struct SmootherHandle {
    smoother: GazeSmoother,
    area: TaskArea,
}

/// Create a smoother with default parameters for a task area whose top-left
/// corner sits at (`left`, `top`) in page coordinates.
///
/// # Safety
/// - Returns a pointer that must be freed with `cogtrain_smoother_free`.
#[no_mangle]
pub unsafe extern "C" fn cogtrain_smoother_new(left: f64, top: f64) -> *mut SmootherHandle {
    clear_last_error();
    let mut area = AttentionConfig::default().task_area();
    area.left = left;
    area.top = top;
    let smoother = GazeSmoother::new(&SmoothingConfig::default(), area.center());
    Box::into_raw(Box::new(SmootherHandle { smoother, area }))
}

/// Feed one raw page-coordinate sample.
///
/// Writes the smoothed task-relative position to `out_x`/`out_y` and returns
/// 1 when the cursor is inside the task area, 0 when hidden, -1 on error.
///
/// # Safety
/// - `handle` must be a valid pointer returned by `cogtrain_smoother_new`.
/// - `out_x` and `out_y` must be valid for writes.
#[no_mangle]
pub unsafe extern "C" fn cogtrain_smoother_update(
    handle: *mut SmootherHandle,
    x: f64,
    y: f64,
    out_x: *mut f64,
    out_y: *mut f64,
) -> i32 {
    clear_last_error();
    if handle.is_null() || out_x.is_null() || out_y.is_null() {
        set_last_error("Null pointer argument");
        return -1;
    }
    let handle = &mut *handle;
    let sample = GazeSample::new(x, y, 0.0);
    let step = handle.smoother.update(handle.area.to_relative(&sample));
    *out_x = step.position.x;
    *out_y = step.position.y;
    i32::from(handle.area.contains(step.position))
}

/// Free a smoother.
///
/// # Safety
/// - `handle` must be a valid pointer returned by `cogtrain_smoother_new`, or NULL.
#[no_mangle]
pub unsafe extern "C" fn cogtrain_smoother_free(handle: *mut SmootherHandle) {
    if !handle.is_null() {
        drop(Box::from_raw(handle));
    }
}

// ============================================================================
// Stateful Processor API
// ============================================================================

/// Opaque handle to an in-memory training processor
pub struct ProcessorHandle {
    processor: TrainingProcessor<MemoryProfileStore, MemorySessionLog>,
}

/// Create a processor with default configuration and in-memory stores.
///
/// # Safety
/// - Returns a pointer that must be freed with `cogtrain_processor_free`.
/// - Returns NULL on error.
#[no_mangle]
pub unsafe extern "C" fn cogtrain_processor_new() -> *mut ProcessorHandle {
    clear_last_error();
    match TrainingProcessor::in_memory(TrainingConfig::default()) {
        Ok(processor) => Box::into_raw(Box::new(ProcessorHandle { processor })),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

/// Free a processor.
///
/// # Safety
/// - `processor` must be a valid pointer returned by `cogtrain_processor_new`, or NULL.
#[no_mangle]
pub unsafe extern "C" fn cogtrain_processor_free(processor: *mut ProcessorHandle) {
    if !processor.is_null() {
        drop(Box::from_raw(processor));
    }
}

/// Replay an N-back session for a participant, applying promotion and
/// logging the session record. Returns the completion JSON.
///
/// # Safety
/// - `processor` must be a valid pointer returned by `cogtrain_processor_new`.
/// - `user_id`, `group` ("G1".."G4") and `json` must be valid null-terminated C strings.
/// - Returns a newly allocated string that must be freed with `cogtrain_free_string`.
/// - Returns NULL on error; call `cogtrain_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn cogtrain_processor_nback_replay(
    processor: *mut ProcessorHandle,
    user_id: *const c_char,
    group: *const c_char,
    json: *const c_char,
) -> *mut c_char {
    clear_last_error();
    if processor.is_null() {
        set_last_error("Null processor pointer");
        return ptr::null_mut();
    }
    let handle = &mut *processor;

    let Some(user_id) = cstr_arg(user_id, "user_id") else {
        return ptr::null_mut();
    };
    let Some(group_str) = cstr_arg(group, "group") else {
        return ptr::null_mut();
    };
    let Some(group) = Group::parse(&group_str) else {
        set_last_error(&format!("Unknown group: {group_str}"));
        return ptr::null_mut();
    };
    let Some(json_str) = cstr_arg(json, "JSON") else {
        return ptr::null_mut();
    };

    let participant = Participant::new(user_id, group);
    result_to_cstr(handle.processor.process_nback_replay(&participant, &json_str))
}

/// Save profile levels to JSON.
///
/// # Safety
/// - `processor` must be a valid pointer returned by `cogtrain_processor_new`.
/// - Returns a newly allocated string that must be freed with `cogtrain_free_string`.
/// - Returns NULL on error; call `cogtrain_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn cogtrain_processor_save_profiles(processor: *mut ProcessorHandle) -> *mut c_char {
    clear_last_error();
    if processor.is_null() {
        set_last_error("Null processor pointer");
        return ptr::null_mut();
    }
    let handle = &*processor;
    result_to_cstr(handle.processor.save_profiles())
}

/// Load profile levels from JSON.
///
/// # Safety
/// - `processor` must be a valid pointer returned by `cogtrain_processor_new`.
/// - `json` must be a valid null-terminated C string.
/// - Returns 0 on success, -1 on error; call `cogtrain_last_error` for details.
#[no_mangle]
pub unsafe extern "C" fn cogtrain_processor_load_profiles(
    processor: *mut ProcessorHandle,
    json: *const c_char,
) -> i32 {
    clear_last_error();
    if processor.is_null() {
        set_last_error("Null processor pointer");
        return -1;
    }
    let handle = &mut *processor;
    let Some(json_str) = cstr_arg(json, "JSON") else {
        return -1;
    };
    match handle.processor.load_profiles(&json_str) {
        Ok(()) => 0,
        Err(e) => {
            set_last_error(&e.to_string());
            -1
        }
    }
}

// ============================================================================
// Memory Management
// ============================================================================

/// Free a string returned by Cogtrain functions.
///
/// # Safety
/// - `ptr` must be a valid pointer returned by a Cogtrain function, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn cogtrain_free_string(ptr: *mut c_char) {
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
/// - Returns a pointer to a thread-local error string, valid until the next
///   Cogtrain call on this thread. Do NOT free it.
/// - Returns NULL if no error occurred.
#[no_mangle]
pub unsafe extern "C" fn cogtrain_last_error() -> *const c_char {
    LAST_ERROR.with(|e| match &*e.borrow() {
        Some(cstr) => cstr.as_ptr(),
        None => ptr::null(),
    })
}

/// Get the library version.
///
/// # Safety
/// - Returns a pointer to a static string. Do NOT free.
#[no_mangle]
pub unsafe extern "C" fn cogtrain_version() -> *const c_char {
    static VERSION: &[u8] = concat!(env!("CARGO_PKG_VERSION"), "\0").as_bytes();
    VERSION.as_ptr() as *const c_char
}
