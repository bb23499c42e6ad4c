//! Response decoding module
//!
//! The fetch engine hands raw page payloads back untouched; typed
//! resources use these helpers to unwrap the platform's response
//! envelope.

mod envelope;

pub use envelope::{
    check_envelope, decode_list, decode_one, record_count, ApiEnvelope, STATUS_ERROR,
};
