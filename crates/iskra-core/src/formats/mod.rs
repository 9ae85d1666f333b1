//! # Persistence Formats
//!
//! The self-describing textual record a session serializes to, and the
//! defensive restore path back.

pub mod snapshot;

pub use snapshot::{
    GraphSnapshot, SessionRecord, decode_record, encode_record, RECORD_VERSION,
};
