// src/nmea/mod.rs
//! NMEA-0183 stream framing and sentence decoding

pub mod fields;
pub mod framer;
pub mod sentence;

pub use framer::{SentenceFramer, MAX_SENTENCE_LEN};
pub use sentence::decode_sentence;
