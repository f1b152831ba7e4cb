//! Property-based test generators using proptest.
//!
//! Provides strategies for generating keys in each keyspace, keys that
//! must be rejected, and values.

use proptest::prelude::*;
use stowage_core::{Keyspace, DEFAULT_PUNCTUATION};

/// Strategy for one character of the default keyspace.
pub fn default_key_char_strategy() -> impl Strategy<Value = char> {
    let alphabet: Vec<char> = ('a'..='z')
        .chain('A'..='Z')
        .chain('0'..='9')
        .chain(DEFAULT_PUNCTUATION.chars())
        .collect();
    prop::sample::select(alphabet)
}

/// Strategy for keys valid in the default keyspace.
pub fn default_key_strategy() -> impl Strategy<Value = String> {
    prop::collection::vec(default_key_char_strategy(), 1..48)
        .prop_map(|chars| chars.into_iter().collect())
}

/// Strategy for keys valid in the extended keyspace.
///
/// Segments are joined with `/` and may contain inner spaces.
pub fn extended_key_strategy() -> impl Strategy<Value = String> {
    let segment = prop_oneof![
        4 => prop::string::string_regex("[a-zA-Z0-9._-]([a-zA-Z0-9._ -]{0,10}[a-zA-Z0-9._-])?")
            .expect("Invalid regex"),
        1 => prop::sample::select(vec![".".to_string(), "..".to_string()]),
    ];
    prop::collection::vec(segment, 1..5).prop_map(|segments| segments.join("/"))
}

/// Strategy for keys that no keyspace accepts.
pub fn invalid_key_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        Just(String::new()),
        "[a-z]{0,8}[*:;|\\\\\t\n][a-z]{0,8}",
        "[a-z]{0,8}[äöüé€][a-z]{0,8}",
        "/[a-z]{1,8}",
        "[a-z]{1,8}/",
        "[a-z]{1,8}//[a-z]{1,8}",
    ]
}

/// Strategy for keys of the given keyspace.
pub fn key_strategy(keyspace: Keyspace) -> BoxedStrategy<String> {
    match keyspace {
        Keyspace::Default => default_key_strategy().boxed(),
        Keyspace::Extended => prop_oneof![default_key_strategy(), extended_key_strategy()].boxed(),
    }
}

/// Strategy for stored values (arbitrary bytes, possibly empty).
pub fn value_strategy() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..2048)
}

/// A reader operation for model-based testing.
#[derive(Debug, Clone)]
pub enum ReaderOp {
    /// Seek with offset and whence code.
    Seek(i64, i32),
    /// Read at most this many bytes.
    Read(usize),
    /// Read to the end.
    ReadAll,
    /// Query the position.
    Tell,
}

/// Strategy for a single reader operation.
pub fn reader_op_strategy() -> impl Strategy<Value = ReaderOp> {
    prop_oneof![
        (-64i64..4096, 0i32..3).prop_map(|(offset, whence)| ReaderOp::Seek(offset, whence)),
        (0usize..512).prop_map(ReaderOp::Read),
        Just(ReaderOp::ReadAll),
        Just(ReaderOp::Tell),
    ]
}

/// Strategy for a sequence of reader operations.
pub fn reader_ops_strategy(max_ops: usize) -> impl Strategy<Value = Vec<ReaderOp>> {
    prop::collection::vec(reader_op_strategy(), 1..max_ops)
}
