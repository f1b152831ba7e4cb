//! Backend conformance suite.
//!
//! Every backend, in both keyspaces, must pass these checks. Each suite
//! expects an empty store and leaves it empty again on success. Failures
//! panic with a message naming the violated behavior.

use std::io::{self, Cursor, Read, Seek, SeekFrom};

use stowage_core::{ErrorKind, KeyValueStore, Keyspace, StoreResult, Whence};

use crate::fixtures::scenarios::long_value;
use crate::generators::ReaderOp;

fn assert_kind<T>(result: StoreResult<T>, expected: ErrorKind, what: &str) {
    match result {
        Ok(_) => panic!("{what}: expected {expected:?}, got Ok"),
        Err(e) => assert_eq!(e.kind(), expected, "{what}: {e}"),
    }
}

fn sorted_keys<S: KeyValueStore>(store: &S, prefix: Option<&str>) -> Vec<String> {
    let mut keys = store.keys(prefix).expect("Failed to list keys");
    keys.sort();
    keys
}

fn clear<S: KeyValueStore>(store: &S) {
    for key in store.keys(None).expect("Failed to list keys") {
        store.delete(&key).expect("Failed to delete key");
    }
}

/// Checks put, get, delete, listing, copy, move and key validation.
pub fn run_basic_suite<S: KeyValueStore>(store: &S) {
    assert!(sorted_keys(store, None).is_empty(), "suite needs an empty store");

    // Round trip and overwrite
    let key = store.put("key1", b"value1").expect("put");
    assert_eq!(key, "key1");
    assert_eq!(store.get("key1").expect("get"), b"value1");
    store.put("key1", b"value2").expect("overwrite");
    assert_eq!(store.get("key1").expect("get"), b"value2");
    assert!(store.contains("key1").expect("contains"));

    // Binary and empty values
    let binary: Vec<u8> = (0..=255u8).collect();
    store.put("binary", &binary).expect("put binary");
    assert_eq!(store.get("binary").expect("get binary"), binary);
    store.put("empty", b"").expect("put empty");
    assert!(store.get("empty").expect("get empty").is_empty());
    assert_eq!(store.open("empty").expect("open empty").len(), 0);

    // Missing keys
    assert_kind(store.get("missing"), ErrorKind::NotFound, "get missing");
    assert_kind(store.open("missing"), ErrorKind::NotFound, "open missing");
    assert!(!store.contains("missing").expect("contains missing"));

    // Idempotent delete
    store.delete("key1").expect("delete");
    store.delete("key1").expect("delete again");
    store.delete("never-existed").expect("delete absent");
    assert_kind(store.get("key1"), ErrorKind::NotFound, "get deleted");

    // Key validation
    let too_long = "k".repeat(store.base().max_key_len() + 1);
    for bad in ["", "a*b", "a\\b", "a\nb", too_long.as_str()] {
        assert_kind(store.put(bad, b"v"), ErrorKind::InvalidKey, "put invalid");
        assert_kind(store.get(bad), ErrorKind::InvalidKey, "get invalid");
        assert_kind(store.open(bad), ErrorKind::InvalidKey, "open invalid");
        assert_kind(store.delete(bad), ErrorKind::InvalidKey, "delete invalid");
        assert_kind(store.contains(bad), ErrorKind::InvalidKey, "contains invalid");
    }
    if store.keyspace() == Keyspace::Default {
        for bad in ["a/b", "a b"] {
            assert_kind(store.put(bad, b"v"), ErrorKind::InvalidKey, "put extended key");
        }
    }
    let longest = "k".repeat(store.base().max_key_len());
    store.put(&longest, b"v").expect("put longest key");
    store.delete(&longest).expect("delete longest key");

    // Punctuation
    let punctuated = "!\"#$%&'()+,-.<=>?@[]^_{}~`";
    store.put(punctuated, b"p").expect("put punctuated");
    assert_eq!(store.get(punctuated).expect("get punctuated"), b"p");
    store.delete(punctuated).expect("delete punctuated");

    // Dot-only keys are ordinary keys
    for key in [".", "..", "..."] {
        store.put(key, key.as_bytes()).expect("put dot key");
    }
    assert_eq!(sorted_keys(store, Some(".")), [".", "..", "..."]);
    for key in [".", "..", "..."] {
        assert_eq!(store.get(key).expect("get dot key"), key.as_bytes());
        store.delete(key).expect("delete dot key");
    }

    // Listing
    store.delete("binary").expect("delete binary");
    store.delete("empty").expect("delete empty");
    for key in ["a.1", "a.2", "b.1"] {
        store.put(key, key.as_bytes()).expect("put listing key");
    }
    assert_eq!(sorted_keys(store, None), ["a.1", "a.2", "b.1"]);
    assert_eq!(sorted_keys(store, Some("a.")), ["a.1", "a.2"]);
    assert!(sorted_keys(store, Some("zzz")).is_empty());

    // Copy and move
    assert_eq!(store.copy("a.1", "c.1").expect("copy"), "c.1");
    assert_eq!(store.get("a.1").expect("copy source"), b"a.1");
    assert_eq!(store.get("c.1").expect("copy dest"), b"a.1");
    store.move_key("a.2", "c.2").expect("move");
    assert!(!store.contains("a.2").expect("moved source"));
    assert_eq!(store.get("c.2").expect("moved dest"), b"a.2");
    store.move_key("c.2", "c.2").expect("move onto itself");
    assert_eq!(store.get("c.2").expect("self move"), b"a.2");
    assert_kind(store.copy("missing", "x"), ErrorKind::NotFound, "copy missing");
    assert_kind(store.move_key("missing", "x"), ErrorKind::NotFound, "move missing");

    // Streaming
    let big = long_value();
    store.put_from("stream", &mut Cursor::new(&big)).expect("put_from");
    let mut out = Vec::new();
    let written = store.get_into("stream", &mut out).expect("get_into");
    assert_eq!(written, big.len() as u64);
    assert_eq!(out, big);

    clear(store);
    assert!(sorted_keys(store, None).is_empty());
}

/// Checks the random-access reader's seek, tell and read behavior.
pub fn run_reader_suite<S: KeyValueStore>(store: &S) {
    let value = long_value();
    let len = value.len() as u64;
    store.put("reader", &value).expect("put");

    let mut reader = store.open("reader").expect("open");
    assert!(reader.seekable().expect("seekable"));
    assert!(reader.readable().expect("readable"));
    assert_eq!(reader.len(), len);

    reader.seek_code(10, 0).expect("seek start");
    assert_eq!(reader.tell().expect("tell"), 10);
    reader.seek_code(-6, 1).expect("seek current");
    assert_eq!(reader.tell().expect("tell"), 4);

    assert_kind(reader.seek_code(-1, 0), ErrorKind::InvalidOperation, "negative from start");
    assert_kind(reader.seek_code(-6, 1), ErrorKind::InvalidOperation, "negative from current");
    assert_kind(
        reader.seek_code(-(len as i64) - 1, 2),
        ErrorKind::InvalidOperation,
        "negative from end",
    );
    assert_kind(reader.seek_code(0, 3), ErrorKind::InvalidOperation, "bad whence");
    assert_eq!(reader.tell().expect("tell"), 4, "failed seeks keep position");

    assert_eq!(reader.read_bytes(Some(1)).expect("read"), &value[4..5]);
    assert_eq!(reader.tell().expect("tell"), 5);

    reader.seek_code(-1, 2).expect("seek end");
    assert_eq!(reader.read_bytes(Some(1)).expect("read last"), &value[value.len() - 1..]);
    assert_eq!(reader.tell().expect("tell"), len);

    reader.seek_code(len as i64 + 10, 0).expect("seek past end");
    assert_eq!(reader.tell().expect("tell"), len + 10);
    assert!(reader.read_bytes(None).expect("read past end").is_empty());
    assert_eq!(reader.tell().expect("tell"), len + 10);

    // Partial read at the end
    reader.seek(-3, Whence::End).expect("seek");
    assert_eq!(reader.read_bytes(Some(100)).expect("short read"), &value[value.len() - 3..]);

    // Read with no limit from the middle
    reader.seek(100, Whence::Start).expect("seek");
    assert_eq!(reader.read_to_end_bytes().expect("read rest"), &value[100..]);

    reader.close();
    reader.close();
    assert!(reader.is_closed());
    assert_kind(reader.tell(), ErrorKind::InvalidOperation, "tell after close");
    assert_kind(reader.read_bytes(Some(1)), ErrorKind::InvalidOperation, "read after close");
    assert_kind(reader.seek_code(10, 0), ErrorKind::InvalidOperation, "seek after close");
    assert_kind(reader.readable(), ErrorKind::InvalidOperation, "readable after close");
    assert_eq!(store.get("reader").expect("value survives close"), value);

    // std::io adapters
    let mut reader = store.open("reader").expect("reopen");
    Seek::seek(&mut reader, SeekFrom::End(-10)).expect("io seek");
    let mut tail = Vec::new();
    reader.read_to_end(&mut tail).expect("io read");
    assert_eq!(tail, &value[value.len() - 10..]);
    let err = Seek::seek(&mut reader, SeekFrom::Current(-(len as i64) - 1)).unwrap_err();
    assert_eq!(err.kind(), io::ErrorKind::InvalidInput);

    // Readers are independent
    let mut first = store.open("reader").expect("open first");
    let mut second = store.open("reader").expect("open second");
    first.seek(7, Whence::Start).expect("seek first");
    assert_eq!(second.tell().expect("tell second"), 0);
    assert_eq!(first.read_bytes(Some(3)).expect("read first"), &value[7..10]);
    assert_eq!(second.read_bytes(Some(3)).expect("read second"), &value[..3]);

    store.delete("reader").expect("delete");
}

/// Checks keys with `/` separators and spaces.
///
/// `store` must use [`Keyspace::Extended`].
pub fn run_extended_keyspace_suite<S: KeyValueStore>(store: &S) {
    assert_eq!(store.keyspace(), Keyspace::Extended, "suite needs an extended store");

    for key in ["a/b", "a/c/d", "with space", "dir/file name.txt", "plain", "./x", "d/../e"] {
        store.put(key, key.as_bytes()).expect("put extended key");
        assert_eq!(store.get(key).expect("get extended key"), key.as_bytes());
        let mut reader = store.open(key).expect("open extended key");
        assert_eq!(reader.read_to_end_bytes().expect("read"), key.as_bytes());
    }

    assert_eq!(sorted_keys(store, Some("a/")), ["a/b", "a/c/d"]);
    assert_eq!(
        sorted_keys(store, None),
        ["./x", "a/b", "a/c/d", "d/../e", "dir/file name.txt", "plain", "with space"]
    );

    let mut top: Vec<String> = store
        .iter_prefixes('/', None)
        .expect("iter_prefixes")
        .collect::<StoreResult<_>>()
        .expect("prefix listing");
    top.sort();
    assert_eq!(top, ["./", "a/", "d/", "dir/", "plain", "with space"]);

    for bad in ["/a", "a/", "a//b", "/", "a*b"] {
        assert_kind(store.put(bad, b"v"), ErrorKind::InvalidKey, "put bad extended key");
        assert_kind(store.get(bad), ErrorKind::InvalidKey, "get bad extended key");
    }

    store.copy("a/b", "x/y/z").expect("copy nested");
    store.move_key("a/c/d", "x/moved").expect("move nested");
    assert_eq!(store.get("x/y/z").expect("copied"), b"a/b");
    assert_eq!(store.get("x/moved").expect("moved"), b"a/c/d");

    clear(store);
    assert!(sorted_keys(store, None).is_empty());
}

/// Replays `ops` against a reader over `value` and an in-memory model,
/// asserting that both agree at every step.
pub fn check_reader_model<S: KeyValueStore>(store: &S, key: &str, value: &[u8], ops: &[ReaderOp]) {
    store.put(key, value).expect("put");
    let mut reader = store.open(key).expect("open");
    let mut position: i128 = 0;
    let len = value.len() as i128;

    for op in ops {
        match *op {
            ReaderOp::Seek(offset, whence) => {
                let base = match whence {
                    0 => 0,
                    1 => position,
                    _ => len,
                };
                let target = base + i128::from(offset);
                let result = reader.seek_code(offset, whence);
                if target < 0 {
                    assert_kind(result, ErrorKind::InvalidOperation, "model seek");
                } else {
                    assert_eq!(result.expect("model seek") as i128, target);
                    position = target;
                }
            }
            ReaderOp::Read(limit) => {
                let got = reader.read_bytes(Some(limit)).expect("model read");
                let start = position.min(len) as usize;
                let end = (position + limit as i128).min(len).max(start as i128) as usize;
                assert_eq!(got, &value[start..end]);
                position += got.len() as i128;
            }
            ReaderOp::ReadAll => {
                let got = reader.read_bytes(None).expect("model read all");
                let start = position.min(len) as usize;
                assert_eq!(got, &value[start..]);
                position += got.len() as i128;
            }
            ReaderOp::Tell => {
                assert_eq!(reader.tell().expect("model tell") as i128, position);
            }
        }
    }

    reader.close();
    store.delete(key).expect("delete");
}
