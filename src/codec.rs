//! Byte encodings for persisted records.
//!
//! Keys are the record id as 8 big-endian bytes, so bytewise key order in the
//! engine matches numeric order. Values are JSON objects carrying the record's
//! fields; the encoding is not versioned per record.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::db::Bucket;
use crate::error::{RecordKind, Result, StoreError};
use crate::model::{Tag, Task};

pub const KEY_LEN: usize = 8;

/// A value stored in one of the store's partitions.
pub trait Record: Serialize + DeserializeOwned {
    const BUCKET: Bucket;

    fn key(&self) -> u64;
}

impl Record for Task {
    const BUCKET: Bucket = Bucket::Tasks;

    fn key(&self) -> u64 {
        self.key
    }
}

impl Record for Tag {
    const BUCKET: Bucket = Bucket::Tags;

    fn key(&self) -> u64 {
        self.key
    }
}

pub fn encode_key(id: u64) -> [u8; KEY_LEN] {
    id.to_be_bytes()
}

pub fn decode_key(kind: RecordKind, bytes: &[u8]) -> Result<u64> {
    let raw: [u8; KEY_LEN] = bytes.try_into().map_err(|_| StoreError::InvalidKey {
        kind,
        len: bytes.len(),
    })?;
    Ok(u64::from_be_bytes(raw))
}

pub fn encode<R: Record>(record: &R) -> Result<Vec<u8>> {
    serde_json::to_vec(record).map_err(|source| StoreError::Encode {
        kind: R::BUCKET.kind(),
        key: record.key(),
        source,
    })
}

pub fn decode<R: Record>(key: u64, bytes: &[u8]) -> Result<R> {
    serde_json::from_slice(bytes).map_err(|source| StoreError::Decode {
        kind: R::BUCKET.kind(),
        key,
        source,
    })
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;

    #[test]
    fn key_order_matches_numeric_order() {
        let ids = [1u64, 2, 255, 256, 65_536, u64::MAX / 2, u64::MAX];
        for pair in ids.windows(2) {
            assert!(encode_key(pair[0]) < encode_key(pair[1]));
        }
    }

    #[test]
    fn key_is_big_endian() {
        assert_eq!(encode_key(1), [0, 0, 0, 0, 0, 0, 0, 1]);
        assert_eq!(decode_key(RecordKind::Task, &[0, 0, 0, 0, 0, 0, 1, 0]).unwrap(), 256);
    }

    #[test]
    fn short_key_is_rejected() {
        let err = decode_key(RecordKind::Tag, &[1, 2, 3]).unwrap_err();
        assert!(matches!(err, StoreError::InvalidKey { len: 3, .. }));
        assert!(err.is_encoding());
    }

    #[test]
    fn task_survives_encoding() {
        let mut task = Task::new(
            12,
            "acheter du pain 🥖 — ünïcödé",
            Utc.with_ymd_and_hms(2024, 2, 29, 23, 59, 1).unwrap(),
        );
        task.completed = true;
        task.tags = vec![3, 1];

        let bytes = encode(&task).unwrap();
        assert_eq!(decode::<Task>(12, &bytes).unwrap(), task);
    }

    #[test]
    fn empty_text_survives_encoding() {
        let tag = Tag::new(1, "");
        let bytes = encode(&tag).unwrap();
        assert_eq!(decode::<Tag>(1, &bytes).unwrap(), tag);
    }

    #[test]
    fn fractional_timestamps_survive_encoding() {
        let at = Utc.timestamp_opt(1_700_000_000, 123_456_789).unwrap();
        let task = Task::new(1, "t", at);
        let decoded: Task = decode(1, &encode(&task).unwrap()).unwrap();
        assert_eq!(decoded.time_added, at);
    }

    #[test]
    fn offset_timestamps_decode_to_utc() {
        let bytes = br#"{"key":4,"value":"call mom","timeAdded":"2022-05-01T09:30:00.5+02:00","completed":true,"tags":[2]}"#;
        let task: Task = decode(4, bytes).unwrap();
        assert_eq!(
            task.time_added,
            Utc.with_ymd_and_hms(2022, 5, 1, 7, 30, 0).unwrap() + chrono::Duration::milliseconds(500)
        );
        assert!(task.completed);
        assert_eq!(task.tags, vec![2]);
    }

    #[test]
    fn wrong_record_type_is_a_decode_error() {
        let tag = Tag::new(1, "errands");
        let bytes = encode(&tag).unwrap();
        let err = decode::<Task>(1, &bytes).unwrap_err();
        assert!(matches!(
            err,
            StoreError::Decode {
                kind: RecordKind::Task,
                key: 1,
                ..
            }
        ));
    }

    #[test]
    fn garbage_is_a_decode_error() {
        let err = decode::<Tag>(9, b"\x00\x01not json").unwrap_err();
        assert!(err.is_encoding());
    }
}
