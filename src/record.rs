//! Chat records as fetched from the archive and as handed back to callers.
//!
//! A batch is either entirely encrypted ([`ChatRecords::Encrypted`]) or entirely decrypted
//! ([`ChatRecords::Decrypted`]); a half-decrypted record is unrepresentable. Encrypted batches
//! hold the records exactly as the archive delivered them.

use crate::status::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One unit of chat history as delivered by the archive.
///
/// Fields other than the cursor position and the two encrypted fields are kept verbatim in
/// [`metadata`](Self::metadata).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncryptedRecord {
    /// Monotonic cursor position.
    pub seq: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub msgid: Option<String>,
    /// Version of the public key the symmetric key was wrapped with.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publickey_ver: Option<u32>,
    /// Base64 RSA ciphertext of the per-message symmetric key.
    #[serde(default)]
    pub encrypt_random_key: String,
    /// Symmetrically encrypted payload, opaque to this crate.
    #[serde(default)]
    pub encrypt_chat_msg: String,
    #[serde(flatten)]
    pub metadata: Map<String, Value>,
}

impl EncryptedRecord {
    /// Replace the encrypted fields with the decrypted content.
    #[must_use]
    pub fn into_decrypted(self, content: Value) -> DecryptedRecord {
        DecryptedRecord {
            seq: self.seq,
            msgid: self.msgid,
            publickey_ver: self.publickey_ver,
            decrypt_chat_msg: content,
            metadata: self.metadata,
        }
    }
}

/// A record whose payload has been recovered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecryptedRecord {
    pub seq: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub msgid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publickey_ver: Option<u32>,
    /// The decrypted payload, parsed as JSON.
    pub decrypt_chat_msg: Value,
    #[serde(flatten)]
    pub metadata: Map<String, Value>,
}

impl DecryptedRecord {
    /// Message type of the decrypted payload (`"text"`, `"image"`, ...), if present.
    #[must_use]
    pub fn msgtype(&self) -> Option<&str> {
        self.decrypt_chat_msg.get("msgtype").and_then(Value::as_str)
    }

    /// Media attachment referenced by this record, if any.
    #[must_use]
    pub fn media_ref(&self) -> Option<MediaRef> {
        MediaRef::from_content(&self.decrypt_chat_msg)
    }
}

/// The records of one batch, all in the same state.
#[derive(Debug, Clone, PartialEq)]
pub enum ChatRecords {
    /// Raw `chatdata` entries, untouched.
    Encrypted(Vec<Value>),
    Decrypted(Vec<DecryptedRecord>),
}

impl ChatRecords {
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            ChatRecords::Encrypted(records) => records.len(),
            ChatRecords::Decrypted(records) => records.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sequence ids in batch order.
    #[must_use]
    pub fn seqs(&self) -> Vec<u64> {
        match self {
            ChatRecords::Encrypted(records) => records.iter().filter_map(record_seq).collect(),
            ChatRecords::Decrypted(records) => records.iter().map(|r| r.seq).collect(),
        }
    }

    #[must_use]
    pub fn as_encrypted(&self) -> Option<&[Value]> {
        match self {
            ChatRecords::Encrypted(records) => Some(records),
            ChatRecords::Decrypted(_) => None,
        }
    }

    #[must_use]
    pub fn as_decrypted(&self) -> Option<&[DecryptedRecord]> {
        match self {
            ChatRecords::Decrypted(records) => Some(records),
            ChatRecords::Encrypted(_) => None,
        }
    }

    /// Serialize every record to a JSON value, preserving order.
    pub fn to_json_values(&self) -> Result<Vec<Value>, serde_json::Error> {
        match self {
            ChatRecords::Encrypted(records) => Ok(records.clone()),
            ChatRecords::Decrypted(records) => records.iter().map(serde_json::to_value).collect(),
        }
    }
}

/// Sequence id of a raw `chatdata` entry, if it carries one.
#[must_use]
pub fn record_seq(record: &Value) -> Option<u64> {
    record.get("seq").and_then(Value::as_u64)
}

/// Result of one chat-batch fetch.
///
/// A non-zero [`status`](Self::status) always comes with empty records.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatBatch {
    pub status: StatusCode,
    pub records: ChatRecords,
    /// Sequence ids dropped because their symmetric key could not be recovered.
    pub skipped: Vec<u64>,
    /// Sequence ids dropped because their payload did not decode (only with
    /// [`DecodePolicy::Skip`](crate::builders::DecodePolicy::Skip)).
    pub undecodable: Vec<u64>,
    /// Highest sequence id the service returned, counting dropped records.
    pub last_seq: Option<u64>,
}

impl ChatBatch {
    /// An empty batch carrying a failure status.
    #[must_use]
    pub fn failed(status: StatusCode, decrypted: bool) -> Self {
        let records = if decrypted {
            ChatRecords::Decrypted(Vec::new())
        } else {
            ChatRecords::Encrypted(Vec::new())
        };
        Self {
            status,
            records,
            skipped: Vec::new(),
            undecodable: Vec::new(),
            last_seq: None,
        }
    }

    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.status.is_ok()
    }

    /// Cursor to pass to the next fetch.
    ///
    /// Dropped records still advance the cursor, so a batch full of undecryptable envelopes
    /// is not fetched again forever.
    #[must_use]
    pub fn next_cursor(&self, current: u64) -> u64 {
        self.last_seq.map_or(current, |seq| seq.max(current))
    }
}

/// Reference to a media object carried inside a decrypted message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaRef {
    pub msgtype: String,
    /// Identifier to pass to [`download_media`](crate::download_media).
    pub sdk_file_id: String,
    /// Hex MD5 of the media bytes as announced by the sender.
    pub md5sum: Option<String>,
    pub file_size: Option<u64>,
    pub file_ext: Option<String>,
}

impl MediaRef {
    /// Extract the media reference of a decrypted message body.
    ///
    /// Media messages keep their attachment under a key named after the message type
    /// (`{"msgtype":"image","image":{"sdkfileid":..}}`).
    #[must_use]
    pub fn from_content(content: &Value) -> Option<Self> {
        let msgtype = content.get("msgtype")?.as_str()?;
        let body = content.get(msgtype)?;
        let sdk_file_id = body.get("sdkfileid")?.as_str()?.to_string();
        if sdk_file_id.is_empty() {
            return None;
        }

        let md5sum = body
            .get("md5sum")
            .and_then(Value::as_str)
            .map(str::to_string);
        let file_size = ["filesize", "voice_size", "imagesize"]
            .iter()
            .find_map(|key| body.get(*key).and_then(Value::as_u64));
        let file_ext = body
            .get("fileext")
            .and_then(Value::as_str)
            .filter(|ext| !ext.is_empty())
            .map(str::to_string)
            .or_else(|| default_extension(msgtype, body).map(str::to_string));

        Some(Self {
            msgtype: msgtype.to_string(),
            sdk_file_id,
            md5sum,
            file_size,
            file_ext,
        })
    }
}

fn default_extension(msgtype: &str, body: &Value) -> Option<&'static str> {
    match msgtype {
        "image" => Some("jpg"),
        "voice" => Some("amr"),
        "video" => Some("mp4"),
        "emotion" => match body.get("type").and_then(Value::as_u64) {
            Some(1) => Some("gif"),
            Some(2) => Some("png"),
            _ => None,
        },
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn encrypted_record_keeps_unknown_fields() {
        let raw = json!({
            "seq": 7,
            "msgid": "m-7",
            "publickey_ver": 2,
            "encrypt_random_key": "a2V5",
            "encrypt_chat_msg": "Ym9keQ==",
            "roomid": "r1"
        });
        let record: EncryptedRecord = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(record.seq, 7);
        assert_eq!(record.publickey_ver, Some(2));
        assert_eq!(record.metadata.get("roomid"), Some(&json!("r1")));
        assert_eq!(serde_json::to_value(&record).unwrap(), raw);
    }

    #[test]
    fn decrypted_record_drops_encrypted_fields() {
        let record: EncryptedRecord = serde_json::from_value(json!({
            "seq": 1,
            "msgid": "m-1",
            "encrypt_random_key": "x",
            "encrypt_chat_msg": "y",
        }))
        .unwrap();
        let decrypted = record.into_decrypted(json!({"msgtype": "text"}));
        let value = serde_json::to_value(&decrypted).unwrap();
        assert!(value.get("encrypt_random_key").is_none());
        assert!(value.get("encrypt_chat_msg").is_none());
        assert_eq!(value["decrypt_chat_msg"]["msgtype"], "text");
        assert_eq!(decrypted.msgtype(), Some("text"));
    }

    #[test]
    fn missing_msgid_stays_missing() {
        let raw = json!({"seq": 3, "encrypt_random_key": "k", "encrypt_chat_msg": "c"});
        let record: EncryptedRecord = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(record.msgid, None);
        assert_eq!(serde_json::to_value(&record).unwrap(), raw);

        let decrypted = serde_json::to_value(record.into_decrypted(json!({}))).unwrap();
        assert!(decrypted.get("msgid").is_none());
    }

    #[test]
    fn encrypted_seqs_skip_entries_without_seq() {
        let records = ChatRecords::Encrypted(vec![
            json!({"seq": 4}),
            json!({"msgid": "x"}),
            json!({"seq": 9}),
        ]);
        assert_eq!(records.len(), 3);
        assert_eq!(records.seqs(), vec![4, 9]);
    }

    #[test]
    fn next_cursor_never_moves_backwards() {
        let mut batch = ChatBatch::failed(StatusCode::OK, true);
        assert_eq!(batch.next_cursor(40), 40);
        batch.last_seq = Some(52);
        assert_eq!(batch.next_cursor(40), 52);
        assert_eq!(batch.next_cursor(60), 60);
    }

    #[test]
    fn media_ref_from_each_media_type() {
        let cases = vec![
            (
                json!({"msgtype":"image","image":{"md5sum":"abc","filesize":12,"sdkfileid":"F1"}}),
                Some(("F1", Some("abc"), Some(12), Some("jpg"))),
            ),
            (
                json!({"msgtype":"voice","voice":{"md5sum":"def","voice_size":5,"sdkfileid":"F2"}}),
                Some(("F2", Some("def"), Some(5), Some("amr"))),
            ),
            (
                json!({"msgtype":"file","file":{"filename":"a.pdf","fileext":"pdf","filesize":9,"sdkfileid":"F3"}}),
                Some(("F3", None, Some(9), Some("pdf"))),
            ),
            (
                json!({"msgtype":"emotion","emotion":{"type":1,"imagesize":3,"sdkfileid":"F4"}}),
                Some(("F4", None, Some(3), Some("gif"))),
            ),
            (json!({"msgtype":"text","text":{"content":"hi"}}), None),
            (json!({"msgtype":"image","image":{"sdkfileid":""}}), None),
        ];

        for (content, expected) in cases {
            let got = MediaRef::from_content(&content);
            match expected {
                None => assert!(got.is_none(), "{content}"),
                Some((id, md5, size, ext)) => {
                    let got = got.unwrap_or_else(|| panic!("no media ref in {content}"));
                    assert_eq!(got.sdk_file_id, id);
                    assert_eq!(got.md5sum.as_deref(), md5);
                    assert_eq!(got.file_size, size);
                    assert_eq!(got.file_ext.as_deref(), ext);
                }
            }
        }
    }
}
