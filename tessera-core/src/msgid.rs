//! Message Ids
//!
//! Translation catalogs key messages by an id derived from a template's
//! static text. The id must be identical across implementations because
//! catalogs are persisted, so the layout and hash are fixed:
//!
//! - `0`: scheme version
//! - `h` for markup-tagged templates, `s` for plain strings
//! - 16 lowercase hex digits of a 64-bit FNV-1a hash
//!
//! The hash runs over the UTF-16 code units of the segments joined with
//! U+001E (record separator). Each unit is xor-ed into the state before
//! multiplying by the prime. Dynamic values never take part, so changing
//! only a value keeps the id.

use std::fmt;

use serde::{Deserialize, Serialize};

const VERSION_PREFIX: char = '0';
const HTML_PREFIX: char = 'h';
const STRING_PREFIX: char = 's';

/// Separator placed between segments before hashing.
pub const HASH_DELIMITER: char = '\u{1e}';

const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// A localization message id such as `0h82ccc38d4d46eaa9`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(String);

impl MessageId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for MessageId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Derive the message id of a template's static segments.
pub fn generate_msg_id<S: AsRef<str>>(strings: &[S], is_html_tagged: bool) -> MessageId {
    let mut hash = FNV_OFFSET_BASIS;
    for (index, segment) in strings.iter().enumerate() {
        if index > 0 {
            hash = fnv1a_step(hash, HASH_DELIMITER as u16);
        }
        for unit in segment.as_ref().encode_utf16() {
            hash = fnv1a_step(hash, unit);
        }
    }

    let kind = if is_html_tagged {
        HTML_PREFIX
    } else {
        STRING_PREFIX
    };
    MessageId(format!("{VERSION_PREFIX}{kind}{hash:016x}"))
}

/// Id of a single string message.
pub fn generate_msg_id_for_str(text: &str, is_html_tagged: bool) -> MessageId {
    generate_msg_id(&[text], is_html_tagged)
}

#[inline]
fn fnv1a_step(hash: u64, unit: u16) -> u64 {
    (hash ^ u64::from(unit)).wrapping_mul(FNV_PRIME)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_ids() {
        assert_eq!(
            generate_msg_id(&["Hello <b>", "</b>!"], true).as_str(),
            "0h82ccc38d4d46eaa9"
        );
        assert_eq!(
            generate_msg_id(&["Hello ", "!"], false).as_str(),
            "0s00ad08ebae1e0f74"
        );
    }

    #[test]
    fn test_kind_prefix_changes_only_second_char() {
        let html = generate_msg_id(&["x"], true);
        let plain = generate_msg_id(&["x"], false);

        assert_eq!(html.as_str().len(), 18);
        assert_eq!(&html.as_str()[2..], &plain.as_str()[2..]);
        assert_ne!(html, plain);
    }

    #[test]
    fn test_segment_boundaries_matter() {
        // Should differ: "ab" as one segment vs two segments around a value
        assert_ne!(
            generate_msg_id(&["ab"], false),
            generate_msg_id(&["a", "b"], false)
        );
        assert_eq!(
            generate_msg_id_for_str("a\u{1e}b", false),
            generate_msg_id(&["a", "b"], false)
        );
    }

    #[test]
    fn test_serializes_as_plain_string() {
        let id = generate_msg_id(&["Hello ", "!"], true);
        let json = serde_json::to_string(&id).unwrap();

        assert_eq!(json, "\"0h00ad08ebae1e0f74\"");
        assert_eq!(serde_json::from_str::<MessageId>(&json).unwrap(), id);
    }
}
