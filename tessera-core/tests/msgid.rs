//! Integration Tests for Message Ids
//!
//! Ids are persisted in translation catalogs, so these pin exact values.

use tessera_core::msgid::{generate_msg_id, generate_msg_id_for_str, MessageId};

/// Test the ids of markup-tagged templates.
#[test]
fn html_template_ids() {
    assert_eq!(
        generate_msg_id(&["Hello <b>", "</b>!"], true).as_str(),
        "0h82ccc38d4d46eaa9"
    );
    assert_eq!(generate_msg_id(&["Hello ", "!"], true).as_str(), "0h00ad08ebae1e0f74");
}

/// Test that plain strings share the hash but not the prefix.
#[test]
fn string_ids_use_their_own_prefix() {
    let id = generate_msg_id(&["Hello <b>", "</b>!"], false);

    assert_eq!(id.as_str(), "0s82ccc38d4d46eaa9");
}

/// Test that where the holes fall is part of the id.
#[test]
fn hole_positions_change_the_id() {
    let joined = generate_msg_id(&["ab"], true);
    let split = generate_msg_id(&["a", "b"], true);

    assert_ne!(joined, split);
    assert_eq!(joined, generate_msg_id_for_str("ab", true));
}

/// Test that ids round-trip through catalogs as plain strings.
#[test]
fn ids_serialize_transparently() {
    let id = generate_msg_id(&["Hello ", "!"], true);

    let json = serde_json::to_string(&id).unwrap();
    let back: MessageId = serde_json::from_str(&json).unwrap();

    assert_eq!(json, "\"0h00ad08ebae1e0f74\"");
    assert_eq!(back, id);
}
