//! HMAC-SHA256 signatures used by the payment gateway.
//!
//! Checkout confirmations sign `"{order_ref}|{payment_ref}"` with the API key
//! secret. Webhooks sign the canonical JSON body (sorted keys, compact
//! separators, non-ASCII escaped) with a separate webhook secret.

use std::fmt::Write;

use hmac::{Hmac, Mac};
use serde_json::Value;
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

fn mac(secret: &str) -> HmacSha256 {
    // HMAC accepts keys of any length, so this cannot fail.
    HmacSha256::new_from_slice(secret.as_bytes()).unwrap_or_else(|_| unreachable!())
}

pub fn hmac_sha256_hex(secret: &str, payload: &[u8]) -> String {
    let mut mac = mac(secret);
    mac.update(payload);
    hex::encode(mac.finalize().into_bytes())
}

/// Constant-time comparison of a hex signature against the expected HMAC.
pub fn verify_hmac_sha256_hex(secret: &str, payload: &[u8], signature: &str) -> bool {
    let Ok(provided) = hex::decode(signature.trim()) else {
        return false;
    };
    let mut mac = mac(secret);
    mac.update(payload);
    mac.verify_slice(&provided).is_ok()
}

fn checkout_payload(order_ref: &str, payment_ref: &str) -> String {
    format!("{order_ref}|{payment_ref}")
}

pub fn checkout_signature(order_ref: &str, payment_ref: &str, secret: &str) -> String {
    hmac_sha256_hex(secret, checkout_payload(order_ref, payment_ref).as_bytes())
}

pub fn verify_checkout_signature(
    order_ref: &str,
    payment_ref: &str,
    signature: &str,
    secret: &str,
) -> bool {
    verify_hmac_sha256_hex(
        secret,
        checkout_payload(order_ref, payment_ref).as_bytes(),
        signature,
    )
}

pub fn webhook_signature(payload: &Value, secret: &str) -> String {
    hmac_sha256_hex(secret, canonical_json(payload).as_bytes())
}

pub fn verify_webhook_signature(payload: &Value, signature: &str, secret: &str) -> bool {
    verify_hmac_sha256_hex(secret, canonical_json(payload).as_bytes(), signature)
}

/// Serializes `value` with object keys sorted, no insignificant whitespace and
/// every character outside printable ASCII written as a `\uXXXX` escape.
pub fn canonical_json(value: &Value) -> String {
    let mut out = String::new();
    write_value(value, &mut out);
    out
}

fn write_value(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push('{');
            for (i, key) in keys.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_string(key, out);
                out.push(':');
                write_value(&map[key], out);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_value(item, out);
            }
            out.push(']');
        }
        Value::String(s) => write_string(s, out),
        other => out.push_str(&other.to_string()),
    }
}

fn write_string(s: &str, out: &mut String) {
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{08}' => out.push_str("\\b"),
            '\u{0c}' => out.push_str("\\f"),
            ' '..='~' => out.push(c),
            _ => {
                let mut buf = [0u16; 2];
                for unit in c.encode_utf16(&mut buf) {
                    let _ = write!(out, "\\u{:04x}", unit);
                }
            }
        }
    }
    out.push('"');
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn checkout_signature_round_trips_and_rejects_tampering() {
        let sig = checkout_signature("order_1", "pay_1", "secret");
        assert_eq!(sig.len(), 64);
        assert!(verify_checkout_signature("order_1", "pay_1", &sig, "secret"));
        assert!(!verify_checkout_signature("order_1", "pay_2", &sig, "secret"));
        assert!(!verify_checkout_signature("order_1", "pay_1", &sig, "other"));
        assert!(!verify_checkout_signature("order_1", "pay_1", "not-hex", "secret"));
    }

    #[test]
    fn known_hmac_vector() {
        // RFC 4231 test case 2.
        assert_eq!(
            hmac_sha256_hex("Jefe", b"what do ya want for nothing?"),
            "5bdcc146bf60754e6a042426089575c75a003f089d2739839dec58b964ec3843"
        );
    }

    #[test]
    fn canonical_json_sorts_keys_and_escapes_non_ascii() {
        let value = json!({
            "payload": {"payment": {"entity": {"order_id": "o", "id": "p"}}},
            "event": "payment.captured",
            "note": "café \"x\"",
            "amount": 200,
            "list": [true, null, 1.5]
        });
        assert_eq!(
            canonical_json(&value),
            r#"{"amount":200,"event":"payment.captured","list":[true,null,1.5],"note":"caf\u00e9 \"x\"","payload":{"payment":{"entity":{"id":"p","order_id":"o"}}}}"#
        );
        assert_eq!(canonical_json(&json!("\u{1F600}")), r#""\ud83d\ude00""#);
    }

    #[test]
    fn webhook_signature_ignores_key_order() {
        let a = json!({"b": 1, "a": {"y": 2, "x": 3}});
        let b = json!({"a": {"x": 3, "y": 2}, "b": 1});
        let sig = webhook_signature(&a, "whsec");
        assert!(verify_webhook_signature(&b, &sig, "whsec"));
        assert!(!verify_webhook_signature(&json!({"b": 2}), &sig, "whsec"));
    }
}
