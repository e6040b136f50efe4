// src/ingest/identity.rs
use serde_json::Value;

use crate::ingest::types::{RawTokenRecord, TokenIdentity};

/// Field names carrying the token symbol, highest priority first.
pub const SYMBOL_KEYS: &[&str] = &["symbol", "currency", "code", "ticker", "name"];

/// Field names carrying the issuing account, highest priority first.
pub const ISSUER_KEYS: &[&str] = &[
    "issuer",
    "issuerAddress",
    "issuer_address",
    "issuer_raddress",
    "account",
    "issuerAccount",
    "issuer_account",
];

/// First non-empty value among `keys`, coerced to a trimmed string.
pub fn lookup_first(record: &RawTokenRecord, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|k| record.get(*k))
        .filter_map(coerce)
        .find(|s| !s.is_empty())
}

fn coerce(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        // null / nested structures don't name anything
        _ => None,
    }
}

/// Records without a usable symbol and issuer are skipped, not errors.
pub fn extract(record: &RawTokenRecord) -> Option<TokenIdentity> {
    let symbol = lookup_first(record, SYMBOL_KEYS)?;
    let issuer = lookup_first(record, ISSUER_KEYS)?;
    TokenIdentity::new(&symbol, &issuer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rec(v: Value) -> RawTokenRecord {
        match v {
            Value::Object(m) => m,
            _ => unreachable!("test records are objects"),
        }
    }

    #[test]
    fn symbol_wins_over_currency() {
        let id = extract(&rec(json!({"symbol": "AAA", "currency": "BBB", "issuer": "rI"}))).unwrap();
        assert_eq!(id.symbol(), "AAA");
    }

    #[test]
    fn currency_used_when_symbol_absent() {
        let id = extract(&rec(json!({"currency": "BBB", "issuer": "rI"}))).unwrap();
        assert_eq!(id.symbol(), "BBB");
    }

    #[test]
    fn blank_symbol_falls_through_to_next_key() {
        let id = extract(&rec(json!({"symbol": "  ", "ticker": "TKR", "account": "rAcc"}))).unwrap();
        assert_eq!(id.key(), "TKR:rAcc");
    }

    #[test]
    fn issuer_priority_order() {
        let id = extract(&rec(json!({
            "symbol": "S",
            "account": "rLow",
            "issuer_address": "rMid",
            "issuerAddress": "rHigh"
        })))
        .unwrap();
        assert_eq!(id.issuer(), "rHigh");
    }

    #[test]
    fn values_are_trimmed_and_coerced() {
        let id = extract(&rec(json!({"code": 420, "issuer": "  rT  "}))).unwrap();
        assert_eq!(id.key(), "420:rT");
    }

    #[test]
    fn missing_or_empty_parts_are_absent() {
        assert!(extract(&rec(json!({"symbol": "", "issuer": "rBBB"}))).is_none());
        assert!(extract(&rec(json!({"symbol": "S"}))).is_none());
        assert!(extract(&rec(json!({"symbol": null, "issuer": "rX"}))).is_none());
        assert!(extract(&rec(json!({"symbol": {"v": 1}, "issuer": "rX"}))).is_none());
    }
}
