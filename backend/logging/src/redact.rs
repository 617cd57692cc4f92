//! Log Redaction Layer
//!
//! Scrubs API keys and bearer tokens, and collapses inline image data so a
//! single scan does not write megabytes of base64 into the log.

use regex::{Captures, Regex};
use serde_json::Value;
use std::sync::LazyLock;

static API_KEY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(sk-[a-zA-Z0-9_-]{20,})|(AIza[0-9A-Za-z_-]{30,})|(Bearer\s+[a-zA-Z0-9\-\._~+/]+=*)")
        .expect("api key regex")
});

static KEY_PARAM_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"([?&](?:key|apikey|api_key|token)=)[^&#\s]+").expect("key param regex")
});

static DATA_URL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"data:([a-z]+/[a-z0-9.+-]+);base64,([A-Za-z0-9+/=]+)").expect("data url regex")
});

/// Redacts sensitive patterns in a string.
pub fn redact_sensitive_data(input: &str) -> String {
    // Image data first, so base64 runs are never mistaken for keys.
    let redacted = DATA_URL_RE.replace_all(input, |caps: &Captures| {
        format!("data:{};base64,[{} chars]", &caps[1], caps[2].len())
    });
    let redacted = API_KEY_RE.replace_all(&redacted, "[REDACTED_TOKEN]");
    KEY_PARAM_RE
        .replace_all(&redacted, "${1}[REDACTED]")
        .into_owned()
}

/// Apply `redact_sensitive_data` to every string inside a JSON value.
pub fn redact_json(value: &Value) -> Value {
    match value {
        Value::String(s) => Value::String(redact_sensitive_data(s)),
        Value::Array(arr) => Value::Array(arr.iter().map(redact_json).collect()),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), redact_json(v)))
                .collect(),
        ),
        other => other.clone(),
    }
}
