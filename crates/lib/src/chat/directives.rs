//! Hidden `<!--NAME:{json}-->` directives carried inside message text.
//!
//! The client embeds `METADATA` and `TOOL_APPROVAL` in the user's message; the model
//! embeds `UPDATE_CAMPAIGN` and `SOCIAL_ACTION` in its reply. Both sides strip them
//! before the text is shown or sent on.

use regex::Regex;
use serde::de::DeserializeOwned;
use tracing::warn;

pub const METADATA: &str = "METADATA";
pub const TOOL_APPROVAL: &str = "TOOL_APPROVAL";
pub const UPDATE_CAMPAIGN: &str = "UPDATE_CAMPAIGN";
pub const SOCIAL_ACTION: &str = "SOCIAL_ACTION";

fn directive_regex(name: &str) -> Option<Regex> {
    Regex::new(&format!(r"\s*<!--{}:([\s\S]+?)-->", regex::escape(name))).ok()
}

/// Parses the first `name` directive in `text` and returns it with the text minus the
/// directive.
///
/// A directive whose payload is not valid JSON for `T` is left in place.
pub fn take_directive<T: DeserializeOwned>(text: &str, name: &str) -> (Option<T>, String) {
    let Some(re) = directive_regex(name) else {
        return (None, text.to_string());
    };
    let Some(captures) = re.captures(text) else {
        return (None, text.to_string());
    };
    let (Some(whole), Some(payload)) = (captures.get(0), captures.get(1)) else {
        return (None, text.to_string());
    };

    match serde_json::from_str::<T>(payload.as_str().trim()) {
        Ok(value) => {
            let mut stripped = String::with_capacity(text.len());
            stripped.push_str(&text[..whole.start()]);
            stripped.push_str(&text[whole.end()..]);
            (Some(value), stripped)
        }
        Err(e) => {
            warn!(directive = %name, "Ignoring malformed directive: {e}");
            (None, text.to_string())
        }
    }
}

/// Wraps `payload` as a directive, the way the client embeds it.
pub fn render_directive(name: &str, payload: &serde_json::Value) -> String {
    format!("<!--{name}:{payload}-->")
}
