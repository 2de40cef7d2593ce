// src/ingest/mod.rs
pub mod http;
pub mod providers;
pub mod types;

use once_cell::sync::OnceCell;
use regex::Regex;
use serde::{Deserialize, Deserializer};

/// Maximum characters kept from a post body.
const MAX_TEXT_CHARS: usize = 1500;

/// Normalize post text: decode entities, strip tags, fold quotes, collapse whitespace.
pub fn normalize_text(s: &str) -> String {
    // <br> becomes a space before tags go away
    static RE_BR: OnceCell<Regex> = OnceCell::new();
    let re_br = RE_BR.get_or_init(|| Regex::new(r"(?i)<br\s*/?>").expect("valid regex"));
    let out = re_br.replace_all(s, " ");

    static RE_TAGS: OnceCell<Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| Regex::new(r"(?is)</?[^>]+>").expect("valid regex"));
    let out = re_tags.replace_all(&out, "");

    // Decode after stripping so escaped brackets survive as text
    let mut out = html_escape::decode_html_entities(&out).to_string();

    out = out
        .replace(['\u{201C}', '\u{201D}', '\u{00AB}', '\u{00BB}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'");

    static RE_WS: OnceCell<Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| Regex::new(r"\s+").expect("valid regex"));
    out = re_ws.replace_all(&out, " ").trim().to_string();

    if out.chars().count() > MAX_TEXT_CHARS {
        out = out.chars().take(MAX_TEXT_CHARS).collect();
    }

    out
}

/// Upstream APIs send `null` where a list or string is simply empty.
pub(crate) fn null_as_default<'de, D, T>(de: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(de)?.unwrap_or_default())
}
