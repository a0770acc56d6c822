//! Cache-Control parser/emitter (§4.A).
//!
//! Directives are parsed into typed structs for the request and response
//! forms. Unknown directives are preserved by name (and raw value, if any)
//! in `extensions` but never interpreted. Duplicate directives collapse
//! last-wins, matching how a `HashMap` insert naturally behaves when fed in
//! header order. A malformed token is dropped; the rest of the list still
//! parses.

use std::collections::HashMap;

/// An unparsed directive name/value pair, as preserved for directives this
/// crate doesn't assign semantics to.
pub type Extensions = HashMap<Box<str>, Option<Box<str>>>;

fn parse_raw(value: &str) -> HashMap<Box<str>, Option<Box<str>>> {
    let mut map = HashMap::new();
    for token in split_top_level_commas(value) {
        let token = token.trim();
        if token.is_empty() {
            continue;
        }
        let (name, val) = match token.split_once('=') {
            Some((n, v)) => (n.trim(), Some(unquote(v.trim()))),
            None => (token, None),
        };
        if name.is_empty() || !name.bytes().all(is_token_byte) {
            // malformed directive name; drop this token only.
            continue;
        }
        map.insert(name.to_ascii_lowercase().into_boxed_str(), val);
    }
    map
}

fn is_token_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'-' || b == b'_' || b == b'.'
}

/// Splits on commas that aren't inside a quoted-string.
fn split_top_level_commas(s: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut in_quotes = false;
    let mut start = 0;
    for (i, b) in s.bytes().enumerate() {
        match b {
            b'"' => in_quotes = !in_quotes,
            b',' if !in_quotes => {
                parts.push(&s[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&s[start..]);
    parts
}

fn unquote(v: &str) -> Box<str> {
    if v.len() >= 2 && v.starts_with('"') && v.ends_with('"') {
        v[1..v.len() - 1].into()
    } else {
        v.into()
    }
}

fn parse_delta_seconds(v: &str) -> Option<u64> {
    v.parse::<u64>().ok().or_else(|| v.parse::<i64>().ok().map(|_| 0))
}

fn parse_field_list(v: &str) -> Vec<Box<str>> {
    v.split(',').map(|f| f.trim().to_ascii_lowercase().into_boxed_str()).collect()
}

/// Canonical order used when re-emitting directives (§8's round-trip law
/// only requires a deterministic order, not a specific one).
const REQUEST_ORDER: &[&str] = &[
    "no-cache",
    "no-store",
    "max-age",
    "max-stale",
    "min-fresh",
    "no-transform",
    "only-if-cached",
    "stale-if-error",
];

const RESPONSE_ORDER: &[&str] = &[
    "public",
    "private",
    "no-cache",
    "no-store",
    "no-transform",
    "must-revalidate",
    "proxy-revalidate",
    "max-age",
    "s-maxage",
    "stale-while-revalidate",
    "stale-if-error",
    "immutable",
];

fn emit(
    known: Vec<(&'static str, Option<String>)>,
    order: &[&str],
    extensions: &Extensions,
) -> String {
    let mut out = String::new();
    let mut push = |name: &str, val: Option<&str>| {
        if !out.is_empty() {
            out.push(',');
        }
        out.push_str(name);
        if let Some(v) = val {
            out.push('=');
            out.push_str(v);
        }
    };
    for name in order {
        if let Some((_, val)) = known.iter().find(|(n, _)| n == name) {
            push(name, val.as_deref());
        }
    }
    let mut ext_names: Vec<&str> = extensions.keys().map(|k| k.as_ref()).collect();
    ext_names.sort_unstable();
    for name in ext_names {
        push(name, extensions.get(name).and_then(|v| v.as_deref()));
    }
    out
}

/// Request-direction `Cache-Control` (§3 "Request" directive set).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestCacheControl {
    pub no_cache: bool,
    pub no_store: bool,
    pub max_age: Option<u64>,
    /// `Some(None)` is unbounded `max-stale` (no value given).
    pub max_stale: Option<Option<u64>>,
    pub min_fresh: Option<u64>,
    pub no_transform: bool,
    pub only_if_cached: bool,
    pub stale_if_error: Option<u64>,
    pub extensions: Extensions,
}

impl RequestCacheControl {
    pub fn parse(value: &str) -> Self {
        let mut raw = parse_raw(value);
        let mut cc = RequestCacheControl {
            no_cache: raw.remove("no-cache").is_some(),
            no_store: raw.remove("no-store").is_some(),
            max_age: raw.remove("max-age").and_then(|v| v.and_then(|v| parse_delta_seconds(&v))),
            no_transform: raw.remove("no-transform").is_some(),
            only_if_cached: raw.remove("only-if-cached").is_some(),
            stale_if_error: raw
                .remove("stale-if-error")
                .and_then(|v| v.and_then(|v| parse_delta_seconds(&v))),
            min_fresh: raw.remove("min-fresh").and_then(|v| v.and_then(|v| parse_delta_seconds(&v))),
            max_stale: None,
            extensions: HashMap::new(),
        };
        if let Some(v) = raw.remove("max-stale") {
            cc.max_stale = Some(v.and_then(|v| parse_delta_seconds(&v)));
        }
        cc.extensions = raw;
        cc
    }

    pub fn emit(&self) -> String {
        // Flag directives carry no value; valued ones carry their value.
        // A flag present is `Some(None)`, absent is `None`, so we can reuse
        // one `Option<Option<String>>` shape and flatten it for `emit`.
        let flag = |present: bool| present.then_some(None);
        let known: Vec<(&'static str, Option<String>)> = [
            ("no-cache", flag(self.no_cache)),
            ("no-store", flag(self.no_store)),
            ("max-age", self.max_age.map(|v| Some(v.to_string()))),
            (
                "max-stale",
                self.max_stale.map(|inner| inner.map(|v| v.to_string())),
            ),
            ("min-fresh", self.min_fresh.map(|v| Some(v.to_string()))),
            ("no-transform", flag(self.no_transform)),
            ("only-if-cached", flag(self.only_if_cached)),
            ("stale-if-error", self.stale_if_error.map(|v| Some(v.to_string()))),
        ]
        .into_iter()
        .filter_map(|(name, present)| present.map(|val| (name, val)))
        .collect();
        emit(known, REQUEST_ORDER, &self.extensions)
    }
}

/// Response-direction `Cache-Control` (§3 "Response" directive set).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResponseCacheControl {
    pub public: bool,
    /// `Some(None)` = bare `private`; `Some(Some(fields))` = `private="a,b"`.
    pub private: Option<Option<Vec<Box<str>>>>,
    pub no_cache: Option<Option<Vec<Box<str>>>>,
    pub no_store: bool,
    pub no_transform: bool,
    pub must_revalidate: bool,
    pub proxy_revalidate: bool,
    pub max_age: Option<u64>,
    pub s_maxage: Option<u64>,
    pub stale_while_revalidate: Option<u64>,
    pub stale_if_error: Option<u64>,
    pub immutable: bool,
    pub extensions: Extensions,
}

impl ResponseCacheControl {
    pub fn parse(value: &str) -> Self {
        let mut raw = parse_raw(value);
        let private = raw
            .remove("private")
            .map(|v| v.map(|v| parse_field_list(&v)));
        let no_cache = raw
            .remove("no-cache")
            .map(|v| v.map(|v| parse_field_list(&v)));
        let cc = ResponseCacheControl {
            public: raw.remove("public").is_some(),
            private,
            no_cache,
            no_store: raw.remove("no-store").is_some(),
            no_transform: raw.remove("no-transform").is_some(),
            must_revalidate: raw.remove("must-revalidate").is_some(),
            proxy_revalidate: raw.remove("proxy-revalidate").is_some(),
            max_age: raw.remove("max-age").and_then(|v| v.and_then(|v| parse_delta_seconds(&v))),
            s_maxage: raw.remove("s-maxage").and_then(|v| v.and_then(|v| parse_delta_seconds(&v))),
            stale_while_revalidate: raw
                .remove("stale-while-revalidate")
                .and_then(|v| v.and_then(|v| parse_delta_seconds(&v))),
            stale_if_error: raw
                .remove("stale-if-error")
                .and_then(|v| v.and_then(|v| parse_delta_seconds(&v))),
            immutable: raw.remove("immutable").is_some(),
            extensions: raw,
        };
        cc
    }

    /// Whether this entry must never be stored regardless of request
    /// directives (`no-store`, or `private` on a shared cache without the
    /// relaxation the caller configured).
    pub fn forbids_storage(&self, shared_cache: bool) -> bool {
        self.no_store || (shared_cache && self.private.is_some() && self.private_is_whole_response())
    }

    fn private_is_whole_response(&self) -> bool {
        matches!(&self.private, Some(None))
    }

    pub fn emit(&self) -> String {
        let quoted = |fields: &Option<Vec<Box<str>>>| match fields {
            Some(f) => format!("\"{}\"", f.join(",")),
            None => String::new(),
        };
        let known: Vec<(&'static str, Option<String>)> = [
            ("public", self.public.then_some(None)),
            (
                "private",
                self.private.as_ref().map(|f| (!quoted(f).is_empty()).then(|| quoted(f))),
            ),
            (
                "no-cache",
                self.no_cache.as_ref().map(|f| (!quoted(f).is_empty()).then(|| quoted(f))),
            ),
            ("no-store", self.no_store.then_some(None)),
            ("no-transform", self.no_transform.then_some(None)),
            ("must-revalidate", self.must_revalidate.then_some(None)),
            ("proxy-revalidate", self.proxy_revalidate.then_some(None)),
            ("max-age", self.max_age.map(|v| Some(v.to_string()))),
            ("s-maxage", self.s_maxage.map(|v| Some(v.to_string()))),
            (
                "stale-while-revalidate",
                self.stale_while_revalidate.map(|v| Some(v.to_string())),
            ),
            ("stale-if-error", self.stale_if_error.map(|v| Some(v.to_string()))),
            ("immutable", self.immutable.then_some(None)),
        ]
        .into_iter()
        .filter_map(|(name, present)| present.map(|val| (name, val)))
        .collect();
        emit(known, RESPONSE_ORDER, &self.extensions)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parses_request_directives() {
        let cc = RequestCacheControl::parse("no-cache, max-age=30, max-stale");
        assert!(cc.no_cache);
        assert_eq!(cc.max_age, Some(30));
        assert_eq!(cc.max_stale, Some(None));
    }

    #[test]
    fn parses_response_directives_with_field_list() {
        let cc = ResponseCacheControl::parse(r#"private="set-cookie", max-age=120, must-revalidate"#);
        assert_eq!(cc.private, Some(Some(vec!["set-cookie".into()])));
        assert_eq!(cc.max_age, Some(120));
        assert!(cc.must_revalidate);
    }

    #[test]
    fn drops_malformed_directive_but_parses_rest() {
        let cc = RequestCacheControl::parse("max-age=10, !!!bad, no-store");
        assert_eq!(cc.max_age, Some(10));
        assert!(cc.no_store);
    }

    #[test]
    fn unknown_directives_round_trip_by_name() {
        let cc = RequestCacheControl::parse("max-age=5, foo=bar");
        assert_eq!(cc.extensions.get("foo").map(|v| v.as_deref()), Some(Some("bar")));
        let emitted = cc.emit();
        assert!(emitted.contains("foo=bar"));
    }

    #[test]
    fn canonical_emission_is_deterministic() {
        let a = RequestCacheControl::parse("no-store, max-age=5");
        let b = RequestCacheControl::parse("max-age=5, no-store");
        assert_eq!(a.emit(), b.emit());
    }
}
