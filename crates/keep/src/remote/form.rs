//! `application/x-www-form-urlencoded` bodies
//!
//! The auth endpoint takes a form-encoded request and answers with
//! newline-delimited `key=value` records, so both directions live here.

use std::borrow::Cow;
use std::collections::BTreeMap;

/// Encode pairs as `k=v&k=v`, keeping the caller's order.
///
/// Keys and values are percent-encoded; only unreserved characters
/// (`A-Z a-z 0-9 - . _ ~`) pass through untouched.
pub fn encode<I, K, V>(pairs: I) -> String
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    pairs
        .into_iter()
        .map(|(key, value)| {
            format!(
                "{}={}",
                urlencoding::encode(key.as_ref()),
                urlencoding::encode(value.as_ref())
            )
        })
        .collect::<Vec<_>>()
        .join("&")
}

/// Decode a response body into a sorted map.
///
/// Records are separated by newlines and taken verbatim, since the auth
/// endpoint answers with raw `key=value` lines. A body without any newline
/// is a single-line form body: it is split on `&` and percent-escapes are
/// decoded where valid. Each record is split on its first `=`; records
/// without a separator or with an empty key are skipped.
pub fn decode(body: &str) -> BTreeMap<String, String> {
    if body.contains('\n') {
        records(body.split('\n'))
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect()
    } else {
        records(body.split('&'))
            .map(|(key, value)| (unescape(key).into_owned(), unescape(value).into_owned()))
            .collect()
    }
}

fn records<'a>(raw: impl Iterator<Item = &'a str>) -> impl Iterator<Item = (&'a str, &'a str)> {
    raw.map(|record| record.strip_suffix('\r').unwrap_or(record))
        .filter_map(|record| record.split_once('='))
        .filter(|(key, _)| !key.is_empty())
}

fn unescape(s: &str) -> Cow<'_, str> {
    if !s.contains('%') {
        return Cow::Borrowed(s);
    }
    urlencoding::decode(s).unwrap_or(Cow::Borrowed(s))
}
