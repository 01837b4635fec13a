//! Prefer header handling.
//!
//! Parses the HTTP `Prefer` request header ([RFC 7240]) and answers the one
//! question update results care about: did the client ask for the full
//! representation back?
//!
//! Parsing rules:
//!
//! - Preference names and the `return` value compare case-insensitively.
//! - Values may be tokens or quoted strings (`return="representation"`).
//! - A header value with a syntax error contributes nothing.
//! - Conflicting `return` values (`representation` and `minimal` in the same
//!   request) cancel out, leaving no return preference.
//!
//! [RFC 7240]: https://www.rfc-editor.org/rfc/rfc7240

use axum::{
    extract::FromRequestParts,
    http::{HeaderMap, HeaderName, StatusCode, request::Parts},
};

/// The `Prefer` request header.
pub const PREFER: HeaderName = HeaderName::from_static("prefer");

/// Value of the `return` preference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReturnPreference {
    /// `return=representation`: send the full resource back.
    Representation,
    /// `return=minimal`: headers only.
    Minimal,
}

impl ReturnPreference {
    fn parse(value: &str) -> Option<Self> {
        if value.eq_ignore_ascii_case("representation") {
            Some(ReturnPreference::Representation)
        } else if value.eq_ignore_ascii_case("minimal") {
            Some(ReturnPreference::Minimal)
        } else {
            None
        }
    }

    /// Returns the canonical `return=...` directive.
    pub fn as_directive(&self) -> &'static str {
        match self {
            ReturnPreference::Representation => "return=representation",
            ReturnPreference::Minimal => "return=minimal",
        }
    }
}

/// Extracted Prefer header values from a request.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PreferHeader {
    /// Resolved return preference, `None` when absent or contradictory.
    return_preference: Option<ReturnPreference>,

    /// Handling preference (strict, lenient).
    handling: Option<String>,

    /// Respond-async preference.
    respond_async: bool,

    /// `odata.*` preferences in request order, names lowercased.
    odata: Vec<(String, Option<String>)>,
}

impl PreferHeader {
    /// Creates a new PreferHeader from a HeaderMap.
    ///
    /// Every `Prefer` header line is considered; lines that fail to parse
    /// are skipped.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let mut result = Self::default();
        let mut saw_representation = false;
        let mut saw_minimal = false;

        for value in headers.get_all(&PREFER) {
            let Some(preferences) = value.to_str().ok().and_then(parse_preferences) else {
                continue;
            };

            for (name, value) in preferences {
                if name.eq_ignore_ascii_case("return") {
                    match value.as_deref().and_then(ReturnPreference::parse) {
                        Some(ReturnPreference::Representation) => saw_representation = true,
                        Some(ReturnPreference::Minimal) => saw_minimal = true,
                        None => {}
                    }
                } else if name.eq_ignore_ascii_case("handling") {
                    if result.handling.is_none() {
                        result.handling = value;
                    }
                } else if name.eq_ignore_ascii_case("respond-async") {
                    result.respond_async = true;
                } else if is_odata_preference(&name) {
                    result.odata.push((name.to_ascii_lowercase(), value));
                }
            }
        }

        result.return_preference = match (saw_representation, saw_minimal) {
            (true, false) => Some(ReturnPreference::Representation),
            (false, true) => Some(ReturnPreference::Minimal),
            _ => None,
        };

        result
    }

    /// Returns the resolved return preference.
    pub fn return_preference(&self) -> Option<ReturnPreference> {
        self.return_preference
    }

    /// Returns the handling preference.
    pub fn handling(&self) -> Option<&str> {
        self.handling.as_deref()
    }

    /// Returns whether async response is preferred.
    pub fn prefer_async(&self) -> bool {
        self.respond_async
    }

    /// Returns the `odata.*` preferences that were seen, in request order.
    pub fn odata_preferences(&self) -> &[(String, Option<String>)] {
        &self.odata
    }

    /// Returns the value of the first `odata.*` preference called `name`.
    ///
    /// The outer `Option` is `None` when the preference is absent; the inner
    /// one is `None` when it was sent without a value.
    pub fn odata_preference(&self, name: &str) -> Option<Option<&str>> {
        self.odata
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_deref())
    }

    /// Checks if the full representation is requested.
    pub fn prefers_representation(&self) -> bool {
        self.return_preference == Some(ReturnPreference::Representation)
    }

    /// Checks if minimal return is requested.
    pub fn is_minimal(&self) -> bool {
        self.return_preference == Some(ReturnPreference::Minimal)
    }
}

/// Returns whether the request asked for the updated entity in the body.
///
/// Anything other than an unambiguous `return=representation` is a no.
pub fn request_prefers_return_content(headers: &HeaderMap) -> bool {
    PreferHeader::from_headers(headers).prefers_representation()
}

/// Axum extractor for Prefer header.
impl<S> FromRequestParts<S> for PreferHeader
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, &'static str);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(PreferHeader::from_headers(&parts.headers))
    }
}

/// Parses one Prefer header line into `(name, value)` pairs.
///
/// Preference parameters after `;` are validated for quoting but dropped.
/// Returns `None` on any syntax error.
fn parse_preferences(line: &str) -> Option<Vec<(String, Option<String>)>> {
    let mut preferences = Vec::new();

    for element in split_unquoted(line, ',')? {
        let element = element.trim();
        if element.is_empty() {
            continue;
        }

        let mut segments = split_unquoted(element, ';')?.into_iter();
        let head = segments.next().unwrap_or_default();
        for param in segments {
            let param = param.trim();
            if !param.is_empty() {
                parse_pair(param)?;
            }
        }

        preferences.push(parse_pair(head)?);
    }

    Some(preferences)
}

/// Parses `token [ "=" word ]`.
fn parse_pair(pair: &str) -> Option<(String, Option<String>)> {
    let (name, value) = match pair.split_once('=') {
        Some((name, value)) => (name.trim(), Some(value.trim())),
        None => (pair.trim(), None),
    };

    if !is_token(name) {
        return None;
    }

    let value = match value {
        Some(raw) if raw.starts_with('"') => Some(unquote(raw)?),
        Some(raw) if is_token(raw) => Some(raw.to_string()),
        Some(_) => return None,
        None => None,
    };

    Some((name.to_string(), value))
}

/// Splits on `delimiter` outside of quoted strings. `None` if a quote is
/// left open.
fn split_unquoted(input: &str, delimiter: char) -> Option<Vec<&str>> {
    let mut parts = Vec::new();
    let mut start = 0;
    let mut in_quotes = false;
    let mut escaped = false;

    for (idx, ch) in input.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match ch {
            '\\' if in_quotes => escaped = true,
            '"' => in_quotes = !in_quotes,
            c if c == delimiter && !in_quotes => {
                parts.push(&input[start..idx]);
                start = idx + c.len_utf8();
            }
            _ => {}
        }
    }

    if in_quotes {
        return None;
    }
    parts.push(&input[start..]);
    Some(parts)
}

/// Strips the quotes from a quoted-string and resolves backslash escapes.
fn unquote(raw: &str) -> Option<String> {
    let inner = raw.strip_prefix('"')?.strip_suffix('"')?;
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();

    while let Some(ch) = chars.next() {
        match ch {
            '\\' => out.push(chars.next()?),
            '"' => return None,
            c => out.push(c),
        }
    }

    Some(out)
}

fn is_odata_preference(name: &str) -> bool {
    name.len() > "odata.".len()
        && name.as_bytes()[.."odata.".len()].eq_ignore_ascii_case(b"odata.")
}

fn is_token(s: &str) -> bool {
    !s.is_empty()
        && s.bytes().all(|b| {
            b.is_ascii_alphanumeric()
                || matches!(
                    b,
                    b'!' | b'#'
                        | b'$'
                        | b'%'
                        | b'&'
                        | b'\''
                        | b'*'
                        | b'+'
                        | b'-'
                        | b'.'
                        | b'^'
                        | b'_'
                        | b'`'
                        | b'|'
                        | b'~'
                )
        })
}
