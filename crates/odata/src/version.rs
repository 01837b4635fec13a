//! OData protocol version handling.
//!
//! Parses the `OData-Version` and `OData-MaxVersion` request headers and
//! resolves the version a response is served under.
//! See: <https://docs.oasis-open.org/odata/odata/v4.01/odata-v4.01-part1-protocol.html#sec_HeaderODataVersion>

use std::fmt;
use std::str::FromStr;

use axum::http::{HeaderMap, HeaderName};

use crate::error::ODataError;

/// Header carrying the protocol version of a request or response.
pub const ODATA_VERSION: HeaderName = HeaderName::from_static("odata-version");

/// Header carrying the highest protocol version the client accepts.
pub const ODATA_MAX_VERSION: HeaderName = HeaderName::from_static("odata-maxversion");

/// Supported OData protocol versions, ordered oldest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum ODataVersion {
    /// OData 4.0
    #[default]
    V4_0,
    /// OData 4.01
    V4_01,
}

impl ODataVersion {
    /// All supported versions, oldest first.
    pub const ALL: [ODataVersion; 2] = [ODataVersion::V4_0, ODataVersion::V4_01];

    /// Returns the header token for this version (e.g. `"4.01"`).
    pub fn as_str(&self) -> &'static str {
        match self {
            ODataVersion::V4_0 => "4.0",
            ODataVersion::V4_01 => "4.01",
        }
    }

    fn number(&self) -> VersionNumber {
        match self {
            ODataVersion::V4_0 => VersionNumber { major: 4, minor: 0 },
            ODataVersion::V4_01 => VersionNumber { major: 4, minor: 1 },
        }
    }

    fn from_number(number: VersionNumber) -> Option<Self> {
        Self::ALL.into_iter().find(|v| v.number() == number)
    }

    /// Returns the highest supported version not greater than `max`.
    fn highest_within(max: VersionNumber) -> Option<Self> {
        Self::ALL.into_iter().rev().find(|v| v.number() <= max)
    }
}

impl fmt::Display for ODataVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ODataVersion {
    type Err = ODataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        VersionNumber::parse(s)
            .and_then(Self::from_number)
            .ok_or_else(|| ODataError::InvalidVersion {
                value: s.to_string(),
            })
    }
}

/// A `<major>.<minor>` token as it appears on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct VersionNumber {
    major: u16,
    minor: u16,
}

impl VersionNumber {
    /// Parses `"4"`, `"4.0"` or `"4.01"`. The minor part is numeric, so
    /// `"4.01"` and `"4.1"` are the same version.
    fn parse(token: &str) -> Option<Self> {
        let token = token.trim();
        let (major, minor) = match token.split_once('.') {
            Some((major, minor)) => (major, minor),
            None => (token, "0"),
        };

        if major.is_empty()
            || minor.is_empty()
            || !major.bytes().all(|b| b.is_ascii_digit())
            || !minor.bytes().all(|b| b.is_ascii_digit())
        {
            return None;
        }

        Some(Self {
            major: major.parse().ok()?,
            minor: minor.parse().ok()?,
        })
    }
}

fn header_token<'a>(headers: &'a HeaderMap, name: &HeaderName) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

/// Resolves the protocol version a response to this request is served under.
///
/// Precedence:
/// 1. `OData-MaxVersion`: the highest supported version not above it
/// 2. `OData-Version`: the version the request itself declares
/// 3. `default`
///
/// Unparseable or unsupported header values are ignored.
pub fn response_version(headers: &HeaderMap, default: ODataVersion) -> ODataVersion {
    let from_max = header_token(headers, &ODATA_MAX_VERSION)
        .and_then(VersionNumber::parse)
        .and_then(ODataVersion::highest_within);

    if let Some(version) = from_max {
        return version;
    }

    header_token(headers, &ODATA_VERSION)
        .and_then(|token| token.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(pairs: &[(HeaderName, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(name.clone(), HeaderValue::from_static(*value));
        }
        map
    }

    #[test]
    fn test_parse_versions() {
        assert_eq!("4.0".parse::<ODataVersion>().unwrap(), ODataVersion::V4_0);
        assert_eq!("4".parse::<ODataVersion>().unwrap(), ODataVersion::V4_0);
        assert_eq!("4.01".parse::<ODataVersion>().unwrap(), ODataVersion::V4_01);
        assert_eq!(" 4.01 ".parse::<ODataVersion>().unwrap(), ODataVersion::V4_01);
    }

    #[test]
    fn test_parse_invalid() {
        for token in ["", "x", "4.", ".1", "3.0", "5.0", "4.0a", "-4.0"] {
            let err = token.parse::<ODataVersion>().unwrap_err();
            assert!(matches!(err, ODataError::InvalidVersion { .. }), "{token}");
        }
    }

    #[test]
    fn test_display_round_trip() {
        for version in ODataVersion::ALL {
            assert_eq!(version.to_string().parse::<ODataVersion>().unwrap(), version);
        }
    }

    #[test]
    fn test_ordering() {
        assert!(ODataVersion::V4_0 < ODataVersion::V4_01);
    }

    #[test]
    fn test_response_version_default() {
        let map = HeaderMap::new();
        assert_eq!(response_version(&map, ODataVersion::V4_0), ODataVersion::V4_0);
        assert_eq!(response_version(&map, ODataVersion::V4_01), ODataVersion::V4_01);
    }

    #[test]
    fn test_response_version_max_version_wins() {
        let map = headers(&[(ODATA_MAX_VERSION, "4.0"), (ODATA_VERSION, "4.01")]);
        assert_eq!(response_version(&map, ODataVersion::V4_01), ODataVersion::V4_0);
    }

    #[test]
    fn test_response_version_max_version_above_supported() {
        let map = headers(&[(ODATA_MAX_VERSION, "5.0")]);
        assert_eq!(response_version(&map, ODataVersion::V4_0), ODataVersion::V4_01);
    }

    #[test]
    fn test_response_version_max_version_below_supported_falls_through() {
        let map = headers(&[(ODATA_MAX_VERSION, "3.0"), (ODATA_VERSION, "4.01")]);
        assert_eq!(response_version(&map, ODataVersion::V4_0), ODataVersion::V4_01);
    }

    #[test]
    fn test_response_version_request_version() {
        let map = headers(&[(ODATA_VERSION, "4.01")]);
        assert_eq!(response_version(&map, ODataVersion::V4_0), ODataVersion::V4_01);
    }

    #[test]
    fn test_response_version_garbage_ignored() {
        let map = headers(&[(ODATA_MAX_VERSION, "latest"), (ODATA_VERSION, "four")]);
        assert_eq!(response_version(&map, ODataVersion::V4_0), ODataVersion::V4_0);
    }
}
