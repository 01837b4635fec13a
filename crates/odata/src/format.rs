//! Body formatting for OData responses.
//!
//! A [`BodyFormatter`] writes a status code and an optional JSON payload to a
//! [`ResponseChannel`], honoring the request's content negotiation.
//! [`JsonFormatter`] is the default and only speaks OData JSON.

use async_trait::async_trait;
use axum::http::{HeaderMap, HeaderValue, StatusCode, header};
use bytes::Bytes;
use mime::Mime;
use serde_json::Value;

use crate::context::{RequestHead, ResponseChannel};
use crate::error::{ODataError, ODataResult};

/// Writes response bodies for action results.
#[async_trait]
pub trait BodyFormatter: Send + Sync {
    /// Commits `status` and, when present, the serialized `payload` to the
    /// response.
    async fn write(
        &self,
        request: &RequestHead,
        response: &mut ResponseChannel,
        status: StatusCode,
        payload: Option<Value>,
    ) -> ODataResult<()>;
}

/// The `odata.metadata` level of an OData JSON response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MetadataLevel {
    /// `odata.metadata=minimal`
    #[default]
    Minimal,
    /// `odata.metadata=full`
    Full,
    /// `odata.metadata=none`
    None,
}

impl MetadataLevel {
    /// Returns the parameter value.
    pub fn as_str(&self) -> &'static str {
        match self {
            MetadataLevel::Minimal => "minimal",
            MetadataLevel::Full => "full",
            MetadataLevel::None => "none",
        }
    }

    fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "minimal" => Some(MetadataLevel::Minimal),
            "full" => Some(MetadataLevel::Full),
            "none" => Some(MetadataLevel::None),
            _ => None,
        }
    }

    /// Returns the Content-Type header value for a JSON body at this level.
    pub fn content_type(&self) -> String {
        format!(
            "application/json;odata.metadata={};odata.streaming=true",
            self.as_str()
        )
    }
}

/// Picks the metadata level from the Accept header.
///
/// An absent Accept header, `*/*`, `application/*` and `application/json`
/// are all acceptable. Only the most specific of those ranges present in the
/// header count, so `application/json;q=0, */*` refuses JSON. Among them the
/// highest quality wins, earliest first on ties. Returns `NotAcceptable` when
/// no listed range allows JSON with a non-zero quality.
pub fn negotiate_json(headers: &HeaderMap) -> ODataResult<MetadataLevel> {
    let Some(accept) = headers.get(header::ACCEPT) else {
        return Ok(MetadataLevel::default());
    };

    let accept = accept.to_str().map_err(|_| ODataError::NotAcceptable {
        message: "Accept header is not valid ASCII".to_string(),
    })?;

    let candidates: Vec<JsonRange> = accept
        .split(',')
        .filter_map(|range| range.trim().parse::<Mime>().ok())
        .filter_map(|media| JsonRange::from_mime(&media))
        .collect();

    let most_specific = candidates.iter().map(|c| c.specificity).max();

    let chosen = candidates
        .iter()
        .filter(|c| Some(c.specificity) == most_specific && c.quality > 0.0)
        .fold(None::<&JsonRange>, |best, c| match best {
            Some(b) if b.quality >= c.quality => Some(b),
            _ => Some(c),
        });

    chosen
        .map(|range| range.level)
        .ok_or_else(|| ODataError::NotAcceptable {
            message: format!("no supported format in Accept '{}'", accept),
        })
}

/// A JSON-compatible media range from an Accept header.
struct JsonRange {
    /// 0 for `*/*`, 1 for `application/*`, 2 for `application/json`.
    specificity: u8,
    quality: f32,
    level: MetadataLevel,
}

impl JsonRange {
    fn from_mime(media: &Mime) -> Option<Self> {
        let specificity = if media.type_() == mime::STAR && media.subtype() == mime::STAR {
            0
        } else if media.type_() == mime::APPLICATION && media.subtype() == mime::STAR {
            1
        } else if media.type_() == mime::APPLICATION && media.subtype() == mime::JSON {
            2
        } else {
            return None;
        };

        // A malformed q-value makes the whole range invalid.
        let quality = match media.get_param("q") {
            Some(q) => q
                .as_str()
                .parse::<f32>()
                .ok()
                .filter(|q| (0.0..=1.0).contains(q))?,
            None => 1.0,
        };

        let level = media
            .get_param("odata.metadata")
            .and_then(|v| MetadataLevel::parse(v.as_str()))
            .unwrap_or_default();

        Some(Self {
            specificity,
            quality,
            level,
        })
    }
}

/// Default formatter producing OData JSON.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonFormatter;

#[async_trait]
impl BodyFormatter for JsonFormatter {
    async fn write(
        &self,
        request: &RequestHead,
        response: &mut ResponseChannel,
        status: StatusCode,
        payload: Option<Value>,
    ) -> ODataResult<()> {
        let Some(payload) = payload else {
            return response.commit(status, Bytes::new());
        };

        let level = negotiate_json(request.headers())?;
        let body = serde_json::to_vec(&payload)?;

        let content_type =
            HeaderValue::from_str(&level.content_type()).map_err(|e| ODataError::Transport {
                message: format!("invalid content type: {}", e),
            })?;

        response.commit(status, Bytes::from(body))?;
        response
            .headers_mut()
            .insert(header::CONTENT_TYPE, content_type);
        Ok(())
    }
}
