//! Response header composition.
//!
//! Helpers that add protocol headers to a [`ResponseChannel`] without
//! clobbering values something upstream already set.

use axum::http::{HeaderName, HeaderValue};
use tracing::{debug, warn};

use crate::context::ResponseChannel;
use crate::version::ODATA_VERSION;

/// Sets `name` to the value produced by `value` unless the response already
/// carries that header.
///
/// `value` runs only when the header is actually added. Returns whether the
/// header was added; a produced value that is not a valid header value is
/// logged and dropped.
pub fn add_header_if_absent<F>(response: &mut ResponseChannel, name: HeaderName, value: F) -> bool
where
    F: FnOnce() -> String,
{
    if response.headers().contains_key(&name) {
        debug!(header = %name, "Header already present, leaving as is");
        return false;
    }

    let value = value();
    match HeaderValue::from_str(&value) {
        Ok(header_value) => {
            response.headers_mut().insert(name, header_value);
            true
        }
        Err(e) => {
            warn!(header = %name, value = %value, error = %e, "Dropping invalid header value");
            false
        }
    }
}

/// Adds the `OData-Version` header, computing the version lazily.
pub fn add_service_version<F>(response: &mut ResponseChannel, version: F) -> bool
where
    F: FnOnce() -> String,
{
    add_header_if_absent(response, ODATA_VERSION, version)
}
