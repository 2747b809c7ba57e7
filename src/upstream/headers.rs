//! Header profiles presented to the upstream store.

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, USER_AGENT};
use uuid::Uuid;

/// Default US storefront front id sent with every profile.
const STORE_FRONT: &str = "143441-1,29";
const APPLE_TZ: &str = "28800";

fn insert_static(headers: &mut HeaderMap, name: &'static str, value: &'static str) {
    headers.insert(
        HeaderName::from_static(name),
        HeaderValue::from_static(value),
    );
}

/// Headers of a desktop iTunes client. Sent on the direct path.
///
/// Each call carries a fresh `X-Apple-Request-UUID`. `Accept-Encoding` is left
/// to the client, which negotiates and decodes it.
pub fn primary_profile(request_id: Uuid) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        USER_AGENT,
        HeaderValue::from_static("iTunes/12.12.0 (Macintosh; OS X 10.15.7) AppleWebKit/605.1.15"),
    );
    headers.insert(
        ACCEPT,
        HeaderValue::from_static("application/json, text/javascript, */*; q=0.01"),
    );
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-us"));
    insert_static(&mut headers, "x-apple-store-front", STORE_FRONT);
    insert_static(&mut headers, "x-apple-tz", APPLE_TZ);
    if let Ok(value) = HeaderValue::from_str(&request_id.to_string()) {
        headers.insert(HeaderName::from_static("x-apple-request-uuid"), value);
    }
    headers
}

/// Headers of the App Store app on iOS. Used by the alternate fallback stage.
pub fn alternate_profile() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        USER_AGENT,
        HeaderValue::from_static("AppStore/3.0 CFNetwork/1240.0.4 Darwin/20.6.0"),
    );
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));
    insert_static(&mut headers, "x-apple-store-front", STORE_FRONT);
    insert_static(&mut headers, "x-apple-tz", APPLE_TZ);
    headers
}

/// Headers for the content relay.
pub fn relay_profile() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        USER_AGENT,
        HeaderValue::from_static("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36"),
    );
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
    headers
}

/// Caller headers win over `base`.
pub fn merge(mut base: HeaderMap, overrides: &HeaderMap) -> HeaderMap {
    for name in overrides.keys() {
        base.remove(name);
        for value in overrides.get_all(name) {
            base.append(name.clone(), value.clone());
        }
    }
    base
}
