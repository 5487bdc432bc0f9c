//! RFC 6455 HTTP upgrade handling.

use base64::Engine;
use http::{header, Request, StatusCode};
use hermes_core::Response;
use http_body_util::Full;
use hyper::body::Bytes;
use sha1::{Digest, Sha1};

use crate::error::{WsError, WsResult};
use crate::settings::WebSocketRouteSettings;

/// The WebSocket magic GUID used in the handshake.
const WEBSOCKET_GUID: &str = "258EAFA5-E914-47DA-95CA-C5AB0DC85B11";

/// Check if a request is a WebSocket upgrade request.
///
/// A valid WebSocket upgrade request must have:
/// - `Connection: Upgrade` header
/// - `Upgrade: websocket` header
/// - `Sec-WebSocket-Key` header
/// - `Sec-WebSocket-Version: 13` header
pub fn is_websocket_request<B>(request: &Request<B>) -> bool {
    has_upgrade_header(request)
        && has_websocket_upgrade(request)
        && has_websocket_key(request)
        && has_websocket_version(request)
}

fn has_upgrade_header<B>(request: &Request<B>) -> bool {
    request
        .headers()
        .get(header::CONNECTION)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_lowercase().contains("upgrade"))
        .unwrap_or(false)
}

fn has_websocket_upgrade<B>(request: &Request<B>) -> bool {
    request
        .headers()
        .get(header::UPGRADE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.eq_ignore_ascii_case("websocket"))
        .unwrap_or(false)
}

fn has_websocket_key<B>(request: &Request<B>) -> bool {
    request
        .headers()
        .get("sec-websocket-key")
        .and_then(|v| v.to_str().ok())
        .map(|v| !v.is_empty())
        .unwrap_or(false)
}

fn has_websocket_version<B>(request: &Request<B>) -> bool {
    request
        .headers()
        .get("sec-websocket-version")
        .and_then(|v| v.to_str().ok())
        .map(|v| v == "13")
        .unwrap_or(false)
}

fn get_websocket_key<B>(request: &Request<B>) -> Option<&str> {
    request
        .headers()
        .get("sec-websocket-key")
        .and_then(|v| v.to_str().ok())
}

/// Get the requested subprotocols from the request.
pub fn get_websocket_protocols<B>(request: &Request<B>) -> Vec<String> {
    request
        .headers()
        .get_all("sec-websocket-protocol")
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(',').map(str::trim))
        .map(String::from)
        .collect()
}

/// Get the `Origin` header value, if present.
pub fn get_origin<B>(request: &Request<B>) -> Option<&str> {
    request
        .headers()
        .get(header::ORIGIN)
        .and_then(|v| v.to_str().ok())
}

/// Compute the Sec-WebSocket-Accept value from the key.
fn compute_accept_key(key: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(key.as_bytes());
    hasher.update(WEBSOCKET_GUID.as_bytes());
    let result = hasher.finalize();
    base64::engine::general_purpose::STANDARD.encode(result)
}

/// Validate a WebSocket upgrade request.
///
/// Checks the RFC 6455 headers, then the route's origin and subprotocol
/// allow-sets. Returns the accept key on success.
pub fn validate_upgrade_request<B>(
    request: &Request<B>,
    settings: &WebSocketRouteSettings,
) -> WsResult<String> {
    if !has_upgrade_header(request) {
        return Err(WsError::handshake_rejected(
            "missing Connection: Upgrade header",
        ));
    }

    if !has_websocket_upgrade(request) {
        return Err(WsError::handshake_rejected(
            "missing Upgrade: websocket header",
        ));
    }

    let key = get_websocket_key(request)
        .ok_or_else(|| WsError::handshake_rejected("missing Sec-WebSocket-Key header"))?;

    if !has_websocket_version(request) {
        return Err(WsError::handshake_rejected(
            "missing or invalid Sec-WebSocket-Version header (must be 13)",
        ));
    }

    if let Some(origin) = get_origin(request) {
        if !settings.accepts_origin(origin) {
            return Err(WsError::handshake_rejected(format!(
                "origin '{origin}' not allowed"
            )));
        }
    } else if !settings.valid_origins.is_empty() {
        return Err(WsError::handshake_rejected("missing Origin header"));
    }

    let requested = get_websocket_protocols(request);
    if !requested.is_empty()
        && !settings.valid_subprotocols.is_empty()
        && !requested.iter().any(|p| settings.accepts_subprotocol(p))
    {
        return Err(WsError::handshake_rejected(
            "no requested subprotocol is allowed",
        ));
    }

    Ok(compute_accept_key(key))
}

/// A prepared upgrade: the 101 response and the selected subprotocol.
#[derive(Debug)]
pub struct WebSocketUpgrade {
    /// The `101 Switching Protocols` response to send.
    pub response: Response,
    /// The subprotocol echoed to the client, if any.
    pub protocol: Option<String>,
}

/// Validate the request and build the switching-protocols response.
///
/// The subprotocol is the first one the client requested that the route
/// accepts; with an empty allow-set the first requested one wins.
pub fn prepare_upgrade<B>(
    request: &Request<B>,
    settings: &WebSocketRouteSettings,
) -> WsResult<WebSocketUpgrade> {
    let accept_key = validate_upgrade_request(request, settings)?;

    let protocol = get_websocket_protocols(request)
        .into_iter()
        .find(|p| settings.accepts_subprotocol(p));

    let mut builder = http::Response::builder()
        .status(StatusCode::SWITCHING_PROTOCOLS)
        .header(header::CONNECTION, "Upgrade")
        .header(header::UPGRADE, "websocket")
        .header("Sec-WebSocket-Accept", accept_key);

    if let Some(protocol) = &protocol {
        builder = builder.header("Sec-WebSocket-Protocol", protocol);
    }

    let response = builder
        .body(Full::new(Bytes::new()))
        .map_err(|e| WsError::upgrade_failed(e.to_string()))?;

    Ok(WebSocketUpgrade { response, protocol })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_ws_request() -> Request<()> {
        Request::builder()
            .header(header::CONNECTION, "Upgrade")
            .header(header::UPGRADE, "websocket")
            .header("Sec-WebSocket-Key", "dGhlIHNhbXBsZSBub25jZQ==")
            .header("Sec-WebSocket-Version", "13")
            .body(())
            .unwrap()
    }

    #[test]
    fn test_is_websocket_request_valid() {
        assert!(is_websocket_request(&make_ws_request()));
    }

    #[test]
    fn test_is_websocket_request_missing_headers() {
        let request = Request::builder()
            .header(header::UPGRADE, "websocket")
            .header("Sec-WebSocket-Key", "key")
            .header("Sec-WebSocket-Version", "13")
            .body(())
            .unwrap();
        assert!(!is_websocket_request(&request));

        let request = Request::builder()
            .header(header::CONNECTION, "Upgrade")
            .header(header::UPGRADE, "websocket")
            .header("Sec-WebSocket-Version", "13")
            .body(())
            .unwrap();
        assert!(!is_websocket_request(&request));
    }

    #[test]
    fn test_is_websocket_request_wrong_version() {
        let request = Request::builder()
            .header(header::CONNECTION, "Upgrade")
            .header(header::UPGRADE, "websocket")
            .header("Sec-WebSocket-Key", "key")
            .header("Sec-WebSocket-Version", "12")
            .body(())
            .unwrap();
        assert!(!is_websocket_request(&request));
    }

    #[test]
    fn test_compute_accept_key() {
        // RFC 6455 example
        let key = "dGhlIHNhbXBsZSBub25jZQ==";
        assert_eq!(compute_accept_key(key), "s3pPLMBiTxaQ9kYGzzhZRbK+xOo=");
    }

    #[test]
    fn test_validate_upgrade_request_valid() {
        let settings = WebSocketRouteSettings::default();
        let result = validate_upgrade_request(&make_ws_request(), &settings);
        assert_eq!(result.unwrap(), "s3pPLMBiTxaQ9kYGzzhZRbK+xOo=");
    }

    #[test]
    fn test_validate_rejects_disallowed_origin() {
        let settings = WebSocketRouteSettings::new().valid_origin("https://app.example");

        let request = Request::builder()
            .header(header::CONNECTION, "Upgrade")
            .header(header::UPGRADE, "websocket")
            .header("Sec-WebSocket-Key", "dGhlIHNhbXBsZSBub25jZQ==")
            .header("Sec-WebSocket-Version", "13")
            .header(header::ORIGIN, "https://evil.example")
            .body(())
            .unwrap();

        let result = validate_upgrade_request(&request, &settings);
        assert!(matches!(result, Err(WsError::HandshakeRejected { .. })));
    }

    #[test]
    fn test_validate_requires_origin_when_set_is_nonempty() {
        let settings = WebSocketRouteSettings::new().valid_origin("https://app.example");
        let result = validate_upgrade_request(&make_ws_request(), &settings);
        assert!(matches!(result, Err(WsError::HandshakeRejected { .. })));
    }

    #[test]
    fn test_validate_empty_origin_set_accepts_any() {
        let settings = WebSocketRouteSettings::default();
        let request = Request::builder()
            .header(header::CONNECTION, "Upgrade")
            .header(header::UPGRADE, "websocket")
            .header("Sec-WebSocket-Key", "dGhlIHNhbXBsZSBub25jZQ==")
            .header("Sec-WebSocket-Version", "13")
            .header(header::ORIGIN, "https://anywhere.example")
            .body(())
            .unwrap();
        assert!(validate_upgrade_request(&request, &settings).is_ok());
    }

    #[test]
    fn test_prepare_upgrade_success() {
        let settings = WebSocketRouteSettings::default();
        let upgrade = prepare_upgrade(&make_ws_request(), &settings).unwrap();
        assert_eq!(upgrade.response.status(), StatusCode::SWITCHING_PROTOCOLS);
        assert_eq!(
            upgrade.response.headers().get(header::UPGRADE).unwrap(),
            "websocket"
        );
        assert_eq!(
            upgrade
                .response
                .headers()
                .get("Sec-WebSocket-Accept")
                .unwrap(),
            "s3pPLMBiTxaQ9kYGzzhZRbK+xOo="
        );
        assert_eq!(upgrade.protocol, None);
    }

    #[test]
    fn test_prepare_upgrade_selects_first_allowed_protocol() {
        let settings = WebSocketRouteSettings::new()
            .valid_subprotocol("json")
            .valid_subprotocol("xml");

        let request = Request::builder()
            .header(header::CONNECTION, "Upgrade")
            .header(header::UPGRADE, "websocket")
            .header("Sec-WebSocket-Key", "dGhlIHNhbXBsZSBub25jZQ==")
            .header("Sec-WebSocket-Version", "13")
            .header("Sec-WebSocket-Protocol", "chat, json")
            .body(())
            .unwrap();

        let upgrade = prepare_upgrade(&request, &settings).unwrap();
        assert_eq!(upgrade.protocol, Some("json".to_string()));
        assert_eq!(
            upgrade
                .response
                .headers()
                .get("Sec-WebSocket-Protocol")
                .unwrap(),
            "json"
        );
    }

    #[test]
    fn test_prepare_upgrade_rejects_unmatched_protocols() {
        let settings = WebSocketRouteSettings::new().valid_subprotocol("json");

        let request = Request::builder()
            .header(header::CONNECTION, "Upgrade")
            .header(header::UPGRADE, "websocket")
            .header("Sec-WebSocket-Key", "dGhlIHNhbXBsZSBub25jZQ==")
            .header("Sec-WebSocket-Version", "13")
            .header("Sec-WebSocket-Protocol", "chat")
            .body(())
            .unwrap();

        let result = prepare_upgrade(&request, &settings);
        assert!(matches!(result, Err(WsError::HandshakeRejected { .. })));
    }

    #[test]
    fn test_prepare_upgrade_invalid_request() {
        let settings = WebSocketRouteSettings::default();
        let request = Request::builder().body(()).unwrap();
        let result = prepare_upgrade(&request, &settings);
        assert!(matches!(result, Err(WsError::HandshakeRejected { .. })));
    }

    #[test]
    fn test_get_websocket_protocols_multiple_headers() {
        let request = Request::builder()
            .header("Sec-WebSocket-Protocol", "chat")
            .header("Sec-WebSocket-Protocol", "json")
            .body(())
            .unwrap();
        assert_eq!(get_websocket_protocols(&request), vec!["chat", "json"]);
    }
}
