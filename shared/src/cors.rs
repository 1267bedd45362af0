use lambda_http::{
    http::{response::Builder, StatusCode},
    Body, Error, Response,
};
use serde::Serialize;

pub const ALLOW_METHODS: &str = "POST, OPTIONS";
pub const ALLOW_HEADERS: &str = "Content-Type, Authorization";

/// Attach the CORS headers every response of this endpoint carries
pub fn with_cors(builder: Builder, origin: &str) -> Builder {
    builder
        .header("Access-Control-Allow-Origin", origin)
        .header("Access-Control-Allow-Methods", ALLOW_METHODS)
        .header("Access-Control-Allow-Headers", ALLOW_HEADERS)
}

/// 204 answer to a CORS preflight
pub fn preflight(origin: &str) -> Result<Response<Body>, Error> {
    Ok(with_cors(Response::builder(), origin)
        .status(StatusCode::NO_CONTENT)
        .body(Body::Empty)
        .map_err(Box::new)?)
}

pub fn json_response<T: Serialize>(
    origin: &str,
    status: StatusCode,
    payload: &T,
) -> Result<Response<Body>, Error> {
    Ok(with_cors(Response::builder(), origin)
        .status(status)
        .header("Content-Type", "application/json")
        .body(serde_json::to_string(payload)?.into())
        .map_err(Box::new)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header<'a>(resp: &'a Response<Body>, name: &str) -> &'a str {
        resp.headers().get(name).unwrap().to_str().unwrap()
    }

    #[test]
    fn preflight_is_empty_204_with_cors() {
        let resp = preflight("https://panel.example").unwrap();

        assert_eq!(resp.status(), StatusCode::NO_CONTENT);
        assert!(resp.body().is_empty());
        assert_eq!(header(&resp, "Access-Control-Allow-Origin"), "https://panel.example");
        assert_eq!(header(&resp, "Access-Control-Allow-Methods"), "POST, OPTIONS");
        assert_eq!(header(&resp, "Access-Control-Allow-Headers"), "Content-Type, Authorization");
    }

    #[test]
    fn json_response_serialises_payload() {
        let resp = json_response("*", StatusCode::BAD_REQUEST, &serde_json::json!({"error": "uid is required"})).unwrap();

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(header(&resp, "Content-Type"), "application/json");
        assert_eq!(header(&resp, "Access-Control-Allow-Origin"), "*");
        let body: serde_json::Value = serde_json::from_slice(resp.body()).unwrap();
        assert_eq!(body["error"], "uid is required");
    }
}
