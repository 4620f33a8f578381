//! Mapping of warp rejections to status codes and messages, shared by both
//! services. Each service wraps the message in its own error shape.

use warp::http::StatusCode;
use warp::Rejection;

pub fn classify(err: &Rejection) -> (StatusCode, String) {
    if let Some(e) = err.find::<warp::filters::body::BodyDeserializeError>() {
        (StatusCode::BAD_REQUEST, format!("Invalid request body: {}", e))
    } else if let Some(e) = err.find::<warp::cors::CorsForbidden>() {
        (StatusCode::FORBIDDEN, e.to_string())
    } else if err.find::<warp::reject::PayloadTooLarge>().is_some() {
        (
            StatusCode::PAYLOAD_TOO_LARGE,
            "Request payload too large".into(),
        )
    } else if err.find::<warp::reject::UnsupportedMediaType>().is_some() {
        (
            StatusCode::UNSUPPORTED_MEDIA_TYPE,
            "Unsupported media type".into(),
        )
    } else if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        (StatusCode::METHOD_NOT_ALLOWED, "Method Not Allowed".into())
    } else if err.is_not_found() {
        (StatusCode::NOT_FOUND, "Not Found".into())
    } else {
        tracing::error!("Unhandled rejection: {:?}", err);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Internal server error".into(),
        )
    }
}

/// JSON body `{<key>: <message>}` with the given status.
pub fn json_error(status: StatusCode, key: &str, message: &str) -> warp::reply::Response {
    use warp::Reply;

    let mut body = serde_json::Map::new();
    body.insert(key.to_string(), serde_json::Value::from(message));
    warp::reply::with_status(warp::reply::json(&body), status).into_response()
}
