//! CORS preflight handling.
//!
//! `warp::cors()` only admits request headers from a fixed list, while
//! browsers may ask for any header in a preflight. Preflights from an allowed
//! origin for an allowed method are answered here with every requested header
//! echoed back. Everything else falls through to the routes and their
//! `warp::cors()` wrapper, which also forbids the bad preflights.

use std::sync::Arc;
use warp::http::header::{self, HeaderValue};
use warp::http::{Method, StatusCode};
use warp::{Filter, Rejection, Reply};

/// Methods either service accepts from a browser.
pub const ALLOWED_METHODS: [&str; 7] = ["GET", "POST", "PUT", "PATCH", "DELETE", "OPTIONS", "HEAD"];

const MAX_AGE_SECS: u32 = 600;

/// Which origins may call a service.
#[derive(Debug, Clone)]
pub enum AllowedOrigins {
    Any,
    List(Arc<[String]>),
}

impl AllowedOrigins {
    pub fn list(origins: &[String]) -> Self {
        AllowedOrigins::List(origins.iter().cloned().collect())
    }

    pub fn allows(&self, origin: &str) -> bool {
        match self {
            AllowedOrigins::Any => true,
            AllowedOrigins::List(origins) => origins.iter().any(|o| o == origin),
        }
    }
}

/// Answer `OPTIONS` preflights from an allowed origin for an allowed method.
///
/// Anything else is rejected as not found.
pub fn preflight(
    origins: AllowedOrigins,
    credentials: bool,
) -> impl Filter<Extract = (warp::reply::Response,), Error = Rejection> + Clone {
    warp::method()
        .and(warp::header::optional::<String>("origin"))
        .and(warp::header::optional::<String>("access-control-request-method"))
        .and(warp::header::optional::<String>("access-control-request-headers"))
        .and_then(
            move |method: Method,
                  origin: Option<String>,
                  request_method: Option<String>,
                  request_headers: Option<String>| {
                let origins = origins.clone();
                async move {
                    match (origin, request_method) {
                        (Some(origin), Some(request_method))
                            if method == Method::OPTIONS
                                && origins.allows(&origin)
                                && ALLOWED_METHODS.contains(&request_method.trim()) =>
                        {
                            Ok(preflight_response(
                                &origin,
                                request_headers.as_deref(),
                                credentials,
                            ))
                        }
                        _ => Err(warp::reject::not_found()),
                    }
                }
            },
        )
}

fn preflight_response(
    origin: &str,
    request_headers: Option<&str>,
    credentials: bool,
) -> warp::reply::Response {
    let mut resp = warp::reply::with_status(warp::reply(), StatusCode::OK).into_response();
    let headers = resp.headers_mut();

    if let Ok(value) = HeaderValue::from_str(origin) {
        headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, value);
    }
    if let Ok(value) = HeaderValue::from_str(&ALLOWED_METHODS.join(", ")) {
        headers.insert(header::ACCESS_CONTROL_ALLOW_METHODS, value);
    }
    if let Some(value) = request_headers.and_then(|h| HeaderValue::from_str(h).ok()) {
        headers.insert(header::ACCESS_CONTROL_ALLOW_HEADERS, value);
    }
    if credentials {
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_CREDENTIALS,
            HeaderValue::from_static("true"),
        );
    }
    headers.insert(header::ACCESS_CONTROL_MAX_AGE, HeaderValue::from(MAX_AGE_SECS));
    headers.insert(header::VARY, HeaderValue::from_static("origin"));
    resp
}
