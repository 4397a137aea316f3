use actix_cors::Cors;
use actix_web::http::header;
use lazy_regex::regex_is_match;

/// Any port on the loopback host names, for local game builds.
pub fn is_local_dev_origin(origin: &str) -> bool {
    regex_is_match!(r"^http://(localhost|127\.0\.0\.1)(:\d+)?$", origin)
}

/// CORS for the game clients.
///
/// `allowed_origins` comes from `AppConfig` (already filtered); loopback
/// origins on any port are admitted in addition. Credentials are allowed, so
/// origins are always echoed explicitly rather than `*`.
pub fn cors_middleware(allowed_origins: &[String]) -> Cors {
    let mut cors = Cors::default()
        .allow_any_method()
        .allow_any_header()
        .expose_headers(vec![
            header::HeaderName::from_static("x-trace-id"),
            header::HeaderName::from_static("x-request-id"),
        ])
        .allowed_origin_fn(|origin, _req_head| {
            origin.to_str().map(is_local_dev_origin).unwrap_or(false)
        })
        .supports_credentials()
        .max_age(3600);

    for origin in allowed_origins {
        cors = cors.allowed_origin(origin);
    }

    cors
}
