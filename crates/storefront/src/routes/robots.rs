//! `robots.txt` route handler.

use axum::{
    extract::State,
    http::header,
    response::{IntoResponse, Response},
};

use crate::state::AppState;

/// Paths crawlers should stay out of.
const DISALLOWED: [&str; 2] = ["/cart", "/checkout"];

fn robots_body(base_url: &str) -> String {
    let mut body = String::from("User-agent: *\n");
    for path in DISALLOWED {
        body.push_str("Disallow: ");
        body.push_str(path);
        body.push('\n');
    }
    body.push_str("Allow: /\n\nHost: ");
    body.push_str(base_url);
    body.push('\n');
    body
}

/// Serve `robots.txt`.
pub async fn robots_txt(State(state): State<AppState>) -> Response {
    (
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        robots_body(&state.config().base_url),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_robots_disallows_private_paths() {
        let body = robots_body("https://shop.example.com");
        assert!(body.starts_with("User-agent: *\n"));
        assert!(body.contains("Disallow: /cart\n"));
        assert!(body.contains("Disallow: /checkout\n"));
        assert!(body.ends_with("Host: https://shop.example.com\n"));
    }
}
