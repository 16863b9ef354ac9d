//! Custom Askama template filters.

use std::fmt::Display;

/// Returns the current year.
///
/// Usage in templates: `{{ ""|current_year }}`
#[allow(clippy::unnecessary_wraps)]
#[askama::filter_fn]
pub fn current_year(_value: impl Display, _env: &dyn askama::Values) -> askama::Result<i32> {
    use chrono::Datelike;
    Ok(chrono::Utc::now().year())
}

/// Returns the content hash for main.css, computed by the build script.
///
/// Usage in templates: `{{ ""|css_hash }}`
#[allow(clippy::unnecessary_wraps)]
#[askama::filter_fn]
pub fn css_hash(_value: impl Display, _env: &dyn askama::Values) -> askama::Result<&'static str> {
    Ok(env!("CSS_HASH"))
}

/// Path of the stylesheet: the hashed copy when the build produced one.
///
/// Usage in templates: `{{ ""|stylesheet_path }}`
#[allow(clippy::unnecessary_wraps)]
#[askama::filter_fn]
pub fn stylesheet_path(
    _value: impl Display,
    _env: &dyn askama::Values,
) -> askama::Result<String> {
    Ok(stylesheet_for(env!("CSS_HASH")))
}

fn stylesheet_for(hash: &str) -> String {
    if hash.is_empty() {
        "/static/css/main.css".to_string()
    } else {
        format!("/static/css/derived/main.{hash}.css")
    }
}
