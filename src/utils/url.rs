//! URL utilities for the completion and model-listing endpoints.

/// Normalize a base URL by removing trailing slashes
///
/// # Examples
///
/// ```
/// use liunian::utils::url::normalize_base_url;
///
/// assert_eq!(normalize_base_url("https://api.example.com/v1///"), "https://api.example.com/v1");
/// ```
pub fn normalize_base_url(base_url: &str) -> String {
    base_url.trim_end_matches('/').to_string()
}

/// Derive the model-listing URL from the configured chat-completions URL.
///
/// A URL containing `/chat/completions` has that segment swapped for
/// `/models`; anything else gets `/models` appended.
///
/// # Examples
///
/// ```
/// use liunian::utils::url::models_url;
///
/// assert_eq!(
///     models_url("https://api.example.com/v1/chat/completions"),
///     "https://api.example.com/v1/models"
/// );
/// assert_eq!(models_url("https://api.example.com/v1/"), "https://api.example.com/v1/models");
/// ```
pub fn models_url(api_url: &str) -> String {
    if api_url.contains("/chat/completions") {
        api_url.replacen("/chat/completions", "/models", 1)
    } else {
        format!("{}/models", normalize_base_url(api_url))
    }
}
