// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Classification of unsuccessful HTTP responses.
//!
//! Both the GitHub client and the feed client funnel non-success responses
//! through [`classify_failure`], so credential rejection, throttling and other
//! failures map onto the same error variants regardless of the HTTP stack that
//! produced them.

use serde::Deserialize;

use crate::error::Error;

const MAX_BODY_EXCERPT: usize = 200;

/// Status and rate limit headers of a response.
#[derive(Debug, Clone, Default, PartialEq, Eq,)]
pub(crate) struct ResponseMeta
{
    pub status:              u16,
    pub ratelimit_remaining: Option<String,>,
    pub ratelimit_reset:     Option<u64,>,
}

impl ResponseMeta
{
    /// Builds metadata from a status code and a header lookup.
    ///
    /// The lookup indirection keeps this independent of the header map type
    /// used by a particular HTTP client.
    pub fn from_lookup<F,>(status: u16, lookup: F,) -> Self
    where
        F: Fn(&str,) -> Option<String,>,
    {
        Self {
            status,
            ratelimit_remaining: lookup("x-ratelimit-remaining",),
            ratelimit_reset: lookup("x-ratelimit-reset",).and_then(|value| value.trim().parse().ok(),),
        }
    }

    pub fn is_success(&self,) -> bool
    {
        (200..300).contains(&self.status,)
    }
}

#[derive(Debug, Deserialize,)]
struct ApiMessage
{
    message: String,
}

/// Maps an unsuccessful response onto the error taxonomy.
///
/// * `401` → [`Error::Authentication`]
/// * `429`, or `403` with an exhausted quota or a rate limit message →
///   [`Error::RateLimit`]
/// * any other `403` → [`Error::Authentication`]
/// * everything else → [`Error::Transport`]
pub(crate) fn classify_failure(context: &str, meta: &ResponseMeta, body: &str,) -> Error
{
    let message = describe_body(body,);
    let status = meta.status;

    let throttled = status == 429
        || (status == 403
            && (meta.ratelimit_remaining.as_deref().map(str::trim,) == Some("0",)
                || message.to_ascii_lowercase().contains("rate limit",)));

    if throttled {
        let reset = meta.ratelimit_reset;
        let suffix = reset
            .map(|epoch| format!(" (quota resets at unix time {epoch})"),)
            .unwrap_or_default();
        return Error::RateLimit {
            message: format!("{context} returned {status}: {message}{suffix}"),
            reset,
        };
    }

    match status {
        401 | 403 => Error::authentication(format!("{context} returned {status}: {message}"),),
        _ => Error::transport(format!(
            "{context} returned unexpected status {status}: {message}"
        ),),
    }
}

fn describe_body(body: &str,) -> String
{
    if let Ok(api,) = serde_json::from_str::<ApiMessage,>(body,) {
        return api.message;
    }

    let trimmed = body.trim();
    if trimmed.is_empty() {
        return "empty response body".to_owned();
    }

    let mut excerpt: String = trimmed.chars().take(MAX_BODY_EXCERPT,).collect();
    if trimmed.chars().count() > MAX_BODY_EXCERPT {
        excerpt.push('…',);
    }
    excerpt
}

#[cfg(test)]
mod tests
{
    use super::*;

    fn meta(status: u16, remaining: Option<&str,>, reset: Option<u64,>,) -> ResponseMeta
    {
        ResponseMeta {
            status,
            ratelimit_remaining: remaining.map(str::to_owned,),
            ratelimit_reset: reset,
        }
    }

    #[test]
    fn from_lookup_reads_rate_limit_headers()
    {
        let parsed = ResponseMeta::from_lookup(403, |name| match name {
            "x-ratelimit-remaining" => Some("0".to_owned(),),
            "x-ratelimit-reset" => Some("1700000000".to_owned(),),
            _ => None,
        },);

        assert_eq!(parsed, meta(403, Some("0"), Some(1_700_000_000)));
        assert!(!parsed.is_success());
    }

    #[test]
    fn unauthorized_maps_to_authentication()
    {
        let error = classify_failure(
            "GET /user/repos",
            &meta(401, None, None,),
            r#"{"message":"Bad credentials"}"#,
        );

        match error {
            Error::Authentication {
                message,
            } => assert_eq!(message, "GET /user/repos returned 401: Bad credentials"),
            other => panic!("expected authentication error, got {other:?}"),
        }
    }

    #[test]
    fn exhausted_quota_maps_to_rate_limit()
    {
        let error = classify_failure(
            "GET /users/octocat",
            &meta(403, Some("0",), Some(42,),),
            r#"{"message":"API rate limit exceeded"}"#,
        );

        match error {
            Error::RateLimit {
                message,
                reset,
            } => {
                assert_eq!(reset, Some(42));
                assert!(message.contains("unix time 42"));
            }
            other => panic!("expected rate limit error, got {other:?}"),
        }
    }

    #[test]
    fn secondary_rate_limit_message_maps_to_rate_limit()
    {
        let error = classify_failure(
            "GET /user/repos",
            &meta(403, Some("4999",), None,),
            r#"{"message":"You have exceeded a secondary rate limit."}"#,
        );
        assert!(matches!(error, Error::RateLimit { reset: None, .. }));
    }

    #[test]
    fn too_many_requests_maps_to_rate_limit()
    {
        let error = classify_failure("GET feed", &meta(429, None, None,), "slow down",);
        assert!(matches!(error, Error::RateLimit { .. }));
    }

    #[test]
    fn plain_forbidden_maps_to_authentication()
    {
        let error = classify_failure(
            "GET /user/repos",
            &meta(403, Some("4000",), None,),
            r#"{"message":"Resource not accessible by integration"}"#,
        );
        assert!(matches!(error, Error::Authentication { .. }));
    }

    #[test]
    fn server_errors_map_to_transport()
    {
        let error = classify_failure("GET feed", &meta(502, None, None,), "",);

        match error {
            Error::Transport {
                message,
            } => assert_eq!(
                message,
                "GET feed returned unexpected status 502: empty response body"
            ),
            other => panic!("expected transport error, got {other:?}"),
        }
    }

    #[test]
    fn long_bodies_are_truncated()
    {
        let body = "x".repeat(MAX_BODY_EXCERPT + 50,);
        let described = describe_body(&body,);
        assert_eq!(described.chars().count(), MAX_BODY_EXCERPT + 1);
        assert!(described.ends_with('…'));
    }
}
