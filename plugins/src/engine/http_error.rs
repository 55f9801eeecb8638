use thiserror::Error;

const BODY_PREVIEW_LIMIT: usize = 512;

/// Transport-level failure talking to the query service.
///
/// None of these carry coded sub-errors; the message becomes the plain
/// failure detail.
#[derive(Debug, Error)]
pub enum QueryHttpError {
    #[error("query transport error url={url}: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("query http error status={status} url={url}: {body}")]
    Status {
        status: u16,
        url: String,
        body: String,
    },
    #[error("query decode error status={status} url={url}: {source} | body={body}")]
    Decode {
        status: u16,
        url: String,
        #[source]
        source: serde_json::Error,
        body: String,
    },
}

impl QueryHttpError {
    pub(crate) fn transport(source: reqwest::Error, url: &str) -> Self {
        Self::Transport {
            url: url.to_string(),
            source,
        }
    }

    pub(crate) fn status(status: u16, url: &str, body: &str) -> Self {
        Self::Status {
            status,
            url: url.to_string(),
            body: preview_body(body),
        }
    }

    pub(crate) fn decode(status: u16, url: &str, source: serde_json::Error, body: &str) -> Self {
        Self::Decode {
            status,
            url: url.to_string(),
            source,
            body: preview_body(body),
        }
    }
}

fn preview_body(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return "<empty body>".to_string();
    }

    let mut out: String = trimmed.chars().take(BODY_PREVIEW_LIMIT).collect();
    if trimmed.chars().nth(BODY_PREVIEW_LIMIT).is_some() {
        out.push_str("...");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn long_bodies_are_cut_in_status_errors() {
        let body = "x".repeat(BODY_PREVIEW_LIMIT + 10);
        let QueryHttpError::Status { body, .. } = QueryHttpError::status(500, "u", &body) else {
            panic!("expected status variant");
        };
        assert!(body.ends_with("..."));
        assert_eq!(body.len(), BODY_PREVIEW_LIMIT + 3);
        assert_eq!(preview_body("   "), "<empty body>");
    }

    #[test]
    fn status_error_names_status_and_url() {
        let err = QueryHttpError::status(503, "http://q/query/service", "busy");
        assert_eq!(
            err.to_string(),
            "query http error status=503 url=http://q/query/service: busy"
        );
    }

    #[test]
    fn decode_error_keeps_the_body_preview() {
        let source = serde_json::from_str::<serde_json::Value>("not json").unwrap_err();
        let err = QueryHttpError::decode(200, "http://q/query/service", source, "not json");
        let msg = err.to_string();
        assert!(msg.starts_with("query decode error status=200"), "{msg}");
        assert!(msg.ends_with("| body=not json"), "{msg}");
    }
}
