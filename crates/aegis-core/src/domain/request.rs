//! Inbound request types.

use serde::{Deserialize, Serialize};

/// URL used when a request omits one.
pub const BLANK_PAGE: &str = "about:blank";

/// Identity the evaluator sees as the author of a navigation.
pub const BROWSER_AGENT: &str = "Aegis-Browser-User";

/// Change type tag for navigation events.
pub const BROWSER_NAVIGATION: &str = "BROWSER_NAVIGATION";

/// A single scan request from the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanRequest {
    pub url: String,
    pub content: String,
    /// Caller license tier (stream equivalent of the tier header).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tier: Option<String>,
    /// Feature the caller wants unlocked for this request.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feature: Option<String>,
}

/// Lenient wire shape: every field optional, `null` treated as absent.
#[derive(Debug, Deserialize)]
struct WireRequest {
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tier: Option<String>,
    #[serde(default)]
    feature: Option<String>,
}

impl ScanRequest {
    pub fn new(url: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            content: content.into(),
            tier: None,
            feature: None,
        }
    }

    pub fn with_tier(mut self, tier: impl Into<String>) -> Self {
        self.tier = Some(tier.into());
        self
    }

    pub fn with_feature(mut self, feature: impl Into<String>) -> Self {
        self.feature = Some(feature.into());
        self
    }

    /// Parse one protocol line, applying defaults for absent fields.
    pub fn from_line(line: &str) -> Result<Self, serde_json::Error> {
        // Only an object is a request; serde would otherwise accept an array.
        let object: serde_json::Map<String, serde_json::Value> = serde_json::from_str(line)?;
        let wire: WireRequest = serde_json::from_value(serde_json::Value::Object(object))?;
        Ok(Self {
            url: wire.url.unwrap_or_else(|| BLANK_PAGE.to_string()),
            content: wire.content.unwrap_or_default(),
            tier: wire.tier,
            feature: wire.feature,
        })
    }
}

/// The input shape handed to the evaluator.
///
/// A navigation is treated as a content-ingestion event: the page content is
/// the diff and the URL is the single changed file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeContext {
    pub agent: String,
    pub diff: String,
    pub files_changed: Vec<String>,
    pub change_type: String,
}

impl From<&ScanRequest> for ChangeContext {
    fn from(request: &ScanRequest) -> Self {
        Self {
            agent: BROWSER_AGENT.to_string(),
            diff: request.content.clone(),
            files_changed: vec![request.url.clone()],
            change_type: BROWSER_NAVIGATION.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_line_applies_defaults() {
        let req = ScanRequest::from_line("{}").unwrap();
        assert_eq!(req.url, BLANK_PAGE);
        assert_eq!(req.content, "");
        assert!(req.tier.is_none());
    }

    #[test]
    fn test_from_line_treats_null_as_absent() {
        let req = ScanRequest::from_line(r#"{"url": null, "content": null}"#).unwrap();
        assert_eq!(req.url, BLANK_PAGE);
        assert_eq!(req.content, "");
    }

    #[test]
    fn test_from_line_keeps_tier_and_feature() {
        let req =
            ScanRequest::from_line(r#"{"url":"https://a.test","tier":"Free","feature":"banking"}"#)
                .unwrap();
        assert_eq!(req.url, "https://a.test");
        assert_eq!(req.tier.as_deref(), Some("Free"));
        assert_eq!(req.feature.as_deref(), Some("banking"));
    }

    #[test]
    fn test_from_line_rejects_non_objects() {
        assert!(ScanRequest::from_line("not json").is_err());
        assert!(ScanRequest::from_line("[1,2]").is_err());
        assert!(ScanRequest::from_line(r#"{"url": 5}"#).is_err());
        for line in ["[]", r#"["http://a", "b"]"#, "42", r#""url""#, "null"] {
            assert!(ScanRequest::from_line(line).is_err(), "{line} accepted");
        }
    }

    #[test]
    fn test_change_context_from_request() {
        let req = ScanRequest::new("https://example.com", "<html></html>");
        let ctx = ChangeContext::from(&req);
        assert_eq!(ctx.agent, BROWSER_AGENT);
        assert_eq!(ctx.diff, "<html></html>");
        assert_eq!(ctx.files_changed, vec!["https://example.com".to_string()]);
        assert_eq!(ctx.change_type, BROWSER_NAVIGATION);
    }
}
