//! Simulated email delivery and open/click tracking helpers.
//!
//! No real mail is sent anywhere. Delivery outcomes are decided by a random
//! roll so the frontend can exercise both success and failure paths; the
//! roll is passed in so the rules stay deterministic under test.

use std::sync::LazyLock;

use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Providers
// ---------------------------------------------------------------------------

/// Email connection provider configured by a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmailProvider {
    Smtp,
    Gmail,
    Outlook,
}

impl EmailProvider {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "smtp" => Some(EmailProvider::Smtp),
            "gmail" => Some(EmailProvider::Gmail),
            "outlook" => Some(EmailProvider::Outlook),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            EmailProvider::Smtp => "smtp",
            EmailProvider::Gmail => "gmail",
            EmailProvider::Outlook => "outlook",
        }
    }

    /// OAuth providers authenticate through an account email instead of
    /// SMTP credentials.
    pub fn is_oauth(self) -> bool {
        !matches!(self, EmailProvider::Smtp)
    }

    /// Simulated failure probability for a single send.
    pub fn failure_rate(self) -> f64 {
        if self.is_oauth() {
            OAUTH_FAILURE_RATE
        } else {
            SMTP_FAILURE_RATE
        }
    }
}

/// Calendar providers accepted in calendar settings.
pub const CALENDAR_PROVIDERS: &[&str] = &["google", "outlook"];

/// Simulated failure probability for SMTP sends.
pub const SMTP_FAILURE_RATE: f64 = 0.10;

/// Simulated failure probability for OAuth (Gmail/Outlook) sends.
pub const OAUTH_FAILURE_RATE: f64 = 0.05;

/// Outcome of a simulated send or connection test.
#[derive(Debug, Clone, PartialEq)]
pub enum DeliveryOutcome {
    Delivered,
    Failed { message: String, error: String },
}

/// Decide a simulated send's outcome from a roll in `[0, 1)`.
pub fn simulate_delivery(provider: EmailProvider, roll: f64) -> DeliveryOutcome {
    if roll >= provider.failure_rate() {
        return DeliveryOutcome::Delivered;
    }
    let error = if provider.is_oauth() {
        "OAUTH_TOKEN_EXPIRED"
    } else {
        "SMTP_CONNECTION_TIMEOUT"
    };
    DeliveryOutcome::Failed {
        message: format!("Failed to send email via {}", provider.as_str()),
        error: error.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Tracking
// ---------------------------------------------------------------------------

/// A transparent 1x1 GIF served by the open-tracking endpoint.
pub const TRACKING_PIXEL_GIF: &[u8] = &[
    0x47, 0x49, 0x46, 0x38, 0x39, 0x61, 0x01, 0x00, 0x01, 0x00, 0x80, 0x00, 0x00, 0xff, 0xff,
    0xff, 0x00, 0x00, 0x00, 0x21, 0xf9, 0x04, 0x01, 0x00, 0x00, 0x00, 0x00, 0x2c, 0x00, 0x00,
    0x00, 0x00, 0x01, 0x00, 0x01, 0x00, 0x00, 0x02, 0x02, 0x44, 0x01, 0x00, 0x3b,
];

static HREF_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"href="(https?://[^"]+)""#).expect("valid regex"));

/// Generate an opaque tracking id for a sent email.
pub fn generate_tracking_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// URL of the open-tracking pixel for `tracking_id`.
pub fn open_pixel_url(base_url: &str, tracking_id: &str) -> String {
    format!("{}/track/open/{tracking_id}", base_url.trim_end_matches('/'))
}

/// URL that records a click on `target` and then redirects to it.
pub fn click_url(base_url: &str, tracking_id: &str, target: &str) -> String {
    format!(
        "{}/track/click/{tracking_id}?url={}",
        base_url.trim_end_matches('/'),
        urlencoding::encode(target)
    )
}

/// Email body rewritten for tracking.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackedBody {
    pub html: String,
    /// Original link targets, in order of appearance (deduplicated).
    pub links: Vec<String>,
}

/// Rewrite every absolute `href` to go through the click tracker and append
/// the open pixel (before `</body>` when present).
pub fn inject_tracking(body: &str, base_url: &str, tracking_id: &str) -> TrackedBody {
    let mut links: Vec<String> = Vec::new();
    let rewritten = HREF_RE.replace_all(body, |caps: &Captures| {
        let target = &caps[1];
        if !links.iter().any(|l| l == target) {
            links.push(target.to_string());
        }
        format!("href=\"{}\"", click_url(base_url, tracking_id, target))
    });

    let pixel = format!(
        "<img src=\"{}\" width=\"1\" height=\"1\" alt=\"\" style=\"display:none\" />",
        open_pixel_url(base_url, tracking_id)
    );
    let html = match rewritten.rfind("</body>") {
        Some(pos) => format!("{}{pixel}{}", &rewritten[..pos], &rewritten[pos..]),
        None => format!("{rewritten}{pixel}"),
    };

    TrackedBody { html, links }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn smtp_fails_below_its_rate() {
        assert_eq!(
            simulate_delivery(EmailProvider::Smtp, 0.5),
            DeliveryOutcome::Delivered
        );
        assert!(matches!(
            simulate_delivery(EmailProvider::Smtp, 0.09),
            DeliveryOutcome::Failed { .. }
        ));
    }

    #[test]
    fn oauth_providers_fail_less_often() {
        assert_eq!(
            simulate_delivery(EmailProvider::Gmail, 0.07),
            DeliveryOutcome::Delivered
        );
        match simulate_delivery(EmailProvider::Outlook, 0.01) {
            DeliveryOutcome::Failed { message, error } => {
                assert!(message.contains("outlook"));
                assert_eq!(error, "OAUTH_TOKEN_EXPIRED");
            }
            DeliveryOutcome::Delivered => panic!("roll below the rate must fail"),
        }
    }

    #[test]
    fn provider_names_round_trip() {
        for p in [EmailProvider::Smtp, EmailProvider::Gmail, EmailProvider::Outlook] {
            assert_eq!(EmailProvider::parse(p.as_str()), Some(p));
        }
        assert_eq!(EmailProvider::parse("pigeon"), None);
    }

    #[test]
    fn click_url_encodes_target() {
        let url = click_url("http://crm.test/", "abc", "https://x.io/a?b=1&c=2");
        assert_eq!(
            url,
            "http://crm.test/track/click/abc?url=https%3A%2F%2Fx.io%2Fa%3Fb%3D1%26c%3D2"
        );

        let url = click_url("http://crm.test", "abc", "https://x.io/a b/caf\u{e9}");
        assert_eq!(
            url,
            "http://crm.test/track/click/abc?url=https%3A%2F%2Fx.io%2Fa%20b%2Fcaf%C3%A9"
        );
    }

    #[test]
    fn inject_tracking_rewrites_links_and_appends_pixel() {
        let body = r#"<html><body><a href="https://a.io">A</a> <a href="https://a.io">again</a> <a href="mailto:x@y.z">m</a></body></html>"#;
        let tracked = inject_tracking(body, "http://crm.test", "t1");

        assert_eq!(tracked.links, vec!["https://a.io".to_string()]);
        assert!(tracked.html.contains("http://crm.test/track/click/t1?url=https%3A%2F%2Fa.io"));
        assert!(tracked.html.contains("mailto:x@y.z"), "non-http links untouched");
        assert!(tracked
            .html
            .contains("<img src=\"http://crm.test/track/open/t1\""));
        assert!(tracked.html.ends_with("</body></html>"));
    }

    #[test]
    fn inject_tracking_appends_pixel_to_plain_text() {
        let tracked = inject_tracking("Hello there", "http://crm.test", "t2");
        assert!(tracked.html.starts_with("Hello there<img"));
        assert!(tracked.links.is_empty());
    }

    #[test]
    fn pixel_is_a_gif() {
        assert_eq!(&TRACKING_PIXEL_GIF[..6], b"GIF89a");
    }
}
