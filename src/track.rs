//! Track-decision filtering
//!
//! Decides once per request, before any payload work, whether the request
//! should be tracked at all. The default policy drops excluded paths,
//! requests without a `User-Agent`, and known crawlers; the whole
//! decision is replaceable via [`TrackFilter`].

use std::sync::Arc;

use regex::Regex;

use crate::context::RequestContext;

/// External bot-detection capability.
///
/// The actual crawler database lives outside this library; hosts inject
/// an implementation through the tracker builder.
pub trait BotDetector: Send + Sync {
    /// Whether the given user agent belongs to a known crawler.
    fn is_bot(&self, user_agent: &str) -> bool;
}

/// Detector used when no bot database is wired in; flags nothing.
#[derive(Debug, Default)]
pub struct NoopBotDetector;

impl BotDetector for NoopBotDetector {
    fn is_bot(&self, _user_agent: &str) -> bool {
        false
    }
}

/// Strategy deciding whether a request is tracked.
pub trait TrackFilter: Send + Sync {
    /// Evaluated once per request, before payload building.
    fn should_track(&self, ctx: &RequestContext) -> bool;
}

/// Default policy: reject excluded paths, missing user agents, and
/// crawlers; accept everything else.
pub struct DefaultTrackFilter {
    ignore_url: Option<Regex>,
    bots: Arc<dyn BotDetector>,
}

impl DefaultTrackFilter {
    pub fn new(ignore_url: Option<Regex>, bots: Arc<dyn BotDetector>) -> Self {
        Self { ignore_url, bots }
    }
}

impl TrackFilter for DefaultTrackFilter {
    fn should_track(&self, ctx: &RequestContext) -> bool {
        if let Some(pattern) = &self.ignore_url {
            if pattern.is_match(&ctx.request.path) {
                tracing::debug!(path = %ctx.request.path, "Path excluded from tracking");
                return false;
            }
        }

        let Some(user_agent) = ctx.request.user_agent() else {
            tracing::debug!("Request has no user agent; not tracked");
            return false;
        };

        if self.bots.is_bot(user_agent) {
            tracing::debug!(user_agent, "Crawler request; not tracked");
            return false;
        }

        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RequestInfo;

    struct StubBotDetector {
        signature: &'static str,
    }

    impl BotDetector for StubBotDetector {
        fn is_bot(&self, user_agent: &str) -> bool {
            user_agent.contains(self.signature)
        }
    }

    fn context_for(request: RequestInfo) -> RequestContext {
        RequestContext::new(request)
    }

    fn default_filter() -> DefaultTrackFilter {
        DefaultTrackFilter::new(None, Arc::new(NoopBotDetector))
    }

    #[test]
    fn test_accepts_ordinary_request() {
        let ctx = context_for(
            RequestInfo::new("GET", "/page", "https://example.com/page")
                .with_header("User-Agent", "TestAgent/1.0"),
        );
        assert!(default_filter().should_track(&ctx));
    }

    #[test]
    fn test_rejects_missing_user_agent() {
        let ctx = context_for(RequestInfo::new("GET", "/page", "https://example.com/page"));
        assert!(!default_filter().should_track(&ctx));
    }

    #[test]
    fn test_rejects_excluded_path() {
        let filter = DefaultTrackFilter::new(
            Some(Regex::new(r"^/(admin|health)").unwrap()),
            Arc::new(NoopBotDetector),
        );

        let excluded = context_for(
            RequestInfo::new("GET", "/admin/users", "https://example.com/admin/users")
                .with_header("User-Agent", "TestAgent/1.0"),
        );
        assert!(!filter.should_track(&excluded));

        let allowed = context_for(
            RequestInfo::new("GET", "/page", "https://example.com/page")
                .with_header("User-Agent", "TestAgent/1.0"),
        );
        assert!(filter.should_track(&allowed));
    }

    #[test]
    fn test_rejects_known_crawler() {
        let filter = DefaultTrackFilter::new(
            None,
            Arc::new(StubBotDetector {
                signature: "Googlebot",
            }),
        );

        let bot = context_for(
            RequestInfo::new("GET", "/page", "https://example.com/page")
                .with_header("User-Agent", "Mozilla/5.0 (compatible; Googlebot/2.1)"),
        );
        assert!(!filter.should_track(&bot));

        let human = context_for(
            RequestInfo::new("GET", "/page", "https://example.com/page")
                .with_header("User-Agent", "Mozilla/5.0"),
        );
        assert!(filter.should_track(&human));
    }
}
