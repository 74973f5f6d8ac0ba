//! Payload building
//!
//! Turns the accumulated request context into the single outbound
//! payload, or nothing when the request does not qualify. The default
//! algorithm only tracks fully successful HTML page loads; a configured
//! [`PayloadStrategy`] replaces it wholesale, it does not wrap it.

use serde_json::{json, Value};

use crate::context::RequestContext;
use crate::page::extract_page_info;
use crate::types::{EventRecord, Payload};

/// Name of the implicit page-view event.
pub const PAGE_VIEW_EVENT: &str = "page_view";

/// User agents are truncated to this many characters before being added
/// as an event parameter.
const USER_AGENT_MAX_CHARS: usize = 100;

/// Strategy producing the outbound payload for a finished request.
pub trait PayloadStrategy: Send + Sync {
    /// Build the payload, or None when the request yields nothing.
    fn build(&self, ctx: &RequestContext) -> Option<Payload>;
}

/// Default payload algorithm.
///
/// In order: require recorded events, a 200 status, and an HTML content
/// type; synthesize a leading `page_view` when none was recorded; then
/// enrich every event with `engagement_time_msec`, `user_agent`,
/// `page_referrer` and the context's shared parameters, never
/// overwriting values an event already carries.
#[derive(Debug, Default)]
pub struct DefaultPayloadBuilder;

impl PayloadStrategy for DefaultPayloadBuilder {
    fn build(&self, ctx: &RequestContext) -> Option<Payload> {
        if ctx.events().is_empty() {
            return None;
        }

        let response = ctx.response.as_ref()?;
        if response.status != 200 {
            // Partial, error and redirect responses are not page loads
            return None;
        }
        if !response.is_html() {
            return None;
        }

        let mut events = ctx.events().to_vec();

        if !ctx.has_event(PAGE_VIEW_EVENT) {
            if let Some(info) = extract_page_info(ctx) {
                let page_view = EventRecord::new(PAGE_VIEW_EVENT)
                    .with_param("page_location", info.page_location)
                    .with_param("page_title", info.page_title);
                events.insert(0, page_view);
            }
        }

        let user_agent = ctx.request.user_agent().map(truncate_user_agent);
        let referrer = ctx.request.referer().map(str::to_string);

        for event in &mut events {
            event.set_if_absent("engagement_time_msec", json!(1));
            if let Some(ua) = &user_agent {
                event.set_if_absent("user_agent", Value::String(ua.clone()));
            }
            if let Some(referrer) = &referrer {
                event.set_if_absent("page_referrer", Value::String(referrer.clone()));
            }
            for (key, value) in ctx.shared_params() {
                event.set_if_absent(key, value.clone());
            }
        }

        // Preserves the zero-event payload invariant even if a future
        // change makes the list collapsible above
        if events.is_empty() {
            return None;
        }

        Some(Payload { events })
    }
}

fn truncate_user_agent(user_agent: &str) -> String {
    user_agent.chars().take(USER_AGENT_MAX_CHARS).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{RequestInfo, ResponseInfo};
    use serde_json::Map;

    fn html_response() -> ResponseInfo {
        ResponseInfo::new(200)
            .with_content_type("text/html; charset=utf-8")
            .with_body("<html><head><title>Welcome</title></head><body></body></html>")
    }

    fn tracked_context() -> RequestContext {
        let mut ctx = RequestContext::new(
            RequestInfo::new("GET", "/page", "https://example.com/page")
                .with_header("User-Agent", "TestAgent/1.0")
                .with_header("Referer", "https://search.example/"),
        );
        ctx.response = Some(html_response());
        ctx
    }

    #[test]
    fn test_no_events_no_payload() {
        let ctx = tracked_context();
        assert!(DefaultPayloadBuilder.build(&ctx).is_none());
    }

    #[test]
    fn test_non_200_no_payload() {
        let mut ctx = tracked_context();
        ctx.record_event(EventRecord::new("signup"));
        ctx.response = Some(
            ResponseInfo::new(302)
                .with_content_type("text/html")
                .with_body("<html></html>"),
        );
        assert!(DefaultPayloadBuilder.build(&ctx).is_none());
    }

    #[test]
    fn test_non_html_no_payload() {
        let mut ctx = tracked_context();
        ctx.record_event(EventRecord::new("signup"));
        ctx.response = Some(
            ResponseInfo::new(200)
                .with_content_type("application/json")
                .with_body("{}"),
        );
        assert!(DefaultPayloadBuilder.build(&ctx).is_none());
    }

    #[test]
    fn test_missing_response_no_payload() {
        let mut ctx = tracked_context();
        ctx.record_event(EventRecord::new("signup"));
        ctx.response = None;
        assert!(DefaultPayloadBuilder.build(&ctx).is_none());
    }

    #[test]
    fn test_page_view_synthesized_first() {
        let mut ctx = tracked_context();
        ctx.record_event(EventRecord::new("signup").with_param("plan", "pro"));

        let payload = DefaultPayloadBuilder.build(&ctx).unwrap();
        assert_eq!(payload.events.len(), 2);
        assert_eq!(payload.events[0].name, "page_view");
        assert_eq!(
            payload.events[0].params["page_location"],
            "https://example.com/page"
        );
        assert_eq!(payload.events[0].params["page_title"], "Welcome");
        assert_eq!(payload.events[1].name, "signup");
        assert_eq!(payload.events[1].params["plan"], "pro");
    }

    #[test]
    fn test_explicit_page_view_not_duplicated() {
        let mut ctx = tracked_context();
        ctx.record_event(EventRecord::new("custom"));
        ctx.record_event(EventRecord::new(PAGE_VIEW_EVENT).with_param("page_title", "Mine"));

        let payload = DefaultPayloadBuilder.build(&ctx).unwrap();
        assert_eq!(payload.events.len(), 2);
        // Recording order is preserved when page_view was explicit
        assert_eq!(payload.events[0].name, "custom");
        assert_eq!(payload.events[1].name, "page_view");
        assert_eq!(payload.events[1].params["page_title"], "Mine");
    }

    #[test]
    fn test_enrichment_never_overwrites() {
        let mut ctx = tracked_context();
        ctx.record_event(
            EventRecord::new("signup")
                .with_param("engagement_time_msec", 250)
                .with_param("user_agent", "Custom/2.0"),
        );

        let payload = DefaultPayloadBuilder.build(&ctx).unwrap();
        let signup = payload
            .events
            .iter()
            .find(|e| e.name == "signup")
            .unwrap();
        assert_eq!(signup.params["engagement_time_msec"], 250);
        assert_eq!(signup.params["user_agent"], "Custom/2.0");

        // The synthesized page_view still gets the defaults
        let page_view = &payload.events[0];
        assert_eq!(page_view.params["engagement_time_msec"], 1);
        assert_eq!(page_view.params["user_agent"], "TestAgent/1.0");
        assert_eq!(page_view.params["page_referrer"], "https://search.example/");
    }

    #[test]
    fn test_shared_params_merged_into_every_event() {
        let mut ctx = tracked_context();
        ctx.record_event(EventRecord::new("signup"));
        let mut shared = Map::new();
        shared.insert("client_id".to_string(), json!("42.1700000000"));
        ctx.record_params(shared);

        let payload = DefaultPayloadBuilder.build(&ctx).unwrap();
        for event in &payload.events {
            assert_eq!(event.params["client_id"], "42.1700000000");
        }
    }

    #[test]
    fn test_user_agent_truncated_to_100_chars() {
        let long_ua: String = "x".repeat(150);
        let mut ctx = RequestContext::new(
            RequestInfo::new("GET", "/page", "https://example.com/page")
                .with_header("User-Agent", long_ua),
        );
        ctx.response = Some(html_response());
        ctx.record_event(EventRecord::new("signup"));

        let payload = DefaultPayloadBuilder.build(&ctx).unwrap();
        let ua = payload.events[0].params["user_agent"].as_str().unwrap();
        assert_eq!(ua.len(), 100);
    }

    #[test]
    fn test_events_without_synthesizable_page_view() {
        // Bodyless HTML response: no page info, but recorded events still ship
        let mut ctx = tracked_context();
        ctx.response = Some(ResponseInfo::new(200).with_content_type("text/html"));
        ctx.record_event(EventRecord::new("signup"));

        let payload = DefaultPayloadBuilder.build(&ctx).unwrap();
        assert_eq!(payload.events.len(), 1);
        assert_eq!(payload.events[0].name, "signup");
    }
}
