//! # ga4-serverside
//!
//! Server-side GA4 Measurement Protocol tracking for HTTP request
//! pipelines.
//!
//! Application code records named events while a request is being
//! handled; when the request finishes, the accumulated events are
//! assembled into a single analytics payload and dispatched to the GA4
//! collector on a detached task, without delaying or altering the
//! response sent to the end user.
//!
//! The HTTP framework is a black box: it constructs
//! [`RequestInfo`]/[`ResponseInfo`] snapshots and invokes three
//! lifecycle hooks inside a per-request [`context::scope`].
//!
//! ## Example
//!
//! ```rust,no_run
//! use ga4_serverside::{context, EventRecord, RequestInfo, ResponseInfo, Tracker, TrackingConfig};
//!
//! # async fn handle() {
//! let tracker = Tracker::new(TrackingConfig::new("G-XXXXXXXXXX", "secret")).unwrap();
//!
//! context::scope(async {
//!     tracker.begin(
//!         RequestInfo::new("GET", "/page", "https://example.com/page")
//!             .with_header("User-Agent", "Mozilla/5.0"),
//!     );
//!
//!     // ... application code runs the handler and records events ...
//!     context::record_event(EventRecord::new("signup").with_param("plan", "pro"));
//!
//!     let mut response = ResponseInfo::new(200)
//!         .with_content_type("text/html")
//!         .with_body("<html><head><title>Welcome</title></head></html>");
//!     tracker.attach(&mut response);
//!     // host applies response.cookies, sends the response, then:
//!     tracker.on_request_finished();
//! })
//! .await;
//! # }
//! ```

// Re-export commonly used items at the crate root
pub use config::TrackingConfig;
pub use context::RequestContext;
pub use dispatch::Dispatcher;
pub use error::{Error, Result};
pub use payload::{DefaultPayloadBuilder, PayloadStrategy, PAGE_VIEW_EVENT};
pub use track::{BotDetector, DefaultTrackFilter, NoopBotDetector, TrackFilter};
pub use tracker::{DefaultPostProcessor, PostProcessor, Tracker, TrackerBuilder};
pub use types::*;

// Public modules
pub mod config;
pub mod context;
pub mod dispatch;
pub mod error;
pub mod identity;
pub mod logging;
pub mod page;
pub mod payload;
pub mod track;
pub mod tracker;
pub mod types;
