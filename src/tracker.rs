//! Tracker facade: strategy registry and lifecycle hooks
//!
//! The host framework calls three hooks per request:
//!
//! 1. [`Tracker::begin`] when request processing starts,
//! 2. [`Tracker::attach`] once a response exists but has not been sent
//!    (this is where the track decision is made and the client-id cookie
//!    is scheduled, while the response is still mutable),
//! 3. [`Tracker::on_request_finished`] after the response has been fully
//!    handled, which builds the payload, spawns the fire-and-forget
//!    dispatch, and always clears the request binding.
//!
//! All hooks must run inside [`crate::context::scope`]. Strategy
//! overrides are injected at startup through [`TrackerBuilder`];
//! construction fails fast on invalid configuration.

use std::sync::Arc;

use serde_json::Map;

use crate::config::TrackingConfig;
use crate::context::{self, RequestContext};
use crate::dispatch::Dispatcher;
use crate::error::Result;
use crate::identity::{generate_client_id, issue_cookie, resolve_client_id};
use crate::payload::{DefaultPayloadBuilder, PayloadStrategy};
use crate::track::{BotDetector, DefaultTrackFilter, NoopBotDetector, TrackFilter};
use crate::types::{Payload, RequestInfo, ResponseInfo};

/// Strategy run for every tracked request once the response is attached.
///
/// The given handle is the live context, detached from the task-local
/// slot for the duration of the call: record events and parameters
/// through it, not through the module-level helpers in
/// [`crate::context`] (those see no binding and drop the call with a
/// logged error).
pub trait PostProcessor: Send + Sync {
    fn process(&self, ctx: &mut RequestContext);
}

/// Default post-processing: resolve the client id, schedule the cookie
/// when the id is new, and record `client_id` into the shared parameters
/// so the payload builder merges it into every event.
#[derive(Debug, Default)]
pub struct DefaultPostProcessor;

impl PostProcessor for DefaultPostProcessor {
    fn process(&self, ctx: &mut RequestContext) {
        let identity = resolve_client_id(&ctx.request, generate_client_id);
        if identity.is_new {
            if let Some(response) = ctx.response.as_mut() {
                issue_cookie(response, &identity.id);
            }
        }

        let mut params = Map::new();
        params.insert("client_id".to_string(), identity.id.into());
        ctx.record_params(params);
    }
}

/// Server-side tracking pipeline bound to one collector configuration.
pub struct Tracker {
    filter: Arc<dyn TrackFilter>,
    builder: Arc<dyn PayloadStrategy>,
    post: Arc<dyn PostProcessor>,
    dispatcher: Arc<Dispatcher>,
}

/// Builder injecting strategy overrides before the tracker starts.
pub struct TrackerBuilder {
    config: TrackingConfig,
    filter: Option<Arc<dyn TrackFilter>>,
    builder: Option<Arc<dyn PayloadStrategy>>,
    post: Option<Arc<dyn PostProcessor>>,
    bots: Option<Arc<dyn BotDetector>>,
}

impl TrackerBuilder {
    pub fn new(config: TrackingConfig) -> Self {
        Self {
            config,
            filter: None,
            builder: None,
            post: None,
            bots: None,
        }
    }

    /// Replace the track-decision filter wholesale.
    pub fn track_filter(mut self, filter: Arc<dyn TrackFilter>) -> Self {
        self.filter = Some(filter);
        self
    }

    /// Replace the payload-generation strategy wholesale.
    pub fn payload_strategy(mut self, builder: Arc<dyn PayloadStrategy>) -> Self {
        self.builder = Some(builder);
        self
    }

    /// Replace the post-processing strategy wholesale.
    pub fn post_processor(mut self, post: Arc<dyn PostProcessor>) -> Self {
        self.post = Some(post);
        self
    }

    /// Wire in the external bot-detection capability used by the default
    /// track filter.
    pub fn bot_detector(mut self, bots: Arc<dyn BotDetector>) -> Self {
        self.bots = Some(bots);
        self
    }

    /// Validate configuration and assemble the tracker.
    pub fn build(self) -> Result<Tracker> {
        self.config.validate()?;
        let ignore_url = self.config.ignore_url()?;
        let dispatcher = Arc::new(Dispatcher::new(&self.config)?);

        let bots = self
            .bots
            .unwrap_or_else(|| Arc::new(NoopBotDetector));
        let filter = self
            .filter
            .unwrap_or_else(|| Arc::new(DefaultTrackFilter::new(ignore_url, bots)));
        let builder = self
            .builder
            .unwrap_or_else(|| Arc::new(DefaultPayloadBuilder));
        let post = self.post.unwrap_or_else(|| Arc::new(DefaultPostProcessor));

        Ok(Tracker {
            filter,
            builder,
            post,
            dispatcher,
        })
    }
}

impl Tracker {
    /// Start building a tracker with strategy overrides.
    pub fn builder(config: TrackingConfig) -> TrackerBuilder {
        TrackerBuilder::new(config)
    }

    /// Build a tracker with the default strategies.
    pub fn new(config: TrackingConfig) -> Result<Self> {
        Self::builder(config).build()
    }

    /// Lifecycle hook: request processing starts.
    pub fn begin(&self, request: RequestInfo) {
        context::begin(request);
    }

    /// Lifecycle hook: a response exists but has not been sent.
    ///
    /// Stores a snapshot on the bound context, evaluates the track
    /// decision exactly once, and runs post-processing for tracked
    /// requests. Cookies scheduled by post-processing are copied back
    /// onto `response` for the host to apply before sending.
    ///
    /// The context is taken out of the task-local slot while the
    /// strategies run and re-bound afterwards, so an override calling
    /// back into the [`crate::context`] module sees "no context bound"
    /// (a logged no-op) rather than crashing the request; overrides
    /// record through the context handle they are given.
    pub fn attach(&self, response: &mut ResponseInfo) {
        let Some(mut ctx) = context::clear() else {
            tracing::error!("attach called with no request context bound");
            return;
        };

        if ctx.response.is_some() {
            tracing::error!("Response already attached for this request");
            context::restore(ctx);
            return;
        }
        ctx.response = Some(response.clone());

        let tracked = self.filter.should_track(&ctx);
        ctx.set_tracked(tracked);
        if tracked {
            self.post.process(&mut ctx);
            if let Some(stored) = &ctx.response {
                response.cookies = stored.cookies.clone();
            }
        }

        context::restore(ctx);
    }

    /// Lifecycle hook: the response has been fully handled.
    ///
    /// Always unbinds the context (including for aborted or untracked
    /// requests); for tracked requests with a payload, spawns the
    /// dispatch on a detached task so collector latency never reaches
    /// the request path.
    pub fn on_request_finished(&self) {
        let Some(ctx) = context::clear() else {
            return;
        };

        if ctx.tracked() != Some(true) {
            return;
        }

        let Some(payload) = self.builder.build(&ctx) else {
            return;
        };

        let user_agent = ctx.request.user_agent().map(str::to_string);
        self.spawn_dispatch(payload, user_agent);
    }

    fn spawn_dispatch(&self, payload: Payload, user_agent: Option<String>) {
        let dispatcher = Arc::clone(&self.dispatcher);
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    dispatcher.dispatch(&payload, user_agent.as_deref()).await;
                });
            }
            Err(_) => {
                tracing::warn!("No async runtime available; analytics payload dropped");
            }
        }
    }

    /// Evaluate the configured track-decision filter for a context.
    pub fn should_track(&self, ctx: &RequestContext) -> bool {
        self.filter.should_track(ctx)
    }

    /// Run the configured payload strategy for a context.
    pub fn build_payload(&self, ctx: &RequestContext) -> Option<Payload> {
        self.builder.build(ctx)
    }
}
