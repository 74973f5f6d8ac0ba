//! Request-scoped event store and lifecycle binding
//!
//! Exactly one [`RequestContext`] is bound per execution unit (tokio
//! task) handling a request. The host wraps each handler invocation in
//! [`scope`]; inside the scope, [`begin`], [`record_event`],
//! [`record_params`], [`current`] and [`clear`] all operate on the
//! task-local slot, so application code never threads the context through
//! its call chain. Concurrent requests run in separate tasks and never
//! observe each other's state.
//!
//! Binding is synchronous and non-suspending; nothing in this module
//! performs I/O.

use std::cell::RefCell;

use serde_json::{Map, Value};

use crate::types::{EventRecord, RequestInfo, ResponseInfo};

/// Per-request accumulator: the request snapshot, the response once the
/// handler returns, recorded events, and payload-wide shared parameters.
///
/// The context never escapes to background work; only the built payload
/// crosses into the dispatch task.
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// Inbound request snapshot
    pub request: RequestInfo,
    /// Outbound response snapshot, absent until the handler completes
    pub response: Option<ResponseInfo>,
    events: Vec<EventRecord>,
    shared_params: Map<String, Value>,
    tracked: Option<bool>,
}

impl RequestContext {
    /// Create a context with an empty event list and no response.
    pub fn new(request: RequestInfo) -> Self {
        Self {
            request,
            response: None,
            events: Vec::new(),
            shared_params: Map::new(),
            tracked: None,
        }
    }

    /// Append an event, preserving recording order.
    ///
    /// This is the explicit-context variant of [`record_event`]; use it
    /// on a context you own — a strategy handle, or the context taken
    /// out with [`clear`]. A clone from [`current`] is detached and
    /// recording into it never reaches the live binding.
    pub fn record_event(&mut self, event: EventRecord) {
        if event.name.is_empty() {
            tracing::error!("Ignoring event with empty name");
            return;
        }
        self.events.push(event);
    }

    /// Merge key/value pairs into the shared-parameter set.
    ///
    /// Shared parameters are merged into every event at payload-build
    /// time (per-event values win); they are not attached to individual
    /// events here.
    pub fn record_params(&mut self, params: Map<String, Value>) {
        self.shared_params.extend(params);
    }

    /// Events in recording order.
    pub fn events(&self) -> &[EventRecord] {
        &self.events
    }

    /// Payload-wide shared parameters.
    pub fn shared_params(&self) -> &Map<String, Value> {
        &self.shared_params
    }

    /// Whether an event with the given name has been recorded.
    pub fn has_event(&self, name: &str) -> bool {
        self.events.iter().any(|e| e.name == name)
    }

    /// Memoized track decision, set once during the attach hook.
    pub fn tracked(&self) -> Option<bool> {
        self.tracked
    }

    pub(crate) fn set_tracked(&mut self, tracked: bool) {
        self.tracked = Some(tracked);
    }
}

tokio::task_local! {
    static CURRENT: RefCell<Option<RequestContext>>;
}

/// Run `f` with an (initially empty) request-context slot bound to the
/// current task.
///
/// The host wraps each request handler in this scope; all lifecycle
/// hooks and recording calls must run inside it.
pub async fn scope<F>(f: F) -> F::Output
where
    F: std::future::Future,
{
    CURRENT.scope(RefCell::new(None), f).await
}

/// Run `f` against the bound context, if any.
///
/// The slot stays borrowed for the duration of `f`, so `f` must not call
/// back into this module; callers that invoke arbitrary code (strategy
/// overrides) detach the context with [`clear`] and [`restore`] instead.
pub(crate) fn with_current<R>(f: impl FnOnce(&mut RequestContext) -> R) -> Option<R> {
    CURRENT
        .try_with(|slot| slot.borrow_mut().as_mut().map(f))
        .ok()
        .flatten()
}

/// Re-bind a context previously taken out with [`clear`].
pub(crate) fn restore(ctx: RequestContext) {
    let restored = CURRENT.try_with(|slot| {
        *slot.borrow_mut() = Some(ctx);
    });
    if restored.is_err() {
        tracing::error!("restore called outside a tracking scope; context dropped");
    }
}

/// Whether a context is currently bound to this task.
pub fn is_bound() -> bool {
    CURRENT
        .try_with(|slot| slot.borrow().is_some())
        .unwrap_or(false)
}

/// Bind a fresh context for `request` to the current task.
///
/// Idempotent: a re-entrant `begin` keeps the existing context and its
/// event list. Calling outside a [`scope`] is a logged error and a no-op.
pub fn begin(request: RequestInfo) {
    let bound = CURRENT.try_with(|slot| {
        let mut slot = slot.borrow_mut();
        if slot.is_none() {
            *slot = Some(RequestContext::new(request));
        }
    });

    if bound.is_err() {
        tracing::error!("begin called outside a tracking scope; request will not be tracked");
    }
}

/// Store the response on the bound context.
///
/// Must be called after the handler produced a response and before the
/// tracking decision is evaluated.
pub fn attach(response: ResponseInfo) {
    let attached = with_current(|ctx| {
        if ctx.response.is_some() {
            tracing::error!("Response already attached for this request");
            return;
        }
        ctx.response = Some(response);
    });

    if attached.is_none() {
        tracing::error!("attach called with no request context bound");
    }
}

/// Append an event to the bound context's event list.
///
/// Recording without a bound context is a misconfiguration, not a crash:
/// the event is dropped with a logged error and request handling
/// continues unaffected.
pub fn record_event(event: EventRecord) {
    let name = event.name.clone();
    if with_current(|ctx| ctx.record_event(event)).is_none() {
        tracing::error!(event = %name, "No request context bound; event dropped");
    }
}

/// Merge key/value pairs into the bound context's shared parameters.
pub fn record_params(params: Map<String, Value>) {
    if with_current(|ctx| ctx.record_params(params)).is_none() {
        tracing::error!("No request context bound; parameters dropped");
    }
}

/// Clone of the bound context, or None.
///
/// The clone is detached: recording into it does not affect the bound
/// context. Use [`record_event`]/[`record_params`] to reach the live
/// binding, or the methods on a [`RequestContext`] you own (a strategy
/// handle, or the context returned by [`clear`]).
pub fn current() -> Option<RequestContext> {
    CURRENT
        .try_with(|slot| slot.borrow().clone())
        .ok()
        .flatten()
}

/// Unbind and return the context for the current task.
///
/// Idempotent: with nothing bound (or outside a scope) this returns None
/// without error. Must run on every exit path, including requests
/// aborted before a response was attached.
pub fn clear() -> Option<RequestContext> {
    CURRENT
        .try_with(|slot| slot.borrow_mut().take())
        .ok()
        .flatten()
}
