//! The event system container.
//!
//! An [`EventSystem`] owns one [`Registry`]. Systems are independent: a system
//! built from a parent starts with a snapshot of the parent's subscriptions,
//! and afterwards neither sees the other's new subscriptions.
//!
//! # Example
//!
//! ```rust,ignore
//! let system = EventSystem::new();
//! system.subscribe::<Chat>().priority(100).handler(|chat: &mut Chat| {
//!     println!("{}: {}", chat.name, chat.message);
//! })?;
//! system.emit(&mut Chat::new("Alice", "Hello World"))?;
//! ```

use crate::engine::{SuppressedObserver, run_blocking, run_cooperative};
use crate::erased::Erased;
use crate::graph::{EventType, TypeGraph};
use crate::plan::DispatchPlan;
use crate::registry::{HandlerId, Registry, Subscription};
use crate::resolve::resolve;
use eventlib_core::{
    AnyEvent, AsyncHandler, AsyncScope, DispatchError, Event, Failure, Handler,
    RegistrationError, Scope,
};
use std::any::{TypeId, type_name};
use std::fmt;
use std::marker::PhantomData;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

/// A container of subscriptions that events are emitted through.
pub struct EventSystem {
    registry: RwLock<Registry>,
    graph: &'static TypeGraph,
    on_suppressed: Option<SuppressedObserver>,
    reject_split: bool,
}

impl EventSystem {
    /// Create an empty system.
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Create a system holding a snapshot of `parent`'s subscriptions.
    pub fn from_parent(parent: &EventSystem) -> Self {
        Self::builder().parent(parent).build()
    }

    /// Start configuring a system.
    pub fn builder() -> EventSystemBuilder {
        EventSystemBuilder::default()
    }

    /// Start a subscription to events of type `E`.
    ///
    /// Nothing is registered until one of the [`Subscriber`] terminal methods
    /// is called.
    pub fn subscribe<E: Event>(&self) -> Subscriber<'_, E> {
        Subscriber {
            system: self,
            name: None,
            priority: 0,
            critical: false,
            _event: PhantomData,
        }
    }

    /// Dispatch `event` synchronously.
    ///
    /// Fails with [`DispatchError::UnsupportedHandlerKind`] if any applicable
    /// handler is asynchronous; in that case no handler runs.
    pub fn emit<E: Event>(&self, event: &mut E) -> Result<(), DispatchError> {
        let span = tracing::debug_span!("dispatch", event = type_name::<E>(), mode = "sync");
        let _entered = span.enter();

        let plan = self.plan::<E>()?;
        run_blocking(&plan, event as &mut AnyEvent, self.on_suppressed.as_ref())
    }

    /// Dispatch `event`, awaiting asynchronous handlers in plan order.
    ///
    /// If the returned future is dropped before completing (a timeout, or an
    /// aborted task), open sync scopes are still released, but open async
    /// scopes cannot be awaited from `Drop`: their guards are dropped without
    /// calling [`AsyncScope::exit`]. Use
    /// [`emit_async_until`](Self::emit_async_until) when a dispatch must be
    /// stoppable with every scope released.
    pub async fn emit_async<E: Event>(&self, event: &mut E) -> Result<(), DispatchError> {
        self.dispatch_async(event, None).await
    }

    /// Like [`emit_async`](Self::emit_async), stopping early once `cancel`
    /// fires.
    ///
    /// Scopes opened before the cancellation are still released; the result
    /// is then an [`Aborted`](DispatchError::Aborted) group holding
    /// [`Failure::Cancelled`], unless a scope absorbed it.
    pub async fn emit_async_until<E: Event>(
        &self,
        event: &mut E,
        cancel: &CancellationToken,
    ) -> Result<(), DispatchError> {
        self.dispatch_async(event, Some(cancel)).await
    }

    async fn dispatch_async<E: Event>(
        &self,
        event: &mut E,
        cancel: Option<&CancellationToken>,
    ) -> Result<(), DispatchError> {
        let span = tracing::debug_span!("dispatch", event = type_name::<E>(), mode = "async");
        async move {
            let plan = self.plan::<E>()?;
            run_cooperative(&plan, event as &mut AnyEvent, self.on_suppressed.as_ref(), cancel)
                .await
        }
        .instrument(span)
        .await
    }

    /// The plan an event of type `E` would currently be dispatched with.
    pub fn subscriptions_for<E: Event>(&self) -> Result<DispatchPlan, RegistrationError> {
        self.plan::<E>()
    }

    /// Total number of subscriptions.
    pub fn len(&self) -> usize {
        self.read().len()
    }

    /// Whether the system has no subscriptions.
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Resolve and order the handlers for `E`. The lock is released before
    /// the plan is returned, so handlers may subscribe while running.
    fn plan<E: Event>(&self) -> Result<DispatchPlan, RegistrationError> {
        let event_type = self.event_type::<E>()?;
        let resolved = resolve(&event_type, &self.read());
        Ok(DispatchPlan::from_resolved(resolved))
    }

    fn event_type<E: Event>(&self) -> Result<Arc<EventType>, RegistrationError> {
        let event_type = self.graph.event_type::<E>()?;
        if self.reject_split {
            event_type.ensure_unsplit()?;
        }
        Ok(event_type)
    }

    fn read(&self) -> RwLockReadGuard<'_, Registry> {
        self.registry.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Registry> {
        self.registry.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for EventSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for EventSystem {
    /// Same as [`EventSystem::from_parent`].
    fn clone(&self) -> Self {
        Self::from_parent(self)
    }
}

impl fmt::Debug for EventSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventSystem")
            .field("registry", &*self.read())
            .field("on_suppressed", &self.on_suppressed.is_some())
            .field("reject_split", &self.reject_split)
            .finish()
    }
}

/// Builder for an [`EventSystem`].
#[derive(Default)]
pub struct EventSystemBuilder {
    registry: Registry,
    on_suppressed: Option<SuppressedObserver>,
    reject_split: bool,
}

impl EventSystemBuilder {
    /// Start from a snapshot of `parent`'s subscriptions.
    ///
    /// The parent's suppressed-failure observer is inherited unless one was
    /// already set on this builder.
    pub fn parent(mut self, parent: &EventSystem) -> Self {
        self.registry = parent.read().clone();
        if self.on_suppressed.is_none() {
            self.on_suppressed = parent.on_suppressed.clone();
        }
        self.reject_split |= parent.reject_split;
        self
    }

    /// Refuse event types that hold a stateful ancestor more than once.
    ///
    /// Subscribing to or emitting such a type fails with
    /// [`RegistrationError::SplitAncestor`]. Without this, the type is
    /// dispatched and handlers of the ancestor see its left-most copy.
    pub fn reject_split_ancestors(mut self) -> Self {
        self.reject_split = true;
        self
    }

    /// Call `observer` with every failure of a non-critical handler.
    ///
    /// Such failures never abort a dispatch; they are logged and passed here.
    pub fn on_suppressed<F>(mut self, observer: F) -> Self
    where
        F: Fn(&Failure) + Send + Sync + 'static,
    {
        self.on_suppressed = Some(Arc::new(observer));
        self
    }

    /// Build the system.
    pub fn build(self) -> EventSystem {
        EventSystem {
            registry: RwLock::new(self.registry),
            graph: TypeGraph::global(),
            on_suppressed: self.on_suppressed,
            reject_split: self.reject_split,
        }
    }
}

impl fmt::Debug for EventSystemBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventSystemBuilder")
            .field("registry", &self.registry)
            .field("on_suppressed", &self.on_suppressed.is_some())
            .field("reject_split", &self.reject_split)
            .finish()
    }
}

/// A pending subscription to events of type `E`.
///
/// Terminal methods register the handler and hand it back as an `Arc`. The
/// `*_shared` variants take an existing `Arc`; registering the same `Arc`
/// under several event types keeps a single handler identity, so it still
/// runs at most once per dispatch.
#[must_use = "a subscriber does nothing until a handler is registered"]
pub struct Subscriber<'s, E> {
    system: &'s EventSystem,
    name: Option<&'static str>,
    priority: i32,
    critical: bool,
    _event: PhantomData<fn(&mut E)>,
}

impl<E: Event> Subscriber<'_, E> {
    /// Set the priority. Lower runs earlier; scopes with a lower priority wrap
    /// every step with a higher one. Defaults to 0.
    pub fn priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Make failures of this handler abort the dispatch.
    pub fn critical(mut self) -> Self {
        self.critical = true;
        self
    }

    /// Name the handler in logs and failures. Defaults to its type name.
    pub fn name(mut self, name: &'static str) -> Self {
        self.name = Some(name);
        self
    }

    /// Register a plain handler.
    pub fn handler<H: Handler<E>>(self, handler: H) -> Result<Arc<H>, RegistrationError> {
        self.handler_shared(Arc::new(handler))
    }

    /// Register a plain handler held in an existing `Arc`.
    pub fn handler_shared<H: Handler<E>>(self, handler: Arc<H>) -> Result<Arc<H>, RegistrationError> {
        let erased = Erased::plain::<E, H>(Arc::clone(&handler));
        self.register(handler, erased)
    }

    /// Register an asynchronous plain handler.
    pub fn handler_async<H: AsyncHandler<E>>(self, handler: H) -> Result<Arc<H>, RegistrationError> {
        self.handler_async_shared(Arc::new(handler))
    }

    /// Register an asynchronous plain handler held in an existing `Arc`.
    pub fn handler_async_shared<H: AsyncHandler<E>>(
        self,
        handler: Arc<H>,
    ) -> Result<Arc<H>, RegistrationError> {
        let erased = Erased::plain_async::<E, H>(Arc::clone(&handler));
        self.register(handler, erased)
    }

    /// Register a scope.
    pub fn scope<S: Scope<E>>(self, scope: S) -> Result<Arc<S>, RegistrationError> {
        self.scope_shared(Arc::new(scope))
    }

    /// Register a scope held in an existing `Arc`.
    pub fn scope_shared<S: Scope<E>>(self, scope: Arc<S>) -> Result<Arc<S>, RegistrationError> {
        let erased = Erased::scoped::<E, S>(Arc::clone(&scope));
        self.register(scope, erased)
    }

    /// Register an asynchronous scope.
    pub fn scope_async<S: AsyncScope<E>>(self, scope: S) -> Result<Arc<S>, RegistrationError> {
        self.scope_async_shared(Arc::new(scope))
    }

    /// Register an asynchronous scope held in an existing `Arc`.
    pub fn scope_async_shared<S: AsyncScope<E>>(
        self,
        scope: Arc<S>,
    ) -> Result<Arc<S>, RegistrationError> {
        let erased = Erased::scoped_async::<E, S>(Arc::clone(&scope));
        self.register(scope, erased)
    }

    fn register<H: 'static>(self, handler: Arc<H>, erased: Erased) -> Result<Arc<H>, RegistrationError> {
        // Reject invalid hierarchies here rather than at the first emit.
        self.system.event_type::<E>()?;

        let subscription = Subscription {
            id: HandlerId::of(&handler),
            name: self.name.unwrap_or(type_name::<H>()),
            event_type: TypeId::of::<E>(),
            event_name: type_name::<E>(),
            priority: self.priority,
            critical: self.critical,
            handler: erased,
        };
        tracing::debug!(
            event = subscription.event_name,
            handler = subscription.name,
            kind = %subscription.kind(),
            priority = subscription.priority,
            critical = subscription.critical,
            "subscribed"
        );
        self.system.write().register(subscription);
        Ok(handler)
    }
}

impl<E> fmt::Debug for Subscriber<'_, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscriber")
            .field("event", &type_name::<E>())
            .field("priority", &self.priority)
            .field("critical", &self.critical)
            .finish()
    }
}
