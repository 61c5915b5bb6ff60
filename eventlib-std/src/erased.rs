//! Type-erased handlers.
//!
//! Each subscription stores its handler behind one of four object-safe
//! traits, so handlers of different event types and shapes can share a
//! registry. The wrappers downcast the (already projected) event back to the
//! type the handler was registered for.

use eventlib_core::{
    AnyEvent, AsyncHandler, AsyncScope, BoxError, ErrorGroup, Event, ExitAction, Handler,
    HandlerKind, ProjectionError, Scope,
};
use futures::future::{self, BoxFuture};
use std::any::{Any, type_name};
use std::marker::PhantomData;
use std::sync::Arc;

/// The value held by an open scope.
pub(crate) type Guard = Box<dyn Any + Send>;

pub(crate) trait DynHandler: Send + Sync {
    fn call(&self, event: &mut AnyEvent) -> Result<(), BoxError>;
}

pub(crate) trait DynAsyncHandler: Send + Sync {
    fn call<'a>(&'a self, event: &'a mut AnyEvent) -> BoxFuture<'a, Result<(), BoxError>>;
}

pub(crate) trait DynScope: Send + Sync {
    fn enter(&self, event: &mut AnyEvent) -> Result<Guard, BoxError>;

    fn exit(
        &self,
        guard: Guard,
        event: &mut AnyEvent,
        in_flight: Option<&ErrorGroup>,
    ) -> Result<ExitAction, BoxError>;
}

pub(crate) trait DynAsyncScope: Send + Sync {
    fn enter<'a>(&'a self, event: &'a mut AnyEvent) -> BoxFuture<'a, Result<Guard, BoxError>>;

    fn exit<'a>(
        &'a self,
        guard: Guard,
        event: &'a mut AnyEvent,
        in_flight: Option<&'a ErrorGroup>,
    ) -> BoxFuture<'a, Result<ExitAction, BoxError>>;
}

/// A handler together with the event type it was registered for.
#[derive(Clone)]
pub(crate) enum Erased {
    Plain(Arc<dyn DynHandler>),
    PlainAsync(Arc<dyn DynAsyncHandler>),
    Scoped(Arc<dyn DynScope>),
    ScopedAsync(Arc<dyn DynAsyncScope>),
}

impl Erased {
    pub(crate) fn kind(&self) -> HandlerKind {
        match self {
            Erased::Plain(_) => HandlerKind::PlainSync,
            Erased::PlainAsync(_) => HandlerKind::PlainAsync,
            Erased::Scoped(_) => HandlerKind::ScopedSync,
            Erased::ScopedAsync(_) => HandlerKind::ScopedAsync,
        }
    }

    pub(crate) fn plain<E: Event, H: Handler<E>>(handler: Arc<H>) -> Self {
        Erased::Plain(Arc::new(Typed::<E, H>::new(handler)))
    }

    pub(crate) fn plain_async<E: Event, H: AsyncHandler<E>>(handler: Arc<H>) -> Self {
        Erased::PlainAsync(Arc::new(Typed::<E, H>::new(handler)))
    }

    pub(crate) fn scoped<E: Event, S: Scope<E>>(scope: Arc<S>) -> Self {
        Erased::Scoped(Arc::new(Typed::<E, S>::new(scope)))
    }

    pub(crate) fn scoped_async<E: Event, S: AsyncScope<E>>(scope: Arc<S>) -> Self {
        Erased::ScopedAsync(Arc::new(Typed::<E, S>::new(scope)))
    }
}

struct Typed<E, H> {
    inner: Arc<H>,
    _event: PhantomData<fn(&mut E)>,
}

impl<E, H> Typed<E, H> {
    fn new(inner: Arc<H>) -> Self {
        Self {
            inner,
            _event: PhantomData,
        }
    }
}

fn view<E: Event>(event: &mut AnyEvent) -> Result<&mut E, BoxError> {
    event.downcast_mut::<E>().ok_or_else(|| mismatch::<E>())
}

fn mismatch<T>() -> BoxError {
    Box::new(ProjectionError {
        expected: type_name::<T>(),
    })
}

impl<E: Event, H: Handler<E>> DynHandler for Typed<E, H> {
    fn call(&self, event: &mut AnyEvent) -> Result<(), BoxError> {
        self.inner.handle(view::<E>(event)?)
    }
}

impl<E: Event, H: AsyncHandler<E>> DynAsyncHandler for Typed<E, H> {
    fn call<'a>(&'a self, event: &'a mut AnyEvent) -> BoxFuture<'a, Result<(), BoxError>> {
        match view::<E>(event) {
            Ok(event) => Box::pin(self.inner.handle(event)),
            Err(err) => Box::pin(future::ready(Err(err))),
        }
    }
}

impl<E: Event, S: Scope<E>> DynScope for Typed<E, S> {
    fn enter(&self, event: &mut AnyEvent) -> Result<Guard, BoxError> {
        let guard = self.inner.enter(view::<E>(event)?)?;
        Ok(Box::new(guard))
    }

    fn exit(
        &self,
        guard: Guard,
        event: &mut AnyEvent,
        in_flight: Option<&ErrorGroup>,
    ) -> Result<ExitAction, BoxError> {
        let guard = guard
            .downcast::<S::Guard>()
            .map_err(|_| mismatch::<S::Guard>())?;
        self.inner.exit(*guard, view::<E>(event)?, in_flight)
    }
}

impl<E: Event, S: AsyncScope<E>> DynAsyncScope for Typed<E, S> {
    fn enter<'a>(&'a self, event: &'a mut AnyEvent) -> BoxFuture<'a, Result<Guard, BoxError>> {
        match view::<E>(event) {
            Ok(event) => Box::pin(async move {
                let guard = self.inner.enter(event).await?;
                Ok(Box::new(guard) as Guard)
            }),
            Err(err) => Box::pin(future::ready(Err(err))),
        }
    }

    fn exit<'a>(
        &'a self,
        guard: Guard,
        event: &'a mut AnyEvent,
        in_flight: Option<&'a ErrorGroup>,
    ) -> BoxFuture<'a, Result<ExitAction, BoxError>> {
        let guard = match guard.downcast::<S::Guard>() {
            Ok(guard) => *guard,
            Err(_) => return Box::pin(future::ready(Err(mismatch::<S::Guard>()))),
        };
        match view::<E>(event) {
            Ok(event) => Box::pin(self.inner.exit(guard, event, in_flight)),
            Err(err) => Box::pin(future::ready(Err(err))),
        }
    }
}
