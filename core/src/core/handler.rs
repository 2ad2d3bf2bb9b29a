// src/core/handler.rs

use super::{Control, Shared};
use std::future::Future;
use std::pin::Pin;

/// Boxed future returned by a stored handler.
pub type HandlerFuture<E> = Pin<Box<dyn Future<Output = Result<Control, E>> + Send>>;

/// A stored step handler.
///
/// Handlers receive their own clone of the flow context. They must release
/// every lock guard before awaiting; the usual shape is "copy what you need
/// out of a read guard, await, then write results back under a fresh guard".
pub type Handler<T, E> = Box<dyn Fn(Shared<T>) -> HandlerFuture<E> + Send + Sync>;

/// Wraps a user closure into a [`Handler`], converting its error type.
pub(crate) fn boxed<T, E, F, Fut, UE>(handler_fn: F) -> Handler<T, E>
where
  T: 'static + Send + Sync,
  E: 'static,
  F: Fn(Shared<T>) -> Fut + Send + Sync + 'static,
  Fut: Future<Output = Result<Control, UE>> + Send + 'static,
  UE: Into<E> + 'static,
{
  Box::new(move |ctx| {
    let fut = handler_fn(ctx);
    Box::pin(async move { fut.await.map_err(Into::into) })
  })
}
