pub mod context;
pub mod method;
pub mod pattern;
pub mod pipeline;
pub mod router;
pub mod staged;

pub use context::Context;
pub use method::Method;
pub use router::Router;
pub use router::payload::{MethodKey, NodePayload};

use std::{pin::Pin, sync::Arc};

use tokio::sync::Mutex;

use crate::web::routing::router::tree::{RadixNodeRef, RadixTree};

/// # Handler Future
///
/// A future produced by one handler invocation. Handlers report nothing back
/// through the future; they either call their `next` or they don't.
pub type HandlerFuture = Pin<Box<dyn Future<Output = ()> + Send>>;

/// # Handler Function (FN)
///
/// An async function over the shared context and a continuation.
///
/// Calling the continuation hands control to the rest of the pipeline; not
/// calling it ends the request right there.
pub type HandlerFn = dyn Fn(ContextRef, Next) -> HandlerFuture + Send + Sync + 'static;

/// # Handler Function (FN) Ref
///
/// The cloneable form handlers are stored and passed around in.
pub type HandlerRef = Arc<HandlerFn>;

/// A future produced by resuming a continuation.
pub type NextFuture = Pin<Box<dyn Future<Output = ()> + Send>>;

/// # Next Function (FN)
///
/// The continuation handed to a handler. Invoking it resumes the pipeline.
pub type NextFn = dyn Fn() -> NextFuture + Send + Sync + 'static;

/// # Next Function (FN) Ref
pub type Next = Arc<NextFn>;

/// The shared per-request context.
pub type ContextRef = Arc<Mutex<Context>>;

/// The radix tree a router stores its routes in.
pub type RouteTree = RadixTree<NodePayload>;

/// A shared node of a [`RouteTree`].
pub type RouteNodeRef = RadixNodeRef<NodePayload>;
