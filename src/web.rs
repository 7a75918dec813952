pub mod errors;
pub mod routing;

use std::sync::Arc;

pub use self::{
    routing::Context, routing::ContextRef, routing::HandlerRef, routing::Method,
    routing::MethodKey, routing::Next,
    routing::router::{RouteDescription, Router, RouterConfig},
};

/// ## handler!
///
/// Shorthand for writing a handler closure.
///
/// ### Common "long"-hand:
///
/// ```ignore
///     let greet = Arc::new(move |ctx, next| {
///         Box::pin(async move {
///             //do the work, then pass control on
///             next().await;
///         })
///     });
///
///     router.get("/greet", vec![greet]).await?;
/// ```
///
/// ### Short Hand (with macro)
///
/// `Note: this does not capture any variables!`
///
/// ```ignore
///     let greet = handler!(ctx, next, {
///         next().await;
///     });
/// ```
///
/// ### Short Hand Capture (with macro)
///
/// Suppose you want to move a value from the program into the handler.
///
/// `Note: this clones each moved value`
///
/// ```ignore
///     let counter = Arc::new(Mutex::new(0));
///
///     let count_hits = handler!(ctx, next, moves[counter], {
///         *counter.lock().await += 1;
///         next().await;
///     });
/// ```
#[macro_export]
macro_rules! handler {
    ($ctx:ident, $next:ident, moves[$($cap:ident),*], $body:block) => {
        ::std::sync::Arc::new(move |$ctx: $crate::web::ContextRef, $next: $crate::web::Next| {
            $(let $cap = $cap.clone();)*

            ::std::boxed::Box::pin(async move $body) as $crate::web::routing::HandlerFuture
        }) as $crate::web::HandlerRef
    };

    ($ctx:ident, $next:ident, $body:block) => {
        $crate::handler!($ctx, $next, moves[], $body)
    };
}

/// ## handlers!
///
/// Collects already-built handlers into the `Vec` the registration calls
/// take, cloning each one.
///
/// ```ignore
///     let checked = handlers![require_auth, load_user, show_profile];
///
///     router.get("/profile", checked).await?;
/// ```
#[macro_export]
macro_rules! handlers {
    ( $( $items:ident ),* ) => {{
        let mut collection: ::std::vec::Vec<$crate::web::HandlerRef> = ::std::vec::Vec::new();

        $( collection.push($items.clone()); )*

        collection
    }};
}

/// # Handler
///
/// Wraps a plain async closure into a [`HandlerRef`].
///
/// ```
/// use radix_web::web::handler;
///
/// let pass_through = handler(|_ctx, next| async move {
///     next().await;
/// });
/// ```
pub fn handler<F, Fut>(f: F) -> HandlerRef
where
    F: Fn(ContextRef, Next) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    Arc::new(move |ctx, next| Box::pin(f(ctx, next)))
}
