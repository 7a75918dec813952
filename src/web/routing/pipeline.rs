use std::sync::Arc;

use crate::web::routing::{ContextRef, HandlerRef, Next, NextFuture};

/// Fold a group of handlers into one continuation.
///
/// The returned `Next` runs the first handler; each handler receives a `next`
/// that runs the one after it, and the last handler's `next` is `tail`. A
/// handler that never calls its `next` therefore cuts off everything behind
/// it, `tail` included.
pub fn compose(handlers: &[HandlerRef], ctx: &ContextRef, tail: Next) -> Next {
    let mut next = tail;

    for handler in handlers.iter().rev() {
        let handler = handler.clone();
        let ctx = ctx.clone();
        let after = next;

        next = Arc::new(move || handler(ctx.clone(), after.clone()));
    }

    next
}

/// A continuation that does nothing. Sits at the end of a matched pipeline so
/// the last terminator has something to call.
pub fn hold() -> Next {
    Arc::new(|| -> NextFuture { Box::pin(async {}) })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tokio::sync::Mutex;

    use super::{compose, hold};
    use crate::web::routing::{Context, HandlerRef, Next, NextFuture};

    type Log = Arc<Mutex<Vec<&'static str>>>;

    fn passing(log: &Log, tag: &'static str) -> HandlerRef {
        let log = log.clone();

        Arc::new(move |_ctx, next| {
            let log = log.clone();

            Box::pin(async move {
                log.lock().await.push(tag);
                next().await;
            })
        })
    }

    fn blocking(log: &Log, tag: &'static str) -> HandlerRef {
        let log = log.clone();

        Arc::new(move |_ctx, _next| {
            let log = log.clone();

            Box::pin(async move {
                log.lock().await.push(tag);
            })
        })
    }

    fn tail_into(log: &Log) -> Next {
        let log = log.clone();

        Arc::new(move || -> NextFuture {
            let log = log.clone();

            Box::pin(async move {
                log.lock().await.push("tail");
            })
        })
    }

    #[tokio::test]
    async fn handlers_run_in_order_then_tail() {
        let log: Log = Arc::new(Mutex::new(Vec::new()));
        let ctx = Context::new().shared();

        let chain = compose(
            &[passing(&log, "one"), passing(&log, "two")],
            &ctx,
            tail_into(&log),
        );

        chain().await;

        assert_eq!(*log.lock().await, vec!["one", "two", "tail"]);
    }

    #[tokio::test]
    async fn skipping_next_short_circuits() {
        let log: Log = Arc::new(Mutex::new(Vec::new()));
        let ctx = Context::new().shared();

        let chain = compose(
            &[passing(&log, "one"), blocking(&log, "stop"), passing(&log, "never")],
            &ctx,
            tail_into(&log),
        );

        chain().await;

        assert_eq!(*log.lock().await, vec!["one", "stop"]);
    }

    #[tokio::test]
    async fn empty_group_is_just_the_tail() {
        let log: Log = Arc::new(Mutex::new(Vec::new()));
        let ctx = Context::new().shared();

        compose(&[], &ctx, tail_into(&log))().await;
        hold()().await;

        assert_eq!(*log.lock().await, vec!["tail"]);
    }
}
