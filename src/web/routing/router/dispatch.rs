use std::sync::Arc;

use tracing::{debug, trace};

use crate::web::routing::pipeline::{compose, hold};
use crate::web::routing::router::payload::{MethodBuckets, MethodKey, ParameterBranch};
use crate::web::routing::router::tree::TreeWalker;
use crate::web::routing::staged::StagedArray;
use crate::web::routing::{ContextRef, HandlerRef, Method, Next, NextFuture, RouteNodeRef};

/// The nodes a request path touches, with the suffix left after each one.
type Trace = Arc<Vec<(RouteNodeRef, String)>>;

/// Path terminators gathered from boundary nodes along the walk.
type Gathered = Vec<StagedArray<HandlerRef>>;

/// Dispatch a path against one tree.
///
/// Used for the router's own root and recursively for parameter sub-trees;
/// `gathered` carries the path terminators collected so far and `next` is
/// where control goes when nothing in this tree terminates the request.
pub(crate) fn dispatch_tree(
    root: RouteNodeRef,
    strict_slashes: bool,
    method: Method,
    path: String,
    ctx: ContextRef,
    gathered: Gathered,
    next: Next,
) -> NextFuture {
    Box::pin(async move {
        let mut walker = TreeWalker::new(root, path);
        let mut trace = Vec::new();

        while let Some(step) = walker.step().await {
            trace.push(step);
        }

        run_node(Arc::new(trace), 0, strict_slashes, method, ctx, gathered, next).await;
    })
}

/// Handle one walked node, then hand over to the parameter attempt and from
/// there to the next node.
fn run_node(
    trace: Trace,
    index: usize,
    strict_slashes: bool,
    method: Method,
    ctx: ContextRef,
    mut gathered: Gathered,
    next: Next,
) -> NextFuture {
    Box::pin(async move {
        let node = trace[index].0.clone();
        let remaining = trace[index].1.clone();
        let terminal = index + 1 == trace.len();

        let slash_forgiven = !strict_slashes && remaining == "/";

        if terminal && (remaining.is_empty() || slash_forgiven) {
            if try_terminate(&node, &method, &ctx, &gathered).await {
                return;
            }
        }

        let boundary = terminal || {
            let label = node.lock().await.segment.clone();

            label.ends_with('/') || {
                let next_label = trace[index + 1].0.lock().await.segment.clone();
                next_label.starts_with('/')
            }
        };

        //only boundary nodes contribute handlers; gather the node's path
        //terminators before building the continuation so deeper nodes see them
        let path_bucket: Option<MethodBuckets> = if boundary {
            node.lock().await.payload.bucket(&MethodKey::Middleware).cloned()
        } else {
            None
        };

        if let Some(bucket) = &path_bucket {
            if !bucket.terminators.is_empty() {
                gathered.push(bucket.terminators.clone());
            }
        }

        let after: Next = {
            let trace = trace.clone();
            let method = method.clone();
            let ctx = ctx.clone();
            let gathered = gathered.clone();
            let next = next.clone();

            Arc::new(move || {
                try_parameters(
                    trace.clone(),
                    index,
                    strict_slashes,
                    method.clone(),
                    ctx.clone(),
                    gathered.clone(),
                    next.clone(),
                )
            })
        };

        match path_bucket {
            Some(bucket) if !bucket.middleware.is_empty() => {
                //the rest of the walk is this pipeline's continuation, so a
                //middleware that withholds `next` stops the request cold
                let immediate: Vec<HandlerRef> = bucket.middleware.ordered().cloned().collect();

                compose(&immediate, &ctx, after)().await;
            }
            _ => after().await,
        }
    })
}

/// Terminal-node match attempt. Builds and drives the merged pipeline when the
/// node can actually end the request; returns whether it did.
async fn try_terminate(
    node: &RouteNodeRef,
    method: &Method,
    ctx: &ContextRef,
    gathered: &[StagedArray<HandlerRef>],
) -> bool {
    let (path_bucket, method_bucket, all_bucket, head_middleware) = {
        let guard = node.lock().await;
        let payload = &guard.payload;

        let path_bucket = payload
            .bucket(&MethodKey::Middleware)
            .cloned()
            .unwrap_or_default();

        let mut method_bucket = payload
            .bucket(&MethodKey::Verb(method.clone()))
            .cloned()
            .unwrap_or_default();

        //HEAD borrows GET terminators when it has none of its own; its own
        //middleware still runs, right before GET's
        let mut head_middleware = None;

        if *method == Method::HEAD && method_bucket.terminators.is_empty() {
            head_middleware = Some(method_bucket.middleware);

            method_bucket = payload
                .bucket(&MethodKey::Verb(Method::GET))
                .cloned()
                .unwrap_or_default();
        }

        let all_bucket = payload.bucket(&MethodKey::All).cloned().unwrap_or_default();

        (path_bucket, method_bucket, all_bucket, head_middleware)
    };

    if method_bucket.terminators.is_empty() && all_bucket.terminators.is_empty() {
        return false;
    }

    let mut sources: Vec<&StagedArray<HandlerRef>> = Vec::new();

    sources.push(&path_bucket.middleware);

    for stage_set in gathered {
        sources.push(stage_set);
    }

    sources.push(&path_bucket.terminators);

    if let Some(head) = &head_middleware {
        sources.push(head);
    }

    sources.push(&method_bucket.middleware);
    sources.push(&all_bucket.middleware);

    let mut run = StagedArray::merge_sorted(&sources);

    run.extend(method_bucket.terminators.ordered().cloned());
    run.extend(all_bucket.terminators.ordered().cloned());

    debug!(%method, handlers = run.len(), "terminal match");

    compose(&run, ctx, hold())().await;

    true
}

/// Try the node's parameter branches in priority order. The first branch whose
/// candidate fits wins the rest of the dispatch; with no fit the walk moves on
/// or, at the end, falls out to `next`.
fn try_parameters(
    trace: Trace,
    index: usize,
    strict_slashes: bool,
    method: Method,
    ctx: ContextRef,
    gathered: Gathered,
    next: Next,
) -> NextFuture {
    Box::pin(async move {
        let node = trace[index].0.clone();
        let remaining = trace[index].1.clone();
        let terminal = index + 1 == trace.len();

        let branches: Vec<ParameterBranch> = {
            let guard = node.lock().await;
            guard.payload.branches().ordered().cloned().collect()
        };

        if !branches.is_empty() {
            let segment_end = remaining.find('/').unwrap_or(remaining.len());
            let segment_value = &remaining[..segment_end];

            for branch in branches {
                let mut candidate = if branch.multi {
                    remaining.as_str()
                } else {
                    segment_value
                };

                if let Some(regex) = &branch.regex {
                    match regex.find(candidate) {
                        Some(found) => candidate = &candidate[..found.end()],
                        None => continue,
                    }
                } else if candidate.is_empty() {
                    //an empty capture needs an explicit regex to allow it
                    continue;
                }

                let name = branch.name.clone();
                let value = candidate.to_string();
                let rest = remaining[candidate.len()..].to_string();

                trace!(name = %name, value = %value, "parameter bound");

                let prior = { ctx.lock().await.params.insert(name.clone(), value.clone()) };

                //the way out of the sub-tree must not leak the binding: put
                //the old value back before the outer continuation runs and
                //rebind on the way back in
                let wrapped: Next = {
                    let ctx = ctx.clone();
                    let next = next.clone();
                    let name = name.clone();
                    let prior = prior.clone();
                    let value = value.clone();

                    Arc::new(move || {
                        let ctx = ctx.clone();
                        let next = next.clone();
                        let name = name.clone();
                        let prior = prior.clone();
                        let value = value.clone();

                        Box::pin(async move {
                            restore_param(&ctx, &name, prior).await;
                            next().await;
                            ctx.lock().await.params.insert(name, value);
                        })
                    })
                };

                dispatch_tree(
                    branch.subtree.root(),
                    strict_slashes,
                    method.clone(),
                    rest,
                    ctx.clone(),
                    gathered.clone(),
                    wrapped,
                )
                .await;

                restore_param(&ctx, &name, prior).await;

                //first branch that fits wins; nothing after it is tried
                return;
            }
        }

        if terminal {
            trace!("walk exhausted, leaving through next");
            next().await;
        } else {
            run_node(
                trace,
                index + 1,
                strict_slashes,
                method,
                ctx,
                gathered,
                next,
            )
            .await;
        }
    })
}

async fn restore_param(ctx: &ContextRef, name: &str, prior: Option<String>) {
    let mut guard = ctx.lock().await;

    match prior {
        Some(value) => {
            guard.params.insert(name.to_string(), value);
        }
        None => {
            guard.params.remove(name);
        }
    }
}
