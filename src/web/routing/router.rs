pub mod payload;
pub mod tree;

mod dispatch;

use std::pin::Pin;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::web::errors::{PatternError, RegisterError};
use crate::web::routing::pattern::{Segment, parse_pattern};
use crate::web::routing::router::payload::{MethodKey, NodePayload, ParameterBranch};
use crate::web::routing::router::tree::{RadixTree, ROOT_LABEL};
use crate::web::routing::{ContextRef, HandlerRef, Method, Next, RouteNodeRef, RouteTree};

/// Options a router is built with.
///
/// With `strict_slashes` off (the default) a request path with a trailing '/'
/// still matches a pattern registered without one. A pattern that itself ends
/// in '/' always requires the request to end in '/'.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct RouterConfig {
    #[serde(default)]
    pub strict_slashes: bool,
}

/// # Router
///
/// The routing core: a radix tree of handler buckets plus the dispatch state
/// machine that walks it.
///
/// Registration goes through [`Router::add_middleware`] and
/// [`Router::add_terminator`] against a parsed pattern; the verb helpers are
/// sugar over those two. Dispatch walks the tree with the request path,
/// collects handler groups in stage order, and drives them as one pipeline
/// where every handler decides whether to call `next`.
///
/// Build the router first, dispatch after; the two must not overlap.
pub struct Router {
    tree: RouteTree,
    config: RouterConfig,
}

impl Router {
    pub fn new() -> Self {
        Self::with_config(RouterConfig::default())
    }

    pub fn with_config(config: RouterConfig) -> Self {
        Self {
            tree: RadixTree::new(Arc::new(NodePayload::new)),
            config,
        }
    }

    /// The underlying route tree.
    pub fn tree(&self) -> &RouteTree {
        &self.tree
    }

    /// Append middleware for a method key at `stage` on the node the pattern
    /// resolves to.
    pub async fn add_middleware(
        &self,
        key: MethodKey,
        pattern: &str,
        stage: i32,
        handlers: Vec<HandlerRef>,
    ) -> Result<(), PatternError> {
        let target = self.resolve_pattern(pattern).await?;
        let appended = handlers.len();

        let mut node = target.lock().await;
        node.payload.bucket_mut(key.clone()).middleware.append_all(stage, handlers);

        debug!(pattern, %key, stage, appended, "middleware registered");

        Ok(())
    }

    /// Append terminators for a method key at `stage` on the node the pattern
    /// resolves to.
    pub async fn add_terminator(
        &self,
        key: MethodKey,
        pattern: &str,
        stage: i32,
        handlers: Vec<HandlerRef>,
    ) -> Result<(), PatternError> {
        let target = self.resolve_pattern(pattern).await?;
        let appended = handlers.len();

        let mut node = target.lock().await;
        node.payload.bucket_mut(key.clone()).terminators.append_all(stage, handlers);

        debug!(pattern, %key, stage, appended, "terminator registered");

        Ok(())
    }

    /// Walk (and create) the tree along a parsed pattern.
    ///
    /// Literal segments descend the current radix tree; parameter segments
    /// descend into the node's matching branch, creating branch and sub-tree
    /// when the parameter shape is new. The returned node is where handlers
    /// for the pattern belong.
    async fn resolve_pattern(&self, pattern: &str) -> Result<RouteNodeRef, PatternError> {
        let segments = parse_pattern(pattern)?;

        let mut scope = self.tree.clone();
        let mut node = scope.root();

        for segment in segments {
            match segment {
                Segment::Literal { text } => {
                    node = scope.find_or_create_from(&node, &text).await;
                }
                Segment::Parameter {
                    name,
                    regex,
                    multi,
                    stage,
                } => {
                    let branch = {
                        let mut guard = node.lock().await;
                        let source = regex.as_ref().map(|compiled| compiled.as_str().to_string());

                        match guard.payload.matching_branch(&name, multi, source.as_deref()) {
                            Some(existing) => existing,
                            None => {
                                let created = ParameterBranch::new(
                                    name,
                                    regex,
                                    multi,
                                    RadixTree::new(scope.factory()),
                                );

                                guard.payload.add_branch(stage, created.clone());

                                created
                            }
                        }
                    };

                    scope = branch.subtree.clone();
                    node = scope.root();
                }
            }
        }

        Ok(node)
    }

    /// Run a request through the tree.
    ///
    /// `next` is the way out: it is called exactly once if nothing terminates
    /// the request. Path middleware met along the walk runs either way.
    pub async fn dispatch(&self, method: Method, path: &str, ctx: ContextRef, next: Next) {
        trace!(%method, path, "dispatching");

        dispatch::dispatch_tree(
            self.tree.root(),
            self.config.strict_slashes,
            method,
            path.to_string(),
            ctx,
            Vec::new(),
            next,
        )
        .await;
    }

    pub async fn get(&self, pattern: &str, handlers: Vec<HandlerRef>) -> Result<(), RegisterError> {
        self.register_verb(Method::GET, pattern, handlers).await
    }

    pub async fn post(&self, pattern: &str, handlers: Vec<HandlerRef>) -> Result<(), RegisterError> {
        self.register_verb(Method::POST, pattern, handlers).await
    }

    pub async fn put(&self, pattern: &str, handlers: Vec<HandlerRef>) -> Result<(), RegisterError> {
        self.register_verb(Method::PUT, pattern, handlers).await
    }

    pub async fn delete(
        &self,
        pattern: &str,
        handlers: Vec<HandlerRef>,
    ) -> Result<(), RegisterError> {
        self.register_verb(Method::DELETE, pattern, handlers).await
    }

    pub async fn patch(
        &self,
        pattern: &str,
        handlers: Vec<HandlerRef>,
    ) -> Result<(), RegisterError> {
        self.register_verb(Method::PATCH, pattern, handlers).await
    }

    pub async fn head(&self, pattern: &str, handlers: Vec<HandlerRef>) -> Result<(), RegisterError> {
        self.register_verb(Method::HEAD, pattern, handlers).await
    }

    pub async fn options(
        &self,
        pattern: &str,
        handlers: Vec<HandlerRef>,
    ) -> Result<(), RegisterError> {
        self.register_verb(Method::OPTIONS, pattern, handlers).await
    }

    /// Register under the wildcard bucket: runs for any request method, after
    /// the method's own handlers at equal stages.
    pub async fn all(&self, pattern: &str, handlers: Vec<HandlerRef>) -> Result<(), RegisterError> {
        self.register_keyed(MethodKey::All, pattern, handlers).await
    }

    /// Path middleware: runs for every request that reaches the node.
    pub async fn use_middleware(
        &self,
        pattern: &str,
        handlers: Vec<HandlerRef>,
    ) -> Result<(), RegisterError> {
        if handlers.is_empty() {
            return Err(RegisterError::EmptyHandlerList);
        }

        self.add_middleware(MethodKey::Middleware, pattern, 0, handlers)
            .await?;

        Ok(())
    }

    /// Path terminators: gathered along the walk and merged into the final
    /// node's pipeline.
    pub async fn use_terminator(
        &self,
        pattern: &str,
        handlers: Vec<HandlerRef>,
    ) -> Result<(), RegisterError> {
        if handlers.is_empty() {
            return Err(RegisterError::EmptyHandlerList);
        }

        self.add_terminator(MethodKey::Middleware, pattern, 0, handlers)
            .await?;

        Ok(())
    }

    async fn register_verb(
        &self,
        method: Method,
        pattern: &str,
        handlers: Vec<HandlerRef>,
    ) -> Result<(), RegisterError> {
        self.register_keyed(MethodKey::Verb(method), pattern, handlers)
            .await
    }

    /// All but the last handler become middleware for the key; the last one is
    /// the terminator.
    async fn register_keyed(
        &self,
        key: MethodKey,
        pattern: &str,
        mut handlers: Vec<HandlerRef>,
    ) -> Result<(), RegisterError> {
        if handlers.is_empty() {
            return Err(RegisterError::EmptyHandlerList);
        }

        let terminator = handlers.pop().unwrap();

        if !handlers.is_empty() {
            self.add_middleware(key.clone(), pattern, 0, handlers).await?;
        }

        self.add_terminator(key, pattern, 0, vec![terminator]).await?;

        Ok(())
    }

    /// Everything registered, in tree order, parameter sub-trees included.
    pub async fn routes(&self) -> Vec<RouteDescription> {
        collect_routes(self.tree.root(), String::new()).await
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

/// One row of [`Router::routes`] output.
#[derive(Debug)]
pub struct RouteDescription {
    /// The walked path, parameters written back in pattern form.
    pub path: String,
    pub method: MethodKey,
    pub middleware: usize,
    pub terminators: usize,
}

fn collect_routes(
    node: RouteNodeRef,
    prefix: String,
) -> Pin<Box<dyn Future<Output = Vec<RouteDescription>> + Send>> {
    Box::pin(async move {
        let mut out = Vec::new();

        let (label, children, rows, branches) = {
            let guard = node.lock().await;

            let rows: Vec<(MethodKey, usize, usize)> = guard
                .payload
                .methods()
                .map(|(key, buckets)| {
                    (key.clone(), buckets.middleware.len(), buckets.terminators.len())
                })
                .collect();

            let branches: Vec<ParameterBranch> =
                guard.payload.branches().ordered().cloned().collect();

            (guard.segment.clone(), guard.children.clone(), rows, branches)
        };

        let path = if label == ROOT_LABEL {
            prefix
        } else {
            format!("{prefix}{label}")
        };

        for (method, middleware, terminators) in rows {
            out.push(RouteDescription {
                path: path.clone(),
                method,
                middleware,
                terminators,
            });
        }

        for child in children {
            out.extend(collect_routes(child, path.clone()).await);
        }

        for branch in branches {
            let mut written = format!("{path}:{}", branch.name);

            if let Some(source) = branch.written_regex() {
                written.push('(');
                written.push_str(source);
                written.push(')');
            }

            if branch.multi {
                written.push('*');
            }

            out.extend(collect_routes(branch.subtree.root(), written).await);
        }

        out
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::{Router, RouterConfig};
    use crate::web::errors::RegisterError;
    use crate::web::routing::{HandlerRef, MethodKey};

    fn pass() -> HandlerRef {
        Arc::new(|_ctx, next| Box::pin(async move { next().await }))
    }

    #[test]
    fn config_deserializes_with_defaults() {
        let strict: RouterConfig = serde_json::from_str(r#"{"strict_slashes":true}"#).unwrap();
        let defaulted: RouterConfig = serde_json::from_str("{}").unwrap();

        assert!(strict.strict_slashes);
        assert!(!defaulted.strict_slashes);
    }

    #[tokio::test]
    async fn identical_parameters_share_one_branch() {
        let router = Router::new();

        router.get("/user/:id(\\d+)/posts", vec![pass()]).await.unwrap();
        router.get("/user/:id(\\d+)/likes", vec![pass()]).await.unwrap();
        router.get("/user/:id(\\w+)", vec![pass()]).await.unwrap();

        let node = router
            .tree()
            .find_exact("/user/")
            .await
            .expect("literal prefix node");

        let guard = node.lock().await;

        //same name, same regex: one branch; the \w+ shape is its own
        assert_eq!(guard.payload.branches().len(), 2);
    }

    #[tokio::test]
    async fn verb_helpers_reject_empty_handler_lists() {
        let router = Router::new();

        let result = router.get("/x", Vec::new()).await;

        assert!(matches!(result, Err(RegisterError::EmptyHandlerList)));
    }

    #[tokio::test]
    async fn routes_lists_parameter_subtrees() {
        let router = Router::new();

        router.get("/about", vec![pass()]).await.unwrap();
        router
            .post("/user/:id(\\d+)/posts", vec![pass(), pass()])
            .await
            .unwrap();

        let routes = router.routes().await;

        let about = routes
            .iter()
            .find(|row| row.path == "/about")
            .expect("about row");

        assert_eq!(about.method, MethodKey::Verb(crate::web::routing::Method::GET));
        assert_eq!(about.terminators, 1);

        let posts = routes
            .iter()
            .find(|row| row.path == "/user/:id(\\d+)/posts")
            .expect("parameter row");

        assert_eq!(posts.middleware, 1);
        assert_eq!(posts.terminators, 1);
    }
}
