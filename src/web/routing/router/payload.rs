use linked_hash_map::LinkedHashMap;
use regex::Regex;

use crate::web::routing::pattern::anchored_source;
use crate::web::routing::staged::StagedArray;
use crate::web::routing::{HandlerRef, Method, RouteTree};

/// ## Method Key
///
/// What a handler bucket is filed under. Real verbs live in `Verb`; the two
/// reserved tokens are separate variants, so no request method string can ever
/// collide with them.
#[derive(Debug)]
#[derive(Eq, Hash, PartialEq)]
#[derive(Clone)]
pub enum MethodKey {
    /// Path middleware and path terminators: handlers that belong to the node
    /// itself, whatever the request method is.
    Middleware,

    /// The wildcard bucket. Participates like the request's own method, at
    /// lower priority.
    All,

    /// A concrete request method.
    Verb(Method),
}

impl std::fmt::Display for MethodKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MethodKey::Middleware => write!(f, "MIDDLEWARE"),
            MethodKey::All => write!(f, "ALL"),
            MethodKey::Verb(method) => write!(f, "{method}"),
        }
    }
}

/// The two handler lists kept per method key.
#[derive(Clone, Default)]
pub struct MethodBuckets {
    /// Runs before anything terminates the request.
    pub middleware: StagedArray<HandlerRef>,

    /// Ends the request once reached.
    pub terminators: StagedArray<HandlerRef>,
}

/// ## Node Payload
///
/// Everything a route node stores: handler buckets per method key, in
/// registration order, plus the parametric edges hanging off the node.
pub struct NodePayload {
    methods: LinkedHashMap<MethodKey, MethodBuckets>,
    branches: StagedArray<ParameterBranch>,
}

impl NodePayload {
    pub fn new() -> Self {
        Self {
            methods: LinkedHashMap::new(),
            branches: StagedArray::new(),
        }
    }

    /// Borrow the buckets for a key, if any handler was ever filed there.
    pub fn bucket(&self, key: &MethodKey) -> Option<&MethodBuckets> {
        self.methods.get(key)
    }

    /// Buckets for a key, created empty on first use.
    pub fn bucket_mut(&mut self, key: MethodKey) -> &mut MethodBuckets {
        self.methods.entry(key).or_insert_with(MethodBuckets::default)
    }

    /// Every key with its buckets, in registration order.
    pub fn methods(&self) -> impl Iterator<Item = (&MethodKey, &MethodBuckets)> {
        self.methods.iter()
    }

    pub fn branches(&self) -> &StagedArray<ParameterBranch> {
        &self.branches
    }

    /// Find the branch registered for this exact parameter shape, so the same
    /// parameter written twice lands in the same sub-tree.
    pub fn matching_branch(
        &self,
        name: &str,
        multi: bool,
        regex_source: Option<&str>,
    ) -> Option<ParameterBranch> {
        self.branches
            .ordered()
            .find(|branch| {
                branch.name == name
                    && branch.multi == multi
                    && branch.regex.as_ref().map(|regex| regex.as_str())
                        == regex_source
            })
            .cloned()
    }

    pub fn add_branch(&mut self, stage: i32, branch: ParameterBranch) {
        self.branches.append(stage, branch);
    }
}

impl Default for NodePayload {
    fn default() -> Self {
        Self::new()
    }
}

/// ## Parameter Branch
///
/// A parametric edge: whatever the capture swallows, the rest of the path
/// continues in the branch's own sub-tree.
#[derive(Clone)]
pub struct ParameterBranch {
    /// The capture lands in `ctx.params` under this name.
    pub name: String,

    /// Anchored constraint on the capture. Without one the capture takes the
    /// whole candidate text.
    pub regex: Option<Regex>,

    /// Whether the capture may run across '/' characters.
    pub multi: bool,

    /// The disjoint tree for everything after the capture.
    pub subtree: RouteTree,
}

impl ParameterBranch {
    pub fn new(name: String, regex: Option<Regex>, multi: bool, subtree: RouteTree) -> Self {
        Self {
            name,
            regex,
            multi,
            subtree,
        }
    }

    /// The regex source as it was written in the pattern.
    pub fn written_regex(&self) -> Option<&str> {
        self.regex.as_ref().map(anchored_source)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::{MethodKey, NodePayload, ParameterBranch};
    use crate::web::routing::pattern::compile_anchored;
    use crate::web::routing::router::tree::RadixTree;
    use crate::web::routing::Method;

    fn subtree() -> crate::web::routing::RouteTree {
        RadixTree::new(Arc::new(NodePayload::new))
    }

    #[test]
    fn buckets_are_created_on_first_use() {
        let mut payload = NodePayload::new();

        assert!(payload.bucket(&MethodKey::Verb(Method::GET)).is_none());

        payload.bucket_mut(MethodKey::Verb(Method::GET));
        payload.bucket_mut(MethodKey::All);

        assert!(payload.bucket(&MethodKey::Verb(Method::GET)).is_some());

        let keys: Vec<String> = payload.methods().map(|(key, _)| key.to_string()).collect();

        assert_eq!(keys, vec!["GET".to_string(), "ALL".to_string()]);
    }

    #[test]
    fn reserved_keys_never_collide_with_verbs() {
        let middleware_token = MethodKey::Middleware;
        let spoofed = MethodKey::Verb(Method::Other("MIDDLEWARE".to_string()));

        assert_ne!(middleware_token, spoofed);
    }

    #[test]
    fn identical_branches_are_found_again() {
        let mut payload = NodePayload::new();
        let regex = compile_anchored("\\d+").unwrap();

        payload.add_branch(
            0,
            ParameterBranch::new("id".to_string(), Some(regex.clone()), false, subtree()),
        );

        let found = payload.matching_branch("id", false, Some(regex.as_str()));

        assert!(found.is_some());
        assert_eq!(found.unwrap().written_regex(), Some("\\d+"));

        //different shape, different branch
        assert!(payload.matching_branch("id", true, Some(regex.as_str())).is_none());
        assert!(payload.matching_branch("id", false, None).is_none());
        assert!(payload.matching_branch("other", false, Some(regex.as_str())).is_none());
    }
}
