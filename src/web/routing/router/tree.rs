use std::sync::Arc;

use tokio::sync::Mutex;

/// Label of the synthetic root node. Never produced by any pattern, so it can
/// never collide with a real edge.
pub const ROOT_LABEL: &str = "\\_root_/";

/// Builds the payload a node is born with. Runs exactly once per node.
pub type PayloadFactory<P> = Arc<dyn Fn() -> P + Send + Sync>;

pub type RadixNodeRef<P> = Arc<Mutex<RadixNode<P>>>;

/// # Radix Node
///
/// One node of a compact prefix tree. The `segment` is the edge label leading
/// into this node; walking from the root and concatenating segments gives the
/// path the node stands for. No two children ever share a first character.
pub struct RadixNode<P> {
    /// The edge label. Non-empty for every node except the synthetic root.
    pub segment: String,

    /// Child nodes in creation order.
    pub children: Vec<RadixNodeRef<P>>,

    /// Whatever the tree's payload factory produced for this node.
    pub payload: P,
}

impl<P> RadixNode<P> {
    pub fn new(segment: String, payload: P) -> Self {
        Self {
            segment,
            children: Vec::new(),
            payload,
        }
    }

    fn new_ref(segment: String, payload: P) -> RadixNodeRef<P> {
        Arc::new(Mutex::new(Self::new(segment, payload)))
    }
}

/// # Radix Tree
///
/// A compact prefix tree keyed by the characters of its edge labels.
///
/// Inserting "/aa" and then "/ab" leaves three nodes: "/a" as an intermediate
/// with children "a" and "b". Splitting happens automatically whenever a new
/// path shares only part of an existing edge.
pub struct RadixTree<P> {
    root: RadixNodeRef<P>,
    factory: PayloadFactory<P>,
}

impl<P> Clone for RadixTree<P> {
    fn clone(&self) -> Self {
        Self {
            root: self.root.clone(),
            factory: self.factory.clone(),
        }
    }
}

impl<P> RadixTree<P> {
    /// Create an empty tree. The root is built up front so the tree is never
    /// without one.
    pub fn new(factory: PayloadFactory<P>) -> Self {
        let payload = factory();

        Self {
            root: RadixNode::new_ref(ROOT_LABEL.to_string(), payload),
            factory,
        }
    }

    pub fn root(&self) -> RadixNodeRef<P> {
        self.root.clone()
    }

    pub fn factory(&self) -> PayloadFactory<P> {
        self.factory.clone()
    }

    /// Walk `path` from the root, creating nodes as needed, and return the
    /// node sitting exactly at `path`.
    pub async fn find_or_create(&self, path: &str) -> RadixNodeRef<P> {
        self.find_or_create_from(&self.root, path).await
    }

    /// Like [`Self::find_or_create`] but starting at an arbitrary node.
    pub async fn find_or_create_from(
        &self,
        start: &RadixNodeRef<P>,
        path: &str,
    ) -> RadixNodeRef<P> {
        let mut current = start.clone();
        let mut remaining = path.to_string();

        while !remaining.is_empty() {
            let matched = Self::child_sharing_first_char(&current, &remaining).await;

            match matched {
                None => {
                    //no edge starts like this path: hang the whole rest here
                    let created = RadixNode::new_ref(remaining.clone(), (self.factory)());

                    current.lock().await.children.push(created.clone());

                    return created;
                }
                Some((position, child, label)) => {
                    let shared = common_prefix(&label, &remaining);

                    if shared == label.len() {
                        //the edge is fully consumed, descend through it
                        remaining = remaining[shared..].to_string();
                        current = child;
                    } else {
                        //the edge only partially matches: split it on the
                        //shared prefix and keep working under the new
                        //intermediate node
                        let intermediate =
                            RadixNode::new_ref(label[..shared].to_string(), (self.factory)());

                        child.lock().await.segment = label[shared..].to_string();
                        intermediate.lock().await.children.push(child);
                        current.lock().await.children[position] = intermediate.clone();

                        remaining = remaining[shared..].to_string();
                        current = intermediate;
                    }
                }
            }
        }

        current
    }

    /// Find the node sitting exactly at `path`, without creating anything.
    pub async fn find_exact(&self, path: &str) -> Option<RadixNodeRef<P>> {
        let mut current = self.root.clone();
        let mut remaining = path.to_string();

        while !remaining.is_empty() {
            let matched = Self::child_sharing_first_char(&current, &remaining).await;

            match matched {
                Some((_, child, label)) if remaining.starts_with(&label) => {
                    remaining = remaining[label.len()..].to_string();
                    current = child;
                }
                _ => return None,
            }
        }

        Some(current)
    }

    /// Start a step-wise walk of `path` from the root.
    pub fn walk(&self, path: &str) -> TreeWalker<P> {
        TreeWalker::new(self.root.clone(), path.to_string())
    }

    /// At most one child can share a first character with `path`; find it
    /// along with its position and label.
    async fn child_sharing_first_char(
        node: &RadixNodeRef<P>,
        path: &str,
    ) -> Option<(usize, RadixNodeRef<P>, String)> {
        let guard = node.lock().await;

        for (position, child) in guard.children.iter().enumerate() {
            let label = child.lock().await.segment.clone();

            if label.chars().next() == path.chars().next() {
                return Some((position, child.clone(), label));
            }
        }

        None
    }
}

/// Length in bytes of the longest common prefix, never cutting a character.
fn common_prefix(left: &str, right: &str) -> usize {
    let mut shared = 0;

    for (l, r) in left.chars().zip(right.chars()) {
        if l != r {
            break;
        }

        shared += l.len_utf8();
    }

    shared
}

/// # Tree Walker
///
/// Yields every node along a path together with the not-yet-consumed suffix.
///
/// The first step returns the start node with the full path; each later step
/// descends into the one child whose label prefixes the suffix, yielding the
/// child and the suffix after it. The pending suffix may be swapped out
/// between steps with [`TreeWalker::rewrite`].
pub struct TreeWalker<P> {
    current: RadixNodeRef<P>,
    remaining: String,
    started: bool,
}

impl<P> TreeWalker<P> {
    pub fn new(start: RadixNodeRef<P>, path: String) -> Self {
        Self {
            current: start,
            remaining: path,
            started: false,
        }
    }

    /// Advance one node. `None` once no child label prefixes the suffix.
    pub async fn step(&mut self) -> Option<(RadixNodeRef<P>, String)> {
        if !self.started {
            self.started = true;

            return Some((self.current.clone(), self.remaining.clone()));
        }

        let descended = {
            let guard = self.current.lock().await;
            let mut found = None;

            for child in &guard.children {
                let label = child.lock().await.segment.clone();

                if !label.is_empty() && self.remaining.starts_with(&label) {
                    //children never share a first character, so the first
                    //full-label match is the only possible one
                    found = Some((child.clone(), label));
                    break;
                }
            }

            found
        };

        let (child, label) = descended?;

        self.remaining = self.remaining[label.len()..].to_string();
        self.current = child;

        Some((self.current.clone(), self.remaining.clone()))
    }

    /// Replace the pending suffix; later steps act as if it had been the
    /// supplied path from here on.
    pub fn rewrite(&mut self, remaining: String) {
        self.remaining = remaining;
    }

    pub fn remaining(&self) -> &str {
        &self.remaining
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::{PayloadFactory, RadixTree, ROOT_LABEL};

    fn counting_tree() -> (RadixTree<usize>, Arc<AtomicUsize>) {
        let counter = Arc::new(AtomicUsize::new(0));
        let factory_counter = counter.clone();
        let factory: PayloadFactory<usize> =
            Arc::new(move || factory_counter.fetch_add(1, Ordering::SeqCst));

        (RadixTree::new(factory), counter)
    }

    #[tokio::test]
    async fn shared_prefixes_split_into_intermediates() {
        let (tree, _) = counting_tree();

        tree.find_or_create("/aa").await;
        tree.find_or_create("/ab").await;

        assert!(tree.find_exact("/aa").await.is_some());
        assert!(tree.find_exact("/ab").await.is_some());

        let intermediate = tree.find_exact("/a").await.expect("split node");

        assert_eq!(intermediate.lock().await.children.len(), 2);
        assert!(tree.find_exact("/zz").await.is_none());
        assert!(tree.find_exact("/aaa").await.is_none());
    }

    #[tokio::test]
    async fn siblings_never_share_a_first_character() {
        let (tree, _) = counting_tree();

        for path in ["/alpha", "/beta", "/al", "/aluminium", "/b"] {
            tree.find_or_create(path).await;
        }

        //everything shares the leading '/', so the root has exactly one edge
        //and the fan-out happens below it
        let slash = tree.find_exact("/").await.expect("shared '/' edge");
        let guard = slash.lock().await;
        let mut first_chars = Vec::new();

        for child in &guard.children {
            first_chars.push(child.lock().await.segment.chars().next().unwrap());
        }

        assert!(!first_chars.is_empty());

        let mut deduped = first_chars.clone();
        deduped.sort();
        deduped.dedup();

        assert_eq!(first_chars.len(), deduped.len());
    }

    #[tokio::test]
    async fn payload_factory_runs_once_per_node() {
        let (tree, counter) = counting_tree();

        //root
        assert_eq!(counter.load(Ordering::SeqCst), 1);

        let node = tree.find_or_create("/x").await;
        let same = tree.find_or_create("/x").await;

        assert_eq!(counter.load(Ordering::SeqCst), 2);
        assert!(Arc::ptr_eq(&node, &same));

        //splitting creates exactly one intermediate
        tree.find_or_create("/y").await;
        tree.find_or_create("/yz").await;

        assert_eq!(counter.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn walker_yields_every_node_with_its_suffix() {
        let (tree, _) = counting_tree();

        tree.find_or_create("/api/user").await;
        tree.find_or_create("/api").await;

        let mut walker = tree.walk("/api/user");
        let mut seen = Vec::new();

        while let Some((node, remaining)) = walker.step().await {
            seen.push((node.lock().await.segment.clone(), remaining));
        }

        assert_eq!(
            seen,
            vec![
                (ROOT_LABEL.to_string(), "/api/user".to_string()),
                ("/api".to_string(), "/user".to_string()),
                ("/user".to_string(), String::new()),
            ]
        );
    }

    #[tokio::test]
    async fn walker_accepts_a_rewritten_suffix() {
        let (tree, _) = counting_tree();

        tree.find_or_create("/a/b").await;
        tree.find_or_create("/a/c").await;

        let mut walker = tree.walk("/a/zzz");

        walker.step().await; //root
        walker.step().await; //"/a/"

        assert_eq!(walker.remaining(), "zzz");

        walker.rewrite("b".to_string());

        let (node, remaining) = walker.step().await.expect("descend after rewrite");

        assert_eq!(node.lock().await.segment, "b");
        assert_eq!(remaining, "");
        assert!(walker.step().await.is_none());
    }
}
