//! Include-tree reconstruction.
//!
//! `GetIncludedFiles` streams a *flat* sequence of records, each naming the
//! file it is included from (`root_path`).  The service emits them
//! sibling-contiguously and switches `root_path` when it descends into a file,
//! so the nesting can be rebuilt in one forward pass with a stack of open
//! frames:
//!
//! 1. `root_path` equals the top frame's file → sibling in the top frame.
//! 2. `root_path` equals the most recently appended file → descend: open a
//!    frame for that file and append the record as its first child.
//! 3. `root_path` equals an ancestor frame's file → ascend: close frames down
//!    to that ancestor and append there.
//! 4. `root_path` equals an earlier file already appended under an open frame
//!    → descend into that file (the service finished listing a file's direct
//!    includes before walking into them).
//! 5. Anything else is a malformed stream.
//!
//! Nodes live in an arena addressed by index and frames refer to arena slots,
//! so no recursion is needed while building or when converting the arena into
//! the owned [`IncludeNode`] forest.

use std::collections::BTreeSet;

use fleetlaunch_types::wire::IncludedFilesReply;
use fleetlaunch_types::{IncludeNode, TransportError};
use futures_util::TryStreamExt;
use tracing::{debug, warn};

use crate::call::TypedStream;

struct Slot {
    line: u32,
    path: String,
    exists: bool,
    children: Vec<usize>,
}

/// An open level of the tree.  `parent == None` is the queried root, whose
/// children form the result forest.
struct Frame {
    root_path: String,
    parent: Option<usize>,
}

/// Incremental builder fed one record at a time.
pub struct IncludeTreeBuilder {
    arena: Vec<Slot>,
    roots: Vec<usize>,
    stack: Vec<Frame>,
    last: Option<usize>,
}

impl IncludeTreeBuilder {
    /// Start a tree for the query rooted at `root`.
    pub fn new(root: impl Into<String>) -> Self {
        Self {
            arena: Vec::new(),
            roots: Vec::new(),
            stack: vec![Frame {
                root_path: root.into(),
                parent: None,
            }],
            last: None,
        }
    }

    /// Current nesting depth (number of open frames).
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// Attach one record.
    ///
    /// # Errors
    ///
    /// [`TransportError::StreamConsistency`] when `record.root_path` matches
    /// neither an open frame nor a file already placed under one.  The
    /// builder is left unchanged in that case.
    pub fn push(&mut self, record: IncludedFilesReply) -> Result<(), TransportError> {
        if self
            .stack
            .last()
            .is_some_and(|frame| frame.root_path == record.root_path)
        {
            self.append(record);
            return Ok(());
        }

        if let Some(last) = self.last
            && self.arena[last].path == record.root_path
        {
            self.descend(last);
            self.append(record);
            return Ok(());
        }

        if let Some(level) = self
            .stack
            .iter()
            .rposition(|frame| frame.root_path == record.root_path)
        {
            self.stack.truncate(level + 1);
            self.append(record);
            return Ok(());
        }

        if let Some((level, slot)) = self.find_open_child(&record.root_path) {
            self.stack.truncate(level + 1);
            self.descend(slot);
            self.append(record);
            return Ok(());
        }

        warn!(root_path = %record.root_path, "include record without matching parent");
        Err(TransportError::StreamConsistency {
            root_path: record.root_path,
        })
    }

    /// Convert the arena into the owned forest of the queried root.
    pub fn finish(self) -> Vec<IncludeNode> {
        let IncludeTreeBuilder { arena, roots, .. } = self;
        // Children are always appended after their parent, so a reverse
        // sweep finds every child already built.
        let mut built: Vec<Option<IncludeNode>> = Vec::with_capacity(arena.len());
        built.resize_with(arena.len(), || None);
        for (index, slot) in arena.into_iter().enumerate().rev() {
            let children = slot
                .children
                .iter()
                .filter_map(|&child| built[child].take())
                .collect();
            built[index] = Some(IncludeNode {
                line: slot.line,
                path: slot.path,
                exists: slot.exists,
                children,
            });
        }
        roots
            .iter()
            .filter_map(|&root| built[root].take())
            .collect()
    }

    fn append(&mut self, record: IncludedFilesReply) {
        let index = self.arena.len();
        self.arena.push(Slot {
            line: record.linenr,
            path: record.path,
            exists: record.exists,
            children: Vec::new(),
        });
        match self.stack.last().and_then(|frame| frame.parent) {
            Some(parent) => self.arena[parent].children.push(index),
            None => self.roots.push(index),
        }
        self.last = Some(index);
    }

    fn descend(&mut self, slot: usize) {
        self.stack.push(Frame {
            root_path: self.arena[slot].path.clone(),
            parent: Some(slot),
        });
    }

    /// Most recent file named `path` placed directly under an open frame,
    /// searching from the innermost frame outwards.  A file whose includes
    /// were already emitted is closed and never matches.
    fn find_open_child(&self, path: &str) -> Option<(usize, usize)> {
        self.stack.iter().enumerate().rev().find_map(|(level, frame)| {
            let children = match frame.parent {
                Some(parent) => &self.arena[parent].children,
                None => &self.roots,
            };
            children
                .iter()
                .rev()
                .find(|&&child| {
                    self.arena[child].path == path && self.arena[child].children.is_empty()
                })
                .map(|&child| (level, child))
        })
    }
}

/// Drain an include stream into the forest rooted at `root`.
///
/// Stops at the first transport or consistency error; the stream is dropped
/// on every exit path.
pub async fn rebuild_tree(
    root: &str,
    mut records: TypedStream<IncludedFilesReply>,
) -> Result<Vec<IncludeNode>, TransportError> {
    let mut builder = IncludeTreeBuilder::new(root);
    let mut count = 0usize;
    while let Some(record) = records.try_next().await? {
        builder.push(record)?;
        count += 1;
    }
    debug!(root = %root, records = count, "include tree rebuilt");
    Ok(builder.finish())
}

/// Collect the distinct included paths, ignoring tree shape.
pub async fn collect_unique(
    mut records: TypedStream<IncludedFilesReply>,
) -> Result<BTreeSet<String>, TransportError> {
    let mut paths = BTreeSet::new();
    while let Some(record) = records.try_next().await? {
        paths.insert(record.path);
    }
    Ok(paths)
}

/// Collect every record as a childless top-level node, in stream order.
pub async fn collect_flat(
    mut records: TypedStream<IncludedFilesReply>,
) -> Result<Vec<IncludeNode>, TransportError> {
    let mut nodes = Vec::new();
    while let Some(record) = records.try_next().await? {
        nodes.push(IncludeNode::new(record.linenr, record.path, record.exists));
    }
    Ok(nodes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::StreamExt;
    use futures_util::stream;

    fn rec(root: &str, line: u32, path: &str, exists: bool) -> IncludedFilesReply {
        IncludedFilesReply {
            root_path: root.to_string(),
            linenr: line,
            path: path.to_string(),
            exists,
        }
    }

    fn build(root: &str, records: Vec<IncludedFilesReply>) -> Result<Vec<IncludeNode>, TransportError> {
        let mut builder = IncludeTreeBuilder::new(root);
        for record in records {
            builder.push(record)?;
        }
        Ok(builder.finish())
    }

    /// Emit `forest` (children of `parent`) the way the service does:
    /// pre-order, siblings contiguous per parent, `root_path` naming the
    /// including file.
    fn emit(parent: &str, forest: &[IncludeNode], out: &mut Vec<IncludedFilesReply>) {
        for node in forest {
            out.push(rec(parent, node.line, &node.path, node.exists));
            emit(&node.path, &node.children, out);
        }
    }

    /// Complete tree of the given depth and branching; paths are unique.
    fn synth(prefix: &str, depth: usize, branching: u32) -> Vec<IncludeNode> {
        if depth == 0 {
            return Vec::new();
        }
        (1..=branching)
            .map(|i| {
                let path = format!("{prefix}/{i}");
                IncludeNode::new(i * 10, path.clone(), i % 2 == 1)
                    .with_children(synth(&path, depth - 1, branching))
            })
            .collect()
    }

    fn roundtrip(depth: usize, branching: u32) {
        let expected = synth("/root", depth, branching);
        let mut records = Vec::new();
        emit("/root", &expected, &mut records);
        let rebuilt = build("/root", records).unwrap();
        assert_eq!(rebuilt, expected, "depth {depth}, branching {branching}");
    }

    #[test]
    fn empty_stream_yields_empty_forest() {
        assert!(build("/root", Vec::new()).unwrap().is_empty());
    }

    #[test]
    fn rebuilds_trees_of_depth_zero_one_and_four() {
        roundtrip(0, 3);
        roundtrip(1, 3);
        roundtrip(4, 3);
        roundtrip(5, 4);
    }

    #[test]
    fn directly_listed_includes_then_descent() {
        let forest = build(
            "/a",
            vec![
                rec("/a", 1, "/b", true),
                rec("/a", 2, "/c", true),
                rec("/b", 1, "/d", false),
            ],
        )
        .unwrap();

        let expected = vec![
            IncludeNode::new(1, "/b", true).with_children(vec![IncludeNode::new(1, "/d", false)]),
            IncludeNode::new(2, "/c", true),
        ];
        assert_eq!(forest, expected);
    }

    #[test]
    fn ascends_two_levels_and_resumes_under_ancestor() {
        let forest = build(
            "/a",
            vec![
                rec("/a", 1, "/b", true),
                rec("/b", 3, "/c", true),
                rec("/c", 5, "/d", true),
                rec("/d", 7, "/e", true),
                // back up to /b, skipping /d and /c
                rec("/b", 4, "/f", true),
                // and all the way back to the query root
                rec("/a", 2, "/g", false),
            ],
        )
        .unwrap();

        assert_eq!(forest.len(), 2);
        assert_eq!(forest[1], IncludeNode::new(2, "/g", false));
        let b = &forest[0];
        assert_eq!(b.path, "/b");
        let names: Vec<&str> = b.children.iter().map(|n| n.path.as_str()).collect();
        assert_eq!(names, vec!["/c", "/f"]);
        let d = &b.children[0].children[0];
        assert_eq!(d.path, "/d");
        assert_eq!(d.children, vec![IncludeNode::new(7, "/e", true)]);
        assert!(b.children[1].children.is_empty());
    }

    #[test]
    fn unmatched_root_is_a_consistency_error() {
        let result = build(
            "/a",
            vec![rec("/a", 1, "/b", true), rec("/nowhere", 1, "/c", true)],
        );
        assert_eq!(
            result,
            Err(TransportError::StreamConsistency {
                root_path: "/nowhere".into()
            })
        );
    }

    #[test]
    fn first_record_must_belong_to_query_root() {
        let result = build("/a", vec![rec("/b", 1, "/c", true)]);
        assert!(matches!(result, Err(TransportError::StreamConsistency { .. })));
    }

    #[test]
    fn failed_push_leaves_builder_intact() {
        let mut builder = IncludeTreeBuilder::new("/a");
        builder.push(rec("/a", 1, "/b", true)).unwrap();
        builder.push(rec("/b", 1, "/c", true)).unwrap();
        assert_eq!(builder.depth(), 2);
        assert!(builder.push(rec("/zzz", 1, "/x", true)).is_err());
        assert_eq!(builder.depth(), 2);
        builder.push(rec("/b", 2, "/d", true)).unwrap();
        let forest = builder.finish();
        assert_eq!(forest[0].children.len(), 2);
    }

    #[test]
    fn closed_subtree_cannot_be_reopened() {
        let mut builder = IncludeTreeBuilder::new("/a");
        builder.push(rec("/a", 1, "/b", true)).unwrap();
        builder.push(rec("/b", 1, "/x", true)).unwrap();
        builder.push(rec("/a", 2, "/c", true)).unwrap();
        builder.push(rec("/c", 1, "/y", true)).unwrap();

        let result = builder.push(rec("/b", 2, "/z", true));
        assert_eq!(
            result,
            Err(TransportError::StreamConsistency {
                root_path: "/b".into()
            })
        );
        let forest = builder.finish();
        assert_eq!(forest[0].children.len(), 1, "/z must not be merged into /b");
        assert_eq!(forest[1].children[0].path, "/y");
    }

    #[test]
    fn same_file_included_twice_keeps_both_occurrences() {
        let forest = build(
            "/a",
            vec![
                rec("/a", 1, "/common", true),
                rec("/common", 1, "/leaf", true),
                rec("/a", 2, "/b", true),
                rec("/b", 1, "/common", true),
                rec("/common", 1, "/leaf", true),
            ],
        )
        .unwrap();
        assert_eq!(forest[0].children.len(), 1);
        assert_eq!(forest[1].children[0].path, "/common");
        assert_eq!(forest[1].children[0].children.len(), 1);
    }

    #[tokio::test]
    async fn rebuild_tree_consumes_stream() {
        let records = stream::iter(vec![
            Ok(rec("/a", 1, "/b", true)),
            Ok(rec("/b", 2, "/c", true)),
        ])
        .boxed();
        let forest = rebuild_tree("/a", records).await.unwrap();
        assert_eq!(forest[0].children[0].path, "/c");
    }

    #[tokio::test]
    async fn rebuild_tree_propagates_transport_error() {
        let records = stream::iter(vec![
            Ok(rec("/a", 1, "/b", true)),
            Err(TransportError::Connection("lost".into())),
        ])
        .boxed();
        let result = rebuild_tree("/a", records).await;
        assert_eq!(result, Err(TransportError::Connection("lost".into())));
    }

    #[tokio::test]
    async fn unique_collection_ignores_shape() {
        let records = stream::iter(vec![
            Ok(rec("/a", 1, "/x", true)),
            Ok(rec("/x", 1, "/y", true)),
            Ok(rec("/a", 2, "/z", true)),
            Ok(rec("/z", 4, "/y", true)),
        ])
        .boxed();
        let paths = collect_unique(records).await.unwrap();
        let expected: BTreeSet<String> = ["/x", "/y", "/z"].iter().map(|s| s.to_string()).collect();
        assert_eq!(paths, expected);
    }

    #[tokio::test]
    async fn flat_collection_keeps_order_without_nesting() {
        let records = stream::iter(vec![
            Ok(rec("text", 3, "/p", true)),
            Ok(rec("text", 9, "/q", false)),
        ])
        .boxed();
        let nodes = collect_flat(records).await.unwrap();
        assert_eq!(
            nodes,
            vec![IncludeNode::new(3, "/p", true), IncludeNode::new(9, "/q", false)]
        );
    }
}
