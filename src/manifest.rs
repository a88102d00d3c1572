//! The in-memory manifest built before serialization
//!
//! A manifest is the ordered set of directory and file nodes produced by a
//! walk, with each file already carrying its chosen payload. It is built
//! once, in full, and is never mutated afterwards.
//!
//! Invariants enforced by [`ManifestBuilder`]:
//! - the root `/` always exists as a directory
//! - paths are unique across files and directories
//! - every non-root node is listed in exactly one parent's `children`
//! - children are ordered by base name

use crate::compression::Decision;
use crate::error::{EmbedError, Result};
use crate::types::{DirNode, FileNode, Node, Timestamp};
use crate::vfs::path;
use std::collections::HashMap;

/// Ordered collection of nodes, root first, in walk (pre-order) order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Manifest {
    nodes: Vec<Node>,
    index: HashMap<String, usize>,
}

impl Manifest {
    /// All nodes in pre-order
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Look up a node by absolute path
    pub fn get(&self, node_path: &str) -> Option<&Node> {
        self.index.get(node_path).map(|&idx| &self.nodes[idx])
    }

    /// The root directory
    pub fn root(&self) -> &DirNode {
        match &self.nodes[0] {
            Node::Dir(root) => root,
            Node::File(_) => unreachable!("manifest root is always a directory"),
        }
    }

    /// Number of nodes, including the root
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the manifest holds only the root
    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 1
    }

    /// Iterate over file nodes
    pub fn files(&self) -> impl Iterator<Item = &FileNode> {
        self.nodes.iter().filter_map(|node| match node {
            Node::File(file) => Some(file),
            Node::Dir(_) => None,
        })
    }

    /// Iterate over directory nodes
    pub fn dirs(&self) -> impl Iterator<Item = &DirNode> {
        self.nodes.iter().filter_map(|node| match node {
            Node::Dir(dir) => Some(dir),
            Node::File(_) => None,
        })
    }
}

/// Incremental manifest construction
///
/// Nodes must arrive parent-first, which a pre-order walk guarantees.
#[derive(Debug, Default)]
pub struct ManifestBuilder {
    nodes: Vec<Node>,
    index: HashMap<String, usize>,
}

impl ManifestBuilder {
    /// Create an empty builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a directory
    ///
    /// # Errors
    ///
    /// Fails if the path is already present or its parent is missing.
    pub fn add_dir(&mut self, dir_path: &str, modified: Timestamp) -> Result<()> {
        self.insert(Node::Dir(DirNode {
            path: dir_path.to_string(),
            name: path::base_name(dir_path).to_string(),
            modified,
            children: Vec::new(),
        }))
    }

    /// Add a file with its compression decision
    ///
    /// # Errors
    ///
    /// Fails if the path is already present, is the root, or its parent is
    /// missing.
    pub fn add_file(&mut self, file_path: &str, modified: Timestamp, decision: Decision) -> Result<()> {
        if file_path == path::ROOT {
            return Err(EmbedError::internal("the root cannot be a file"));
        }
        self.insert(Node::File(FileNode {
            path: file_path.to_string(),
            name: path::base_name(file_path).to_string(),
            modified,
            uncompressed_size: decision.uncompressed_size,
            payload: decision.payload,
        }))
    }

    fn insert(&mut self, node: Node) -> Result<()> {
        let node_path = node.path().to_string();
        if self.index.contains_key(&node_path) {
            return Err(EmbedError::internal(format!("duplicate manifest path {}", node_path)));
        }

        if let Some(parent_path) = path::parent(&node_path) {
            let parent_idx = self.parent_index(parent_path)?;
            match &mut self.nodes[parent_idx] {
                Node::Dir(parent) => parent.children.push(node_path.clone()),
                Node::File(_) => {
                    return Err(EmbedError::internal(format!("parent of {} is a file", node_path)));
                }
            }
        } else if !node.is_dir() {
            return Err(EmbedError::internal("the root must be a directory"));
        }

        self.index.insert(node_path, self.nodes.len());
        self.nodes.push(node);
        Ok(())
    }

    fn parent_index(&mut self, parent_path: &str) -> Result<usize> {
        if let Some(&idx) = self.index.get(parent_path) {
            return Ok(idx);
        }
        // Only the root may be created implicitly.
        if parent_path == path::ROOT {
            self.insert(Node::Dir(DirNode {
                path: path::ROOT.to_string(),
                name: path::ROOT.to_string(),
                modified: Timestamp::UNIX_EPOCH,
                children: Vec::new(),
            }))?;
            return Ok(self.nodes.len() - 1);
        }
        Err(EmbedError::internal(format!("missing parent directory {}", parent_path)))
    }

    /// Finish the manifest
    ///
    /// Creates the root if nothing was added and sorts every child list by
    /// base name.
    pub fn build(mut self) -> Manifest {
        // Any insertion creates the root first, so it is only missing when
        // nothing was added at all.
        if self.nodes.is_empty() {
            self.index.insert(path::ROOT.to_string(), 0);
            self.nodes.push(Node::Dir(DirNode {
                path: path::ROOT.to_string(),
                name: path::ROOT.to_string(),
                modified: Timestamp::UNIX_EPOCH,
                children: Vec::new(),
            }));
        }

        for node in &mut self.nodes {
            if let Node::Dir(dir) = node {
                dir.children
                    .sort_by(|a, b| path::base_name(a).cmp(path::base_name(b)));
            }
        }

        Manifest {
            nodes: self.nodes,
            index: self.index,
        }
    }
}
