//! Archive capability model
//!
//! The deployment core only needs a narrow, read-only view of an archive:
//! its name, what kind of deployable it represents, its node tree, and the
//! ability to export itself as a single packaged file. Anything implementing
//! [`Archive`] can be deployed.
//!
//! Two implementations ship with the crate:
//! - [`MemoryArchive`]: an in-memory tree built programmatically or loaded
//!   from a compiled-classes directory
//! - [`JarArchive`]: an already packaged file on disk
//!
//! Exporting writes the jar (zip) format; see [`package`].

mod fs;
mod jar;
mod memory;
pub mod package;

use camino::Utf8Path;
use std::fmt;
use std::fs::File;
use std::io::{self, Read, Write};

pub use fs::load_class_path_directory;
pub use jar::JarArchive;
pub use memory::MemoryArchive;

/// Path of the root node of every archive
pub const ROOT_PATH: &str = "/";

/// Reserved resource holding extra JVM system properties for the worker
pub const SYSTEM_PROPERTIES_PATH: &str = "/system.properties";

/// Archive path separator
pub const PATH_DELIMITER: char = '/';

/// Separator between package segments in a qualified class name
pub const CLASS_NAME_DELIMITER: char = '.';

/// File extension of compiled classes
pub const CLASS_EXTENSION: &str = "class";

/// What kind of deployable an archive represents
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveKind {
    /// Classpath root; each top-level child is an independent classpath entry
    ClassPath,
    /// Loose classes and resources materialized as a directory
    ClassPathDirectory,
    /// Single packaged unit materialized as one file
    Packaged,
}

/// Read-only view of a deployable archive
pub trait Archive: fmt::Debug {
    /// File name the archive is materialized under
    fn name(&self) -> &str;

    /// Kind marker used to select the materialization mode
    fn kind(&self) -> ArchiveKind;

    /// The `/` node; always a directory
    fn root(&self) -> &Node;

    /// Write the archive as one packaged (jar) stream
    fn write_package(&self, out: &mut dyn Write) -> io::Result<()>;

    /// Give up the archive and return its content as a node tree
    fn into_tree(self: Box<Self>) -> io::Result<Node>;

    /// Write the archive as one packaged file at `dest`
    fn export_to(&self, dest: &Utf8Path) -> io::Result<()> {
        let mut file = File::create(dest)?;
        self.write_package(&mut file)?;
        file.flush()
    }

    /// Look up a node by its absolute archive path
    fn get(&self, path: &str) -> Option<&Node> {
        self.root().find(path)
    }

    /// Whether the archive holds no assets at all
    fn is_empty(&self) -> bool {
        !self.root().has_assets()
    }
}

/// A node in an archive tree: a directory or a leaf carrying an asset
#[derive(Debug)]
pub struct Node {
    path: String,
    content: NodeContent,
}

#[derive(Debug)]
enum NodeContent {
    Directory(Vec<Node>),
    Leaf(Asset),
}

impl Node {
    /// Create an empty directory node
    pub fn directory(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content: NodeContent::Directory(Vec::new()),
        }
    }

    /// Create a leaf node
    pub fn leaf(path: impl Into<String>, asset: Asset) -> Self {
        Self {
            path: path.into(),
            content: NodeContent::Leaf(asset),
        }
    }

    /// Absolute archive path, e.g. `/META-INF/beans.xml`
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Last path segment
    pub fn name(&self) -> &str {
        self.path
            .rsplit(PATH_DELIMITER)
            .find(|s| !s.is_empty())
            .unwrap_or_default()
    }

    /// The asset of a leaf, `None` for directories
    pub fn asset(&self) -> Option<&Asset> {
        match &self.content {
            NodeContent::Leaf(asset) => Some(asset),
            NodeContent::Directory(_) => None,
        }
    }

    /// Children of a directory; empty for leaves
    pub fn children(&self) -> &[Node] {
        match &self.content {
            NodeContent::Directory(children) => children,
            NodeContent::Leaf(_) => &[],
        }
    }

    pub fn is_directory(&self) -> bool {
        matches!(self.content, NodeContent::Directory(_))
    }

    /// Consume the node, collecting every leaf with its absolute path
    fn into_leaves(self, leaves: &mut Vec<(String, Asset)>) {
        match self.content {
            NodeContent::Leaf(asset) => leaves.push((self.path, asset)),
            NodeContent::Directory(children) => {
                for child in children {
                    child.into_leaves(leaves);
                }
            }
        }
    }

    fn has_assets(&self) -> bool {
        match &self.content {
            NodeContent::Leaf(_) => true,
            NodeContent::Directory(children) => children.iter().any(Node::has_assets),
        }
    }

    fn find(&self, path: &str) -> Option<&Node> {
        let mut current = self;
        for segment in segments(path) {
            current = current.children().iter().find(|c| c.name() == segment)?;
        }
        Some(current)
    }

    /// Insert `asset` at `path` below this node, creating intermediate
    /// directories. An existing node at `path` is replaced.
    pub(crate) fn insert(&mut self, path: &str, asset: Asset) {
        let parts: Vec<&str> = segments(path).collect();
        let Some((last, dirs)) = parts.split_last() else {
            return;
        };

        let mut current = self;
        for dir in dirs {
            current = current.child_directory(dir);
        }

        let leaf_path = join_path(&current.path, last);
        let children = current.children_mut();
        children.retain(|c| c.name() != *last);
        children.push(Node::leaf(leaf_path, asset));
    }

    fn child_directory(&mut self, name: &str) -> &mut Node {
        let child_path = join_path(&self.path, name);
        let children = self.children_mut();
        let index = match children.iter().position(|c| c.name() == name) {
            Some(index) => {
                if !children[index].is_directory() {
                    children[index] = Node::directory(child_path);
                }
                index
            }
            None => {
                children.push(Node::directory(child_path));
                children.len() - 1
            }
        };
        &mut children[index]
    }

    fn children_mut(&mut self) -> &mut Vec<Node> {
        if !self.is_directory() {
            self.content = NodeContent::Directory(Vec::new());
        }
        match &mut self.content {
            NodeContent::Directory(children) => children,
            NodeContent::Leaf(_) => unreachable!("leaf was replaced by a directory above"),
        }
    }
}

/// Content carried by a leaf node
#[derive(Debug)]
pub enum Asset {
    /// A compiled class, materialized by package
    Class(ClassAsset),
    /// Any other resource, materialized by archive path
    Resource(Source),
    /// A nested archive
    Archive(Box<dyn Archive>),
}

/// A compiled class and its fully qualified name
#[derive(Debug)]
pub struct ClassAsset {
    qualified_name: String,
    source: Source,
}

impl ClassAsset {
    pub fn new(qualified_name: impl Into<String>, source: Source) -> Self {
        Self {
            qualified_name: qualified_name.into(),
            source,
        }
    }

    /// Fully qualified class name, e.g. `com.acme.Foo`
    pub fn qualified_name(&self) -> &str {
        &self.qualified_name
    }

    /// Package name, `None` for the default package
    pub fn package(&self) -> Option<&str> {
        self.qualified_name
            .rsplit_once(CLASS_NAME_DELIMITER)
            .map(|(package, _)| package)
    }

    /// Class name without the package
    pub fn simple_name(&self) -> &str {
        self.qualified_name
            .rsplit_once(CLASS_NAME_DELIMITER)
            .map_or(self.qualified_name.as_str(), |(_, name)| name)
    }

    pub fn source(&self) -> &Source {
        &self.source
    }
}

/// Where the bytes of an asset come from
#[derive(Debug, Clone)]
pub enum Source {
    Bytes(Vec<u8>),
    File(camino::Utf8PathBuf),
}

impl Source {
    /// Open a reader over the asset bytes
    pub fn open(&self) -> io::Result<Box<dyn Read + '_>> {
        match self {
            Source::Bytes(bytes) => Ok(Box::new(bytes.as_slice())),
            Source::File(path) => Ok(Box::new(std::fs::File::open(path)?)),
        }
    }
}

impl From<Vec<u8>> for Source {
    fn from(bytes: Vec<u8>) -> Self {
        Source::Bytes(bytes)
    }
}

impl From<&str> for Source {
    fn from(text: &str) -> Self {
        Source::Bytes(text.as_bytes().to_vec())
    }
}

/// Non-empty segments of an archive path
fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split(PATH_DELIMITER).filter(|s| !s.is_empty())
}

fn join_path(parent: &str, name: &str) -> String {
    if parent.ends_with(PATH_DELIMITER) {
        format!("{}{}", parent, name)
    } else {
        format!("{}{}{}", parent, PATH_DELIMITER, name)
    }
}
