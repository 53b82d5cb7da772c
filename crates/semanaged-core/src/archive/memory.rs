//! In-memory archive trees

use camino::Utf8PathBuf;
use std::io::{self, Write};

use super::{
    Archive, ArchiveKind, Asset, CLASS_EXTENSION, CLASS_NAME_DELIMITER, ClassAsset, Node,
    PATH_DELIMITER, ROOT_PATH, Source, package,
};

/// An archive whose tree lives in memory
///
/// Leaves either carry their bytes directly or point at a file on disk
/// that is streamed when the asset is opened.
#[derive(Debug)]
pub struct MemoryArchive {
    name: String,
    kind: ArchiveKind,
    root: Node,
}

impl MemoryArchive {
    /// Create an empty archive of the given kind
    pub fn new(name: impl Into<String>, kind: ArchiveKind) -> Self {
        Self {
            name: name.into(),
            kind,
            root: Node::directory(ROOT_PATH),
        }
    }

    /// Create an empty classpath root
    pub fn class_path(name: impl Into<String>) -> Self {
        Self::new(name, ArchiveKind::ClassPath)
    }

    /// Create an empty classpath directory
    pub fn class_path_directory(name: impl Into<String>) -> Self {
        Self::new(name, ArchiveKind::ClassPathDirectory)
    }

    /// Add a compiled class under its package path
    pub fn add_class(mut self, qualified_name: &str, source: impl Into<Source>) -> Self {
        self.insert_class(qualified_name, source.into());
        self
    }

    /// Add a resource at an archive path, e.g. `META-INF/beans.xml`
    pub fn add_resource(mut self, path: &str, source: impl Into<Source>) -> Self {
        self.root.insert(path, Asset::Resource(source.into()));
        self
    }

    /// Add a resource whose bytes are streamed from `file`
    pub fn add_file(mut self, path: &str, file: impl Into<Utf8PathBuf>) -> Self {
        self.root
            .insert(path, Asset::Resource(Source::File(file.into())));
        self
    }

    /// Add a nested archive at `/<archive name>`
    pub fn add_archive(mut self, archive: impl Archive + 'static) -> Self {
        self.push_archive(Box::new(archive));
        self
    }

    /// Add an already boxed nested archive at `/<archive name>`
    pub fn push_archive(&mut self, archive: Box<dyn Archive>) {
        let path = format!("{}{}", PATH_DELIMITER, archive.name());
        self.root.insert(&path, Asset::Archive(archive));
    }

    /// Copy every asset of `other` into this archive at the same path.
    ///
    /// Existing assets at those paths are replaced. Packaged files are
    /// unpacked first.
    pub fn merge(&mut self, other: Box<dyn Archive>) -> io::Result<()> {
        let mut leaves = Vec::new();
        other.into_tree()?.into_leaves(&mut leaves);
        for (path, asset) in leaves {
            self.root.insert(&path, asset);
        }
        Ok(())
    }

    pub(crate) fn insert_class(&mut self, qualified_name: &str, source: Source) {
        let path = format!(
            "{}{}.{}",
            PATH_DELIMITER,
            qualified_name.replace(CLASS_NAME_DELIMITER, "/"),
            CLASS_EXTENSION
        );
        self.root.insert(
            &path,
            Asset::Class(ClassAsset::new(qualified_name, source)),
        );
    }
}

impl Archive for MemoryArchive {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> ArchiveKind {
        self.kind
    }

    fn root(&self) -> &Node {
        &self.root
    }

    fn write_package(&self, out: &mut dyn Write) -> io::Result<()> {
        package::write_jar(&self.root, out)
    }

    fn into_tree(self: Box<Self>) -> io::Result<Node> {
        Ok(self.root)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_class_uses_package_path() {
        let archive = MemoryArchive::class_path_directory("classes")
            .add_class("com.acme.Greeter", b"cafebabe".to_vec());

        let node = archive.get("/com/acme/Greeter.class").unwrap();
        match node.asset() {
            Some(Asset::Class(class)) => assert_eq!(class.qualified_name(), "com.acme.Greeter"),
            other => panic!("expected class asset, got {:?}", other),
        }
    }

    #[test]
    fn test_nested_archives_are_top_level_children() {
        let archive = MemoryArchive::class_path("deployment")
            .add_archive(MemoryArchive::class_path_directory("classes").add_resource("a.txt", "a"))
            .add_archive(MemoryArchive::class_path_directory("resources"));

        let names: Vec<_> = archive.root().children().iter().map(Node::name).collect();
        assert_eq!(names, vec!["classes", "resources"]);
        assert!(matches!(
            archive.get("/classes").unwrap().asset(),
            Some(Asset::Archive(_))
        ));
    }

    #[test]
    fn test_is_empty() {
        assert!(MemoryArchive::class_path_directory("empty").is_empty());
        assert!(
            !MemoryArchive::class_path_directory("full")
                .add_resource("META-INF/beans.xml", "<beans/>")
                .is_empty()
        );
    }

    #[test]
    fn test_export_writes_jar() {
        let temp_dir = tempfile::tempdir().unwrap();
        let dest = camino::Utf8Path::from_path(temp_dir.path()).unwrap().join("app.jar");

        MemoryArchive::new("app.jar", ArchiveKind::Packaged)
            .add_class("com.acme.Greeter", b"greeter".to_vec())
            .add_resource("META-INF/beans.xml", "<beans/>")
            .export_to(&dest)
            .unwrap();

        let root = package::read_jar(std::fs::File::open(&dest).unwrap()).unwrap();
        assert!(root.find("/com/acme/Greeter.class").is_some());
        assert!(root.find("/META-INF/beans.xml").is_some());
    }

    #[test]
    fn test_merge_replaces_and_adds() {
        let mut application = MemoryArchive::class_path_directory("app")
            .add_class("com.acme.App", b"app".to_vec())
            .add_resource("config.txt", "old");
        let auxiliary = MemoryArchive::class_path_directory("aux")
            .add_class("com.acme.Helper", b"helper".to_vec())
            .add_resource("config.txt", "new");

        application.merge(Box::new(auxiliary)).unwrap();

        assert!(application.get("/com/acme/App.class").is_some());
        assert!(application.get("/com/acme/Helper.class").is_some());
        let Some(Asset::Resource(Source::Bytes(bytes))) =
            application.get("/config.txt").and_then(Node::asset)
        else {
            panic!("expected a byte resource");
        };
        assert_eq!(bytes, b"new");
    }
}
