//! Packaged archives backed by a file on disk

use camino::{Utf8Path, Utf8PathBuf};
use std::fs::File;
use std::io::{self, Write};

use super::{Archive, ArchiveKind, Node, ROOT_PATH, package};
use crate::deploy::utils::copy_stream;
use crate::{Error, Result};

/// An already packaged deployable, e.g. a `.jar` produced by a build tool
///
/// The package contents are opaque: the tree is empty and exporting
/// copies the file as-is. Unpacking happens only on [`Archive::into_tree`].
#[derive(Debug)]
pub struct JarArchive {
    name: String,
    path: Utf8PathBuf,
    root: Node,
}

impl JarArchive {
    /// Wrap an existing package file
    pub fn open(path: impl Into<Utf8PathBuf>) -> Result<Self> {
        let path = path.into();
        if !path.is_file() {
            return Err(Error::config(
                format!("Packaged archive not found: {}", path),
                "Pass an existing .jar file",
            ));
        }

        let name = path
            .file_name()
            .ok_or_else(|| {
                Error::config(
                    format!("Path has no file name: {}", path),
                    "Pass a path to a .jar file",
                )
            })?
            .to_string();

        Ok(Self::named(name, path))
    }

    /// Wrap a package file under a different archive name
    pub fn named(name: impl Into<String>, path: impl Into<Utf8PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            root: Node::directory(ROOT_PATH),
        }
    }

    /// Location of the package file
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }
}

impl Archive for JarArchive {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> ArchiveKind {
        ArchiveKind::Packaged
    }

    fn root(&self) -> &Node {
        &self.root
    }

    fn write_package(&self, out: &mut dyn Write) -> io::Result<()> {
        let mut input = File::open(&self.path)?;
        copy_stream(&mut input, out)?;
        Ok(())
    }

    fn into_tree(self: Box<Self>) -> io::Result<Node> {
        package::read_jar(File::open(&self.path)?)
    }

    fn export_to(&self, dest: &Utf8Path) -> io::Result<()> {
        let mut input = File::open(&self.path)?;
        let mut output = File::create(dest)?;
        copy_stream(&mut input, &mut output)?;
        Ok(())
    }

    fn is_empty(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_open_and_export() {
        let temp_dir = TempDir::new().unwrap();
        let dir = Utf8Path::from_path(temp_dir.path()).unwrap();
        let source = dir.join("app.jar");
        std::fs::write(&source, b"PK\x03\x04 fake jar").unwrap();

        let archive = JarArchive::open(source.clone()).unwrap();
        assert_eq!(archive.name(), "app.jar");
        assert_eq!(archive.kind(), ArchiveKind::Packaged);
        assert!(!archive.is_empty());

        let dest = dir.join("copy.jar");
        archive.export_to(&dest).unwrap();
        assert_eq!(std::fs::read(&dest).unwrap(), b"PK\x03\x04 fake jar");
    }

    #[test]
    fn test_into_tree_unpacks_entries() {
        let temp_dir = TempDir::new().unwrap();
        let dir = Utf8Path::from_path(temp_dir.path()).unwrap();
        let source = dir.join("lib.jar");
        crate::archive::MemoryArchive::new("lib.jar", ArchiveKind::Packaged)
            .add_class("com.acme.Helper", b"helper".to_vec())
            .export_to(&source)
            .unwrap();

        let archive: Box<dyn Archive> = Box::new(JarArchive::open(source).unwrap());
        let root = archive.into_tree().unwrap();

        assert!(root.find("/com/acme/Helper.class").is_some());
    }

    #[test]
    fn test_into_tree_of_invalid_package() {
        let temp_dir = TempDir::new().unwrap();
        let dir = Utf8Path::from_path(temp_dir.path()).unwrap();
        let source = dir.join("broken.jar");
        std::fs::write(&source, b"not a zip").unwrap();

        let archive: Box<dyn Archive> = Box::new(JarArchive::open(source).unwrap());
        assert!(archive.into_tree().is_err());
    }

    #[test]
    fn test_open_missing_file() {
        let result = JarArchive::open("/nonexistent/missing.jar");
        assert!(matches!(result, Err(Error::Config { .. })));
    }
}
