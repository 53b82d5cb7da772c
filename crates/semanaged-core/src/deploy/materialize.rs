//! Materialization of archives onto disk
//!
//! A classpath root becomes one file or directory per top-level entry under
//! the output directory; anything else becomes a single packaged file.
//! Packaged files that already exist are reused, directories are always
//! rebuilt from scratch.

use camino::{Utf8Path, Utf8PathBuf};
use std::fs::File;
use std::io::Read;

use crate::archive::{
    Archive, ArchiveKind, Asset, CLASS_EXTENSION, CLASS_NAME_DELIMITER, ClassAsset, Node,
    PATH_DELIMITER,
};
use crate::{Error, Result};

use super::utils::{clear_directory, copy_stream, remove_path};

/// A path created on disk by a deploy call
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MaterializedFile {
    path: Utf8PathBuf,
    kind: MaterializedKind,
}

/// Whether a materialized entry is a packaged file or a directory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MaterializedKind {
    File,
    Directory,
}

impl MaterializedFile {
    pub fn file(path: impl Into<Utf8PathBuf>) -> Self {
        Self {
            path: path.into(),
            kind: MaterializedKind::File,
        }
    }

    pub fn directory(path: impl Into<Utf8PathBuf>) -> Self {
        Self {
            path: path.into(),
            kind: MaterializedKind::Directory,
        }
    }

    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    pub fn kind(&self) -> MaterializedKind {
        self.kind
    }
}

/// Writes archives under a fixed output directory
#[derive(Debug)]
pub struct Materializer<'a> {
    output_dir: &'a Utf8Path,
}

impl<'a> Materializer<'a> {
    pub fn new(output_dir: &'a Utf8Path) -> Self {
        Self { output_dir }
    }

    /// Materialize `archive`, appending every top-level path created to
    /// `created`.
    ///
    /// Entries are recorded as soon as they exist on disk, so a failure
    /// part-way leaves `created` describing everything that needs cleanup.
    pub fn materialize(
        &self,
        archive: &dyn Archive,
        created: &mut Vec<MaterializedFile>,
    ) -> Result<()> {
        match archive.kind() {
            ArchiveKind::ClassPath => {
                for child in archive.root().children() {
                    let Some(Asset::Archive(entry)) = child.asset() else {
                        tracing::debug!(path = child.path(), "Skipping non-archive class path entry");
                        continue;
                    };

                    match entry.kind() {
                        ArchiveKind::ClassPathDirectory => {
                            self.materialize_directory(&**entry, created)?
                        }
                        _ => self.materialize_archive(&**entry, created)?,
                    }
                }
            }
            ArchiveKind::ClassPathDirectory => self.materialize_directory(archive, created)?,
            ArchiveKind::Packaged => self.materialize_archive(archive, created)?,
        }

        Ok(())
    }

    /// Materialize a packaged archive as `<output_dir>/<name>`
    ///
    /// A file left behind by an earlier deploy is reused as-is.
    pub fn materialize_archive(
        &self,
        archive: &dyn Archive,
        created: &mut Vec<MaterializedFile>,
    ) -> Result<()> {
        let deployment_file = self.output_dir.join(archive.name());

        if deployment_file.exists() {
            tracing::debug!(path = %deployment_file, "Reusing existing deployment archive");
            created.push(MaterializedFile::file(deployment_file));
            return Ok(());
        }

        create_dir_all(self.output_dir)?;
        created.push(MaterializedFile::file(deployment_file.clone()));
        archive.export_to(&deployment_file).map_err(|e| {
            Error::materialize(
                format!("Could not export {} to {}: {}", archive.name(), deployment_file, e),
                "Check that the output directory is writable",
            )
        })?;

        tracing::debug!(path = %deployment_file, "Exported deployment archive");
        Ok(())
    }

    /// Materialize a classpath directory archive as `<output_dir>/<name>/`
    ///
    /// Archives without content are skipped entirely. Existing directory
    /// content is always deleted first.
    pub fn materialize_directory(
        &self,
        archive: &dyn Archive,
        created: &mut Vec<MaterializedFile>,
    ) -> Result<()> {
        if archive.is_empty() {
            tracing::debug!(archive = archive.name(), "Not materializing empty directory");
            return Ok(());
        }

        let entry_dir = self.output_dir.join(archive.name());

        if entry_dir.exists() {
            clear_directory(&entry_dir).map_err(|e| {
                Error::materialize(
                    format!("Could not delete previous content of {}: {}", entry_dir, e),
                    "Remove the directory manually and retry",
                )
            })?;
        } else {
            create_dir_all(&entry_dir)?;
        }
        created.push(MaterializedFile::directory(entry_dir.clone()));

        for child in archive.root().children() {
            self.write_node(&entry_dir, child)?;
        }

        tracing::debug!(path = %entry_dir, "Materialized class path directory");
        Ok(())
    }

    fn write_node(&self, entry_dir: &Utf8Path, node: &Node) -> Result<()> {
        match node.asset() {
            None => {
                for child in node.children() {
                    self.write_node(entry_dir, child)?;
                }
            }
            Some(Asset::Class(class)) => {
                let class_file = class_file_path(entry_dir, class);
                let mut input = class.source().open().map_err(|e| {
                    Error::materialize(
                        format!("Could not read class {}: {}", class.qualified_name(), e),
                        "Check that the class file is readable",
                    )
                })?;
                write_file(&class_file, &mut input)?;
            }
            Some(Asset::Resource(source)) => {
                let resource_file = resource_path(entry_dir, node.path());
                let mut input = source.open().map_err(|e| {
                    Error::materialize(
                        format!("Could not read resource {}: {}", node.path(), e),
                        "Check that the resource is readable",
                    )
                })?;
                write_file(&resource_file, &mut input)?;
            }
            Some(Asset::Archive(nested)) => {
                let dest = resource_path(entry_dir, node.path());
                if let Some(parent) = dest.parent() {
                    create_dir_all(parent)?;
                }
                nested.export_to(&dest).map_err(|e| {
                    Error::materialize(
                        format!("Could not export {} to {}: {}", nested.name(), dest, e),
                        "Check that the output directory is writable",
                    )
                })?;
            }
        }

        Ok(())
    }

    /// Delete materialized entries, directories recursively.
    ///
    /// Failures are logged and skipped so that teardown can continue.
    pub fn remove(files: &[MaterializedFile]) {
        for file in files {
            match remove_path(file.path()) {
                Ok(()) => tracing::debug!(path = %file.path(), "Deleted materialized file"),
                Err(e) => tracing::warn!(
                    path = %file.path(),
                    error = %e,
                    "Could not delete materialized file"
                ),
            }
        }
    }
}

/// `<entry_dir>/<package dirs>/<SimpleName>.class`
fn class_file_path(entry_dir: &Utf8Path, class: &ClassAsset) -> Utf8PathBuf {
    let mut path = entry_dir.to_path_buf();
    if let Some(package) = class.package() {
        for segment in package.split(CLASS_NAME_DELIMITER) {
            path.push(segment);
        }
    }
    path.push(format!("{}.{}", class.simple_name(), CLASS_EXTENSION));
    path
}

/// Map an archive path such as `/META-INF/beans.xml` below `entry_dir`
fn resource_path(entry_dir: &Utf8Path, archive_path: &str) -> Utf8PathBuf {
    let mut path = entry_dir.to_path_buf();
    for segment in archive_path.split(PATH_DELIMITER).filter(|s| !s.is_empty()) {
        path.push(segment);
    }
    path
}

fn create_dir_all(dir: &Utf8Path) -> Result<()> {
    std::fs::create_dir_all(dir).map_err(|e| {
        Error::materialize(
            format!("Could not create class path directory {}: {}", dir, e),
            "Check that the output directory is writable",
        )
    })
}

/// Stream `input` into a new file at `path`, creating parent directories.
///
/// Both handles are dropped on every exit path.
fn write_file(path: &Utf8Path, input: &mut dyn Read) -> Result<()> {
    if let Some(parent) = path.parent() {
        create_dir_all(parent)?;
    }

    let mut output = File::create(path).map_err(|e| {
        Error::materialize(
            format!("Could not create file {}: {}", path, e),
            "Check that the output directory is writable",
        )
    })?;

    copy_stream(input, &mut output).map_err(|e| {
        Error::materialize(
            format!("Could not write {}: {}", path, e),
            "Check free disk space and permissions",
        )
    })?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::{JarArchive, MemoryArchive};
    use std::fs;
    use tempfile::TempDir;

    fn output_dir(temp_dir: &TempDir) -> Utf8PathBuf {
        Utf8Path::from_path(temp_dir.path()).unwrap().join("target")
    }

    fn packaged(temp_dir: &TempDir, name: &str, content: &str) -> JarArchive {
        let path = Utf8Path::from_path(temp_dir.path()).unwrap().join(format!("src-{}", name));
        fs::write(&path, content).unwrap();
        JarArchive::named(name, path)
    }

    #[test]
    fn test_materialize_packaged_archive() {
        let temp_dir = TempDir::new().unwrap();
        let output = output_dir(&temp_dir);
        let archive = packaged(&temp_dir, "app.jar", "jar-bytes");

        let mut created = Vec::new();
        Materializer::new(&output)
            .materialize(&archive, &mut created)
            .unwrap();

        assert_eq!(created, vec![MaterializedFile::file(output.join("app.jar"))]);
        assert_eq!(fs::read_to_string(output.join("app.jar")).unwrap(), "jar-bytes");
    }

    #[test]
    fn test_existing_packaged_archive_is_reused() {
        let temp_dir = TempDir::new().unwrap();
        let output = output_dir(&temp_dir);
        fs::create_dir_all(&output).unwrap();
        fs::write(output.join("app.jar"), "previous").unwrap();

        let archive = packaged(&temp_dir, "app.jar", "new");
        let mut created = Vec::new();
        Materializer::new(&output)
            .materialize(&archive, &mut created)
            .unwrap();

        assert_eq!(created.len(), 1);
        assert_eq!(fs::read_to_string(output.join("app.jar")).unwrap(), "previous");
    }

    fn read_jar_entry(path: &Utf8Path, name: &str) -> Vec<u8> {
        let mut jar = zip::ZipArchive::new(File::open(path).unwrap()).unwrap();
        let mut entry = jar.by_name(name).unwrap();
        let mut content = Vec::new();
        entry.read_to_end(&mut content).unwrap();
        content
    }

    #[test]
    fn test_in_memory_packaged_archive_is_exported() {
        let temp_dir = TempDir::new().unwrap();
        let output = output_dir(&temp_dir);
        let archive = MemoryArchive::new("app.jar", ArchiveKind::Packaged)
            .add_class("com.acme.Greeter", b"greeter".to_vec());

        let mut created = Vec::new();
        Materializer::new(&output)
            .materialize(&archive, &mut created)
            .unwrap();

        assert_eq!(created, vec![MaterializedFile::file(output.join("app.jar"))]);
        assert_eq!(
            read_jar_entry(&output.join("app.jar"), "com/acme/Greeter.class"),
            b"greeter"
        );
    }

    #[test]
    fn test_in_memory_packaged_entry_under_class_path() {
        let temp_dir = TempDir::new().unwrap();
        let output = output_dir(&temp_dir);
        let library = MemoryArchive::new("support.jar", ArchiveKind::Packaged)
            .add_resource("META-INF/support.properties", "enabled=true");
        let root = MemoryArchive::class_path("deployment").add_archive(library);

        let mut created = Vec::new();
        Materializer::new(&output)
            .materialize(&root, &mut created)
            .unwrap();

        assert_eq!(created, vec![MaterializedFile::file(output.join("support.jar"))]);
        assert_eq!(
            read_jar_entry(&output.join("support.jar"), "META-INF/support.properties"),
            b"enabled=true"
        );
    }

    #[test]
    fn test_materialize_directory_layout() {
        let temp_dir = TempDir::new().unwrap();
        let output = output_dir(&temp_dir);

        let classes = MemoryArchive::class_path_directory("classes")
            .add_class("com.acme.Greeter", b"greeter".to_vec())
            .add_class("com.acme.Other", b"other".to_vec())
            .add_class("Main", b"main".to_vec())
            .add_resource("META-INF/beans.xml", "<beans/>");
        let root = MemoryArchive::class_path("deployment").add_archive(classes);

        let mut created = Vec::new();
        Materializer::new(&output)
            .materialize(&root, &mut created)
            .unwrap();

        let entry = output.join("classes");
        assert_eq!(created, vec![MaterializedFile::directory(entry.clone())]);
        assert_eq!(
            fs::read(entry.join("com").join("acme").join("Greeter.class")).unwrap(),
            b"greeter"
        );
        assert_eq!(
            fs::read(entry.join("com").join("acme").join("Other.class")).unwrap(),
            b"other"
        );
        assert_eq!(fs::read(entry.join("Main.class")).unwrap(), b"main");
        assert_eq!(
            fs::read_to_string(entry.join("META-INF").join("beans.xml")).unwrap(),
            "<beans/>"
        );
    }

    #[test]
    fn test_root_resources_are_written() {
        let temp_dir = TempDir::new().unwrap();
        let output = output_dir(&temp_dir);

        let classes = MemoryArchive::class_path_directory("classes")
            .add_resource("log4j2.xml", "<Configuration/>")
            .add_class("Main", b"main".to_vec());

        let mut created = Vec::new();
        Materializer::new(&output)
            .materialize(&classes, &mut created)
            .unwrap();

        let entry = output.join("classes");
        assert_eq!(
            fs::read_to_string(entry.join("log4j2.xml")).unwrap(),
            "<Configuration/>"
        );
        assert!(entry.join("Main.class").exists());
    }

    #[test]
    fn test_empty_directory_is_not_materialized() {
        let temp_dir = TempDir::new().unwrap();
        let output = output_dir(&temp_dir);

        let root = MemoryArchive::class_path("deployment")
            .add_archive(MemoryArchive::class_path_directory("empty"));

        let mut created = Vec::new();
        Materializer::new(&output)
            .materialize(&root, &mut created)
            .unwrap();

        assert!(created.is_empty());
        assert!(!output.join("empty").exists());
    }

    #[test]
    fn test_stale_directory_content_is_removed() {
        let temp_dir = TempDir::new().unwrap();
        let output = output_dir(&temp_dir);
        let entry = output.join("classes");
        fs::create_dir_all(entry.join("old/pkg")).unwrap();
        fs::write(entry.join("old/pkg/Stale.class"), "stale").unwrap();
        fs::write(entry.join("stale.txt"), "stale").unwrap();

        let classes =
            MemoryArchive::class_path_directory("classes").add_class("Fresh", b"fresh".to_vec());

        let mut created = Vec::new();
        Materializer::new(&output)
            .materialize(&classes, &mut created)
            .unwrap();

        assert!(entry.join("Fresh.class").exists());
        assert!(!entry.join("stale.txt").exists());
        assert!(!entry.join("old").exists());
    }

    #[test]
    fn test_mixed_class_path_entries() {
        let temp_dir = TempDir::new().unwrap();
        let output = output_dir(&temp_dir);

        let root = MemoryArchive::class_path("deployment")
            .add_archive(packaged(&temp_dir, "lib.jar", "lib"))
            .add_archive(MemoryArchive::class_path_directory("classes").add_class("A", b"a".to_vec()))
            .add_resource("ignored.txt", "not an entry");

        let mut created = Vec::new();
        Materializer::new(&output)
            .materialize(&root, &mut created)
            .unwrap();

        assert_eq!(
            created,
            vec![
                MaterializedFile::file(output.join("lib.jar")),
                MaterializedFile::directory(output.join("classes")),
            ]
        );
        assert!(!output.join("ignored.txt").exists());
    }

    #[test]
    fn test_failed_export_is_recorded_for_cleanup() {
        let temp_dir = TempDir::new().unwrap();
        let output = output_dir(&temp_dir);
        let missing = JarArchive::named("gone.jar", "/nonexistent/gone.jar");

        let mut created = Vec::new();
        let result = Materializer::new(&output).materialize(&missing, &mut created);

        assert!(matches!(result, Err(Error::Materialize { .. })));
        assert_eq!(created, vec![MaterializedFile::file(output.join("gone.jar"))]);
    }

    #[test]
    fn test_remove_tolerates_missing_entries() {
        let temp_dir = TempDir::new().unwrap();
        let output = output_dir(&temp_dir);
        fs::create_dir_all(output.join("classes/a")).unwrap();
        fs::write(output.join("classes/a/A.class"), "a").unwrap();
        fs::write(output.join("app.jar"), "jar").unwrap();

        Materializer::remove(&[
            MaterializedFile::file(output.join("missing.jar")),
            MaterializedFile::directory(output.join("classes")),
            MaterializedFile::file(output.join("app.jar")),
        ]);

        assert!(!output.join("classes").exists());
        assert!(!output.join("app.jar").exists());
    }
}
