//! Loading classpath directories from disk

use camino::{Utf8Path, Utf8PathBuf};
use walkdir::WalkDir;

use super::{CLASS_EXTENSION, MemoryArchive, Source};
use crate::{Error, Result};

const CLASS_NAME_SEPARATOR: &str = ".";
const PATH_SEPARATOR: &str = "/";

/// Load a compiled-classes directory as a classpath directory archive.
///
/// `*.class` files become class assets named after their relative path
/// (`com/acme/Foo.class` is `com.acme.Foo`); every other file becomes a
/// resource at its relative path. File contents are streamed lazily from
/// disk when the archive is materialized.
pub fn load_class_path_directory(name: &str, dir: &Utf8Path) -> Result<MemoryArchive> {
    if !dir.is_dir() {
        return Err(Error::config(
            format!("Class path directory not found: {}", dir),
            "Pass an existing directory of compiled classes",
        ));
    }

    let mut archive = MemoryArchive::class_path_directory(name);

    for entry in WalkDir::new(dir).follow_links(true).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            Error::config(
                format!("Failed to read directory entry: {}", e),
                "Check directory permissions",
            )
        })?;

        if !entry.file_type().is_file() {
            continue;
        }

        let path = Utf8PathBuf::try_from(entry.path().to_path_buf()).map_err(|e| {
            Error::config(
                format!("Path is not valid UTF-8: {:?}", e),
                "Ensure all file paths contain only valid UTF-8 characters",
            )
        })?;

        let rel_path = path.strip_prefix(dir).map_err(|_| {
            Error::config(
                format!("Failed to strip prefix from {}", path),
                "This is likely a bug in semanaged",
            )
        })?;

        if rel_path.extension() == Some(CLASS_EXTENSION) {
            let qualified_name = rel_path
                .with_extension("")
                .components()
                .map(|c| c.as_str())
                .collect::<Vec<_>>()
                .join(CLASS_NAME_SEPARATOR);
            tracing::trace!(class = %qualified_name, "Found class");
            archive.insert_class(&qualified_name, Source::File(path));
        } else {
            let segments: Vec<&str> = rel_path.components().map(|c| c.as_str()).collect();
            let archive_path = segments.join(PATH_SEPARATOR);
            archive = archive.add_file(&archive_path, path);
        }
    }

    tracing::debug!(archive = name, directory = %dir, "Loaded class path directory");
    Ok(archive)
}
