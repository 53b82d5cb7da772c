//! Jar (zip) packaging of archive trees
//!
//! Writing lays classes out by package (`com/acme/Foo.class`), resources at
//! their archive path and nested archives as embedded jar entries. Reading
//! turns every file entry of a jar back into a resource leaf.

use std::io::{self, Cursor, Read, Seek, Write};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use super::{
    Asset, CLASS_EXTENSION, CLASS_NAME_DELIMITER, ClassAsset, Node, PATH_DELIMITER, ROOT_PATH,
    Source,
};
use crate::deploy::utils::copy_stream;

type JarWriter = ZipWriter<Cursor<Vec<u8>>>;

/// Write the tree below `root` as a jar into `out`
pub fn write_jar(root: &Node, out: &mut dyn Write) -> io::Result<()> {
    let mut jar = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for child in root.children() {
        write_entry(&mut jar, child, options)?;
    }

    let buffer = jar.finish().map_err(io::Error::other)?.into_inner();
    out.write_all(&buffer)?;
    out.flush()
}

fn write_entry(jar: &mut JarWriter, node: &Node, options: SimpleFileOptions) -> io::Result<()> {
    match node.asset() {
        None => {
            jar.add_directory(entry_name(node.path()), options)
                .map_err(io::Error::other)?;
            for child in node.children() {
                write_entry(jar, child, options)?;
            }
        }
        Some(Asset::Class(class)) => {
            jar.start_file(class_entry_name(class), options)
                .map_err(io::Error::other)?;
            copy_stream(&mut *class.source().open()?, jar)?;
        }
        Some(Asset::Resource(source)) => {
            jar.start_file(entry_name(node.path()), options)
                .map_err(io::Error::other)?;
            copy_stream(&mut *source.open()?, jar)?;
        }
        Some(Asset::Archive(nested)) => {
            let mut bytes = Vec::new();
            nested.write_package(&mut bytes)?;
            jar.start_file(entry_name(node.path()), options)
                .map_err(io::Error::other)?;
            jar.write_all(&bytes)?;
        }
    }

    Ok(())
}

/// Read every file entry of a jar into a tree of resource leaves.
///
/// Entries whose names would escape the archive root are skipped.
pub fn read_jar<R: Read + Seek>(input: R) -> io::Result<Node> {
    let mut jar = ZipArchive::new(input).map_err(io::Error::other)?;
    let mut root = Node::directory(ROOT_PATH);

    for index in 0..jar.len() {
        let mut entry = jar.by_index(index).map_err(io::Error::other)?;
        if entry.is_dir() {
            continue;
        }
        if entry.enclosed_name().is_none() {
            tracing::warn!(entry = entry.name(), "Skipping jar entry outside the archive root");
            continue;
        }

        let path = entry.name().to_string();
        let mut bytes = Vec::new();
        entry.read_to_end(&mut bytes)?;
        root.insert(&path, Asset::Resource(Source::Bytes(bytes)));
    }

    Ok(root)
}

/// Archive path without the leading `/`
fn entry_name(path: &str) -> String {
    path.trim_start_matches(PATH_DELIMITER).to_string()
}

fn class_entry_name(class: &ClassAsset) -> String {
    format!(
        "{}.{}",
        class
            .qualified_name()
            .replace(CLASS_NAME_DELIMITER, &PATH_DELIMITER.to_string()),
        CLASS_EXTENSION
    )
}
