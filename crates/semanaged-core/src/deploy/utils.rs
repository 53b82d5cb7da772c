//! Utility functions for deployment
//!
//! This module contains filesystem helpers used by the materializer and the
//! packaged archive export.

use camino::Utf8Path;
use std::io::{self, Read, Write};

/// Size of the buffer bytes are streamed through
pub const COPY_BUFFER_SIZE: usize = 8192;

/// Stream `reader` into `writer` through a fixed-size buffer, then flush.
///
/// Returns the number of bytes copied.
pub fn copy_stream<R, W>(reader: &mut R, writer: &mut W) -> io::Result<u64>
where
    R: Read + ?Sized,
    W: Write + ?Sized,
{
    let mut buffer = [0u8; COPY_BUFFER_SIZE];
    let mut total = 0u64;

    loop {
        let n = match reader.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        writer.write_all(&buffer[..n])?;
        total += n as u64;
    }

    writer.flush()?;
    Ok(total)
}

/// Remove everything inside `dir`, keeping `dir` itself
pub fn clear_directory(dir: &Utf8Path) -> io::Result<()> {
    for entry in dir.read_dir_utf8()? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            std::fs::remove_dir_all(entry.path())?;
        } else {
            std::fs::remove_file(entry.path())?;
        }
    }
    Ok(())
}

/// Remove a file, or a directory and all its content
pub fn remove_path(path: &Utf8Path) -> io::Result<()> {
    if path.is_dir() {
        std::fs::remove_dir_all(path)
    } else {
        std::fs::remove_file(path)
    }
}
