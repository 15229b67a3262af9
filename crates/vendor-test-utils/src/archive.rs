//! Release archive builders.

use std::io::{Cursor, Write};

use zip::write::SimpleFileOptions;

/// Build an in-memory zip holding `entries` as (member path, content).
pub fn zip_archive<C: AsRef<[u8]>>(entries: &[(&str, C)]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    for (name, content) in entries {
        writer
            .start_file(*name, SimpleFileOptions::default())
            .expect("zip_archive: start entry");
        writer
            .write_all(content.as_ref())
            .expect("zip_archive: write entry");
    }
    writer
        .finish()
        .expect("zip_archive: finish")
        .into_inner()
}
