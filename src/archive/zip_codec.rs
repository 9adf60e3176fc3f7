use std::io::{Cursor, Read, Write};

use zip::write::SimpleFileOptions;
use zip::ZipWriter;

use super::{ArchiveCodec, ArchiveEntry};
use crate::error::{Error, Result};
use crate::item::ArchiveFormat;

pub struct ZipCodec;

impl ArchiveCodec for ZipCodec {
    fn format(&self) -> ArchiveFormat {
        ArchiveFormat::Zip
    }

    fn pack(&self, sources: &[ArchiveEntry]) -> Result<Vec<u8>> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        for (name, content, mode) in sources {
            let options = SimpleFileOptions::default().unix_permissions(*mode);
            writer.start_file(name, options).map_err(|e| zip_err(name, e))?;
            writer.write_all(content).map_err(|e| io_err(name, e))?;
        }
        let cursor = writer.finish().map_err(|e| zip_err("<zip>", e))?;
        Ok(cursor.into_inner())
    }

    fn list_entries(&self, archive: &[u8]) -> Result<Vec<String>> {
        let mut reader = zip::ZipArchive::new(Cursor::new(archive)).map_err(|e| zip_err("<zip>", e))?;
        let mut names = Vec::with_capacity(reader.len());
        for i in 0..reader.len() {
            let file = reader.by_index(i).map_err(|e| zip_err("<zip>", e))?;
            names.push(file.name().to_string());
        }
        Ok(names)
    }

    fn unpack(&self, archive: &[u8], patterns: &[String]) -> Result<Vec<ArchiveEntry>> {
        let mut reader = zip::ZipArchive::new(Cursor::new(archive)).map_err(|e| zip_err("<zip>", e))?;
        let mut out = Vec::new();
        for i in 0..reader.len() {
            let mut file = reader.by_index(i).map_err(|e| zip_err("<zip>", e))?;
            if file.is_dir() {
                continue;
            }
            let name = file.name().to_string();
            if !super::matches_any(patterns, &name) {
                continue;
            }
            let mode = file.unix_mode().unwrap_or(crate::item::DEFAULT_FILE_MODE);
            let mut content = Vec::new();
            file.read_to_end(&mut content).map_err(|e| io_err(&name, e))?;
            out.push((name, content, mode));
        }
        Ok(out)
    }
}

fn io_err(name: &str, e: std::io::Error) -> Error {
    Error::Filesystem {
        op_id: "archive".into(),
        path: name.into(),
        source: e,
    }
}

fn zip_err(name: &str, e: zip::result::ZipError) -> Error {
    Error::Filesystem {
        op_id: "archive".into(),
        path: name.into(),
        source: std::io::Error::other(e),
    }
}
