use std::io::Read;

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use tar::{Builder, Header};

use super::{ArchiveCodec, ArchiveEntry};
use crate::error::{Error, Result};
use crate::item::ArchiveFormat;

pub struct TarGzCodec;

impl ArchiveCodec for TarGzCodec {
    fn format(&self) -> ArchiveFormat {
        ArchiveFormat::TarGz
    }

    fn pack(&self, sources: &[ArchiveEntry]) -> Result<Vec<u8>> {
        let encoder = GzEncoder::new(Vec::new(), Compression::default());
        let mut builder = Builder::new(encoder);
        for (name, content, mode) in sources {
            let mut header = Header::new_gnu();
            header.set_size(content.len() as u64);
            header.set_mode(*mode);
            header.set_cksum();
            builder
                .append_data(&mut header, name, content.as_slice())
                .map_err(|e| Error::Filesystem {
                    op_id: "archive".into(),
                    path: name.into(),
                    source: e,
                })?;
        }
        let encoder = builder.into_inner().map_err(|e| Error::Filesystem {
            op_id: "archive".into(),
            path: "<tar.gz>".into(),
            source: e,
        })?;
        encoder.finish().map_err(|e| Error::Filesystem {
            op_id: "archive".into(),
            path: "<tar.gz>".into(),
            source: e,
        })
    }

    fn list_entries(&self, archive: &[u8]) -> Result<Vec<String>> {
        let decoder = GzDecoder::new(archive);
        let mut tar = tar::Archive::new(decoder);
        let mut names = Vec::new();
        for entry in tar.entries().map_err(|e| io_err(e))? {
            let entry = entry.map_err(|e| io_err(e))?;
            names.push(entry.path().map_err(|e| io_err(e))?.to_string_lossy().into_owned());
        }
        Ok(names)
    }

    fn unpack(&self, archive: &[u8], patterns: &[String]) -> Result<Vec<ArchiveEntry>> {
        let decoder = GzDecoder::new(archive);
        let mut tar = tar::Archive::new(decoder);
        let mut out = Vec::new();
        for entry in tar.entries().map_err(|e| io_err(e))? {
            let mut entry = entry.map_err(|e| io_err(e))?;
            let name = entry.path().map_err(|e| io_err(e))?.to_string_lossy().into_owned();
            if !super::matches_any(patterns, &name) {
                continue;
            }
            let mode = entry.header().mode().unwrap_or(crate::item::DEFAULT_FILE_MODE);
            let mut content = Vec::new();
            entry.read_to_end(&mut content).map_err(|e| io_err(e))?;
            out.push((name, content, mode));
        }
        Ok(out)
    }
}

fn io_err(e: std::io::Error) -> Error {
    Error::Filesystem {
        op_id: "archive".into(),
        path: "<tar.gz>".into(),
        source: e,
    }
}
