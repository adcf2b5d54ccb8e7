use crate::archive::model::{ArchiveLimits, ExtractedPayload, PayloadKind, ResultFiles};
use flate2::read::GzDecoder;
use std::io::{Cursor, Read};
use tracing::{debug, warn};
use xz2::read::XzDecoder;

const GZIP_MAGIC: &[u8] = &[0x1f, 0x8b];
const XZ_MAGIC: &[u8] = &[0xfd, 0x37, 0x7a, 0x58, 0x5a, 0x00];

/// Pull the recognized payloads out of a compressed tar archive.
///
/// Bytes that are not a gzip or xz stream, or that exceed
/// `max_archive_bytes`, yield an all-empty [`ResultFiles`]. The decoded
/// stream is cut at `max_decoded_bytes`; a member that fails to read midway
/// stops extraction but keeps what was already collected. A member larger
/// than `max_payload_bytes` leaves its slot untouched.
pub fn extract(bytes: &[u8], limits: &ArchiveLimits) -> ResultFiles {
    if bytes.len() as u64 > limits.max_archive_bytes {
        warn!("archive of {} bytes exceeds {} bytes", bytes.len(), limits.max_archive_bytes);
        return ResultFiles::empty();
    }
    let decoder: Box<dyn Read + '_> = if bytes.starts_with(GZIP_MAGIC) {
        Box::new(GzDecoder::new(Cursor::new(bytes)).take(limits.max_decoded_bytes))
    } else if bytes.starts_with(XZ_MAGIC) {
        Box::new(XzDecoder::new(Cursor::new(bytes)).take(limits.max_decoded_bytes))
    } else {
        debug!("{} bytes are not a compressed archive", bytes.len());
        return ResultFiles::empty();
    };

    let mut files = ResultFiles::empty();
    if let Err(err) = read_members(decoder, limits.max_payload_bytes, &mut files) {
        warn!("results archive is corrupt or truncated: {}", err);
    }
    files
}

fn read_members(decoder: Box<dyn Read + '_>, max_payload_bytes: u64, files: &mut ResultFiles) -> std::io::Result<()> {
    let mut archive = tar::Archive::new(decoder);
    for entry in archive.entries()? {
        let mut entry = entry?;
        if !entry.header().entry_type().is_file() {
            continue;
        }
        let name = entry.path()?.to_string_lossy().into_owned();
        let Some(kind) = PayloadKind::from_member_name(&name) else {
            continue;
        };
        let declared = entry.header().size()?;
        if declared > max_payload_bytes {
            warn!("skipping {}: {} bytes exceeds {} bytes", name, declared, max_payload_bytes);
            continue;
        }
        let mut contents = Vec::new();
        (&mut entry).take(max_payload_bytes + 1).read_to_end(&mut contents)?;
        if contents.len() as u64 > max_payload_bytes {
            warn!("skipping {}: content exceeds {} bytes", name, max_payload_bytes);
            continue;
        }
        if (contents.len() as u64) < declared {
            return Err(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                format!("{} ends after {} of {} bytes", name, contents.len(), declared),
            ));
        }
        debug!("extracted {} ({} bytes) as {:?}", name, contents.len(), kind);
        files.set(kind, ExtractedPayload::new(contents));
    }
    Ok(())
}
