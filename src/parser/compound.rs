//! OLE compound document (Revit container) access.
//!
//! Only container-level metadata is read: the stream directory and the
//! `\x05SummaryInformation` property set. Element data inside Revit
//! streams is not decoded.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;

use crate::error::ParseError;

/// First eight bytes of every compound document.
pub const SIGNATURE: [u8; 8] = [0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1];

pub const SUMMARY_STREAM: &str = "\u{5}SummaryInformation";

/// Container-level metadata recoverable without a vendor API.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ContainerMetadata {
    pub title: Option<String>,
    pub subject: Option<String>,
    pub author: Option<String>,
    pub last_author: Option<String>,
    pub application: Option<String>,
    pub created: Option<DateTime<Utc>>,
    pub modified: Option<DateTime<Utc>>,
    pub stream_count: usize,
}

/// Access to compound document containers.
pub trait ContainerBackend: Send + Sync {
    /// Cheap signature check; never fails.
    fn is_valid_container(&self, path: &Path) -> bool {
        has_signature(path).unwrap_or(false)
    }

    fn metadata(&self, path: &Path) -> Result<ContainerMetadata, ParseError>;
}

/// Backend compiled into this build, if any.
#[must_use]
pub fn default_backend() -> Option<Arc<dyn ContainerBackend>> {
    #[cfg(feature = "compound-doc")]
    {
        Some(Arc::new(CfbBackend))
    }
    #[cfg(not(feature = "compound-doc"))]
    {
        None
    }
}

pub fn has_signature(path: &Path) -> std::io::Result<bool> {
    let mut header = [0u8; 8];
    let mut file = File::open(path)?;
    match file.read_exact(&mut header) {
        Ok(()) => Ok(header == SIGNATURE),
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => Ok(false),
        Err(e) => Err(e),
    }
}

#[cfg(feature = "compound-doc")]
pub use self::cfb_backend::CfbBackend;

#[cfg(feature = "compound-doc")]
mod cfb_backend {
    use std::io::Read;
    use std::path::Path;

    use super::{parse_summary, ContainerBackend, ContainerMetadata, SUMMARY_STREAM};
    use crate::error::ParseError;

    /// Reads containers with the `cfb` crate.
    #[derive(Debug, Default, Clone, Copy)]
    pub struct CfbBackend;

    impl ContainerBackend for CfbBackend {
        fn metadata(&self, path: &Path) -> Result<ContainerMetadata, ParseError> {
            let invalid = |e: std::io::Error| ParseError::InvalidContainer {
                path: path.to_path_buf(),
                message: e.to_string(),
            };

            let mut container = cfb::open(path).map_err(invalid)?;
            let stream_count = container.walk().filter(cfb::Entry::is_stream).count();

            let summary_path = format!("/{SUMMARY_STREAM}");
            let mut metadata = if container.is_stream(&summary_path) {
                let mut buf = Vec::new();
                container
                    .open_stream(&summary_path)
                    .and_then(|mut stream| stream.read_to_end(&mut buf))
                    .map_err(invalid)?;
                parse_summary(&buf).unwrap_or_default()
            } else {
                ContainerMetadata::default()
            };

            metadata.stream_count = stream_count;
            Ok(metadata)
        }
    }
}

const PID_TITLE: u32 = 0x02;
const PID_SUBJECT: u32 = 0x03;
const PID_AUTHOR: u32 = 0x04;
const PID_LAST_AUTHOR: u32 = 0x08;
const PID_CREATE_TIME: u32 = 0x0C;
const PID_LAST_SAVE_TIME: u32 = 0x0D;
const PID_APP_NAME: u32 = 0x12;

const VT_LPSTR: u32 = 0x1E;
const VT_LPWSTR: u32 = 0x1F;
const VT_FILETIME: u32 = 0x40;

/// Seconds between 1601-01-01 and the Unix epoch.
const FILETIME_EPOCH_OFFSET: i64 = 11_644_473_600;

enum SummaryValue {
    Text(String),
    Time(DateTime<Utc>),
}

/// Decode the first section of a SummaryInformation property set.
/// Returns `None` if the stream is not a property set at all; unknown or
/// malformed properties are skipped.
pub fn parse_summary(bytes: &[u8]) -> Option<ContainerMetadata> {
    if read_u16(bytes, 0)? != 0xFFFE || read_u32(bytes, 24)? == 0 {
        return None;
    }

    // Section list starts at 28: 16-byte FMTID then a u32 offset.
    let section = read_u32(bytes, 44)? as usize;
    let count = read_u32(bytes, section + 4)?.min(1024) as usize;

    let mut metadata = ContainerMetadata::default();
    for i in 0..count {
        let entry = section + 8 + i * 8;
        let (Some(id), Some(offset)) = (read_u32(bytes, entry), read_u32(bytes, entry + 4)) else {
            break;
        };

        let Some(value) = read_value(bytes, section + offset as usize) else {
            continue;
        };

        match (id, value) {
            (PID_TITLE, SummaryValue::Text(s)) => metadata.title = Some(s),
            (PID_SUBJECT, SummaryValue::Text(s)) => metadata.subject = Some(s),
            (PID_AUTHOR, SummaryValue::Text(s)) => metadata.author = Some(s),
            (PID_LAST_AUTHOR, SummaryValue::Text(s)) => metadata.last_author = Some(s),
            (PID_APP_NAME, SummaryValue::Text(s)) => metadata.application = Some(s),
            (PID_CREATE_TIME, SummaryValue::Time(t)) => metadata.created = Some(t),
            (PID_LAST_SAVE_TIME, SummaryValue::Time(t)) => metadata.modified = Some(t),
            _ => {}
        }
    }

    Some(metadata)
}

fn read_value(bytes: &[u8], at: usize) -> Option<SummaryValue> {
    match read_u32(bytes, at)? {
        VT_LPSTR => {
            let len = read_u32(bytes, at + 4)? as usize;
            let raw = bytes.get(at + 8..at + 8 + len)?;
            let end = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
            non_empty(String::from_utf8_lossy(&raw[..end]).into_owned())
        }
        VT_LPWSTR => {
            let chars = read_u32(bytes, at + 4)? as usize;
            let raw = bytes.get(at + 8..at + 8 + chars * 2)?;
            let units: Vec<u16> = raw
                .chunks_exact(2)
                .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
                .take_while(|&unit| unit != 0)
                .collect();
            non_empty(String::from_utf16_lossy(&units))
        }
        VT_FILETIME => {
            let low = u64::from(read_u32(bytes, at + 4)?);
            let high = u64::from(read_u32(bytes, at + 8)?);
            filetime_to_utc((high << 32) | low).map(SummaryValue::Time)
        }
        _ => None,
    }
}

fn non_empty(s: String) -> Option<SummaryValue> {
    let trimmed = s.trim();
    (!trimmed.is_empty()).then(|| SummaryValue::Text(trimmed.to_string()))
}

/// FILETIME counts 100ns ticks since 1601-01-01. Zero means unset.
fn filetime_to_utc(ticks: u64) -> Option<DateTime<Utc>> {
    if ticks == 0 {
        return None;
    }
    let secs = i64::try_from(ticks / 10_000_000).ok()? - FILETIME_EPOCH_OFFSET;
    let nanos = ((ticks % 10_000_000) * 100) as u32;
    DateTime::from_timestamp(secs, nanos)
}

fn read_u16(bytes: &[u8], at: usize) -> Option<u16> {
    let raw = bytes.get(at..at + 2)?;
    Some(u16::from_le_bytes([raw[0], raw[1]]))
}

fn read_u32(bytes: &[u8], at: usize) -> Option<u32> {
    let raw = bytes.get(at..at + 4)?;
    Some(u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]))
}
