use serde::Serialize;
use std::io::Cursor;

#[derive(Serialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum PayloadKind {
    TestResults,
    TradefedStdout,
    TradefedLogcat,
}

impl PayloadKind {
    pub const ALL: [PayloadKind; 3] = [
        PayloadKind::TestResults,
        PayloadKind::TradefedStdout,
        PayloadKind::TradefedLogcat,
    ];

    /// Archive member suffix the payload is recognized by.
    pub fn member_suffix(&self) -> &'static str {
        match self {
            PayloadKind::TestResults => "test_result.xml",
            PayloadKind::TradefedStdout => "stdout.txt",
            PayloadKind::TradefedLogcat => "logcat.txt",
        }
    }

    pub fn attachment_name(&self) -> &'static str {
        match self {
            PayloadKind::TestResults => "test_result.xml",
            PayloadKind::TradefedStdout => "tradefed_stdout.txt",
            PayloadKind::TradefedLogcat => "tradefed_logcat.txt",
        }
    }

    pub fn from_member_name(name: &str) -> Option<PayloadKind> {
        Self::ALL
            .into_iter()
            .find(|kind| name.ends_with(kind.member_suffix()))
    }
}

/// Resource bounds for downloading and unpacking one results archive.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ArchiveLimits {
    /// Compressed bytes accepted from the download.
    pub max_archive_bytes: u64,
    /// Decompressed bytes read from the tar stream.
    pub max_decoded_bytes: u64,
    /// Bytes kept for a single payload.
    pub max_payload_bytes: u64,
}

impl Default for ArchiveLimits {
    fn default() -> Self {
        Self {
            max_archive_bytes: 256_u64 * 1024 * 1024,
            max_decoded_bytes: 1024_u64 * 1024 * 1024,
            max_payload_bytes: 256_u64 * 1024 * 1024,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExtractedPayload {
    pub contents: Vec<u8>,
    pub length: usize,
}

impl ExtractedPayload {
    pub fn new(contents: Vec<u8>) -> Self {
        let length = contents.len();
        Self { contents, length }
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    pub fn reader(&self) -> Cursor<&[u8]> {
        Cursor::new(self.contents.as_slice())
    }
}

/// The three payloads a results archive may carry. Any subset may be absent.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ResultFiles {
    pub test_results: Option<ExtractedPayload>,
    pub tradefed_stdout: Option<ExtractedPayload>,
    pub tradefed_logcat: Option<ExtractedPayload>,
}

impl ResultFiles {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn get(&self, kind: PayloadKind) -> Option<&ExtractedPayload> {
        match kind {
            PayloadKind::TestResults => self.test_results.as_ref(),
            PayloadKind::TradefedStdout => self.tradefed_stdout.as_ref(),
            PayloadKind::TradefedLogcat => self.tradefed_logcat.as_ref(),
        }
    }

    pub fn set(&mut self, kind: PayloadKind, payload: ExtractedPayload) {
        let slot = match kind {
            PayloadKind::TestResults => &mut self.test_results,
            PayloadKind::TradefedStdout => &mut self.tradefed_stdout,
            PayloadKind::TradefedLogcat => &mut self.tradefed_logcat,
        };
        *slot = Some(payload);
    }

    /// Absent and zero-length payloads both mean "nothing to use".
    pub fn non_empty(&self, kind: PayloadKind) -> Option<&ExtractedPayload> {
        self.get(kind).filter(|payload| !payload.is_empty())
    }

    pub fn is_empty(&self) -> bool {
        PayloadKind::ALL.iter().all(|kind| self.get(*kind).is_none())
    }
}
