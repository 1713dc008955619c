use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, Clone, Hash, Eq, PartialEq)]
#[serde(transparent)]
pub struct FileId(pub String);

impl FileId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl Default for FileId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<&str> for FileId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FileOffer {
    pub file_id: FileId,
    pub name: String,
    pub size: u64,
    pub chunk_size: u32,
    #[serde(default)]
    pub mime_type: Option<String>,
}

impl FileOffer {
    pub fn total_chunks(&self) -> u32 {
        if self.size == 0 || self.chunk_size == 0 {
            return 0;
        }
        self.size.div_ceil(u64::from(self.chunk_size)) as u32
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FileChunk {
    pub file_id: FileId,
    pub index: u32,
    #[serde(with = "base64_bytes")]
    pub bytes: Vec<u8>,
}

/// Acceptance (`accepted`) or final confirmation (`complete`) of a transfer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FileAck {
    pub file_id: FileId,
    #[serde(default)]
    pub accepted: bool,
    #[serde(default)]
    pub complete: bool,
}

/// Refusal of an offer, or abort notice for a running transfer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FileReject {
    pub file_id: FileId,
    pub reason: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum TransferStatus {
    Offered,
    Accepted,
    Rejected,
    InProgress,
    Complete,
    Aborted,
}

impl TransferStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Rejected | Self::Complete | Self::Aborted)
    }
}

mod base64_bytes {
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let text = String::deserialize(deserializer)?;
        STANDARD.decode(text).map_err(serde::de::Error::custom)
    }
}
