//! Persisted `"bucket,key"` locators.
//!
//! Asset records keep the storage location of their video in a single text
//! field. Bucket names cannot contain commas, so the first comma separates
//! the two halves and anything after it belongs to the key.

use std::fmt;

/// Where an uploaded object lives.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StorageLocator {
    pub bucket: String,
    pub key: String,
}

impl StorageLocator {
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
        }
    }

    /// Persisted form: `bucket,key`.
    pub fn encode(&self) -> String {
        encode_locator(&self.bucket, &self.key)
    }
}

impl fmt::Display for StorageLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.bucket, self.key)
    }
}

/// Result of decoding a persisted locator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteObject {
    Stored(StorageLocator),
    /// The field is empty or does not name a bucket and key.
    NoRemoteObject,
}

impl RemoteObject {
    pub fn locator(&self) -> Option<&StorageLocator> {
        match self {
            RemoteObject::Stored(locator) => Some(locator),
            RemoteObject::NoRemoteObject => None,
        }
    }

    pub fn is_stored(&self) -> bool {
        matches!(self, RemoteObject::Stored(_))
    }
}

impl From<Option<&str>> for RemoteObject {
    fn from(raw: Option<&str>) -> Self {
        raw.map(decode_locator).unwrap_or(RemoteObject::NoRemoteObject)
    }
}

pub fn encode_locator(bucket: &str, key: &str) -> String {
    format!("{},{}", bucket, key)
}

/// Decode a persisted locator. Never yields a half-filled locator.
pub fn decode_locator(raw: &str) -> RemoteObject {
    match raw.split_once(',') {
        Some((bucket, key)) if !bucket.is_empty() && !key.is_empty() => {
            RemoteObject::Stored(StorageLocator::new(bucket, key))
        }
        _ => RemoteObject::NoRemoteObject,
    }
}
