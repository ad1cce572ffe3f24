// SPDX-FileCopyrightText: 2025 Aaron Dewes <aaron@nirvati.org>
//
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Object storage for uploaded resumes.

use std::{
    path::{Component, Path, PathBuf},
    time::Duration,
};

use dashmap::DashMap;
use rand::{Rng, distributions::Alphanumeric};
use thiserror::Error;

pub const RESUME_FOLDER: &str = "student-resumes";

#[derive(Error, Debug)]
pub enum UploadError {
    #[error("Invalid object path: {0}")]
    InvalidPath(String),
    #[error("Object not found: {0}")]
    NotFound(String),
    #[error("Object storage I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Upload did not finish within {0:?}")]
    TimedOut(Duration),
}

#[async_trait::async_trait]
pub trait ObjectStore: Send + Sync {
    /// Stores `bytes` under `suggested_path` and returns the path it was
    /// stored at.
    async fn store(&self, bytes: Vec<u8>, suggested_path: &str) -> Result<String, UploadError>;
    async fn retrieval_url(&self, path: &str) -> Result<String, UploadError>;
    async fn delete(&self, path: &str) -> Result<(), UploadError>;
}

/// Builds a collision-resistant path for an uploaded file, keeping the
/// original extension.
pub fn unique_object_path(folder: &str, file_name: &str) -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(12)
        .map(char::from)
        .collect::<String>()
        .to_lowercase();
    let timestamp = chrono::Utc::now().timestamp_millis();
    match Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .filter(|e| !e.is_empty() && e.chars().all(|c| c.is_ascii_alphanumeric()))
    {
        Some(ext) => format!("{folder}/{timestamp}-{suffix}.{}", ext.to_ascii_lowercase()),
        None => format!("{folder}/{timestamp}-{suffix}"),
    }
}

/// Stores an object, giving up after `limit`.
pub async fn store_with_timeout(
    store: &dyn ObjectStore,
    bytes: Vec<u8>,
    path: &str,
    limit: Duration,
) -> Result<String, UploadError> {
    tokio::time::timeout(limit, store.store(bytes, path))
        .await
        .map_err(|_| UploadError::TimedOut(limit))?
}

fn relative_path(path: &str) -> Result<PathBuf, UploadError> {
    let candidate = Path::new(path);
    if path.is_empty()
        || !candidate
            .components()
            .all(|c| matches!(c, Component::Normal(_)))
    {
        return Err(UploadError::InvalidPath(path.to_string()));
    }
    Ok(candidate.to_path_buf())
}

/// Stores objects as files below a root directory. Files are expected to be
/// served from `public_base_url` by a static file server.
pub struct FsObjectStore {
    root: PathBuf,
    public_base_url: String,
}

impl FsObjectStore {
    pub fn new(root: impl Into<PathBuf>, public_base_url: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            public_base_url: public_base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait::async_trait]
impl ObjectStore for FsObjectStore {
    async fn store(&self, bytes: Vec<u8>, suggested_path: &str) -> Result<String, UploadError> {
        let relative = relative_path(suggested_path)?;
        let target = self.root.join(&relative);
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&target, bytes).await?;
        tracing::debug!("Stored object at {}", target.display());
        Ok(suggested_path.to_string())
    }

    async fn retrieval_url(&self, path: &str) -> Result<String, UploadError> {
        let relative = relative_path(path)?;
        if !tokio::fs::try_exists(self.root.join(&relative)).await? {
            return Err(UploadError::NotFound(path.to_string()));
        }
        Ok(format!("{}/{}", self.public_base_url, path))
    }

    async fn delete(&self, path: &str) -> Result<(), UploadError> {
        let relative = relative_path(path)?;
        match tokio::fs::remove_file(self.root.join(relative)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(UploadError::NotFound(path.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[derive(Default)]
pub struct MemoryObjectStore {
    objects: DashMap<String, Vec<u8>>,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, path: &str) -> Option<Vec<u8>> {
        self.objects.get(path).map(|o| o.clone())
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

#[async_trait::async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn store(&self, bytes: Vec<u8>, suggested_path: &str) -> Result<String, UploadError> {
        relative_path(suggested_path)?;
        self.objects.insert(suggested_path.to_string(), bytes);
        Ok(suggested_path.to_string())
    }

    async fn retrieval_url(&self, path: &str) -> Result<String, UploadError> {
        if self.objects.contains_key(path) {
            Ok(format!("memory://{path}"))
        } else {
            Err(UploadError::NotFound(path.to_string()))
        }
    }

    async fn delete(&self, path: &str) -> Result<(), UploadError> {
        self.objects
            .remove(path)
            .map(|_| ())
            .ok_or_else(|| UploadError::NotFound(path.to_string()))
    }
}
