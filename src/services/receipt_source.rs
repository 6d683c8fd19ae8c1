use crate::{error::AcquireError, models::iap::ReceiptLocation};
use async_trait::async_trait;
use std::{io::ErrorKind, path::PathBuf, sync::Arc};
use tracing::{debug, info};

/// Produces the receipt blob for one validation call
///
/// Implementations must report [`AcquireError::NoReceipt`] when nothing is
/// present, including after a requested refresh came back empty.
#[async_trait]
pub trait ReceiptSource: Send + Sync {
    async fn fetch(&self, refresh_requested: bool) -> Result<ReceiptLocation, AcquireError>;
}

/// Platform side effect that asks the store to re-issue the local receipt.
/// May suspend for a long time (store login prompt).
#[async_trait]
pub trait ReceiptRefresher: Send + Sync {
    async fn refresh(&self) -> Result<(), AcquireError>;
}

/// Receipt stored as a file on disk, e.g. the app bundle's `appStoreReceipt`
pub struct FileReceiptSource {
    path: PathBuf,
    refresher: Option<Arc<dyn ReceiptRefresher>>,
}

impl FileReceiptSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            refresher: None,
        }
    }

    pub fn with_refresher(mut self, refresher: Arc<dyn ReceiptRefresher>) -> Self {
        self.refresher = Some(refresher);
        self
    }

    async fn present(&self) -> Result<bool, AcquireError> {
        match tokio::fs::metadata(&self.path).await {
            Ok(meta) => Ok(meta.is_file() && meta.len() > 0),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(AcquireError::Io(e)),
        }
    }
}

#[async_trait]
impl ReceiptSource for FileReceiptSource {
    async fn fetch(&self, refresh_requested: bool) -> Result<ReceiptLocation, AcquireError> {
        if self.present().await? {
            return Ok(ReceiptLocation::Path(self.path.clone()));
        }

        match (&self.refresher, refresh_requested) {
            (Some(refresher), true) => {
                info!(path = %self.path.display(), "Receipt missing, requesting refresh");
                refresher.refresh().await?;

                if self.present().await? {
                    Ok(ReceiptLocation::Path(self.path.clone()))
                } else {
                    Err(AcquireError::NoReceipt)
                }
            }
            _ => {
                debug!(path = %self.path.display(), "No receipt file");
                Err(AcquireError::NoReceipt)
            }
        }
    }
}

/// Receipt bytes already in memory, e.g. uploaded by a client
pub struct InlineReceiptSource {
    bytes: Vec<u8>,
}

impl InlineReceiptSource {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }
}

#[async_trait]
impl ReceiptSource for InlineReceiptSource {
    async fn fetch(&self, _refresh_requested: bool) -> Result<ReceiptLocation, AcquireError> {
        if self.bytes.is_empty() {
            return Err(AcquireError::NoReceipt);
        }
        Ok(ReceiptLocation::Bytes(self.bytes.clone()))
    }
}

/// Resolve a location to the raw receipt bytes
pub async fn load_receipt(location: ReceiptLocation) -> Result<Vec<u8>, AcquireError> {
    let bytes = match location {
        ReceiptLocation::Bytes(bytes) => bytes,
        ReceiptLocation::Path(path) => match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Err(AcquireError::NoReceipt),
            Err(e) => return Err(AcquireError::Io(e)),
        },
    };

    if bytes.is_empty() {
        return Err(AcquireError::NoReceipt);
    }
    Ok(bytes)
}
