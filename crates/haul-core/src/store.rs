//! JSON file store for scraped orders

use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::models::Order;

/// File name used when no path is configured
pub const DEFAULT_ORDERS_FILE: &str = "orders.json";

/// Orders persisted as a JSON array
#[derive(Debug, Clone)]
pub struct OrderStore {
    path: PathBuf,
}

impl OrderStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Load all stored orders. A missing or blank file holds no orders.
    pub fn load(&self) -> Result<Vec<Order>> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No order file at {}", self.path.display());
                return Ok(Vec::new());
            }
            Err(e) => return Err(e.into()),
        };
        if content.trim().is_empty() {
            return Ok(Vec::new());
        }

        let orders: Vec<Order> = serde_json::from_str(&content)?;
        debug!("Loaded {} orders from {}", orders.len(), self.path.display());
        Ok(orders)
    }

    /// Replace the stored orders
    ///
    /// Writes to a temporary file next to the target and renames it, so a
    /// crash never leaves a truncated store behind.
    pub fn save(&self, orders: &[Order]) -> Result<()> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir)?;

        let mut tmp = NamedTempFile::new_in(&dir)?;
        {
            let mut writer = BufWriter::new(tmp.as_file_mut());
            serde_json::to_writer(&mut writer, orders)?;
            writer.flush()?;
        }
        tmp.persist(&self.path).map_err(|e| Error::Io(e.error))?;

        info!("Saved {} orders to {}", orders.len(), self.path.display());
        Ok(())
    }

    /// Delete the store. Returns whether a file was removed.
    pub fn remove(&self) -> Result<bool> {
        match fs::remove_file(&self.path) {
            Ok(()) => {
                info!("Removed {}", self.path.display());
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

impl Default for OrderStore {
    fn default() -> Self {
        Self::new(DEFAULT_ORDERS_FILE)
    }
}
