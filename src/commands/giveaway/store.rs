// Durable representation of the giveaways state.
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use tempfile::NamedTempFile;
use tracing::{info, warn};

use crate::commands::giveaway::models::StoreRoot;
use crate::error::Result;

pub trait GiveawayStore: Send + Sync {
    // Returns the persisted state, or an empty one when nothing usable
    // was stored before.
    fn load(&self) -> StoreRoot;

    // Writes the full state. A failed write never leaves a partial file.
    fn save(&self, root: &StoreRoot) -> Result<()>;
}

#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        JsonFileStore {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn directory(&self) -> PathBuf {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        }
    }

    fn serialize(root: &StoreRoot) -> Result<Vec<u8>> {
        let mut buffer = Vec::new();
        let formatter = PrettyFormatter::with_indent(b"    ");
        let mut serializer = serde_json::Serializer::with_formatter(&mut buffer, formatter);
        root.serialize(&mut serializer)?;
        buffer.push(b'\n');
        Ok(buffer)
    }
}

impl GiveawayStore for JsonFileStore {
    fn load(&self) -> StoreRoot {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                info!(
                    "No saved giveaways found at {}, starting with an empty state",
                    self.path.display()
                );
                return StoreRoot::default();
            }
            Err(err) => {
                warn!(
                    "Can't read saved giveaways from {}: {}. Starting with an empty state",
                    self.path.display(),
                    err
                );
                return StoreRoot::default();
            }
        };

        match serde_json::from_str::<StoreRoot>(&content) {
            Ok(root) => {
                info!(
                    "Loaded {} active giveaway(s) from {}",
                    root.giveaways.len(),
                    self.path.display()
                );
                root
            }
            Err(err) => {
                warn!(
                    "Saved giveaways at {} are corrupted: {}. Starting with an empty state",
                    self.path.display(),
                    err
                );
                StoreRoot::default()
            }
        }
    }

    fn save(&self, root: &StoreRoot) -> Result<()> {
        let directory = self.directory();
        fs::create_dir_all(&directory)?;

        // Written next to the target so the final rename stays on one filesystem.
        let mut file = NamedTempFile::new_in(&directory)?;
        file.write_all(&Self::serialize(root)?)?;
        file.as_file().sync_all()?;
        file.persist(&self.path)?;
        Ok(())
    }
}
