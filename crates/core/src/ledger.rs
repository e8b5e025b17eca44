use crate::{DocumentRecord, IngestError};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

pub fn digest_text(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[derive(Debug, Clone)]
pub struct ChangeLedger {
    path: PathBuf,
    entries: BTreeMap<String, String>,
}

impl ChangeLedger {
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, IngestError> {
        let path = path.into();
        let entries = match fs::read(&path) {
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(error) => return Err(error.into()),
        };

        Ok(Self { path, entries })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&str> {
        self.entries.get(id).map(String::as_str)
    }

    pub fn detect_changes(&mut self, records: &[DocumentRecord]) -> Vec<DocumentRecord> {
        let mut changed = Vec::new();

        for record in records {
            let digest = digest_text(&record.text);
            if self.entries.get(&record.id) == Some(&digest) {
                continue;
            }
            self.entries.insert(record.id.clone(), digest);
            changed.push(record.clone());
        }

        debug!(
            total = records.len(),
            changed = changed.len(),
            "change detection finished"
        );
        changed
    }

    pub fn save(&self) -> Result<(), IngestError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let mut staging = self.path.clone().into_os_string();
        staging.push(".tmp");
        let staging = PathBuf::from(staging);

        {
            let mut file = fs::File::create(&staging)?;
            serde_json::to_writer_pretty(&mut file, &self.entries)?;
            file.write_all(b"\n")?;
            file.sync_all()?;
        }
        fs::rename(&staging, &self.path)?;
        Ok(())
    }
}

pub fn filter_changed(
    records: &[DocumentRecord],
    ledger_path: &Path,
) -> Result<Vec<DocumentRecord>, IngestError> {
    let mut ledger = ChangeLedger::load(ledger_path)?;
    let changed = ledger.detect_changes(records);
    ledger.save()?;
    Ok(changed)
}
