use std::{
    collections::HashSet,
    fs,
    path::{Path, PathBuf},
    sync::Mutex,
};

use anyhow::{Context, Result};
use async_trait::async_trait;
use indexmap::IndexMap;
use tokio::sync::watch;
use tracing::error;

use super::{NoticeSender, RecordStore};
use crate::record::{is_blank, next_record_id, Record};

/// Collection file name inside the data directory.
const STORE_FILE: &str = "records.json";

/// Backend holding the whole collection as one JSON array on disk. I/O is
/// synchronous; every mutation rewrites the file through a tmp + rename and
/// publishes the new list on the change feed before returning.
pub struct LocalStore {
    path: PathBuf,
    records: Mutex<Vec<Record>>,
    feed: watch::Sender<Vec<Record>>,
}

impl LocalStore {
    /// Load (or start) the collection under `data_dir`, creating the
    /// directory if needed. A corrupt file is reported and treated as empty
    /// rather than aborting the session.
    pub fn open(data_dir: impl AsRef<Path>, notices: NoticeSender) -> Result<Self> {
        let data_dir = data_dir.as_ref();
        fs::create_dir_all(data_dir)
            .with_context(|| format!("creating data directory {:?}", data_dir))?;
        let path = data_dir.join(STORE_FILE);

        let records: Vec<Record> = if path.exists() {
            let text =
                fs::read_to_string(&path).with_context(|| format!("reading {:?}", path))?;
            match serde_json::from_str(&text) {
                Ok(records) => records,
                Err(err) => {
                    error!("corrupt store {:?}: {}", path, err);
                    let _ = notices.send("Saved data could not be read; starting empty.".into());
                    Vec::new()
                }
            }
        } else {
            Vec::new()
        };

        let (feed, _) = watch::channel(records.clone());
        Ok(Self {
            path,
            records: Mutex::new(records),
            feed,
        })
    }

    /// Serialize to a tmp file, then rename over the live one, so a failed
    /// write can never leave a half-written collection behind.
    fn persist(&self, records: &[Record]) -> Result<()> {
        let tmp = self.path.with_extension("json.tmp");
        let text =
            serde_json::to_string_pretty(records).context("serializing record collection")?;
        fs::write(&tmp, text).with_context(|| format!("writing {:?}", tmp))?;
        fs::rename(&tmp, &self.path)
            .with_context(|| format!("renaming {:?} -> {:?}", tmp, self.path))?;
        Ok(())
    }

    fn commit(&self, records: Vec<Record>) -> Result<()> {
        self.persist(&records)?;
        *self.records.lock().unwrap() = records.clone();
        self.feed.send_replace(records);
        Ok(())
    }

    fn snapshot(&self) -> Vec<Record> {
        self.records.lock().unwrap().clone()
    }
}

#[async_trait]
impl RecordStore for LocalStore {
    async fn create(&self, fields: IndexMap<String, String>) -> Result<Option<Record>> {
        if is_blank(&fields) {
            return Ok(None);
        }
        let mut records = self.snapshot();
        let taken: HashSet<String> = records.iter().map(|r| r.id.clone()).collect();
        let record = Record::created(next_record_id(&taken), fields);
        records.push(record.clone());
        self.commit(records)?;
        Ok(Some(record))
    }

    async fn update(&self, id: &str, fields: IndexMap<String, String>) -> Result<bool> {
        let mut records = self.snapshot();
        match records.iter_mut().find(|r| r.id == id) {
            Some(record) => record.replace_fields(fields),
            None => return Ok(false),
        }
        self.commit(records)?;
        Ok(true)
    }

    async fn delete(&self, id: &str) -> Result<()> {
        let mut records = self.snapshot();
        let before = records.len();
        records.retain(|r| r.id != id);
        if records.len() == before {
            // unknown id: nothing to rewrite
            return Ok(());
        }
        self.commit(records)
    }

    async fn delete_all(&self) -> Result<()> {
        self.commit(Vec::new())
    }

    async fn append_imported(&self, imported: Vec<Record>) -> Result<usize> {
        let count = imported.len();
        if count == 0 {
            return Ok(0);
        }
        let mut records = self.snapshot();
        records.extend(imported);
        // single atomic rewrite: an import either lands whole or not at all
        self.commit(records)?;
        Ok(count)
    }

    async fn list(&self) -> Result<Vec<Record>> {
        Ok(self.snapshot())
    }

    fn watch(&self) -> watch::Receiver<Vec<Record>> {
        self.feed.subscribe()
    }
}
