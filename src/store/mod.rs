pub mod local;
pub mod remote;

pub use local::LocalStore;
pub use remote::RemoteStore;

use anyhow::Result;
use async_trait::async_trait;
use indexmap::IndexMap;
use tokio::sync::{mpsc, watch};
use tracing::warn;

use crate::config::Config;
use crate::record::Record;

/// Transient, human-readable status lines for the user. Never structured,
/// never fatal; worst case the session continues with stale or empty data.
pub type NoticeSender = mpsc::UnboundedSender<String>;
pub type NoticeReceiver = mpsc::UnboundedReceiver<String>;

pub fn notice_channel() -> (NoticeSender, NoticeReceiver) {
    mpsc::unbounded_channel()
}

/// The persistence contract shared by the local and remote backends.
///
/// `watch` hands out the change feed: the store publishes the full record
/// list whenever it observes a mutation. The local backend publishes
/// synchronously; the remote backend publishes only once its poll sees a
/// write land, so the feed can lag a mutation by one round-trip. Dropping the
/// receiver is the unsubscribe.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Append a new record built from `fields`. Returns `None` without
    /// touching the collection when every value is blank or whitespace.
    async fn create(&self, fields: IndexMap<String, String>) -> Result<Option<Record>>;

    /// Replace the fields of the record with `id` wholesale. Returns whether
    /// a listed record matched; an unknown id changes nothing.
    async fn update(&self, id: &str, fields: IndexMap<String, String>) -> Result<bool>;

    /// Remove the record with `id`; unknown ids are a no-op.
    async fn delete(&self, id: &str) -> Result<()>;

    /// Remove every currently listed record. Individual failures are
    /// reported and skipped; records already removed stay removed.
    async fn delete_all(&self) -> Result<()>;

    /// Append records already stamped by the importer. Returns how many were
    /// accepted.
    async fn append_imported(&self, records: Vec<Record>) -> Result<usize>;

    /// Current record list, in insertion order.
    async fn list(&self) -> Result<Vec<Record>>;

    /// Subscribe to the record-list change feed.
    fn watch(&self) -> watch::Receiver<Vec<Record>>;
}

/// Open the configured backend. A remote configuration gets one reachability
/// fetch; if that fails, the session starts on the local backend instead. The
/// fallback happens only at startup; failures after this point stay on
/// whichever backend was chosen.
pub async fn open_store(config: &Config, notices: NoticeSender) -> Result<Box<dyn RecordStore>> {
    if let Some(remote) = &config.remote {
        match RemoteStore::connect(remote, config.poll_interval, notices.clone()).await {
            Ok(store) => return Ok(Box::new(store)),
            Err(err) => {
                warn!("remote store unavailable, falling back to local: {:#}", err);
                let _ = notices.send("Remote store unavailable; using local data.".to_string());
            }
        }
    }
    Ok(Box::new(LocalStore::open(&config.data_dir, notices)?))
}
