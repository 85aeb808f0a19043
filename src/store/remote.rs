use std::{
    collections::HashSet,
    sync::{Arc, Mutex},
    time::Duration,
};

use anyhow::{Context, Result};
use async_trait::async_trait;
use indexmap::IndexMap;
use reqwest::Client;
use tokio::sync::watch;
use tracing::{debug, error};
use url::Url;

use super::{NoticeSender, RecordStore};
use crate::config::RemoteConfig;
use crate::record::{is_blank, next_record_id, Record};

/// Backend talking to a per-user document collection over HTTP: one JSON
/// document per record at `{endpoint}/apps/{app}/users/{user}/records/{id}`.
///
/// Single-record writes are fire-and-forget: the caller gets its record back
/// immediately, the request runs as a spawned task, and the published list
/// only changes once the poll task sees the write land, so the visible list
/// can lag a mutation by one round-trip. There is no cancellation of
/// in-flight writes and no request timeout; a stalled call reports nothing
/// until it resolves or rejects.
pub struct RemoteStore {
    shared: Arc<Shared>,
}

struct Shared {
    client: Client,
    collection: Url,
    /// Last list observed from the server; also feeds fresh-id allocation.
    cached: Mutex<Vec<Record>>,
    feed: watch::Sender<Vec<Record>>,
    notices: NoticeSender,
}

impl RemoteStore {
    /// Build the store and fetch the collection once to prove the remote is
    /// reachable; that fetch doubles as the initial list. A failure here is
    /// the caller's signal to fall back to local persistence.
    pub async fn connect(
        config: &RemoteConfig,
        poll_interval: Duration,
        notices: NoticeSender,
    ) -> Result<Self> {
        let collection = collection_url(config)?;
        let client = Client::new();

        let initial = fetch_records(&client, &collection)
            .await
            .with_context(|| format!("reaching remote collection {}", collection))?;

        let (feed, _) = watch::channel(initial.clone());
        let shared = Arc::new(Shared {
            client,
            collection,
            cached: Mutex::new(initial),
            feed,
            notices,
        });
        tokio::spawn(poll_loop(Arc::clone(&shared), poll_interval));
        Ok(Self { shared })
    }

    fn known_ids(&self) -> HashSet<String> {
        self.shared
            .cached
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.id.clone())
            .collect()
    }
}

/// `{endpoint}/apps/{app}/users/{user}/records/`, tolerating an endpoint
/// given without a trailing slash.
fn collection_url(config: &RemoteConfig) -> Result<Url> {
    let mut endpoint = config.endpoint.clone();
    if !endpoint.ends_with('/') {
        endpoint.push('/');
    }
    let base = Url::parse(&endpoint)
        .with_context(|| format!("invalid remote endpoint `{}`", config.endpoint))?;
    base.join(&format!(
        "apps/{}/users/{}/records/",
        config.app_id, config.user_id
    ))
    .context("building collection URL")
}

async fn fetch_records(client: &Client, collection: &Url) -> Result<Vec<Record>> {
    let resp = client
        .get(collection.clone())
        .send()
        .await
        .with_context(|| format!("requesting {}", collection))?
        .error_for_status()
        .context("listing records")?;
    resp.json::<Vec<Record>>()
        .await
        .context("decoding record list")
}

async fn put_record(client: &Client, collection: &Url, record: &Record) -> Result<()> {
    let url = collection.join(&record.id).context("building document URL")?;
    client
        .put(url)
        .json(record)
        .send()
        .await?
        .error_for_status()
        .with_context(|| format!("writing record {}", record.id))?;
    Ok(())
}

async fn delete_record(client: &Client, collection: &Url, id: &str) -> Result<()> {
    let url = collection.join(id).context("building document URL")?;
    client
        .delete(url)
        .send()
        .await?
        .error_for_status()
        .with_context(|| format!("deleting record {}", id))?;
    Ok(())
}

/// Fire-and-forget document write. The outcome lands on the notice channel
/// once the request resolves; list visibility arrives via the poll.
fn spawn_put(shared: Arc<Shared>, record: Record) {
    tokio::spawn(async move {
        match put_record(&shared.client, &shared.collection, &record).await {
            Ok(()) => {
                let _ = shared.notices.send("Saved.".to_string());
            }
            Err(err) => {
                error!("write {} failed: {:#}", record.id, err);
                let _ = shared.notices.send(format!("Could not save record: {}", err));
            }
        }
    });
}

fn spawn_delete(shared: Arc<Shared>, id: String) {
    tokio::spawn(async move {
        match delete_record(&shared.client, &shared.collection, &id).await {
            Ok(()) => {
                let _ = shared.notices.send("Deleted.".to_string());
            }
            Err(err) => {
                error!("delete {} failed: {:#}", id, err);
                let _ = shared.notices.send(format!("Could not delete record: {}", err));
            }
        }
    });
}

/// Re-fetch the collection on an interval and publish whenever it differs
/// from the last observed list. Poll failures are transient: logged every
/// tick, reported as a notice once per outage, and retried on the next tick;
/// a successful fetch re-arms the report.
async fn poll_loop(shared: Arc<Shared>, interval: Duration) {
    let mut failing = false;
    loop {
        tokio::time::sleep(interval).await;
        match fetch_records(&shared.client, &shared.collection).await {
            Ok(records) => {
                failing = false;
                let changed = {
                    let mut cached = shared.cached.lock().unwrap();
                    if *cached != records {
                        *cached = records.clone();
                        true
                    } else {
                        false
                    }
                };
                if changed {
                    debug!("remote collection changed: {} records", records.len());
                    shared.feed.send_replace(records);
                }
            }
            Err(err) => {
                error!("poll failed: {:#}", err);
                if !failing {
                    failing = true;
                    let _ = shared
                        .notices
                        .send(format!("Could not refresh records: {}", err));
                }
            }
        }
    }
}

#[async_trait]
impl RecordStore for RemoteStore {
    async fn create(&self, fields: IndexMap<String, String>) -> Result<Option<Record>> {
        if is_blank(&fields) {
            return Ok(None);
        }
        let record = Record::created(next_record_id(&self.known_ids()), fields);
        spawn_put(Arc::clone(&self.shared), record.clone());
        Ok(Some(record))
    }

    async fn update(&self, id: &str, fields: IndexMap<String, String>) -> Result<bool> {
        // Guard against PUT minting a document for an id we never listed.
        if !self.known_ids().contains(id) {
            return Ok(false);
        }
        let record = Record {
            id: id.to_string(),
            created_at: None,
            updated_at: Some(chrono::Utc::now()),
            imported_at: None,
            fields,
        };
        spawn_put(Arc::clone(&self.shared), record);
        Ok(true)
    }

    async fn delete(&self, id: &str) -> Result<()> {
        if !self.known_ids().contains(id) {
            return Ok(());
        }
        spawn_delete(Arc::clone(&self.shared), id.to_string());
        Ok(())
    }

    async fn delete_all(&self) -> Result<()> {
        // Bulk delete is not rolled back: every currently listed record gets
        // its own request, and failures leave earlier deletions in place.
        let listed = self.list().await?;
        for record in listed {
            if let Err(err) =
                delete_record(&self.shared.client, &self.shared.collection, &record.id).await
            {
                error!("delete {} failed: {:#}", record.id, err);
                let _ = self
                    .shared
                    .notices
                    .send(format!("Could not delete record {}: {}", record.id, err));
            }
        }
        Ok(())
    }

    async fn append_imported(&self, imported: Vec<Record>) -> Result<usize> {
        let mut accepted = 0;
        for record in imported {
            match put_record(&self.shared.client, &self.shared.collection, &record).await {
                Ok(()) => accepted += 1,
                Err(err) => {
                    error!("import of {} failed: {:#}", record.id, err);
                    let _ = self
                        .shared
                        .notices
                        .send(format!("Could not import record {}: {}", record.id, err));
                }
            }
        }
        Ok(accepted)
    }

    async fn list(&self) -> Result<Vec<Record>> {
        let records = fetch_records(&self.shared.client, &self.shared.collection).await?;
        *self.shared.cached.lock().unwrap() = records.clone();
        Ok(records)
    }

    fn watch(&self) -> watch::Receiver<Vec<Record>> {
        self.shared.feed.subscribe()
    }
}
