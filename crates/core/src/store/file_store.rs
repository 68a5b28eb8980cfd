//! File-backed document store implementation
//!
//! Keeps every collection in memory and, unless created in-memory only,
//! writes each collection to a JSON file on every mutation. A mutation that
//! cannot be written is undone and never reaches live listeners.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::{watch, RwLock};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::client::{CancelToken, DocumentStore, Subscription};
use super::model::{Collection, Document, Fields, Query};
use crate::Result;

/// On-disk representation of a document. `seq` records insertion order.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredDocument {
    id: String,
    seq: u64,
    fields: Fields,
}

impl StoredDocument {
    fn to_document(&self) -> Document {
        Document::new(self.id.clone(), self.fields.clone())
    }
}

type CollectionMap = HashMap<String, StoredDocument>;

struct Listener {
    id: u64,
    collection: Collection,
    query: Query,
    sender: watch::Sender<Vec<Document>>,
}

#[derive(Default)]
struct Listeners {
    next_id: u64,
    entries: Vec<Listener>,
}

/// Document store with optional JSON file persistence
pub struct FileDocumentStore {
    /// Directory holding one JSON file per collection
    root: Option<PathBuf>,
    collections: RwLock<HashMap<Collection, CollectionMap>>,
    next_seq: AtomicU64,
    listeners: Arc<Mutex<Listeners>>,
}

/// Run a query against a collection snapshot, in insertion order before sorting
fn evaluate(documents: Option<&CollectionMap>, query: &Query) -> Vec<Document> {
    let Some(documents) = documents else {
        return Vec::new();
    };
    let mut matching: Vec<&StoredDocument> = documents
        .values()
        .filter(|stored| query.matches(&stored.to_document()))
        .collect();
    matching.sort_by_key(|stored| stored.seq);

    let mut results: Vec<Document> = matching.into_iter().map(StoredDocument::to_document).collect();
    query.sort(&mut results);
    results
}

impl FileDocumentStore {
    /// Create a store persisted under `root`.
    ///
    /// Existing collection files are loaded; missing ones are created on
    /// first write.
    pub async fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        let mut collections = HashMap::new();
        let mut max_seq = 0;

        for collection in Collection::ALL {
            let path = Self::collection_path(&root, collection);
            let documents: CollectionMap = if path.exists() {
                let content = tokio::fs::read_to_string(&path).await?;
                let stored: Vec<StoredDocument> = serde_json::from_str(&content)?;
                stored.into_iter().map(|d| (d.id.clone(), d)).collect()
            } else {
                HashMap::new()
            };
            max_seq = documents
                .values()
                .map(|d| d.seq)
                .max()
                .map_or(max_seq, |seq| seq.max(max_seq));
            info!(
                "Loaded {} documents from {}",
                documents.len(),
                path.display()
            );
            collections.insert(collection, documents);
        }

        Ok(Self {
            root: Some(root),
            collections: RwLock::new(collections),
            next_seq: AtomicU64::new(max_seq + 1),
            listeners: Arc::new(Mutex::new(Listeners::default())),
        })
    }

    /// Create a store that never touches the filesystem
    pub fn in_memory() -> Self {
        Self {
            root: None,
            collections: RwLock::new(HashMap::new()),
            next_seq: AtomicU64::new(1),
            listeners: Arc::new(Mutex::new(Listeners::default())),
        }
    }

    fn collection_path(root: &std::path::Path, collection: Collection) -> PathBuf {
        root.join(format!("{}.json", collection.as_str()))
    }

    /// Number of live listeners currently registered
    pub fn listener_count(&self) -> usize {
        self.lock_listeners().entries.len()
    }

    fn lock_listeners(&self) -> std::sync::MutexGuard<'_, Listeners> {
        self.listeners
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Write one collection to disk.
    ///
    /// Callers hold the collections write guard across this call, so writes
    /// land in mutation order.
    async fn persist(&self, collection: Collection, documents: Option<&CollectionMap>) -> Result<()> {
        let Some(root) = &self.root else {
            return Ok(());
        };

        let mut documents: Vec<&StoredDocument> = documents
            .map(|docs| docs.values().collect())
            .unwrap_or_default();
        documents.sort_by_key(|d| d.seq);
        let content = serde_json::to_string_pretty(&documents)?;

        // Ensure parent directory exists
        tokio::fs::create_dir_all(root).await?;
        tokio::fs::write(Self::collection_path(root, collection), content).await?;
        Ok(())
    }

    /// Push the current result set to every listener on `collection` whose
    /// results changed
    async fn notify(&self, collection: Collection) {
        let collections = self.collections.read().await;
        let documents = collections.get(&collection);
        let listeners = self.lock_listeners();

        for listener in listeners
            .entries
            .iter()
            .filter(|listener| listener.collection == collection)
        {
            let results = evaluate(documents, &listener.query);
            listener.sender.send_if_modified(|current| {
                if *current == results {
                    false
                } else {
                    *current = results;
                    true
                }
            });
        }
    }
}

fn remove_listener(listeners: &Weak<Mutex<Listeners>>, id: u64) {
    let Some(listeners) = listeners.upgrade() else {
        return;
    };
    let mut listeners = listeners
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    listeners.entries.retain(|listener| listener.id != id);
    debug!("Live listener {} released", id);
}

#[async_trait]
impl DocumentStore for FileDocumentStore {
    async fn create(&self, collection: Collection, fields: Fields) -> Result<String> {
        let id = Uuid::new_v4().simple().to_string();
        let seq = self.next_seq.fetch_add(1, Ordering::SeqCst);
        {
            let mut collections = self.collections.write().await;
            collections.entry(collection).or_default().insert(
                id.clone(),
                StoredDocument {
                    id: id.clone(),
                    seq,
                    fields,
                },
            );
            let persisted = self.persist(collection, collections.get(&collection)).await;
            if let Err(e) = persisted {
                if let Some(docs) = collections.get_mut(&collection) {
                    docs.remove(&id);
                }
                warn!("Failed to persist {}, create rolled back: {}", collection, e);
                return Err(e);
            }
        }
        self.notify(collection).await;
        Ok(id)
    }

    async fn get(&self, collection: Collection, id: &str) -> Result<Option<Document>> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(&collection)
            .and_then(|docs| docs.get(id))
            .map(StoredDocument::to_document))
    }

    async fn query(&self, collection: Collection, query: &Query) -> Result<Vec<Document>> {
        let collections = self.collections.read().await;
        Ok(evaluate(collections.get(&collection), query))
    }

    async fn delete(&self, collection: Collection, id: &str) -> Result<bool> {
        {
            let mut collections = self.collections.write().await;
            let Some(removed) = collections
                .get_mut(&collection)
                .and_then(|docs| docs.remove(id))
            else {
                return Ok(false);
            };
            let persisted = self.persist(collection, collections.get(&collection)).await;
            if let Err(e) = persisted {
                collections
                    .entry(collection)
                    .or_default()
                    .insert(removed.id.clone(), removed);
                warn!("Failed to persist {}, delete rolled back: {}", collection, e);
                return Err(e);
            }
        }
        self.notify(collection).await;
        Ok(true)
    }

    async fn subscribe(&self, collection: Collection, query: Query) -> Result<Subscription> {
        // Hold the read lock until the listener is registered so no mutation
        // lands between the initial snapshot and registration.
        let collections = self.collections.read().await;
        let initial = evaluate(collections.get(&collection), &query);
        let (sender, receiver) = watch::channel(initial);

        let id = {
            let mut listeners = self.lock_listeners();
            listeners.next_id += 1;
            let id = listeners.next_id;
            listeners.entries.push(Listener {
                id,
                collection,
                query,
                sender,
            });
            id
        };
        drop(collections);
        debug!("Live listener {} registered on {}", id, collection);

        let listeners = Arc::downgrade(&self.listeners);
        let token = CancelToken::new(move || remove_listener(&listeners, id));
        Ok(Subscription::new(receiver, token))
    }

    async fn count(&self, collection: Collection) -> Result<usize> {
        let collections = self.collections.read().await;
        Ok(collections.get(&collection).map_or(0, HashMap::len))
    }
}
