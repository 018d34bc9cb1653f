use crate::error::{Result, VectorStoreError};
use docqa_chunker::Chunk;
use ndarray::ArrayView1;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;
use tokio::sync::{Mutex, RwLock};

pub const COLLECTION_SCHEMA_VERSION: u32 = 1;

/// A vector ready to be written, paired with the chunk it encodes.
#[derive(Debug, Clone)]
pub struct NewRecord {
    pub vector: Vec<f32>,
    pub chunk: Chunk,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexedRecord {
    pub id: String,
    pub vector: Vec<f32>,
    #[serde(flatten)]
    pub chunk: Chunk,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionData {
    pub schema_version: u32,
    pub name: String,
    /// Embedder that produced every vector in this collection
    pub model_id: String,
    /// 0 until the first record is written
    pub dimension: usize,
    pub records: Vec<IndexedRecord>,
}

impl CollectionData {
    fn empty(name: &str, model_id: &str) -> Self {
        Self {
            schema_version: COLLECTION_SCHEMA_VERSION,
            name: name.to_string(),
            model_id: model_id.to_string(),
            dimension: 0,
            records: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CollectionInfo {
    pub name: String,
    pub model_id: String,
    pub dimension: usize,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
    pub id: String,
    pub chunk: Chunk,
    pub score: f32,
}

/// File stamp used to detect writes from other processes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Stamp {
    modified: Option<SystemTime>,
    len: u64,
}

struct Cached {
    stamp: Stamp,
    data: Arc<CollectionData>,
}

/// On-disk vector index: one JSON file per collection under `root`.
///
/// Readers share an in-memory copy that is reloaded whenever the file
/// changes on disk. Writers are serialized and replace the file atomically,
/// so a reader always sees either the old or the new collection.
pub struct VectorIndex {
    root: PathBuf,
    cache: RwLock<HashMap<String, Cached>>,
    write_lock: Mutex<()>,
}

impl VectorIndex {
    pub async fn open(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        tokio::fs::create_dir_all(&root).await?;
        Ok(Self {
            root,
            cache: RwLock::new(HashMap::new()),
            write_lock: Mutex::new(()),
        })
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub fn collection_path(&self, name: &str) -> PathBuf {
        let file: String = name
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.root.join(format!("{file}.json"))
    }

    pub async fn exists(&self, name: &str) -> Result<bool> {
        Ok(tokio::fs::try_exists(self.collection_path(name)).await?)
    }

    /// Remove a collection. Returns `false` when it did not exist.
    pub async fn delete_collection(&self, name: &str) -> Result<bool> {
        let _guard = self.write_lock.lock().await;
        self.cache.write().await.remove(name);
        match tokio::fs::remove_file(self.collection_path(name)).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Create `name` with no records if it does not exist yet.
    ///
    /// The dimension is fixed by the first write. Returns `false` when the
    /// collection was already there.
    pub async fn create_collection(&self, name: &str, model_id: &str) -> Result<bool> {
        let _guard = self.write_lock.lock().await;
        match self.load(name).await {
            Ok(_) => return Ok(false),
            Err(VectorStoreError::CollectionNotFound(_)) => {}
            Err(e) => return Err(e),
        }
        log::info!("Creating empty collection '{name}' (embedder {model_id})");
        self.persist(Arc::new(CollectionData::empty(name, model_id)))
            .await?;
        Ok(true)
    }

    /// Append records to `name`, creating the collection on first write.
    ///
    /// Returns the generated ids in input order. The whole batch is rejected
    /// if any vector has the wrong dimension or the collection belongs to a
    /// different embedder.
    pub async fn add(
        &self,
        name: &str,
        model_id: &str,
        records: Vec<NewRecord>,
    ) -> Result<Vec<String>> {
        if records.is_empty() {
            return Ok(Vec::new());
        }
        let _guard = self.write_lock.lock().await;

        let mut data = match self.load(name).await {
            Ok(existing) => existing,
            Err(VectorStoreError::CollectionNotFound(_)) => {
                log::info!("Creating collection '{name}' (embedder {model_id})");
                Arc::new(CollectionData::empty(name, model_id))
            }
            Err(e) => return Err(e),
        };

        if data.model_id != model_id {
            return Err(VectorStoreError::EmbedderMismatch {
                collection: name.to_string(),
                expected: data.model_id.clone(),
                actual: model_id.to_string(),
            });
        }
        let dimension = if data.dimension == 0 {
            records[0].vector.len()
        } else {
            data.dimension
        };
        if let Some(bad) = records.iter().find(|r| r.vector.len() != dimension) {
            return Err(VectorStoreError::DimensionMismatch {
                expected: dimension,
                actual: bad.vector.len(),
            });
        }

        // Without the cache's handle, make_mut only copies while a reader
        // still holds the previous snapshot.
        self.cache.write().await.remove(name);
        let collection = Arc::make_mut(&mut data);
        collection.dimension = dimension;
        collection.records.reserve(records.len());

        let mut ids = Vec::with_capacity(records.len());
        for record in records {
            let id = uuid::Uuid::new_v4().to_string();
            ids.push(id.clone());
            collection.records.push(IndexedRecord {
                id,
                vector: record.vector,
                chunk: record.chunk,
            });
        }

        self.persist(data).await?;
        Ok(ids)
    }

    pub async fn info(&self, name: &str) -> Result<CollectionInfo> {
        let data = self.load(name).await?;
        Ok(CollectionInfo {
            name: data.name.clone(),
            model_id: data.model_id.clone(),
            dimension: data.dimension,
            count: data.records.len(),
        })
    }

    pub async fn count(&self, name: &str) -> Result<usize> {
        Ok(self.load(name).await?.records.len())
    }

    /// Top `k` records by cosine similarity, best first. Equal scores keep
    /// insertion order.
    pub async fn search(&self, name: &str, query: &[f32], k: usize) -> Result<Vec<SearchResult>> {
        let data = self.load(name).await?;
        if data.records.is_empty() {
            return Ok(Vec::new());
        }
        if query.len() != data.dimension {
            return Err(VectorStoreError::DimensionMismatch {
                expected: data.dimension,
                actual: query.len(),
            });
        }

        let query = ArrayView1::from(query);
        let query_norm = query.dot(&query).sqrt();
        let mut scored: Vec<(usize, f32)> = data
            .records
            .iter()
            .enumerate()
            .map(|(idx, record)| {
                let v = ArrayView1::from(record.vector.as_slice());
                let denom = query_norm * v.dot(&v).sqrt();
                let score = if denom > 0.0 {
                    query.dot(&v) / denom
                } else {
                    0.0
                };
                (idx, score)
            })
            .collect();

        // sort_by is stable
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored.truncate(k);

        Ok(scored
            .into_iter()
            .map(|(idx, score)| {
                let record = &data.records[idx];
                SearchResult {
                    id: record.id.clone(),
                    chunk: record.chunk.clone(),
                    score,
                }
            })
            .collect())
    }

    async fn load(&self, name: &str) -> Result<Arc<CollectionData>> {
        let path = self.collection_path(name);
        let stamp = match tokio::fs::metadata(&path).await {
            Ok(meta) => Stamp {
                modified: meta.modified().ok(),
                len: meta.len(),
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                self.cache.write().await.remove(name);
                return Err(VectorStoreError::CollectionNotFound(name.to_string()));
            }
            Err(e) => return Err(e.into()),
        };

        if let Some(cached) = self.cache.read().await.get(name) {
            if cached.stamp == stamp {
                return Ok(cached.data.clone());
            }
        }

        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(VectorStoreError::CollectionNotFound(name.to_string()));
            }
            Err(e) => return Err(e.into()),
        };
        let data: Arc<CollectionData> = Arc::new(serde_json::from_slice(&bytes)?);
        log::debug!(
            "Loaded collection '{name}' ({} records) from {}",
            data.records.len(),
            path.display()
        );
        self.cache.write().await.insert(
            name.to_string(),
            Cached {
                stamp,
                data: data.clone(),
            },
        );
        Ok(data)
    }

    async fn persist(&self, data: Arc<CollectionData>) -> Result<()> {
        let path = self.collection_path(&data.name);
        let bytes = serde_json::to_vec(data.as_ref())?;
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, &path).await?;

        let meta = tokio::fs::metadata(&path).await?;
        let stamp = Stamp {
            modified: meta.modified().ok(),
            len: meta.len(),
        };
        let name = data.name.clone();
        self.cache.write().await.insert(
            name,
            Cached { stamp, data },
        );
        Ok(())
    }
}
