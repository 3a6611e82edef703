//! In-memory generation service
//!
//! Mirrors the naming and bookkeeping of the real service without rendering
//! anything: artifact bodies are the JSON label fields they would print.

use std::sync::atomic::{AtomicBool, Ordering};

use bytes::Bytes;
use indexmap::IndexMap;
use tracing::{debug, info};

use crate::{
    ingest::{self, RawFile},
    label::LabelFields,
    record::Record,
};

use super::{
    ArchiveStats, ArchivedFile, FileKind, GenerationOptions, GenerationResult, GenerationService,
    Reachability, RemoteError,
};

#[derive(Default)]
struct Store {
    artifacts: IndexMap<String, Bytes>,
    archives: IndexMap<String, Bytes>,
    sessions: u64,
}

pub struct LocalService {
    store: tokio::sync::Mutex<Store>,
    offline: AtomicBool,
}

impl Default for LocalService {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalService {
    pub fn new() -> Self {
        Self {
            store: Default::default(),
            offline: AtomicBool::new(false),
        }
    }

    /// Make every request fail as if the service could not be reached.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    fn ensure_online(&self) -> Result<(), RemoteError> {
        if self.offline.load(Ordering::SeqCst) {
            Err(RemoteError::Unreachable("local service is offline".to_owned()))
        } else {
            Ok(())
        }
    }

    async fn generate(
        &self,
        records: &[Record],
        options: &GenerationOptions,
    ) -> Result<GenerationResult, RemoteError> {
        if options.grid_cols == 0 || options.grid_rows == 0 {
            return Err(RemoteError::BadStatus {
                status: 400,
                message: "grid dimensions must be positive".to_owned(),
            });
        }
        let mut store = self.store.lock().await;
        let mut artifacts = Vec::with_capacity(records.len());
        for (index, record) in records.iter().enumerate() {
            let fields = LabelFields::from_record(record);
            let imei = fields
                .imei
                .clone()
                .unwrap_or_else(|| format!("row{}", record.id));
            let name = format!("barcode_label_{imei}_{}.png", index + 1);
            let body = serde_json::to_vec(&fields)
                .map_err(|error| RemoteError::MalformedResponse(error.to_string()))?;
            debug!(name, "generated label");
            store.artifacts.insert(name.clone(), body.into());
            artifacts.push(name);
        }

        let archive = if options.produce_archive && !artifacts.is_empty() {
            let stamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
            let mut name = format!("barcode_collection_{stamp}.pdf");
            if store.archives.contains_key(&name) {
                name = format!("barcode_collection_{stamp}_{}.pdf", store.sessions + 1);
            }
            let pages = (artifacts.len() as u64).div_ceil(options.labels_per_page());
            let body = serde_json::json!({
                "labels": artifacts,
                "grid_cols": options.grid_cols,
                "grid_rows": options.grid_rows,
                "pages": pages,
            });
            store
                .archives
                .insert(name.clone(), body.to_string().into_bytes().into());
            Some(name)
        } else {
            None
        };
        store.sessions += 1;
        info!(
            artifacts = artifacts.len(),
            archive = ?archive,
            session = store.sessions,
            "local generation finished"
        );
        Ok(GenerationResult { artifacts, archive })
    }
}

impl GenerationService for LocalService {
    async fn submit_file(
        &self,
        file: &RawFile,
        options: &GenerationOptions,
    ) -> Result<GenerationResult, RemoteError> {
        self.ensure_online()?;
        let records = ingest::decode_async(file)
            .await
            .map_err(|error| RemoteError::BadStatus {
                status: 400,
                message: error.to_string(),
            })?;
        self.generate(records.records(), options).await
    }

    async fn submit_records(
        &self,
        records: &[Record],
        options: &GenerationOptions,
    ) -> Result<GenerationResult, RemoteError> {
        self.ensure_online()?;
        self.generate(records, options).await
    }

    async fn download_artifact(&self, id: &str) -> Result<Bytes, RemoteError> {
        self.ensure_online()?;
        self.store
            .lock()
            .await
            .artifacts
            .get(id)
            .cloned()
            .ok_or_else(|| RemoteError::NotFound(id.to_owned()))
    }

    async fn download_archive(&self, id: &str) -> Result<Bytes, RemoteError> {
        self.ensure_online()?;
        self.store
            .lock()
            .await
            .archives
            .get(id)
            .cloned()
            .ok_or_else(|| RemoteError::NotFound(id.to_owned()))
    }

    async fn health(&self) -> Reachability {
        match self.ensure_online() {
            Ok(()) => Reachability::Reachable,
            Err(error) => Reachability::Unreachable(error.to_string()),
        }
    }

    async fn list_files(&self) -> Result<Vec<ArchivedFile>, RemoteError> {
        self.ensure_online()?;
        let store = self.store.lock().await;
        let entries = |files: &IndexMap<String, Bytes>, kind| {
            files
                .iter()
                .map(move |(name, body)| ArchivedFile {
                    name: name.clone(),
                    kind,
                    size: body.len() as u64,
                    created: None,
                })
                .collect::<Vec<_>>()
        };
        let mut files = entries(&store.artifacts, FileKind::Png);
        files.extend(entries(&store.archives, FileKind::Pdf));
        Ok(files)
    }

    async fn archive_stats(&self) -> Result<ArchiveStats, RemoteError> {
        self.ensure_online()?;
        let store = self.store.lock().await;
        let size = |files: &IndexMap<String, Bytes>| {
            files.values().map(|body| body.len() as u64).sum::<u64>()
        };
        Ok(ArchiveStats {
            total_files: (store.artifacts.len() + store.archives.len()) as u64,
            png_files: store.artifacts.len() as u64,
            pdf_files: store.archives.len() as u64,
            total_size: size(&store.artifacts) + size(&store.archives),
            sessions: store.sessions,
        })
    }
}
