// 测试用网关：可控制响应顺序、失败和传输并发

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::{oneshot, Semaphore};
use tokio_util::sync::CancellationToken;

use super::{FileTransferCoordinator, RemoteFileBrowserStore};
use crate::error::BrowserError;
use crate::models::browser::state::get_parent_path;
use crate::models::browser::{DirectoryListing, DownloadArtifact, FileEntry};
use crate::models::BrowserSettings;
use crate::services::gateway::{
    PathOutcome, ProgressFn, RemoteFileApiGateway, SiteRef, UploadSource,
};

/// 让出调度若干次，使已就绪的任务跑完
pub(crate) async fn settle() {
    for _ in 0..64 {
        tokio::task::yield_now().await;
    }
}

pub(crate) fn store_with(gateway: &Arc<FakeGateway>, root: &str) -> Arc<RemoteFileBrowserStore> {
    let gateway: Arc<dyn RemoteFileApiGateway> = gateway.clone();
    Arc::new(RemoteFileBrowserStore::new(
        SiteRef::new("server-1", "site-1"),
        root,
        gateway,
    ))
}

pub(crate) fn coordinator_with(
    store: &Arc<RemoteFileBrowserStore>,
    limit: u32,
) -> FileTransferCoordinator {
    let settings = BrowserSettings {
        concurrent_transfers: limit,
        ..Default::default()
    };
    FileTransferCoordinator::new(store.clone(), &settings).unwrap()
}

/// 内存中的远程文件系统
#[derive(Default)]
pub(crate) struct FakeGateway {
    dirs: Mutex<HashMap<String, Vec<FileEntry>>>,
    listing_errors: Mutex<HashMap<String, BrowserError>>,
    hold: AtomicBool,
    held: Mutex<Vec<(String, oneshot::Sender<()>)>>,
    list_calls: Mutex<Vec<String>>,
    /// 为 None 时传输立即完成
    gate: Option<Semaphore>,
    cancellable: bool,
    active: AtomicUsize,
    peak: AtomicUsize,
    uploaded: Mutex<Vec<String>>,
    upload_errors: Mutex<HashMap<String, BrowserError>>,
    upload_panics: Mutex<HashSet<String>>,
    delete_calls: Mutex<Vec<Vec<String>>>,
    delete_errors: Mutex<HashMap<String, BrowserError>>,
    /// 整个删除调用失败（不删除任何路径）
    delete_call_error: Mutex<Option<BrowserError>>,
    /// 删除后不返回结果的路径
    unreported_deletes: Mutex<HashSet<String>>,
}

impl FakeGateway {
    /// 传输立即完成
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// 传输等待 `release_transfers`
    pub fn manual() -> Arc<Self> {
        Arc::new(Self {
            gate: Some(Semaphore::new(0)),
            ..Default::default()
        })
    }

    /// 传输等待 `release_transfers`，并响应取消令牌
    pub fn manual_cancellable() -> Arc<Self> {
        Arc::new(Self {
            gate: Some(Semaphore::new(0)),
            cancellable: true,
            ..Default::default()
        })
    }

    pub fn put_dir(&self, path: &str, entries: Vec<FileEntry>) {
        self.dirs.lock().unwrap().insert(path.to_string(), entries);
    }

    pub fn fail_listing(&self, path: &str, error: BrowserError) {
        self.listing_errors
            .lock()
            .unwrap()
            .insert(path.to_string(), error);
    }

    pub fn hold_listings(&self, hold: bool) {
        self.hold.store(hold, Ordering::SeqCst);
    }

    /// 放行第一个等待中的同路径列表请求
    pub fn release_listing(&self, path: &str) {
        let sender = {
            let mut held = self.held.lock().unwrap();
            held.iter()
                .position(|(p, _)| p == path)
                .map(|i| held.remove(i).1)
        };
        if let Some(sender) = sender {
            let _ = sender.send(());
        }
    }

    pub fn list_calls(&self, path: &str) -> usize {
        self.list_calls
            .lock()
            .unwrap()
            .iter()
            .filter(|p| p.as_str() == path)
            .count()
    }

    pub fn fail_upload(&self, destination: &str, error: BrowserError) {
        self.upload_errors
            .lock()
            .unwrap()
            .insert(destination.to_string(), error);
    }

    pub fn panic_on_upload(&self, destination: &str) {
        self.upload_panics
            .lock()
            .unwrap()
            .insert(destination.to_string());
    }

    pub fn uploaded(&self) -> Vec<String> {
        self.uploaded.lock().unwrap().clone()
    }

    pub fn active_transfers(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    pub fn peak_transfers(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    pub fn release_transfers(&self, n: usize) {
        if let Some(gate) = &self.gate {
            gate.add_permits(n);
        }
    }

    pub fn fail_delete(&self, path: &str, error: BrowserError) {
        self.delete_errors
            .lock()
            .unwrap()
            .insert(path.to_string(), error);
    }

    pub fn fail_delete_call(&self, error: BrowserError) {
        *self.delete_call_error.lock().unwrap() = Some(error);
    }

    pub fn omit_delete_outcome(&self, path: &str) {
        self.unreported_deletes
            .lock()
            .unwrap()
            .insert(path.to_string());
    }

    pub fn delete_calls(&self) -> Vec<Vec<String>> {
        self.delete_calls.lock().unwrap().clone()
    }

    /// 模拟传输过程，期间计入并发数
    async fn transfer(&self, cancel: &CancellationToken) -> Result<(), BrowserError> {
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);

        let outcome = match &self.gate {
            None => {
                tokio::task::yield_now().await;
                Ok(())
            }
            Some(gate) if self.cancellable => tokio::select! {
                _ = cancel.cancelled() => Err(BrowserError::Network("aborted".to_string())),
                permit = gate.acquire() => permit
                    .map(|p| p.forget())
                    .map_err(|_| BrowserError::Network("gate closed".to_string())),
            },
            Some(gate) => gate
                .acquire()
                .await
                .map(|p| p.forget())
                .map_err(|_| BrowserError::Network("gate closed".to_string())),
        };

        self.active.fetch_sub(1, Ordering::SeqCst);
        outcome
    }
}

#[async_trait]
impl RemoteFileApiGateway for FakeGateway {
    async fn list_directory(
        &self,
        _site: &SiteRef,
        path: &str,
    ) -> Result<DirectoryListing, BrowserError> {
        self.list_calls.lock().unwrap().push(path.to_string());

        if self.hold.load(Ordering::SeqCst) {
            let (tx, rx) = oneshot::channel();
            self.held.lock().unwrap().push((path.to_string(), tx));
            let _ = rx.await;
        }

        let error = self.listing_errors.lock().unwrap().get(path).cloned();
        if let Some(e) = error {
            return Err(e);
        }
        let entries = self.dirs.lock().unwrap().get(path).cloned();
        match entries {
            Some(entries) => Ok(DirectoryListing::new(path, entries)),
            None => Err(BrowserError::NotFound(path.to_string())),
        }
    }

    async fn upload_file(
        &self,
        _site: &SiteRef,
        destination_path: &str,
        source: &UploadSource,
        progress: ProgressFn,
        cancel: CancellationToken,
    ) -> Result<(), BrowserError> {
        let crash = self.upload_panics.lock().unwrap().contains(destination_path);
        if crash {
            panic!("gateway crashed while uploading {}", destination_path);
        }

        progress(source.size / 2, source.size);
        self.transfer(&cancel).await?;

        let error = self
            .upload_errors
            .lock()
            .unwrap()
            .get(destination_path)
            .cloned();
        if let Some(e) = error {
            return Err(e);
        }

        progress(source.size, source.size);
        self.uploaded
            .lock()
            .unwrap()
            .push(destination_path.to_string());
        let parent = get_parent_path(destination_path);
        self.dirs
            .lock()
            .unwrap()
            .entry(parent.clone())
            .or_default()
            .push(FileEntry::file(&parent, source.name.clone(), source.size));
        Ok(())
    }

    async fn download_file(
        &self,
        _site: &SiteRef,
        path: &str,
        progress: ProgressFn,
        cancel: CancellationToken,
    ) -> Result<DownloadArtifact, BrowserError> {
        self.transfer(&cancel).await?;
        progress(1, 1);
        Ok(DownloadArtifact::Link(format!("https://files.test{}", path)))
    }

    async fn delete_paths(
        &self,
        _site: &SiteRef,
        paths: &[String],
    ) -> Result<Vec<PathOutcome>, BrowserError> {
        self.delete_calls.lock().unwrap().push(paths.to_vec());
        let call_error = self.delete_call_error.lock().unwrap().clone();
        if let Some(e) = call_error {
            return Err(e);
        }

        let unreported = self.unreported_deletes.lock().unwrap().clone();
        let errors = self.delete_errors.lock().unwrap().clone();
        let mut dirs = self.dirs.lock().unwrap();
        let outcomes = paths
            .iter()
            .map(|path| match errors.get(path) {
                Some(e) => PathOutcome::failed(path.clone(), e.clone()),
                None => {
                    if let Some(entries) = dirs.get_mut(&get_parent_path(path)) {
                        entries.retain(|e| &e.path != path);
                    }
                    PathOutcome::ok(path.clone())
                }
            })
            .filter(|outcome| !unreported.contains(&outcome.path))
            .collect();
        Ok(outcomes)
    }

    fn supports_cancellation(&self) -> bool {
        self.cancellable
    }
}
