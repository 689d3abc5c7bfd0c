//! File transfer coordination: upload, download and delete.
//!
//! Each submitted record gets its own task. A task waits for a transfer slot while
//! `Queued`, moves to `Running` once a slot is held, and releases the slot only after the
//! record reached a terminal status. A batch supervisor awaits all tasks of one
//! submission and triggers the single follow-up refresh.

use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::future::join_all;
use futures::FutureExt;
use tokio::runtime::{Handle, TryCurrentError};
use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::RemoteFileBrowserStore;
use crate::error::{BrowserError, PartialFailure, PathFailure};
use crate::models::browser::operation::fraction;
use crate::models::browser::state::{is_valid_entry_name, join_path};
use crate::models::browser::{
    DownloadArtifact, OperationId, OperationKind, OperationRecord, OperationStatus,
    OperationTargets, UploadTarget,
};
use crate::models::BrowserSettings;
use crate::services::gateway::{ProgressFn, RemoteFileApiGateway, SiteRef, UploadSource};

/// 取消请求的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelOutcome {
    /// 排队中的操作已取消，不会再调用网关
    Cancelled,
    /// 已请求网关中断，记录仍等待网关给出终态
    AbortRequested,
    /// 网关不支持中断，仅记录了取消意愿
    InterestNoted,
    /// 操作已结束
    AlreadyFinished,
    /// 未知操作
    Unknown,
}

/// 一次提交产生的操作批次
pub struct TransferBatch {
    ids: Vec<OperationId>,
    done: JoinHandle<()>,
}

impl TransferBatch {
    /// 批次内的操作 ID（按提交顺序）
    pub fn ids(&self) -> &[OperationId] {
        &self.ids
    }

    /// 等待批次内所有操作进入终态（以及随后的刷新完成）
    pub async fn wait(self) {
        if let Err(e) = self.done.await {
            error!("[Transfer] Batch supervisor failed: {}", e);
        }
    }
}

/// 单个操作要执行的网关调用
enum Job {
    Upload {
        destination: String,
        source: UploadSource,
    },
    Download {
        path: String,
    },
    Delete {
        paths: Vec<String>,
    },
}

impl Job {
    /// 运行中是否能被网关中断
    fn interruptible(&self) -> bool {
        !matches!(self, Job::Delete { .. })
    }
}

/// 操作任务共享的上下文
#[derive(Clone)]
struct JobContext {
    store: Arc<RemoteFileBrowserStore>,
    gateway: Arc<dyn RemoteFileApiGateway>,
    site: SiteRef,
    slots: Arc<Semaphore>,
    cancel_tokens: Arc<Mutex<HashMap<OperationId, CancellationToken>>>,
    grace: Duration,
    runtime: Handle,
}

/// 文件传输协调器
///
/// 所有操作任务都在创建时绑定的 tokio 运行时上执行
pub struct FileTransferCoordinator {
    ctx: JobContext,
    limit: usize,
}

impl FileTransferCoordinator {
    /// 在当前 tokio 运行时上创建协调器，不在运行时中调用时返回错误
    pub fn new(
        store: Arc<RemoteFileBrowserStore>,
        settings: &BrowserSettings,
    ) -> Result<Self, TryCurrentError> {
        let runtime = Handle::try_current()?;
        Ok(Self::with_runtime(store, settings, runtime))
    }

    /// 使用指定运行时创建协调器
    pub fn with_runtime(
        store: Arc<RemoteFileBrowserStore>,
        settings: &BrowserSettings,
        runtime: Handle,
    ) -> Self {
        let limit = settings.transfer_limit();
        info!(
            "[Transfer] Coordinator for {} ({} concurrent transfers)",
            store.site(),
            limit
        );
        Self {
            ctx: JobContext {
                gateway: store.gateway(),
                site: store.site().clone(),
                store,
                slots: Arc::new(Semaphore::new(limit)),
                cancel_tokens: Arc::new(Mutex::new(HashMap::new())),
                grace: settings.completion_grace(),
                runtime,
            },
            limit,
        }
    }

    /// 并行传输上限
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// 空闲传输槽数量
    pub fn available_slots(&self) -> usize {
        self.ctx.slots.available_permits()
    }

    /// 上传文件到工作目录（导航失败时为仍在显示的目录）
    ///
    /// 每个文件一个操作记录；整批结束后触发一次刷新。
    /// 同名文件如何处理由网关决定。
    pub fn upload(&self, files: Vec<UploadSource>) -> Result<TransferBatch, BrowserError> {
        if files.is_empty() {
            return Err(BrowserError::InvalidSelection(
                "no files to upload".to_string(),
            ));
        }
        if let Some(bad) = files.iter().find(|f| !is_valid_entry_name(&f.name)) {
            return Err(BrowserError::InvalidSelection(format!(
                "invalid file name: {:?}",
                bad.name
            )));
        }

        let remote_dir = self.ctx.store.snapshot().working_dir().to_string();
        info!(
            "[Transfer] Uploading {} file(s) to {}",
            files.len(),
            remote_dir
        );

        let jobs = files
            .into_iter()
            .map(|source| {
                let record = OperationRecord::new(
                    OperationKind::Upload,
                    OperationTargets::Uploads(vec![UploadTarget {
                        name: source.name.clone(),
                        size: source.size,
                    }]),
                );
                let job = Job::Upload {
                    destination: join_path(&remote_dir, &source.name),
                    source,
                };
                (record, job)
            })
            .collect();

        Ok(self.submit(jobs, true))
    }

    /// 下载文件（路径必须都在当前列表中）
    pub fn download(&self, paths: Vec<String>) -> Result<TransferBatch, BrowserError> {
        let paths = self.validate_listed(paths)?;
        info!("[Transfer] Downloading {} file(s)", paths.len());

        let jobs = paths
            .into_iter()
            .map(|path| {
                let record = OperationRecord::new(
                    OperationKind::Download,
                    OperationTargets::Paths(vec![path.clone()]),
                );
                (record, Job::Download { path })
            })
            .collect();

        Ok(self.submit(jobs, false))
    }

    /// 删除路径（整批一个操作记录），结束后总是刷新
    pub fn delete_files(&self, paths: Vec<String>) -> Result<TransferBatch, BrowserError> {
        let paths = self.validate_listed(paths)?;
        info!("[Transfer] Deleting {} path(s)", paths.len());

        let record = OperationRecord::new(
            OperationKind::Delete,
            OperationTargets::Paths(paths.clone()),
        );
        Ok(self.submit(vec![(record, Job::Delete { paths })], true))
    }

    /// 删除当前选中的路径
    pub fn delete_selection(&self) -> Result<TransferBatch, BrowserError> {
        self.delete_files(self.ctx.store.selected_paths())
    }

    /// 取消操作
    pub fn cancel(&self, id: OperationId) -> CancelOutcome {
        let Some(record) = self.ctx.store.snapshot().operation(&id).cloned() else {
            return CancelOutcome::Unknown;
        };

        match record.status {
            OperationStatus::Queued => {
                if self
                    .ctx
                    .store
                    .apply_operation_update(id, OperationStatus::Cancelled, None)
                {
                    self.ctx.cancel_token(id).cancel();
                    info!("[Transfer] Cancelled queued operation {}", id);
                    CancelOutcome::Cancelled
                } else {
                    // 刚被调度，按运行中处理
                    self.cancel(id)
                }
            }
            OperationStatus::Running => {
                self.ctx.store.mark_cancel_requested(id);
                let interruptible = record.kind != OperationKind::Delete;
                if interruptible && self.ctx.gateway.supports_cancellation() {
                    self.ctx.cancel_token(id).cancel();
                    info!("[Transfer] Abort requested for operation {}", id);
                    CancelOutcome::AbortRequested
                } else {
                    debug!(
                        "[Transfer] Operation {} cannot be interrupted, noted cancel request",
                        id
                    );
                    CancelOutcome::InterestNoted
                }
            }
            _ => CancelOutcome::AlreadyFinished,
        }
    }

    /// 校验路径非空且都在当前列表中，返回去重后的路径
    fn validate_listed(&self, paths: Vec<String>) -> Result<Vec<String>, BrowserError> {
        if paths.is_empty() {
            return Err(BrowserError::InvalidSelection("no paths given".to_string()));
        }

        let state = self.ctx.store.snapshot();
        let mut unique: Vec<String> = Vec::with_capacity(paths.len());
        for path in paths {
            if !state.is_listed(&path) {
                warn!("[Transfer] Rejected {}: not in current listing", path);
                return Err(BrowserError::InvalidSelection(format!(
                    "{} is not in the current listing",
                    path
                )));
            }
            if !unique.contains(&path) {
                unique.push(path);
            }
        }
        Ok(unique)
    }

    /// 登记记录并为每个记录启动任务，再启动批次监督任务
    fn submit(&self, jobs: Vec<(OperationRecord, Job)>, refresh_after: bool) -> TransferBatch {
        let mut ids = Vec::with_capacity(jobs.len());
        let mut handles = Vec::with_capacity(jobs.len());

        for (record, job) in jobs {
            let kind = record.kind;
            let id = self.ctx.store.insert_operation(record);
            let token = CancellationToken::new();
            if let Ok(mut tokens) = self.ctx.cancel_tokens.lock() {
                tokens.insert(id, token.clone());
            }
            debug!("[Transfer] Queued {} operation {}", kind.label(), id);

            let ctx = self.ctx.clone();
            handles.push(
                self.ctx
                    .runtime
                    .spawn(async move { run_operation(ctx, id, job, token).await }),
            );
            ids.push(id);
        }

        let ctx = self.ctx.clone();
        let batch_ids = ids.clone();
        let done = self.ctx.runtime.spawn(async move {
            let results = join_all(handles).await;
            for (id, result) in batch_ids.iter().zip(results) {
                if let Err(e) = result {
                    ctx.force_terminal(*id, e);
                }
            }
            if refresh_after {
                debug!("[Transfer] Batch of {} finished, refreshing", batch_ids.len());
                ctx.store.refresh().await;
            }
        });

        TransferBatch { ids, done }
    }
}

impl JobContext {
    /// 获取操作的取消令牌（已结束的操作返回新令牌）
    fn cancel_token(&self, id: OperationId) -> CancellationToken {
        self.cancel_tokens
            .lock()
            .ok()
            .and_then(|tokens| tokens.get(&id).cloned())
            .unwrap_or_default()
    }

    /// 任务被中止（例如运行时关闭）时补上终态
    fn force_terminal(&self, id: OperationId, e: JoinError) {
        error!("[Transfer] Operation {} task aborted: {}", id, e);
        let status = match self.store.operation_status(id) {
            Some(OperationStatus::Queued) => OperationStatus::Cancelled,
            _ => OperationStatus::Failed(BrowserError::Network(format!(
                "transfer task aborted: {}",
                e
            ))),
        };
        self.store.apply_operation_update(id, status, None);
        self.finish(id);
    }

    /// 清理令牌并在宽限期后移除记录
    fn finish(&self, id: OperationId) {
        if let Ok(mut tokens) = self.cancel_tokens.lock() {
            tokens.remove(&id);
        }
        let store = self.store.clone();
        let grace = self.grace;
        self.runtime.spawn(async move {
            tokio::time::sleep(grace).await;
            if store.remove_operation(id) {
                debug!("[Transfer] Removed finished operation {}", id);
            }
        });
    }

    fn progress_reporter(&self, id: OperationId) -> ProgressFn {
        let store = self.store.clone();
        Arc::new(move |transferred, total| {
            store.apply_operation_update(
                id,
                OperationStatus::Running,
                Some(fraction(transferred, total)),
            );
        })
    }

    /// 执行网关调用
    async fn execute(
        &self,
        id: OperationId,
        job: &Job,
        cancel: CancellationToken,
    ) -> Result<Option<DownloadArtifact>, BrowserError> {
        match job {
            Job::Upload {
                destination,
                source,
            } => {
                self.gateway
                    .upload_file(
                        &self.site,
                        destination,
                        source,
                        self.progress_reporter(id),
                        cancel,
                    )
                    .await?;
                Ok(None)
            }
            Job::Download { path } => self
                .gateway
                .download_file(&self.site, path, self.progress_reporter(id), cancel)
                .await
                .map(Some),
            Job::Delete { paths } => {
                let outcomes = self.gateway.delete_paths(&self.site, paths).await?;
                let mut breakdown = PartialFailure::default();
                for path in paths {
                    match outcomes.iter().find(|o| &o.path == path) {
                        Some(outcome) => match &outcome.result {
                            Ok(()) => breakdown.succeeded.push(path.clone()),
                            Err(reason) => breakdown.failed.push(PathFailure {
                                path: path.clone(),
                                reason: reason.clone(),
                            }),
                        },
                        None => breakdown.failed.push(PathFailure {
                            path: path.clone(),
                            reason: BrowserError::Network("no result reported".to_string()),
                        }),
                    }
                }
                if breakdown.is_clean() {
                    Ok(None)
                } else {
                    Err(BrowserError::PartialFailure(breakdown))
                }
            }
        }
    }
}

/// 单个操作的完整生命周期
async fn run_operation(ctx: JobContext, id: OperationId, job: Job, cancel: CancellationToken) {
    // 排队等待传输槽
    let permit = tokio::select! {
        biased;
        _ = cancel.cancelled() => {
            ctx.store.apply_operation_update(id, OperationStatus::Cancelled, None);
            ctx.finish(id);
            return;
        }
        permit = ctx.slots.clone().acquire_owned() => permit,
    };
    let Ok(permit) = permit else {
        ctx.store.apply_operation_update(id, OperationStatus::Cancelled, None);
        ctx.finish(id);
        return;
    };

    // 取消与调度竞争时以 store 中的状态为准
    if !ctx
        .store
        .apply_operation_update(id, OperationStatus::Running, Some(0.0))
    {
        drop(permit);
        ctx.finish(id);
        return;
    }
    debug!("[Transfer] Operation {} running", id);

    let result = AssertUnwindSafe(ctx.execute(id, &job, cancel.clone()))
        .catch_unwind()
        .await
        .unwrap_or_else(|_| Err(BrowserError::Network("gateway call panicked".to_string())));

    match result {
        Ok(Some(artifact)) => {
            ctx.store.complete_download(id, artifact);
            info!("[Transfer] Operation {} succeeded", id);
        }
        Ok(None) => {
            ctx.store
                .apply_operation_update(id, OperationStatus::Succeeded, None);
            info!("[Transfer] Operation {} succeeded", id);
        }
        Err(e)
            if cancel.is_cancelled()
                && job.interruptible()
                && ctx.gateway.supports_cancellation() =>
        {
            info!("[Transfer] Operation {} aborted by gateway: {}", id, e);
            ctx.store
                .apply_operation_update(id, OperationStatus::Cancelled, None);
        }
        Err(e) => {
            error!("[Transfer] Operation {} failed: {}", id, e);
            ctx.store
                .apply_operation_update(id, OperationStatus::Failed(e), None);
        }
    }

    // 终态之后才释放传输槽
    drop(permit);
    ctx.finish(id);
}
