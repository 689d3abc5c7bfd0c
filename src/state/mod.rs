// 浏览器状态存储
// 按功能拆分为多个子模块

mod navigation;
mod transfer;

#[cfg(test)]
pub(crate) mod test_support;

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::BrowserError;
use crate::models::browser::state::normalize_path;
use crate::models::browser::{
    BrowserState, DownloadArtifact, OperationId, OperationRecord, OperationStatus,
};
use crate::services::gateway::{RemoteFileApiGateway, SiteRef};
use crate::services::storage;

pub use navigation::ListingTarget;
pub use transfer::{CancelOutcome, FileTransferCoordinator, TransferBatch};

/// 远程文件浏览器状态存储
///
/// 每个 (server_id, site_id) 对应一个实例，由组合 UI 的一方持有。
/// 它是 [`BrowserState`] 的唯一写入者：每次状态迁移都基于当前快照的副本完成，
/// 再以新的 `Arc<BrowserState>` 发布给订阅者。
pub struct RemoteFileBrowserStore {
    /// 浏览目标
    site: SiteRef,
    /// 远程文件网关
    gateway: Arc<dyn RemoteFileApiGateway>,
    /// 状态快照发布端
    state_tx: watch::Sender<Arc<BrowserState>>,
    /// 最近发出的列表请求序号
    listing_seq: AtomicU64,
    /// 进行中列表请求的取消令牌
    listing_cancel: Mutex<CancellationToken>,
    /// 操作提交序号
    operation_seq: AtomicU64,
    /// 开启路径记忆时，成功列出的目录写入此设置文件
    last_path_file: Option<PathBuf>,
}

impl RemoteFileBrowserStore {
    /// 创建状态存储，当前路径为站点文档根目录（不会自动加载列表）
    pub fn new(
        site: SiteRef,
        document_root: &str,
        gateway: Arc<dyn RemoteFileApiGateway>,
    ) -> Self {
        let document_root = normalize_path("/", document_root);
        debug!("[Browser] Creating store for {} at {}", site, document_root);
        let (state_tx, _) = watch::channel(Arc::new(BrowserState::new(document_root)));
        Self {
            site,
            gateway,
            state_tx,
            listing_seq: AtomicU64::new(0),
            listing_cancel: Mutex::new(CancellationToken::new()),
            operation_seq: AtomicU64::new(0),
            last_path_file: None,
        }
    }

    /// 按设置文件创建状态存储
    ///
    /// 开启路径记忆时从上次浏览的目录开始，并在每次成功列出目录后更新记录
    pub fn from_settings(
        site: SiteRef,
        document_root: &str,
        gateway: Arc<dyn RemoteFileApiGateway>,
        settings_file: &Path,
    ) -> anyhow::Result<Self> {
        let settings = storage::load_settings_from(settings_file)?;
        let mut store = Self::new(site, document_root, gateway);
        if settings.remember_last_path {
            let start = normalize_path("/", settings.start_path(document_root));
            debug!("[Browser] Starting {} at remembered path {}", store.site, start);
            store.state_tx.send_modify(|state| {
                let mut next = BrowserState::clone(state);
                next.current_path = start;
                *state = Arc::new(next);
            });
            store.last_path_file = Some(settings_file.to_path_buf());
        }
        Ok(store)
    }

    /// 使用默认设置文件创建状态存储
    pub fn from_default_settings(
        site: SiteRef,
        document_root: &str,
        gateway: Arc<dyn RemoteFileApiGateway>,
    ) -> anyhow::Result<Self> {
        let settings_file = storage::get_settings_file()?;
        Self::from_settings(site, document_root, gateway, &settings_file)
    }

    /// 记录最后浏览的目录（失败只记日志）
    pub(crate) fn record_last_path(&self, path: &str) {
        let Some(file) = &self.last_path_file else {
            return;
        };
        if let Err(e) = storage::update_last_path_in(file, path) {
            warn!("[Browser] Failed to remember last path {}: {:#}", path, e);
        }
    }

    /// 浏览目标
    pub fn site(&self) -> &SiteRef {
        &self.site
    }

    pub(crate) fn gateway(&self) -> Arc<dyn RemoteFileApiGateway> {
        self.gateway.clone()
    }

    /// 当前状态快照
    pub fn snapshot(&self) -> Arc<BrowserState> {
        self.state_tx.borrow().clone()
    }

    /// 订阅状态变化
    pub fn subscribe(&self) -> watch::Receiver<Arc<BrowserState>> {
        self.state_tx.subscribe()
    }

    /// 在当前快照的副本上执行迁移；闭包返回 false 时不发布
    fn transition<F>(&self, f: F) -> bool
    where
        F: FnOnce(&mut BrowserState) -> bool,
    {
        self.state_tx.send_if_modified(|snapshot| {
            let mut next = BrowserState::clone(snapshot);
            if !f(&mut next) {
                return false;
            }
            next.bump();
            *snapshot = Arc::new(next);
            true
        })
    }

    // ========================================================================
    // 选择
    // ========================================================================

    /// 选中路径（必须在当前可见列表中）
    pub fn select(&self, path: &str) -> Result<(), BrowserError> {
        let mut listed = false;
        self.transition(|state| {
            listed = state.is_listed(path);
            listed && state.selection.insert(path.to_string())
        });
        if listed {
            Ok(())
        } else {
            Err(BrowserError::InvalidSelection(format!(
                "{} is not in the current listing",
                path
            )))
        }
    }

    /// 取消选中
    pub fn deselect(&self, path: &str) {
        self.transition(|state| state.selection.remove(path));
    }

    /// 切换选中状态，返回切换后是否选中
    pub fn toggle_selection(&self, path: &str) -> Result<bool, BrowserError> {
        if self.snapshot().is_selected(path) {
            self.deselect(path);
            Ok(false)
        } else {
            self.select(path).map(|_| true)
        }
    }

    /// 选中当前列表的全部条目
    pub fn select_all(&self) {
        self.transition(|state| {
            let Some(listing) = &state.listing else {
                return false;
            };
            let before = state.selection.len();
            state
                .selection
                .extend(listing.entries.iter().map(|e| e.path.clone()));
            state.selection.len() != before
        });
    }

    /// 清空选择
    pub fn clear_selection(&self) {
        self.transition(|state| {
            if state.selection.is_empty() {
                return false;
            }
            state.selection.clear();
            true
        });
    }

    /// 当前选中的路径（有序）
    pub fn selected_paths(&self) -> Vec<String> {
        self.snapshot().selection.iter().cloned().collect()
    }

    // ========================================================================
    // 操作记录（仅供 FileTransferCoordinator 使用）
    // ========================================================================

    /// 登记新操作，返回其 ID
    pub(crate) fn insert_operation(&self, mut record: OperationRecord) -> OperationId {
        let id = record.id;
        record.sequence = self.operation_seq.fetch_add(1, Ordering::SeqCst);
        self.transition(|state| {
            state.pending_operations.insert(id, record);
            true
        });
        id
    }

    /// 更新操作状态和进度
    ///
    /// 只接受向前的状态迁移，返回是否已应用
    pub(crate) fn apply_operation_update(
        &self,
        id: OperationId,
        status: OperationStatus,
        progress: Option<f64>,
    ) -> bool {
        let mut known = false;
        let label = status.display_text();
        let applied = self.transition(|state| {
            let Some(record) = state.pending_operations.get_mut(&id) else {
                return false;
            };
            known = true;
            record.apply(status, progress)
        });
        if known && !applied {
            debug!("[Browser] Ignored {} update for operation {}", label, id);
        } else if !known {
            warn!("[Browser] Update for unknown operation {}", id);
        }
        applied
    }

    /// 标记下载完成并保存结果
    pub(crate) fn complete_download(&self, id: OperationId, artifact: DownloadArtifact) -> bool {
        self.transition(|state| {
            let Some(record) = state.pending_operations.get_mut(&id) else {
                return false;
            };
            if !record.apply(OperationStatus::Succeeded, None) {
                return false;
            }
            record.artifact = Some(artifact);
            true
        })
    }

    /// 记录用户的取消请求
    pub(crate) fn mark_cancel_requested(&self, id: OperationId) -> bool {
        self.transition(|state| match state.pending_operations.get_mut(&id) {
            Some(record) if !record.status.is_terminal() && !record.cancel_requested => {
                record.cancel_requested = true;
                true
            }
            _ => false,
        })
    }

    /// 移除已进入终态的操作
    pub(crate) fn remove_operation(&self, id: OperationId) -> bool {
        self.transition(|state| {
            let terminal = state
                .pending_operations
                .get(&id)
                .map_or(false, |r| r.status.is_terminal());
            terminal && state.pending_operations.remove(&id).is_some()
        })
    }

    /// 查询操作状态
    pub fn operation_status(&self, id: OperationId) -> Option<OperationStatus> {
        self.snapshot()
            .pending_operations
            .get(&id)
            .map(|r| r.status.clone())
    }
}
