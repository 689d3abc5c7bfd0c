//! Listing navigation for [`RemoteFileBrowserStore`].
//!
//! Every listing request carries a sequence number and a cancellation token. Issuing a
//! new request cancels the previous one, and a response is only applied while its
//! sequence number is still the latest issued (last navigation wins).

use std::sync::atomic::Ordering;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::RemoteFileBrowserStore;
use crate::error::BrowserError;
use crate::models::browser::state::{get_parent_path, normalize_path};
use crate::models::browser::{BrowserStatus, DirectoryListing};

/// 列表请求的目标
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListingTarget {
    /// 导航到指定路径（相对路径以当前路径为起点）
    Path(String),
    /// 重新加载工作目录（见 [`BrowserState::working_dir`]），保留仍然存在的选中项
    ///
    /// [`BrowserState::working_dir`]: crate::models::browser::BrowserState::working_dir
    Refresh,
    /// 上级目录
    Up,
    /// 站点文档根目录
    Home,
    /// 历史后退
    Back,
    /// 历史前进
    Forward,
}

/// 已发出的列表请求
#[derive(Debug, Clone)]
pub(super) struct ListingTicket {
    pub seq: u64,
    pub path: String,
    pub cancel: CancellationToken,
}

impl RemoteFileBrowserStore {
    /// 导航到指定路径
    ///
    /// 立即进入 loading 并清空选择；响应到达时若已有更新的导航则丢弃
    pub async fn navigate_to(&self, path: &str) {
        self.load(ListingTarget::Path(path.to_string())).await;
    }

    /// 刷新当前目录
    pub async fn refresh(&self) {
        self.load(ListingTarget::Refresh).await;
    }

    /// 导航到上级目录，已在根目录时返回 false
    pub async fn go_up(&self) -> bool {
        self.load(ListingTarget::Up).await
    }

    /// 导航到站点文档根目录
    pub async fn go_home(&self) {
        self.load(ListingTarget::Home).await;
    }

    /// 后退导航，没有历史时返回 false
    pub async fn go_back(&self) -> bool {
        self.load(ListingTarget::Back).await
    }

    /// 前进导航，没有历史时返回 false
    pub async fn go_forward(&self) -> bool {
        self.load(ListingTarget::Forward).await
    }

    /// 发起列表请求并等待结果应用，目标无效时返回 false
    pub async fn load(&self, target: ListingTarget) -> bool {
        let Some(ticket) = self.begin_listing(target) else {
            return false;
        };
        self.fetch_listing(ticket).await;
        true
    }

    /// 在一次状态迁移中确定目标路径、分配序号并替换取消令牌
    pub(super) fn begin_listing(&self, target: ListingTarget) -> Option<ListingTicket> {
        let mut ticket = None;
        self.transition(|state| {
            let current = state.current_path.clone();
            let path = match &target {
                ListingTarget::Path(p) => normalize_path(&current, p),
                ListingTarget::Refresh => state.working_dir().to_string(),
                ListingTarget::Up => {
                    if !state.can_go_up() {
                        return false;
                    }
                    get_parent_path(&current)
                }
                ListingTarget::Home => state.document_root.clone(),
                ListingTarget::Back => match state.history.go_back(current.clone()) {
                    Some(p) => p,
                    None => return false,
                },
                ListingTarget::Forward => match state.history.go_forward(current.clone()) {
                    Some(p) => p,
                    None => return false,
                },
            };

            match &target {
                ListingTarget::Refresh => {}
                ListingTarget::Back | ListingTarget::Forward => state.selection.clear(),
                _ => {
                    if path != current {
                        state.history.push(current);
                    }
                    state.selection.clear();
                }
            }

            let seq = self.listing_seq.fetch_add(1, Ordering::SeqCst) + 1;
            let cancel = CancellationToken::new();
            if let Ok(mut guard) = self.listing_cancel.lock() {
                let previous = std::mem::replace(&mut *guard, cancel.clone());
                previous.cancel();
            }

            state.current_path = path.clone();
            state.status = BrowserStatus::Loading;
            ticket = Some(ListingTicket { seq, path, cancel });
            true
        });
        ticket
    }

    /// 调用网关获取列表；请求被新导航取代时直接返回
    pub(super) async fn fetch_listing(&self, ticket: ListingTicket) {
        debug!(
            "[Browser] Listing #{} {} for {}",
            ticket.seq, ticket.path, self.site
        );

        let result = tokio::select! {
            biased;
            _ = ticket.cancel.cancelled() => {
                debug!("[Browser] Listing #{} for {} superseded", ticket.seq, ticket.path);
                return;
            }
            result = self.gateway.list_directory(&self.site, &ticket.path) => result,
        };

        self.finish_listing(ticket.seq, &ticket.path, result);
    }

    /// 应用列表结果，序号不是最新时丢弃并返回 false
    pub(super) fn finish_listing(
        &self,
        seq: u64,
        path: &str,
        result: Result<DirectoryListing, BrowserError>,
    ) -> bool {
        let failure = result.as_ref().err().cloned();
        let applied = self.transition(|state| {
            if seq != self.listing_seq.load(Ordering::SeqCst) {
                return false;
            }
            match result {
                Ok(listing) => {
                    state.listing = Some(listing.normalized(path));
                    state.status = BrowserStatus::Idle;
                    state.retain_listed_selection();
                }
                Err(e) => {
                    // 保留之前的列表（如果有）
                    state.status = BrowserStatus::Error(e);
                    state.retain_listed_selection();
                }
            }
            true
        });

        match (applied, failure) {
            (false, _) => debug!("[Browser] Discarded stale listing #{} for {}", seq, path),
            (true, None) => {
                info!("[Browser] Listed {} (#{})", path, seq);
                self.record_last_path(path);
            }
            (true, Some(e)) => warn!("[Browser] Failed to list {}: {}", path, e),
        }
        applied
    }
}
