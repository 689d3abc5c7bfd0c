// 浏览器状态（UI 只读快照）

use std::collections::{BTreeSet, HashMap};

use super::operation::{OperationId, OperationRecord};
use super::types::{DirectoryListing, NavigationHistory};
use crate::error::BrowserError;

/// 列表状态
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum BrowserStatus {
    #[default]
    Idle,
    Loading,
    Error(BrowserError),
}

impl BrowserStatus {
    pub fn is_loading(&self) -> bool {
        matches!(self, BrowserStatus::Loading)
    }

    pub fn error(&self) -> Option<&BrowserError> {
        match self {
            BrowserStatus::Error(e) => Some(e),
            _ => None,
        }
    }
}

/// 浏览器状态（每个 server/site 一份）
///
/// 只由 [`crate::state::RemoteFileBrowserStore`] 写入；每次变更都会发布新的快照，
/// 已交给 UI 的旧快照不会被修改。
#[derive(Debug, Clone, Default)]
pub struct BrowserState {
    /// 站点文档根目录
    pub document_root: String,
    /// 当前路径（最近一次发起导航的目标）
    pub current_path: String,
    /// 当前可见的目录列表
    pub listing: Option<DirectoryListing>,
    /// 选中的路径（始终是 listing 条目路径的子集）
    pub selection: BTreeSet<String>,
    /// 列表状态
    pub status: BrowserStatus,
    /// 进行中及刚结束的操作
    pub pending_operations: HashMap<OperationId, OperationRecord>,
    /// 导航历史
    pub history: NavigationHistory,
    /// 状态版本号（用于 UI 增量同步）
    pub revision: u64,
}

impl BrowserState {
    /// 创建新的浏览器状态
    pub fn new(document_root: String) -> Self {
        Self {
            current_path: document_root.clone(),
            document_root,
            ..Default::default()
        }
    }

    /// 路径是否在当前可见列表中
    pub fn is_listed(&self, path: &str) -> bool {
        self.listing.as_ref().map_or(false, |l| l.contains(path))
    }

    /// 路径是否被选中
    pub fn is_selected(&self, path: &str) -> bool {
        self.selection.contains(path)
    }

    /// 按提交顺序返回所有操作
    pub fn operations(&self) -> Vec<&OperationRecord> {
        let mut ops: Vec<&OperationRecord> = self.pending_operations.values().collect();
        ops.sort_by_key(|op| op.sequence);
        ops
    }

    /// 查询单个操作
    pub fn operation(&self, id: &OperationId) -> Option<&OperationRecord> {
        self.pending_operations.get(id)
    }

    /// 刷新和上传使用的目录
    ///
    /// 导航失败但旧列表仍在显示时，是旧列表所在的目录；否则是当前路径
    pub fn working_dir(&self) -> &str {
        match (&self.status, &self.listing) {
            (BrowserStatus::Error(_), Some(listing)) => &listing.path,
            _ => &self.current_path,
        }
    }

    /// 是否可以向上导航
    pub fn can_go_up(&self) -> bool {
        self.current_path != "/"
    }

    // ========================================================================
    // 状态迁移（只在 store 内部调用）
    // ========================================================================

    /// 只保留仍在列表中的选中项
    pub(crate) fn retain_listed_selection(&mut self) {
        let Some(listing) = &self.listing else {
            self.selection.clear();
            return;
        };
        let paths = listing.paths();
        self.selection.retain(|p| paths.contains(p.as_str()));
    }

    pub(crate) fn bump(&mut self) {
        self.revision = self.revision.wrapping_add(1);
    }
}

// ============================================================================
// 路径工具函数
// ============================================================================

/// 文件名是否合法（非空、不含分隔符、不是 . 或 ..）
pub fn is_valid_entry_name(name: &str) -> bool {
    !name.is_empty() && !name.contains('/') && !name.contains('\0') && name != "." && name != ".."
}

/// 规范化绝对路径：合并重复分隔符，解析 . 和 ..，去掉末尾分隔符
///
/// 相对路径以 `base` 为起点解析
pub fn normalize_path(base: &str, path: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();
    let joined;
    let source = if path.starts_with('/') {
        path
    } else {
        joined = format!("{}/{}", base, path);
        &joined
    };

    for segment in source.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            s => segments.push(s),
        }
    }

    if segments.is_empty() {
        "/".to_string()
    } else {
        format!("/{}", segments.join("/"))
    }
}

/// 获取父目录路径
pub fn get_parent_path(path: &str) -> String {
    if path == "/" {
        return "/".to_string();
    }

    let path = path.trim_end_matches('/');
    match path.rfind('/') {
        Some(0) => "/".to_string(),
        Some(pos) => path[..pos].to_string(),
        None => "/".to_string(),
    }
}

/// 连接路径
pub fn join_path(base: &str, name: &str) -> String {
    if base == "/" || base.is_empty() {
        format!("/{}", name)
    } else {
        format!("{}/{}", base.trim_end_matches('/'), name)
    }
}
