// 传输/删除操作记录
// 定义操作状态、目标和生命周期

use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};

use crate::error::BrowserError;

/// 操作唯一标识（提交时分配）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OperationId(uuid::Uuid);

impl OperationId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl Default for OperationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for OperationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 操作类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    Upload,
    Download,
    Delete,
}

impl OperationKind {
    pub fn label(&self) -> &'static str {
        match self {
            OperationKind::Upload => "upload",
            OperationKind::Download => "download",
            OperationKind::Delete => "delete",
        }
    }
}

/// 上传目标（文件名 + 大小）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadTarget {
    pub name: String,
    pub size: u64,
}

/// 操作目标
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationTargets {
    /// 远程路径（下载/删除）
    Paths(Vec<String>),
    /// 待上传文件
    Uploads(Vec<UploadTarget>),
}

impl OperationTargets {
    pub fn len(&self) -> usize {
        match self {
            OperationTargets::Paths(p) => p.len(),
            OperationTargets::Uploads(u) => u.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// 操作状态
///
/// `Queued → Running → {Succeeded | Failed | Cancelled}`，另有 `Queued → Cancelled`
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum OperationStatus {
    /// 等待空闲传输槽
    #[default]
    Queued,
    /// 网关调用进行中
    Running,
    /// 已完成
    Succeeded,
    /// 失败
    Failed(BrowserError),
    /// 已取消
    Cancelled,
}

impl OperationStatus {
    /// 是否是终态
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OperationStatus::Succeeded | OperationStatus::Failed(_) | OperationStatus::Cancelled
        )
    }

    /// 是否允许迁移到 `next`（Running → Running 用于进度更新）
    pub fn can_transition_to(&self, next: &OperationStatus) -> bool {
        use OperationStatus::*;
        matches!(
            (self, next),
            (Queued, Running)
                | (Queued, Cancelled)
                | (Running, Running)
                | (Running, Succeeded)
                | (Running, Failed(_))
                | (Running, Cancelled)
        )
    }

    /// 获取状态的显示文本
    pub fn display_text(&self) -> &'static str {
        match self {
            OperationStatus::Queued => "Queued",
            OperationStatus::Running => "Running",
            OperationStatus::Succeeded => "Succeeded",
            OperationStatus::Failed(_) => "Failed",
            OperationStatus::Cancelled => "Cancelled",
        }
    }
}

/// 下载结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadArtifact {
    /// 网关已保存到本地路径
    Saved(PathBuf),
    /// 网关返回的下载链接
    Link(String),
}

/// 单个操作的生命周期记录
#[derive(Debug, Clone, PartialEq)]
pub struct OperationRecord {
    /// 唯一标识
    pub id: OperationId,
    /// 操作类型
    pub kind: OperationKind,
    /// 操作目标
    pub targets: OperationTargets,
    /// 状态
    pub status: OperationStatus,
    /// 进度 [0, 1]
    pub progress: f64,
    /// 用户请求过取消（网关不支持中断时仅作标记）
    pub cancel_requested: bool,
    /// 下载结果
    pub artifact: Option<DownloadArtifact>,
    /// 提交顺序
    pub sequence: u64,
    /// 提交时间
    pub submitted_at: DateTime<Utc>,
    /// 进入终态的时间
    pub finished_at: Option<DateTime<Utc>>,
}

impl OperationRecord {
    pub fn new(kind: OperationKind, targets: OperationTargets) -> Self {
        Self {
            id: OperationId::new(),
            kind,
            targets,
            status: OperationStatus::Queued,
            progress: 0.0,
            cancel_requested: false,
            artifact: None,
            sequence: 0,
            submitted_at: Utc::now(),
            finished_at: None,
        }
    }

    /// 失败原因
    pub fn error(&self) -> Option<&BrowserError> {
        match &self.status {
            OperationStatus::Failed(e) => Some(e),
            _ => None,
        }
    }

    /// 获取进度百分比 (0.0 - 100.0)
    pub fn percentage(&self) -> f64 {
        self.progress * 100.0
    }

    /// 应用状态和进度，非法迁移时返回 false 且不做修改
    pub(crate) fn apply(&mut self, status: OperationStatus, progress: Option<f64>) -> bool {
        if !self.status.can_transition_to(&status) {
            return false;
        }
        if status == OperationStatus::Succeeded {
            self.progress = 1.0;
        } else if let Some(p) = progress {
            self.progress = p.clamp(0.0, 1.0);
        }
        if status.is_terminal() {
            self.finished_at = Some(Utc::now());
        }
        self.status = status;
        true
    }
}

/// 根据已传输/总字节数计算进度
pub(crate) fn fraction(transferred: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (transferred as f64 / total as f64).clamp(0.0, 1.0)
}
