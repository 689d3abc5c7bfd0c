// 浏览器错误类型定义

use std::fmt;

use thiserror::Error;

/// 远程文件操作错误（同时作为列表错误和操作失败原因保存在状态中）
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BrowserError {
    /// 路径已不存在
    #[error("Path not found: {0}")]
    NotFound(String),

    /// 权限不足
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// 网关调用超时
    #[error("Request timed out")]
    Timeout,

    /// 网络/传输错误
    #[error("Network error: {0}")]
    Network(String),

    /// 客户端校验失败（不会到达网关）
    #[error("Invalid selection: {0}")]
    InvalidSelection(String),

    /// 批量操作部分失败
    #[error("{0}")]
    PartialFailure(PartialFailure),

    /// 网关拒绝覆盖同名条目（原样透传）
    #[error("Conflict: {0}")]
    Conflict(String),
}

impl BrowserError {
    /// 用于 UI 展示的简短分类
    pub fn kind_label(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "NotFound",
            Self::PermissionDenied(_) => "PermissionDenied",
            Self::Timeout => "Timeout",
            Self::Network(_) => "NetworkError",
            Self::InvalidSelection(_) => "InvalidSelection",
            Self::PartialFailure(_) => "PartialFailure",
            Self::Conflict(_) => "Conflict",
        }
    }
}

impl From<std::io::Error> for BrowserError {
    fn from(e: std::io::Error) -> Self {
        use std::io::ErrorKind;
        match e.kind() {
            ErrorKind::NotFound => BrowserError::NotFound(e.to_string()),
            ErrorKind::PermissionDenied => BrowserError::PermissionDenied(e.to_string()),
            ErrorKind::TimedOut => BrowserError::Timeout,
            ErrorKind::AlreadyExists => BrowserError::Conflict(e.to_string()),
            _ => BrowserError::Network(e.to_string()),
        }
    }
}

/// 单个路径的失败原因
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathFailure {
    pub path: String,
    pub reason: BrowserError,
}

/// 批量删除的逐项结果
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PartialFailure {
    /// 成功的路径（保持提交顺序）
    pub succeeded: Vec<String>,
    /// 失败的路径及原因（保持提交顺序）
    pub failed: Vec<PathFailure>,
}

impl PartialFailure {
    /// 是否全部成功
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }

    /// 查询某个路径的失败原因
    pub fn reason_for(&self, path: &str) -> Option<&BrowserError> {
        self.failed
            .iter()
            .find(|f| f.path == path)
            .map(|f| &f.reason)
    }
}

impl fmt::Display for PartialFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Partial failure: {} succeeded, {} failed",
            self.succeeded.len(),
            self.failed.len()
        )?;
        for failure in &self.failed {
            write!(f, "; {}: {}", failure.path, failure.reason.kind_label())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_classification() {
        let e: BrowserError = std::io::Error::new(std::io::ErrorKind::NotFound, "gone").into();
        assert!(matches!(e, BrowserError::NotFound(_)));

        let e: BrowserError = std::io::Error::new(std::io::ErrorKind::TimedOut, "slow").into();
        assert_eq!(e, BrowserError::Timeout);

        let e: BrowserError =
            std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset").into();
        assert!(matches!(e, BrowserError::Network(_)));
    }

    #[test]
    fn test_partial_failure_display_keeps_breakdown() {
        let failure = PartialFailure {
            succeeded: vec!["/srv/a.txt".to_string()],
            failed: vec![PathFailure {
                path: "/srv/b.txt".to_string(),
                reason: BrowserError::PermissionDenied("/srv/b.txt".to_string()),
            }],
        };
        let text = BrowserError::PartialFailure(failure.clone()).to_string();
        assert_eq!(
            text,
            "Partial failure: 1 succeeded, 1 failed; /srv/b.txt: PermissionDenied"
        );
        assert!(!failure.is_clean());
        assert!(matches!(
            failure.reason_for("/srv/b.txt"),
            Some(BrowserError::PermissionDenied(_))
        ));
        assert!(failure.reason_for("/srv/a.txt").is_none());
    }
}
