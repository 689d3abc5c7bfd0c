// 远程文件 API 网关接口
// 实际的网络调用由上层应用实现，这里只定义核心依赖的契约

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::BrowserError;
use crate::models::browser::{DirectoryListing, DownloadArtifact};

/// 浏览目标（服务器 + 站点）
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SiteRef {
    pub server_id: String,
    pub site_id: String,
}

impl SiteRef {
    pub fn new(server_id: impl Into<String>, site_id: impl Into<String>) -> Self {
        Self {
            server_id: server_id.into(),
            site_id: site_id.into(),
        }
    }
}

impl fmt::Display for SiteRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.server_id, self.site_id)
    }
}

/// 待上传的本地文件
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadSource {
    /// 远程文件名
    pub name: String,
    /// 文件大小（字节）
    pub size: u64,
    /// 本地文件路径
    pub local_path: PathBuf,
}

impl UploadSource {
    pub fn new(name: impl Into<String>, size: u64, local_path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            size,
            local_path: local_path.into(),
        }
    }
}

/// 删除结果（逐路径）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathOutcome {
    pub path: String,
    pub result: Result<(), BrowserError>,
}

impl PathOutcome {
    pub fn ok(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            result: Ok(()),
        }
    }

    pub fn failed(path: impl Into<String>, reason: BrowserError) -> Self {
        Self {
            path: path.into(),
            result: Err(reason),
        }
    }
}

/// 进度回调，参数为 (已传输字节数, 总字节数)
pub type ProgressFn = Arc<dyn Fn(u64, u64) + Send + Sync>;

/// 远程文件 API 网关
///
/// 超时由实现方负责，超时应返回 [`BrowserError::Timeout`]。
/// 上传时同名文件的处理策略也由实现方（后端）决定。
#[async_trait]
pub trait RemoteFileApiGateway: Send + Sync {
    /// 列出目录内容
    async fn list_directory(
        &self,
        site: &SiteRef,
        path: &str,
    ) -> Result<DirectoryListing, BrowserError>;

    /// 上传文件到目标路径
    async fn upload_file(
        &self,
        site: &SiteRef,
        destination_path: &str,
        source: &UploadSource,
        progress: ProgressFn,
        cancel: CancellationToken,
    ) -> Result<(), BrowserError>;

    /// 下载文件
    async fn download_file(
        &self,
        site: &SiteRef,
        path: &str,
        progress: ProgressFn,
        cancel: CancellationToken,
    ) -> Result<DownloadArtifact, BrowserError>;

    /// 删除多个路径，返回逐路径结果
    async fn delete_paths(
        &self,
        site: &SiteRef,
        paths: &[String],
    ) -> Result<Vec<PathOutcome>, BrowserError>;

    /// 是否响应传输中的取消令牌
    fn supports_cancellation(&self) -> bool {
        false
    }
}
