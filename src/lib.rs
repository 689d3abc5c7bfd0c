//! 远程站点文件浏览器客户端核心
//!
//! [`RemoteFileBrowserStore`] 保存某个 (server, site) 的浏览状态并发布不可变快照，
//! [`FileTransferCoordinator`] 负责上传、下载、删除的排队与并发控制，
//! 实际的网络调用通过 [`RemoteFileApiGateway`] 由上层应用提供。

pub mod constants;
pub mod error;
pub mod logging;
pub mod models;
pub mod services;
pub mod state;

pub use error::{BrowserError, PartialFailure, PathFailure};
pub use models::browser::{
    BrowserState, BrowserStatus, DirectoryListing, DownloadArtifact, FileEntry, FileKind,
    OperationId, OperationKind, OperationRecord, OperationStatus, OperationTargets,
    UploadTarget,
};
pub use models::BrowserSettings;
pub use services::gateway::{
    PathOutcome, ProgressFn, RemoteFileApiGateway, SiteRef, UploadSource,
};
pub use state::{
    CancelOutcome, FileTransferCoordinator, ListingTarget, RemoteFileBrowserStore,
    TransferBatch,
};
