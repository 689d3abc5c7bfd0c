// 文件浏览器数据模型

pub mod operation;
pub mod state;
pub mod types;

pub use operation::{
    DownloadArtifact, OperationId, OperationKind, OperationRecord, OperationStatus,
    OperationTargets, UploadTarget,
};
pub use state::{BrowserState, BrowserStatus};
pub use types::{DirectoryListing, FileEntry, FileKind, NavigationHistory};
