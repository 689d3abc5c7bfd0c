// 后端服务

pub mod gateway;
pub mod storage;

pub use gateway::{PathOutcome, ProgressFn, RemoteFileApiGateway, SiteRef, UploadSource};
