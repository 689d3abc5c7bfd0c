// Settings 配置数据结构

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_COMPLETION_GRACE_MS, DEFAULT_CONCURRENT_TRANSFERS, MAX_CONCURRENT_TRANSFERS,
};

/// 文件浏览器设置（持久化用）
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BrowserSettings {
    // 传输
    pub concurrent_transfers: u32,
    /// 操作进入终态后在列表中保留的时间（毫秒）
    pub completion_grace_ms: u64,
    // 路径
    pub remember_last_path: bool,
    pub last_path: Option<String>,
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            concurrent_transfers: DEFAULT_CONCURRENT_TRANSFERS,
            completion_grace_ms: DEFAULT_COMPLETION_GRACE_MS,
            remember_last_path: false,
            last_path: None,
        }
    }
}

impl BrowserSettings {
    /// 并行传输数（限制在 1..=MAX_CONCURRENT_TRANSFERS）
    pub fn transfer_limit(&self) -> usize {
        self.concurrent_transfers.clamp(1, MAX_CONCURRENT_TRANSFERS) as usize
    }

    /// 终态记录保留时长
    pub fn completion_grace(&self) -> Duration {
        Duration::from_millis(self.completion_grace_ms)
    }

    /// 启动时应打开的路径（未开启记忆或未记录时使用文档根目录）
    pub fn start_path<'a>(&'a self, document_root: &'a str) -> &'a str {
        match (&self.last_path, self.remember_last_path) {
            (Some(path), true) if path.starts_with('/') => path.as_str(),
            _ => document_root,
        }
    }
}
