// 默认值常量

/// 默认并行传输数
pub const DEFAULT_CONCURRENT_TRANSFERS: u32 = 4;
/// 并行传输数上限
pub const MAX_CONCURRENT_TRANSFERS: u32 = 16;
/// 终态操作保留时间（毫秒）
pub const DEFAULT_COMPLETION_GRACE_MS: u64 = 3_000;

/// 配置目录名
pub const CONFIG_DIR_NAME: &str = "remote-file-browser";
/// 设置文件名
pub const SETTINGS_FILE_NAME: &str = "settings.json";
