// 日志初始化

use tracing_subscriber::EnvFilter;

/// 初始化日志系统
///
/// 可以通过 RUST_LOG 环境变量控制日志级别，例如：RUST_LOG=remote_file_browser=debug；
/// 未设置时使用 info。已有全局 subscriber 时返回 false。
pub fn init() -> bool {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false) // 不显示 target（模块路径）
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    #[test]
    fn test_init_is_idempotent() {
        super::init();
        assert!(!super::init());
    }
}
