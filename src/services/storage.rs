// 本地设置持久化服务

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use crate::constants::{CONFIG_DIR_NAME, SETTINGS_FILE_NAME};
use crate::models::BrowserSettings;

/// 获取配置目录路径
/// macOS: ~/Library/Application Support/remote-file-browser
/// Linux: ~/.config/remote-file-browser
/// Windows: C:\Users\<用户名>\AppData\Roaming\remote-file-browser
pub fn get_config_dir() -> Result<PathBuf> {
    let config_dir = dirs::config_dir()
        .context("无法获取系统配置目录")?
        .join(CONFIG_DIR_NAME);
    if !config_dir.exists() {
        fs::create_dir_all(&config_dir).context("无法创建配置目录")?;
    }
    Ok(config_dir)
}

/// 获取设置配置文件路径
pub fn get_settings_file() -> Result<PathBuf> {
    Ok(get_config_dir()?.join(SETTINGS_FILE_NAME))
}

/// 加载浏览器设置
pub fn load_settings() -> Result<BrowserSettings> {
    load_settings_from(&get_settings_file()?)
}

/// 保存浏览器设置
pub fn save_settings(settings: &BrowserSettings) -> Result<()> {
    save_settings_to(&get_settings_file()?, settings)
}

/// 从指定文件加载设置（文件不存在时返回默认值）
pub fn load_settings_from(path: &Path) -> Result<BrowserSettings> {
    if !path.exists() {
        return Ok(BrowserSettings::default());
    }
    let content = fs::read_to_string(path).context("无法读取设置配置文件")?;
    let settings: BrowserSettings =
        serde_json::from_str(&content).context("无法解析设置配置文件")?;
    Ok(settings)
}

/// 保存设置到指定文件
pub fn save_settings_to(path: &Path, settings: &BrowserSettings) -> Result<()> {
    let content = serde_json::to_string_pretty(settings).context("无法序列化设置配置")?;
    fs::write(path, content).context("无法写入设置配置文件")?;
    Ok(())
}

/// 记录最后浏览的路径（仅在开启路径记忆时写入）
pub fn update_last_path_in(path: &Path, last_path: &str) -> Result<()> {
    let mut settings = load_settings_from(path)?;
    if settings.remember_last_path {
        settings.last_path = Some(last_path.to_string());
        save_settings_to(path, &settings)?;
    }
    Ok(())
}
