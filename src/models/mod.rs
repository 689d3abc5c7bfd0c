// 数据模型模块

pub mod browser;
pub mod settings;

pub use settings::BrowserSettings;
