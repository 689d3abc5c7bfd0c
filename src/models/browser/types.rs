// 文件浏览器基础数据类型

use std::cmp::Ordering;
use std::collections::HashSet;

use chrono::{DateTime, Utc};

use super::state::{is_valid_entry_name, join_path};

/// 条目类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FileKind {
    /// 普通文件
    #[default]
    File,
    /// 目录
    Directory,
    /// 符号链接
    Symlink,
}

/// 远程文件条目
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    /// 文件名（不含路径分隔符）
    pub name: String,
    /// 完整路径
    pub path: String,
    /// 条目类型
    pub kind: FileKind,
    /// 文件大小（字节，仅对普通文件有意义）
    pub size: u64,
    /// 修改时间
    pub modified_at: DateTime<Utc>,
}

impl FileEntry {
    /// 在父目录下创建条目，路径由父目录和文件名拼接
    pub fn new(parent: &str, name: impl Into<String>, kind: FileKind) -> Self {
        let name = name.into();
        Self {
            path: join_path(parent, &name),
            name,
            kind,
            size: 0,
            modified_at: Utc::now(),
        }
    }

    /// 创建普通文件条目
    pub fn file(parent: &str, name: impl Into<String>, size: u64) -> Self {
        let mut entry = Self::new(parent, name, FileKind::File);
        entry.size = size;
        entry
    }

    /// 创建目录条目
    pub fn dir(parent: &str, name: impl Into<String>) -> Self {
        Self::new(parent, name, FileKind::Directory)
    }

    /// 是否是目录
    pub fn is_dir(&self) -> bool {
        self.kind == FileKind::Directory
    }

    /// 是否是隐藏文件（以 . 开头）
    pub fn is_hidden(&self) -> bool {
        self.name.starts_with('.')
    }

    /// 获取文件扩展名
    pub fn extension(&self) -> Option<&str> {
        if self.is_dir() {
            return None;
        }
        self.name.rsplit('.').next().filter(|ext| *ext != self.name)
    }

    /// 格式化文件大小
    pub fn format_size(&self) -> String {
        if self.kind != FileKind::File {
            return "-".to_string();
        }

        let size = self.size as f64;
        if size >= 1_073_741_824.0 {
            format!("{:.1} GB", size / 1_073_741_824.0)
        } else if size >= 1_048_576.0 {
            format!("{:.1} MB", size / 1_048_576.0)
        } else if size >= 1_024.0 {
            format!("{:.1} KB", size / 1_024.0)
        } else {
            format!("{} B", self.size)
        }
    }
}

/// 列表排序：目录在前，其余在后；组内按名称不区分大小写排序
fn compare_entries(a: &FileEntry, b: &FileEntry) -> Ordering {
    b.is_dir()
        .cmp(&a.is_dir())
        .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
        .then_with(|| a.name.cmp(&b.name))
}

/// 某一时刻某个目录的内容快照
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryListing {
    /// 目录路径
    pub path: String,
    /// 已排序的条目
    pub entries: Vec<FileEntry>,
    /// 获取时间
    pub fetched_at: DateTime<Utc>,
}

impl DirectoryListing {
    /// 创建列表（立即排序）
    pub fn new(path: impl Into<String>, entries: Vec<FileEntry>) -> Self {
        let mut listing = Self {
            path: path.into(),
            entries,
            fetched_at: Utc::now(),
        };
        listing.entries.sort_by(compare_entries);
        listing
    }

    /// 以请求路径为准整理网关返回的列表
    ///
    /// 丢弃非法文件名，按 `目录 + "/" + 文件名` 重建路径，按路径去重后排序
    pub(crate) fn normalized(self, requested_path: &str) -> Self {
        let mut seen = HashSet::new();
        let entries = self
            .entries
            .into_iter()
            .filter(|e| is_valid_entry_name(&e.name))
            .map(|mut e| {
                e.path = join_path(requested_path, &e.name);
                e
            })
            .filter(|e| seen.insert(e.path.clone()))
            .collect();

        let mut listing = Self {
            path: requested_path.to_string(),
            entries,
            fetched_at: self.fetched_at,
        };
        listing.entries.sort_by(compare_entries);
        listing
    }

    /// 列表中是否包含路径
    pub fn contains(&self, path: &str) -> bool {
        self.entries.iter().any(|e| e.path == path)
    }

    /// 按路径查找条目
    pub fn get(&self, path: &str) -> Option<&FileEntry> {
        self.entries.iter().find(|e| e.path == path)
    }

    /// 所有条目路径
    pub fn paths(&self) -> HashSet<&str> {
        self.entries.iter().map(|e| e.path.as_str()).collect()
    }

    /// 列表年龄（秒）
    pub fn age_secs(&self) -> i64 {
        (Utc::now() - self.fetched_at).num_seconds()
    }
}

/// 导航历史
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NavigationHistory {
    /// 后退栈
    pub back_stack: Vec<String>,
    /// 前进栈
    pub forward_stack: Vec<String>,
}

impl NavigationHistory {
    /// 是否可以后退
    pub fn can_go_back(&self) -> bool {
        !self.back_stack.is_empty()
    }

    /// 是否可以前进
    pub fn can_go_forward(&self) -> bool {
        !self.forward_stack.is_empty()
    }

    /// 记录导航（清除前进栈）
    pub fn push(&mut self, path: String) {
        self.back_stack.push(path);
        self.forward_stack.clear();
    }

    /// 执行后退
    pub fn go_back(&mut self, current_path: String) -> Option<String> {
        let prev = self.back_stack.pop()?;
        self.forward_stack.push(current_path);
        Some(prev)
    }

    /// 执行前进
    pub fn go_forward(&mut self, current_path: String) -> Option<String> {
        let next = self.forward_stack.pop()?;
        self.back_stack.push(current_path);
        Some(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_directories_sort_before_files() {
        let listing = DirectoryListing::new(
            "/var/www/app",
            vec![
                FileEntry::file("/var/www/app", "index.php", 512),
                FileEntry::dir("/var/www/app", "logs"),
            ],
        );
        let names: Vec<&str> = listing.entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["logs", "index.php"]);
        assert_eq!(listing.entries[1].path, "/var/www/app/index.php");
    }

    #[test]
    fn test_sort_is_case_insensitive_per_group() {
        let listing = DirectoryListing::new(
            "/",
            vec![
                FileEntry::file("/", "b.txt", 1),
                FileEntry::file("/", "A.txt", 1),
                FileEntry::new("/", "link", FileKind::Symlink),
                FileEntry::dir("/", "Zeta"),
                FileEntry::dir("/", "alpha"),
            ],
        );
        let names: Vec<&str> = listing.entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["alpha", "Zeta", "A.txt", "b.txt", "link"]);
    }

    #[test]
    fn test_normalized_rebuilds_paths_and_drops_bad_names() {
        let mut bogus = FileEntry::file("/elsewhere", "a.txt", 3);
        bogus.path = "/elsewhere/a.txt".to_string();
        let raw = DirectoryListing {
            path: "/srv/".to_string(),
            entries: vec![
                bogus.clone(),
                bogus,
                FileEntry::file("/srv", "x/y", 1),
                FileEntry::file("/srv", "", 1),
                FileEntry::dir("/srv", ".."),
            ],
            fetched_at: Utc::now(),
        };

        let listing = raw.normalized("/srv");
        assert_eq!(listing.path, "/srv");
        assert_eq!(listing.entries.len(), 1);
        assert_eq!(listing.entries[0].path, "/srv/a.txt");
        assert!(listing.contains("/srv/a.txt"));
    }

    #[test]
    fn test_format_size() {
        assert_eq!(FileEntry::file("/", "a", 512).format_size(), "512 B");
        assert_eq!(FileEntry::file("/", "a", 2048).format_size(), "2.0 KB");
        assert_eq!(FileEntry::dir("/", "d").format_size(), "-");
    }

    #[test]
    fn test_history_back_and_forward() {
        let mut history = NavigationHistory::default();
        history.push("/a".to_string());
        history.push("/b".to_string());

        assert_eq!(history.go_back("/c".to_string()), Some("/b".to_string()));
        assert!(history.can_go_forward());
        assert_eq!(history.go_forward("/b".to_string()), Some("/c".to_string()));

        history.push("/d".to_string());
        assert!(!history.can_go_forward());
    }
}
