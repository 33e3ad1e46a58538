// ==========================================
// 表格批量导入引擎 - 存储盘
// ==========================================
// 职责: 根据存储盘名 + 文件引用定位可读取的表格文件
// - 本地盘: 解析为文件路径，直接按路径读取
// - 远程盘: 读取字节后在内存中解码
// ==========================================

use crate::importer::error::{ImportError, ImportResult};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

// ==========================================
// Disk Trait
// ==========================================
pub trait Disk: Send + Sync {
    /// 是否远程盘（远程盘不提供本地路径）
    fn is_remote(&self) -> bool;

    /// 文件引用对应的本地路径
    fn path(&self, reference: &str) -> PathBuf;

    /// 读取文件全部字节
    fn read(&self, reference: &str) -> ImportResult<Vec<u8>>;
}

// ==========================================
// LocalDisk - 本地目录
// ==========================================
#[derive(Debug, Clone)]
pub struct LocalDisk {
    root: PathBuf,
}

impl LocalDisk {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl Disk for LocalDisk {
    fn is_remote(&self) -> bool {
        false
    }

    fn path(&self, reference: &str) -> PathBuf {
        let reference = Path::new(reference);
        if reference.is_absolute() {
            reference.to_path_buf()
        } else {
            self.root.join(reference)
        }
    }

    fn read(&self, reference: &str) -> ImportResult<Vec<u8>> {
        let path = self.path(reference);
        if !path.exists() {
            return Err(ImportError::FileNotFound(path.display().to_string()));
        }
        Ok(std::fs::read(path)?)
    }
}

// ==========================================
// MemoryDisk - 内存文件（按远程盘处理）
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct MemoryDisk {
    files: HashMap<String, Vec<u8>>,
}

impl MemoryDisk {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(mut self, reference: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        self.files.insert(reference.into(), bytes.into());
        self
    }
}

impl Disk for MemoryDisk {
    fn is_remote(&self) -> bool {
        true
    }

    fn path(&self, reference: &str) -> PathBuf {
        PathBuf::from(reference)
    }

    fn read(&self, reference: &str) -> ImportResult<Vec<u8>> {
        self.files
            .get(reference)
            .cloned()
            .ok_or_else(|| ImportError::FileNotFound(reference.to_string()))
    }
}

// ==========================================
// DiskRegistry - 存储盘注册表
// ==========================================
#[derive(Clone, Default)]
pub struct DiskRegistry {
    disks: HashMap<String, Arc<dyn Disk>>,
}

impl fmt::Debug for DiskRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&String> = self.disks.keys().collect();
        names.sort();
        f.debug_struct("DiskRegistry").field("disks", &names).finish()
    }
}

impl DiskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 仅注册 "local" 本地盘
    pub fn local(root: impl Into<PathBuf>) -> Self {
        Self::new().with_disk("local", LocalDisk::new(root))
    }

    pub fn with_disk(mut self, name: impl Into<String>, disk: impl Disk + 'static) -> Self {
        self.disks.insert(name.into(), Arc::new(disk));
        self
    }

    pub fn get(&self, name: &str) -> ImportResult<&dyn Disk> {
        self.disks
            .get(name)
            .map(|disk| disk.as_ref())
            .ok_or_else(|| ImportError::DiskNotFound(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_local_disk_resolves_relative_reference() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("a.csv"), "x,y\n").unwrap();

        let disk = LocalDisk::new(dir.path());
        assert!(!disk.is_remote());
        assert_eq!(disk.path("a.csv"), dir.path().join("a.csv"));
        assert_eq!(disk.read("a.csv").unwrap(), b"x,y\n");
        assert!(matches!(
            disk.read("missing.csv"),
            Err(ImportError::FileNotFound(_))
        ));
    }

    #[test]
    fn test_registry_unknown_disk() {
        let registry = DiskRegistry::local(".").with_disk("s3", MemoryDisk::new());
        assert!(registry.get("local").is_ok());
        assert!(registry.get("s3").unwrap().is_remote());
        assert!(matches!(
            registry.get("ftp"),
            Err(ImportError::DiskNotFound(_))
        ));
    }
}
