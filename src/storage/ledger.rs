use crate::error::Result;
use log::info;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

/// 合格 alpha id 台账，一行一个
#[derive(Debug)]
pub struct IdLedger {
    path: PathBuf,
    lock: Mutex<()>,
}

impl IdLedger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 文件不存在视为空台账
    pub async fn load(&self) -> Result<Vec<String>> {
        let _guard = self.lock.lock().await;
        self.read_ids().await
    }

    /// 追加一个 id，已存在时跳过；返回是否写入
    pub async fn append(&self, id: &str) -> Result<bool> {
        let id = id.trim();
        if id.is_empty() {
            return Ok(false);
        }
        let _guard = self.lock.lock().await;
        if self.read_ids().await?.iter().any(|x| x == id) {
            return Ok(false);
        }
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(format!("{}\n", id).as_bytes()).await?;
        file.flush().await?;
        info!("✓ 已记录 alpha id: {}", id);
        Ok(true)
    }

    /// 删除给定 id 并重写文件，返回剩余条数
    pub async fn remove(&self, ids: &[String]) -> Result<usize> {
        let _guard = self.lock.lock().await;
        let remaining: Vec<String> = self
            .read_ids()
            .await?
            .into_iter()
            .filter(|x| !ids.contains(x))
            .collect();
        let mut content = remaining.join("\n");
        if !content.is_empty() {
            content.push('\n');
        }
        tokio::fs::write(&self.path, content).await?;
        Ok(remaining.len())
    }

    async fn read_ids(&self) -> Result<Vec<String>> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => Ok(content
                .lines()
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .map(str::to_string)
                .collect()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }
}
