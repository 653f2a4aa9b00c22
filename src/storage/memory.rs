use crate::error::Result;
use crate::storage::store::{HistoryFilter, HistoryRecord, HistoryStats, HistoryStore, Stamper};
use async_trait::async_trait;
use tokio::sync::RwLock;

/// 进程内历史存储，按写入顺序保存整条记录
#[derive(Debug, Default)]
pub struct MemoryHistoryStore {
    records: RwLock<Vec<HistoryRecord>>,
    stamper: Stamper,
}

impl MemoryHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl HistoryStore for MemoryHistoryStore {
    async fn append(&self, mut record: HistoryRecord) -> Result<HistoryRecord> {
        let mut records = self.records.write().await;
        record.saved_at = Some(self.stamper.next());
        records.retain(|r| r.alpha_id != record.alpha_id);
        records.push(record.clone());
        Ok(record)
    }

    async fn query(&self, filter: HistoryFilter, limit: usize) -> Result<Vec<HistoryRecord>> {
        let records = self.records.read().await;
        Ok(records
            .iter()
            .rev()
            .filter(|r| filter.matches(r))
            .take(limit)
            .cloned()
            .collect())
    }

    async fn statistics(&self) -> Result<HistoryStats> {
        let records = self.records.read().await;
        let succeeded = records.iter().filter(|r| r.qualified).count();
        Ok(HistoryStats::from_counts(
            records.len() as u64,
            succeeded as u64,
        ))
    }

    async fn clear(&self) -> Result<u64> {
        let mut records = self.records.write().await;
        let n = records.len() as u64;
        records.clear();
        Ok(n)
    }
}
