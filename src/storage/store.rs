use crate::error::Result;
use crate::qualify::{QualificationResult, QualificationTier};
use crate::simulation::metrics::MetricsSnapshot;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::atomic::{AtomicI64, Ordering};

/// 一次模拟的最终结果，按 alpha_id 唯一
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub alpha_id: String,
    pub expression: String,
    pub qualified: bool,
    pub tier: QualificationTier,
    pub metrics: MetricsSnapshot,
    pub submitted_at: DateTime<Utc>,
    /// 由存储在写入时盖章
    pub saved_at: Option<DateTime<Utc>>,
}

impl HistoryRecord {
    pub fn new(
        alpha_id: impl Into<String>,
        expression: impl Into<String>,
        verdict: &QualificationResult,
        metrics: MetricsSnapshot,
        submitted_at: DateTime<Utc>,
    ) -> Self {
        Self {
            alpha_id: alpha_id.into(),
            expression: expression.into(),
            qualified: verdict.qualified,
            tier: verdict.tier,
            metrics,
            submitted_at,
            saved_at: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum HistoryFilter {
    #[default]
    All,
    Passed,
    Failed,
}

impl HistoryFilter {
    pub fn matches(self, record: &HistoryRecord) -> bool {
        match self {
            Self::All => true,
            Self::Passed => record.qualified,
            Self::Failed => !record.qualified,
        }
    }
}

impl FromStr for HistoryFilter {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "all" => Ok(Self::All),
            "passed" | "pass" | "qualified" => Ok(Self::Passed),
            "failed" | "fail" => Ok(Self::Failed),
            other => Err(format!("未知的历史过滤条件: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HistoryStats {
    pub total: u64,
    pub succeeded: u64,
    pub success_rate: f64,
}

impl HistoryStats {
    pub fn from_counts(total: u64, succeeded: u64) -> Self {
        let success_rate = if total == 0 {
            0.0
        } else {
            succeeded as f64 / total as f64
        };
        Self {
            total,
            succeeded,
            success_rate,
        }
    }
}

/// 历史存储
///
/// 实现需支持并发追加与读取；同一 alpha_id 再次追加时整条替换。
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// 写入并返回带 `saved_at` 的记录
    async fn append(&self, record: HistoryRecord) -> Result<HistoryRecord>;

    /// 按写入时间倒序
    async fn query(&self, filter: HistoryFilter, limit: usize) -> Result<Vec<HistoryRecord>>;

    async fn statistics(&self) -> Result<HistoryStats>;

    /// 返回删除的条数
    async fn clear(&self) -> Result<u64>;
}

/// 单调递增的毫秒时间戳，保证同一存储内写入顺序可比较
#[derive(Debug, Default)]
pub(crate) struct Stamper {
    last: AtomicI64,
}

impl Stamper {
    pub fn next(&self) -> DateTime<Utc> {
        let now = Utc::now().timestamp_millis();
        let prev = self
            .last
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
                Some(now.max(last + 1))
            })
            .unwrap_or_else(|p| p);
        let stamp = now.max(prev + 1);
        DateTime::from_timestamp_millis(stamp).unwrap_or_else(Utc::now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stamps_are_strictly_increasing() {
        let s = Stamper::default();
        let a = s.next();
        let b = s.next();
        let c = s.next();
        assert!(a < b && b < c);
    }

    #[test]
    fn filter_parses_aliases() {
        assert_eq!("passed".parse::<HistoryFilter>(), Ok(HistoryFilter::Passed));
        assert_eq!("FAILED".parse::<HistoryFilter>(), Ok(HistoryFilter::Failed));
        assert_eq!("all".parse::<HistoryFilter>(), Ok(HistoryFilter::All));
        assert!("nope".parse::<HistoryFilter>().is_err());
    }

    #[test]
    fn stats_rate_handles_empty() {
        assert_eq!(HistoryStats::from_counts(0, 0).success_rate, 0.0);
        assert_eq!(HistoryStats::from_counts(4, 1).success_rate, 0.25);
    }
}
