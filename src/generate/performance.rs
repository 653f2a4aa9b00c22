use crate::simulation::metrics::MetricsSnapshot;
use std::collections::HashMap;

/// 合格表达式的历史表现，由调用方持有并传给变异引擎
#[derive(Debug, Clone, Default)]
pub struct StrategyPerformance {
    metrics: HashMap<String, MetricsSnapshot>,
}

impl StrategyPerformance {
    pub fn new() -> Self {
        Self::default()
    }

    /// 同一表达式以最新一次为准
    pub fn record(&mut self, expression: &str, metrics: MetricsSnapshot) {
        self.metrics.insert(expression.to_string(), metrics);
    }

    pub fn get(&self, expression: &str) -> Option<&MetricsSnapshot> {
        self.metrics.get(expression)
    }

    pub fn len(&self) -> usize {
        self.metrics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }

    /// 按 Sharpe 降序，缺失 Sharpe 的排在最后
    pub fn top_by_sharpe(&self, n: usize) -> Vec<(&str, &MetricsSnapshot)> {
        let mut all: Vec<_> = self
            .metrics
            .iter()
            .map(|(e, m)| (e.as_str(), m))
            .collect();
        all.sort_by(|a, b| {
            let sa = a.1.sharpe.unwrap_or(f64::NEG_INFINITY);
            let sb = b.1.sharpe.unwrap_or(f64::NEG_INFINITY);
            sb.total_cmp(&sa).then_with(|| a.0.cmp(b.0))
        });
        all.truncate(n);
        all
    }
}
