use crate::error::{Result, WqbError};
use crate::generate::generator::{self, dedup};
use crate::generate::performance::StrategyPerformance;
use crate::storage::HistoryRecord;
use log::info;
use regex::{NoExpand, Regex};

#[derive(Debug, Clone)]
pub struct MutationConfig {
    /// 单批候选上限
    pub batch_cap: usize,
    /// 窗口参数的候选取值
    pub window_alternates: Vec<u32>,
    /// 每个表达式最多改写的不同窗口数
    pub max_windows: usize,
    /// 字段替换时使用目录前几个字段
    pub substitution_fields: usize,
}

impl Default for MutationConfig {
    fn default() -> Self {
        Self {
            batch_cap: 100,
            window_alternates: vec![5, 10, 20, 60],
            max_windows: 2,
            substitution_fields: 3,
        }
    }
}

/// 基于历史结果派生新一批候选
pub struct MutationEngine {
    config: MutationConfig,
    window_re: Regex,
    /// 依次尝试的可替换基础字段
    base_tokens: Vec<Regex>,
}

impl MutationEngine {
    pub fn new(config: MutationConfig) -> Result<Self> {
        let compile = |p: &str| {
            Regex::new(p).map_err(|e| WqbError::Config(format!("正则编译失败 {}: {}", p, e)))
        };
        Ok(Self {
            config,
            window_re: compile(r", (\d+)\)")?,
            base_tokens: vec![compile(r"\bclose\b")?, compile(r"\bvolume\b")?],
        })
    }

    pub fn config(&self) -> &MutationConfig {
        &self.config
    }

    pub fn mutate(
        &self,
        fields: &[String],
        prior: &[HistoryRecord],
        performance: &mut StrategyPerformance,
    ) -> Vec<String> {
        let (qualified, failed): (Vec<&HistoryRecord>, Vec<&HistoryRecord>) =
            prior.iter().partition(|r| r.qualified);

        let mut out = Vec::new();
        for record in &qualified {
            performance.record(&record.expression, record.metrics.clone());
            out.extend(self.parameter_variants(&record.expression));
            out.extend(self.field_variants(&record.expression, fields));
        }
        let derived = out.len();

        if failed.len() > qualified.len() {
            out.extend(generator::innovative(fields));
        }
        out.extend(generator::exploration(fields));
        out.extend(generator::classic(fields));
        out.extend(generator::combined(fields));

        if out.len() < 5 {
            out.extend(generator::basic(fields));
        }
        if out.is_empty() {
            out = generator::basic(fields);
        }

        let mut out = dedup(out);
        out.truncate(self.config.batch_cap);
        info!(
            "🧬 变异生成: 合格 {} / 不合格 {}，派生 {}，最终 {} 个候选",
            qualified.len(),
            failed.len(),
            derived,
            out.len()
        );
        out
    }

    /// 改写表达式中的窗口长度 `, N)`
    pub fn parameter_variants(&self, base: &str) -> Vec<String> {
        let mut windows: Vec<u32> = Vec::new();
        for cap in self.window_re.captures_iter(base) {
            if let Some(n) = cap.get(1).and_then(|m| m.as_str().parse::<u32>().ok()) {
                if !windows.contains(&n) {
                    windows.push(n);
                }
            }
            if windows.len() >= self.config.max_windows {
                break;
            }
        }

        let mut out = Vec::new();
        for n in windows {
            let from = format!(", {})", n);
            for alt in self.config.window_alternates.iter().filter(|a| **a != n) {
                out.push(base.replace(&from, &format!(", {})", alt)));
            }
        }
        out
    }

    /// 把基础字段 close（否则 volume）替换为目录中的前几个字段
    pub fn field_variants(&self, base: &str, fields: &[String]) -> Vec<String> {
        let Some(re) = self.base_tokens.iter().find(|re| re.is_match(base)) else {
            return Vec::new();
        };
        fields
            .iter()
            .take(self.config.substitution_fields)
            .map(|f| re.replace_all(base, NoExpand(f)).into_owned())
            .filter(|v| v != base)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::qualify::QualificationTier;
    use crate::simulation::metrics::MetricsSnapshot;
    use chrono::Utc;

    fn engine() -> MutationEngine {
        MutationEngine::new(MutationConfig::default()).unwrap()
    }

    fn fields(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    fn record(expr: &str, qualified: bool) -> HistoryRecord {
        HistoryRecord {
            alpha_id: format!("id-{}", expr),
            expression: expr.to_string(),
            qualified,
            tier: if qualified {
                QualificationTier::Strict
            } else {
                QualificationTier::Rejected
            },
            metrics: MetricsSnapshot {
                sharpe: Some(if qualified { 2.0 } else { 0.2 }),
                ..Default::default()
            },
            submitted_at: Utc::now(),
            saved_at: None,
        }
    }

    #[test]
    fn windows_are_swapped_for_alternates() {
        let v = engine().parameter_variants("ts_rank(close/delay(close, 5), 10)");
        assert!(v.contains(&"ts_rank(close/delay(close, 5), 20)".to_string()));
        assert!(v.contains(&"ts_rank(close/delay(close, 10), 10)".to_string()));
        // 两个窗口，每个 3 个备选
        assert_eq!(v.len(), 6);
    }

    #[test]
    fn at_most_two_distinct_windows() {
        let v = engine().parameter_variants("f(a, 5) + g(b, 20) + h(c, 60) + k(d, 5)");
        assert_eq!(v.len(), 6);
        assert!(!v.iter().any(|e| e.contains("h(c, 5)")));
    }

    #[test]
    fn field_substitution_respects_word_boundaries() {
        let e = engine();
        let v = e.field_variants(
            "rank(close) - rank(close_adj)",
            &fields(&["vwap", "cap", "sales", "ignored"]),
        );
        assert_eq!(
            v,
            vec![
                "rank(vwap) - rank(close_adj)",
                "rank(cap) - rank(close_adj)",
                "rank(sales) - rank(close_adj)",
            ]
        );

        let v = e.field_variants("ts_rank(volume, 10)", &fields(&["volume", "vwap"]));
        assert_eq!(v, vec!["ts_rank(vwap, 10)"]);

        assert!(e.field_variants("rank(cap)", &fields(&["vwap"])).is_empty());
    }

    #[test]
    fn mostly_qualified_priors_exceed_basic_floor() {
        let priors: Vec<HistoryRecord> = (0..9)
            .map(|i| record(&format!("ts_rank(close, {})", 10 + i), true))
            .chain(std::iter::once(record("rank(open)", false)))
            .collect();
        let f = fields(&["close", "volume", "vwap"]);
        let mut perf = StrategyPerformance::new();
        let out = engine().mutate(&f, &priors, &mut perf);

        assert!(out.len() >= 5);
        assert_ne!(out, generator::basic(&f));
        assert!(out.contains(&"ts_rank(close, 5)".to_string()));
        assert_eq!(perf.len(), 9);
        let uniq: std::collections::HashSet<_> = out.iter().collect();
        assert_eq!(uniq.len(), out.len());
    }

    #[test]
    fn failures_add_innovative_set() {
        let f = fields(&["close", "vwap"]);
        let priors = vec![record("a", false), record("b", false)];
        let out = engine().mutate(&f, &priors, &mut StrategyPerformance::new());
        assert!(out.contains(&"sign(close) * log(abs(close + 1))".to_string()));

        let balanced = vec![record("rank(close)", true), record("b", false)];
        let out = engine().mutate(&f, &balanced, &mut StrategyPerformance::new());
        assert!(!out.contains(&"sign(close) * log(abs(close + 1))".to_string()));
    }

    #[test]
    fn output_is_capped_in_generation_order() {
        let f = fields(&["close", "volume", "vwap"]);
        let priors = vec![record("ts_rank(close, 10)", true)];
        let engine = MutationEngine::new(MutationConfig {
            batch_cap: 4,
            ..Default::default()
        })
        .unwrap();
        let out = engine.mutate(&f, &priors, &mut StrategyPerformance::new());
        assert_eq!(
            out,
            vec![
                "ts_rank(close, 5)",
                "ts_rank(close, 20)",
                "ts_rank(close, 60)",
                "ts_rank(volume, 10)",
            ]
        );
    }

    #[test]
    fn never_empty_even_without_fields_or_history() {
        let out = engine().mutate(&[], &[], &mut StrategyPerformance::new());
        assert!(!out.is_empty());
    }
}
