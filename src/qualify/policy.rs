use crate::simulation::metrics::MetricsSnapshot;
use log::info;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 八项核心指标
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CoreMetric {
    Sharpe,
    Fitness,
    Turnover,
    IcMean,
    SubUniverseSharpe,
    Returns,
    Drawdown,
    Capacity,
}

impl CoreMetric {
    pub const ALL: [CoreMetric; 8] = [
        CoreMetric::Sharpe,
        CoreMetric::Fitness,
        CoreMetric::Turnover,
        CoreMetric::IcMean,
        CoreMetric::SubUniverseSharpe,
        CoreMetric::Returns,
        CoreMetric::Drawdown,
        CoreMetric::Capacity,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Self::Sharpe => "Sharpe",
            Self::Fitness => "Fitness",
            Self::Turnover => "Turnover",
            Self::IcMean => "IC Mean",
            Self::SubUniverseSharpe => "子宇宙 Sharpe",
            Self::Returns => "收益率",
            Self::Drawdown => "最大回撤",
            Self::Capacity => "容量",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CheckTier {
    Pass,
    Near,
    Fail,
}

/// 单项阈值：严格线 + 宽松线
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Threshold {
    AtLeast { pass: f64, near: f64 },
    AtMost { pass: f64, near: f64 },
    Within { pass: (f64, f64), near: (f64, f64) },
}

impl Threshold {
    pub fn tier(&self, v: f64) -> CheckTier {
        let (pass, near) = match *self {
            Self::AtLeast { pass, near } => (v >= pass, v >= near),
            Self::AtMost { pass, near } => (v <= pass, v <= near),
            Self::Within { pass, near } => (
                v >= pass.0 && v <= pass.1,
                v >= near.0 && v <= near.1,
            ),
        };
        if pass {
            CheckTier::Pass
        } else if near {
            CheckTier::Near
        } else {
            CheckTier::Fail
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckOutcome {
    pub metric: CoreMetric,
    pub observed: Option<f64>,
    pub tier: CheckTier,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QualificationTier {
    /// 八项全部达到严格线
    Strict,
    /// 至少 75% 达到宽松线
    Relaxed,
    Rejected,
}

impl QualificationTier {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Strict => "STRICT",
            Self::Relaxed => "RELAXED",
            Self::Rejected => "REJECTED",
        }
    }
}

impl fmt::Display for QualificationTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QualificationTier {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "STRICT" => Ok(Self::Strict),
            "RELAXED" => Ok(Self::Relaxed),
            "REJECTED" => Ok(Self::Rejected),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualificationResult {
    pub qualified: bool,
    pub tier: QualificationTier,
    /// 达到严格线的项数
    pub passed: usize,
    /// 至少达到宽松线的项数（含严格通过）
    pub near_qualified: usize,
    pub checks: Vec<CheckOutcome>,
}

impl QualificationResult {
    fn rejected_empty() -> Self {
        Self {
            qualified: false,
            tier: QualificationTier::Rejected,
            passed: 0,
            near_qualified: 0,
            checks: CoreMetric::ALL
                .iter()
                .map(|&metric| CheckOutcome {
                    metric,
                    observed: None,
                    tier: CheckTier::Fail,
                })
                .collect(),
        }
    }
}

/// 资格判定策略
///
/// 唯一口径：至少 `relaxed_ratio` 比例的核心项达到宽松线即合格，
/// 八项全部达到严格线记为 Strict。额外的服务端检查不参与判定。
/// 某项指标缺失按该项不合格处理。
#[derive(Debug, Clone, PartialEq)]
pub struct QualificationPolicy {
    pub sharpe: Threshold,
    pub fitness: Threshold,
    pub turnover: Threshold,
    pub ic_mean: Threshold,
    /// 子宇宙 Sharpe 的宽松线 = limit 的该比例
    pub sub_universe_near_ratio: f64,
    pub returns: Threshold,
    pub drawdown: Threshold,
    pub capacity: Threshold,
    pub relaxed_ratio: f64,
}

impl Default for QualificationPolicy {
    fn default() -> Self {
        Self {
            sharpe: Threshold::AtLeast {
                pass: 1.5,
                near: 1.3,
            },
            fitness: Threshold::AtLeast {
                pass: 1.0,
                near: 0.8,
            },
            turnover: Threshold::Within {
                pass: (0.1, 0.9),
                near: (0.05, 0.95),
            },
            ic_mean: Threshold::AtLeast {
                pass: 0.02,
                near: 0.015,
            },
            sub_universe_near_ratio: 0.8,
            returns: Threshold::AtLeast {
                pass: 0.05,
                near: 0.03,
            },
            drawdown: Threshold::AtMost {
                pass: 0.5,
                near: 0.6,
            },
            capacity: Threshold::AtLeast {
                pass: 1_000_000.0,
                near: 500_000.0,
            },
            relaxed_ratio: 0.75,
        }
    }
}

impl QualificationPolicy {
    pub fn evaluate(&self, snapshot: &MetricsSnapshot) -> QualificationResult {
        if snapshot.is_empty() {
            return QualificationResult::rejected_empty();
        }

        let checks: Vec<CheckOutcome> = CoreMetric::ALL
            .iter()
            .map(|&metric| self.check(metric, snapshot))
            .collect();

        let total = checks.len();
        let passed = checks.iter().filter(|c| c.tier == CheckTier::Pass).count();
        let near_qualified = checks
            .iter()
            .filter(|c| c.tier != CheckTier::Fail)
            .count();

        let tier = if passed == total {
            QualificationTier::Strict
        } else if near_qualified as f64 >= self.relaxed_ratio * total as f64 {
            QualificationTier::Relaxed
        } else {
            QualificationTier::Rejected
        };

        QualificationResult {
            qualified: tier != QualificationTier::Rejected,
            tier,
            passed,
            near_qualified,
            checks,
        }
    }

    fn check(&self, metric: CoreMetric, m: &MetricsSnapshot) -> CheckOutcome {
        let (value, threshold) = match metric {
            CoreMetric::Sharpe => (m.sharpe, self.sharpe),
            CoreMetric::Fitness => (m.fitness, self.fitness),
            CoreMetric::Turnover => (m.turnover, self.turnover),
            CoreMetric::IcMean => (m.margin, self.ic_mean),
            CoreMetric::Returns => (m.returns, self.returns),
            CoreMetric::Drawdown => (m.drawdown, self.drawdown),
            CoreMetric::Capacity => (m.capacity, self.capacity),
            CoreMetric::SubUniverseSharpe => {
                // 宽松线 = limit - (1 - ratio)·|limit|
                let (observed, tier) = match m.sub_universe_sharpe() {
                    Some((value, limit)) => {
                        let near = limit - (1.0 - self.sub_universe_near_ratio) * limit.abs();
                        let t = Threshold::AtLeast { pass: limit, near };
                        (Some(value), t.tier(value))
                    }
                    None => (None, CheckTier::Fail),
                };
                return CheckOutcome {
                    metric,
                    observed,
                    tier,
                };
            }
        };
        CheckOutcome {
            metric,
            observed: value,
            tier: value.map_or(CheckTier::Fail, |v| threshold.tier(v)),
        }
    }
}

/// 使用默认策略判定
pub fn evaluate(snapshot: &MetricsSnapshot) -> QualificationResult {
    QualificationPolicy::default().evaluate(snapshot)
}

/// 打印判定明细（核心项 + 额外检查项）
pub fn log_result(expression: &str, snapshot: &MetricsSnapshot, result: &QualificationResult) {
    info!("📊 指标评估 [{}]", expression);
    for c in &result.checks {
        let mark = match c.tier {
            CheckTier::Pass => "✓",
            CheckTier::Near => "≈",
            CheckTier::Fail => "✗",
        };
        match c.observed {
            Some(v) => info!("  {} {}: {:.4}", mark, c.metric.label(), v),
            None => info!("  {} {}: 缺失", mark, c.metric.label()),
        }
    }
    for check in snapshot.extra_checks() {
        info!(
            "  · {}: {} (value: {:?}, limit: {:?})",
            check.name,
            check.result.as_deref().unwrap_or("N/A"),
            check.value,
            check.limit
        );
    }
    info!(
        "📋 最终评判: {} (严格 {}/8, 宽松 {}/8)",
        result.tier, result.passed, result.near_qualified
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::metrics::{NamedCheck, SUB_UNIVERSE_CHECK};

    fn strong() -> MetricsSnapshot {
        MetricsSnapshot {
            sharpe: Some(2.0),
            fitness: Some(1.2),
            turnover: Some(0.5),
            margin: Some(0.03),
            returns: Some(0.1),
            drawdown: Some(0.2),
            capacity: Some(2_000_000.0),
            checks: vec![NamedCheck {
                name: SUB_UNIVERSE_CHECK.to_string(),
                result: Some("PASS".to_string()),
                value: Some(1.0),
                limit: Some(0.5),
            }],
            ..Default::default()
        }
    }

    fn tier_of(result: &QualificationResult, metric: CoreMetric) -> CheckTier {
        result
            .checks
            .iter()
            .find(|c| c.metric == metric)
            .map(|c| c.tier)
            .unwrap()
    }

    #[test]
    fn all_pass_is_strict() {
        let r = evaluate(&strong());
        assert!(r.qualified);
        assert_eq!(r.tier, QualificationTier::Strict);
        assert_eq!(r.passed, 8);
        assert_eq!(r.near_qualified, 8);
    }

    #[test]
    fn two_near_pass_is_relaxed_qualified() {
        let mut m = strong();
        m.sharpe = Some(1.4);
        m.capacity = Some(600_000.0);
        let r = evaluate(&m);
        assert!(r.qualified);
        assert_eq!(r.tier, QualificationTier::Relaxed);
        assert_eq!(r.passed, 6);
        assert_eq!(r.near_qualified, 8);
        assert_eq!(tier_of(&r, CoreMetric::Sharpe), CheckTier::Near);
        assert_eq!(tier_of(&r, CoreMetric::Capacity), CheckTier::Near);
    }

    #[test]
    fn two_hard_failures_still_reach_relaxed_bound() {
        let mut m = strong();
        m.fitness = Some(0.1);
        m.returns = Some(-0.2);
        let r = evaluate(&m);
        assert_eq!(r.near_qualified, 6);
        assert!(r.qualified);
        assert_eq!(r.tier, QualificationTier::Relaxed);
    }

    #[test]
    fn three_hard_failures_reject() {
        let mut m = strong();
        m.sharpe = Some(0.2);
        m.turnover = Some(0.99);
        m.drawdown = Some(0.9);
        let r = evaluate(&m);
        assert!(!r.qualified);
        assert_eq!(r.tier, QualificationTier::Rejected);
        assert_eq!(r.near_qualified, 5);
    }

    #[test]
    fn empty_snapshot_is_never_qualified() {
        let r = evaluate(&MetricsSnapshot::default());
        assert!(!r.qualified);
        assert_eq!(r.checks.len(), 8);
        assert!(r.checks.iter().all(|c| c.tier == CheckTier::Fail));
    }

    #[test]
    fn missing_metric_counts_as_failure() {
        let mut m = strong();
        m.checks.clear();
        m.capacity = None;
        let r = evaluate(&m);
        assert_eq!(tier_of(&r, CoreMetric::SubUniverseSharpe), CheckTier::Fail);
        assert_eq!(tier_of(&r, CoreMetric::Capacity), CheckTier::Fail);
        assert_eq!(r.near_qualified, 6);
        assert!(r.qualified);
    }

    #[test]
    fn turnover_and_drawdown_bounds() {
        let p = QualificationPolicy::default();
        assert_eq!(p.turnover.tier(0.1), CheckTier::Pass);
        assert_eq!(p.turnover.tier(0.9), CheckTier::Pass);
        assert_eq!(p.turnover.tier(0.07), CheckTier::Near);
        assert_eq!(p.turnover.tier(0.93), CheckTier::Near);
        assert_eq!(p.turnover.tier(0.01), CheckTier::Fail);
        assert_eq!(p.drawdown.tier(0.5), CheckTier::Pass);
        assert_eq!(p.drawdown.tier(0.55), CheckTier::Near);
        assert_eq!(p.drawdown.tier(0.61), CheckTier::Fail);
    }

    #[test]
    fn sub_universe_near_is_eighty_percent_of_limit() {
        let mut m = strong();
        m.checks[0].value = Some(0.42);
        m.checks[0].limit = Some(0.5);
        let r = evaluate(&m);
        assert_eq!(tier_of(&r, CoreMetric::SubUniverseSharpe), CheckTier::Near);

        m.checks[0].value = Some(0.39);
        let r = evaluate(&m);
        assert_eq!(tier_of(&r, CoreMetric::SubUniverseSharpe), CheckTier::Fail);
    }

    #[test]
    fn failing_extra_check_does_not_flip_verdict() {
        let mut m = strong();
        m.checks.push(NamedCheck {
            name: "SELF_CORRELATION".to_string(),
            result: Some("FAIL".to_string()),
            value: Some(0.9),
            limit: Some(0.7),
        });
        let r = evaluate(&m);
        assert_eq!(r.tier, QualificationTier::Strict);
    }

    #[test]
    fn evaluation_is_deterministic() {
        let mut m = strong();
        m.fitness = Some(0.85);
        assert_eq!(evaluate(&m), evaluate(&m));
    }

    #[test]
    fn tier_round_trips_through_str() {
        for t in [
            QualificationTier::Strict,
            QualificationTier::Relaxed,
            QualificationTier::Rejected,
        ] {
            assert_eq!(t.as_str().parse::<QualificationTier>(), Ok(t));
        }
    }
}
