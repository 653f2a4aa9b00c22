use serde::{Deserialize, Serialize};
use serde_json::Value;

/// 子宇宙 Sharpe 由服务端以 check 的形式返回
pub const SUB_UNIVERSE_CHECK: &str = "LOW_SUB_UNIVERSE_SHARPE";

/// 服务端返回的单项检查
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NamedCheck {
    pub name: String,
    pub result: Option<String>,
    pub value: Option<f64>,
    pub limit: Option<f64>,
}

/// IS 阶段指标快照
///
/// 核心指标为固定字段；服务端新增的检查项统一放在 `checks` 中。
/// `margin` 即 IC Mean。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSnapshot {
    pub sharpe: Option<f64>,
    pub fitness: Option<f64>,
    pub turnover: Option<f64>,
    pub margin: Option<f64>,
    pub returns: Option<f64>,
    pub drawdown: Option<f64>,
    pub capacity: Option<f64>,
    pub pnl: Option<f64>,
    pub long_count: Option<i64>,
    pub short_count: Option<i64>,
    #[serde(default)]
    pub checks: Vec<NamedCheck>,
}

fn number(v: Option<&Value>) -> Option<f64> {
    let x = match v? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    x.filter(|x| x.is_finite())
}

impl MetricsSnapshot {
    /// 从详情资源的 `is` 对象解析；无法解析的字段按缺失处理
    pub fn from_is_value(is: &Value) -> Self {
        let Some(obj) = is.as_object() else {
            return Self::default();
        };

        let checks = obj
            .get("checks")
            .and_then(|c| c.as_array())
            .map(|arr| {
                arr.iter()
                    .filter_map(|c| {
                        let name = c.get("name")?.as_str()?.to_string();
                        Some(NamedCheck {
                            name,
                            result: c
                                .get("result")
                                .and_then(|r| r.as_str())
                                .map(|s| s.to_string()),
                            value: number(c.get("value")),
                            limit: number(c.get("limit")),
                        })
                    })
                    .collect()
            })
            .unwrap_or_default();

        Self {
            sharpe: number(obj.get("sharpe")),
            fitness: number(obj.get("fitness")),
            turnover: number(obj.get("turnover")),
            margin: number(obj.get("margin")),
            returns: number(obj.get("returns")),
            drawdown: number(obj.get("drawdown")),
            capacity: number(obj.get("capacity")),
            pnl: number(obj.get("pnl")),
            long_count: number(obj.get("longCount")).map(|v| v as i64),
            short_count: number(obj.get("shortCount")).map(|v| v as i64),
            checks,
        }
    }

    /// 没有任何指标数据
    pub fn is_empty(&self) -> bool {
        self.sharpe.is_none()
            && self.fitness.is_none()
            && self.turnover.is_none()
            && self.margin.is_none()
            && self.returns.is_none()
            && self.drawdown.is_none()
            && self.capacity.is_none()
            && self.checks.is_empty()
    }

    pub fn check(&self, name: &str) -> Option<&NamedCheck> {
        self.checks.iter().find(|c| c.name == name)
    }

    /// (value, limit)；limit 缺失时按 0 处理
    pub fn sub_universe_sharpe(&self) -> Option<(f64, f64)> {
        let check = self.check(SUB_UNIVERSE_CHECK)?;
        Some((check.value?, check.limit.unwrap_or(0.0)))
    }

    /// 核心八项之外的检查，只用于日志
    pub fn extra_checks(&self) -> impl Iterator<Item = &NamedCheck> {
        self.checks.iter().filter(|c| c.name != SUB_UNIVERSE_CHECK)
    }
}
