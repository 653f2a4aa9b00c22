use crate::error::{Result, WqbError};
use crate::generate::MutationConfig;
use crate::session::WQB_API_URL;
use crate::simulation::{OrchestratorConfig, SimulationSettings};
use crate::submission::SubmitPolicy;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_DATABASE_URL: &str = "sqlite://alpha_history.db?mode=rwc";
pub const DEFAULT_LEDGER_PATH: &str = "alpha_ids.txt";

/// 运行配置，全部来自环境变量（`.env` 由 main 预先加载）
#[derive(Debug, Clone)]
pub struct AppConfig {
    email: Option<String>,
    password: Option<String>,
    pub api_url: String,
    pub database_url: String,
    pub ledger_path: PathBuf,
    pub settings: SimulationSettings,
    pub orchestrator: OrchestratorConfig,
    pub submit: SubmitPolicy,
    pub mutation: MutationConfig,
    /// 非空时跳过 API 字段目录
    pub fields: Vec<String>,
    pub field_sample_size: usize,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// 以任意键值来源构造，空字符串视为未设置
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let defaults = SimulationSettings::default();
        let settings = SimulationSettings {
            region: get("WQB_REGION").unwrap_or(defaults.region.clone()),
            universe: get("WQB_UNIVERSE").unwrap_or(defaults.universe.clone()),
            delay: parse_or(&get, "WQB_DELAY", defaults.delay)?,
            decay: parse_or(&get, "WQB_DECAY", defaults.decay)?,
            neutralization: get("WQB_NEUTRALIZATION").unwrap_or(defaults.neutralization.clone()),
            truncation: parse_or(&get, "WQB_TRUNCATION", defaults.truncation)?,
            ..defaults
        };

        let orch = OrchestratorConfig::default();
        let orchestrator = OrchestratorConfig {
            pacing: secs_or(&get, "SIM_PACING_SECS", orch.pacing)?,
            settle: secs_or(&get, "SIM_SETTLE_SECS", orch.settle)?,
        };

        let policy = SubmitPolicy::default();
        let submit = SubmitPolicy {
            max_attempts: parse_or(&get, "SUBMIT_MAX_ATTEMPTS", policy.max_attempts)?,
            backoff: secs_or(&get, "SUBMIT_BACKOFF_SECS", policy.backoff)?,
            pacing: secs_or(&get, "SUBMIT_PACING_SECS", policy.pacing)?,
            ..policy
        };
        if submit.max_attempts == 0 {
            return Err(WqbError::Config("SUBMIT_MAX_ATTEMPTS 不能为 0".to_string()));
        }

        let base = MutationConfig::default();
        let mutation = MutationConfig {
            batch_cap: parse_or(&get, "MUTATION_BATCH_CAP", base.batch_cap)?,
            ..base
        };

        Ok(Self {
            email: get("WQB_EMAIL"),
            password: get("WQB_PASSWORD"),
            api_url: get("WQB_API_URL").unwrap_or_else(|| WQB_API_URL.to_string()),
            database_url: get("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string()),
            ledger_path: PathBuf::from(
                get("ALPHA_LEDGER_PATH").unwrap_or_else(|| DEFAULT_LEDGER_PATH.to_string()),
            ),
            settings,
            orchestrator,
            submit,
            mutation,
            fields: get("FIELDS").map(|s| split_list(&s)).unwrap_or_default(),
            field_sample_size: parse_or(&get, "FIELD_SAMPLE_SIZE", 0usize)?,
        })
    }

    /// 只有访问平台的命令才需要凭据
    pub fn credentials(&self) -> Result<(&str, &str)> {
        match (self.email.as_deref(), self.password.as_deref()) {
            (Some(e), Some(p)) => Ok((e, p)),
            _ => Err(WqbError::Config(
                "未设置 WQB_EMAIL / WQB_PASSWORD".to_string(),
            )),
        }
    }
}

fn parse_or<T, G>(get: &G, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        None => Ok(default),
        Some(raw) => raw
            .parse()
            .map_err(|_| WqbError::Config(format!("{} 不是有效数值: {}", key, raw))),
    }
}

fn secs_or<G>(get: &G, key: &str, default: Duration) -> Result<Duration>
where
    G: Fn(&str) -> Option<String>,
{
    let secs: f64 = parse_or(get, key, default.as_secs_f64())?;
    Duration::try_from_secs_f64(secs)
        .map_err(|_| WqbError::Config(format!("{} 不是有效秒数: {}", key, secs)))
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
