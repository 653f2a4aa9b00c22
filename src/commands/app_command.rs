use crate::generate::Mode;
use crate::storage::HistoryFilter;
use std::str::FromStr;

pub const DEFAULT_SUBMIT_COUNT: usize = 2;
pub const DEFAULT_HISTORY_LIMIT: usize = 20;

pub const USAGE: &str = "\
用法:
  simulate <mode> [dataset]          生成一批候选并逐个模拟
  evolve <rounds> [mode] [dataset]   首轮按模式生成，之后按历史结果变异
  submit [n]                         提交 ledger 中前 n 个 alpha (默认 2)
  auto <mode> [dataset]              模拟后自动提交 2 个
  history [all|passed|failed] [limit]
  history clear
  stats
  help";

#[derive(Debug, Clone, PartialEq)]
pub enum AppCommand {
    Simulate {
        mode: Mode,
        dataset: Option<String>,
    },
    Evolve {
        rounds: usize,
        mode: Mode,
        dataset: Option<String>,
    },
    Submit {
        count: usize,
    },
    Auto {
        mode: Mode,
        dataset: Option<String>,
    },
    History {
        filter: HistoryFilter,
        limit: usize,
    },
    HistoryClear,
    Stats,
    Help,
    Unknown(String),
}

impl AppCommand {
    /// 是否需要登录平台
    pub fn needs_session(&self) -> bool {
        matches!(
            self,
            Self::Simulate { .. } | Self::Evolve { .. } | Self::Submit { .. } | Self::Auto { .. }
        )
    }
}

impl FromStr for AppCommand {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split_whitespace().collect();
        if parts.is_empty() {
            return Ok(AppCommand::Help);
        }

        match parts[0] {
            "simulate" | "sim" => match parts.get(1).map(|m| m.parse::<Mode>()) {
                Some(Ok(mode)) => Ok(AppCommand::Simulate {
                    mode,
                    dataset: parts.get(2).map(|s| s.to_string()),
                }),
                Some(Err(e)) => Ok(AppCommand::Unknown(e)),
                None => Ok(AppCommand::Unknown("用法: simulate <mode> [dataset]".to_string())),
            },
            "evolve" => {
                let Some(rounds) = parts.get(1).and_then(|s| s.parse::<usize>().ok()) else {
                    return Ok(AppCommand::Unknown(
                        "用法: evolve <rounds> [mode] [dataset]".to_string(),
                    ));
                };
                let mode = match parts.get(2).map(|m| m.parse::<Mode>()) {
                    Some(Ok(mode)) => mode,
                    Some(Err(e)) => return Ok(AppCommand::Unknown(e)),
                    None => Mode::Basic,
                };
                Ok(AppCommand::Evolve {
                    rounds,
                    mode,
                    dataset: parts.get(3).map(|s| s.to_string()),
                })
            }
            "submit" => match parts.get(1) {
                None => Ok(AppCommand::Submit {
                    count: DEFAULT_SUBMIT_COUNT,
                }),
                Some(n) => match n.parse::<usize>() {
                    Ok(count) if count > 0 => Ok(AppCommand::Submit { count }),
                    _ => Ok(AppCommand::Unknown("用法: submit [n]，n 为正整数".to_string())),
                },
            },
            "auto" => match parts.get(1).map(|m| m.parse::<Mode>()) {
                Some(Ok(mode)) => Ok(AppCommand::Auto {
                    mode,
                    dataset: parts.get(2).map(|s| s.to_string()),
                }),
                Some(Err(e)) => Ok(AppCommand::Unknown(e)),
                None => Ok(AppCommand::Unknown("用法: auto <mode> [dataset]".to_string())),
            },
            "history" => {
                if parts.get(1) == Some(&"clear") {
                    return Ok(AppCommand::HistoryClear);
                }
                let mut filter = HistoryFilter::All;
                let mut limit = DEFAULT_HISTORY_LIMIT;
                for tok in &parts[1..] {
                    if let Ok(n) = tok.parse::<usize>() {
                        limit = n;
                    } else {
                        match tok.parse::<HistoryFilter>() {
                            Ok(f) => filter = f,
                            Err(e) => return Ok(AppCommand::Unknown(e)),
                        }
                    }
                }
                Ok(AppCommand::History { filter, limit })
            }
            "stats" => Ok(AppCommand::Stats),
            "help" | "h" => Ok(AppCommand::Help),
            _ => Ok(AppCommand::Unknown(format!("未知命令: {}", parts[0]))),
        }
    }
}
