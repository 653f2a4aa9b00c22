use chrono::{DateTime, Utc};
use log::warn;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// 固定的模拟设置，字段名与服务端保持一致（camelCase）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationSettings {
    pub instrument_type: String,
    pub region: String,
    pub universe: String,
    pub delay: i32,
    pub decay: i32,
    pub neutralization: String,
    pub truncation: f64,
    pub pasteurization: String,
    pub unit_handling: String,
    pub nan_handling: String,
    pub language: String,
    pub visualization: bool,
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            instrument_type: "EQUITY".to_string(),
            region: "USA".to_string(),
            universe: "TOP3000".to_string(),
            delay: 1,
            decay: 0,
            neutralization: "SUBINDUSTRY".to_string(),
            truncation: 0.08,
            pasteurization: "ON".to_string(),
            unit_handling: "VERIFY".to_string(),
            nan_handling: "ON".to_string(),
            language: "FASTEXPR".to_string(),
            visualization: false,
        }
    }
}

impl SimulationSettings {
    /// 构造 POST /simulations 的请求体
    pub fn payload(&self, expression: &str) -> Value {
        serde_json::json!({
            "type": "REGULAR",
            "settings": self,
            "regular": expression,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Submitted,
    Accepted,
    Polling,
    Completed,
    Rejected,
    Failed,
}

impl JobState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Rejected | Self::Failed)
    }

    fn can_move_to(self, next: JobState) -> bool {
        use JobState::*;
        matches!(
            (self, next),
            (Submitted, Accepted)
                | (Submitted, Rejected)
                | (Submitted, Failed)
                | (Accepted, Polling)
                | (Accepted, Failed)
                | (Polling, Polling)
                | (Polling, Completed)
                | (Polling, Rejected)
                | (Polling, Failed)
        )
    }
}

/// 单个候选的模拟任务，只在编排器处理该候选期间存在
#[derive(Debug, Clone)]
pub struct SimulationJob {
    pub expression: String,
    pub settings: SimulationSettings,
    pub progress_location: Option<String>,
    pub alpha_id: Option<String>,
    pub state: JobState,
    pub submitted_at: DateTime<Utc>,
    pub polls: u32,
}

impl SimulationJob {
    pub fn new(expression: impl Into<String>, settings: SimulationSettings) -> Self {
        Self {
            expression: expression.into(),
            settings,
            progress_location: None,
            alpha_id: None,
            state: JobState::Submitted,
            submitted_at: Utc::now(),
            polls: 0,
        }
    }

    /// 状态流转；非法流转忽略并记日志，返回是否生效
    pub fn advance(&mut self, next: JobState) -> bool {
        if self.state.can_move_to(next) {
            self.state = next;
            true
        } else {
            warn!(
                "忽略非法状态流转 {:?} -> {:?}: {}",
                self.state, next, self.expression
            );
            false
        }
    }

    pub fn accept(&mut self, location: String) {
        if self.advance(JobState::Accepted) {
            self.progress_location = Some(location);
        }
    }

    pub fn complete(&mut self, alpha_id: String) {
        if self.advance(JobState::Completed) {
            self.alpha_id = Some(alpha_id);
        }
    }
}
