use serde::{Deserialize, Serialize};
use serde_json::Value;

/// 模拟进度资源：进行中只有 progress，完成后带 status/alpha
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct SimulationProgress {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub progress: Option<f64>,
    #[serde(default)]
    pub alpha: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl SimulationProgress {
    /// 引擎侧的终态错误
    pub fn is_engine_failure(&self) -> bool {
        matches!(
            self.status.as_deref(),
            Some("ERROR") | Some("FAIL") | Some("CANCELLED")
        )
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct AlphaDetailResponse {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub is: Option<Value>,
    #[serde(rename = "dateCreated", default)]
    pub date_created: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn progress_only_body_parses() {
        let p: SimulationProgress = serde_json::from_value(json!({"progress": 0.4})).unwrap();
        assert_eq!(p.progress, Some(0.4));
        assert!(p.alpha.is_none());
        assert!(!p.is_engine_failure());
    }

    #[test]
    fn error_status_is_engine_failure() {
        let p: SimulationProgress =
            serde_json::from_value(json!({"id": "S1", "status": "ERROR", "message": "bad"}))
                .unwrap();
        assert!(p.is_engine_failure());
    }

    #[test]
    fn detail_without_is_object() {
        let d: AlphaDetailResponse = serde_json::from_value(json!({"id": "A1"})).unwrap();
        assert!(d.is.is_none());
    }
}
