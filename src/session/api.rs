use super::wqb_session::WQBSession;
use crate::error::Result;
use async_trait::async_trait;
use reqwest::Response;
use serde_json::Value;
use std::time::Duration;

/// 远端服务的一次结构化响应
///
/// `retry_after` 取自 Retry-After 头（秒，可为小数），缺省视为 0；
/// body 为空或不是 JSON 时为 `Value::Null`。
#[derive(Debug, Clone)]
pub struct ApiReply {
    pub status: u16,
    pub retry_after: f64,
    pub location: Option<String>,
    pub body: Value,
}

impl ApiReply {
    pub fn new(status: u16) -> Self {
        Self {
            status,
            retry_after: 0.0,
            location: None,
            body: Value::Null,
        }
    }

    pub fn with_retry_after(mut self, secs: f64) -> Self {
        self.retry_after = secs;
        self
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = body;
        self
    }

    /// 服务端给出的等待提示已归零
    pub fn is_done(&self) -> bool {
        !(self.retry_after > 0.0)
    }

    /// 按提示精确等待；无法表示的值按 0 处理
    pub fn retry_delay(&self) -> Duration {
        Duration::try_from_secs_f64(self.retry_after).unwrap_or(Duration::ZERO)
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub async fn from_response(resp: Response) -> Result<Self> {
        let status = resp.status().as_u16();
        let retry_after = resp
            .headers()
            .get("Retry-After")
            .and_then(|h| h.to_str().ok())
            .and_then(|s| s.trim().parse::<f64>().ok())
            .filter(|v| v.is_finite() && *v > 0.0)
            .unwrap_or(0.0);
        let location = resp
            .headers()
            .get("Location")
            .and_then(|l| l.to_str().ok())
            .map(|s| s.to_string());

        let text = resp.text().await?;
        let body = if text.trim().is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&text).unwrap_or(Value::Null)
        };

        Ok(Self {
            status,
            retry_after,
            location,
            body,
        })
    }
}

/// 模拟服务接口
///
/// 编排器与提交流水线只依赖这个 trait，便于替换为脚本化实现做测试。
#[async_trait]
pub trait SimulationApi: Send + Sync {
    /// POST /simulations
    async fn submit_simulation(&self, payload: &Value) -> Result<ApiReply>;
    /// GET 进度资源（Location）
    async fn get_progress(&self, location: &str) -> Result<ApiReply>;
    /// GET /alphas/{id}
    async fn get_alpha(&self, alpha_id: &str) -> Result<ApiReply>;
    /// POST /alphas/{id}/submit
    async fn submit_alpha(&self, alpha_id: &str) -> Result<ApiReply>;
    /// GET /alphas/{id}/submit
    async fn get_submit_status(&self, alpha_id: &str) -> Result<ApiReply>;
}

#[async_trait]
impl SimulationApi for WQBSession {
    async fn submit_simulation(&self, payload: &Value) -> Result<ApiReply> {
        ApiReply::from_response(self.create_simulation(payload).await?).await
    }

    async fn get_progress(&self, location: &str) -> Result<ApiReply> {
        ApiReply::from_response(self.get_location(location).await?).await
    }

    async fn get_alpha(&self, alpha_id: &str) -> Result<ApiReply> {
        ApiReply::from_response(self.locate_alpha(alpha_id).await?).await
    }

    async fn submit_alpha(&self, alpha_id: &str) -> Result<ApiReply> {
        ApiReply::from_response(self.request_submit(alpha_id).await?).await
    }

    async fn get_submit_status(&self, alpha_id: &str) -> Result<ApiReply> {
        ApiReply::from_response(self.check_submission(alpha_id).await?).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fractional_hint_maps_to_exact_delay() {
        let r = ApiReply::new(200).with_retry_after(2.5);
        assert!(!r.is_done());
        assert_eq!(r.retry_delay(), Duration::from_millis(2500));
    }

    #[test]
    fn unusable_hints_mean_done() {
        assert!(ApiReply::new(200).is_done());
        assert!(ApiReply::new(200).with_retry_after(-1.0).is_done());
        assert!(ApiReply::new(200).with_retry_after(f64::NAN).is_done());
        assert_eq!(
            ApiReply::new(200).with_retry_after(f64::NAN).retry_delay(),
            Duration::ZERO
        );
    }
}
