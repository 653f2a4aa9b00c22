use crate::error::{Result, WqbError};
use crate::session::SimulationApi;
use crate::simulation::cancel::CancelSignal;
use log::{info, warn};
use std::sync::Arc;
use std::time::Duration;

/// 提交重试策略
#[derive(Debug, Clone)]
pub struct SubmitPolicy {
    pub max_attempts: u32,
    pub backoff: Duration,
    /// 相邻两个 id 之间的间隔
    pub pacing: Duration,
    /// 直接判失败、不重试的状态码
    pub terminal_statuses: Vec<u16>,
}

impl Default for SubmitPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            backoff: Duration::from_secs(3),
            pacing: Duration::from_secs(10),
            terminal_statuses: vec![400, 403],
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubmissionReport {
    pub succeeded: Vec<String>,
    pub failed: Vec<String>,
}

pub struct SubmissionPipeline {
    api: Arc<dyn SimulationApi>,
    policy: SubmitPolicy,
    cancel: CancelSignal,
}

impl SubmissionPipeline {
    pub fn new(api: Arc<dyn SimulationApi>) -> Self {
        Self {
            api,
            policy: SubmitPolicy::default(),
            cancel: CancelSignal::never(),
        }
    }

    pub fn with_policy(mut self, policy: SubmitPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_cancel(mut self, cancel: CancelSignal) -> Self {
        self.cancel = cancel;
        self
    }

    /// 逐个提交；返回结果总是覆盖全部输入
    pub async fn submit(&self, ids: &[String]) -> SubmissionReport {
        let mut report = SubmissionReport::default();
        let total = ids.len();

        for (i, id) in ids.iter().enumerate() {
            info!("[{}/{}] 提交 alpha: {}", i + 1, total, id);
            match self.submit_one(id).await {
                Ok(()) => {
                    info!("✓ 提交成功: {}", id);
                    report.succeeded.push(id.clone());
                }
                Err(WqbError::Cancelled) => {
                    warn!("⏹ 提交已取消，剩余 {} 个记为失败", total - i);
                    report.failed.extend(ids[i..].iter().cloned());
                    return report;
                }
                Err(e) => {
                    warn!("✗ 提交失败 [{}]: {}", id, e);
                    report.failed.push(id.clone());
                }
            }

            if i + 1 < total && self.cancel.sleep(self.policy.pacing).await.is_err() {
                warn!("⏹ 提交已取消，剩余 {} 个记为失败", total - i - 1);
                report.failed.extend(ids[i + 1..].iter().cloned());
                return report;
            }
        }

        info!(
            "🏁 提交结束: 成功 {}，失败 {}",
            report.succeeded.len(),
            report.failed.len()
        );
        report
    }

    async fn submit_one(&self, id: &str) -> Result<()> {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut attempt = 0;
        loop {
            attempt += 1;
            let err = match self.cancel.run(self.api.submit_alpha(id)).await? {
                Ok(reply) if reply.status == 201 => break,
                Ok(reply) if self.policy.terminal_statuses.contains(&reply.status) => {
                    return Err(WqbError::rejected(reply.status, reply.body.to_string()));
                }
                Ok(reply) => WqbError::rejected(reply.status, reply.body.to_string()),
                Err(e) if !e.is_retryable() => return Err(e),
                Err(e) => e,
            };
            if attempt >= max_attempts {
                warn!("✗ [{}] 已重试 {} 次，放弃", id, attempt);
                return Err(err);
            }
            warn!(
                "[{}] 第 {}/{} 次提交未被接受: {}，{:.1}s 后重试",
                id,
                attempt,
                max_attempts,
                err,
                self.policy.backoff.as_secs_f64()
            );
            self.cancel.sleep(self.policy.backoff).await?;
        }

        info!("▶ 提交已受理，等待检查: {}", id);
        loop {
            let reply = self.cancel.run(self.api.get_submit_status(id)).await??;
            if !reply.is_done() {
                self.cancel.sleep(reply.retry_delay()).await?;
                continue;
            }
            return if reply.status == 200 {
                Ok(())
            } else {
                Err(WqbError::rejected(reply.status, reply.body.to_string()))
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::ApiReply;
    use crate::simulation::testing::{Endpoint, ScriptedApi};
    use serde_json::json;
    use tokio::time::Instant;

    fn ids(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test(start_paused = true)]
    async fn forbidden_is_terminal_without_retry() {
        let api = Arc::new(ScriptedApi::new());
        api.push(
            Endpoint::Submit,
            ApiReply::new(403).with_body(json!({"detail": "self correlation"})),
        );
        let pipeline = SubmissionPipeline::new(api.clone());
        let report = pipeline.submit(&ids(&["A1"])).await;
        assert_eq!(report.failed, ids(&["A1"]));
        assert!(report.succeeded.is_empty());
        assert_eq!(api.calls(Endpoint::Submit), 1);
        assert_eq!(api.calls(Endpoint::SubmitStatus), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn retries_then_polls_to_success() {
        let api = Arc::new(ScriptedApi::new());
        api.push(Endpoint::Submit, ApiReply::new(500))
            .push_result(Endpoint::Submit, Err(WqbError::Transport("reset".into())))
            .push(Endpoint::Submit, ApiReply::new(201))
            .push(Endpoint::SubmitStatus, ApiReply::new(200).with_retry_after(1.5))
            .push(Endpoint::SubmitStatus, ApiReply::new(200));

        let pipeline = SubmissionPipeline::new(api.clone());
        let start = Instant::now();
        let report = pipeline.submit(&ids(&["A1"])).await;
        let elapsed = start.elapsed();

        assert_eq!(report.succeeded, ids(&["A1"]));
        assert_eq!(api.calls(Endpoint::Submit), 3);
        assert_eq!(api.calls(Endpoint::SubmitStatus), 2);
        // 两次 3s 退避 + 1.5s 检查等待
        assert!(elapsed >= Duration::from_millis(7500));
        assert!(elapsed < Duration::from_millis(7600));
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_retries_fail() {
        let api = Arc::new(ScriptedApi::new());
        for _ in 0..3 {
            api.push(Endpoint::Submit, ApiReply::new(429));
        }
        let pipeline = SubmissionPipeline::new(api.clone()).with_policy(SubmitPolicy {
            max_attempts: 3,
            ..Default::default()
        });
        let report = pipeline.submit(&ids(&["A1"])).await;
        assert_eq!(report.failed, ids(&["A1"]));
        assert_eq!(api.calls(Endpoint::Submit), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn non_200_final_check_fails() {
        let api = Arc::new(ScriptedApi::new());
        api.push(Endpoint::Submit, ApiReply::new(201))
            .push(Endpoint::SubmitStatus, ApiReply::new(400).with_body(json!({"is": {"checks": []}})));
        api.push(Endpoint::Submit, ApiReply::new(201))
            .push(Endpoint::SubmitStatus, ApiReply::new(200));

        let pipeline = SubmissionPipeline::new(api.clone());
        let start = Instant::now();
        let report = pipeline.submit(&ids(&["A1", "A2"])).await;
        assert_eq!(report.failed, ids(&["A1"]));
        assert_eq!(report.succeeded, ids(&["A2"]));
        assert!(start.elapsed() >= Duration::from_secs(10));
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_marks_remaining_failed() {
        let api = Arc::new(ScriptedApi::new());
        api.push(Endpoint::Submit, ApiReply::new(201))
            .push(Endpoint::SubmitStatus, ApiReply::new(200));
        api.push(Endpoint::Submit, ApiReply::new(201))
            .push(Endpoint::SubmitStatus, ApiReply::new(200).with_retry_after(3600.0));

        let (tx, cancel) = CancelSignal::channel();
        let pipeline = SubmissionPipeline::new(api.clone()).with_cancel(cancel);
        let handle = tokio::spawn(async move { pipeline.submit(&ids(&["A1", "A2", "A3"])).await });
        tokio::time::sleep(Duration::from_secs(60)).await;
        tx.send(true).unwrap();
        let report = handle.await.unwrap();

        assert_eq!(report.succeeded, ids(&["A1"]));
        assert_eq!(report.failed, ids(&["A2", "A3"]));
    }

    #[tokio::test(start_paused = true)]
    async fn only_transport_errors_are_retried() {
        let api = Arc::new(ScriptedApi::new());
        api.push_result(
            Endpoint::Submit,
            Err(WqbError::protocol("unreadable body")),
        );
        let pipeline = SubmissionPipeline::new(api.clone());
        let report = pipeline.submit(&ids(&["A1"])).await;
        assert_eq!(report.failed, ids(&["A1"]));
        assert_eq!(api.calls(Endpoint::Submit), 1);
    }
}
