use crate::error::{Result, WqbError};
use crate::qualify::{self, QualificationPolicy};
use crate::session::dto::{AlphaDetailResponse, SimulationProgress};
use crate::session::{ApiReply, SimulationApi};
use crate::simulation::cancel::CancelSignal;
use crate::simulation::metrics::MetricsSnapshot;
use crate::simulation::model::{JobState, SimulationJob, SimulationSettings};
use crate::storage::{HistoryRecord, HistoryStore, IdLedger};
use log::{debug, error, info, warn};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// 相邻两个候选之间的固定间隔
    pub pacing: Duration,
    /// 模拟完成后等待指标计算的时间
    pub settle: Duration,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            pacing: Duration::from_secs(5),
            settle: Duration::from_secs(3),
        }
    }
}

/// 模拟编排器
///
/// 逐个提交候选、按 Retry-After 轮询、拉取详情并判定，
/// 每个有结论的候选都会写入历史存储。
pub struct SimulationOrchestrator {
    api: Arc<dyn SimulationApi>,
    store: Arc<dyn HistoryStore>,
    settings: SimulationSettings,
    policy: QualificationPolicy,
    config: OrchestratorConfig,
    cancel: CancelSignal,
    ledger: Option<Arc<IdLedger>>,
}

impl SimulationOrchestrator {
    pub fn new(
        api: Arc<dyn SimulationApi>,
        store: Arc<dyn HistoryStore>,
        settings: SimulationSettings,
    ) -> Self {
        Self {
            api,
            store,
            settings,
            policy: QualificationPolicy::default(),
            config: OrchestratorConfig::default(),
            cancel: CancelSignal::never(),
            ledger: None,
        }
    }

    pub fn with_config(mut self, config: OrchestratorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_policy(mut self, policy: QualificationPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_cancel(mut self, cancel: CancelSignal) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_ledger(mut self, ledger: Arc<IdLedger>) -> Self {
        self.ledger = Some(ledger);
        self
    }

    /// 顺序处理一批候选；取消时返回已得到的记录
    pub async fn run_batch(&self, candidates: &[String]) -> Vec<HistoryRecord> {
        let total = candidates.len();
        let mut records = Vec::new();
        if total == 0 {
            info!("候选列表为空，跳过本批次");
            return records;
        }
        info!("🚀 开始批量模拟: {} 个候选", total);

        for (i, expression) in candidates.iter().enumerate() {
            info!("[{}/{}] {}", i + 1, total, expression);
            match self.run_single(expression).await {
                Ok(record) => records.push(record),
                Err(WqbError::Cancelled) => {
                    warn!("⏹ 批次已取消，已完成 {} 个", records.len());
                    return records;
                }
                Err(e) => warn!("✗ 跳过候选 [{}]: {}", expression, e),
            }

            if i + 1 < total && self.cancel.sleep(self.config.pacing).await.is_err() {
                warn!("⏹ 批次已取消，已完成 {} 个", records.len());
                return records;
            }
        }

        let qualified = records.iter().filter(|r| r.qualified).count();
        info!(
            "🏁 批次结束: 提交 {}，完成 {}，合格 {}",
            total,
            records.len(),
            qualified
        );
        records
    }

    /// 单个候选的完整生命周期
    pub async fn run_single(&self, expression: &str) -> Result<HistoryRecord> {
        let mut job = SimulationJob::new(expression, self.settings.clone());
        match self.drive(&mut job).await {
            Ok(record) => Ok(record),
            Err(e) => {
                if !job.state.is_terminal() {
                    job.advance(JobState::Failed);
                }
                Err(e)
            }
        }
    }

    async fn drive(&self, job: &mut SimulationJob) -> Result<HistoryRecord> {
        let payload = job.settings.payload(&job.expression);
        let reply = self
            .cancel
            .run(self.api.submit_simulation(&payload))
            .await??;

        if reply.status != 201 {
            job.advance(JobState::Rejected);
            return Err(WqbError::rejected(reply.status, reply.body.to_string()));
        }
        let location = reply
            .location
            .ok_or_else(|| WqbError::protocol("201 响应缺少 Location"))?;
        info!("▶ 模拟任务已提交: {}", location);
        job.accept(location.clone());

        let done = self.poll(job, &location).await?;
        let progress: SimulationProgress =
            serde_json::from_value(done.body.clone()).unwrap_or_default();

        if progress.is_engine_failure() {
            job.advance(JobState::Rejected);
            let status = progress.status.unwrap_or_default();
            let msg = progress.message.unwrap_or_else(|| "未知引擎错误".to_string());
            return Err(WqbError::rejected(done.status, format!("{}: {}", status, msg)));
        }
        if !done.is_success() {
            job.advance(JobState::Rejected);
            return Err(WqbError::rejected(done.status, done.body.to_string()));
        }
        let alpha_id = progress
            .alpha
            .ok_or_else(|| WqbError::protocol("模拟完成但未返回 alpha ID"))?;
        job.complete(alpha_id.clone());
        info!("✓ 模拟完成 [{}] {} 次轮询", alpha_id, job.polls);

        self.cancel.sleep(self.config.settle).await?;
        let metrics = self.fetch_metrics(&alpha_id).await?;

        let verdict = self.policy.evaluate(&metrics);
        qualify::log_result(&job.expression, &metrics, &verdict);

        let record = HistoryRecord::new(
            alpha_id.clone(),
            job.expression.clone(),
            &verdict,
            metrics,
            job.submitted_at,
        );
        let (record, persisted) = match self.store.append(record.clone()).await {
            Ok(saved) => (saved, true),
            Err(e) => {
                error!("✗ 历史记录写入失败 [{}]: {}", alpha_id, e);
                (record, false)
            }
        };

        // 台账里的 id 必须在历史中有对应记录
        if record.qualified && persisted {
            if let Some(ledger) = &self.ledger {
                if let Err(e) = ledger.append(&alpha_id).await {
                    error!("✗ 写入 alpha 台账失败 [{}]: {}", alpha_id, e);
                }
            }
        }
        Ok(record)
    }

    /// 轮询直到 Retry-After 归零，返回最后一次响应
    async fn poll(&self, job: &mut SimulationJob, location: &str) -> Result<ApiReply> {
        job.advance(JobState::Polling);
        loop {
            let reply = self.cancel.run(self.api.get_progress(location)).await??;
            job.polls += 1;
            if reply.is_done() {
                return Ok(reply);
            }

            job.advance(JobState::Polling);
            let progress = reply.body.get("progress").and_then(|v| v.as_f64());
            if job.polls % 10 == 0 {
                match progress {
                    Some(p) => info!(
                        "... 任务进度 [{}]: {:.0}% (已轮询 {} 次)",
                        location,
                        p * 100.0,
                        job.polls
                    ),
                    None => info!("... 任务运行中 [{}] (已轮询 {} 次)", location, job.polls),
                }
            } else {
                debug!("轮询 [{}] 等待 {:.2}s", location, reply.retry_after);
            }
            self.cancel.sleep(reply.retry_delay()).await?;
        }
    }

    async fn fetch_metrics(&self, alpha_id: &str) -> Result<MetricsSnapshot> {
        let reply = self.cancel.run(self.api.get_alpha(alpha_id)).await??;
        if !reply.is_success() {
            return Err(WqbError::rejected(reply.status, reply.body.to_string()));
        }
        let detail: AlphaDetailResponse = serde_json::from_value(reply.body)
            .map_err(|e| WqbError::protocol(format!("详情 JSON 解析失败: {}", e)))?;
        match detail.is {
            Some(is) if is.is_object() => Ok(MetricsSnapshot::from_is_value(&is)),
            _ => Err(WqbError::protocol(format!("alpha {} 详情缺少 is 对象", alpha_id))),
        }
    }
}
