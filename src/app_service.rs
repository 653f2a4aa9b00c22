use crate::commands::{AppCommand, USAGE};
use crate::config::AppConfig;
use crate::generate::field_catalog::DATASETS;
use crate::generate::{
    generate, ApiFieldCatalog, FieldCatalog, Mode, MutationEngine, StaticFieldCatalog,
    StrategyPerformance,
};
use crate::session::{SimulationApi, WQBSession};
use crate::simulation::{CancelSignal, SimulationOrchestrator};
use crate::storage::{HistoryFilter, HistoryRecord, HistoryStore, IdLedger};
use crate::submission::{SubmissionPipeline, SubmissionReport};
use anyhow::{anyhow, Context};
use log::{info, warn};
use std::fmt::Write as _;
use std::sync::Arc;

/// 变异时回看的历史条数
const EVOLVE_HISTORY_WINDOW: usize = 200;
/// auto 模式模拟后提交的数量
const AUTO_SUBMIT_COUNT: usize = 2;

/// 访问平台所需的两个依赖
#[derive(Clone)]
pub struct Remote {
    pub api: Arc<dyn SimulationApi>,
    pub catalog: Arc<dyn FieldCatalog>,
}

impl Remote {
    /// 配置了 FIELDS 时使用固定字段，否则从平台拉取
    pub fn from_session(
        session: Arc<WQBSession>,
        config: &AppConfig,
        cancel: &CancelSignal,
    ) -> Self {
        let catalog: Arc<dyn FieldCatalog> = if config.fields.is_empty() {
            Arc::new(
                ApiFieldCatalog::new(
                    session.clone(),
                    config.settings.region.clone(),
                    config.settings.delay,
                    config.settings.universe.clone(),
                )
                .with_sample_size(config.field_sample_size)
                .with_cancel(cancel.clone()),
            )
        } else {
            Arc::new(StaticFieldCatalog::new(config.fields.clone()))
        };
        Self {
            api: session,
            catalog,
        }
    }
}

/// 命令执行层：把各组件按命令串起来，返回给终端的文本
pub struct AppService {
    config: AppConfig,
    store: Arc<dyn HistoryStore>,
    ledger: Arc<IdLedger>,
    cancel: CancelSignal,
    remote: Option<Remote>,
}

impl AppService {
    pub fn new(
        config: AppConfig,
        store: Arc<dyn HistoryStore>,
        ledger: Arc<IdLedger>,
        cancel: CancelSignal,
    ) -> Self {
        Self {
            config,
            store,
            ledger,
            cancel,
            remote: None,
        }
    }

    pub fn with_remote(mut self, remote: Remote) -> Self {
        self.remote = Some(remote);
        self
    }

    pub async fn execute(&self, cmd: AppCommand) -> anyhow::Result<String> {
        match cmd {
            AppCommand::Simulate { mode, dataset } => {
                let records = self.simulate(mode, dataset.as_deref()).await?;
                Ok(summarize_batch(&records))
            }
            AppCommand::Evolve {
                rounds,
                mode,
                dataset,
            } => {
                let records = self.evolve(rounds, mode, dataset.as_deref()).await?;
                Ok(summarize_batch(&records))
            }
            AppCommand::Submit { count } => {
                let report = self.submit(count).await?;
                Ok(summarize_submission(&report))
            }
            AppCommand::Auto { mode, dataset } => {
                let records = self.simulate(mode, dataset.as_deref()).await?;
                let mut out = summarize_batch(&records);
                if self.cancel.is_cancelled() {
                    return Ok(out);
                }
                let report = self.submit(AUTO_SUBMIT_COUNT).await?;
                out.push('\n');
                out.push_str(&summarize_submission(&report));
                Ok(out)
            }
            AppCommand::History { filter, limit } => self.history(filter, limit).await,
            AppCommand::HistoryClear => {
                let n = self.store.clear().await?;
                Ok(format!("已清空 {} 条历史记录", n))
            }
            AppCommand::Stats => {
                let s = self.store.statistics().await?;
                Ok(format!(
                    "总计 {} 条，合格 {} 条，合格率 {:.1}%",
                    s.total,
                    s.succeeded,
                    s.success_rate * 100.0
                ))
            }
            AppCommand::Help => Ok(USAGE.to_string()),
            AppCommand::Unknown(msg) => Err(anyhow!("{}\n{}", msg, USAGE)),
        }
    }

    fn remote(&self) -> anyhow::Result<&Remote> {
        self.remote
            .as_ref()
            .ok_or_else(|| anyhow!("该命令需要登录 WorldQuant BRAIN"))
    }

    fn orchestrator(&self, remote: &Remote) -> SimulationOrchestrator {
        SimulationOrchestrator::new(
            remote.api.clone(),
            self.store.clone(),
            self.config.settings.clone(),
        )
        .with_config(self.config.orchestrator.clone())
        .with_cancel(self.cancel.clone())
        .with_ledger(self.ledger.clone())
    }

    async fn load_fields(&self, remote: &Remote, dataset: Option<&str>) -> anyhow::Result<Vec<String>> {
        let dataset = dataset.unwrap_or(DATASETS[0].name);
        let fields = remote
            .catalog
            .fields(dataset)
            .await
            .with_context(|| format!("获取数据集 {} 的字段失败", dataset))?;
        info!("✓ 数据集 {} 可用字段 {} 个", dataset, fields.len());
        Ok(fields)
    }

    pub async fn simulate(&self, mode: Mode, dataset: Option<&str>) -> anyhow::Result<Vec<HistoryRecord>> {
        let remote = self.remote()?;
        let fields = self.load_fields(remote, dataset).await?;
        if fields.is_empty() {
            warn!("✗ 没有可用字段，跳过本批次");
            return Ok(Vec::new());
        }
        let candidates = generate(&fields, mode);
        info!("🚀 模式 {} 生成 {} 个候选", mode, candidates.len());
        if candidates.is_empty() {
            warn!("✗ 模式 {} 没有生成任何候选", mode);
            return Ok(Vec::new());
        }
        Ok(self.orchestrator(remote).run_batch(&candidates).await)
    }

    /// 首轮按模式生成，之后每轮都基于最近的历史记录变异
    pub async fn evolve(
        &self,
        rounds: usize,
        mode: Mode,
        dataset: Option<&str>,
    ) -> anyhow::Result<Vec<HistoryRecord>> {
        let remote = self.remote()?;
        let fields = self.load_fields(remote, dataset).await?;
        if fields.is_empty() {
            warn!("✗ 没有可用字段，不进行演化");
            return Ok(Vec::new());
        }
        let engine = MutationEngine::new(self.config.mutation.clone())?;
        let orchestrator = self.orchestrator(remote);
        let mut performance = StrategyPerformance::new();
        let mut all = Vec::new();

        for round in 0..rounds {
            if self.cancel.is_cancelled() {
                warn!("✗ 已取消，停止于第 {}/{} 轮", round + 1, rounds);
                break;
            }
            let candidates = if round == 0 {
                generate(&fields, mode)
            } else {
                let prior = self
                    .store
                    .query(HistoryFilter::All, EVOLVE_HISTORY_WINDOW)
                    .await?;
                engine.mutate(&fields, &prior, &mut performance)
            };
            info!("▶ 第 {}/{} 轮: {} 个候选", round + 1, rounds, candidates.len());
            let records = orchestrator.run_batch(&candidates).await;
            let passed = records.iter().filter(|r| r.qualified).count();
            info!("🏁 第 {}/{} 轮结束: 合格 {}/{}", round + 1, rounds, passed, records.len());
            all.extend(records);
        }

        for (expr, m) in performance.top_by_sharpe(3) {
            info!("⭐ sharpe={:?} {}", m.sharpe, expr);
        }
        Ok(all)
    }

    /// 提交 ledger 中前 `count` 个 id，成功的从 ledger 移除
    pub async fn submit(&self, count: usize) -> anyhow::Result<SubmissionReport> {
        let remote = self.remote()?;
        let ids: Vec<String> = self.ledger.load().await?.into_iter().take(count).collect();
        if ids.is_empty() {
            info!("ledger 中没有待提交的 alpha");
            return Ok(SubmissionReport::default());
        }

        let pipeline = SubmissionPipeline::new(remote.api.clone())
            .with_policy(self.config.submit.clone())
            .with_cancel(self.cancel.clone());
        let report = pipeline.submit(&ids).await;

        if !report.succeeded.is_empty() {
            let remaining = self.ledger.remove(&report.succeeded).await?;
            info!(
                "✓ 已从 ledger 移除 {} 个已提交 id，剩余 {}",
                report.succeeded.len(),
                remaining
            );
        }
        Ok(report)
    }

    async fn history(&self, filter: HistoryFilter, limit: usize) -> anyhow::Result<String> {
        let records = self.store.query(filter, limit).await?;
        if records.is_empty() {
            return Ok("暂无历史记录".to_string());
        }
        let mut out = String::new();
        for r in &records {
            let saved = r
                .saved_at
                .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
                .unwrap_or_default();
            let _ = writeln!(
                out,
                "{} {} [{}] sharpe={} fitness={} {}",
                saved,
                r.alpha_id,
                r.tier,
                fmt_metric(r.metrics.sharpe),
                fmt_metric(r.metrics.fitness),
                r.expression
            );
        }
        Ok(out.trim_end().to_string())
    }
}

fn fmt_metric(v: Option<f64>) -> String {
    v.map(|x| format!("{:.2}", x))
        .unwrap_or_else(|| "-".to_string())
}

fn summarize_batch(records: &[HistoryRecord]) -> String {
    let passed: Vec<&HistoryRecord> = records.iter().filter(|r| r.qualified).collect();
    let mut out = format!("完成 {} 个模拟，合格 {} 个", records.len(), passed.len());
    for r in passed {
        let _ = write!(out, "\n  ✓ {} [{}] {}", r.alpha_id, r.tier, r.expression);
    }
    out
}

fn summarize_submission(report: &SubmissionReport) -> String {
    let mut out = format!(
        "提交成功 {} 个，失败 {} 个",
        report.succeeded.len(),
        report.failed.len()
    );
    for id in &report.succeeded {
        let _ = write!(out, "\n  ✓ {}", id);
    }
    for id in &report.failed {
        let _ = write!(out, "\n  ✗ {}", id);
    }
    out
}
