use crate::error::{Result, WqbError};
use crate::session::WQBSession;
use crate::simulation::CancelSignal;
use async_trait::async_trait;
use log::{info, warn};
use rand::seq::index;
use rand::Rng;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

/// 已知数据集：名称、数据集 id、默认股票池
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DatasetConfig {
    pub name: &'static str,
    pub id: &'static str,
    pub universe: &'static str,
    pub description: &'static str,
}

pub const DATASETS: &[DatasetConfig] = &[
    DatasetConfig {
        name: "fundamental6",
        id: "fundamental6",
        universe: "TOP3000",
        description: "基础财务数据 (稳健但信号偏弱)",
    },
    DatasetConfig {
        name: "analyst4",
        id: "analyst4",
        universe: "TOP1000",
        description: "分析师预测数据 (高IC但易过拟合)",
    },
    DatasetConfig {
        name: "pv1",
        id: "pv1",
        universe: "TOP1000",
        description: "股市成交量数据 (噪声大，不建议单独使用)",
    },
    DatasetConfig {
        name: "mixed_pv_fund",
        id: "mixed",
        universe: "TOP3000",
        description: "混合数据集(价量+基本面)",
    },
    DatasetConfig {
        name: "mixed_analyst_fund",
        id: "mixed",
        universe: "TOP1000",
        description: "混合数据集(分析师+基本面)",
    },
];

/// 按名称或 1 起始的编号查找
pub fn find_dataset(key: &str) -> Option<&'static DatasetConfig> {
    if let Ok(i) = key.trim().parse::<usize>() {
        return i.checked_sub(1).and_then(|i| DATASETS.get(i));
    }
    DATASETS.iter().find(|d| d.name.eq_ignore_ascii_case(key.trim()))
}

/// 字段目录
#[async_trait]
pub trait FieldCatalog: Send + Sync {
    async fn fields(&self, dataset: &str) -> Result<Vec<String>>;
}

/// 配置里写死的字段列表，忽略数据集参数
#[derive(Debug, Clone, Default)]
pub struct StaticFieldCatalog {
    fields: Vec<String>,
}

impl StaticFieldCatalog {
    pub fn new(fields: Vec<String>) -> Self {
        Self { fields }
    }
}

#[async_trait]
impl FieldCatalog for StaticFieldCatalog {
    async fn fields(&self, _dataset: &str) -> Result<Vec<String>> {
        Ok(self.fields.clone())
    }
}

/// 通过 /data-fields 分页拉取 MATRIX 字段
pub struct ApiFieldCatalog {
    session: Arc<WQBSession>,
    region: String,
    delay: i32,
    universe: String,
    /// 0 表示全部
    sample_size: usize,
    max_retry: u32,
    cancel: CancelSignal,
}

const PAGE_SIZE: usize = 50;
const MAX_OFFSET: usize = 10000;

impl ApiFieldCatalog {
    pub fn new(
        session: Arc<WQBSession>,
        region: impl Into<String>,
        delay: i32,
        universe: impl Into<String>,
    ) -> Self {
        Self {
            session,
            region: region.into(),
            delay,
            universe: universe.into(),
            sample_size: 0,
            max_retry: 5,
            cancel: CancelSignal::never(),
        }
    }

    pub fn with_sample_size(mut self, n: usize) -> Self {
        self.sample_size = n;
        self
    }

    pub fn with_cancel(mut self, cancel: CancelSignal) -> Self {
        self.cancel = cancel;
        self
    }

    async fn fetch_all(&self, dataset_id: &str, universe: &str) -> Result<Vec<String>> {
        let mut out = Vec::new();
        let mut offset = 0usize;
        let mut retry = 0u32;

        loop {
            let resp = self
                .cancel
                .run(self.session.search_fields_limited(
                    &self.region,
                    self.delay,
                    universe,
                    dataset_id,
                    Some(PAGE_SIZE),
                    Some(offset),
                ))
                .await??;
            let status = resp.status().as_u16();
            if status == 429 {
                let wait = resp
                    .headers()
                    .get("retry-after")
                    .and_then(|h| h.to_str().ok())
                    .and_then(|s| s.parse::<f64>().ok())
                    .and_then(|s| Duration::try_from_secs_f64(s).ok())
                    .unwrap_or(Duration::from_secs(3));
                retry += 1;
                if retry > self.max_retry {
                    warn!("字段拉取重试次数过多，停止 offset={}", offset);
                    break;
                }
                warn!(
                    "字段拉取受到频率限制 (429)，等待 {:.1}s 后重试，第 {}/{} 次",
                    wait.as_secs_f64(),
                    retry,
                    self.max_retry
                );
                self.cancel.sleep(wait).await?;
                continue;
            }
            retry = 0;
            if !(200..300).contains(&status) {
                let text = resp.text().await.unwrap_or_default();
                return Err(WqbError::rejected(status, text));
            }

            let body: Value = resp
                .json()
                .await
                .map_err(|e| WqbError::protocol(format!("字段列表 JSON 解析失败: {}", e)))?;
            let page_len = page_items(&body).len();
            out.extend(matrix_ids(&body));
            info!(
                "字段同步: dataset={} offset={} 本页 {} 条，累计 MATRIX {} 个",
                dataset_id,
                offset,
                page_len,
                out.len()
            );

            let total = body.get("count").and_then(|c| c.as_u64()).map(|c| c as usize);
            offset += PAGE_SIZE;
            let exhausted = page_len < PAGE_SIZE || total.is_some_and(|t| offset >= t);
            if exhausted || offset >= MAX_OFFSET {
                break;
            }
        }
        Ok(out)
    }
}

#[async_trait]
impl FieldCatalog for ApiFieldCatalog {
    async fn fields(&self, dataset: &str) -> Result<Vec<String>> {
        let (dataset_id, universe) = match find_dataset(dataset) {
            Some(d) => (d.id, d.universe),
            None => (dataset, self.universe.as_str()),
        };
        let all = self.fetch_all(dataset_id, universe).await?;
        if all.is_empty() {
            warn!("✗ 数据集 {} 未找到可用的 MATRIX 字段", dataset_id);
            return Ok(all);
        }
        let picked = sample_fields(all, self.sample_size, &mut rand::thread_rng());
        info!("✓ 获取到 {} 个数据字段 ({})", picked.len(), dataset_id);
        Ok(picked)
    }
}

fn page_items(body: &Value) -> &[Value] {
    body.get("results")
        .and_then(|x| x.as_array())
        .or_else(|| body.get("data").and_then(|x| x.as_array()))
        .or_else(|| body.as_array())
        .map(|v| v.as_slice())
        .unwrap_or(&[])
}

/// 只保留 MATRIX 类型字段的 id
pub fn matrix_ids(body: &Value) -> Vec<String> {
    page_items(body)
        .iter()
        .filter(|item| item.get("type").and_then(|t| t.as_str()) == Some("MATRIX"))
        .filter_map(|item| item.get("id").and_then(|id| id.as_str()))
        .map(str::to_string)
        .collect()
}

/// 随机抽样但保持原有顺序；n 为 0 或不小于总数时原样返回
pub fn sample_fields<R: Rng + ?Sized>(fields: Vec<String>, n: usize, rng: &mut R) -> Vec<String> {
    if n == 0 || n >= fields.len() {
        return fields;
    }
    let mut picked = index::sample(rng, fields.len(), n).into_vec();
    picked.sort_unstable();
    picked.into_iter().map(|i| fields[i].clone()).collect()
}
