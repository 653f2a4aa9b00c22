use crate::error::Result;
use crate::qualify::QualificationTier;
use crate::simulation::metrics::MetricsSnapshot;
use crate::storage::connection::establish_connection;
use crate::storage::entity::history_record::{
    self, ActiveModel as HistoryActiveModel, Entity as History, Model as HistoryModel,
};
use crate::storage::store::{HistoryFilter, HistoryRecord, HistoryStats, HistoryStore, Stamper};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::warn;
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};

fn millis_to_utc(ms: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(ms).unwrap_or_default()
}

impl From<HistoryModel> for HistoryRecord {
    fn from(model: HistoryModel) -> Self {
        let metrics = serde_json::from_str::<MetricsSnapshot>(&model.metrics_json)
            .unwrap_or_else(|e| {
                warn!("历史记录 {} 的 metrics_json 无法解析: {}", model.alpha_id, e);
                MetricsSnapshot::default()
            });
        Self {
            tier: model
                .tier
                .parse()
                .unwrap_or(QualificationTier::Rejected),
            alpha_id: model.alpha_id,
            expression: model.expression,
            qualified: model.qualified,
            metrics,
            submitted_at: millis_to_utc(model.submitted_at),
            saved_at: Some(millis_to_utc(model.saved_at)),
        }
    }
}

/// SQLite 历史存储，单条 upsert 保证同一 alpha_id 只保留一条
pub struct SqliteHistoryStore {
    db: DatabaseConnection,
    stamper: Stamper,
}

impl SqliteHistoryStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            db,
            stamper: Stamper::default(),
        }
    }

    pub async fn connect(db_url: &str) -> Result<Self> {
        Ok(Self::new(establish_connection(db_url).await?))
    }
}

#[async_trait]
impl HistoryStore for SqliteHistoryStore {
    async fn append(&self, mut record: HistoryRecord) -> Result<HistoryRecord> {
        let saved_at = self.stamper.next();
        record.saved_at = Some(saved_at);
        let metrics_json = serde_json::to_string(&record.metrics)
            .unwrap_or_else(|_| "{}".to_string());

        let active_model = HistoryActiveModel {
            alpha_id: Set(record.alpha_id.clone()),
            expression: Set(record.expression.clone()),
            qualified: Set(record.qualified),
            tier: Set(record.tier.as_str().to_string()),
            is_sharpe: Set(record.metrics.sharpe),
            is_fitness: Set(record.metrics.fitness),
            metrics_json: Set(metrics_json),
            submitted_at: Set(record.submitted_at.timestamp_millis()),
            saved_at: Set(saved_at.timestamp_millis()),
        };

        History::insert(active_model)
            .on_conflict(
                OnConflict::column(history_record::Column::AlphaId)
                    .update_columns([
                        history_record::Column::Expression,
                        history_record::Column::Qualified,
                        history_record::Column::Tier,
                        history_record::Column::IsSharpe,
                        history_record::Column::IsFitness,
                        history_record::Column::MetricsJson,
                        history_record::Column::SubmittedAt,
                        history_record::Column::SavedAt,
                    ])
                    .to_owned(),
            )
            .exec(&self.db)
            .await?;

        Ok(record)
    }

    async fn query(&self, filter: HistoryFilter, limit: usize) -> Result<Vec<HistoryRecord>> {
        let mut query = History::find();
        match filter {
            HistoryFilter::All => {}
            HistoryFilter::Passed => {
                query = query.filter(history_record::Column::Qualified.eq(true));
            }
            HistoryFilter::Failed => {
                query = query.filter(history_record::Column::Qualified.eq(false));
            }
        }
        let models = query
            .order_by_desc(history_record::Column::SavedAt)
            .limit(limit as u64)
            .all(&self.db)
            .await?;
        Ok(models.into_iter().map(HistoryRecord::from).collect())
    }

    async fn statistics(&self) -> Result<HistoryStats> {
        let total = History::find().count(&self.db).await?;
        let succeeded = History::find()
            .filter(history_record::Column::Qualified.eq(true))
            .count(&self.db)
            .await?;
        Ok(HistoryStats::from_counts(total, succeeded))
    }

    async fn clear(&self) -> Result<u64> {
        let res = History::delete_many().exec(&self.db).await?;
        Ok(res.rows_affected)
    }
}
