use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "alpha_history")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub alpha_id: String,
    pub expression: String,
    pub qualified: bool,
    pub tier: String,

    // 常用指标单独成列，方便直接查库
    #[sea_orm(nullable)]
    pub is_sharpe: Option<f64>,
    #[sea_orm(nullable)]
    pub is_fitness: Option<f64>,

    // 完整 MetricsSnapshot
    pub metrics_json: String,

    // 毫秒时间戳
    pub submitted_at: i64,
    pub saved_at: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
