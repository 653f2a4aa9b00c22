pub mod history_record;

pub use history_record::Entity as HistoryEntity;
