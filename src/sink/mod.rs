//! Output sinks.
//!
//! Building is sink-agnostic: the same [`EntityTables`] go either to the
//! relational store (one transaction, natural-key upserts) or to a CSV
//! file set. The two modes are mutually exclusive per run.

pub mod csv_export;
pub mod postgres;

use async_trait::async_trait;

use crate::model::EntityTables;

#[async_trait]
pub trait Sink: Send + Sync {
    async fn write(&self, tables: &EntityTables) -> anyhow::Result<()>;
}
