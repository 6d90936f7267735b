use crate::error::Result;
use crate::review::ReviewRecord;
use async_trait::async_trait;

pub mod csv;

#[async_trait]
pub trait RowSink: Send {
    /// Appends one record; it must be durable once this returns.
    async fn write(&mut self, record: &ReviewRecord) -> Result<()>;
    async fn close(&mut self) -> Result<()> {
        Ok(())
    }
}
