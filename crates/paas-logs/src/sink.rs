use async_trait::async_trait;
use paas_core::types::LogLevel;
use uuid::Uuid;

/// Persists a log line before it is broadcast to live subscribers
/// (spec.md §5: "persist, then enqueue into per-build topic channels").
/// Implemented by Control Plane over `paas-entities::log_entries`; kept as
/// a trait so the hub can be unit-tested without a database (§9 design
/// note on interface boundaries).
#[async_trait]
pub trait LogSink: Send + Sync {
    async fn persist(
        &self,
        build_id: Uuid,
        level: LogLevel,
        message: &str,
    ) -> Result<(), paas_core::error::ServiceError>;
}
