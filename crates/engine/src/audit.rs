//! Audit recorder.
//!
//! Writes one `audit_logs` row per mutation, inside the caller's
//! transaction, holding JSON snapshots of the row before and after.

use serde::Serialize;
use sqlx::PgConnection;
use vigia_core::audit::AuditAction;
use vigia_core::types::DbId;
use vigia_db::models::audit::NewAuditLog;
use vigia_db::repositories::AuditRepo;

use crate::error::EngineResult;

pub struct AuditRecorder;

impl AuditRecorder {
    pub async fn record(
        conn: &mut PgConnection,
        table_name: &str,
        record_id: DbId,
        action: AuditAction,
        before: Option<serde_json::Value>,
        after: Option<serde_json::Value>,
        actor: Option<DbId>,
    ) -> EngineResult<DbId> {
        let id = AuditRepo::insert(
            conn,
            &NewAuditLog {
                table_name,
                record_id,
                action,
                before_json: before,
                after_json: after,
                user_id: actor,
            },
        )
        .await?;
        Ok(id)
    }

    pub async fn inserted<T: Serialize>(
        conn: &mut PgConnection,
        table_name: &str,
        record_id: DbId,
        after: &T,
        actor: Option<DbId>,
    ) -> EngineResult<DbId> {
        let after = serde_json::to_value(after)?;
        Self::record(conn, table_name, record_id, AuditAction::Insert, None, Some(after), actor).await
    }

    pub async fn updated<T: Serialize>(
        conn: &mut PgConnection,
        table_name: &str,
        record_id: DbId,
        before: &T,
        after: &T,
        actor: Option<DbId>,
    ) -> EngineResult<DbId> {
        let before = serde_json::to_value(before)?;
        let after = serde_json::to_value(after)?;
        Self::record(
            conn,
            table_name,
            record_id,
            AuditAction::Update,
            Some(before),
            Some(after),
            actor,
        )
        .await
    }
}
