//! Broadcast message type names.
//!
//! Real-time listeners receive `{type, ts, payload}` envelopes; these are the
//! values of `type`.

pub const EVENT_CREATED: &str = "evento_creado";
pub const EVENT_CLOSED: &str = "evento_cerrado";
pub const ALERT_CREATED: &str = "alerta_creada";
pub const ALERT_CLOSED: &str = "alerta_cerrada";
pub const ALERT_ASSIGNED: &str = "alerta_asignada";
pub const NOTIFICATION_CREATED: &str = "notificacion_creada";
pub const NOTIFICATION_SENT: &str = "notificacion_enviada";
pub const ACTION_EXECUTED: &str = "accion_ejecutada";
pub const ATTENDANCE_BLOCK_REGISTERED: &str = "asistencia_bloque_registrada";
pub const TEMPORARY_STATE_CREATED: &str = "estado_temporal_creado";
pub const TEMPORARY_STATE_CLOSED: &str = "estado_temporal_cerrado";
