//! Test fixtures for common test data
//!
//! Fixtures provide pre-defined audit logs and configuration that can be
//! used across multiple tests.

use serde_json::json;

use dossier_audit::config::{AppConfig, ChildSource, EntityProfile};
use dossier_audit::models::{Decoration, RawAuditEntry};

/// Fixed UUIDs for testing (reproducible tests)
pub mod ids {
    use uuid::Uuid;

    pub const RAZON_SOCIAL_EDIT: Uuid = Uuid::from_u128(0x0000_0001_0000_4000_8000_000000000001);
    pub const GIRO_EDIT: Uuid = Uuid::from_u128(0x0000_0001_0000_4000_8000_000000000002);
    pub const CUENTA_CREADA: Uuid = Uuid::from_u128(0x0000_0001_0000_4000_8000_000000000003);
    pub const ESTADO_CAMBIADO: Uuid = Uuid::from_u128(0x0000_0001_0000_4000_8000_000000000004);
    pub const EMPRESA_CREADA: Uuid = Uuid::from_u128(0x0000_0001_0000_4000_8000_000000000005);

    pub const EMPRESA_ID: &str = "7f1c2d3e-0000-4000-8000-00000000e001";
}

/// Audit log of one company, newest first, as the store returns it
pub fn empresa_log_json() -> serde_json::Value {
    json!([
        {
            "id": ids::RAZON_SOCIAL_EDIT.to_string(),
            "user_id": "u-ana",
            "user_email": "ana@empresa.cl",
            "user_full_name": "Ana Rojas",
            "action": "updated",
            "changed_fields": ["razon_social"],
            "old_values": {"razon_social": "Comercial Andes"},
            "new_values": {"razon_social": "Comercial Andes SpA"},
            "created_at": "2024-01-15T14:00:03Z",
            "record_id": ids::EMPRESA_ID
        },
        {
            "id": ids::GIRO_EDIT.to_string(),
            "user_email": "ana@empresa.cl",
            "user_full_name": "Ana Rojas",
            "action": "updated",
            "changed_fields": {"giro": true, "updated_at": true, "rut": false},
            "old_values": {"giro": "Retail", "updated_at": "2024-01-10"},
            "new_values": {"giro": "Importaciones", "updated_at": "2024-01-15"},
            "created_at": "2024-01-15 14:00:01.250+00",
            "record_id": ids::EMPRESA_ID
        },
        {
            "id": ids::CUENTA_CREADA.to_string(),
            "user": {"id": "u-luis", "email": "luis@empresa.cl", "full_name": "Luis Soto"},
            "action": "created",
            "new_values": {"banco": "Banco Estado", "numero": "123456"},
            "created_at": "2024-01-12T09:30:00Z",
            "source": "cuentas_bancarias_audit_log"
        },
        {
            "id": ids::ESTADO_CAMBIADO.to_string(),
            "user_email": "sofia@empresa.cl",
            "action": "status_changed",
            "changed_fields": ["activa"],
            "old_values": {"activa": false},
            "new_values": {"activa": true},
            "created_at": "2024-01-11T18:45:00Z"
        },
        {
            "id": "not-a-uuid",
            "user_email": "ghost@empresa.cl",
            "action": "updated",
            "created_at": "2024-01-11T00:00:00Z"
        },
        {
            "id": ids::EMPRESA_CREADA.to_string(),
            "user_email": "ana@empresa.cl",
            "user_full_name": "Ana Rojas",
            "action": "created",
            "new_values": {"rut": "76.123.456-7"},
            "created_at": "2024-01-10T08:00:00Z"
        }
    ])
}

pub fn empresa_log() -> Vec<RawAuditEntry> {
    serde_json::from_value(empresa_log_json()).expect("fixture log is valid")
}

/// Number of entries in [`empresa_log`] that normalize
pub const EMPRESA_LOG_VALID: usize = 5;

/// Profile merging company and bank account histories
pub fn empresa_profile() -> EntityProfile {
    EntityProfile {
        table: "empresas_audit_log".to_string(),
        parent_column: "empresa_id".to_string(),
        field_labels: [
            ("rut".to_string(), "RUT".to_string()),
            ("razon_social".to_string(), "Razón social".to_string()),
        ]
        .into_iter()
        .collect(),
        hidden_fields: vec!["updated_at".to_string()],
        action_labels: Default::default(),
        grouping_enabled: None,
        grouping_window_ms: None,
        badge: Some(Decoration::new("Empresa")),
        children: vec![ChildSource {
            table: "cuentas_bancarias_audit_log".to_string(),
            parent_column: "empresa_id".to_string(),
            badge: Decoration::new("Cuenta bancaria").with_color("purple"),
        }],
    }
}

pub fn app_config(store_url: &str) -> AppConfig {
    let mut config = AppConfig::default();
    config.store.url = store_url.to_string();
    config.store.api_key = Some("anon-test-key".to_string());
    config.store.timeout_secs = 5;
    config.entities.insert("empresa".to_string(), empresa_profile());
    config
}
