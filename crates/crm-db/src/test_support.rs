//! Shared test utilities for crm-db unit tests.

#[cfg(test)]
pub(crate) mod helpers {
    use crm_core::FieldMap;
    use crm_core::enums::EntityType;
    use serde_json::{Value, json};

    use crate::CrmDb;
    use crate::service::CrmService;

    /// Actor id used for mutations in tests.
    pub const ACTOR: &str = "usr-test";

    /// Create an in-memory CrmService with no storage attached.
    pub async fn test_service() -> CrmService {
        let db = CrmDb::open_local(":memory:").await.unwrap();
        CrmService::from_db(db)
    }

    /// Field map from a JSON object literal.
    pub fn fields(value: Value) -> FieldMap {
        match value {
            Value::Object(map) => map,
            other => panic!("expected a JSON object, got {other}"),
        }
    }

    /// Create a business in `Researching` and return its id.
    pub async fn seed_business(svc: &CrmService, name: &str) -> String {
        let record = svc
            .create(
                ACTOR,
                EntityType::Business,
                fields(json!({"name": name, "status": "Researching"})),
            )
            .await
            .unwrap();
        record["id"].as_str().unwrap().to_string()
    }
}
