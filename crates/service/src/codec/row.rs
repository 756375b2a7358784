use crate::record::ServiceRecord;

impl From<models::service::Model> for ServiceRecord {
    fn from(row: models::service::Model) -> Self {
        ServiceRecord { service_id: row.service_id, owner_id: row.owner_id, payload: row.payload }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn row_maps_field_for_field() {
        let row = models::service::Model {
            service_id: "s1".into(),
            owner_id: "alice".into(),
            payload: json!({"title": "t"}),
        };
        let rec = ServiceRecord::from(row);
        assert_eq!(rec, ServiceRecord { service_id: "s1".into(), owner_id: "alice".into(), payload: json!({"title": "t"}) });
    }
}
