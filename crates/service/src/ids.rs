use uuid::Uuid;

/// Upper bound on id regeneration when a freshly generated id is already taken.
pub const MAX_ID_ATTEMPTS: usize = 5;

/// Source of new service identifiers.
pub trait IdGenerator: Send + Sync {
    fn next_id(&self) -> String;
}

/// Random UUIDv4 identifiers.
#[derive(Debug, Default, Clone, Copy)]
pub struct UuidGenerator;

impl IdGenerator for UuidGenerator {
    fn next_id(&self) -> String {
        Uuid::new_v4().to_string()
    }
}
