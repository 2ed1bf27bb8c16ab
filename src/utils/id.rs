//! Identifier generation

/// Random identifier with a readable prefix, e.g. `sess_3f2a9c...`.
pub fn generate_id(prefix: &str) -> String {
    format!("{prefix}_{}", uuid::Uuid::new_v4().simple())
}
