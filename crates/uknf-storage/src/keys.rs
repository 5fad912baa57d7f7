//! Shared key generation for storage backends.

use uknf_core::validation::file_extension;
use uuid::Uuid;

pub const REPORTS_PREFIX: &str = "reports";

/// Generate a storage key for a report file of the given entity.
///
/// Produces `reports/{entity_id}/{uuid}.{ext}`, or `reports/{entity_id}/{uuid}`
/// when the file name has no usable extension.
pub fn generate_report_key(entity_id: i64, filename: &str) -> String {
    let id = Uuid::new_v4();
    match file_extension(filename) {
        Some(ext) => format!("{}/{}/{}.{}", REPORTS_PREFIX, entity_id, id, ext),
        None => format!("{}/{}/{}", REPORTS_PREFIX, entity_id, id),
    }
}

/// Rejects keys that could escape the storage root.
pub fn validate_key(storage_key: &str) -> bool {
    !storage_key.is_empty()
        && !storage_key.starts_with('/')
        && !storage_key.contains('\\')
        && storage_key
            .split('/')
            .all(|part| !part.is_empty() && part != "." && part != "..")
}
