use crate::server::response::{ApiError, StoreOptionExt, StoreResultExt};
use crate::store::Store;

/// Resolves an explicit iteration id, or the active iteration when none is given.
pub fn resolve_iteration_id(store: &dyn Store, requested: Option<i64>) -> Result<i64, ApiError> {
    match requested {
        Some(id) => {
            store
                .get_iteration(id)
                .api_err("Failed to get iteration")?
                .or_not_found("Iteration not found")?;
            Ok(id)
        }
        None => {
            let active = store
                .get_active_iteration()
                .api_err("Failed to get active iteration")?
                .or_not_found("No active iteration")?;
            Ok(active.id)
        }
    }
}
