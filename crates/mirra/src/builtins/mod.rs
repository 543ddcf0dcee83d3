//! `Reflect` implementations for standard types

mod arithmetic;
mod std_types;

use crate::database::Database;
use std::sync::Arc;

/// Reflect the unit type and every arithmetic type in `db`
pub(crate) fn preload(db: &Arc<Database>) {
    db.type_of::<()>();
    arithmetic::preload(db);
    tracing::debug!(types = db.len(), "Preloaded built-in types");
}
