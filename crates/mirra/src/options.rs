//! Database configuration

use mirra_sync::DEFAULT_SPIN_LIMIT;

/// Options applied when a [`Database`](crate::Database) is created
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseOptions {
    /// Spin rounds before a contended lock waiter parks.
    ///
    /// Applies to the database lock and to every descriptor's table lock.
    pub spin_limit: u32,

    /// Reflect the unit type and every arithmetic type on creation
    pub preload_builtins: bool,
}

impl Default for DatabaseOptions {
    fn default() -> Self {
        Self {
            spin_limit: DEFAULT_SPIN_LIMIT,
            preload_builtins: false,
        }
    }
}

impl DatabaseOptions {
    /// Default options
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the spin limit
    pub fn with_spin_limit(mut self, spin_limit: u32) -> Self {
        self.spin_limit = spin_limit;
        self
    }

    /// Enable or disable eager reflection of built-in types
    pub fn with_preload_builtins(mut self, preload: bool) -> Self {
        self.preload_builtins = preload;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options() {
        let options = DatabaseOptions::default();
        assert_eq!(options.spin_limit, 12);
        assert!(!options.preload_builtins);
    }

    #[test]
    fn test_builder() {
        let options = DatabaseOptions::new()
            .with_spin_limit(4)
            .with_preload_builtins(true);
        assert_eq!(options.spin_limit, 4);
        assert!(options.preload_builtins);
    }
}
