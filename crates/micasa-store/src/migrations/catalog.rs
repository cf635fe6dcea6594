//! Migration catalog
//!
//! A catalog is built by the caller and handed to the engine. Ordering is
//! checked once, here; the engine trusts it and never sorts.

use micasa_core::errors::{ExError, ExErrorKind};

use crate::errors::Result;

/// One versioned group of statements applied together
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationUnit {
    version: u32,
    statements: Vec<String>,
}

impl MigrationUnit {
    /// Create a unit from its version and statements (run in order)
    pub fn new<I, S>(version: u32, statements: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            version,
            statements: statements.into_iter().map(Into::into).collect(),
        }
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn statements(&self) -> &[String] {
        &self.statements
    }
}

/// Ordered, immutable list of migration units
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
    units: Vec<MigrationUnit>,
}

impl Catalog {
    /// Build a catalog, rejecting malformed unit lists
    ///
    /// Versions must be positive and strictly ascending, and every unit needs
    /// at least one statement. A catalog failing these checks is a
    /// programming error in the caller, not something to recover from.
    ///
    /// # Errors
    ///
    /// `InvalidInput` naming the offending version.
    pub fn new(units: Vec<MigrationUnit>) -> Result<Self> {
        let mut previous: Option<u32> = None;
        for unit in &units {
            if unit.version == 0 {
                return Err(invalid_catalog(0, "version must be positive"));
            }
            if let Some(prev) = previous {
                if unit.version <= prev {
                    return Err(invalid_catalog(
                        unit.version,
                        &format!("version follows {} (must be strictly ascending)", prev),
                    ));
                }
            }
            if unit.statements.is_empty() {
                return Err(invalid_catalog(unit.version, "unit has no statements"));
            }
            previous = Some(unit.version);
        }
        Ok(Self { units })
    }

    /// Build a catalog whose ordering is guaranteed by construction
    pub(crate) fn from_ordered(units: Vec<MigrationUnit>) -> Self {
        debug_assert!(units.windows(2).all(|w| w[0].version < w[1].version));
        Self { units }
    }

    pub fn units(&self) -> &[MigrationUnit] {
        &self.units
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Highest version in the catalog
    pub fn latest_version(&self) -> Option<u32> {
        self.units.last().map(MigrationUnit::version)
    }
}

fn invalid_catalog(version: u32, reason: &str) -> ExError {
    ExError::new(ExErrorKind::InvalidInput)
        .with_op("build_catalog")
        .with_version(version)
        .with_message(format!("Invalid migration catalog: {}", reason))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit(version: u32) -> MigrationUnit {
        MigrationUnit::new(version, ["SELECT 1"])
    }

    #[test]
    fn test_ascending_catalog_accepted() {
        let catalog = Catalog::new(vec![unit(1), unit(2), unit(5)]).unwrap();
        assert_eq!(catalog.len(), 3);
        assert_eq!(catalog.latest_version(), Some(5));
    }

    #[test]
    fn test_empty_catalog_accepted() {
        let catalog = Catalog::new(Vec::new()).unwrap();
        assert!(catalog.is_empty());
        assert_eq!(catalog.latest_version(), None);
    }

    #[test]
    fn test_out_of_order_rejected() {
        let err = Catalog::new(vec![unit(2), unit(1)]).unwrap_err();
        assert_eq!(err.kind(), ExErrorKind::InvalidInput);
        assert_eq!(err.version(), Some(1));
    }

    #[test]
    fn test_duplicate_version_rejected() {
        let err = Catalog::new(vec![unit(1), unit(1)]).unwrap_err();
        assert_eq!(err.kind(), ExErrorKind::InvalidInput);
    }

    #[test]
    fn test_zero_version_rejected() {
        assert!(Catalog::new(vec![unit(0)]).is_err());
    }

    #[test]
    fn test_unit_without_statements_rejected() {
        let empty = MigrationUnit::new(1, Vec::<String>::new());
        assert!(Catalog::new(vec![empty]).is_err());
    }

    #[test]
    fn test_statements_keep_order() {
        let unit = MigrationUnit::new(3, ["CREATE TABLE a (x)", "CREATE TABLE b (y)"]);
        assert_eq!(unit.statements()[0], "CREATE TABLE a (x)");
        assert_eq!(unit.statements()[1], "CREATE TABLE b (y)");
    }
}
