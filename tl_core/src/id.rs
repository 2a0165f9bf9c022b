use crate::Error;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Record identifier for orders and users, backed by a ULID so that replicas
/// can mint ids without coordinating through the store
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Id(ulid::Ulid);

impl Id {
    pub fn new() -> Self {
        Self(ulid::Ulid::new())
    }
}

impl Default for Id {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for Id {
    type Err = Error;

    /// Parse a path segment; malformed ids are a client error
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<ulid::Ulid>()
            .map(Self)
            .map_err(|_| Error::Validation(format!("Invalid id: {}", s)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_unique_and_sortable() {
        let first = Id::new();
        let second = Id::new();
        assert_ne!(first, second);
        assert_eq!(first.to_string().len(), 26);
    }

    #[test]
    fn test_malformed_id_is_validation_error() {
        let err = "not-an-id".parse::<Id>().unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn test_parse_display_agree() {
        let id = Id::new();
        assert_eq!(id.to_string().parse::<Id>().unwrap(), id);
    }
}
