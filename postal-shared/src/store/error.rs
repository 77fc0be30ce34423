use std::fmt;

/// What the gateway was doing when it failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Fetching,
    Creating,
    Updating,
    Deleting,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Action::Fetching => "fetching",
            Action::Creating => "creating",
            Action::Updating => "updating",
            Action::Deleting => "deleting",
        })
    }
}

/// Storage failure
///
/// Every variant renders as a single human-readable sentence naming the
/// table, since that is what ends up in a dashboard's error state.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Backend or constraint failure
    #[error("Error {action} {table}: {source}")]
    Database {
        table: &'static str,
        action: Action,
        #[source]
        source: sqlx::Error,
    },

    /// No row carries the requested id
    #[error("Error {action} {table}: no row with id {id}")]
    NotFound {
        table: &'static str,
        action: Action,
        id: i64,
    },

    /// A single-row lookup matched more than one row
    #[error("Error fetching {table}: more than one row matched {column}")]
    Ambiguous {
        table: &'static str,
        column: &'static str,
    },

    /// Insert or update called without any column to write
    #[error("Error {action} {table}: no fields supplied")]
    EmptyChangeset {
        table: &'static str,
        action: Action,
    },
}

impl StoreError {
    pub(crate) fn database(table: &'static str, action: Action, source: sqlx::Error) -> Self {
        StoreError::Database {
            table,
            action,
            source,
        }
    }

    /// Name of the violated constraint, if the backend reported one
    pub fn constraint(&self) -> Option<&str> {
        match self {
            StoreError::Database {
                source: sqlx::Error::Database(db_err),
                ..
            } => db_err.constraint(),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_table_and_action() {
        let err = StoreError::NotFound {
            table: "shipments",
            action: Action::Updating,
            id: 42,
        };
        assert_eq!(err.to_string(), "Error updating shipments: no row with id 42");
        assert!(err.is_not_found());

        let err = StoreError::Ambiguous {
            table: "users",
            column: "email",
        };
        assert_eq!(
            err.to_string(),
            "Error fetching users: more than one row matched email"
        );

        let err = StoreError::database("shipping_methods", Action::Deleting, sqlx::Error::PoolTimedOut);
        assert!(err.to_string().starts_with("Error deleting shipping_methods: "));
        assert!(err.constraint().is_none());
        assert!(!err.is_not_found());
    }
}
