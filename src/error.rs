use std::fmt;

/// Which level of the hierarchy an error is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    Menu,
    Submenu,
    Dish,
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Menu => "menu",
            Self::Submenu => "submenu",
            Self::Dish => "dish",
        };
        f.write_str(name)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    #[error("{0} not found")]
    NotFound(Entity),

    #[error("{entity} with the same title already exists in this {parent}")]
    Conflict { entity: Entity, parent: Entity },

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl RepoError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }

    /// Turn a store-level UNIQUE violation into the matching `Conflict`.
    pub(crate) fn from_write(err: sqlx::Error, entity: Entity, parent: Entity) -> Self {
        if is_unique_violation(&err) {
            Self::Conflict { entity, parent }
        } else {
            Self::Database(err)
        }
    }
}

// SQLITE_CONSTRAINT_UNIQUE
const SQLITE_UNIQUE: &str = "2067";

fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().as_deref() == Some(SQLITE_UNIQUE),
        _ => false,
    }
}

pub type Result<T> = std::result::Result<T, RepoError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_entity() {
        assert_eq!(RepoError::NotFound(Entity::Dish).to_string(), "dish not found");
        let conflict = RepoError::Conflict {
            entity: Entity::Submenu,
            parent: Entity::Menu,
        };
        assert_eq!(
            conflict.to_string(),
            "submenu with the same title already exists in this menu"
        );
        assert!(conflict.is_conflict());
        assert!(!conflict.is_not_found());
    }

    #[test]
    fn plain_database_errors_are_not_conflicts() {
        let err = RepoError::from_write(sqlx::Error::RowNotFound, Entity::Dish, Entity::Submenu);
        assert!(matches!(err, RepoError::Database(_)));
    }
}
