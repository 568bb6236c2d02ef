//! Relationship declarations and classification
//!
//! Relationships are declared up front rather than discovered:
//! - `HasMany`: the related type belongs to a container. Its foreign key
//!   column is filled from the container's "through" field.
//! - `ManyToMany`: the default for any collection field without a matching
//!   has-many declaration. Pairs live in a join table.

use std::collections::HashMap;
use crate::record::Entity;
use crate::schema::{self, EntityType};
use crate::Result;

/// How a container type relates to the type held in one of its collections
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationshipKind {
    /// No structural link
    None,
    /// Related rows carry a foreign key back to the container
    HasMany,
    /// A join table pairs container and related identities
    ManyToMany,
}

impl RelationshipKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RelationshipKind::None => "none",
            RelationshipKind::HasMany => "has_many",
            RelationshipKind::ManyToMany => "many_to_many",
        }
    }
}

impl std::fmt::Display for RelationshipKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Declaration that a related type belongs to a container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HasManyHint {
    /// Container type name
    pub container: &'static str,
    /// Field on the container whose value is copied into the foreign key
    pub through: String,
    /// Column on the related table holding the container's value
    pub foreign_key: String,
    /// Column type of the foreign key, `None` if the container has no such field
    pub foreign_key_type: Option<&'static str>,
}

/// Registry of has-many declarations, keyed by the related type.
#[derive(Debug, Clone, Default)]
pub struct RelationshipRegistry {
    belongs_to: HashMap<&'static str, HasManyHint>,
}

impl RelationshipRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare that `C` has many `R`: each `R` row stores `C.through` in its
    /// `foreign_key` column.
    pub fn has_many<C: Entity, R: Entity>(&mut self, through: &str, foreign_key: &str) -> &mut Self {
        let foreign_key_type = C::entity_type()
            .field(through)
            .and_then(|field| field.kind.sql_type());
        self.declare(
            R::entity_type(),
            HasManyHint {
                container: C::entity_type().name,
                through: through.to_string(),
                foreign_key: foreign_key.to_string(),
                foreign_key_type,
            },
        );
        self
    }

    /// Register a hint for a related type, replacing any earlier one
    pub fn declare(&mut self, related: &EntityType, hint: HasManyHint) {
        tracing::debug!(
            "{} belongs to {} via {} -> {}",
            related.name, hint.container, hint.through, hint.foreign_key
        );
        if let Some(previous) = self.belongs_to.insert(related.name, hint) {
            tracing::warn!(
                "Replaced has-many declaration of {} (was owned by {})",
                related.name, previous.container
            );
        }
    }

    /// The has-many hint declared for a related type, if any
    pub fn declared_foreign_key_of(&self, related: &EntityType) -> Option<&HasManyHint> {
        self.belongs_to.get(related.name)
    }

    /// Classify the relationship from `container` to `related`.
    ///
    /// A matching has-many declaration wins; otherwise a collection field of
    /// the related type means many-to-many.
    pub fn classify(&self, container: &EntityType, related: &EntityType) -> RelationshipKind {
        if self
            .declared_foreign_key_of(related)
            .is_some_and(|hint| hint.container == container.name)
        {
            return RelationshipKind::HasMany;
        }

        if container.collections().any(|(_, r)| r.name == related.name) {
            RelationshipKind::ManyToMany
        } else {
            RelationshipKind::None
        }
    }
}

/// Join table name for a many-to-many pair.
///
/// The two table names are ordered lexicographically, so either side of the
/// relationship derives the same table.
pub fn join_table_name(a: &EntityType, b: &EntityType) -> Result<String> {
    let a = schema::table_name(a)?;
    let b = schema::table_name(b)?;
    let (first, second) = if a <= b { (a, b) } else { (b, a) };
    Ok(format!("{}_{}", first, second))
}

/// Column in a join table referencing `entity`
pub fn join_column(entity: &EntityType) -> Result<String> {
    Ok(format!("{}_id", schema::table_name(entity)?))
}
