//! Schema mapping - static per-type descriptors
//!
//! Every persisted type carries an [`EntityType`]: its name, its fields in
//! declaration order, and a constructor for a default instance. Table and
//! column names are derived from it through [`crate::naming`].

use std::fmt;
use crate::naming;
use crate::record::Record;
use crate::storage::ColumnDef;
use crate::Result;

/// Name of the primary identity field.
pub const IDENTITY_FIELD: &str = "id";

/// The kind of a record field.
#[derive(Clone, Copy)]
pub enum FieldKind {
    /// 32-bit integer
    Integer,
    /// 64-bit integer
    BigInt,
    /// Boolean stored as 0/1
    Boolean,
    /// Single precision float
    Float,
    /// Double precision float
    Double,
    /// Text
    Text,
    /// Any other scalar, stored through its string form
    Other,
    /// Ordered collection of exactly one related record type
    Collection(fn() -> &'static EntityType),
}

impl FieldKind {
    /// Column type used when creating tables
    pub fn sql_type(&self) -> Option<&'static str> {
        match self {
            FieldKind::Integer | FieldKind::BigInt | FieldKind::Boolean => Some("INTEGER"),
            FieldKind::Float | FieldKind::Double => Some("REAL"),
            FieldKind::Text | FieldKind::Other => Some("TEXT"),
            FieldKind::Collection(_) => None,
        }
    }

    /// The related type, for collection fields
    pub fn related(&self) -> Option<&'static EntityType> {
        match self {
            FieldKind::Collection(related) => Some(related()),
            _ => None,
        }
    }

    pub fn is_collection(&self) -> bool {
        matches!(self, FieldKind::Collection(_))
    }
}

impl PartialEq for FieldKind {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (FieldKind::Collection(a), FieldKind::Collection(b)) => a().name == b().name,
            _ => std::mem::discriminant(self) == std::mem::discriminant(other),
        }
    }
}

impl fmt::Debug for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldKind::Collection(related) => write!(f, "Collection({})", related().name),
            other => write!(f, "{}", other),
        }
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FieldKind::Integer => "integer",
            FieldKind::BigInt => "bigint",
            FieldKind::Boolean => "boolean",
            FieldKind::Float => "float",
            FieldKind::Double => "double",
            FieldKind::Text => "text",
            FieldKind::Other => "other",
            FieldKind::Collection(_) => "collection",
        };
        write!(f, "{}", name)
    }
}

/// A named field of a record type
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldDef {
    pub name: &'static str,
    pub kind: FieldKind,
}

impl FieldDef {
    pub const fn new(name: &'static str, kind: FieldKind) -> Self {
        Self { name, kind }
    }

    /// Column name for this field
    pub fn column_name(&self) -> String {
        column_name(self.name)
    }
}

/// Static descriptor of a persisted record type.
///
/// Built once per type (usually by [`entity!`](crate::entity)) and shared
/// by reference for the life of the program.
pub struct EntityType {
    /// Type name, e.g. `"BlogPost"`
    pub name: &'static str,
    /// All fields, scalar and collection, in declaration order
    pub fields: &'static [FieldDef],
    /// Builds a default instance
    pub construct: fn() -> Box<dyn Record>,
}

impl EntityType {
    /// Scalar fields, i.e. the persisted columns
    pub fn columns(&self) -> impl Iterator<Item = &'static FieldDef> + use<> {
        columns_of(self)
    }

    /// Fields holding a collection of a related type
    pub fn collections(&self) -> impl Iterator<Item = (&'static FieldDef, &'static EntityType)> + use<> {
        self.fields
            .iter()
            .filter_map(|f| f.kind.related().map(|related| (f, related)))
    }

    /// Look up a field by name
    pub fn field(&self, name: &str) -> Option<&'static FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn table_name(&self) -> Result<String> {
        table_name(self)
    }

    /// Whether this type has a 64-bit `id` field
    pub fn has_identity(&self) -> bool {
        self.field(IDENTITY_FIELD)
            .is_some_and(|f| f.kind == FieldKind::BigInt)
    }

    /// Build a default instance
    pub fn instantiate(&self) -> Box<dyn Record> {
        (self.construct)()
    }
}

impl fmt::Debug for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityType")
            .field("name", &self.name)
            .field("fields", &self.fields)
            .finish()
    }
}

impl PartialEq for EntityType {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

/// Persisted fields of a type, excluding relationship collections
pub fn columns_of(entity: &EntityType) -> impl Iterator<Item = &'static FieldDef> + use<> {
    entity.fields.iter().filter(|f| !f.kind.is_collection())
}

/// Table name for a type
pub fn table_name(entity: &EntityType) -> Result<String> {
    naming::sql_identifier(entity.name)
}

/// Column name for a field
pub fn column_name(field: &str) -> String {
    naming::normalize(field)
}

/// Storage columns for a type.
///
/// A 64-bit `id` field becomes the primary key, so storage assigns it when a
/// row is written without one.
pub fn column_defs(entity: &EntityType) -> Result<Vec<ColumnDef>> {
    columns_of(entity)
        .map(|field| {
            let name = naming::sql_identifier(field.name)?;
            let sql_type = field.kind.sql_type().unwrap_or("TEXT");
            let column = ColumnDef::new(name, sql_type);
            Ok(if field.name == IDENTITY_FIELD && field.kind == FieldKind::BigInt {
                column.primary_key()
            } else {
                column
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity;

    entity! {
        #[derive(Debug, Clone, Default, PartialEq)]
        pub struct BlogPost {
            pub id: i64,
            pub title: String,
            pub word_count: i32,
            pub published: bool,
            pub rating: f64,
        }
        collections {
            pub tags: Tag,
        }
    }

    entity! {
        #[derive(Debug, Clone, Default, PartialEq)]
        pub struct Tag {
            pub id: i64,
            pub label: String,
        }
    }

    #[test]
    fn test_columns_exclude_collections() {
        let entity = <BlogPost as crate::Entity>::entity_type();
        let names: Vec<_> = entity.columns().map(|f| f.name).collect();
        assert_eq!(names, vec!["id", "title", "word_count", "published", "rating"]);

        let collections: Vec<_> = entity.collections().map(|(f, r)| (f.name, r.name)).collect();
        assert_eq!(collections, vec![("tags", "Tag")]);
    }

    #[test]
    fn test_table_and_column_names() {
        let entity = <BlogPost as crate::Entity>::entity_type();
        assert_eq!(entity.table_name().unwrap(), "blog_post");
        assert_eq!(column_name("wordCount"), "word_count");
        assert!(entity.has_identity());
    }

    #[test]
    fn test_column_defs() {
        let columns = column_defs(<BlogPost as crate::Entity>::entity_type()).unwrap();
        let rendered: Vec<_> = columns.iter().map(|c| c.to_sql()).collect();
        assert_eq!(
            rendered,
            vec![
                "id INTEGER PRIMARY KEY",
                "title TEXT",
                "word_count INTEGER",
                "published INTEGER",
                "rating REAL",
            ]
        );
    }

    #[test]
    fn test_collection_kind_equality_by_related_name() {
        let entity = <BlogPost as crate::Entity>::entity_type();
        let tags = entity.field("tags").unwrap();
        assert_eq!(tags.kind.related().unwrap().name, "Tag");
        assert_ne!(tags.kind, FieldKind::Text);
    }
}
