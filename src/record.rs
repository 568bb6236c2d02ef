//! Record contract
//!
//! [`Record`] is the object-safe view the engine works with while walking
//! relationships across different types; [`Entity`] is the typed entry point
//! for callers. Both are normally generated by [`entity!`](crate::entity).

use std::any::Any;
use crate::codec::FieldValue;
use crate::schema::{EntityType, IDENTITY_FIELD};
use crate::{Error, Result};

/// A persisted record, viewed without its concrete type.
pub trait Record: Any {
    /// Descriptor of this record's type
    fn entity(&self) -> &'static EntityType;

    /// Current value of a scalar field, `None` if there is no such scalar field
    fn get(&self, field: &str) -> Option<FieldValue>;

    /// Overwrite a scalar field
    fn set(&mut self, field: &str, value: FieldValue) -> Result<()>;

    /// Members of a collection field, `None` if there is no such collection
    fn related(&self, field: &str) -> Option<Vec<&dyn Record>>;

    /// Replace the members of a collection field
    fn set_related(&mut self, field: &str, records: Vec<Box<dyn Record>>) -> Result<()>;

    fn into_any(self: Box<Self>) -> Box<dyn Any>;
}

/// A record type with a static descriptor and a default instance.
pub trait Entity: Record + Default + Sized {
    fn entity_type() -> &'static EntityType;
}

/// Constructor stored in every [`EntityType`]
pub fn construct<T: Entity>() -> Box<dyn Record> {
    Box::new(T::default())
}

/// Recover the concrete type of a boxed record
pub fn downcast<T: Entity>(record: Box<dyn Record>) -> Result<T> {
    let found = record.entity().name;
    record
        .into_any()
        .downcast::<T>()
        .map(|boxed| *boxed)
        .map_err(|_| Error::Construction {
            entity: format!("{} (got {})", T::entity_type().name, found),
        })
}

/// Downcast every member of a collection
pub fn downcast_all<T: Entity>(records: Vec<Box<dyn Record>>) -> Result<Vec<T>> {
    records.into_iter().map(downcast::<T>).collect()
}

/// The record's `id` value, if it has a 64-bit identity field
pub fn identity_of(record: &dyn Record) -> Option<i64> {
    match record.get(IDENTITY_FIELD)? {
        FieldValue::Long(id) => Some(id),
        FieldValue::Int(id) => Some(i64::from(id)),
        _ => None,
    }
}

/// Declare a persisted record type.
///
/// Scalar fields go in the struct body; collection fields go in an optional
/// `collections` block and name the related type, which becomes a `Vec` of
/// it. The struct must implement `Default`.
///
/// ```
/// relmap::entity! {
///     #[derive(Debug, Clone, Default, PartialEq)]
///     pub struct Team {
///         pub id: i64,
///         pub name: String,
///     }
///     collections {
///         pub heroes: Hero,
///     }
/// }
///
/// relmap::entity! {
///     #[derive(Debug, Clone, Default, PartialEq)]
///     pub struct Hero {
///         pub id: i64,
///         pub team_name: String,
///     }
/// }
///
/// let team = Team::default();
/// assert!(team.heroes.is_empty());
/// ```
#[macro_export]
macro_rules! entity {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            $( $fvis:vis $field:ident : $fty:ty ),* $(,)?
        }
        $( collections {
            $( $rvis:vis $rel:ident : $rty:ty ),* $(,)?
        } )?
    ) => {
        $(#[$meta])*
        $vis struct $name {
            $( $fvis $field: $fty, )*
            $($( $rvis $rel: ::std::vec::Vec<$rty>, )*)?
        }

        impl $crate::Entity for $name {
            fn entity_type() -> &'static $crate::EntityType {
                static ENTITY: $crate::EntityType = $crate::EntityType {
                    name: stringify!($name),
                    fields: &[
                        $( $crate::FieldDef::new(stringify!($field), <$fty as $crate::Scalar>::KIND), )*
                        $($( $crate::FieldDef::new(
                            stringify!($rel),
                            $crate::FieldKind::Collection(<$rty as $crate::Entity>::entity_type),
                        ), )*)?
                    ],
                    construct: $crate::record::construct::<$name>,
                };
                &ENTITY
            }
        }

        impl $crate::Record for $name {
            fn entity(&self) -> &'static $crate::EntityType {
                <Self as $crate::Entity>::entity_type()
            }

            fn get(&self, field: &str) -> ::std::option::Option<$crate::FieldValue> {
                $(
                    if field == stringify!($field) {
                        return Some($crate::Scalar::to_field(&self.$field));
                    }
                )*
                None
            }

            fn set(&mut self, field: &str, value: $crate::FieldValue) -> $crate::Result<()> {
                $(
                    if field == stringify!($field) {
                        self.$field = <$fty as $crate::Scalar>::from_field(value).map_err(|reason| {
                            $crate::Error::Encoding {
                                entity: stringify!($name).to_string(),
                                field: field.to_string(),
                                reason,
                            }
                        })?;
                        return Ok(());
                    }
                )*
                let _ = value;
                Err($crate::Error::UnknownField {
                    entity: stringify!($name).to_string(),
                    field: field.to_string(),
                })
            }

            fn related(&self, field: &str) -> ::std::option::Option<::std::vec::Vec<&dyn $crate::Record>> {
                let _ = field;
                $($(
                    if field == stringify!($rel) {
                        return Some(self.$rel.iter().map(|r| r as &dyn $crate::Record).collect());
                    }
                )*)?
                None
            }

            fn set_related(
                &mut self,
                field: &str,
                records: ::std::vec::Vec<::std::boxed::Box<dyn $crate::Record>>,
            ) -> $crate::Result<()> {
                $($(
                    if field == stringify!($rel) {
                        self.$rel = $crate::record::downcast_all::<$rty>(records)?;
                        return Ok(());
                    }
                )*)?
                drop(records);
                Err($crate::Error::UnknownField {
                    entity: stringify!($name).to_string(),
                    field: field.to_string(),
                })
            }

            fn into_any(self: ::std::boxed::Box<Self>) -> ::std::boxed::Box<dyn ::std::any::Any> {
                self
            }
        }
    };
}
