//! Persistence engine
//!
//! Maps records onto rows and back, cascading through collection fields:
//! - inserts write the container row first, then its children
//! - reads materialize each row and load related rows per collection field
//!
//! Every top-level call starts a fresh [`TraversalPath`] holding the root
//! type; a collection whose type is already on the path is not expanded.
//!
//! Limitations kept on purpose: assigned identities are returned but not
//! written back onto the record, `update` and `delete` never touch related
//! or join tables, and no transaction wraps a cascade.

use crate::codec::{self, Value};
use crate::predicate::{self, Predicate};
use crate::record::{self, Entity, Record};
use crate::relationship::{self, RelationshipKind, RelationshipRegistry};
use crate::schema::{self, EntityType, IDENTITY_FIELD};
use crate::storage::{ColumnDef, Row, RowStore};
use crate::traversal::{ExpansionOutcome, ReadReport, TraversalPath};
use crate::{Error, Result};

/// Object-relational mapper over a [`RowStore`]
pub struct Persistence<S: RowStore> {
    store: S,
    relationships: RelationshipRegistry,
}

impl<S: RowStore> Persistence<S> {
    /// Create an engine with a set of relationship declarations
    pub fn new(store: S, relationships: RelationshipRegistry) -> Self {
        Self { store, relationships }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn relationships(&self) -> &RelationshipRegistry {
        &self.relationships
    }

    pub fn into_store(self) -> S {
        self.store
    }

    // ========== Schema ==========

    /// Create the table for `T`, the tables of every type reachable through
    /// its collections, and the join tables of its many-to-many relationships.
    pub fn create_schema<T: Entity>(&self) -> Result<()> {
        let entity = T::entity_type();
        self.create_tables(entity, &TraversalPath::root(entity))
    }

    fn create_tables(&self, entity: &'static EntityType, path: &TraversalPath) -> Result<()> {
        let mut columns = schema::column_defs(entity)?;
        if let Some(column) = self.foreign_key_column(entity) {
            if !columns.iter().any(|c| c.name == column.name) {
                columns.push(column);
            }
        }
        self.store.create_table(&entity.table_name()?, &columns)?;

        for (_, related) in entity.collections() {
            let Some(child_path) = path.try_enter(related) else {
                continue;
            };

            if self.relationships.classify(entity, related) == RelationshipKind::ManyToMany {
                let join = relationship::join_table_name(entity, related)?;
                self.store.create_table(
                    &join,
                    &[
                        ColumnDef::new(relationship::join_column(entity)?, "INTEGER").not_null(),
                        ColumnDef::new(relationship::join_column(related)?, "INTEGER").not_null(),
                    ],
                )?;
            }

            self.create_tables(related, &child_path)?;
        }
        Ok(())
    }

    /// Foreign key column a has-many declaration adds to `entity`'s table.
    ///
    /// The column need not be a field of the type itself.
    fn foreign_key_column(&self, entity: &EntityType) -> Option<ColumnDef> {
        let hint = self.relationships.declared_foreign_key_of(entity)?;
        let sql_type = hint.foreign_key_type?;
        Some(ColumnDef::new(schema::column_name(&hint.foreign_key), sql_type))
    }

    // ========== Reads ==========

    /// Every record of type `T`.
    ///
    /// Two many-to-many collections of the same related type on one
    /// container share a single join table, so each is loaded with the
    /// members of both.
    pub fn find_all<T: Entity>(&self) -> Result<Vec<T>> {
        self.read(None, None, &mut ReadReport::new())
    }

    /// Every record of type `T`, with the outcome of each collection expansion
    pub fn find_all_with_report<T: Entity>(&self) -> Result<(Vec<T>, ReadReport)> {
        let mut report = ReadReport::new();
        let records = self.read(None, None, &mut report)?;
        Ok((records, report))
    }

    /// The first record matching the non-default fields of `sample`.
    ///
    /// Without a sample, any single record.
    pub fn find_first_where<T: Entity>(&self, sample: Option<&T>) -> Result<Option<T>> {
        let predicate = match sample {
            Some(sample) => predicate::build_equality_predicate(sample)?,
            None => None,
        };
        let mut records = self.read(predicate.as_ref(), Some(1), &mut ReadReport::new())?;
        Ok(records.pop())
    }

    /// Every record matching the non-default fields of `sample`
    pub fn find_all_where<T: Entity>(&self, sample: &T) -> Result<Vec<T>> {
        let predicate = predicate::build_equality_predicate(sample)?;
        self.read(predicate.as_ref(), None, &mut ReadReport::new())
    }

    /// Raw rows matching `sample`, without materializing records
    pub fn find_rows_where<T: Entity>(&self, sample: &T) -> Result<Vec<Row>> {
        let predicate = predicate::build_equality_predicate(sample)?;
        self.store
            .query_rows(&T::entity_type().table_name()?, predicate.as_ref(), None)
    }

    /// Number of rows matching `sample`
    pub fn count_where<T: Entity>(&self, sample: &T) -> Result<usize> {
        let predicate = predicate::build_equality_predicate(sample)?;
        self.store
            .count_rows(&T::entity_type().table_name()?, predicate.as_ref())
    }

    fn read<T: Entity>(&self, predicate: Option<&Predicate>, limit: Option<usize>, report: &mut ReadReport) -> Result<Vec<T>> {
        let entity = T::entity_type();
        let rows = self.store.query_rows(&entity.table_name()?, predicate, limit)?;
        tracing::debug!("Read {} {} row(s)", rows.len(), entity.name);

        rows.iter()
            .map(|row| {
                let record = self.materialize(entity, row, &TraversalPath::root(entity), report)?;
                record::downcast::<T>(record)
            })
            .collect()
    }

    /// Build a record from a row and load its collections
    fn materialize(
        &self,
        entity: &'static EntityType,
        row: &Row,
        path: &TraversalPath,
        report: &mut ReadReport,
    ) -> Result<Box<dyn Record>> {
        let mut record = entity.instantiate();

        for field in entity.columns() {
            let Some(value) = row.get_column(&field.column_name()) else {
                continue;
            };
            if let Some(decoded) = codec::decode_field(entity, field, value)? {
                record.set(field.name, decoded)?;
            }
        }

        for (field, related) in entity.collections() {
            let outcome = match path.try_enter(related) {
                None => ExpansionOutcome::SkippedCycle,
                Some(child_path) => match self.load_related(entity, related, row, &child_path, report)? {
                    Some(children) => {
                        let count = children.len();
                        record.set_related(field.name, children)?;
                        ExpansionOutcome::Loaded(count)
                    }
                    None => ExpansionOutcome::Unresolvable,
                },
            };

            if !matches!(outcome, ExpansionOutcome::Loaded(_)) {
                tracing::trace!("{}.{} not expanded: {:?}", entity.name, field.name, outcome);
            }
            report.record(entity.name, field.name, outcome);
        }

        Ok(record)
    }

    /// Related records of one container row, `None` if the relationship
    /// cannot be resolved from this row.
    fn load_related(
        &self,
        container: &'static EntityType,
        related: &'static EntityType,
        row: &Row,
        path: &TraversalPath,
        report: &mut ReadReport,
    ) -> Result<Option<Vec<Box<dyn Record>>>> {
        let rows = match self.relationships.classify(container, related) {
            RelationshipKind::ManyToMany => {
                let Some(id) = row.get_column(IDENTITY_FIELD).and_then(Value::as_i64) else {
                    return Ok(None);
                };
                if !related.has_identity() {
                    return Ok(None);
                }
                let sql = format!(
                    "SELECT * FROM {} WHERE {} IN (SELECT {} FROM {} WHERE {} = ?1)",
                    related.table_name()?,
                    IDENTITY_FIELD,
                    relationship::join_column(related)?,
                    relationship::join_table_name(container, related)?,
                    relationship::join_column(container)?,
                );
                self.store.raw_query(&sql, &[Value::Integer(id)])?
            }
            RelationshipKind::HasMany => {
                let Some(hint) = self.relationships.declared_foreign_key_of(related) else {
                    return Ok(None);
                };
                if container.field(&hint.through).is_none() {
                    return Ok(None);
                }
                let Some(value) = row
                    .get_column(&schema::column_name(&hint.through))
                    .filter(|v| !v.is_null())
                else {
                    return Ok(None);
                };
                let predicate = Predicate::new().eq(schema::column_name(&hint.foreign_key), value.clone());
                self.store
                    .query_rows(&related.table_name()?, Some(&predicate), None)?
            }
            RelationshipKind::None => return Ok(None),
        };

        rows.iter()
            .map(|row| self.materialize(related, row, path, report))
            .collect::<Result<Vec<_>>>()
            .map(Some)
    }

    // ========== Writes ==========

    /// Insert a record and, cascading, the members of its collections.
    ///
    /// Returns the identity storage assigned to the record's row.
    ///
    /// Members of two many-to-many collections of the same related type are
    /// paired with the container in one shared join table; reads cannot tell
    /// the two fields apart.
    pub fn insert<T: Entity>(&self, record: &T) -> Result<i64> {
        let entity = T::entity_type();
        self.insert_record(record, &TraversalPath::root(entity), Vec::new())
    }

    fn insert_record(&self, record: &dyn Record, path: &TraversalPath, initial: Vec<(String, Value)>) -> Result<i64> {
        let entity = record.entity();
        let mut values = encode_columns(record)?;
        for (column, value) in initial {
            match values.iter_mut().find(|(c, _)| *c == column) {
                Some(slot) => slot.1 = value,
                None => values.push((column, value)),
            }
        }

        let id = self.store.create_row(&entity.table_name()?, &values)?;
        tracing::debug!("Inserted {} #{}", entity.name, id);

        self.insert_children(record, id, path)?;
        Ok(id)
    }

    fn insert_children(&self, record: &dyn Record, id: i64, path: &TraversalPath) -> Result<()> {
        let entity = record.entity();

        for (field, related) in entity.collections() {
            let Some(child_path) = path.try_enter(related) else {
                tracing::trace!("{}.{} not expanded: {} is already on the path", entity.name, field.name, related.name);
                continue;
            };
            let children = record.related(field.name).unwrap_or_default();

            match self.relationships.classify(entity, related) {
                RelationshipKind::ManyToMany => {
                    let join = relationship::join_table_name(entity, related)?;
                    let container_column = relationship::join_column(entity)?;
                    let related_column = relationship::join_column(related)?;
                    for child in children {
                        let child_id = self.insert_record(child, &child_path, Vec::new())?;
                        self.store.create_row(
                            &join,
                            &[
                                (container_column.clone(), Value::Integer(id)),
                                (related_column.clone(), Value::Integer(child_id)),
                            ],
                        )?;
                    }
                }
                RelationshipKind::HasMany => {
                    let Some(foreign) = self.foreign_value(record, id, related)? else {
                        tracing::trace!("{}.{} not expanded: through field unresolved", entity.name, field.name);
                        continue;
                    };
                    for child in children {
                        self.insert_record(child, &child_path, vec![foreign.clone()])?;
                    }
                }
                RelationshipKind::None => {}
            }
        }
        Ok(())
    }

    /// Foreign key column and value a has-many child receives from its container
    fn foreign_value(&self, container: &dyn Record, id: i64, related: &EntityType) -> Result<Option<(String, Value)>> {
        let entity = container.entity();
        let Some(hint) = self.relationships.declared_foreign_key_of(related) else {
            return Ok(None);
        };
        let Some(through) = entity.field(&hint.through) else {
            return Ok(None);
        };
        let Some(value) = container.get(through.name) else {
            return Ok(None);
        };

        // An unset identity is not on the record yet; use the one just assigned
        let encoded = codec::encode_field(entity, through, &value)?.unwrap_or(Value::Integer(id));
        Ok(Some((schema::column_name(&hint.foreign_key), encoded)))
    }

    /// Overwrite every row matching `sample` with the scalar fields of `record`.
    ///
    /// Collections are ignored. A default sample matches every row. A record
    /// with nothing to write (only an unset identity) leaves storage untouched
    /// and reports 0.
    pub fn update<T: Entity>(&self, record: &T, sample: &T) -> Result<usize> {
        let values = encode_columns(record)?;
        let predicate = predicate::build_equality_predicate(sample)?;
        let affected = self
            .store
            .update_rows(&T::entity_type().table_name()?, &values, predicate.as_ref())?;
        tracing::debug!("Updated {} {} row(s)", affected, T::entity_type().name);
        Ok(affected)
    }

    /// Delete every row matching `sample`.
    ///
    /// Related rows and join rows are left in place. A default sample
    /// matches every row.
    pub fn delete<T: Entity>(&self, sample: &T) -> Result<usize> {
        let predicate = predicate::build_equality_predicate(sample)?;
        let affected = self
            .store
            .delete_rows(&T::entity_type().table_name()?, predicate.as_ref())?;
        tracing::debug!("Deleted {} {} row(s)", affected, T::entity_type().name);
        Ok(affected)
    }
}

/// Encode the scalar columns of a record, leaving out an unset identity
fn encode_columns(record: &dyn Record) -> Result<Vec<(String, Value)>> {
    let entity = record.entity();
    let mut values = Vec::new();
    for field in entity.columns() {
        let value = record.get(field.name).ok_or_else(|| Error::UnknownField {
            entity: entity.name.to_string(),
            field: field.name.to_string(),
        })?;
        if let Some(encoded) = codec::encode_field(entity, field, &value)? {
            values.push((field.column_name(), encoded));
        }
    }
    Ok(values)
}
