//! Traversal guard for relationship expansion
//!
//! A [`TraversalPath`] lists the record types currently being expanded, root
//! first. Entering a type returns an extended copy and leaves the original
//! untouched, so sibling branches never see each other's entries and there
//! is nothing to undo when a branch finishes or fails.

use std::rc::Rc;
use crate::schema::EntityType;

#[derive(Debug)]
struct PathNode {
    entity: &'static str,
    parent: Option<Rc<PathNode>>,
}

/// Immutable chain of types on the current expansion path
#[derive(Debug, Clone, Default)]
pub struct TraversalPath {
    head: Option<Rc<PathNode>>,
}

impl TraversalPath {
    /// A path with no types on it
    pub fn empty() -> Self {
        Self::default()
    }

    /// The path of a top-level call, holding only the root type
    pub fn root(entity: &EntityType) -> Self {
        Self::empty().push(entity.name)
    }

    fn push(&self, entity: &'static str) -> Self {
        Self {
            head: Some(Rc::new(PathNode {
                entity,
                parent: self.head.clone(),
            })),
        }
    }

    fn nodes(&self) -> impl Iterator<Item = &PathNode> {
        std::iter::successors(self.head.as_deref(), |node| node.parent.as_deref())
    }

    /// Whether `entity` is already being expanded on this path
    pub fn contains(&self, entity: &EntityType) -> bool {
        self.nodes().any(|node| node.entity == entity.name)
    }

    /// Extend the path with `entity`, or `None` if it is already on the path.
    pub fn try_enter(&self, entity: &EntityType) -> Option<TraversalPath> {
        if self.contains(entity) {
            None
        } else {
            Some(self.push(entity.name))
        }
    }

    pub fn depth(&self) -> usize {
        self.nodes().count()
    }

    /// Type names on the path, root first
    pub fn entities(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.nodes().map(|node| node.entity).collect();
        names.reverse();
        names
    }
}

/// What happened to one collection field during a read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpansionOutcome {
    /// Related rows were queried; holds how many were found (possibly zero)
    Loaded(usize),
    /// The related type was already on the path
    SkippedCycle,
    /// The relationship could not be resolved from this row
    Unresolvable,
}

/// One expansion outcome for a collection field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expansion {
    pub entity: &'static str,
    pub field: &'static str,
    pub outcome: ExpansionOutcome,
}

/// Outcomes of every collection expansion during a read.
///
/// An empty collection on a returned record may mean either "no related
/// rows" or "not expanded"; the report tells the two apart.
#[derive(Debug, Clone, Default)]
pub struct ReadReport {
    expansions: Vec<Expansion>,
}

impl ReadReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, entity: &'static str, field: &'static str, outcome: ExpansionOutcome) {
        self.expansions.push(Expansion { entity, field, outcome });
    }

    pub fn expansions(&self) -> &[Expansion] {
        &self.expansions
    }

    /// Outcomes recorded for one field of one type, in read order
    pub fn outcomes_for(&self, entity: &str, field: &str) -> Vec<ExpansionOutcome> {
        self.expansions
            .iter()
            .filter(|e| e.entity == entity && e.field == field)
            .map(|e| e.outcome)
            .collect()
    }

    pub fn skipped_cycles(&self) -> usize {
        self.expansions
            .iter()
            .filter(|e| e.outcome == ExpansionOutcome::SkippedCycle)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity;
    use crate::record::Entity;

    entity! {
        #[derive(Debug, Default)]
        struct Author {
            id: i64,
        }
        collections {
            books: Book,
        }
    }

    entity! {
        #[derive(Debug, Default)]
        struct Book {
            id: i64,
        }
        collections {
            authors: Author,
        }
    }

    entity! {
        #[derive(Debug, Default)]
        struct Review {
            id: i64,
        }
    }

    #[test]
    fn test_root_contains_itself() {
        let path = TraversalPath::root(Author::entity_type());
        assert!(path.contains(Author::entity_type()));
        assert!(path.try_enter(Author::entity_type()).is_none());
        assert_eq!(path.depth(), 1);
    }

    #[test]
    fn test_enter_rejects_ancestors_only() {
        let root = TraversalPath::root(Author::entity_type());
        let books = root.try_enter(Book::entity_type()).unwrap();

        assert_eq!(books.entities(), vec!["Author", "Book"]);
        assert!(books.try_enter(Author::entity_type()).is_none());
        assert!(books.try_enter(Book::entity_type()).is_none());
        assert!(books.try_enter(Review::entity_type()).is_some());
    }

    #[test]
    fn test_siblings_are_independent() {
        let root = TraversalPath::root(Author::entity_type());
        let first = root.try_enter(Book::entity_type());
        assert!(first.is_some());

        // The parent is untouched, so a sibling field can enter the same type
        let second = root.try_enter(Book::entity_type());
        assert!(second.is_some());
        assert_eq!(root.depth(), 1);
    }

    #[test]
    fn test_read_report_separates_causes() {
        let mut report = ReadReport::new();
        report.record("Author", "books", ExpansionOutcome::Loaded(0));
        report.record("Book", "authors", ExpansionOutcome::SkippedCycle);

        assert_eq!(report.outcomes_for("Author", "books"), vec![ExpansionOutcome::Loaded(0)]);
        assert_eq!(report.outcomes_for("Book", "authors"), vec![ExpansionOutcome::SkippedCycle]);
        assert_eq!(report.skipped_cycles(), 1);
    }
}
