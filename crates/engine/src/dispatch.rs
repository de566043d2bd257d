use std::collections::HashMap;

use freebase_core::vocab::builtin_predicates;
use freebase_core::{PredicateKind, Triple};

/// Which pass a triple is being dispatched for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// mid → textid identity pre-pass.
    Identity,
    Main,
}

/// Predicate IRI → handler lookup, built once per run.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    table: HashMap<String, PredicateKind>,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Dispatcher {
    pub fn new() -> Self {
        let mut dispatcher = Self {
            table: HashMap::new(),
        };
        for (iri, kind) in builtin_predicates() {
            dispatcher.register(iri, kind);
        }
        dispatcher
    }

    /// Map another predicate IRI to an existing handler kind.
    pub fn register(&mut self, iri: impl Into<String>, kind: PredicateKind) {
        self.table.insert(iri.into(), kind);
    }

    pub fn lookup(&self, predicate: &str) -> Option<PredicateKind> {
        self.table.get(predicate).copied()
    }

    /// Handler for `triple` in `phase`, or `None` when the triple is dropped.
    pub fn dispatch(&self, phase: Phase, triple: &Triple) -> Option<PredicateKind> {
        let kind = self.lookup(triple.predicate_iri())?;
        match (phase, kind) {
            (Phase::Identity, PredicateKind::ObjectId) => Some(kind),
            (Phase::Identity, _) => None,
            (Phase::Main, PredicateKind::ObjectId) => None,
            (Phase::Main, _) => Some(kind),
        }
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use freebase_core::vocab::{self, ns};
    use freebase_core::{PropertyField, Term};

    use super::*;

    fn triple(predicate: &str) -> Triple {
        Triple::new(
            Term::iri(ns("m.01")),
            Term::iri(predicate),
            Term::plain("x"),
        )
    }

    #[test]
    fn maps_every_builtin_predicate() {
        let dispatcher = Dispatcher::new();
        assert_eq!(dispatcher.len(), 14);
        assert_eq!(
            dispatcher.dispatch(Phase::Main, &triple(vocab::TYPE_OBJECT_NAME)),
            Some(PredicateKind::Label)
        );
        assert_eq!(
            dispatcher.dispatch(Phase::Main, &triple(vocab::TYPE_PROPERTY_REVERSE)),
            Some(PredicateKind::PropertyField(PropertyField::ReverseProperty))
        );
        assert_eq!(
            dispatcher.dispatch(Phase::Main, &triple(vocab::TYPE_PROPERTY_UNIQUE)),
            Some(PredicateKind::UniqueFlag)
        );
    }

    #[test]
    fn unknown_predicates_are_dropped() {
        let dispatcher = Dispatcher::new();
        let unknown = triple(&ns("film.film.directed_by"));
        assert_eq!(dispatcher.dispatch(Phase::Main, &unknown), None);
        assert_eq!(dispatcher.dispatch(Phase::Identity, &unknown), None);
    }

    #[test]
    fn object_id_only_applies_to_the_identity_pass() {
        let dispatcher = Dispatcher::new();
        let object_id = triple(vocab::TYPE_OBJECT_ID);
        assert_eq!(
            dispatcher.dispatch(Phase::Identity, &object_id),
            Some(PredicateKind::ObjectId)
        );
        assert_eq!(dispatcher.dispatch(Phase::Main, &object_id), None);
        assert_eq!(
            dispatcher.dispatch(Phase::Identity, &triple(vocab::TYPE_OBJECT_NAME)),
            None
        );
    }

    #[test]
    fn registered_predicates_extend_the_table() {
        let mut dispatcher = Dispatcher::new();
        let name = ns("common.topic.official_name");
        dispatcher.register(name.clone(), PredicateKind::Alias);
        assert_eq!(
            dispatcher.dispatch(Phase::Main, &triple(&name)),
            Some(PredicateKind::Alias)
        );
    }
}
