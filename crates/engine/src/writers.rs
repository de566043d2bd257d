//! Per-predicate fact writers.

use tracing::{debug, error, info, warn};

use freebase_core::keys::{decode_key, is_interesting_key};
use freebase_core::{PredicateKind, PropertyField, Term, TopicId, TopicKey, Triple};
use freebase_storage::{LanguageFacet, StorageError, Store, WriteOutcome};

use crate::resolver::TopicResolver;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Subject or object could not be turned into a topic.
    Unresolved,
    /// Label-like predicate whose object has no language tag.
    NotALanguageLiteral,
    /// Key or flag predicate whose object is not a literal.
    NotALiteral,
    /// Key dropped by the interest filter.
    NotInteresting,
    /// Uniqueness flag other than `true`/`false`.
    InvalidBoolean,
    /// Identity triple that does not map a mid to a textid.
    InvalidIdentity,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unresolved => "unresolved",
            Self::NotALanguageLiteral => "not_a_language_literal",
            Self::NotALiteral => "not_a_literal",
            Self::NotInteresting => "not_interesting",
            Self::InvalidBoolean => "invalid_boolean",
            Self::InvalidIdentity => "invalid_identity",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FactOutcome {
    Stored(WriteOutcome),
    Skipped(SkipReason),
}

/// Applies facts to a store, resolving topics through a shared resolver.
pub struct FactWriter<'a, S> {
    store: &'a mut S,
    resolver: &'a mut TopicResolver,
}

impl<'a, S: Store> FactWriter<'a, S> {
    pub fn new(store: &'a mut S, resolver: &'a mut TopicResolver) -> Self {
        Self { store, resolver }
    }

    /// Route a dispatched triple to its writer.
    pub fn apply(
        &mut self,
        kind: PredicateKind,
        triple: &Triple,
    ) -> Result<FactOutcome, StorageError> {
        let (s, o) = (&triple.subject, &triple.object);
        match kind {
            PredicateKind::ObjectId => self.add_identity(s, o),
            PredicateKind::Label => self.add_language_value(LanguageFacet::Label, s, o),
            PredicateKind::Description => self.add_language_value(LanguageFacet::Description, s, o),
            PredicateKind::Alias => self.add_language_value(LanguageFacet::Alias, s, o),
            PredicateKind::Type => self.add_type(s, o, false),
            PredicateKind::NotableType => self.add_type(s, o, true),
            PredicateKind::Key => self.add_key(s, o),
            PredicateKind::PropertyField(field) => self.add_property_field(s, o, field),
            PredicateKind::UniqueFlag => self.add_unique_flag(s, o),
        }
    }

    /// mid → textid mapping from the identity pass. Older dumps carry the
    /// textid as a literal path rather than an IRI.
    pub fn add_identity(
        &mut self,
        subject: &Term,
        object: &Term,
    ) -> Result<FactOutcome, StorageError> {
        let mid = subject.as_iri().and_then(TopicKey::from_uri);
        let textid = match object {
            Term::Iri(uri) => TopicKey::from_uri(uri),
            Term::Literal { value, .. } => TopicKey::from_path(value),
            Term::Blank(_) => None,
        };
        match (mid, textid) {
            (Some(TopicKey::Mid(mid)), Some(TopicKey::TextId(textid))) => {
                let outcome = self.store.insert_topic_pair(&mid, &textid)?;
                Ok(self.stored(outcome, subject))
            }
            _ => {
                warn!(subject = %subject, object = %object, "not a mid to textid mapping");
                Ok(FactOutcome::Skipped(SkipReason::InvalidIdentity))
            }
        }
    }

    pub fn add_language_value(
        &mut self,
        facet: LanguageFacet,
        subject: &Term,
        object: &Term,
    ) -> Result<FactOutcome, StorageError> {
        let (Some(value), Some(language)) = (object.literal_value(), object.language()) else {
            debug!(subject = %subject, object = %object, facet = facet.table(), "untagged literal");
            return Ok(FactOutcome::Skipped(SkipReason::NotALanguageLiteral));
        };
        let Some(topic) = self.resolve(subject, facet.table())? else {
            return Ok(FactOutcome::Skipped(SkipReason::Unresolved));
        };
        let outcome = self
            .store
            .insert_language_value(facet, topic, language, value)?;
        Ok(self.stored(outcome, subject))
    }

    /// Assert `object` as a type of `subject`. A notable assertion upgrades
    /// an existing plain one; nothing ever downgrades it.
    pub fn add_type(
        &mut self,
        subject: &Term,
        object: &Term,
        notable: bool,
    ) -> Result<FactOutcome, StorageError> {
        let Some(topic) = self.resolve(subject, "type subject")? else {
            return Ok(FactOutcome::Skipped(SkipReason::Unresolved));
        };
        let Some(type_id) = self.resolve(object, "type object")? else {
            return Ok(FactOutcome::Skipped(SkipReason::Unresolved));
        };
        let outcome = match self.store.insert_type(topic, type_id, notable)? {
            WriteOutcome::AlreadyExists if notable => self.store.promote_notable(topic, type_id)?,
            outcome => outcome,
        };
        Ok(self.stored(outcome, subject))
    }

    pub fn add_key(&mut self, subject: &Term, object: &Term) -> Result<FactOutcome, StorageError> {
        let Some(raw) = object.literal_value() else {
            debug!(subject = %subject, object = %object, "key is not a literal");
            return Ok(FactOutcome::Skipped(SkipReason::NotALiteral));
        };
        if !is_interesting_key(raw) {
            return Ok(FactOutcome::Skipped(SkipReason::NotInteresting));
        }
        let Some(topic) = self.resolve(subject, "key")? else {
            return Ok(FactOutcome::Skipped(SkipReason::Unresolved));
        };
        let key = decode_key(raw);
        let outcome = self.store.insert_key(topic, &key)?;
        Ok(self.stored(outcome, subject))
    }

    pub fn add_property_field(
        &mut self,
        subject: &Term,
        object: &Term,
        field: PropertyField,
    ) -> Result<FactOutcome, StorageError> {
        let Some(topic) = self.resolve(subject, "property")? else {
            return Ok(FactOutcome::Skipped(SkipReason::Unresolved));
        };
        let Some(value) = self.resolve(object, field.column())? else {
            return Ok(FactOutcome::Skipped(SkipReason::Unresolved));
        };
        let outcome = self.store.upsert_property_field(topic, field, value)?;
        Ok(self.stored(outcome, subject))
    }

    pub fn add_unique_flag(
        &mut self,
        subject: &Term,
        object: &Term,
    ) -> Result<FactOutcome, StorageError> {
        let Some(raw) = object.literal_value() else {
            debug!(subject = %subject, object = %object, "uniqueness flag is not a literal");
            return Ok(FactOutcome::Skipped(SkipReason::NotALiteral));
        };
        let unique = match raw {
            "true" => true,
            "false" => false,
            other => {
                info!(subject = %subject, value = other, "invalid uniqueness flag");
                return Ok(FactOutcome::Skipped(SkipReason::InvalidBoolean));
            }
        };
        let Some(topic) = self.resolve(subject, "property")? else {
            return Ok(FactOutcome::Skipped(SkipReason::Unresolved));
        };
        let outcome = self.store.upsert_property_unique(topic, unique)?;
        Ok(self.stored(outcome, subject))
    }

    fn resolve(&mut self, term: &Term, role: &str) -> Result<Option<TopicId>, StorageError> {
        let id = self.resolver.resolve_term(&mut *self.store, term, true)?;
        if id.is_none() {
            warn!(term = %term, role, "unable to resolve topic");
        }
        Ok(id)
    }

    fn stored(&self, outcome: WriteOutcome, subject: &Term) -> FactOutcome {
        if let WriteOutcome::Rejected(reason) = &outcome {
            error!(subject = %subject, %reason, "rejected fact");
        }
        FactOutcome::Stored(outcome)
    }
}
