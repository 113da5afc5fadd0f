//! Entity and email persistence.
//!
//! The pipeline talks to storage through [`EntityStore`] so the backing
//! implementation stays swappable. [`MemoryStore`] is the in-process
//! implementation used by the CLI and tests.

use crate::core::error::Result;
use crate::core::models::{DiscoveryMethod, EmailRecord, Entity, EntityKey, ValidationStatus};
use chrono::Utc;
use parking_lot::RwLock;
use std::collections::HashMap;

/// Storage surface for discovered entities and their email records.
pub trait EntityStore: Send + Sync {
    /// Inserts the entity or refreshes its mutable fields. Completion
    /// flags already recorded are never cleared.
    fn upsert_entity(&self, entity: Entity) -> Result<()>;

    fn get_entity(&self, key: &EntityKey) -> Result<Option<Entity>>;

    fn entities(&self) -> Result<Vec<Entity>>;

    /// Entities whose completion flag for `method` is still unset.
    fn entities_needing_method(&self, method: DiscoveryMethod) -> Result<Vec<Entity>>;

    /// Records that `method` ran to a completion-marking outcome for
    /// the entity. Monotonic: flags only ever turn on.
    fn mark_method(&self, key: &EntityKey, method: DiscoveryMethod) -> Result<()>;

    /// Upserts merged email records for one entity. An existing record
    /// for the same address keeps whichever confidence is higher; every
    /// written record gets a fresh `updated_at` stamp.
    fn upsert_email_records(&self, key: &EntityKey, records: Vec<EmailRecord>) -> Result<()>;

    fn email_records(&self, key: &EntityKey) -> Result<Vec<EmailRecord>>;

    /// All records still awaiting a validation verdict.
    fn emails_pending_validation(&self) -> Result<Vec<EmailRecord>>;

    fn set_validation_status(
        &self,
        key: &EntityKey,
        address: &str,
        status: ValidationStatus,
    ) -> Result<()>;

    fn entity_count(&self) -> Result<usize>;
    fn email_count(&self) -> Result<usize>;
}

#[derive(Default)]
struct MemoryInner {
    entities: HashMap<EntityKey, Entity>,
    emails: HashMap<EntityKey, Vec<EmailRecord>>,
}

/// In-memory store guarded by a `parking_lot` lock.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<MemoryInner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl EntityStore for MemoryStore {
    fn upsert_entity(&self, entity: Entity) -> Result<()> {
        let mut inner = self.inner.write();
        match inner.entities.get_mut(&entity.key) {
            Some(existing) => {
                existing.name = entity.name;
                existing.address = entity.address;
                existing.website = entity.website;
                existing.query = entity.query;
                existing.completed.union(&entity.completed);
            }
            None => {
                inner.entities.insert(entity.key.clone(), entity);
            }
        }
        Ok(())
    }

    fn get_entity(&self, key: &EntityKey) -> Result<Option<Entity>> {
        Ok(self.inner.read().entities.get(key).cloned())
    }

    fn entities(&self) -> Result<Vec<Entity>> {
        let mut all: Vec<Entity> = self.inner.read().entities.values().cloned().collect();
        all.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(all)
    }

    fn entities_needing_method(&self, method: DiscoveryMethod) -> Result<Vec<Entity>> {
        let mut pending: Vec<Entity> = self
            .inner
            .read()
            .entities
            .values()
            .filter(|e| !e.completed.is_done(method))
            .cloned()
            .collect();
        pending.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(pending)
    }

    fn mark_method(&self, key: &EntityKey, method: DiscoveryMethod) -> Result<()> {
        if let Some(entity) = self.inner.write().entities.get_mut(key) {
            entity.completed.set(method);
        }
        Ok(())
    }

    fn upsert_email_records(&self, key: &EntityKey, records: Vec<EmailRecord>) -> Result<()> {
        let now = Utc::now();
        let mut inner = self.inner.write();
        let existing = inner.emails.entry(key.clone()).or_default();
        for mut record in records {
            record.updated_at = Some(now);
            match existing.iter_mut().find(|r| r.address == record.address) {
                Some(current) => {
                    if record.confidence > current.confidence {
                        // Preserve an already-issued verdict for the address.
                        if record.status == ValidationStatus::Unchecked {
                            record.status = current.status;
                        }
                        *current = record;
                    } else {
                        current.corroborations =
                            current.corroborations.max(record.corroborations);
                        current.updated_at = Some(now);
                    }
                }
                None => existing.push(record),
            }
        }
        Ok(())
    }

    fn email_records(&self, key: &EntityKey) -> Result<Vec<EmailRecord>> {
        Ok(self.inner.read().emails.get(key).cloned().unwrap_or_default())
    }

    fn emails_pending_validation(&self) -> Result<Vec<EmailRecord>> {
        let inner = self.inner.read();
        let mut keys: Vec<&EntityKey> = inner.emails.keys().collect();
        keys.sort();
        let mut pending = Vec::new();
        for key in keys {
            for record in &inner.emails[key] {
                if record.status == ValidationStatus::Unchecked {
                    pending.push(record.clone());
                }
            }
        }
        Ok(pending)
    }

    fn set_validation_status(
        &self,
        key: &EntityKey,
        address: &str,
        status: ValidationStatus,
    ) -> Result<()> {
        let mut inner = self.inner.write();
        if let Some(records) = inner.emails.get_mut(key) {
            if let Some(record) = records.iter_mut().find(|r| r.address == address) {
                record.status = status;
                record.updated_at = Some(Utc::now());
            }
        }
        Ok(())
    }

    fn entity_count(&self) -> Result<usize> {
        Ok(self.inner.read().entities.len())
    }

    fn email_count(&self) -> Result<usize> {
        Ok(self.inner.read().emails.values().map(Vec::len).sum())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::{CandidateEmail, RawEntityRecord};

    fn entity(name: &str) -> Entity {
        Entity::from_record(&RawEntityRecord {
            name: name.to_string(),
            address: Some("12 Main St".to_string()),
            phone: None,
            website: None,
            query: "cafes".to_string(),
        })
    }

    fn record(entity_key: &EntityKey, address: &str, confidence: f64) -> EmailRecord {
        EmailRecord {
            entity: entity_key.clone(),
            address: address.to_string(),
            source: DiscoveryMethod::Static,
            confidence,
            corroborations: 1,
            status: ValidationStatus::Unchecked,
            updated_at: None,
        }
    }

    #[test]
    fn upsert_is_idempotent_and_flags_are_monotonic() {
        let store = MemoryStore::new();
        let mut first = entity("Joe's Cafe");
        first.completed.set(DiscoveryMethod::Static);
        store.upsert_entity(first.clone()).unwrap();

        // Re-upserting without the flag must not clear it.
        store.upsert_entity(entity("Joe's Cafe")).unwrap();
        let stored = store.get_entity(&first.key).unwrap().unwrap();
        assert!(stored.completed.is_done(DiscoveryMethod::Static));
        assert_eq!(store.entity_count().unwrap(), 1);
    }

    #[test]
    fn entities_needing_method_excludes_completed() {
        let store = MemoryStore::new();
        let done = entity("Done Co");
        store.upsert_entity(done.clone()).unwrap();
        store.upsert_entity(entity("Pending Co")).unwrap();
        store.mark_method(&done.key, DiscoveryMethod::Harvester).unwrap();

        let pending = store
            .entities_needing_method(DiscoveryMethod::Harvester)
            .unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].name, "Pending Co");
    }

    #[test]
    fn email_upsert_keeps_max_confidence_and_stamps_time() {
        let store = MemoryStore::new();
        let e = entity("Joe's Cafe");
        store.upsert_entity(e.clone()).unwrap();

        store
            .upsert_email_records(&e.key, vec![record(&e.key, "info@joes.com", 0.8)])
            .unwrap();
        store
            .upsert_email_records(&e.key, vec![record(&e.key, "info@joes.com", 0.6)])
            .unwrap();

        let records = store.email_records(&e.key).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].confidence, 0.8);
        assert!(records[0].updated_at.is_some());

        store
            .upsert_email_records(&e.key, vec![record(&e.key, "info@joes.com", 0.95)])
            .unwrap();
        let records = store.email_records(&e.key).unwrap();
        assert_eq!(records[0].confidence, 0.95);
    }

    #[test]
    fn validation_status_updates_single_record() {
        let store = MemoryStore::new();
        let e = entity("Joe's Cafe");
        store.upsert_entity(e.clone()).unwrap();
        store
            .upsert_email_records(
                &e.key,
                vec![
                    record(&e.key, "info@joes.com", 0.9),
                    record(&e.key, "sales@joes.com", 0.7),
                ],
            )
            .unwrap();

        store
            .set_validation_status(&e.key, "info@joes.com", ValidationStatus::Deliverable)
            .unwrap();

        let pending = store.emails_pending_validation().unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].address, "sales@joes.com");
    }

    #[test]
    fn candidate_normalization_feeds_consistent_addresses() {
        let e = entity("Joe's Cafe");
        let candidate =
            CandidateEmail::new(&e.key, "  Info@Joes.COM ", DiscoveryMethod::Static, 0.9);
        assert_eq!(candidate.address, "info@joes.com");
    }
}
