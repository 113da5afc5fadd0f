//! Deduplicating, confidence-ranked aggregation of finder candidates.

use crate::core::models::{CandidateEmail, DiscoveryMethod, EmailRecord, EntityKey, ValidationStatus};
use std::collections::{HashMap, HashSet};

/// Merges candidates from all methods into the per-entity record set.
///
/// Pure and deterministic: equal inputs in any order produce identical
/// output. Duplicate addresses collapse into one record keeping the
/// highest confidence; ties break toward the higher-priority method.
/// The number of distinct corroborating methods rides along as a
/// secondary signal but never changes the confidence score.
pub fn merge(
    entity: &EntityKey,
    candidates: &[CandidateEmail],
    max_emails: usize,
    min_confidence: f64,
) -> Vec<EmailRecord> {
    struct Slot {
        best: (f64, DiscoveryMethod),
        methods: HashSet<DiscoveryMethod>,
    }

    let mut slots: HashMap<&str, Slot> = HashMap::new();
    for candidate in candidates {
        if candidate.entity != *entity {
            continue;
        }
        let key = candidate.address.as_str();
        let incoming = (candidate.confidence, candidate.source);
        match slots.get_mut(key) {
            Some(slot) => {
                slot.methods.insert(candidate.source);
                let (confidence, source) = slot.best;
                let better = incoming.0.total_cmp(&confidence).then_with(|| {
                    incoming.1.priority().cmp(&source.priority())
                });
                if better == std::cmp::Ordering::Greater {
                    slot.best = incoming;
                }
            }
            None => {
                let mut methods = HashSet::new();
                methods.insert(candidate.source);
                slots.insert(
                    key,
                    Slot {
                        best: incoming,
                        methods,
                    },
                );
            }
        }
    }

    let mut records: Vec<EmailRecord> = slots
        .into_iter()
        .filter(|(_, slot)| slot.best.0 >= min_confidence)
        .map(|(address, slot)| EmailRecord {
            entity: entity.clone(),
            address: address.to_string(),
            source: slot.best.1,
            confidence: slot.best.0,
            corroborations: slot.methods.len() as u32,
            status: ValidationStatus::Unchecked,
            updated_at: None,
        })
        .collect();

    records.sort_by(|a, b| {
        b.confidence
            .total_cmp(&a.confidence)
            .then_with(|| b.source.priority().cmp(&a.source.priority()))
            .then_with(|| a.address.cmp(&b.address))
    });
    records.truncate(max_emails);
    records
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key() -> EntityKey {
        EntityKey::derive("TechCorp Software", None, "q")
    }

    fn candidate(address: &str, source: DiscoveryMethod, confidence: f64) -> CandidateEmail {
        CandidateEmail::new(&key(), address, source, confidence)
    }

    #[test]
    fn empty_input_yields_empty_output() {
        assert!(merge(&key(), &[], 25, 0.0).is_empty());
    }

    #[test]
    fn duplicates_keep_max_confidence_and_count_corroborations() {
        let candidates = vec![
            candidate("info@techcorp.io", DiscoveryMethod::Static, 0.95),
            candidate("info@techcorp.io", DiscoveryMethod::Harvester, 0.8),
            candidate("j.doe@techcorp.io", DiscoveryMethod::Harvester, 0.8),
        ];
        let records = merge(&key(), &candidates, 25, 0.0);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].address, "info@techcorp.io");
        assert_eq!(records[0].confidence, 0.95);
        assert_eq!(records[0].source, DiscoveryMethod::Static);
        assert_eq!(records[0].corroborations, 2);
        assert_eq!(records[1].address, "j.doe@techcorp.io");
        assert_eq!(records[1].source, DiscoveryMethod::Harvester);
        assert_eq!(records[1].corroborations, 1);
    }

    #[test]
    fn equal_confidence_ties_break_toward_higher_priority_method() {
        let candidates = vec![
            candidate("contact@techcorp.io", DiscoveryMethod::Static, 0.9),
            candidate("contact@techcorp.io", DiscoveryMethod::Scraper, 0.9),
        ];
        let records = merge(&key(), &candidates, 25, 0.0);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].source, DiscoveryMethod::Scraper);
    }

    #[test]
    fn confidence_floor_and_cap_apply_after_dedup() {
        let candidates = vec![
            candidate("info@techcorp.io", DiscoveryMethod::Static, 0.95),
            candidate("j.doe@techcorp.io", DiscoveryMethod::Harvester, 0.8),
            candidate("mail@techcorp.io", DiscoveryMethod::Static, 0.45),
        ];
        let records = merge(&key(), &candidates, 1, 0.75);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].address, "info@techcorp.io");
    }

    #[test]
    fn output_is_deterministic_regardless_of_input_order() {
        let forward = vec![
            candidate("info@techcorp.io", DiscoveryMethod::Static, 0.95),
            candidate("info@techcorp.io", DiscoveryMethod::Scraper, 0.9),
            candidate("sales@techcorp.io", DiscoveryMethod::Harvester, 0.8),
            candidate("hello@techcorp.io", DiscoveryMethod::Static, 0.8),
        ];
        let mut reversed = forward.clone();
        reversed.reverse();

        let a = merge(&key(), &forward, 25, 0.0);
        let b = merge(&key(), &reversed, 25, 0.0);
        assert_eq!(a, b);
        // Running the same merge twice is bit-identical.
        assert_eq!(a, merge(&key(), &forward, 25, 0.0));
    }

    #[test]
    fn equal_confidence_records_order_by_method_then_address() {
        let candidates = vec![
            candidate("zeta@techcorp.io", DiscoveryMethod::Static, 0.8),
            candidate("alpha@techcorp.io", DiscoveryMethod::Static, 0.8),
            candidate("mid@techcorp.io", DiscoveryMethod::Harvester, 0.8),
        ];
        let records = merge(&key(), &candidates, 25, 0.0);
        let addresses: Vec<&str> = records.iter().map(|r| r.address.as_str()).collect();
        assert_eq!(
            addresses,
            vec!["mid@techcorp.io", "alpha@techcorp.io", "zeta@techcorp.io"]
        );
    }

    #[test]
    fn foreign_entity_candidates_are_ignored() {
        let other = EntityKey::derive("Other Co", None, "q");
        let candidates = vec![CandidateEmail::new(
            &other,
            "info@other.com",
            DiscoveryMethod::Static,
            0.9,
        )];
        assert!(merge(&key(), &candidates, 25, 0.0).is_empty());
    }
}
