//! Batch upsert classification.
//!
//! [`classify`] decides, per record and in input order, whether it becomes an
//! insert, an update of an existing row, or a rejected duplicate. It is pure:
//! the engine prefetches the in-scope rows holding the batch's uniqueness
//! values and ids, and applies the resulting plan in two phases (all updates
//! in one transaction, then all inserts in a second one). A failure in the
//! insert phase leaves the committed updates in place.

use sea_orm::Value;
use std::collections::{BTreeSet, HashMap};

use crate::validation::is_null;

/// Comparable form of a uniqueness value
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UniqueKey(String);

impl UniqueKey {
    /// `None` for SQL NULL, which never collides
    #[must_use]
    pub fn of(value: &Value) -> Option<Self> {
        (!is_null(value)).then(|| Self(format!("{value:?}")))
    }
}

/// What the classifier needs to know about one input record
#[derive(Debug, Clone)]
pub struct Candidate<Id> {
    pub id: Option<Id>,
    pub unique: Option<UniqueKey>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision<Id> {
    Insert,
    Update(Id),
    Duplicate,
}

/// Classify a batch.
///
/// - no uniqueness value: update when the id exists in scope, else insert
/// - value already claimed earlier in the batch: duplicate, unless the record
///   carries the id of the row the claimer updated
/// - value held by an existing row: update that row when the record has the
///   same id, or has no id and no earlier record already updates that row;
///   duplicate otherwise
/// - otherwise: update when the id exists in scope, else insert; the value is
///   claimed for the rest of the batch
pub fn classify<Id>(
    candidates: &[Candidate<Id>],
    existing_by_unique: &HashMap<UniqueKey, Id>,
    existing_ids: &BTreeSet<Id>,
) -> Vec<Decision<Id>>
where
    Id: Clone + Ord,
{
    // value -> id of the row the claiming record updates (None for an insert)
    let mut claims: HashMap<&UniqueKey, Option<Id>> = HashMap::new();
    // rows some earlier record of the batch updates
    let mut targeted: BTreeSet<Id> = BTreeSet::new();
    let mut decisions = Vec::with_capacity(candidates.len());

    for candidate in candidates {
        let found = candidate
            .id
            .as_ref()
            .filter(|id| existing_ids.contains(*id))
            .cloned();
        let by_id = || found.clone().map_or(Decision::Insert, Decision::Update);

        let Some(key) = candidate.unique.as_ref() else {
            let decision = by_id();
            if let Decision::Update(id) = &decision {
                targeted.insert(id.clone());
            }
            decisions.push(decision);
            continue;
        };

        let decision = match claims.get(key) {
            Some(claimer) => match (claimer, candidate.id.as_ref()) {
                (Some(claimed), Some(id)) if claimed == id => Decision::Update(id.clone()),
                _ => Decision::Duplicate,
            },
            None => match existing_by_unique.get(key) {
                Some(holder) => match candidate.id.as_ref() {
                    None if targeted.contains(holder) => Decision::Duplicate,
                    None => Decision::Update(holder.clone()),
                    Some(id) if id == holder => Decision::Update(id.clone()),
                    Some(_) => Decision::Duplicate,
                },
                None => by_id(),
            },
        };

        if !claims.contains_key(key) {
            match &decision {
                Decision::Insert => {
                    claims.insert(key, None);
                }
                Decision::Update(id) => {
                    claims.insert(key, Some(id.clone()));
                }
                Decision::Duplicate => {}
            }
        }
        if let Decision::Update(id) = &decision {
            targeted.insert(id.clone());
        }
        decisions.push(decision);
    }
    decisions
}
