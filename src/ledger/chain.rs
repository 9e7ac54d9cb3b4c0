//! Pure checks over a table's definition chain.

use std::collections::{HashMap, HashSet};

use crate::model::{RecordId, TableDefinition};

/// Outcome of computing the next version number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextVersion {
    /// The chain is consistent; use this version.
    Next(u32),
    /// More definitions exist than the latest version accounts for.
    /// `count + 1` avoids colliding with any stored version.
    Skewed { count: u32, latest: u32 },
}

impl NextVersion {
    pub fn resolve(self) -> u32 {
        match self {
            NextVersion::Next(v) => v,
            NextVersion::Skewed { count, .. } => count + 1,
        }
    }
}

/// Version number for a new definition given every stored one for the table.
pub fn next_version(existing: &[TableDefinition]) -> NextVersion {
    let Some(latest) = existing.iter().map(|d| d.version_num).max() else {
        return NextVersion::Next(1);
    };
    let count = existing.len() as u32;
    if count > latest {
        NextVersion::Skewed { count, latest }
    } else {
        NextVersion::Next(latest + 1)
    }
}

/// The definition with the highest version, skipping `excluding`.
pub fn latest_excluding(
    existing: &[TableDefinition],
    excluding: RecordId,
) -> Option<&TableDefinition> {
    existing
        .iter()
        .filter(|d| d.id != excluding)
        .max_by_key(|d| d.version_num)
}

/// Walk from `active` along `previous` links.
///
/// Returns the chain newest first, or a description of the first defect:
/// a dangling link, a non-decreasing version, or definitions that the
/// walk never reaches.
pub fn walk(
    existing: &[TableDefinition],
    active: Option<RecordId>,
) -> Result<Vec<TableDefinition>, String> {
    let by_id: HashMap<RecordId, &TableDefinition> =
        existing.iter().map(|d| (d.id, d)).collect();

    let mut chain = Vec::with_capacity(existing.len());
    let mut seen = HashSet::new();
    let mut cursor = active;
    let mut last_version: Option<u32> = None;

    while let Some(id) = cursor {
        let Some(def) = by_id.get(&id) else {
            return Err(format!("definition {} is referenced but missing", id));
        };
        if let Some(last) = last_version {
            if def.version_num >= last {
                return Err(format!(
                    "version {} follows version {} in the previous-chain",
                    def.version_num, last
                ));
            }
        }
        if !seen.insert(id) {
            return Err(format!("definition {} appears twice in the chain", id));
        }
        last_version = Some(def.version_num);
        chain.push((*def).clone());
        cursor = def.previous;
    }

    if chain.len() != existing.len() {
        return Err(format!(
            "{} of {} definitions are unreachable from the active definition",
            existing.len() - chain.len(),
            existing.len()
        ));
    }

    Ok(chain)
}
