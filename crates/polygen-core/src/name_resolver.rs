//! Turns candidate names into unique identifiers.
//!
//! Entries are resolved in input order. Each takes its first candidate not yet
//! claimed; failing that, the first of `candidate_1` .. `candidate_5` (suffix
//! 1 across all candidates before suffix 2); failing that, the first
//! candidate with a random 40 character suffix.

use std::collections::HashSet;

use indexmap::IndexMap;
use sha2::{Digest, Sha256};
use tracing::debug;
use uuid::Uuid;

use crate::error::CoreError;
use crate::ir::Model;
use crate::naming::{format_segments, TypeName};
use crate::types::TypeId;
use crate::visitor::exportable_types;

const MAX_INDEX_SUFFIX: usize = 5;
const RANDOM_SUFFIX_LEN: usize = 40;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedName<O> {
    pub owner: O,
    pub name: String,
}

#[derive(Debug, Clone, Default)]
pub struct NameResolver {
    claimed: HashSet<String>,
    keep_punctuation: bool,
}

impl NameResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Join candidate segments literally instead of PascalCasing them.
    pub fn keep_punctuation(mut self, keep: bool) -> Self {
        self.keep_punctuation = keep;
        self
    }

    /// Reserve a name so no entry resolves to it.
    pub fn claim(&mut self, name: impl Into<String>) {
        self.claimed.insert(name.into());
    }

    pub fn is_claimed(&self, name: &str) -> bool {
        self.claimed.contains(name)
    }

    /// Resolve a batch of `(owner, name)` entries in order.
    pub fn resolve<O>(&mut self, entries: Vec<(O, TypeName)>) -> Result<Vec<ResolvedName<O>>, CoreError> {
        entries
            .into_iter()
            .map(|(owner, name)| {
                let name = self.resolve_one(&name)?;
                Ok(ResolvedName { owner, name })
            })
            .collect()
    }

    /// Resolve and claim a single name.
    pub fn resolve_one(&mut self, name: &TypeName) -> Result<String, CoreError> {
        let candidates: Vec<String> = name
            .raw_candidates()
            .iter()
            .map(|segments| format_segments(segments, self.keep_punctuation))
            .filter(|candidate| !candidate.is_empty())
            .collect();
        let Some(first) = candidates.first().cloned() else {
            return Err(CoreError::InvalidType(format!(
                "name {:?} yields no candidates",
                name
            )));
        };

        let chosen = candidates
            .iter()
            .find(|c| !self.claimed.contains(*c))
            .cloned()
            .or_else(|| {
                (1..=MAX_INDEX_SUFFIX).find_map(|index| {
                    candidates
                        .iter()
                        .map(|c| format!("{}_{}", c, index))
                        .find(|c| !self.claimed.contains(c))
                })
            })
            .unwrap_or_else(|| {
                let salted = format!("{}_{}", first, random_suffix());
                debug!("All candidates for {} taken, using {}", first, salted);
                salted
            });

        self.claimed.insert(chosen.clone());
        Ok(chosen)
    }
}

fn random_suffix() -> String {
    let digest = Sha256::digest(Uuid::now_v7().as_bytes());
    let mut hex = format!("{:x}", digest);
    hex.truncate(RANDOM_SUFFIX_LEN);
    hex
}

/// Final names for every named exportable type of a model, in discovery order.
pub fn resolve_type_names(model: &Model) -> Result<IndexMap<TypeId, String>, CoreError> {
    let entries: Vec<(TypeId, TypeName)> = exportable_types(model)
        .all
        .into_iter()
        .filter_map(|id| model.graph.meta(id).name.clone().map(|name| (id, name)))
        .collect();
    let resolved = NameResolver::new().resolve(entries)?;
    Ok(resolved.into_iter().map(|r| (r.owner, r.name)).collect())
}
