//! Players: the external-identity-to-internal-id resolution layer.

use serde::{Deserialize, Serialize};

use crate::types::PlayerId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub external_ref: String,
}

/// Resolve an external reference to a `Player`, creating one if this is the
/// first time it has been seen. Mirrors the world's other `resolve_or_create`
/// entry points: idempotent on repeated calls with the same reference.
pub fn resolve_or_create(
    players: &mut Vec<Player>,
    next_id: &mut u64,
    external_ref: &str,
) -> PlayerId {
    if let Some(existing) = players.iter().find(|p| p.external_ref == external_ref) {
        return existing.id;
    }
    let id = PlayerId::new(*next_id);
    *next_id += 1;
    players.push(Player {
        id,
        external_ref: external_ref.to_string(),
    });
    id
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_or_create_is_idempotent() {
        let mut players = Vec::new();
        let mut next_id = 0;
        let a = resolve_or_create(&mut players, &mut next_id, "ext-1");
        let b = resolve_or_create(&mut players, &mut next_id, "ext-1");
        assert_eq!(a, b);
        assert_eq!(players.len(), 1);
    }

    #[test]
    fn resolve_or_create_allocates_distinct_ids() {
        let mut players = Vec::new();
        let mut next_id = 0;
        let a = resolve_or_create(&mut players, &mut next_id, "ext-1");
        let b = resolve_or_create(&mut players, &mut next_id, "ext-2");
        assert_ne!(a, b);
    }
}
