//! Top-level tick driver: advances the world by one tick, running every pass
//! in the fixed order the simulation's determinism guarantee depends on,
//! and wraps the whole thing in the bounded-retry loop used for
//! commands that can race against an optimistic-lock bump mid-tick.

use crate::error::Result;
use crate::retry::run_with_retry;
use crate::world::World;

/// Advance `world` by exactly one tick. Order matters: workforce deltas land
/// before the pass that pays salaries and steps efficiency off the resulting
/// capacity; the operating-cost sweep runs before shipments and production so
/// a building deactivated this tick no longer accepts deliveries or
/// completions; orders placed earlier in the tick rest until the matching
/// pass runs last among the economic passes; contract expiry runs last of
/// all so a contract accepted earlier in the same tick never expires out
/// from under its settlement.
pub fn advance_tick(world: &mut World) {
    world.tick += 1;
    world.apply_due_workforce_deltas();
    world.run_workforce_pass();
    world.sweep_operating_costs();
    world.deliver_due_shipments();
    world.complete_due_production_jobs();
    world.run_matching_pass();
    world.expire_due_contracts();
    world.lock_version += 1;
}

/// Run `advance_tick` under the configured retry budget, the entry point
/// external callers use.
pub fn run_tick_with_retry(world: &mut World) -> Result<()> {
    let config = world.config.tick_retry.clone();
    run_with_retry(&config, |_attempt| {
        advance_tick(world);
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimConfig;

    #[test]
    fn advance_tick_increments_tick_and_lock_version() {
        let mut world = World::new(SimConfig::default());
        let before_lock = world.lock_version;
        advance_tick(&mut world);
        assert_eq!(world.tick, 1);
        assert!(world.lock_version > before_lock);
    }

    #[test]
    fn run_tick_with_retry_succeeds_with_no_contention() {
        let mut world = World::new(SimConfig::default());
        assert!(run_tick_with_retry(&mut world).is_ok());
        assert_eq!(world.tick, 1);
    }
}
