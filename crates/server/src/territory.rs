//! Territory resolution: flood-fill claims, trail cuts and eliminations.
//!
//! Runs once per aligned player per tick, on the cell under the player.
//! Three outcomes, keyed on that cell's state relative to the actor:
//!
//! - own claimed land: run a claim pass, annexing every enclosed region
//!   adjacent to the actor and sealing their trail
//! - own trail: the actor cut their own unsealed trail and dies
//! - neutral or enemy land: lay trail; an enemy's unsealed trail underneath
//!   is an instant kill that hands their territory to the actor

use crate::map::GridMap;
use crate::movement;
use crate::session::{Registry, respawn_player};
use fixedbitset::FixedBitSet;
use thiserror::Error;
use tracing::{debug, info};

const NEIGHBORS: [(i32, i32); 4] = [(-1, 0), (1, 0), (0, -1), (0, 1)];

/// Failures that abort a single player's resolution pass for the tick.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// A trail stomp resolved to a victim with no live session.
    #[error("eliminated player '{0}' has no active session")]
    MissingVictim(String),
}

/// Result of one bounded flood fill.
struct FillOutcome {
    /// Packed `x * size + y` indices of every visited cell.
    cells: Vec<usize>,
    /// False when the fill escaped to the map boundary.
    enclosed: bool,
}

/// Resolve territory for `acting`, who is grid-aligned this tick.
pub fn resolve(
    map: &mut GridMap,
    registry: &mut Registry,
    acting: &str,
    cell_size: f32,
) -> Result<(), ResolveError> {
    let Some(player) = registry.get(acting) else {
        return Ok(());
    };
    let (cx, cy) = movement::current_cell(player, cell_size);
    let cell = map.get(cx, cy).clone();

    if cell.is_owned_by(acting) {
        if cell.claimed {
            // Back on sealed land: try to close whatever the trail encircled.
            claim_pass(map, registry, acting, cx, cy, cell_size);
        } else {
            // Crossed own unsealed trail: everything resets.
            info!("{} cut their own trail", acting);
            map.release(acting);
            if let Some(player) = registry.get_mut(acting) {
                respawn_player(player, map, cell_size);
            }
        }
        return Ok(());
    }

    if let Some(victim) = cell.owner.as_deref() {
        if !cell.claimed {
            // Stomped an enemy's live trail: instant kill, their sealed land
            // goes to the actor. Verify the victim's session before touching
            // the map so a failed lookup cannot leave it half-updated.
            if !registry.contains(victim) {
                return Err(ResolveError::MissingVictim(victim.to_owned()));
            }
            let victim = victim.to_owned();
            info!("{} cut {}'s trail", acting, victim);
            map.transfer_claimed(&victim, acting);
            if let Some(player) = registry.get_mut(&victim) {
                respawn_player(player, map, cell_size);
            }
        }
        // Stepping on enemy *claimed* land kills nobody; the cell is simply
        // repainted as trail below.
    }

    map.set(cx, cy, Some(acting), false);
    Ok(())
}

/// Attempt a fill from each orthogonal neighbor of the actor's cell, then
/// seal all of the actor's land.
///
/// The final seal pass matters: trail pockets that no single fill could
/// reach directly still become claimed territory.
fn claim_pass(
    map: &mut GridMap,
    registry: &mut Registry,
    acting: &str,
    cx: usize,
    cy: usize,
    cell_size: f32,
) {
    for (dx, dy) in NEIGHBORS {
        let outcome = flood_fill(map, acting, cx as i32 + dx, cy as i32 + dy);
        if outcome.enclosed {
            debug!("{} enclosed a zone of {} cells", acting, outcome.cells.len());
            annex(map, registry, acting, &outcome.cells, cell_size);
        }
    }
    map.seal(acting);
}

/// Bounded depth-first fill over cells not owned by `owner`.
///
/// Cells owned by the actor bound the region but still join the visited
/// zone. Reaching the map boundary, or starting outside it, means the
/// region is open and nothing may be annexed.
fn flood_fill(map: &GridMap, owner: &str, start_x: i32, start_y: i32) -> FillOutcome {
    let size = map.size() as i32;
    let mut visited = FixedBitSet::with_capacity((size * size) as usize);
    let mut cells = Vec::new();
    let mut stack = vec![(start_x, start_y)];

    while let Some((x, y)) = stack.pop() {
        if x < 0 || y < 0 || x >= size || y >= size {
            return FillOutcome { cells, enclosed: false };
        }
        let idx = (x * size + y) as usize;
        if visited.put(idx) {
            continue;
        }
        cells.push(idx);

        // An edge cell has a neighbor outside the map: the region escapes.
        if x == 0 || y == 0 || x == size - 1 || y == size - 1 {
            return FillOutcome { cells, enclosed: false };
        }

        for (dx, dy) in NEIGHBORS {
            let (nx, ny) = (x + dx, y + dy);
            let nidx = (nx * size + ny) as usize;
            if visited.contains(nidx) {
                continue;
            }
            if map.get(nx as usize, ny as usize).is_owned_by(owner) {
                visited.insert(nidx);
                cells.push(nidx);
            } else {
                stack.push((nx, ny));
            }
        }
    }

    FillOutcome { cells, enclosed: true }
}

/// Turn an enclosed zone into the actor's claimed territory, eliminating
/// everyone caught inside cells that were not already the actor's sealed
/// land. The actor is never a victim of their own claim.
fn annex(
    map: &mut GridMap,
    registry: &mut Registry,
    acting: &str,
    cells: &[usize],
    cell_size: f32,
) {
    let size = map.size();
    for &idx in cells {
        let (x, y) = (idx / size, idx % size);
        let already_sealed = {
            let cell = map.get(x, y);
            cell.is_owned_by(acting) && cell.claimed
        };
        if !already_sealed {
            let min_x = x as f32 * cell_size;
            let min_y = y as f32 * cell_size;
            let victims: Vec<String> = registry
                .iter()
                .filter(|p| p.username != acting)
                .filter(|p| {
                    p.position.x >= min_x
                        && p.position.x <= min_x + cell_size
                        && p.position.y >= min_y
                        && p.position.y <= min_y + cell_size
                })
                .map(|p| p.username.clone())
                .collect();
            for victim in victims {
                info!("{} was enclosed by {}", victim, acting);
                if let Some(player) = registry.get_mut(&victim) {
                    respawn_player(player, map, cell_size);
                }
            }
        }
        map.set(x, y, Some(acting), true);
    }
}
