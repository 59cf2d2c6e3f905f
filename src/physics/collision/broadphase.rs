//! Broad phase collision detection algorithms
//! are responsible for detecting pairs of possibly colliding bodies
//! for further, more accurate narrow phase inspection.

use crate::{geometry::AABB, physics::body::Body};

use itertools::Itertools;

/// The box a body sweeps through over the rest of the current tick.
pub fn swept_aabb(body: &Body) -> AABB {
    let motion = body.motion();
    AABB::swept(motion.position, motion.end_point(), body.radius())
}

/// Something to pair up, identified by `key`.
#[derive(Clone, Copy, Debug)]
pub struct Proxy<K> {
    pub key: K,
    pub aabb: AABB,
}

/// A broad phase algorithm.
pub trait BroadPhase {
    /// Returns pairs of potentially colliding objects.
    fn pairs<K: Copy>(proxies: &[Proxy<K>]) -> Vec<[K; 2]>;
}

/// The simplest possible broad phase algorithm,
/// which pairs every object with every other object.
/// Very inefficient, but can work for small systems.
pub struct BruteForce;

impl BroadPhase for BruteForce {
    fn pairs<K: Copy>(proxies: &[Proxy<K>]) -> Vec<[K; 2]> {
        proxies
            .iter()
            .tuple_combinations()
            .map(|(a, b)| [a.key, b.key])
            .collect()
    }
}

/// Pairs objects whose boxes overlap by sorting them along the x axis
/// and only comparing objects whose x intervals overlap.
pub struct SweepAndPrune;

impl BroadPhase for SweepAndPrune {
    fn pairs<K: Copy>(proxies: &[Proxy<K>]) -> Vec<[K; 2]> {
        let mut order: Vec<&Proxy<K>> = proxies.iter().collect();
        order.sort_by(|a, b| a.aabb.min.x.total_cmp(&b.aabb.min.x));

        let mut pairs = Vec::new();
        for (i, a) in order.iter().enumerate() {
            for b in &order[i + 1..] {
                if b.aabb.min.x > a.aabb.max.x {
                    break;
                }
                if a.aabb.intersects(&b.aabb) {
                    pairs.push([a.key, b.key]);
                }
            }
        }
        pairs
    }
}
