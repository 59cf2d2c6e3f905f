//! The time-ordered collision resolution loop.
//!
//! Every tick the resolver finds the first contact time of every pair of bodies
//! and of every body with every boundary, then repeatedly resolves the earliest one.
//! Resolving a collision changes the trajectories of the bodies involved,
//! which makes every other collision queued for them stale.
//! Those are thrown away and the moved bodies are checked again from the time of the collision.

use super::{
    boundary::WorldBounds,
    broadphase::{swept_aabb, BroadPhase, BruteForce, Proxy, SweepAndPrune},
    narrowphase::{body_body_toi, body_boundary_toi},
    CollisionError, PriorityQueue,
};
use crate::{
    event::{CollisionEvent, Commands, Event},
    geometry::{Motion, Segment},
    math::{self as m, Unit},
    physics::{
        body::BodyId,
        body_set::{BodyKey, BodySet},
        PhysicsParams,
    },
};

use thunderdome as td;

/// Key of a collision detected during the current tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CollisionKey(td::Index);

/// A contact found during the current tick.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Collision {
    /// Two bodies touch at `time`.
    BodyBody { a: BodyKey, b: BodyKey, time: f64 },
    /// A body crosses the boundary segment with the given index at `time`.
    BodyBoundary {
        body: BodyKey,
        boundary: usize,
        time: f64,
    },
}

impl Collision {
    #[inline]
    pub fn time(&self) -> f64 {
        match self {
            Collision::BodyBody { time, .. } | Collision::BodyBoundary { time, .. } => *time,
        }
    }

    /// The bodies involved in this collision.
    pub fn bodies(&self) -> impl Iterator<Item = BodyKey> {
        let (first, second) = match *self {
            Collision::BodyBody { a, b, .. } => (a, Some(b)),
            Collision::BodyBoundary { body, .. } => (body, None),
        };
        std::iter::once(first).chain(second)
    }
}

/// What the other side of a collision is, for ordering purposes.
/// Bodies come before boundaries.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
enum Partner {
    Body(BodyId),
    Boundary(usize),
}

/// Ordering of collisions in the resolution queue:
/// earliest time first, then by the lowest body id involved, then by the other participant.
#[derive(Clone, Copy, Debug)]
pub struct CollisionOrder {
    time: f64,
    first: BodyId,
    partner: Partner,
}

impl CollisionOrder {
    fn bodies(time: f64, a: BodyId, b: BodyId) -> Self {
        Self {
            time,
            first: a.min(b),
            partner: Partner::Body(a.max(b)),
        }
    }

    fn boundary(time: f64, body: BodyId, boundary: usize) -> Self {
        Self {
            time,
            first: body,
            partner: Partner::Boundary(boundary),
        }
    }

    #[inline]
    pub fn time(&self) -> f64 {
        self.time
    }
}

impl PartialEq for CollisionOrder {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == std::cmp::Ordering::Equal
    }
}
impl Eq for CollisionOrder {}
impl PartialOrd for CollisionOrder {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for CollisionOrder {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.time
            .total_cmp(&other.time)
            .then(self.first.cmp(&other.first))
            .then(self.partner.cmp(&other.partner))
    }
}

/// The resolver's bookkeeping for one body:
/// every collision involving it that's currently queued.
#[derive(Clone, Debug, Default)]
struct TrackedBody {
    collisions: Vec<CollisionKey>,
}

/// Summary of one run of the resolution loop.
#[derive(Clone, Debug, Default)]
pub struct ResolveReport {
    /// Number of collisions taken out of the queue and handled.
    pub iterations: usize,
    /// Whether the loop stopped at the resolution cap with collisions still pending.
    pub aborted: bool,
    /// Collisions that couldn't be detected or resolved.
    pub errors: Vec<CollisionError>,
    /// Bodies destroyed by event callbacks during the loop.
    /// They no longer collide but are still in the body set.
    pub destroyed: Vec<BodyKey>,
}

/// Finds and resolves collisions between bodies and against boundaries.
#[derive(Debug, Default)]
pub struct CollisionResolver {
    // shares indices with the body set
    trackers: td::Arena<TrackedBody>,
    collisions: td::Arena<Collision>,
    queue: PriorityQueue<CollisionOrder, CollisionKey>,
    world: Option<WorldBounds>,
    extra_boundaries: Vec<Segment>,
}

impl CollisionResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start tracking a body. Bodies that aren't tracked are ignored by collision detection.
    pub fn register(&mut self, key: BodyKey) {
        self.trackers.insert_at(key.0, TrackedBody::default());
    }

    pub fn unregister(&mut self, key: BodyKey) {
        self.trackers.remove(key.0);
    }

    #[inline]
    pub fn is_registered(&self, key: BodyKey) -> bool {
        self.trackers.contains(key.0)
    }

    pub fn world(&self) -> Option<&WorldBounds> {
        self.world.as_ref()
    }

    /// Set or remove the world rectangle whose edges bodies wrap around.
    pub fn set_world(&mut self, world: Option<WorldBounds>) {
        self.world = world;
    }

    /// Add a boundary segment besides the world edges.
    pub fn add_boundary(&mut self, segment: Segment) {
        self.extra_boundaries.push(segment);
    }

    /// Remove the world edges and every other boundary.
    pub fn clear_boundaries(&mut self) {
        self.world = None;
        self.extra_boundaries.clear();
    }

    /// All boundary segments, world edges first.
    /// Indices into this sequence identify boundaries in [`Collision::BodyBoundary`].
    pub fn boundaries(&self) -> impl Iterator<Item = &Segment> + '_ {
        self.world
            .iter()
            .flat_map(|w| w.segments().iter())
            .chain(self.extra_boundaries.iter())
    }

    pub fn boundary(&self, idx: usize) -> Option<&Segment> {
        self.boundaries().nth(idx)
    }

    /// Number of collisions currently waiting to be resolved.
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Detect and resolve every collision within the current tick.
    ///
    /// Bodies must have had their motion reset for the tick beforehand.
    /// On return each body's motion holds its position at the time of its last collision
    /// and the fraction of the tick it still has left to move.
    pub fn update(&mut self, bodies: &mut BodySet, params: &PhysicsParams) -> ResolveReport {
        let mut report = ResolveReport::default();
        let mut commands = Commands::new();

        self.queue.clear();
        self.collisions.clear();
        for (_, tracker) in self.trackers.iter_mut() {
            tracker.collisions.clear();
        }

        self.detect_all(bodies, params, &mut report);

        let _span = tracy_span!("resolve collisions", "update");
        while let Some((order, _)) = self.queue.peek() {
            if order.time() >= 1.0 {
                break;
            }
            if report.iterations >= params.max_resolutions_per_tick {
                log::warn!(
                    "Collision resolution aborted after {} resolutions with {} still pending",
                    report.iterations,
                    self.queue.len()
                );
                report.aborted = true;
                break;
            }
            let Some((_, key)) = self.queue.pop() else {
                break;
            };
            report.iterations += 1;

            let Some(collision) = self.collisions.remove(key.0) else {
                continue;
            };
            for body in collision.bodies() {
                if let Some(tracker) = self.trackers.get_mut(body.0) {
                    tracker.collisions.retain(|k| *k != key);
                }
            }

            let events = match self.resolve(&collision, bodies, params) {
                Ok(events) => events,
                Err(err) => {
                    log::warn!("Failed to resolve {collision:?}: {err}");
                    report.errors.push(err);
                    continue;
                }
            };

            let moved: Vec<BodyKey> = collision.bodies().collect();
            for &body in &moved {
                self.invalidate(body);
            }

            for (target, event) in events {
                bodies.dispatch(target, &event, &mut commands);
                bodies.flush_notifications(&mut commands);
                for destroyed in commands.destroy.drain(..) {
                    let Some(body) = bodies.get_mut(destroyed) else {
                        continue;
                    };
                    if !body.collidable {
                        continue;
                    }
                    log::debug!("{} destroyed during collision resolution", body.id());
                    body.deactivate();
                    self.invalidate(destroyed);
                    report.destroyed.push(destroyed);
                }
            }

            self.redetect(&moved, bodies, params, &mut report);
        }

        report
    }

    /// Check bodies whose motion just changed against everything again.
    /// Each pair of moved bodies is only checked once.
    fn redetect(
        &mut self,
        moved: &[BodyKey],
        bodies: &BodySet,
        params: &PhysicsParams,
        report: &mut ResolveReport,
    ) {
        for (i, &body) in moved.iter().enumerate() {
            self.detect_body(body, &moved[..i], bodies, params, report);
        }
    }

    /// Drop every queued collision involving a body.
    fn invalidate(&mut self, body: BodyKey) {
        let Some(tracker) = self.trackers.get_mut(body.0) else {
            return;
        };
        for key in std::mem::take(&mut tracker.collisions) {
            self.queue.remove(&key);
            let Some(collision) = self.collisions.remove(key.0) else {
                continue;
            };
            for other in collision.bodies().filter(|other| *other != body) {
                if let Some(tracker) = self.trackers.get_mut(other.0) {
                    tracker.collisions.retain(|k| *k != key);
                }
            }
        }
    }

    fn detect_all(&mut self, bodies: &BodySet, params: &PhysicsParams, report: &mut ResolveReport) {
        let _span = tracy_span!("detect collisions", "detect_all");

        let proxies: Vec<Proxy<BodyKey>> = bodies
            .iter()
            .filter(|(key, body)| body.collidable && self.is_registered(*key))
            .map(|(key, body)| Proxy {
                key,
                aabb: swept_aabb(body),
            })
            .collect();

        let pairs = if params.broad_phase_culling {
            SweepAndPrune::pairs(&proxies)
        } else {
            BruteForce::pairs(&proxies)
        };
        for [a, b] in pairs {
            self.detect_pair(a, b, bodies);
        }
        for proxy in &proxies {
            self.detect_boundaries(proxy.key, bodies, report);
        }
    }

    /// Check one body against every other body except those in `skip`, and against all boundaries.
    fn detect_body(
        &mut self,
        key: BodyKey,
        skip: &[BodyKey],
        bodies: &BodySet,
        params: &PhysicsParams,
        report: &mut ResolveReport,
    ) {
        let Some(body) = bodies.get(key) else {
            return;
        };
        if !body.collidable || !self.is_registered(key) {
            return;
        }
        let aabb = swept_aabb(body);

        let partners: Vec<BodyKey> = bodies
            .iter()
            .filter(|(other_key, other)| {
                *other_key != key
                    && other.collidable
                    && !skip.contains(other_key)
                    && self.is_registered(*other_key)
                    && (!params.broad_phase_culling || aabb.intersects(&swept_aabb(other)))
            })
            .map(|(other_key, _)| other_key)
            .collect();
        for other in partners {
            self.detect_pair(key, other, bodies);
        }
        self.detect_boundaries(key, bodies, report);
    }

    fn detect_pair(&mut self, a: BodyKey, b: BodyKey, bodies: &BodySet) {
        let (Some(body_a), Some(body_b)) = (bodies.get(a), bodies.get(b)) else {
            return;
        };
        let Some(time) = body_body_toi(
            body_a.motion(),
            body_a.radius(),
            body_b.motion(),
            body_b.radius(),
        ) else {
            return;
        };
        log::trace!("{} and {} will touch at {time}", body_a.id(), body_b.id());
        self.push(
            Collision::BodyBody { a, b, time },
            CollisionOrder::bodies(time, body_a.id(), body_b.id()),
        );
    }

    fn detect_boundaries(&mut self, key: BodyKey, bodies: &BodySet, report: &mut ResolveReport) {
        let Some(body) = bodies.get(key) else {
            return;
        };

        let mut crossings = Vec::new();
        for (idx, boundary) in self.boundaries().enumerate() {
            match body_boundary_toi(body.motion(), boundary) {
                Ok(Some(time)) => crossings.push((idx, time)),
                Ok(None) => {}
                Err(err) => {
                    log::warn!("Failed to check {} against boundary {idx}: {err}", body.id());
                    report.errors.push(err.into());
                }
            }
        }

        for (boundary, time) in crossings {
            log::trace!("{} will cross boundary {boundary} at {time}", body.id());
            self.push(
                Collision::BodyBoundary {
                    body: key,
                    boundary,
                    time,
                },
                CollisionOrder::boundary(time, body.id(), boundary),
            );
        }
    }

    fn push(&mut self, collision: Collision, order: CollisionOrder) {
        let key = CollisionKey(self.collisions.insert(collision));
        for body in collision.bodies() {
            if let Some(tracker) = self.trackers.get_mut(body.0) {
                tracker.collisions.push(key);
            }
        }
        self.queue.insert(order, key);
    }

    /// Apply a collision's effect on the bodies involved,
    /// returning the events it produced.
    ///
    /// Collisions involving a body that no longer collides are skipped without effect.
    fn resolve(
        &self,
        collision: &Collision,
        bodies: &mut BodySet,
        params: &PhysicsParams,
    ) -> Result<Vec<(BodyKey, Event)>, CollisionError> {
        match *collision {
            Collision::BodyBody { a, b, time } => resolve_bodies(bodies, a, b, time),
            Collision::BodyBoundary {
                body,
                boundary,
                time,
            } => {
                let (Some(segment), Some(body)) = (self.boundary(boundary), bodies.get_mut(body))
                else {
                    return Ok(Vec::new());
                };
                if !body.collidable {
                    return Ok(Vec::new());
                }
                let world = self.world.as_ref().ok_or(CollisionError::NoWorldBounds)?;

                let crossing = body.motion.point_at(time);
                let target = world.wrap_target(segment.vector, crossing, params.wrap_offset)?;
                log::debug!("{} wrapped from {crossing:?} to {target:?} at {time}", body.id());
                body.motion = Motion {
                    position: target,
                    velocity: body.motion.velocity,
                    time: 1.0 - time,
                };
                Ok(Vec::new())
            }
        }
    }
}

/// Bounce two bodies off each other elastically.
///
/// Only the velocity components along the line between their centers change;
/// the components tangential to it are kept.
fn resolve_bodies(
    bodies: &mut BodySet,
    a: BodyKey,
    b: BodyKey,
    time: f64,
) -> Result<Vec<(BodyKey, Event)>, CollisionError> {
    let (Some(body_a), Some(body_b)) = bodies.get2_mut(a, b) else {
        return Ok(Vec::new());
    };
    if !body_a.collidable || !body_b.collidable {
        return Ok(Vec::new());
    }

    let pos_a = body_a.motion.point_at(time);
    let pos_b = body_b.motion.point_at(time);
    let normal = Unit::try_new(pos_b - pos_a)
        .or_else(|| Unit::try_new(body_b.motion.position - body_a.motion.position))
        .ok_or(CollisionError::DegenerateNormal {
            a: body_a.id(),
            b: body_b.id(),
        })?;
    let tangent = m::unit_left_normal(normal);

    let (vel_a, vel_b) = (body_a.motion.velocity, body_b.motion.velocity);
    let (mass_a, mass_b) = (body_a.mass(), body_b.mass());
    let (normal_a, normal_b) = (vel_a.dot(*normal), vel_b.dot(*normal));
    let (tangent_a, tangent_b) = (vel_a.dot(*tangent), vel_b.dot(*tangent));

    let total_mass = mass_a + mass_b;
    let new_normal_a = (normal_a * (mass_a - mass_b) + 2.0 * mass_b * normal_b) / total_mass;
    let new_normal_b = (normal_b * (mass_b - mass_a) + 2.0 * mass_a * normal_a) / total_mass;

    let before_a = body_a.motion;
    let before_b = body_b.motion;
    body_a.motion = Motion {
        position: pos_a,
        velocity: *normal * new_normal_a + *tangent * tangent_a,
        time: 1.0 - time,
    };
    body_b.motion = Motion {
        position: pos_b,
        velocity: *normal * new_normal_b + *tangent * tangent_b,
        time: 1.0 - time,
    };
    log::debug!("{} and {} collided at {time}", body_a.id(), body_b.id());

    Ok(vec![
        (
            a,
            Event::Collision(CollisionEvent {
                other: b,
                other_id: body_b.id(),
                other_mass: mass_b,
                before: before_a,
                after: body_a.motion,
            }),
        ),
        (
            b,
            Event::Collision(CollisionEvent {
                other: a,
                other_id: body_a.id(),
                other_mass: mass_a,
                before: before_b,
                after: body_b.motion,
            }),
        ),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        event::EventKind,
        geometry::AABB,
        math::Vec2,
        physics::{body::Body, collision::Side},
    };
    use rand::{rngs::StdRng, Rng, SeedableRng};
    use std::{cell::RefCell, rc::Rc};

    fn add(bodies: &mut BodySet, resolver: &mut CollisionResolver, body: Body) -> BodyKey {
        let key = bodies.insert(body);
        resolver.register(key);
        key
    }

    fn approx_eq(a: Vec2, b: Vec2) -> bool {
        (a - b).mag() < 1e-9
    }

    fn record_collisions(bodies: &mut BodySet, key: BodyKey) -> Rc<RefCell<Vec<BodyKey>>> {
        let log = Rc::new(RefCell::new(Vec::new()));
        let log_ref = log.clone();
        bodies
            .get_mut(key)
            .unwrap()
            .add_observer(EventKind::Collision, move |evt, _| {
                if let Event::Collision(coll) = evt {
                    log_ref.borrow_mut().push(coll.other);
                }
            });
        log
    }

    #[test]
    fn collision_order_tie_break() {
        let (id0, id1, id2) = (BodyId(0), BodyId(1), BodyId(2));
        let early = CollisionOrder::boundary(0.2, id2, 0);
        let late = CollisionOrder::bodies(0.3, id0, id1);
        assert!(early < late);
        // same time: lowest body id first, bodies before boundaries
        let pair = CollisionOrder::bodies(0.5, id2, id1);
        let with_boundary = CollisionOrder::boundary(0.5, id1, 0);
        let other_pair = CollisionOrder::bodies(0.5, id0, id2);
        assert!(other_pair < pair);
        assert!(pair < with_boundary);
        assert_eq!(pair, CollisionOrder::bodies(0.5, id1, id2));
        assert!(CollisionOrder::boundary(0.5, id1, 0) < CollisionOrder::boundary(0.5, id1, 3));
    }

    #[test]
    fn equal_masses_head_on_swap_velocities() {
        let mut bodies = BodySet::new();
        let mut resolver = CollisionResolver::new();
        let a = add(
            &mut bodies,
            &mut resolver,
            Body::new(5.0, 1.0, Vec2::new(-10.0, 0.0)).with_velocity(Vec2::new(10.0, 0.0)),
        );
        let b = add(
            &mut bodies,
            &mut resolver,
            Body::new(5.0, 1.0, Vec2::new(10.0, 0.0)).with_velocity(Vec2::new(-10.0, 0.0)),
        );
        let a_log = record_collisions(&mut bodies, a);
        let b_log = record_collisions(&mut bodies, b);

        let report = resolver.update(&mut bodies, &PhysicsParams::default());
        assert_eq!(report.iterations, 1);
        assert!(!report.aborted);
        assert!(report.errors.is_empty());

        let ma = bodies.get(a).unwrap().motion();
        let mb = bodies.get(b).unwrap().motion();
        assert_eq!(ma.velocity, Vec2::new(-10.0, 0.0));
        assert_eq!(mb.velocity, Vec2::new(10.0, 0.0));
        assert_eq!(ma.time, 0.5);
        assert_eq!(mb.time, 0.5);
        assert_eq!(ma.position, Vec2::new(-5.0, 0.0));
        assert_eq!(mb.position, Vec2::new(5.0, 0.0));

        assert_eq!(*a_log.borrow(), vec![b]);
        assert_eq!(*b_log.borrow(), vec![a]);
        assert_eq!(resolver.pending(), 0);
    }

    #[test]
    fn collision_event_carries_motions() {
        let mut bodies = BodySet::new();
        let mut resolver = CollisionResolver::new();
        let a = add(
            &mut bodies,
            &mut resolver,
            Body::new(1.0, 3.0, Vec2::new(0.0, 0.0)).with_velocity(Vec2::new(4.0, 0.0)),
        );
        let b = add(&mut bodies, &mut resolver, Body::new(1.0, 1.0, Vec2::new(4.0, 0.0)));
        let seen = Rc::new(RefCell::new(None));
        {
            let seen = seen.clone();
            bodies
                .get_mut(b)
                .unwrap()
                .add_observer(EventKind::Collision, move |evt, _| {
                    if let Event::Collision(coll) = evt {
                        *seen.borrow_mut() = Some(*coll);
                    }
                });
        }
        resolver.update(&mut bodies, &PhysicsParams::default());

        let coll = seen.borrow().unwrap();
        assert_eq!(coll.other, a);
        assert_eq!(coll.other_id, bodies.get(a).unwrap().id());
        assert_eq!(coll.other_mass, 3.0);
        assert_eq!(coll.before.velocity, Vec2::zero());
        assert_eq!(coll.before.time, 1.0);
        assert_eq!(coll.after.time, 0.5);
        // (4 * 2 * 3) / 4
        assert!(approx_eq(coll.after.velocity, Vec2::new(6.0, 0.0)));
    }

    #[test]
    fn random_oblique_collisions_conserve_normal_momentum() {
        let mut rng = StdRng::seed_from_u64(42);
        let mut resolved = 0;
        for _ in 0..500 {
            let mut bodies = BodySet::new();
            let mut resolver = CollisionResolver::new();
            let mut rand_vec = |range: f64| {
                Vec2::new(rng.gen_range(-range..range), rng.gen_range(-range..range))
            };
            let (pa, va, pb, vb) = (rand_vec(5.0), rand_vec(8.0), rand_vec(5.0), rand_vec(8.0));
            let (ra, rb) = (rng.gen_range(0.2..1.5), rng.gen_range(0.2..1.5));
            let (ma, mb) = (rng.gen_range(0.5..10.0), rng.gen_range(0.5..10.0));
            let a = add(&mut bodies, &mut resolver, Body::new(ra, ma, pa).with_velocity(va));
            let b = add(&mut bodies, &mut resolver, Body::new(rb, mb, pb).with_velocity(vb));

            let Some(time) = body_body_toi(
                bodies.get(a).unwrap().motion(),
                ra,
                bodies.get(b).unwrap().motion(),
                rb,
            ) else {
                continue;
            };
            let report = resolver.update(&mut bodies, &PhysicsParams::default());
            assert!(report.iterations >= 1);
            resolved += 1;

            let after_a = *bodies.get(a).unwrap().motion();
            let after_b = *bodies.get(b).unwrap().motion();
            assert!((after_a.time - (1.0 - time)).abs() < 1e-12);
            assert!((after_b.time - (1.0 - time)).abs() < 1e-12);
            assert!((0.0..=1.0).contains(&after_a.time));

            let dp = after_b.position - after_a.position;
            assert!((dp.mag() - (ra + rb)).abs() < 1e-6);
            let n = m::normalize(dp);
            let t = m::left_normal(n);
            let momentum_before = ma * va.dot(n) + mb * vb.dot(n);
            let momentum_after = ma * after_a.velocity.dot(n) + mb * after_b.velocity.dot(n);
            assert!((momentum_before - momentum_after).abs() < 1e-9);
            assert!((va.dot(t) - after_a.velocity.dot(t)).abs() < 1e-9);
            assert!((vb.dot(t) - after_b.velocity.dot(t)).abs() < 1e-9);
            // they're moving apart now
            assert!((after_b.velocity - after_a.velocity).dot(n) >= -1e-9);
        }
        assert!(resolved > 20, "only {resolved} collisions");
    }

    #[test]
    fn resolving_invalidates_stale_collisions() {
        let mut bodies = BodySet::new();
        let mut resolver = CollisionResolver::new();
        let a = add(
            &mut bodies,
            &mut resolver,
            Body::new(1.0, 1.0, Vec2::new(0.0, 0.0)).with_velocity(Vec2::new(10.0, 0.0)),
        );
        let b = add(&mut bodies, &mut resolver, Body::new(1.0, 1.0, Vec2::new(3.0, 0.0)));
        let c = add(&mut bodies, &mut resolver, Body::new(1.0, 1.0, Vec2::new(8.0, 0.0)));
        let logs = [a, b, c].map(|key| record_collisions(&mut bodies, key));

        // a would reach c at t = 0.6 if b weren't in the way
        let report = resolver.update(&mut bodies, &PhysicsParams::default());
        assert_eq!(report.iterations, 2);
        assert_eq!(*logs[0].borrow(), vec![b]);
        assert_eq!(*logs[1].borrow(), vec![a, c]);
        assert_eq!(*logs[2].borrow(), vec![b]);

        let motion_c = bodies.get(c).unwrap().motion();
        assert!((motion_c.time - 0.6).abs() < 1e-9);
        assert!(approx_eq(motion_c.velocity, Vec2::new(10.0, 0.0)));
        assert_eq!(bodies.get(a).unwrap().velocity(), Vec2::zero());
    }

    #[test]
    fn invalidation_clears_partner_lists() {
        let mut bodies = BodySet::new();
        let mut resolver = CollisionResolver::new();
        let a = add(
            &mut bodies,
            &mut resolver,
            Body::new(1.0, 1.0, Vec2::new(0.0, 0.0)).with_velocity(Vec2::new(10.0, 0.0)),
        );
        let b = add(&mut bodies, &mut resolver, Body::new(1.0, 1.0, Vec2::new(5.0, 0.0)));
        let c = add(
            &mut bodies,
            &mut resolver,
            Body::new(1.0, 1.0, Vec2::new(5.0, 5.0)).with_velocity(Vec2::new(0.0, -10.0)),
        );
        let params = PhysicsParams::default();
        resolver.detect_all(&bodies, &params, &mut ResolveReport::default());
        // a-b, b-c and a-c
        assert_eq!(resolver.pending(), 3);

        resolver.invalidate(b);
        assert_eq!(resolver.pending(), 1);
        assert!(resolver.trackers[b.0].collisions.is_empty());
        assert_eq!(resolver.trackers[a.0].collisions.len(), 1);
        assert_eq!(
            resolver.trackers[a.0].collisions,
            resolver.trackers[c.0].collisions
        );
        assert_eq!(resolver.collisions.len(), 1);
    }

    #[test]
    fn redetection_finds_each_pair_once() {
        let mut bodies = BodySet::new();
        let mut resolver = CollisionResolver::new();
        // three bodies closing in on the same point
        let a = add(
            &mut bodies,
            &mut resolver,
            Body::new(1.0, 1.0, Vec2::new(-4.0, 0.0)).with_velocity(Vec2::new(4.0, 0.0)),
        );
        let b = add(
            &mut bodies,
            &mut resolver,
            Body::new(1.0, 1.0, Vec2::new(4.0, 0.0)).with_velocity(Vec2::new(-4.0, 0.0)),
        );
        let c = add(
            &mut bodies,
            &mut resolver,
            Body::new(1.0, 1.0, Vec2::new(0.0, 4.0)).with_velocity(Vec2::new(0.0, -4.0)),
        );
        let params = PhysicsParams::default();
        let mut report = ResolveReport::default();
        resolver.detect_all(&bodies, &params, &mut report);
        assert_eq!(resolver.pending(), 3);

        let moved = [a, b];
        for &body in &moved {
            resolver.invalidate(body);
        }
        assert_eq!(resolver.pending(), 0);

        resolver.redetect(&moved, &bodies, &params, &mut report);
        assert_eq!(resolver.pending(), 3);
        assert_eq!(resolver.collisions.len(), 3);
        for key in [a, b, c] {
            let tracked = &resolver.trackers[key.0].collisions;
            assert_eq!(tracked.len(), 2);
            // no partner appears twice
            let partners: Vec<BodyKey> = tracked
                .iter()
                .flat_map(|coll| resolver.collisions[coll.0].bodies())
                .filter(|other| *other != key)
                .collect();
            assert_eq!(partners.len(), 2);
            assert_ne!(partners[0], partners[1]);
        }
        assert!(report.errors.is_empty());
    }

    #[test]
    fn boundary_wraps_without_changing_velocity() {
        let mut bodies = BodySet::new();
        let mut resolver = CollisionResolver::new();
        resolver.set_world(Some(WorldBounds::new(AABB::new(
            Vec2::new(0.0, 0.0),
            Vec2::new(100.0, 100.0),
        ))));
        let key = add(
            &mut bodies,
            &mut resolver,
            Body::new(1.0, 1.0, Vec2::new(95.0, 50.0)).with_velocity(Vec2::new(10.0, 0.0)),
        );
        let params = PhysicsParams::default();

        let report = resolver.update(&mut bodies, &params);
        assert_eq!(report.iterations, 1);
        assert!(report.errors.is_empty());

        let motion = bodies.get(key).unwrap().motion();
        assert_eq!(motion.velocity, Vec2::new(10.0, 0.0));
        assert_eq!(motion.position, Vec2::new(params.wrap_offset, 50.0));
        assert_eq!(motion.time, 0.5);
        // the rest of the motion doesn't cross anything
        assert_eq!(resolver.pending(), 0);
        assert_eq!(
            resolver.world().unwrap().segment(Side::Right).start(),
            Vec2::new(100.0, 0.0)
        );
    }

    #[test]
    fn extra_boundary_without_world_is_reported() {
        let mut bodies = BodySet::new();
        let mut resolver = CollisionResolver::new();
        resolver.add_boundary(Segment::from_points(Vec2::new(10.0, 0.0), Vec2::new(10.0, 20.0)));
        let key = add(
            &mut bodies,
            &mut resolver,
            Body::new(1.0, 1.0, Vec2::new(5.0, 10.0)).with_velocity(Vec2::new(10.0, 0.0)),
        );
        let report = resolver.update(&mut bodies, &PhysicsParams::default());
        assert_eq!(report.errors, vec![CollisionError::NoWorldBounds]);
        // untouched
        assert_eq!(
            *bodies.get(key).unwrap().motion(),
            Motion::new(Vec2::new(5.0, 10.0), Vec2::new(10.0, 0.0))
        );
    }

    #[test]
    fn slanted_boundary_is_reported() {
        let mut bodies = BodySet::new();
        let mut resolver = CollisionResolver::new();
        resolver.set_world(Some(WorldBounds::new(AABB::new(
            Vec2::new(-100.0, -100.0),
            Vec2::new(100.0, 100.0),
        ))));
        resolver.add_boundary(Segment::from_points(Vec2::new(10.0, 0.0), Vec2::new(0.0, 10.0)));
        assert_eq!(resolver.boundaries().count(), 5);
        add(
            &mut bodies,
            &mut resolver,
            Body::new(1.0, 1.0, Vec2::new(0.0, 0.0)).with_velocity(Vec2::new(10.0, 10.0)),
        );
        let report = resolver.update(&mut bodies, &PhysicsParams::default());
        assert!(matches!(
            report.errors.as_slice(),
            [CollisionError::InvalidBoundary { .. }]
        ));
    }

    #[test]
    fn degenerate_contacts() {
        // bodies overlapping from the start never produce a contact
        let mut bodies = BodySet::new();
        let mut resolver = CollisionResolver::new();
        add(
            &mut bodies,
            &mut resolver,
            Body::new(1.0, 1.0, Vec2::new(0.0, 0.0)).with_velocity(Vec2::new(1.0, 0.0)),
        );
        add(&mut bodies, &mut resolver, Body::new(1.0, 1.0, Vec2::new(0.0, 0.0)));
        let report = resolver.update(&mut bodies, &PhysicsParams::default());
        assert_eq!(report.iterations, 0);

        // point-sized bodies that started from the same spot and meet exactly
        // have no direction to bounce along at either time
        let mut bodies = BodySet::new();
        let mut resolver = CollisionResolver::new();
        let a = add(
            &mut bodies,
            &mut resolver,
            Body::new(0.0, 1.0, Vec2::new(0.0, 0.0)).with_velocity(Vec2::new(2.0, 0.0)),
        );
        let b = add(
            &mut bodies,
            &mut resolver,
            Body::new(0.0, 1.0, Vec2::new(0.0, 0.0)).with_velocity(Vec2::new(6.0, 0.0)),
        );
        bodies.get_mut(b).unwrap().motion.time = 0.5;
        let report = resolver.update(&mut bodies, &PhysicsParams::default());
        assert_eq!(report.iterations, 1);
        assert!(matches!(
            report.errors.as_slice(),
            [CollisionError::DegenerateNormal { .. }]
        ));
        assert_eq!(bodies.get(a).unwrap().velocity(), Vec2::new(2.0, 0.0));
        assert_eq!(bodies.get(b).unwrap().motion().time, 0.5);
    }

    fn newtons_cradle(count: usize) -> (BodySet, CollisionResolver) {
        let mut bodies = BodySet::new();
        let mut resolver = CollisionResolver::new();
        for i in 0..count {
            let velocity = if i == 0 {
                Vec2::new(1.0, 0.0)
            } else {
                Vec2::zero()
            };
            let position = Vec2::new(i as f64 * 1.001, 0.0);
            add(
                &mut bodies,
                &mut resolver,
                Body::new(0.5, 1.0, position).with_velocity(velocity),
            );
        }
        (bodies, resolver)
    }

    #[test]
    fn runaway_cascade_is_aborted() {
        let params = PhysicsParams::default();
        assert_eq!(params.max_resolutions_per_tick, 100);

        // 101 bodies need exactly 100 resolutions to pass the momentum down the line
        let (mut bodies, mut resolver) = newtons_cradle(101);
        let report = resolver.update(&mut bodies, &params);
        assert_eq!(report.iterations, 100);
        assert!(!report.aborted);

        // one more needs 101
        let (mut bodies, mut resolver) = newtons_cradle(102);
        let report = resolver.update(&mut bodies, &params);
        assert_eq!(report.iterations, 100);
        assert!(report.aborted);
        assert!(report.errors.is_empty());
        // the collision that hit the cap is left in the queue
        assert_eq!(resolver.pending(), 1);
    }

    #[test]
    fn destroyed_body_stops_colliding() {
        let mut bodies = BodySet::new();
        let mut resolver = CollisionResolver::new();
        add(
            &mut bodies,
            &mut resolver,
            Body::new(1.0, 1.0, Vec2::new(0.0, 0.0)).with_velocity(Vec2::new(10.0, 0.0)),
        );
        let b = add(&mut bodies, &mut resolver, Body::new(1.0, 1.0, Vec2::new(3.0, 0.0)));
        let c = add(&mut bodies, &mut resolver, Body::new(1.0, 1.0, Vec2::new(8.0, 0.0)));
        // b is destroyed by the first hit, so it never reaches c
        bodies
            .get_mut(b)
            .unwrap()
            .add_observer(EventKind::Collision, move |_, cmds| cmds.destroy(b));
        let c_log = record_collisions(&mut bodies, c);

        let report = resolver.update(&mut bodies, &PhysicsParams::default());
        assert_eq!(report.destroyed, vec![b]);
        assert_eq!(report.iterations, 1);
        assert!(!bodies.get(b).unwrap().is_collidable());
        assert!(c_log.borrow().is_empty());
        assert_eq!(resolver.pending(), 0);
    }
}
