//! Per-vehicle visit chains.
//!
//! Each vehicle owns an ordered list of visit ids. Every assigned visit also
//! carries a [`VisitLink`] (vehicle, predecessor, successor, position) that is
//! kept consistent with that list. Mutations splice the list and re-link only
//! the suffix behind the splice point, returning the [`DirtySuffix`] whose
//! timing has to be propagated.
//!
//! The operations here assume the caller already checked that the visit and
//! vehicle agree; breaking that contract panics.

use crate::model::{VehicleId, VisitId};

/// Route membership of a single visit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VisitLink {
    pub vehicle: Option<VehicleId>,
    pub previous: Option<VisitId>,
    pub next: Option<VisitId>,
    pub position: usize,
}

/// Part of a route whose timing is stale after a mutation.
///
/// Every index in `start..relinked_end` got a new predecessor; indices from
/// `relinked_end` on kept theirs and only see upstream timing shifts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirtySuffix {
    pub vehicle: VehicleId,
    pub start: usize,
    pub relinked_end: usize,
}

impl DirtySuffix {
    /// Smallest suffix covering both `self` and `other` (same vehicle).
    pub fn union(self, other: DirtySuffix) -> DirtySuffix {
        debug_assert_eq!(self.vehicle, other.vehicle);
        DirtySuffix {
            vehicle: self.vehicle,
            start: self.start.min(other.start),
            relinked_end: self.relinked_end.max(other.relinked_end),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteChains {
    routes: Vec<Vec<VisitId>>,
    links: Vec<VisitLink>,
}

impl RouteChains {
    pub fn new(num_vehicles: usize, num_visits: usize) -> Self {
        Self {
            routes: vec![Vec::new(); num_vehicles],
            links: vec![VisitLink::default(); num_visits],
        }
    }

    pub fn route(&self, vehicle: VehicleId) -> &[VisitId] {
        &self.routes[vehicle.get()]
    }

    pub fn len(&self, vehicle: VehicleId) -> usize {
        self.routes[vehicle.get()].len()
    }

    pub fn link(&self, visit: VisitId) -> &VisitLink {
        &self.links[visit.get()]
    }

    pub fn vehicle_of(&self, visit: VisitId) -> Option<VehicleId> {
        self.links[visit.get()].vehicle
    }

    pub fn num_vehicles(&self) -> usize {
        self.routes.len()
    }

    pub fn num_visits(&self) -> usize {
        self.links.len()
    }

    /// Splices an unassigned visit into `vehicle`'s route at `position`.
    pub fn insert(&mut self, vehicle: VehicleId, visit: VisitId, position: usize) -> DirtySuffix {
        assert!(
            self.links[visit.get()].vehicle.is_none(),
            "visit #{visit} is already assigned"
        );
        let route = &mut self.routes[vehicle.get()];
        assert!(
            position <= route.len(),
            "position {position} out of range for vehicle #{vehicle}"
        );

        route.insert(position, visit);
        let len = route.len();
        self.links[visit.get()].vehicle = Some(vehicle);
        self.relink(vehicle, position);

        DirtySuffix {
            vehicle,
            start: position,
            relinked_end: (position + 2).min(len),
        }
    }

    /// Excises `visit` from `vehicle`'s route; the visit becomes unassigned.
    pub fn remove(&mut self, vehicle: VehicleId, visit: VisitId) -> DirtySuffix {
        let link = self.links[visit.get()];
        assert_eq!(
            link.vehicle,
            Some(vehicle),
            "visit #{visit} is not on vehicle #{vehicle}"
        );
        let route = &mut self.routes[vehicle.get()];
        debug_assert_eq!(route[link.position], visit);

        let position = link.position;
        route.remove(position);
        let len = route.len();
        self.links[visit.get()] = VisitLink::default();
        self.relink(vehicle, position);

        DirtySuffix {
            vehicle,
            start: position,
            relinked_end: (position + 1).min(len),
        }
    }

    /// Moves `visit` inside its own route so that it ends up at index `to`.
    pub fn move_within_vehicle(&mut self, vehicle: VehicleId, visit: VisitId, to: usize) -> DirtySuffix {
        let from = self.links[visit.get()].position;
        let removed = self.remove(vehicle, visit);
        let inserted = self.insert(vehicle, visit, to);
        let len = self.len(vehicle);

        DirtySuffix {
            vehicle,
            start: from.min(to),
            relinked_end: (from.max(to) + 2).min(len),
        }
        .union(removed)
        .union(inserted)
    }

    /// Moves `visit` from `from`'s route to index `position` of `to`'s route.
    pub fn move_between_vehicles(
        &mut self,
        from: VehicleId,
        to: VehicleId,
        visit: VisitId,
        position: usize,
    ) -> [DirtySuffix; 2] {
        assert_ne!(from, to, "use move_within_vehicle for a single route");
        let removed = self.remove(from, visit);
        let inserted = self.insert(to, visit, position);
        [removed, inserted]
    }

    /// Re-derives links for `start - 1 ..` of `vehicle`'s route.
    fn relink(&mut self, vehicle: VehicleId, start: usize) {
        let route = &self.routes[vehicle.get()];
        for index in start.saturating_sub(1)..route.len() {
            let link = &mut self.links[route[index].get()];
            link.vehicle = Some(vehicle);
            link.position = index;
            link.previous = index.checked_sub(1).map(|i| route[i]);
            link.next = route.get(index + 1).copied();
        }
    }

    /// Iterates a route by following successor links from its head.
    pub fn walk(&self, vehicle: VehicleId) -> ChainWalk<'_> {
        ChainWalk {
            chains: self,
            current: self.routes[vehicle.get()].first().copied(),
        }
    }

    /// Verifies that links and route lists describe the same chains.
    pub fn check_consistency(&self) -> Result<(), String> {
        let mut seen = vec![false; self.links.len()];

        for (vehicle_index, route) in self.routes.iter().enumerate() {
            let vehicle = VehicleId::new(vehicle_index);
            let walked: Vec<VisitId> = self.walk(vehicle).take(route.len() + 1).collect();
            if walked != *route {
                return Err(format!(
                    "vehicle #{vehicle}: walking links gives {walked:?}, route is {route:?}"
                ));
            }

            for (position, &visit) in route.iter().enumerate() {
                if std::mem::replace(&mut seen[visit.get()], true) {
                    return Err(format!("visit #{visit} appears twice"));
                }
                let link = &self.links[visit.get()];
                let expected_previous = position.checked_sub(1).map(|i| route[i]);
                if link.vehicle != Some(vehicle)
                    || link.position != position
                    || link.previous != expected_previous
                {
                    return Err(format!("visit #{visit}: stale link {link:?}"));
                }
            }
        }

        for (index, link) in self.links.iter().enumerate() {
            if !seen[index] && *link != VisitLink::default() {
                return Err(format!("unassigned visit #{index} has link {link:?}"));
            }
        }

        Ok(())
    }
}

/// Iterator returned by [`RouteChains::walk`].
pub struct ChainWalk<'a> {
    chains: &'a RouteChains,
    current: Option<VisitId>,
}

impl Iterator for ChainWalk<'_> {
    type Item = VisitId;

    fn next(&mut self) -> Option<Self::Item> {
        let visit = self.current?;
        self.current = self.chains.links[visit.get()].next;
        Some(visit)
    }
}
