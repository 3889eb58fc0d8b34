//! # Dock occupancy state.
//!
//! [`TruckState`] describes the single loading dock. While `is_present`
//! holds, `id` equals the pid of exactly one live truck process and every
//! mutation happens under the dock mutex.

use super::Package;

/// Fraction of a capacity limit at which a loaded truck is told to depart.
const DEPARTURE_THRESHOLD: f64 = 0.99;

#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[repr(C)]
pub struct TruckState {
    pub is_present: bool,
    /// Pid of the occupant; meaningless while `is_present` is false.
    pub id: i32,
    pub current_load: u32,
    pub max_load: u32,
    pub current_weight: f64,
    pub max_weight: f64,
    pub current_volume: f64,
    pub max_volume: f64,
}

impl TruckState {
    /// Re-initializes the slot for a freshly docked truck.
    pub fn dock(&mut self, pid: i32, max_load: u32, max_weight: f64, max_volume: f64) {
        *self = TruckState {
            is_present: true,
            id: pid,
            current_load: 0,
            max_load,
            current_weight: 0.0,
            max_weight,
            current_volume: 0.0,
            max_volume,
        };
    }

    pub fn fits_weight(&self, pkg: &Package) -> bool {
        self.current_weight + pkg.weight <= self.max_weight
    }

    pub fn fits_volume(&self, pkg: &Package) -> bool {
        self.current_volume + pkg.volume <= self.max_volume
    }

    pub fn fits_quantity(&self) -> bool {
        self.current_load < self.max_load
    }

    /// Full admission check: weight ∧ volume ∧ quantity.
    pub fn admits(&self, pkg: &Package) -> bool {
        self.fits_weight(pkg) && self.fits_volume(pkg) && self.fits_quantity()
    }

    /// Accounts a loaded package. Caller must have checked [`admits`](Self::admits).
    pub fn load(&mut self, pkg: &Package) {
        self.current_load += 1;
        self.current_weight += pkg.weight;
        self.current_volume += pkg.volume;
    }

    /// True when the truck is full by count or ≥99% full by weight or volume.
    pub fn should_depart(&self) -> bool {
        self.current_load == self.max_load
            || self.current_weight >= self.max_weight * DEPARTURE_THRESHOLD
            || self.current_volume >= self.max_volume * DEPARTURE_THRESHOLD
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{ActionFlags, PackageKind};

    fn pkg(weight: f64, volume: f64) -> Package {
        Package::new(PackageKind::A, weight, volume, ActionFlags::BY_WORKER, 1)
    }

    fn docked() -> TruckState {
        let mut t = TruckState::default();
        t.dock(101, 10, 100.0, 50.0);
        t
    }

    #[test]
    fn admission_gates_are_independent() {
        let mut t = docked();
        assert!(t.admits(&pkg(10.0, 1.0)));

        t.current_weight = 95.0;
        assert!(!t.fits_weight(&pkg(10.0, 1.0)));
        assert!(t.fits_volume(&pkg(10.0, 1.0)));

        t.current_weight = 0.0;
        t.current_load = 10;
        assert!(!t.fits_quantity());
    }

    #[test]
    fn departure_on_count_or_capacity_fraction() {
        let mut t = docked();
        assert!(!t.should_depart());

        t.current_load = 10;
        assert!(t.should_depart());

        let mut t = docked();
        t.current_weight = 99.5;
        assert!(t.should_depart());

        let mut t = docked();
        t.current_volume = 49.6;
        assert!(t.should_depart());
    }

    #[test]
    fn load_accounts_all_three_dimensions() {
        let mut t = docked();
        t.load(&pkg(10.5, 0.1));
        assert_eq!(t.current_load, 1);
        assert!((t.current_weight - 10.5).abs() < f64::EPSILON);
        assert!((t.current_volume - 0.1).abs() < f64::EPSILON);
    }
}
