//! Entity registry: robots, stations and parking spots.
//!
//! The registry owns every physical entity and its slots. It is rebuilt as a
//! whole on reset; there is no removal during normal operation.
//!
//! # Layout
//!
//! Parking spots form one column in the middle of the map. Stations form two
//! columns, the first half on the left edge and the rest on the right edge.
//! Every column is centered vertically by [`arrange_positions`].

use std::collections::BTreeMap;

use rand::seq::SliceRandom;
use rand::Rng;
use tracing::debug;

use crate::config::FleetConfig;
use crate::error::SchedulerError;
use crate::models::{Amr, Parking, Position, SlotHolder, SlotIndex, Station};

/// Location of an object: holder id and slot index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectLocation {
    pub holder: String,
    pub slot: SlotIndex,
}

/// Owner of all robots, stations and parking spots.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    amrs: BTreeMap<String, Amr>,
    stations: BTreeMap<String, Station>,
    /// Keyed by the id of the robot the spot belongs to.
    parkings: BTreeMap<String, Parking>,
}

impl Registry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the configured fleet and scatters the configured objects.
    pub fn build<R: Rng + ?Sized>(config: &FleetConfig, rng: &mut R) -> Result<Self, SchedulerError> {
        let mut registry = Self::new();

        let parking_ys = arrange_positions(
            config.fleet_size,
            config.parking_size,
            config.map_height,
            config.layout_spacing,
        );
        let parking_x = config.map_width / 2.0;
        for (i, y) in parking_ys.into_iter().enumerate() {
            let amr_id = format!("AMR{i}");
            let position = Position::new(parking_x, y);
            registry.register_parking(format!("Parking{i}"), &amr_id, position)?;
            let mut amr = Amr::new(&amr_id, position, config.amr_slot_capacity);
            amr.is_parked = true;
            registry.insert_amr(amr)?;
        }

        let left = config.total_stations.div_ceil(2);
        let right = config.total_stations - left;
        let left_x = config.station_width / 2.0;
        let right_x = config.map_width - config.station_width / 2.0;
        let columns = [
            (left_x, arrange_positions(left, config.station_height, config.map_height, config.layout_spacing)),
            (right_x, arrange_positions(right, config.station_height, config.map_height, config.layout_spacing)),
        ];
        let mut index = 0;
        for (x, ys) in columns {
            for y in ys {
                registry.register_station(
                    format!("Station{index}"),
                    Position::new(x, y),
                    config.station_slot_capacity,
                )?;
                index += 1;
            }
        }

        registry.scatter_objects(config.object_count, rng)?;
        Ok(registry)
    }

    /// Registers an idle robot with empty slots.
    pub fn register_amr(
        &mut self,
        id: impl Into<String>,
        position: Position,
        capacity: usize,
    ) -> Result<(), SchedulerError> {
        self.insert_amr(Amr::new(id, position, capacity))
    }

    fn insert_amr(&mut self, amr: Amr) -> Result<(), SchedulerError> {
        if self.amrs.contains_key(&amr.id) {
            return Err(SchedulerError::DuplicateEntity {
                kind: "amr",
                id: amr.id,
            });
        }
        self.amrs.insert(amr.id.clone(), amr);
        Ok(())
    }

    /// Registers an idle station with empty slots.
    pub fn register_station(
        &mut self,
        id: impl Into<String>,
        position: Position,
        capacity: usize,
    ) -> Result<(), SchedulerError> {
        let id = id.into();
        if self.stations.contains_key(&id) {
            return Err(SchedulerError::DuplicateEntity { kind: "station", id });
        }
        self.stations
            .insert(id.clone(), Station::new(id, position, capacity));
        Ok(())
    }

    /// Registers the parking spot of `amr_id`.
    pub fn register_parking(
        &mut self,
        id: impl Into<String>,
        amr_id: impl Into<String>,
        position: Position,
    ) -> Result<(), SchedulerError> {
        let amr_id = amr_id.into();
        if self.parkings.contains_key(&amr_id) {
            return Err(SchedulerError::DuplicateEntity {
                kind: "parking",
                id: amr_id,
            });
        }
        self.parkings
            .insert(amr_id.clone(), Parking::new(id, amr_id, position));
        Ok(())
    }

    /// Puts `object_id` into an empty slot of a station or robot.
    pub fn place_object(
        &mut self,
        object_id: impl Into<String>,
        holder_id: &str,
        slot: SlotIndex,
    ) -> Result<(), SchedulerError> {
        let object_id = object_id.into();
        if let Some(location) = self.locate_object(&object_id) {
            return Err(SchedulerError::DuplicateEntity {
                kind: "object",
                id: format!("{object_id} (on {})", location.holder),
            });
        }
        let target = if let Some(station) = self.stations.get_mut(holder_id) {
            station.slots.get_mut(slot)
        } else if let Some(amr) = self.amrs.get_mut(holder_id) {
            amr.slots.get_mut(slot)
        } else {
            return Err(SchedulerError::unknown("slot holder", holder_id));
        };
        match target {
            Some(s) if s.is_empty() => {
                s.object_id = Some(object_id);
                Ok(())
            }
            _ => Err(SchedulerError::InvalidSlot {
                holder: holder_id.to_string(),
                slot,
            }),
        }
    }

    /// Places `count` objects (`Object01`, `Object02`, ...) on distinct random
    /// empty station slots.
    pub fn scatter_objects<R: Rng + ?Sized>(
        &mut self,
        count: usize,
        rng: &mut R,
    ) -> Result<(), SchedulerError> {
        let mut free: Vec<(String, SlotIndex)> = self
            .stations
            .values()
            .flat_map(|station| {
                station
                    .slots
                    .iter()
                    .enumerate()
                    .filter(|(_, s)| s.is_empty())
                    .map(move |(i, _)| (station.id.clone(), i))
            })
            .collect();
        if free.len() < count {
            return Err(SchedulerError::InsufficientStationCapacity {
                objects: count,
                available: free.len(),
            });
        }
        free.shuffle(rng);
        for (i, (station_id, slot)) in free.into_iter().take(count).enumerate() {
            let object_id = format!("Object{:02}", i + 1);
            debug!(object = %object_id, station = %station_id, slot, "placed object");
            self.place_object(object_id, &station_id, slot)?;
        }
        Ok(())
    }

    pub fn amr(&self, id: &str) -> Result<&Amr, SchedulerError> {
        self.amrs.get(id).ok_or_else(|| SchedulerError::unknown("amr", id))
    }

    pub fn amr_mut(&mut self, id: &str) -> Result<&mut Amr, SchedulerError> {
        self.amrs
            .get_mut(id)
            .ok_or_else(|| SchedulerError::unknown("amr", id))
    }

    pub fn station(&self, id: &str) -> Result<&Station, SchedulerError> {
        self.stations
            .get(id)
            .ok_or_else(|| SchedulerError::unknown("station", id))
    }

    pub fn station_mut(&mut self, id: &str) -> Result<&mut Station, SchedulerError> {
        self.stations
            .get_mut(id)
            .ok_or_else(|| SchedulerError::unknown("station", id))
    }

    /// Parking spot of `amr_id`.
    pub fn parking(&self, amr_id: &str) -> Result<&Parking, SchedulerError> {
        self.parkings
            .get(amr_id)
            .ok_or_else(|| SchedulerError::unknown("parking", amr_id))
    }

    pub fn has_station(&self, id: &str) -> bool {
        self.stations.contains_key(id)
    }

    /// Robot ids in iteration order.
    pub fn amr_ids(&self) -> Vec<String> {
        self.amrs.keys().cloned().collect()
    }

    pub fn amrs(&self) -> impl Iterator<Item = &Amr> {
        self.amrs.values()
    }

    pub fn stations(&self) -> impl Iterator<Item = &Station> {
        self.stations.values()
    }

    pub fn stations_mut(&mut self) -> impl Iterator<Item = &mut Station> {
        self.stations.values_mut()
    }

    pub fn parkings(&self) -> impl Iterator<Item = &Parking> {
        self.parkings.values()
    }

    /// Finds the station or robot currently holding `object_id`.
    pub fn locate_object(&self, object_id: &str) -> Option<ObjectLocation> {
        let stations = self
            .stations
            .values()
            .map(|s| (s.id.as_str(), s.find_object(object_id)));
        let amrs = self
            .amrs
            .values()
            .map(|a| (a.id.as_str(), a.find_object(object_id)));
        stations
            .chain(amrs)
            .find_map(|(holder, slot)| {
                slot.map(|slot| ObjectLocation {
                    holder: holder.to_string(),
                    slot,
                })
            })
    }
}

/// Centers `count` entities of `size` along an axis of length `axis_max`.
///
/// Returns the center coordinate of each entity.
pub fn arrange_positions(count: usize, size: f64, axis_max: f64, spacing: f64) -> Vec<f64> {
    if count == 0 {
        return Vec::new();
    }
    let total = count as f64 * size + (count as f64 - 1.0) * spacing;
    let start = ((axis_max - total + size) / 2.0).floor();
    let step = size + spacing;
    (0..count).map(|i| start + i as f64 * step).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    #[test]
    fn test_arrange_positions_centered() {
        let ys = arrange_positions(3, 40.0, 800.0, 50.0);
        // total = 120 + 100 = 220, start = floor((800 - 220 + 40) / 2) = 310
        assert_eq!(ys, vec![310.0, 400.0, 490.0]);
        assert!(arrange_positions(0, 40.0, 800.0, 50.0).is_empty());
    }

    #[test]
    fn test_build_default_layout() {
        let config = FleetConfig::default();
        let mut rng = SmallRng::seed_from_u64(42);
        let registry = Registry::build(&config, &mut rng).unwrap();

        assert_eq!(registry.amr_ids(), vec!["AMR0", "AMR1", "AMR2"]);
        assert_eq!(registry.stations().count(), 6);
        assert_eq!(registry.parkings().count(), 3);

        for amr in registry.amrs() {
            let parking = registry.parking(&amr.id).unwrap();
            assert!(amr.is_parked);
            assert_eq!(amr.position, parking.position);
        }

        let left = registry.station("Station0").unwrap();
        let right = registry.station("Station5").unwrap();
        assert!((left.position.x - 50.0).abs() < 1e-10);
        assert!((right.position.x - 1150.0).abs() < 1e-10);

        let placed: usize = registry.stations().map(|s| s.occupied_count()).sum();
        assert_eq!(placed, 10);
        assert!(registry.locate_object("Object01").is_some());
        assert!(registry.locate_object("Object10").is_some());
        assert!(registry.locate_object("Object11").is_none());
    }

    #[test]
    fn test_build_is_seed_deterministic() {
        let config = FleetConfig::default();
        let a = Registry::build(&config, &mut SmallRng::seed_from_u64(7)).unwrap();
        let b = Registry::build(&config, &mut SmallRng::seed_from_u64(7)).unwrap();
        for i in 1..=10 {
            let id = format!("Object{i:02}");
            assert_eq!(a.locate_object(&id), b.locate_object(&id));
        }
    }

    #[test]
    fn test_scatter_fails_fast_on_capacity() {
        let config = FleetConfig::default()
            .with_stations(2)
            .with_station_slots(2)
            .with_object_count(5);
        let err = Registry::build(&config, &mut SmallRng::seed_from_u64(1)).unwrap_err();
        assert_eq!(
            err,
            SchedulerError::InsufficientStationCapacity {
                objects: 5,
                available: 4
            }
        );
    }

    #[test]
    fn test_duplicate_registration() {
        let mut registry = Registry::new();
        registry
            .register_station("Station0", Position::default(), 2)
            .unwrap();
        let err = registry
            .register_station("Station0", Position::default(), 2)
            .unwrap_err();
        assert_eq!(err.code(), "FLEET_DUPLICATE_ENTITY");

        registry.register_amr("AMR0", Position::default(), 1).unwrap();
        assert!(registry.register_amr("AMR0", Position::default(), 1).is_err());
    }

    #[test]
    fn test_place_object_checks_slot() {
        let mut registry = Registry::new();
        registry
            .register_station("Station0", Position::default(), 1)
            .unwrap();
        registry.place_object("Object01", "Station0", 0).unwrap();

        assert!(matches!(
            registry.place_object("Object02", "Station0", 0),
            Err(SchedulerError::InvalidSlot { .. })
        ));
        assert!(matches!(
            registry.place_object("Object02", "Station0", 5),
            Err(SchedulerError::InvalidSlot { .. })
        ));
        assert!(matches!(
            registry.place_object("Object01", "Station0", 0),
            Err(SchedulerError::DuplicateEntity { .. })
        ));
        assert!(matches!(
            registry.place_object("Object02", "Nowhere", 0),
            Err(SchedulerError::UnknownEntity { .. })
        ));
    }
}
