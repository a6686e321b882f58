use std::collections::VecDeque;

use chrono::{DateTime, TimeDelta, Utc};
use geo::{Distance, Haversine, Point};
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::{
    error::LocationError,
    geocode::{AddressHint, ReverseGeocoder},
};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub lat: f64,
    pub lon: f64,
    pub timestamp: DateTime<Utc>,
}

impl Position {
    pub fn new(lat: f64, lon: f64, timestamp: DateTime<Utc>) -> Position {
        Position {
            lat,
            lon,
            timestamp,
        }
    }

    pub fn age(&self, now: DateTime<Utc>) -> TimeDelta {
        now - self.timestamp
    }

    /// Great-circle distance in meters.
    pub fn distance_to(&self, other: &Position) -> f64 {
        compute_distance((self.lat, self.lon), (other.lat, other.lon))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GeoFix {
    pub position: Position,
    pub address: AddressHint,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MonitorConfig {
    /// Minimum movement in meters before a new update is delivered.
    pub distance_filter: f64,
    pub desired_accuracy: f64,
    pub max_fix_age: TimeDelta,
}

impl Default for MonitorConfig {
    fn default() -> MonitorConfig {
        MonitorConfig {
            distance_filter: 500.0,
            desired_accuracy: 1000.0,
            max_fix_age: TimeDelta::seconds(15),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Authorization {
    WhenInUse,
    Denied,
}

pub trait LocationService {
    fn request_authorization(&mut self) -> Authorization;
    fn start_updates(&mut self, config: &MonitorConfig) -> Result<(), LocationError>;
    fn stop_updates(&mut self);
    /// Next batch of fixes, oldest first. `None` once the stream has ended
    /// or when updates were never started.
    fn next_update(&mut self) -> Option<Vec<Position>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolverState {
    Idle,
    Authorizing,
    Monitoring,
    FixAcquired,
    Resolving,
}

/// Turns position updates into address hints.
///
/// The resolver never touches a form. It hands back a `GeoFix` and the
/// owner of the form decides whether to apply it.
pub struct LocationResolver<G> {
    geocoder: G,
    config: MonitorConfig,
    state: ResolverState,
    current_fix: Option<Position>,
}

impl<G: ReverseGeocoder> LocationResolver<G> {
    pub fn new(geocoder: G, config: MonitorConfig) -> LocationResolver<G> {
        LocationResolver {
            geocoder,
            config,
            state: ResolverState::Idle,
            current_fix: None,
        }
    }

    pub fn state(&self) -> ResolverState {
        self.state
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    pub fn current_fix(&self) -> Option<&Position> {
        self.current_fix.as_ref()
    }

    pub fn start<S: LocationService>(&mut self, service: &mut S) -> Result<(), LocationError> {
        self.state = ResolverState::Authorizing;
        if service.request_authorization() == Authorization::Denied {
            self.state = ResolverState::Idle;
            return Err(LocationError::NotAuthorized);
        }
        if let Err(e) = service.start_updates(&self.config) {
            self.state = ResolverState::Idle;
            return Err(e);
        }
        debug!(
            "Monitoring location: filter {} m, accuracy {} m",
            self.config.distance_filter, self.config.desired_accuracy
        );
        self.state = ResolverState::Monitoring;
        Ok(())
    }

    pub fn stop<S: LocationService>(&mut self, service: &mut S) {
        service.stop_updates();
        self.state = ResolverState::Idle;
        self.current_fix = None;
    }

    /// A fix is fresh when it is at most `max_fix_age` old. Timestamps
    /// slightly in the future (clock skew) count as fresh.
    pub fn is_fresh(&self, position: &Position, now: DateTime<Utc>) -> bool {
        position.age(now) <= self.config.max_fix_age
    }

    pub fn handle_update(&mut self, fixes: &[Position], now: DateTime<Utc>) -> Option<GeoFix> {
        self.accept(fixes, now)?;
        self.resolve()
    }

    /// Takes the latest fix of a batch as the current fix if it is fresh.
    /// A fresh fix arriving before `resolve` replaces the pending one.
    pub fn accept(&mut self, fixes: &[Position], now: DateTime<Utc>) -> Option<Position> {
        if !matches!(
            self.state,
            ResolverState::Monitoring | ResolverState::FixAcquired
        ) {
            debug!("Ignoring location update while {:?}", self.state);
            return None;
        }
        let latest = fixes.last()?;
        if !self.is_fresh(latest, now) {
            debug!(
                "Discarding stale fix ({}s old)",
                latest.age(now).num_seconds()
            );
            return None;
        }

        self.current_fix = Some(*latest);
        self.state = ResolverState::FixAcquired;
        Some(*latest)
    }

    pub fn resolve(&mut self) -> Option<GeoFix> {
        if self.state != ResolverState::FixAcquired {
            return None;
        }
        let fix = self.current_fix?;
        self.state = ResolverState::Resolving;
        let resolved = self.reverse_geocode(&fix);
        self.state = ResolverState::Monitoring;
        resolved
    }

    pub fn reverse_geocode(&self, position: &Position) -> Option<GeoFix> {
        match self.geocoder.reverse_geocode(position) {
            Ok(Some(address)) => Some(GeoFix {
                position: *position,
                address,
            }),
            Ok(None) => {
                debug!("No address known at {}, {}", position.lat, position.lon);
                None
            }
            Err(e) => {
                warn!("Reverse geocoder error: {}", e);
                None
            }
        }
    }
}

/// Location service playing back recorded fixes. Applies the distance
/// filter itself, like a platform service would.
pub struct ReplayLocationService {
    pending: VecDeque<Position>,
    authorization: Authorization,
    config: Option<MonitorConfig>,
    last_delivered: Option<Position>,
}

impl ReplayLocationService {
    pub fn new(fixes: Vec<Position>) -> ReplayLocationService {
        ReplayLocationService {
            pending: fixes.into(),
            authorization: Authorization::WhenInUse,
            config: None,
            last_delivered: None,
        }
    }

    pub fn with_authorization(mut self, authorization: Authorization) -> ReplayLocationService {
        self.authorization = authorization;
        self
    }

    pub fn is_running(&self) -> bool {
        self.config.is_some()
    }
}

impl LocationService for ReplayLocationService {
    fn request_authorization(&mut self) -> Authorization {
        self.authorization
    }

    fn start_updates(&mut self, config: &MonitorConfig) -> Result<(), LocationError> {
        if self.authorization == Authorization::Denied {
            return Err(LocationError::NotAuthorized);
        }
        self.config = Some(config.clone());
        Ok(())
    }

    fn stop_updates(&mut self) {
        self.config = None;
    }

    fn next_update(&mut self) -> Option<Vec<Position>> {
        let filter = self.config.as_ref()?.distance_filter;
        while let Some(fix) = self.pending.pop_front() {
            if let Some(last) = &self.last_delivered {
                let moved = last.distance_to(&fix);
                if moved < filter {
                    debug!("Filtered fix that moved {:.0} m", moved);
                    continue;
                }
            }
            self.last_delivered = Some(fix);
            return Some(vec![fix]);
        }
        None
    }
}

fn compute_distance((lat0, lon0): (f64, f64), (lat1, lon1): (f64, f64)) -> f64 {
    let loc0 = Point::new(lon0, lat0);
    let loc1 = Point::new(lon1, lat1);
    Haversine::distance(loc0, loc1)
}
