use std::fmt;
use std::str::FromStr;

use rand::Rng;
use rand_distr::{Distribution, Uniform};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Collision percent assumed before the player picks a point on the map
pub const DEFAULT_COLLISION_PERCENT: u32 = 35;

/// Orbit choices for the orbital phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrbitKind {
    #[serde(rename = "LEO")]
    Leo,
    #[serde(rename = "MEO")]
    Meo,
    #[serde(rename = "GEO")]
    Geo,
}

impl OrbitKind {
    pub fn all() -> &'static [OrbitKind] {
        &[OrbitKind::Leo, OrbitKind::Meo, OrbitKind::Geo]
    }

    pub fn id(&self) -> &'static str {
        match self {
            OrbitKind::Leo => "LEO",
            OrbitKind::Meo => "MEO",
            OrbitKind::Geo => "GEO",
        }
    }

    pub fn path(&self) -> &'static OrbitalPath {
        ORBITAL_PATHS
            .iter()
            .find(|p| p.kind == *self)
            .expect("every orbit kind has a table entry")
    }
}

impl fmt::Display for OrbitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for OrbitKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OrbitKind::all()
            .iter()
            .copied()
            .find(|o| o.id().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ValidationError::UnknownKey {
                kind: "orbital path",
                key: s.to_string(),
            })
    }
}

/// Orbital path reference data
#[derive(Debug, Clone, PartialEq)]
pub struct OrbitalPath {
    pub kind: OrbitKind,
    pub name: &'static str,
    pub altitude: &'static str,
    pub cost: i64,
    pub weight: f64,
    pub si_impact: i32,
    /// SI points per 100% collision risk (negative: risk hurts SI)
    pub collision_multiplier: f64,
    pub characteristics: &'static [&'static str],
}

impl OrbitalPath {
    /// Score contribution of committing to this orbit: cost × weight
    pub fn score(&self) -> f64 {
        self.cost as f64 * self.weight
    }

    /// SI impact shown next to the orbit card, including the collision term
    pub fn displayed_si_impact(&self, collision_percent: u32) -> f64 {
        self.si_impact as f64 + (collision_percent as f64 / 100.0) * self.collision_multiplier
    }
}

pub const ORBITAL_PATHS: &[OrbitalPath] = &[
    OrbitalPath {
        kind: OrbitKind::Leo,
        name: "Low Earth Orbit (LEO)",
        altitude: "160-2,000 km",
        cost: 100,
        weight: 1.0,
        si_impact: -5,
        collision_multiplier: -1.0,
        characteristics: &[
            "Altitude: 160-2,000 km",
            "Orbital period: ~90 minutes",
            "High collision risk",
            "Lower launch costs",
            "Ideal for Earth observation",
        ],
    },
    OrbitalPath {
        kind: OrbitKind::Meo,
        name: "Medium Earth Orbit (MEO)",
        altitude: "2,000-35,786 km",
        cost: 150,
        weight: 2.0,
        si_impact: -2,
        collision_multiplier: -0.5,
        characteristics: &[
            "Altitude: 2,000-35,786 km",
            "Orbital period: 2-12 hours",
            "Moderate collision risk",
            "Good for navigation (GPS)",
            "Balanced cost/benefit",
        ],
    },
    OrbitalPath {
        kind: OrbitKind::Geo,
        name: "Geostationary Orbit (GEO)",
        altitude: "35,786 km",
        cost: 200,
        weight: 3.0,
        si_impact: 5,
        collision_multiplier: -0.2,
        characteristics: &[
            "Altitude: 35,786 km (fixed)",
            "Orbital period: 24 hours",
            "Low collision risk",
            "Highest launch costs",
            "Perfect for communications",
        ],
    },
];

/// A point picked on the world map
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MapPoint {
    pub lat: f64,
    pub lng: f64,
}

/// Traffic band by absolute latitude.
/// Equatorial orbits are the most crowded, polar the least.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrafficBand {
    Equatorial,
    MidLatitude,
    Polar,
}

impl TrafficBand {
    pub fn for_latitude(lat: f64) -> Self {
        let lat = lat.abs();
        if lat < 30.0 {
            TrafficBand::Equatorial
        } else if lat < 60.0 {
            TrafficBand::MidLatitude
        } else {
            TrafficBand::Polar
        }
    }

    /// Collision percent range (low, high)
    pub fn risk_range(&self) -> (f64, f64) {
        match self {
            TrafficBand::Equatorial => (40.0, 60.0),
            TrafficBand::MidLatitude => (20.0, 40.0),
            TrafficBand::Polar => (10.0, 25.0),
        }
    }
}

/// Draw a collision percent for a map point, rounded to a whole percent
pub fn collision_risk_at(point: MapPoint, rng: &mut impl Rng) -> u32 {
    let (low, high) = TrafficBand::for_latitude(point.lat).risk_range();
    let risk = Uniform::new(low, high).sample(rng);
    risk.round() as u32
}

/// Bring an untrusted collision value into 0..=100
pub fn clamp_collision_percent(value: i64) -> u32 {
    value.clamp(0, 100) as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_orbit_table() {
        assert_eq!(OrbitKind::Leo.path().cost, 100);
        assert_eq!(OrbitKind::Meo.path().si_impact, -2);
        assert_eq!(OrbitKind::Geo.path().score(), 600.0);
        assert_eq!(OrbitKind::Meo.path().score(), 300.0);
    }

    #[test]
    fn test_parse_orbit() {
        assert_eq!("leo".parse::<OrbitKind>().unwrap(), OrbitKind::Leo);
        assert!("HEO".parse::<OrbitKind>().is_err());
        assert_eq!(serde_json::to_string(&OrbitKind::Geo).unwrap(), "\"GEO\"");
    }

    #[test]
    fn test_displayed_si_impact() {
        // LEO at 35% collision: -5 + 0.35 * -1.0
        let leo = OrbitKind::Leo.path();
        assert!((leo.displayed_si_impact(35) - (-5.35)).abs() < 1e-9);
        // GEO at 50%: 5 + 0.5 * -0.2
        let geo = OrbitKind::Geo.path();
        assert!((geo.displayed_si_impact(50) - 4.9).abs() < 1e-9);
    }

    #[test]
    fn test_clamp_collision_percent() {
        assert_eq!(clamp_collision_percent(-4), 0);
        assert_eq!(clamp_collision_percent(52), 52);
        assert_eq!(clamp_collision_percent(250), 100);
        assert_eq!(clamp_collision_percent(i64::MAX), 100);
        assert_eq!(clamp_collision_percent(u32::MAX as i64 + 7), 100);
    }

    #[test]
    fn test_traffic_bands() {
        assert_eq!(TrafficBand::for_latitude(0.0), TrafficBand::Equatorial);
        assert_eq!(TrafficBand::for_latitude(-29.9), TrafficBand::Equatorial);
        assert_eq!(TrafficBand::for_latitude(45.0), TrafficBand::MidLatitude);
        assert_eq!(TrafficBand::for_latitude(-60.0), TrafficBand::Polar);
    }

    #[test]
    fn test_collision_risk_stays_in_band() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        for lat in [-80.0, -45.0, 0.0, 12.5, 50.0, 89.0] {
            let (low, high) = TrafficBand::for_latitude(lat).risk_range();
            for _ in 0..500 {
                let risk = collision_risk_at(MapPoint { lat, lng: 0.0 }, &mut rng) as f64;
                assert!(risk >= low && risk <= high, "{} outside {}..{}", risk, low, high);
            }
        }
    }
}
