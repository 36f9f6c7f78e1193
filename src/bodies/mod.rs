//! NAIF body identifiers.
//!
//! Kernels refer to bodies by integer NAIF ids. [`Body`] gives those ids a
//! typed face for listings, error messages and name lookup, while every
//! resolver in the crate keeps working on the raw [`NaifId`].
//!
//! | id            | body                                   |
//! |---------------|----------------------------------------|
//! | `0`           | solar system barycenter                |
//! | `1..=9`       | planetary system barycenters           |
//! | `10`          | Sun                                    |
//! | `n99`         | planet mass center of system `n`       |
//! | `n01..=n98`   | natural satellites of system `n`       |
//! | anything else | spacecraft, asteroids, comets...       |

pub mod planet;
pub mod satellite;

use std::{fmt, str::FromStr};

use crate::{constants::NaifId, orrery_errors::OrreryError};

use planet::Planet;
use satellite::Satellite;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Body {
    SolarSystemBarycenter,
    Barycenter(Planet),
    Sun,
    Planet(Planet),
    Satellite(Satellite),
    Other(NaifId),
}

impl Body {
    pub const SSB: Body = Body::SolarSystemBarycenter;
    pub const EARTH: Body = Body::Planet(Planet::Earth);
    pub const EARTH_MOON_BARYCENTER: Body = Body::Barycenter(Planet::Earth);
    pub const MOON: Body = Body::Satellite(Satellite {
        planet: Planet::Earth,
        index: 1,
    });

    /// Classify a NAIF id. Every id maps to a body.
    pub fn from_id(id: NaifId) -> Self {
        match id {
            0 => Body::SolarSystemBarycenter,
            10 => Body::Sun,
            1..=9 => Planet::from_system(id).map_or(Body::Other(id), Body::Barycenter),
            100..=999 if id % 100 == 99 => {
                Planet::from_system(id / 100).map_or(Body::Other(id), Body::Planet)
            }
            100..=999 => Satellite::from_id(id).map_or(Body::Other(id), Body::Satellite),
            _ => Body::Other(id),
        }
    }

    pub fn id(&self) -> NaifId {
        match self {
            Body::SolarSystemBarycenter => 0,
            Body::Barycenter(planet) => planet.barycenter_id(),
            Body::Sun => 10,
            Body::Planet(planet) => planet.mass_center_id(),
            Body::Satellite(satellite) => satellite.id(),
            Body::Other(id) => *id,
        }
    }
}

impl From<NaifId> for Body {
    fn from(id: NaifId) -> Self {
        Body::from_id(id)
    }
}

impl From<Body> for NaifId {
    fn from(body: Body) -> Self {
        body.id()
    }
}

impl fmt::Display for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Body::SolarSystemBarycenter => write!(f, "Solar System Barycenter"),
            Body::Barycenter(planet) => write!(f, "{}", planet.barycenter_name()),
            Body::Sun => write!(f, "Sun"),
            Body::Planet(planet) => write!(f, "{planet}"),
            Body::Satellite(satellite) => match satellite.name() {
                Some(name) => write!(f, "{name}"),
                None => write!(f, "Satellite {}", satellite.id()),
            },
            Body::Other(id) => write!(f, "Body {id}"),
        }
    }
}

/// Lookup by name (case-insensitive) or by decimal NAIF id.
///
/// `"Earth Barycenter"`, `"EMB"` and `"Earth-Moon Barycenter"` all name the
/// id 3; `"Mars Barycenter"` names 4; `"SSB"` names 0.
impl FromStr for Body {
    type Err = OrreryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim();
        if let Ok(id) = name.parse::<NaifId>() {
            return Ok(Body::from_id(id));
        }

        let lower = name.to_ascii_lowercase().replace(['_', '-'], " ");
        match lower.as_str() {
            "ssb" | "solar system barycenter" => return Ok(Body::SolarSystemBarycenter),
            "sun" => return Ok(Body::Sun),
            "emb" | "earth moon barycenter" => return Ok(Body::EARTH_MOON_BARYCENTER),
            _ => {}
        }

        if let Some(system) = lower.strip_suffix(" barycenter") {
            if let Some(planet) = Planet::ALL
                .into_iter()
                .find(|p| p.name().eq_ignore_ascii_case(system))
            {
                return Ok(Body::Barycenter(planet));
            }
        }
        if let Some(planet) = Planet::ALL
            .into_iter()
            .find(|p| p.name().eq_ignore_ascii_case(&lower))
        {
            return Ok(Body::Planet(planet));
        }
        Satellite::from_name(&lower)
            .map(Body::Satellite)
            .ok_or_else(|| OrreryError::UnknownBody(name.to_string()))
    }
}
