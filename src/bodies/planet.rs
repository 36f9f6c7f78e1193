use std::fmt;

/// The nine planetary systems of the NAIF numbering scheme.
///
/// The system index `n` gives both the barycenter id (`n`) and the id of the
/// planet mass center (`100 n + 99`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Planet {
    Mercury = 1,
    Venus = 2,
    Earth = 3,
    Mars = 4,
    Jupiter = 5,
    Saturn = 6,
    Uranus = 7,
    Neptune = 8,
    Pluto = 9,
}

impl Planet {
    pub const ALL: [Planet; 9] = [
        Planet::Mercury,
        Planet::Venus,
        Planet::Earth,
        Planet::Mars,
        Planet::Jupiter,
        Planet::Saturn,
        Planet::Uranus,
        Planet::Neptune,
        Planet::Pluto,
    ];

    /// Planetary system from its index (1 to 9).
    pub fn from_system(index: i32) -> Option<Self> {
        Planet::ALL.get(usize::try_from(index).ok()?.checked_sub(1)?).copied()
    }

    pub fn system(self) -> i32 {
        self as i32
    }

    pub fn barycenter_id(self) -> i32 {
        self.system()
    }

    pub fn mass_center_id(self) -> i32 {
        self.system() * 100 + 99
    }

    pub fn name(self) -> &'static str {
        match self {
            Planet::Mercury => "Mercury",
            Planet::Venus => "Venus",
            Planet::Earth => "Earth",
            Planet::Mars => "Mars",
            Planet::Jupiter => "Jupiter",
            Planet::Saturn => "Saturn",
            Planet::Uranus => "Uranus",
            Planet::Neptune => "Neptune",
            Planet::Pluto => "Pluto",
        }
    }

    /// Name of the system barycenter as printed in kernel listings.
    pub fn barycenter_name(self) -> String {
        match self {
            Planet::Earth => "Earth-Moon Barycenter".to_string(),
            other => format!("{} Barycenter", other.name()),
        }
    }
}

impl fmt::Display for Planet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[cfg(test)]
mod test_planet {
    use super::*;

    #[test]
    fn test_ids() {
        assert_eq!(Planet::from_system(3), Some(Planet::Earth));
        assert_eq!(Planet::from_system(0), None);
        assert_eq!(Planet::from_system(10), None);
        assert_eq!(Planet::Earth.mass_center_id(), 399);
        assert_eq!(Planet::Pluto.barycenter_id(), 9);
    }

    #[test]
    fn test_names() {
        assert_eq!(Planet::Earth.barycenter_name(), "Earth-Moon Barycenter");
        assert_eq!(Planet::Mars.barycenter_name(), "Mars Barycenter");
        assert_eq!(Planet::Venus.to_string(), "Venus");
    }
}
