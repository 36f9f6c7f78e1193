use super::planet::Planet;

/// Named natural satellites, keyed by NAIF id.
const SATELLITES: &[(i32, &str)] = &[
    (301, "Moon"),
    (401, "Phobos"),
    (402, "Deimos"),
    (501, "Io"),
    (502, "Europa"),
    (503, "Ganymede"),
    (504, "Callisto"),
    (601, "Mimas"),
    (602, "Enceladus"),
    (603, "Tethys"),
    (604, "Dione"),
    (605, "Rhea"),
    (606, "Titan"),
    (607, "Hyperion"),
    (608, "Iapetus"),
    (701, "Ariel"),
    (702, "Umbriel"),
    (703, "Titania"),
    (704, "Oberon"),
    (705, "Miranda"),
    (801, "Triton"),
    (802, "Nereid"),
    (901, "Charon"),
];

/// A natural satellite: `100 n + k` with `n` the planetary system and
/// `k` in `1..=98`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Satellite {
    pub planet: Planet,
    pub index: i32,
}

impl Satellite {
    pub fn from_id(id: i32) -> Option<Self> {
        let planet = Planet::from_system(id / 100)?;
        let index = id % 100;
        (1..=98).contains(&index).then_some(Satellite { planet, index })
    }

    pub fn id(self) -> i32 {
        self.planet.system() * 100 + self.index
    }

    pub fn name(self) -> Option<&'static str> {
        SATELLITES
            .iter()
            .find(|(id, _)| *id == self.id())
            .map(|(_, name)| *name)
    }

    pub fn from_name(name: &str) -> Option<Self> {
        SATELLITES
            .iter()
            .find(|(_, n)| n.eq_ignore_ascii_case(name))
            .and_then(|(id, _)| Satellite::from_id(*id))
    }
}
