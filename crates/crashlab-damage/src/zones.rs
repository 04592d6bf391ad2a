//! Anatomical vehicle zones, their weights and the parts they contain.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// One of the six fixed vehicle zones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZoneId {
    /// Bumper, hood, fenders, lights and grille
    FrontEnd,
    /// Doors, roof, pillars and glass
    PassengerCompartment,
    /// Rear bumper, trunk, tail lights and quarter panels
    RearEnd,
    /// Engine, radiator and cooling
    EngineBay,
    /// The four corners
    Suspension,
    /// Exhaust, fuel tank and transmission
    Undercarriage,
}

impl ZoneId {
    /// All zones in catalog order.
    pub const ALL: [ZoneId; 6] = [
        ZoneId::FrontEnd,
        ZoneId::PassengerCompartment,
        ZoneId::RearEnd,
        ZoneId::EngineBay,
        ZoneId::Suspension,
        ZoneId::Undercarriage,
    ];

    /// Snake-case identifier.
    pub fn as_str(&self) -> &'static str {
        match self {
            ZoneId::FrontEnd => "front_end",
            ZoneId::PassengerCompartment => "passenger_compartment",
            ZoneId::RearEnd => "rear_end",
            ZoneId::EngineBay => "engine_bay",
            ZoneId::Suspension => "suspension",
            ZoneId::Undercarriage => "undercarriage",
        }
    }

    /// Human-readable zone name.
    pub fn display_name(&self) -> &'static str {
        match self {
            ZoneId::FrontEnd => "Front End",
            ZoneId::PassengerCompartment => "Passenger Compartment",
            ZoneId::RearEnd => "Rear End",
            ZoneId::EngineBay => "Engine Bay",
            ZoneId::Suspension => "Suspension System",
            ZoneId::Undercarriage => "Undercarriage",
        }
    }

    /// Static description of this zone.
    pub fn spec(&self) -> &'static ZoneSpec {
        match self {
            ZoneId::FrontEnd => &FRONT_END,
            ZoneId::PassengerCompartment => &PASSENGER_COMPARTMENT,
            ZoneId::RearEnd => &REAR_END,
            ZoneId::EngineBay => &ENGINE_BAY,
            ZoneId::Suspension => &SUSPENSION,
            ZoneId::Undercarriage => &UNDERCARRIAGE,
        }
    }

    /// The zone a canonical component belongs to.
    pub fn for_component(component: &str) -> Option<ZoneId> {
        ZoneId::ALL
            .into_iter()
            .find(|zone| zone.spec().members.contains(&component))
    }
}

impl fmt::Display for ZoneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ZoneId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ZoneId::ALL
            .into_iter()
            .find(|zone| zone.as_str() == s)
            .ok_or_else(|| format!("unknown zone '{s}'"))
    }
}

/// Repair priority tier of a zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriorityTier {
    /// Cosmetic or low-impact zones
    Medium,
    /// Zones that affect drivability
    High,
    /// Safety-critical zones
    Critical,
}

impl PriorityTier {
    /// Snake-case identifier.
    pub fn as_str(&self) -> &'static str {
        match self {
            PriorityTier::Medium => "medium",
            PriorityTier::High => "high",
            PriorityTier::Critical => "critical",
        }
    }
}

impl fmt::Display for PriorityTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A replaceable part and the zone damage at which it is affected.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PartSpec {
    /// Manufacturer part number
    pub part_number: &'static str,
    /// Part name
    pub name: &'static str,
    /// Zone damage level (0-100) at which the part needs work
    pub threshold: f64,
}

/// Static description of a zone.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZoneSpec {
    /// Zone identifier
    pub id: ZoneId,
    /// Repair priority tier
    pub tier: PriorityTier,
    /// Weight in the overall damage score
    pub weight: f64,
    /// Labour hours for a moderate repair
    pub base_hours: f64,
    /// Canonical component ids in this zone
    pub members: &'static [&'static str],
    /// Parts checked against the zone damage level
    pub parts: &'static [PartSpec],
}

const fn part(part_number: &'static str, name: &'static str, threshold: f64) -> PartSpec {
    PartSpec {
        part_number,
        name,
        threshold,
    }
}

static FRONT_END: ZoneSpec = ZoneSpec {
    id: ZoneId::FrontEnd,
    tier: PriorityTier::High,
    weight: 1.5,
    base_hours: 8.0,
    members: &[
        "front_bumper",
        "hood",
        "left_front_fender",
        "right_front_fender",
        "left_headlight",
        "right_headlight",
        "front_grille",
    ],
    parts: &[
        part("1J0807221", "Front Bumper Cover", 15.0),
        part("5G0823300", "Hood", 30.0),
        part("5G0809857", "Front Fender", 25.0),
        part("5G0941006", "Headlight Assembly", 35.0),
    ],
};

static PASSENGER_COMPARTMENT: ZoneSpec = ZoneSpec {
    id: ZoneId::PassengerCompartment,
    tier: PriorityTier::Critical,
    weight: 2.0,
    base_hours: 12.0,
    members: &[
        "left_front_door",
        "right_front_door",
        "left_rear_door",
        "right_rear_door",
        "roof",
        "left_a_pillar",
        "right_a_pillar",
        "windshield",
        "left_front_window",
        "right_front_window",
        "left_rear_window",
        "right_rear_window",
    ],
    parts: &[
        part("5G0831055", "Door Shell", 40.0),
        part("5G0845011", "Windshield", 20.0),
        part("5G0867011", "Door Trim Panel", 30.0),
    ],
};

static REAR_END: ZoneSpec = ZoneSpec {
    id: ZoneId::RearEnd,
    tier: PriorityTier::Medium,
    weight: 1.2,
    base_hours: 6.0,
    members: &[
        "rear_bumper",
        "trunk_lid",
        "left_taillight",
        "right_taillight",
        "left_quarter_panel",
        "right_quarter_panel",
    ],
    parts: &[
        part("5G0807421", "Rear Bumper Cover", 15.0),
        part("5G0827025", "Tailgate", 30.0),
        part("5G0945095", "Tail Light Assembly", 25.0),
    ],
};

static ENGINE_BAY: ZoneSpec = ZoneSpec {
    id: ZoneId::EngineBay,
    tier: PriorityTier::Critical,
    weight: 1.8,
    base_hours: 16.0,
    members: &["engine", "radiator", "battery", "cooling_system"],
    parts: &[
        part("1K0199262", "Engine Mount", 50.0),
        part("5G0121251", "Radiator", 35.0),
        part("1J0201801", "Fuel Tank", 60.0),
    ],
};

static SUSPENSION: ZoneSpec = ZoneSpec {
    id: ZoneId::Suspension,
    tier: PriorityTier::High,
    weight: 1.4,
    base_hours: 10.0,
    members: &[
        "left_front_suspension",
        "right_front_suspension",
        "left_rear_suspension",
        "right_rear_suspension",
    ],
    parts: &[
        part("5G0413031", "Shock Strut", 40.0),
        part("5G0601025", "Alloy Wheel", 25.0),
        part("5G0407151", "Control Arm", 45.0),
    ],
};

static UNDERCARRIAGE: ZoneSpec = ZoneSpec {
    id: ZoneId::Undercarriage,
    tier: PriorityTier::Medium,
    weight: 1.0,
    base_hours: 8.0,
    members: &["exhaust", "fuel_tank", "transmission"],
    parts: &[
        part("5G0825236", "Underbody Shield", 20.0),
        part("5G0253059", "Exhaust Silencer", 35.0),
    ],
};

/// Mean of all zone weights.
pub fn average_weight() -> f64 {
    let total: f64 = ZoneId::ALL.iter().map(|zone| zone.spec().weight).sum();
    total / ZoneId::ALL.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cabin_and_engine_weigh_highest() {
        let mut by_weight = ZoneId::ALL;
        by_weight.sort_by(|a, b| b.spec().weight.total_cmp(&a.spec().weight));
        assert_eq!(by_weight.first(), Some(&ZoneId::PassengerCompartment));
        assert_eq!(by_weight.get(1), Some(&ZoneId::EngineBay));
    }

    #[test]
    fn test_members_are_disjoint() {
        for zone in ZoneId::ALL {
            for member in zone.spec().members {
                assert_eq!(ZoneId::for_component(member), Some(zone), "{member}");
            }
        }
    }

    #[test]
    fn test_parse_roundtrip_names() {
        for zone in ZoneId::ALL {
            assert_eq!(zone.as_str().parse::<ZoneId>(), Ok(zone));
            assert_eq!(zone.spec().id, zone);
        }
        assert!("trunk".parse::<ZoneId>().is_err());
    }

    #[test]
    fn test_average_weight() {
        assert!((average_weight() - 8.9 / 6.0).abs() < 1e-12);
    }
}
