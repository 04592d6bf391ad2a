//! Vendor component keys and their canonical names.

use std::collections::HashMap;
use std::sync::OnceLock;

/// Vendor key to canonical component id.
pub const VENDOR_COMPONENTS: &[(&str, &str)] = &[
    // Front
    ("bumper_F", "front_bumper"),
    ("hood", "hood"),
    ("fender_FL", "left_front_fender"),
    ("fender_FR", "right_front_fender"),
    ("headlight_L", "left_headlight"),
    ("headlight_R", "right_headlight"),
    ("grille", "front_grille"),
    // Sides
    ("door_FL", "left_front_door"),
    ("door_FR", "right_front_door"),
    ("door_RL", "left_rear_door"),
    ("door_RR", "right_rear_door"),
    ("quarter_L", "left_quarter_panel"),
    ("quarter_R", "right_quarter_panel"),
    ("pillar_A_L", "left_a_pillar"),
    ("pillar_A_R", "right_a_pillar"),
    // Rear
    ("bumper_R", "rear_bumper"),
    ("trunk", "trunk_lid"),
    ("taillight_L", "left_taillight"),
    ("taillight_R", "right_taillight"),
    // Glass and roof
    ("roof", "roof"),
    ("windshield", "windshield"),
    ("window_FL", "left_front_window"),
    ("window_FR", "right_front_window"),
    ("window_RL", "left_rear_window"),
    ("window_RR", "right_rear_window"),
    // Mechanical
    ("engine", "engine"),
    ("radiator", "radiator"),
    ("transmission", "transmission"),
    ("suspension_FL", "left_front_suspension"),
    ("suspension_FR", "right_front_suspension"),
    ("suspension_RL", "left_rear_suspension"),
    ("suspension_RR", "right_rear_suspension"),
];

fn table() -> &'static HashMap<&'static str, &'static str> {
    static TABLE: OnceLock<HashMap<&'static str, &'static str>> = OnceLock::new();
    TABLE.get_or_init(|| VENDOR_COMPONENTS.iter().copied().collect())
}

/// Canonical id for a vendor key. Unmapped keys pass through unchanged.
pub fn canonical_component(vendor_key: &str) -> &str {
    table().get(vendor_key).copied().unwrap_or(vendor_key)
}

/// Whether the key has an explicit mapping.
pub fn is_known_vendor_key(vendor_key: &str) -> bool {
    table().contains_key(vendor_key)
}
