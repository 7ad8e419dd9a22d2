//! Skill names and categories as the game shows them.
//!
//! Stats report skills by their internal perk names (`Doctor`,
//! `PlantScavenging`, ...).  The player detail panel shows them under the
//! in-game display names, grouped in the in-game category order.

use std::collections::BTreeMap;

/// Internal name → display name.
const DISPLAY_NAMES: &[(&str, &str)] = &[
    ("Doctor", "First Aid"),
    ("Fishing", "Fishing"),
    ("PlantScavenging", "Foraging"),
    ("Trapping", "Trapping"),
    ("Tracking", "Tracking"),
    ("Axe", "Axe"),
    ("Blunt", "Long Blunt"),
    ("SmallBlunt", "Short Blunt"),
    ("LongBlade", "Long Blade"),
    ("SmallBlade", "Short Blade"),
    ("Spear", "Spear"),
    ("Maintenance", "Maintenance"),
    ("Aiming", "Aiming"),
    ("Reloading", "Reloading"),
    ("Fitness", "Fitness"),
    ("Strength", "Strength"),
    ("Sprinting", "Running"),
    ("Lightfoot", "Lightfooted"),
    ("Nimble", "Nimble"),
    ("Sneak", "Sneaking"),
    ("Woodwork", "Carpentry"),
    ("Cooking", "Cooking"),
    ("Farming", "Agriculture"),
    ("Electricity", "Electrical"),
    ("MetalWelding", "Welding"),
    ("Mechanics", "Mechanics"),
    ("Tailoring", "Tailoring"),
    ("Blacksmith", "Blacksmithing"),
    ("Pottery", "Pottery"),
    ("Glassmaking", "Glassmaking"),
    ("Masonry", "Masonry"),
    ("Carving", "Carving"),
    ("FlintKnapping", "Knapping"),
    ("Butchering", "Butchering"),
    ("Husbandry", "Animal Care"),
];

/// Categories in game order, each listing display names in game order.
const CATEGORIES: &[(&str, &[&str])] = &[
    ("Combat - Firearms", &["Aiming", "Reloading"]),
    (
        "Combat - Melee",
        &[
            "Axe",
            "Long Blade",
            "Long Blunt",
            "Maintenance",
            "Short Blade",
            "Short Blunt",
            "Spear",
        ],
    ),
    (
        "Crafting",
        &[
            "Blacksmithing",
            "Carpentry",
            "Carving",
            "Cooking",
            "Electrical",
            "Glassmaking",
            "Knapping",
            "Masonry",
            "Mechanics",
            "Pottery",
            "Tailoring",
            "Welding",
        ],
    ),
    ("Farming", &["Agriculture", "Animal Care", "Butchering"]),
    (
        "Physical",
        &["Fitness", "Lightfooted", "Nimble", "Running", "Sneaking", "Strength"],
    ),
    (
        "Survival",
        &["First Aid", "Fishing", "Foraging", "Tracking", "Trapping"],
    ),
];

pub const OTHER_CATEGORY: &str = "Other";

/// Highest level a skill bar shows.
pub const MAX_LEVEL: u32 = 10;

pub fn display_name(internal: &str) -> &str {
    DISPLAY_NAMES
        .iter()
        .find(|(name, _)| *name == internal)
        .map(|(_, display)| *display)
        .unwrap_or(internal)
}

fn internal_name(display: &str) -> Option<&'static str> {
    DISPLAY_NAMES
        .iter()
        .find(|(_, name)| *name == display)
        .map(|(internal, _)| *internal)
}

fn is_categorized(display: &str) -> bool {
    CATEGORIES.iter().any(|(_, skills)| skills.contains(&display))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkillGroup {
    pub category: &'static str,
    pub skills: Vec<(String, u32)>,
}

/// Every known skill grouped by category (levels default to 0), followed by
/// an "Other" group for anything the tables do not know.
pub fn group_skills(levels: &BTreeMap<String, u32>) -> Vec<SkillGroup> {
    let mut groups: Vec<SkillGroup> = CATEGORIES
        .iter()
        .map(|&(category, skills)| SkillGroup {
            category,
            skills: skills
                .iter()
                .map(|display| {
                    let level = internal_name(display)
                        .and_then(|internal| levels.get(internal).copied().filter(|l| *l > 0))
                        .or_else(|| levels.get(*display).copied())
                        .unwrap_or(0);
                    (display.to_string(), level)
                })
                .collect(),
        })
        .collect();

    let mut other: Vec<(String, u32)> = Vec::new();
    for (internal, level) in levels {
        let display = display_name(internal);
        if !is_categorized(display) && !other.iter().any(|(name, _)| name == display) {
            other.push((display.to_string(), *level));
        }
    }
    if !other.is_empty() {
        groups.push(SkillGroup {
            category: OTHER_CATEGORY,
            skills: other,
        });
    }

    groups
}

/// `■■■□□□□□□□` for level 3.
pub fn level_bar(level: u32) -> String {
    let filled = level.min(MAX_LEVEL) as usize;
    let mut bar = "■".repeat(filled);
    bar.push_str(&"□".repeat(MAX_LEVEL as usize - filled));
    bar
}
