/// Spacecraft component catalog.
/// Components are grouped into families (one screen tab each) and each family
/// offers nine options across three subcategories. Cost is in USD, weight is
/// the score multiplier, si_impact shifts the Sustainability Index.

use std::collections::{BTreeMap, HashSet};
use std::sync::LazyLock;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::payload::PayloadKind;

/// A selectable component. Owned so it can live in saved sessions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Component {
    pub id: String,
    pub name: String,
    pub family: String,
    pub subcategory: String,
    pub category: PayloadKind,
    pub cost: i64,
    pub weight: f64,
    pub si_impact: i32,
}

impl Component {
    /// Build an ad-hoc component outside the catalog (scenario tools, tests)
    pub fn new(id: &str, category: PayloadKind, cost: i64, weight: f64, si_impact: i32) -> Self {
        Self {
            id: id.to_string(),
            name: id.to_string(),
            family: String::new(),
            subcategory: String::new(),
            category,
            cost,
            weight,
            si_impact,
        }
    }

    /// Score contribution of this component: cost × weight
    pub fn weighted_cost(&self) -> f64 {
        self.cost as f64 * self.weight
    }
}

/// One option row inside a family table
#[derive(Debug, Clone)]
pub struct ComponentOption {
    pub id: &'static str,
    pub name: &'static str,
    pub subcategory: &'static str,
    pub cost: i64,
    pub weight: f64,
    pub si_impact: i32,
}

/// A component family (e.g. "Refueling Depot") for one payload kind
#[derive(Debug, Clone)]
pub struct ComponentFamily {
    pub name: &'static str,
    pub icon: &'static str,
    pub description: &'static str,
    pub payload: PayloadKind,
    pub options: &'static [ComponentOption],
}

impl ComponentFamily {
    fn component(&self, option: &ComponentOption) -> Component {
        Component {
            id: option.id.to_string(),
            name: option.name.to_string(),
            family: self.name.to_string(),
            subcategory: option.subcategory.to_string(),
            category: self.payload,
            cost: option.cost,
            weight: option.weight,
            si_impact: option.si_impact,
        }
    }

    /// Options grouped by subcategory, keeping table order inside each group
    pub fn options_by_subcategory(&self) -> BTreeMap<&'static str, Vec<&'static ComponentOption>> {
        let mut groups: BTreeMap<&'static str, Vec<&'static ComponentOption>> = BTreeMap::new();
        for option in self.options {
            groups.entry(option.subcategory).or_default().push(option);
        }
        groups
    }
}

pub const COMPONENT_FAMILIES: &[ComponentFamily] = &[
    ComponentFamily {
        name: "Telecom Constellation",
        icon: "📡",
        description: "Satellite clusters powering global internet. Profitable but adds to orbital crowding.",
        payload: PayloadKind::Commercial,
        options: &[
            ComponentOption { id: "telecom_broadband_highspeed", name: "High-Speed Priority", subcategory: "Broadband Network", cost: 200, weight: 1.4, si_impact: -5 },
            ComponentOption { id: "telecom_broadband_balanced", name: "Balanced Services", subcategory: "Broadband Network", cost: 150, weight: 1.2, si_impact: 0 },
            ComponentOption { id: "telecom_broadband_community", name: "Community Discount Model", subcategory: "Broadband Network", cost: 100, weight: 1.1, si_impact: 5 },
            ComponentOption { id: "telecom_military_encrypted", name: "Encrypted Comms", subcategory: "Secure Military Net", cost: 250, weight: 1.3, si_impact: 0 },
            ComponentOption { id: "telecom_military_surveillance", name: "Surveillance Package", subcategory: "Secure Military Net", cost: 300, weight: 1.5, si_impact: -2 },
            ComponentOption { id: "telecom_military_allied", name: "Allied Sharing Model", subcategory: "Secure Military Net", cost: 200, weight: 1.2, si_impact: 2 },
            ComponentOption { id: "telecom_rural_lowcost", name: "Low-Cost Terminals", subcategory: "Rural Connectivity Net", cost: 150, weight: 1.2, si_impact: 2 },
            ComponentOption { id: "telecom_rural_subsidy", name: "Government Subsidy Plan", subcategory: "Rural Connectivity Net", cost: 200, weight: 1.3, si_impact: 5 },
            ComponentOption { id: "telecom_rural_nonprofit", name: "Non-Profit Mission", subcategory: "Rural Connectivity Net", cost: 100, weight: 1.0, si_impact: 10 },
        ],
    },
    ComponentFamily {
        name: "Tourism Capsule",
        icon: "🚀",
        description: "Luxury orbital capsule. Popular but safety concerns lurk.",
        payload: PayloadKind::Commercial,
        options: &[
            ComponentOption { id: "tourism_luxury_vip", name: "VIP Orbital Suites", subcategory: "Luxury Package", cost: 300, weight: 1.5, si_impact: -15 },
            ComponentOption { id: "tourism_luxury_celebrity", name: "Celebrity Flights", subcategory: "Luxury Package", cost: 250, weight: 1.3, si_impact: -10 },
            ComponentOption { id: "tourism_luxury_elite", name: "Elite Experience Package", subcategory: "Luxury Package", cost: 200, weight: 1.2, si_impact: -5 },
            ComponentOption { id: "tourism_midtier_weekend", name: "Weekend in Orbit", subcategory: "Mid-Tier Capsule", cost: 200, weight: 1.1, si_impact: -5 },
            ComponentOption { id: "tourism_midtier_moongazer", name: "Moon-Gazer Package", subcategory: "Mid-Tier Capsule", cost: 250, weight: 1.3, si_impact: -2 },
            ComponentOption { id: "tourism_midtier_corporate", name: "Corporate Retreats", subcategory: "Mid-Tier Capsule", cost: 300, weight: 1.4, si_impact: -5 },
            ComponentOption { id: "tourism_educational_student", name: "Student Programs", subcategory: "Educational Capsule", cost: 150, weight: 1.0, si_impact: 5 },
            ComponentOption { id: "tourism_educational_stem", name: "STEM Partnerships", subcategory: "Educational Capsule", cost: 200, weight: 1.2, si_impact: 10 },
            ComponentOption { id: "tourism_educational_research", name: "Research Missions", subcategory: "Educational Capsule", cost: 250, weight: 1.3, si_impact: 10 },
        ],
    },
    ComponentFamily {
        name: "Broadcast Satellite",
        icon: "📺",
        description: "Event & entertainment beamed worldwide. Prestige but limited lifespan.",
        payload: PayloadKind::Commercial,
        options: &[
            ComponentOption { id: "broadcast_sports_worldcup", name: "World Cup Broadcast", subcategory: "Live Sports Broadcasting", cost: 300, weight: 1.5, si_impact: 0 },
            ComponentOption { id: "broadcast_sports_olympics", name: "Space Olympics", subcategory: "Live Sports Broadcasting", cost: 250, weight: 1.3, si_impact: -2 },
            ComponentOption { id: "broadcast_sports_regional", name: "Regional Leagues", subcategory: "Live Sports Broadcasting", cost: 200, weight: 1.1, si_impact: 0 },
            ComponentOption { id: "broadcast_media_news", name: "News Focus", subcategory: "24/7 Media Satellite", cost: 200, weight: 1.1, si_impact: 0 },
            ComponentOption { id: "broadcast_media_entertainment", name: "Entertainment Package", subcategory: "24/7 Media Satellite", cost: 250, weight: 1.3, si_impact: -2 },
            ComponentOption { id: "broadcast_media_hybrid", name: "Hybrid Channel", subcategory: "24/7 Media Satellite", cost: 150, weight: 1.0, si_impact: 2 },
            ComponentOption { id: "broadcast_cultural_science", name: "Science Outreach", subcategory: "Cultural Broadcast", cost: 200, weight: 1.2, si_impact: 10 },
            ComponentOption { id: "broadcast_cultural_heritage", name: "Heritage Channels", subcategory: "Cultural Broadcast", cost: 150, weight: 1.0, si_impact: 5 },
            ComponentOption { id: "broadcast_cultural_festivals", name: "Global Festivals", subcategory: "Cultural Broadcast", cost: 250, weight: 1.3, si_impact: 0 },
        ],
    },
    ComponentFamily {
        name: "Orbital Factory",
        icon: "🏭",
        description: "Zero-g industry hub. Huge upfront costs, but future industrial payoff.",
        payload: PayloadKind::Infrastructure,
        options: &[
            ComponentOption { id: "factory_pharma_cancer", name: "Cancer Research Drugs", subcategory: "Pharma Research Hub", cost: 350, weight: 1.6, si_impact: 10 },
            ComponentOption { id: "factory_pharma_rare", name: "Rare Disease Therapies", subcategory: "Pharma Research Hub", cost: 300, weight: 1.5, si_impact: 10 },
            ComponentOption { id: "factory_pharma_biotech", name: "General Biotech", subcategory: "Pharma Research Hub", cost: 250, weight: 1.3, si_impact: 5 },
            ComponentOption { id: "factory_material_fiber", name: "Fiber Optics Plant", subcategory: "Material Science Lab", cost: 250, weight: 1.3, si_impact: 2 },
            ComponentOption { id: "factory_material_alloy", name: "Alloy Development", subcategory: "Material Science Lab", cost: 300, weight: 1.4, si_impact: 0 },
            ComponentOption { id: "factory_material_crystal", name: "Crystal Manufacturing", subcategory: "Material Science Lab", cost: 200, weight: 1.1, si_impact: 2 },
            ComponentOption { id: "factory_assembly_drone", name: "Drone Assembly", subcategory: "Industrial Assembly Line", cost: 300, weight: 1.4, si_impact: -5 },
            ComponentOption { id: "factory_assembly_satellite", name: "Satellite Parts", subcategory: "Industrial Assembly Line", cost: 250, weight: 1.2, si_impact: -5 },
            ComponentOption { id: "factory_assembly_habitat", name: "Space Habitat Units", subcategory: "Industrial Assembly Line", cost: 350, weight: 1.6, si_impact: 5 },
        ],
    },
    ComponentFamily {
        name: "Debris Tracker Network",
        icon: "🛡️",
        description: "Track orbital junk. Modest revenue, but boosts sustainability score.",
        payload: PayloadKind::Infrastructure,
        options: &[
            ComponentOption { id: "debris_defense_surveillance", name: "Military Surveillance", subcategory: "National Defense Contract", cost: 250, weight: 1.3, si_impact: 2 },
            ComponentOption { id: "debris_defense_border", name: "Space Border Patrol", subcategory: "National Defense Contract", cost: 300, weight: 1.5, si_impact: 0 },
            ComponentOption { id: "debris_defense_alerts", name: "Quick-Response Alerts", subcategory: "National Defense Contract", cost: 200, weight: 1.1, si_impact: 5 },
            ComponentOption { id: "debris_opendata_citizen", name: "Citizen Science Project", subcategory: "Open Data System", cost: 150, weight: 1.0, si_impact: 10 },
            ComponentOption { id: "debris_opendata_university", name: "University Access", subcategory: "Open Data System", cost: 200, weight: 1.2, si_impact: 5 },
            ComponentOption { id: "debris_opendata_monitoring", name: "Public Monitoring Platform", subcategory: "Open Data System", cost: 250, weight: 1.3, si_impact: 5 },
            ComponentOption { id: "debris_commercial_insurance", name: "Private Insurance Deals", subcategory: "Commercial Subscription Service", cost: 300, weight: 1.4, si_impact: 2 },
            ComponentOption { id: "debris_commercial_safety", name: "Corporate Safety Contracts", subcategory: "Commercial Subscription Service", cost: 250, weight: 1.3, si_impact: 5 },
            ComponentOption { id: "debris_commercial_apps", name: "Subscription Apps", subcategory: "Commercial Subscription Service", cost: 200, weight: 1.1, si_impact: 2 },
        ],
    },
    ComponentFamily {
        name: "Refueling Depot",
        icon: "⛽",
        description: "Gas station in orbit. Costly, but extends satellite lifespans.",
        payload: PayloadKind::Infrastructure,
        options: &[
            ComponentOption { id: "refuel_basic_single", name: "Single-Pod System", subcategory: "Fuel Pods (Basic)", cost: 150, weight: 1.0, si_impact: 2 },
            ComponentOption { id: "refuel_basic_cluster", name: "Cluster Pods", subcategory: "Fuel Pods (Basic)", cost: 200, weight: 1.2, si_impact: 5 },
            ComponentOption { id: "refuel_basic_fleet", name: "Fleet Support", subcategory: "Fuel Pods (Basic)", cost: 250, weight: 1.3, si_impact: 5 },
            ComponentOption { id: "refuel_standard_corporate", name: "Corporate Hub", subcategory: "Standard Station", cost: 250, weight: 1.3, si_impact: 5 },
            ComponentOption { id: "refuel_standard_national", name: "National Fleet Station", subcategory: "Standard Station", cost: 300, weight: 1.4, si_impact: 5 },
            ComponentOption { id: "refuel_standard_tourism", name: "Tourism Support Depot", subcategory: "Standard Station", cost: 200, weight: 1.2, si_impact: 0 },
            ComponentOption { id: "refuel_mega_multiorbit", name: "Multi-Orbit Supply", subcategory: "Mega Depot", cost: 350, weight: 1.5, si_impact: 10 },
            ComponentOption { id: "refuel_mega_coalition", name: "Coalition Investment", subcategory: "Mega Depot", cost: 300, weight: 1.4, si_impact: 15 },
            ComponentOption { id: "refuel_mega_autonomous", name: "Autonomous Refueling Bots", subcategory: "Mega Depot", cost: 250, weight: 1.3, si_impact: 10 },
        ],
    },
];

/// Flattened, id-indexed view over every family
pub struct ComponentCatalog {
    components: Vec<Component>,
}

impl ComponentCatalog {
    fn build() -> Self {
        let components: Vec<Component> = COMPONENT_FAMILIES
            .iter()
            .flat_map(|family| family.options.iter().map(move |o| family.component(o)))
            .collect();

        let mut seen = HashSet::new();
        for component in &components {
            assert!(
                seen.insert(component.id.as_str()),
                "duplicate component id {}",
                component.id
            );
        }

        Self { components }
    }

    /// Look up a component by catalog id
    pub fn component(&self, id: &str) -> Result<&Component, ValidationError> {
        self.components
            .iter()
            .find(|c| c.id == id)
            .ok_or_else(|| ValidationError::UnknownKey {
                kind: "component",
                key: id.to_string(),
            })
    }

    /// Components visible for a payload kind, in table order
    pub fn for_payload(&self, kind: PayloadKind) -> impl Iterator<Item = &Component> {
        self.components.iter().filter(move |c| c.category == kind)
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }
}

/// Families offered for a payload kind
pub fn families_for(kind: PayloadKind) -> impl Iterator<Item = &'static ComponentFamily> {
    COMPONENT_FAMILIES.iter().filter(move |f| f.payload == kind)
}

/// Global catalog instance
pub static CATALOG: LazyLock<ComponentCatalog> = LazyLock::new(ComponentCatalog::build);
