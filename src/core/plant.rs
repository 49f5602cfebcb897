// Plant records: a leaf table that always carries the reserved "type" leaf.
use crate::core::alloc::PLANT_OVERHEAD;
use crate::core::leaf::{Leaf, LeafTable, leaf_footprint};
use crate::core::value::Values;

/// Reserved key created with every plant.
pub const TYPE_KEY: &str = "type";

/// Well-known plant type codes used by effect hosts and plugins.
pub mod types {
    pub const PLUGIN_INFO: i32 = 1;
    pub const FILTER_CLASS: i32 = 2;
    pub const FILTER_INSTANCE: i32 = 3;
    pub const CHANNEL_TEMPLATE: i32 = 4;
    pub const PARAMETER_TEMPLATE: i32 = 5;
    pub const CHANNEL: i32 = 6;
    pub const PARAMETER: i32 = 7;
    pub const GUI: i32 = 8;
    pub const HOST_INFO: i32 = 255;

    pub const ALL: [(i32, &str); 9] = [
        (PLUGIN_INFO, "PLUGIN_INFO"),
        (FILTER_CLASS, "FILTER_CLASS"),
        (FILTER_INSTANCE, "FILTER_INSTANCE"),
        (CHANNEL_TEMPLATE, "CHANNEL_TEMPLATE"),
        (PARAMETER_TEMPLATE, "PARAMETER_TEMPLATE"),
        (CHANNEL, "CHANNEL"),
        (PARAMETER, "PARAMETER"),
        (GUI, "GUI"),
        (HOST_INFO, "HOST_INFO"),
    ];

    pub fn name(code: i32) -> Option<&'static str> {
        ALL.iter()
            .find(|(known, _)| *known == code)
            .map(|(_, name)| *name)
    }
}

#[derive(Clone, Debug)]
pub struct Plant {
    leaves: LeafTable,
}

impl Plant {
    pub(crate) fn new(plant_type: i32) -> Self {
        let mut leaves = LeafTable::new();
        leaves.insert(TYPE_KEY.as_bytes(), Leaf::new(Values::Int(vec![plant_type])));
        Self { leaves }
    }

    /// Footprint of a freshly created plant, charged before construction.
    pub(crate) fn initial_footprint() -> usize {
        PLANT_OVERHEAD + leaf_footprint(TYPE_KEY.as_bytes(), &Values::Int(vec![0]))
    }

    pub fn leaves(&self) -> &LeafTable {
        &self.leaves
    }

    pub(crate) fn leaves_mut(&mut self) -> &mut LeafTable {
        &mut self.leaves
    }

    /// Current value of the "type" leaf, if it still holds an integer.
    pub fn plant_type(&self) -> Option<i32> {
        match self.leaves.get(TYPE_KEY.as_bytes()).map(Leaf::values) {
            Some(Values::Int(items)) => items.first().copied(),
            _ => None,
        }
    }

    pub fn footprint(&self) -> usize {
        PLANT_OVERHEAD + self.leaves.footprint()
    }
}
