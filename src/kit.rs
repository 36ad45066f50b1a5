use serde::Serialize;
use std::fmt;

/// Cube types handed out by the starter kit. The host maps them to its own ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CubeType {
    /// Cube type addressed by its raw numeric id
    Raw(u16),
    Torch,
    OreSmelter,
    Conveyor,
    OreExtractor,
    StorageHopper,
    PowerStorageBlock,
}

impl fmt::Display for CubeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CubeType::Raw(id) => write!(f, "cube#{}", id),
            other => write!(f, "{:?}", other),
        }
    }
}

/// One inventory grant: cube type, variant value, and how many
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ItemGrant {
    pub cube: CubeType,
    pub value: u16,
    pub quantity: u32,
}

impl ItemGrant {
    pub const fn new(cube: CubeType, value: u16, quantity: u32) -> Self {
        Self {
            cube,
            value,
            quantity,
        }
    }
}

impl fmt::Display for ItemGrant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x {}:{}", self.quantity, self.cube, self.value)
    }
}

pub const STARTER_KIT: &[ItemGrant] = &[
    ItemGrant::new(CubeType::Raw(507), 99, 7),
    ItemGrant::new(CubeType::Torch, 0, 5),
    ItemGrant::new(CubeType::OreSmelter, 1, 4),
    ItemGrant::new(CubeType::Conveyor, 11, 160),
    ItemGrant::new(CubeType::Conveyor, 13, 16),
    ItemGrant::new(CubeType::Conveyor, 14, 16),
    ItemGrant::new(CubeType::OreExtractor, 0, 3),
    ItemGrant::new(CubeType::StorageHopper, 0, 5),
    ItemGrant::new(CubeType::StorageHopper, 2, 5),
    ItemGrant::new(CubeType::PowerStorageBlock, 0, 6),
];
