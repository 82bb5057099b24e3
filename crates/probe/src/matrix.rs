use serde::{Deserialize, Serialize};

/// How a variant obtains texture storage before the layered clear.
///
/// Each mode exercises a driver code path that has been seen to diverge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AllocationMode {
    /// Six per-face image calls with no initial data.
    MutableUninitialized,
    /// Six per-face image calls uploading the white seed.
    MutableWhiteSeeded,
    /// As `MutableUninitialized`, then a full-texture clear to white.
    MutableUninitializedThenFullClear,
    /// One immutable-storage call covering all faces, one mip level.
    ImmutableStorage,
    /// As `ImmutableStorage`, then a full-texture clear to white.
    ImmutableStorageThenFullClear,
}

/// Storage kind a mode ends up with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StorageKind {
    Mutable,
    Immutable,
}

/// Allocation step of a mode, consumed by the lifecycle manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Allocation {
    PerFace { seeded: bool },
    Immutable { levels: u32 },
}

impl AllocationMode {
    /// Every mode, in matrix order. The order is load-bearing.
    pub const ALL: [AllocationMode; 5] = [
        AllocationMode::MutableUninitialized,
        AllocationMode::MutableWhiteSeeded,
        AllocationMode::MutableUninitializedThenFullClear,
        AllocationMode::ImmutableStorage,
        AllocationMode::ImmutableStorageThenFullClear,
    ];

    pub fn allocation(self) -> Allocation {
        match self {
            AllocationMode::MutableUninitialized
            | AllocationMode::MutableUninitializedThenFullClear => {
                Allocation::PerFace { seeded: false }
            }
            AllocationMode::MutableWhiteSeeded => Allocation::PerFace { seeded: true },
            AllocationMode::ImmutableStorage | AllocationMode::ImmutableStorageThenFullClear => {
                Allocation::Immutable { levels: 1 }
            }
        }
    }

    /// Whether a full-texture clear runs between allocation and attachment.
    pub fn pre_clears(self) -> bool {
        matches!(
            self,
            AllocationMode::MutableUninitializedThenFullClear
                | AllocationMode::ImmutableStorageThenFullClear
        )
    }

    pub fn storage(self) -> StorageKind {
        match self.allocation() {
            Allocation::PerFace { .. } => StorageKind::Mutable,
            Allocation::Immutable { .. } => StorageKind::Immutable,
        }
    }
}

/// One entry of the variant matrix. `id` is the entry's position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Variant {
    pub id: u8,
    pub mode: AllocationMode,
}

/// The variant matrix: every allocation mode, in order, with its id.
///
/// Lazy and restartable; call again for a fresh pass.
pub fn variants() -> impl Iterator<Item = Variant> + Clone {
    AllocationMode::ALL
        .into_iter()
        .enumerate()
        .map(|(id, mode)| Variant {
            id: id as u8,
            mode,
        })
}
