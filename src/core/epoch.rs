//! # Protocol Epochs
//!
//! An [`Epoch`] is the product version a client speaks, packed as
//! `0xMMmmpp` (major, minor, patch). It is the only input the schema codec
//! uses to choose between historical layouts of the same field.
//!
//! A [`VersionWindow`] is an inclusive range of epochs. Field descriptors
//! use windows for presence, representation overrides and length variants.

use std::fmt;

/// Packed product version selecting a wire layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Epoch(pub u32);

impl Epoch {
    /// Nothing has been inferred yet; also the epoch game servers speak.
    pub const UNVERSIONED: Epoch = Epoch(0);
    pub const V2_0: Epoch = Epoch(0x02_00_00);
    pub const V4_1: Epoch = Epoch(0x04_01_00);
    pub const V5_2: Epoch = Epoch(0x05_02_00);
    pub const V7_4: Epoch = Epoch(0x07_04_00);
    pub const V8_1_1: Epoch = Epoch(0x08_01_01);
    pub const V9_2: Epoch = Epoch(0x09_02_00);
    pub const V9_6_3: Epoch = Epoch(0x09_06_03);
    pub const V9_6_7: Epoch = Epoch(0x09_06_07);

    pub const fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for Epoch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#08x}", self.0)
    }
}

impl From<u32> for Epoch {
    fn from(value: u32) -> Self {
        Epoch(value)
    }
}

/// Inclusive range of epochs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VersionWindow {
    pub min: u32,
    pub max: u32,
}

impl VersionWindow {
    pub const ALL: VersionWindow = VersionWindow::between(0, u32::MAX);

    pub const fn between(min: u32, max: u32) -> Self {
        Self { min, max }
    }

    /// Every epoch up to and including `max`.
    pub const fn until(max: u32) -> Self {
        Self::between(0, max)
    }

    /// Every epoch from `min` on.
    pub const fn since(min: u32) -> Self {
        Self::between(min, u32::MAX)
    }

    pub const fn exactly(epoch: u32) -> Self {
        Self::between(epoch, epoch)
    }

    pub const fn contains(&self, epoch: Epoch) -> bool {
        self.min <= epoch.0 && epoch.0 <= self.max
    }
}
