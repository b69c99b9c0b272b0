//! Plane addressing within a series.
//!
//! A series stores `Z * C * T` planes in one linear sequence. The dimension
//! order names the axes from fastest to slowest varying after X and Y, so
//! `XYZCT` means Z varies fastest and T slowest.

use serde::{Deserialize, Serialize};

// =============================================================================
// PlaneExtents
// =============================================================================

/// Effective Z/C/T extents used for plane addressing.
///
/// `size_c` here counts planes along C, which is the series channel count
/// divided by the number of channels interleaved into each plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaneExtents {
    pub size_z: usize,
    pub size_c: usize,
    pub size_t: usize,
}

impl PlaneExtents {
    pub fn plane_count(&self) -> usize {
        self.size_z * self.size_c * self.size_t
    }
}

// =============================================================================
// DimensionOrder
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum DimensionOrder {
    #[default]
    XYZCT,
    XYZTC,
    XYCZT,
    XYCTZ,
    XYTZC,
    XYTCZ,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Axis {
    Z,
    C,
    T,
}

impl DimensionOrder {
    pub const ALL: [DimensionOrder; 6] = [
        DimensionOrder::XYZCT,
        DimensionOrder::XYZTC,
        DimensionOrder::XYCZT,
        DimensionOrder::XYCTZ,
        DimensionOrder::XYTZC,
        DimensionOrder::XYTCZ,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            DimensionOrder::XYZCT => "XYZCT",
            DimensionOrder::XYZTC => "XYZTC",
            DimensionOrder::XYCZT => "XYCZT",
            DimensionOrder::XYCTZ => "XYCTZ",
            DimensionOrder::XYTZC => "XYTZC",
            DimensionOrder::XYTCZ => "XYTCZ",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|order| order.name() == name)
    }

    /// Axes from fastest to slowest varying.
    const fn axes(self) -> [Axis; 3] {
        match self {
            DimensionOrder::XYZCT => [Axis::Z, Axis::C, Axis::T],
            DimensionOrder::XYZTC => [Axis::Z, Axis::T, Axis::C],
            DimensionOrder::XYCZT => [Axis::C, Axis::Z, Axis::T],
            DimensionOrder::XYCTZ => [Axis::C, Axis::T, Axis::Z],
            DimensionOrder::XYTZC => [Axis::T, Axis::Z, Axis::C],
            DimensionOrder::XYTCZ => [Axis::T, Axis::C, Axis::Z],
        }
    }

    /// Linear plane index of `(z, c, t)`.
    ///
    /// Returns `None` when a coordinate lies outside its extent.
    pub fn index(self, extents: PlaneExtents, z: usize, c: usize, t: usize) -> Option<usize> {
        if z >= extents.size_z || c >= extents.size_c || t >= extents.size_t {
            return None;
        }

        let mut index = 0;
        let mut stride = 1;
        for axis in self.axes() {
            let (coord, size) = match axis {
                Axis::Z => (z, extents.size_z),
                Axis::C => (c, extents.size_c),
                Axis::T => (t, extents.size_t),
            };
            index += coord * stride;
            stride *= size;
        }
        Some(index)
    }

    /// `(z, c, t)` coordinates of a linear plane index.
    ///
    /// Returns `None` when `no` is not below the plane count.
    pub fn coords(self, extents: PlaneExtents, no: usize) -> Option<(usize, usize, usize)> {
        if no >= extents.plane_count() {
            return None;
        }

        let (mut z, mut c, mut t) = (0, 0, 0);
        let mut rest = no;
        for axis in self.axes() {
            let size = match axis {
                Axis::Z => extents.size_z,
                Axis::C => extents.size_c,
                Axis::T => extents.size_t,
            };
            let coord = rest % size;
            rest /= size;
            match axis {
                Axis::Z => z = coord,
                Axis::C => c = coord,
                Axis::T => t = coord,
            }
        }
        Some((z, c, t))
    }
}

impl std::fmt::Display for DimensionOrder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
