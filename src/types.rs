use std::cmp::Ordering;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rect {
    #[serde(deserialize_with = "deserialize_u32_from_number")]
    pub w: u32,
    #[serde(deserialize_with = "deserialize_u32_from_number")]
    pub h: u32,
}

impl Rect {
    pub fn new(w: u32, h: u32) -> Self {
        Self { w, h }
    }

    pub fn area(&self) -> u64 {
        self.w as u64 * self.h as u64
    }

    pub fn rotated(&self) -> Self {
        Self {
            w: self.h,
            h: self.w,
        }
    }

    pub fn fits_in(&self, other: &Rect) -> bool {
        self.w <= other.w && self.h <= other.h
    }

    /// True if `self` fits in `other` as given or, when allowed, turned 90°.
    pub fn fits_in_any(&self, other: &Rect, allow_rotate: bool) -> bool {
        self.fits_in(other) || (allow_rotate && self.rotated().fits_in(other))
    }
}

impl std::fmt::Display for Rect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.w, self.h)
    }
}

/// A container type ("truck") with a fixed usage cost.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Bin {
    #[serde(deserialize_with = "deserialize_u32_from_number")]
    pub w: u32,
    #[serde(deserialize_with = "deserialize_u32_from_number")]
    pub h: u32,
    #[serde(deserialize_with = "deserialize_u32_from_number")]
    pub cost: u32,
}

impl Bin {
    pub fn new(w: u32, h: u32, cost: u32) -> Self {
        Self { w, h, cost }
    }

    pub fn rect(&self) -> Rect {
        Rect::new(self.w, self.h)
    }

    pub fn area(&self) -> u64 {
        self.rect().area()
    }

    /// Orders bins by cost divided by area without going through floats.
    pub fn cmp_cost_per_area(&self, other: &Bin) -> Ordering {
        let lhs = self.cost as u128 * other.area() as u128;
        let rhs = other.cost as u128 * self.area() as u128;
        lhs.cmp(&rhs)
    }
}

impl std::fmt::Display for Bin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{} (cost {})", self.w, self.h, self.cost)
    }
}

/// Where one item ended up. `item` and `bin` are input indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Placement {
    pub item: usize,
    pub bin: usize,
    /// Footprint as placed, i.e. already swapped when `rotated`.
    pub rect: Rect,
    pub x: u32,
    pub y: u32,
    pub rotated: bool,
}

impl Placement {
    pub fn right(&self) -> u32 {
        self.x + self.rect.w
    }

    pub fn top(&self) -> u32 {
        self.y + self.rect.h
    }

    pub fn overlaps(&self, other: &Placement) -> bool {
        self.x < other.right()
            && other.x < self.right()
            && self.y < other.top()
            && other.y < self.top()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BinResult {
    pub bin: usize,
    pub stock: Bin,
    pub placements: Vec<Placement>,
    pub waste_area: u64,
}

/// A complete packing. `bins` lists every opened bin in opening order,
/// including ones that ended up empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Solution {
    pub bins: Vec<BinResult>,
    pub total_cost: u64,
}

impl Solution {
    pub fn bins_opened(&self) -> usize {
        self.bins.len()
    }

    /// All placements ordered by input item index.
    pub fn item_placements(&self) -> Vec<Placement> {
        let mut placements: Vec<Placement> = self
            .bins
            .iter()
            .flat_map(|b| b.placements.iter().copied())
            .collect();
        placements.sort_by_key(|p| p.item);
        placements
    }

    #[cfg(test)]
    pub fn placement_of(&self, item: usize) -> Option<&Placement> {
        self.bins
            .iter()
            .flat_map(|b| &b.placements)
            .find(|p| p.item == item)
    }

    pub fn total_waste_percent(&self) -> f64 {
        let total_stock_area: u64 = self.bins.iter().map(|b| b.stock.area()).sum();
        let total_waste: u64 = self.bins.iter().map(|b| b.waste_area).sum();
        if total_stock_area == 0 {
            return 0.0;
        }
        total_waste as f64 / total_stock_area as f64 * 100.0
    }
}

/// Accepts integral JSON numbers written as floats (`3.0`) as well as plain integers.
pub fn deserialize_u32_from_number<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let n = f64::deserialize(deserializer)?;
    if n.fract() != 0.0 || n < 0.0 || n > u32::MAX as f64 {
        return Err(D::Error::custom(format!(
            "expected a non-negative integer, got {n}"
        )));
    }
    Ok(n as u32)
}
