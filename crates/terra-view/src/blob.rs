//! `UniformBlob` (§4.2): a set of pixel coordinates that all share one
//! color, backed by a row -> set-of-columns map (dense-friendly for
//! horizontal spans, per §9's note on the sparse-overlay representation
//! choice).

use std::collections::{BTreeMap, BTreeSet};

use terra_core::error::Error;

use crate::error::Result;

/// A sparse set of same-colored pixel coordinates, grounded on
/// `Uniform_Blob.hpp`'s `map<int, set<int>>` backing.
#[derive(Clone)]
pub struct UniformBlob {
    color: Vec<u8>,
    pixels: BTreeMap<i64, BTreeSet<i64>>,
}

impl UniformBlob {
    pub fn new(color: Vec<u8>) -> Self {
        Self { color, pixels: BTreeMap::new() }
    }

    pub fn color(&self) -> &[u8] {
        &self.color
    }

    pub fn size(&self) -> usize {
        self.pixels.values().map(|row| row.len()).sum()
    }

    pub fn clear(&mut self) {
        self.pixels.clear();
    }

    pub fn is_inside(&self, col: i64, row: i64, _plane: i64) -> bool {
        self.pixels.get(&row).is_some_and(|cols| cols.contains(&col))
    }

    pub fn get_pixel(&self, col: i64, row: i64, plane: i64) -> Result<&[u8]> {
        if !self.is_inside(col, row, plane) {
            return Err(Error::bounds(col, row, 1, 1, col + 1, row + 1));
        }
        Ok(&self.color)
    }

    /// Inserts `(col, row)` without touching the blob's color.
    pub fn insert(&mut self, col: i64, row: i64, _plane: i64) {
        self.pixels.entry(row).or_default().insert(col);
    }

    /// Inserts `(col, row)`, optionally overriding the blob's shared color.
    pub fn insert_colored(&mut self, col: i64, row: i64, plane: i64, color: &[u8], override_color: bool) {
        if override_color {
            self.color = color.to_vec();
        }
        self.insert(col, row, plane);
    }

    pub fn pixel_list(&self) -> Vec<(i64, i64)> {
        self.pixels.iter().flat_map(|(&row, cols)| cols.iter().map(move |&col| (col, row))).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_and_query() {
        let mut blob = UniformBlob::new(vec![255, 0, 0]);
        blob.insert(3, 4, 0);
        assert!(blob.is_inside(3, 4, 0));
        assert!(!blob.is_inside(4, 3, 0));
        assert_eq!(blob.size(), 1);
        assert_eq!(blob.get_pixel(3, 4, 0).unwrap(), &[255, 0, 0]);
    }

    #[test]
    fn override_color_updates_shared_color() {
        let mut blob = UniformBlob::new(vec![0, 0, 0]);
        blob.insert_colored(0, 0, 0, &[1, 2, 3], true);
        assert_eq!(blob.color(), &[1, 2, 3]);
    }
}
