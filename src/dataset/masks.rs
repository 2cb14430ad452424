//! Shadow Mask Templates
//!
//! Each class label maps to the outline of its sign. A template is the set of
//! pixel positions inside that outline on the model's input grid; shadows are only
//! ever cast on those positions.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::config::RunConfig;
use crate::utils::{Result, ShadowError};
use crate::IMAGE_SIZE;

/// Outline of a traffic sign
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaskShape {
    Circle,
    Octagon,
    Diamond,
    Rectangle,
    Triangle,
    InvertedTriangle,
    Pentagon,
}

// Polygon outlines in unit coordinates, (0, 0) top-left.
const OCTAGON: &[(f32, f32)] = &[
    (0.30, 0.02),
    (0.70, 0.02),
    (0.98, 0.30),
    (0.98, 0.70),
    (0.70, 0.98),
    (0.30, 0.98),
    (0.02, 0.70),
    (0.02, 0.30),
];
const DIAMOND: &[(f32, f32)] = &[(0.50, 0.02), (0.98, 0.50), (0.50, 0.98), (0.02, 0.50)];
const RECTANGLE: &[(f32, f32)] = &[(0.12, 0.02), (0.88, 0.02), (0.88, 0.98), (0.12, 0.98)];
const TRIANGLE: &[(f32, f32)] = &[(0.50, 0.05), (0.98, 0.92), (0.02, 0.92)];
const INVERTED_TRIANGLE: &[(f32, f32)] = &[(0.02, 0.08), (0.98, 0.08), (0.50, 0.95)];
const PENTAGON: &[(f32, f32)] = &[
    (0.50, 0.02),
    (0.98, 0.45),
    (0.98, 0.98),
    (0.02, 0.98),
    (0.02, 0.45),
];

impl MaskShape {
    fn outline(&self) -> Option<&'static [(f32, f32)]> {
        match self {
            MaskShape::Circle => None,
            MaskShape::Octagon => Some(OCTAGON),
            MaskShape::Diamond => Some(DIAMOND),
            MaskShape::Rectangle => Some(RECTANGLE),
            MaskShape::Triangle => Some(TRIANGLE),
            MaskShape::InvertedTriangle => Some(INVERTED_TRIANGLE),
            MaskShape::Pentagon => Some(PENTAGON),
        }
    }

    /// Whether the unit-square point `(u, v)` lies inside the outline
    pub fn contains(&self, u: f32, v: f32) -> bool {
        match self.outline() {
            None => {
                let (du, dv) = (u - 0.5, v - 0.5);
                du * du + dv * dv <= 0.47 * 0.47
            }
            Some(polygon) => point_in_polygon(polygon, u, v),
        }
    }
}

/// Even-odd ray casting test
pub(crate) fn point_in_polygon(polygon: &[(f32, f32)], x: f32, y: f32) -> bool {
    let mut inside = false;
    let mut j = polygon.len() - 1;
    for i in 0..polygon.len() {
        let (xi, yi) = polygon[i];
        let (xj, yj) = polygon[j];
        if (yi > y) != (yj > y) && x < (xj - xi) * (y - yi) / (yj - yi) + xi {
            inside = !inside;
        }
        j = i;
    }
    inside
}

/// Pixel positions inside a sign outline
#[derive(Debug, Clone)]
pub struct MaskTemplate {
    shape: MaskShape,
    size: u32,
    positions: Vec<(u32, u32)>,
    inside: Vec<bool>,
}

impl MaskTemplate {
    /// Rasterise `shape` on a `size` x `size` grid, sampling pixel centres
    pub fn rasterize(shape: MaskShape, size: u32) -> Self {
        let mut positions = Vec::new();
        let mut inside = vec![false; (size * size) as usize];

        for y in 0..size {
            for x in 0..size {
                let u = (x as f32 + 0.5) / size as f32;
                let v = (y as f32 + 0.5) / size as f32;
                if shape.contains(u, v) {
                    positions.push((x, y));
                    inside[(y * size + x) as usize] = true;
                }
            }
        }

        Self {
            shape,
            size,
            positions,
            inside,
        }
    }

    pub fn shape(&self) -> MaskShape {
        self.shape
    }

    /// In-sign positions in row-major order
    pub fn positions(&self) -> &[(u32, u32)] {
        &self.positions
    }

    pub fn contains(&self, x: u32, y: u32) -> bool {
        x < self.size && y < self.size && self.inside[(y * self.size + x) as usize]
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

/// Lookup from class label to its mask template
#[derive(Debug, Clone)]
pub struct MaskRegistry {
    templates: BTreeMap<usize, MaskTemplate>,
}

impl MaskRegistry {
    /// Build templates for every entry of a label -> shape table
    pub fn new(table: &BTreeMap<usize, MaskShape>, size: u32) -> Self {
        let templates = table
            .iter()
            .map(|(&label, &shape)| (label, MaskTemplate::rasterize(shape, size)))
            .collect();
        Self { templates }
    }

    /// Registry for the configured mask table at the model's input size
    pub fn from_config(config: &RunConfig) -> Self {
        Self::new(&config.masks, IMAGE_SIZE as u32)
    }

    /// Template for `label`; unknown labels are a configuration error
    pub fn template(&self, label: usize) -> Result<&MaskTemplate> {
        self.templates
            .get(&label)
            .ok_or(ShadowError::UnregisteredLabel(label))
    }

    /// Registered labels in ascending order
    pub fn labels(&self) -> impl Iterator<Item = usize> + '_ {
        self.templates.keys().copied()
    }
}

/// Mask shapes of the 16 LISA classes, indexed like [`crate::dataset::CLASS_NAMES`]
pub fn lisa_mask_table() -> BTreeMap<usize, MaskShape> {
    use MaskShape::*;

    [
        Diamond,          // addedLane
        Rectangle,        // keepRight
        Diamond,          // laneEnds
        Diamond,          // merge
        Diamond,          // pedestrianCrossing
        Pentagon,         // school
        Rectangle,        // schoolSpeedLimit25
        Diamond,          // signalAhead
        Rectangle,        // speedLimit25
        Rectangle,        // speedLimit30
        Rectangle,        // speedLimit35
        Rectangle,        // speedLimit45
        Octagon,          // stop
        Diamond,          // stopAhead
        Diamond,          // turnRight
        InvertedTriangle, // yield
    ]
    .into_iter()
    .enumerate()
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_templates_are_non_empty_and_inside_grid() {
        for shape in [
            MaskShape::Circle,
            MaskShape::Octagon,
            MaskShape::Diamond,
            MaskShape::Rectangle,
            MaskShape::Triangle,
            MaskShape::InvertedTriangle,
            MaskShape::Pentagon,
        ] {
            let template = MaskTemplate::rasterize(shape, 32);
            assert!(!template.is_empty(), "{:?} is empty", shape);
            assert!(template.len() < 32 * 32);
            assert!(template.positions().iter().all(|&(x, y)| x < 32 && y < 32));
        }
    }

    #[test]
    fn test_diamond_excludes_corners() {
        let template = MaskTemplate::rasterize(MaskShape::Diamond, 32);
        assert!(template.contains(16, 16));
        assert!(!template.contains(0, 0));
        assert!(!template.contains(31, 31));
        assert!(!template.contains(40, 0));
    }

    #[test]
    fn test_point_in_polygon() {
        let square = [(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)];
        assert!(point_in_polygon(&square, 0.5, 0.5));
        assert!(!point_in_polygon(&square, 1.5, 0.5));
    }

    #[test]
    fn test_registry_lookup() {
        let registry = MaskRegistry::new(&lisa_mask_table(), 32);
        assert_eq!(registry.labels().count(), 16);
        assert_eq!(registry.template(12).unwrap().shape(), MaskShape::Octagon);
        assert!(matches!(
            registry.template(16),
            Err(ShadowError::UnregisteredLabel(16))
        ));
    }

    #[test]
    fn test_shape_serde_names() {
        let json = serde_json::to_string(&MaskShape::InvertedTriangle).unwrap();
        assert_eq!(json, "\"inverted_triangle\"");
    }
}
