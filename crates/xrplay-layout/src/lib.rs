#![forbid(unsafe_code)]

//! Cylindrical grid layout for in-scene button menus.
//!
//! Buttons are laid out in rows of a fixed capacity on an arc of fixed
//! angular width, vertically centered on a base height, at a constant radial
//! distance from the viewer. Each button's angle and height are computed once
//! when the grid is built; only the viewer-relative placement changes per
//! frame.
//!
//! # Example
//!
//! ```
//! use xrplay_layout::{ButtonGridLayout, GridConfig};
//!
//! let layout = ButtonGridLayout::new(GridConfig::default()).unwrap();
//! let slots = layout.slots(5);
//! assert_eq!(slots[4].row, 1);
//! assert_eq!(slots[4].column, 0);
//!
//! // Rebuilt from scratch every frame with the current viewer yaw.
//! let model = layout.transform(&slots[0], 0.25);
//! # let _ = model;
//! ```
//!
//! # Invariants
//!
//! 1. `slots(n).len() == n`, and slot `i` sits at `row = i / per_row`,
//!    `column = i % per_row`.
//! 2. Within a full row, angles are symmetric around zero and strictly
//!    decreasing with the column.
//! 3. Consecutive rows differ in height by exactly `row_height`.
//! 4. `|live_position(yaw)| == grid_distance` for every yaw.
//! 5. A short last row stays left-aligned (no re-centering).

use core::f32::consts::PI;

use glam::{Mat4, Vec3};
use serde::{Deserialize, Serialize};
use xrplay_core::ConfigError;

/// Grid constants.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GridConfig {
    /// Buttons per row.
    pub per_row: usize,
    /// Total angular width of one row, in radians.
    pub row_arc: f32,
    /// Vertical distance between rows.
    pub row_height: f32,
    /// Base height the grid is centered on.
    pub grid_height: f32,
    /// Radial distance from the viewer.
    pub grid_distance: f32,
}

impl Default for GridConfig {
    /// Player-control menu: low, wide, two units away.
    fn default() -> Self {
        Self {
            per_row: 4,
            row_arc: PI * 0.3,
            row_height: 0.32,
            grid_height: 0.5,
            grid_distance: 2.0,
        }
    }
}

impl GridConfig {
    /// Home-page permission menu: eye level, one unit away.
    #[must_use]
    pub fn home_menu() -> Self {
        Self {
            per_row: 4,
            row_arc: PI * 0.4,
            row_height: 0.32,
            grid_height: 1.5,
            grid_distance: 1.0,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.per_row == 0 {
            return Err(ConfigError::InvalidNumber {
                key: "perRow",
                value: self.per_row.to_string(),
            });
        }
        let finite = [
            ("rowArc", self.row_arc),
            ("rowHeight", self.row_height),
            ("gridHeight", self.grid_height),
        ];
        for (key, value) in finite {
            if !value.is_finite() {
                return Err(ConfigError::InvalidNumber {
                    key,
                    value: value.to_string(),
                });
            }
        }
        if !(self.grid_distance.is_finite() && self.grid_distance > 0.0) {
            return Err(ConfigError::InvalidNumber {
                key: "gridDistance",
                value: self.grid_distance.to_string(),
            });
        }
        Ok(())
    }
}

/// Build-time placement of one button.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridSlot {
    pub index: usize,
    pub row: usize,
    pub column: usize,
    /// Rotation about the vertical axis, radians from grid center.
    pub y_angle: f32,
    /// Height of the button's row.
    pub y_offset: f32,
}

/// Pure layout engine over a validated [`GridConfig`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ButtonGridLayout {
    config: GridConfig,
}

impl ButtonGridLayout {
    pub fn new(config: GridConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config })
    }

    #[inline]
    #[must_use]
    pub fn config(&self) -> &GridConfig {
        &self.config
    }

    /// Number of rows needed for `count` buttons.
    #[inline]
    #[must_use]
    pub fn rows(&self, count: usize) -> usize {
        count.div_ceil(self.config.per_row)
    }

    #[inline]
    #[must_use]
    pub fn angle_per_button(&self) -> f32 {
        self.config.row_arc / self.config.per_row as f32
    }

    /// Placement of button `index` in a grid of `count` buttons.
    #[must_use]
    pub fn slot(&self, index: usize, count: usize) -> GridSlot {
        debug_assert!(index < count, "slot {index} out of range for {count} buttons");
        let c = &self.config;
        let rows = self.rows(count);
        let first_row_offset = (rows as f32 / 2.0) * c.row_height;
        let angle_per_button = self.angle_per_button();
        let row_angle_offset = c.row_arc * 0.5 - angle_per_button * 0.5;

        let row = index / c.per_row;
        let column = index % c.per_row;
        GridSlot {
            index,
            row,
            column,
            y_angle: row_angle_offset - column as f32 * angle_per_button,
            y_offset: c.grid_height + (first_row_offset - row as f32 * c.row_height),
        }
    }

    /// Placements for a whole grid, in index order.
    #[must_use]
    pub fn slots(&self, count: usize) -> Vec<GridSlot> {
        (0..count).map(|i| self.slot(i, count)).collect()
    }

    /// Grid origin for the current viewer yaw: a point on the circle of
    /// radius `grid_distance` in front of the viewer.
    #[inline]
    #[must_use]
    pub fn live_position(&self, yaw: f32) -> Vec3 {
        let d = self.config.grid_distance;
        Vec3::new(-d * yaw.sin(), 0.0, -d * yaw.cos())
    }

    /// Per-frame model matrix for `slot` facing a viewer at `yaw`.
    ///
    /// `I · T(0, y_offset, 0) · Ry(y_angle) · T(live_position) · Ry(yaw)`.
    /// Height and intra-grid angle are applied in the button's local frame
    /// before the grid is moved and turned toward the viewer.
    #[must_use]
    pub fn transform(&self, slot: &GridSlot, yaw: f32) -> Mat4 {
        Mat4::from_translation(Vec3::new(0.0, slot.y_offset, 0.0))
            * Mat4::from_rotation_y(slot.y_angle)
            * Mat4::from_translation(self.live_position(yaw))
            * Mat4::from_rotation_y(yaw)
    }

    /// Fixed model matrix for menus that do not follow the viewer.
    #[must_use]
    pub fn static_transform(&self, slot: &GridSlot) -> Mat4 {
        Mat4::from_translation(Vec3::new(0.0, slot.y_offset, 0.0))
            * Mat4::from_rotation_y(slot.y_angle)
            * Mat4::from_translation(Vec3::new(0.0, 0.0, -self.config.grid_distance))
    }
}
