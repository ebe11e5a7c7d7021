//! Property-based invariant tests for the cylindrical button grid.
//!
//! These hold for any button count and any valid grid configuration:
//!
//! 1. Slot count matches button count.
//! 2. Row/column follow index division.
//! 3. (row, column) pairs are unique.
//! 4. Rows step down by exactly `row_height`.
//! 5. Full rows are symmetric around zero and strictly decreasing.
//! 6. Live position stays at `grid_distance` for any yaw.
//! 7. Transforms are deterministic and finite.

use std::collections::HashSet;

use glam::Vec3;
use proptest::prelude::*;
use xrplay_layout::{ButtonGridLayout, GridConfig};

// ── Helpers ─────────────────────────────────────────────────────────────

fn config_strategy() -> impl Strategy<Value = GridConfig> {
    (1usize..=8, 0.1f32..=6.0, 0.05f32..=1.0, -2.0f32..=3.0, 0.2f32..=10.0).prop_map(
        |(per_row, row_arc, row_height, grid_height, grid_distance)| GridConfig {
            per_row,
            row_arc,
            row_height,
            grid_height,
            grid_distance,
        },
    )
}

fn approx(a: f32, b: f32) -> bool {
    (a - b).abs() <= 1e-4 * (1.0 + a.abs().max(b.abs()))
}

// ═════════════════════════════════════════════════════════════════════════
// 1-3. Counting and indexing
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn slot_count_matches(config in config_strategy(), count in 0usize..=64) {
        let layout = ButtonGridLayout::new(config).unwrap();
        prop_assert_eq!(layout.slots(count).len(), count);
    }

    #[test]
    fn row_and_column_follow_index(config in config_strategy(), count in 1usize..=64) {
        let layout = ButtonGridLayout::new(config).unwrap();
        for slot in layout.slots(count) {
            prop_assert_eq!(slot.row, slot.index / config.per_row);
            prop_assert_eq!(slot.column, slot.index % config.per_row);
            prop_assert!(slot.row < layout.rows(count));
        }
    }

    #[test]
    fn cells_are_unique(config in config_strategy(), count in 1usize..=64) {
        let layout = ButtonGridLayout::new(config).unwrap();
        let cells: HashSet<(usize, usize)> =
            layout.slots(count).iter().map(|s| (s.row, s.column)).collect();
        prop_assert_eq!(cells.len(), count);
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 4-5. Geometry of rows
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn rows_step_by_row_height(config in config_strategy(), count in 1usize..=64) {
        let layout = ButtonGridLayout::new(config).unwrap();
        let slots = layout.slots(count);
        for slot in &slots {
            let expected = slots[0].y_offset - slot.row as f32 * config.row_height;
            prop_assert!(approx(slot.y_offset, expected));
        }
    }

    #[test]
    fn full_rows_are_symmetric(config in config_strategy(), rows in 1usize..=4) {
        let layout = ButtonGridLayout::new(config).unwrap();
        let count = rows * config.per_row;
        let slots = layout.slots(count);
        for row in slots.chunks(config.per_row) {
            for (a, b) in row.iter().zip(row.iter().rev()) {
                prop_assert!(approx(a.y_angle, -b.y_angle));
            }
            for pair in row.windows(2) {
                prop_assert!(pair[0].y_angle > pair[1].y_angle);
            }
        }
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 6-7. Per-frame transforms
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn radius_is_constant(config in config_strategy(), yaw in -10.0f32..=10.0) {
        let layout = ButtonGridLayout::new(config).unwrap();
        let position = layout.live_position(yaw);
        prop_assert!(approx(position.length(), config.grid_distance));
    }

    #[test]
    fn button_origin_stays_on_cylinder(
        config in config_strategy(),
        count in 1usize..=16,
        yaw in -10.0f32..=10.0,
    ) {
        let layout = ButtonGridLayout::new(config).unwrap();
        for slot in layout.slots(count) {
            let origin = layout.transform(&slot, yaw).transform_point3(Vec3::ZERO);
            prop_assert!(approx(origin.y, slot.y_offset));
            let horizontal = Vec3::new(origin.x, 0.0, origin.z).length();
            prop_assert!(approx(horizontal, config.grid_distance));
        }
    }

    #[test]
    fn transform_is_deterministic(config in config_strategy(), yaw in -10.0f32..=10.0) {
        let layout = ButtonGridLayout::new(config).unwrap();
        let slot = layout.slot(0, 1);
        let a = layout.transform(&slot, yaw);
        let b = layout.transform(&slot, yaw);
        prop_assert_eq!(a, b);
        prop_assert!(a.is_finite());
    }
}
