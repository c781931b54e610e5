//! Horizontal follow camera.
//!
//! The offset is derived fresh every tick from the player and the room; the
//! only thing kept between ticks is the last value, for drawing.

/// Scroll offset that centres the player, clamped so the view never leaves
/// the room. Rooms no wider than the viewport never scroll.
pub fn compute_offset(room_width: f32, player_center_x: f32, viewport_width: f32) -> f32 {
    if room_width <= viewport_width {
        return 0.0;
    }
    let max_offset = room_width - viewport_width;
    (player_center_x - viewport_width * 0.5).clamp(0.0, max_offset)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn narrow_room_never_scrolls() {
        for x in [0.0, 200.0, 639.0, 5_000.0] {
            assert_eq!(compute_offset(640.0, x, 640.0), 0.0);
            assert_eq!(compute_offset(400.0, x, 640.0), 0.0);
        }
    }

    #[test]
    fn stops_at_right_edge() {
        // tavern: 1280 wide, player at x = 1000 with a 64 wide sprite
        let offset = compute_offset(1280.0, 1000.0 + 32.0, 640.0);
        assert_relative_eq!(offset, 640.0);
    }

    #[test]
    fn stops_at_left_edge() {
        assert_eq!(compute_offset(1280.0, 100.0, 640.0), 0.0);
    }

    #[test]
    fn centres_player_mid_room() {
        assert_relative_eq!(compute_offset(1920.0, 900.0, 640.0), 580.0);
    }

    #[test]
    fn always_within_room() {
        for width in [320.0, 640.0, 641.0, 1280.0, 3000.0] {
            let max = f32::max(0.0, width - 640.0);
            let mut x = -100.0;
            while x < width + 100.0 {
                let offset = compute_offset(width, x, 640.0);
                assert!((0.0..=max).contains(&offset), "{} in {}", offset, width);
                x += 7.5;
            }
        }
    }
}
