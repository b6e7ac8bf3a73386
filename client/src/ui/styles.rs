//! Shared UI styles

use bevy::prelude::*;

/// Text colors
pub const TEXT_COLOR: Color = Color::srgb(0.94, 0.94, 0.92);
pub const TEXT_MUTED: Color = Color::srgb(0.62, 0.64, 0.66);

/// Accent for active directions
pub const ACCENT_COLOR: Color = Color::srgb(0.98, 0.74, 0.26);

/// Joystick base and knob
pub const STICK_BASE: Color = Color::srgba(1.0, 1.0, 1.0, 0.18);
pub const STICK_KNOB: Color = Color::srgba(1.0, 1.0, 1.0, 0.55);

/// Translucent panel behind HUD text
pub const PANEL_BACKGROUND: Color = Color::srgba(0.0, 0.0, 0.0, 0.35);

pub fn hud_text_style() -> TextFont {
    TextFont {
        font_size: 14.0,
        ..default()
    }
}

pub fn indicator_text_style() -> TextFont {
    TextFont {
        font_size: 18.0,
        ..default()
    }
}

/// Blend from muted to accent by `power` in `[0, 1]`.
pub fn power_color(power: f32) -> Color {
    let t = power.clamp(0.0, 1.0);
    TEXT_MUTED.mix(&ACCENT_COLOR, t)
}
