//! UI module

pub mod hud;
pub mod joystick;
pub mod styles;

pub use hud::HudPlugin;
pub use joystick::JoystickOverlayPlugin;
