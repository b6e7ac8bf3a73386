//! Direction indicators, the last stick event and a controls hint.

use bevy::prelude::*;
use stride_shared::{Direction, DirectionalEventKind};

use super::styles::*;
use crate::input::DirectionalEventMessage;
use crate::systems::{LocalAvatar, PlayerAvatar};

pub struct HudPlugin;

impl Plugin for HudPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Startup, spawn_hud);
        app.add_systems(
            Update,
            (update_direction_indicators, update_last_event, update_status_line),
        );
    }
}

#[derive(Component)]
struct DirectionIndicator(Direction);

#[derive(Component)]
struct LastEventText;

#[derive(Component)]
struct StatusText;

fn label(direction: Direction) -> &'static str {
    match direction {
        Direction::Forward => "FWD",
        Direction::Backward => "BACK",
        Direction::Left => "LEFT",
        Direction::Right => "RIGHT",
    }
}

fn spawn_hud(mut commands: Commands) {
    commands
        .spawn((
            Node {
                position_type: PositionType::Absolute,
                left: Val::Px(12.0),
                top: Val::Px(12.0),
                flex_direction: FlexDirection::Column,
                padding: UiRect::all(Val::Px(10.0)),
                row_gap: Val::Px(6.0),
                ..default()
            },
            BackgroundColor(PANEL_BACKGROUND),
            BorderRadius::all(Val::Px(4.0)),
        ))
        .with_children(|panel| {
            panel
                .spawn(Node {
                    column_gap: Val::Px(10.0),
                    ..default()
                })
                .with_children(|row| {
                    for direction in Direction::ALL {
                        row.spawn((
                            DirectionIndicator(direction),
                            Text::new(label(direction)),
                            indicator_text_style(),
                            TextColor(TEXT_MUTED),
                        ));
                    }
                });

            panel.spawn((
                StatusText,
                Text::new("loading..."),
                hud_text_style(),
                TextColor(TEXT_COLOR),
            ));
            panel.spawn((
                LastEventText,
                Text::new("stick: idle"),
                hud_text_style(),
                TextColor(TEXT_MUTED),
            ));
            panel.spawn((
                Text::new(
                    "WASD / arrows: move   drag: joystick\nSpace: attack   H: hit   K: kill   Del: destroy",
                ),
                hud_text_style(),
                TextColor(TEXT_MUTED),
            ));
        });
}

fn update_direction_indicators(
    avatars: Query<&PlayerAvatar, With<LocalAvatar>>,
    mut indicators: Query<(&DirectionIndicator, &mut TextColor)>,
) {
    let intents = avatars
        .iter()
        .next()
        .map(|avatar| avatar.intents())
        .unwrap_or_default();

    for (indicator, mut color) in indicators.iter_mut() {
        let power = if intents.is_active(indicator.0) {
            intents.power(indicator.0).max(0.2)
        } else {
            0.0
        };
        color.0 = power_color(power);
    }
}

fn update_last_event(
    mut messages: MessageReader<DirectionalEventMessage>,
    mut text: Query<&mut Text, With<LastEventText>>,
) {
    let Some(DirectionalEventMessage(event)) = messages.read().last().copied() else {
        return;
    };
    let Ok(mut text) = text.single_mut() else {
        return;
    };

    text.0 = match (event.kind, event.power) {
        (DirectionalEventKind::Start, Some(power)) => {
            format!("stick: {} {:.2}", event.direction.name(), power)
        }
        _ => format!("stick: {} released", event.direction.name()),
    };
}

fn update_status_line(
    avatars: Query<&PlayerAvatar, With<LocalAvatar>>,
    mut text: Query<&mut Text, With<StatusText>>,
) {
    let Ok(mut text) = text.single_mut() else {
        return;
    };
    let status = match avatars.iter().next() {
        None => "no avatar".to_string(),
        Some(avatar) if !avatar.is_loaded() => format!("{}: loading...", avatar.name()),
        Some(avatar) if avatar.is_killed() => format!("{}: killed", avatar.name()),
        Some(avatar) => {
            let clip = avatar
                .director()
                .current_clip()
                .map(|clip| format!("{clip:?}"))
                .unwrap_or_else(|| "-".to_string());
            format!(
                "{}: {}  speed {:.3}",
                avatar.name(),
                clip,
                avatar.locomotion().speed()
            )
        }
    };
    if text.0 != status {
        text.0 = status;
    }
}
