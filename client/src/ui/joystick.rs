//! On-screen joystick overlay, drawn where the drag started.

use bevy::prelude::*;

use super::styles::*;
use crate::input::JoystickState;

const KNOB_RADIUS: f32 = 14.0;

pub struct JoystickOverlayPlugin;

impl Plugin for JoystickOverlayPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Startup, spawn_joystick_overlay);
        app.add_systems(Update, update_joystick_overlay);
    }
}

#[derive(Component)]
struct StickBase;

#[derive(Component)]
struct StickKnob;

fn circle(radius: f32) -> Node {
    Node {
        position_type: PositionType::Absolute,
        width: Val::Px(radius * 2.0),
        height: Val::Px(radius * 2.0),
        ..default()
    }
}

fn spawn_joystick_overlay(mut commands: Commands, stick: Res<JoystickState>) {
    commands.spawn((
        StickBase,
        circle(stick.radius()),
        BackgroundColor(STICK_BASE),
        BorderRadius::MAX,
        Visibility::Hidden,
    ));
    commands.spawn((
        StickKnob,
        circle(KNOB_RADIUS),
        BackgroundColor(STICK_KNOB),
        BorderRadius::MAX,
        Visibility::Hidden,
    ));
}

fn update_joystick_overlay(
    stick: Res<JoystickState>,
    mut base: Query<(&mut Node, &mut Visibility), (With<StickBase>, Without<StickKnob>)>,
    mut knob: Query<(&mut Node, &mut Visibility), (With<StickKnob>, Without<StickBase>)>,
) {
    if !stick.is_changed() {
        return;
    }
    let (Ok((mut base_node, mut base_vis)), Ok((mut knob_node, mut knob_vis))) =
        (base.single_mut(), knob.single_mut())
    else {
        return;
    };

    let Some(origin) = stick.origin else {
        *base_vis = Visibility::Hidden;
        *knob_vis = Visibility::Hidden;
        return;
    };

    let radius = stick.radius();
    base_node.left = Val::Px(origin.x - radius);
    base_node.top = Val::Px(origin.y - radius);
    *base_vis = Visibility::Visible;

    let center = origin + stick.knob;
    knob_node.left = Val::Px(center.x - KNOB_RADIUS);
    knob_node.top = Val::Px(center.y - KNOB_RADIUS);
    *knob_vis = Visibility::Visible;
}
