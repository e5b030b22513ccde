use rigex_core::{Sound, SoundId, SoundStatus, Station, StationTag, ValveId, names};
use rigex_station::{
    MAX_EVENTS, PortScript, SimulatedStation, StationConfig, StationEvent, StationKind,
};
use std::time::Duration;

fn station(kind: StationKind) -> SimulatedStation {
    SimulatedStation::new(StationConfig {
        kind,
        ..StationConfig::default()
    })
}

#[test]
fn flips_advance_the_virtual_clock() {
    let mut st = station(StationKind::VisionBehavior);
    for _ in 0..60 {
        st.flip();
    }
    assert_eq!(st.frame(), 60);
    let now = st.now().as_secs_f64();
    assert!((now - 1.0).abs() < 1e-6, "clock at {now}");
    assert!(st.now() > Duration::ZERO);
}

#[test]
fn scripts_are_consumed_per_trial() {
    let mut st = station(StationKind::VisionBehavior);
    st.queue_script(PortScript::new().press(names::CENTER_PORT, 1, 2));
    st.set_default_script(PortScript::new().press(names::LEFT_PORT, 0, 1));

    st.set_trial_pin(true);
    assert!(st.read_ports().is_empty());
    st.flip();
    assert_eq!(st.read_ports()[0].as_str(), names::CENTER_PORT);
    st.set_trial_pin(false);

    st.set_trial_pin(true);
    assert_eq!(st.read_ports()[0].as_str(), names::LEFT_PORT);
}

#[test]
fn ports_outside_the_layout_are_ignored() {
    let mut st = station(StationKind::VisionHeadfix);
    st.queue_script(PortScript::new().press(names::LEFT_PORT, 0, 5));
    st.set_trial_pin(true);
    assert!(st.read_ports().is_empty());
}

#[test]
fn unknown_valve_is_an_error() {
    let mut st = station(StationKind::VisionHeadfix);
    assert!(st.open_valve(&ValveId::new(names::LEFT_VALVE)).is_err());
    assert!(st.open_valve(&ValveId::new(names::REWARD_VALVE)).is_ok());
}

#[test]
fn release_is_idempotent_and_closes_valves() {
    let mut st = station(StationKind::VisionBehavior);
    let left = ValveId::new(names::LEFT_VALVE);
    st.set_trial_pin(true);
    st.open_valve(&left).unwrap();
    st.flip();
    st.flip();
    st.release();
    st.release();
    assert_eq!(st.open_valves().count(), 0);
    assert!(!st.trial_pin());
    assert_eq!(st.valve_open_frames(&left), vec![2]);
    let closes = st
        .events()
        .filter(|e| matches!(e, StationEvent::ValveClosed { .. }))
        .count();
    assert_eq!(closes, 1);
}

#[test]
fn manual_quit_only_fires_inside_a_trial() {
    let mut st = station(StationKind::Keyboard);
    st.set_default_script(PortScript::new().quit_at(0));
    assert!(!st.check_manual_quit());
    st.set_trial_pin(true);
    assert!(st.check_manual_quit());
    assert!(st.capabilities().contains(StationTag::Keyboard));
}

#[test]
fn sounds_track_playback() {
    let mut st = station(StationKind::VisionBehavior);
    let id = SoundId::new(names::GO_SOUND);
    let sound = st.sound(&id).unwrap();
    sound.seek(0.0);
    sound.play();
    assert_eq!(sound.status(), SoundStatus::Playing);
    sound.stop();
    assert_eq!(st.sim_sound(names::GO_SOUND).unwrap().plays(), 1);
    assert!(st.sound(&SoundId::new("missing")).is_none());
}

#[test]
fn event_log_keeps_only_the_latest_events() {
    let mut st = station(StationKind::Keyboard);
    for _ in 0..MAX_EVENTS {
        st.set_trial_pin(true);
        st.flip();
        st.set_trial_pin(false);
    }
    assert_eq!(st.events().count(), MAX_EVENTS);
    assert_eq!(
        st.events().last(),
        Some(&StationEvent::TrialPin {
            frame: MAX_EVENTS as u64,
            on: false
        })
    );
    assert_eq!(st.take_events().len(), MAX_EVENTS);
    assert_eq!(st.events().count(), 0);
}
