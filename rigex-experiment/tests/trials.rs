use rand::SeedableRng;
use rand::rngs::StdRng;
use rigex_core::{
    Disposition, PhaseKind, PortId, Sound, SoundStatus, Station, TrialRecord, ValveId, names,
};
use rigex_experiment::{
    CompiledRecord, ConstantReinforcement, DelayDistribution, GoOnlyConfig, Gratings,
    Gratings2Afc, Gratings2AfcConfig, GratingsConfig, GratingsGoOnly, Reinforcement, Session,
    Step, Subject, TrialManager, TrialRun, build_phases, PhaseTemplate, run_trial,
};
use rigex_station::{PortScript, SimulatedStation, StationConfig, StationKind};

const HZ: f64 = 60.0;

fn station(kind: StationKind) -> SimulatedStation {
    SimulatedStation::new(StationConfig {
        kind,
        ..StationConfig::default()
    })
}

/// 2AFC with the left port as target and an unbounded stimulus.
fn afc(reward_ms: f64) -> Gratings2Afc {
    Gratings2Afc::new(Gratings2AfcConfig {
        left_port_probability: 1.0,
        reinforcement: Reinforcement::Constant(ConstantReinforcement {
            reward_ms,
            ..Default::default()
        }),
        ..Default::default()
    })
    .unwrap()
}

fn run(
    tm: &dyn TrialManager,
    st: &mut SimulatedStation,
    seed: u64,
) -> (TrialRecord, bool) {
    let mut rng = StdRng::seed_from_u64(seed);
    tm.do_trial(
        st,
        &Subject::default(),
        TrialRecord::new(1),
        &CompiledRecord::new(),
        false,
        &mut rng,
    )
}

fn phase_names(record: &TrialRecord) -> Vec<&str> {
    record.phase_data.iter().map(|p| p.phase_name.as_str()).collect()
}

#[test]
fn distractor_response_leads_to_punishment() {
    let tm = afc(20.0);
    let mut st = station(StationKind::VisionBehavior);
    st.queue_script(
        PortScript::new()
            .press(names::CENTER_PORT, 2, 2)
            .press(names::RIGHT_PORT, 10, 3),
    );
    let (record, quit) = run(&tm, &mut st, 1);

    assert!(!quit);
    assert_eq!(phase_names(&record), ["pre-request", "stim", "punishment", "inter-trial"]);
    assert_eq!(record.correct, Some(false));
    assert_eq!(record.disposition(), Disposition::Incorrect);
    assert!(!record.reward_delivered);
    assert_eq!(st.valve_open_frames(&ValveId::new(names::LEFT_VALVE)), Vec::<u64>::new());

    let pre = &record.phase_data[0];
    assert_eq!(pre.frames, 3);
    assert_eq!(pre.responses.len(), 1);
    assert!((pre.responses[0].time - 2.0 / HZ).abs() < 1e-9);

    // The held request port is logged again once the stimulus phase starts.
    let stim = &record.phase_data[1];
    assert!((stim.enter_time - 3.0 / HZ).abs() < 1e-9);
    let ports: Vec<&str> = stim.responses.iter().map(|r| r.port.as_str()).collect();
    assert_eq!(ports, [names::CENTER_PORT, names::RIGHT_PORT]);
    assert!((stim.responses[1].time - 10.0 / HZ).abs() < 1e-9);

    let punishment = &record.phase_data[2];
    assert_eq!(punishment.phase_type, PhaseKind::Punishment);
    assert_eq!(punishment.frames, 60);
}

#[test]
fn target_response_opens_the_paired_valve_for_the_reward_frames() {
    let tm = afc(50.0);
    let mut st = station(StationKind::VisionBehavior);
    st.queue_script(
        PortScript::new()
            .press(names::CENTER_PORT, 0, 1)
            .press(names::LEFT_PORT, 5, 1),
    );
    let (record, _) = run(&tm, &mut st, 2);

    assert_eq!(phase_names(&record), ["pre-request", "stim", "reward", "inter-trial"]);
    assert_eq!(record.correct, Some(true));
    assert!(record.reward_delivered);
    assert_eq!(st.valve_open_frames(&ValveId::new(names::LEFT_VALVE)), vec![3]);
    assert_eq!(st.open_valves().count(), 0);
    assert!(!st.trial_pin());
}

#[test]
fn ambiguous_input_errors_out_in_the_same_frame() {
    let tm = afc(20.0);
    let mut st = station(StationKind::VisionBehavior);
    st.queue_script(
        PortScript::new()
            .press(names::LEFT_PORT, 5, 10)
            .press(names::RIGHT_PORT, 5, 10),
    );
    let (record, quit) = run(&tm, &mut st, 3);

    assert!(record.errored_out);
    assert_eq!(record.correct, None);
    assert_eq!(record.disposition(), Disposition::ErroredOut);
    assert!(!quit);
    assert_eq!(phase_names(&record), ["pre-request"]);
    assert_eq!(record.phase_data[0].frames, 6);
    assert!(record.phase_data[0].responses.is_empty());
    // Five flips happened before the ambiguous frame; that frame was never presented.
    assert_eq!(st.frame(), 5);
    assert!(!st.trial_pin());
}

#[test]
fn manual_quit_stops_the_trial_and_the_session() {
    let tm = afc(20.0);
    let mut st = station(StationKind::Keyboard);
    st.set_default_script(PortScript::new().quit_at(30));
    let mut rng = StdRng::seed_from_u64(4);
    let mut session = Session::new(&tm, Subject::new("operator-test"));
    let summary = session.run(&mut st, 10, &mut rng);

    assert!(summary.quit);
    assert_eq!(summary.trials, 1);
    assert_eq!(summary.manual_quit, 1);
    let record = &session.records()[0];
    assert!(record.manual_quit);
    assert_eq!(record.correct, None);
    assert_eq!(record.phase_data[0].frames, 31);
    assert!(!st.trial_pin());
}

#[test]
fn held_ports_are_logged_once_per_activation() {
    let tm = Gratings::new(GratingsConfig::default()).unwrap();
    let mut st = station(StationKind::VisionBehavior);
    st.queue_script(
        PortScript::new()
            .press(names::LEFT_PORT, 5, 10)
            .press(names::LEFT_PORT, 20, 5)
            .press(names::CENTER_PORT, 40, 1),
    );
    let (record, quit) = run(&tm, &mut st, 5);

    assert!(!quit);
    assert_eq!(phase_names(&record), ["stim", "inter-trial"]);
    assert_eq!(record.disposition(), Disposition::Completed);
    let stim = &record.phase_data[0];
    assert_eq!(stim.frames, 60);
    let times: Vec<f64> = stim.responses.iter().map(|r| (r.time * HZ).round()).collect();
    assert_eq!(times, [5.0, 20.0, 40.0]);
    assert_eq!(st.frame(), 120);
}

#[test]
fn sounds_play_once_and_end_stopped() {
    let tm = afc(20.0);
    let mut st = station(StationKind::VisionBehavior);
    st.queue_script(
        PortScript::new()
            .press(names::CENTER_PORT, 0, 1)
            .press(names::RIGHT_PORT, 4, 1),
    );
    run(&tm, &mut st, 6);
    for name in [
        names::TRIAL_START_SOUND,
        names::STIM_START_SOUND,
        names::PUNISHMENT_SOUND,
        names::TRIAL_END_SOUND,
    ] {
        let sound = st.sim_sound(name).unwrap();
        assert_eq!(sound.plays(), 1, "{name}");
        assert_eq!(sound.status(), SoundStatus::Stopped, "{name}");
    }
    assert_eq!(st.sim_sound(names::CORRECT_SOUND).unwrap().plays(), 0);
}

#[test]
fn incompatible_station_requests_quit_without_running() {
    let tm = GratingsGoOnly::new(GoOnlyConfig::default()).unwrap();
    let mut st = station(StationKind::VisionBehavior);
    let (record, quit) = run(&tm, &mut st, 7);
    assert!(quit);
    assert!(record.errored_out);
    assert_eq!(record.correct, None);
    assert!(record.phase_data.is_empty());
    assert_eq!(st.frame(), 0);
}

#[test]
fn go_only_lick_in_window_is_rewarded() {
    let tm = GratingsGoOnly::new(GoOnlyConfig {
        delay: DelayDistribution::Constant { seconds: 0.5 },
        ..Default::default()
    })
    .unwrap();
    let mut st = station(StationKind::VisionHeadfix);
    // A lick during the delay is logged but does not end the phase.
    st.queue_script(
        PortScript::new()
            .press(names::RESPONSE_PORT, 10, 1)
            .press(names::RESPONSE_PORT, 40, 1),
    );
    let (record, _) = run(&tm, &mut st, 8);

    assert_eq!(phase_names(&record), ["delay", "response-window", "reward", "inter-trial"]);
    assert_eq!(record.phase_data[0].frames, 30);
    assert_eq!(record.phase_data[0].responses.len(), 1);
    assert_eq!(record.phase_data[1].frames, 11);
    assert_eq!(record.correct, Some(true));
    assert_eq!(st.valve_open_frames(&ValveId::new(names::REWARD_VALVE)), vec![1]);
}

#[test]
fn go_only_silence_is_punished() {
    let tm = GratingsGoOnly::new(GoOnlyConfig::default()).unwrap();
    let mut st = station(StationKind::VisionHeadfix);
    let (record, _) = run(&tm, &mut st, 9);
    assert_eq!(phase_names(&record), ["delay", "response-window", "punishment", "inter-trial"]);
    assert_eq!(record.correct, Some(false));
    assert_eq!(record.phase_data[1].frames, 120);
}

#[test]
fn compiler_appends_in_call_order() {
    let tm = afc(20.0);
    let mut st = station(StationKind::VisionBehavior);
    let mut compiled = CompiledRecord::new();
    let mut rng = StdRng::seed_from_u64(10);
    for n in [1, 2] {
        st.queue_script(
            PortScript::new()
                .press(names::CENTER_PORT, 0, 1)
                .press(names::LEFT_PORT, 3, 1),
        );
        let (record, _) = tm.do_trial(
            &mut st,
            &Subject::default(),
            TrialRecord::new(n),
            &compiled,
            false,
            &mut rng,
        );
        tm.trial_compiler(&mut compiled, &record);
    }
    let details = compiled.get("Gratings2AFC").unwrap();
    assert_eq!(details.trial_number, vec![1, 2]);
    assert_eq!(details.len(), 2);
    assert!(details.is_consistent());
    let responses = details.responses.as_ref().unwrap();
    assert_eq!(responses.request_time.len(), 2);
    assert!((responses.response_time[0].unwrap() - 3.0 / HZ).abs() < 1e-9);
    assert_eq!(details.correct, vec![Some(true), Some(true)]);
}

#[test]
fn sessions_terminate_without_responses() {
    let tm = Gratings2Afc::new(Gratings2AfcConfig {
        left: Gratings2AfcConfig::default().left.with_durations(vec![0.25]),
        right: Gratings2AfcConfig::default().right.with_durations(vec![0.25]),
        ..Default::default()
    })
    .unwrap();
    for seed in 0..8 {
        let mut st = station(StationKind::Keyboard);
        st.set_default_script(
            PortScript::new()
                .press(names::CENTER_PORT, 1, 1)
                .press(if seed % 2 == 0 { names::LEFT_PORT } else { names::RIGHT_PORT }, 40, 1),
        );
        let mut rng = StdRng::seed_from_u64(seed);
        let mut session = Session::new(&tm, Subject::default());
        let summary = session.run(&mut st, 3, &mut rng);
        assert_eq!(summary.trials, 3);
        assert_eq!(summary.correct + summary.incorrect, 3);
        for record in session.records() {
            assert!(record.phase_data.iter().any(|p| p.phase_type == PhaseKind::PostStimulus));
            assert!(record.phase_data.iter().all(|p| p.exit_time.is_some()));
        }
    }
}

#[test]
fn zero_frame_phase_still_renders_once() {
    let phases = build_phases(
        vec![
            PhaseTemplate::new("flash", PhaseKind::Stimulus)
                .frames(0)
                .on_timeout("iti"),
            PhaseTemplate::new("iti", PhaseKind::InterTrial).frames(2),
        ],
        HZ,
    )
    .unwrap();
    let mut st = station(StationKind::Keyboard);
    let (record, quit) = run_trial(phases, TrialRecord::new(1), &mut st);
    assert!(!quit);
    assert_eq!(record.phase_data[0].frames, 1);
    assert_eq!(record.phase_data[1].frames, 2);
    assert_eq!(st.frame(), 3);
    assert!(st.ports().contains(&PortId::new(names::RESPONSE_PORT)));
}

#[test]
fn stepping_a_prepared_trial_matches_the_blocking_loop() {
    let tm = GratingsGoOnly::new(GoOnlyConfig::default()).unwrap();
    let mut blocking = station(StationKind::Keyboard);
    let (expected, _) = run(&tm, &mut blocking, 11);

    let mut st = station(StationKind::Keyboard);
    let mut rng = StdRng::seed_from_u64(11);
    let mut session = Session::new(&tm, Subject::default());
    let (phases, record) = tm
        .prepare_trial(
            &st,
            session.subject(),
            TrialRecord::new(session.next_trial_number()),
            session.compiled(),
            &mut rng,
        )
        .expect("keyboard stations run go-only");
    let mut trial = TrialRun::begin(phases, record, &mut st);
    let mut steps = 0;
    while trial.step(&mut st) == Step::Continue {
        steps += 1;
    }
    let (record, quit) = trial.finish(&mut st);
    st.release();

    assert!(!quit);
    assert_eq!(steps + 1, st.frame());
    assert_eq!(phase_names(&record), phase_names(&expected));
    assert_eq!(session.complete(record), Disposition::Incorrect);
    assert_eq!(session.next_trial_number(), 2);
    assert_eq!(session.compiled().trials("GratingsGoOnly"), 1);
}

#[test]
fn prepare_trial_hands_back_an_errored_record_on_a_bad_station() {
    let tm = GratingsGoOnly::new(GoOnlyConfig::default()).unwrap();
    let st = station(StationKind::VisionBehavior);
    let mut rng = StdRng::seed_from_u64(12);
    let record = tm
        .prepare_trial(
            &st,
            &Subject::default(),
            TrialRecord::new(4),
            &CompiledRecord::new(),
            &mut rng,
        )
        .unwrap_err();
    assert_eq!(record.trial_number, 4);
    assert_eq!(record.trial_manager_class, "GratingsGoOnly");
    assert_eq!(record.disposition(), Disposition::ErroredOut);
}

#[test]
fn finishing_a_live_trial_counts_as_manual_quit() {
    let tm = GratingsGoOnly::new(GoOnlyConfig::default()).unwrap();
    let mut st = station(StationKind::Keyboard);
    let mut rng = StdRng::seed_from_u64(13);
    let mut session = Session::new(&tm, Subject::default());
    let (phases, record) = tm
        .prepare_trial(
            &st,
            session.subject(),
            TrialRecord::new(session.next_trial_number()),
            session.compiled(),
            &mut rng,
        )
        .expect("keyboard stations run go-only");
    let mut trial = TrialRun::begin(phases, record, &mut st);
    for _ in 0..3 {
        assert_eq!(trial.step(&mut st), Step::Continue);
    }
    assert!(!trial.is_finished());

    let (record, quit) = trial.finish(&mut st);
    st.release();

    assert!(quit);
    assert!(record.manual_quit);
    assert_eq!(record.correct, None);
    assert!(record.phase_data.iter().all(|p| p.exit_time.is_some()));
    assert!(!st.trial_pin());
    assert_eq!(session.complete(record), Disposition::ManualQuit);
}

#[test]
fn an_earlier_quit_skips_the_trial() {
    let tm = afc(20.0);
    let mut st = station(StationKind::VisionBehavior);
    let mut rng = StdRng::seed_from_u64(14);
    let (record, quit) = tm.do_trial(
        &mut st,
        &Subject::default(),
        TrialRecord::new(7),
        &CompiledRecord::new(),
        true,
        &mut rng,
    );
    assert!(quit);
    assert_eq!(record.disposition(), Disposition::ManualQuit);
    assert_eq!(record.trial_manager_class, "Gratings2AFC");
    assert!(record.phase_data.is_empty());
    assert_eq!(st.frame(), 0);
    assert_eq!(st.events().count(), 0);
}
