use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::sleep;
use std::time::Duration;

use approx::assert_abs_diff_eq;
use taktgeber::{CatchUp, ClockSource, Config, Error, EventSink, LookaheadScheduler, ManualClock, Parameters, WakeTimer};

const EPS: f64 = 1e-9;

#[derive(Default)]
struct Record {
    times: Vec<f64>,
}

impl EventSink for Record {
    fn schedule_pulse(&mut self, at: f64) -> taktgeber::Result<()> {
        self.times.push(at);
        Ok(())
    }
}

/// Wake every 25 ms of clock time from `from` up to and including `until`.
fn run_wakes(scheduler: &mut LookaheadScheduler, clock: &ManualClock, sink: &mut Record, params: &Parameters, until: f64) {
    while clock.current_time() <= until + EPS {
        scheduler.on_wake(clock, sink, params);
        clock.advance(0.025);
    }
}

#[test]
fn first_beats_at_120_bpm() {
    let clock = ManualClock::new();
    let params = Parameters::new(120.0, 440.0, 0.5).unwrap();
    let mut sink = Record::default();

    let mut scheduler = LookaheadScheduler::new(&Config::default());
    scheduler.start(&clock, 0.05);
    run_wakes(&mut scheduler, &clock, &mut sink, &params, 1.0);

    assert!(sink.times.len() >= 3);
    assert_abs_diff_eq!(sink.times[0], 0.05, epsilon = EPS);
    assert_abs_diff_eq!(sink.times[1], 0.55, epsilon = EPS);
    assert_abs_diff_eq!(sink.times[2], 1.05, epsilon = EPS);
}

#[test]
fn constant_rate_keeps_constant_spacing() {
    let clock = ManualClock::new();
    let params = Parameters::new(90.0, 440.0, 0.5).unwrap();
    let mut sink = Record::default();

    let mut scheduler = LookaheadScheduler::new(&Config::default());
    scheduler.start(&clock, 0.05);
    run_wakes(&mut scheduler, &clock, &mut sink, &params, 20.0);

    assert!(sink.times.len() > 20);
    for pair in sink.times.windows(2) {
        assert_abs_diff_eq!(pair[1] - pair[0], 60.0 / 90.0, epsilon = 1e-6);
    }
}

#[test]
fn commits_only_inside_lookahead_window() {
    let clock = ManualClock::new();
    let params = Parameters::default();
    let mut sink = Record::default();

    let mut scheduler = LookaheadScheduler::new(&Config::default());
    scheduler.start(&clock, 0.05);

    for _ in 0..5 {
        scheduler.on_wake(&clock, &mut sink, &params);
    }
    assert_eq!(sink.times.len(), 1);
    assert_abs_diff_eq!(scheduler.next_event_time(), 0.55, epsilon = EPS);

    clock.set(0.449);
    assert_eq!(scheduler.on_wake(&clock, &mut sink, &params), 0);
    clock.set(0.451);
    assert_eq!(scheduler.on_wake(&clock, &mut sink, &params), 1);
}

#[test]
fn rate_change_sets_the_gap_before_the_next_event() {
    let clock = ManualClock::new();
    let params = Parameters::new(120.0, 440.0, 0.5).unwrap();
    let mut sink = Record::default();

    let mut scheduler = LookaheadScheduler::new(&Config::default());
    scheduler.start(&clock, 0.05);
    run_wakes(&mut scheduler, &clock, &mut sink, &params, 0.6);
    let before = sink.times.clone();
    assert_eq!(before.len(), 2);

    params.set_rate(60.0).unwrap();
    assert_abs_diff_eq!(scheduler.upcoming(&params), 1.55, epsilon = EPS);
    run_wakes(&mut scheduler, &clock, &mut sink, &params, 3.0);

    // Already committed beats are untouched
    assert_eq!(&sink.times[..2], &before[..]);
    assert_eq!(sink.times.len(), 4);
    assert_abs_diff_eq!(sink.times[1] - sink.times[0], 0.5, epsilon = EPS);
    assert_abs_diff_eq!(sink.times[2] - sink.times[1], 1.0, epsilon = EPS);
    assert_abs_diff_eq!(sink.times[3] - sink.times[2], 1.0, epsilon = EPS);
}

#[test]
fn rate_change_between_wakes_is_picked_up_by_next_wake() {
    let clock = ManualClock::new();
    let params = Parameters::new(60.0, 440.0, 0.5).unwrap();
    let mut sink = Record::default();

    let mut scheduler = LookaheadScheduler::new(&Config::default());
    scheduler.start(&clock, 0.05);
    scheduler.on_wake(&clock, &mut sink, &params);
    assert_abs_diff_eq!(scheduler.next_event_time(), 1.05, epsilon = EPS);

    params.set_rate(240.0).unwrap();
    clock.set(0.25);
    assert_eq!(scheduler.on_wake(&clock, &mut sink, &params), 1);
    assert_abs_diff_eq!(sink.times[1], 0.3, epsilon = EPS);
}

#[test]
fn stall_with_cap_drops_overdue_beats_and_stays_on_grid() {
    let clock = ManualClock::new();
    let params = Parameters::default();
    let mut sink = Record::default();

    let config = Config::default().with_catch_up(CatchUp::Cap(4));
    let mut scheduler = LookaheadScheduler::new(&config);
    scheduler.start(&clock, 0.05);
    scheduler.on_wake(&clock, &mut sink, &params);

    clock.set(5.0);
    let committed = scheduler.on_wake(&clock, &mut sink, &params);

    // 4 overdue beats plus the one that is still ahead of the clock
    assert_eq!(committed, 5);
    let expected = [0.05, 0.55, 1.05, 1.55, 2.05, 5.05];
    assert_eq!(sink.times.len(), expected.len());
    for (got, want) in sink.times.iter().zip(expected) {
        assert_abs_diff_eq!(*got, want, epsilon = 1e-6);
    }
    assert_abs_diff_eq!(scheduler.next_event_time(), 5.55, epsilon = 1e-6);
}

#[test]
fn stall_with_fire_all_commits_every_overdue_beat() {
    let clock = ManualClock::new();
    let params = Parameters::default();
    let mut sink = Record::default();

    let config = Config::default().with_catch_up(CatchUp::FireAll);
    let mut scheduler = LookaheadScheduler::new(&config);
    scheduler.start(&clock, 0.05);
    scheduler.on_wake(&clock, &mut sink, &params);

    clock.set(5.0);
    let committed = scheduler.on_wake(&clock, &mut sink, &params);

    // 0.55 ..= 4.55 overdue, then 5.05
    assert_eq!(committed, 10);
    for pair in sink.times.windows(2) {
        assert_abs_diff_eq!(pair[1] - pair[0], 0.5, epsilon = 1e-6);
    }
}

#[test]
fn restart_derives_from_current_clock() {
    let clock = ManualClock::new();
    let params = Parameters::default();
    let mut sink = Record::default();

    let mut scheduler = LookaheadScheduler::new(&Config::default());
    scheduler.start(&clock, 0.05);
    run_wakes(&mut scheduler, &clock, &mut sink, &params, 2.0);
    assert!(scheduler.last_committed().is_some());

    clock.set(10.0);
    scheduler.start(&clock, 0.05);
    assert_abs_diff_eq!(scheduler.next_event_time(), 10.05, epsilon = EPS);
    assert_eq!(scheduler.last_committed(), None);

    sink.times.clear();
    scheduler.on_wake(&clock, &mut sink, &params);
    assert_eq!(sink.times.len(), 1);
    assert_abs_diff_eq!(sink.times[0], 10.05, epsilon = EPS);
}

#[test]
fn failing_sink_does_not_stall_the_schedule() {
    struct Full;

    impl EventSink for Full {
        fn schedule_pulse(&mut self, _at: f64) -> taktgeber::Result<()> {
            Err(Error::QueueFull)
        }
    }

    let clock = ManualClock::new();
    let params = Parameters::default();
    let mut scheduler = LookaheadScheduler::new(&Config::default());
    scheduler.start(&clock, 0.05);

    assert_eq!(scheduler.on_wake(&clock, &mut Full, &params), 1);
    assert_abs_diff_eq!(scheduler.next_event_time(), 0.55, epsilon = EPS);
}

#[test]
fn manual_clock_is_monotonic() {
    let clock = ManualClock::new();
    clock.set(2.0);
    clock.set(1.0);
    assert_abs_diff_eq!(clock.current_time(), 2.0);

    clock.advance(0.5);
    assert_abs_diff_eq!(clock.current_time(), 2.5);

    assert!(clock.resume().is_ok());
    clock.close().unwrap();
    assert!(matches!(clock.resume(), Err(Error::ClockUnavailable(_))));
}

#[test]
fn invalid_parameters_keep_previous_value() {
    let params = Parameters::default();

    assert_eq!(params.set_rate(0.0), Err(Error::InvalidParameter { name: "rate", value: 0.0 }));
    assert!(params.set_rate(f32::NAN).is_err());
    assert!(params.set_frequency(-1.0).is_err());
    assert!(params.set_volume(1.5).is_err());

    assert_eq!(params.rate(), 120.0);
    assert_eq!(params.frequency(), 440.0);
    assert_eq!(params.volume(), 0.5);
    assert!(Parameters::new(120.0, 440.0, -0.1).is_err());
}

#[test]
fn wake_timer_fires_until_cancelled() {
    let wakes = Arc::new(AtomicUsize::new(0));
    let counter = wakes.clone();

    let mut timer = WakeTimer::spawn(Duration::from_millis(2), move || {
        counter.fetch_add(1, Ordering::SeqCst);
    })
    .unwrap();
    assert!(timer.is_running());

    sleep(Duration::from_millis(50));
    timer.cancel().unwrap();
    assert!(!timer.is_running());

    let after_cancel = wakes.load(Ordering::SeqCst);
    assert!(after_cancel > 0);

    sleep(Duration::from_millis(20));
    assert_eq!(wakes.load(Ordering::SeqCst), after_cancel);

    // Second cancel is a no-op
    timer.cancel().unwrap();
}
