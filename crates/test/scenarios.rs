//! End-to-end scenarios: settings -> monitor loop -> stub screen and key sink.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use libtest_mimic::{Arguments, Failed, Trial};

use orbwatch_core::color::{ColorRange, ColorRule, ColorSpace};
use orbwatch_core::monitor::Monitor;
use orbwatch_core::platform::stub::StubPlatform;
use orbwatch_core::settings::Settings;
use orbwatch_core::types::{Point, Resource};
use orbwatch_test::*;

const SCREEN: (u32, u32) = (2560, 1440);
const HEALTHY_RED: [u8; 3] = [200, 10, 10];
const GRAY: [u8; 3] = [128, 128, 128];
const HEALTHY_BLUE: [u8; 3] = [20, 60, 200];

fn check(cond: bool, msg: impl Into<String>) -> Result<(), Failed> {
    if cond {
        return Ok(());
    }
    let msg: String = msg.into();
    Err(msg.into())
}

fn stub() -> StubPlatform {
    StubPlatform::default().with_screen(SCREEN.0, SCREEN.1)
}

fn healthy_red_no_action() -> Result<(), Failed> {
    let settings = only(Resource::Health);
    let mut platform = stub().filled(HEALTHY_RED);
    let mut sleeper = RecordingSleeper::stopping_after(1);
    let stop = AtomicBool::new(false);

    let report = Monitor::new(&settings).tick(&mut platform, &mut sleeper, &stop);
    check(report.ratios == vec![(Resource::Health, 1.0)], format!("ratios {:?}", report.ratios))?;
    check(platform.taps().is_empty(), format!("unexpected taps {:?}", platform.taps()))
}

fn gray_fires_once_then_cools_down() -> Result<(), Failed> {
    let settings = only(Resource::Health);
    let mut platform = stub().filled(GRAY);
    // cooldown, then poll: the stop lands after the first full tick
    let mut sleeper = RecordingSleeper::stopping_after(2);
    let stop = AtomicBool::new(false);

    Monitor::new(&settings).run(&mut platform, &mut sleeper, &stop);
    check(platform.taps() == ["1"], format!("taps {:?}", platform.taps()))?;
    check(platform.captures().len() == 1, format!("{} captures", platform.captures().len()))?;
    check(
        sleeper.sleeps == [Duration::from_millis(1000), Duration::from_millis(500)],
        format!("sleeps {:?}", sleeper.sleeps),
    )
}

/// Mana region of radius 20 with exactly `matching` in-circle pixels painted blue.
fn mana_with_matching(matching: impl Fn(usize) -> usize) -> (Settings, StubPlatform, usize, usize) {
    let mut settings = only(Resource::Mana);
    settings.regions[0].radius = 20;
    let circle = circle_pixels(&settings.regions[0], SCREEN);
    let total = circle.len();
    let n = matching(total);
    let blue: HashSet<(i32, i32)> = circle.into_iter().take(n).collect();
    let platform = stub().with_paint(move |x, y| if blue.contains(&(x, y)) { HEALTHY_BLUE } else { GRAY });
    (settings, platform, n, total)
}

fn mana_at_threshold_no_action() -> Result<(), Failed> {
    let (settings, mut platform, n, total) = mana_with_matching(|total| total / 5);
    check(total % 5 == 0, format!("{} circle pixels is not divisible by 5", total))?;
    let mut sleeper = RecordingSleeper::default();
    let stop = AtomicBool::new(false);

    let report = Monitor::new(&settings).tick(&mut platform, &mut sleeper, &stop);
    let ratio = report.ratios[0].1;
    check(ratio == 0.2, format!("ratio {} ({}/{})", ratio, n, total))?;
    check(report.actions.is_empty(), "action fired at ratio == threshold")?;
    check(platform.taps().is_empty(), format!("taps {:?}", platform.taps()))
}

fn mana_below_threshold_acts() -> Result<(), Failed> {
    let (settings, mut platform, _, _) = mana_with_matching(|total| total / 5 - 1);
    let mut sleeper = RecordingSleeper::default();
    let stop = AtomicBool::new(false);

    let report = Monitor::new(&settings).tick(&mut platform, &mut sleeper, &stop);
    check(report.actions == [Resource::Mana], format!("actions {:?}", report.actions))?;
    check(platform.taps() == ["2"], format!("taps {:?}", platform.taps()))
}

fn hsv_wraparound_rule() -> Result<(), Failed> {
    let mut settings = only(Resource::Health);
    settings.regions[0].color_space = ColorSpace::Hsv;
    settings.regions[0].ranges = ColorRule(vec![
        ColorRange::new([0, 100, 100], [10, 255, 255]),
        ColorRange::new([160, 100, 100], [179, 255, 255]),
    ]);
    let stop = AtomicBool::new(false);

    // Hue ~179: only the upper range matches.
    let mut platform = stub().filled([255, 0, 10]);
    let report = Monitor::new(&settings).tick(&mut platform, &mut RecordingSleeper::default(), &stop);
    check(report.ratios[0].1 == 1.0, format!("wrapped red ratio {}", report.ratios[0].1))?;
    check(platform.taps().is_empty(), "wrapped red counted as unhealthy")?;

    // Green matches neither range.
    let mut platform = stub().filled([0, 200, 0]);
    let report = Monitor::new(&settings).tick(&mut platform, &mut RecordingSleeper::default(), &stop);
    check(report.ratios[0].1 == 0.0, format!("green ratio {}", report.ratios[0].1))?;
    check(platform.taps() == ["1"], format!("taps {:?}", platform.taps()))
}

fn interrupt_sends_no_further_keys() -> Result<(), Failed> {
    let settings = Settings::default();

    let stop = AtomicBool::new(true);
    let mut platform = stub().filled(GRAY);
    Monitor::new(&settings).run(&mut platform, &mut RecordingSleeper::default(), &stop);
    check(platform.taps().is_empty(), "key sent after stop")?;
    check(platform.captures().is_empty(), "sampled after stop")?;

    // Interrupt during the health cooldown: mana must not be pressed.
    let stop = AtomicBool::new(false);
    let mut platform = stub().filled(GRAY);
    let mut sleeper = RecordingSleeper::stopping_after(1);
    Monitor::new(&settings).run(&mut platform, &mut sleeper, &stop);
    check(platform.taps() == ["1"], format!("taps {:?}", platform.taps()))?;
    check(stop.load(Ordering::Acquire), "stop flag lost")
}

fn capture_glitch_skips_then_recovers() -> Result<(), Failed> {
    let settings = only(Resource::Health);
    let mut monitor = Monitor::new(&settings);
    let mut platform = stub().filled(GRAY);
    let stop = AtomicBool::new(false);

    platform.set_fail_capture(true);
    let report = monitor.tick(&mut platform, &mut RecordingSleeper::default(), &stop);
    check(report.skipped && platform.taps().is_empty(), "glitched tick dispatched a key")?;

    platform.set_fail_capture(false);
    let report = monitor.tick(&mut platform, &mut RecordingSleeper::default(), &stop);
    check(!report.skipped, "tick after glitch still skipped")?;
    check(platform.taps() == ["1"], format!("taps {:?}", platform.taps()))
}

fn circle_clamped_at_screen_edge() -> Result<(), Failed> {
    let mut settings = only(Resource::Health);
    settings.regions[0].center = Point::new(5, 1430);
    let full = std::f64::consts::PI * 80.0 * 80.0;
    let circle = circle_pixels(region(&settings, Resource::Health), SCREEN);
    check((circle.len() as f64) < full / 2.0, format!("{} pixels, expected a truncated circle", circle.len()))?;

    let mut platform = stub().filled(HEALTHY_RED);
    let report = Monitor::new(&settings).tick(&mut platform, &mut RecordingSleeper::default(), &running());
    check(report.ratios[0].1 == 1.0, format!("ratio {}", report.ratios[0].1))?;
    let rect = platform.captures()[0];
    check(rect.l == 0 && rect.t + rect.h == SCREEN.1 as i32, format!("rect {:?}", rect))
}

fn debug_captures_rate_limited() -> Result<(), Failed> {
    let dir = std::env::temp_dir().join(format!("orbwatch-scenario-{}", std::process::id()));
    let mut settings = Settings::default();
    settings.debug.enabled = true;
    settings.debug.interval_ms = 60_000;
    settings.debug.dir = dir.to_string_lossy().into_owned();

    let mut platform = stub().filled(HEALTHY_RED);
    let stop = AtomicBool::new(false);
    Monitor::new(&settings).run(&mut platform, &mut RecordingSleeper::stopping_after(3), &stop);

    let mut files: Vec<String> = std::fs::read_dir(&dir)?
        .filter_map(|e| e.ok())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .collect();
    files.sort();
    std::fs::remove_dir_all(&dir).ok();

    check(files.len() == 2, format!("files {:?}", files))?;
    check(files[0].starts_with("health_circle_") && files[0].ends_with(".png"), format!("{:?}", files))?;
    check(files[1].starts_with("mana_circle_"), format!("{:?}", files))
}

fn running() -> AtomicBool {
    AtomicBool::new(false)
}

fn main() {
    let args = Arguments::from_args();
    let tests = vec![
        Trial::test("healthy_red_no_action", healthy_red_no_action),
        Trial::test("gray_fires_once_then_cools_down", gray_fires_once_then_cools_down),
        Trial::test("mana_at_threshold_no_action", mana_at_threshold_no_action),
        Trial::test("mana_below_threshold_acts", mana_below_threshold_acts),
        Trial::test("hsv_wraparound_rule", hsv_wraparound_rule),
        Trial::test("interrupt_sends_no_further_keys", interrupt_sends_no_further_keys),
        Trial::test("capture_glitch_skips_then_recovers", capture_glitch_skips_then_recovers),
        Trial::test("circle_clamped_at_screen_edge", circle_clamped_at_screen_edge),
        Trial::test("debug_captures_rate_limited", debug_captures_rate_limited),
    ];
    libtest_mimic::run(&args, tests).exit();
}
