use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use chrono::Local;

use crate::debug::{self, DebugCapture};
use crate::logger;
use crate::platform::{InputInjector, ScreenCapture};
use crate::sampler::{self, SampleResult};
use crate::settings::{RegionSettings, Settings};
use crate::sleep::{jittered, Sleeper};
use crate::types::*;

/// A region needs its key pressed when the healthy ratio is strictly below the threshold.
pub fn needs_action(ratio: f64, threshold: f64) -> bool {
    ratio < threshold
}

/// Status-line fragment for how long ago a key was last pressed.
pub fn last_press_label(last: Option<Instant>, now: Instant) -> String {
    match last {
        Some(t) => format!("last press {:.1}s ago", now.saturating_duration_since(t).as_secs_f64()),
        None => "never pressed".into(),
    }
}

/// Mutable state carried from one tick to the next.
#[derive(Debug, Default)]
pub struct MonitorState {
    pub phase: Phase,
    pub ticks: u64,
    pub last_action: HashMap<Resource, Instant>,
    pub debug: DebugCapture,
}

/// What a single tick observed and did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickReport {
    pub ratios: Vec<(Resource, f64)>,
    /// Resources whose key was pressed, in order
    pub actions: Vec<Resource>,
    /// A capture failed; nothing was dispatched
    pub skipped: bool,
    /// The stop flag was observed mid-tick
    pub interrupted: bool,
}

pub struct Monitor<'a> {
    settings: &'a Settings,
    state: MonitorState,
}

fn stopped(stop: &AtomicBool) -> bool {
    stop.load(Ordering::Acquire)
}

impl<'a> Monitor<'a> {
    pub fn new(settings: &'a Settings) -> Self {
        for region in &settings.regions {
            let color = match region.resource {
                Resource::Health => logger::COLOR_RED,
                Resource::Mana => logger::COLOR_BLUE,
            };
            logger::register_prefix(region.resource.as_str(), color);
        }
        Self { settings, state: MonitorState::default() }
    }

    pub fn state(&self) -> &MonitorState {
        &self.state
    }

    /// Sample every region, then press keys for those that need it.
    pub fn tick<P>(&mut self, platform: &mut P, sleeper: &mut dyn Sleeper, stop: &AtomicBool) -> TickReport
    where
        P: ScreenCapture + InputInjector + ?Sized,
    {
        let settings = self.settings;
        self.state.ticks += 1;
        let mut report = TickReport::default();

        let now = Instant::now();
        let save = settings.debug.enabled
            && self.state.debug.due(now, settings.debug_interval());

        self.state.phase = Phase::Sampling;
        let mut samples = Vec::with_capacity(settings.regions.len());
        for region in &settings.regions {
            if stopped(stop) {
                report.interrupted = true;
                self.state.phase = Phase::Idle;
                return report;
            }
            match sampler::sample_region(platform, region) {
                Ok(sample) => {
                    if save {
                        self.save_debug(&sample);
                    }
                    samples.push(sample);
                }
                Err(e) => {
                    logger::error_p(region.resource.as_str(), &format!("capture failed, skipping tick: {:#}", e));
                    report.skipped = true;
                    break;
                }
            }
        }
        if save {
            self.state.debug.mark_saved(now);
        }
        if report.skipped {
            self.state.phase = Phase::Idle;
            return report;
        }

        report.ratios = samples.iter().map(|s| (s.resource, s.ratio())).collect();
        if settings.status_every > 0 && self.state.ticks % settings.status_every == 0 {
            self.log_status(&samples);
        }

        self.state.phase = Phase::Acting;
        for (region, sample) in settings.regions.iter().zip(&samples) {
            if !needs_action(sample.ratio(), region.threshold) {
                continue;
            }
            // No key may go out once a stop was requested
            if stopped(stop) {
                report.interrupted = true;
                break;
            }
            if self.dispatch(platform, region, sample.ratio()) {
                report.actions.push(region.resource);
                let cooldown = jittered(settings.cooldown_for(region), settings.cooldown_jitter);
                sleeper.sleep(cooldown, stop);
            }
        }

        self.state.phase = Phase::Idle;
        report
    }

    /// Tick until `stop` is raised.
    pub fn run<P>(&mut self, platform: &mut P, sleeper: &mut dyn Sleeper, stop: &AtomicBool)
    where
        P: ScreenCapture + InputInjector + ?Sized,
    {
        logger::info(&format!(
            "monitoring {} region(s), poll {}ms, cooldown {}ms",
            self.settings.regions.len(),
            self.settings.poll_interval_ms,
            self.settings.cooldown_ms,
        ));

        while !stopped(stop) {
            let report = self.tick(platform, sleeper, stop);
            if report.interrupted {
                break;
            }
            if self.settings.skip_poll_after_action && !report.actions.is_empty() {
                continue;
            }
            sleeper.sleep(self.settings.poll_interval(), stop);
        }

        logger::info(&format!("monitor stopped after {} tick(s)", self.state.ticks));
    }

    fn dispatch<P>(&mut self, platform: &mut P, region: &RegionSettings, ratio: f64) -> bool
    where
        P: InputInjector + ?Sized,
    {
        let name = region.resource.as_str();
        match platform.tap(&region.key) {
            Ok(()) => {
                logger::info_p(name, &format!(
                    "ratio {:.2} below {:.2}, pressed {}",
                    ratio, region.threshold, region.key
                ));
                self.state.last_action.insert(region.resource, Instant::now());
                true
            }
            Err(e) => {
                logger::error_p(name, &format!("failed to press {}: {:#}", region.key, e));
                false
            }
        }
    }

    fn save_debug(&self, sample: &SampleResult) {
        let path = debug::screenshot_path(Path::new(&self.settings.debug.dir), sample.resource, Local::now());
        match debug::save_capture(&sample.capture, &path) {
            Ok(()) => logger::info_p(sample.resource.as_str(), &format!("saved {}", path.display())),
            Err(e) => logger::warn_p(sample.resource.as_str(), &format!("debug capture failed: {:#}", e)),
        }
    }

    fn log_status(&self, samples: &[SampleResult]) {
        let now = Instant::now();
        for (region, sample) in self.settings.regions.iter().zip(samples) {
            let last = self.state.last_action.get(&region.resource).copied();
            let stats = sample
                .in_range_stats()
                .map(|s| s.to_string())
                .unwrap_or_else(|| "no matching pixels".into());
            logger::info_p(region.resource.as_str(), &format!(
                "ratio {:.2} ({}/{}) | {} | {:?} {} | {}",
                sample.ratio(),
                sample.classification.matched,
                sample.classification.total,
                stats,
                region.color_space,
                region.ranges,
                last_press_label(last, now),
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::platform::stub::StubPlatform;

    #[derive(Default)]
    struct RecordingSleeper {
        sleeps: Vec<Duration>,
        stop_after: Option<usize>,
    }

    impl Sleeper for RecordingSleeper {
        fn sleep(&mut self, d: Duration, stop: &AtomicBool) {
            self.sleeps.push(d);
            if self.stop_after.is_some_and(|n| self.sleeps.len() >= n) {
                stop.store(true, Ordering::Release);
            }
        }
    }

    fn health_only() -> Settings {
        let mut settings = Settings::default();
        settings.regions.truncate(1);
        settings
    }

    #[test]
    fn test_needs_action_is_strict() {
        assert!(needs_action(0.29, 0.3));
        assert!(!needs_action(0.3, 0.3));
        assert!(!needs_action(0.31, 0.3));
        assert!(needs_action(0.0, 0.2));
        assert!(!needs_action(0.2, 0.2));
    }

    #[test]
    fn test_last_press_label() {
        let t0 = Instant::now();
        assert_eq!(last_press_label(None, t0), "never pressed");
        assert_eq!(last_press_label(Some(t0), t0 + Duration::from_millis(3200)), "last press 3.2s ago");
        // clock never runs backwards in the label
        assert_eq!(last_press_label(Some(t0 + Duration::from_secs(1)), t0), "last press 0.0s ago");
    }

    #[test]
    fn test_healthy_tick_presses_nothing() {
        let settings = health_only();
        let mut monitor = Monitor::new(&settings);
        let mut stub = StubPlatform::default().filled([200, 10, 10]);
        let mut sleeper = RecordingSleeper::default();
        let stop = AtomicBool::new(false);

        let report = monitor.tick(&mut stub, &mut sleeper, &stop);
        assert_eq!(report.ratios, vec![(Resource::Health, 1.0)]);
        assert!(report.actions.is_empty());
        assert!(stub.taps().is_empty());
        assert!(sleeper.sleeps.is_empty());
        assert_eq!(monitor.state().phase, Phase::Idle);
    }

    #[test]
    fn test_low_tick_presses_once_then_cools_down() {
        let settings = health_only();
        let mut monitor = Monitor::new(&settings);
        let mut stub = StubPlatform::default();
        let mut sleeper = RecordingSleeper::default();
        let stop = AtomicBool::new(false);

        let report = monitor.tick(&mut stub, &mut sleeper, &stop);
        assert_eq!(report.actions, vec![Resource::Health]);
        assert_eq!(stub.taps(), &["1".to_string()]);
        assert_eq!(sleeper.sleeps, vec![Duration::from_millis(1000)]);
        assert!(monitor.state().last_action.contains_key(&Resource::Health));
    }

    #[test]
    fn test_each_region_gets_its_own_cooldown() {
        let mut settings = Settings::default();
        settings.regions[1].cooldown_ms = Some(250);
        let mut monitor = Monitor::new(&settings);
        let mut stub = StubPlatform::default();
        let mut sleeper = RecordingSleeper::default();
        let stop = AtomicBool::new(false);

        let report = monitor.tick(&mut stub, &mut sleeper, &stop);
        assert_eq!(report.actions, vec![Resource::Health, Resource::Mana]);
        assert_eq!(stub.taps(), &["1".to_string(), "2".to_string()]);
        assert_eq!(sleeper.sleeps, vec![Duration::from_millis(1000), Duration::from_millis(250)]);
    }

    #[test]
    fn test_capture_failure_skips_tick() {
        let settings = Settings::default();
        let mut monitor = Monitor::new(&settings);
        let mut stub = StubPlatform::default();
        stub.set_fail_capture(true);
        let mut sleeper = RecordingSleeper::default();
        let stop = AtomicBool::new(false);

        let report = monitor.tick(&mut stub, &mut sleeper, &stop);
        assert!(report.skipped);
        assert!(report.ratios.is_empty());
        assert!(stub.taps().is_empty());

        stub.set_fail_capture(false);
        let report = monitor.tick(&mut stub, &mut sleeper, &stop);
        assert!(!report.skipped);
        assert_eq!(report.actions.len(), 2);
    }

    #[test]
    fn test_stop_during_cooldown_blocks_next_key() {
        let settings = Settings::default();
        let mut monitor = Monitor::new(&settings);
        let mut stub = StubPlatform::default();
        // Stop arrives while cooling down after the health key.
        let mut sleeper = RecordingSleeper { stop_after: Some(1), ..Default::default() };
        let stop = AtomicBool::new(false);

        let report = monitor.tick(&mut stub, &mut sleeper, &stop);
        assert!(report.interrupted);
        assert_eq!(stub.taps(), &["1".to_string()]);
    }

    #[test]
    fn test_run_sleeps_poll_interval_between_ticks() {
        let settings = health_only();
        let mut monitor = Monitor::new(&settings);
        let mut stub = StubPlatform::default().filled([200, 10, 10]);
        let mut sleeper = RecordingSleeper { stop_after: Some(3), ..Default::default() };
        let stop = AtomicBool::new(false);

        monitor.run(&mut stub, &mut sleeper, &stop);
        assert_eq!(monitor.state().ticks, 3);
        assert_eq!(sleeper.sleeps, vec![Duration::from_millis(500); 3]);
    }

    #[test]
    fn test_skip_poll_after_action_policy() {
        let mut settings = health_only();
        let mut stub = StubPlatform::default();
        let stop = AtomicBool::new(false);

        let mut sleeper = RecordingSleeper { stop_after: Some(4), ..Default::default() };
        Monitor::new(&settings).run(&mut stub, &mut sleeper, &stop);
        let cooldown = Duration::from_millis(1000);
        let poll = Duration::from_millis(500);
        assert_eq!(sleeper.sleeps, vec![cooldown, poll, cooldown, poll]);

        settings.skip_poll_after_action = true;
        stop.store(false, Ordering::Release);
        let mut sleeper = RecordingSleeper { stop_after: Some(3), ..Default::default() };
        Monitor::new(&settings).run(&mut stub, &mut sleeper, &stop);
        assert_eq!(sleeper.sleeps, vec![cooldown; 3]);
    }

    #[test]
    fn test_run_returns_at_once_when_already_stopped() {
        let settings = Settings::default();
        let mut monitor = Monitor::new(&settings);
        let mut stub = StubPlatform::default();
        let mut sleeper = RecordingSleeper::default();
        let stop = AtomicBool::new(true);

        monitor.run(&mut stub, &mut sleeper, &stop);
        assert_eq!(monitor.state().ticks, 0);
        assert!(stub.taps().is_empty());
    }
}
