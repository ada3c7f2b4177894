//! Churn driver: simulated live data for the sprite layer.
//!
//! Two independent periodic tasks mutate the sprite store:
//!
//! - **position jitter** (default every 1 s): each sprite moves by uniform
//!   noise in `[-move_factor/2, move_factor/2]` on each axis
//! - **style reassignment** (default every 10 s): each sprite gets a uniformly
//!   random code from the eligible set
//!
//! Both cadences run off the host's monotonic clock, not the render cadence.
//! Each task advances its deadline by whole periods, so a late poll never
//! shifts later deadlines.

use crate::store::SpriteStore;
use glam::DVec2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::Duration;

const MIN_PERIOD: Duration = Duration::from_millis(1);

/// A fixed-period timer polled with the host's elapsed time.
#[derive(Debug, Clone)]
pub struct PeriodicTask {
    period: Duration,
    next_due: Option<Duration>,
}

impl PeriodicTask {
    pub fn new(period: Duration) -> Self {
        Self {
            period: period.max(MIN_PERIOD),
            next_due: None,
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn next_due(&self) -> Option<Duration> {
        self.next_due
    }

    pub fn is_armed(&self) -> bool {
        self.next_due.is_some()
    }

    pub fn arm(&mut self, now: Duration) {
        self.next_due = Some(now + self.period);
    }

    pub fn cancel(&mut self) {
        self.next_due = None;
    }

    /// Returns true when the task fires. A host stalled for several periods
    /// gets one firing, re-anchored to the next boundary after `now`.
    pub fn poll(&mut self, now: Duration) -> bool {
        let Some(due) = self.next_due else {
            return false;
        };
        if now < due {
            return false;
        }
        let periods_behind = (now - due).as_nanos() / self.period.as_nanos();
        let advance = self.period.as_nanos() * (periods_behind + 1);
        self.next_due = Some(due + Duration::from_nanos(advance as u64));
        true
    }
}

#[derive(Debug, Clone)]
pub struct ChurnConfig {
    pub position_period: Duration,
    pub style_period: Duration,
    /// Full width of the jitter window; each axis moves by at most half of it.
    pub move_factor: f64,
    pub seed: Option<u64>,
}

impl Default for ChurnConfig {
    fn default() -> Self {
        Self {
            position_period: Duration::from_millis(1000),
            style_period: Duration::from_millis(10_000),
            move_factor: 5000.0,
            seed: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChurnTick {
    pub moved: bool,
    pub restyled: bool,
}

impl ChurnTick {
    pub fn changed(&self) -> bool {
        self.moved || self.restyled
    }
}

pub struct ChurnDriver {
    rng: StdRng,
    move_factor: f64,
    eligible_codes: Vec<String>,
    position_task: PeriodicTask,
    style_task: PeriodicTask,
    paused: bool,
    pub position_ticks: u64,
    pub style_ticks: u64,
}

impl ChurnDriver {
    pub fn new(config: &ChurnConfig, eligible_codes: Vec<String>) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        if eligible_codes.is_empty() {
            log::warn!("No eligible style codes; style churn is disabled");
        }
        Self {
            rng,
            move_factor: config.move_factor.max(0.0),
            eligible_codes,
            position_task: PeriodicTask::new(config.position_period),
            style_task: PeriodicTask::new(config.style_period),
            paused: false,
            position_ticks: 0,
            style_ticks: 0,
        }
    }

    pub fn start(&mut self, now: Duration) {
        self.position_task.arm(now);
        self.style_task.arm(now);
        log::info!(
            "Churn started: positions every {} ms, styles every {} ms",
            self.position_task.period().as_millis(),
            self.style_task.period().as_millis()
        );
    }

    /// Cancels both pending tasks.
    pub fn stop(&mut self) {
        if self.is_running() {
            log::info!("Churn stopped");
        }
        self.position_task.cancel();
        self.style_task.cancel();
    }

    pub fn is_running(&self) -> bool {
        self.position_task.is_armed() || self.style_task.is_armed()
    }

    /// Pausing suspends both deadlines; resuming re-arms a running driver
    /// one full period after `now`, so missed periods are not replayed.
    pub fn set_paused(&mut self, paused: bool, now: Duration) {
        if self.paused == paused {
            return;
        }
        self.paused = paused;
        if !paused && self.is_running() {
            self.position_task.arm(now);
            self.style_task.arm(now);
        }
        log::info!("Churn {}", if paused { "paused" } else { "resumed" });
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn eligible_codes(&self) -> &[String] {
        &self.eligible_codes
    }

    /// Earliest pending deadline, for hosts that sleep between frames.
    /// `None` while paused.
    pub fn next_due(&self) -> Option<Duration> {
        if self.paused {
            return None;
        }
        match (self.position_task.next_due(), self.style_task.next_due()) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    pub fn tick(&mut self, now: Duration, store: &mut SpriteStore) -> ChurnTick {
        let mut tick = ChurnTick::default();
        if self.paused {
            return tick;
        }
        if self.position_task.poll(now) {
            self.jitter_positions(store);
            self.position_ticks += 1;
            tick.moved = true;
        }
        if self.style_task.poll(now) && !self.eligible_codes.is_empty() {
            self.reassign_styles(store);
            self.style_ticks += 1;
            tick.restyled = true;
        }
        tick
    }

    fn jitter_positions(&mut self, store: &mut SpriteStore) {
        let half = self.move_factor * 0.5;
        for index in 0..store.len() {
            let delta = DVec2::new(
                self.rng.gen_range(-half..=half),
                self.rng.gen_range(-half..=half),
            );
            store.translate(index, delta);
        }
    }

    fn reassign_styles(&mut self, store: &mut SpriteStore) {
        for index in 0..store.len() {
            let pick = self.rng.gen_range(0..self.eligible_codes.len());
            store.set_style(index, self.eligible_codes[pick].as_str());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::SpriteEntity;

    fn store(count: usize) -> SpriteStore {
        SpriteStore::from_entities(
            (0..count)
                .map(|i| SpriteEntity {
                    id: i as u32,
                    position: DVec2::new(i as f64 * 10.0, -(i as f64)),
                    style_code: "initial".to_string(),
                })
                .collect(),
        )
    }

    fn seeded() -> ChurnConfig {
        ChurnConfig {
            seed: Some(42),
            ..ChurnConfig::default()
        }
    }

    fn codes() -> Vec<String> {
        vec!["S1".to_string(), "S2".to_string(), "S3".to_string()]
    }

    #[test]
    fn periodic_task_fires_on_whole_periods() {
        let mut task = PeriodicTask::new(Duration::from_millis(1000));
        assert!(!task.poll(Duration::from_millis(5000)));

        task.arm(Duration::from_millis(100));
        assert!(!task.poll(Duration::from_millis(1099)));
        assert!(task.poll(Duration::from_millis(1100)));
        assert!(!task.poll(Duration::from_millis(1100)));
        // A late poll does not push the following deadline back.
        assert!(task.poll(Duration::from_millis(2350)));
        assert_eq!(task.next_due(), Some(Duration::from_millis(3100)));
    }

    #[test]
    fn stalled_task_fires_once_and_reanchors() {
        let mut task = PeriodicTask::new(Duration::from_millis(1000));
        task.arm(Duration::ZERO);
        assert!(task.poll(Duration::from_millis(5500)));
        assert_eq!(task.next_due(), Some(Duration::from_millis(6000)));
        assert!(!task.poll(Duration::from_millis(5999)));
    }

    #[test]
    fn positions_move_within_jitter_bound_after_one_period() {
        let mut store = store(500);
        let before: Vec<DVec2> = store.iter().map(|e| e.position).collect();
        store.clear_dirty();

        let start = Duration::from_millis(12_345);
        let mut driver = ChurnDriver::new(&seeded(), codes());
        driver.start(start);

        let early = driver.tick(start + Duration::from_millis(999), &mut store);
        assert!(!early.changed());
        assert!(!store.is_dirty());

        let tick = driver.tick(start + Duration::from_millis(1000), &mut store);
        assert!(tick.moved);
        assert!(!tick.restyled);
        assert!(store.is_dirty());

        let bound = 2500.0;
        let mut any_moved = false;
        for (entity, old) in store.iter().zip(&before) {
            let delta = entity.position - *old;
            assert!(delta.x.abs() <= bound && delta.y.abs() <= bound);
            any_moved |= delta != DVec2::ZERO;
            assert_eq!(entity.style_code, "initial");
        }
        assert!(any_moved);
    }

    #[test]
    fn styles_come_from_eligible_set_after_style_period() {
        let mut store = store(300);
        let start = Duration::from_secs(3);
        let mut driver = ChurnDriver::new(&seeded(), codes());
        driver.start(start);

        let mut restyled = false;
        for ms in (0..=10_000).step_by(250) {
            let tick = driver.tick(start + Duration::from_millis(ms), &mut store);
            restyled |= tick.restyled;
        }

        assert!(restyled);
        assert_eq!(driver.style_ticks, 1);
        assert_eq!(driver.position_ticks, 10);
        let eligible = codes();
        assert!(store.iter().all(|e| eligible.contains(&e.style_code)));
    }

    #[test]
    fn same_seed_produces_same_positions() {
        let mut a = store(50);
        let mut b = store(50);
        let mut driver_a = ChurnDriver::new(&seeded(), codes());
        let mut driver_b = ChurnDriver::new(&seeded(), codes());
        driver_a.start(Duration::ZERO);
        driver_b.start(Duration::ZERO);

        driver_a.tick(Duration::from_secs(10), &mut a);
        driver_b.tick(Duration::from_secs(10), &mut b);
        assert_eq!(a.entities(), b.entities());
    }

    #[test]
    fn stop_cancels_pending_tasks() {
        let mut store = store(10);
        let mut driver = ChurnDriver::new(&seeded(), codes());
        driver.start(Duration::ZERO);
        assert!(driver.is_running());

        driver.stop();
        assert!(!driver.is_running());
        assert_eq!(driver.next_due(), None);
        assert!(!driver.tick(Duration::from_secs(60), &mut store).changed());
    }

    #[test]
    fn paused_driver_leaves_store_untouched() {
        let mut store = store(10);
        store.clear_dirty();
        let mut driver = ChurnDriver::new(&seeded(), codes());
        driver.start(Duration::ZERO);
        driver.set_paused(true, Duration::ZERO);

        assert!(!driver.tick(Duration::from_secs(20), &mut store).changed());
        assert!(!store.is_dirty());

        driver.set_paused(false, Duration::from_secs(20));
        assert!(!driver.tick(Duration::from_secs(20), &mut store).changed());
        let tick = driver.tick(Duration::from_secs(21), &mut store);
        assert!(tick.moved && !tick.restyled);
        let tick = driver.tick(Duration::from_secs(30), &mut store);
        assert!(tick.restyled);
    }

    #[test]
    fn paused_driver_has_no_deadline_and_resume_reanchors() {
        let mut store = store(3);
        let mut driver = ChurnDriver::new(&seeded(), codes());
        driver.start(Duration::ZERO);
        driver.set_paused(true, Duration::from_millis(500));

        driver.tick(Duration::from_secs(5), &mut store);
        assert_eq!(driver.next_due(), None);
        assert!(driver.is_running());

        let now = Duration::from_secs(5);
        driver.set_paused(false, now);
        let due = driver.next_due().expect("resumed driver has a deadline");
        assert!(due > now);
        assert_eq!(due, now + Duration::from_secs(1));
    }

    #[test]
    fn resuming_a_stopped_driver_stays_stopped() {
        let mut driver = ChurnDriver::new(&seeded(), codes());
        driver.set_paused(true, Duration::ZERO);
        driver.set_paused(false, Duration::from_secs(1));
        assert!(!driver.is_running());
        assert_eq!(driver.next_due(), None);
    }

    #[test]
    fn empty_eligible_set_disables_restyling_only() {
        let mut store = store(10);
        let mut driver = ChurnDriver::new(&seeded(), Vec::new());
        driver.start(Duration::ZERO);

        let tick = driver.tick(Duration::from_secs(10), &mut store);
        assert!(tick.moved);
        assert!(!tick.restyled);
        assert!(store.iter().all(|e| e.style_code == "initial"));
    }

    #[test]
    fn next_due_reports_earliest_deadline() {
        let mut driver = ChurnDriver::new(&seeded(), codes());
        driver.start(Duration::from_millis(500));
        assert_eq!(driver.next_due(), Some(Duration::from_millis(1500)));
    }
}
