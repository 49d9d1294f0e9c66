use std::time::{Duration, Instant};

/// Monotonic experiment clock.
pub trait Timer {
    /// Nanoseconds since the clock was started.
    fn now(&self) -> u64;

    fn elapsed(&self, ts: u64) -> Duration {
        Duration::from_nanos(self.now().saturating_sub(ts))
    }

    /// Seconds since the clock was started; the unit of every stored timestamp.
    fn now_secs(&self) -> f64 {
        self.now() as f64 / 1e9
    }

    fn sleep(&self, d: Duration);
    fn record_frame(&mut self, d: Duration);
    fn calibration_stats(&self) -> CalibrationStats;
}

#[derive(Debug, Clone, Default)]
pub struct CalibrationStats {
    pub average_frame_time_ns: f64,
    pub jitter_ns: f64,
    pub min_frame_time_ns: f64,
    pub max_frame_time_ns: f64,
    pub effective_fps: f64,
}

impl CalibrationStats {
    pub fn from_frame_times(frame_times: &[Duration]) -> Self {
        if frame_times.is_empty() {
            return Self::default();
        }
        let times: Vec<f64> = frame_times.iter().map(|d| d.as_nanos() as f64).collect();
        let avg = times.iter().sum::<f64>() / times.len() as f64;
        let var = times.iter().map(|x| (x - avg).powi(2)).sum::<f64>() / times.len() as f64;
        let min = times.iter().copied().fold(f64::INFINITY, f64::min);
        let max = times.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        CalibrationStats {
            average_frame_time_ns: avg,
            jitter_ns: var.sqrt(),
            min_frame_time_ns: min,
            max_frame_time_ns: max,
            effective_fps: if avg > 0.0 { 1e9 / avg } else { 0.0 },
        }
    }

    /// Refresh rate rounded to whole hertz, as frame counts are derived from it.
    pub fn rounded_fps(&self) -> Option<f64> {
        let fps = self.effective_fps.round();
        (fps > 0.0).then_some(fps)
    }
}

#[derive(Debug, Clone)]
pub struct HighPrecisionTimer {
    pub start: Instant,
    pub frame_times: Vec<Duration>,
    pub max_samples: usize,
}

impl Timer for HighPrecisionTimer {
    fn now(&self) -> u64 {
        self.start.elapsed().as_nanos() as u64
    }
    fn sleep(&self, d: Duration) {
        self.high_precision_sleep(d)
    }
    fn record_frame(&mut self, d: Duration) {
        if self.frame_times.len() >= self.max_samples {
            self.frame_times.remove(0);
        }
        self.frame_times.push(d);
    }
    fn calibration_stats(&self) -> CalibrationStats {
        CalibrationStats::from_frame_times(&self.frame_times)
    }
}

impl HighPrecisionTimer {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
            frame_times: Vec::with_capacity(1000),
            max_samples: 1000,
        }
    }

    pub fn high_precision_sleep(&self, duration: Duration) {
        #[cfg(target_os = "linux")]
        self.linux_sleep(duration);
        #[cfg(not(target_os = "linux"))]
        std::thread::sleep(duration);
    }

    /// Sleeps until an absolute monotonic deadline, so a signal that
    /// interrupts the wait only resumes it.
    #[cfg(target_os = "linux")]
    fn linux_sleep(&self, duration: Duration) {
        use libc::{clock_gettime, clock_nanosleep, timespec, CLOCK_MONOTONIC, EINTR, TIMER_ABSTIME};

        let mut now = timespec {
            tv_sec: 0,
            tv_nsec: 0,
        };
        if unsafe { clock_gettime(CLOCK_MONOTONIC, &mut now) } != 0 {
            std::thread::sleep(duration);
            return;
        }
        let deadline = deadline_after(now, duration);

        loop {
            let rc = unsafe {
                clock_nanosleep(CLOCK_MONOTONIC, TIMER_ABSTIME, &deadline, std::ptr::null_mut())
            };
            if rc != EINTR {
                break;
            }
        }
    }
}

#[cfg(target_os = "linux")]
fn deadline_after(now: libc::timespec, duration: Duration) -> libc::timespec {
    let nanos = now.tv_nsec as u64 + u64::from(duration.subsec_nanos());
    libc::timespec {
        tv_sec: now.tv_sec
            + duration.as_secs() as libc::time_t
            + (nanos / 1_000_000_000) as libc::time_t,
        tv_nsec: (nanos % 1_000_000_000) as libc::c_long,
    }
}

impl Default for HighPrecisionTimer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stats_from_steady_sixty_hertz() {
        let frames = vec![Duration::from_nanos(16_666_667); 120];
        let stats = CalibrationStats::from_frame_times(&frames);
        assert!(stats.jitter_ns < 1.0);
        assert_eq!(stats.rounded_fps(), Some(60.0));
    }

    #[test]
    fn empty_calibration_has_no_rate() {
        assert_eq!(CalibrationStats::from_frame_times(&[]).rounded_fps(), None);
    }

    #[test]
    fn frame_buffer_is_bounded() {
        let mut timer = HighPrecisionTimer::new();
        timer.max_samples = 3;
        for ms in 1..=5 {
            timer.record_frame(Duration::from_millis(ms));
        }
        assert_eq!(
            timer.frame_times,
            vec![
                Duration::from_millis(3),
                Duration::from_millis(4),
                Duration::from_millis(5)
            ]
        );
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn deadline_carries_nanoseconds_into_seconds() {
        let now = libc::timespec {
            tv_sec: 10,
            tv_nsec: 900_000_000,
        };
        let deadline = deadline_after(now, Duration::from_millis(250));
        assert_eq!(deadline.tv_sec, 11);
        assert_eq!(deadline.tv_nsec, 150_000_000);
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn interrupted_sleep_lasts_the_full_duration() {
        extern "C" fn ignore(_: libc::c_int) {}
        let handler = ignore as extern "C" fn(libc::c_int);
        unsafe {
            libc::signal(libc::SIGUSR1, handler as libc::sighandler_t);
        }

        let (tx, rx) = std::sync::mpsc::channel();
        let sleeper = std::thread::spawn(move || {
            tx.send(unsafe { libc::pthread_self() }).unwrap();
            let timer = HighPrecisionTimer::new();
            timer.sleep(Duration::from_millis(50));
            timer.now()
        });
        let thread = rx.recv().unwrap();
        std::thread::sleep(Duration::from_millis(10));
        unsafe {
            libc::pthread_kill(thread, libc::SIGUSR1);
        }
        assert!(sleeper.join().unwrap() >= 50_000_000);
    }

    #[test]
    fn clock_is_monotonic_across_sleep() {
        let timer = HighPrecisionTimer::new();
        let before = timer.now();
        timer.sleep(Duration::from_millis(2));
        assert!(timer.elapsed(before) >= Duration::from_millis(2));
    }
}
