// Accumulating start/stop timer for refresh diagnostics.
// Times are caller-supplied milliseconds so it works with any clock.

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Stopwatch {
    started_at: Option<u64>,
    elapsed_ms: u64,
    events: u32,
}

impl Stopwatch {
    pub const fn new() -> Self {
        Self {
            started_at: None,
            elapsed_ms: 0,
            events: 0,
        }
    }

    pub fn start(&mut self, now_ms: u64) {
        self.started_at = Some(now_ms);
    }

    /// Adds the interval since `start` and returns it. A stop without a
    /// matching start is ignored.
    pub fn stop(&mut self, now_ms: u64) -> u64 {
        let Some(t0) = self.started_at.take() else {
            return 0;
        };
        let dt = now_ms.saturating_sub(t0);
        self.elapsed_ms += dt;
        self.events += 1;
        dt
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.elapsed_ms
    }

    pub fn events(&self) -> u32 {
        self.events
    }

    pub fn average_ms(&self) -> u64 {
        if self.events == 0 {
            0
        } else {
            self.elapsed_ms / self.events as u64
        }
    }
}
