//! Begin/complete logging around one operation
//!
//! A scope logs its begin event on creation, and exactly one of its
//! complete or failed events afterwards. A scope dropped without either
//! (a panic, an early `?` return) logs the failed event at WARN.

use std::time::Instant;

use super::events::Event;
use super::logger::{Logger, Severity};

pub struct ObservationScope {
    complete: Event,
    failed: Event,
    fields: Vec<(&'static str, String)>,
    enabled: bool,
    finished: bool,
    timer: Timer,
}

impl ObservationScope {
    /// Logs `begin` with `fields`. The fields are repeated on the closing line.
    pub fn begin(
        begin: Event,
        complete: Event,
        failed: Event,
        fields: Vec<(&'static str, String)>,
        enabled: bool,
    ) -> Self {
        let scope = Self {
            complete,
            failed,
            fields,
            enabled,
            finished: false,
            timer: Timer::new(),
        };
        scope.emit(Severity::Info, begin, &[]);
        scope
    }

    fn emit(&self, severity: Severity, event: Event, extra: &[(&str, &str)]) {
        if !self.enabled {
            return;
        }
        let mut all: Vec<(&str, &str)> = self.fields.iter().map(|(k, v)| (*k, v.as_str())).collect();
        all.extend_from_slice(extra);
        Logger::log(severity, event.as_str(), &all);
    }

    /// Logs the complete event with the elapsed time and `extra` fields.
    pub fn complete(mut self, extra: &[(&str, &str)]) {
        self.finished = true;
        let elapsed = self.timer.elapsed_ms().to_string();
        let mut all = vec![("elapsed_ms", elapsed.as_str())];
        all.extend_from_slice(extra);
        self.emit(Severity::Info, self.complete, &all);
    }

    pub fn fail(mut self, reason: &str) {
        self.finished = true;
        self.emit(Severity::Error, self.failed, &[("reason", reason)]);
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }
}

impl Drop for ObservationScope {
    fn drop(&mut self) {
        if !self.finished {
            self.emit(Severity::Warn, self.failed, &[("reason", "scope dropped without completion")]);
        }
    }
}

/// Wall-clock timer for `elapsed_ms` fields
#[derive(Debug, Clone, Copy)]
pub struct Timer {
    start: Instant,
}

impl Timer {
    pub fn new() -> Self {
        Self { start: Instant::now() }
    }

    pub fn elapsed_ms(&self) -> u128 {
        self.start.elapsed().as_millis()
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sort_scope(enabled: bool) -> ObservationScope {
        ObservationScope::begin(
            Event::SortBegin,
            Event::SortComplete,
            Event::SortFailed,
            vec![("pairs", "3".to_string())],
            enabled,
        )
    }

    #[test]
    fn test_complete_and_fail_consume_scope() {
        sort_scope(true).complete(&[("comparisons", "2")]);
        sort_scope(true).fail("malformed key");
    }

    #[test]
    fn test_disabled_scope_is_silent() {
        let scope = sort_scope(false);
        assert!(!scope.is_enabled());
        drop(scope);
    }

    #[test]
    fn test_timer_measures() {
        let timer = Timer::new();
        std::thread::sleep(std::time::Duration::from_millis(5));
        assert!(timer.elapsed_ms() >= 5);
    }
}
