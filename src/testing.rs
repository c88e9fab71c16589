//! Mock handlers shared by the unit tests.

use crate::handler::Handler;
use anyhow::{bail, Result};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// A configurable handler for exercising the registry and controller.
pub struct MockHandler {
    name: String,
    output: String,
    suggestions: Vec<String>,
    delay: Option<Duration>,
    fail_execute: bool,
    fail_complete: bool,
    panic_execute: bool,
    panic_complete: bool,
    calls: Arc<AtomicUsize>,
}

impl MockHandler {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            output: format!("{name} ok"),
            suggestions: Vec::new(),
            delay: None,
            fail_execute: false,
            fail_complete: false,
            panic_execute: false,
            panic_complete: false,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn with_output(mut self, output: &str) -> Self {
        self.output = output.to_string();
        self
    }

    pub fn with_suggestions(mut self, suggestions: &[&str]) -> Self {
        self.suggestions = suggestions.iter().map(|s| s.to_string()).collect();
        self
    }

    /// Block the executing thread for `delay` before returning.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn failing(mut self) -> Self {
        self.fail_execute = true;
        self
    }

    pub fn failing_completion(mut self) -> Self {
        self.fail_complete = true;
        self
    }

    pub fn panicking(mut self) -> Self {
        self.panic_execute = true;
        self
    }

    pub fn panicking_completion(mut self) -> Self {
        self.panic_complete = true;
        self
    }

    /// Counter of `execute` calls, shared with the handler.
    pub fn call_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }
}

impl Handler for MockHandler {
    fn name(&self) -> &str {
        &self.name
    }

    fn execute(&self, args: &[String]) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }
        if self.panic_execute {
            panic!("{} exploded", self.name);
        }
        if self.fail_execute {
            bail!("{} refused to run", self.name);
        }
        if args.is_empty() {
            Ok(self.output.clone())
        } else {
            Ok(format!("{} {}", self.output, args.join(" ")))
        }
    }

    fn complete(&self, _prefix: &str) -> Result<Vec<String>> {
        if self.panic_complete {
            panic!("{} completion exploded", self.name);
        }
        if self.fail_complete {
            bail!("{} cannot complete", self.name);
        }
        Ok(self.suggestions.clone())
    }
}

/// Records how many `execute` calls overlap.
pub struct ConcurrencyGauge {
    name: String,
    hold: Duration,
    running: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
}

impl ConcurrencyGauge {
    /// Gauges sharing `running` and `peak` count towards the same total.
    pub fn new(name: &str, hold: Duration, running: Arc<AtomicUsize>, peak: Arc<AtomicUsize>) -> Self {
        Self {
            name: name.to_string(),
            hold,
            running,
            peak,
        }
    }
}

impl Handler for ConcurrencyGauge {
    fn name(&self) -> &str {
        &self.name
    }

    fn execute(&self, _args: &[String]) -> Result<String> {
        let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        std::thread::sleep(self.hold);
        self.running.fetch_sub(1, Ordering::SeqCst);
        Ok(format!("{} done", self.name))
    }
}
