//! Handlers registered by the `cmdctl` binary.

use crate::handler::Handler;
use crate::registry::Registry;
use anyhow::{anyhow, bail, Context, Result};
use std::sync::{Arc, Weak};
use std::time::Duration;

/// Register every built-in handler.
pub fn register_all(registry: &Arc<Registry>) -> crate::error::Result<()> {
    registry.register(EchoCommand)?;
    registry.register(SleepCommand)?;
    registry.register(HelpCommand::new(registry))?;
    Ok(())
}

/// Prints its arguments back.
pub struct EchoCommand;

impl Handler for EchoCommand {
    fn name(&self) -> &str {
        "echo"
    }

    fn execute(&self, args: &[String]) -> Result<String> {
        Ok(args.join(" "))
    }
}

/// Blocks for the given duration. Accepts bare seconds or humantime (`1m 30s`).
pub struct SleepCommand;

const SLEEP_SUGGESTIONS: &[&str] = &["1s", "5s", "30s", "1m"];

impl Handler for SleepCommand {
    fn name(&self) -> &str {
        "sleep"
    }

    fn execute(&self, args: &[String]) -> Result<String> {
        if args.is_empty() {
            bail!("usage: sleep <duration>");
        }
        let spec = args.join(" ");
        let duration = parse_duration(&spec)?;
        std::thread::sleep(duration);
        Ok(format!("slept {}", humantime::format_duration(duration)))
    }

    fn complete(&self, prefix: &str) -> Result<Vec<String>> {
        if let Some(rest) = prefix.strip_prefix("sleep ") {
            return Ok(SLEEP_SUGGESTIONS
                .iter()
                .filter(|d| d.starts_with(rest.trim_start()))
                .map(|d| format!("sleep {d}"))
                .collect());
        }
        if self.name().starts_with(prefix) {
            Ok(vec![self.name().to_string()])
        } else {
            Ok(Vec::new())
        }
    }
}

fn parse_duration(spec: &str) -> Result<Duration> {
    if let Ok(secs) = spec.parse::<u64>() {
        return Ok(Duration::from_secs(secs));
    }
    humantime::parse_duration(spec).with_context(|| format!("invalid duration `{spec}`"))
}

/// Lists the registered commands.
pub struct HelpCommand {
    registry: Weak<Registry>,
}

impl HelpCommand {
    pub fn new(registry: &Arc<Registry>) -> Self {
        Self {
            registry: Arc::downgrade(registry),
        }
    }
}

impl Handler for HelpCommand {
    fn name(&self) -> &str {
        "help"
    }

    fn execute(&self, _args: &[String]) -> Result<String> {
        let registry = self
            .registry
            .upgrade()
            .ok_or_else(|| anyhow!("registry is no longer available"))?;
        Ok(format!("Available commands:\n  {}", registry.names().join("\n  ")))
    }
}
