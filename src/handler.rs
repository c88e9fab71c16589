//! The handler contract.
//!
//! A handler is the only extension point of the controller: anything that can
//! run with positional arguments, suggest completions for partial input and
//! report a stable name can be registered.

use anyhow::Result;

pub trait Handler: Send + Sync {
    /// Name the handler is registered and dispatched under.
    fn name(&self) -> &str;

    /// Run the command. May block or take arbitrarily long; the controller
    /// always calls this off the dispatching thread.
    fn execute(&self, args: &[String]) -> Result<String>;

    /// Suggest completions for the text typed so far. Must be fast.
    ///
    /// The default suggests the handler's own name when it extends `prefix`.
    fn complete(&self, prefix: &str) -> Result<Vec<String>> {
        if self.name().starts_with(prefix) {
            Ok(vec![self.name().to_string()])
        } else {
            Ok(Vec::new())
        }
    }
}
