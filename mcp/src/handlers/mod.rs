//! Built-in tools
//!
//! `calculator` is always available; `web_search` needs an API key for the
//! completion proxy and is only registered when one is supplied.

pub mod calculator;
pub mod web_search;

pub use calculator::CalculatorTool;
pub use web_search::WebSearchTool;

use crate::error::Result;
use crate::server::ToolRegistry;
use std::sync::Arc;

/// Registry holding the enabled built-in tools, calculator first.
pub fn builtin_registry(
    calculator: bool,
    web_search: Option<WebSearchTool>,
) -> Result<ToolRegistry> {
    let mut registry = ToolRegistry::new();
    if calculator {
        registry.register(Arc::new(CalculatorTool))?;
    }
    if let Some(tool) = web_search {
        registry.register(Arc::new(tool))?;
    }
    Ok(registry)
}
