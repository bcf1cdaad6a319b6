//! Namespaced tool names and tool specs advertised by backends

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ToolNameError;

/// Separator between backend name and tool name in the merged registry.
pub const TOOL_NAME_DELIMITER: &str = "::";

/// A tool identifier qualified by its owning backend: `<backend>::<tool>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NamespacedToolName {
    backend: String,
    tool: String,
}

impl NamespacedToolName {
    /// Qualify `tool` with `backend`.
    ///
    /// Fails when either part is empty, contains the delimiter, or has a
    /// colon next to it (`a:` + `x` encodes to `a:::x`), since the encoded
    /// form could not be parsed back into the same parts.
    pub fn create(backend: &str, tool: &str) -> Result<Self, ToolNameError> {
        validate_backend_name(backend)?;
        validate_tool_name(tool)?;
        Ok(Self {
            backend: backend.to_string(),
            tool: tool.to_string(),
        })
    }

    /// Split an encoded name. The delimiter must occur exactly once.
    pub fn parse(name: &str) -> Result<Self, ToolNameError> {
        let occurrences = name.matches(TOOL_NAME_DELIMITER).count();
        if occurrences != 1 {
            return Err(ToolNameError::DelimiterCount {
                name: name.to_string(),
                found: occurrences,
            });
        }

        let (backend, tool) = name
            .split_once(TOOL_NAME_DELIMITER)
            .ok_or_else(|| ToolNameError::DelimiterCount {
                name: name.to_string(),
                found: 0,
            })?;

        if backend.is_empty() || tool.is_empty() {
            return Err(ToolNameError::EmptyPart {
                name: name.to_string(),
            });
        }

        Ok(Self {
            backend: backend.to_string(),
            tool: tool.to_string(),
        })
    }

    pub fn backend(&self) -> &str {
        &self.backend
    }

    pub fn tool(&self) -> &str {
        &self.tool
    }

    pub fn into_parts(self) -> (String, String) {
        (self.backend, self.tool)
    }
}

impl fmt::Display for NamespacedToolName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.backend, TOOL_NAME_DELIMITER, self.tool)
    }
}

/// Check that a backend name can be used as a namespace.
pub fn validate_backend_name(name: &str) -> Result<(), ToolNameError> {
    validate_part(name, "backend")?;
    if name.ends_with(':') {
        return Err(ToolNameError::AdjacentColon {
            kind: "backend",
            value: name.to_string(),
        });
    }
    Ok(())
}

/// Check that a backend tool name can be qualified without ambiguity.
pub fn validate_tool_name(name: &str) -> Result<(), ToolNameError> {
    validate_part(name, "tool")?;
    if name.starts_with(':') {
        return Err(ToolNameError::AdjacentColon {
            kind: "tool",
            value: name.to_string(),
        });
    }
    Ok(())
}

fn validate_part(part: &str, kind: &'static str) -> Result<(), ToolNameError> {
    if part.is_empty() {
        return Err(ToolNameError::EmptyPart {
            name: part.to_string(),
        });
    }
    if part.contains(TOOL_NAME_DELIMITER) {
        return Err(ToolNameError::ContainsDelimiter {
            kind,
            value: part.to_string(),
        });
    }
    Ok(())
}

/// A tool as advertised by a backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

impl ToolSpec {
    /// Build a spec from a raw tool descriptor.
    ///
    /// Returns `None` when the name, description or input schema is missing
    /// (or the wrong JSON type), so malformed tools never reach the registry.
    pub fn from_descriptor(descriptor: &Value) -> Option<Self> {
        let name = descriptor.get("name")?.as_str()?;
        if name.is_empty() {
            return None;
        }
        let description = descriptor.get("description")?.as_str()?;
        let input_schema = descriptor.get("inputSchema")?;
        if !input_schema.is_object() {
            return None;
        }

        Some(Self {
            name: name.to_string(),
            description: description.to_string(),
            input_schema: input_schema.clone(),
        })
    }

    /// Copy of this spec with its name qualified by `backend`.
    pub fn namespaced(&self, backend: &str) -> Result<Self, ToolNameError> {
        let name = NamespacedToolName::create(backend, &self.name)?;
        Ok(Self {
            name: name.to_string(),
            description: self.description.clone(),
            input_schema: self.input_schema.clone(),
        })
    }
}
