//! Bounded, insertion-ordered tool registry (`spec.md` §3: "registry of
//! bounded size (≤64)... registry ordering is insertion order").

use std::collections::HashMap;
use std::fmt::Write as _;

use crate::error::AgentError;

use super::descriptor::ToolDescriptor;

pub struct ToolRegistry {
    capacity: usize,
    order: Vec<String>,
    by_name: HashMap<String, ToolDescriptor>,
}

impl ToolRegistry {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            order: Vec::new(),
            by_name: HashMap::new(),
        }
    }

    /// Adds a tool. Fails if the name is a duplicate or the registry is
    /// full. Must only be called during initialisation (`spec.md` §4.1).
    pub fn register(&mut self, descriptor: ToolDescriptor) -> Result<(), AgentError> {
        if self.by_name.contains_key(&descriptor.name) {
            return Err(AgentError::Internal(format!(
                "tool '{}' is already registered",
                descriptor.name
            )));
        }
        if self.order.len() >= self.capacity {
            return Err(AgentError::Internal(
                "tool registry is at capacity".to_string(),
            ));
        }
        self.order.push(descriptor.name.clone());
        self.by_name.insert(descriptor.name.clone(), descriptor);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&ToolDescriptor> {
        self.by_name.get(name)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Human-visible catalog used by the prompt assembler (`spec.md` §6:
    /// "a line of the form `- <name>: <description>`").
    pub fn list_descriptions(&self) -> String {
        let mut out = String::new();
        for name in &self.order {
            if let Some(descriptor) = self.by_name.get(name) {
                let _ = writeln!(out, "- {}: {}", descriptor.name, descriptor.description);
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::context::ExecutionContext;
    use async_trait::async_trait;
    use std::sync::Arc;

    struct NoopHandler;

    #[async_trait]
    impl super::super::descriptor::ToolHandler for NoopHandler {
        async fn call(&self, _input: &str, _ctx: &ExecutionContext) -> Result<String, AgentError> {
            Ok(String::new())
        }
    }

    fn descriptor(name: &str) -> ToolDescriptor {
        ToolDescriptor::new(
            name,
            "a test tool",
            super::super::descriptor::ToolKind::Read,
            false,
            1024,
            Arc::new(NoopHandler),
        )
    }

    #[test]
    fn registers_and_preserves_insertion_order() {
        let mut registry = ToolRegistry::new(64);
        registry.register(descriptor("b_tool")).unwrap();
        registry.register(descriptor("a_tool")).unwrap();
        let catalog = registry.list_descriptions();
        assert!(catalog.find("b_tool").unwrap() < catalog.find("a_tool").unwrap());
    }

    #[test]
    fn duplicate_name_is_rejected() {
        let mut registry = ToolRegistry::new(64);
        registry.register(descriptor("tool")).unwrap();
        assert!(registry.register(descriptor("tool")).is_err());
    }

    #[test]
    fn registry_rejects_beyond_capacity() {
        let mut registry = ToolRegistry::new(1);
        registry.register(descriptor("first")).unwrap();
        assert!(registry.register(descriptor("second")).is_err());
    }
}
