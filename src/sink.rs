//! Property access boundary.
//!
//! Targets are opaque to the core: a small string key that the host resolves
//! however it likes. All reads and writes of animated properties go through
//! the [`PropertySink`] capability, which keeps the core headless and makes
//! a recording test double trivial.

use std::cell::RefCell;
use std::rc::Rc;

use hashbrown::HashMap;

use crate::error::AnimationError;
use crate::value::PropertyValue;

/// Opaque target handle (small string key).
pub type TargetId = String;

/// Capability for reading and writing a target's animatable properties.
///
/// Implementations report a gone target with
/// [`AnimationError::TargetUnavailable`]; the engine treats that as a
/// retirement signal for the affected animation, not a fatal error.
pub trait PropertySink {
    fn get(&self, target: &str, property: &str) -> Result<PropertyValue, AnimationError>;

    fn set(
        &mut self,
        target: &str,
        property: &str,
        value: PropertyValue,
    ) -> Result<(), AnimationError>;
}

/// In-memory sink that records writes, for headless hosts and tests.
#[derive(Debug, Default, Clone)]
pub struct MemorySink {
    values: HashMap<(String, String), PropertyValue>,
    retired: Vec<String>,
    writes: u64,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a property value so later `get` calls can resolve it.
    pub fn insert(&mut self, target: &str, property: &str, value: PropertyValue) {
        self.values
            .insert((target.to_string(), property.to_string()), value);
    }

    /// Mark a target as gone; subsequent access reports `TargetUnavailable`.
    pub fn retire_target(&mut self, target: &str) {
        self.retired.push(target.to_string());
    }

    /// Last written value for a property, if any.
    pub fn value(&self, target: &str, property: &str) -> Option<&PropertyValue> {
        self.values
            .get(&(target.to_string(), property.to_string()))
    }

    /// Total number of writes accepted.
    pub fn write_count(&self) -> u64 {
        self.writes
    }

    fn check_live(&self, target: &str) -> Result<(), AnimationError> {
        if self.retired.iter().any(|t| t == target) {
            return Err(AnimationError::TargetUnavailable {
                target: target.to_string(),
            });
        }
        Ok(())
    }
}

impl PropertySink for MemorySink {
    fn get(&self, target: &str, property: &str) -> Result<PropertyValue, AnimationError> {
        self.check_live(target)?;
        self.values
            .get(&(target.to_string(), property.to_string()))
            .cloned()
            .ok_or_else(|| AnimationError::NotFound {
                id: format!("{target}.{property}"),
            })
    }

    fn set(
        &mut self,
        target: &str,
        property: &str,
        value: PropertyValue,
    ) -> Result<(), AnimationError> {
        self.check_live(target)?;
        self.writes += 1;
        self.values
            .insert((target.to_string(), property.to_string()), value);
        Ok(())
    }
}

/// A [`MemorySink`] behind a shared handle, so a host (or test) can keep
/// inspecting recorded values after handing the sink to an engine. Cloning
/// shares the same storage.
#[derive(Clone, Debug, Default)]
pub struct SharedSink(Rc<RefCell<MemorySink>>);

impl SharedSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a property value so later `get` calls can resolve it.
    pub fn insert(&self, target: &str, property: &str, value: PropertyValue) {
        self.0.borrow_mut().insert(target, property, value);
    }

    /// Mark a target as gone; subsequent access reports `TargetUnavailable`.
    pub fn retire_target(&self, target: &str) {
        self.0.borrow_mut().retire_target(target);
    }

    /// Last written value for a property, if any.
    pub fn value(&self, target: &str, property: &str) -> Option<PropertyValue> {
        self.0.borrow().value(target, property).cloned()
    }

    /// Total number of writes accepted.
    pub fn write_count(&self) -> u64 {
        self.0.borrow().write_count()
    }
}

impl PropertySink for SharedSink {
    fn get(&self, target: &str, property: &str) -> Result<PropertyValue, AnimationError> {
        self.0.borrow().get(target, property)
    }

    fn set(
        &mut self,
        target: &str,
        property: &str,
        value: PropertyValue,
    ) -> Result<(), AnimationError> {
        self.0.borrow_mut().set(target, property, value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shared_sink_clones_share_storage() {
        let sink = SharedSink::new();
        let mut clone = sink.clone();
        clone.set("box", "x", PropertyValue::number(3.0)).unwrap();
        assert_eq!(sink.value("box", "x"), Some(PropertyValue::number(3.0)));
        assert_eq!(sink.write_count(), 1);
    }

    #[test]
    fn records_writes_and_reads_back() {
        let mut sink = MemorySink::new();
        sink.set("box", "x", PropertyValue::number(5.0)).unwrap();
        assert_eq!(sink.value("box", "x"), Some(&PropertyValue::number(5.0)));
        assert_eq!(sink.write_count(), 1);
        assert_eq!(sink.get("box", "x").unwrap(), PropertyValue::number(5.0));
    }

    #[test]
    fn missing_property_is_not_found() {
        let sink = MemorySink::new();
        assert!(matches!(
            sink.get("box", "x"),
            Err(AnimationError::NotFound { .. })
        ));
    }

    #[test]
    fn retired_target_is_unavailable() {
        let mut sink = MemorySink::new();
        sink.insert("box", "x", PropertyValue::number(1.0));
        sink.retire_target("box");
        assert!(matches!(
            sink.get("box", "x"),
            Err(AnimationError::TargetUnavailable { .. })
        ));
        assert!(matches!(
            sink.set("box", "x", PropertyValue::number(2.0)),
            Err(AnimationError::TargetUnavailable { .. })
        ));
    }
}
