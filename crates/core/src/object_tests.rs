// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

struct Plain;
impl Object for Plain {}

struct Runnable;
impl Object for Runnable {
    fn as_procedure(&self) -> Option<&dyn Procedure> {
        Some(self)
    }
}
impl Procedure for Runnable {
    fn run(&self, _ctx: &Arc<ObjectRegistry>) -> Result<(), BoxError> {
        Ok(())
    }
    fn cancel(&self) {}
}

#[test]
fn capability_probes_default_to_none() {
    let plain = Plain;
    assert!(plain.as_initializable().is_none());
    assert!(plain.as_procedure().is_none());
}

#[test]
fn capability_probe_returns_procedure_view() {
    let runnable = Runnable;
    assert!(runnable.as_procedure().is_some());
}

#[test]
fn downcast_hits_concrete_type() {
    let object: Arc<dyn Object> = Arc::new(Plain);
    assert!(downcast_object::<Plain>(object).is_some());
}

#[test]
fn downcast_rejects_other_type() {
    let object: Arc<dyn Object> = Arc::new(Plain);
    assert!(downcast_object::<Runnable>(object).is_none());
}

#[test]
fn value_roundtrip() {
    let value = Value::new(0i32);
    value.set(42);
    assert_eq!(value.get(), 42);
}

#[test]
fn value_is_a_registry_object() {
    let registry = ObjectRegistry::new();
    registry.add_object("return-code", Arc::new(Value::new(7i32))).unwrap();
    let found = registry.find_object_as::<Value<i32>>("return-code").unwrap();
    assert_eq!(found.get(), 7);
}
