//! Fuzz target: stored actuator records
//!
//! Writes arbitrary bytes where an actuator record belongs and loads it
//! back. Decoding must either fail cleanly or yield a record for the
//! module that was asked for.
//!
//! cargo fuzz run fuzz_actuator_record

#![no_main]

use greenhouse::adapters::kv_store::KvStore;
use greenhouse::app::ports::ActuatorStateStore;
use greenhouse::model::Module;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Some((&selector, blob)) = data.split_first() else {
        return;
    };
    let module = Module::ALL[usize::from(selector) % Module::COUNT];
    let store = KvStore::new();
    if store.write("actuator", module.name(), blob).is_err() {
        return;
    }
    if let Ok(Some(record)) = ActuatorStateStore::load(&store, module) {
        assert_eq!(record.module, module);
    }
});
