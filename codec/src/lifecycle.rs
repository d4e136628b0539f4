//! Teardown: handing actions back to their owners.
//!
//! Plain variants own only inline data and drop in place. `SetField`
//! drops its value and mask buffers with the field. Experimenter records
//! go back through the vendor codec that produced them, so vendors with
//! out-of-band state get their hook; a record whose vendor has no
//! registry entry is logged and dropped generically rather than erroring,
//! since teardown must always complete.

use tracing::warn;

use crate::action::Action;
use crate::experimenter::ExperimenterRegistry;

/// Release one action.
pub fn release(action: Action, registry: Option<&ExperimenterRegistry>) {
    match action {
        Action::Experimenter(record) => {
            let vendor_id = record.vendor_id();
            match registry.and_then(|r| r.get(vendor_id)) {
                Some(codec) => codec.release(record),
                None => {
                    warn!(vendor_id, "no codec registered for vendor record, dropping");
                    drop(record);
                }
            }
        }
        other => drop(other),
    }
}

/// Release every action in a list, in order.
pub fn release_all(actions: Vec<Action>, registry: Option<&ExperimenterRegistry>) {
    for action in actions {
        release(action, registry);
    }
}
