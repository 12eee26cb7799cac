// CPU pinning for the harness thread.
// Children spawned afterwards inherit the affinity mask on Linux, which keeps
// every measured process on the same core.

use tracing::{debug, warn};

/// Pin the current thread to core `core`. Returns false if the core does not
/// exist or the platform refuses.
pub fn pin_to_core(core: usize) -> bool {
    let Some(core_ids) = core_affinity::get_core_ids() else {
        warn!(core, "core ids unavailable on this platform, running unpinned");
        return false;
    };

    match core_ids.into_iter().find(|id| id.id == core) {
        Some(id) if core_affinity::set_for_current(id) => {
            debug!(core, "pinned harness thread");
            true
        }
        Some(_) => {
            warn!(core, "failed to pin harness thread, running unpinned");
            false
        }
        None => {
            warn!(core, "no such core, running unpinned");
            false
        }
    }
}
