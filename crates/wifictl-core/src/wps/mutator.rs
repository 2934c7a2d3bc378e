use super::{JobState, WpsMethod, WpsRole};
use crate::model::{ConfigTree, InterfaceKind};
use crate::pipeline::{EngineView, Mutator};

/// TAIL mutator pushing the admitted job's credentials and PBC switch
/// onto its AP while activating, and pulling them off while winding
/// down. `Running` leaves the live values alone.
pub struct WpsMutator;

impl Mutator for WpsMutator {
    fn name(&self) -> &str {
        "wps"
    }

    fn mutate(&self, view: &EngineView<'_>, tree: &mut ConfigTree) {
        for job in view.wps.jobs() {
            let (WpsRole::Enroller, WpsMethod::Pbc) = (job.role, job.method);
            let Some(iface) = tree.interface_mut(&job.iface) else {
                continue;
            };
            if iface.kind != InterfaceKind::Ap {
                continue;
            }
            let Some(ap) = iface.ap.as_mut() else {
                continue;
            };
            match job.state {
                JobState::Activating => {
                    ap.wps_creds.clone_from(&job.creds);
                    ap.wps_pbc = ap.mode.wps && !job.cancelled;
                }
                JobState::Cancelling | JobState::Deactivating => {
                    ap.wps_creds.clear();
                    ap.wps_pbc = false;
                }
                JobState::Preparing
                | JobState::Scheduling
                | JobState::Running
                | JobState::Interrupting
                | JobState::Dropping => {}
            }
        }
    }
}
