//! Launch planning: a pure, deterministic check-and-assemble step.

use std::collections::HashSet;

use crate::errors::LauncherError;
use crate::model::{LaunchPlan, LaunchRequest, ResolvedImage};

/// Build the runtime invocation plan for `request` running `image`.
///
/// Fails with `PlanConflict` on the first container path mounted twice, then on
/// the first host port published twice (request order).
pub fn plan(request: &LaunchRequest, image: ResolvedImage) -> Result<LaunchPlan, LauncherError> {
    let mut targets = HashSet::new();
    for m in &request.mounts {
        if !targets.insert(m.container_key()) {
            return Err(LauncherError::PlanConflict(format!(
                "container path {} is mounted more than once",
                m.container_key()
            )));
        }
    }

    let mut host_ports = HashSet::new();
    for p in &request.ports {
        if !host_ports.insert(p.host) {
            return Err(LauncherError::PlanConflict(format!(
                "host port {} is published more than once",
                p.host
            )));
        }
    }

    let interactive = request.attached();
    Ok(LaunchPlan {
        image,
        mounts: request.mounts.clone(),
        ports: request.ports.clone(),
        env: request.env.clone(),
        command: request.command.clone().unwrap_or_default(),
        interactive,
        name: request.name.clone(),
        auto_remove: interactive && request.auto_remove,
    })
}
