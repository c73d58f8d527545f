//! The `IN_PROGRESS -> ALLOCATED` workflow.

use std::fmt;

use {
    portalbot_browser::Selector,
    portalbot_config::TransitionLabels,
    tracing::{info, warn},
};

use crate::{
    driver::SessionDriver,
    error::EngineError,
    extract::fetch_work_order,
    locator,
    model::{WorkOrder, WorkOrderStatus},
    profile::PortalProfile,
};

/// The only transition the engine performs.
pub fn can_transition(from: WorkOrderStatus, to: WorkOrderStatus) -> bool {
    matches!(
        (from, to),
        (WorkOrderStatus::InProgress, WorkOrderStatus::Allocated)
    )
}

/// Context-menu and dialog clicks, in the order they must happen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllocationStep {
    AutoAllocation,
    Evolve,
    Confirm,
    Acknowledge,
}

impl AllocationStep {
    pub const SEQUENCE: [Self; 4] = [
        Self::AutoAllocation,
        Self::Evolve,
        Self::Confirm,
        Self::Acknowledge,
    ];

    /// 1-based position in [`Self::SEQUENCE`].
    pub fn number(self) -> usize {
        match self {
            Self::AutoAllocation => 1,
            Self::Evolve => 2,
            Self::Confirm => 3,
            Self::Acknowledge => 4,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::AutoAllocation => "advance auto-allocation",
            Self::Evolve => "evolve work order",
            Self::Confirm => "confirm",
            Self::Acknowledge => "acknowledge",
        }
    }

    pub fn selector(self, labels: &TransitionLabels) -> Selector {
        let label = match self {
            Self::AutoAllocation => &labels.auto_allocation,
            Self::Evolve => &labels.evolve,
            Self::Confirm => &labels.confirm,
            Self::Acknowledge => &labels.acknowledge,
        };
        Selector::clickable(label)
    }
}

/// Where a transition attempt stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Re-locating the row and opening its context menu.
    ContextMenu,
    Step(AllocationStep),
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ContextMenu => f.write_str("context menu"),
            Self::Step(step) => write!(f, "{}/4 {}", step.number(), step.name()),
        }
    }
}

#[derive(Debug)]
pub enum TransitionOutcome {
    NotFound,
    /// Not `IN_PROGRESS`: nothing was clicked.
    ConsultOnly(WorkOrder),
    /// Every step ran; `after` is a fresh fetch, whatever its status.
    Completed { before: WorkOrder, after: WorkOrder },
    /// A step failed; `snapshot` is the pre-transition fetch.
    StepFailed {
        stage: Stage,
        snapshot: WorkOrder,
        error: EngineError,
    },
    /// The steps ran but the work order could not be fetched again.
    RefetchFailed { before: WorkOrder },
}

/// Fetch the work order and, if it is `IN_PROGRESS`, allocate it.
///
/// Fatal errors and cancellation propagate; any other step failure is
/// reported as [`TransitionOutcome::StepFailed`].
pub async fn allocate(
    driver: &mut SessionDriver<'_>,
    profile: &PortalProfile,
    id: &str,
) -> Result<TransitionOutcome, EngineError> {
    let Some(before) = fetch_work_order(driver, profile, id).await? else {
        return Ok(TransitionOutcome::NotFound);
    };

    if !can_transition(before.status, WorkOrderStatus::Allocated) {
        info!(
            session_id = %driver.session_id(),
            work_order_id = id,
            status = %before.status,
            "work order not in progress, consultation only"
        );
        return Ok(TransitionOutcome::ConsultOnly(before));
    }

    if let Err((stage, error)) = run_steps(driver, profile, id).await {
        if error.is_fatal() {
            return Err(error);
        }
        warn!(
            session_id = %driver.session_id(),
            work_order_id = id,
            step = %stage,
            error = %error,
            "allocation aborted"
        );
        return Ok(TransitionOutcome::StepFailed {
            stage,
            snapshot: before,
            error,
        });
    }

    match fetch_work_order(driver, profile, id).await {
        Ok(Some(after)) => {
            info!(
                session_id = %driver.session_id(),
                work_order_id = id,
                from = %before.status,
                to = %after.status,
                "allocation sequence completed"
            );
            Ok(TransitionOutcome::Completed { before, after })
        },
        Ok(None) => {
            warn!(
                session_id = %driver.session_id(),
                work_order_id = id,
                "work order not listed after allocation"
            );
            Ok(TransitionOutcome::RefetchFailed { before })
        },
        Err(e) if e.is_fatal() => Err(e),
        Err(e) => {
            warn!(
                session_id = %driver.session_id(),
                work_order_id = id,
                error = %e,
                "could not re-fetch work order after allocation"
            );
            Ok(TransitionOutcome::RefetchFailed { before })
        },
    }
}

async fn run_steps(
    driver: &mut SessionDriver<'_>,
    profile: &PortalProfile,
    id: &str,
) -> Result<(), (Stage, EngineError)> {
    let menu = |e| (Stage::ContextMenu, e);

    let hit = locator::search(driver, profile, id)
        .await
        .map_err(menu)?
        .ok_or_else(|| {
            menu(EngineError::InvalidInput(format!(
                "work order {id} no longer listed"
            )))
        })?;
    driver.click(&hit.row).await.map_err(menu)?;
    driver.right_click(&hit.row).await.map_err(menu)?;

    for step in AllocationStep::SEQUENCE {
        let selector = step.selector(profile.transition_labels());
        driver
            .click(&selector)
            .await
            .map_err(|e| (Stage::Step(step), e))?;
        info!(
            session_id = %driver.session_id(),
            work_order_id = id,
            step = step.name(),
            "allocation step done"
        );
    }
    Ok(())
}
