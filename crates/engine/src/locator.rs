//! Finding a work order in the portal's search results.

use {
    portalbot_browser::Selector,
    tracing::{debug, info},
};

use crate::{
    driver::SessionDriver,
    error::EngineError,
    model::WorkOrderStatus,
    profile::PortalProfile,
};

/// A result row that mentions the searched id.
#[derive(Debug, Clone)]
pub struct SearchHit {
    pub row: Selector,
    pub status: WorkOrderStatus,
    /// Text of the cell the status was read from.
    pub status_label: String,
    pub cells: Vec<String>,
}

/// Search for `id` and read the status of the matching row.
///
/// `Ok(None)` means no row appeared within the search timeout.
pub async fn search(
    driver: &mut SessionDriver<'_>,
    profile: &PortalProfile,
    id: &str,
) -> Result<Option<SearchHit>, EngineError> {
    let id = id.trim();
    if id.is_empty() {
        return Err(EngineError::InvalidInput("work order id is empty".into()));
    }

    // `fill` clears the field before typing.
    driver.fill(&profile.search_field(), id).await?;
    driver.click(&profile.search_button()).await?;

    let row = profile.result_row(id);
    if driver.probe(&row, profile.search_timeout()).await?.is_none() {
        info!(session_id = %driver.session_id(), work_order_id = id, "work order not found");
        return Ok(None);
    }

    let cells = driver.read_cells(&row).await?;
    let (status, status_label) = classify_row(&cells);
    debug!(
        session_id = %driver.session_id(),
        work_order_id = id,
        status = %status,
        status_label,
        cells = cells.len(),
        "work order row found"
    );

    Ok(Some(SearchHit {
        row,
        status,
        status_label,
        cells,
    }))
}

/// Pick the status cell of a row and map it to a status.
///
/// The first cell carrying a status keyword wins; otherwise the first
/// non-empty cell is used as the label. An empty row is `Unknown`.
pub fn classify_row(cells: &[String]) -> (WorkOrderStatus, String) {
    let label = cells
        .iter()
        .map(|c| c.trim())
        .find(|c| WorkOrderStatus::is_status_text(c))
        .or_else(|| cells.iter().map(|c| c.trim()).find(|c| !c.is_empty()));

    match label {
        Some(label) => (WorkOrderStatus::from_label(label), label.to_string()),
        None => (WorkOrderStatus::Unknown, String::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn keyword_cell_wins_over_position() {
        let (status, label) = classify_row(&row(&["1234567", "Rua A", " In Progress ", "x"]));
        assert_eq!(status, WorkOrderStatus::InProgress);
        assert_eq!(label, "In Progress");
    }

    #[test]
    fn first_keyword_cell_is_used() {
        let (status, _) = classify_row(&row(&["42", "ALLOCATED", "JOB CLOSED"]));
        assert_eq!(status, WorkOrderStatus::Allocated);
    }

    #[test]
    fn falls_back_to_first_non_empty_cell() {
        let (status, label) = classify_row(&row(&["", "  ", "Aguarda", "Lisboa"]));
        assert_eq!(status, WorkOrderStatus::Unknown);
        assert_eq!(label, "Aguarda");
    }

    #[test]
    fn empty_row_is_unknown() {
        let (status, label) = classify_row(&row(&["", " "]));
        assert_eq!(status, WorkOrderStatus::Unknown);
        assert!(label.is_empty());
        assert_eq!(classify_row(&[]).0, WorkOrderStatus::Unknown);
    }

    #[test]
    fn bare_job_cell_stays_unknown_but_keeps_label() {
        let (status, label) = classify_row(&row(&["99", "JOB"]));
        assert_eq!(status, WorkOrderStatus::Unknown);
        assert_eq!(label, "JOB");
    }
}
