//! Reading a work order's detail view into a snapshot.

use std::sync::LazyLock;

use {
    portalbot_browser::Selector,
    regex::Regex,
    tracing::{debug, info, warn},
};

use crate::{
    driver::SessionDriver,
    error::EngineError,
    locator::{self, SearchHit},
    model::{Coordinates, DetailField, WorkOrder},
    profile::PortalProfile,
};

/// Decimal pair right after the coordinate label, e.g. `: 38.7223, -9.1393`.
#[allow(clippy::expect_used)]
static LABELLED_PAIR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*:?\s*(-?\d+\.\d+)\s*,\s*(-?\d+\.\d+)").expect("valid regex pattern")
});

/// Decimal pair closing the whole description.
#[allow(clippy::expect_used)]
static TRAILING_PAIR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(-?\d+\.\d+)\s*,\s*(-?\d+\.\d+)\s*$").expect("valid regex pattern")
});

/// Search for `id` and, if found, read its full snapshot.
pub async fn fetch_work_order(
    driver: &mut SessionDriver<'_>,
    profile: &PortalProfile,
    id: &str,
) -> Result<Option<WorkOrder>, EngineError> {
    match locator::search(driver, profile, id).await? {
        Some(hit) => extract_details(driver, profile, id.trim(), &hit).await.map(Some),
        None => Ok(None),
    }
}

/// Open the detail view of a found row and read every field.
///
/// Fields are optional on the portal: each gets one wait of
/// `field_timeout` and is left empty when absent or unreadable. Only a
/// failure to open the view, or a fatal error, fails the extraction.
pub async fn extract_details(
    driver: &mut SessionDriver<'_>,
    profile: &PortalProfile,
    id: &str,
    hit: &SearchHit,
) -> Result<WorkOrder, EngineError> {
    open_detail(driver, profile, &hit.row).await?;

    let mut order = WorkOrder::new(id, hit.status, hit.status_label.clone());
    let mut missing = 0usize;
    let wait = profile.field_timeout();

    for field in DetailField::ALL {
        match driver.read_optional(&profile.detail_field(field), wait).await {
            Ok(Some(value)) => order.set_field(field, value),
            Ok(None) => {
                missing += 1;
                warn!(
                    session_id = %driver.session_id(),
                    work_order_id = id,
                    field = %field,
                    "detail field not present, leaving it empty"
                );
            },
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                missing += 1;
                warn!(
                    session_id = %driver.session_id(),
                    work_order_id = id,
                    field = %field,
                    error = %e,
                    "detail field could not be read, leaving it empty"
                );
            },
        }
    }

    order.coordinates = parse_coordinates(&order.description, profile.coordinate_prefix());
    close_detail(driver, profile).await?;

    info!(
        session_id = %driver.session_id(),
        work_order_id = id,
        status = %order.status,
        missing_fields = missing,
        has_coordinates = order.coordinates.is_some(),
        "extracted work order details"
    );
    Ok(order)
}

async fn open_detail(
    driver: &mut SessionDriver<'_>,
    profile: &PortalProfile,
    row: &Selector,
) -> Result<(), EngineError> {
    driver.click(row).await?;
    driver.right_click(row).await?;
    driver.click(&profile.view_detail()).await
}

/// Best-effort: leave the search page usable for the next lookup.
async fn close_detail(
    driver: &mut SessionDriver<'_>,
    profile: &PortalProfile,
) -> Result<(), EngineError> {
    let close = profile.close_detail();
    let wait = driver.timeout().current();

    let result = match driver.probe(&close, wait).await {
        Ok(Some(_)) => driver.click(&close).await,
        Ok(None) => {
            debug!(session_id = %driver.session_id(), "no close control on detail view");
            return Ok(());
        },
        Err(e) => Err(e),
    };

    match result {
        Err(e) if e.is_fatal() => Err(e),
        Err(e) => {
            debug!(session_id = %driver.session_id(), error = %e, "closing detail view failed");
            Ok(())
        },
        Ok(()) => Ok(()),
    }
}

/// Extract a latitude/longitude pair from a description.
///
/// Text following `prefix` (case-insensitive, anywhere in a line) is checked
/// first; failing that, a pair at the very end of the text is accepted.
/// Values outside valid latitude/longitude ranges are rejected.
pub fn parse_coordinates(description: &str, prefix: &str) -> Option<Coordinates> {
    let labelled = (!prefix.is_empty())
        .then(|| {
            let needle = prefix.to_ascii_lowercase();
            description.lines().find_map(|line| {
                // ASCII lowercasing keeps byte offsets aligned with `line`.
                let lowered = line.to_ascii_lowercase();
                lowered.match_indices(&needle).find_map(|(at, _)| {
                    let rest = line.get(at + needle.len()..)?;
                    LABELLED_PAIR.captures(rest).and_then(|c| pair(&c[1], &c[2]))
                })
            })
        })
        .flatten();

    labelled.or_else(|| {
        TRAILING_PAIR
            .captures(description)
            .and_then(|c| pair(&c[1], &c[2]))
    })
}

fn pair(lat: &str, lon: &str) -> Option<Coordinates> {
    let latitude: f64 = lat.parse().ok()?;
    let longitude: f64 = lon.parse().ok()?;
    ((-90.0..=90.0).contains(&latitude) && (-180.0..=180.0).contains(&longitude)).then_some(
        Coordinates {
            latitude,
            longitude,
        },
    )
}

#[cfg(test)]
mod tests {
    use {super::*, rstest::rstest};

    const PREFIX: &str = "PDO Coordenadas";

    #[rstest]
    #[case("PDO Coordenadas: 38.7223, -9.1393", Some((38.7223, -9.1393)))]
    #[case(
        "Instalação FTTH\nPDO Coordenadas: 38.7223, -9.1393\nCliente ausente de manhã",
        Some((38.7223, -9.1393))
    )]
    #[case("  pdo coordenadas 41.1579,-8.6291", Some((41.1579, -8.6291)))]
    #[case("Cliente pede contacto prévio. end of text 40.1,-8.2", Some((40.1, -8.2)))]
    #[case("Trailing pair with space 40.1 , -8.2  \n", Some((40.1, -8.2)))]
    #[case("Sem coordenadas nesta ordem", None)]
    #[case("PDO Coordenadas: por confirmar", None)]
    #[case("Pair not at the end 40.1,-8.2 then text", None)]
    #[case("- PDO Coordenadas: 38.7223, -9.1393\nCliente ausente", Some((38.7223, -9.1393)))]
    #[case(
        "Obs: PDO Coordenadas: 38.7223, -9.1393 (confirmar)",
        Some((38.7223, -9.1393))
    )]
    #[case("Ver pdo COORDENADAS 41.1579,-8.6291 no local", Some((41.1579, -8.6291)))]
    #[case("PDO Coordenadas: 138.5, 10.0", None)]
    #[case("", None)]
    fn coordinates(#[case] description: &str, #[case] expected: Option<(f64, f64)>) {
        let parsed = parse_coordinates(description, PREFIX).map(|c| (c.latitude, c.longitude));
        assert_eq!(parsed, expected);
    }

    #[test]
    fn labelled_line_beats_trailing_pair() {
        let text = "PDO Coordenadas: 38.5, -9.0\nRef antiga 40.1,-8.2";
        let c = parse_coordinates(text, PREFIX);
        assert_eq!(c.map(|c| c.latitude), Some(38.5));
    }

    #[test]
    fn integers_are_not_a_strict_pair() {
        assert!(parse_coordinates("PDO Coordenadas: 38, -9", PREFIX).is_none());
    }

    #[test]
    fn multibyte_text_around_prefix_is_safe() {
        assert!(parse_coordinates("ÇÇÇÇÇÇÇÇ", PREFIX).is_none());
        let c = parse_coordinates("Instalação à tarde, PDO Coordenadas: 38.5, -9.0 ok", PREFIX);
        assert_eq!(c.map(|c| c.longitude), Some(-9.0));
    }

    #[test]
    fn second_prefix_occurrence_is_tried() {
        let text = "PDO Coordenadas em falta; PDO Coordenadas: 38.5, -9.0 (rever)";
        assert_eq!(parse_coordinates(text, PREFIX).map(|c| c.latitude), Some(38.5));
    }
}
