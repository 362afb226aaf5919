//! Pure translation from backend payloads to canonical shapes.
//!
//! Nothing here performs I/O or keeps state: the same raw input always yields the same
//! canonical value or the same `MappingError`.

mod fields;
pub mod live;
pub mod paper;

use crate::domain::{BalanceEntry, OrderStatus, UtcDateTime};
use crate::GatewayError;

/// Native statuses that count as open, checked before translation.
pub const OPEN_NATIVE_STATUSES: [&str; 2] = ["new", "partially_filled"];

// relative slack allowed between a reported total and free + used
const BALANCE_TOLERANCE: f64 = 1e-9;

/// Translates a simulated-venue order status. Anything outside the table is a mapping error.
pub fn map_native_status(native: &str) -> Result<OrderStatus, GatewayError> {
    let status = match native.trim().to_ascii_lowercase().as_str() {
        "new" => OrderStatus::Open,
        "partially_filled" => OrderStatus::PartiallyFilled,
        "filled" => OrderStatus::Closed,
        "canceled" | "partially_canceled" => OrderStatus::Canceled,
        "expired" | "partially_expired" => OrderStatus::Expired,
        "rejected" | "partially_rejected" => OrderStatus::Rejected,
        other => {
            return Err(GatewayError::mapping(format!(
                "unknown native order status '{other}'"
            )))
        }
    };
    Ok(status)
}

pub fn is_open_native_status(native: &str) -> bool {
    let normalized = native.trim().to_ascii_lowercase();
    OPEN_NATIVE_STATUSES.contains(&normalized.as_str())
}

/// Builds a balance entry from whichever figures the backend reported.
///
/// A missing `used` is `total - free`, a missing `total` is `free + used` and a missing `free`
/// is `total - used`. With fewer than two figures, or figures that disagree, mapping fails.
pub fn derive_balance_entry(
    asset: &str,
    free: Option<f64>,
    used: Option<f64>,
    total: Option<f64>,
) -> Result<BalanceEntry, GatewayError> {
    let (free, used) = match (free, used, total) {
        (Some(free), Some(used), Some(total)) => {
            let slack = BALANCE_TOLERANCE * total.abs().max(1.0);
            if (total - (free + used)).abs() > slack {
                return Err(GatewayError::mapping(format!(
                    "balance for {asset} is inconsistent: free {free} + used {used} != total {total}"
                )));
            }
            (free, used)
        }
        (Some(free), Some(used), None) => (free, used),
        (Some(free), None, Some(total)) => (free, total - free),
        (None, Some(used), Some(total)) => (total - used, used),
        _ => {
            return Err(GatewayError::mapping(format!(
                "balance for {asset} needs two of free, used and total"
            )))
        }
    };

    if !free.is_finite() || !used.is_finite() {
        return Err(GatewayError::mapping(format!(
            "balance for {asset} is not finite"
        )));
    }
    let slack = BALANCE_TOLERANCE * (free.abs() + used.abs()).max(1.0);
    if free < -slack || used < -slack {
        return Err(GatewayError::mapping(format!(
            "balance for {asset} derives a negative figure: free {free}, used {used}"
        )));
    }

    Ok(BalanceEntry::new(free.max(0.0), used.max(0.0)))
}

/// `datetime` companion for an epoch-milliseconds timestamp.
pub fn datetime_of(timestamp: Option<i64>) -> Result<Option<UtcDateTime>, GatewayError> {
    timestamp
        .map(|millis| {
            UtcDateTime::from_unix_millis(millis)
                .map_err(|error| GatewayError::mapping(error.to_string()))
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    #[test]
    fn status_table_is_total_and_deterministic() {
        let table = [
            ("new", OrderStatus::Open),
            ("partially_filled", OrderStatus::PartiallyFilled),
            ("filled", OrderStatus::Closed),
            ("canceled", OrderStatus::Canceled),
            ("partially_canceled", OrderStatus::Canceled),
            ("expired", OrderStatus::Expired),
            ("partially_expired", OrderStatus::Expired),
            ("rejected", OrderStatus::Rejected),
            ("partially_rejected", OrderStatus::Rejected),
        ];

        for (native, canonical) in table {
            assert_eq!(map_native_status(native), Ok(canonical), "{native}");
            assert_eq!(map_native_status(native), map_native_status(native));
        }
    }

    #[test]
    fn unknown_statuses_are_never_forwarded() {
        for native in ["open", "closed", "cancelled", "", "pending_new"] {
            let error = map_native_status(native).expect_err("must not map");
            assert_eq!(error.kind(), ErrorKind::Mapping, "{native}");
        }
    }

    #[test]
    fn open_filter_uses_native_vocabulary() {
        assert!(is_open_native_status("new"));
        assert!(is_open_native_status("PARTIALLY_FILLED"));
        assert!(!is_open_native_status("filled"));
        assert!(!is_open_native_status("partially_canceled"));
    }

    #[test]
    fn balances_derive_the_missing_figure() {
        let used = derive_balance_entry("BTC", Some(1.0), None, Some(1.5)).expect("derives used");
        assert_eq!((used.free(), used.used(), used.total()), (1.0, 0.5, 1.5));

        let total =
            derive_balance_entry("BTC", Some(1.0), Some(0.25), None).expect("derives total");
        assert_eq!(total.total(), 1.25);

        let free = derive_balance_entry("BTC", None, Some(0.5), Some(2.0)).expect("derives free");
        assert_eq!(free.free(), 1.5);
    }

    #[test]
    fn balances_total_always_equals_free_plus_used() {
        let inputs = [
            (Some(0.1), Some(0.2), None),
            (Some(0.1), None, Some(0.3)),
            (None, Some(0.7), Some(1.0)),
            (Some(3.0), Some(0.0), Some(3.0)),
        ];
        for (free, used, total) in inputs {
            let entry = derive_balance_entry("X", free, used, total).expect("derivable");
            assert_eq!(entry.total(), entry.free() + entry.used());
        }
    }

    #[test]
    fn underivable_or_inconsistent_balances_fail() {
        for (free, used, total) in [
            (Some(1.0), None, None),
            (None, None, Some(1.0)),
            (None, None, None),
            (Some(1.0), Some(1.0), Some(5.0)),
            (Some(2.0), None, Some(1.0)),
        ] {
            let error = derive_balance_entry("ETH", free, used, total).expect_err("must fail");
            assert_eq!(error.kind(), ErrorKind::Mapping);
        }
    }

    #[test]
    fn datetime_follows_timestamp() {
        assert_eq!(datetime_of(None), Ok(None));
        let rendered = datetime_of(Some(0)).expect("epoch").map(|value| value.to_string());
        assert_eq!(rendered.as_deref(), Some("1970-01-01T00:00:00Z"));
    }
}
