/**
 * DOMAIN LAYER - Revenue Splits
 *
 * Deterministic division of a completed payment between the organizer and
 * the platform. All arithmetic in integer minor units; the rounding residue
 * of the percentage split stays on the platform side.
 */

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Splits {
    pub platform_minor: i64,
    pub organizer_minor: i64,
}

/**
 * Compute the split for a given total and organizer percentage
 *
 * organizer = floor(total * pct / 100), platform = total - organizer.
 */
pub fn compute(total_minor: i64, organizer_percent: i64) -> Splits {
    let organizer_minor = total_minor * organizer_percent / 100;
    Splits {
        platform_minor: total_minor - organizer_minor,
        organizer_minor,
    }
}

/**
 * Resolve the final split recorded at completion
 *
 * A gateway-reported subaccount share is authoritative for the platform
 * amount: the gateway already moved the money that way. Otherwise the split
 * is computed from the organizer percentage, and gateway fees, when
 * reported, come out of the organizer amount per provider contract.
 */
pub fn resolve(
    total_minor: i64,
    organizer_percent: i64,
    gateway_fees_minor: Option<i64>,
    subaccount_share_minor: Option<i64>,
) -> Splits {
    if let Some(platform_minor) = subaccount_share_minor {
        return Splits {
            platform_minor,
            organizer_minor: total_minor - platform_minor,
        };
    }

    let mut splits = compute(total_minor, organizer_percent);
    if let Some(fees) = gateway_fees_minor {
        splits.organizer_minor = (splits.organizer_minor - fees).max(0);
    }
    splits
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ninety_ten_split() {
        let s = compute(10_000, 90);
        assert_eq!(s.organizer_minor, 9_000);
        assert_eq!(s.platform_minor, 1_000);
    }

    #[test]
    fn rounding_residue_goes_to_platform() {
        // 90% of 9999 = 8999.1, floored to 8999; platform keeps the spare kobo
        let s = compute(9_999, 90);
        assert_eq!(s.organizer_minor, 8_999);
        assert_eq!(s.platform_minor, 1_000);
        assert_eq!(s.organizer_minor + s.platform_minor, 9_999);
    }

    #[test]
    fn zero_total_splits_to_zero() {
        let s = compute(0, 90);
        assert_eq!(s, Splits { platform_minor: 0, organizer_minor: 0 });
    }

    #[test]
    fn subaccount_share_overrides_percentage() {
        let s = resolve(10_000, 90, None, Some(1_000));
        assert_eq!(s.platform_minor, 1_000);
        assert_eq!(s.organizer_minor, 9_000);

        // Even a share that disagrees with the configured percentage wins
        let s = resolve(10_000, 50, None, Some(1_000));
        assert_eq!(s.platform_minor, 1_000);
        assert_eq!(s.organizer_minor, 9_000);
    }

    #[test]
    fn fees_come_out_of_organizer_amount() {
        let s = resolve(10_000, 90, Some(150), None);
        assert_eq!(s.platform_minor, 1_000);
        assert_eq!(s.organizer_minor, 8_850);
    }

    #[test]
    fn fees_never_push_organizer_negative() {
        let s = resolve(100, 90, Some(500), None);
        assert_eq!(s.organizer_minor, 0);
    }
}
