//! Withdrawal eligibility, recomputed on every balance credit.

use serde::{Deserialize, Serialize};

/// Actor-level flag controlling whether accumulated balance may be
/// withdrawn. Stored as "0" (eligible) / "1" (restricted).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WithdrawStatus {
    Eligible,
    Restricted,
}

impl WithdrawStatus {
    pub fn as_flag(&self) -> &'static str {
        match self {
            WithdrawStatus::Eligible => "0",
            WithdrawStatus::Restricted => "1",
        }
    }

    pub fn from_flag(flag: &str) -> Self {
        if flag.trim() == "1" {
            WithdrawStatus::Restricted
        } else {
            WithdrawStatus::Eligible
        }
    }
}

/// Currency/country mismatch heuristic for fraud control. Restriction is
/// sticky: once restricted, an actor stays restricted. Otherwise the actor
/// is eligible exactly when the settlement currency belongs to their
/// country ("USD" matches "US" as well as a stored "USD").
/// Deliberately a two-branch decision.
pub fn decide_withdraw_status(
    existing: WithdrawStatus,
    gateway_currency: &str,
    actor_country_code: &str,
) -> WithdrawStatus {
    if existing == WithdrawStatus::Restricted {
        WithdrawStatus::Restricted
    } else if currency_matches_country(gateway_currency, actor_country_code) {
        WithdrawStatus::Eligible
    } else {
        WithdrawStatus::Restricted
    }
}

fn currency_matches_country(currency: &str, country_code: &str) -> bool {
    !country_code.is_empty() && (currency == country_code || currency.starts_with(country_code))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn restricted_stays_restricted() {
        assert_eq!(
            decide_withdraw_status(WithdrawStatus::Restricted, "USD", "USD"),
            WithdrawStatus::Restricted
        );
        assert_eq!(
            decide_withdraw_status(WithdrawStatus::Restricted, "NGN", "NG"),
            WithdrawStatus::Restricted
        );
    }

    #[test]
    fn eligible_when_currency_matches_country_code() {
        assert_eq!(
            decide_withdraw_status(WithdrawStatus::Eligible, "USD", "US"),
            WithdrawStatus::Eligible
        );
        assert_eq!(
            decide_withdraw_status(WithdrawStatus::Eligible, "USD", "USD"),
            WithdrawStatus::Eligible
        );
        assert_eq!(
            decide_withdraw_status(WithdrawStatus::Eligible, "USD", "NG"),
            WithdrawStatus::Restricted
        );
        assert_eq!(
            decide_withdraw_status(WithdrawStatus::Eligible, "NGN", ""),
            WithdrawStatus::Restricted
        );
    }

    #[test]
    fn flag_round_trip() {
        assert_eq!(WithdrawStatus::from_flag("1"), WithdrawStatus::Restricted);
        assert_eq!(WithdrawStatus::from_flag("0"), WithdrawStatus::Eligible);
        assert_eq!(WithdrawStatus::from_flag(""), WithdrawStatus::Eligible);
        assert_eq!(WithdrawStatus::Restricted.as_flag(), "1");
        assert_eq!(WithdrawStatus::Eligible.as_flag(), "0");
    }
}
