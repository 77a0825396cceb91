//! Login Risk Property Tests
//!
//! Validates score bounds and agreement between score, band and factors.

use proptest::prelude::*;

use super::generators::arb_login_record;
use cms_edge::audit::risk;
use cms_edge::proto::{RiskLevel, Status};

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Scores stay within 0..=100 and the band matches the score.
    #[test]
    fn prop_score_in_range_and_banded(mut log in arb_login_record()) {
        risk::assess(&mut log);
        prop_assert!(log.risk_score <= 100);
        let expected = match log.risk_score {
            0..=30 => RiskLevel::Low,
            31..=70 => RiskLevel::Medium,
            _ => RiskLevel::High,
        };
        prop_assert_eq!(log.risk_level(), expected);
    }

    /// Factors are sorted, unique, and agree with the status.
    #[test]
    fn prop_factors_sorted_and_consistent(mut log in arb_login_record()) {
        risk::assess(&mut log);
        let mut sorted = log.risk_factors.clone();
        sorted.sort();
        sorted.dedup();
        prop_assert_eq!(&sorted, &log.risk_factors);

        let failed = log.risk_factors.iter().any(|f| f == risk::FAILED_LOGIN);
        prop_assert_eq!(failed, log.status() == Status::Failed);
        let anonymous = log.risk_factors.iter().any(|f| f == risk::ANONYMOUS_LOGIN);
        prop_assert_eq!(anonymous, log.user_id() == 0);
    }

    /// A failure never scores lower than the same attempt succeeding.
    #[test]
    fn prop_failure_scores_higher(log in arb_login_record()) {
        let mut ok = log.clone();
        ok.set_status(Status::Success);
        let mut failed = log;
        failed.set_status(Status::Failed);
        prop_assert!(risk::score(&failed) >= risk::score(&ok));
    }
}
