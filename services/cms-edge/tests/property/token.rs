//! Token Claim Property Tests
//!
//! Validates expiry with leeway and the claims-to-payload mapping.

use chrono::{Duration, Utc};
use proptest::prelude::*;

use super::generators::arb_token_payload;
use cms_edge::token::TokenClaims;
use cms_edge::token::claims::TOKEN_LEEWAY_SECS;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// A token counts as expired only once the leeway has passed.
    #[test]
    fn prop_expiry_honors_leeway(payload in arb_token_payload(), offset in -3600i64..3600) {
        let now = Utc::now();
        let exp = now + Duration::seconds(offset);
        let claims = TokenClaims::from_payload(&payload, Some(exp));
        let exp = claims.expiration_time().unwrap();

        let check_at = exp + Duration::seconds(TOKEN_LEEWAY_SECS);
        prop_assert!(!claims.is_expired_at(check_at));
        prop_assert!(claims.is_expired_at(check_at + Duration::seconds(1)));
    }

    /// Claims without `exp` never expire.
    #[test]
    fn prop_no_exp_never_expires(payload in arb_token_payload(), years in 0i64..100) {
        let claims = TokenClaims::from_payload(&payload, None);
        prop_assert!(!claims.is_expired_at(Utc::now() + Duration::days(365 * years)));
    }

    /// Payload -> claims -> payload keeps what the edge relies on.
    #[test]
    fn prop_claims_map_back_to_payload(payload in arb_token_payload()) {
        let back = TokenClaims::from_payload(&payload, None).to_payload().unwrap();
        prop_assert_eq!(back.user_id, payload.user_id);
        prop_assert_eq!(back.tenant_id(), payload.tenant_id());
        prop_assert_eq!(back.username(), payload.username());
        prop_assert_eq!(&back.roles, &payload.roles);
        prop_assert_eq!(back.data_scope, payload.data_scope);
    }
}
