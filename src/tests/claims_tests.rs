//! Claims 模块测试
//!
//! ## 测试重点
//! - **类型分派**：根据 `token_use` 解析为 id / access 两种 payload
//! - **非法 token_use**：返回 InvalidTokenUseError，而不是静默拒绝
//! - **Claim 验证**：aud、iss、exp（严格大于）、token_use
//! - **Access token**：不检查 aud
//! - **签发者构造**：`build_issuer`

use super::test_helpers::*;
use crate::{
    build_issuer, build_issuer_with_domain, ClaimValidator, ErrorKind, Payload, TokenUse,
    VerifierConfig,
};
use crate::claims::seconds_since_epoch;
use std::time::Duration;

fn validator() -> ClaimValidator {
    ClaimValidator::new(VerifierConfig::new([TEST_APP_ID], TEST_ISSUER))
}

fn payload(claims: serde_json::Value) -> Payload {
    Payload::from_claims(claims_map(claims)).expect("claims should form a payload")
}

#[cfg(test)]
mod tests {
    use super::*;

    // ==================== TokenUse ====================

    #[test]
    fn test_token_use_parsing() {
        assert_eq!("id".parse::<TokenUse>().unwrap(), TokenUse::Id);
        assert_eq!("access".parse::<TokenUse>().unwrap(), TokenUse::Access);
        assert_eq!(TokenUse::Access.to_string(), "access");

        for bogus in ["bogus", "ID", "", "refresh"] {
            let err = bogus.parse::<TokenUse>().unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidTokenUseError);
        }
    }

    // ==================== Payload 分派 ====================

    #[test]
    fn test_payload_from_id_claims() {
        let exp = now() + 3600;
        let payload = payload(id_token_claims(TEST_ISSUER, exp));

        assert_eq!(payload.token_use(), TokenUse::Id);
        assert_eq!(payload.subject(), TEST_USER_ID);
        assert_eq!(payload.issuer(), TEST_ISSUER);
        assert_eq!(payload.expires_at(), exp);
        assert_eq!(payload.audience(), Some(TEST_APP_ID));

        let claims = payload.as_id().expect("should be an id token");
        assert_eq!(claims.email.as_deref(), Some(TEST_EMAIL));
        assert_eq!(claims.email_verified, Some(true));
        assert_eq!(claims.phone_number_verified, Some(false));
        assert_eq!(claims.cognito_username.as_deref(), Some("test-user"));
        assert!(payload.as_access().is_none());
    }

    #[test]
    fn test_payload_from_access_claims() {
        let payload = payload(access_token_claims(TEST_ISSUER, now() + 3600));

        assert_eq!(payload.token_use(), TokenUse::Access);
        assert_eq!(payload.audience(), None);

        let claims = payload.as_access().expect("should be an access token");
        assert_eq!(claims.client_id, TEST_APP_ID);
        assert_eq!(claims.jti.as_deref(), Some("789-789-789"));
        assert!(claims.has_scope("openid"));
        assert!(!claims.has_scope("profile"));
        assert_eq!(claims.scopes().count(), 2);
        assert_eq!(claims.common.groups, Some(vec!["admins".to_string()]));
    }

    #[test]
    fn test_payload_invalid_token_use() {
        let mut claims = access_token_claims(TEST_ISSUER, now() + 3600);
        claims["token_use"] = json!("something");
        let err = Payload::from_claims(claims_map(claims.clone())).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidTokenUseError);

        claims["token_use"] = json!(42);
        let err = Payload::from_claims(claims_map(claims.clone())).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidTokenUseError);

        claims.as_object_mut().unwrap().remove("token_use");
        let err = Payload::from_claims(claims_map(claims)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidTokenUseError);
    }

    #[test]
    fn test_payload_missing_required_claims() {
        let mut claims = id_token_claims(TEST_ISSUER, now() + 3600);
        claims.as_object_mut().unwrap().remove("aud");
        let err = Payload::from_claims(claims_map(claims)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DecodeError);

        let mut claims = access_token_claims(TEST_ISSUER, now() + 3600);
        claims.as_object_mut().unwrap().remove("exp");
        let err = Payload::from_claims(claims_map(claims)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DecodeError);
    }

    #[test]
    fn test_payload_serialization_keeps_token_use() {
        let payload = payload(access_token_claims(TEST_ISSUER, 2_000_000_000));
        let value = serde_json::to_value(&payload).unwrap();

        assert_eq!(value["token_use"], "access");
        assert_eq!(value["client_id"], TEST_APP_ID);
        assert_eq!(value["cognito:groups"], json!(["admins"]));

        let back: Payload = serde_json::from_value(value).unwrap();
        assert_eq!(back, payload);
    }

    // ==================== Claim 验证 ====================

    #[test]
    fn test_validate_id_token() {
        let now = now();
        let payload = payload(id_token_claims(TEST_ISSUER, now + 3600));

        assert!(validator().validate(&payload, now, None).is_ok());
        assert!(validator().validate(&payload, now, Some(TokenUse::Id)).is_ok());
    }

    #[test]
    fn test_validate_id_token_audience() {
        let now = now();
        let mut claims = id_token_claims(TEST_ISSUER, now + 3600);
        claims["aud"] = json!("RECIPIENT");
        let payload = payload(claims);

        let err = validator().validate(&payload, now, None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ClaimRejectedError);

        // 多个 app client 中任意一个匹配即可
        let multi = ClaimValidator::new(VerifierConfig::new(
            ["first-client", "RECIPIENT", "third-client"],
            TEST_ISSUER,
        ));
        assert!(multi.validate(&payload, now, None).is_ok());

        let none = ClaimValidator::new(VerifierConfig::new(Vec::<String>::new(), TEST_ISSUER));
        assert!(none.validate(&payload, now, None).is_err());
    }

    #[test]
    fn test_validate_issuer_mismatch() {
        let now = now();
        for claims in [
            id_token_claims("https://cognito-idp.us-east-1.amazonaws.com/other", now + 3600),
            access_token_claims("B", now + 3600),
        ] {
            let err = validator().validate(&payload(claims), now, None).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::ClaimRejectedError);
        }
    }

    #[test]
    fn test_validate_expiry_is_strict() {
        let now = now();
        let validator = validator();

        let at_now = payload(access_token_claims(TEST_ISSUER, now));
        let err = validator.validate(&at_now, now, None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ClaimRejectedError);

        let expired = payload(id_token_claims(TEST_ISSUER, now - 1));
        assert!(validator.validate(&expired, now, None).is_err());

        let just_valid = payload(id_token_claims(TEST_ISSUER, now + 1));
        assert!(validator.validate(&just_valid, now, None).is_ok());
    }

    #[test]
    fn test_validate_access_token_ignores_audience() {
        let now = now();
        let mut claims = access_token_claims(TEST_ISSUER, now + 3600);
        claims["aud"] = json!("someone-else");
        claims["client_id"] = json!("unrelated-client");
        let payload = payload(claims);

        let validator = ClaimValidator::new(VerifierConfig::new(["A"], TEST_ISSUER));
        assert!(validator.validate(&payload, now, None).is_ok());
        assert!(validator.validate(&payload, now, Some(TokenUse::Access)).is_ok());
    }

    #[test]
    fn test_validate_expected_token_use() {
        let now = now();
        let access = payload(access_token_claims(TEST_ISSUER, now + 3600));
        let id = payload(id_token_claims(TEST_ISSUER, now + 3600));

        let err = validator().validate(&access, now, Some(TokenUse::Id)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ClaimRejectedError);
        let err = validator().validate(&id, now, Some(TokenUse::Access)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ClaimRejectedError);
    }

    // ==================== 签发者构造 ====================

    #[test]
    fn test_build_issuer() {
        assert_eq!(build_issuer(TEST_POOL_ID), TEST_ISSUER);
        assert_eq!(
            build_issuer_with_domain("cn-north-1_Pool", "amazonaws.com.cn"),
            "https://cognito-idp.cn-north-1.amazonaws.com.cn/cn-north-1_Pool"
        );

        let config = VerifierConfig::for_user_pool(TEST_POOL_ID, [TEST_APP_ID]);
        assert_eq!(config.expected_issuer(), TEST_ISSUER);
        assert!(config.expected_audiences().contains(TEST_APP_ID));
    }

    #[test]
    fn test_clock_before_epoch_is_rejected() {
        let before = UNIX_EPOCH - Duration::from_secs(1);
        let err = seconds_since_epoch(before).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ClaimRejectedError);

        let after = UNIX_EPOCH + Duration::from_secs(1_700_000_000);
        assert_eq!(seconds_since_epoch(after).unwrap(), 1_700_000_000);
    }
}
