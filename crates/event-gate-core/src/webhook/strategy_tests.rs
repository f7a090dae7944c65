//! Tests for the verification strategies.

use super::*;

const BODY: &[u8] = b"Hello";
const SHA1_FOO_HELLO: &str = "sha1=604d24b8ee1050e2eca86ffe3c25301be297990e";
const V1_FOO_HELLO: &str = "v1=fa687477a49ebadb72eb1103db6128061437a2501db7ee7f0cbbb79ceaa2fcfc";

fn secret(value: &str) -> SecretValue {
    SecretValue::from_string(value.to_string())
}

fn is_mismatch(result: Result<(), VerificationError>) -> bool {
    matches!(result, Err(VerificationError::VerificationMismatch { .. }))
}

fn is_malformed(result: Result<(), VerificationError>) -> bool {
    matches!(result, Err(VerificationError::MalformedCredential { .. }))
}

mod hmac_sha1_tests {
    use super::*;

    #[test]
    fn test_known_vector_is_accepted() {
        let result =
            VerificationStrategy::HmacSha1Prefixed.verify(SHA1_FOO_HELLO, &secret("foo"), BODY);
        assert!(result.is_ok(), "{result:?}");
    }

    #[test]
    fn test_wrong_secret_is_rejected() {
        let result =
            VerificationStrategy::HmacSha1Prefixed.verify(SHA1_FOO_HELLO, &secret("fop"), BODY);
        assert!(is_mismatch(result));
    }

    #[test]
    fn test_mutated_body_is_rejected() {
        let result =
            VerificationStrategy::HmacSha1Prefixed.verify(SHA1_FOO_HELLO, &secret("foo"), b"Hellp");
        assert!(is_mismatch(result));
    }

    #[test]
    fn test_missing_prefix_is_rejected() {
        let bare = SHA1_FOO_HELLO.trim_start_matches("sha1=");
        let result = VerificationStrategy::HmacSha1Prefixed.verify(bare, &secret("foo"), BODY);
        assert!(is_mismatch(result));
    }

    #[test]
    fn test_uppercase_hex_is_rejected() {
        let upper = format!("sha1={}", SHA1_FOO_HELLO[5..].to_uppercase());
        let result = VerificationStrategy::HmacSha1Prefixed.verify(&upper, &secret("foo"), BODY);
        assert!(is_mismatch(result));
    }
}

mod hmac_sha256_tests {
    use super::*;

    #[test]
    fn test_known_vector_is_accepted() {
        let result =
            VerificationStrategy::HmacSha256Prefixed.verify(V1_FOO_HELLO, &secret("foo"), BODY);
        assert!(result.is_ok(), "{result:?}");
    }

    #[test]
    fn test_sha1_credential_is_rejected() {
        let result =
            VerificationStrategy::HmacSha256Prefixed.verify(SHA1_FOO_HELLO, &secret("foo"), BODY);
        assert!(is_mismatch(result));
    }

    #[test]
    fn test_truncated_signature_is_rejected() {
        let truncated = &V1_FOO_HELLO[..V1_FOO_HELLO.len() - 1];
        let result =
            VerificationStrategy::HmacSha256Prefixed.verify(truncated, &secret("foo"), BODY);
        assert!(is_mismatch(result));
    }
}

mod signature_list_tests {
    use super::*;

    #[test]
    fn test_single_entry_is_accepted() {
        let result = VerificationStrategy::SignatureList.verify(V1_FOO_HELLO, &secret("foo"), BODY);
        assert!(result.is_ok(), "{result:?}");
    }

    #[test]
    fn test_match_anywhere_in_list_is_accepted() {
        let list = format!("v1=deadbeef,{V1_FOO_HELLO},v1=cafebabe");
        let result = VerificationStrategy::SignatureList.verify(&list, &secret("foo"), BODY);
        assert!(result.is_ok(), "{result:?}");
    }

    #[test]
    fn test_entry_with_surrounding_whitespace_is_rejected() {
        let list = format!("v1=deadbeef, {V1_FOO_HELLO}");
        let result = VerificationStrategy::SignatureList.verify(&list, &secret("foo"), BODY);
        assert!(is_mismatch(result));
    }

    #[test]
    fn test_list_without_match_is_rejected() {
        let result = VerificationStrategy::SignatureList.verify(
            "v1=deadbeef,v1=cafebabe",
            &secret("foo"),
            BODY,
        );
        assert!(is_mismatch(result));
    }

    #[test]
    fn test_list_of_only_separators_is_malformed() {
        let result = VerificationStrategy::SignatureList.verify(" , ,", &secret("foo"), BODY);
        assert!(is_malformed(result));
    }

    #[test]
    fn test_parse_drops_blank_entries() {
        assert_eq!(parse_signature_list("a, ,b,,"), vec!["a", "b"]);
        assert_eq!(parse_signature_list("a, b"), vec!["a", " b"]);
        assert!(parse_signature_list(",").is_empty());
    }
}

mod shared_token_tests {
    use super::*;

    #[test]
    fn test_matching_token_is_accepted() {
        let result = VerificationStrategy::SharedToken.verify("foo", &secret("foo"), BODY);
        assert!(result.is_ok(), "{result:?}");
    }

    #[test]
    fn test_different_token_is_rejected() {
        assert!(is_mismatch(VerificationStrategy::SharedToken.verify("bar", &secret("foo"), BODY)));
        assert!(is_mismatch(VerificationStrategy::SharedToken.verify("fo", &secret("foo"), BODY)));
        assert!(is_mismatch(VerificationStrategy::SharedToken.verify(
            "foo ",
            &secret("foo"),
            BODY
        )));
    }

    #[test]
    fn test_body_does_not_matter() {
        let result = VerificationStrategy::SharedToken.verify("foo", &secret("foo"), b"anything");
        assert!(result.is_ok());
    }

    #[test]
    fn test_non_utf8_secret_is_unavailable() {
        let secret = SecretValue::from_bytes(vec![0xff, 0xfe, 0xfd]);
        let result = VerificationStrategy::SharedToken.verify("foo", &secret, BODY);
        assert!(matches!(result, Err(VerificationError::SecretUnavailable { .. })));
    }
}

#[test]
fn test_empty_credential_is_malformed_for_every_strategy() {
    let strategies = [
        VerificationStrategy::HmacSha1Prefixed,
        VerificationStrategy::HmacSha256Prefixed,
        VerificationStrategy::SignatureList,
        VerificationStrategy::SharedToken,
    ];

    for strategy in strategies {
        assert!(is_malformed(strategy.verify("", &secret("foo"), BODY)), "{strategy:?}");
        // Empty secret and empty credential must never match.
        assert!(is_malformed(strategy.verify("", &secret(""), b"")), "{strategy:?}");
    }
}

#[test]
fn test_mismatch_names_the_strategy() {
    let err = VerificationStrategy::SharedToken
        .verify("bar", &secret("foo"), BODY)
        .unwrap_err();
    let VerificationError::VerificationMismatch { provider } = &err else {
        panic!("expected a mismatch, got {err:?}");
    };
    assert_eq!(provider, "shared_token");
}
