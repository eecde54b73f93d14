// ABOUTME: Integration tests for validated domain types.
// ABOUTME: Property tests for container identities and digest recognition.

use proptest::prelude::*;
use rollkeeper::types::*;

mod ctid_tests {
    use super::*;

    #[test]
    fn rejects_zero_and_negative() {
        assert_eq!(Ctid::new(0), Err(CtidError::NotPositive(0)));
        assert_eq!(Ctid::new(-5), Err(CtidError::NotPositive(-5)));
    }

    #[test]
    fn deserializes_from_number() {
        let ctid: Ctid = serde_json::from_str("160").unwrap();
        assert_eq!(ctid.get(), 160);
        assert!(serde_json::from_str::<Ctid>("0").is_err());
    }

    proptest! {
        #[test]
        fn positive_ids_round_trip_through_text(id in 1i64..=(u32::MAX as i64)) {
            let ctid = Ctid::new(id).unwrap();
            prop_assert_eq!(ctid.get() as i64, id);
            prop_assert_eq!(ctid.to_string().parse::<Ctid>().unwrap(), ctid);
        }

        #[test]
        fn non_positive_ids_are_rejected(id in i64::MIN..=0) {
            prop_assert!(Ctid::new(id).is_err());
        }
    }
}

mod digest_tests {
    use super::*;

    #[test]
    fn at_prefix_is_stripped() {
        let digest = Digest::from_pinned("@sha256:abc").unwrap();
        assert_eq!(digest.as_str(), "sha256:abc");
    }

    #[test]
    fn plain_tags_are_not_pinned() {
        assert!(Digest::from_pinned("latest").is_none());
        assert!(Digest::from_pinned("v1.2.3").is_none());
        assert!(Digest::from_pinned("sha256:").is_none());
    }

    proptest! {
        #[test]
        fn hex_digests_are_recognized(hex in "[0-9a-f]{64}", at in any::<bool>()) {
            let tag = format!("{}sha256:{}", if at { "@" } else { "" }, hex);
            let digest = Digest::from_pinned(&tag).unwrap();
            prop_assert_eq!(digest.as_str(), format!("sha256:{}", hex));
            prop_assert!(digest.is_content_addressed());
        }

        #[test]
        fn semver_tags_are_never_digests(major in 0u32..100, minor in 0u32..100) {
            let tag = format!("v{}.{}", major, minor);
            prop_assert!(!Digest::is_pinned(&tag));
        }
    }
}

mod image_name_tests {
    use super::*;

    #[test]
    fn references_use_at_for_digests() {
        let image = ImageName::parse("ghcr.io/org/app").unwrap();
        assert_eq!(image.reference("sha256:abc"), "ghcr.io/org/app@sha256:abc");
        assert_eq!(image.reference("@sha256:abc"), "ghcr.io/org/app@sha256:abc");
        assert_eq!(image.reference("main"), "ghcr.io/org/app:main");
    }

    #[test]
    fn rejects_embedded_digest_and_spaces() {
        assert!(ImageName::parse("app@sha256:abc").is_err());
        assert!(ImageName::parse("my app").is_err());
        assert!(ImageName::parse("").is_err());
    }
}

mod service_name_tests {
    use super::*;

    #[test]
    fn accepts_dns_labels() {
        assert_eq!(ServiceName::new("composer-web").unwrap().as_str(), "composer-web");
    }

    #[test]
    fn rejects_invalid_labels() {
        assert!(ServiceName::new("-web").is_err());
        assert!(ServiceName::new("web_1").is_err());
        assert!(ServiceName::new(&"a".repeat(64)).is_err());
    }
}
