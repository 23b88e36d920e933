//! A session token issued by one process and redeemed by another.
mod common;

mod session_scenario {
    use std::time::Duration;

    use dialog_s3_delegation::constants::DELEGATION_TOKEN_DURATION;
    use dialog_s3_delegation::{
        BindingKind, EncryptionSecrets, ServiceName, TokenBinding, TokenKind, TokenPayload,
    };
    use pretty_assertions::assert_eq;
    use testresult::TestResult;

    use crate::common::{MockSts, StsCall, full_config, started};

    #[tokio::test]
    async fn it_issues_and_redeems_an_hour_long_session_token() -> TestResult {
        let config = full_config().with(DELEGATION_TOKEN_DURATION, "3600s");
        let sts = MockSts::new();

        let mut issuer = started(BindingKind::Session, &config, sts.clone());
        let token = issuer
            .create_delegation_token(None, &EncryptionSecrets::none(), None)
            .await?;
        assert_eq!(token.kind(), &TokenKind::SESSION);
        assert_eq!(token.service(), &ServiceName::new("s3a://example-bucket"));
        assert_eq!(
            sts.calls(),
            vec![StsCall::GetSessionToken {
                caller: "AKIAEXAMPLE".into(),
                duration: Duration::from_secs(3600),
            }]
        );

        let identifier = token.identifier();
        assert!(identifier.expiry().is_some());
        assert!(matches!(identifier.payload(), TokenPayload::Credentials(_)));
        assert!(identifier.origin().contains("alice"));

        let mut redeemer = started(BindingKind::Session, &config, MockSts::new());
        let providers = redeemer.bind_to_token_identifier(identifier.clone())?;
        let credentials = providers.credentials()?;
        assert_eq!(credentials.access_key_id(), "ASIAMOCK1");
        assert!(!credentials.secret_access_key().is_empty());
        assert_eq!(credentials.session_token(), Some("mock-session-token-1"));
        assert_eq!(redeemer.decoded_identifier(), Some(identifier));
        Ok(())
    }

    #[tokio::test]
    async fn it_tags_the_user_agent_with_the_session() -> TestResult {
        let config = full_config().with(DELEGATION_TOKEN_DURATION, "3600s");
        let mut issuer = started(BindingKind::Session, &config, MockSts::new());
        assert_eq!(issuer.user_agent_field(), "");

        let token = issuer
            .create_delegation_token(None, &EncryptionSecrets::none(), None)
            .await?;
        let mut redeemer = started(BindingKind::Session, &config, MockSts::new());
        redeemer.bind_to_token_identifier(token.identifier().clone())?;
        assert_eq!(
            redeemer.user_agent_field(),
            format!("; session ID {}", token.identifier().uuid())
        );
        Ok(())
    }
}
