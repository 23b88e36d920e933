//! Configured primary and secondary bindings driven together.
mod common;

mod tokens {
    use dialog_s3_delegation::constants::{
        DELEGATION_SECONDARY_BINDINGS, DELEGATION_TOKEN_BINDING, DELEGATION_TOKEN_ROLE_ARN,
        INJECTING_ISSUE_TOKENS,
    };
    use dialog_s3_delegation::{
        Configuration, CredentialsBundle, DelegationError, DelegationTokens, EncryptionSecrets,
        Policy, ServiceName, ServiceState, TokenBinding, TokenKind,
    };
    use pretty_assertions::assert_eq;
    use testresult::TestResult;

    use crate::common::{MockSts, ROLE_ARN, StsCall, as_sts, context, full_config, uri};

    fn started(config: &Configuration, sts: std::sync::Arc<MockSts>) -> DelegationTokens {
        let mut tokens = DelegationTokens::new(as_sts(sts));
        tokens.bind_to_file_system(uri(), context()).unwrap();
        tokens.init(config).unwrap();
        tokens.start().unwrap();
        tokens
    }

    fn services(bundle: &CredentialsBundle) -> Vec<(String, TokenKind)> {
        bundle
            .tokens()
            .map(|(service, token)| (service.to_string(), token.kind().clone()))
            .collect()
    }

    #[tokio::test]
    async fn it_issues_nothing_when_disabled() -> TestResult {
        let mut tokens = started(&full_config(), MockSts::new());
        assert!(!tokens.is_enabled());
        assert!(tokens.primary().is_none());

        let bundle = tokens
            .create_delegation_tokens(None, &EncryptionSecrets::none())
            .await?;
        assert!(bundle.is_empty());
        assert!(tokens.bind_to_any_delegation_token(&bundle)?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn it_registers_each_binding_under_its_own_service() -> TestResult {
        let config = full_config()
            .with(DELEGATION_TOKEN_BINDING, "session")
            .with(
                DELEGATION_SECONDARY_BINDINGS,
                "encrypting, s3a://example-bucket/copy=full",
            );
        let sts = MockSts::new();
        let mut issuer = started(&config, sts.clone());
        assert_eq!(issuer.secondaries().len(), 2);

        let bundle = issuer
            .create_delegation_tokens(Some("yarn"), &EncryptionSecrets::none())
            .await?;
        assert_eq!(
            services(&bundle),
            vec![
                ("s3a://example-bucket".to_string(), TokenKind::SESSION),
                ("s3a://example-bucket/copy".to_string(), TokenKind::FULL),
                ("s3a://example-bucket/encrypting".to_string(), TokenKind::ENCRYPTING),
            ]
        );
        assert_eq!(sts.calls().len(), 1);

        let mut redeemer = started(&config, sts);
        let deployed = redeemer.bind_to_any_delegation_token(&bundle)?;
        assert_eq!(deployed.len(), 3);
        for (service, providers) in &deployed {
            assert!(providers.credentials().is_ok(), "{service}");
        }
        let primary = redeemer.primary().expect("primary binding");
        assert_eq!(
            primary.bound_token(),
            bundle.token(&ServiceName::new("s3a://example-bucket"))
        );
        assert_eq!(
            primary.decoded_identifier().and_then(|id| id.renewer()),
            Some("yarn")
        );
        Ok(())
    }

    #[tokio::test]
    async fn it_restricts_role_tokens_to_the_bucket() -> TestResult {
        let config = full_config()
            .with(DELEGATION_TOKEN_BINDING, "role")
            .with(DELEGATION_TOKEN_ROLE_ARN, ROLE_ARN);
        let sts = MockSts::new();
        let mut tokens = started(&config, sts.clone());
        tokens
            .create_delegation_tokens(None, &EncryptionSecrets::none())
            .await?;

        let calls = sts.calls();
        let [StsCall::AssumeRole { request, .. }] = calls.as_slice() else {
            panic!("expected one AssumeRole call, got {calls:?}");
        };
        assert_eq!(
            request.policy,
            Some(Policy::bucket_read_write("example-bucket").to_json()?)
        );
        Ok(())
    }

    #[tokio::test]
    async fn it_deploys_unbonded_credentials_without_a_token() -> TestResult {
        let config = full_config()
            .with(DELEGATION_TOKEN_BINDING, "injecting")
            .with(INJECTING_ISSUE_TOKENS, "false");
        let mut tokens = started(&config, MockSts::new());

        let bundle = tokens
            .create_delegation_tokens(None, &EncryptionSecrets::none())
            .await?;
        assert!(bundle.is_empty());

        let deployed = tokens.bind_to_any_delegation_token(&bundle)?;
        let [(service, providers)] = deployed.as_slice() else {
            panic!("expected one deployment, got {deployed:?}");
        };
        assert_eq!(service, &ServiceName::new("s3a://example-bucket"));
        assert_eq!(providers.names(), vec!["simple"]);
        assert_eq!(providers.credentials()?.access_key_id(), "AKIAEXAMPLE");
        Ok(())
    }

    #[test]
    fn it_rejects_services_claimed_twice() {
        let config = full_config()
            .with(DELEGATION_TOKEN_BINDING, "session")
            .with(
                DELEGATION_SECONDARY_BINDINGS,
                "encrypting, s3a://example-bucket/encrypting=full",
            );
        let mut tokens = DelegationTokens::new(as_sts(MockSts::new()));
        tokens.bind_to_file_system(uri(), context()).unwrap();

        let error = tokens.init(&config).unwrap_err();
        assert!(matches!(error, DelegationError::Configuration(_)));
        assert_eq!(tokens.state(), ServiceState::Stopped);
    }

    #[test]
    fn it_rejects_unknown_bindings() {
        let mut tokens = DelegationTokens::new(None);
        tokens.bind_to_file_system(uri(), context()).unwrap();
        let error = tokens
            .init(&full_config().with(DELEGATION_TOKEN_BINDING, "kerberos"))
            .unwrap_err();
        assert_eq!(
            error.to_string(),
            "Configuration error: Unknown delegation token binding \"kerberos\""
        );
    }

    #[tokio::test]
    async fn it_refuses_to_issue_once_stopped() {
        let mut tokens = started(
            &full_config().with(DELEGATION_TOKEN_BINDING, "full"),
            MockSts::new(),
        );
        tokens.stop();
        assert_eq!(
            tokens.primary().map(|primary| primary.state()),
            Some(ServiceState::Stopped)
        );
        assert!(matches!(
            tokens
                .create_delegation_tokens(None, &EncryptionSecrets::none())
                .await,
            Err(DelegationError::IllegalState { .. })
        ));
    }
}
