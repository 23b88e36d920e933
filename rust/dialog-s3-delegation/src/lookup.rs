//! Locating tokens in a credentials bundle.

use tracing::debug;

use crate::DelegationError;
use crate::token::{CredentialsBundle, ServiceName, Token, TokenKind};

/// Find the token registered under `service` and check it is of `kind`.
///
/// Absence is not an error: `Ok(None)` tells the caller to fall back to
/// unbonded credentials. A token of another kind under the same service is a
/// [`DelegationError::TokenKindMismatch`].
pub fn lookup_token(
    bundle: &CredentialsBundle,
    service: &ServiceName,
    kind: &TokenKind,
) -> Result<Option<Token>, DelegationError> {
    let Some(token) = bundle.token(service) else {
        debug!(%service, "No token registered");
        return Ok(None);
    };
    if token.kind() != kind {
        return Err(DelegationError::TokenKindMismatch {
            service: service.clone(),
            expected: kind.clone(),
            found: token.kind().clone(),
        });
    }
    debug!(%service, %kind, "Found token");
    Ok(Some(token.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identifier::TokenIdentifier;
    use pretty_assertions::assert_eq;
    use testresult::TestResult;

    fn bundle(service: &ServiceName, kind: TokenKind) -> CredentialsBundle {
        let mut bundle = CredentialsBundle::new();
        bundle.add_token(
            service.clone(),
            Token::new(TokenIdentifier::empty(kind), service.clone()),
        );
        bundle
    }

    #[test]
    fn it_returns_nothing_for_unknown_services() -> TestResult {
        let bundle = bundle(&ServiceName::new("s3a://other"), TokenKind::SESSION);
        let found = lookup_token(&bundle, &ServiceName::new("s3a://bucket"), &TokenKind::SESSION)?;
        assert!(found.is_none());
        Ok(())
    }

    #[test]
    fn it_rejects_tokens_of_another_kind() {
        let service = ServiceName::new("s3a://bucket");
        let bundle = bundle(&service, TokenKind::FULL);
        let error = lookup_token(&bundle, &service, &TokenKind::SESSION).unwrap_err();
        assert_eq!(
            error.to_string(),
            "Token under service s3a://bucket is of kind S3ADelegationToken/Full; \
             expected S3ADelegationToken/Session"
        );
    }

    #[test]
    fn it_returns_matching_tokens_unchanged() -> TestResult {
        let service = ServiceName::new("s3a://bucket");
        let bundle = bundle(&service, TokenKind::SESSION);
        let found = lookup_token(&bundle, &service, &TokenKind::SESSION)?;
        assert_eq!(found.as_ref(), bundle.token(&service));
        Ok(())
    }
}
