//! Configuration keys, token kind names and error messages shared by the
//! delegation token bindings.
//!
//! This module carries no behavior.

use std::time::Duration;

/// Binding used for the primary delegation token: `fs.s3a.delegation.token.binding`.
///
/// Unset or empty disables delegation tokens.
pub const DELEGATION_TOKEN_BINDING: &str = "fs.s3a.delegation.token.binding";

/// Comma separated list of secondary bindings: `fs.s3a.delegation.token.secondary.bindings`.
///
/// Each entry is either `kind` or `service=kind`. Without an explicit service
/// the binding is registered under `{canonical service}/{kind}`.
pub const DELEGATION_SECONDARY_BINDINGS: &str = "fs.s3a.delegation.token.secondary.bindings";

/// Session token binding name.
pub const DELEGATION_TOKEN_SESSION_BINDING: &str = "session";

/// Full credentials binding name.
pub const DELEGATION_TOKEN_FULL_CREDENTIALS_BINDING: &str = "full";

/// Assumed role binding name.
pub const DELEGATION_TOKEN_ROLE_BINDING: &str = "role";

/// Encrypting binding name. Only marshalls encryption secrets.
pub const DELEGATION_TOKEN_ENCRYPTING_BINDING: &str = "encrypting";

/// Injecting binding name. Test and fault injection only.
pub const DELEGATION_TOKEN_INJECTING_BINDING: &str = "injecting";

/// STS endpoint used when minting session and role credentials.
pub const DELEGATION_TOKEN_ENDPOINT: &str = "fs.s3a.assumed.role.sts.endpoint";

/// Signing region for the STS endpoint; must be set if the endpoint is.
pub const DELEGATION_TOKEN_REGION: &str = "fs.s3a.assumed.role.sts.endpoint.region";

/// Default STS signing region.
pub const DEFAULT_DELEGATION_TOKEN_REGION: &str = "us-west-1";

/// Lifetime of issued session and role credentials.
pub const DELEGATION_TOKEN_DURATION: &str = "fs.s3a.assumed.role.session.duration";

/// Default token lifetime.
pub const DEFAULT_DELEGATION_TOKEN_DURATION: Duration = Duration::from_secs(3600);

/// Credential providers used to authenticate against STS or to deploy
/// unbonded credentials.
pub const DELEGATION_TOKEN_CREDENTIALS_PROVIDER: &str = "fs.s3a.aws.credentials.provider";

/// ARN of the role assumed by the role binding.
pub const DELEGATION_TOKEN_ROLE_ARN: &str = "fs.s3a.assumed.role.arn";

/// Access key of locally configured credentials.
pub const ACCESS_KEY: &str = "fs.s3a.access.key";

/// Secret key of locally configured credentials.
pub const SECRET_KEY: &str = "fs.s3a.secret.key";

/// Session token of locally configured temporary credentials.
pub const SESSION_TOKEN: &str = "fs.s3a.session.token";

/// Kind name of the session token.
pub const SESSION_TOKEN_NAME: &str = "S3ADelegationToken/Session";

/// Kind name of the full credentials token.
pub const FULL_TOKEN_NAME: &str = "S3ADelegationToken/Full";

/// Kind name of the role token.
pub const ROLE_TOKEN_NAME: &str = "S3ADelegationToken/Role";

/// Kind name of the encrypting token.
pub const ENCRYPTING_TOKEN_NAME: &str = "S3ADelegationToken/Encrypting";

/// Kind name of the injecting token.
pub const INJECTING_TOKEN_NAME: &str = "S3ADelegationToken/Injecting";

/// Providers the injecting binding deploys, bonded or unbonded.
pub const INJECTING_CREDENTIALS_PROVIDER: &str = "fs.s3a.delegation.injecting.credentials.provider";

/// Whether the injecting binding issues tokens.
pub const INJECTING_ISSUE_TOKENS: &str = "fs.s3a.delegation.injecting.issue.tokens";

/// Default for [`INJECTING_ISSUE_TOKENS`].
pub const INJECTING_ISSUE_TOKENS_DEFAULT: bool = true;

/// Service name of the injecting binding. Empty means derive it from the
/// filesystem URI.
pub const INJECTING_SERVICE_NAME: &str = "fs.s3a.delegation.injecting.service.name";

/// The standard STS server.
pub const STS_STANDARD: &str = "sts.amazonaws.com";

/// Shortest duration STS accepts for session and role credentials.
pub const MIN_SESSION_DURATION: Duration = Duration::from_secs(900);

/// Longest duration STS accepts for `GetSessionToken`.
pub const MAX_SESSION_DURATION: Duration = Duration::from_secs(129_600);

/// Longest duration STS accepts for `AssumeRole`.
pub const MAX_ROLE_SESSION_DURATION: Duration = Duration::from_secs(43_200);

/// A role binding over session level credentials cannot issue tokens.
pub const E_NO_SESSION_TOKENS_FOR_ROLE_BINDING: &str =
    "Cannot issue S3A Role Delegation Tokens without full AWS credentials";

/// No role ARN was configured.
pub const E_NO_ARN: &str = "No role ARN defined in fs.s3a.assumed.role.arn";

/// A service was bound to a filesystem more than once.
pub const E_ALREADY_BOUND: &str = "bind_to_file_system called twice";

/// A service was initialized before being bound to a filesystem.
pub const E_NO_CANONICAL_URI: &str = "service does not have a canonical URI";
