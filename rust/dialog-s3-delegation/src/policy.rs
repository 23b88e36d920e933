//! IAM policies used to narrow the permissions of role tokens.

use serde::{Deserialize, Serialize};

use crate::DelegationError;

/// IAM policy language version.
pub const POLICY_VERSION: &str = "2012-10-17";

/// Whether a statement allows or denies its actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Effect {
    /// Grant the actions.
    Allow,
    /// Deny the actions.
    Deny,
}

/// A single policy statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Statement {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    sid: Option<String>,
    effect: Effect,
    action: Vec<String>,
    resource: Vec<String>,
}

impl Statement {
    /// A statement with the given effect.
    pub fn new<A, R>(effect: Effect, actions: A, resources: R) -> Self
    where
        A: IntoIterator,
        A::Item: Into<String>,
        R: IntoIterator,
        R::Item: Into<String>,
    {
        Self {
            sid: None,
            effect,
            action: actions.into_iter().map(Into::into).collect(),
            resource: resources.into_iter().map(Into::into).collect(),
        }
    }

    /// Attach a statement id.
    pub fn with_sid(mut self, sid: impl Into<String>) -> Self {
        self.sid = Some(sid.into());
        self
    }

    /// Statement effect.
    pub fn effect(&self) -> Effect {
        self.effect
    }

    /// Actions covered.
    pub fn actions(&self) -> &[String] {
        &self.action
    }

    /// Resources covered.
    pub fn resources(&self) -> &[String] {
        &self.resource
    }
}

/// An IAM policy document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Policy {
    version: String,
    statement: Vec<Statement>,
}

impl Policy {
    /// A policy made of `statements`.
    pub fn new(statements: impl IntoIterator<Item = Statement>) -> Self {
        Self {
            version: POLICY_VERSION.to_string(),
            statement: statements.into_iter().collect(),
        }
    }

    /// Read and write access to every object in `bucket`.
    pub fn bucket_read_write(bucket: &str) -> Self {
        let bucket_arn = format!("arn:aws:s3:::{}", bucket);
        let objects_arn = format!("arn:aws:s3:::{}/*", bucket);
        Self::new([
            Statement::new(
                Effect::Allow,
                ["s3:ListBucket", "s3:ListBucketMultipartUploads", "s3:GetBucketLocation"],
                [bucket_arn],
            )
            .with_sid("BucketOperations"),
            Statement::new(
                Effect::Allow,
                [
                    "s3:GetObject*",
                    "s3:PutObject*",
                    "s3:DeleteObject*",
                    "s3:AbortMultipartUpload",
                    "s3:ListMultipartUploadParts",
                ],
                [objects_arn],
            )
            .with_sid("ObjectOperations"),
        ])
    }

    /// Statements in the policy.
    pub fn statements(&self) -> &[Statement] {
        &self.statement
    }

    /// Serialize to the JSON form STS accepts.
    pub fn to_json(&self) -> Result<String, DelegationError> {
        serde_json::to_string(self)
            .map_err(|e| DelegationError::configuration(format!("Unserializable policy: {}", e)))
    }
}
