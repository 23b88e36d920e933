//! AWS Signature Version 4 for STS query API requests.
//!
//! STS takes form encoded POST bodies signed through the `Authorization`
//! header rather than presigned query strings.

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

use crate::credentials::AwsCredentials;

/// Service name STS signs under.
pub(super) const SERVICE: &str = "sts";

/// Content type of STS query API requests.
pub(super) const CONTENT_TYPE: &str = "application/x-www-form-urlencoded; charset=utf-8";

/// Compute the headers authorizing a POST of `body` to `host`.
///
/// Returns the headers to send, including `authorization`.
pub(super) fn sign_post(
    credentials: &AwsCredentials,
    region: &str,
    host: &str,
    body: &str,
    time: DateTime<Utc>,
) -> Vec<(String, String)> {
    let timestamp = time.format("%Y%m%dT%H%M%SZ").to_string();
    let date = &timestamp[0..8];
    let scope = format!("{}/{}/{}/aws4_request", date, region, SERVICE);

    let mut headers = vec![
        ("content-type".to_string(), CONTENT_TYPE.to_string()),
        ("host".to_string(), host.to_string()),
        ("x-amz-date".to_string(), timestamp.clone()),
    ];
    if let Some(token) = credentials.session_token() {
        headers.push(("x-amz-security-token".to_string(), token.to_string()));
    }
    headers.sort_by(|a, b| a.0.cmp(&b.0));

    let signed_headers = headers
        .iter()
        .map(|(k, _)| k.as_str())
        .collect::<Vec<_>>()
        .join(";");

    let canonical_headers: String = headers
        .iter()
        .map(|(k, v)| format!("{}:{}\n", k, v.trim()))
        .collect();

    let payload_hash = hex_encode(&Sha256::digest(body.as_bytes()));
    let canonical_request = format!(
        "POST\n/\n\n{}\n{}\n{}",
        canonical_headers, signed_headers, payload_hash
    );

    let digest = Sha256::digest(canonical_request.as_bytes());
    let payload = format!(
        "AWS4-HMAC-SHA256\n{}\n{}\n{}",
        timestamp,
        scope,
        hex_encode(&digest)
    );

    let key = SigningKey::derive(credentials.secret_access_key(), date, region, SERVICE);
    let signature = key.sign(payload.as_bytes());

    headers.push((
        "authorization".to_string(),
        format!(
            "AWS4-HMAC-SHA256 Credential={}/{}, SignedHeaders={}, Signature={}",
            credentials.access_key_id(),
            scope,
            signed_headers,
            signature
        ),
    ));
    headers
}

/// AWS SigV4 signing key.
struct SigningKey(Hmac<Sha256>);

impl SigningKey {
    /// Derive a signing key for the given date, region, and service.
    fn derive(secret_key: &str, date: &str, region: &str, service: &str) -> Self {
        let date_key = hmac_sha256(format!("AWS4{}", secret_key).as_bytes(), date.as_bytes());
        let region_key = hmac_sha256(&date_key, region.as_bytes());
        let service_key = hmac_sha256(&region_key, service.as_bytes());
        let signing_key = hmac_sha256(&service_key, b"aws4_request");

        Self(Hmac::new_from_slice(&signing_key).expect("HMAC can take key of any size"))
    }

    /// Sign a message with this key.
    fn sign(&self, message: &[u8]) -> Signature {
        let mut mac = self.0.clone();
        mac.update(message);
        Signature(mac.finalize().into_bytes().to_vec())
    }
}

/// AWS SigV4 signature.
struct Signature(Vec<u8>);

impl std::fmt::Display for Signature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&hex_encode(&self.0))
    }
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut mac = Hmac::<Sha256>::new_from_slice(key).expect("HMAC can take key of any size");
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().fold(String::with_capacity(bytes.len() * 2), |mut out, byte| {
        out.push_str(&format!("{byte:02x}"));
        out
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 17, 12, 30, 0).unwrap()
    }

    fn authorization(headers: &[(String, String)]) -> &str {
        headers
            .iter()
            .find(|(name, _)| name == "authorization")
            .map(|(_, value)| value.as_str())
            .unwrap()
    }

    #[test]
    fn it_derives_the_documented_signing_key() {
        // Key derivation example from the AWS SigV4 documentation.
        let key = hmac_sha256(
            b"AWS4wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY",
            b"20120215",
        );
        let key = hmac_sha256(&key, b"us-east-1");
        let key = hmac_sha256(&key, b"iam");
        let key = hmac_sha256(&key, b"aws4_request");
        assert_eq!(
            hex_encode(&key),
            "f4780e2d9f65fa895f9c67b32ce1baf0b0d8a43505a000a1a9e090d414db404d"
        );
    }

    #[test]
    fn it_signs_with_a_scoped_credential() {
        let credentials = AwsCredentials::new("AKIAEXAMPLE", "secret");
        let headers = sign_post(
            &credentials,
            "us-west-1",
            "sts.amazonaws.com",
            "Action=GetSessionToken&Version=2011-06-15",
            time(),
        );

        let authorization = authorization(&headers);
        assert!(authorization.starts_with(
            "AWS4-HMAC-SHA256 Credential=AKIAEXAMPLE/20240517/us-west-1/sts/aws4_request, \
             SignedHeaders=content-type;host;x-amz-date, Signature="
        ));
        let signature = authorization.rsplit('=').next().unwrap();
        assert_eq!(signature.len(), 64);
        assert!(signature.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn it_signs_the_canonical_request() {
        let credentials = AwsCredentials::new("AKIAEXAMPLE", "secret");
        let headers = sign_post(
            &credentials,
            "us-west-1",
            "sts.amazonaws.com",
            "Action=GetSessionToken&Version=2011-06-15",
            time(),
        );

        assert_eq!(
            authorization(&headers),
            "AWS4-HMAC-SHA256 Credential=AKIAEXAMPLE/20240517/us-west-1/sts/aws4_request, \
             SignedHeaders=content-type;host;x-amz-date, \
             Signature=2288f1aa93fbed481e7195862896a9c7bb8fd4f07c0009d89fead95cf9ce3c5e"
        );
    }

    #[test]
    fn it_signs_the_session_token_of_temporary_credentials() {
        let credentials = AwsCredentials::session("ASIAEXAMPLE", "secret", "token");
        let headers = sign_post(&credentials, "us-west-1", "sts.amazonaws.com", "", time());

        assert!(headers
            .iter()
            .any(|(name, value)| name == "x-amz-security-token" && value == "token"));
        assert!(authorization(&headers)
            .contains("SignedHeaders=content-type;host;x-amz-date;x-amz-security-token"));
    }

    #[test]
    fn it_produces_stable_signatures() {
        let credentials = AwsCredentials::new("AKIAEXAMPLE", "secret");
        let body = "Action=GetSessionToken";
        let first = sign_post(&credentials, "us-west-1", "sts.amazonaws.com", body, time());
        let second = sign_post(&credentials, "us-west-1", "sts.amazonaws.com", body, time());
        assert_eq!(authorization(&first), authorization(&second));

        let other = AwsCredentials::new("AKIAEXAMPLE", "other-secret");
        let third = sign_post(&other, "us-west-1", "sts.amazonaws.com", body, time());
        assert_ne!(authorization(&first), authorization(&third));
    }
}
