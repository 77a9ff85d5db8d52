//! ACS3-HMAC-SHA256 request signing for AlibabaCloud RPC-style OpenAPI calls.

use std::collections::BTreeMap;

use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

use crate::config::Credentials;
use crate::error::RemoteError;

pub const ALGORITHM: &str = "ACS3-HMAC-SHA256";

type HmacSha256 = Hmac<Sha256>;

/// Everything that goes into the signature of a single request.
#[derive(Debug, Clone)]
pub struct SigningInput<'a> {
    pub method: &'a str,
    pub host: &'a str,
    pub action: &'a str,
    pub version: &'a str,
    /// Already canonicalised, see [`canonical_query`].
    pub query: &'a str,
    pub payload: &'a [u8],
    pub date: String,
    pub nonce: String,
}

pub fn hex_sha256(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

/// RFC 3986 encoded `key=value` pairs sorted by key and joined with `&`.
pub fn canonical_query(params: &BTreeMap<String, String>) -> String {
    params
        .iter()
        .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&")
}

/// Returns the full header set for the request, `authorization` included.
pub fn sign(
    credentials: &Credentials,
    input: &SigningInput<'_>,
) -> Result<Vec<(String, String)>, RemoteError> {
    let mut headers = BTreeMap::new();
    headers.insert("host".to_string(), input.host.to_string());
    headers.insert("x-acs-action".to_string(), input.action.to_string());
    headers.insert("x-acs-version".to_string(), input.version.to_string());
    headers.insert("x-acs-date".to_string(), input.date.clone());
    headers.insert("x-acs-signature-nonce".to_string(), input.nonce.clone());
    headers.insert("x-acs-content-sha256".to_string(), hex_sha256(input.payload));
    if let Some(token) = &credentials.security_token {
        headers.insert("x-acs-security-token".to_string(), token.clone());
    }

    let signed_headers = headers.keys().cloned().collect::<Vec<_>>().join(";");
    let canonical_headers: String = headers
        .iter()
        .map(|(name, value)| format!("{}:{}\n", name, value.trim()))
        .collect();

    let canonical_request = format!(
        "{}\n/\n{}\n{}\n{}\n{}",
        input.method,
        input.query,
        canonical_headers,
        signed_headers,
        hex_sha256(input.payload)
    );
    let string_to_sign = format!(
        "{}\n{}",
        ALGORITHM,
        hex_sha256(canonical_request.as_bytes())
    );

    let mut mac = HmacSha256::new_from_slice(credentials.access_key_secret.as_bytes())
        .map_err(|e| RemoteError::Encode(format!("invalid access key secret: {}", e)))?;
    mac.update(string_to_sign.as_bytes());
    let signature = hex::encode(mac.finalize().into_bytes());

    let authorization = format!(
        "{} Credential={},SignedHeaders={},Signature={}",
        ALGORITHM, credentials.access_key_id, signed_headers, signature
    );

    let mut out: Vec<(String, String)> = headers.into_iter().collect();
    out.push(("authorization".to_string(), authorization));
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn credentials(token: Option<&str>) -> Credentials {
        Credentials {
            access_key_id: "YourAccessKeyId".to_string(),
            access_key_secret: "YourAccessKeySecret".to_string(),
            security_token: token.map(str::to_string),
        }
    }

    fn header<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
        headers
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    #[test]
    fn test_canonical_query_encoding() {
        let params = BTreeMap::from([
            ("RegionId".to_string(), "cn-hangzhou".to_string()),
            ("DBInstanceId".to_string(), "dds-bp1".to_string()),
            ("SecurityIPList".to_string(), "10.0.0.1,10.0.0.2/24".to_string()),
            ("VpcName".to_string(), "my vpc*".to_string()),
        ]);
        assert_eq!(
            canonical_query(&params),
            "DBInstanceId=dds-bp1&RegionId=cn-hangzhou&SecurityIPList=10.0.0.1%2C10.0.0.2%2F24&VpcName=my%20vpc%2A"
        );
        assert_eq!(canonical_query(&BTreeMap::new()), "");
    }

    #[test]
    fn test_empty_payload_hash() {
        assert_eq!(
            hex_sha256(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_sign_vector() {
        let input = SigningInput {
            method: "POST",
            host: "mongodb.aliyuncs.com",
            action: "DescribeDBInstances",
            version: "2015-12-01",
            query: "RegionId=cn-hangzhou",
            payload: b"",
            date: "2024-01-01T00:00:00Z".to_string(),
            nonce: "3156853299f313e23d1673dc12e1703d".to_string(),
        };
        let headers = sign(&credentials(None), &input).unwrap();

        assert_eq!(
            header(&headers, "authorization"),
            Some(
                "ACS3-HMAC-SHA256 Credential=YourAccessKeyId,\
                 SignedHeaders=host;x-acs-action;x-acs-content-sha256;x-acs-date;x-acs-signature-nonce;x-acs-version,\
                 Signature=3d1e4ca76b079fcf0a14731c42f584f6374896b606f6e7628f8dc3c7f6bd5159"
            )
        );
        assert_eq!(header(&headers, "x-acs-action"), Some("DescribeDBInstances"));
        assert_eq!(header(&headers, "x-acs-version"), Some("2015-12-01"));
        assert_eq!(header(&headers, "x-acs-security-token"), None);
    }

    #[test]
    fn test_security_token_is_signed() {
        let input = SigningInput {
            method: "POST",
            host: "vpc.cn-hangzhou.aliyuncs.com",
            action: "DescribeVpcs",
            version: "2016-04-28",
            query: "PageNumber=1&PageSize=10&RegionId=cn-hangzhou",
            payload: b"",
            date: "2024-01-01T00:00:00Z".to_string(),
            nonce: "nonce".to_string(),
        };
        let headers = sign(&credentials(Some("sts-token")), &input).unwrap();
        assert_eq!(header(&headers, "x-acs-security-token"), Some("sts-token"));
        let authorization = header(&headers, "authorization").unwrap();
        assert!(authorization.contains("x-acs-security-token"));

        let unsigned = sign(&credentials(None), &input).unwrap();
        assert_ne!(header(&unsigned, "authorization"), Some(authorization));
    }
}
