use std::fmt;

use anyhow::{Result, anyhow};
use rand::RngCore;

pub const TOKEN_BYTES: usize = 32;
pub const MAX_BEARER_HEADER_LEN: usize = 256;

const _: () = assert!(MAX_BEARER_HEADER_LEN >= TOKEN_BYTES * 2 + 7);

/// Opaque admin session token, hex encoded.
#[derive(Clone, PartialEq, Eq)]
pub struct Token(String);

impl Token {
    pub fn generate() -> Self {
        let mut bytes = [0u8; TOKEN_BYTES];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(hex::encode(bytes))
    }

    pub fn parse(value: &str) -> Result<Self> {
        let bytes = decode_hex_with_expected(value, TOKEN_BYTES, "session token")?;
        Ok(Self(hex::encode(bytes)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

// Keeps tokens out of logs.
impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Token({}…)", &self.0[..8.min(self.0.len())])
    }
}

/// Extracts the token from an `Authorization: Bearer <hex>` header value.
pub fn parse_bearer(header: &str) -> Result<Token> {
    if header.len() > MAX_BEARER_HEADER_LEN {
        return Err(anyhow!(
            "Authorization header exceeds {MAX_BEARER_HEADER_LEN} byte limit"
        ));
    }
    let trimmed = header.trim();
    let value = trimmed
        .strip_prefix("Bearer ")
        .or_else(|| trimmed.strip_prefix("bearer "))
        .ok_or_else(|| anyhow!("Authorization header must use the Bearer scheme"))?;
    Token::parse(value)
}

pub fn decode_hex_with_expected(value: &str, expected_len: usize, label: &str) -> Result<Vec<u8>> {
    assert!(expected_len > 0, "Expected length must be > 0");
    assert!(
        expected_len <= 4096,
        "Expected length exceeds defensive bound"
    );
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(anyhow!("{label} cannot be empty"));
    }
    let bytes =
        hex::decode(trimmed).map_err(|err| anyhow!("Failed to decode {label} as hex: {err}"))?;
    if bytes.len() != expected_len {
        return Err(anyhow!(
            "{label} must be {expected_len} bytes, got {}",
            bytes.len()
        ));
    }
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_tokens_parse_back() {
        let token = Token::generate();
        assert_eq!(token.as_str().len(), TOKEN_BYTES * 2);
        let parsed = Token::parse(token.as_str()).expect("generated token parses");
        assert_eq!(parsed, token);
    }

    #[test]
    fn generated_tokens_differ() {
        assert_ne!(Token::generate(), Token::generate());
    }

    #[test]
    fn parse_normalizes_case() {
        let lower = "ab".repeat(TOKEN_BYTES);
        assert_eq!(Token::parse(&lower.to_uppercase()).unwrap().as_str(), lower);
    }

    #[test]
    fn parse_rejects_hex_prefix() {
        let prefixed = format!("0x{}", "ab".repeat(TOKEN_BYTES));
        assert!(Token::parse(&prefixed).is_err());
    }

    #[test]
    fn parse_rejects_wrong_length_and_garbage() {
        assert!(Token::parse("").is_err());
        assert!(Token::parse("abcd").is_err());
        assert!(Token::parse(&"zz".repeat(TOKEN_BYTES)).is_err());
    }

    #[test]
    fn bearer_header_parsing() {
        let token = Token::generate();
        let header = format!("Bearer {}", token.as_str());
        assert_eq!(parse_bearer(&header).unwrap(), token);
        assert!(parse_bearer(&format!("Basic {}", token.as_str())).is_err());
        assert!(parse_bearer(&"x".repeat(MAX_BEARER_HEADER_LEN + 1)).is_err());
    }

    #[test]
    fn debug_output_is_truncated() {
        let token = Token::generate();
        let rendered = format!("{token:?}");
        assert!(!rendered.contains(token.as_str()));
    }
}
