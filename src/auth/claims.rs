use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Access tokens authorize API calls; refresh tokens only rotate the pair.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    #[serde(alias = "Access")]
    Access,
    #[serde(alias = "Refresh")]
    Refresh,
}

/// Foodgram session token payload. `sub` is the user id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub iat: usize,
    pub exp: usize,
    pub iss: String,
    pub aud: String,
    pub kind: TokenKind,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_is_lowercase_on_the_wire() {
        assert_eq!(serde_json::to_value(TokenKind::Refresh).unwrap(), "refresh");
        let kind: TokenKind = serde_json::from_str("\"Access\"").unwrap();
        assert_eq!(kind, TokenKind::Access);
    }
}
