use std::sync::Arc;

use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use sqlx::AnyPool;

use crate::config::Config;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub db: AnyPool,
    pub token_verifier: Arc<TokenVerifier>,
}

impl AppState {
    pub fn new(config: Config, db: AnyPool) -> Self {
        let token_verifier = TokenVerifier::new(&config);
        Self {
            config: Arc::new(config),
            db,
            token_verifier: Arc::new(token_verifier),
        }
    }
}

/// Decoding key and validation rules for identity provider tokens.
pub struct TokenVerifier {
    pub key: DecodingKey,
    pub validation: Validation,
}

impl TokenVerifier {
    fn new(config: &Config) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        match config.auth.audience.as_deref() {
            Some(audience) => validation.set_audience(&[audience]),
            None => validation.validate_aud = false,
        }
        if let Some(issuer) = config.auth.issuer.as_deref() {
            validation.set_issuer(&[issuer]);
        }

        Self {
            key: DecodingKey::from_secret(config.auth.jwt_secret.as_bytes()),
            validation,
        }
    }
}
