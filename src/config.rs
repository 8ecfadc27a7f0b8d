use clap::Parser;
use tracing::warn;

#[derive(Clone, Debug, Parser)]
#[command(name = "aurore-backoffice")]
pub struct Config {
    #[arg(long, env = "AURORE_PORT", default_value_t = 7410)]
    pub port: u16,

    #[arg(long, env = "AURORE_DB_URL", default_value = "sqlite://./aurore.db")]
    pub db_url: String,

    #[arg(long, env = "AURORE_LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    #[command(flatten)]
    pub auth: AuthConfig,

    /// Origins allowed by CORS. Empty means any origin.
    #[arg(long, env = "AURORE_CORS_ORIGINS", value_delimiter = ',')]
    pub cors_origins: Vec<String>,

    #[arg(long, env = "AURORE_MAX_REQUEST_BODY_BYTES", default_value_t = 1024 * 1024)]
    pub max_request_body_bytes: usize,
}

#[derive(Clone, Debug, clap::Args)]
pub struct AuthConfig {
    /// Shared HS256 secret of the identity provider.
    #[arg(long = "auth-jwt-secret", env = "AURORE_AUTH_JWT_SECRET", default_value = "")]
    pub jwt_secret: String,

    #[arg(long = "auth-issuer", env = "AURORE_AUTH_ISSUER")]
    pub issuer: Option<String>,

    #[arg(long = "auth-audience", env = "AURORE_AUTH_AUDIENCE")]
    pub audience: Option<String>,

    /// Emails that receive the ADMIN role when they complete their profile.
    #[arg(long = "admin-emails", env = "AURORE_ADMIN_EMAILS", value_delimiter = ',')]
    pub admin_emails: Vec<String>,
}

impl AuthConfig {
    pub fn is_admin_email(&self, email: &str) -> bool {
        self.admin_emails
            .iter()
            .any(|candidate| candidate.trim().eq_ignore_ascii_case(email.trim()))
    }
}

impl Config {
    pub fn from_env() -> Self {
        let config = <Self as Parser>::parse();
        config.validate();
        config
    }

    pub fn log_startup_warnings(&self) {
        if self.cors_origins.is_empty() {
            warn!("AURORE_CORS_ORIGINS is unset, cross-origin requests are allowed from any origin");
        }

        if self.auth.admin_emails.is_empty() {
            warn!("AURORE_ADMIN_EMAILS is unset, nobody can be provisioned as admin");
        }

        if self.auth.issuer.is_none() {
            warn!("AURORE_AUTH_ISSUER is unset, token issuer is not checked");
        }
    }

    fn validate(&self) {
        assert!(
            !self.auth.jwt_secret.trim().is_empty(),
            "AURORE_AUTH_JWT_SECRET must be set"
        );
        assert!(
            self.max_request_body_bytes > 0,
            "AURORE_MAX_REQUEST_BODY_BYTES must be greater than 0"
        );
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use crate::config::Config;

    #[test]
    fn parses_comma_separated_lists() {
        let config = Config::try_parse_from([
            "aurore-backoffice",
            "--auth-jwt-secret",
            "secret",
            "--admin-emails",
            "aurore@example.com, assistant@example.com",
            "--cors-origins",
            "https://aurore.example,https://admin.aurore.example",
        ])
        .expect("arguments should parse");

        assert_eq!(config.port, 7410);
        assert_eq!(config.cors_origins.len(), 2);
        assert!(config.auth.is_admin_email("AURORE@example.com"));
        assert!(config.auth.is_admin_email("assistant@example.com"));
        assert!(!config.auth.is_admin_email("client@example.com"));
    }
}
