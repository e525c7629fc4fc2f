//! OAuth setup collaborator
//!
//! Token acquisition and storage happen outside this service. The
//! collaborator only tells the operator where to authorize and what to do
//! with the resulting token.

use crate::config::{ResolvedCredentials, MEETUP_ACCESS_TOKEN_ENV, MEETUP_CLIENT_ID_ENV};
use serde::Serialize;
use thiserror::Error;
use url::Url;

pub const MEETUP_AUTHORIZE_URL: &str = "https://secure.meetup.com/oauth2/authorize";

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Meetup client id not configured. Set {env} or credentials.meetup_client_id in the TOML config")]
    MissingClientId { env: &'static str },

    #[error("Invalid authorization URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

/// Authorization URL plus operator instructions
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthSetup {
    pub url: String,
    pub instructions: Vec<String>,
}

impl AuthSetup {
    /// Human-readable rendering for tool responses
    pub fn render(&self) -> String {
        let mut out = format!("Meetup OAuth Authorization URL:\n{}\n\nInstructions:", self.url);
        for (i, step) in self.instructions.iter().enumerate() {
            out.push_str(&format!("\n{}. {}", i + 1, step));
        }
        out
    }
}

pub trait AuthCollaborator: Send + Sync {
    /// URL the operator opens to grant access
    fn setup(&self) -> Result<AuthSetup, AuthError>;
}

/// Meetup OAuth2 authorization-code flow
#[derive(Debug, Clone)]
pub struct MeetupOAuth {
    authorize_url: String,
    client_id: Option<String>,
    redirect_uri: String,
}

impl MeetupOAuth {
    pub fn new(authorize_url: &str, client_id: Option<String>, redirect_uri: String) -> Self {
        Self {
            authorize_url: authorize_url.to_string(),
            client_id,
            redirect_uri,
        }
    }

    pub fn from_credentials(credentials: &ResolvedCredentials) -> Self {
        Self::new(
            MEETUP_AUTHORIZE_URL,
            credentials.meetup_client_id.clone(),
            credentials.meetup_redirect_uri.clone(),
        )
    }
}

impl AuthCollaborator for MeetupOAuth {
    fn setup(&self) -> Result<AuthSetup, AuthError> {
        let client_id = self
            .client_id
            .as_deref()
            .filter(|id| !id.trim().is_empty())
            .ok_or(AuthError::MissingClientId {
                env: MEETUP_CLIENT_ID_ENV,
            })?;

        let url = Url::parse_with_params(
            &self.authorize_url,
            &[
                ("client_id", client_id),
                ("response_type", "code"),
                ("redirect_uri", self.redirect_uri.as_str()),
                ("scope", "basic"),
            ],
        )?;

        Ok(AuthSetup {
            url: url.to_string(),
            instructions: vec![
                "Open the URL in your browser".to_string(),
                "Log in to Meetup.com and authorize the application".to_string(),
                format!(
                    "Copy the authorization code from the redirect to {}",
                    self.redirect_uri
                ),
                "Exchange the code for an access token".to_string(),
                format!(
                    "Set {} (or credentials.meetup_access_token) and restart the service",
                    MEETUP_ACCESS_TOKEN_ENV
                ),
            ],
        })
    }
}
