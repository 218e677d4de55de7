/// Authentication extractors and utilities
///
/// Identity tokens are HS256 JWTs issued by the external identity provider.
/// The token only names the user; role and display name always come from the
/// stored profile.
use crate::{
    complaints::Actor,
    context::AppContext,
    error::{ServiceError, ServiceResult},
    users::{Role, User},
};
use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{request::Parts, HeaderMap},
};
use serde::{Deserialize, Serialize};

/// Claims read from identity tokens
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User id
    pub sub: String,
    pub exp: usize,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

/// Authenticated context - resolves the caller's profile from the bearer token
///
/// A valid token for a user without a profile creates a citizen profile.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub user: User,
}

impl AuthContext {
    pub fn user_id(&self) -> &str {
        &self.user.id
    }

    pub fn actor(&self) -> Actor {
        Actor::from(&self.user)
    }

    pub fn require_citizen(&self) -> ServiceResult<()> {
        match self.user.role {
            Role::Citizen => Ok(()),
            Role::MunicipalOfficer | Role::Admin => Err(ServiceError::Authorization(
                "Only citizens can do this".to_string(),
            )),
        }
    }

    /// Officers and admins
    pub fn require_staff(&self) -> ServiceResult<()> {
        if self.user.role.is_staff() {
            Ok(())
        } else {
            Err(ServiceError::Authorization(
                "Municipal officer or admin role required".to_string(),
            ))
        }
    }

    pub fn require_admin(&self) -> ServiceResult<()> {
        match self.user.role {
            Role::Admin => Ok(()),
            Role::Citizen | Role::MunicipalOfficer => Err(ServiceError::Authorization(
                "Admin role required".to_string(),
            )),
        }
    }
}

#[async_trait]
impl FromRequestParts<AppContext> for AuthContext {
    type Rejection = ServiceError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppContext,
    ) -> Result<Self, Self::Rejection> {
        // Extract bearer token from Authorization header
        let token = extract_bearer_token(&parts.headers)
            .ok_or_else(|| ServiceError::Authentication("Missing authorization header".to_string()))?;

        let claims = verify_jwt_token(&token, &state.config.authentication.jwt_secret)?;

        let user = state
            .users
            .ensure_profile(&claims.sub, claims.email.as_deref(), claims.name.as_deref())
            .await?;

        tracing::debug!("Authenticated {} as {}", user.id, user.role.as_str());
        Ok(AuthContext { user })
    }
}

/// Extract bearer token from Authorization header
pub fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get("authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
        .map(|token| token.trim().to_string())
        .filter(|token| !token.is_empty())
}

/// Verify a JWT token with full validation
///
/// This performs:
/// 1. JWT signature verification
/// 2. Expiration checking
/// 3. Claims validation
pub fn verify_jwt_token(token: &str, jwt_secret: &str) -> ServiceResult<Claims> {
    use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};

    let decoding_key = DecodingKey::from_secret(jwt_secret.as_bytes());
    let mut validation = Validation::new(Algorithm::HS256);
    // Allow some clock skew (5 minutes)
    validation.leeway = 300;

    let token_data = decode::<Claims>(token, &decoding_key, &validation).map_err(|e| {
        tracing::warn!("JWT verification failed: {}", e);
        match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                ServiceError::Authentication("Token has expired".to_string())
            }
            jsonwebtoken::errors::ErrorKind::InvalidSignature => {
                ServiceError::Authentication("Invalid token signature".to_string())
            }
            _ => ServiceError::Authentication(format!("Invalid token: {}", e)),
        }
    })?;

    if token_data.claims.sub.trim().is_empty() {
        return Err(ServiceError::Authentication(
            "Invalid token: missing 'sub' claim".to_string(),
        ));
    }

    Ok(token_data.claims)
}
