//! Session-related types.
//!
//! Types stored in the session for authentication state.

use serde::{Deserialize, Serialize};

use wholesale_core::{UserId, UserRole};

/// Session-stored user identity.
///
/// Taken from the access token's claims at login. Used for display and
/// routing only; the API enforces every permission itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentUser {
    /// User's API id.
    pub user_id: UserId,
    pub username: String,
    #[serde(default)]
    pub role: UserRole,
    #[serde(default)]
    pub is_staff: bool,
    #[serde(default)]
    pub is_superuser: bool,
    #[serde(default)]
    pub company_name: Option<String>,
}

impl CurrentUser {
    /// Whether the user may open the back-office pages.
    #[must_use]
    pub const fn is_admin(&self) -> bool {
        self.is_staff || self.is_superuser
    }

    /// Name shown in the navigation bar.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.company_name
            .as_deref()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or(&self.username)
    }
}

/// Session keys for authentication data.
pub mod keys {
    /// Key for storing the current logged-in user.
    pub const CURRENT_USER: &str = "current_user";

    /// Key for the API access token.
    pub const ACCESS_TOKEN: &str = "access_token";

    /// Key for the API refresh token.
    pub const REFRESH_TOKEN: &str = "refresh_token";

    /// Key for the cart (JSON array of items).
    pub const CART: &str = wholesale_core::cart::CART_STORAGE_KEY;
}
