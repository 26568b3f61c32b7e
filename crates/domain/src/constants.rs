//! Application constants
//!
//! Centralized location for limits and user-facing messages shared by the
//! core services and the presentation layer.

// Validation limits
pub const MIN_PASSWORD_LENGTH: usize = 6;
pub const MAX_TEXT_FIELD_LENGTH: usize = 255;

// Session handling
pub const DEFAULT_REFRESH_THRESHOLD_SECS: i64 = 60;

// Remote store
pub const DEFAULT_PROFILES_TABLE: &str = "profiles";

// OAuth providers offered on the login screen
pub const OAUTH_PROVIDER_GOOGLE: &str = "google";
pub const OAUTH_PROVIDER_MICROSOFT: &str = "azure";

// Login screen messages
pub const MSG_LOGIN_SUCCESS: &str = "Login successful! Redirecting...";
pub const MSG_ALREADY_REGISTERED: &str = "This email is already registered. Please try logging in.";
pub const MSG_SIGNUP_SUCCESS: &str = "Account created successfully! Please login.";
pub const MSG_UNEXPECTED: &str = "An unexpected error occurred. Please try again.";

// Profile screen messages
pub const MSG_PROFILE_SAVED: &str = "Profile updated successfully!";
pub const MSG_PROFILE_SAVE_FAILED: &str = "Error updating profile. Please try again.";
pub const MSG_PROFILE_LOAD_FAILED: &str = "Error loading profile data";
pub const MSG_NOT_AUTHENTICATED: &str = "User not authenticated";
