//! Route paths served by [`crate::router`].

pub const POST_AUTH_REGISTER: &str = "/api/auth/register";
pub const POST_AUTH_LOGIN: &str = "/api/auth/login";
pub const POST_AUTH_REFRESH: &str = "/api/auth/refresh";
pub const GET_AUTH_PROFILE: &str = "/api/auth/profile";
pub const POST_AUTH_LOGOUT: &str = "/api/auth/logout";
pub const GET_HEALTH: &str = "/health";
