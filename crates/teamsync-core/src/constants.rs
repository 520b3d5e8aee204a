// ABOUTME: Protocol constants for the device authorization flow and token lifecycle
// ABOUTME: Client id, default lifetimes, store key prefixes, and user-code alphabet
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 TeamSync

/// Device authorization flow
pub mod device {
    /// The only client id accepted by `/auth/device`
    pub const VSCODE_CLIENT_ID: &str = "vscode-extension";

    /// Lifetime of a device-code record in seconds
    pub const DEFAULT_DEVICE_CODE_TTL_SECS: u64 = 600;

    /// Interval clients must wait between polls, in seconds
    pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 5;

    /// Added to the poll interval when the server answers `slow_down`
    pub const SLOW_DOWN_INCREMENT_SECS: u64 = 5;

    /// Random bytes in a device code (hex encoded to twice this length)
    pub const DEVICE_CODE_BYTES: usize = 32;

    /// Characters in a user code, excluding the separator
    pub const USER_CODE_LENGTH: usize = 8;

    /// Characters per dash-separated group of a user code
    pub const USER_CODE_GROUP: usize = 4;

    /// Alphabet user codes are drawn from
    pub const USER_CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

    /// Attempts to reserve a fresh user code before giving up
    pub const USER_CODE_MAX_ATTEMPTS: usize = 5;

    /// Path of the approval page on the web console
    pub const VERIFICATION_PATH: &str = "/auth/device";
}

/// Token lifetimes
pub mod tokens {
    /// Access token lifetime in seconds (15 minutes)
    pub const DEFAULT_ACCESS_TOKEN_TTL_SECS: u64 = 900;

    /// Refresh token lifetime in seconds (7 days)
    pub const DEFAULT_REFRESH_TOKEN_TTL_SECS: u64 = 7 * 24 * 60 * 60;

    /// `token_type` value in token responses
    pub const BEARER: &str = "Bearer";

    /// Clients treat tokens expiring within this window as already expired
    pub const CLIENT_EXPIRY_SKEW_SECS: i64 = 30;
}

/// Ephemeral store key prefixes
pub mod keys {
    /// Namespace prepended to every key written to Redis
    pub const STORE_KEY_PREFIX: &str = "teamsync:";

    /// `device_code:{device_code}` -> pending authorization
    pub const DEVICE_CODE: &str = "device_code:";

    /// `user_code:{user_code}` -> device code
    pub const USER_CODE: &str = "user_code:";

    /// `device_approval:{user_code}` -> approval record
    pub const DEVICE_APPROVAL: &str = "device_approval:";

    /// `refresh_used:{jti}` -> marker for a spent refresh token
    pub const REFRESH_USED: &str = "refresh_used:";

    /// `revoked_before:{user_id}` -> unix milliseconds cutoff for refresh tokens
    pub const REVOKED_BEFORE: &str = "revoked_before:";
}

/// Service identity
pub mod service {
    /// Service name used in structured logs
    pub const SERVICE_NAME: &str = "teamsync-server";

    /// Default API base URL used by clients
    pub const DEFAULT_API_URL: &str = "https://api.teamsync.dev";

    /// Default web console URL
    pub const DEFAULT_FRONTEND_URL: &str = "http://localhost:3000";

    /// Client-side cap on poll attempts
    pub const DEFAULT_MAX_POLL_ATTEMPTS: u32 = 60;
}
