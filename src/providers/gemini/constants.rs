//! Endpoints, cookie names and protocol constants for the Gemini web app.

use std::time::Duration;

// ============================================================================
// Endpoints
// ============================================================================

/// Default origin of the Gemini web app.
pub const DEFAULT_BASE_URL: &str = "https://gemini.google.com";

/// Landing page whose markup embeds the access token.
pub const APP_PATH: &str = "/app";

/// RPC endpoint for single-turn and chat generation.
pub const STREAM_GENERATE_PATH: &str =
    "/_/BardChatUi/data/assistant.lamda.BardFrontendService/StreamGenerate";

/// Batched RPC endpoint used for research retrieval.
pub const BATCH_EXECUTE_PATH: &str = "/_/BardChatUi/data/batchexecute";

/// Build label the web app sends with batched RPCs.
pub const BUILD_LABEL: &str = "boq_assistant-bard-web-server_20250208.10_p1";

/// RPC id that returns a finished deep research report.
pub const RETRIEVE_RESEARCH_RPC: &str = "kwDCne";

// ============================================================================
// Cookies and form fields
// ============================================================================

pub const COOKIE_PSID: &str = "__Secure-1PSID";
pub const COOKIE_PSIDTS: &str = "__Secure-1PSIDTS";
pub const COOKIE_PSIDCC: &str = "__Secure-1PSIDCC";

/// Form and query field carrying the access token.
pub const FIELD_ACCESS_TOKEN: &str = "at";

/// Form field carrying the encoded request.
pub const FIELD_REQUEST: &str = "f.req";

/// Pattern locating the access token in the landing page markup.
pub const ACCESS_TOKEN_PATTERN: &str = r#""SNlM0e":"([^"]+)""#;

// ============================================================================
// Response envelope
// ============================================================================

/// First line of every RPC response; guards against JSON hijacking.
pub const ANTI_HIJACK_PREFIX: &str = ")]}'";

/// Marker identifying an envelope item that carries a payload.
pub const RESPONSE_MARKER: &str = "wrb.fr";

/// Marker identifying an envelope item that reports an RPC error.
pub const ERROR_MARKER: &str = "er";

// ============================================================================
// Deep research
// ============================================================================

/// Number of positional slots in a deep research request.
pub const DEEP_RESEARCH_SLOTS: usize = 65;

/// Feature identifier sent with the planning phase.
pub const DEEP_RESEARCH_FEATURE_ID: &str = "7aed6d3c8dcea919033bfd7cdb523177";

/// Prompt that tells the service to execute an approved research plan.
pub const DEEP_RESEARCH_START_PROMPT: &str = "Start research";

/// Locale sent with every deep research request.
pub const DEFAULT_LOCALE: &str = "en";

// ============================================================================
// Timing
// ============================================================================

/// How often the access token is re-scraped when not configured.
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// Browser user agent; the web app serves reduced markup to unknown clients.
pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";
