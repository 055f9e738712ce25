//! # gemini
//!
//! Cookie-authenticated client for the Gemini web app.
//!
//! The web app speaks a batched JSON-over-form protocol: requests carry an
//! access token scraped from the app page and a double-encoded `f.req`
//! payload, and replies arrive as length-framed envelope lines behind an
//! anti-hijacking prefix.
//!
//! ## Quick Start
//!
//! ```no_run
//! use ai_bridges::providers::gemini::{Credentials, GeminiWebClient};
//!
//! # async fn example() -> Result<(), ai_bridges::providers::ProviderError> {
//! let client = GeminiWebClient::builder()
//!     .with_credentials(Credentials::new("<__Secure-1PSID>"))
//!     .build()?;
//! client.init().await?;
//!
//! let reply = client.generate_content("Hello", &[]).await?;
//! println!("{}", reply.text);
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod client;
pub mod codec;
pub mod constants;
pub mod provider;
pub mod research;
pub mod session;

pub use auth::{Credentials, SessionAuthenticator};
pub use client::{GeminiWebClient, GeminiWebClientBuilder};
pub use provider::GeminiWebProvider;
pub use research::{DeepResearch, ResearchState};
pub use session::GeminiChatSession;
