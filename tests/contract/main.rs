//! Contract tests: the bridge against a mocked Gemini web app.

mod api;
mod common;
mod gemini;
