//! Wire protocols.
//!
//! - `gemini` - Google Gemini `generateContent` request/response types
//! - `api` - JSON bodies of the gateway's own HTTP endpoints

pub mod api;
pub mod gemini;

pub use api::{
    ErrorBody, ProxyRequest, ProxySuccess, ValidationStatus, VerifyCodeRequest,
    VerifyCodeResponse,
};
pub use gemini::{
    Candidate, Content, GenerateContentRequest, GenerateContentResponse, GenerationConfig,
    ImageConfig, InlineData, Part, PromptFeedback,
};
