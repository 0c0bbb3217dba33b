//! Model provider adapters. The rest of the crate only ever sees the
//! `Embedder` and `Generator` capability traits.

mod gemini;

pub use gemini::{
    GEMINI_EMBED_MODELS, GeminiConfig, GeminiEmbedder, GeminiGenerator, GeminiModelInfo,
    default_embed_model_info, get_embed_model_info,
};
