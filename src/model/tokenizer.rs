use std::sync::Arc;

use tokenizers::Tokenizer;
use tracing::info;

use crate::{config::AppConfig, error::ServiceError};

const EOS_TOKEN: &str = "</s>";
const UNK_TOKEN: &str = "<unk>";

/// Converts between text and the token strings the inference engine consumes.
///
/// The source language is an argument of every `encode` call rather than a
/// setting on the codec, so concurrent requests never observe each other's
/// language.
pub trait TextCodec: Send + Sync {
    fn encode(&self, text: &str, source_lang: &str) -> Result<Vec<String>, ServiceError>;
    /// Decodes a target hypothesis, dropping special tokens such as language tags.
    fn decode(&self, tokens: &[String]) -> Result<String, ServiceError>;
    fn has_token(&self, token: &str) -> bool;
}

pub struct NllbTokenizer {
    inner: Arc<Tokenizer>,
}

impl NllbTokenizer {
    pub fn new(inner: Tokenizer) -> Self {
        Self {
            inner: Arc::new(inner),
        }
    }

    /// Prefers a local `tokenizer.json` when configured and present, otherwise
    /// fetches the tokenizer from the hub.
    pub fn load(config: &AppConfig) -> Result<Self, ServiceError> {
        let tokenizer = match config.tokenizer_path.as_deref() {
            Some(path) if path.exists() => {
                info!(path = %path.display(), "loading tokenizer from file");
                Tokenizer::from_file(path)
            }
            _ => {
                info!(id = %config.tokenizer_id, "loading tokenizer");
                Tokenizer::from_pretrained(&config.tokenizer_id, None)
            }
        }
        .map_err(|e| ServiceError::Tokenizer(e.to_string()))?;

        Ok(Self::new(tokenizer))
    }
}

impl TextCodec for NllbTokenizer {
    fn encode(&self, text: &str, source_lang: &str) -> Result<Vec<String>, ServiceError> {
        if !self.has_token(source_lang) {
            return Err(ServiceError::Tokenizer(format!(
                "unknown source language tag '{source_lang}'"
            )));
        }

        let encoding = self
            .inner
            .encode(text, false)
            .map_err(|e| ServiceError::Tokenizer(e.to_string()))?;

        // NLLB layout: `<src_lang> pieces... </s>`
        let pieces = encoding.get_tokens();
        let mut tokens = Vec::with_capacity(pieces.len() + 2);
        tokens.push(source_lang.to_string());
        tokens.extend(pieces.iter().cloned());
        tokens.push(EOS_TOKEN.to_string());
        Ok(tokens)
    }

    fn decode(&self, tokens: &[String]) -> Result<String, ServiceError> {
        let unk = self.inner.token_to_id(UNK_TOKEN);
        let ids = tokens
            .iter()
            .map(|token| {
                self.inner.token_to_id(token).or(unk).ok_or_else(|| {
                    ServiceError::Tokenizer(format!("token '{token}' is not in the vocabulary"))
                })
            })
            .collect::<Result<Vec<u32>, _>>()?;

        self.inner
            .decode(&ids, true)
            .map_err(|e| ServiceError::Tokenizer(e.to_string()))
    }

    fn has_token(&self, token: &str) -> bool {
        self.inner.token_to_id(token).is_some()
    }
}
