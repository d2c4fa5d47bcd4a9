//! Session parameters and the keyed updates the presentation layer sends.

use std::time::Duration;

use generation_provider::{clamp_max_output_tokens, clamp_temperature};
use serde_json::{json, Value};
use groq_api::models::default_model_id;
use thiserror::Error;

pub const DEFAULT_INTERVAL_MS: u64 = 2_000;
pub const DEFAULT_WORDS_PER_TICK: usize = 3;
pub const DEFAULT_TEMPERATURE: f64 = 0.75;
pub const DEFAULT_MAX_OUTPUT_TOKENS: u32 = 700;

pub const DEFAULT_SEED_TEXT: &str = "Nel mondo nulla resta fermo: anche le frasi cambiano pelle.";

pub const DEFAULT_SYSTEM_INSTRUCTIONS: &str = "Sei un narratore-metabolizzatore di testi.
L'utente ti fornisce un testo: trattalo come materia viva.

Obiettivo:
- Il testo è la tua base, ma tu puoi cambiarlo, un certo numero di parole alla volta.
- Il cambiamento è una storia, e deve avere senso.
- Introduci variazioni sottili e coerenti: cambia alcune parole, sostituisci sinonimi, sposta lievemente il ritmo, se poche parole possono cambiare la storia lasciando un senso compiuto, fallo.
- Non distruggere la sensatezza delle frasi: le cose devono rimanere umanamente leggibili

Nota:
Divertiti, è questo il ciclo dell'universo: stesso seme, diversa fioritura.";

/// Shown instead of a blank seed on start and reset.
pub const EMPTY_SEED_PLACEHOLDER: &str = "(testo vuoto)";

/// Becomes the new target when a generation comes back blank.
pub const EMPTY_RESPONSE_PLACEHOLDER: &str = "(risposta vuota)";

#[derive(Debug, Clone, PartialEq)]
pub struct SessionParams {
    pub interval_ms: u64,
    pub words_per_tick: usize,
    pub temperature: f64,
    pub max_output_tokens: u32,
    pub model: String,
    pub seed_text: String,
    pub system_instructions: String,
}

impl Default for SessionParams {
    fn default() -> Self {
        Self {
            interval_ms: DEFAULT_INTERVAL_MS,
            words_per_tick: DEFAULT_WORDS_PER_TICK,
            temperature: DEFAULT_TEMPERATURE,
            max_output_tokens: DEFAULT_MAX_OUTPUT_TOKENS,
            model: default_model_id().to_string(),
            seed_text: DEFAULT_SEED_TEXT.to_string(),
            system_instructions: DEFAULT_SYSTEM_INSTRUCTIONS.to_string(),
        }
    }
}

impl SessionParams {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms.max(1))
    }

    /// Seed used to (re)build the buffers.
    pub fn effective_seed(&self) -> &str {
        if self.seed_text.trim().is_empty() {
            EMPTY_SEED_PLACEHOLDER
        } else {
            &self.seed_text
        }
    }

    /// Loosely typed request body for one tick, in the shape the dispatch
    /// boundary validates. The seed, not the current display, is what gets
    /// sent to the service.
    pub fn dispatch_body(&self) -> Value {
        json!({
            "text": self.seed_text,
            "superPrompt": self.system_instructions,
            "model": self.model,
            "temperature": self.temperature,
            "maxTokens": self.max_output_tokens,
        })
    }

    pub fn apply(&mut self, update: ParamUpdate) {
        match update {
            ParamUpdate::IntervalMs(value) => self.interval_ms = value.max(1),
            ParamUpdate::WordsPerTick(value) => self.words_per_tick = value.max(1),
            ParamUpdate::Temperature(value) => self.temperature = clamp_temperature(value),
            ParamUpdate::MaxOutputTokens(value) => {
                self.max_output_tokens = clamp_max_output_tokens(i64::from(value));
            }
            ParamUpdate::Model(value) => self.model = value,
            ParamUpdate::SeedText(value) => self.seed_text = value,
            ParamUpdate::SystemInstructions(value) => self.system_instructions = value,
        }
    }

    /// Clamps every numeric field into its accepted range.
    #[must_use]
    pub fn normalized(mut self) -> Self {
        self.interval_ms = self.interval_ms.max(1);
        self.words_per_tick = self.words_per_tick.max(1);
        self.temperature = clamp_temperature(self.temperature);
        self.max_output_tokens = clamp_max_output_tokens(i64::from(self.max_output_tokens));
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ParamUpdate {
    IntervalMs(u64),
    WordsPerTick(usize),
    Temperature(f64),
    MaxOutputTokens(u32),
    Model(String),
    SeedText(String),
    SystemInstructions(String),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParamError {
    #[error("unknown parameter '{0}'")]
    UnknownKey(String),
    #[error("invalid value for '{key}': {value:?}")]
    InvalidValue { key: &'static str, value: String },
}

impl ParamUpdate {
    /// Builds an update from a loosely typed key/value pair.
    ///
    /// Numbers outside their range are clamped later by
    /// [`SessionParams::apply`]; only unparsable input is rejected here.
    pub fn parse(key: &str, value: &str) -> Result<Self, ParamError> {
        let trimmed = value.trim();
        match key {
            "interval_ms" | "interval" => parse_number(trimmed, "interval_ms")
                .map(|ms: f64| Self::IntervalMs(ms.max(1.0).round() as u64)),
            "words_per_tick" | "words" => parse_number(trimmed, "words_per_tick")
                .map(|words: f64| Self::WordsPerTick(words.max(1.0).floor() as usize)),
            "temperature" => parse_number(trimmed, "temperature").map(Self::Temperature),
            "max_output_tokens" | "max_tokens" => parse_number(trimmed, "max_output_tokens")
                .map(|tokens: f64| {
                    Self::MaxOutputTokens(clamp_max_output_tokens(tokens.round() as i64))
                }),
            "model" if trimmed.is_empty() => Err(ParamError::InvalidValue {
                key: "model",
                value: value.to_string(),
            }),
            "model" => Ok(Self::Model(trimmed.to_string())),
            "seed_text" | "seed" => Ok(Self::SeedText(value.to_string())),
            "system_instructions" => Ok(Self::SystemInstructions(value.to_string())),
            other => Err(ParamError::UnknownKey(other.to_string())),
        }
    }

    pub fn key(&self) -> &'static str {
        match self {
            Self::IntervalMs(_) => "interval_ms",
            Self::WordsPerTick(_) => "words_per_tick",
            Self::Temperature(_) => "temperature",
            Self::MaxOutputTokens(_) => "max_output_tokens",
            Self::Model(_) => "model",
            Self::SeedText(_) => "seed_text",
            Self::SystemInstructions(_) => "system_instructions",
        }
    }
}

fn parse_number(value: &str, key: &'static str) -> Result<f64, ParamError> {
    value
        .parse::<f64>()
        .ok()
        .filter(|number| number.is_finite())
        .ok_or_else(|| ParamError::InvalidValue {
            key,
            value: value.to_string(),
        })
}
