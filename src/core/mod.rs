pub mod audio;
pub mod cache;
pub mod errors;
pub mod orchestrator;
pub mod service;
pub mod tts;

// Re-export commonly used types for convenience
pub use audio::{AudioContainer, FormatError, FormatSpec, RawAudio, encode, silent_container};

pub use cache::{
    AudioCache, FilesystemStore, KeyValueStore, MemoryStore, RedisStore, StoreError, cache_key,
};

pub use errors::{SpeechError, SpeechResult};

pub use orchestrator::{
    AllProvidersFailedError, OrchestratorStats, RoutingRule, RoutingTable, SynthesisOrchestrator,
    SynthesisOutcome,
};

pub use service::{SpeechService, open_store};

pub use tts::{
    ProviderError, ProviderErrorKind, ProviderResult, SpeechProvider, SynthesisRequest,
    VoiceConfig, create_tts_provider,
};
