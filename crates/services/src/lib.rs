#![forbid(unsafe_code)]

pub mod app_services;
pub mod error;
pub mod player;
pub mod speech;
pub mod stats_service;
pub mod word_service;

pub use drill_core::Clock;

pub use app_services::AppServices;
pub use error::{AppServicesError, PlayerError, SpeechError, StatsError, WordServiceError};
pub use player::{PlayerHandle, PlayerService};
pub use speech::{SpeechCompleter, SpeechHandle, SpeechService, SpeechTicket};
pub use stats_service::StatsService;
pub use word_service::WordService;
