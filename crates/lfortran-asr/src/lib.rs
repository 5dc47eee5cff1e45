#![doc = include_str!("../../../README.md")]
#![expect(clippy::module_name_repetitions, reason = "Sym/Kind suffixes mirror the ASR's own vocabulary")]
#![expect(clippy::too_many_lines, reason = "node encoders/decoders grow one match arm per variant")]

pub mod arena;
pub mod asr;
pub mod ast;
pub mod config;
pub mod diagnostics;
pub mod driver;
pub mod emit;
pub mod error;
pub mod intern;
pub mod location;
pub mod lowering;
pub mod observer;
pub mod passes;
pub mod serialize;
pub mod symbol_table;
pub mod types;
pub mod verify;

pub use asr::TranslationUnit;
pub use config::CompileOptions;
pub use driver::compile;
pub use emit::Emitter;
pub use error::CoreError;
