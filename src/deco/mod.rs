//! Decompression planning module.
//!
//! Bühlmann ZH-L16 decompression engine with gradient factors, plus its
//! HTTP endpoints. The engine calculates a dive profile lazily, dive steps
//! are pushed through a pipeline of consumers (decompression table, model
//! validator) while the profile is iterated.

pub mod bisect;
pub mod conveyor;
pub mod engine;
pub mod error;
pub mod gas;
pub mod model;
pub mod models;
pub mod pipeline;
pub mod planner;
pub mod pressure;
mod routes;
pub mod step;
pub mod table;
pub mod validator;

pub use engine::{Engine, EngineConfig, Profile};
pub use error::DecoError;
pub use gas::{GasList, GasMix};
pub use model::TissueModel;
pub use pipeline::{Sender, StepConsumer};
pub use planner::{plan, Plan};
pub use routes::router;
pub use step::{Phase, Step};
pub use table::{DecoStop, DecoTable};
pub use validator::ModelValidator;
