pub mod client;
pub mod codec;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod observability;
pub mod server;
pub mod ui;

pub use client::{ClientError, DynFhirClient, Exchange, FhirClient, HttpFhirClient};
pub use codec::{DocumentCodec, JsonCodec};
pub use config::{AppConfig, ClientAuth, ClientConfig, Encoding, ServerConfig};
pub use dispatch::{OperationResult, dispatch, submit};
pub use error::TesterError;
pub use observability::init_tracing;
pub use server::{AppState, OctofhirTester, ServerBuilder, build_app};
