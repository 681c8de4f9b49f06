//! Docgate Server - a generic HTTP gateway over schemaless document collections
//!
//! Any path segment is treated as a live collection name, so clients get
//! REST access to arbitrary collections without per-resource endpoints.
//! Collections are created implicitly by their first insert.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use server::ServerConfig;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ServerConfig::load()?;
//!     server::start_server(config).await?;
//!     Ok(())
//! }
//! ```
//!
//! # API Endpoints
//!
//! | Method   | Path                   | Body     | Success                     |
//! |----------|------------------------|----------|-----------------------------|
//! | `GET`    | `/`                    |          | 200 `"Hello World!"`        |
//! | `GET`    | `/time`                |          | 200 `{time}`                |
//! | `PUT`    | `/{collection}`        | document | 201 `{message, _id}`        |
//! | `GET`    | `/{collection}/count`  |          | 200 `{count}`               |
//! | `GET`    | `/{collection}`        |          | 200 `[documents]`           |
//! | `POST`   | `/{collection}`        | filter   | 200 `[matching documents]`  |
//! | `GET`    | `/{collection}/{id}`   |          | 200 document                |
//! | `PUT`    | `/{collection}/{id}`   | patch    | 200 `{message}`             |
//! | `DELETE` | `/{collection}/{id}`   |          | 204 empty                   |
//!
//! Errors are always `{"error": "<message>"}`: 400 when the store rejects a
//! write, 404 for unknown identifiers and routes, 500 for anything else.
//!
//! # Configuration
//!
//! `DOCGATE_STORE_URI` (`memory://` or `redb://<path>`), `DOCGATE_PORT`,
//! `DOCGATE_DEBUG` and friends; see [`ServerConfig`].

pub mod config;
pub mod error;
pub mod extract;
pub mod middleware;
pub mod reply;
pub mod routes;
pub mod server;
pub mod state;

pub use config::ServerConfig;
pub use error::{GatewayError, ServerResult};
pub use reply::Reply;
pub use server::{build_router, start_server};
pub use state::ServerState;
