//! Virtual EPOS controllers and the Read/Write Object request layer.
//!
//! A [`DeviceRegistry`] holds up to [`MAX_NODES`] controllers, each a sparse
//! register map. Requests decoded from frames with [`Request::parse`] are
//! answered through the [`ObjectStore`] trait, and the resulting
//! [`Response`] is turned back into a frame for the link layer.

pub mod codes;
pub mod config;
pub mod error;
pub mod object;
pub mod registers;
pub mod registry;

pub use codes::{describe, UNKNOWN_DEVICE};
pub use config::{DeviceConfig, Preset, RegisterValue, RegistryConfig};
pub use error::{ConfigError, RequestError, Result};
pub use object::{ObjectAddress, Request, Response, READ_OBJECT, RESPONSE, WRITE_OBJECT};
pub use registry::{Controller, DeviceRegistry, ObjectStore, SharedRegistry, MAX_NODES};
