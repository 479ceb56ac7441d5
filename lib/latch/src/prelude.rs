//! Prelude module for convenient imports.
//!
//! ```
//! use latch::prelude::*;
//! ```

pub use crate::{
    ApiError, Args, BindingError, BoundInterface, ClientConfig, CodecRegistry, CollectionFormat,
    ContentType, Dispatcher, Error, HttpClient, HyperClient, InterfaceDescription, Method,
    MethodDescriptor, Request, Response, Result, TransportError, args,
};
pub use serde::{Deserialize, Serialize};
