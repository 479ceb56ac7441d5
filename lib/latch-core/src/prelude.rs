//! Prelude module for convenient imports.
//!
//! ```
//! use latch_core::prelude::*;
//! ```

pub use crate::{
    ApiError, Args, BindingError, CodecRegistry, CollectionFormat, ContentType, Error,
    HttpClient, InterfaceDescription, Method, MethodDescriptor, Request, Response, Result,
    TransportError, args,
};
