//! Call arguments.

use serde_json::Value;

use crate::CodecError;

/// Arguments of one call, in parameter declaration order.
///
/// Each argument is captured as a [`serde_json::Value`]; `null` (for
/// example `Option::None`) means the argument is absent. Capture failures
/// are kept and reported when the call is bound.
///
/// Use the [`args!`](crate::args) macro for the common case.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Args {
    values: Vec<Value>,
    error: Option<CodecError>,
}

impl Args {
    /// Create an empty argument list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an argument.
    #[must_use]
    pub fn arg<T: serde::Serialize + ?Sized>(mut self, value: &T) -> Self {
        match serde_json::to_value(value) {
            Ok(value) => self.values.push(value),
            Err(e) => {
                let index = self.values.len();
                self.values.push(Value::Null);
                self.error.get_or_insert_with(|| {
                    CodecError::encode_failed(format!("argument #{index}"), e)
                });
            }
        }
        self
    }

    /// Append an absent argument.
    #[must_use]
    pub fn absent(mut self) -> Self {
        self.values.push(Value::Null);
        self
    }

    /// Append an already captured value.
    #[must_use]
    pub fn value(mut self, value: Value) -> Self {
        self.values.push(value);
        self
    }

    /// Number of arguments.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` if there are no arguments.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Captured values.
    #[must_use]
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Consume into the captured values.
    ///
    /// # Errors
    ///
    /// Returns the first capture failure, if any.
    pub fn into_values(self) -> Result<Vec<Value>, CodecError> {
        match self.error {
            Some(error) => Err(error),
            None => Ok(self.values),
        }
    }
}

/// Build [`Args`] from a list of expressions.
///
/// Each expression is borrowed and captured with [`Args::arg`].
///
/// ```
/// use latch_core::args;
///
/// let page: Option<u32> = None;
/// let args = args![42, "rust", page];
/// assert_eq!(args.len(), 3);
/// assert!(args.values()[2].is_null());
/// ```
#[macro_export]
macro_rules! args {
    () => {
        $crate::Args::new()
    };
    ($($arg:expr),+ $(,)?) => {
        $crate::Args::new()$(.arg(&$arg))+
    };
}
