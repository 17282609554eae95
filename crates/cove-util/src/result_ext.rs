use std::fmt::Display;

pub trait ResultExt<T, InitialError> {
    /// Map an error to a string-based error variant
    ///
    /// Converts `Result<T, InitialError>` to `Result<T, FinalError>` where `FinalError` has a
    /// variant that takes a `String`, using the `Display` implementation of `InitialError`.
    ///
    /// # Example
    /// ```rust
    /// use cove_util::result_ext::ResultExt;
    ///
    /// #[derive(Debug, thiserror::Error)]
    /// enum MyError {
    ///     #[error("bad number: {0}")]
    ///     Number(String),
    /// }
    ///
    /// fn example() -> Result<u8, MyError> {
    ///     "300".parse::<u8>().map_err_str(MyError::Number)
    /// }
    ///
    /// assert!(example().is_err());
    /// ```
    fn map_err_str<FinalError, F>(self, f: F) -> Result<T, FinalError>
    where
        InitialError: Display,
        F: FnOnce(String) -> FinalError;

    /// Discard the error after logging it at trace level
    ///
    /// For parse attempts where failure is expected and only the success matters
    fn ok_traced(self, attempt: &str) -> Option<T>
    where
        InitialError: Display;
}

impl<Type, InitialError> ResultExt<Type, InitialError> for Result<Type, InitialError> {
    fn map_err_str<FinalError, F>(self, f: F) -> Result<Type, FinalError>
    where
        InitialError: Display,
        F: FnOnce(String) -> FinalError,
    {
        self.map_err(|e| f(e.to_string()))
    }

    fn ok_traced(self, attempt: &str) -> Option<Type>
    where
        InitialError: Display,
    {
        match self {
            Ok(value) => Some(value),
            Err(error) => {
                tracing::trace!("{attempt} did not match: {error}");
                None
            }
        }
    }
}
