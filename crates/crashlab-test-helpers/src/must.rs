//! Unwrap helpers with good error messages.
//!
//! These replace `unwrap()` and `expect()` in test code and report the
//! caller's location through `#[track_caller]`.

use std::fmt::Debug;

/// Unwrap a `Result`, panicking with the error value on failure.
///
/// ```rust
/// use crashlab_test_helpers::must;
///
/// let value = must(Ok::<_, String>(0.62));
/// assert!(value > 0.6);
/// ```
///
/// # Panics
///
/// Panics if the result is `Err`.
#[track_caller]
pub fn must<T, E: Debug>(result: Result<T, E>) -> T {
    match result {
        Ok(v) => v,
        Err(e) => panic!("must: unexpected Err: {e:?}"),
    }
}

/// Unwrap a `Result`, adding `context` to the panic message.
///
/// # Panics
///
/// Panics if the result is `Err`.
#[track_caller]
pub fn must_with<T, E: Debug>(result: Result<T, E>, context: &str) -> T {
    match result {
        Ok(v) => v,
        Err(e) => panic!("must_with: {context}: {e:?}"),
    }
}

/// Unwrap an `Option`, panicking with `msg` if `None`.
///
/// # Panics
///
/// Panics if the option is `None`.
#[track_caller]
pub fn must_some<T>(option: Option<T>, msg: &str) -> T {
    match option {
        Some(v) => v,
        None => panic!("must_some: {msg}"),
    }
}

/// Unwrap the `Err` side of a `Result`, panicking if it is `Ok`.
///
/// ```rust
/// use crashlab_test_helpers::must_err;
///
/// let err = must_err(Err::<(), _>("connection lost"));
/// assert_eq!(err, "connection lost");
/// ```
///
/// # Panics
///
/// Panics if the result is `Ok`.
#[track_caller]
pub fn must_err<T: Debug, E>(result: Result<T, E>) -> E {
    match result {
        Ok(v) => panic!("must_err: expected Err, got Ok({v:?})"),
        Err(e) => e,
    }
}

#[cfg(feature = "mock")]
mod async_helpers {
    use std::fmt::Debug;
    use std::future::Future;
    use std::time::Duration;

    /// Await a future under a deadline, panicking if it does not finish.
    ///
    /// # Panics
    ///
    /// Panics if `within` elapses first.
    pub async fn must_within<F: Future>(within: Duration, future: F) -> F::Output {
        match tokio::time::timeout(within, future).await {
            Ok(output) => output,
            Err(_) => panic!("must_within: future did not complete within {within:?}"),
        }
    }

    /// Await a fallible future, panicking on `Err`.
    ///
    /// # Panics
    ///
    /// Panics if the future resolves to `Err`.
    pub async fn must_async<F, T, E>(future: F) -> T
    where
        F: Future<Output = Result<T, E>>,
        E: Debug,
    {
        match future.await {
            Ok(v) => v,
            Err(e) => panic!("must_async: unexpected Err: {e:?}"),
        }
    }
}

#[cfg(feature = "mock")]
pub use async_helpers::{must_async, must_within};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_must_ok() {
        assert_eq!(must(Ok::<i32, &str>(7)), 7);
    }

    #[test]
    #[should_panic(expected = "must_with: loading fixture")]
    fn test_must_with_err() {
        let _: i32 = must_with(Err::<i32, &str>("boom"), "loading fixture");
    }

    #[test]
    #[should_panic(expected = "expected Err")]
    fn test_must_err_on_ok() {
        let _: &str = must_err(Ok::<i32, &str>(1));
    }
}
