use std::error::Error;

use crate::StatusCode;

/// Behaviour shared by every flexlink error (object-safe).
///
/// Supplies the status code, the text a client may see and the tags attached
/// to structured logs.
pub trait ErrorExt: Error + Send + Sync + 'static {
    /// Defaults to [`StatusCode::Internal`].
    fn status_code(&self) -> StatusCode {
        StatusCode::Internal
    }

    /// Message that can be sent to a client.
    ///
    /// Internal errors collapse to `"Internal server error"`.
    fn client_message(&self) -> String {
        match self.status_code() {
            StatusCode::Internal => "Internal server error".to_string(),
            _ => self.to_string(),
        }
    }

    /// Key-value tags for structured logs.
    fn metrics_tags(&self) -> Vec<(&'static str, String)> {
        vec![
            ("error_type", short_type_name::<Self>().to_string()),
            ("status_code", self.status_code().to_string()),
        ]
    }
}

fn short_type_name<T: ?Sized>() -> &'static str {
    let full = std::any::type_name::<T>();
    full.rsplit("::").next().unwrap_or(full)
}

#[cfg(test)]
mod tests {
    use std::fmt;

    use super::*;

    #[derive(Debug)]
    struct DefaultError(pub &'static str);

    impl fmt::Display for DefaultError {
        fn fmt(
            &self,
            f: &mut fmt::Formatter<'_>,
        ) -> fmt::Result {
            write!(f, "DefaultError: {}", self.0)
        }
    }

    impl Error for DefaultError {}

    impl ErrorExt for DefaultError {}

    #[derive(Debug)]
    struct MissingError(pub &'static str);

    impl fmt::Display for MissingError {
        fn fmt(
            &self,
            f: &mut fmt::Formatter<'_>,
        ) -> fmt::Result {
            write!(f, "Missing: {}", self.0)
        }
    }

    impl Error for MissingError {}

    impl ErrorExt for MissingError {
        fn status_code(&self) -> StatusCode {
            StatusCode::NotFound
        }
    }

    #[test]
    fn test_default_status_code_is_internal() {
        assert_eq!(DefaultError("oops").status_code(), StatusCode::Internal);
    }

    /// Internal errors never leak their text to the client.
    #[test]
    fn test_client_message_internal() {
        let e = DefaultError("sensitive");
        assert_eq!(e.client_message(), "Internal server error");
    }

    #[test]
    fn test_client_message_non_internal() {
        let e = MissingError("nope");
        assert_eq!(e.client_message(), e.to_string());
    }

    #[test]
    fn test_default_tags_name_the_error_type() {
        let tags = MissingError("t").metrics_tags();
        assert!(tags.contains(&("error_type", "MissingError".to_string())));
        assert!(tags.contains(&("status_code", StatusCode::NotFound.to_string())));
    }
}
