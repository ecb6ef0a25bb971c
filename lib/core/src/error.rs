//! Error handling foundation for the copper-sparrow workspace.
//!
//! This module provides only the `Result` type alias using rootcause.
//! Each crate defines its own domain-specific error types in its own
//! error module; layers add context via rootcause's `.context()` as
//! errors propagate toward the binary.

use rootcause::Report;

/// A Result type alias using rootcause's Report for error handling.
pub type Result<T, C = ()> = std::result::Result<T, Report<C>>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn result_alias_is_usable() {
        let value: Result<&str> = Ok("reply");
        assert_eq!(value.expect("should be ok"), "reply");
    }
}
