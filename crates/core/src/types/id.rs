//! Newtype IDs for type-safe entity references.
//!
//! Use the `define_id!` macro to create type-safe ID wrappers that prevent
//! accidentally mixing IDs from different entity types. All relational
//! identifiers in Backroom are `i32` database keys; entity-store row keys
//! are strings and stay plain `String`s.

/// Macro to define a type-safe ID wrapper.
///
/// Creates a newtype wrapper around `i32` with:
/// - `Serialize`/`Deserialize` with `#[serde(transparent)]`
/// - `Debug`, `Clone`, `Copy`, `PartialEq`, `Eq`, `Hash`
/// - Conversion methods: `new()`, `as_i32()`
/// - `From<i32>` and `Into<i32>` implementations
/// - A `parse` constructor for untrusted string identifiers from the HTTP
///   layer, returning `None` rather than erroring on non-numeric input
///
/// # Example
///
/// ```rust
/// # use backroom_core::define_id;
/// define_id!(UserId);
/// define_id!(OrderId);
///
/// let user_id = UserId::new(1);
/// let order_id = OrderId::new(1);
///
/// // These are different types, so this won't compile:
/// // let _: UserId = order_id;
///
/// assert_eq!(UserId::parse("17"), Some(UserId::new(17)));
/// assert_eq!(UserId::parse("abc"), None);
/// ```
#[macro_export]
macro_rules! define_id {
    ($name:ident) => {
        #[derive(
            Debug,
            Clone,
            Copy,
            PartialEq,
            Eq,
            Hash,
            PartialOrd,
            Ord,
            ::serde::Serialize,
            ::serde::Deserialize
        )]
        #[serde(transparent)]
        pub struct $name(i32);

        impl $name {
            /// Create a new ID from an i32 value.
            #[must_use]
            pub const fn new(id: i32) -> Self {
                Self(id)
            }

            /// Get the underlying i32 value.
            #[must_use]
            pub const fn as_i32(&self) -> i32 {
                self.0
            }

            /// Parse an ID from an untrusted string identifier.
            ///
            /// Returns `None` for non-numeric input. Callers on read paths
            /// degrade to empty results; write paths that need a valid ID
            /// turn `None` into an invalid-input error.
            #[must_use]
            pub fn parse(s: &str) -> Option<Self> {
                s.trim().parse::<i32>().ok().map(Self)
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i32> for $name {
            fn from(id: i32) -> Self {
                Self(id)
            }
        }

        impl From<$name> for i32 {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

// Define standard entity IDs
define_id!(UserId);
define_id!(CartItemId);
define_id!(OrderId);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_accepts_numeric_strings() {
        assert_eq!(UserId::parse("42"), Some(UserId::new(42)));
        assert_eq!(UserId::parse(" 7 "), Some(UserId::new(7)));
    }

    #[test]
    fn parse_rejects_garbage() {
        assert_eq!(UserId::parse(""), None);
        assert_eq!(UserId::parse("abc"), None);
        assert_eq!(UserId::parse("12.5"), None);
        assert_eq!(UserId::parse("999999999999999999"), None);
    }

    #[test]
    fn display_is_bare_number() {
        assert_eq!(OrderId::new(9).to_string(), "9");
    }
}
