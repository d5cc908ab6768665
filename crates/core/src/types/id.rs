//! Newtype IDs for type-safe entity references.
//!
//! Order Desk identifiers are opaque strings. Use the `define_id!` macro to
//! create wrappers that prevent accidentally mixing IDs from different entity
//! types (e.g. passing a `ShopId` where an `AccountId` is expected).

/// Macro to define a type-safe string ID wrapper.
///
/// Creates a newtype wrapper around `String` with:
/// - `Serialize`/`Deserialize` with `#[serde(transparent)]`
/// - `Debug`, `Clone`, `PartialEq`, `Eq`, `PartialOrd`, `Ord`, `Hash`
/// - Conversion methods: `new()`, `generate()`, `as_str()`, `into_inner()`
/// - `From<String>`, `From<&str>` and `Into<String>` implementations
/// - `sqlx` `Type`, `Encode`, and `Decode` implementations (with `postgres` feature)
///
/// # Example
///
/// ```rust
/// # use order_desk_core::define_id;
/// define_id!(CustomerId);
/// define_id!(InvoiceId);
///
/// let customer_id = CustomerId::new("c-1");
/// let invoice_id = InvoiceId::generate();
///
/// assert_eq!(customer_id.as_str(), "c-1");
/// assert_eq!(invoice_id.as_str().len(), 32);
/// // These are different types, so this won't compile:
/// // let _: CustomerId = invoice_id;
/// ```
#[macro_export]
macro_rules! define_id {
    ($name:ident) => {
        #[derive(
            Debug,
            Clone,
            PartialEq,
            Eq,
            PartialOrd,
            Ord,
            Hash,
            ::serde::Serialize,
            ::serde::Deserialize
        )]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create an ID from an existing string value.
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Generate a fresh random ID (UUID v4, simple format).
            #[must_use]
            pub fn generate() -> Self {
                Self(::uuid::Uuid::new_v4().simple().to_string())
            }

            /// Get the underlying string value.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume the ID and return the underlying string.
            #[must_use]
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_owned())
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        #[cfg(feature = "postgres")]
        impl ::sqlx::Type<::sqlx::Postgres> for $name {
            fn type_info() -> ::sqlx::postgres::PgTypeInfo {
                <String as ::sqlx::Type<::sqlx::Postgres>>::type_info()
            }

            fn compatible(ty: &::sqlx::postgres::PgTypeInfo) -> bool {
                <String as ::sqlx::Type<::sqlx::Postgres>>::compatible(ty)
            }
        }

        #[cfg(feature = "postgres")]
        impl<'r> ::sqlx::Decode<'r, ::sqlx::Postgres> for $name {
            fn decode(
                value: ::sqlx::postgres::PgValueRef<'r>,
            ) -> ::core::result::Result<Self, ::sqlx::error::BoxDynError> {
                let id = <String as ::sqlx::Decode<::sqlx::Postgres>>::decode(value)?;
                Ok(Self(id))
            }
        }

        #[cfg(feature = "postgres")]
        impl ::sqlx::Encode<'_, ::sqlx::Postgres> for $name {
            fn encode_by_ref(
                &self,
                buf: &mut ::sqlx::postgres::PgArgumentBuffer,
            ) -> ::std::result::Result<::sqlx::encode::IsNull, ::sqlx::error::BoxDynError> {
                <String as ::sqlx::Encode<::sqlx::Postgres>>::encode_by_ref(&self.0, buf)
            }
        }
    };
}

// Order entities
define_id!(OrderId);
define_id!(OrderItemId);
define_id!(FulfillmentGroupId);
define_id!(PaymentId);
define_id!(CartId);

// References into neighbouring subsystems
define_id!(AccountId);
define_id!(ShopId);
define_id!(ProductId);
define_id!(VariantId);
define_id!(TagId);
define_id!(FulfillmentMethodId);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_is_unique_and_simple() {
        let a = OrderId::generate();
        let b = OrderId::generate();
        assert_ne!(a, b);
        assert_eq!(a.as_str().len(), 32);
        assert!(!a.as_str().contains('-'));
    }

    #[test]
    fn test_display_and_conversions() {
        let id = ShopId::new("shop-1");
        assert_eq!(id.to_string(), "shop-1");
        assert_eq!(ShopId::from("shop-1"), id);
        let raw: String = id.into();
        assert_eq!(raw, "shop-1");
    }

    #[test]
    fn test_ordering_follows_string_ordering() {
        let mut ids = vec![TagId::new("b"), TagId::new("a"), TagId::new("c")];
        ids.sort();
        let raw: Vec<&str> = ids.iter().map(TagId::as_str).collect();
        assert_eq!(raw, ["a", "b", "c"]);
    }
}
