//! Newtype wrappers around the `i64` ids the enclosing platform hands us.
//!
//! Every id TVM deals with — users, organizations, workspaces, resources —
//! is an opaque 64-bit integer owned by the platform; TVM never generates
//! organization/workspace/resource ids itself, only `User` ids (on first
//! `Exchange`). The macro below is the same newtype-plus-trait-impls shape
//! the platform already uses for its other domain ids, rebacked onto `i64`
//! instead of a UUID string, since the spec is explicit that these are
//! "stable/opaque 64-bit ids".

/// Generates a newtype wrapper around `i64` with `Display`, `FromStr`,
/// `serde` (transparent), and `sqlx` `Type`/`Encode`/`Decode` for SQLite.
macro_rules! domain_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl $name {
            pub const fn new(id: i64) -> Self {
                Self(id)
            }

            pub const fn inner(&self) -> i64 {
                self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl std::str::FromStr for $name {
            type Err = std::num::ParseIntError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self(s.parse()?))
            }
        }

        impl From<i64> for $name {
            fn from(value: i64) -> Self {
                Self(value)
            }
        }

        impl From<$name> for i64 {
            fn from(value: $name) -> Self {
                value.0
            }
        }

        impl sqlx::Type<sqlx::Sqlite> for $name {
            fn type_info() -> <sqlx::Sqlite as sqlx::Database>::TypeInfo {
                <i64 as sqlx::Type<sqlx::Sqlite>>::type_info()
            }
        }

        impl<'q> sqlx::Encode<'q, sqlx::Sqlite> for $name {
            fn encode_by_ref(
                &self,
                buf: &mut <sqlx::Sqlite as sqlx::Database>::ArgumentBuffer<'q>,
            ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
                <i64 as sqlx::Encode<'q, sqlx::Sqlite>>::encode_by_ref(&self.0, buf)
            }
        }

        impl<'r> sqlx::Decode<'r, sqlx::Sqlite> for $name {
            fn decode(
                value: <sqlx::Sqlite as sqlx::Database>::ValueRef<'r>,
            ) -> Result<Self, sqlx::error::BoxDynError> {
                Ok(Self(<i64 as sqlx::Decode<'r, sqlx::Sqlite>>::decode(value)?))
            }
        }
    };
}

domain_id!(
    /// A platform user. TVM mints these on first successful `Exchange`.
    UserId
);
domain_id!(
    /// Owned by the enclosing platform; TVM only reads it.
    OrganizationId
);
domain_id!(
    /// Owned by the enclosing platform; TVM only reads it.
    WorkspaceId
);
domain_id!(
    /// Owned by the enclosing platform; TVM only reads it.
    ResourceId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_display_and_from_str() {
        let id = UserId::new(42);
        let rendered = id.to_string();
        let parsed: UserId = rendered.parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn ordering_follows_the_wrapped_integer() {
        assert!(OrganizationId::new(1) < OrganizationId::new(2));
    }
}
