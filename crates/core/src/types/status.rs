//! Roles and status enums shared with the marketplace API.
//!
//! The backend is inconsistent about casing (`"pending"`, `"Pending"`,
//! `"PENDING"` all appear), so every enum here parses case-insensitively
//! and always serializes in lowercase.

/// Define a lowercase string enum with case-insensitive parsing.
///
/// Generates `as_str`, `Display`, `FromStr`, `Serialize` and `Deserialize`.
macro_rules! string_enum {
    (
        $(#[$meta:meta])*
        $name:ident { $( $(#[$vmeta:meta])* $variant:ident => $text:literal ),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $( $(#[$vmeta])* $variant, )+
        }

        impl $name {
            /// All variants, in declaration order.
            pub const ALL: &'static [Self] = &[$(Self::$variant),+];

            /// The wire representation of this value.
            #[must_use]
            pub const fn as_str(self) -> &'static str {
                match self {
                    $( Self::$variant => $text, )+
                }
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl ::core::str::FromStr for $name {
            type Err = UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let needle = s.trim();
                Self::ALL
                    .iter()
                    .copied()
                    .find(|v| v.as_str().eq_ignore_ascii_case(needle))
                    .ok_or_else(|| UnknownVariant {
                        kind: stringify!($name),
                        value: s.to_string(),
                    })
            }
        }

        impl ::serde::Serialize for $name {
            fn serialize<S: ::serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(self.as_str())
            }
        }

        impl<'de> ::serde::Deserialize<'de> for $name {
            fn deserialize<D: ::serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let raw = <String as ::serde::Deserialize>::deserialize(deserializer)?;
                raw.parse().map_err(::serde::de::Error::custom)
            }
        }
    };
}

/// A string did not match any variant of a status enum.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid {kind}: {value}")]
pub struct UnknownVariant {
    /// Name of the enum being parsed.
    pub kind: &'static str,
    /// The rejected input.
    pub value: String,
}

string_enum! {
    /// Account role. Determines which endpoint group a user may call.
    Role {
        Buyer => "buyer",
        Seller => "seller",
        Admin => "admin",
    }
}

string_enum! {
    /// Order lifecycle as reported by the server.
    OrderStatus {
        Pending => "pending",
        Confirmed => "confirmed",
        Processing => "processing",
        Shipped => "shipped",
        Delivered => "delivered",
        Cancelled => "cancelled",
    }
}

string_enum! {
    /// Seller payout request state.
    PayoutStatus {
        Pending => "pending",
        Approved => "approved",
        Rejected => "rejected",
        Paid => "paid",
    }
}

string_enum! {
    /// Seller KYC verification state.
    #[derive(Default)]
    VerificationStatus {
        #[default]
        Unverified => "unverified",
        Pending => "pending",
        Verified => "verified",
        Rejected => "rejected",
    }
}

string_enum! {
    /// Admin decision on a verification submission.
    ReviewDecision {
        Approve => "approve",
        Reject => "reject",
    }
}

impl OrderStatus {
    /// Whether a buyer may still cancel the order.
    #[must_use]
    pub const fn is_cancellable(self) -> bool {
        matches!(self, Self::Pending | Self::Confirmed)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!("Seller".parse::<Role>().unwrap(), Role::Seller);
        assert_eq!(" ADMIN ".parse::<Role>().unwrap(), Role::Admin);
        assert_eq!("shipped".parse::<OrderStatus>().unwrap(), OrderStatus::Shipped);
    }

    #[test]
    fn test_parse_unknown() {
        let err = "courier".parse::<Role>().unwrap_err();
        assert_eq!(err.to_string(), "invalid Role: courier");
    }

    #[test]
    fn test_serde_uses_lowercase() {
        let json = serde_json::to_string(&PayoutStatus::Approved).unwrap();
        assert_eq!(json, "\"approved\"");

        let parsed: VerificationStatus = serde_json::from_str("\"Verified\"").unwrap();
        assert_eq!(parsed, VerificationStatus::Verified);
        assert!(serde_json::from_str::<VerificationStatus>("\"maybe\"").is_err());
    }

    #[test]
    fn test_cancellable_orders() {
        assert!(OrderStatus::Pending.is_cancellable());
        assert!(!OrderStatus::Shipped.is_cancellable());
        assert!(!OrderStatus::Cancelled.is_cancellable());
    }
}
