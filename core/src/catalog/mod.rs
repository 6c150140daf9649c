//! Catalog description types
//!
//! These are the objects callers exchange with the registry. The database
//! crate maps them to and from rows; the server serializes them as JSON.

/// Declare a closed set of string-valued catalog constants.
///
/// Each variant gets a stable text form used both on the wire (serde) and in
/// database columns (`as_str` / `FromStr`).
macro_rules! string_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord,
            serde::Serialize, serde::Deserialize,
        )]
        pub enum $name {
            $(
                #[serde(rename = $text)]
                $variant,
            )+
        }

        impl $name {
            /// Every variant, in declaration order
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// Text form stored in the database
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text,)+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = crate::Error;

            fn from_str(s: &str) -> crate::Result<Self> {
                match s {
                    $($text => Ok($name::$variant),)+
                    other => Err(crate::Error::ValidationError(format!(
                        "Unknown {} value: {}",
                        stringify!($name),
                        other
                    ))),
                }
            }
        }
    };
}

pub mod application;
pub mod compute;
pub mod gateway_profile;
pub mod group_profile;
pub mod parser;
pub mod storage;
pub mod submission;
pub mod user_profile;

pub use application::*;
pub use compute::*;
pub use gateway_profile::*;
pub use group_profile::*;
pub use parser::*;
pub use storage::*;
pub use submission::*;
pub use user_profile::*;
