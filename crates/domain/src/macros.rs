//! Label conversion macro for string-backed enums
//!
//! Several stored columns (ledger `source`, session `category`, evidence
//! hints) are enums persisted as fixed lowercase labels. The macro keeps the
//! label table in one place and generates both directions.
//!
//! # Example
//!
//! ```rust
//! use skilltrail_domain::impl_label_conversions;
//!
//! #[derive(Debug, Clone, Copy, PartialEq, Eq)]
//! pub enum Channel {
//!     Window,
//!     Browser,
//! }
//!
//! impl_label_conversions!(Channel {
//!     Window => "window",
//!     Browser => "browser",
//! });
//!
//! assert_eq!(Channel::Browser.as_label(), "browser");
//! assert_eq!("WINDOW".parse::<Channel>(), Ok(Channel::Window));
//! ```

/// Implements `as_label`, `Display` and case-insensitive `FromStr` for an
/// enum from a variant-to-label table.
#[macro_export]
macro_rules! impl_label_conversions {
    ($enum_name:ident { $($variant:ident => $label:expr),+ $(,)? }) => {
        impl $enum_name {
            /// Stable lowercase label used for storage and display.
            pub const fn as_label(&self) -> &'static str {
                match self {
                    $(Self::$variant => $label,)+
                }
            }
        }

        impl std::fmt::Display for $enum_name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_label())
            }
        }

        impl std::str::FromStr for $enum_name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().to_lowercase().as_str() {
                    $($label => Ok(Self::$variant),)+
                    _ => Err(format!("Invalid {}: {}", stringify!($enum_name), s)),
                }
            }
        }
    };
}
