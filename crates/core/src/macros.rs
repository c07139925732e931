// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Declarative macros shared across the rehearsal crates.
//!
//! - [`simple_display!`]: `Display` impl mapping enum variants to string literals
//! - [`setters!`]: chained setter methods for config structs

/// Generate a `Display` impl that maps enum variants to string literals.
///
/// Unit variants match directly; data-carrying variants use `(..)` to ignore fields.
///
/// ```ignore
/// crate::simple_display! {
///     JobState {
///         Submitted => "triggered",
///         Running => "pending",
///     }
/// }
/// ```
#[macro_export]
macro_rules! simple_display {
    ($enum:ty { $( $variant:ident $(( $($ignore:tt)* ))? => $str:expr ),+ $(,)? }) => {
        impl std::fmt::Display for $enum {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(match self {
                    $( Self::$variant $(( $($ignore)* ))? => $str, )+
                })
            }
        }
    };
}

/// Generate chained setters inside an existing `impl` block.
///
/// Each entry is `field: into Type` (setter takes `impl Into<Type>`) or
/// `field: set Type` (setter takes `Type` as is).
///
/// ```ignore
/// impl RehearsalConfig {
///     rehearse_core::setters! {
///         label_key: into String,
///         flavors: set Vec<String>,
///     }
/// }
/// ```
#[macro_export]
macro_rules! setters {
    ($( $field:ident : $mode:ident $ty:ty ),* $(,)?) => {
        $( $crate::setters!(@setter $field $mode $ty); )*
    };
    (@setter $field:ident into $ty:ty) => {
        pub fn $field(mut self, value: impl Into<$ty>) -> Self {
            self.$field = value.into();
            self
        }
    };
    (@setter $field:ident set $ty:ty) => {
        pub fn $field(mut self, value: $ty) -> Self {
            self.$field = value;
            self
        }
    };
}
