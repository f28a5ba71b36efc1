//! Macros for CRM error handling.
//!
//! Provides convenience macros for creating and returning [`crate::error::CrmError`] instances.

/// Creates a [`crate::error::CrmError`] from error kind and description.
///
/// Accepts an optional dynamic detail (anything implementing [`ToString`], or `detail =` to move
/// an owned [`String`]) and an optional source error.
#[macro_export]
macro_rules! crm_error {
    ($kind:expr, $desc:expr) => {
        $crate::error::CrmError::from(($kind, $desc))
    };
    ($kind:expr, $desc:expr, source: $source:expr) => {
        $crate::error::CrmError::from(($kind, $desc)).with_source($source)
    };
    ($kind:expr, $desc:expr, detail = $detail:expr) => {
        $crate::error::CrmError::from(($kind, $desc, $detail))
    };
    ($kind:expr, $desc:expr, $detail:expr) => {
        $crate::error::CrmError::from(($kind, $desc, $detail.to_string()))
    };
    ($kind:expr, $desc:expr, $detail:expr, source: $source:expr) => {
        $crate::error::CrmError::from(($kind, $desc, $detail.to_string())).with_source($source)
    };
}

/// Creates and returns a [`crate::error::CrmError`] from the current function.
///
/// Supports the same optional detail and source arguments as [`crm_error!`].
#[macro_export]
macro_rules! bail {
    ($kind:expr, $desc:expr) => {
        return ::core::result::Result::Err($crate::crm_error!($kind, $desc))
    };
    ($kind:expr, $desc:expr, source: $source:expr) => {
        return ::core::result::Result::Err($crate::crm_error!($kind, $desc, source: $source))
    };
    ($kind:expr, $desc:expr, detail = $detail:expr) => {
        return ::core::result::Result::Err($crate::crm_error!($kind, $desc, detail = $detail))
    };
    ($kind:expr, $desc:expr, $detail:expr) => {
        return ::core::result::Result::Err($crate::crm_error!($kind, $desc, $detail))
    };
    ($kind:expr, $desc:expr, $detail:expr, source: $source:expr) => {
        return ::core::result::Result::Err($crate::crm_error!(
            $kind,
            $desc,
            $detail,
            source: $source
        ))
    };
}
