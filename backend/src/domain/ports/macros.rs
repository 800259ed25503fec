//! Macro for declaring the error enums returned by driven ports.
//!
//! Each variant gets a snake-case constructor whose parameters accept
//! `impl Into<T>`, so adapters can write `CollectionError::query("bad filter")`.

macro_rules! define_port_error {
    (@ctor $variant:ident) => {
        ::paste::paste! {
            #[doc = concat!("Construct [`Self::", stringify!($variant), "`].")]
            pub fn [<$variant:snake>]() -> Self {
                Self::$variant
            }
        }
    };

    (@ctor $variant:ident { $($field:ident : $ty:ty),* $(,)? }) => {
        define_port_error!(@ctor_impl $variant () () $( $field : $ty, )*);
    };

    (@ctor_impl $variant:ident ($($params:tt)*) ($($inits:tt)*) ) => {
        ::paste::paste! {
            #[doc = concat!("Construct [`Self::", stringify!($variant), "`].")]
            pub fn [<$variant:snake>]($($params)*) -> Self {
                Self::$variant { $($inits)* }
            }
        }
    };

    (@ctor_impl $variant:ident ($($params:tt)*) ($($inits:tt)*) $field:ident : $ty:ty, $($rest:tt)*) => {
        define_port_error!(
            @ctor_impl
            $variant
            ($($params)* $field: impl Into<$ty>,)
            ($($inits)* $field: $field.into(),)
            $($rest)*
        );
    };

    (
        $(#[$outer:meta])*
        pub enum $name:ident {
            $(
                $(#[$variant_meta:meta])*
                $variant:ident $( { $($field:ident : $ty:ty),* $(,)? } )? => $message:expr
            ),* $(,)?
        }
    ) => {
        $(#[$outer])*
        #[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
        pub enum $name {
            $(
                $(#[$variant_meta])*
                #[error($message)]
                $variant $( { $($field : $ty),* } )?,
            )*
        }

        impl $name {
            $(
                define_port_error!(@ctor $variant $( { $($field : $ty),* } )?);
            )*
        }
    };
}

pub(crate) use define_port_error;

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    define_port_error! {
        /// Errors raised by a sample downstream dependency.
        pub enum SampleDependencyError {
            /// The dependency is not wired up.
            Missing => "dependency is not configured",
            /// The dependency asked the caller to slow down.
            Throttled { message: String } => "throttled: {message}",
            /// The dependency answered with an unexpected status.
            Rejected { status: u16, message: String } => "rejected with {status}: {message}",
        }
    }

    #[test]
    fn unit_variants_get_nullary_constructors() {
        let err = SampleDependencyError::missing();
        assert_eq!(err, SampleDependencyError::Missing);
        assert_eq!(err.to_string(), "dependency is not configured");
    }

    #[test]
    fn string_fields_accept_borrowed_input() {
        let err = SampleDependencyError::throttled("slow down");
        assert_eq!(err.to_string(), "throttled: slow down");
    }

    #[test]
    fn numeric_fields_keep_their_type() {
        let err = SampleDependencyError::rejected(503_u16, "maintenance");
        assert!(matches!(
            err,
            SampleDependencyError::Rejected { status: 503, .. }
        ));
        assert_eq!(err.to_string(), "rejected with 503: maintenance");
    }
}
