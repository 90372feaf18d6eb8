//! Helper macro generating port error enums with snake_case constructors.

macro_rules! define_port_error {
    (@ctor $variant:ident) => {
        ::paste::paste! {
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
    define_port_error! {
        pub enum GatewayTestError {
            Unavailable { message: String } => "gateway unavailable: {message}",
            Throttled { retry_after_secs: u64 } => "throttled for {retry_after_secs}s",
            Rejected { message: String, status: u16 } => "rejected ({status}): {message}",
            Closed => "gateway closed",
        }
    }

    #[test]
    fn constructors_accept_str_for_string_fields() {
        let err = GatewayTestError::unavailable("dns");
        assert_eq!(err.to_string(), "gateway unavailable: dns");
    }

    #[test]
    fn constructors_preserve_non_string_types() {
        let err = GatewayTestError::throttled(30_u64);
        assert_eq!(err.to_string(), "throttled for 30s");
    }

    #[test]
    fn constructors_support_mixed_and_unit_variants() {
        assert_eq!(
            GatewayTestError::rejected("bad key", 401_u16).to_string(),
            "rejected (401): bad key"
        );
        assert_eq!(GatewayTestError::closed(), GatewayTestError::Closed);
    }
}
