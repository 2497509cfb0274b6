//! Macros to reduce boilerplate for service declarations.

/// Declare a service from a protobuf-like list of rpcs.
///
/// The macro expands to the equivalent [crate::ServiceBuilder] calls and
/// evaluates to a `Result<ServiceDef, ServiceError>`, so type arguments lacking
/// capabilities are reported like with the builder.
///
/// Usage is as follows:
///
/// ```
/// # use rpc_service::{rpc_service, Capabilities, Message};
/// # #[derive(Debug)]
/// # struct Point;
/// # impl Message for Point {
/// #     fn capabilities() -> Capabilities {
/// #         Capabilities::new()
/// #             .marshal("encode", |_: &Point| Vec::new())
/// #             .unmarshal("decode", |_: &[u8]| Ok::<_, std::convert::Infallible>(Point))
/// #     }
/// # }
/// let route_guide = rpc_service! {
///     service RouteGuide {
///         // Optional, the defaults are `marshal` and `unmarshal`.
///         marshal = "encode";
///         unmarshal = "decode";
///
///         rpc GetFeature(Point) returns (Point);
///         rpc ListFeatures(Point) returns (stream Point);
///         rpc RecordRoute(stream Point) returns (Point);
///         rpc RouteChat(stream Point) returns (stream Point);
///     }
/// }
/// .unwrap();
///
/// // a sub service sees all rpcs of its parent
/// let extended = rpc_service! {
///     service ExtendedRouteGuide extends route_guide {
///         rpc GetFeatures(stream Point) returns (stream Point);
///     }
/// }
/// .unwrap();
/// assert_eq!(extended.rpc_descs().len(), 5);
/// ```
#[macro_export]
macro_rules! rpc_service {
    (
        service $service:ident $(extends $parent:ident)? {
            $(marshal = $marshal:literal;)?
            $(unmarshal = $unmarshal:literal;)?

            $(rpc $m_name:ident ( $($m_input:tt)+ ) returns ( $($m_output:tt)+ );)*
        }
    ) => {{
        let mut builder = $crate::__service_builder!(stringify!($service) $(, $parent)?);
        $( builder.set_marshal_instance_method($marshal); )?
        $( builder.set_unmarshal_class_method($unmarshal); )?
        (move || -> ::std::result::Result<$crate::ServiceDef, $crate::ServiceError> {
            $(
                builder.rpc(
                    stringify!($m_name),
                    ($crate::__rpc_type!($($m_input)+), $crate::__rpc_type!($($m_output)+)),
                )?;
            )*
            ::std::result::Result::Ok(builder.build())
        })()
    }};
}

#[doc(hidden)]
#[macro_export]
macro_rules! __service_builder {
    ($name:expr) => {
        $crate::ServiceBuilder::new($name)
    };
    ($name:expr, $parent:ident) => {
        $parent.subclass($name)
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! __rpc_type {
    (stream $ty:ty) => {
        $crate::stream($crate::msg::<$ty>())
    };
    ($ty:ty) => {
        $crate::msg::<$ty>()
    };
}
