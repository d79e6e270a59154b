//! Macros for ergonomic machine construction.

/// Declare an application event enum.
///
/// Discriminants start at [`Event::USER_BASE`](crate::core::Event::USER_BASE)
/// and increase by one per variant. The enum converts into
/// [`Event`](crate::core::Event), and back with `TryFrom`, which hands the
/// event back unchanged when it is not one of the variants.
///
/// # Example
///
/// ```
/// use hsm_runtime::core::Event;
/// use hsm_runtime::hsm_events;
///
/// hsm_events! {
///     pub enum ButtonEvent {
///         Press,
///         Release,
///         Timeout,
///     }
/// }
///
/// assert_eq!(Event::from(ButtonEvent::Press), Event::user(0));
/// assert_eq!(ButtonEvent::try_from(Event::user(2)), Ok(ButtonEvent::Timeout));
/// assert_eq!(ButtonEvent::Release.name(), "Release");
/// ```
#[macro_export]
macro_rules! hsm_events {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $(#[$first_meta:meta])*
            $first:ident
            $(
                ,
                $(#[$variant_meta:meta])*
                $variant:ident
            )*
            $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
        #[repr(u32)]
        $vis enum $name {
            $(#[$first_meta])*
            $first = $crate::core::Event::USER_BASE,
            $(
                $(#[$variant_meta])*
                $variant
            ),*
        }

        impl $name {
            /// Every variant, in declaration order.
            pub const ALL: &'static [$name] = &[$name::$first $(, $name::$variant)*];

            pub fn name(&self) -> &'static str {
                match self {
                    Self::$first => stringify!($first),
                    $(Self::$variant => stringify!($variant)),*
                }
            }
        }

        impl ::core::convert::From<$name> for $crate::core::Event {
            fn from(event: $name) -> Self {
                $crate::core::Event::new(event as u32)
            }
        }

        impl ::core::convert::TryFrom<$crate::core::Event> for $name {
            type Error = $crate::core::Event;

            fn try_from(
                event: $crate::core::Event,
            ) -> ::core::result::Result<Self, $crate::core::Event> {
                $name::ALL
                    .iter()
                    .copied()
                    .find(|variant| *variant as u32 == event.raw())
                    .ok_or(event)
            }
        }
    };
}
