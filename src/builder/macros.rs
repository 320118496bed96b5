//! Macros for ergonomic state identity declaration.

/// Generate a state identity enum and its `StateId` implementation.
///
/// # Example
///
/// ```
/// use tickstate::core::StateId;
/// use tickstate::state_id;
///
/// state_id! {
///     pub enum PlayerState {
///         Idle,
///         Appeal,
///         Run,
///     }
/// }
///
/// assert_eq!(PlayerState::Appeal.name(), "Appeal");
/// ```
#[macro_export]
macro_rules! state_id {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $(
                $(#[$variant_meta:meta])*
                $variant:ident
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(
            Clone,
            Copy,
            PartialEq,
            Eq,
            Hash,
            Debug,
            serde::Serialize,
            serde::Deserialize
        )]
        $vis enum $name {
            $(
                $(#[$variant_meta])*
                $variant
            ),*
        }

        impl $crate::core::StateId for $name {
            fn name(&self) -> &str {
                match self {
                    $(Self::$variant => stringify!($variant)),*
                }
            }
        }
    };
}
