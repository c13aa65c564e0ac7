/// Registers `#[function]`-annotated functions with an engine or registry by Rust
/// identifier. Stops at the first failure.
///
/// ```ignore
/// register_functions!(engine, sum, days_between)?;
/// ```
#[macro_export]
macro_rules! register_functions {
    ($target:expr, $($f:ident),+ $(,)?) => {{
        let mut result: ::core::result::Result<(), $crate::RegistryError> = Ok(());
        $(
            if result.is_ok() {
                result = $target.register_submitted(stringify!($f));
            }
        )+
        result
    }};
}
