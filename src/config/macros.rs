/// Configuration macros
///
/// `config_struct!` declares a config section and its defaults in one place.

/// Define a configuration struct with embedded defaults
///
/// Generates the struct with public fields, a `Default` impl built from the
/// per-field default expressions, and serde support with `#[serde(default)]`
/// so partial TOML files fill in the rest.
///
/// # Example
/// ```
/// tradepilot::config_struct! {
///     pub struct RiskConfig {
///         risk_fraction: f64 = 0.02,
///         min_trade_amount: f64 = 1.0,
///     }
/// }
/// ```
#[macro_export]
macro_rules! config_struct {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            $(
                $(#[$field_meta:meta])*
                $field_name:ident: $field_type:ty = $default_value:expr
            ),*
            $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
        #[serde(default)]
        $vis struct $name {
            $(
                $(#[$field_meta])*
                pub $field_name: $field_type,
            )*
        }

        impl Default for $name {
            fn default() -> Self {
                Self {
                    $(
                        $field_name: $default_value,
                    )*
                }
            }
        }
    };
}
