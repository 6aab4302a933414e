//! Declarative macros shared across the crate.

/// Defines the firmware error-code constants and the code → message lookup.
///
/// The codes are reported by the device at bytes 0x22–0x23 of a response
/// frame; the messages come from the official app strings.
#[macro_export]
macro_rules! define_firmware_errors {
    ( $( $name:ident = $code:expr => $msg:expr ),+ $(,)? ) => {
        $( pub const $name: u16 = $code; )+

        /// Return the firmware's description of an error code.
        #[must_use]
        pub fn firmware_error_message(code: u16) -> &'static str {
            match code {
                $( $code => $msg, )+
                _ => "Unknown error",
            }
        }
    };
}

/// Defines the device-type dispatch table.
///
/// Generates `resolve()`, mapping a 16-bit device-type code to its family
/// tag plus model and manufacturer strings, and `KNOWN_TYPES`, the list of
/// all codes the table covers.
#[macro_export]
macro_rules! define_device_table {
    ( $( $code:expr => ($family:ident, $model:expr, $manufacturer:expr) ),+ $(,)? ) => {
        /// Every device-type code with a known family.
        pub const KNOWN_TYPES: &[u16] = &[ $( $code ),+ ];

        /// Resolve a device-type code to its family and model information.
        #[must_use]
        pub fn resolve(devtype: u16) -> ModelInfo {
            match devtype {
                $(
                    $code => ModelInfo {
                        family: Family::$family,
                        model: $model,
                        manufacturer: $manufacturer,
                    },
                )+
                _ => ModelInfo {
                    family: Family::Unsupported,
                    model: "Unknown",
                    manufacturer: "Unknown",
                },
            }
        }
    };
}
