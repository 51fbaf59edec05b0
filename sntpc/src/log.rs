//! Logging backend selection. The core never depends on `log` or `defmt`
//! directly outside this module; everything else calls `debug!`/`warn!`/
//! `error!` from here.

cfg_if::cfg_if! {
    if #[cfg(feature = "log")] {
        pub(crate) use log::{debug, error, warn};
    } else if #[cfg(feature = "defmt")] {
        pub(crate) use defmt::{debug, error, warn};
    } else {
        macro_rules! debug {
            ($($arg:tt)*) => {};
        }
        macro_rules! warn_macro {
            ($($arg:tt)*) => {};
        }
        macro_rules! error {
            ($($arg:tt)*) => {};
        }

        pub(crate) use debug;
        pub(crate) use error;
        pub(crate) use warn_macro as warn;
    }
}
