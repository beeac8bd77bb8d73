#![cfg(feature = "cli")]
#![forbid(unsafe_code)]

use mobile_geolocation::{cli::Input, util::cli::exec};

fn main() {
    exec::<Input>()
}
