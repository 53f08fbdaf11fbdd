//! Bakes the Wi-Fi and Adafruit IO credentials into the binary.
//!
//! Values come from the environment, or from a `.env` file at the workspace
//! root (see `.env.example`). Missing values build as empty strings and the
//! firmware logs a warning at startup instead of failing the build.

const SECRETS: [&str; 4] = ["WIFI_SSID", "WIFI_PASSWORD", "AIO_USERNAME", "AIO_KEY"];

fn main() {
    match dotenvy::dotenv() {
        Ok(path) => println!("cargo:rerun-if-changed={}", path.display()),
        Err(e) if e.not_found() => {}
        Err(e) => println!("cargo:warning=could not load .env: {e}"),
    }

    for name in SECRETS {
        println!("cargo:rerun-if-env-changed={name}");
        let value = std::env::var(name).unwrap_or_default();
        if value.is_empty() {
            println!("cargo:warning={name} is not set");
        }
        println!("cargo:rustc-env={name}={value}");
    }
}
