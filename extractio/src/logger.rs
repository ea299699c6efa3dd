/// Intercept messages using the `log` crate and print them to STDOUT,
/// defaulting to the info level. `RUST_LOG` overrides as usual.
pub fn setup() {
    use env_logger::{Builder, Env};
    Builder::from_env(Env::default().default_filter_or("info")).init();
}
