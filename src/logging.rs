use std::io::Write;

/// Install the `env_logger` backend. `RUST_LOG` overrides the default `info` filter.
pub fn init() {
    let env = env_logger::Env::default().default_filter_or("info");
    let _ = env_logger::Builder::from_env(env)
        .format(|buf, record| {
            let ts = buf.timestamp_millis();
            writeln!(
                buf,
                "{ts} {:<5} [{}] {}",
                record.level(),
                record.module_path().unwrap_or("signpose"),
                record.args()
            )
        })
        .try_init();
}
