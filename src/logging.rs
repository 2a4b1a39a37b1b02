use std::io::Write;
use std::sync::OnceLock;
use std::time::Instant;

static START_TIME: OnceLock<Instant> = OnceLock::new();

/// 初始化 stderr 日志，格式 `[HH:MM:SS] LEVEL: message`（自启动起的耗时）。
///
/// verbosity：0 → warn，1 → info，2 → debug，≥3 → trace。
/// `RUST_LOG` 仍然生效。
pub fn init_logger(verbosity: u8) {
    START_TIME.get_or_init(Instant::now);

    let level = match verbosity {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    let _ = env_logger::Builder::from_default_env()
        .filter_level(level)
        .format(|buf, record| {
            let elapsed = START_TIME.get().map(Instant::elapsed).unwrap_or_default();
            let secs = elapsed.as_secs();
            writeln!(
                buf,
                "[{:02}:{:02}:{:02}] {}: {}",
                secs / 3600,
                (secs % 3600) / 60,
                secs % 60,
                record.level(),
                record.args()
            )
        })
        .target(env_logger::Target::Stderr)
        .try_init();
}
