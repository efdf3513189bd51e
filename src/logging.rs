use cfg_if::cfg_if;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{layer::SubscriberExt, EnvFilter};

const DEFAULT_FILTER: &str = "info,wgpu_core=warn,wgpu_hal=warn,naga=warn";

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

cfg_if! {
    if #[cfg(target_arch = "wasm32")] {
        /// Route tracing output to the browser console
        pub fn init() {
            let wasm_layer = tracing_wasm::WASMLayer::new(tracing_wasm::WASMLayerConfig::default());

            let _ = tracing_subscriber::registry()
                .with(env_filter())
                .with(wasm_layer)
                .try_init();

            #[cfg(feature = "console_error_panic_hook")]
            console_error_panic_hook::set_once();
        }
    } else {
        use std::ffi::OsString;
        use std::io;
        use std::path::{Path, PathBuf};

        use once_cell::sync::OnceCell;
        use tracing_appender::non_blocking::WorkerGuard;
        use tracing_subscriber::fmt;

        const DEFAULT_LOG_FILE: &str = "logs/stardance.log";

        // Keeps the file writer flushing until exit
        static FILE_GUARD: OnceCell<WorkerGuard> = OnceCell::new();

        /// Directory and file-name prefix for the daily rolling log
        fn split_log_path(path: &str) -> (PathBuf, OsString) {
            let path = Path::new(path);
            let dir = match path.parent() {
                Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
                _ => PathBuf::from("."),
            };
            let file = path
                .file_name()
                .map(|f| f.to_os_string())
                .unwrap_or_else(|| OsString::from("stardance.log"));
            (dir, file)
        }

        fn panic_message(info: &std::panic::PanicHookInfo<'_>) -> String {
            let payload = info
                .payload()
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| info.payload().downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "<non-string panic>".to_string());
            match info.location() {
                Some(loc) => format!("panic at {}:{}:{} {payload}", loc.file(), loc.line(), loc.column()),
                None => format!("panic {payload}"),
            }
        }

        /// Console plus daily rolling file (`RUST_LOG_FILE`, default logs/stardance.log)
        pub fn init() {
            let console_layer = fmt::layer()
                .with_writer(io::stderr)
                .with_target(true)
                .with_file(true)
                .with_line_number(true)
                .compact();

            let log_path = std::env::var("RUST_LOG_FILE").unwrap_or_else(|_| DEFAULT_LOG_FILE.to_string());
            let (dir, file) = split_log_path(&log_path);
            let (writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::daily(dir, file));
            let _ = FILE_GUARD.set(guard);

            let file_layer = fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(true)
                .with_file(true)
                .with_line_number(true)
                .compact();

            if tracing_subscriber::registry()
                .with(env_filter())
                .with(console_layer)
                .with(file_layer)
                .try_init()
                .is_err()
            {
                return;
            }

            std::panic::set_hook(Box::new(|info| {
                let backtrace = std::backtrace::Backtrace::force_capture();
                tracing::error!("{}\nBacktrace:\n{:?}", panic_message(info), backtrace);
            }));
            tracing::debug!(path = %log_path, "logging initialised");
        }

        #[cfg(test)]
        mod tests {
            use super::*;

            #[test]
            fn test_split_nested_path() {
                let (dir, file) = split_log_path("logs/run/stardance.log");
                assert_eq!(dir, PathBuf::from("logs/run"));
                assert_eq!(file, OsString::from("stardance.log"));
            }

            #[test]
            fn test_bare_file_name_logs_to_cwd() {
                let (dir, file) = split_log_path("demo.log");
                assert_eq!(dir, PathBuf::from("."));
                assert_eq!(file, OsString::from("demo.log"));
            }
        }
    }
}
