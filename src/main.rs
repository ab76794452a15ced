//! Shuffle Bridge entry point
//!
//! On the web this only sets up logging; the page calls `mount(Elm.Main)`.
//! Natively it is a small tool for the file-backed save slot.

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn wasm_main() {
    console_error_panic_hook::set_once();
    if console_log::init_with_level(log::Level::Info).is_err() {
        web_sys::console::warn_1(&"logger already initialized".into());
    }
    log::info!("Shuffle bridge loaded");
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // WASM entry point is wasm_main, this is just to satisfy the compiler
}

#[cfg(not(target_arch = "wasm32"))]
mod native {
    use std::path::PathBuf;

    use anyhow::{Context, Result, bail};
    use clap::{Parser, Subcommand};
    use serde_json::json;

    use shuffle_bridge::platform::FileStorage;
    use shuffle_bridge::{
        AppInstance, Application, BridgeConfig, CorruptPolicy, InitialFlags, MountPoint,
        PersistenceBridge, Port, STORAGE_KEY, Snapshot,
    };

    #[derive(Parser)]
    #[command(name = "shuffle-bridge", version, about = "Inspect and drive the shuffle save slot")]
    struct Cli {
        /// Directory holding one `<key>.json` file per slot
        #[arg(long, default_value = ".shuffle")]
        data_dir: PathBuf,

        /// Storage slot key
        #[arg(long, default_value = STORAGE_KEY)]
        key: String,

        /// What to do with an unreadable save: fail or discard
        #[arg(long, default_value = "fail", value_parser = parse_policy)]
        on_corrupt: CorruptPolicy,

        #[command(subcommand)]
        command: Command,
    }

    #[derive(Subcommand)]
    enum Command {
        /// Print the saved snapshot
        Show,
        /// Replace the saved snapshot with the given JSON
        Save { json: String },
        /// Delete the saved snapshot
        Clear,
        /// Boot the demo counter from the saved state and save count + 1
        Bump,
    }

    fn parse_policy(s: &str) -> Result<CorruptPolicy, String> {
        CorruptPolicy::from_str(s).ok_or_else(|| format!("unknown policy {s:?} (fail, discard)"))
    }

    /// Demo app: a counter restored from `{"count": n}`
    struct Counter;

    struct CounterInstance {
        count: u64,
        port: Port<Snapshot>,
    }

    impl CounterInstance {
        fn bump(&mut self) {
            self.count += 1;
            self.port.send(Snapshot::new(json!({ "count": self.count })));
        }
    }

    impl AppInstance for CounterInstance {
        fn save_port(&self) -> &Port<Snapshot> {
            &self.port
        }
    }

    impl Application for Counter {
        type Instance = CounterInstance;

        fn init(
            self,
            mount: &MountPoint,
            flags: InitialFlags,
        ) -> shuffle_bridge::error::Result<CounterInstance> {
            let count = flags
                .as_ref()
                .and_then(|s| s.as_value().get("count"))
                .and_then(|c| c.as_u64())
                .unwrap_or(0);
            log::info!("Counter mounted on #{} at {}", mount.id(), count);
            Ok(CounterInstance {
                count,
                port: Port::new(),
            })
        }
    }

    pub fn run() -> Result<()> {
        env_logger::init();
        let cli = Cli::parse();

        let config = BridgeConfig::default()
            .with_storage_key(cli.key)
            .with_on_corrupt(cli.on_corrupt);
        let bridge = PersistenceBridge::new(FileStorage::new(&cli.data_dir), config);

        match cli.command {
            Command::Show => match bridge.load()? {
                Some(snapshot) => println!("{snapshot}"),
                None => println!("(empty)"),
            },
            Command::Save { json } => {
                let snapshot = Snapshot::from_text(&json).context("snapshot must be valid JSON")?;
                bridge.persist(&snapshot)?;
                println!("saved {} bytes", snapshot.to_text().len());
            }
            Command::Clear => {
                bridge.clear()?;
                println!("cleared");
            }
            Command::Bump => {
                let mut running = bridge.start(Counter)?;
                running.instance_mut().bump();
                if running.stats().failures() > 0 {
                    bail!("count not saved to {}", cli.data_dir.display());
                }
                println!("{}", running.instance().count);
            }
        }

        Ok(())
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn main() -> anyhow::Result<()> {
    native::run()
}
