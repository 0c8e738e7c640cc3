use std::path::PathBuf;

use beatbox::{BeatBoxApp, MidiSequencer, Transport, WINDOW_TITLE, config, list_output_ports};
use tracing_subscriber::EnvFilter;

fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let args: Vec<String> = std::env::args().collect();
    let config_path = args
        .iter()
        .position(|a| a == "--config")
        .and_then(|i| args.get(i + 1))
        .map(PathBuf::from);
    let settings = config::resolve(config_path.as_deref());

    if args.iter().any(|a| a == "--list-ports") {
        match list_output_ports(&settings.midi.client_name) {
            Ok(ports) if ports.is_empty() => println!("No MIDI outputs found"),
            Ok(ports) => {
                println!("Available MIDI outputs:");
                for (i, name) in ports.iter().enumerate() {
                    println!("  {}: {}", i, name);
                }
            }
            Err(e) => eprintln!("{}", e),
        }
        return;
    }

    let (session, error_message) = match MidiSequencer::open(&settings.midi) {
        Ok(session) => (Some(session), None),
        Err(e) => {
            tracing::error!("MIDI output unavailable: {}", e);
            (None, Some(format!("MIDI output unavailable: {}", e)))
        }
    };
    let transport = Transport::new(session, settings.kit).with_velocity(settings.velocity);

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([640.0, 480.0])
            .with_title(WINDOW_TITLE),
        ..Default::default()
    };

    if let Err(e) = eframe::run_native(
        WINDOW_TITLE,
        options,
        Box::new(|_cc| Ok(Box::new(BeatBoxApp::new(transport, error_message)))),
    ) {
        tracing::error!("UI exited with an error: {}", e);
    }
}
