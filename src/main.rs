use std::io::{self, Write};

use mutation_wheel::config::EnvConfig;
use mutation_wheel::logging::init_logging;
use mutation_wheel::providers::provider_from_config;
use mutation_wheel::{SessionController, SessionSnapshot};

#[tokio::main(flavor = "current_thread")]
async fn main() -> io::Result<()> {
    init_logging();

    let config = EnvConfig::from_env();
    let provider = provider_from_config(&config).map_err(io::Error::other)?;
    let profile = provider.profile();
    tracing::info!(
        provider = %profile.provider_id,
        model = %config.params.model,
        "starting mutation wheel"
    );

    let session = SessionController::new(provider, config.params);
    let mut updates = session.subscribe();
    session.start().map_err(io::Error::other)?;

    let mut last_display = None;
    print_snapshot(&session.snapshot(), &mut last_display)?;

    loop {
        tokio::select! {
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = updates.borrow_and_update().clone();
                print_snapshot(&snapshot, &mut last_display)?;
            }
            signal = tokio::signal::ctrl_c() => {
                signal?;
                break;
            }
        }
    }

    session.stop();
    let snapshot = session.snapshot();
    tracing::info!(cycles = snapshot.cycle_count, "stopped");
    Ok(())
}

/// Prints the display and status line when the visible text changed.
fn print_snapshot(snapshot: &SessionSnapshot, last_display: &mut Option<String>) -> io::Result<()> {
    if last_display.as_deref() == Some(snapshot.display_text.as_str()) {
        return Ok(());
    }

    let mut stdout = io::stdout().lock();
    writeln!(stdout, "{}", snapshot.display_text)?;
    writeln!(stdout, "  [{}]", snapshot.status_line())?;
    writeln!(stdout)?;
    stdout.flush()?;

    *last_display = Some(snapshot.display_text.clone());
    Ok(())
}
