use std::sync::Arc;

use serde_json::Value;
use serde_json::json;
use tokio::io::AsyncBufReadExt;
use tokio::io::BufReader;

use tvcue_core::catalog::HttpCatalog;
use tvcue_core::config::Config;
use tvcue_core::lease::Leases;
use tvcue_core::search::SearchSession;
use tvcue_core::search::SearchState;

pub async fn main(config: Arc<Config>) -> anyhow::Result<()> {
    let catalog = HttpCatalog::new(&config.catalog)?;
    let leases = Leases::new();
    let session = SearchSession::new(
        catalog,
        config.catalog.endpoints(),
        &config.search,
        &leases,
    );
    let mut rx = session.watch();
    let mut printed = None;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => match line? {
                Some(line) => session.input(&line),
                None => break,
            },
            Ok(()) = rx.changed() => {
                let state = rx.borrow_and_update().clone();
                print_state(&state, &mut printed);
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("SIGINT received");
                return Ok(());
            }
        }
    }

    print_state(&session.settled().await, &mut printed);
    Ok(())
}

// Prints `state` unless it is the same as the one printed last.
fn print_state(state: &SearchState, printed: &mut Option<Value>) {
    let shows: Vec<_> = state
        .data
        .iter()
        .flat_map(|hits| hits.iter())
        .map(|hit| {
            json!({
                "id": hit.show.id,
                "name": hit.show.name,
                "network": hit.show.network.as_ref().map(|network| &network.name),
            })
        })
        .collect();
    let line = json!({
        "status": state.status.as_str(),
        "error": state.error.as_ref().map(ToString::to_string),
        "shows": shows,
    });
    if printed.as_ref() != Some(&line) {
        println!("{line}");
        *printed = Some(line);
    }
}
