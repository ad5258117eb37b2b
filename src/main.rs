// Copyright (c) 2026 the SongMartyn contributors
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use songmartyn::common::types::AnyResult;
use songmartyn::holding::{HoldingScreen, StaticHoldingScreen};
use songmartyn::hub::{Hub, HubConfig};
use songmartyn::library::{MemoryLibrary, SongLibrary};
use songmartyn::media::{MediaBackend, MpvController};
use songmartyn::room::{Coordinator, RoomEvent};
use songmartyn::session::SessionStore;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> AnyResult<()> {
    let config = songmartyn::configs::Config::load()?;

    songmartyn::common::logger::init(&config);

    songmartyn::common::banner::print_banner(&songmartyn::common::banner::BannerInfo::default());

    info!("SongMartyn server starting...");

    // Fatal when the data dir is unusable: nothing works without the
    // session and queue stores.
    let store = Arc::new(SessionStore::open(&config.server.data_dir)?);

    let (events_tx, events_rx) = flume::unbounded();
    let (media_tx, media_rx) = flume::unbounded();

    let ipc_socket = config.media.ipc_socket.clone().unwrap_or_else(|| {
        config
            .server
            .data_dir
            .join("player.sock")
            .to_string_lossy()
            .to_string()
    });
    let media: Arc<dyn MediaBackend> =
        Arc::new(MpvController::new(config.media.clone(), ipc_socket, media_tx));
    if let Err(e) = media.start().await {
        warn!("player did not start: {} (will retry on the next play)", e);
    }
    Coordinator::spawn_media_forwarder(events_tx.clone(), media_rx);

    let library: Arc<dyn SongLibrary> = Arc::new(MemoryLibrary::from_index_file(
        &config.server.data_dir.join("library.json"),
    )?);
    let holding: Arc<dyn HoldingScreen> = Arc::new(StaticHoldingScreen::new(
        config.server.data_dir.join("holding.png"),
    ));

    let hub = Hub::new(
        HubConfig {
            admin_pin: config.server.admin_pin.clone(),
            handshake_timeout: Duration::from_secs(config.room.handshake_timeout_secs),
            client_buffer: config.room.client_buffer,
        },
        events_tx.clone(),
    );

    let coordinator = Coordinator::new(
        config.clone(),
        store,
        library,
        media,
        holding,
        hub.clone(),
        events_tx.clone(),
        events_rx,
    );
    let room = tokio::spawn(coordinator.run());

    let app = hub
        .router()
        .layer(tower_http::trace::TraceLayer::new_for_http());

    let ip: IpAddr = config.server.host.parse()?;
    let address = SocketAddr::from((ip, config.server.http_port));
    info!("SongMartyn listening on {}", address);

    let listener = tokio::net::TcpListener::bind(address).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async {
        let _ = tokio::signal::ctrl_c().await;
        info!("shutdown signal received");
    })
    .await?;

    // Let the room say goodbye and reap the player before we exit.
    let _ = events_tx.send(RoomEvent::Shutdown);
    let _ = tokio::time::timeout(Duration::from_secs(5), room).await;

    Ok(())
}
