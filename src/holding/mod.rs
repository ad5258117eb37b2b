//! Hook for the idle display. Rendering itself lives outside the room
//! core; the coordinator only asks for an image path and shows it.

use std::path::PathBuf;

use async_trait::async_trait;

use crate::common::types::AnyResult;
use crate::session::AvatarConfig;

/// The "next up" card shown between songs.
#[derive(Debug, Clone, PartialEq)]
pub struct NextUp {
    pub title: String,
    pub artist: String,
    pub singer_name: String,
    pub singer_avatar: AvatarConfig,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HoldingScreenInput {
    pub connect_url: String,
    pub next_up: Option<NextUp>,
    pub admin_message: Option<String>,
}

/// Produces the idle image. The returned path must be stable between
/// calls when the input has not changed.
#[async_trait]
pub trait HoldingScreen: Send + Sync {
    async fn render(&self, input: &HoldingScreenInput) -> AnyResult<PathBuf>;
}

/// Fallback renderer: one fixed image regardless of input. Deployments
/// wire a real renderer in front of this.
pub struct StaticHoldingScreen {
    path: PathBuf,
}

impl StaticHoldingScreen {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

#[async_trait]
impl HoldingScreen for StaticHoldingScreen {
    async fn render(&self, _input: &HoldingScreenInput) -> AnyResult<PathBuf> {
        Ok(self.path.clone())
    }
}
