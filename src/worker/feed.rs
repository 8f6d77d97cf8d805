// Fri Jan 17 2026 - Alex

use super::{run_loop, CancellationToken};
use crate::datatypes::{Vector2, Vector3};
use crate::instance::{BasePart, DataModel, Player, Session};
use crate::memory::Address;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

pub const ROOT_PART: &str = "HumanoidRootPart";

/// One other player's character as the overlay should draw it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Marker {
    pub player: Address,
    pub name: String,
    pub world: Vector3,
    pub screen: Vector2,
}

impl Marker {
    pub fn on_screen(&self) -> bool {
        self.screen != Vector2::OFFSCREEN
    }
}

/// Where projected positions go. Each publish replaces the previous set.
pub trait OverlaySink: Send {
    fn publish(&mut self, markers: &[Marker]);
}

impl<F> OverlaySink for F
where
    F: FnMut(&[Marker]) + Send,
{
    fn publish(&mut self, markers: &[Marker]) {
        self(markers)
    }
}

/// Projects every other player's root part through the visual engine.
pub struct PositionFeed {
    session: Arc<Session>,
    sink: Box<dyn OverlaySink>,
}

impl PositionFeed {
    pub fn new(session: Arc<Session>, sink: Box<dyn OverlaySink>) -> Self {
        Self { session, sink }
    }

    /// Current markers without publishing them. Players without a character
    /// or root part are skipped.
    pub fn collect(&self) -> Vec<Marker> {
        let scheduler = self.session.scheduler();
        let game: DataModel = scheduler.data_model();
        if game.is_null() {
            return Vec::new();
        }
        let engine = scheduler.visual_engine();
        let viewport = engine.dimensions();
        let matrix = engine.view_matrix();

        let players = game.players();
        let local = players.local_player();
        players
            .children()
            .into_iter()
            .filter(|player| *player != *local.instance())
            .filter_map(|player| {
                let character = Player::new(player.clone()).character();
                let root = character.non_null()?.find_first_child(ROOT_PART, false).non_null()?;
                let world = BasePart::new(root).position();
                Some(Marker {
                    player: player.address(),
                    name: player.name(),
                    world,
                    screen: matrix.project(world, viewport),
                })
            })
            .collect()
    }

    pub fn step(&mut self) -> usize {
        let markers = self.collect();
        self.sink.publish(&markers);
        markers.len()
    }

    /// Publishes until cancelled or the session dies. A zero interval runs
    /// uncapped.
    pub fn run(&mut self, token: &CancellationToken, interval: Duration) {
        run_loop(token, interval, || {
            if !self.session.is_alive() {
                self.sink.publish(&[]);
                return false;
            }
            self.step();
            true
        });
    }
}
