use std::collections::HashMap;
use std::sync::Arc;

use rand::Rng;
use tokio::sync::RwLock;

use shared::Config;

use crate::room::Room;

/// Crockford base32: excludes I, L, O, U to avoid confusion with 1, 1, 0, V
/// when a room code is read aloud or typed by hand.
const ROOM_ID_ALPHABET: &[u8] = b"0123456789ABCDEFGHJKMNPQRSTVWXYZ";
const ROOM_ID_LEN: usize = 6;

/// Top-level shared state: the room registry. Protected by a single
/// `RwLock`, per spec.md §5 ("the Room registry is protected by a single
/// mutex"); everything below a room's own `Arc` is that room's business.
#[derive(Clone)]
pub struct AppState {
    rooms: Arc<RwLock<HashMap<String, Arc<Room>>>>,
    pub config: Config,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        Self {
            rooms: Arc::new(RwLock::new(HashMap::new())),
            config,
        }
    }

    pub async fn create_room(&self, creator_name: String) -> (Arc<Room>, u32) {
        let mut rooms = self.rooms.write().await;
        let room_id = loop {
            let candidate = generate_room_id();
            if !rooms.contains_key(&candidate) {
                break candidate;
            }
        };
        let (room, creator_id) = Room::new(room_id.clone(), self.config.clone(), creator_name);
        rooms.insert(room_id, Arc::clone(&room));
        (room, creator_id)
    }

    pub async fn get_room(&self, room_id: &str) -> Option<Arc<Room>> {
        self.rooms.read().await.get(room_id).cloned()
    }

    pub async fn list_rooms(&self) -> Vec<(String, usize, bool)> {
        let rooms = self.rooms.read().await;
        let mut summaries = Vec::with_capacity(rooms.len());
        for (room_id, room) in rooms.iter() {
            summaries.push((room_id.clone(), room.player_count().await, room.is_running().await));
        }
        summaries
    }

    /// Removes a room from the registry. Dropping the last `Arc` to it also
    /// drops its `GameHandle`, aborting the tick task (spec.md §5
    /// "Cancellation").
    pub async fn remove_room(&self, room_id: &str) {
        self.rooms.write().await.remove(room_id);
    }
}

fn generate_room_id() -> String {
    let mut rng = rand::thread_rng();
    (0..ROOM_ID_LEN)
        .map(|_| {
            let idx = rng.gen_range(0..ROOM_ID_ALPHABET.len());
            ROOM_ID_ALPHABET[idx] as char
        })
        .collect()
}
