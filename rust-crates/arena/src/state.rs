use rand::Rng;
use tracing::debug;

pub const DEFAULT_ARENA_SIZE: f32 = 420.0;
pub const PLAYER_SIZE: f32 = 20.0;
pub const BLOCK_SIZE: f32 = 30.0;
pub const EXPLOSION_RADIUS: f32 = 60.0;
pub const BOMB_FUSE_TICKS: u8 = 3;
pub const MOVE_SPEED: f32 = 10.0;
pub const GAME_DURATION_TICKS: u32 = 120;
pub const BLOCK_DENSITY: f64 = 0.7;
pub const DAMAGE_PER_BLOCK: u32 = 10;

/// Display colours cycled over the roster at spawn time.
pub const PLAYER_PALETTE: [&str; 5] =
    ["#FF6B6B", "#4ECDC4", "#45B7D1", "#FFA07A", "#98D8C8"];

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

impl Position {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance_to(self, other: Position) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Player {
    pub id: String,
    pub position: Position,
    pub blocks_destroyed: u32,
    pub damage_dealt: u32,
    pub color: String,
    pub alive: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Bomb {
    pub id: u64,
    pub position: Position,
    pub owner_id: String,
    pub fuse: u8,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Block {
    pub position: Position,
    pub destroyed: bool,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Phase {
    Initializing,
    Running,
    Ended,
}

#[derive(Clone, Copy, Debug)]
pub struct ArenaConfig {
    pub size: f32,
    pub duration_ticks: u32,
    pub explosion_radius: f32,
    pub bomb_fuse_ticks: u8,
    pub move_speed: f32,
    pub block_density: f64,
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self {
            size: DEFAULT_ARENA_SIZE,
            duration_ticks: GAME_DURATION_TICKS,
            explosion_radius: EXPLOSION_RADIUS,
            bomb_fuse_ticks: BOMB_FUSE_TICKS,
            move_speed: MOVE_SPEED,
            block_density: BLOCK_DENSITY,
        }
    }
}

/// Everything emitted by a single call to [`ArenaState::step`].
#[derive(Clone, Debug, PartialEq)]
pub enum TickEvent {
    BombExploded { bomb: u64, owner: String },
    PlayerEliminated { player: String },
    BlockDestroyed { position: Position, by: String },
    Ended,
}

/// The simulated world for one arena session. State is private to the
/// session; two sessions never share bombs or blocks.
#[derive(Clone, Debug)]
pub struct ArenaState {
    pub(crate) config: ArenaConfig,
    pub(crate) phase: Phase,
    pub(crate) time_left: u32,
    pub(crate) players: Vec<Player>,
    pub(crate) bombs: Vec<Bomb>,
    pub(crate) blocks: Vec<Block>,
    next_bomb_id: u64,
}

impl ArenaState {
    pub fn new(config: ArenaConfig) -> Self {
        Self {
            config,
            phase: Phase::Initializing,
            time_left: config.duration_ticks,
            players: Vec::new(),
            bombs: Vec::new(),
            blocks: Vec::new(),
            next_bomb_id: 0,
        }
    }

    pub fn config(&self) -> &ArenaConfig {
        &self.config
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn time_left(&self) -> u32 {
        self.time_left
    }

    pub fn players(&self) -> &[Player] {
        &self.players
    }

    pub fn bombs(&self) -> &[Bomb] {
        &self.bombs
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn center(&self) -> Position {
        Position::new(self.config.size / 2.0, self.config.size / 2.0)
    }

    /// Spawns the roster and the destructible grid, moving the state from
    /// `Initializing` to `Running`. Players land evenly spaced on the
    /// horizontal midline; blocks are sampled per grid cell at the
    /// configured density.
    pub fn start<R: Rng>(&mut self, roster: &[String], rng: &mut R) {
        if self.phase != Phase::Initializing {
            return;
        }
        let size = self.config.size;
        let count = roster.len();
        self.players = roster
            .iter()
            .enumerate()
            .map(|(index, id)| Player {
                id: id.clone(),
                position: Position::new(
                    (index as f32 + 1.0) * (size / (count as f32 + 1.0)),
                    size / 2.0,
                ),
                blocks_destroyed: 0,
                damage_dealt: 0,
                color: PLAYER_PALETTE[index % PLAYER_PALETTE.len()].to_string(),
                alive: true,
            })
            .collect();

        let grid_cells = (size / BLOCK_SIZE).floor() as u32;
        self.blocks = Vec::new();
        for i in 0..grid_cells {
            for j in 0..grid_cells {
                if rng.random_bool(self.config.block_density) {
                    self.blocks.push(Block {
                        position: Position::new(
                            i as f32 * BLOCK_SIZE,
                            j as f32 * BLOCK_SIZE,
                        ),
                        destroyed: false,
                    });
                }
            }
        }

        self.time_left = self.config.duration_ticks;
        self.phase = Phase::Running;
        debug!(
            players = self.players.len(),
            blocks = self.blocks.len(),
            "arena started"
        );
    }

    /// Advances the world by one tick: the match clock and every bomb fuse
    /// drop by one, bombs whose fuse reached zero explode, and the match
    /// ends on timeout or once at most one of several players is left
    /// alive.
    pub fn step(&mut self) -> Vec<TickEvent> {
        if self.phase != Phase::Running {
            return Vec::new();
        }
        let mut events = Vec::new();

        self.time_left = self.time_left.saturating_sub(1);
        for bomb in &mut self.bombs {
            bomb.fuse = bomb.fuse.saturating_sub(1);
        }

        let exploding: Vec<Bomb> = self
            .bombs
            .iter()
            .filter(|bomb| bomb.fuse == 0)
            .cloned()
            .collect();
        self.bombs.retain(|bomb| bomb.fuse > 0);
        for bomb in &exploding {
            self.resolve_explosion(bomb, &mut events);
        }

        let alive = self.players.iter().filter(|player| player.alive).count();
        let eliminated_out = self.players.len() > 1 && alive <= 1;
        if self.time_left == 0 || eliminated_out {
            self.phase = Phase::Ended;
            events.push(TickEvent::Ended);
        }
        events
    }

    /// Moves a player one speed unit, clamped so the full sprite stays
    /// inside the arena. Ignored for dead or unknown players and outside
    /// the `Running` phase.
    pub fn move_player(&mut self, player_id: &str, direction: Direction) {
        if self.phase != Phase::Running {
            return;
        }
        let size = self.config.size;
        let speed = self.config.move_speed;
        let half = PLAYER_SIZE / 2.0;
        let Some(player) = self
            .players
            .iter_mut()
            .find(|player| player.id == player_id && player.alive)
        else {
            return;
        };
        match direction {
            Direction::Up => {
                player.position.y = (player.position.y - speed).max(half);
            }
            Direction::Down => {
                player.position.y = (player.position.y + speed).min(size - half);
            }
            Direction::Left => {
                player.position.x = (player.position.x - speed).max(half);
            }
            Direction::Right => {
                player.position.x = (player.position.x + speed).min(size - half);
            }
        }
    }

    /// Drops a bomb at the owner's current position with a fresh fuse.
    /// Returns the bomb id, or `None` when the owner is dead, unknown, or
    /// the match is not running.
    pub fn place_bomb(&mut self, owner_id: &str) -> Option<u64> {
        if self.phase != Phase::Running {
            return None;
        }
        let owner = self
            .players
            .iter()
            .find(|player| player.id == owner_id && player.alive)?;
        let id = self.next_bomb_id;
        self.next_bomb_id += 1;
        let bomb = Bomb {
            id,
            position: owner.position,
            owner_id: owner.id.clone(),
            fuse: self.config.bomb_fuse_ticks,
        };
        self.bombs.push(bomb);
        Some(id)
    }

    fn resolve_explosion(&mut self, bomb: &Bomb, events: &mut Vec<TickEvent>) {
        events.push(TickEvent::BombExploded {
            bomb: bomb.id,
            owner: bomb.owner_id.clone(),
        });
        let radius = self.config.explosion_radius;

        for player in &mut self.players {
            if player.alive && player.position.distance_to(bomb.position) < radius {
                player.alive = false;
                events.push(TickEvent::PlayerEliminated {
                    player: player.id.clone(),
                });
            }
        }

        let mut credited = 0u32;
        for block in &mut self.blocks {
            if !block.destroyed && block.position.distance_to(bomb.position) < radius {
                block.destroyed = true;
                credited += 1;
                events.push(TickEvent::BlockDestroyed {
                    position: block.position,
                    by: bomb.owner_id.clone(),
                });
            }
        }
        // The owner is credited even when the same blast took them out.
        if credited > 0
            && let Some(owner) = self
                .players
                .iter_mut()
                .find(|player| player.id == bomb.owner_id)
        {
            owner.blocks_destroyed += credited;
            owner.damage_dealt += credited * DAMAGE_PER_BLOCK;
        }
    }
}
