pub type Rgb = [u8; 3];

pub static GAME_NAME: &str = "pirates";
pub static LEGACY_FORMAT_VERSION: u64 = 1;
pub static LEGACY_REVISION: u64 = 3;

pub static REPLAY_FORMAT_JSON: &str = "json";
pub static REPLAY_FORMAT_STORAGE: &str = "storage";

pub static MIN_REVISION: u64 = 2;
pub static MAX_REVISION: u64 = 3;
pub static MAX_PLAYERS: usize = 26;

/// Upper bounds on what a replay may declare. The per-turn tables and the
/// wall grid are allocated from these.
pub static MAX_DURATION: usize = 1 << 20;
pub static MAX_MAP_CELLS: usize = 1 << 22;

/// Fields in a canonical entity record, including the optional histories.
pub static MIN_ENTITY_FIELDS: usize = 4;
pub static MAX_ENTITY_FIELDS: usize = 15;

/// Characters allowed in map rows, by revision.
pub static MAP_CHARS_REVISION_2: &str = "%*.abcdefghijklmnopqrstuvwxyz";
pub static MAP_CHARS_REVISION_3: &str =
    "%*.abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

pub static WALL_CHAR: char = '%';

pub static PLAYER_COLORS: [Rgb; 21] = [
    [20, 20, 20],
    [255, 51, 51],
    [50, 50, 153],
    [0, 153, 204],
    [0, 153, 51],
    [102, 51, 153],
    [51, 204, 51],
    [102, 102, 102],
    [153, 51, 204],
    [153, 0, 102],
    [204, 0, 102],
    [204, 0, 0],
    [204, 51, 204],
    [204, 102, 0],
    [204, 153, 0],
    [204, 204, 0],
    [204, 153, 153],
    [255, 51, 153],
    [255, 153, 51],
    [255, 204, 0],
    [51, 153, 153],
];

/// Index into [`PLAYER_COLORS`] reserved for the highlighted player.
pub static HIGHLIGHT_COLOR_INDEX: usize = 10;

/// Indices into [`PLAYER_COLORS`] per player count. Entry `n` is the map for `n` players.
pub static COLOR_MAPS: [&[usize]; 11] = [
    &[],
    &[1],
    &[1, 2],
    &[1, 3, 6],
    &[1, 3, 6, 8],
    &[0, 2, 4, 6, 8],
    &[0, 2, 3, 4, 6, 8],
    &[0, 1, 3, 4, 5, 6, 8],
    &[0, 1, 3, 4, 5, 6, 7, 8],
    &[0, 1, 2, 3, 4, 5, 6, 7, 8],
    &[0, 1, 2, 3, 4, 5, 6, 7, 8, 9],
];

/// Color of entities without an owner (hsl 50/20/50).
pub static NEUTRAL_COLOR: Rgb = [153, 145, 102];
pub static DEATH_TINT: Rgb = [255, 255, 255];
pub static BACKGROUND_COLOR: Rgb = [0, 0, 0];

// Spawn animation, relative to the activation turn.
pub static SPAWN_LEAD_IN: f64 = 0.25;
pub static SPAWN_SIZE_STEPS: [(f64, f64); 3] = [(0.0, 1.0), (0.125, 1.5), (0.25, 0.7)];
pub static SPAWN_SETTLE: f64 = 0.5;

// Death animation, relative to the death turn.
pub static DEATH_FLASH: (f64, f64) = (0.8, 0.6);
pub static DEATH_REVERT: (f64, f64) = (0.6, 0.4);
pub static DEATH_DARKEN: f64 = 0.4;
pub static DEATH_SHRINK: f64 = 0.8;
pub static ZONE_DEATH_SHRINK: f64 = 0.2;
pub static ZONE_DEATH_CAUSE: &str = "b";

/// Time taken by a revision-2 entity to take on its new owner's color.
pub static CONVERSION_FADE: f64 = 0.25;
