use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GameType {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub icon: String,
    #[serde(default = "default_true")]
    pub available: bool,
    /// Stations of this type that can host sessions in parallel.
    #[serde(default = "default_capacity")]
    pub capacity: u32,
    #[serde(default)]
    pub popular_games: Vec<String>,
    /// Individual hourly rate from the current pricing table.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_rate_per_hour: Option<f64>,
}

fn default_true() -> bool {
    true
}

fn default_capacity() -> u32 {
    1
}

/// Catalog seeded into a fresh database.
pub fn default_catalog() -> Vec<GameType> {
    fn entry(
        id: &str,
        name: &str,
        description: &str,
        icon: &str,
        capacity: u32,
        games: &[&str],
    ) -> GameType {
        GameType {
            id: id.to_string(),
            name: name.to_string(),
            description: description.to_string(),
            icon: icon.to_string(),
            available: true,
            capacity,
            popular_games: games.iter().map(|g| g.to_string()).collect(),
            base_rate_per_hour: None,
        }
    }

    vec![
        entry(
            "playstation",
            "PlayStation 5",
            "PlayStation 5 consoles with exclusive games and 4K gaming",
            "🎮",
            3,
            &["Spider-Man 2", "God of War Ragnarök", "Gran Turismo 7", "EA Sports FC"],
        ),
        entry(
            "playstation_steering",
            "PlayStation + Steering",
            "Racing rig with steering wheel, pedals and shifter",
            "🏎️",
            1,
            &["Gran Turismo 7", "F1 24", "Need for Speed Unbound"],
        ),
        entry(
            "xbox",
            "Xbox Series X",
            "Xbox Series X with the Game Pass library",
            "🎮",
            2,
            &["Halo Infinite", "Forza Horizon 5", "Sea of Thieves", "Minecraft"],
        ),
        entry(
            "nintendo_switch",
            "Nintendo Switch",
            "Nintendo Switch for party and family games",
            "🕹️",
            2,
            &["Mario Kart 8 Deluxe", "Super Smash Bros. Ultimate", "Splatoon 3"],
        ),
        entry(
            "vr",
            "VR Gaming",
            "Immersive virtual reality with room-scale tracking",
            "🥽",
            1,
            &["Beat Saber", "Half-Life: Alyx", "Superhot VR"],
        ),
        entry(
            "board_games",
            "Board Games",
            "Classic and modern board games for all ages and groups",
            "🎲",
            4,
            &["Settlers of Catan", "Ticket to Ride", "Codenames", "Carrom", "Chess"],
        ),
    ]
}
