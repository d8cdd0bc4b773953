use rand::seq::SliceRandom;

/// Names given to rooms created without one
const ROOM_NAMES: &[&str] = &[
    "Popcorn Palace",
    "The Late Show",
    "Couch Potatoes",
    "Movie Night",
    "Front Row Seats",
    "The Matinee",
    "Binge Club",
    "Rewind Room",
    "Box Office",
    "Opening Credits",
    "The Director's Cut",
    "Midnight Screening",
    "Double Feature",
    "Sofa Cinema",
    "Blanket Fort",
    "Intermission",
    "Roll the Tape",
    "Press Play",
    "Watch Together",
    "The Big Screen",
];

pub fn random_room_name() -> String {
    ROOM_NAMES
        .choose(&mut rand::thread_rng())
        .unwrap_or(&"Room")
        .to_string()
}
