//! Severity detection: flags messages describing red-flag symptoms.
//!
//! Runs on the raw user message, independently of the model, so the flag
//! survives whatever the generated response says.

/// Alarm phrases, lower-case. A single substring hit marks the message severe.
pub const SEVERE_PHRASES: &[&str] = &[
    "heel veel pijn",
    "extreme pijn",
    "ondraaglijke pijn",
    "kan niet lopen",
    "kan niet bewegen",
    "opgezwollen",
    "dik opgezwollen",
    "erg gezwollen",
    "roodheid",
    "heel rood",
    "warm aanvoelt",
    "warmte",
    "koorts",
    "naar ziekenhuis",
    "ambulance",
    "ongeluk gehad",
    "gevallen",
    "trauma",
    "gebroken",
    "knak gehoord",
    "krakend geluid",
    "kan niet staan",
    "verlamming",
    "geen gevoel",
    "gevoelloos",
];

/// Returns true when the message contains any alarm phrase (case-insensitive).
pub fn detect_severe(message: &str) -> bool {
    let message = message.to_lowercase();
    SEVERE_PHRASES.iter().any(|phrase| message.contains(phrase))
}
