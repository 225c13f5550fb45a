// Prompt fragments owned by the gateway itself.
// Advisor policy text lives in advice::prompts.

/// System prompt for the connection probe. JSON mode requires the word "JSON".
pub const PROBE_SYSTEM: &str = "You are a health check. \
    Respond with the JSON object {\"status\": \"ok\"} and nothing else.";

pub const PROBE_MESSAGE: &str = "Test connection";
