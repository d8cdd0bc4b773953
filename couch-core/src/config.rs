/// Seconds in a day
const DAY_IN_SECONDS: f64 = 60. * 60. * 24.;

/// The configuration of the room engine
#[derive(Debug, Clone)]
pub struct Config {
    /// How many clients a roster shows before it is limited
    pub display_limit: usize,
    /// How long a room lives after it was created, in seconds
    pub room_ttl_in_seconds: f64,
    /// How long a client record lives after its connection opened, in seconds
    pub client_ttl_in_seconds: f64,
    /// Length of a room id, short enough to type by hand
    pub room_id_length: usize,
    /// Length of a room's admin secret
    pub secret_length: usize,
    /// Length of media item and chat message ids
    pub item_id_length: usize,
    /// The smallest amount a payment session can be created for, in cents
    pub minimum_payment: i64,
}

impl Config {
    /// Returns when a room created at `now` expires
    pub fn room_expiry(&self, now: f64) -> f64 {
        now + self.room_ttl_in_seconds
    }

    /// Returns when a client connected at `now` expires
    pub fn client_expiry(&self, now: f64) -> f64 {
        now + self.client_ttl_in_seconds
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            display_limit: 100,
            room_ttl_in_seconds: DAY_IN_SECONDS * 30.,
            // Connections never outlive this, so a stale record is always swept eventually
            client_ttl_in_seconds: DAY_IN_SECONDS,
            // 8 url-safe characters is 48 bits, plenty for rooms that live a few hours
            room_id_length: 8,
            secret_length: 43,
            item_id_length: 8,
            minimum_payment: 100,
        }
    }
}
