/// Application name
pub const APP_NAME: &str = "LinkHeart";

/// Preview shown for a match whose latest message carries only an image
pub const IMAGE_PLACEHOLDER: &str = "Sent an image";

/// Default HTTP API port (server)
pub const DEFAULT_HTTP_PORT: u16 = 8080;

/// Buffered store events per subscriber before it starts lagging
pub const DEFAULT_EVENT_CAPACITY: usize = 256;

/// How many times a conflicted read-modify-write is re-run
pub const MAX_CONFLICT_RETRIES: usize = 3;

/// Collection keys in the blob store
pub const KEY_USERS: &str = "lh_users";
pub const KEY_LIKES: &str = "lh_likes";
pub const KEY_MATCHES: &str = "lh_matches";
pub const KEY_MESSAGES: &str = "lh_messages";

/// Registration defaults for a freshly created profile
pub const DEFAULT_USER_NAME: &str = "New User";
pub const DEFAULT_USER_AGE: u8 = 20;
pub const DEFAULT_USER_LOCATION: &str = "Unknown";
pub const DEFAULT_USER_BIO: &str = "Hello!";
pub const DEFAULT_USER_PHOTO: &str = "https://picsum.photos/400/600";
